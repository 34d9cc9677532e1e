//! Config command handlers

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use cyberpad_core::config::parse_quota;
use cyberpad_core::{Config, Identity};

use crate::output::{Output, OutputFormat};

const VALID_KEYS: &str = "data_dir, identity, key_prefix, quota_bytes, log_file";

/// Show current configuration
pub fn show(config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "identity": config.identity,
                    "key_prefix": config.key_prefix,
                    "quota_bytes": config.quota_bytes,
                    "log_file": config.log_file
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.data_dir.display());
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .cloned()
                .unwrap_or_else(Config::config_file_path);
            println!("Configuration:");
            println!("  data_dir:    {}", config.data_dir.display());
            println!(
                "  identity:    {}",
                config.identity.as_deref().unwrap_or("(not set)")
            );
            println!("  key_prefix:  {}", config.key_prefix);
            match config.quota() {
                Some(quota) => println!("  quota_bytes: {}", quota),
                None => println!("  quota_bytes: unlimited"),
            }
            println!(
                "  log_file:    {}",
                config
                    .log_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| format!("(default: {})", config.log_path().display()))
            );
            println!();
            println!("Config file: {}", effective_path.display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(
    key: String,
    value: String,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    let mut config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    apply(&mut config, &key, &value)?;

    let save_path = config_path
        .cloned()
        .unwrap_or_else(Config::config_file_path);
    config
        .save_to_path(&save_path)
        .context("Failed to save configuration")?;

    output.success(&format!("Set {} = {}", key, value));

    Ok(())
}

fn is_unset(value: &str) -> bool {
    value.is_empty() || value == "none"
}

fn apply(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "data_dir" => {
            config.data_dir = value.into();
        }
        "identity" => {
            config.identity = if is_unset(value) {
                None
            } else {
                let identity = Identity::parse(value)
                    .with_context(|| format!("Invalid identity: {:?}", value))?;
                Some(identity.as_str().to_string())
            };
        }
        "key_prefix" => {
            if value.is_empty() {
                bail!("key_prefix cannot be empty");
            }
            config.key_prefix = value.to_string();
        }
        "quota_bytes" => {
            config.quota_bytes = parse_quota(value).with_context(|| {
                format!(
                    "Invalid value for quota_bytes: '{}'. Use a byte count or 'none'.",
                    value
                )
            })?;
        }
        "log_file" => {
            config.log_file = if is_unset(value) {
                None
            } else {
                Some(value.into())
            };
        }
        _ => {
            bail!(
                "Unknown configuration key: '{}'\nValid keys: {}",
                key,
                VALID_KEYS
            );
        }
    }
    Ok(())
}
