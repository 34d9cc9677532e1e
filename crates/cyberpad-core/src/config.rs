//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/cyberpad/config.toml)
//! 3. Environment variables (CYBERPAD_* prefix)
//!
//! Environment variables take precedence over config file values.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::identity::Identity;

/// Environment variable prefix
const ENV_PREFIX: &str = "CYBERPAD";

/// Prefix of workspace keys in the key-value back end
pub const DEFAULT_KEY_PREFIX: &str = "cyberpad_workspace_";

/// Default storage budget, matching the usual browser local-storage quota
pub const DEFAULT_QUOTA_BYTES: u64 = 5 * 1024 * 1024;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory for data storage
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Identity to use when none is given on the command line
    #[serde(default)]
    pub identity: Option<String>,

    /// Prefix prepended to the identity to form its storage key
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Total size limit of the store in bytes (0 for unlimited)
    #[serde(default = "default_quota_bytes")]
    pub quota_bytes: u64,

    /// Log file for the TUI (defaults to {data_dir}/debug.log)
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            identity: None,
            key_prefix: default_key_prefix(),
            quota_bytes: default_quota_bytes(),
            log_file: None,
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (CYBERPAD_DATA_DIR, CYBERPAD_USER, ...)
    /// 2. Config file (~/.config/cyberpad/config.toml or CYBERPAD_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration, using `path` instead of the default file if given
    pub fn load_with_cli_override(path: Option<&PathBuf>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &PathBuf) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        config.ensure_data_dir()?;
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // CYBERPAD_DATA_DIR
        if let Ok(val) = std::env::var(format!("{}_DATA_DIR", ENV_PREFIX)) {
            self.data_dir = PathBuf::from(val);
        }

        // CYBERPAD_USER
        if let Ok(val) = std::env::var(format!("{}_USER", ENV_PREFIX)) {
            self.identity = if val.trim().is_empty() {
                None
            } else {
                Some(val)
            };
        }

        // CYBERPAD_KEY_PREFIX
        if let Ok(val) = std::env::var(format!("{}_KEY_PREFIX", ENV_PREFIX)) {
            if !val.is_empty() {
                self.key_prefix = val;
            }
        }

        // CYBERPAD_QUOTA_BYTES ("0" or "none" disables the limit)
        if let Ok(val) = std::env::var(format!("{}_QUOTA_BYTES", ENV_PREFIX)) {
            match parse_quota(&val) {
                Some(quota) => self.quota_bytes = quota,
                None => warn!(value = %val, "Ignoring invalid {}_QUOTA_BYTES", ENV_PREFIX),
            }
        }
    }

    /// Ensure data directory exists
    fn ensure_data_dir(&self) -> Result<()> {
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir)
                .with_context(|| format!("Failed to create data directory: {:?}", self.data_dir))?;
        }
        Ok(())
    }

    /// Save configuration to the default file
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_file_path())
    }

    /// Save configuration to a specific file
    pub fn save_to_path(&self, config_path: &PathBuf) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with CYBERPAD_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("cyberpad")
            .join("config.toml")
    }

    /// Directory of the file-backed key-value store
    pub fn store_dir(&self) -> PathBuf {
        self.data_dir.join("store")
    }

    /// Log file path for the TUI
    pub fn log_path(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| self.data_dir.join("debug.log"))
    }

    /// Store capacity, `None` when unlimited
    pub fn quota(&self) -> Option<u64> {
        (self.quota_bytes > 0).then_some(self.quota_bytes)
    }

    /// The configured identity, if set and valid
    pub fn identity(&self) -> Option<Identity> {
        let raw = self.identity.as_deref()?;
        match Identity::parse(raw) {
            Ok(identity) => Some(identity),
            Err(e) => {
                warn!(error = %e, "Ignoring invalid identity in configuration");
                None
            }
        }
    }
}

/// Parse a quota value in bytes; "none" means unlimited (0)
pub fn parse_quota(value: &str) -> Option<u64> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("none") {
        return Some(0);
    }
    value.parse().ok()
}

/// Get the default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("cyberpad")
}

fn default_key_prefix() -> String {
    DEFAULT_KEY_PREFIX.to_string()
}

fn default_quota_bytes() -> u64 {
    DEFAULT_QUOTA_BYTES
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Mutex to serialize tests that touch environment variables
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// Guard that locks env access and saves/restores env vars
    struct EnvGuard<'a> {
        _lock: std::sync::MutexGuard<'a, ()>,
        saved: Vec<(String, Option<String>)>,
    }

    impl<'a> EnvGuard<'a> {
        fn new(vars: &[&str]) -> Self {
            let lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
            let saved = vars
                .iter()
                .map(|&name| (name.to_string(), env::var(name).ok()))
                .collect();
            for name in vars {
                env::remove_var(name);
            }
            Self { _lock: lock, saved }
        }
    }

    impl Drop for EnvGuard<'_> {
        fn drop(&mut self) {
            for (name, value) in &self.saved {
                match value {
                    Some(v) => env::set_var(name, v),
                    None => env::remove_var(name),
                }
            }
        }
    }

    const ENV_VARS: &[&str] = &[
        "CYBERPAD_DATA_DIR",
        "CYBERPAD_USER",
        "CYBERPAD_KEY_PREFIX",
        "CYBERPAD_QUOTA_BYTES",
    ];

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.identity.is_none());
        assert_eq!(config.key_prefix, DEFAULT_KEY_PREFIX);
        assert_eq!(config.quota(), Some(DEFAULT_QUOTA_BYTES));
        assert!(config.data_dir.ends_with("cyberpad"));
    }

    #[test]
    fn test_file_paths() {
        let config = Config {
            data_dir: PathBuf::from("/data/cyberpad"),
            ..Config::default()
        };

        assert_eq!(config.store_dir(), PathBuf::from("/data/cyberpad/store"));
        assert_eq!(config.log_path(), PathBuf::from("/data/cyberpad/debug.log"));

        let config = Config {
            log_file: Some(PathBuf::from("/tmp/cp.log")),
            ..config
        };
        assert_eq!(config.log_path(), PathBuf::from("/tmp/cp.log"));
    }

    #[test]
    fn test_env_override_data_dir() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();

        env::set_var("CYBERPAD_DATA_DIR", "/tmp/cyberpad-test");
        config.apply_env_overrides();

        assert_eq!(config.data_dir, PathBuf::from("/tmp/cyberpad-test"));
    }

    #[test]
    fn test_env_override_user() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();
        env::set_var("CYBERPAD_USER", "neo");
        config.apply_env_overrides();
        assert_eq!(config.identity().unwrap().as_str(), "neo");

        // Blank clears it
        env::set_var("CYBERPAD_USER", "  ");
        config.apply_env_overrides();
        assert!(config.identity.is_none());
    }

    #[test]
    fn test_env_override_quota() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();
        env::set_var("CYBERPAD_QUOTA_BYTES", "1024");
        config.apply_env_overrides();
        assert_eq!(config.quota(), Some(1024));

        env::set_var("CYBERPAD_QUOTA_BYTES", "none");
        config.apply_env_overrides();
        assert_eq!(config.quota(), None);

        // Garbage leaves the previous value
        config.quota_bytes = 7;
        env::set_var("CYBERPAD_QUOTA_BYTES", "lots");
        config.apply_env_overrides();
        assert_eq!(config.quota(), Some(7));
    }

    #[test]
    fn test_parse_quota() {
        assert_eq!(parse_quota("0"), Some(0));
        assert_eq!(parse_quota("NONE"), Some(0));
        assert_eq!(parse_quota(" 42 "), Some(42));
        assert_eq!(parse_quota("-1"), None);
    }

    #[test]
    fn test_invalid_identity_ignored() {
        let config = Config {
            identity: Some("\u{1b}[31m".to_string()),
            ..Config::default()
        };
        assert!(config.identity().is_none());
    }

    #[test]
    fn test_serialization() {
        let _guard = EnvGuard::new(ENV_VARS);

        let config = Config {
            data_dir: PathBuf::from("/data/cyberpad"),
            identity: Some("trinity".to_string()),
            key_prefix: "ws_".to_string(),
            quota_bytes: 2048,
            log_file: None,
        };

        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("data_dir"));
        assert!(toml_str.contains("key_prefix"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.data_dir, config.data_dir);
        assert_eq!(parsed.identity, config.identity);
        assert_eq!(parsed.key_prefix, config.key_prefix);
        assert_eq!(parsed.quota_bytes, config.quota_bytes);
    }

    #[test]
    fn test_load_from_str() {
        let _guard = EnvGuard::new(ENV_VARS);

        let toml = r#"
            data_dir = "/custom/data"
            identity = "morpheus"
        "#;

        let config = Config::load_from_str(toml).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/custom/data"));
        assert_eq!(config.identity.as_deref(), Some("morpheus"));
        // Unspecified fields fall back to defaults
        assert_eq!(config.key_prefix, DEFAULT_KEY_PREFIX);
        assert_eq!(config.quota_bytes, DEFAULT_QUOTA_BYTES);
    }

    #[test]
    fn test_load_from_path_missing_file() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp_dir = tempfile::TempDir::new().unwrap();
        env::set_var("CYBERPAD_DATA_DIR", temp_dir.path().join("data"));

        let path = PathBuf::from("/nonexistent/config.toml");
        let config = Config::load_from_path(&path).unwrap();
        assert!(config.identity.is_none());
        assert!(config.data_dir.is_dir());
    }

    #[test]
    fn test_save_to_path_round_trip() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let config = Config {
            data_dir: temp_dir.path().join("data"),
            identity: Some("oracle".to_string()),
            ..Config::default()
        };
        config.save_to_path(&path).unwrap();

        let loaded = Config::load_from_path(&path).unwrap();
        assert_eq!(loaded.identity.as_deref(), Some("oracle"));
        assert_eq!(loaded.data_dir, config.data_dir);
    }
}
