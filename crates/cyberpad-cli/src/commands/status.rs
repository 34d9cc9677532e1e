//! Status, usage and integrity command handlers

use anyhow::{bail, Context, Result};

use super::Session;
use crate::output::{display_title, Output, OutputFormat};

/// Show status information
pub fn show(session: &Session, output: &Output) -> Result<()> {
    let stats = session
        .store
        .usage_stats()
        .context("Failed to measure storage")?;
    let identities = session
        .store
        .identities()
        .context("Failed to list workspaces")?;
    let config = &session.config;
    let workspace = match &session.identity {
        Some(identity) => session.store.load(Some(identity)),
        None => None,
    };
    let saved = session
        .identity
        .as_ref()
        .map(|identity| session.store.exists(identity))
        .unwrap_or(false);

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "identity": session.identity,
                    "saved": saved,
                    "storage": {
                        "location": session.config.store_dir(),
                        "keys": stats.keys,
                        "bytes": stats.bytes(),
                        "usage": stats.human(),
                        "quota_bytes": config.quota(),
                    },
                    "workspaces": identities,
                    "counts": workspace.as_ref().map(|data| serde_json::json!({
                        "pages": data.pages.len(),
                        "blocks": data.pages.iter().map(|p| p.blocks.len()).sum::<usize>(),
                    })),
                })
            );
        }
        OutputFormat::Quiet => {
            if let Some(ref identity) = session.identity {
                println!("{}", identity);
            }
        }
        OutputFormat::Human => {
            println!("Cyberpad Status");
            println!("===============");
            println!();
            println!("Identity:");
            match &session.identity {
                Some(identity) => {
                    println!("  Current: {}", identity);
                    println!("  Saved:   {}", if saved { "yes" } else { "no (seed)" });
                }
                None => println!("  Current: (none)"),
            }
            println!();
            println!("Storage:");
            println!("  Location: {}", session.config.store_dir().display());
            println!("  Keys:     {}", stats.keys);
            println!("  Usage:    {}", stats.human());
            match config.quota() {
                Some(quota) => println!("  Quota:    {:.2} KB", quota as f64 / 1024.0),
                None => println!("  Quota:    unlimited"),
            }
            println!();
            println!("Workspaces: {}", identities.len());
            if let Some(data) = workspace {
                let blocks: usize = data.pages.iter().map(|p| p.blocks.len()).sum();
                println!();
                println!("Contents:");
                println!("  Pages:  {}", data.pages.len());
                println!("  Blocks: {}", blocks);
                if let Some(active) = data.active_page() {
                    println!("  Active: {}", display_title(&active.title));
                }
            }
        }
    }

    Ok(())
}

/// Print approximate storage usage, e.g. `12.34 KB`
pub fn usage(session: &Session, output: &Output) -> Result<()> {
    let usage = session.store.usage();
    match output.format {
        OutputFormat::Json => println!("{}", serde_json::json!({ "usage": usage })),
        _ => println!("{}", usage),
    }
    Ok(())
}

/// Report integrity issues in the current workspace
///
/// Exits with an error when any issue is found so scripts can test it.
pub fn check(session: &mut Session, output: &Output) -> Result<()> {
    let data = session.load()?;
    let issues = data.validate();
    output.print_issues(&issues);

    if !issues.is_empty() {
        bail!("{} integrity issue(s) found", issues.len());
    }
    Ok(())
}
