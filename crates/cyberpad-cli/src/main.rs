//! Cyberpad CLI
//!
//! Command-line and terminal interface for Cyberpad workspaces.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cyberpad_core::Config;

mod commands;
mod editor;
mod output;
mod tui;

use commands::block::KindOptions;
use commands::Session;
use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "cyberpad")]
#[command(about = "Cyberpad - nested pages of typed blocks, stored per identity")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Act as this identity instead of the configured or stored one
    #[arg(short, long, global = true)]
    user: Option<String>,

    /// Use this config file instead of the default
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the TUI interface
    Tui,
    /// Show the current identity
    Whoami,
    /// Remember an identity for later commands
    Login {
        /// Identity name
        name: String,
    },
    /// Forget the remembered identity
    Logout,
    /// Manage pages
    Page {
        #[command(subcommand)]
        command: PageCommands,
    },
    /// Manage blocks within a page
    Block {
        #[command(subcommand)]
        command: BlockCommands,
    },
    /// Check the workspace for structural problems
    Check,
    /// Show approximate storage usage
    Usage,
    /// Show identity, storage and workspace summary
    Status,
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
enum PageCommands {
    /// Show the page tree
    #[command(alias = "ls")]
    List {
        /// Expand every page
        #[arg(short, long)]
        all: bool,
        /// Expand these pages (ID or prefix)
        #[arg(short, long)]
        expand: Vec<String>,
    },
    /// Create a page
    #[command(alias = "add")]
    New {
        /// Page title
        title: String,
        /// Parent page ID (full ID or prefix)
        #[arg(short, long)]
        parent: Option<String>,
        /// Make the new page active
        #[arg(long)]
        open: bool,
    },
    /// Show a page and its blocks
    Show {
        /// Page ID (full ID or prefix)
        id: String,
    },
    /// Rename a page
    Rename {
        /// Page ID (full ID or prefix)
        id: String,
        /// New title
        title: String,
    },
    /// Delete a page (children are kept)
    #[command(alias = "delete")]
    Rm {
        /// Page ID (full ID or prefix)
        id: String,
    },
    /// Make a page the active one
    Open {
        /// Page ID (full ID or prefix)
        id: String,
    },
}

#[derive(Subcommand)]
enum BlockCommands {
    /// Append a block to a page
    Add {
        /// Page ID (full ID or prefix)
        page: String,
        /// Block type (text, heading, image, code, checklist, callout,
        /// divider, quote, decoder, redacted)
        #[arg(value_name = "TYPE")]
        block_type: String,
        /// Block content (opens editor if not provided)
        content: Option<String>,
        /// Language of a code block
        #[arg(long)]
        language: Option<String>,
        /// Variant of a callout block (info, warning, alert, success)
        #[arg(long)]
        variant: Option<String>,
        /// Start a checklist block checked
        #[arg(long)]
        checked: bool,
    },
    /// Replace the content of a block
    Edit {
        /// Page ID (full ID or prefix)
        page: String,
        /// Block ID (full ID or prefix)
        block: String,
        /// New content (opens editor if not provided)
        content: Option<String>,
    },
    /// Change the type of a block
    #[command(name = "type")]
    Retype {
        /// Page ID (full ID or prefix)
        page: String,
        /// Block ID (full ID or prefix)
        block: String,
        /// New block type
        #[arg(value_name = "TYPE")]
        block_type: String,
        /// Language of a code block
        #[arg(long)]
        language: Option<String>,
        /// Variant of a callout block
        #[arg(long)]
        variant: Option<String>,
        /// Start a checklist block checked
        #[arg(long)]
        checked: bool,
    },
    /// Toggle a checklist block
    Check {
        /// Page ID (full ID or prefix)
        page: String,
        /// Block ID (full ID or prefix)
        block: String,
    },
    /// Delete a block
    #[command(alias = "delete")]
    Rm {
        /// Page ID (full ID or prefix)
        page: String,
        /// Block ID (full ID or prefix)
        block: String,
    },
    /// Move a block to a new position (0-based)
    Mv {
        /// Page ID (full ID or prefix)
        page: String,
        /// Block ID (full ID or prefix)
        block: String,
        /// Target position
        index: usize,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, identity, key_prefix, quota_bytes, log_file)
        key: String,
        /// Configuration value
        value: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    // Commands that don't need the store
    if let Some(Commands::Config { command }) = &cli.command {
        init_cli_logging();
        return handle_config_command(command.clone(), cli.config.as_ref(), &output);
    }

    let config = Config::load_with_cli_override(cli.config.as_ref())
        .context("Failed to load configuration")?;

    // Handle TUI (default when no command given)
    let Some(command) = cli.command else {
        return tui::run(config, cli.user.as_deref());
    };
    if matches!(command, Commands::Tui) {
        return tui::run(config, cli.user.as_deref());
    }

    init_cli_logging();
    let mut session = Session::open(config, cli.user.as_deref())?;

    match command {
        Commands::Tui | Commands::Config { .. } => Ok(()), // Handled above
        Commands::Whoami => commands::identity::whoami(&session, &output),
        Commands::Login { name } => commands::identity::login(&mut session, name, &output),
        Commands::Logout => commands::identity::logout(&mut session, &output),
        Commands::Page { command } => handle_page_command(command, &mut session, &output),
        Commands::Block { command } => handle_block_command(command, &mut session, &output),
        Commands::Check => commands::status::check(&mut session, &output),
        Commands::Usage => commands::status::usage(&session, &output),
        Commands::Status => commands::status::show(&session, &output),
    }
}

fn handle_page_command(command: PageCommands, session: &mut Session, output: &Output) -> Result<()> {
    match command {
        PageCommands::List { all, expand } => commands::page::list(session, all, expand, output),
        PageCommands::New {
            title,
            parent,
            open,
        } => commands::page::create(session, title, parent, open, output),
        PageCommands::Show { id } => commands::page::show(session, id, output),
        PageCommands::Rename { id, title } => commands::page::rename(session, id, title, output),
        PageCommands::Rm { id } => commands::page::delete(session, id, output),
        PageCommands::Open { id } => commands::page::open(session, id, output),
    }
}

fn handle_block_command(
    command: BlockCommands,
    session: &mut Session,
    output: &Output,
) -> Result<()> {
    match command {
        BlockCommands::Add {
            page,
            block_type,
            content,
            language,
            variant,
            checked,
        } => {
            let options = KindOptions {
                language,
                variant,
                checked,
            };
            commands::block::add(session, page, block_type, content, options, output)
        }
        BlockCommands::Edit {
            page,
            block,
            content,
        } => commands::block::edit(session, page, block, content, output),
        BlockCommands::Retype {
            page,
            block,
            block_type,
            language,
            variant,
            checked,
        } => {
            let options = KindOptions {
                language,
                variant,
                checked,
            };
            commands::block::retype(session, page, block, block_type, options, output)
        }
        BlockCommands::Check { page, block } => {
            commands::block::check(session, page, block, output)
        }
        BlockCommands::Rm { page, block } => commands::block::delete(session, page, block, output),
        BlockCommands::Mv { page, block, index } => {
            commands::block::move_to(session, page, block, index, output)
        }
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
    }
}

/// Initialize logging for command-line mode
///
/// Logs go to stderr, filtered by CYBERPAD_LOG (default: warn).
fn init_cli_logging() {
    let level = std::env::var("CYBERPAD_LOG").unwrap_or_else(|_| "warn".to_string());
    let env_filter = EnvFilter::new(format!("cyberpad_core={},cyberpad_cli={}", level, level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_block_add() {
        let cli = Cli::try_parse_from([
            "cyberpad", "--user", "neo", "block", "add", "ab12", "code", "fn main() {}",
            "--language", "rust",
        ])
        .unwrap();
        assert_eq!(cli.user.as_deref(), Some("neo"));
        match cli.command {
            Some(Commands::Block {
                command:
                    BlockCommands::Add {
                        page,
                        block_type,
                        content,
                        language,
                        ..
                    },
            }) => {
                assert_eq!(page, "ab12");
                assert_eq!(block_type, "code");
                assert_eq!(content.as_deref(), Some("fn main() {}"));
                assert_eq!(language.as_deref(), Some("rust"));
            }
            _ => panic!("expected block add"),
        }
    }

    #[test]
    fn test_parse_page_list_expand() {
        let cli =
            Cli::try_parse_from(["cyberpad", "page", "list", "-e", "a1", "-e", "b2"]).unwrap();
        match cli.command {
            Some(Commands::Page {
                command: PageCommands::List { all, expand },
            }) => {
                assert!(!all);
                assert_eq!(expand, vec!["a1", "b2"]);
            }
            _ => panic!("expected page list"),
        }
    }

    #[test]
    fn test_parse_block_type_subcommand() {
        let cli = Cli::try_parse_from(["cyberpad", "block", "type", "p", "b", "callout"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Block {
                command: BlockCommands::Retype { .. }
            })
        ));
    }
}
