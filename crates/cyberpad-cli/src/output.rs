//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use cyberpad_core::{Block, BlockKind, IntegrityIssue, Page, TreeRow};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    /// Print the sidebar tree
    pub fn print_tree(&self, rows: &[TreeRow], active: Option<&str>) {
        match self.format {
            OutputFormat::Human => {
                if rows.is_empty() {
                    println!("No pages.");
                    return;
                }
                for row in rows {
                    let marker = if !row.has_children {
                        ' '
                    } else if row.expanded {
                        '▼'
                    } else {
                        '▶'
                    };
                    let current = if Some(row.id.as_str()) == active {
                        " *"
                    } else {
                        ""
                    };
                    println!(
                        "{} {}{} {}{}",
                        row.id.short(),
                        "  ".repeat(row.depth),
                        marker,
                        display_title(&row.title),
                        current
                    );
                }
            }
            OutputFormat::Json => {
                let json_rows: Vec<_> = rows
                    .iter()
                    .map(|row| {
                        serde_json::json!({
                            "id": row.id,
                            "title": row.title,
                            "depth": row.depth,
                            "hasChildren": row.has_children,
                            "expanded": row.expanded,
                        })
                    })
                    .collect();
                print_json(&json_rows);
            }
            OutputFormat::Quiet => {
                for row in rows {
                    println!("{}", row.id);
                }
            }
        }
    }

    /// Print a page with its blocks
    pub fn print_page(&self, page: &Page, parent_title: Option<&str>) {
        match self.format {
            OutputFormat::Human => {
                println!("ID:       {}", page.id);
                println!("Title:    {}", display_title(&page.title));
                if let Some(ref parent) = page.parent_id {
                    match parent_title {
                        Some(title) => println!("Parent:   {} ({})", parent.short(), title),
                        None => println!("Parent:   {} (missing)", parent.short()),
                    }
                }
                println!("Created:  {}", page.created_at.format("%Y-%m-%d %H:%M"));
                println!("Updated:  {}", page.updated_at.format("%Y-%m-%d %H:%M"));

                println!();
                if page.blocks.is_empty() {
                    println!("(no blocks)");
                }
                for block in &page.blocks {
                    println!("{} {}", block.id.short(), render_block(block));
                }
            }
            OutputFormat::Json => print_json(page),
            OutputFormat::Quiet => println!("{}", page.id),
        }
    }

    /// Print an integrity report
    pub fn print_issues(&self, issues: &[IntegrityIssue]) {
        match self.format {
            OutputFormat::Human => {
                if issues.is_empty() {
                    println!("✓ Workspace is consistent");
                    return;
                }
                for issue in issues {
                    println!("✗ {}", issue);
                }
                println!("\n{} issue(s)", issues.len());
            }
            OutputFormat::Json => {
                let messages: Vec<String> = issues.iter().map(|i| i.to_string()).collect();
                print_json(&serde_json::json!({
                    "ok": issues.is_empty(),
                    "issues": messages,
                }));
            }
            OutputFormat::Quiet => {
                for issue in issues {
                    println!("{}", issue);
                }
            }
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print a new ID: the bare ID in quiet mode, a message otherwise
    pub fn created(&self, id: &str, message: &str) {
        match self.format {
            OutputFormat::Quiet => println!("{}", id),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "id": id, "message": message})
                );
            }
            OutputFormat::Human => println!("✓ {}", message),
        }
    }

    /// Whether destructive commands should ask first
    pub fn should_prompt(&self) -> bool {
        self.format == OutputFormat::Human
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to format JSON: {}", e),
    }
}

/// Title shown for pages without one
pub fn display_title(title: &str) -> &str {
    if title.is_empty() {
        "Untitled"
    } else {
        title
    }
}

/// One-line rendering of a block for terminal output
pub fn render_block(block: &Block) -> String {
    let text = truncate_line(&block.content, 60);
    match &block.kind {
        BlockKind::Text => text,
        BlockKind::Heading => format!("# {}", text),
        BlockKind::Image => format!("[image, {} bytes]", block.content.len()),
        BlockKind::Code { language } => {
            format!("```{} {}", language.as_deref().unwrap_or(""), text)
        }
        BlockKind::Checklist { checked } => {
            format!("[{}] {}", if *checked { 'x' } else { ' ' }, text)
        }
        BlockKind::Callout { variant } => format!(
            "({}) {}",
            variant.unwrap_or_default().as_str().to_uppercase(),
            text
        ),
        BlockKind::Divider => "────────".to_string(),
        BlockKind::Quote => format!("> {}", text),
        BlockKind::Decoder => format!("[decoder] {}", text),
        BlockKind::Redacted => "█".repeat(block.content.chars().count().clamp(3, 20)),
    }
}

/// Truncate a string to max characters, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Truncate to first line and max length
fn truncate_line(s: &str, max_len: usize) -> String {
    let first_line = s.lines().next().unwrap_or("");
    truncate(first_line, max_len)
}
