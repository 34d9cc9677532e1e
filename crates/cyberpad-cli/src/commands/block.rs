//! Block command handlers

use anyhow::{bail, Context, Result};

use cyberpad_core::{BlockKind, BlockType, CalloutVariant};

use super::{resolve_block, resolve_page, Session};
use crate::editor::{confirm, edit_text};
use crate::output::{render_block, Output};

/// Type-specific options given on the command line
#[derive(Debug, Default)]
pub struct KindOptions {
    pub language: Option<String>,
    pub variant: Option<String>,
    pub checked: bool,
}

impl KindOptions {
    /// Build the block kind for `block_type`, rejecting options that do
    /// not apply to it
    pub fn into_kind(self, block_type: BlockType) -> Result<BlockKind> {
        if block_type != BlockType::Code && self.language.is_some() {
            bail!("--language only applies to code blocks");
        }
        if block_type != BlockType::Callout && self.variant.is_some() {
            bail!("--variant only applies to callout blocks");
        }
        if block_type != BlockType::Checklist && self.checked {
            bail!("--checked only applies to checklist blocks");
        }

        Ok(match block_type {
            BlockType::Code => BlockKind::Code {
                language: self.language.filter(|l| !l.is_empty()),
            },
            BlockType::Checklist => BlockKind::Checklist {
                checked: self.checked,
            },
            BlockType::Callout => BlockKind::Callout {
                variant: self
                    .variant
                    .map(|v| v.parse::<CalloutVariant>())
                    .transpose()
                    .map_err(anyhow::Error::msg)?,
            },
            other => BlockKind::default_for(other),
        })
    }
}

fn parse_type(block_type: &str) -> Result<BlockType> {
    block_type.parse::<BlockType>().map_err(|e| {
        let valid: Vec<_> = BlockType::ALL.iter().map(|t| t.as_str()).collect();
        anyhow::anyhow!("{}. Valid types: {}", e, valid.join(", "))
    })
}

/// Append a block to a page
///
/// Without content, text-like blocks open the editor; dividers stay empty.
pub fn add(
    session: &mut Session,
    page: String,
    block_type: String,
    content: Option<String>,
    options: KindOptions,
    output: &Output,
) -> Result<()> {
    let block_type = parse_type(&block_type)?;
    let kind = options.into_kind(block_type)?;

    let mut data = session.load()?;
    let page_id = resolve_page(&data, &page)?;

    let content = match content {
        Some(content) => content,
        None if block_type == BlockType::Divider => String::new(),
        None if output.should_prompt() => edit_text("")?,
        None => String::new(),
    };

    let id = data.require_page_mut(&page_id)?.add_block(kind, content);
    session.save(&data)?;

    output.created(
        id.as_str(),
        &format!("Added {} block {} to page {}", block_type, id.short(), page_id.short()),
    );
    Ok(())
}

/// Replace the content of a block
pub fn edit(
    session: &mut Session,
    page: String,
    block: String,
    content: Option<String>,
    output: &Output,
) -> Result<()> {
    let mut data = session.load()?;
    let page_id = resolve_page(&data, &page)?;
    let page = data.require_page_mut(&page_id)?;
    let block_id = resolve_block(page, &block)?;

    let content = match content {
        Some(content) => content,
        None => {
            let current = page
                .block(&block_id)
                .map(|b| b.content.clone())
                .unwrap_or_default();
            let edited = edit_text(&current).context("Failed to edit block")?;
            if edited == current {
                output.message("No changes made.");
                return Ok(());
            }
            edited
        }
    };

    page.set_block_content(&block_id, content)?;
    session.save(&data)?;

    output.success(&format!("Updated block {}", block_id.short()));
    Ok(())
}

/// Change the type of a block, keeping its content
pub fn retype(
    session: &mut Session,
    page: String,
    block: String,
    block_type: String,
    options: KindOptions,
    output: &Output,
) -> Result<()> {
    let block_type = parse_type(&block_type)?;
    let kind = options.into_kind(block_type)?;

    let mut data = session.load()?;
    let page_id = resolve_page(&data, &page)?;
    let page = data.require_page_mut(&page_id)?;
    let block_id = resolve_block(page, &block)?;

    page.set_block_kind(&block_id, kind)?;
    session.save(&data)?;

    output.success(&format!("Block {} is now {}", block_id.short(), block_type));
    Ok(())
}

/// Toggle a checklist block
pub fn check(session: &mut Session, page: String, block: String, output: &Output) -> Result<()> {
    let mut data = session.load()?;
    let page_id = resolve_page(&data, &page)?;
    let page = data.require_page_mut(&page_id)?;
    let block_id = resolve_block(page, &block)?;

    let checked = page.toggle_checked(&block_id)?;
    session.save(&data)?;

    output.success(&format!(
        "{} block {}",
        if checked { "Checked" } else { "Unchecked" },
        block_id.short()
    ));
    Ok(())
}

/// Delete a block
pub fn delete(session: &mut Session, page: String, block: String, output: &Output) -> Result<()> {
    let mut data = session.load()?;
    let page_id = resolve_page(&data, &page)?;
    let page = data.require_page_mut(&page_id)?;
    let block_id = resolve_block(page, &block)?;

    if output.should_prompt() {
        if let Some(block) = page.block(&block_id) {
            println!("Delete block: {} {}", block_id.short(), render_block(block));
        }
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    page.remove_block(&block_id)?;
    session.save(&data)?;

    output.success(&format!("Deleted block: {}", block_id.short()));
    Ok(())
}

/// Move a block to a new position within its page
pub fn move_to(
    session: &mut Session,
    page: String,
    block: String,
    index: usize,
    output: &Output,
) -> Result<()> {
    let mut data = session.load()?;
    let page_id = resolve_page(&data, &page)?;
    let page = data.require_page_mut(&page_id)?;
    let block_id = resolve_block(page, &block)?;

    page.move_block(&block_id, index)?;
    let position = page
        .blocks
        .iter()
        .position(|b| b.id == block_id)
        .unwrap_or(index);
    session.save(&data)?;

    output.success(&format!("Moved block {} to position {}", block_id.short(), position));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_options_for_code() {
        let options = KindOptions {
            language: Some("rust".to_string()),
            ..Default::default()
        };
        assert_eq!(
            options.into_kind(BlockType::Code).unwrap(),
            BlockKind::Code {
                language: Some("rust".to_string())
            }
        );
    }

    #[test]
    fn test_kind_options_for_callout() {
        let options = KindOptions {
            variant: Some("ALERT".to_string()),
            ..Default::default()
        };
        assert_eq!(
            options.into_kind(BlockType::Callout).unwrap(),
            BlockKind::Callout {
                variant: Some(CalloutVariant::Alert)
            }
        );

        let bad = KindOptions {
            variant: Some("loud".to_string()),
            ..Default::default()
        };
        assert!(bad.into_kind(BlockType::Callout).is_err());
    }

    #[test]
    fn test_kind_options_rejects_mismatch() {
        let options = KindOptions {
            checked: true,
            ..Default::default()
        };
        assert!(options.into_kind(BlockType::Text).is_err());

        let options = KindOptions {
            language: Some("go".to_string()),
            ..Default::default()
        };
        assert!(options.into_kind(BlockType::Quote).is_err());
    }

    #[test]
    fn test_parse_type_lists_valid_types() {
        assert_eq!(parse_type("Heading").unwrap(), BlockType::Heading);
        let err = parse_type("table").unwrap_err().to_string();
        assert!(err.contains("redacted"));
    }
}
