//! Data models for Cyberpad
//!
//! Defines the persisted structures: Page and Block.
//! The serialized form is the camelCase JSON blob stored per identity, with
//! timestamps as milliseconds since the Unix epoch.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::workspace::WorkspaceError;

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Generate a fresh random identifier
            pub fn generate() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            /// Get the identifier as a string slice
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Shortened form for display (first 8 characters)
            pub fn short(&self) -> &str {
                match self.0.char_indices().nth(8) {
                    Some((idx, _)) => &self.0[..idx],
                    None => &self.0,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

opaque_id!(
    /// Identifier of a page. Opaque: stored blobs may carry any string.
    PageId
);

opaque_id!(
    /// Identifier of a block within a page
    BlockId
);

/// Current time truncated to millisecond precision.
///
/// The blob stores milliseconds, so anything finer would not survive a
/// save/load round trip.
pub fn now_millis() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Visual style of a callout block
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalloutVariant {
    #[default]
    Info,
    Warning,
    Alert,
    Success,
}

impl CalloutVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            CalloutVariant::Info => "info",
            CalloutVariant::Warning => "warning",
            CalloutVariant::Alert => "alert",
            CalloutVariant::Success => "success",
        }
    }
}

impl FromStr for CalloutVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "info" => Ok(CalloutVariant::Info),
            "warning" => Ok(CalloutVariant::Warning),
            "alert" => Ok(CalloutVariant::Alert),
            "success" => Ok(CalloutVariant::Success),
            other => Err(format!(
                "unknown callout variant '{}' (expected info, warning, alert or success)",
                other
            )),
        }
    }
}

/// The closed set of block types, without their type-specific fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockType {
    Text,
    Heading,
    Image,
    Code,
    Checklist,
    Callout,
    Divider,
    Quote,
    Decoder,
    Redacted,
}

impl BlockType {
    pub const ALL: [BlockType; 10] = [
        BlockType::Text,
        BlockType::Heading,
        BlockType::Image,
        BlockType::Code,
        BlockType::Checklist,
        BlockType::Callout,
        BlockType::Divider,
        BlockType::Quote,
        BlockType::Decoder,
        BlockType::Redacted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BlockType::Text => "text",
            BlockType::Heading => "heading",
            BlockType::Image => "image",
            BlockType::Code => "code",
            BlockType::Checklist => "checklist",
            BlockType::Callout => "callout",
            BlockType::Divider => "divider",
            BlockType::Quote => "quote",
            BlockType::Decoder => "decoder",
            BlockType::Redacted => "redacted",
        }
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BlockType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        BlockType::ALL
            .into_iter()
            .find(|t| t.as_str() == lower)
            .ok_or_else(|| format!("unknown block type '{}'", s))
    }
}

/// Type of a block together with the fields only that type carries
///
/// Serialized as the `type` tag plus the optional `checked`, `language` and
/// `variant` fields, flattened into the block object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BlockKind {
    Text,
    Heading,
    /// Content is a data URI
    Image,
    Code {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        language: Option<String>,
    },
    Checklist {
        #[serde(default)]
        checked: bool,
    },
    Callout {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        variant: Option<CalloutVariant>,
    },
    Divider,
    Quote,
    Decoder,
    Redacted,
}

impl BlockKind {
    /// The kind for a type with its type-specific fields left empty
    pub fn default_for(block_type: BlockType) -> Self {
        match block_type {
            BlockType::Text => BlockKind::Text,
            BlockType::Heading => BlockKind::Heading,
            BlockType::Image => BlockKind::Image,
            BlockType::Code => BlockKind::Code { language: None },
            BlockType::Checklist => BlockKind::Checklist { checked: false },
            BlockType::Callout => BlockKind::Callout { variant: None },
            BlockType::Divider => BlockKind::Divider,
            BlockType::Quote => BlockKind::Quote,
            BlockType::Decoder => BlockKind::Decoder,
            BlockType::Redacted => BlockKind::Redacted,
        }
    }

    pub fn block_type(&self) -> BlockType {
        match self {
            BlockKind::Text => BlockType::Text,
            BlockKind::Heading => BlockType::Heading,
            BlockKind::Image => BlockType::Image,
            BlockKind::Code { .. } => BlockType::Code,
            BlockKind::Checklist { .. } => BlockType::Checklist,
            BlockKind::Callout { .. } => BlockType::Callout,
            BlockKind::Divider => BlockType::Divider,
            BlockKind::Quote => BlockType::Quote,
            BlockKind::Decoder => BlockType::Decoder,
            BlockKind::Redacted => BlockType::Redacted,
        }
    }
}

impl From<BlockType> for BlockKind {
    fn from(block_type: BlockType) -> Self {
        BlockKind::default_for(block_type)
    }
}

/// One typed unit of content within a page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    #[serde(flatten)]
    pub kind: BlockKind,
    #[serde(default)]
    pub content: String,
}

impl Block {
    /// Create a block with a fresh ID
    pub fn new(kind: BlockKind, content: impl Into<String>) -> Self {
        Self {
            id: BlockId::generate(),
            kind,
            content: content.into(),
        }
    }

    pub fn block_type(&self) -> BlockType {
        self.kind.block_type()
    }

    /// Whether this is a checklist block that has been ticked
    pub fn is_checked(&self) -> bool {
        matches!(self.kind, BlockKind::Checklist { checked: true })
    }
}

/// A titled node in the page hierarchy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    /// Unique identifier, immutable after creation
    pub id: PageId,
    /// Parent page; `None` for root pages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<PageId>,
    /// Display title (may be empty)
    #[serde(default)]
    pub title: String,
    /// Ordered content blocks
    #[serde(default)]
    pub blocks: Vec<Block>,
    /// When this page was created
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    /// When this page or one of its blocks last changed
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
}

impl Page {
    /// Create an empty root page
    pub fn new(title: impl Into<String>) -> Self {
        let now = now_millis();
        Self {
            id: PageId::generate(),
            parent_id: None,
            title: title.into(),
            blocks: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Create an empty page under `parent`
    pub fn child_of(title: impl Into<String>, parent: PageId) -> Self {
        Self {
            parent_id: Some(parent),
            ..Self::new(title)
        }
    }

    /// Refresh `updated_at`
    pub fn touch(&mut self) {
        self.updated_at = now_millis();
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Update the title
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
        self.touch();
    }

    /// Get a block by ID
    pub fn block(&self, id: &BlockId) -> Option<&Block> {
        self.blocks.iter().find(|b| &b.id == id)
    }

    fn block_position(&self, id: &BlockId) -> Result<usize, WorkspaceError> {
        self.blocks
            .iter()
            .position(|b| &b.id == id)
            .ok_or_else(|| WorkspaceError::BlockNotFound {
                page: self.id.clone(),
                block: id.clone(),
            })
    }

    /// Append a new block and return its ID
    pub fn add_block(&mut self, kind: BlockKind, content: impl Into<String>) -> BlockId {
        let block = Block::new(kind, content);
        let id = block.id.clone();
        self.blocks.push(block);
        self.touch();
        id
    }

    /// Insert a block at `index` (clamped to the end of the list)
    pub fn insert_block(&mut self, index: usize, block: Block) {
        let index = index.min(self.blocks.len());
        self.blocks.insert(index, block);
        self.touch();
    }

    /// Replace the content of a block
    pub fn set_block_content(
        &mut self,
        id: &BlockId,
        content: impl Into<String>,
    ) -> Result<(), WorkspaceError> {
        let pos = self.block_position(id)?;
        self.blocks[pos].content = content.into();
        self.touch();
        Ok(())
    }

    /// Change the type of a block, keeping its content
    pub fn set_block_kind(&mut self, id: &BlockId, kind: BlockKind) -> Result<(), WorkspaceError> {
        let pos = self.block_position(id)?;
        self.blocks[pos].kind = kind;
        self.touch();
        Ok(())
    }

    /// Flip the checked state of a checklist block, returning the new state
    pub fn toggle_checked(&mut self, id: &BlockId) -> Result<bool, WorkspaceError> {
        let pos = self.block_position(id)?;
        let block = &mut self.blocks[pos];
        let BlockKind::Checklist { checked } = &mut block.kind else {
            return Err(WorkspaceError::NotAChecklist(id.clone()));
        };
        *checked = !*checked;
        let now = *checked;
        self.touch();
        Ok(now)
    }

    /// Remove a block and return it
    pub fn remove_block(&mut self, id: &BlockId) -> Result<Block, WorkspaceError> {
        let pos = self.block_position(id)?;
        let block = self.blocks.remove(pos);
        self.touch();
        Ok(block)
    }

    /// Move a block to `index` (clamped to the last position)
    pub fn move_block(&mut self, id: &BlockId, index: usize) -> Result<(), WorkspaceError> {
        let pos = self.block_position(id)?;
        let block = self.blocks.remove(pos);
        let index = index.min(self.blocks.len());
        self.blocks.insert(index, block);
        self.touch();
        Ok(())
    }
}
