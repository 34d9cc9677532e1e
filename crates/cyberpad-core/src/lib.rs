//! Cyberpad Core Library
//!
//! This crate provides the core functionality for Cyberpad, a local-first
//! notes workspace of nested pages made of typed content blocks.
//!
//! # Architecture
//!
//! - **Key-value back end**: flat string store with finite capacity
//! - **Workspace store**: one JSON blob per identity in that back end
//! - **Page tree**: adjacency index and sidebar projection, rebuilt on load
//!
//! # Quick Start
//!
//! ```text
//! let config = Config::load()?;
//! let mut store = WorkspaceStore::open_with_config(&config)?;
//! let identity = config.identity();
//!
//! // Load (seeded on first use)
//! let mut data = store.load(identity.as_ref()).unwrap_or_default();
//! data.add_page("Recon", None)?;
//!
//! // Saving reports failure instead of raising it
//! if !store.save(identity.as_ref(), &data) { /* tell the user */ }
//! ```
//!
//! # Modules
//!
//! - `store`: Per-identity workspace persistence (main entry point)
//! - `workspace`: Workspace data, page mutations and integrity checks
//! - `models`: Pages and blocks
//! - `tree`: Parent/child index and sidebar projection
//! - `identity`: Identity type and providers
//! - `storage`: Key-value back ends
//! - `config`: Application configuration

pub mod config;
pub mod identity;
pub mod models;
pub mod storage;
pub mod store;
pub mod tree;
pub mod workspace;

pub use config::Config;
pub use identity::{FixedIdentity, Identity, IdentityError, IdentityProvider, StoredIdentity};
pub use models::{Block, BlockId, BlockKind, BlockType, CalloutVariant, Page, PageId};
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError, StorageUsage};
pub use store::WorkspaceStore;
pub use tree::{PageTree, Sidebar, TreeRow};
pub use workspace::{IntegrityIssue, WorkspaceData, WorkspaceError};
