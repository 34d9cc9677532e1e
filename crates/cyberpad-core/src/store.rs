//! Workspace store
//!
//! The `WorkspaceStore` persists one [`WorkspaceData`] per identity as a
//! single JSON blob in a key-value back end. It is a function of
//! (identity, operation) over the back end: the identity is passed to every
//! call and nothing about the current user is held here.
//!
//! ## Failure policy
//!
//! - No identity: `load` yields `None`, `save` yields `false`; the back end
//!   is not touched.
//! - Unreadable or corrupt blob: `load` yields an empty workspace and logs
//!   a warning.
//! - Failed write (quota, I/O, serialization): `save` yields `false` and
//!   logs an error.
//!
//! Nothing is retried or queued, and nothing panics.
//!
//! ## Usage
//!
//! ```ignore
//! let mut store = WorkspaceStore::new(MemoryStore::new());
//! let identity = Identity::parse("neo")?;
//!
//! let mut data = store.load(Some(&identity)).unwrap(); // seeded on first use
//! data.add_page("Recon", None)?;
//! if !store.save(Some(&identity), &data) {
//!     eprintln!("Save failed");
//! }
//! ```

use tracing::{debug, error, warn};

use crate::config::{Config, DEFAULT_KEY_PREFIX};
use crate::identity::Identity;
use crate::storage::{FileStore, KeyValueStore, StorageResult, StorageUsage};
use crate::workspace::WorkspaceData;

/// Per-identity workspace persistence over a key-value back end
pub struct WorkspaceStore<S: KeyValueStore> {
    backend: S,
    key_prefix: String,
}

impl<S: KeyValueStore> WorkspaceStore<S> {
    /// Create a store with the default key prefix
    pub fn new(backend: S) -> Self {
        Self::with_prefix(backend, DEFAULT_KEY_PREFIX)
    }

    /// Create a store whose keys start with `key_prefix`
    pub fn with_prefix(backend: S, key_prefix: impl Into<String>) -> Self {
        Self {
            backend,
            key_prefix: key_prefix.into(),
        }
    }

    /// Storage key for an identity
    pub fn storage_key(&self, identity: &Identity) -> String {
        format!("{}{}", self.key_prefix, identity.as_str())
    }

    pub fn key_prefix(&self) -> &str {
        &self.key_prefix
    }

    /// Get the underlying back end
    pub fn backend(&self) -> &S {
        &self.backend
    }

    /// Get mutable access to the underlying back end
    pub fn backend_mut(&mut self) -> &mut S {
        &mut self.backend
    }

    /// Whether a blob has been saved for `identity`
    pub fn exists(&self, identity: &Identity) -> bool {
        matches!(self.backend.get(&self.storage_key(identity)), Ok(Some(_)))
    }

    /// Load the workspace for `identity`
    ///
    /// Returns `None` when no identity is established. A first-time identity
    /// gets the seed workspace (not written back until saved). A blob that
    /// cannot be read or parsed yields an empty workspace.
    pub fn load(&self, identity: Option<&Identity>) -> Option<WorkspaceData> {
        let identity = identity?;
        let key = self.storage_key(identity);

        let raw = match self.backend.get(&key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(%identity, "No stored workspace, seeding");
                return Some(WorkspaceData::seed());
            }
            Err(e) => {
                warn!(%identity, error = %e, "Failed to read workspace, starting empty");
                return Some(WorkspaceData::empty());
            }
        };

        match serde_json::from_str::<WorkspaceData>(&raw) {
            Ok(data) => {
                debug!(%identity, pages = data.pages.len(), "Loaded workspace");
                Some(data)
            }
            Err(e) => {
                warn!(%identity, error = %e, "Corrupt workspace data, starting empty");
                Some(WorkspaceData::empty())
            }
        }
    }

    /// Save the workspace for `identity`, returning whether it was written
    pub fn save(&mut self, identity: Option<&Identity>, data: &WorkspaceData) -> bool {
        let Some(identity) = identity else {
            debug!("Save skipped: no identity");
            return false;
        };

        let json = match serde_json::to_string(data) {
            Ok(json) => json,
            Err(e) => {
                error!(%identity, error = %e, "Failed to serialize workspace");
                return false;
            }
        };

        let key = self.storage_key(identity);
        match self.backend.set(&key, &json) {
            Ok(()) => {
                debug!(%identity, bytes = json.len(), "Saved workspace");
                true
            }
            Err(e) => {
                error!(%identity, error = %e, "Failed to save workspace");
                false
            }
        }
    }

    /// Remove the stored workspace for `identity`
    pub fn delete(&mut self, identity: &Identity) -> StorageResult<bool> {
        let key = self.storage_key(identity);
        self.backend.remove(&key)
    }

    /// Identities with a saved workspace under this store's prefix
    pub fn identities(&self) -> StorageResult<Vec<Identity>> {
        let mut result: Vec<Identity> = self
            .backend
            .keys()?
            .iter()
            .filter_map(|key| key.strip_prefix(&self.key_prefix))
            .filter_map(|rest| Identity::parse(rest).ok())
            .collect();
        result.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        Ok(result)
    }

    /// Space used across every key of the back end
    pub fn usage_stats(&self) -> StorageResult<StorageUsage> {
        StorageUsage::measure(&self.backend)
    }

    /// Approximate space used across every key, e.g. `"12.34 KB"`
    ///
    /// Counts two bytes per stored character. Reports `"0.00 KB"` if the
    /// back end cannot be enumerated.
    pub fn usage(&self) -> String {
        match self.usage_stats() {
            Ok(stats) => stats.human(),
            Err(e) => {
                warn!(error = %e, "Failed to measure storage usage");
                StorageUsage::default().human()
            }
        }
    }
}

impl WorkspaceStore<FileStore> {
    /// Open the file-backed store described by `config`
    pub fn open_with_config(config: &Config) -> StorageResult<Self> {
        let backend = FileStore::open(config.store_dir())?.with_capacity(config.quota());
        Ok(Self::with_prefix(backend, config.key_prefix.clone()))
    }
}
