//! Command handlers
//!
//! Every command works on a [`Session`]: the configuration, the file-backed
//! store, and the identity resolved for this invocation.

pub mod block;
pub mod config;
pub mod identity;
pub mod page;
pub mod status;

use anyhow::{bail, Context, Result};
use tracing::debug;

use cyberpad_core::{
    BlockId, Config, FileStore, FixedIdentity, Identity, IdentityProvider, Page, PageId,
    StoredIdentity, WorkspaceData, WorkspaceStore,
};
use cyberpad_core::identity::FirstOf;

/// Store and identity for one command invocation
pub struct Session {
    pub config: Config,
    pub store: WorkspaceStore<FileStore>,
    pub identity: Option<Identity>,
}

impl Session {
    /// Open the store and resolve the identity
    ///
    /// The identity comes from the `--user` flag, then the configuration,
    /// then the stored current-user entry.
    pub fn open(config: Config, user_flag: Option<&str>) -> Result<Self> {
        let store = match WorkspaceStore::open_with_config(&config) {
            Ok(store) => store,
            Err(e) => {
                let hint = e
                    .recovery_suggestion()
                    .map(|s| format!("\n{}", s))
                    .unwrap_or_default();
                bail!("Failed to open store at {:?}: {}{}", config.store_dir(), e, hint);
            }
        };

        let flag = match user_flag {
            Some(raw) => FixedIdentity::new(
                Identity::parse(raw).with_context(|| format!("Invalid --user value: {:?}", raw))?,
            ),
            None => FixedIdentity::none(),
        };
        let configured = config
            .identity()
            .map(FixedIdentity::new)
            .unwrap_or_default();
        let stored = StoredIdentity::new(store.backend());
        let identity = FirstOf(vec![&flag as &dyn IdentityProvider, &configured, &stored]).current();

        Ok(Self {
            config,
            store,
            identity,
        })
    }

    /// The resolved identity, or an error telling the user how to set one
    pub fn require_identity(&self) -> Result<&Identity> {
        match &self.identity {
            Some(identity) => Ok(identity),
            None => bail!("No identity. Run `cyberpad login <name>` or pass --user <name>."),
        }
    }

    /// Load the workspace for the current identity
    ///
    /// A first-time identity's seed workspace is saved straight away, so the
    /// page IDs printed by one command still resolve in the next.
    pub fn load(&mut self) -> Result<WorkspaceData> {
        let identity = self.require_identity()?.clone();
        let Some(data) = self.store.load(Some(&identity)) else {
            bail!("No identity established");
        };
        if !self.store.exists(&identity) {
            debug!(%identity, "Saving seed workspace");
            self.save(&data)?;
        }
        Ok(data)
    }

    /// Save the workspace for the current identity
    pub fn save(&mut self, data: &WorkspaceData) -> Result<()> {
        let identity = self.require_identity()?.clone();
        if !self.store.save(Some(&identity), data) {
            bail!(
                "Failed to save workspace for '{}'. Storage may be full ({} used); \
                 remove large blocks or raise quota_bytes. Set CYBERPAD_LOG=debug for details.",
                identity,
                self.store.usage()
            );
        }
        Ok(())
    }
}

/// Resolve a page ID from a full ID or a unique prefix
pub fn resolve_page(data: &WorkspaceData, id: &str) -> Result<PageId> {
    if let Some(page) = data.pages.iter().find(|p| p.id.as_str() == id) {
        return Ok(page.id.clone());
    }

    let matches: Vec<&Page> = data
        .pages
        .iter()
        .filter(|p| p.id.as_str().starts_with(id))
        .collect();

    match matches.len() {
        0 => bail!("No page found matching: {}", id),
        1 => Ok(matches[0].id.clone()),
        _ => {
            eprintln!("Multiple pages match '{}':", id);
            for page in &matches {
                eprintln!("  {} - {}", page.id, page.title);
            }
            bail!("Ambiguous ID. Please provide more characters.");
        }
    }
}

/// Resolve a block ID on `page` from a full ID or a unique prefix
pub fn resolve_block(page: &Page, id: &str) -> Result<BlockId> {
    if let Some(block) = page.blocks.iter().find(|b| b.id.as_str() == id) {
        return Ok(block.id.clone());
    }

    let matches: Vec<&BlockId> = page
        .blocks
        .iter()
        .map(|b| &b.id)
        .filter(|b| b.as_str().starts_with(id))
        .collect();

    match matches.len() {
        0 => bail!("No block found matching: {}", id),
        1 => Ok(matches[0].clone()),
        _ => bail!("Ambiguous block ID '{}'. Please provide more characters.", id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cyberpad_core::BlockKind;
    use tempfile::TempDir;

    fn config_in(temp_dir: &TempDir) -> Config {
        Config {
            data_dir: temp_dir.path().to_path_buf(),
            ..Config::default()
        }
    }

    fn workspace() -> WorkspaceData {
        let mut data = WorkspaceData::empty();
        data.pages.push(Page {
            id: PageId::from("aaaa1111"),
            ..Page::new("First")
        });
        data.pages.push(Page {
            id: PageId::from("aaaa2222"),
            ..Page::new("Second")
        });
        data.pages.push(Page {
            id: PageId::from("bbbb"),
            ..Page::new("Third")
        });
        data
    }

    #[test]
    fn test_resolve_page_exact_and_prefix() {
        let data = workspace();
        assert_eq!(resolve_page(&data, "bbbb").unwrap().as_str(), "bbbb");
        assert_eq!(resolve_page(&data, "b").unwrap().as_str(), "bbbb");
        assert_eq!(resolve_page(&data, "aaaa2").unwrap().as_str(), "aaaa2222");
    }

    #[test]
    fn test_resolve_page_errors() {
        let data = workspace();
        assert!(resolve_page(&data, "aaaa")
            .unwrap_err()
            .to_string()
            .contains("Ambiguous"));
        assert!(resolve_page(&data, "zzz")
            .unwrap_err()
            .to_string()
            .contains("No page found"));
    }

    #[test]
    fn test_resolve_block() {
        let mut page = Page::new("P");
        let id = page.add_block(BlockKind::Text, "x");
        assert_eq!(resolve_block(&page, id.as_str()).unwrap(), id);
        assert_eq!(resolve_block(&page, id.short()).unwrap(), id);
        assert!(resolve_block(&page, "not-there").is_err());
    }

    #[test]
    fn test_seed_ids_stable_across_sessions() {
        let temp_dir = TempDir::new().unwrap();

        let mut first = Session::open(config_in(&temp_dir), Some("neo")).unwrap();
        let seeded = first.load().unwrap();
        let seed_id = seeded.pages[0].id.clone();
        assert!(first.store.exists(first.identity.as_ref().unwrap()));

        let mut second = Session::open(config_in(&temp_dir), Some("neo")).unwrap();
        let data = second.load().unwrap();
        assert_eq!(data, seeded);
        assert_eq!(resolve_page(&data, seed_id.short()).unwrap(), seed_id);
    }

    #[test]
    fn test_load_without_identity() {
        let temp_dir = TempDir::new().unwrap();
        let mut session = Session::open(config_in(&temp_dir), None).unwrap();
        assert!(session.identity.is_none());
        assert!(session.load().is_err());
        assert!(session.store.identities().unwrap().is_empty());
    }
}
