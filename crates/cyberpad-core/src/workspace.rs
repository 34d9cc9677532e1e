//! Workspace data
//!
//! A workspace is the complete set of pages plus the active-page pointer for
//! one identity. It is the unit that gets serialized into a single blob.
//!
//! Pages form a forest through weak `parent_id` references. Deleting a page
//! does not cascade: its children keep a dangling `parent_id` and become
//! unreachable from the sidebar until re-parented. Cycles are not prevented
//! on write; `validate` reports them.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{BlockId, BlockKind, Page, PageId};
use crate::tree::PageTree;

/// Title of the page created for a first-time identity
pub const SEED_PAGE_TITLE: &str = "Classified Mission";

/// Errors from workspace mutations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkspaceError {
    #[error("Page not found: {0}")]
    PageNotFound(PageId),

    #[error("Block {block} not found on page {page}")]
    BlockNotFound { page: PageId, block: BlockId },

    #[error("Block {0} is not a checklist item")]
    NotAChecklist(BlockId),
}

/// An integrity problem found by [`WorkspaceData::validate`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityIssue {
    /// Two or more pages share an ID
    DuplicatePageId(PageId),
    /// Two or more blocks on the same page share an ID
    DuplicateBlockId { page: PageId, block: BlockId },
    /// `parent_id` refers to a page that does not exist
    DanglingParent { page: PageId, parent: PageId },
    /// The page is its own transitive ancestor
    ParentCycle(Vec<PageId>),
    /// `active_page_id` refers to a page that does not exist
    DanglingActivePage(PageId),
}

impl fmt::Display for IntegrityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegrityIssue::DuplicatePageId(id) => write!(f, "duplicate page id {}", id),
            IntegrityIssue::DuplicateBlockId { page, block } => {
                write!(f, "duplicate block id {} on page {}", block, page)
            }
            IntegrityIssue::DanglingParent { page, parent } => {
                write!(f, "page {} has missing parent {}", page, parent)
            }
            IntegrityIssue::ParentCycle(ids) => {
                let chain: Vec<&str> = ids.iter().map(|id| id.as_str()).collect();
                write!(f, "parent cycle: {}", chain.join(" -> "))
            }
            IntegrityIssue::DanglingActivePage(id) => {
                write!(f, "active page {} does not exist", id)
            }
        }
    }
}

/// The persisted workspace for one identity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceData {
    /// Pages in insertion order
    #[serde(default)]
    pub pages: Vec<Page>,
    /// Page to resume on, if any
    #[serde(default)]
    pub active_page_id: Option<PageId>,
}

impl WorkspaceData {
    /// An empty, valid workspace (`{pages: [], activePageId: null}`)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Default content for a first-time identity
    pub fn seed() -> Self {
        let mut page = Page::new(SEED_PAGE_TITLE);
        page.add_block(BlockKind::Heading, "Welcome to your secure workspace, agent");
        page.add_block(
            BlockKind::Text,
            "Everything you write here stays on this machine. Add pages for each \
             operation and nest them to keep your intel organised.",
        );
        let id = page.id.clone();
        Self {
            pages: vec![page],
            active_page_id: Some(id),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Get a page by ID
    pub fn page(&self, id: &PageId) -> Option<&Page> {
        self.pages.iter().find(|p| &p.id == id)
    }

    /// Get a mutable page by ID
    pub fn page_mut(&mut self, id: &PageId) -> Option<&mut Page> {
        self.pages.iter_mut().find(|p| &p.id == id)
    }

    /// Get a mutable page by ID, or a `PageNotFound` error
    pub fn require_page_mut(&mut self, id: &PageId) -> Result<&mut Page, WorkspaceError> {
        self.page_mut(id)
            .ok_or_else(|| WorkspaceError::PageNotFound(id.clone()))
    }

    /// The active page, if set and still present
    pub fn active_page(&self) -> Option<&Page> {
        self.active_page_id.as_ref().and_then(|id| self.page(id))
    }

    /// Select a page
    pub fn set_active(&mut self, id: &PageId) -> Result<(), WorkspaceError> {
        if self.page(id).is_none() {
            return Err(WorkspaceError::PageNotFound(id.clone()));
        }
        self.active_page_id = Some(id.clone());
        Ok(())
    }

    /// Create a page at the end of the list and return its ID
    ///
    /// The parent must exist when given. The new page does not become active.
    pub fn add_page(
        &mut self,
        title: impl Into<String>,
        parent: Option<&PageId>,
    ) -> Result<PageId, WorkspaceError> {
        let page = match parent {
            Some(parent) => {
                if self.page(parent).is_none() {
                    return Err(WorkspaceError::PageNotFound(parent.clone()));
                }
                Page::child_of(title, parent.clone())
            }
            None => Page::new(title),
        };
        let id = page.id.clone();
        self.pages.push(page);
        Ok(id)
    }

    /// Remove a page and return it
    ///
    /// Children are left in place with a dangling `parent_id`. If the removed
    /// page was active, the selection is cleared.
    pub fn remove_page(&mut self, id: &PageId) -> Result<Page, WorkspaceError> {
        let pos = self
            .pages
            .iter()
            .position(|p| &p.id == id)
            .ok_or_else(|| WorkspaceError::PageNotFound(id.clone()))?;
        let page = self.pages.remove(pos);
        if self.active_page_id.as_ref() == Some(id) {
            self.active_page_id = None;
        }
        Ok(page)
    }

    /// Update a page title
    pub fn rename_page(
        &mut self,
        id: &PageId,
        title: impl Into<String>,
    ) -> Result<(), WorkspaceError> {
        self.require_page_mut(id)?.set_title(title);
        Ok(())
    }

    /// Pages whose parent does not exist
    pub fn orphans(&self) -> Vec<&Page> {
        let ids: HashSet<&PageId> = self.pages.iter().map(|p| &p.id).collect();
        self.pages
            .iter()
            .filter(|p| p.parent_id.as_ref().is_some_and(|parent| !ids.contains(parent)))
            .collect()
    }

    /// Build the parent/child index for this workspace
    pub fn tree(&self) -> PageTree {
        PageTree::build(&self.pages)
    }

    /// Check the structural invariants and report every violation found
    pub fn validate(&self) -> Vec<IntegrityIssue> {
        let mut issues = Vec::new();

        let mut seen: HashMap<&PageId, usize> = HashMap::new();
        for page in &self.pages {
            let count = seen.entry(&page.id).or_insert(0);
            *count += 1;
            if *count == 2 {
                issues.push(IntegrityIssue::DuplicatePageId(page.id.clone()));
            }

            let mut blocks: HashSet<&BlockId> = HashSet::new();
            let mut reported: HashSet<&BlockId> = HashSet::new();
            for block in &page.blocks {
                if !blocks.insert(&block.id) && reported.insert(&block.id) {
                    issues.push(IntegrityIssue::DuplicateBlockId {
                        page: page.id.clone(),
                        block: block.id.clone(),
                    });
                }
            }
        }

        for page in &self.pages {
            if let Some(parent) = &page.parent_id {
                if !seen.contains_key(parent) {
                    issues.push(IntegrityIssue::DanglingParent {
                        page: page.id.clone(),
                        parent: parent.clone(),
                    });
                }
            }
        }

        for cycle in self.tree().find_cycles() {
            issues.push(IntegrityIssue::ParentCycle(cycle));
        }

        if let Some(active) = &self.active_page_id {
            if !seen.contains_key(active) {
                issues.push(IntegrityIssue::DanglingActivePage(active.clone()));
            }
        }

        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BlockType;

    #[test]
    fn test_seed() {
        let data = WorkspaceData::seed();
        assert_eq!(data.pages.len(), 1);

        let page = &data.pages[0];
        assert_eq!(page.title, SEED_PAGE_TITLE);
        assert!(page.is_root());
        let types: Vec<_> = page.blocks.iter().map(|b| b.block_type()).collect();
        assert_eq!(types, vec![BlockType::Heading, BlockType::Text]);
        assert_eq!(data.active_page_id.as_ref(), Some(&page.id));
        assert!(data.validate().is_empty());
    }

    #[test]
    fn test_empty_serializes_null_active() {
        let json = serde_json::to_string(&WorkspaceData::empty()).unwrap();
        assert_eq!(json, r#"{"pages":[],"activePageId":null}"#);
    }

    #[test]
    fn test_add_page_appends() {
        let mut data = WorkspaceData::empty();
        let a = data.add_page("A", None).unwrap();
        let b = data.add_page("B", Some(&a)).unwrap();

        assert_eq!(data.pages.len(), 2);
        assert_eq!(data.pages[1].id, b);
        assert_eq!(data.page(&b).unwrap().parent_id.as_ref(), Some(&a));
        assert!(data.active_page_id.is_none());
    }

    #[test]
    fn test_add_page_missing_parent() {
        let mut data = WorkspaceData::empty();
        let err = data
            .add_page("Lost", Some(&PageId::from("nope")))
            .unwrap_err();
        assert_eq!(err, WorkspaceError::PageNotFound(PageId::from("nope")));
        assert!(data.is_empty());
    }

    #[test]
    fn test_remove_page_does_not_cascade() {
        let mut data = WorkspaceData::empty();
        let a = data.add_page("A", None).unwrap();
        let b = data.add_page("B", Some(&a)).unwrap();
        let c = data.add_page("C", Some(&b)).unwrap();

        data.remove_page(&b).unwrap();

        assert!(data.page(&b).is_none());
        let child = data.page(&c).unwrap();
        assert_eq!(child.parent_id.as_ref(), Some(&b));

        let orphans: Vec<_> = data.orphans().iter().map(|p| p.id.clone()).collect();
        assert_eq!(orphans, vec![c.clone()]);
        assert_eq!(
            data.validate(),
            vec![IntegrityIssue::DanglingParent { page: c, parent: b }]
        );
    }

    #[test]
    fn test_remove_active_page_clears_selection() {
        let mut data = WorkspaceData::seed();
        let id = data.pages[0].id.clone();
        data.remove_page(&id).unwrap();
        assert!(data.active_page_id.is_none());
        assert!(data.active_page().is_none());
    }

    #[test]
    fn test_dangling_active_page() {
        let mut data = WorkspaceData::seed();
        data.active_page_id = Some(PageId::from("gone"));

        assert!(data.active_page().is_none());
        assert_eq!(
            data.validate(),
            vec![IntegrityIssue::DanglingActivePage(PageId::from("gone"))]
        );
    }

    #[test]
    fn test_set_active() {
        let mut data = WorkspaceData::seed();
        let other = data.add_page("Other", None).unwrap();
        data.set_active(&other).unwrap();
        assert_eq!(data.active_page().unwrap().title, "Other");

        assert!(data.set_active(&PageId::from("missing")).is_err());
        assert_eq!(data.active_page_id.as_ref(), Some(&other));
    }

    #[test]
    fn test_rename_page() {
        let mut data = WorkspaceData::seed();
        let id = data.pages[0].id.clone();
        data.rename_page(&id, "Debrief").unwrap();
        assert_eq!(data.page(&id).unwrap().title, "Debrief");
        assert!(data.rename_page(&PageId::from("x"), "y").is_err());
    }

    #[test]
    fn test_validate_duplicates() {
        let mut data = WorkspaceData::empty();
        let mut page = Page::new("One");
        page.add_block(BlockKind::Text, "x");
        let dup_block = page.blocks[0].clone();
        page.blocks.push(dup_block.clone());
        data.pages.push(page.clone());
        data.pages.push(page.clone());

        let issues = data.validate();
        assert!(issues.contains(&IntegrityIssue::DuplicatePageId(page.id.clone())));
        assert!(issues.contains(&IntegrityIssue::DuplicateBlockId {
            page: page.id.clone(),
            block: dup_block.id,
        }));
    }

    #[test]
    fn test_validate_cycle() {
        let mut data = WorkspaceData::empty();
        let a = data.add_page("A", None).unwrap();
        let b = data.add_page("B", Some(&a)).unwrap();
        data.page_mut(&a).unwrap().parent_id = Some(b.clone());

        let issues = data.validate();
        assert_eq!(issues.len(), 1);
        match &issues[0] {
            IntegrityIssue::ParentCycle(ids) => {
                assert_eq!(ids.len(), 2);
                assert!(ids.contains(&a) && ids.contains(&b));
            }
            other => panic!("unexpected issue: {:?}", other),
        }
    }

    #[test]
    fn test_issue_display() {
        let issue = IntegrityIssue::DanglingParent {
            page: PageId::from("child"),
            parent: PageId::from("ghost"),
        };
        assert_eq!(issue.to_string(), "page child has missing parent ghost");
    }
}
