//! Page tree
//!
//! Pages reference their parent by ID only. `PageTree` indexes those weak
//! references into an adjacency map (parent -> ordered children) so the
//! sidebar does not rescan the page list for every node, and so cycles can
//! be found.
//!
//! `Sidebar` holds the ephemeral expanded/collapsed state and projects the
//! tree into the flat list of rows the sidebar renders. Only nodes reachable
//! from the root through expanded parents appear; pages with a dangling
//! parent or caught in a cycle are never reachable.

use std::collections::{HashMap, HashSet};

use crate::models::{Page, PageId};

/// Adjacency index over a page list
#[derive(Debug, Clone, Default)]
pub struct PageTree {
    /// Children per parent, `None` being the root sentinel. Siblings keep
    /// the order of the page list.
    children: HashMap<Option<PageId>, Vec<PageId>>,
    parents: HashMap<PageId, Option<PageId>>,
}

impl PageTree {
    /// Index a page list
    pub fn build(pages: &[Page]) -> Self {
        let mut tree = Self::default();
        for page in pages {
            tree.children
                .entry(page.parent_id.clone())
                .or_default()
                .push(page.id.clone());
            tree.parents.insert(page.id.clone(), page.parent_id.clone());
        }
        tree
    }

    pub fn contains(&self, id: &PageId) -> bool {
        self.parents.contains_key(id)
    }

    /// Direct children of `parent` (`None` for root pages)
    pub fn children(&self, parent: Option<&PageId>) -> &[PageId] {
        self.children
            .get(&parent.cloned())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn has_children(&self, id: &PageId) -> bool {
        !self.children(Some(id)).is_empty()
    }

    /// Parent of a page; `None` for root pages and unknown IDs
    pub fn parent(&self, id: &PageId) -> Option<&PageId> {
        self.parents.get(id).and_then(Option::as_ref)
    }

    /// Ancestors of a page, nearest first
    ///
    /// Stops at a missing parent or when the chain loops back on itself.
    pub fn ancestors(&self, id: &PageId) -> Vec<PageId> {
        let mut result = Vec::new();
        let mut visited: HashSet<&PageId> = HashSet::from([id]);
        let mut current = self.parent(id);
        while let Some(parent) = current {
            if !visited.insert(parent) {
                break;
            }
            result.push(parent.clone());
            current = self.parent(parent);
        }
        result
    }

    /// All pages below `id`, depth first in sibling order
    pub fn descendants(&self, id: &PageId) -> Vec<PageId> {
        let mut result = Vec::new();
        let mut visited: HashSet<&PageId> = HashSet::from([id]);
        let mut stack: Vec<&PageId> = self.children(Some(id)).iter().rev().collect();
        while let Some(next) = stack.pop() {
            if !visited.insert(next) {
                continue;
            }
            result.push(next.clone());
            stack.extend(self.children(Some(next)).iter().rev());
        }
        result
    }

    /// Whether a page can be reached by walking down from the root pages
    pub fn is_reachable(&self, id: &PageId) -> bool {
        if !self.contains(id) {
            return false;
        }
        let mut visited: HashSet<&PageId> = HashSet::from([id]);
        let mut current = id;
        loop {
            match self.parents.get(current) {
                Some(None) => return true,
                Some(Some(parent)) => {
                    if !visited.insert(parent) {
                        return false;
                    }
                    current = parent;
                }
                None => return false,
            }
        }
    }

    /// Every parent cycle, each reported once as the list of pages in it
    pub fn find_cycles(&self) -> Vec<Vec<PageId>> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            OnPath,
            Done,
        }

        let mut marks: HashMap<&PageId, Mark> = HashMap::new();
        let mut cycles = Vec::new();

        let mut ids: Vec<&PageId> = self.parents.keys().collect();
        ids.sort();

        for start in ids {
            if marks.contains_key(start) {
                continue;
            }
            let mut path: Vec<&PageId> = Vec::new();
            let mut current = Some(start);
            while let Some(id) = current {
                match marks.get(id) {
                    Some(Mark::Done) => break,
                    Some(Mark::OnPath) => {
                        if let Some(pos) = path.iter().position(|p| *p == id) {
                            cycles.push(path[pos..].iter().map(|p| (*p).clone()).collect());
                        }
                        break;
                    }
                    None => {}
                }
                if !self.contains(id) {
                    break;
                }
                marks.insert(id, Mark::OnPath);
                path.push(id);
                current = self.parent(id);
            }
            for id in path {
                marks.insert(id, Mark::Done);
            }
        }

        cycles
    }
}

/// One visible line of the sidebar
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeRow {
    pub id: PageId,
    pub title: String,
    /// 0 for root pages
    pub depth: usize,
    pub has_children: bool,
    pub expanded: bool,
}

/// Expanded/collapsed state of the sidebar
///
/// Not persisted; a fresh sidebar starts fully collapsed.
#[derive(Debug, Clone, Default)]
pub struct Sidebar {
    expanded: HashSet<PageId>,
}

impl Sidebar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_expanded(&self, id: &PageId) -> bool {
        self.expanded.contains(id)
    }

    /// Flip the expanded state of a page, returning the new state
    pub fn toggle(&mut self, id: &PageId) -> bool {
        if self.expanded.remove(id) {
            false
        } else {
            self.expanded.insert(id.clone());
            true
        }
    }

    pub fn expand(&mut self, id: &PageId) {
        self.expanded.insert(id.clone());
    }

    pub fn collapse(&mut self, id: &PageId) {
        self.expanded.remove(id);
    }

    /// Expand every ancestor of `id` so that it becomes visible
    pub fn reveal(&mut self, tree: &PageTree, id: &PageId) {
        for ancestor in tree.ancestors(id) {
            self.expanded.insert(ancestor);
        }
    }

    /// Expand every page that has children
    pub fn expand_all(&mut self, tree: &PageTree) {
        for (parent, children) in &tree.children {
            if let Some(parent) = parent {
                if !children.is_empty() {
                    self.expanded.insert(parent.clone());
                }
            }
        }
    }

    /// Forget pages that no longer exist
    pub fn retain_existing(&mut self, tree: &PageTree) {
        self.expanded.retain(|id| tree.contains(id));
    }

    /// Visible rows, starting from the root pages
    pub fn project(&self, tree: &PageTree, pages: &[Page]) -> Vec<TreeRow> {
        self.project_from(tree, pages, None, 0)
    }

    /// Visible rows below `parent`, the first level at `depth`
    ///
    /// Children are listed in page-list order; only expanded nodes are
    /// descended into.
    pub fn project_from(
        &self,
        tree: &PageTree,
        pages: &[Page],
        parent: Option<&PageId>,
        depth: usize,
    ) -> Vec<TreeRow> {
        let titles: HashMap<&PageId, &str> =
            pages.iter().map(|p| (&p.id, p.title.as_str())).collect();
        let mut rows = Vec::new();
        let mut visited = HashSet::new();
        self.walk(tree, &titles, parent, depth, &mut visited, &mut rows);
        rows
    }

    fn walk<'a>(
        &self,
        tree: &'a PageTree,
        titles: &HashMap<&PageId, &str>,
        parent: Option<&PageId>,
        depth: usize,
        visited: &mut HashSet<&'a PageId>,
        rows: &mut Vec<TreeRow>,
    ) {
        for id in tree.children(parent) {
            if !visited.insert(id) {
                continue;
            }
            let expanded = self.is_expanded(id);
            rows.push(TreeRow {
                id: id.clone(),
                title: titles.get(id).copied().unwrap_or_default().to_string(),
                depth,
                has_children: tree.has_children(id),
                expanded,
            });
            if expanded {
                self.walk(tree, titles, Some(id), depth + 1, visited, rows);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::WorkspaceData;

    /// A (root) -> B -> C
    fn chain() -> (WorkspaceData, PageId, PageId, PageId) {
        let mut data = WorkspaceData::empty();
        let a = data.add_page("A", None).unwrap();
        let b = data.add_page("B", Some(&a)).unwrap();
        let c = data.add_page("C", Some(&b)).unwrap();
        (data, a, b, c)
    }

    fn visible(rows: &[TreeRow]) -> Vec<(&str, usize)> {
        rows.iter().map(|r| (r.title.as_str(), r.depth)).collect()
    }

    #[test]
    fn test_children_follow_page_order() {
        let mut data = WorkspaceData::empty();
        let root = data.add_page("root", None).unwrap();
        let z = data.add_page("z", Some(&root)).unwrap();
        let a = data.add_page("a", Some(&root)).unwrap();
        let other = data.add_page("other root", None).unwrap();

        let tree = data.tree();
        assert_eq!(tree.children(Some(&root)), &[z, a][..]);
        assert_eq!(tree.children(None), &[root, other][..]);
    }

    #[test]
    fn test_collapsed_hides_grandchildren() {
        let (data, a, b, _c) = chain();
        let tree = data.tree();
        let mut sidebar = Sidebar::new();

        // Everything collapsed: only the root shows
        let rows = sidebar.project(&tree, &data.pages);
        assert_eq!(visible(&rows), vec![("A", 0)]);
        assert!(rows[0].has_children);
        assert!(!rows[0].expanded);

        // A expanded, B collapsed: C stays hidden
        sidebar.expand(&a);
        let rows = sidebar.project(&tree, &data.pages);
        assert_eq!(visible(&rows), vec![("A", 0), ("B", 1)]);

        // Toggling B reveals C under it
        assert!(sidebar.toggle(&b));
        let rows = sidebar.project(&tree, &data.pages);
        assert_eq!(visible(&rows), vec![("A", 0), ("B", 1), ("C", 2)]);
        assert!(!rows[2].has_children);

        // And toggling again hides it
        assert!(!sidebar.toggle(&b));
        let rows = sidebar.project(&tree, &data.pages);
        assert_eq!(visible(&rows), vec![("A", 0), ("B", 1)]);
    }

    #[test]
    fn test_project_from_subtree() {
        let (data, a, b, _c) = chain();
        let tree = data.tree();
        let mut sidebar = Sidebar::new();
        sidebar.expand(&b);

        let rows = sidebar.project_from(&tree, &data.pages, Some(&a), 1);
        assert_eq!(visible(&rows), vec![("B", 1), ("C", 2)]);
    }

    #[test]
    fn test_orphans_are_not_projected() {
        let (mut data, a, b, c) = chain();
        data.remove_page(&b).unwrap();
        let tree = data.tree();
        let mut sidebar = Sidebar::new();
        sidebar.expand(&a);
        sidebar.expand(&b);

        let rows = sidebar.project(&tree, &data.pages);
        assert_eq!(visible(&rows), vec![("A", 0)]);
        assert!(!tree.is_reachable(&c));
        assert!(tree.is_reachable(&a));
    }

    #[test]
    fn test_cycles_are_not_projected() {
        let (mut data, a, b, _c) = chain();
        data.page_mut(&a).unwrap().parent_id = Some(b.clone());
        let tree = data.tree();
        let mut sidebar = Sidebar::new();
        sidebar.expand_all(&tree);

        assert!(sidebar.project(&tree, &data.pages).is_empty());
        assert_eq!(tree.find_cycles().len(), 1);
    }

    #[test]
    fn test_find_cycles_none_for_forest() {
        let (data, ..) = chain();
        assert!(data.tree().find_cycles().is_empty());
    }

    #[test]
    fn test_self_parent_is_a_cycle() {
        let mut data = WorkspaceData::empty();
        let a = data.add_page("A", None).unwrap();
        data.page_mut(&a).unwrap().parent_id = Some(a.clone());

        let cycles = data.tree().find_cycles();
        assert_eq!(cycles, vec![vec![a]]);
    }

    #[test]
    fn test_ancestors_and_descendants() {
        let (data, a, b, c) = chain();
        let tree = data.tree();

        assert_eq!(tree.ancestors(&c), vec![b.clone(), a.clone()]);
        assert!(tree.ancestors(&a).is_empty());
        assert_eq!(tree.descendants(&a), vec![b, c]);
    }

    #[test]
    fn test_reveal_expands_ancestors() {
        let (data, a, b, c) = chain();
        let tree = data.tree();
        let mut sidebar = Sidebar::new();
        sidebar.reveal(&tree, &c);

        assert!(sidebar.is_expanded(&a));
        assert!(sidebar.is_expanded(&b));
        assert!(!sidebar.is_expanded(&c));
        let rows = sidebar.project(&tree, &data.pages);
        assert_eq!(rows.len(), 3);
    }

    #[test]
    fn test_retain_existing() {
        let (mut data, a, b, _c) = chain();
        let mut sidebar = Sidebar::new();
        sidebar.expand(&a);
        sidebar.expand(&b);

        data.remove_page(&b).unwrap();
        sidebar.retain_existing(&data.tree());
        assert!(sidebar.is_expanded(&a));
        assert!(!sidebar.is_expanded(&b));
    }
}
