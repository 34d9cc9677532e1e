//! Application state and logic
//!
//! The app works on an in-memory copy of the workspace. Mutating methods
//! return `true` when the workspace changed and needs saving; the event
//! loop owns the store and does the save.

use std::time::{Duration, Instant};

use cyberpad_core::{Page, PageId, PageTree, Sidebar, TreeRow, WorkspaceData};

/// Input mode for the application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// Normal navigation mode
    Normal,
    /// Typing a page title
    Title,
}

/// What a submitted title is used for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TitleTarget {
    /// New root page
    NewRoot,
    /// New child of the given page
    NewChild(PageId),
    /// Rename the given page
    Rename(PageId),
}

/// Application state
pub struct App {
    /// Whether the app should exit
    pub should_quit: bool,
    /// Current input mode
    pub input_mode: InputMode,
    /// Target of the title being typed
    pub title_target: Option<TitleTarget>,
    /// Title input buffer
    pub input: String,
    /// Cursor position in the input, in characters
    pub cursor: usize,
    /// The workspace being edited
    pub data: WorkspaceData,
    /// Expanded pages in the sidebar
    pub sidebar: Sidebar,
    /// Visible sidebar rows
    pub rows: Vec<TreeRow>,
    /// Selected row index
    pub selected: usize,
    /// Status message to display temporarily
    pub status_message: Option<String>,
    /// When the status message was set (for auto-dismiss)
    pub status_message_time: Option<Instant>,
    /// Whether help overlay is visible
    pub show_help: bool,
    /// Identity shown in the title bar
    pub identity: String,
    /// Storage usage shown in the status bar
    pub usage: String,
    tree: PageTree,
}

impl App {
    /// Create a new app for a loaded workspace
    ///
    /// The active page is revealed and selected.
    pub fn new(data: WorkspaceData, identity: impl Into<String>) -> Self {
        let tree = data.tree();
        let mut app = Self {
            should_quit: false,
            input_mode: InputMode::Normal,
            title_target: None,
            input: String::new(),
            cursor: 0,
            data,
            sidebar: Sidebar::new(),
            rows: Vec::new(),
            selected: 0,
            status_message: None,
            status_message_time: None,
            show_help: false,
            identity: identity.into(),
            usage: String::new(),
            tree,
        };
        if let Some(active) = app.data.active_page_id.clone() {
            app.sidebar.reveal(&app.tree, &active);
            app.rebuild();
            app.select_page(&active);
        } else {
            app.rebuild();
        }
        app
    }

    /// Rebuild the index and visible rows after the workspace changed
    pub fn rebuild(&mut self) {
        self.tree = self.data.tree();
        self.sidebar.retain_existing(&self.tree);
        self.rows = self.sidebar.project(&self.tree, &self.data.pages);
        if self.selected >= self.rows.len() {
            self.selected = self.rows.len().saturating_sub(1);
        }
    }

    /// Set a status message (will auto-dismiss after 3 seconds)
    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
        self.status_message_time = Some(Instant::now());
    }

    /// Check and clear expired status message
    pub fn check_status_timeout(&mut self) {
        if let Some(time) = self.status_message_time {
            if time.elapsed() > Duration::from_secs(3) {
                self.status_message = None;
                self.status_message_time = None;
            }
        }
    }

    /// Toggle help overlay
    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    /// The row under the cursor
    pub fn current_row(&self) -> Option<&TreeRow> {
        self.rows.get(self.selected)
    }

    fn current_id(&self) -> Option<PageId> {
        self.current_row().map(|row| row.id.clone())
    }

    /// The page shown in the right pane
    pub fn active_page(&self) -> Option<&Page> {
        self.data.active_page()
    }

    fn select_page(&mut self, id: &PageId) {
        if let Some(index) = self.rows.iter().position(|row| &row.id == id) {
            self.selected = index;
        }
    }

    pub fn move_up(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn move_down(&mut self) {
        if self.selected + 1 < self.rows.len() {
            self.selected += 1;
        }
    }

    pub fn move_to_first(&mut self) {
        self.selected = 0;
    }

    pub fn move_to_last(&mut self) {
        self.selected = self.rows.len().saturating_sub(1);
    }

    /// Toggle the selected page's children
    pub fn toggle_selected(&mut self) {
        if let Some(id) = self.current_id() {
            self.sidebar.toggle(&id);
            self.rebuild();
        }
    }

    /// Expand the selected page
    pub fn expand_selected(&mut self) {
        if let Some(id) = self.current_id() {
            self.sidebar.expand(&id);
            self.rebuild();
        }
    }

    /// Collapse the selected page, or move to its parent when already
    /// collapsed
    pub fn collapse_selected(&mut self) {
        let Some(row) = self.current_row().cloned() else {
            return;
        };
        if row.expanded && row.has_children {
            self.sidebar.collapse(&row.id);
            self.rebuild();
        } else if let Some(parent) = self.tree.parent(&row.id).cloned() {
            self.select_page(&parent);
        }
    }

    /// Make the selected page active and show its children
    ///
    /// Returns true when the active page changed.
    pub fn open_selected(&mut self) -> bool {
        let Some(id) = self.current_id() else {
            return false;
        };
        self.sidebar.expand(&id);
        let changed = self.data.active_page_id.as_ref() != Some(&id);
        if changed && self.data.set_active(&id).is_err() {
            return false;
        }
        self.rebuild();
        self.select_page(&id);
        changed
    }

    /// Start typing a title for a new root page
    pub fn begin_new_root(&mut self) {
        self.begin_title(TitleTarget::NewRoot, "");
    }

    /// Start typing a title for a child of the selected page
    pub fn begin_new_child(&mut self) {
        match self.current_id() {
            Some(parent) => self.begin_title(TitleTarget::NewChild(parent), ""),
            None => self.set_status("No page selected"),
        }
    }

    /// Start renaming the selected page
    pub fn begin_rename(&mut self) {
        let Some(row) = self.current_row().cloned() else {
            self.set_status("No page selected");
            return;
        };
        self.begin_title(TitleTarget::Rename(row.id), &row.title);
    }

    fn begin_title(&mut self, target: TitleTarget, initial: &str) {
        self.input_mode = InputMode::Title;
        self.title_target = Some(target);
        self.input = initial.to_string();
        self.cursor = self.input.chars().count();
    }

    /// Leave title mode without applying
    pub fn exit_input_mode(&mut self) {
        self.input_mode = InputMode::Normal;
        self.title_target = None;
        self.input.clear();
        self.cursor = 0;
    }

    /// Apply the typed title
    ///
    /// New pages become active and visible; a child's parent is expanded.
    /// Returns true when the workspace changed.
    pub fn submit_title(&mut self) -> bool {
        let title = self.input.trim().to_string();
        let target = self.title_target.take();
        self.exit_input_mode();

        let result = match target {
            Some(TitleTarget::NewRoot) => self.create_page(title, None),
            Some(TitleTarget::NewChild(parent)) => self.create_page(title, Some(parent)),
            Some(TitleTarget::Rename(id)) => self
                .data
                .rename_page(&id, title)
                .map(|()| id)
                .map_err(|e| e.to_string()),
            None => return false,
        };

        match result {
            Ok(id) => {
                self.rebuild();
                self.select_page(&id);
                true
            }
            Err(e) => {
                self.set_status(e);
                false
            }
        }
    }

    fn create_page(&mut self, title: String, parent: Option<PageId>) -> Result<PageId, String> {
        let id = self
            .data
            .add_page(title, parent.as_ref())
            .map_err(|e| e.to_string())?;
        if let Some(parent) = &parent {
            self.sidebar.expand(parent);
        }
        self.data.set_active(&id).map_err(|e| e.to_string())?;
        Ok(id)
    }

    /// Delete the selected page
    ///
    /// Its children stay in the workspace but leave the tree. Returns true
    /// when a page was removed.
    pub fn delete_selected(&mut self) -> bool {
        let Some(id) = self.current_id() else {
            return false;
        };
        match self.data.remove_page(&id) {
            Ok(page) => {
                let hidden = self.tree.children(Some(&id)).len();
                self.rebuild();
                let title = crate::output::display_title(&page.title).to_string();
                if hidden > 0 {
                    self.set_status(format!(
                        "Deleted '{}' ({} child page(s) now unreachable)",
                        title, hidden
                    ));
                } else {
                    self.set_status(format!("Deleted '{}'", title));
                }
                true
            }
            Err(e) => {
                self.set_status(e.to_string());
                false
            }
        }
    }

    /// Insert character at cursor position
    pub fn insert_char(&mut self, c: char) {
        let byte = self.byte_offset(self.cursor);
        self.input.insert(byte, c);
        self.cursor += 1;
    }

    /// Delete character before cursor
    pub fn delete_char(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let byte = self.byte_offset(self.cursor);
            self.input.remove(byte);
        }
    }

    pub fn cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        if self.cursor < self.input.chars().count() {
            self.cursor += 1;
        }
    }

    fn byte_offset(&self, chars: usize) -> usize {
        self.input
            .char_indices()
            .nth(chars)
            .map(|(i, _)| i)
            .unwrap_or(self.input.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_levels() -> (WorkspaceData, PageId, PageId, PageId) {
        let mut data = WorkspaceData::empty();
        let a = data.add_page("A", None).unwrap();
        let b = data.add_page("B", Some(&a)).unwrap();
        let c = data.add_page("C", Some(&b)).unwrap();
        (data, a, b, c)
    }

    fn titles(app: &App) -> Vec<(&str, usize)> {
        app.rows
            .iter()
            .map(|r| (r.title.as_str(), r.depth))
            .collect()
    }

    #[test]
    fn test_new_reveals_active_page() {
        let (mut data, _, _, c) = three_levels();
        data.set_active(&c).unwrap();
        let app = App::new(data, "neo");
        assert_eq!(titles(&app), vec![("A", 0), ("B", 1), ("C", 2)]);
        assert_eq!(app.current_row().unwrap().id, c);
    }

    #[test]
    fn test_toggle_and_navigation() {
        let (data, _, _, _) = three_levels();
        let mut app = App::new(data, "neo");
        assert_eq!(titles(&app), vec![("A", 0)]);

        app.toggle_selected();
        assert_eq!(titles(&app), vec![("A", 0), ("B", 1)]);

        app.move_down();
        app.expand_selected();
        assert_eq!(titles(&app), vec![("A", 0), ("B", 1), ("C", 2)]);

        app.move_down();
        app.move_down();
        assert_eq!(app.selected, 2);

        // Collapsing a leaf moves to its parent
        app.collapse_selected();
        assert_eq!(app.current_row().unwrap().title, "B");
        app.collapse_selected();
        assert_eq!(titles(&app), vec![("A", 0), ("B", 1)]);
    }

    #[test]
    fn test_open_selected_sets_active() {
        let (data, a, _, _) = three_levels();
        let mut app = App::new(data, "neo");
        assert!(app.open_selected());
        assert_eq!(app.data.active_page_id, Some(a));
        assert_eq!(app.rows.len(), 2);
        // Already active
        assert!(!app.open_selected());
    }

    #[test]
    fn test_new_child_expands_parent() {
        let mut data = WorkspaceData::empty();
        let root = data.add_page("Root", None).unwrap();
        let mut app = App::new(data, "neo");

        app.begin_new_child();
        assert_eq!(app.input_mode, InputMode::Title);
        for c in "Intel".chars() {
            app.insert_char(c);
        }
        assert!(app.submit_title());

        assert_eq!(app.input_mode, InputMode::Normal);
        assert!(app.sidebar.is_expanded(&root));
        assert_eq!(titles(&app), vec![("Root", 0), ("Intel", 1)]);
        assert_eq!(app.current_row().unwrap().title, "Intel");
        assert_eq!(app.active_page().unwrap().title, "Intel");
    }

    #[test]
    fn test_rename_prefills_title() {
        let mut data = WorkspaceData::empty();
        data.add_page("Old", None).unwrap();
        let mut app = App::new(data, "neo");

        app.begin_rename();
        assert_eq!(app.input, "Old");
        app.delete_char();
        app.delete_char();
        app.delete_char();
        app.insert_char('N');
        app.insert_char('ü');
        app.cursor_left();
        app.insert_char('e');
        assert_eq!(app.input, "Neü");
        assert!(app.submit_title());
        assert_eq!(app.data.pages[0].title, "Neü");
    }

    #[test]
    fn test_delete_hides_children() {
        let (data, _, _, _) = three_levels();
        let mut app = App::new(data, "neo");
        app.sidebar.expand_all(&app.data.tree());
        app.rebuild();
        app.move_down();

        assert!(app.delete_selected());
        assert_eq!(titles(&app), vec![("A", 0)]);
        assert_eq!(app.data.pages.len(), 2);
        assert!(app
            .status_message
            .as_deref()
            .unwrap()
            .contains("1 child page(s)"));
    }

    #[test]
    fn test_empty_workspace() {
        let mut app = App::new(WorkspaceData::empty(), "neo");
        assert!(app.rows.is_empty());
        app.move_down();
        assert_eq!(app.selected, 0);
        assert!(!app.delete_selected());
        assert!(!app.open_selected());

        app.begin_new_root();
        app.insert_char('X');
        assert!(app.submit_title());
        assert_eq!(titles(&app), vec![("X", 0)]);
    }
}
