//! Page command handlers

use anyhow::{Context, Result};

use cyberpad_core::Sidebar;

use super::{resolve_page, Session};
use crate::editor::confirm;
use crate::output::{display_title, Output};

/// List pages as a tree
///
/// The sidebar starts collapsed; `all` expands everything and `expand`
/// opens specific pages. The active page's ancestors are always opened so
/// it stays visible.
pub fn list(session: &mut Session, all: bool, expand: Vec<String>, output: &Output) -> Result<()> {
    let data = session.load()?;
    let tree = data.tree();
    let mut sidebar = Sidebar::new();

    if all {
        sidebar.expand_all(&tree);
    }
    for id in &expand {
        sidebar.expand(&resolve_page(&data, id)?);
    }
    if let Some(active) = data.active_page() {
        sidebar.reveal(&tree, &active.id);
    }

    let rows = sidebar.project(&tree, &data.pages);
    output.print_tree(&rows, data.active_page_id.as_ref().map(|id| id.as_str()));

    let hidden = data
        .pages
        .iter()
        .filter(|p| !tree.is_reachable(&p.id))
        .count();
    if hidden > 0 && !output.is_json() {
        output.message(&format!(
            "\n{} page(s) unreachable from the root. Run `cyberpad check` for details.",
            hidden
        ));
    }
    Ok(())
}

/// Create a new page, optionally under a parent
pub fn create(
    session: &mut Session,
    title: String,
    parent: Option<String>,
    open: bool,
    output: &Output,
) -> Result<()> {
    let mut data = session.load()?;
    let parent_id = parent.map(|p| resolve_page(&data, &p)).transpose()?;

    let id = data
        .add_page(title.clone(), parent_id.as_ref())
        .context("Failed to create page")?;
    if open {
        data.set_active(&id)?;
    }
    session.save(&data)?;

    output.created(
        id.as_str(),
        &format!("Created page {} - {}", id.short(), display_title(&title)),
    );
    Ok(())
}

/// Show a page and its blocks
pub fn show(session: &mut Session, id: String, output: &Output) -> Result<()> {
    let data = session.load()?;
    let page_id = resolve_page(&data, &id)?;
    let page = data
        .page(&page_id)
        .ok_or_else(|| anyhow::anyhow!("Page not found: {}", id))?;

    let parent_title = page
        .parent_id
        .as_ref()
        .and_then(|parent| data.page(parent))
        .map(|parent| display_title(&parent.title));
    output.print_page(page, parent_title);
    Ok(())
}

/// Change a page title
pub fn rename(session: &mut Session, id: String, title: String, output: &Output) -> Result<()> {
    let mut data = session.load()?;
    let page_id = resolve_page(&data, &id)?;
    data.rename_page(&page_id, title.clone())?;
    session.save(&data)?;

    output.success(&format!(
        "Renamed page {} to {}",
        page_id.short(),
        display_title(&title)
    ));
    Ok(())
}

/// Make a page the active one
pub fn open(session: &mut Session, id: String, output: &Output) -> Result<()> {
    let mut data = session.load()?;
    let page_id = resolve_page(&data, &id)?;
    data.set_active(&page_id)?;
    session.save(&data)?;

    output.success(&format!("Opened page {}", page_id.short()));
    Ok(())
}

/// Delete a page
///
/// Child pages are not deleted; they keep pointing at the removed page and
/// drop out of the tree.
pub fn delete(session: &mut Session, id: String, output: &Output) -> Result<()> {
    let mut data = session.load()?;
    let page_id = resolve_page(&data, &id)?;
    let children = data.tree().children(Some(&page_id)).len();

    if output.should_prompt() {
        let title = data
            .page(&page_id)
            .map(|p| display_title(&p.title).to_string())
            .unwrap_or_default();
        println!("Delete page: {} - {}", page_id.short(), title);
        if children > 0 {
            println!(
                "Its {} child page(s) will be kept but become unreachable.",
                children
            );
        }
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    data.remove_page(&page_id)?;
    session.save(&data)?;

    output.success(&format!("Deleted page: {}", page_id.short()));
    Ok(())
}
