//! Page and role panels
//!
//! Both panels are stateless: they render rows from the [`SelectionStore`]
//! and write clicks back to it. The only UI state they share is the focused
//! page, owned by the caller.

use serde::Serialize;

use crate::selection::SelectionStore;
use crate::types::{PageId, RoleId, SelectionStatus};

/// Checkbox rendering state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckState {
    Unchecked,
    Indeterminate,
    Checked,
}

impl From<SelectionStatus> for CheckState {
    fn from(status: SelectionStatus) -> Self {
        match status {
            SelectionStatus::Empty => CheckState::Unchecked,
            SelectionStatus::Partial => CheckState::Indeterminate,
            SelectionStatus::Full => CheckState::Checked,
        }
    }
}

impl CheckState {
    /// Terminal glyph
    pub fn glyph(&self) -> &'static str {
        match self {
            CheckState::Unchecked => "[ ]",
            CheckState::Indeterminate => "[-]",
            CheckState::Checked => "[x]",
        }
    }
}

/// One row of the page panel
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageRow {
    pub page_id: PageId,
    pub name: String,
    pub check: CheckState,
    pub focused: bool,
    pub selected_roles: usize,
    pub total_roles: usize,
}

/// Rendered page panel
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PagePanelView {
    /// "Select all pages" header checkbox
    pub header: CheckState,
    pub rows: Vec<PageRow>,
}

impl PagePanelView {
    /// No catalog to show
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Page list with page-level and catalog-level select-all
pub struct PagePanel;

impl PagePanel {
    pub fn render(store: &SelectionStore, focused: Option<PageId>) -> PagePanelView {
        let catalog = store.catalog();
        let rows = catalog
            .pages()
            .iter()
            .map(|page| PageRow {
                page_id: page.id,
                name: page.name.clone(),
                check: store.page_status(page.id).into(),
                focused: focused == Some(page.id),
                selected_roles: store.selected_in_page(page.id),
                total_roles: catalog.role_ids_of(page.id).len(),
            })
            .collect();

        PagePanelView {
            header: store.all_pages_status().into(),
            rows,
        }
    }

    /// Page checkbox click: a partially selected page becomes fully selected
    pub fn click_checkbox(store: &mut SelectionStore, page_id: PageId) {
        let fully_selected = store.page_status(page_id).is_full();
        store.toggle_page(page_id, !fully_selected);
    }

    /// Page row click: focuses the page, selection is left alone.
    ///
    /// Returns the new focus, or `None` if the page is not in the catalog.
    pub fn click_row(store: &SelectionStore, page_id: PageId) -> Option<PageId> {
        store.catalog().contains_page(page_id).then_some(page_id)
    }

    pub fn click_header(store: &mut SelectionStore) {
        let all_selected = store.all_pages_status().is_full();
        store.select_all_pages(!all_selected);
    }
}

/// One row of the role panel
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleRow {
    pub role_id: RoleId,
    pub name: String,
    pub checked: bool,
}

/// Rendered role panel
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RolePanelView {
    /// Empty state: no page has been focused yet
    NoPageFocused,
    Roles {
        page_id: PageId,
        page_name: String,
        /// Per-page "select all roles" checkbox
        header: CheckState,
        rows: Vec<RoleRow>,
    },
}

impl RolePanelView {
    pub const EMPTY_MESSAGE: &'static str = "Select a page first";
}

/// Roles of the focused page
pub struct RolePanel;

impl RolePanel {
    pub fn render(store: &SelectionStore, focused: Option<PageId>) -> RolePanelView {
        let catalog = store.catalog();
        let Some(page) = focused.and_then(|id| catalog.page(id)) else {
            return RolePanelView::NoPageFocused;
        };

        let rows = catalog
            .roles_of(page.id)
            .map(|role| RoleRow {
                role_id: role.id,
                name: role.name.clone(),
                checked: store.is_role_selected(role.id),
            })
            .collect();

        RolePanelView::Roles {
            page_id: page.id,
            page_name: page.name.clone(),
            header: store.page_status(page.id).into(),
            rows,
        }
    }

    /// Role checkbox click. Roles outside the focused page are ignored.
    pub fn click_role(store: &mut SelectionStore, focused: Option<PageId>, role_id: RoleId) {
        let Some(page_id) = focused else {
            return;
        };
        if store.catalog().page_of(role_id) != Some(page_id) {
            tracing::debug!("Role {} is not on focused page {}", role_id, page_id);
            return;
        }
        store.toggle_role(role_id);
    }

    /// Header click: same effect as the page panel's checkbox for this page
    pub fn click_header(store: &mut SelectionStore, focused: Option<PageId>) {
        if let Some(page_id) = focused {
            PagePanel::click_checkbox(store, page_id);
        }
    }
}
