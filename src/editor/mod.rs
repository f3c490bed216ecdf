//! Matrix editor session
//!
//! One editor is one editing session for one group: the catalog is fetched
//! once on open, the selection is seeded from the group's existing grants,
//! panel clicks mutate the selection in memory, and `save` flushes it.

use std::sync::Arc;

use crate::bridge::{parse_grants, GroupUpdate, SaveGate};
use crate::catalog::{Catalog, CatalogLoader, CatalogState};
use crate::client::MatrixBackend;
use crate::error::{MatrixError, Result};
use crate::panels::{PagePanel, PagePanelView, RolePanel, RolePanelView};
use crate::selection::SelectionStore;
use crate::types::{Grant, GroupDetail, GroupFields, PageId, RoleId};

/// Editing session for one group's grants
pub struct MatrixEditor {
    backend: Arc<dyn MatrixBackend>,
    loader: CatalogLoader,
    store: SelectionStore,
    fields: GroupFields,
    focused: Option<PageId>,
    save_gate: SaveGate,
}

impl MatrixEditor {
    /// Open an editor for an existing group.
    ///
    /// A failed catalog fetch does not fail the open; see
    /// [`MatrixEditor::catalog_error`]. A failed group fetch does.
    pub async fn open(backend: Arc<dyn MatrixBackend>, group_id: i64) -> Result<Self> {
        let mut loader = CatalogLoader::new();
        let (_, group) = tokio::join!(
            loader.load(backend.as_ref()),
            backend.fetch_group(group_id)
        );
        let detail = group?;

        let grants = initial_grants(&detail, loader.catalog());
        let mut store = SelectionStore::new();
        store.seed(&grants);
        store.set_catalog(loader.catalog().clone());

        tracing::info!(
            "Opened group {} ({}) with {} granted roles",
            detail.group_id,
            detail.group_name,
            store.len()
        );

        Ok(Self {
            backend,
            loader,
            store,
            fields: GroupFields::from(&detail),
            focused: None,
            save_gate: SaveGate::new(),
        })
    }

    /// Open an editor for a group that does not exist yet. The selection starts empty.
    pub async fn create(backend: Arc<dyn MatrixBackend>, fields: GroupFields) -> Self {
        let mut loader = CatalogLoader::new();
        loader.load(backend.as_ref()).await;
        let store = SelectionStore::with_catalog(loader.catalog().clone());

        Self {
            backend,
            loader,
            store,
            fields: GroupFields {
                group_id: None,
                ..fields
            },
            focused: None,
            save_gate: SaveGate::new(),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        self.store.catalog()
    }

    pub fn catalog_state(&self) -> &CatalogState {
        self.loader.state()
    }

    /// Message for the operator when the catalog could not be loaded
    pub fn catalog_error(&self) -> Option<&str> {
        match self.loader.state() {
            CatalogState::Failed(message) => Some(message),
            _ => None,
        }
    }

    pub fn fields(&self) -> &GroupFields {
        &self.fields
    }

    pub fn set_group_name(&mut self, name: impl Into<String>) {
        self.fields.group_name = name.into();
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.fields.description = description.into();
    }

    pub fn set_status(&mut self, status: i32) {
        self.fields.status = status;
    }

    pub fn store(&self) -> &SelectionStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut SelectionStore {
        &mut self.store
    }

    pub fn focused_page(&self) -> Option<PageId> {
        self.focused
    }

    /// Focus a page for the role panel. Unknown pages leave focus unchanged.
    pub fn focus_page(&mut self, page_id: PageId) -> bool {
        match PagePanel::click_row(&self.store, page_id) {
            Some(page_id) => {
                self.focused = Some(page_id);
                true
            }
            None => false,
        }
    }

    pub fn page_panel(&self) -> PagePanelView {
        PagePanel::render(&self.store, self.focused)
    }

    pub fn role_panel(&self) -> RolePanelView {
        RolePanel::render(&self.store, self.focused)
    }

    pub fn click_page_checkbox(&mut self, page_id: PageId) {
        PagePanel::click_checkbox(&mut self.store, page_id);
    }

    pub fn click_all_pages(&mut self) {
        PagePanel::click_header(&mut self.store);
    }

    pub fn click_role(&mut self, role_id: RoleId) {
        RolePanel::click_role(&mut self.store, self.focused, role_id);
    }

    pub fn click_role_header(&mut self) {
        RolePanel::click_header(&mut self.store, self.focused);
    }

    /// Whether a save is outstanding; a front end disables its save action meanwhile
    pub fn is_saving(&self) -> bool {
        self.save_gate.is_in_flight()
    }

    /// Submit the current selection with the group fields.
    ///
    /// On failure the in-memory selection is untouched so the operator can retry.
    pub async fn save(&self) -> Result<GroupUpdate> {
        if let CatalogState::Failed(message) = self.loader.state() {
            return Err(MatrixError::CatalogUnavailable(message.clone()));
        }
        if self.fields.group_name.trim().is_empty() {
            return Err(MatrixError::InvalidInput("group name is required".into()));
        }

        let _ticket = self.save_gate.acquire()?;
        let body = GroupUpdate::new(&self.fields, &self.store.snapshot());

        let result = match self.fields.group_id {
            Some(group_id) => self.backend.update_group(group_id, &body).await,
            None => self.backend.create_group(&body).await,
        };

        match result {
            Ok(()) => {
                tracing::info!(
                    "Saved group '{}' with {} grants",
                    self.fields.group_name,
                    self.store.len()
                );
                Ok(body)
            }
            Err(e) => {
                tracing::error!("Saving group '{}' failed: {}", self.fields.group_name, e);
                Err(e)
            }
        }
    }
}

/// Grants to seed the selection with.
///
/// Prefers the explicit `groupPage` pair list. Without it, every role of
/// each page in `pageRoles` is assumed granted, which cannot express a page
/// that is only partly granted.
pub fn initial_grants(detail: &GroupDetail, catalog: &Catalog) -> Vec<Grant> {
    if let Some(encoded) = &detail.group_page {
        if !encoded.trim().is_empty() || detail.page_roles.is_empty() {
            match parse_grants(encoded) {
                Ok(grants) => return grants,
                Err(e) => tracing::warn!(
                    "Group {} has unreadable grants ({}), falling back to page list",
                    detail.group_id,
                    e
                ),
            }
        }
    }

    if !detail.page_roles.is_empty() {
        tracing::warn!(
            "Group {} has no explicit grants; granting every role of {} pages",
            detail.group_id,
            detail.page_roles.len()
        );
    }

    detail
        .page_roles
        .iter()
        .flat_map(|page| {
            catalog
                .role_ids_of(page.id)
                .iter()
                .map(move |role_id| Grant::new(page.id, *role_id))
        })
        .collect()
}
