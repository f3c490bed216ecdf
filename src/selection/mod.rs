//! Selection state store
//!
//! Single source of truth for which (page, role) pairs are granted. The set is
//! keyed by role id since a role implies its page. Page and catalog statuses
//! are derived on every read from `(selection, catalog)` and never cached.

use std::collections::HashSet;

use crate::catalog::Catalog;
use crate::types::{Grant, PageId, RoleId, SelectionStatus};

/// Selected roles plus the catalog they are validated against
#[derive(Debug, Clone, Default)]
pub struct SelectionStore {
    catalog: Catalog,
    /// Whether a catalog has been attached yet
    attached: bool,
    selected: HashSet<RoleId>,
    /// Seed received before the catalog; reconciled in `set_catalog`
    pending_seed: Option<Vec<Grant>>,
}

impl SelectionStore {
    /// Store with no catalog yet; reads behave as if the catalog were empty
    pub fn new() -> Self {
        Self::default()
    }

    /// Store bound to an already loaded catalog
    pub fn with_catalog(catalog: Catalog) -> Self {
        let mut store = Self::new();
        store.set_catalog(catalog);
        store
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Attach (or replace) the catalog, dropping selected ids it does not know
    pub fn set_catalog(&mut self, catalog: Catalog) {
        self.catalog = catalog;
        self.attached = true;

        if let Some(seed) = self.pending_seed.take() {
            self.apply_seed(&seed);
        } else {
            let before = self.selected.len();
            let catalog = &self.catalog;
            self.selected.retain(|id| catalog.contains_role(*id));
            let dropped = before - self.selected.len();
            if dropped > 0 {
                tracing::warn!("Dropped {} selected roles missing from new catalog", dropped);
            }
        }
    }

    /// Replace the selection wholesale with `grants`.
    ///
    /// Grants whose (page, role) pair is not in the catalog are dropped. A
    /// role filed under the wrong page counts as absent. Before a catalog
    /// is attached the seed is held and applied once it arrives.
    pub fn seed(&mut self, grants: &[Grant]) {
        if !self.attached {
            tracing::debug!("Holding seed of {} grants until catalog loads", grants.len());
            self.selected.clear();
            self.pending_seed = Some(grants.to_vec());
            return;
        }
        self.pending_seed = None;
        self.apply_seed(grants);
    }

    fn apply_seed(&mut self, grants: &[Grant]) {
        self.selected.clear();
        let mut dropped = 0usize;
        for grant in grants {
            if self.catalog.page_of(grant.role_id) == Some(grant.page_id) {
                self.selected.insert(grant.role_id);
            } else {
                dropped += 1;
            }
        }
        if dropped > 0 {
            tracing::warn!(
                "Dropped {} seeded grants not present in the catalog",
                dropped
            );
        }
        tracing::debug!("Seeded selection with {} roles", self.selected.len());
    }

    /// Flip membership of a single role. Unknown ids are ignored.
    pub fn toggle_role(&mut self, role_id: RoleId) {
        if !self.catalog.contains_role(role_id) {
            tracing::debug!("Ignoring toggle of unknown role {}", role_id);
            return;
        }
        if !self.selected.remove(&role_id) {
            self.selected.insert(role_id);
        }
    }

    /// Select (`target == true`) or deselect every role of a page
    pub fn toggle_page(&mut self, page_id: PageId, target: bool) {
        let role_ids = self.catalog.role_ids_of(page_id);
        if target {
            self.selected.extend(role_ids.iter().copied());
        } else {
            for id in role_ids {
                self.selected.remove(id);
            }
        }
        tracing::debug!(
            "Page {} set to {}: {} roles affected",
            page_id,
            target,
            role_ids.len()
        );
    }

    /// Select every role of every page, or clear the selection
    pub fn select_all_pages(&mut self, target: bool) {
        if target {
            self.selected.extend(self.catalog.roles().iter().map(|r| r.id));
        } else {
            self.selected.clear();
            self.pending_seed = None;
        }
    }

    pub fn is_role_selected(&self, role_id: RoleId) -> bool {
        self.selected.contains(&role_id)
    }

    /// Number of selected roles belonging to a page
    pub fn selected_in_page(&self, page_id: PageId) -> usize {
        self.catalog
            .role_ids_of(page_id)
            .iter()
            .filter(|id| self.selected.contains(*id))
            .count()
    }

    pub fn page_status(&self, page_id: PageId) -> SelectionStatus {
        let total = self.catalog.role_ids_of(page_id).len();
        SelectionStatus::classify(self.selected_in_page(page_id), total)
    }

    pub fn all_pages_status(&self) -> SelectionStatus {
        SelectionStatus::classify(self.selected.len(), self.catalog.role_count())
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Current selection in catalog order
    pub fn snapshot(&self) -> Vec<Grant> {
        self.catalog
            .pages()
            .iter()
            .flat_map(|page| {
                self.catalog
                    .role_ids_of(page.id)
                    .iter()
                    .filter(|id| self.selected.contains(*id))
                    .map(move |id| Grant::new(page.id, *id))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Page, Role};

    fn page(id: PageId, name: &str) -> Page {
        Page {
            id,
            name: name.to_string(),
        }
    }

    fn role(id: RoleId, page_id: PageId) -> Role {
        Role {
            id,
            page_id,
            name: format!("Role {}", id),
        }
    }

    /// Pages {1: [10, 11]}, {2: [20]}, {3: []}
    fn catalog() -> Catalog {
        Catalog::new(
            vec![page(1, "Students"), page(2, "Users"), page(3, "Reports")],
            vec![role(10, 1), role(11, 1), role(20, 2)],
        )
    }

    #[test]
    fn test_scenario_students_and_users() {
        let mut store = SelectionStore::with_catalog(catalog());
        store.seed(&[Grant::new(1, 10)]);

        assert_eq!(store.page_status(1), SelectionStatus::Partial);
        assert_eq!(store.page_status(2), SelectionStatus::Empty);

        store.toggle_role(11);
        assert_eq!(store.page_status(1), SelectionStatus::Full);

        store.toggle_page(2, true);
        assert_eq!(store.all_pages_status(), SelectionStatus::Full);

        let ids: HashSet<RoleId> = store.snapshot().iter().map(|g| g.role_id).collect();
        assert_eq!(ids, HashSet::from([10, 11, 20]));
    }

    #[test]
    fn test_toggle_unknown_role_is_noop() {
        let mut store = SelectionStore::with_catalog(catalog());
        store.seed(&[Grant::new(1, 10)]);
        store.toggle_role(999);
        assert_eq!(store.snapshot(), vec![Grant::new(1, 10)]);
    }

    #[test]
    fn test_toggle_role_twice_restores() {
        let mut store = SelectionStore::with_catalog(catalog());
        store.toggle_role(20);
        assert!(store.is_role_selected(20));
        store.toggle_role(20);
        assert!(!store.is_role_selected(20));
    }

    #[test]
    fn test_empty_page_is_none() {
        let mut store = SelectionStore::with_catalog(catalog());
        assert_eq!(store.page_status(3), SelectionStatus::Empty);
        store.toggle_page(3, true);
        assert_eq!(store.page_status(3), SelectionStatus::Empty);
        assert!(store.is_empty());
    }

    #[test]
    fn test_toggle_page_off_clears_only_that_page() {
        let mut store = SelectionStore::with_catalog(catalog());
        store.select_all_pages(true);
        store.toggle_page(1, false);

        assert_eq!(store.page_status(1), SelectionStatus::Empty);
        assert_eq!(store.page_status(2), SelectionStatus::Full);
        assert_eq!(store.all_pages_status(), SelectionStatus::Partial);
    }

    #[test]
    fn test_seed_replaces_not_merges() {
        let mut store = SelectionStore::with_catalog(catalog());
        store.seed(&[Grant::new(1, 10), Grant::new(1, 11)]);
        store.seed(&[Grant::new(2, 20)]);
        assert_eq!(store.snapshot(), vec![Grant::new(2, 20)]);
    }

    #[test]
    fn test_seed_drops_unknown_roles() {
        let mut store = SelectionStore::with_catalog(catalog());
        store.seed(&[Grant::new(1, 10), Grant::new(9, 999)]);
        assert_eq!(store.snapshot(), vec![Grant::new(1, 10)]);
    }

    #[test]
    fn test_seed_before_catalog_is_reconciled() {
        let mut store = SelectionStore::new();
        store.seed(&[Grant::new(1, 11), Grant::new(9, 999)]);

        // Nothing is visible without a catalog
        assert!(store.is_empty());
        assert_eq!(store.all_pages_status(), SelectionStatus::Empty);
        store.toggle_role(11);
        assert!(!store.is_role_selected(11));

        store.set_catalog(catalog());
        assert_eq!(store.snapshot(), vec![Grant::new(1, 11)]);
    }

    #[test]
    fn test_new_catalog_drops_vanished_roles() {
        let mut store = SelectionStore::with_catalog(catalog());
        store.select_all_pages(true);

        store.set_catalog(Catalog::new(vec![page(1, "Students")], vec![role(10, 1)]));

        assert_eq!(store.snapshot(), vec![Grant::new(1, 10)]);
        assert_eq!(store.all_pages_status(), SelectionStatus::Full);
    }

    #[test]
    fn test_seed_drops_role_under_wrong_page() {
        let mut store = SelectionStore::with_catalog(catalog());
        store.seed(&[Grant::new(2, 10), Grant::new(2, 20)]);
        assert!(!store.is_role_selected(10));
        assert_eq!(store.snapshot(), vec![Grant::new(2, 20)]);
        assert_eq!(store.page_status(1), SelectionStatus::Empty);
    }

    #[test]
    fn test_late_seed_drops_role_under_wrong_page() {
        let mut store = SelectionStore::new();
        store.seed(&[Grant::new(2, 10), Grant::new(1, 11)]);
        store.set_catalog(catalog());
        assert_eq!(store.snapshot(), vec![Grant::new(1, 11)]);
    }

    #[test]
    fn test_select_all_false_clears() {
        let mut store = SelectionStore::with_catalog(catalog());
        store.select_all_pages(true);
        assert_eq!(store.len(), 3);
        store.select_all_pages(false);
        assert!(store.is_empty());
        assert_eq!(store.all_pages_status(), SelectionStatus::Empty);
    }
}
