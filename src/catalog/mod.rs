//! Page/role catalog and its once-per-session loader
//!
//! The catalog is read-only after construction. Roles that point at a page
//! missing from the catalog are dropped so that no grant can ever reference a
//! role without a page.

use std::collections::HashMap;

use crate::client::MatrixBackend;
use crate::types::{CatalogPayload, Page, PageId, Role, RoleId};

/// Immutable catalog of pages and the roles belonging to each page
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pages: Vec<Page>,
    roles: Vec<Role>,
    /// role id -> index into `roles`
    role_index: HashMap<RoleId, usize>,
    /// page id -> role ids in catalog order
    roles_by_page: HashMap<PageId, Vec<RoleId>>,
}

impl Catalog {
    /// Build a catalog, dropping duplicates, orphan roles and non-positive ids
    pub fn new(pages: Vec<Page>, roles: Vec<Role>) -> Self {
        let mut kept_pages: Vec<Page> = Vec::with_capacity(pages.len());
        let mut roles_by_page: HashMap<PageId, Vec<RoleId>> = HashMap::new();

        for page in pages {
            if page.id <= 0 {
                tracing::warn!("Dropping page '{}': id {} is not positive", page.name, page.id);
                continue;
            }
            if roles_by_page.contains_key(&page.id) {
                tracing::warn!("Duplicate page id {} in catalog, keeping first", page.id);
                continue;
            }
            roles_by_page.insert(page.id, Vec::new());
            kept_pages.push(page);
        }

        let mut kept_roles: Vec<Role> = Vec::with_capacity(roles.len());
        let mut role_index = HashMap::new();

        for role in roles {
            if role.id <= 0 {
                tracing::warn!("Dropping role '{}': id {} is not positive", role.name, role.id);
                continue;
            }
            if role_index.contains_key(&role.id) {
                tracing::warn!("Duplicate role id {} in catalog, keeping first", role.id);
                continue;
            }
            let Some(page_roles) = roles_by_page.get_mut(&role.page_id) else {
                tracing::warn!(
                    "Dropping role {} ({}): page {} is not in the catalog",
                    role.id,
                    role.name,
                    role.page_id
                );
                continue;
            };
            page_roles.push(role.id);
            role_index.insert(role.id, kept_roles.len());
            kept_roles.push(role);
        }

        Self {
            pages: kept_pages,
            roles: kept_roles,
            role_index,
            roles_by_page,
        }
    }

    /// Catalog with no pages and no roles
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    pub fn page(&self, page_id: PageId) -> Option<&Page> {
        self.pages.iter().find(|p| p.id == page_id)
    }

    pub fn role(&self, role_id: RoleId) -> Option<&Role> {
        self.role_index.get(&role_id).map(|&i| &self.roles[i])
    }

    pub fn contains_page(&self, page_id: PageId) -> bool {
        self.roles_by_page.contains_key(&page_id)
    }

    pub fn contains_role(&self, role_id: RoleId) -> bool {
        self.role_index.contains_key(&role_id)
    }

    /// Page owning a role
    pub fn page_of(&self, role_id: RoleId) -> Option<PageId> {
        self.role(role_id).map(|r| r.page_id)
    }

    /// Role ids of a page in catalog order (empty for an unknown page)
    pub fn role_ids_of(&self, page_id: PageId) -> &[RoleId] {
        self.roles_by_page
            .get(&page_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Roles of a page in catalog order
    pub fn roles_of(&self, page_id: PageId) -> impl Iterator<Item = &Role> + '_ {
        self.role_ids_of(page_id)
            .iter()
            .filter_map(move |id| self.role(*id))
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn role_count(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

impl From<CatalogPayload> for Catalog {
    fn from(payload: CatalogPayload) -> Self {
        Catalog::new(payload.pages, payload.roles)
    }
}

/// Outcome of the catalog fetch for the current session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogState {
    NotLoaded,
    Loaded,
    Failed(String),
}

/// Fetches the catalog at most once per editor session
#[derive(Debug)]
pub struct CatalogLoader {
    state: CatalogState,
    catalog: Catalog,
}

impl Default for CatalogLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogLoader {
    pub fn new() -> Self {
        Self {
            state: CatalogState::NotLoaded,
            catalog: Catalog::empty(),
        }
    }

    pub fn state(&self) -> &CatalogState {
        &self.state
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Fetch the catalog unless this session already tried.
    ///
    /// Failures leave an empty catalog in place and are recorded in
    /// [`CatalogLoader::state`] instead of being returned.
    pub async fn load<B>(&mut self, backend: &B) -> &Catalog
    where
        B: MatrixBackend + ?Sized,
    {
        if self.state != CatalogState::NotLoaded {
            return &self.catalog;
        }

        match backend.fetch_catalog().await {
            Ok(payload) => {
                self.catalog = Catalog::from(payload);
                tracing::info!(
                    "Loaded catalog: {} pages, {} roles",
                    self.catalog.page_count(),
                    self.catalog.role_count()
                );
                self.state = CatalogState::Loaded;
            }
            Err(e) => {
                tracing::error!("Catalog load failed: {}", e);
                self.catalog = Catalog::empty();
                self.state = CatalogState::Failed(e.user_message());
            }
        }

        &self.catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(id: PageId, name: &str) -> Page {
        Page {
            id,
            name: name.to_string(),
        }
    }

    fn role(id: RoleId, page_id: PageId, name: &str) -> Role {
        Role {
            id,
            page_id,
            name: name.to_string(),
        }
    }

    #[test]
    fn test_roles_grouped_by_page_in_order() {
        let catalog = Catalog::new(
            vec![page(1, "Students"), page(2, "Users")],
            vec![
                role(11, 1, "Edit"),
                role(20, 2, "View"),
                role(10, 1, "View"),
            ],
        );

        assert_eq!(catalog.role_ids_of(1), &[11, 10]);
        assert_eq!(catalog.role_ids_of(2), &[20]);
        assert_eq!(catalog.page_of(10), Some(1));
        let names: Vec<&str> = catalog.roles_of(1).map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Edit", "View"]);
    }

    #[test]
    fn test_orphan_roles_dropped() {
        let catalog = Catalog::new(
            vec![page(1, "Students")],
            vec![role(10, 1, "View"), role(99, 7, "Ghost")],
        );

        assert!(catalog.contains_role(10));
        assert!(!catalog.contains_role(99));
        assert_eq!(catalog.role_count(), 1);
    }

    #[test]
    fn test_duplicates_keep_first() {
        let catalog = Catalog::new(
            vec![page(1, "Students"), page(1, "Again")],
            vec![role(10, 1, "View"), role(10, 1, "Copy")],
        );

        assert_eq!(catalog.page_count(), 1);
        assert_eq!(catalog.page(1).unwrap().name, "Students");
        assert_eq!(catalog.role(10).unwrap().name, "View");
        assert_eq!(catalog.role_ids_of(1), &[10]);
    }

    #[test]
    fn test_non_positive_ids_dropped() {
        let catalog = Catalog::new(
            vec![page(-1, "Negative"), page(0, "Zero"), page(1, "Students")],
            vec![
                role(5, -1, "Under negative"),
                role(-3, 1, "Negative"),
                role(0, 1, "Zero"),
                role(10, 1, "View"),
            ],
        );

        assert_eq!(catalog.page_count(), 1);
        assert!(!catalog.contains_page(-1));
        assert!(!catalog.contains_role(5));
        assert_eq!(catalog.role_ids_of(1), &[10]);
    }

    #[test]
    fn test_unknown_page_has_no_roles() {
        let catalog = Catalog::empty();
        assert!(catalog.is_empty());
        assert!(catalog.role_ids_of(42).is_empty());
        assert!(catalog.page(42).is_none());
    }
}
