//! Core types for the grant matrix

use serde::{Deserialize, Serialize};

/// Identifier of a page (functional area)
pub type PageId = i64;

/// Identifier of a role (permitted action within one page)
pub type RoleId = i64;

/// A functional area access can be granted to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub id: PageId,
    pub name: String,
}

/// A permitted action within exactly one page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: RoleId,
    pub page_id: PageId,
    pub name: String,
}

/// A (page, role) pair granted to a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Grant {
    pub page_id: PageId,
    pub role_id: RoleId,
}

impl Grant {
    pub fn new(page_id: PageId, role_id: RoleId) -> Self {
        Self { page_id, role_id }
    }
}

/// Derived selection status of a page, or of the whole catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionStatus {
    /// No role selected (also used for a page with zero roles)
    #[serde(rename = "none")]
    Empty,
    /// Some but not all roles selected
    Partial,
    /// Every role selected
    #[serde(rename = "all")]
    Full,
}

impl SelectionStatus {
    /// Classify `selected` out of `total` items
    pub fn classify(selected: usize, total: usize) -> Self {
        if selected == 0 || total == 0 {
            SelectionStatus::Empty
        } else if selected >= total {
            SelectionStatus::Full
        } else {
            SelectionStatus::Partial
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionStatus::Empty => "none",
            SelectionStatus::Partial => "partial",
            SelectionStatus::Full => "all",
        }
    }

    pub fn is_full(&self) -> bool {
        matches!(self, SelectionStatus::Full)
    }
}

impl std::fmt::Display for SelectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of `GET /auth/page`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogPayload {
    #[serde(default)]
    pub pages: Vec<Page>,
    #[serde(default)]
    pub roles: Vec<Role>,
}

/// Group activation flag as the backend encodes it
pub const GROUP_STATUS_ACTIVE: i32 = 1;

/// Group detail returned by `GET /auth/group/{id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupDetail {
    pub group_id: i64,
    pub group_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_group_status")]
    pub status: i32,
    /// Pages the group already has some access to
    #[serde(default)]
    pub page_roles: Vec<Page>,
    /// Explicit granted pairs (`"pageId-roleId,..."`) when the backend provides them
    #[serde(default)]
    pub group_page: Option<String>,
}

fn default_group_status() -> i32 {
    GROUP_STATUS_ACTIVE
}

/// Editable group fields submitted alongside the grants
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupFields {
    /// `None` for a group that does not exist on the backend yet
    pub group_id: Option<i64>,
    pub group_name: String,
    pub description: String,
    pub status: i32,
}

impl GroupFields {
    /// Fields for a brand-new group
    pub fn new_group(group_name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            group_id: None,
            group_name: group_name.into(),
            description: description.into(),
            status: GROUP_STATUS_ACTIVE,
        }
    }
}

impl From<&GroupDetail> for GroupFields {
    fn from(detail: &GroupDetail) -> Self {
        Self {
            group_id: Some(detail.group_id),
            group_name: detail.group_name.clone(),
            description: detail.description.clone(),
            status: detail.status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(SelectionStatus::classify(0, 3), SelectionStatus::Empty);
        assert_eq!(SelectionStatus::classify(1, 3), SelectionStatus::Partial);
        assert_eq!(SelectionStatus::classify(3, 3), SelectionStatus::Full);
        assert_eq!(SelectionStatus::classify(0, 0), SelectionStatus::Empty);
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_string(&SelectionStatus::Full).unwrap(),
            "\"all\""
        );
        assert_eq!(
            serde_json::to_string(&SelectionStatus::Empty).unwrap(),
            "\"none\""
        );
        assert_eq!(
            serde_json::to_string(&SelectionStatus::Partial).unwrap(),
            "\"partial\""
        );
    }

    #[test]
    fn test_role_wire_format() {
        let role: Role =
            serde_json::from_str(r#"{"id": 10, "pageId": 1, "name": "Create"}"#).unwrap();
        assert_eq!(role.page_id, 1);
        assert_eq!(role.name, "Create");
    }

    #[test]
    fn test_group_detail_defaults() {
        let detail: GroupDetail =
            serde_json::from_str(r#"{"groupId": 4, "groupName": "Teachers"}"#).unwrap();
        assert_eq!(detail.status, GROUP_STATUS_ACTIVE);
        assert!(detail.page_roles.is_empty());
        assert!(detail.group_page.is_none());

        let fields = GroupFields::from(&detail);
        assert_eq!(fields.group_id, Some(4));
        assert_eq!(fields.group_name, "Teachers");
    }
}
