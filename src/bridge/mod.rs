//! Persistence bridge: wire encoding of grants and the group update body
//!
//! The backend stores grants as a comma-joined list of `"pageId-roleId"`
//! strings. This module is the only place that string form exists.

use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::{MatrixError, Result};
use crate::types::{Grant, GroupFields};

/// Encode grants as `"p-r,p-r,..."`
pub fn encode_grants(grants: &[Grant]) -> String {
    grants
        .iter()
        .map(|g| format!("{}-{}", g.page_id, g.role_id))
        .collect::<Vec<_>>()
        .join(",")
}

/// Parse a `"p-r,p-r,..."` list. Empty items are skipped.
pub fn parse_grants(encoded: &str) -> Result<Vec<Grant>> {
    encoded
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(parse_grant)
        .collect()
}

fn parse_grant(item: &str) -> Result<Grant> {
    let invalid = || MatrixError::InvalidInput(format!("malformed grant '{}'", item));

    let (page, role) = item.split_once('-').ok_or_else(invalid)?;
    let page_id = parse_id(page).ok_or_else(invalid)?;
    let role_id = parse_id(role).ok_or_else(invalid)?;
    Ok(Grant::new(page_id, role_id))
}

/// Ids on the wire are plain positive decimals
fn parse_id(s: &str) -> Option<i64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok().filter(|id| *id > 0)
}

/// Group fields as the backend expects them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupPayload {
    pub group_name: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub group_id: Option<i64>,
    pub description: String,
    pub status: i32,
    pub group_page: String,
}

/// Body of `PUT /auth/group/{id}` and `POST /auth/group`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupUpdate {
    pub group: GroupPayload,
}

impl GroupUpdate {
    pub fn new(fields: &GroupFields, grants: &[Grant]) -> Self {
        Self {
            group: GroupPayload {
                group_name: fields.group_name.clone(),
                group_id: fields.group_id,
                description: fields.description.clone(),
                status: fields.status,
                group_page: encode_grants(grants),
            },
        }
    }

    /// Grants carried by this body
    pub fn grants(&self) -> Result<Vec<Grant>> {
        parse_grants(&self.group.group_page)
    }
}

/// Allows one save at a time
#[derive(Debug, Default)]
pub struct SaveGate {
    in_flight: AtomicBool,
}

/// Held while a save is outstanding; releases the gate on drop
#[derive(Debug)]
pub struct SaveTicket<'a> {
    gate: &'a SaveGate,
}

impl SaveGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the gate, or fail with [`MatrixError::SaveInFlight`]
    pub fn acquire(&self) -> Result<SaveTicket<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| MatrixError::SaveInFlight)?;
        Ok(SaveTicket { gate: self })
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }
}

impl Drop for SaveTicket<'_> {
    fn drop(&mut self) {
        self.gate.in_flight.store(false, Ordering::Release);
    }
}
