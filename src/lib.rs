//! Grant Matrix - page/role permission editor
//!
//! Lets an operator choose which (page, role) pairs a user group is granted,
//! with page-level and catalog-level select-all kept consistent with the
//! underlying pair selection, then persists the result to the REST backend.

pub mod bridge;
pub mod catalog;
pub mod client;
pub mod editor;
pub mod error;
pub mod panels;
pub mod selection;
pub mod types;

pub use catalog::Catalog;
pub use editor::MatrixEditor;
pub use error::{MatrixError, Result};
pub use selection::SelectionStore;
pub use types::*;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
