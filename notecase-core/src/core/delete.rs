//! Delete strategy and result types for folder removal.
//!
//! Two strategies are supported:
//!
//! - [`DeleteStrategy::DeleteAll`] removes the folder, every descendant
//!   folder, and every note filed anywhere in that subtree.
//! - [`DeleteStrategy::PromoteChildren`] removes only the folder. Its child
//!   folders and its notes move to the deleted folder's parent, appended
//!   after the siblings already there in their previous relative order.
//!
//! `PromoteChildren` is the [`Default`]: it never destroys content the user
//! did not explicitly target. Entry points still take the strategy as a
//! required argument.
//!
//! ```rust
//! use notecase_core::{DeleteStrategy, DeleteResult, EntityRef};
//!
//! let json = serde_json::to_string(&DeleteStrategy::PromoteChildren).unwrap();
//! assert_eq!(json, r#""PromoteChildren""#);
//!
//! let result = DeleteResult {
//!     deleted_count: 2,
//!     affected_ids: vec![EntityRef::Folder(4), EntityRef::Note(9)],
//! };
//! let json = serde_json::to_string(&result).unwrap();
//! assert!(json.contains("deletedCount"));
//! ```

use crate::EntityRef;
use serde::{Deserialize, Serialize};

/// Determines what happens to a folder's contents when it is deleted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum DeleteStrategy {
    /// Delete the folder and its entire subtree, notes included.
    DeleteAll,

    /// Delete only the folder and re-parent its contents to its former parent.
    #[default]
    PromoteChildren,
}

/// The outcome of a delete.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResult {
    /// Number of folders and notes permanently removed.
    pub deleted_count: usize,

    /// Every entity that was deleted or re-parented by the operation.
    pub affected_ids: Vec<EntityRef>,
}
