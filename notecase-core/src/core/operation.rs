//! Operation records for the Notecase change history.

use crate::{DeleteStrategy, FolderId, FolderPatch, NoteId, NotePatch};
use serde::{Deserialize, Serialize};

/// A single committed mutation recorded in the workspace operation log.
///
/// Every variant carries a stable `operation_id` and a wall-clock
/// `timestamp` (Unix seconds).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Operation {
    /// A folder was inserted into the hierarchy.
    CreateFolder {
        operation_id: String,
        timestamp: i64,
        folder_id: FolderId,
        parent_id: Option<FolderId>,
        position: i32,
        name: String,
    },
    /// A folder's own attributes changed.
    UpdateFolder {
        operation_id: String,
        timestamp: i64,
        folder_id: FolderId,
        patch: FolderPatch,
    },
    /// A folder was re-parented or reordered.
    MoveFolder {
        operation_id: String,
        timestamp: i64,
        folder_id: FolderId,
        new_parent_id: Option<FolderId>,
        new_position: i32,
    },
    /// A folder was removed.
    DeleteFolder {
        operation_id: String,
        timestamp: i64,
        folder_id: FolderId,
        strategy: DeleteStrategy,
        deleted_count: usize,
    },
    /// A note was created.
    CreateNote {
        operation_id: String,
        timestamp: i64,
        note_id: NoteId,
        folder_id: Option<FolderId>,
        position: i32,
        title: String,
    },
    /// A note's title, content or flags changed.
    UpdateNote {
        operation_id: String,
        timestamp: i64,
        note_id: NoteId,
        patch: NotePatch,
    },
    /// A note changed folder or position.
    MoveNote {
        operation_id: String,
        timestamp: i64,
        note_id: NoteId,
        new_folder_id: Option<FolderId>,
        new_position: i32,
    },
    /// A note was removed.
    DeleteNote {
        operation_id: String,
        timestamp: i64,
        note_id: NoteId,
    },
    /// A whole sibling group was given a new order.
    ReorderSiblings {
        operation_id: String,
        timestamp: i64,
        /// `"folders"` or `"notes"`.
        kind: String,
        parent_id: Option<FolderId>,
        ordered_ids: Vec<i64>,
    },
}

impl Operation {
    /// Returns the stable identifier for this operation.
    #[must_use]
    pub fn operation_id(&self) -> &str {
        match self {
            Self::CreateFolder { operation_id, .. }
            | Self::UpdateFolder { operation_id, .. }
            | Self::MoveFolder { operation_id, .. }
            | Self::DeleteFolder { operation_id, .. }
            | Self::CreateNote { operation_id, .. }
            | Self::UpdateNote { operation_id, .. }
            | Self::MoveNote { operation_id, .. }
            | Self::DeleteNote { operation_id, .. }
            | Self::ReorderSiblings { operation_id, .. } => operation_id,
        }
    }

    #[must_use]
    pub fn timestamp(&self) -> i64 {
        match self {
            Self::CreateFolder { timestamp, .. }
            | Self::UpdateFolder { timestamp, .. }
            | Self::MoveFolder { timestamp, .. }
            | Self::DeleteFolder { timestamp, .. }
            | Self::CreateNote { timestamp, .. }
            | Self::UpdateNote { timestamp, .. }
            | Self::MoveNote { timestamp, .. }
            | Self::DeleteNote { timestamp, .. }
            | Self::ReorderSiblings { timestamp, .. } => *timestamp,
        }
    }

    /// The variant name, as stored in the `operation_type` column.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::CreateFolder { .. } => "CreateFolder",
            Self::UpdateFolder { .. } => "UpdateFolder",
            Self::MoveFolder { .. } => "MoveFolder",
            Self::DeleteFolder { .. } => "DeleteFolder",
            Self::CreateNote { .. } => "CreateNote",
            Self::UpdateNote { .. } => "UpdateNote",
            Self::MoveNote { .. } => "MoveNote",
            Self::DeleteNote { .. } => "DeleteNote",
            Self::ReorderSiblings { .. } => "ReorderSiblings",
        }
    }

    /// Id of the folder or note the operation targets; `None` for reorders.
    #[must_use]
    pub fn target_id(&self) -> Option<i64> {
        match self {
            Self::CreateFolder { folder_id, .. }
            | Self::UpdateFolder { folder_id, .. }
            | Self::MoveFolder { folder_id, .. }
            | Self::DeleteFolder { folder_id, .. } => Some(*folder_id),
            Self::CreateNote { note_id, .. }
            | Self::UpdateNote { note_id, .. }
            | Self::MoveNote { note_id, .. }
            | Self::DeleteNote { note_id, .. } => Some(*note_id),
            Self::ReorderSiblings { .. } => None,
        }
    }
}

/// Fresh `(operation_id, timestamp)` pair for a new log entry.
pub(crate) fn stamp() -> (String, i64) {
    (
        uuid::Uuid::new_v4().to_string(),
        chrono::Utc::now().timestamp(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_serialization() {
        let op = Operation::MoveFolder {
            operation_id: "op-123".to_string(),
            timestamp: 1_234_567_890,
            folder_id: 4,
            new_parent_id: None,
            new_position: 2,
        };

        let json = serde_json::to_string(&op).unwrap();
        assert!(json.contains(r#""type":"MoveFolder""#));
        let deserialized: Operation = serde_json::from_str(&json).unwrap();

        assert_eq!(op.operation_id(), deserialized.operation_id());
        assert_eq!(deserialized.target_id(), Some(4));
    }

    #[test]
    fn test_stamp_is_unique() {
        let (a, _) = stamp();
        let (b, _) = stamp();
        assert_ne!(a, b);
    }
}
