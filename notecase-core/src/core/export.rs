//! Note and workspace export as Markdown and JSON.

use serde::{Deserialize, Serialize};

use crate::core::tag::{NoteTag, Tag};
use crate::{Folder, Note, Result};

/// Format version written into workspace snapshots.
pub const EXPORT_VERSION: u32 = 1;

/// Application version recorded in every export.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// A note as written by [`note_to_json`].
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteExport {
    #[serde(flatten)]
    pub note: Note,
    pub exported_at: String,
}

/// Top-level JSON structure of a workspace snapshot.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceExport {
    pub version: u32,
    pub app_version: String,
    pub exported_at: String,
    pub folders: Vec<Folder>,
    pub notes: Vec<Note>,
    pub tags: Vec<Tag>,
    pub note_tags: Vec<NoteTag>,
}

fn exported_at() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// `# <title>` followed by a blank line and the raw content.
pub fn note_to_markdown(note: &Note) -> String {
    format!("# {}\n\n{}", note.title, note.content)
}

/// Pretty-printed JSON of `note` with an `exportedAt` timestamp.
///
/// # Errors
///
/// Returns [`crate::NotecaseError::Json`] if serialisation fails.
pub fn note_to_json(note: &Note) -> Result<String> {
    let export = NoteExport {
        note: note.clone(),
        exported_at: exported_at(),
    };
    Ok(serde_json::to_string_pretty(&export)?)
}

/// Builds a snapshot of the given workspace contents.
pub fn workspace_snapshot(
    folders: Vec<Folder>,
    notes: Vec<Note>,
    tags: Vec<Tag>,
    note_tags: Vec<NoteTag>,
) -> WorkspaceExport {
    WorkspaceExport {
        version: EXPORT_VERSION,
        app_version: APP_VERSION.to_string(),
        exported_at: exported_at(),
        folders,
        notes,
        tags,
        note_tags,
    }
}

/// Serialises a snapshot as pretty JSON.
///
/// # Errors
///
/// Returns [`crate::NotecaseError::Json`] if serialisation fails.
pub fn export_workspace_json(snapshot: &WorkspaceExport) -> Result<String> {
    Ok(serde_json::to_string_pretty(snapshot)?)
}
