//! Tagged union over the two hierarchical entity kinds.
//!
//! Everything that can be targeted by a mutation is addressed through
//! [`EntityRef`]; callers match on it instead of probing a runtime type field.

use crate::{Folder, FolderId, Note, NoteId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A typed reference to a folder or a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", content = "id")]
pub enum EntityRef {
    Folder(FolderId),
    Note(NoteId),
}

impl EntityRef {
    #[must_use]
    pub fn id(self) -> i64 {
        match self {
            Self::Folder(id) | Self::Note(id) => id,
        }
    }

    #[must_use]
    pub fn is_temporary(self) -> bool {
        self.id() < 0
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Folder(id) => write!(f, "folder {id}"),
            Self::Note(id) => write!(f, "note {id}"),
        }
    }
}

/// An owned folder or note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "entity")]
pub enum Entity {
    Folder(Folder),
    Note(Note),
}

impl Entity {
    #[must_use]
    pub fn entity_ref(&self) -> EntityRef {
        match self {
            Self::Folder(folder) => EntityRef::Folder(folder.id),
            Self::Note(note) => EntityRef::Note(note.id),
        }
    }

    /// The containing folder: `parent_id` for folders, `folder_id` for notes.
    #[must_use]
    pub fn container(&self) -> Option<FolderId> {
        match self {
            Self::Folder(folder) => folder.parent_id,
            Self::Note(note) => note.folder_id,
        }
    }

    #[must_use]
    pub fn position(&self) -> i32 {
        match self {
            Self::Folder(folder) => folder.position,
            Self::Note(note) => note.position,
        }
    }

    /// The primary label: folder name or note title.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Folder(folder) => &folder.name,
            Self::Note(note) => &note.title,
        }
    }
}

impl From<Folder> for Entity {
    fn from(folder: Folder) -> Self {
        Self::Folder(folder)
    }
}

impl From<Note> for Entity {
    fn from(note: Note) -> Self {
        Self::Note(note)
    }
}
