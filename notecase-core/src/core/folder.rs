//! Folder records and the input types used to create or patch them.

use crate::{NotecaseError, Result};
use serde::{Deserialize, Serialize};

/// Identifier of a [`Folder`]. Negative values are temporary client-side ids.
pub type FolderId = i64;

/// Longest folder name accepted, in characters.
pub const MAX_FOLDER_NAME_LEN: usize = 50;

/// A container in the folder hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub id: FolderId,
    pub name: String,
    /// Parent folder, or `None` for a root folder.
    pub parent_id: Option<FolderId>,
    /// Sort key among folders sharing the same parent.
    pub position: i32,
    pub is_favorite: bool,
    pub is_public: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Folder {
    /// `true` while the folder only exists locally under a temporary id.
    #[must_use]
    pub fn is_temporary(&self) -> bool {
        self.id < 0
    }
}

/// Summary counts shown for a folder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderStats {
    /// Notes filed directly in the folder.
    pub note_count: usize,
    /// Direct child folders.
    pub subfolder_count: usize,
    /// Sum of content length, in characters, over the direct notes.
    pub total_chars: usize,
}

/// Input for creating a folder.
///
/// When `position` is `None` the folder is appended after its last sibling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFolder {
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<FolderId>,
    #[serde(default)]
    pub position: Option<i32>,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default)]
    pub is_public: bool,
}

impl NewFolder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent_id: None,
            position: None,
            is_favorite: false,
            is_public: false,
        }
    }

    #[must_use]
    pub fn under(mut self, parent_id: FolderId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    #[must_use]
    pub fn at(mut self, position: i32) -> Self {
        self.position = Some(position);
        self
    }
}

/// Partial update of a folder's own attributes.
///
/// Re-parenting and reordering are not patches; they go through the move
/// validator so the hierarchy stays acyclic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderPatch {
    pub name: Option<String>,
    pub is_favorite: Option<bool>,
    pub is_public: Option<bool>,
}

impl FolderPatch {
    pub fn rename(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn favorite(is_favorite: bool) -> Self {
        Self {
            is_favorite: Some(is_favorite),
            ..Self::default()
        }
    }

    /// Validates the patch and returns a copy with the name trimmed.
    ///
    /// # Errors
    ///
    /// Returns [`NotecaseError::ValidationFailed`] if a new name is present
    /// but invalid.
    pub fn normalized(&self) -> Result<Self> {
        let name = match &self.name {
            Some(name) => Some(validate_folder_name(name)?),
            None => None,
        };
        Ok(Self {
            name,
            ..self.clone()
        })
    }

    /// Writes every present field onto `folder`.
    pub fn apply_to(&self, folder: &mut Folder) {
        if let Some(name) = &self.name {
            folder.name = name.clone();
        }
        if let Some(is_favorite) = self.is_favorite {
            folder.is_favorite = is_favorite;
        }
        if let Some(is_public) = self.is_public {
            folder.is_public = is_public;
        }
    }
}

/// Trims `name` and checks it is non-empty and at most
/// [`MAX_FOLDER_NAME_LEN`] characters long.
///
/// # Errors
///
/// Returns [`NotecaseError::ValidationFailed`] describing the violated rule.
pub fn validate_folder_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(NotecaseError::ValidationFailed(
            "Folder name cannot be empty".to_string(),
        ));
    }
    if trimmed.chars().count() > MAX_FOLDER_NAME_LEN {
        return Err(NotecaseError::ValidationFailed(format!(
            "Folder name must be at most {MAX_FOLDER_NAME_LEN} characters"
        )));
    }
    Ok(trimmed.to_string())
}
