use crate::{FolderId, NotecaseError, Result};
use serde::{Deserialize, Serialize};

/// Identifier of a [`Note`]. Negative values are temporary client-side ids.
pub type NoteId = i64;

/// Longest note title accepted, in characters.
pub const MAX_NOTE_TITLE_LEN: usize = 100;

const WORDS_PER_MINUTE: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: NoteId,
    pub title: String,
    /// Opaque rich-text payload; never interpreted by this crate.
    pub content: String,
    /// Owning folder, or `None` for an unfiled note.
    pub folder_id: Option<FolderId>,
    pub position: i32,
    pub is_favorite: bool,
    pub is_public: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Note {
    #[must_use]
    pub fn is_temporary(&self) -> bool {
        self.id < 0
    }

    #[must_use]
    pub fn word_count(&self) -> usize {
        self.content.split_whitespace().count()
    }

    /// Estimated reading time in whole minutes, never less than one.
    #[must_use]
    pub fn reading_time_minutes(&self) -> usize {
        self.word_count().div_ceil(WORDS_PER_MINUTE).max(1)
    }
}

/// Input for creating a note. A `None` position appends to the folder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNote {
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub folder_id: Option<FolderId>,
    #[serde(default)]
    pub position: Option<i32>,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default)]
    pub is_public: bool,
}

impl NewNote {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            folder_id: None,
            position: None,
            is_favorite: false,
            is_public: false,
        }
    }

    #[must_use]
    pub fn in_folder(mut self, folder_id: FolderId) -> Self {
        self.folder_id = Some(folder_id);
        self
    }

    #[must_use]
    pub fn at(mut self, position: i32) -> Self {
        self.position = Some(position);
        self
    }
}

/// Partial update of a note. Moving between folders goes through the move validator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotePatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub is_favorite: Option<bool>,
    pub is_public: Option<bool>,
}

impl NotePatch {
    pub fn retitle(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    pub fn favorite(is_favorite: bool) -> Self {
        Self {
            is_favorite: Some(is_favorite),
            ..Self::default()
        }
    }

    /// Validates the patch and returns a copy with the title trimmed.
    ///
    /// # Errors
    ///
    /// Returns [`NotecaseError::ValidationFailed`] for an invalid title.
    pub fn normalized(&self) -> Result<Self> {
        let title = match &self.title {
            Some(title) => Some(validate_note_title(title)?),
            None => None,
        };
        Ok(Self {
            title,
            ..self.clone()
        })
    }

    pub fn apply_to(&self, note: &mut Note) {
        if let Some(title) = &self.title {
            note.title = title.clone();
        }
        if let Some(content) = &self.content {
            note.content = content.clone();
        }
        if let Some(is_favorite) = self.is_favorite {
            note.is_favorite = is_favorite;
        }
        if let Some(is_public) = self.is_public {
            note.is_public = is_public;
        }
    }
}

/// Trims `title` and checks it is non-empty and at most
/// [`MAX_NOTE_TITLE_LEN`] characters long.
///
/// # Errors
///
/// Returns [`NotecaseError::ValidationFailed`] describing the violated rule.
pub fn validate_note_title(title: &str) -> Result<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(NotecaseError::ValidationFailed(
            "Note title cannot be empty".to_string(),
        ));
    }
    if trimmed.chars().count() > MAX_NOTE_TITLE_LEN {
        return Err(NotecaseError::ValidationFailed(format!(
            "Note title must be at most {MAX_NOTE_TITLE_LEN} characters"
        )));
    }
    Ok(trimmed.to_string())
}
