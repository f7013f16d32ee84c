//! Tags and the note–tag association.
//!
//! Tags are not part of the optimistic store; they are read and written
//! directly through [`SqlitePersistence`].

use crate::core::persistence::{map_note_row, NOTE_COLUMNS};
use crate::{Note, NoteId, NotecaseError, Result, SqlitePersistence};
use regex::Regex;
use rusqlite::OptionalExtension;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

pub type TagId = i64;

pub const MAX_TAG_NAME_LEN: usize = 50;
pub const DEFAULT_TAG_COLOR: &str = "#6b7280";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: TagId,
    pub name: String,
    /// `#RGB` or `#RRGGBB`.
    pub color: String,
    pub description: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// One row of the note-tag join table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteTag {
    pub id: i64,
    pub note_id: NoteId,
    pub tag_id: TagId,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagWithCount {
    #[serde(flatten)]
    pub tag: Tag,
    pub note_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTag {
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl NewTag {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn colored(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }
}

/// Partial update of a tag. An empty `description` clears it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagPatch {
    pub name: Option<String>,
    pub color: Option<String>,
    pub description: Option<String>,
}

/// # Errors
///
/// Returns [`NotecaseError::ValidationFailed`] for an empty or overlong name.
pub fn validate_tag_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(NotecaseError::ValidationFailed(
            "Tag name cannot be empty".to_string(),
        ));
    }
    if trimmed.chars().count() > MAX_TAG_NAME_LEN {
        return Err(NotecaseError::ValidationFailed(format!(
            "Tag name must be at most {MAX_TAG_NAME_LEN} characters"
        )));
    }
    Ok(trimmed.to_string())
}

fn color_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").expect("valid colour regex")
    })
}

/// # Errors
///
/// Returns [`NotecaseError::ValidationFailed`] unless `color` is `#RGB` or `#RRGGBB`.
pub fn validate_tag_color(color: &str) -> Result<String> {
    let trimmed = color.trim();
    if color_pattern().is_match(trimmed) {
        Ok(trimmed.to_string())
    } else {
        Err(NotecaseError::ValidationFailed(format!(
            "Invalid colour '{trimmed}': expected #RGB or #RRGGBB"
        )))
    }
}

const TAG_COLUMNS: &str = "id, name, color, description, created_at, updated_at";

fn map_tag_row(row: &rusqlite::Row) -> rusqlite::Result<Tag> {
    Ok(Tag {
        id: row.get(0)?,
        name: row.get(1)?,
        color: row.get(2)?,
        description: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn ensure_unique_name(
    conn: &rusqlite::Connection,
    name: &str,
    except: Option<TagId>,
) -> Result<()> {
    let clash: Option<TagId> = conn
        .query_row(
            "SELECT id FROM tags WHERE name = ?1 AND id IS NOT ?2",
            rusqlite::params![name, except],
            |row| row.get(0),
        )
        .optional()?;
    match clash {
        Some(_) => Err(NotecaseError::ValidationFailed(format!(
            "A tag named '{name}' already exists"
        ))),
        None => Ok(()),
    }
}

impl SqlitePersistence {
    pub fn get_tag(&self, id: TagId) -> Result<Tag> {
        self.connection()
            .query_row(
                &format!("SELECT {TAG_COLUMNS} FROM tags WHERE id = ?1"),
                [id],
                map_tag_row,
            )
            .optional()?
            .ok_or(NotecaseError::TagNotFound(id))
    }

    /// All tags ordered by name.
    pub fn list_tags(&self) -> Result<Vec<Tag>> {
        let mut stmt = self
            .connection()
            .prepare(&format!("SELECT {TAG_COLUMNS} FROM tags ORDER BY name, id"))?;
        let tags = stmt
            .query_map([], map_tag_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tags)
    }

    /// # Errors
    ///
    /// Returns [`NotecaseError::ValidationFailed`] for an invalid or taken
    /// name, or an invalid colour.
    pub fn create_tag(&mut self, input: &NewTag) -> Result<Tag> {
        let name = validate_tag_name(&input.name)?;
        let color = match &input.color {
            Some(color) => validate_tag_color(color)?,
            None => DEFAULT_TAG_COLOR.to_string(),
        };
        let description = input
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string);
        let now = chrono::Utc::now().timestamp();

        let tx = self.connection_mut().transaction()?;
        ensure_unique_name(&tx, &name, None)?;
        tx.execute(
            "INSERT INTO tags (name, color, description, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            rusqlite::params![name, color, description, now],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;
        self.get_tag(id)
    }

    pub fn update_tag(&mut self, id: TagId, patch: &TagPatch) -> Result<Tag> {
        let mut tag = self.get_tag(id)?;
        if let Some(name) = &patch.name {
            tag.name = validate_tag_name(name)?;
        }
        if let Some(color) = &patch.color {
            tag.color = validate_tag_color(color)?;
        }
        if let Some(description) = &patch.description {
            let description = description.trim();
            tag.description = (!description.is_empty()).then(|| description.to_string());
        }
        tag.updated_at = chrono::Utc::now().timestamp();

        let tx = self.connection_mut().transaction()?;
        ensure_unique_name(&tx, &tag.name, Some(id))?;
        tx.execute(
            "UPDATE tags SET name = ?1, color = ?2, description = ?3, updated_at = ?4 WHERE id = ?5",
            rusqlite::params![tag.name, tag.color, tag.description, tag.updated_at, id],
        )?;
        tx.commit()?;
        Ok(tag)
    }

    /// Deletes a tag; its note associations go with it.
    pub fn delete_tag(&mut self, id: TagId) -> Result<()> {
        let removed = self
            .connection()
            .execute("DELETE FROM tags WHERE id = ?1", [id])?;
        if removed == 0 {
            return Err(NotecaseError::TagNotFound(id));
        }
        Ok(())
    }

    /// Attaches `tag_id` to `note_id`. Attaching twice is a no-op.
    pub fn tag_note(&mut self, note_id: NoteId, tag_id: TagId) -> Result<()> {
        self.get_note(note_id)?;
        self.get_tag(tag_id)?;
        self.connection().execute(
            "INSERT OR IGNORE INTO note_tags (note_id, tag_id, created_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![note_id, tag_id, chrono::Utc::now().timestamp()],
        )?;
        Ok(())
    }

    /// Detaches `tag_id` from `note_id`; returns whether an association existed.
    pub fn untag_note(&mut self, note_id: NoteId, tag_id: TagId) -> Result<bool> {
        let removed = self.connection().execute(
            "DELETE FROM note_tags WHERE note_id = ?1 AND tag_id = ?2",
            [note_id, tag_id],
        )?;
        Ok(removed > 0)
    }

    pub fn tags_for_note(&self, note_id: NoteId) -> Result<Vec<Tag>> {
        let mut stmt = self.connection().prepare(
            "SELECT t.id, t.name, t.color, t.description, t.created_at, t.updated_at
             FROM tags t
             JOIN note_tags nt ON nt.tag_id = t.id
             WHERE nt.note_id = ?1
             ORDER BY t.name, t.id",
        )?;
        let tags = stmt
            .query_map([note_id], map_tag_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tags)
    }

    /// Notes carrying `tag_id`, most recently updated first.
    pub fn notes_for_tag(&self, tag_id: TagId) -> Result<Vec<Note>> {
        let columns = NOTE_COLUMNS
            .split(", ")
            .map(|c| format!("n.{c}"))
            .collect::<Vec<_>>()
            .join(", ");
        let mut stmt = self.connection().prepare(&format!(
            "SELECT {columns}
             FROM notes n
             JOIN note_tags nt ON nt.note_id = n.id
             WHERE nt.tag_id = ?1
             ORDER BY n.updated_at DESC, n.id DESC"
        ))?;
        let notes = stmt
            .query_map([tag_id], map_note_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(notes)
    }

    /// Every tag with the number of notes it is attached to, ordered by name.
    pub fn tags_with_note_counts(&self) -> Result<Vec<TagWithCount>> {
        let mut stmt = self.connection().prepare(
            "SELECT t.id, t.name, t.color, t.description, t.created_at, t.updated_at,
                    COUNT(nt.note_id)
             FROM tags t
             LEFT JOIN note_tags nt ON nt.tag_id = t.id
             GROUP BY t.id
             ORDER BY t.name, t.id",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(TagWithCount {
                    tag: map_tag_row(row)?,
                    note_count: row.get::<_, i64>(6)? as usize,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Tags whose name contains `query`, case-insensitively.
    pub fn search_tags(&self, query: &str) -> Result<Vec<Tag>> {
        let needle = query.trim().to_lowercase();
        Ok(self
            .list_tags()?
            .into_iter()
            .filter(|tag| tag.name.to_lowercase().contains(&needle))
            .collect())
    }

    pub fn list_note_tags(&self) -> Result<Vec<NoteTag>> {
        let mut stmt = self.connection().prepare(
            "SELECT id, note_id, tag_id, created_at FROM note_tags ORDER BY note_id, tag_id",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(NoteTag {
                    id: row.get(0)?,
                    note_id: row.get(1)?,
                    tag_id: row.get(2)?,
                    created_at: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{NewNote, OperationLog, Persistence, PurgeStrategy, Storage};
    use tempfile::NamedTempFile;

    fn backend() -> (SqlitePersistence, NamedTempFile) {
        let temp = NamedTempFile::new().unwrap();
        let storage = Storage::create(temp.path()).unwrap();
        let log = OperationLog::new(PurgeStrategy::LocalOnly { keep_last: 100 });
        (SqlitePersistence::new(storage, log), temp)
    }

    #[test]
    fn test_validate_tag_color() {
        assert_eq!(validate_tag_color("#ABC").unwrap(), "#ABC");
        assert!(validate_tag_color("#a1b2c3").is_ok());
        assert!(validate_tag_color("abc").is_err());
        assert!(validate_tag_color("#abcd").is_err());
        assert!(validate_tag_color("#ggg").is_err());
    }

    #[test]
    fn test_create_tag_defaults_and_uniqueness() {
        let (mut db, _temp) = backend();
        let tag = db.create_tag(&NewTag::new(" work ")).unwrap();
        assert_eq!(tag.name, "work");
        assert_eq!(tag.color, DEFAULT_TAG_COLOR);

        let err = db.create_tag(&NewTag::new("work")).unwrap_err();
        assert!(matches!(err, NotecaseError::ValidationFailed(_)));
        assert!(db.create_tag(&NewTag::new("x").colored("red")).is_err());
    }

    #[test]
    fn test_update_tag_keeps_own_name() {
        let (mut db, _temp) = backend();
        let tag = db.create_tag(&NewTag::new("home")).unwrap();
        db.create_tag(&NewTag::new("away")).unwrap();

        let updated = db
            .update_tag(
                tag.id,
                &TagPatch {
                    name: Some("home".to_string()),
                    color: Some("#fff".to_string()),
                    description: Some("house stuff".to_string()),
                },
            )
            .unwrap();
        assert_eq!(updated.color, "#fff");
        assert_eq!(updated.description.as_deref(), Some("house stuff"));

        let clash = TagPatch {
            name: Some("away".to_string()),
            ..TagPatch::default()
        };
        assert!(db.update_tag(tag.id, &clash).is_err());
    }

    #[test]
    fn test_tagging_is_idempotent_and_cascades() {
        let (mut db, _temp) = backend();
        let note = db.create_note(&NewNote::new("n", "")).unwrap();
        let tag = db.create_tag(&NewTag::new("t")).unwrap();

        db.tag_note(note.id, tag.id).unwrap();
        db.tag_note(note.id, tag.id).unwrap();
        assert_eq!(db.tags_for_note(note.id).unwrap().len(), 1);
        assert_eq!(db.notes_for_tag(tag.id).unwrap()[0].id, note.id);

        let counts = db.tags_with_note_counts().unwrap();
        assert_eq!(counts[0].note_count, 1);

        db.delete_note(note.id).unwrap();
        assert!(db.list_note_tags().unwrap().is_empty());
        assert_eq!(db.tags_with_note_counts().unwrap()[0].note_count, 0);
    }

    #[test]
    fn test_list_note_tags_carries_row_ids() {
        let (mut db, _temp) = backend();
        let first = db.create_note(&NewNote::new("a", "")).unwrap();
        let second = db.create_note(&NewNote::new("b", "")).unwrap();
        let tag = db.create_tag(&NewTag::new("t")).unwrap();
        db.tag_note(first.id, tag.id).unwrap();
        db.tag_note(second.id, tag.id).unwrap();

        let links = db.list_note_tags().unwrap();
        assert_eq!(links.len(), 2);
        assert!(links.iter().all(|link| link.id > 0));
        assert_ne!(links[0].id, links[1].id);
        assert_eq!(links[0].note_id, first.id);

        let json = serde_json::to_value(&links[0]).unwrap();
        assert_eq!(json["id"], links[0].id);
        assert_eq!(json["tagId"], tag.id);
    }

    #[test]
    fn test_untag_and_delete_tag() {
        let (mut db, _temp) = backend();
        let note = db.create_note(&NewNote::new("n", "")).unwrap();
        let tag = db.create_tag(&NewTag::new("Reading")).unwrap();
        db.tag_note(note.id, tag.id).unwrap();

        assert!(db.untag_note(note.id, tag.id).unwrap());
        assert!(!db.untag_note(note.id, tag.id).unwrap());

        assert_eq!(db.search_tags("read").unwrap().len(), 1);
        db.delete_tag(tag.id).unwrap();
        assert!(matches!(
            db.delete_tag(tag.id),
            Err(NotecaseError::TagNotFound(_))
        ));
        assert!(matches!(
            db.tag_note(note.id, tag.id),
            Err(NotecaseError::TagNotFound(_))
        ));
    }
}
