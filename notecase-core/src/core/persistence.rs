//! The persistence boundary and its SQLite implementation.
//!
//! [`Persistence`] is the service the orchestrator talks to after applying a
//! mutation locally. [`SqlitePersistence`] implements it over [`Storage`]:
//! each mutation runs in one transaction, re-validates what it can against
//! the database, keeps sibling positions dense, and appends an [`Operation`]
//! to the log before committing.

use crate::core::moves::{resolve_insert_position, validate_reorder};
use crate::core::operation::stamp;
use crate::{
    DeleteResult, DeleteStrategy, EntityRef, Folder, FolderId, FolderPatch, NewFolder, NewNote,
    Note, NoteId, NotePatch, NotecaseError, Operation, OperationLog, OperationSummary, Result,
    Storage,
};
use crate::core::folder::validate_folder_name;
use crate::core::note::validate_note_title;
use rusqlite::{Connection, OptionalExtension};
use std::collections::HashSet;

/// Backend that durably stores folders and notes.
///
/// Every method returns the committed state. The orchestrator turns an
/// `Err` into a rollback of its optimistic change.
pub trait Persistence {
    fn load_folders(&self) -> Result<Vec<Folder>>;
    fn load_notes(&self) -> Result<Vec<Note>>;

    fn create_folder(&mut self, input: &NewFolder) -> Result<Folder>;
    fn update_folder(&mut self, id: FolderId, patch: &FolderPatch) -> Result<Folder>;
    fn delete_folder(&mut self, id: FolderId, strategy: DeleteStrategy) -> Result<DeleteResult>;
    fn move_folder(
        &mut self,
        id: FolderId,
        new_parent_id: Option<FolderId>,
        new_position: usize,
    ) -> Result<Folder>;
    /// Assigns positions `0..n` to `ordered`, which must be exactly the
    /// current children of `parent_id`.
    fn reorder_folders(
        &mut self,
        parent_id: Option<FolderId>,
        ordered: &[FolderId],
    ) -> Result<Vec<Folder>>;

    fn create_note(&mut self, input: &NewNote) -> Result<Note>;
    fn update_note(&mut self, id: NoteId, patch: &NotePatch) -> Result<Note>;
    fn delete_note(&mut self, id: NoteId) -> Result<DeleteResult>;
    fn move_note(
        &mut self,
        id: NoteId,
        new_folder_id: Option<FolderId>,
        new_position: usize,
    ) -> Result<Note>;
    fn reorder_notes(&mut self, folder_id: Option<FolderId>, ordered: &[NoteId])
        -> Result<Vec<Note>>;
}

pub(crate) const FOLDER_COLUMNS: &str =
    "id, name, parent_id, position, is_favorite, is_public, created_at, updated_at";
pub(crate) const NOTE_COLUMNS: &str =
    "id, title, content, folder_id, position, is_favorite, is_public, created_at, updated_at";

pub(crate) fn map_folder_row(row: &rusqlite::Row) -> rusqlite::Result<Folder> {
    Ok(Folder {
        id: row.get(0)?,
        name: row.get(1)?,
        parent_id: row.get(2)?,
        position: row.get(3)?,
        is_favorite: row.get(4)?,
        is_public: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

pub(crate) fn map_note_row(row: &rusqlite::Row) -> rusqlite::Result<Note> {
    Ok(Note {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        folder_id: row.get(3)?,
        position: row.get(4)?,
        is_favorite: row.get(5)?,
        is_public: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

/// Which sibling table a renumbering applies to.
#[derive(Clone, Copy)]
enum Table {
    Folders,
    Notes,
}

impl Table {
    fn name(self) -> &'static str {
        match self {
            Self::Folders => "folders",
            Self::Notes => "notes",
        }
    }

    fn parent_column(self) -> &'static str {
        match self {
            Self::Folders => "parent_id",
            Self::Notes => "folder_id",
        }
    }
}

/// Ids in one sibling group, in display order.
fn sibling_ids(conn: &Connection, table: Table, parent: Option<FolderId>) -> Result<Vec<i64>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT id FROM {} WHERE {} IS ?1 ORDER BY position, id",
        table.name(),
        table.parent_column()
    ))?;
    let ids = stmt
        .query_map([parent], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<i64>>>()?;
    Ok(ids)
}

/// Writes positions `0..n` in the order given, skipping rows already in place.
fn renumber(conn: &Connection, table: Table, ordered: &[i64]) -> Result<()> {
    let mut stmt = conn.prepare(&format!(
        "UPDATE {} SET position = ?1 WHERE id = ?2 AND position != ?1",
        table.name()
    ))?;
    for (position, id) in ordered.iter().enumerate() {
        stmt.execute(rusqlite::params![position as i64, id])?;
    }
    Ok(())
}

fn load_folder(conn: &Connection, id: FolderId) -> Result<Folder> {
    conn.query_row(
        &format!("SELECT {FOLDER_COLUMNS} FROM folders WHERE id = ?1"),
        [id],
        map_folder_row,
    )
    .optional()?
    .ok_or(NotecaseError::FolderNotFound(id))
}

fn load_note(conn: &Connection, id: NoteId) -> Result<Note> {
    conn.query_row(
        &format!("SELECT {NOTE_COLUMNS} FROM notes WHERE id = ?1"),
        [id],
        map_note_row,
    )
    .optional()?
    .ok_or(NotecaseError::NoteNotFound(id))
}

fn folder_exists(conn: &Connection, id: FolderId) -> Result<bool> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM folders WHERE id = ?1", [id], |row| {
        row.get(0)
    })?;
    Ok(count > 0)
}

/// Rejects a container id that is unsaved or absent from the database.
fn require_container(conn: &Connection, parent: Option<FolderId>) -> Result<()> {
    match parent {
        Some(pid) if !folder_exists(conn, pid)? => Err(NotecaseError::InvalidMove(format!(
            "Target folder {pid} does not exist"
        ))),
        _ => Ok(()),
    }
}

/// Walks up from `start` and reports whether `id` is on the way to the root.
fn is_ancestor_or_self(conn: &Connection, id: FolderId, start: FolderId) -> Result<bool> {
    let mut seen = HashSet::new();
    let mut current = Some(start);
    while let Some(fid) = current {
        if fid == id {
            return Ok(true);
        }
        if !seen.insert(fid) {
            break;
        }
        current = conn
            .query_row("SELECT parent_id FROM folders WHERE id = ?1", [fid], |row| {
                row.get::<_, Option<FolderId>>(0)
            })
            .optional()?
            .flatten();
    }
    Ok(false)
}

fn escape_like(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len());
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// [`Persistence`] over a Notecase SQLite database.
pub struct SqlitePersistence {
    storage: Storage,
    operation_log: OperationLog,
}

impl SqlitePersistence {
    pub fn new(storage: Storage, operation_log: OperationLog) -> Self {
        Self {
            storage,
            operation_log,
        }
    }

    pub fn connection(&self) -> &Connection {
        self.storage.connection()
    }

    pub(crate) fn connection_mut(&mut self) -> &mut Connection {
        self.storage.connection_mut()
    }

    pub fn get_folder(&self, id: FolderId) -> Result<Folder> {
        load_folder(self.connection(), id)
    }

    pub fn get_note(&self, id: NoteId) -> Result<Note> {
        load_note(self.connection(), id)
    }

    /// Case-insensitive substring search over note titles and content,
    /// most recently updated first. A blank query matches nothing.
    ///
    /// # Errors
    ///
    /// Returns [`NotecaseError::Database`] if the query fails.
    pub fn search_notes(&self, query: &str) -> Result<Vec<Note>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let pattern = format!("%{}%", escape_like(query));
        let mut stmt = self.connection().prepare(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes
             WHERE title LIKE ?1 ESCAPE '\\' OR content LIKE ?1 ESCAPE '\\'
             ORDER BY updated_at DESC, id DESC"
        ))?;
        let notes = stmt
            .query_map([pattern], map_note_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(notes)
    }

    /// Returns operation summaries, newest first.
    pub fn list_operations(
        &self,
        type_filter: Option<&str>,
        limit: usize,
    ) -> Result<Vec<OperationSummary>> {
        self.operation_log.list(self.connection(), type_filter, limit)
    }

    /// Deletes all operations from the log. Returns the number deleted.
    pub fn purge_all_operations(&self) -> Result<usize> {
        self.operation_log.purge_all(self.connection())
    }

    fn delete_subtree(
        tx: &Connection,
        id: FolderId,
        affected: &mut Vec<EntityRef>,
    ) -> Result<()> {
        affected.push(EntityRef::Folder(id));

        let note_ids = sibling_ids(tx, Table::Notes, Some(id))?;
        affected.extend(note_ids.iter().map(|nid| EntityRef::Note(*nid)));
        tx.execute("DELETE FROM notes WHERE folder_id = ?1", [id])?;

        for child in sibling_ids(tx, Table::Folders, Some(id))? {
            Self::delete_subtree(tx, child, affected)?;
        }

        tx.execute("DELETE FROM folders WHERE id = ?1", [id])?;
        Ok(())
    }
}

impl Persistence for SqlitePersistence {
    fn load_folders(&self) -> Result<Vec<Folder>> {
        let mut stmt = self.connection().prepare(&format!(
            "SELECT {FOLDER_COLUMNS} FROM folders ORDER BY parent_id, position, id"
        ))?;
        let folders = stmt
            .query_map([], map_folder_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(folders)
    }

    fn load_notes(&self) -> Result<Vec<Note>> {
        let mut stmt = self.connection().prepare(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes ORDER BY folder_id, position, id"
        ))?;
        let notes = stmt
            .query_map([], map_note_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(notes)
    }

    fn create_folder(&mut self, input: &NewFolder) -> Result<Folder> {
        let name = validate_folder_name(&input.name)?;
        let (operation_id, now) = stamp();
        let tx = self.storage.connection_mut().transaction()?;

        require_container(&tx, input.parent_id)?;
        let mut siblings = sibling_ids(&tx, Table::Folders, input.parent_id)?;
        let position = resolve_insert_position(input.position, siblings.len())?;

        tx.execute(
            "INSERT INTO folders (name, parent_id, position, is_favorite, is_public, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            rusqlite::params![
                name,
                input.parent_id,
                position as i64,
                input.is_favorite,
                input.is_public,
                now
            ],
        )?;
        let id = tx.last_insert_rowid();
        siblings.insert(position, id);
        renumber(&tx, Table::Folders, &siblings)?;

        let op = Operation::CreateFolder {
            operation_id,
            timestamp: now,
            folder_id: id,
            parent_id: input.parent_id,
            position: position as i32,
            name,
        };
        self.operation_log.log(&tx, &op)?;
        self.operation_log.purge_if_needed(&tx)?;

        let folder = load_folder(&tx, id)?;
        tx.commit()?;
        Ok(folder)
    }

    fn update_folder(&mut self, id: FolderId, patch: &FolderPatch) -> Result<Folder> {
        let patch = patch.normalized()?;
        let (operation_id, now) = stamp();
        let tx = self.storage.connection_mut().transaction()?;

        let mut folder = load_folder(&tx, id)?;
        patch.apply_to(&mut folder);
        folder.updated_at = now;
        tx.execute(
            "UPDATE folders SET name = ?1, is_favorite = ?2, is_public = ?3, updated_at = ?4
             WHERE id = ?5",
            rusqlite::params![folder.name, folder.is_favorite, folder.is_public, now, id],
        )?;

        let op = Operation::UpdateFolder {
            operation_id,
            timestamp: now,
            folder_id: id,
            patch,
        };
        self.operation_log.log(&tx, &op)?;
        self.operation_log.purge_if_needed(&tx)?;

        tx.commit()?;
        Ok(folder)
    }

    fn delete_folder(&mut self, id: FolderId, strategy: DeleteStrategy) -> Result<DeleteResult> {
        let (operation_id, now) = stamp();
        let tx = self.storage.connection_mut().transaction()?;
        let folder = load_folder(&tx, id)?;
        let parent = folder.parent_id;

        let result = match strategy {
            DeleteStrategy::DeleteAll => {
                let mut affected = Vec::new();
                Self::delete_subtree(&tx, id, &mut affected)?;
                DeleteResult {
                    deleted_count: affected.len(),
                    affected_ids: affected,
                }
            }
            DeleteStrategy::PromoteChildren => {
                let mut folder_order: Vec<FolderId> = sibling_ids(&tx, Table::Folders, parent)?
                    .into_iter()
                    .filter(|fid| *fid != id)
                    .collect();
                let promoted_folders = sibling_ids(&tx, Table::Folders, Some(id))?;
                let mut note_order = sibling_ids(&tx, Table::Notes, parent)?;
                let promoted_notes = sibling_ids(&tx, Table::Notes, Some(id))?;

                tx.execute(
                    "UPDATE folders SET parent_id = ?1 WHERE parent_id = ?2",
                    rusqlite::params![parent, id],
                )?;
                tx.execute(
                    "UPDATE notes SET folder_id = ?1 WHERE folder_id = ?2",
                    rusqlite::params![parent, id],
                )?;

                folder_order.extend(&promoted_folders);
                note_order.extend(&promoted_notes);
                renumber(&tx, Table::Folders, &folder_order)?;
                renumber(&tx, Table::Notes, &note_order)?;

                tx.execute("DELETE FROM folders WHERE id = ?1", [id])?;

                let mut affected = vec![EntityRef::Folder(id)];
                affected.extend(promoted_folders.into_iter().map(EntityRef::Folder));
                affected.extend(promoted_notes.into_iter().map(EntityRef::Note));
                DeleteResult {
                    deleted_count: 1,
                    affected_ids: affected,
                }
            }
        };

        let remaining = sibling_ids(&tx, Table::Folders, parent)?;
        renumber(&tx, Table::Folders, &remaining)?;

        let op = Operation::DeleteFolder {
            operation_id,
            timestamp: now,
            folder_id: id,
            strategy,
            deleted_count: result.deleted_count,
        };
        self.operation_log.log(&tx, &op)?;
        self.operation_log.purge_if_needed(&tx)?;

        tx.commit()?;
        Ok(result)
    }

    fn move_folder(
        &mut self,
        id: FolderId,
        new_parent_id: Option<FolderId>,
        new_position: usize,
    ) -> Result<Folder> {
        let (operation_id, now) = stamp();
        let tx = self.storage.connection_mut().transaction()?;
        let folder = load_folder(&tx, id)?;

        if new_parent_id == Some(id) {
            return Err(NotecaseError::InvalidMove(
                "A folder cannot be its own parent".to_string(),
            ));
        }
        require_container(&tx, new_parent_id)?;
        if folder.parent_id != new_parent_id {
            if let Some(pid) = new_parent_id {
                if is_ancestor_or_self(&tx, id, pid)? {
                    return Err(NotecaseError::InvalidMove(
                        "Move would create a cycle".to_string(),
                    ));
                }
            }
        }

        let mut new_group: Vec<FolderId> = sibling_ids(&tx, Table::Folders, new_parent_id)?
            .into_iter()
            .filter(|fid| *fid != id)
            .collect();
        if new_position > new_group.len() {
            return Err(NotecaseError::InvalidPosition {
                position: new_position as i64,
                max: new_group.len(),
            });
        }

        tx.execute(
            "UPDATE folders SET parent_id = ?1, updated_at = ?2 WHERE id = ?3",
            rusqlite::params![new_parent_id, now, id],
        )?;
        if folder.parent_id != new_parent_id {
            let old_group = sibling_ids(&tx, Table::Folders, folder.parent_id)?;
            renumber(&tx, Table::Folders, &old_group)?;
        }
        new_group.insert(new_position, id);
        renumber(&tx, Table::Folders, &new_group)?;

        let op = Operation::MoveFolder {
            operation_id,
            timestamp: now,
            folder_id: id,
            new_parent_id,
            new_position: new_position as i32,
        };
        self.operation_log.log(&tx, &op)?;
        self.operation_log.purge_if_needed(&tx)?;

        let moved = load_folder(&tx, id)?;
        tx.commit()?;
        Ok(moved)
    }

    fn reorder_folders(
        &mut self,
        parent_id: Option<FolderId>,
        ordered: &[FolderId],
    ) -> Result<Vec<Folder>> {
        let (operation_id, now) = stamp();
        let tx = self.storage.connection_mut().transaction()?;
        if let Some(pid) = parent_id {
            if !folder_exists(&tx, pid)? {
                return Err(NotecaseError::FolderNotFound(pid));
            }
        }

        let current = sibling_ids(&tx, Table::Folders, parent_id)?;
        validate_reorder(&current, ordered)?;
        renumber(&tx, Table::Folders, ordered)?;

        let op = Operation::ReorderSiblings {
            operation_id,
            timestamp: now,
            kind: "folders".to_string(),
            parent_id,
            ordered_ids: ordered.to_vec(),
        };
        self.operation_log.log(&tx, &op)?;
        self.operation_log.purge_if_needed(&tx)?;

        let folders = ordered
            .iter()
            .map(|fid| load_folder(&tx, *fid))
            .collect::<Result<Vec<_>>>()?;
        tx.commit()?;
        Ok(folders)
    }

    fn create_note(&mut self, input: &NewNote) -> Result<Note> {
        let title = validate_note_title(&input.title)?;
        let (operation_id, now) = stamp();
        let tx = self.storage.connection_mut().transaction()?;

        require_container(&tx, input.folder_id)?;
        let mut siblings = sibling_ids(&tx, Table::Notes, input.folder_id)?;
        let position = resolve_insert_position(input.position, siblings.len())?;

        tx.execute(
            "INSERT INTO notes (title, content, folder_id, position, is_favorite, is_public, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            rusqlite::params![
                title,
                input.content,
                input.folder_id,
                position as i64,
                input.is_favorite,
                input.is_public,
                now
            ],
        )?;
        let id = tx.last_insert_rowid();
        siblings.insert(position, id);
        renumber(&tx, Table::Notes, &siblings)?;

        let op = Operation::CreateNote {
            operation_id,
            timestamp: now,
            note_id: id,
            folder_id: input.folder_id,
            position: position as i32,
            title,
        };
        self.operation_log.log(&tx, &op)?;
        self.operation_log.purge_if_needed(&tx)?;

        let note = load_note(&tx, id)?;
        tx.commit()?;
        Ok(note)
    }

    fn update_note(&mut self, id: NoteId, patch: &NotePatch) -> Result<Note> {
        let patch = patch.normalized()?;
        let (operation_id, now) = stamp();
        let tx = self.storage.connection_mut().transaction()?;

        let mut note = load_note(&tx, id)?;
        patch.apply_to(&mut note);
        note.updated_at = now;
        tx.execute(
            "UPDATE notes SET title = ?1, content = ?2, is_favorite = ?3, is_public = ?4,
                 updated_at = ?5
             WHERE id = ?6",
            rusqlite::params![
                note.title,
                note.content,
                note.is_favorite,
                note.is_public,
                now,
                id
            ],
        )?;

        let op = Operation::UpdateNote {
            operation_id,
            timestamp: now,
            note_id: id,
            patch,
        };
        self.operation_log.log(&tx, &op)?;
        self.operation_log.purge_if_needed(&tx)?;

        tx.commit()?;
        Ok(note)
    }

    fn delete_note(&mut self, id: NoteId) -> Result<DeleteResult> {
        let (operation_id, now) = stamp();
        let tx = self.storage.connection_mut().transaction()?;
        let note = load_note(&tx, id)?;

        tx.execute("DELETE FROM notes WHERE id = ?1", [id])?;
        let remaining = sibling_ids(&tx, Table::Notes, note.folder_id)?;
        renumber(&tx, Table::Notes, &remaining)?;

        let op = Operation::DeleteNote {
            operation_id,
            timestamp: now,
            note_id: id,
        };
        self.operation_log.log(&tx, &op)?;
        self.operation_log.purge_if_needed(&tx)?;

        tx.commit()?;
        Ok(DeleteResult {
            deleted_count: 1,
            affected_ids: vec![EntityRef::Note(id)],
        })
    }

    fn move_note(
        &mut self,
        id: NoteId,
        new_folder_id: Option<FolderId>,
        new_position: usize,
    ) -> Result<Note> {
        let (operation_id, now) = stamp();
        let tx = self.storage.connection_mut().transaction()?;
        let note = load_note(&tx, id)?;
        require_container(&tx, new_folder_id)?;

        let mut new_group: Vec<NoteId> = sibling_ids(&tx, Table::Notes, new_folder_id)?
            .into_iter()
            .filter(|nid| *nid != id)
            .collect();
        if new_position > new_group.len() {
            return Err(NotecaseError::InvalidPosition {
                position: new_position as i64,
                max: new_group.len(),
            });
        }

        tx.execute(
            "UPDATE notes SET folder_id = ?1, updated_at = ?2 WHERE id = ?3",
            rusqlite::params![new_folder_id, now, id],
        )?;
        if note.folder_id != new_folder_id {
            let old_group = sibling_ids(&tx, Table::Notes, note.folder_id)?;
            renumber(&tx, Table::Notes, &old_group)?;
        }
        new_group.insert(new_position, id);
        renumber(&tx, Table::Notes, &new_group)?;

        let op = Operation::MoveNote {
            operation_id,
            timestamp: now,
            note_id: id,
            new_folder_id,
            new_position: new_position as i32,
        };
        self.operation_log.log(&tx, &op)?;
        self.operation_log.purge_if_needed(&tx)?;

        let moved = load_note(&tx, id)?;
        tx.commit()?;
        Ok(moved)
    }

    fn reorder_notes(
        &mut self,
        folder_id: Option<FolderId>,
        ordered: &[NoteId],
    ) -> Result<Vec<Note>> {
        let (operation_id, now) = stamp();
        let tx = self.storage.connection_mut().transaction()?;
        if let Some(fid) = folder_id {
            if !folder_exists(&tx, fid)? {
                return Err(NotecaseError::FolderNotFound(fid));
            }
        }

        let current = sibling_ids(&tx, Table::Notes, folder_id)?;
        validate_reorder(&current, ordered)?;
        renumber(&tx, Table::Notes, ordered)?;

        let op = Operation::ReorderSiblings {
            operation_id,
            timestamp: now,
            kind: "notes".to_string(),
            parent_id: folder_id,
            ordered_ids: ordered.to_vec(),
        };
        self.operation_log.log(&tx, &op)?;
        self.operation_log.purge_if_needed(&tx)?;

        let notes = ordered
            .iter()
            .map(|nid| load_note(&tx, *nid))
            .collect::<Result<Vec<_>>>()?;
        tx.commit()?;
        Ok(notes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PurgeStrategy;
    use tempfile::NamedTempFile;

    fn backend() -> (SqlitePersistence, NamedTempFile) {
        let temp = NamedTempFile::new().unwrap();
        let storage = Storage::create(temp.path()).unwrap();
        let log = OperationLog::new(PurgeStrategy::LocalOnly { keep_last: 1000 });
        (SqlitePersistence::new(storage, log), temp)
    }

    fn positions(db: &SqlitePersistence, parent: Option<FolderId>) -> Vec<(FolderId, i32)> {
        let mut folders: Vec<Folder> = db
            .load_folders()
            .unwrap()
            .into_iter()
            .filter(|f| f.parent_id == parent)
            .collect();
        folders.sort_by_key(|f| (f.position, f.id));
        folders.into_iter().map(|f| (f.id, f.position)).collect()
    }

    #[test]
    fn test_create_folder_appends_by_default() {
        let (mut db, _temp) = backend();
        let a = db.create_folder(&NewFolder::new("  A ")).unwrap();
        let b = db.create_folder(&NewFolder::new("B")).unwrap();
        assert_eq!(a.name, "A");
        assert_eq!((a.position, b.position), (0, 1));

        let c = db.create_folder(&NewFolder::new("C").at(0)).unwrap();
        assert_eq!(positions(&db, None), vec![(c.id, 0), (a.id, 1), (b.id, 2)]);
    }

    #[test]
    fn test_create_folder_rejects_blank_and_missing_parent() {
        let (mut db, _temp) = backend();
        assert!(matches!(
            db.create_folder(&NewFolder::new("   ")),
            Err(NotecaseError::ValidationFailed(_))
        ));
        assert!(matches!(
            db.create_folder(&NewFolder::new("x").under(77)),
            Err(NotecaseError::InvalidMove(_))
        ));
        assert!(db.load_folders().unwrap().is_empty());
    }

    #[test]
    fn test_move_folder_rejects_cycle() {
        let (mut db, _temp) = backend();
        let root = db.create_folder(&NewFolder::new("Root")).unwrap();
        let child = db.create_folder(&NewFolder::new("Child").under(root.id)).unwrap();

        let err = db.move_folder(root.id, Some(child.id), 0).unwrap_err();
        assert!(matches!(err, NotecaseError::InvalidMove(_)));
        let err = db.move_folder(root.id, Some(root.id), 0).unwrap_err();
        assert!(matches!(err, NotecaseError::InvalidMove(_)));
    }

    #[test]
    fn test_move_folder_renumbers_both_groups() {
        let (mut db, _temp) = backend();
        let a = db.create_folder(&NewFolder::new("a")).unwrap();
        let b = db.create_folder(&NewFolder::new("b")).unwrap();
        let c = db.create_folder(&NewFolder::new("c")).unwrap();

        let moved = db.move_folder(a.id, Some(c.id), 0).unwrap();
        assert_eq!(moved.parent_id, Some(c.id));
        assert_eq!(positions(&db, None), vec![(b.id, 0), (c.id, 1)]);

        db.move_folder(c.id, None, 0).unwrap();
        assert_eq!(positions(&db, None), vec![(c.id, 0), (b.id, 1)]);

        assert!(matches!(
            db.move_folder(b.id, None, 5),
            Err(NotecaseError::InvalidPosition { position: 5, max: 1 })
        ));
    }

    #[test]
    fn test_delete_all_removes_subtree_and_notes() {
        let (mut db, _temp) = backend();
        let root = db.create_folder(&NewFolder::new("Root")).unwrap();
        let child = db.create_folder(&NewFolder::new("Child").under(root.id)).unwrap();
        db.create_note(&NewNote::new("in child", "x").in_folder(child.id)).unwrap();
        let keep = db.create_note(&NewNote::new("unfiled", "")).unwrap();

        let result = db.delete_folder(root.id, DeleteStrategy::DeleteAll).unwrap();
        assert_eq!(result.deleted_count, 3);
        assert!(db.load_folders().unwrap().is_empty());
        let notes = db.load_notes().unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].id, keep.id);
    }

    #[test]
    fn test_delete_promote_appends_children_after_siblings() {
        let (mut db, _temp) = backend();
        let parent = db.create_folder(&NewFolder::new("Parent")).unwrap();
        let doomed = db.create_folder(&NewFolder::new("Doomed").under(parent.id)).unwrap();
        let sibling = db.create_folder(&NewFolder::new("Sibling").under(parent.id)).unwrap();
        let kid1 = db.create_folder(&NewFolder::new("k1").under(doomed.id)).unwrap();
        let kid2 = db.create_folder(&NewFolder::new("k2").under(doomed.id)).unwrap();
        let note = db.create_note(&NewNote::new("n", "").in_folder(doomed.id)).unwrap();

        let result = db.delete_folder(doomed.id, DeleteStrategy::PromoteChildren).unwrap();
        assert_eq!(result.deleted_count, 1);
        assert!(result.affected_ids.contains(&EntityRef::Note(note.id)));

        assert_eq!(
            positions(&db, Some(parent.id)),
            vec![(sibling.id, 0), (kid1.id, 1), (kid2.id, 2)]
        );
        assert_eq!(db.get_note(note.id).unwrap().folder_id, Some(parent.id));
        assert!(matches!(
            db.get_folder(doomed.id),
            Err(NotecaseError::FolderNotFound(_))
        ));
    }

    #[test]
    fn test_reorder_notes_requires_exact_set() {
        let (mut db, _temp) = backend();
        let a = db.create_note(&NewNote::new("a", "")).unwrap();
        let b = db.create_note(&NewNote::new("b", "")).unwrap();

        assert!(db.reorder_notes(None, &[a.id]).is_err());
        let notes = db.reorder_notes(None, &[b.id, a.id]).unwrap();
        assert_eq!(notes[0].id, b.id);
        assert_eq!(notes[0].position, 0);
        assert_eq!(db.get_note(a.id).unwrap().position, 1);
    }

    #[test]
    fn test_search_notes_is_case_insensitive_and_escaped() {
        let (mut db, _temp) = backend();
        db.create_note(&NewNote::new("Groceries", "milk, eggs")).unwrap();
        db.create_note(&NewNote::new("Budget", "100% done")).unwrap();

        assert_eq!(db.search_notes("MILK").unwrap().len(), 1);
        assert_eq!(db.search_notes("%").unwrap().len(), 1);
        assert!(db.search_notes("  ").unwrap().is_empty());
    }

    #[test]
    fn test_mutations_are_logged() {
        let (mut db, _temp) = backend();
        let f = db.create_folder(&NewFolder::new("f")).unwrap();
        db.update_folder(f.id, &FolderPatch::rename("g")).unwrap();
        db.delete_folder(f.id, DeleteStrategy::PromoteChildren).unwrap();

        let ops = db.list_operations(None, 10).unwrap();
        let types: Vec<_> = ops.iter().map(|o| o.operation_type.as_str()).collect();
        assert_eq!(types, vec!["DeleteFolder", "UpdateFolder", "CreateFolder"]);
    }

    #[test]
    fn test_failed_mutation_leaves_database_unchanged() {
        let (mut db, _temp) = backend();
        let a = db.create_note(&NewNote::new("a", "")).unwrap();
        assert!(db.move_note(a.id, Some(404), 0).is_err());
        assert_eq!(db.get_note(a.id).unwrap().folder_id, None);
        assert_eq!(db.list_operations(None, 10).unwrap().len(), 1);
    }
}
