//! High-level workspace operations over a Notecase SQLite database.

use crate::core::export::{export_workspace_json, note_to_json, note_to_markdown, workspace_snapshot};
use crate::core::tag::{NewTag, Tag, TagId, TagPatch, TagWithCount};
use crate::core::tree::{NoteGroups, TreeNode};
use crate::{
    AppSettings, DeleteResult, DeleteStrategy, Entity, Folder, FolderId, FolderPatch, FolderStats,
    LocalStore, MoveRequest, NewFolder, NewNote, Note, NoteId, NotePatch, NotecaseError,
    OperationLog, OperationSummary, Orchestrator, Persistence, PurgeStrategy, Result,
    SqlitePersistence, Storage, ViewState, APP_VERSION,
};
use log::info;
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;

const DEFAULT_KEEP_LAST: usize = 1000;

/// An open Notecase workspace backed by a SQLite database.
///
/// `Workspace` bundles the [`Orchestrator`] (local store, SQLite backend and
/// view state) with the tag, search, export and history queries that go
/// straight to the database. Folder and note mutations are optimistic; tag
/// mutations are direct.
pub struct Workspace {
    orchestrator: Orchestrator<SqlitePersistence, ViewState>,
}

impl Workspace {
    /// Creates a new database at `path` and records creation metadata.
    ///
    /// # Errors
    ///
    /// Returns [`NotecaseError::Database`] for any SQLite failure.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::create_with(path, PurgeStrategy::LocalOnly { keep_last: DEFAULT_KEEP_LAST })
    }

    pub fn create_with<P: AsRef<Path>>(path: P, purge: PurgeStrategy) -> Result<Self> {
        let storage = Storage::create(&path)?;
        let created_at = chrono::Utc::now().timestamp().to_string();
        storage.connection().execute(
            "INSERT OR REPLACE INTO workspace_meta (key, value) VALUES (?1, ?2), (?3, ?4)",
            ["created_at", created_at.as_str(), "app_version", APP_VERSION],
        )?;
        info!("created workspace at {}", path.as_ref().display());
        Self::from_storage(storage, purge)
    }

    /// Opens an existing database, migrating it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`NotecaseError::InvalidDatabase`] if `path` is not a Notecase
    /// database, or [`NotecaseError::Database`] for SQLite failures.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with(path, PurgeStrategy::LocalOnly { keep_last: DEFAULT_KEEP_LAST })
    }

    pub fn open_with<P: AsRef<Path>>(path: P, purge: PurgeStrategy) -> Result<Self> {
        let storage = Storage::open(&path)?;
        Self::from_storage(storage, purge)
    }

    /// Opens the database named in `settings`, creating it on first use.
    pub fn from_settings(settings: &AppSettings) -> Result<Self> {
        let path = Path::new(&settings.database_path);
        let purge = PurgeStrategy::LocalOnly {
            keep_last: settings.operation_log_keep_last,
        };
        if path.exists() {
            Self::open_with(path, purge)
        } else {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            Self::create_with(path, purge)
        }
    }

    fn from_storage(storage: Storage, purge: PurgeStrategy) -> Result<Self> {
        let backend = SqlitePersistence::new(storage, OperationLog::new(purge));
        let mut orchestrator = Orchestrator::new(backend, ViewState::new());
        orchestrator.reload()?;
        Ok(Self { orchestrator })
    }

    pub fn orchestrator(&self) -> &Orchestrator<SqlitePersistence, ViewState> {
        &self.orchestrator
    }

    /// Direct access for staged (two-step) mutations.
    pub fn orchestrator_mut(&mut self) -> &mut Orchestrator<SqlitePersistence, ViewState> {
        &mut self.orchestrator
    }

    pub fn store(&self) -> &LocalStore {
        self.orchestrator.store()
    }

    pub fn view_state(&self) -> &ViewState {
        self.orchestrator.sink()
    }

    pub fn view_state_mut(&mut self) -> &mut ViewState {
        self.orchestrator.sink_mut()
    }

    pub fn connection(&self) -> &Connection {
        self.orchestrator.backend().connection()
    }

    /// Reads a value from `workspace_meta`.
    pub fn meta(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .connection()
            .query_row(
                "SELECT value FROM workspace_meta WHERE key = ?1",
                [key],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()?
            .flatten())
    }

    /// Discards local state and reloads everything from the database.
    pub fn reload(&mut self) -> Result<()> {
        self.orchestrator.reload()
    }

    // ── queries ──────────────────────────────────────────────────────

    pub fn tree(&self) -> Vec<TreeNode<Folder>> {
        self.store().tree()
    }

    pub fn note_groups(&self) -> NoteGroups {
        self.store().note_groups()
    }

    pub fn get_folder(&self, id: FolderId) -> Result<Folder> {
        self.store()
            .folder(id)
            .cloned()
            .ok_or(NotecaseError::FolderNotFound(id))
    }

    pub fn get_note(&self, id: NoteId) -> Result<Note> {
        self.store()
            .note(id)
            .cloned()
            .ok_or(NotecaseError::NoteNotFound(id))
    }

    pub fn list_all_folders(&self) -> Vec<Folder> {
        self.store().folders().cloned().collect()
    }

    pub fn list_all_notes(&self) -> Vec<Note> {
        self.store().notes().cloned().collect()
    }

    pub fn notes_in(&self, folder_id: Option<FolderId>) -> Vec<Note> {
        self.store().notes_in(folder_id).into_iter().cloned().collect()
    }

    /// Breadcrumb from the outermost ancestor to `id`.
    pub fn folder_path(&self, id: FolderId) -> Vec<Folder> {
        self.store().folder_path(id).into_iter().cloned().collect()
    }

    pub fn folder_stats(&self, id: FolderId) -> Result<FolderStats> {
        self.orchestrator.folder_stats(id)
    }

    pub fn favorite_folders(&self) -> Vec<Folder> {
        self.store().favorite_folders().into_iter().cloned().collect()
    }

    pub fn favorite_notes(&self) -> Vec<Note> {
        self.store().favorite_notes().into_iter().cloned().collect()
    }

    pub fn search_notes(&self, query: &str) -> Result<Vec<Note>> {
        self.orchestrator.backend().search_notes(query)
    }

    // ── folder mutations ─────────────────────────────────────────────

    pub fn create_folder(&mut self, input: NewFolder) -> Result<Folder> {
        self.orchestrator.create_folder(input)
    }

    pub fn update_folder(&mut self, id: FolderId, patch: FolderPatch) -> Result<Folder> {
        self.orchestrator.update_folder(id, patch)
    }

    pub fn rename_folder(&mut self, id: FolderId, name: &str) -> Result<Folder> {
        self.orchestrator.rename_folder(id, name)
    }

    pub fn toggle_folder_favorite(&mut self, id: FolderId) -> Result<Folder> {
        self.orchestrator.toggle_folder_favorite(id)
    }

    pub fn delete_folder(&mut self, id: FolderId, strategy: DeleteStrategy) -> Result<DeleteResult> {
        self.orchestrator.delete_folder(id, strategy)
    }

    pub fn reorder_folders(
        &mut self,
        parent_id: Option<FolderId>,
        ordered_ids: Vec<FolderId>,
    ) -> Result<Vec<Folder>> {
        self.orchestrator.reorder_folders(parent_id, ordered_ids)
    }

    /// Moves or reorders a folder or note.
    pub fn move_item(&mut self, request: MoveRequest) -> Result<Entity> {
        self.orchestrator.move_item(request)
    }

    // ── note mutations ───────────────────────────────────────────────

    pub fn create_note(&mut self, input: NewNote) -> Result<Note> {
        self.orchestrator.create_note(input)
    }

    pub fn update_note(&mut self, id: NoteId, patch: NotePatch) -> Result<Note> {
        self.orchestrator.update_note(id, patch)
    }

    pub fn toggle_note_favorite(&mut self, id: NoteId) -> Result<Note> {
        self.orchestrator.toggle_note_favorite(id)
    }

    pub fn duplicate_note(&mut self, id: NoteId) -> Result<Note> {
        self.orchestrator.duplicate_note(id)
    }

    pub fn delete_note(&mut self, id: NoteId) -> Result<DeleteResult> {
        self.orchestrator.delete_note(id)
    }

    pub fn reorder_notes(
        &mut self,
        folder_id: Option<FolderId>,
        ordered_ids: Vec<NoteId>,
    ) -> Result<Vec<Note>> {
        self.orchestrator.reorder_notes(folder_id, ordered_ids)
    }

    // ── tags ─────────────────────────────────────────────────────────

    pub fn create_tag(&mut self, input: &NewTag) -> Result<Tag> {
        self.orchestrator.backend_mut().create_tag(input)
    }

    pub fn update_tag(&mut self, id: TagId, patch: &TagPatch) -> Result<Tag> {
        self.orchestrator.backend_mut().update_tag(id, patch)
    }

    pub fn delete_tag(&mut self, id: TagId) -> Result<()> {
        self.orchestrator.backend_mut().delete_tag(id)
    }

    pub fn list_tags(&self) -> Result<Vec<Tag>> {
        self.orchestrator.backend().list_tags()
    }

    pub fn search_tags(&self, query: &str) -> Result<Vec<Tag>> {
        self.orchestrator.backend().search_tags(query)
    }

    pub fn tags_with_note_counts(&self) -> Result<Vec<TagWithCount>> {
        self.orchestrator.backend().tags_with_note_counts()
    }

    pub fn tag_note(&mut self, note_id: NoteId, tag_id: TagId) -> Result<()> {
        self.orchestrator.backend_mut().tag_note(note_id, tag_id)
    }

    pub fn untag_note(&mut self, note_id: NoteId, tag_id: TagId) -> Result<bool> {
        self.orchestrator.backend_mut().untag_note(note_id, tag_id)
    }

    pub fn tags_for_note(&self, note_id: NoteId) -> Result<Vec<Tag>> {
        self.orchestrator.backend().tags_for_note(note_id)
    }

    pub fn notes_for_tag(&self, tag_id: TagId) -> Result<Vec<Note>> {
        self.orchestrator.backend().notes_for_tag(tag_id)
    }

    // ── export ───────────────────────────────────────────────────────

    pub fn export_note_markdown(&self, id: NoteId) -> Result<String> {
        Ok(note_to_markdown(&self.get_note(id)?))
    }

    pub fn export_note_json(&self, id: NoteId) -> Result<String> {
        note_to_json(&self.get_note(id)?)
    }

    /// Pretty JSON snapshot of every folder, note, tag and tag assignment
    /// as stored in the database.
    pub fn export_workspace(&self) -> Result<String> {
        let backend = self.orchestrator.backend();
        let snapshot = workspace_snapshot(
            backend.load_folders()?,
            backend.load_notes()?,
            backend.list_tags()?,
            backend.list_note_tags()?,
        );
        export_workspace_json(&snapshot)
    }

    // ── operations log ───────────────────────────────────────────────

    /// Returns operation summaries, newest first.
    pub fn list_operations(
        &self,
        type_filter: Option<&str>,
        limit: usize,
    ) -> Result<Vec<OperationSummary>> {
        self.orchestrator.backend().list_operations(type_filter, limit)
    }

    /// Deletes all operations from the log. Returns the number deleted.
    pub fn purge_all_operations(&self) -> Result<usize> {
        self.orchestrator.backend().purge_all_operations()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EntityRef;
    use tempfile::NamedTempFile;

    #[test]
    fn test_create_workspace() {
        let temp = NamedTempFile::new().unwrap();
        let ws = Workspace::create(temp.path()).unwrap();

        assert!(ws.tree().is_empty());
        assert_eq!(ws.meta("app_version").unwrap().as_deref(), Some(APP_VERSION));
        assert!(ws.meta("missing").unwrap().is_none());
    }

    #[test]
    fn test_reopen_sees_committed_data() {
        let temp = NamedTempFile::new().unwrap();
        {
            let mut ws = Workspace::create(temp.path()).unwrap();
            let root = ws.create_folder(NewFolder::new("Root")).unwrap();
            ws.create_folder(NewFolder::new("Child").under(root.id)).unwrap();
            ws.create_note(NewNote::new("Hello", "world").in_folder(root.id))
                .unwrap();
        }

        let ws = Workspace::open(temp.path()).unwrap();
        let tree = ws.tree();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].item.name, "Root");
        assert!(tree[0].has_children);
        assert_eq!(tree[0].children[0].item.name, "Child");
        assert_eq!(tree[0].children[0].depth, 1);
        assert_eq!(ws.note_groups().by_folder[&tree[0].item.id].len(), 1);
    }

    #[test]
    fn test_folder_path_and_stats() {
        let temp = NamedTempFile::new().unwrap();
        let mut ws = Workspace::create(temp.path()).unwrap();
        let a = ws.create_folder(NewFolder::new("A")).unwrap();
        let b = ws.create_folder(NewFolder::new("B").under(a.id)).unwrap();
        ws.create_note(NewNote::new("n", "12345").in_folder(b.id)).unwrap();

        let path: Vec<_> = ws.folder_path(b.id).into_iter().map(|f| f.name).collect();
        assert_eq!(path, vec!["A", "B"]);

        let stats = ws.folder_stats(b.id).unwrap();
        assert_eq!(stats.note_count, 1);
        assert_eq!(stats.total_chars, 5);
        assert_eq!(ws.folder_stats(a.id).unwrap().subfolder_count, 1);
    }

    #[test]
    fn test_move_note_into_folder_expands_it() {
        let temp = NamedTempFile::new().unwrap();
        let mut ws = Workspace::create(temp.path()).unwrap();
        let folder = ws.create_folder(NewFolder::new("Inbox")).unwrap();
        let note = ws.create_note(NewNote::new("loose", "")).unwrap();

        let moved = ws
            .move_item(MoveRequest::new(EntityRef::Note(note.id), Some(folder.id), 0))
            .unwrap();
        assert!(matches!(moved, Entity::Note(ref n) if n.folder_id == Some(folder.id)));
        assert!(ws.view_state().is_expanded(folder.id));
        assert_eq!(ws.notes_in(Some(folder.id)).len(), 1);
    }

    #[test]
    fn test_export_note_and_workspace() {
        let temp = NamedTempFile::new().unwrap();
        let mut ws = Workspace::create(temp.path()).unwrap();
        let note = ws.create_note(NewNote::new("Title", "Body")).unwrap();
        let tag = ws.create_tag(&NewTag::new("t")).unwrap();
        ws.tag_note(note.id, tag.id).unwrap();

        assert_eq!(ws.export_note_markdown(note.id).unwrap(), "# Title\n\nBody");
        assert!(ws.export_note_json(note.id).unwrap().contains("\"exportedAt\""));

        let json = ws.export_workspace().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["notes"].as_array().unwrap().len(), 1);
        assert_eq!(value["tags"][0]["name"], "t");
        assert_eq!(value["noteTags"][0]["noteId"], note.id);
    }

    #[test]
    fn test_operations_are_listed_and_purged() {
        let temp = NamedTempFile::new().unwrap();
        let mut ws = Workspace::create(temp.path()).unwrap();
        let folder = ws.create_folder(NewFolder::new("F")).unwrap();
        ws.toggle_folder_favorite(folder.id).unwrap();

        let ops = ws.list_operations(Some("UpdateFolder"), 10).unwrap();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].target_id, Some(folder.id));
        assert_eq!(ws.purge_all_operations().unwrap(), 2);
    }

    #[test]
    fn test_from_settings_creates_then_opens() {
        let dir = tempfile::TempDir::new().unwrap();
        let settings = AppSettings {
            database_path: dir
                .path()
                .join("sub")
                .join("notes.db")
                .to_string_lossy()
                .to_string(),
            operation_log_keep_last: 1,
            ..AppSettings::default()
        };

        {
            let mut ws = Workspace::from_settings(&settings).unwrap();
            ws.create_folder(NewFolder::new("one")).unwrap();
            ws.create_folder(NewFolder::new("two")).unwrap();
            assert_eq!(ws.list_operations(None, 10).unwrap().len(), 1);
        }
        let ws = Workspace::from_settings(&settings).unwrap();
        assert_eq!(ws.list_all_folders().len(), 2);
    }
}
