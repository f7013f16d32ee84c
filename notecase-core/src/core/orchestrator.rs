//! Optimistic CRUD over a [`LocalStore`] and a [`Persistence`] backend.
//!
//! Every mutation is split in two:
//!
//! 1. **stage**: validate, apply the change to the local store at once and
//!    return a [`PendingMutation`] carrying the backend request and a
//!    [`Journal`] of what was overwritten;
//! 2. **settle**: feed in the backend's answer. A success reconciles the
//!    store with the committed data; a failure replays the journal so the
//!    store is exactly as it was before staging.
//!
//! Several mutations may be staged before any of them settles. They are not
//! coordinated with each other: if two touch the same entity, whichever
//! settles last decides what the store shows.
//!
//! The convenience methods (`create_folder`, `move_item`, ...) stage, call
//! the backend and settle in one step.

use crate::core::folder::validate_folder_name;
use crate::core::moves::{resolve_insert_position, validate_move, validate_reorder};
use crate::core::note::{validate_note_title, MAX_NOTE_TITLE_LEN};
use crate::{
    DeleteResult, DeleteStrategy, Entity, EntityRef, Folder, FolderId, FolderPatch, FolderStats,
    Journal, LocalStore, MoveRequest, NewFolder, NewNote, Note, NoteId, NotePatch, NotecaseError,
    Persistence, Result, UiStateSink,
};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const COPY_SUFFIX: &str = " (Copy)";

/// Where an entity is in its mutation lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MutationState {
    Idle,
    Pending,
    Committed,
    RolledBack,
}

/// The backend call a staged mutation is waiting on.
#[derive(Debug, Clone, PartialEq)]
pub enum MutationRequest {
    CreateFolder {
        temp_id: FolderId,
        input: NewFolder,
    },
    UpdateFolder {
        id: FolderId,
        patch: FolderPatch,
    },
    DeleteFolder {
        id: FolderId,
        strategy: DeleteStrategy,
    },
    MoveFolder {
        id: FolderId,
        new_parent_id: Option<FolderId>,
        new_position: usize,
    },
    ReorderFolders {
        parent_id: Option<FolderId>,
        ordered_ids: Vec<FolderId>,
    },
    CreateNote {
        temp_id: NoteId,
        input: NewNote,
    },
    UpdateNote {
        id: NoteId,
        patch: NotePatch,
    },
    DeleteNote {
        id: NoteId,
    },
    MoveNote {
        id: NoteId,
        new_folder_id: Option<FolderId>,
        new_position: usize,
    },
    ReorderNotes {
        folder_id: Option<FolderId>,
        ordered_ids: Vec<NoteId>,
    },
}

impl MutationRequest {
    /// Sends the request to `backend`, flattening its error to a message.
    pub fn execute<P: Persistence>(&self, backend: &mut P) -> std::result::Result<Committed, String> {
        let result = match self {
            Self::CreateFolder { input, .. } => backend.create_folder(input).map(Committed::Folder),
            Self::UpdateFolder { id, patch } => {
                backend.update_folder(*id, patch).map(Committed::Folder)
            }
            Self::DeleteFolder { id, strategy } => {
                backend.delete_folder(*id, *strategy).map(Committed::Deleted)
            }
            Self::MoveFolder {
                id,
                new_parent_id,
                new_position,
            } => backend
                .move_folder(*id, *new_parent_id, *new_position)
                .map(Committed::Folder),
            Self::ReorderFolders {
                parent_id,
                ordered_ids,
            } => backend
                .reorder_folders(*parent_id, ordered_ids)
                .map(Committed::Folders),
            Self::CreateNote { input, .. } => backend.create_note(input).map(Committed::Note),
            Self::UpdateNote { id, patch } => backend.update_note(*id, patch).map(Committed::Note),
            Self::DeleteNote { id } => backend.delete_note(*id).map(Committed::Deleted),
            Self::MoveNote {
                id,
                new_folder_id,
                new_position,
            } => backend
                .move_note(*id, *new_folder_id, *new_position)
                .map(Committed::Note),
            Self::ReorderNotes {
                folder_id,
                ordered_ids,
            } => backend
                .reorder_notes(*folder_id, ordered_ids)
                .map(Committed::Notes),
        };
        result.map_err(|e| e.to_string())
    }

    fn describe(&self) -> String {
        match self {
            Self::CreateFolder { temp_id, .. } => format!("create of folder {temp_id}"),
            Self::UpdateFolder { id, .. } => format!("update of folder {id}"),
            Self::DeleteFolder { id, .. } => format!("delete of folder {id}"),
            Self::MoveFolder { id, .. } => format!("move of folder {id}"),
            Self::ReorderFolders { parent_id, .. } => format!("reorder under {parent_id:?}"),
            Self::CreateNote { temp_id, .. } => format!("create of note {temp_id}"),
            Self::UpdateNote { id, .. } => format!("update of note {id}"),
            Self::DeleteNote { id } => format!("delete of note {id}"),
            Self::MoveNote { id, .. } => format!("move of note {id}"),
            Self::ReorderNotes { folder_id, .. } => format!("note reorder in {folder_id:?}"),
        }
    }
}

/// What the backend committed.
#[derive(Debug, Clone, PartialEq)]
pub enum Committed {
    Folder(Folder),
    Note(Note),
    Deleted(DeleteResult),
    Folders(Vec<Folder>),
    Notes(Vec<Note>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum MutationOutcome {
    Committed(Committed),
    /// The local store was restored; `error` is the backend's message.
    RolledBack { error: String },
}

/// A mutation that has been applied locally and awaits the backend.
#[must_use = "a staged mutation must be settled or the local change is never reconciled"]
#[derive(Debug)]
pub struct PendingMutation {
    request: MutationRequest,
    journal: Journal,
    subjects: Vec<EntityRef>,
}

impl PendingMutation {
    pub fn request(&self) -> &MutationRequest {
        &self.request
    }

    /// Entities changed by the optimistic apply.
    pub fn subjects(&self) -> &[EntityRef] {
        &self.subjects
    }
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

fn unexpected(committed: Committed) -> NotecaseError {
    NotecaseError::PersistenceFailed(format!("Unexpected backend response: {committed:?}"))
}

/// Entities a committed delete removed outright, as opposed to re-parented.
fn removed_by(request: &MutationRequest, result: &DeleteResult) -> Vec<EntityRef> {
    match request {
        MutationRequest::DeleteFolder {
            id,
            strategy: DeleteStrategy::PromoteChildren,
        } => vec![EntityRef::Folder(*id)],
        _ => result.affected_ids.clone(),
    }
}

/// `"<title> (Copy)"`, shortening the title so the result stays a valid title.
fn copy_title(title: &str) -> String {
    let keep = MAX_NOTE_TITLE_LEN - COPY_SUFFIX.chars().count();
    let base: String = title.chars().take(keep).collect();
    format!("{}{COPY_SUFFIX}", base.trim_end())
}

pub struct Orchestrator<P, S = ()> {
    backend: P,
    store: LocalStore,
    sink: S,
    in_flight: HashMap<EntityRef, usize>,
    settled: HashMap<EntityRef, MutationState>,
}

impl<P: Persistence, S: UiStateSink> Orchestrator<P, S> {
    /// Creates an orchestrator with an empty store; call [`reload`](Self::reload) to fill it.
    pub fn new(backend: P, sink: S) -> Self {
        Self {
            backend,
            store: LocalStore::new(),
            sink,
            in_flight: HashMap::new(),
            settled: HashMap::new(),
        }
    }

    /// Replaces the local store with everything the backend holds.
    pub fn reload(&mut self) -> Result<()> {
        let folders = self.backend.load_folders()?;
        let notes = self.backend.load_notes()?;
        self.store.replace_all(folders, notes);
        debug!(
            "loaded {} folders and {} notes",
            self.store.folder_count(),
            self.store.note_count()
        );
        Ok(())
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    pub fn backend(&self) -> &P {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut P {
        &mut self.backend
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn folder_stats(&self, id: FolderId) -> Result<FolderStats> {
        self.store
            .folder_stats(id)
            .ok_or(NotecaseError::FolderNotFound(id))
    }

    pub fn mutation_state(&self, entity: EntityRef) -> MutationState {
        if self.in_flight.contains_key(&entity) {
            return MutationState::Pending;
        }
        self.settled
            .get(&entity)
            .copied()
            .unwrap_or(MutationState::Idle)
    }

    /// Returns a settled entity to `Idle` once its outcome has been shown.
    pub fn acknowledge(&mut self, entity: EntityRef) {
        self.settled.remove(&entity);
    }

    pub fn has_pending(&self) -> bool {
        !self.in_flight.is_empty()
    }

    fn saved_folder(&self, id: FolderId) -> Result<&Folder> {
        if id < 0 {
            return Err(NotecaseError::ValidationFailed(format!(
                "Folder {id} has not been saved yet"
            )));
        }
        self.store.folder(id).ok_or(NotecaseError::FolderNotFound(id))
    }

    fn saved_note(&self, id: NoteId) -> Result<&Note> {
        if id < 0 {
            return Err(NotecaseError::ValidationFailed(format!(
                "Note {id} has not been saved yet"
            )));
        }
        self.store.note(id).ok_or(NotecaseError::NoteNotFound(id))
    }

    /// A new item may only be placed in a folder the backend already knows.
    fn require_container(&self, container: Option<FolderId>) -> Result<()> {
        match container {
            Some(pid) if pid < 0 => Err(NotecaseError::ValidationFailed(format!(
                "Folder {pid} has not been saved yet"
            ))),
            Some(pid) if !self.store.contains_folder(pid) => Err(NotecaseError::InvalidMove(
                format!("Target folder {pid} does not exist"),
            )),
            _ => Ok(()),
        }
    }

    fn folder_ids(&self, parent: Option<FolderId>) -> Vec<FolderId> {
        self.store
            .child_folders(parent)
            .into_iter()
            .map(|f| f.id)
            .collect()
    }

    fn note_ids(&self, folder: Option<FolderId>) -> Vec<NoteId> {
        self.store.notes_in(folder).into_iter().map(|n| n.id).collect()
    }

    fn begin(&mut self, request: MutationRequest, journal: Journal) -> PendingMutation {
        let subjects: Vec<EntityRef> = journal.touched().collect();
        for subject in &subjects {
            *self.in_flight.entry(*subject).or_default() += 1;
            self.settled.remove(subject);
        }
        debug!("staged {}", request.describe());
        PendingMutation {
            request,
            journal,
            subjects,
        }
    }

    // ── stage ────────────────────────────────────────────────────────

    pub fn stage_create_folder(&mut self, input: NewFolder) -> Result<PendingMutation> {
        let name = validate_folder_name(&input.name)?;
        self.require_container(input.parent_id)?;
        let mut order = self.folder_ids(input.parent_id);
        let position = resolve_insert_position(input.position, order.len())?;

        let temp_id = self.store.allocate_temp_id();
        let now = now();
        let folder = Folder {
            id: temp_id,
            name: name.clone(),
            parent_id: input.parent_id,
            position: position as i32,
            is_favorite: input.is_favorite,
            is_public: input.is_public,
            created_at: now,
            updated_at: now,
        };

        let mut journal = Journal::default();
        self.store.put_folder(folder, &mut journal);
        order.insert(position, temp_id);
        self.store.renumber_folders(&order, &mut journal);

        let request = MutationRequest::CreateFolder {
            temp_id,
            input: NewFolder { name, ..input },
        };
        Ok(self.begin(request, journal))
    }

    pub fn stage_update_folder(&mut self, id: FolderId, patch: FolderPatch) -> Result<PendingMutation> {
        let mut folder = self.saved_folder(id)?.clone();
        let patch = patch.normalized()?;
        patch.apply_to(&mut folder);
        folder.updated_at = now();

        let mut journal = Journal::default();
        self.store.put_folder(folder, &mut journal);
        Ok(self.begin(MutationRequest::UpdateFolder { id, patch }, journal))
    }

    pub fn stage_delete_folder(
        &mut self,
        id: FolderId,
        strategy: DeleteStrategy,
    ) -> Result<PendingMutation> {
        let parent = self.saved_folder(id)?.parent_id;
        let mut journal = Journal::default();

        match strategy {
            DeleteStrategy::DeleteAll => {
                let mut doomed: Vec<FolderId> =
                    self.store.index().descendants(id).into_iter().collect();
                doomed.push(id);
                for fid in doomed {
                    for nid in self.note_ids(Some(fid)) {
                        self.store.remove_note(nid, &mut journal);
                    }
                    self.store.remove_folder(fid, &mut journal);
                }
                let remaining = self.folder_ids(parent);
                self.store.renumber_folders(&remaining, &mut journal);
            }
            DeleteStrategy::PromoteChildren => {
                let mut folder_order: Vec<FolderId> = self
                    .folder_ids(parent)
                    .into_iter()
                    .filter(|fid| *fid != id)
                    .collect();
                let promoted_folders = self.folder_ids(Some(id));
                let mut note_order = self.note_ids(parent);
                let promoted_notes = self.note_ids(Some(id));

                for fid in &promoted_folders {
                    if let Some(mut child) = self.store.folder(*fid).cloned() {
                        child.parent_id = parent;
                        self.store.put_folder(child, &mut journal);
                    }
                }
                for nid in &promoted_notes {
                    if let Some(mut note) = self.store.note(*nid).cloned() {
                        note.folder_id = parent;
                        self.store.put_note(note, &mut journal);
                    }
                }
                self.store.remove_folder(id, &mut journal);

                folder_order.extend(promoted_folders);
                note_order.extend(promoted_notes);
                self.store.renumber_folders(&folder_order, &mut journal);
                self.store.renumber_notes(&note_order, &mut journal);
            }
        }

        Ok(self.begin(MutationRequest::DeleteFolder { id, strategy }, journal))
    }

    /// Validates and applies a move or reorder of a folder or note.
    pub fn stage_move(&mut self, request: MoveRequest) -> Result<PendingMutation> {
        let plan = validate_move(&self.store, &request)?;
        let now = now();
        let mut journal = Journal::default();

        let request = match plan.item {
            EntityRef::Folder(id) => {
                self.store
                    .place_folder(id, plan.new_parent_id, plan.new_position, now, &mut journal);
                MutationRequest::MoveFolder {
                    id,
                    new_parent_id: plan.new_parent_id,
                    new_position: plan.new_position,
                }
            }
            EntityRef::Note(id) => {
                self.store
                    .place_note(id, plan.new_parent_id, plan.new_position, now, &mut journal);
                MutationRequest::MoveNote {
                    id,
                    new_folder_id: plan.new_parent_id,
                    new_position: plan.new_position,
                }
            }
        };
        Ok(self.begin(request, journal))
    }

    pub fn stage_reorder_folders(
        &mut self,
        parent_id: Option<FolderId>,
        ordered_ids: Vec<FolderId>,
    ) -> Result<PendingMutation> {
        if let Some(pid) = parent_id {
            self.saved_folder(pid)?;
        }
        validate_reorder(&self.folder_ids(parent_id), &ordered_ids)?;

        let mut journal = Journal::default();
        self.store.renumber_folders(&ordered_ids, &mut journal);
        let request = MutationRequest::ReorderFolders {
            parent_id,
            ordered_ids,
        };
        Ok(self.begin(request, journal))
    }

    pub fn stage_create_note(&mut self, input: NewNote) -> Result<PendingMutation> {
        let title = validate_note_title(&input.title)?;
        self.require_container(input.folder_id)?;
        let mut order = self.note_ids(input.folder_id);
        let position = resolve_insert_position(input.position, order.len())?;

        let temp_id = self.store.allocate_temp_id();
        let now = now();
        let note = Note {
            id: temp_id,
            title: title.clone(),
            content: input.content.clone(),
            folder_id: input.folder_id,
            position: position as i32,
            is_favorite: input.is_favorite,
            is_public: input.is_public,
            created_at: now,
            updated_at: now,
        };

        let mut journal = Journal::default();
        self.store.put_note(note, &mut journal);
        order.insert(position, temp_id);
        self.store.renumber_notes(&order, &mut journal);

        let request = MutationRequest::CreateNote {
            temp_id,
            input: NewNote { title, ..input },
        };
        Ok(self.begin(request, journal))
    }

    pub fn stage_update_note(&mut self, id: NoteId, patch: NotePatch) -> Result<PendingMutation> {
        let mut note = self.saved_note(id)?.clone();
        let patch = patch.normalized()?;
        patch.apply_to(&mut note);
        note.updated_at = now();

        let mut journal = Journal::default();
        self.store.put_note(note, &mut journal);
        Ok(self.begin(MutationRequest::UpdateNote { id, patch }, journal))
    }

    pub fn stage_delete_note(&mut self, id: NoteId) -> Result<PendingMutation> {
        let folder = self.saved_note(id)?.folder_id;
        let mut journal = Journal::default();
        self.store.remove_note(id, &mut journal);
        let remaining = self.note_ids(folder);
        self.store.renumber_notes(&remaining, &mut journal);
        Ok(self.begin(MutationRequest::DeleteNote { id }, journal))
    }

    pub fn stage_reorder_notes(
        &mut self,
        folder_id: Option<FolderId>,
        ordered_ids: Vec<NoteId>,
    ) -> Result<PendingMutation> {
        if let Some(fid) = folder_id {
            self.saved_folder(fid)?;
        }
        validate_reorder(&self.note_ids(folder_id), &ordered_ids)?;

        let mut journal = Journal::default();
        self.store.renumber_notes(&ordered_ids, &mut journal);
        let request = MutationRequest::ReorderNotes {
            folder_id,
            ordered_ids,
        };
        Ok(self.begin(request, journal))
    }

    // ── settle ───────────────────────────────────────────────────────

    /// Sends a staged mutation to the backend and settles it with the answer.
    pub fn dispatch(&mut self, pending: PendingMutation) -> MutationOutcome {
        let result = pending.request.execute(&mut self.backend);
        self.settle(pending, result)
    }

    /// Completes a staged mutation with the backend's answer.
    pub fn settle(
        &mut self,
        pending: PendingMutation,
        result: std::result::Result<Committed, String>,
    ) -> MutationOutcome {
        let PendingMutation {
            request,
            journal,
            subjects,
        } = pending;

        for subject in &subjects {
            if let Some(count) = self.in_flight.get_mut(subject) {
                *count -= 1;
                if *count == 0 {
                    self.in_flight.remove(subject);
                }
            }
        }

        match result {
            Ok(committed) => {
                self.reconcile(&request, &committed);
                for subject in subjects {
                    self.settled.insert(subject, MutationState::Committed);
                }
                debug!("committed {}", request.describe());
                MutationOutcome::Committed(committed)
            }
            Err(error) => {
                self.store.restore(journal);
                for subject in subjects {
                    self.settled.insert(subject, MutationState::RolledBack);
                }
                warn!("rolled back {}: {error}", request.describe());
                MutationOutcome::RolledBack { error }
            }
        }
    }

    fn reconcile(&mut self, request: &MutationRequest, committed: &Committed) {
        match request {
            MutationRequest::CreateFolder { temp_id, .. } => {
                self.store.retire(EntityRef::Folder(*temp_id));
            }
            MutationRequest::CreateNote { temp_id, .. } => {
                self.store.retire(EntityRef::Note(*temp_id));
            }
            _ => {}
        }

        match committed {
            Committed::Folder(folder) => self.store.commit_folder(folder.clone()),
            Committed::Note(note) => self.store.commit_note(note.clone()),
            Committed::Folders(folders) => {
                for folder in folders {
                    self.store.commit_folder(folder.clone());
                }
            }
            Committed::Notes(notes) => {
                for note in notes {
                    self.store.commit_note(note.clone());
                }
            }
            Committed::Deleted(result) => {
                for entity in removed_by(request, result) {
                    self.store.discard(entity);
                }
                if let MutationRequest::DeleteFolder { .. } = request {
                    self.refresh_settled();
                }
                for entity in &result.affected_ids {
                    if self.store.get(*entity).is_none() {
                        self.sink.forget(*entity);
                    }
                }
            }
        }

        match (request, committed) {
            (MutationRequest::CreateFolder { temp_id, .. }, Committed::Folder(folder)) => {
                let real = EntityRef::Folder(folder.id);
                self.settled.insert(real, MutationState::Committed);
                self.sink.replace_id(EntityRef::Folder(*temp_id), real);
                self.sink.select(Some(real));
                if let Some(parent) = folder.parent_id {
                    self.sink.expand_folder(parent);
                }
            }
            (MutationRequest::CreateNote { temp_id, .. }, Committed::Note(note)) => {
                let real = EntityRef::Note(note.id);
                self.settled.insert(real, MutationState::Committed);
                self.sink.replace_id(EntityRef::Note(*temp_id), real);
                self.sink.select(Some(real));
                if let Some(folder) = note.folder_id {
                    self.sink.expand_folder(folder);
                }
            }
            (
                MutationRequest::MoveFolder {
                    new_parent_id: Some(parent),
                    ..
                }
                | MutationRequest::MoveNote {
                    new_folder_id: Some(parent),
                    ..
                },
                _,
            ) => self.sink.expand_folder(*parent),
            _ => {}
        }
    }

    /// Replaces every entity without a mutation in flight by its committed
    /// state. A folder delete may have re-parented or removed items that
    /// another mutation committed after the delete was staged.
    fn refresh_settled(&mut self) {
        let loaded = self
            .backend
            .load_folders()
            .and_then(|folders| Ok((folders, self.backend.load_notes()?)));
        match loaded {
            Ok((folders, notes)) => {
                let in_flight = &self.in_flight;
                self.store
                    .merge_settled(folders, notes, |entity| in_flight.contains_key(&entity));
            }
            Err(e) => warn!("could not refresh after delete: {e}"),
        }
    }

    // ── one-shot convenience ─────────────────────────────────────────

    fn run(&mut self, pending: PendingMutation) -> Result<Committed> {
        match self.dispatch(pending) {
            MutationOutcome::Committed(committed) => Ok(committed),
            MutationOutcome::RolledBack { error } => Err(NotecaseError::PersistenceFailed(error)),
        }
    }

    fn run_folder(&mut self, pending: PendingMutation) -> Result<Folder> {
        match self.run(pending)? {
            Committed::Folder(folder) => Ok(folder),
            other => Err(unexpected(other)),
        }
    }

    fn run_note(&mut self, pending: PendingMutation) -> Result<Note> {
        match self.run(pending)? {
            Committed::Note(note) => Ok(note),
            other => Err(unexpected(other)),
        }
    }

    fn run_delete(&mut self, pending: PendingMutation) -> Result<DeleteResult> {
        match self.run(pending)? {
            Committed::Deleted(result) => Ok(result),
            other => Err(unexpected(other)),
        }
    }

    pub fn create_folder(&mut self, input: NewFolder) -> Result<Folder> {
        let pending = self.stage_create_folder(input)?;
        self.run_folder(pending)
    }

    pub fn update_folder(&mut self, id: FolderId, patch: FolderPatch) -> Result<Folder> {
        let pending = self.stage_update_folder(id, patch)?;
        self.run_folder(pending)
    }

    pub fn rename_folder(&mut self, id: FolderId, name: &str) -> Result<Folder> {
        self.update_folder(id, FolderPatch::rename(name))
    }

    pub fn toggle_folder_favorite(&mut self, id: FolderId) -> Result<Folder> {
        let is_favorite = self.saved_folder(id)?.is_favorite;
        self.update_folder(id, FolderPatch::favorite(!is_favorite))
    }

    /// Deletes a folder. The strategy is always explicit; see [`DeleteStrategy`].
    pub fn delete_folder(&mut self, id: FolderId, strategy: DeleteStrategy) -> Result<DeleteResult> {
        let pending = self.stage_delete_folder(id, strategy)?;
        self.run_delete(pending)
    }

    /// Moves or reorders a folder or note and returns its committed state.
    pub fn move_item(&mut self, request: MoveRequest) -> Result<Entity> {
        let pending = self.stage_move(request)?;
        match self.run(pending)? {
            Committed::Folder(folder) => Ok(Entity::Folder(folder)),
            Committed::Note(note) => Ok(Entity::Note(note)),
            other => Err(unexpected(other)),
        }
    }

    pub fn reorder_folders(
        &mut self,
        parent_id: Option<FolderId>,
        ordered_ids: Vec<FolderId>,
    ) -> Result<Vec<Folder>> {
        let pending = self.stage_reorder_folders(parent_id, ordered_ids)?;
        match self.run(pending)? {
            Committed::Folders(folders) => Ok(folders),
            other => Err(unexpected(other)),
        }
    }

    pub fn create_note(&mut self, input: NewNote) -> Result<Note> {
        let pending = self.stage_create_note(input)?;
        self.run_note(pending)
    }

    pub fn update_note(&mut self, id: NoteId, patch: NotePatch) -> Result<Note> {
        let pending = self.stage_update_note(id, patch)?;
        self.run_note(pending)
    }

    pub fn toggle_note_favorite(&mut self, id: NoteId) -> Result<Note> {
        let is_favorite = self.saved_note(id)?.is_favorite;
        self.update_note(id, NotePatch::favorite(!is_favorite))
    }

    pub fn delete_note(&mut self, id: NoteId) -> Result<DeleteResult> {
        let pending = self.stage_delete_note(id)?;
        self.run_delete(pending)
    }

    pub fn reorder_notes(
        &mut self,
        folder_id: Option<FolderId>,
        ordered_ids: Vec<NoteId>,
    ) -> Result<Vec<Note>> {
        let pending = self.stage_reorder_notes(folder_id, ordered_ids)?;
        match self.run(pending)? {
            Committed::Notes(notes) => Ok(notes),
            other => Err(unexpected(other)),
        }
    }

    /// Creates a copy of a note at the end of the same folder, titled
    /// `"<title> (Copy)"`. The copy is never a favourite.
    pub fn duplicate_note(&mut self, id: NoteId) -> Result<Note> {
        let source = self.saved_note(id)?;
        let input = NewNote {
            title: copy_title(&source.title),
            content: source.content.clone(),
            folder_id: source.folder_id,
            position: None,
            is_favorite: false,
            is_public: source.is_public,
        };
        self.create_note(input)
    }
}
