//! The owned, in-memory entity store that the orchestrator mutates.
//!
//! `LocalStore` holds every folder and note the UI currently knows about,
//! including optimistic entries under temporary (negative) ids. It replaces
//! an implicit query cache: derived data (the [`FolderIndex`] and the display
//! tree) is cached only until [`LocalStore::invalidate`] runs, which every
//! mutating method calls.
//!
//! Mutations that may need to be undone take a [`Journal`], which records
//! the prior state of each touched entity the first time it is touched.
//! [`LocalStore::restore`] replays the journal to put those entities back
//! exactly as they were. A temporary id that has been retired by a committed
//! create is never brought back, even when a later rollback journaled it.

use crate::core::moves::FolderIndex;
use crate::core::tree::{build_tree, group_notes, NoteGroups, TreeNode};
use crate::{Entity, EntityRef, Folder, FolderId, FolderStats, Note, NoteId};
use std::cell::OnceCell;
use std::collections::{BTreeMap, HashSet};

/// Prior states of entities touched by one optimistic mutation.
///
/// `None` means the entity did not exist before the mutation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Journal {
    folders: BTreeMap<FolderId, Option<Folder>>,
    notes: BTreeMap<NoteId, Option<Note>>,
}

impl Journal {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.folders.is_empty() && self.notes.is_empty()
    }

    /// Every entity reference recorded in this journal.
    pub fn touched(&self) -> impl Iterator<Item = EntityRef> + '_ {
        self.folders
            .keys()
            .map(|id| EntityRef::Folder(*id))
            .chain(self.notes.keys().map(|id| EntityRef::Note(*id)))
    }
}

#[derive(Debug, Clone)]
pub struct LocalStore {
    folders: BTreeMap<FolderId, Folder>,
    notes: BTreeMap<NoteId, Note>,
    next_temp_id: i64,
    retired: HashSet<EntityRef>,
    index: OnceCell<FolderIndex>,
}

impl Default for LocalStore {
    fn default() -> Self {
        Self {
            folders: BTreeMap::new(),
            notes: BTreeMap::new(),
            next_temp_id: -1,
            retired: HashSet::new(),
            index: OnceCell::new(),
        }
    }
}

/// Two stores are equal when they hold the same entities; caches and
/// temporary-id bookkeeping are ignored.
impl PartialEq for LocalStore {
    fn eq(&self, other: &Self) -> bool {
        self.folders == other.folders && self.notes == other.notes
    }
}

impl LocalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entities(folders: Vec<Folder>, notes: Vec<Note>) -> Self {
        let mut store = Self::new();
        store.replace_all(folders, notes);
        store
    }

    /// Swaps in a freshly loaded data set, discarding everything held locally.
    pub fn replace_all(&mut self, folders: Vec<Folder>, notes: Vec<Note>) {
        self.folders = folders.into_iter().map(|f| (f.id, f)).collect();
        self.notes = notes.into_iter().map(|n| (n.id, n)).collect();
        self.invalidate();
    }

    /// Drops every cached derivation. Called after each mutation.
    pub fn invalidate(&mut self) {
        self.index = OnceCell::new();
    }

    pub fn folders(&self) -> impl Iterator<Item = &Folder> {
        self.folders.values()
    }

    pub fn notes(&self) -> impl Iterator<Item = &Note> {
        self.notes.values()
    }

    pub fn folder_count(&self) -> usize {
        self.folders.len()
    }

    pub fn note_count(&self) -> usize {
        self.notes.len()
    }

    pub fn folder(&self, id: FolderId) -> Option<&Folder> {
        self.folders.get(&id)
    }

    pub fn note(&self, id: NoteId) -> Option<&Note> {
        self.notes.get(&id)
    }

    pub fn contains_folder(&self, id: FolderId) -> bool {
        self.folders.contains_key(&id)
    }

    pub fn contains_note(&self, id: NoteId) -> bool {
        self.notes.contains_key(&id)
    }

    /// Looks up either kind of entity, cloned.
    pub fn get(&self, entity: EntityRef) -> Option<Entity> {
        match entity {
            EntityRef::Folder(id) => self.folder(id).cloned().map(Entity::Folder),
            EntityRef::Note(id) => self.note(id).cloned().map(Entity::Note),
        }
    }

    /// The cached parent/children index, rebuilt on first use after a mutation.
    pub fn index(&self) -> &FolderIndex {
        self.index.get_or_init(|| FolderIndex::build(self.folders.values()))
    }

    /// The display tree of all folders.
    pub fn tree(&self) -> Vec<TreeNode<Folder>> {
        let folders: Vec<Folder> = self.folders.values().cloned().collect();
        build_tree(&folders)
    }

    /// Notes bucketed by folder, using the same orphan policy as the tree.
    pub fn note_groups(&self) -> NoteGroups {
        let folders: Vec<Folder> = self.folders.values().cloned().collect();
        let notes: Vec<Note> = self.notes.values().cloned().collect();
        group_notes(&notes, &folders)
    }

    /// Child folders of `parent`, ordered by position then id.
    pub fn child_folders(&self, parent: Option<FolderId>) -> Vec<&Folder> {
        let mut kids: Vec<&Folder> = self
            .folders
            .values()
            .filter(|f| f.parent_id == parent)
            .collect();
        kids.sort_by_key(|f| (f.position, f.id));
        kids
    }

    /// Notes filed in `folder` (or unfiled when `None`), ordered by position then id.
    pub fn notes_in(&self, folder: Option<FolderId>) -> Vec<&Note> {
        let mut notes: Vec<&Note> = self
            .notes
            .values()
            .filter(|n| n.folder_id == folder)
            .collect();
        notes.sort_by_key(|n| (n.position, n.id));
        notes
    }

    /// Breadcrumb from the outermost ancestor down to `id` itself.
    pub fn folder_path(&self, id: FolderId) -> Vec<&Folder> {
        if !self.contains_folder(id) {
            return Vec::new();
        }
        let mut path: Vec<&Folder> = self
            .index()
            .ancestors(id)
            .into_iter()
            .filter_map(|fid| self.folder(fid))
            .collect();
        path.extend(self.folder(id));
        path
    }

    pub fn folder_stats(&self, id: FolderId) -> Option<FolderStats> {
        self.folder(id)?;
        let notes = self.notes_in(Some(id));
        Some(FolderStats {
            note_count: notes.len(),
            subfolder_count: self.index().children(Some(id)).len(),
            total_chars: notes.iter().map(|n| n.content.chars().count()).sum(),
        })
    }

    /// Favourite folders ordered by name.
    pub fn favorite_folders(&self) -> Vec<&Folder> {
        let mut favs: Vec<&Folder> = self.folders.values().filter(|f| f.is_favorite).collect();
        favs.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()).then(a.id.cmp(&b.id)));
        favs
    }

    /// Favourite notes, most recently updated first.
    pub fn favorite_notes(&self) -> Vec<&Note> {
        let mut favs: Vec<&Note> = self.notes.values().filter(|n| n.is_favorite).collect();
        favs.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(b.id.cmp(&a.id)));
        favs
    }

    /// Hands out the next temporary id: -1, -2, ...
    pub fn allocate_temp_id(&mut self) -> i64 {
        let id = self.next_temp_id;
        self.next_temp_id -= 1;
        id
    }

    // ── journaled mutations ──────────────────────────────────────────

    pub fn put_folder(&mut self, folder: Folder, journal: &mut Journal) {
        journal
            .folders
            .entry(folder.id)
            .or_insert_with(|| self.folders.get(&folder.id).cloned());
        self.folders.insert(folder.id, folder);
        self.invalidate();
    }

    pub fn remove_folder(&mut self, id: FolderId, journal: &mut Journal) -> Option<Folder> {
        journal
            .folders
            .entry(id)
            .or_insert_with(|| self.folders.get(&id).cloned());
        let removed = self.folders.remove(&id);
        self.invalidate();
        removed
    }

    pub fn put_note(&mut self, note: Note, journal: &mut Journal) {
        journal
            .notes
            .entry(note.id)
            .or_insert_with(|| self.notes.get(&note.id).cloned());
        self.notes.insert(note.id, note);
        self.invalidate();
    }

    pub fn remove_note(&mut self, id: NoteId, journal: &mut Journal) -> Option<Note> {
        journal
            .notes
            .entry(id)
            .or_insert_with(|| self.notes.get(&id).cloned());
        let removed = self.notes.remove(&id);
        self.invalidate();
        removed
    }

    /// Puts every journaled entity back into its recorded prior state.
    /// Retired temporary ids stay gone.
    pub fn restore(&mut self, journal: Journal) {
        for (id, prior) in journal.folders {
            match prior {
                Some(_) if self.retired.contains(&EntityRef::Folder(id)) => None,
                Some(folder) => self.folders.insert(id, folder),
                None => self.folders.remove(&id),
            };
        }
        for (id, prior) in journal.notes {
            match prior {
                Some(_) if self.retired.contains(&EntityRef::Note(id)) => None,
                Some(note) => self.notes.insert(id, note),
                None => self.notes.remove(&id),
            };
        }
        self.invalidate();
    }

    /// Applies committed data without journaling it.
    pub fn commit_folder(&mut self, folder: Folder) {
        self.folders.insert(folder.id, folder);
        self.invalidate();
    }

    pub fn commit_note(&mut self, note: Note) {
        self.notes.insert(note.id, note);
        self.invalidate();
    }

    /// Drops a temporary entry whose create has committed under a real id.
    pub fn retire(&mut self, entity: EntityRef) {
        self.retired.insert(entity);
        self.discard(entity);
    }

    /// Drops an entry without journaling it.
    pub fn discard(&mut self, entity: EntityRef) {
        match entity {
            EntityRef::Folder(id) => {
                self.folders.remove(&id);
            }
            EntityRef::Note(id) => {
                self.notes.remove(&id);
            }
        }
        self.invalidate();
    }

    /// Brings every settled entity in line with freshly loaded backend data.
    ///
    /// Entities for which `pending` returns `true`, and temporary entries,
    /// keep their optimistic state; everything else is replaced by the loaded
    /// copy or dropped when the backend no longer has it.
    pub fn merge_settled(
        &mut self,
        folders: Vec<Folder>,
        notes: Vec<Note>,
        pending: impl Fn(EntityRef) -> bool,
    ) {
        let folders: BTreeMap<FolderId, Folder> = folders.into_iter().map(|f| (f.id, f)).collect();
        let notes: BTreeMap<NoteId, Note> = notes.into_iter().map(|n| (n.id, n)).collect();

        self.folders.retain(|id, _| {
            *id < 0 || folders.contains_key(id) || pending(EntityRef::Folder(*id))
        });
        for (id, folder) in folders {
            if !pending(EntityRef::Folder(id)) {
                self.folders.insert(id, folder);
            }
        }

        self.notes
            .retain(|id, _| *id < 0 || notes.contains_key(id) || pending(EntityRef::Note(*id)));
        for (id, note) in notes {
            if !pending(EntityRef::Note(id)) {
                self.notes.insert(id, note);
            }
        }
        self.invalidate();
    }

    // ── ordering helpers ─────────────────────────────────────────────

    /// Rewrites positions of `order` to `0..n`, touching only folders whose position changes.
    pub fn renumber_folders(&mut self, order: &[FolderId], journal: &mut Journal) {
        for (position, id) in order.iter().enumerate() {
            let position = position as i32;
            if let Some(folder) = self.folders.get(id) {
                if folder.position != position {
                    let mut folder = folder.clone();
                    folder.position = position;
                    self.put_folder(folder, journal);
                }
            }
        }
    }

    pub fn renumber_notes(&mut self, order: &[NoteId], journal: &mut Journal) {
        for (position, id) in order.iter().enumerate() {
            let position = position as i32;
            if let Some(note) = self.notes.get(id) {
                if note.position != position {
                    let mut note = note.clone();
                    note.position = position;
                    self.put_note(note, journal);
                }
            }
        }
    }

    /// Moves folder `id` under `new_parent` at `new_position`, closing the gap
    /// in its old sibling group and renumbering both groups densely.
    pub fn place_folder(
        &mut self,
        id: FolderId,
        new_parent: Option<FolderId>,
        new_position: usize,
        updated_at: i64,
        journal: &mut Journal,
    ) {
        let Some(mut folder) = self.folders.get(&id).cloned() else {
            return;
        };
        let old_parent = folder.parent_id;
        if old_parent != new_parent {
            let old_group: Vec<FolderId> = self
                .child_folders(old_parent)
                .into_iter()
                .map(|f| f.id)
                .filter(|fid| *fid != id)
                .collect();
            self.renumber_folders(&old_group, journal);
        }
        let mut new_group: Vec<FolderId> = self
            .child_folders(new_parent)
            .into_iter()
            .map(|f| f.id)
            .filter(|fid| *fid != id)
            .collect();
        new_group.insert(new_position.min(new_group.len()), id);

        folder.parent_id = new_parent;
        folder.updated_at = updated_at;
        self.put_folder(folder, journal);
        self.renumber_folders(&new_group, journal);
    }

    /// Note counterpart of [`place_folder`](Self::place_folder).
    pub fn place_note(
        &mut self,
        id: NoteId,
        new_folder: Option<FolderId>,
        new_position: usize,
        updated_at: i64,
        journal: &mut Journal,
    ) {
        let Some(mut note) = self.notes.get(&id).cloned() else {
            return;
        };
        let old_folder = note.folder_id;
        if old_folder != new_folder {
            let old_group: Vec<NoteId> = self
                .notes_in(old_folder)
                .into_iter()
                .map(|n| n.id)
                .filter(|nid| *nid != id)
                .collect();
            self.renumber_notes(&old_group, journal);
        }
        let mut new_group: Vec<NoteId> = self
            .notes_in(new_folder)
            .into_iter()
            .map(|n| n.id)
            .filter(|nid| *nid != id)
            .collect();
        new_group.insert(new_position.min(new_group.len()), id);

        note.folder_id = new_folder;
        note.updated_at = updated_at;
        self.put_note(note, journal);
        self.renumber_notes(&new_group, journal);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn folder(id: i64, parent_id: Option<i64>, position: i32) -> Folder {
        Folder {
            id,
            name: format!("f{id}"),
            parent_id,
            position,
            is_favorite: false,
            is_public: false,
            created_at: 0,
            updated_at: 0,
        }
    }

    fn note(id: i64, folder_id: Option<i64>, position: i32) -> Note {
        Note {
            id,
            title: format!("n{id}"),
            content: String::new(),
            folder_id,
            position,
            is_favorite: false,
            is_public: false,
            created_at: 0,
            updated_at: 0,
        }
    }

    fn positions(store: &LocalStore, parent: Option<i64>) -> Vec<(i64, i32)> {
        store
            .child_folders(parent)
            .into_iter()
            .map(|f| (f.id, f.position))
            .collect()
    }

    #[test]
    fn test_restore_undoes_put_and_remove() {
        let mut store = LocalStore::from_entities(vec![folder(1, None, 0)], vec![note(5, Some(1), 0)]);
        let before = store.clone();
        let mut journal = Journal::default();

        store.put_folder(folder(2, None, 1), &mut journal);
        let mut renamed = folder(1, None, 0);
        renamed.name = "changed".to_string();
        store.put_folder(renamed, &mut journal);
        store.remove_note(5, &mut journal);
        assert_ne!(store, before);

        store.restore(journal);
        assert_eq!(store, before);
    }

    #[test]
    fn test_restore_skips_retired_temporary_ids() {
        let mut store = LocalStore::new();
        let mut create = Journal::default();
        store.put_folder(folder(-1, None, 0), &mut create);

        let mut shuffle = Journal::default();
        store.put_folder(folder(-1, None, 1), &mut shuffle);

        store.retire(EntityRef::Folder(-1));
        store.commit_folder(folder(1, None, 0));
        store.restore(shuffle);

        let ids: Vec<_> = store.folders().map(|f| f.id).collect();
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn test_merge_settled_keeps_pending_entities() {
        let mut store = LocalStore::from_entities(
            vec![folder(1, None, 0), folder(2, None, 1), folder(3, Some(1), 0)],
            vec![note(1, Some(3), 0)],
        );
        let mut journal = Journal::default();
        store.put_folder(folder(-1, None, 2), &mut journal);
        let mut moved = folder(2, None, 7);
        moved.name = "optimistic".to_string();
        store.put_folder(moved, &mut journal);

        store.merge_settled(
            vec![folder(1, None, 0), folder(2, None, 1)],
            vec![],
            |entity| entity == EntityRef::Folder(2),
        );

        let ids: Vec<_> = store.folders().map(|f| f.id).collect();
        assert_eq!(ids, vec![-1, 1, 2]);
        assert_eq!(store.folder(2).map(|f| f.position), Some(7));
        assert_eq!(store.note_count(), 0);
        assert!(store.index().children(Some(1)).is_empty());
    }

    #[test]
    fn test_journal_keeps_first_prior_state() {
        let mut store = LocalStore::from_entities(vec![folder(1, None, 0)], vec![]);
        let mut journal = Journal::default();
        for pos in 1..4 {
            store.put_folder(folder(1, None, pos), &mut journal);
        }
        store.restore(journal);
        assert_eq!(store.folder(1).map(|f| f.position), Some(0));
    }

    #[test]
    fn test_place_folder_reorders_within_parent() {
        let mut store = LocalStore::from_entities(
            vec![folder(1, None, 0), folder(2, None, 1), folder(3, None, 2)],
            vec![],
        );
        let mut journal = Journal::default();
        store.place_folder(3, None, 0, 9, &mut journal);
        assert_eq!(positions(&store, None), vec![(3, 0), (1, 1), (2, 2)]);
    }

    #[test]
    fn test_place_folder_across_parents_closes_gap() {
        let mut store = LocalStore::from_entities(
            vec![
                folder(1, None, 0),
                folder(2, Some(1), 0),
                folder(3, Some(1), 1),
                folder(4, Some(1), 2),
                folder(5, None, 1),
            ],
            vec![],
        );
        let mut journal = Journal::default();
        store.place_folder(3, Some(5), 0, 9, &mut journal);
        assert_eq!(positions(&store, Some(1)), vec![(2, 0), (4, 1)]);
        assert_eq!(positions(&store, Some(5)), vec![(3, 0)]);
        assert_eq!(store.folder(3).map(|f| f.updated_at), Some(9));
    }

    #[test]
    fn test_place_note_into_other_folder() {
        let mut store = LocalStore::from_entities(
            vec![folder(1, None, 0)],
            vec![note(1, None, 0), note(2, None, 1), note(3, Some(1), 0)],
        );
        let mut journal = Journal::default();
        store.place_note(1, Some(1), 0, 5, &mut journal);
        let ids: Vec<_> = store.notes_in(Some(1)).iter().map(|n| (n.id, n.position)).collect();
        assert_eq!(ids, vec![(1, 0), (3, 1)]);
        let unfiled: Vec<_> = store.notes_in(None).iter().map(|n| (n.id, n.position)).collect();
        assert_eq!(unfiled, vec![(2, 0)]);
    }

    #[test]
    fn test_index_is_invalidated_by_mutation() {
        let mut store = LocalStore::from_entities(vec![folder(1, None, 0)], vec![]);
        assert!(store.index().children(Some(1)).is_empty());
        let mut journal = Journal::default();
        store.put_folder(folder(2, Some(1), 0), &mut journal);
        assert_eq!(store.index().children(Some(1)), &[2]);
    }

    #[test]
    fn test_temp_ids_descend() {
        let mut store = LocalStore::new();
        assert_eq!(store.allocate_temp_id(), -1);
        assert_eq!(store.allocate_temp_id(), -2);
    }

    #[test]
    fn test_folder_path_is_root_first() {
        let store = LocalStore::from_entities(
            vec![folder(1, None, 0), folder(2, Some(1), 0), folder(3, Some(2), 0)],
            vec![],
        );
        let path: Vec<_> = store.folder_path(3).iter().map(|f| f.id).collect();
        assert_eq!(path, vec![1, 2, 3]);
        assert!(store.folder_path(99).is_empty());
    }

    #[test]
    fn test_favorites_ordering() {
        let mut a = folder(1, None, 0);
        a.name = "beta".to_string();
        a.is_favorite = true;
        let mut b = folder(2, None, 1);
        b.name = "Alpha".to_string();
        b.is_favorite = true;
        let mut n1 = note(1, None, 0);
        n1.is_favorite = true;
        n1.updated_at = 10;
        let mut n2 = note(2, None, 1);
        n2.is_favorite = true;
        n2.updated_at = 20;
        let store = LocalStore::from_entities(vec![a, b, folder(3, None, 2)], vec![n1, n2]);

        let folders: Vec<_> = store.favorite_folders().iter().map(|f| f.id).collect();
        assert_eq!(folders, vec![2, 1]);
        let notes: Vec<_> = store.favorite_notes().iter().map(|n| n.id).collect();
        assert_eq!(notes, vec![2, 1]);
    }

    #[test]
    fn test_folder_stats_counts_direct_contents() {
        let mut a = note(1, Some(1), 0);
        a.content = "héllo".to_string();
        let mut b = note(2, Some(1), 1);
        b.content = "abc".to_string();
        let store = LocalStore::from_entities(
            vec![folder(1, None, 0), folder(2, Some(1), 0), folder(3, Some(2), 0)],
            vec![a, b, note(3, Some(2), 0)],
        );
        let stats = store.folder_stats(1).unwrap();
        assert_eq!(stats.note_count, 2);
        assert_eq!(stats.subfolder_count, 1);
        assert_eq!(stats.total_chars, 8);
        assert!(store.folder_stats(42).is_none());
    }
}
