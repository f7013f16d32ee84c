//! Legality checks for re-parent and reorder operations.
//!
//! [`validate_move`] runs before anything is applied. It never touches the
//! store; it only answers whether the requested placement is allowed and,
//! if so, returns the [`MovePlan`] the orchestrator will execute.

use crate::core::tree::TreeItem;
use crate::{EntityRef, FolderId, LocalStore, NotecaseError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};

/// Parent → children adjacency for a folder collection.
///
/// Built once per store generation and cached by
/// [`LocalStore`](crate::LocalStore) until the next mutation.
#[derive(Debug, Clone, Default)]
pub struct FolderIndex {
    children: HashMap<Option<FolderId>, Vec<FolderId>>,
    parents: HashMap<FolderId, Option<FolderId>>,
}

impl FolderIndex {
    pub fn build<'a, T, I>(items: I) -> Self
    where
        T: TreeItem + 'a,
        I: IntoIterator<Item = &'a T>,
    {
        let mut keyed: HashMap<Option<FolderId>, Vec<(i32, FolderId)>> = HashMap::new();
        let mut parents = HashMap::new();
        for item in items {
            parents.insert(item.id(), item.parent_id());
            keyed
                .entry(item.parent_id())
                .or_default()
                .push((item.position(), item.id()));
        }
        let children = keyed
            .into_iter()
            .map(|(parent, mut kids)| {
                kids.sort_unstable();
                (parent, kids.into_iter().map(|(_, id)| id).collect())
            })
            .collect();
        Self { children, parents }
    }

    #[must_use]
    pub fn contains(&self, id: FolderId) -> bool {
        self.parents.contains_key(&id)
    }

    /// The stored parent of `id`; `None` if `id` is unknown.
    #[must_use]
    pub fn parent_of(&self, id: FolderId) -> Option<Option<FolderId>> {
        self.parents.get(&id).copied()
    }

    /// Direct children of `parent` (or the root folders), ordered by position.
    #[must_use]
    pub fn children(&self, parent: Option<FolderId>) -> &[FolderId] {
        self.children.get(&parent).map_or(&[], Vec::as_slice)
    }

    /// Every folder below `id`, excluding `id` itself.
    ///
    /// Only the subtree is visited, so the cost is proportional to its size.
    #[must_use]
    pub fn descendants(&self, id: FolderId) -> HashSet<FolderId> {
        let mut seen = HashSet::new();
        let mut queue: VecDeque<FolderId> = self.children(Some(id)).iter().copied().collect();
        while let Some(current) = queue.pop_front() {
            if current == id || !seen.insert(current) {
                continue;
            }
            queue.extend(self.children(Some(current)).iter().copied());
        }
        seen
    }

    /// Ancestors of `id` from the outermost root down to the direct parent.
    ///
    /// Stops at a missing parent or when a cycle is detected.
    #[must_use]
    pub fn ancestors(&self, id: FolderId) -> Vec<FolderId> {
        let mut chain = Vec::new();
        let mut seen = HashSet::from([id]);
        let mut current = self.parent_of(id).flatten();
        while let Some(pid) = current {
            if !self.contains(pid) || !seen.insert(pid) {
                break;
            }
            chain.push(pid);
            current = self.parent_of(pid).flatten();
        }
        chain.reverse();
        chain
    }
}

/// A requested placement of a folder or note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRequest {
    pub item: EntityRef,
    /// Target parent folder, or `None` for the root level.
    pub new_parent_id: Option<FolderId>,
    /// Zero-based index within the target sibling group.
    pub new_position: i64,
}

impl MoveRequest {
    pub fn new(item: EntityRef, new_parent_id: Option<FolderId>, new_position: i64) -> Self {
        Self {
            item,
            new_parent_id,
            new_position,
        }
    }
}

/// A validated move, ready to be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovePlan {
    pub item: EntityRef,
    pub old_parent_id: Option<FolderId>,
    pub new_parent_id: Option<FolderId>,
    pub new_position: usize,
    /// Same parent before and after; only the order changes.
    pub is_reorder: bool,
}

/// Decides whether `request` may be applied to `store`.
///
/// Folder moves reject self-parenting, targets that do not exist, and any
/// target inside the moved folder's own subtree. Reorders within the same
/// parent skip the cycle check. For folders and notes alike the position
/// must lie in `[0, n]`, where `n` counts the target siblings other than the
/// moved item.
///
/// # Errors
///
/// [`NotecaseError::FolderNotFound`] / [`NotecaseError::NoteNotFound`] when
/// the moved item is unknown, [`NotecaseError::ValidationFailed`] when it is
/// still unsaved, [`NotecaseError::InvalidMove`] for self-parenting, cycles and
/// missing targets, and [`NotecaseError::InvalidPosition`] for out-of-range
/// positions.
pub fn validate_move(store: &LocalStore, request: &MoveRequest) -> Result<MovePlan> {
    if request.item.is_temporary() {
        return Err(NotecaseError::ValidationFailed(format!(
            "{} has not been saved yet",
            request.item
        )));
    }

    let new_parent = request.new_parent_id;
    if let Some(pid) = new_parent {
        if !store.contains_folder(pid) {
            return Err(NotecaseError::InvalidMove(format!(
                "Target folder {pid} does not exist"
            )));
        }
        if pid < 0 {
            return Err(NotecaseError::InvalidMove(format!(
                "Target folder {pid} has not been saved yet"
            )));
        }
    }

    let (old_parent, sibling_count) = match request.item {
        EntityRef::Folder(id) => {
            let folder = store.folder(id).ok_or(NotecaseError::FolderNotFound(id))?;
            if new_parent == Some(id) {
                return Err(NotecaseError::InvalidMove(
                    "A folder cannot be its own parent".to_string(),
                ));
            }
            let index = store.index();
            if folder.parent_id != new_parent {
                if let Some(pid) = new_parent {
                    if index.descendants(id).contains(&pid) {
                        return Err(NotecaseError::InvalidMove(
                            "Move would create a cycle".to_string(),
                        ));
                    }
                }
            }
            let count = index
                .children(new_parent)
                .iter()
                .filter(|sibling| **sibling != id)
                .count();
            (folder.parent_id, count)
        }
        EntityRef::Note(id) => {
            let note = store.note(id).ok_or(NotecaseError::NoteNotFound(id))?;
            let count = store
                .notes_in(new_parent)
                .iter()
                .filter(|sibling| sibling.id != id)
                .count();
            (note.folder_id, count)
        }
    };

    let new_position = usize::try_from(request.new_position)
        .ok()
        .filter(|pos| *pos <= sibling_count)
        .ok_or(NotecaseError::InvalidPosition {
            position: request.new_position,
            max: sibling_count,
        })?;

    Ok(MovePlan {
        item: request.item,
        old_parent_id: old_parent,
        new_parent_id: new_parent,
        new_position,
        is_reorder: old_parent == new_parent,
    })
}

/// Resolves the insertion index for a new item joining a group of
/// `sibling_count` siblings. `None` appends.
///
/// # Errors
///
/// Returns [`NotecaseError::InvalidPosition`] if `requested` lies outside
/// `[0, sibling_count]`.
pub fn resolve_insert_position(requested: Option<i32>, sibling_count: usize) -> Result<usize> {
    let Some(position) = requested else {
        return Ok(sibling_count);
    };
    usize::try_from(position)
        .ok()
        .filter(|pos| *pos <= sibling_count)
        .ok_or(NotecaseError::InvalidPosition {
            position: i64::from(position),
            max: sibling_count,
        })
}

/// Checks that `ordered` is a permutation of `current`.
///
/// # Errors
///
/// Returns [`NotecaseError::ValidationFailed`] for missing, extra, duplicate
/// or temporary ids.
pub fn validate_reorder(current: &[i64], ordered: &[i64]) -> Result<()> {
    if ordered.iter().any(|id| *id < 0) {
        return Err(NotecaseError::ValidationFailed(
            "Cannot reorder items that have not been saved yet".to_string(),
        ));
    }
    let mut expected = current.to_vec();
    let mut given = ordered.to_vec();
    expected.sort_unstable();
    given.sort_unstable();
    if expected != given {
        return Err(NotecaseError::ValidationFailed(
            "Reorder list must contain exactly the current siblings".to_string(),
        ));
    }
    Ok(())
}
