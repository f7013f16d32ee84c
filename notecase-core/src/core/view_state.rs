//! UI-state notifications emitted after successful mutations.

use crate::{EntityRef, FolderId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Receives navigation hints from the orchestrator once a mutation commits.
///
/// All methods default to no-ops so a sink only implements what it shows.
pub trait UiStateSink {
    /// A folder should be shown open (new parent after a move or create).
    fn expand_folder(&mut self, _id: FolderId) {}
    fn select(&mut self, _entity: Option<EntityRef>) {}
    /// The entity no longer exists.
    fn forget(&mut self, _entity: EntityRef) {}
    /// A temporary id was replaced by the id the backend assigned.
    fn replace_id(&mut self, _temporary: EntityRef, _committed: EntityRef) {}
}

impl UiStateSink for () {}

/// Expanded folders, selection and the item being edited.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewState {
    expanded: BTreeSet<FolderId>,
    selected: Option<EntityRef>,
    editing: Option<EntityRef>,
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_expanded(&self, id: FolderId) -> bool {
        self.expanded.contains(&id)
    }

    pub fn expanded(&self) -> impl Iterator<Item = FolderId> + '_ {
        self.expanded.iter().copied()
    }

    pub fn collapse(&mut self, id: FolderId) {
        self.expanded.remove(&id);
    }

    /// Flips the expansion of `id`; returns the new state.
    pub fn toggle_expanded(&mut self, id: FolderId) -> bool {
        if self.expanded.remove(&id) {
            false
        } else {
            self.expanded.insert(id);
            true
        }
    }

    pub fn selected(&self) -> Option<EntityRef> {
        self.selected
    }

    pub fn editing(&self) -> Option<EntityRef> {
        self.editing
    }

    pub fn start_editing(&mut self, entity: EntityRef) {
        self.editing = Some(entity);
    }

    pub fn stop_editing(&mut self) {
        self.editing = None;
    }
}

impl UiStateSink for ViewState {
    fn expand_folder(&mut self, id: FolderId) {
        self.expanded.insert(id);
    }

    fn select(&mut self, entity: Option<EntityRef>) {
        self.selected = entity;
    }

    fn forget(&mut self, entity: EntityRef) {
        if let EntityRef::Folder(id) = entity {
            self.expanded.remove(&id);
        }
        if self.selected == Some(entity) {
            self.selected = None;
        }
        if self.editing == Some(entity) {
            self.editing = None;
        }
    }

    fn replace_id(&mut self, temporary: EntityRef, committed: EntityRef) {
        if let (EntityRef::Folder(old), EntityRef::Folder(new)) = (temporary, committed) {
            if self.expanded.remove(&old) {
                self.expanded.insert(new);
            }
        }
        if self.selected == Some(temporary) {
            self.selected = Some(committed);
        }
        if self.editing == Some(temporary) {
            self.editing = Some(committed);
        }
    }
}
