//! Core library for Notecase, a local-first note-taking application that
//! files notes in a tree of nested folders.
//!
//! The primary entry point is [`Workspace`], which represents an open
//! Notecase database. Folder and note mutations go through an
//! [`Orchestrator`]: they are applied to an in-memory [`LocalStore`] at once
//! and rolled back exactly if the [`Persistence`] backend rejects them.
//!
//! Types are re-exported from their respective sub-modules for convenience;
//! consumers should import from the crate root rather than the `core` module.

pub mod core;

#[doc(inline)]
pub use core::{
    delete::{DeleteResult, DeleteStrategy},
    entity::{Entity, EntityRef},
    error::{NotecaseError, Result},
    export::{
        export_workspace_json, note_to_json, note_to_markdown, workspace_snapshot, NoteExport,
        WorkspaceExport, APP_VERSION, EXPORT_VERSION,
    },
    folder::{
        validate_folder_name, Folder, FolderId, FolderPatch, FolderStats, NewFolder,
        MAX_FOLDER_NAME_LEN,
    },
    moves::{
        resolve_insert_position, validate_move, validate_reorder, FolderIndex, MovePlan,
        MoveRequest,
    },
    note::{validate_note_title, NewNote, Note, NoteId, NotePatch, MAX_NOTE_TITLE_LEN},
    operation::Operation,
    operation_log::{OperationLog, OperationSummary, PurgeStrategy},
    orchestrator::{
        Committed, MutationOutcome, MutationRequest, MutationState, Orchestrator, PendingMutation,
    },
    persistence::{Persistence, SqlitePersistence},
    settings::{
        default_database_path, load_settings, load_settings_from, save_settings,
        save_settings_to, settings_file_path, AppSettings,
    },
    storage::Storage,
    store::{Journal, LocalStore},
    tag::{
        validate_tag_color, validate_tag_name, NewTag, NoteTag, Tag, TagId, TagPatch,
        TagWithCount, DEFAULT_TAG_COLOR, MAX_TAG_NAME_LEN,
    },
    tree::{build_tree, count_nodes, flatten, group_notes, FlatEntry, NoteGroups, TreeItem, TreeNode},
    view_state::{UiStateSink, ViewState},
    workspace::Workspace,
};
