//! Internal domain modules for the Notecase core library.
//!
//! All public types from these modules are re-exported at the crate root
//! with `#[doc(inline)]`; import from there in preference to this module.

pub mod delete;
pub mod entity;
pub mod error;
pub mod export;
pub mod folder;
pub mod moves;
pub mod note;
pub mod operation;
pub mod operation_log;
pub mod orchestrator;
pub mod persistence;
pub mod settings;
pub mod storage;
pub mod store;
pub mod tag;
pub mod tree;
pub mod view_state;
pub mod workspace;

#[doc(inline)]
pub use delete::{DeleteResult, DeleteStrategy};
#[doc(inline)]
pub use entity::{Entity, EntityRef};
#[doc(inline)]
pub use error::{NotecaseError, Result};
#[doc(inline)]
pub use export::{
    export_workspace_json, note_to_json, note_to_markdown, workspace_snapshot, NoteExport,
    WorkspaceExport, APP_VERSION, EXPORT_VERSION,
};
#[doc(inline)]
pub use folder::{
    validate_folder_name, Folder, FolderId, FolderPatch, FolderStats, NewFolder,
    MAX_FOLDER_NAME_LEN,
};
#[doc(inline)]
pub use moves::{
    resolve_insert_position, validate_move, validate_reorder, FolderIndex, MovePlan, MoveRequest,
};
#[doc(inline)]
pub use note::{validate_note_title, NewNote, Note, NoteId, NotePatch, MAX_NOTE_TITLE_LEN};
#[doc(inline)]
pub use operation::Operation;
#[doc(inline)]
pub use operation_log::{OperationLog, OperationSummary, PurgeStrategy};
#[doc(inline)]
pub use orchestrator::{
    Committed, MutationOutcome, MutationRequest, MutationState, Orchestrator, PendingMutation,
};
#[doc(inline)]
pub use persistence::{Persistence, SqlitePersistence};
#[doc(inline)]
pub use settings::{
    default_database_path, load_settings, load_settings_from, save_settings, save_settings_to,
    settings_file_path, AppSettings,
};
#[doc(inline)]
pub use storage::Storage;
#[doc(inline)]
pub use store::{Journal, LocalStore};
#[doc(inline)]
pub use tag::{
    validate_tag_color, validate_tag_name, NewTag, NoteTag, Tag, TagId, TagPatch, TagWithCount,
    DEFAULT_TAG_COLOR, MAX_TAG_NAME_LEN,
};
#[doc(inline)]
pub use tree::{
    build_tree, count_nodes, flatten, group_notes, FlatEntry, NoteGroups, TreeItem, TreeNode,
};
#[doc(inline)]
pub use view_state::{UiStateSink, ViewState};
#[doc(inline)]
pub use workspace::Workspace;
