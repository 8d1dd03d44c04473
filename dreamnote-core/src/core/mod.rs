//! Internal domain modules for the Dream Note core library.
//!
//! All public types from these modules are re-exported at the crate root
//! with `#[doc(inline)]`; import from there in preference to this module.

pub mod bridge;
pub mod buffer;
pub mod date_tree;
pub mod error;
pub mod export;
pub mod journal;
pub mod note;
pub mod session;
pub mod stats;
pub mod storage;

#[doc(inline)]
pub use bridge::{
    BridgeEvent, BridgeSetup, BridgeState, Dispatch, EditorBridge, EditorClient,
    NotificationStream, SessionEvent,
};
#[doc(inline)]
pub use buffer::{Buffer, BufferHandle, BufferTracker, ClosePolicy, SaveOutcome, SaveReport};
#[doc(inline)]
pub use date_tree::{DateTree, TreeEntry};
#[doc(inline)]
pub use error::{DreamError, Result};
#[doc(inline)]
pub use export::{export_book, render_book};
#[doc(inline)]
pub use journal::{Journal, NoteStore};
#[doc(inline)]
pub use note::{Note, NoteChanges, NoteDraft};
#[doc(inline)]
pub use session::{ModelEvent, Session};
#[doc(inline)]
pub use stats::JournalStats;
#[doc(inline)]
pub use storage::{ensure_schema, Storage};
