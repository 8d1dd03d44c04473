//! Core library for Dream Note, a dream journal edited in an external editor.
//!
//! [`Journal`] is the SQLite store. A [`Session`] tracks the notes open for
//! editing as working-copy files ([`BufferTracker`]) and persists them through
//! a [`NoteStore`]. [`EditorBridge`] connects a running editor to the session,
//! and [`DateTree`] is the year/month/day index shown for navigation.
//!
//! Types are re-exported from their respective sub-modules for convenience;
//! consumers should import from the crate root rather than the `core` module.

pub mod core;

// Re-export commonly used types.
#[doc(inline)]
pub use core::{
    bridge::{
        BridgeEvent, BridgeSetup, BridgeState, Dispatch, EditorBridge, EditorClient,
        NotificationStream, SessionEvent,
    },
    buffer::{Buffer, BufferHandle, BufferTracker, ClosePolicy, SaveOutcome, SaveReport},
    date_tree::{DateTree, TreeEntry},
    error::{DreamError, Result},
    export::{export_book, render_book},
    journal::{Journal, NoteStore},
    note::{Note, NoteChanges, NoteDraft},
    session::{ModelEvent, Session},
    stats::JournalStats,
    storage::{ensure_schema, Storage},
};
