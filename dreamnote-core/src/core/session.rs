//! The editing session: open buffers, the note store and the UI event stream.
//!
//! A [`Session`] is owned by one thread. The editor bridge never touches it
//! directly; its listener thread forwards notifications over a channel and the
//! owning thread applies them here.

use std::path::Path;
use std::sync::mpsc::Sender;

use log::{debug, warn};

use crate::{
    BufferHandle, BufferTracker, ClosePolicy, DateTree, NoteChanges, NoteDraft, NoteStore,
    Result, SaveOutcome, SaveReport,
};

/// Notifications sent to the UI after the session changes.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelEvent {
    /// The navigation tree was rebuilt after something was persisted.
    TreeChanged(DateTree),
    /// A buffer was written to the store.
    BufferSaved {
        handle: BufferHandle,
        outcome: SaveOutcome,
    },
    /// The buffer focused in the editor changed.
    CurrentChanged(Option<BufferHandle>),
}

/// Buffers being edited plus the store they persist to.
pub struct Session<S: NoteStore> {
    store: S,
    buffers: BufferTracker,
    current: Option<BufferHandle>,
    events: Option<Sender<ModelEvent>>,
}

impl<S: NoteStore> Session<S> {
    pub fn new(store: S, buffers: BufferTracker) -> Self {
        Self {
            store,
            buffers,
            current: None,
            events: None,
        }
    }

    /// Registers the UI side of the event stream. Replaces any previous subscriber.
    pub fn subscribe(&mut self, events: Sender<ModelEvent>) {
        self.events = Some(events);
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn buffers(&self) -> &BufferTracker {
        &self.buffers
    }

    pub fn current(&self) -> Option<&BufferHandle> {
        self.current.as_ref()
    }

    /// Starts a buffer for a note that does not exist yet.
    pub fn open_new(&mut self, draft: NoteDraft) -> Result<BufferHandle> {
        self.buffers.open(None, draft)
    }

    /// Opens the stored note `id`, or returns its handle if it is already open.
    pub fn open_existing(&mut self, id: i64) -> Result<BufferHandle> {
        if let Some(handle) = self.buffers.find_handle_by_note_id(id) {
            debug!("dream {id} already in buffers");
            return Ok(handle.clone());
        }
        let note = self.store.find_by_id(id)?;
        self.buffers.open(Some(note.id), note.to_draft())
    }

    pub fn modify(&mut self, handle: &Path, changes: NoteChanges) -> Result<()> {
        self.buffers.modify(handle, changes)
    }

    /// Saves one buffer and refreshes the tree if anything was written.
    pub fn save(&mut self, handle: &Path) -> Result<SaveOutcome> {
        let outcome = self.buffers.save(handle, &mut self.store)?;
        if outcome.persisted() {
            self.emit(ModelEvent::BufferSaved {
                handle: handle.to_path_buf(),
                outcome,
            });
            self.refresh_tree()?;
        }
        Ok(outcome)
    }

    /// Saves every buffer and refreshes the tree once if anything was written.
    pub fn save_all(&mut self) -> SaveReport {
        let report = self.buffers.save_all(&mut self.store);
        for (handle, outcome) in &report.saved {
            self.emit(ModelEvent::BufferSaved {
                handle: handle.clone(),
                outcome: *outcome,
            });
        }
        if report.persisted_any() {
            if let Err(e) = self.refresh_tree() {
                warn!("failed to rebuild dream tree: {e}");
            }
        }
        report
    }

    pub fn close(&mut self, handle: &Path, policy: ClosePolicy) -> Result<()> {
        self.buffers.close(handle, policy)?;
        if self.current.as_deref() == Some(handle) {
            self.current = None;
            self.emit(ModelEvent::CurrentChanged(None));
        }
        Ok(())
    }

    /// Marks `handle` as the buffer the user is looking at. Nothing becomes dirty.
    pub fn set_current(&mut self, handle: &Path) -> Result<()> {
        self.buffers.get(handle)?;
        if self.current.as_deref() != Some(handle) {
            self.current = Some(handle.to_path_buf());
            self.emit(ModelEvent::CurrentChanged(self.current.clone()));
        }
        Ok(())
    }

    /// Builds the navigation tree from the store as it is now.
    pub fn tree(&self) -> Result<DateTree> {
        DateTree::build(&self.store)
    }

    /// Rebuilds the tree and sends it to the subscriber.
    pub fn refresh_tree(&mut self) -> Result<DateTree> {
        let tree = self.tree()?;
        self.emit(ModelEvent::TreeChanged(tree.clone()));
        Ok(tree)
    }

    fn emit(&mut self, event: ModelEvent) {
        if let Some(events) = &self.events {
            if events.send(event).is_err() {
                warn!("UI stopped listening for session events");
                self.events = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::buffer::tests::{draft, CountingStore};
    use crate::{DreamError, Journal};
    use std::sync::mpsc;

    fn session() -> (Session<CountingStore>, mpsc::Receiver<ModelEvent>) {
        let mut session = Session::new(CountingStore::default(), BufferTracker::new().unwrap());
        let (tx, rx) = mpsc::channel();
        session.subscribe(tx);
        (session, rx)
    }

    #[test]
    fn test_open_existing_redirects_to_open_buffer() {
        let (mut session, _rx) = session();
        session.store.create(&draft("reve1")).unwrap();

        let first = session.open_existing(1).unwrap();
        let second = session.open_existing(1).unwrap();
        assert_eq!(first, second);
        assert_eq!(session.buffers().len(), 1);
        assert_eq!(session.buffers().get(&first).unwrap().draft.title, "reve1");
    }

    #[test]
    fn test_open_existing_unknown_id() {
        let (mut session, _rx) = session();
        assert!(matches!(session.open_existing(5), Err(DreamError::NotFound(5))));
    }

    #[test]
    fn test_save_emits_saved_and_tree() {
        let (mut session, rx) = session();
        let handle = session.open_new(draft("reve1")).unwrap();
        session.modify(&handle, NoteChanges::body("texte")).unwrap();

        assert_eq!(session.save(&handle).unwrap(), SaveOutcome::Created(1));

        let events: Vec<ModelEvent> = rx.try_iter().collect();
        assert_eq!(events.len(), 2);
        assert!(matches!(
            &events[0],
            ModelEvent::BufferSaved {
                outcome: SaveOutcome::Created(1),
                ..
            }
        ));
        match &events[1] {
            ModelEvent::TreeChanged(tree) => assert_eq!(tree.note_count(), 1),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_clean_save_emits_nothing() {
        let (mut session, rx) = session();
        let handle = session.open_new(draft("reve1")).unwrap();
        assert_eq!(session.save(&handle).unwrap(), SaveOutcome::Clean);
        assert_eq!(session.save_all().saved.len(), 0);
        assert!(rx.try_iter().next().is_none());
        assert_eq!(session.store().calls(), 0);
    }

    #[test]
    fn test_set_current_does_not_dirty() {
        let (mut session, rx) = session();
        let handle = session.open_new(draft("reve1")).unwrap();

        session.set_current(&handle).unwrap();
        session.set_current(&handle).unwrap();

        assert_eq!(session.current(), Some(&handle));
        assert!(!session.buffers().get(&handle).unwrap().dirty);
        let events: Vec<ModelEvent> = rx.try_iter().collect();
        assert_eq!(events, vec![ModelEvent::CurrentChanged(Some(handle))]);
    }

    #[test]
    fn test_close_current_clears_selection() {
        let (mut session, _rx) = session();
        let handle = session.open_new(draft("reve1")).unwrap();
        session.set_current(&handle).unwrap();

        session.close(&handle, ClosePolicy::RefuseDirty).unwrap();
        assert_eq!(session.current(), None);
        assert!(session.set_current(&handle).is_err());
    }

    #[test]
    fn test_dropped_subscriber_is_not_fatal() {
        let (mut session, rx) = session();
        drop(rx);
        let handle = session.open_new(draft("reve1")).unwrap();
        session.modify(&handle, NoteChanges::body("x")).unwrap();
        assert!(session.save(&handle).is_ok());
    }

    #[test]
    fn test_session_over_journal() {
        let mut session = Session::new(
            Journal::open_in_memory().unwrap(),
            BufferTracker::new().unwrap(),
        );
        let handle = session.open_new(draft("reve1").with_tags(["eau"])).unwrap();
        session.modify(&handle, NoteChanges::body("je vais à la piscine")).unwrap();
        session.save_all();

        let note = session.store().find_by_id(1).unwrap();
        assert_eq!(note.body, "je vais à la piscine");
        assert_eq!(note.tags, vec!["eau"]);
        assert_eq!(session.tree().unwrap().day("2010", "05", "24").unwrap()[0].id, 1);
    }
}
