//! Bookkeeping for notes that are open in the editor.
//!
//! Every open note is backed by a working-copy file inside a temporary
//! directory owned by the tracker. The file path is the handle the editor and
//! the tracker agree on: when the editor reports a write to that path, the
//! tracker knows which note to update.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use tempfile::TempDir;

use crate::{DreamError, NoteChanges, NoteDraft, NoteStore, Result};

/// Path of a working-copy file; identifies one open buffer.
pub type BufferHandle = PathBuf;

/// A note open for editing, possibly with unsaved changes.
#[derive(Debug, Clone, PartialEq)]
pub struct Buffer {
    /// Database id, or `None` until a new note has been saved once.
    pub id: Option<i64>,
    pub draft: NoteDraft,
    pub dirty: bool,
}

/// What to do with unsaved edits when a buffer is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClosePolicy {
    /// Keep the buffer open and report [`DreamError::UnsavedChanges`].
    RefuseDirty,
    /// Drop the edits.
    Discard,
}

/// Result of a single [`BufferTracker::save`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Nothing to write.
    Clean,
    /// A new note was inserted with this id.
    Created(i64),
    /// An existing note was overwritten.
    Updated(i64),
}

impl SaveOutcome {
    pub fn persisted(self) -> bool {
        !matches!(self, SaveOutcome::Clean)
    }
}

/// Result of [`BufferTracker::save_all`].
#[derive(Debug, Default)]
pub struct SaveReport {
    pub saved: Vec<(BufferHandle, SaveOutcome)>,
    pub skipped: Vec<BufferHandle>,
    pub failed: Vec<(BufferHandle, DreamError)>,
}

impl SaveReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn persisted_any(&self) -> bool {
        !self.saved.is_empty()
    }
}

/// Tracks open buffers by working-copy path.
///
/// Holds at most one buffer per note id. Buffers are kept in path order so
/// [`save_all`](Self::save_all) visits them in a stable order.
pub struct BufferTracker {
    dir: TempDir,
    buffers: BTreeMap<BufferHandle, Buffer>,
}

impl BufferTracker {
    /// Creates a tracker with a fresh working directory under the system temp dir.
    pub fn new() -> Result<Self> {
        let dir = tempfile::Builder::new().prefix("dreamdtb").tempdir()?;
        Ok(Self::with_dir(dir))
    }

    /// Creates a tracker whose working directory lives inside `parent`.
    pub fn new_in<P: AsRef<Path>>(parent: P) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("dreamdtb")
            .tempdir_in(parent)?;
        Ok(Self::with_dir(dir))
    }

    fn with_dir(dir: TempDir) -> Self {
        debug!("working copies in {}", dir.path().display());
        Self {
            dir,
            buffers: BTreeMap::new(),
        }
    }

    pub fn working_dir(&self) -> &Path {
        self.dir.path()
    }

    /// Opens a buffer for `draft`, writing its body to a new working copy.
    ///
    /// When `id` is already open, the existing handle is returned and
    /// nothing is created.
    pub fn open(&mut self, id: Option<i64>, draft: NoteDraft) -> Result<BufferHandle> {
        if let Some(existing) = id.and_then(|id| self.find_handle_by_note_id(id)) {
            info!("dream {:?} already open in {}", id, existing.display());
            return Ok(existing.clone());
        }

        let mut file = tempfile::Builder::new()
            .prefix("dream")
            .tempfile_in(self.dir.path())?;
        file.write_all(draft.body.as_bytes())?;
        file.flush()?;
        let (_, handle) = file.keep().map_err(|e| DreamError::Io(e.error))?;

        info!("buffer opened: {} ('{}')", handle.display(), draft.title);
        self.buffers.insert(
            handle.clone(),
            Buffer {
                id,
                draft,
                dirty: false,
            },
        );
        Ok(handle)
    }

    /// Merges `changes` into the buffer and marks it dirty.
    pub fn modify(&mut self, handle: &Path, changes: NoteChanges) -> Result<()> {
        let buffer = self.get_mut(handle)?;
        buffer.draft.apply(changes)?;
        buffer.dirty = true;
        debug!("buffer modified: {}", handle.display());
        Ok(())
    }

    /// Writes the buffer to `store` if it is dirty.
    ///
    /// A clean buffer is not written. On failure the buffer stays dirty.
    pub fn save<S: NoteStore + ?Sized>(
        &mut self,
        handle: &Path,
        store: &mut S,
    ) -> Result<SaveOutcome> {
        let buffer = self.get_mut(handle)?;
        if !buffer.dirty {
            return Ok(SaveOutcome::Clean);
        }

        let outcome = match buffer.id {
            None => {
                let id = store.create(&buffer.draft)?;
                buffer.id = Some(id);
                SaveOutcome::Created(id)
            }
            Some(id) => {
                store.update(id, &buffer.draft)?;
                SaveOutcome::Updated(id)
            }
        };
        buffer.dirty = false;
        info!("buffer saved: {} ({:?})", handle.display(), outcome);
        Ok(outcome)
    }

    /// Saves every buffer; a failure on one buffer does not stop the others.
    pub fn save_all<S: NoteStore + ?Sized>(&mut self, store: &mut S) -> SaveReport {
        let mut report = SaveReport::default();
        let handles: Vec<BufferHandle> = self.buffers.keys().cloned().collect();
        for handle in handles {
            match self.save(&handle, &mut *store) {
                Ok(SaveOutcome::Clean) => report.skipped.push(handle),
                Ok(outcome) => report.saved.push((handle, outcome)),
                Err(e) => {
                    warn!("failed to save {}: {}", handle.display(), e);
                    report.failed.push((handle, e));
                }
            }
        }
        report
    }

    /// Stops tracking the buffer and removes its working copy.
    pub fn close(&mut self, handle: &Path, policy: ClosePolicy) -> Result<Buffer> {
        let buffer = self.get(handle)?;
        if buffer.dirty {
            match policy {
                ClosePolicy::RefuseDirty => {
                    return Err(DreamError::UnsavedChanges(handle.to_path_buf()));
                }
                ClosePolicy::Discard => {
                    warn!("discarding unsaved changes in {}", handle.display());
                }
            }
        }

        let buffer = self
            .buffers
            .remove(handle)
            .ok_or_else(|| DreamError::UnknownBuffer(handle.to_path_buf()))?;
        if let Err(e) = fs::remove_file(handle) {
            debug!("working copy {} already gone: {}", handle.display(), e);
        }
        info!("buffer closed: {}", handle.display());
        Ok(buffer)
    }

    pub fn find_handle_by_note_id(&self, id: i64) -> Option<&BufferHandle> {
        self.buffers
            .iter()
            .find(|(_, buffer)| buffer.id == Some(id))
            .map(|(handle, _)| handle)
    }

    pub fn get(&self, handle: &Path) -> Result<&Buffer> {
        self.buffers
            .get(handle)
            .ok_or_else(|| DreamError::UnknownBuffer(handle.to_path_buf()))
    }

    fn get_mut(&mut self, handle: &Path) -> Result<&mut Buffer> {
        self.buffers
            .get_mut(handle)
            .ok_or_else(|| DreamError::UnknownBuffer(handle.to_path_buf()))
    }

    pub fn contains(&self, handle: &Path) -> bool {
        self.buffers.contains_key(handle)
    }

    pub fn handles(&self) -> impl Iterator<Item = &BufferHandle> {
        self.buffers.keys()
    }

    /// Ids of the open buffers that are already persisted.
    pub fn note_ids(&self) -> Vec<i64> {
        self.buffers.values().filter_map(|b| b.id).collect()
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.buffers.values().any(|b| b.dirty)
    }
}
