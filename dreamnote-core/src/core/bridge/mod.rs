//! Routing between the external editor and the editing session.
//!
//! The editor runs as a separate process. [`EditorBridge::attach`] configures
//! it once, then a background listener thread turns its notifications into
//! [`SessionEvent`]s and sends them over a channel. The thread that owns the
//! [`Session`] receives them and calls [`EditorBridge::dispatch`], so the
//! session is only ever touched from that thread.

pub mod protocol;
#[cfg(unix)]
pub mod socket;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};

use log::{debug, error, info, warn};
use serde_json::Value;

use crate::{DateTree, DreamError, NoteChanges, NoteStore, Result, Session};

pub use protocol::{BridgeEvent, Incoming, Notification, Outgoing, GUI_EVENT};

/// Editor variable holding the working-copy directory.
pub const BUFFER_DIR_VAR: &str = "dreamnote_buffer_dir";
/// Editor variable holding the JSON navigation tree.
pub const TREE_VAR: &str = "dreamnote_tree";

/// Sending half of an editor connection.
pub trait EditorClient: Send {
    fn send(&mut self, message: &Outgoing) -> Result<()>;

    /// Hands out the receiving half. Can only be taken once.
    fn notifications(&mut self) -> Result<Box<dyn NotificationStream>>;

    /// Closes the connection so that a blocked [`NotificationStream`] returns.
    fn close(&mut self) -> Result<()>;
}

/// Receiving half of an editor connection.
pub trait NotificationStream: Send {
    /// Blocks until the next notification. `Ok(None)` means end of stream.
    fn next_notification(&mut self) -> Result<Option<Notification>>;
}

/// What the listener thread reports to the session owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Bridge(BridgeEvent),
    /// The connection ended; no more events follow.
    EditorExited,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    Disconnected,
    Attached,
    Running,
    Closing,
    Closed,
}

/// Whether the event loop should keep going after a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Continue,
    Shutdown,
}

/// Directories the editor is told about when the bridge attaches.
#[derive(Debug, Clone)]
pub struct BridgeSetup {
    /// Prepended to the editor's runtime path; holds `ginit.vim`.
    pub runtime_dir: PathBuf,
    /// Where the working copies live.
    pub buffer_dir: PathBuf,
}

pub struct EditorBridge {
    state: BridgeState,
    client: Option<Box<dyn EditorClient>>,
    listener: Option<JoinHandle<()>>,
}

impl Default for EditorBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl EditorBridge {
    pub fn new() -> Self {
        Self {
            state: BridgeState::Disconnected,
            client: None,
            listener: None,
        }
    }

    pub fn state(&self) -> BridgeState {
        self.state
    }

    /// Configures the editor and starts the listener thread.
    ///
    /// Only valid once per bridge; a second call fails without touching the
    /// editor.
    pub fn attach(
        &mut self,
        client: Box<dyn EditorClient>,
        setup: &BridgeSetup,
        events: Sender<SessionEvent>,
    ) -> Result<()> {
        if self.state != BridgeState::Disconnected {
            return Err(DreamError::Transport(format!(
                "editor bridge already attached ({:?})",
                self.state
            )));
        }
        self.client = Some(client);
        self.state = BridgeState::Attached;

        self.send(Outgoing::Subscribe {
            event: GUI_EVENT.to_string(),
        })?;
        self.send(Outgoing::SetVar {
            name: BUFFER_DIR_VAR.to_string(),
            value: Value::String(setup.buffer_dir.display().to_string()),
        })?;
        self.command(format!("set rtp^={}", escape_path(&setup.runtime_dir)))?;
        self.command("runtime! ginit.vim".to_string())?;

        let stream = self.client_mut()?.notifications()?;
        let handle = thread::Builder::new()
            .name("editor-bridge".to_string())
            .spawn(move || listen(stream, events))?;
        self.listener = Some(handle);
        self.state = BridgeState::Running;
        info!("editor bridge running");
        Ok(())
    }

    /// Applies one editor event to `session`.
    pub fn dispatch<S: NoteStore>(
        &mut self,
        event: BridgeEvent,
        session: &mut Session<S>,
    ) -> Result<Dispatch> {
        match event {
            BridgeEvent::Save { path } => {
                if !session.buffers().contains(&path) {
                    warn!("save of unknown working copy {}", path.display());
                    return Ok(Dispatch::Continue);
                }
                let body = fs::read_to_string(&path).map_err(|e| {
                    error!("cannot read working copy {}: {e}", path.display());
                    DreamError::Io(e)
                })?;
                session.modify(&path, NoteChanges::body(body))?;
                debug!("buffer {} updated from editor", path.display());
                Ok(Dispatch::Continue)
            }
            BridgeEvent::Quit => {
                info!("editor quitting, saving all buffers");
                let report = session.save_all();
                for (handle, e) in &report.failed {
                    error!("could not save {}: {e}", handle.display());
                }
                self.state = BridgeState::Closing;
                Ok(Dispatch::Shutdown)
            }
            BridgeEvent::Current { path } => {
                if !session.buffers().contains(&path) {
                    debug!("focus on untracked file {}", path.display());
                    return Ok(Dispatch::Continue);
                }
                session.set_current(&path)?;
                Ok(Dispatch::Continue)
            }
            BridgeEvent::Open { id } => {
                let loaded = session.buffers().find_handle_by_note_id(id).is_some();
                let handle = session.open_existing(id)?;
                if loaded {
                    self.switch_to(&handle)?;
                } else {
                    self.edit(&handle)?;
                }
                Ok(Dispatch::Continue)
            }
        }
    }

    /// Opens a working copy in the editor.
    pub fn edit(&mut self, path: &Path) -> Result<()> {
        self.command(format!("edit {}", escape_path(path)))
    }

    /// Brings an already loaded working copy to the front.
    pub fn switch_to(&mut self, path: &Path) -> Result<()> {
        self.command(format!("buffer {}", escape_path(path)))
    }

    /// Publishes the navigation tree to the editor as JSON.
    pub fn push_tree(&mut self, tree: &DateTree) -> Result<()> {
        let value = serde_json::to_value(tree)?;
        self.send(Outgoing::SetVar {
            name: TREE_VAR.to_string(),
            value,
        })
    }

    /// Closes the connection and waits for the listener thread to finish.
    pub fn shutdown(&mut self) -> Result<()> {
        if matches!(self.state, BridgeState::Disconnected | BridgeState::Closed) {
            return Ok(());
        }
        self.state = BridgeState::Closing;
        if let Some(mut client) = self.client.take() {
            if let Err(e) = client.close() {
                warn!("closing editor connection: {e}");
            }
        }
        if let Some(handle) = self.listener.take() {
            handle
                .join()
                .map_err(|_| DreamError::Transport("editor listener panicked".into()))?;
        }
        self.state = BridgeState::Closed;
        info!("editor bridge closed");
        Ok(())
    }

    fn command(&mut self, command: String) -> Result<()> {
        self.send(Outgoing::Command { command })
    }

    fn send(&mut self, message: Outgoing) -> Result<()> {
        if !matches!(self.state, BridgeState::Attached | BridgeState::Running) {
            return Err(DreamError::Transport(format!(
                "editor bridge is {:?}",
                self.state
            )));
        }
        self.client_mut()?.send(&message)
    }

    fn client_mut(&mut self) -> Result<&mut Box<dyn EditorClient>> {
        self.client
            .as_mut()
            .ok_or_else(|| DreamError::Transport("no editor connection".into()))
    }
}

impl Drop for EditorBridge {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!("editor bridge shutdown: {e}");
        }
    }
}

fn listen(mut stream: Box<dyn NotificationStream>, events: Sender<SessionEvent>) {
    loop {
        match stream.next_notification() {
            Ok(Some(notification)) => match BridgeEvent::try_from(&notification) {
                Ok(event) => {
                    debug!("editor event {event:?}");
                    if events.send(SessionEvent::Bridge(event)).is_err() {
                        debug!("session receiver gone, listener stopping");
                        return;
                    }
                }
                Err(e) => warn!("ignoring editor notification: {e}"),
            },
            Ok(None) => {
                info!("editor connection closed");
                break;
            }
            Err(DreamError::Json(e)) => warn!("malformed editor message: {e}"),
            Err(e) => {
                error!("editor connection failed: {e}");
                break;
            }
        }
    }
    let _ = events.send(SessionEvent::EditorExited);
}

/// Escapes a path for use as an Ex command argument.
fn escape_path(path: &Path) -> String {
    let mut out = String::new();
    for c in path.display().to_string().chars() {
        if matches!(c, ' ' | '\\' | '|' | '%' | '#' | '"') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
