//! Runs the editor on a set of buffers and keeps the journal in sync with it.

use std::fs;
use std::os::unix::net::UnixListener;
use std::path::{Path, PathBuf};
use std::process::{Child, Command};
use std::sync::mpsc::{self, Receiver};
use std::time::Duration;

use dreamnote_core::core::bridge::socket::accept_editor;
use dreamnote_core::{
    BridgeSetup, BridgeState, BufferHandle, BufferTracker, Dispatch, EditorBridge, Journal,
    ModelEvent, NoteDraft, NoteStore, Session, SessionEvent,
};
use log::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::paths::AppPaths;
use crate::runtime::{self, BRIDGE_ENV};
use crate::settings::{EditorCommand, Settings};

/// What the editor should show when it starts.
#[derive(Debug)]
pub enum Opening {
    /// A new dream, not in the journal yet.
    New(NoteDraft),
    /// Dreams already in the journal, by id.
    Existing(Vec<i64>),
}

/// Summary of one editing session.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct LaunchReport {
    pub saved: usize,
    pub failed: usize,
}

/// Removes the bridge socket file when the session ends.
struct SocketFile(PathBuf);

impl Drop for SocketFile {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.0) {
            debug!("socket {} not removed: {e}", self.0.display());
        }
    }
}

pub fn run(paths: &AppPaths, settings: &Settings, opening: Opening) -> Result<LaunchReport> {
    let editor = settings.resolve_editor(|name| std::env::var(name).ok())?;
    let journal = Journal::open(&paths.database)?;
    let mut session = Session::new(journal, BufferTracker::new()?);
    let (model_tx, model_rx) = mpsc::channel();
    session.subscribe(model_tx);

    let handles = open_buffers(&mut session, opening)?;

    let runtime_root = runtime::install(&paths.runtime_dir)?;
    let socket_path = paths.runtime_dir.join(format!("nvim-{}", Uuid::new_v4()));
    let listener = UnixListener::bind(&socket_path)?;
    let _socket = SocketFile(socket_path.clone());

    let mut child = spawn_editor(&editor, &runtime_root, &socket_path)?;
    info!("editor started (pid {})", child.id());

    let setup = BridgeSetup {
        runtime_dir: runtime_root,
        buffer_dir: session.buffers().working_dir().to_path_buf(),
    };
    let timeout = Duration::from_secs(settings.attach_timeout_secs);
    let result = drive(
        &mut session,
        &listener,
        &mut child,
        &setup,
        timeout,
        &handles,
        &model_rx,
    );

    if result.is_err() {
        stop_editor(&mut child);
    }
    let status = child.wait()?;
    debug!("editor exited with {status}");
    result
}

/// Kills the editor if it is still running.
fn stop_editor(child: &mut Child) {
    if let Ok(None) = child.try_wait() {
        warn!("stopping editor after bridge failure");
        if let Err(e) = child.kill() {
            warn!("could not stop the editor: {e}");
        }
    }
}

fn open_buffers<S: NoteStore>(
    session: &mut Session<S>,
    opening: Opening,
) -> Result<Vec<BufferHandle>> {
    match opening {
        Opening::New(draft) => Ok(vec![session.open_new(draft)?]),
        Opening::Existing(ids) => ids
            .into_iter()
            .map(|id| session.open_existing(id).map_err(AppError::from))
            .collect(),
    }
}

fn spawn_editor(editor: &EditorCommand, runtime_root: &Path, socket: &Path) -> Result<Child> {
    Command::new(&editor.program)
        .args(&editor.args)
        .args(runtime::startup_args(runtime_root))
        .env(BRIDGE_ENV, socket)
        .spawn()
        .map_err(|e| {
            AppError::editor(format!(
                "Failed to start {}: {e}",
                editor.program.display()
            ))
        })
}

fn drive<S: NoteStore>(
    session: &mut Session<S>,
    listener: &UnixListener,
    child: &mut Child,
    setup: &BridgeSetup,
    timeout: Duration,
    handles: &[BufferHandle],
    model_rx: &Receiver<ModelEvent>,
) -> Result<LaunchReport> {
    let client = accept_editor(listener, timeout, || matches!(child.try_wait(), Ok(None)))?;

    let (tx, rx) = mpsc::channel();
    let mut bridge = EditorBridge::new();
    bridge.attach(Box::new(client), setup, tx)?;
    for handle in handles {
        bridge.edit(handle)?;
    }
    bridge.push_tree(&session.tree()?)?;

    let report = event_loop(&mut bridge, session, &rx, model_rx);
    bridge.shutdown()?;
    info!(
        "session over: {} saved, {} not saved",
        report.saved, report.failed
    );
    Ok(report)
}

/// Dispatches editor events until the editor quits or goes away.
///
/// Errors from a single event are logged and the loop goes on.
fn event_loop<S: NoteStore>(
    bridge: &mut EditorBridge,
    session: &mut Session<S>,
    events: &Receiver<SessionEvent>,
    model_rx: &Receiver<ModelEvent>,
) -> LaunchReport {
    let mut report = LaunchReport::default();
    for event in events.iter() {
        match event {
            SessionEvent::Bridge(event) => match bridge.dispatch(event, session) {
                Ok(Dispatch::Continue) => {}
                Ok(Dispatch::Shutdown) => {
                    let view: &Session<S> = session;
                    report.failed += view
                        .buffers()
                        .handles()
                        .filter(|h| is_dirty(view, h))
                        .count();
                    break;
                }
                Err(e) => error!("{}", e.user_message()),
            },
            SessionEvent::EditorExited => {
                warn!("editor closed the connection without quitting, saving buffers");
                let saved = session.save_all();
                report.failed += saved.failed.len();
                break;
            }
        }
        forward_model_events(bridge, model_rx, &mut report);
    }
    forward_model_events(bridge, model_rx, &mut report);
    report
}

fn is_dirty<S: NoteStore>(session: &Session<S>, handle: &Path) -> bool {
    session
        .buffers()
        .get(handle)
        .map(|b| b.dirty)
        .unwrap_or(false)
}

/// Passes session changes on to the editor while it is still listening.
fn forward_model_events(
    bridge: &mut EditorBridge,
    model_rx: &Receiver<ModelEvent>,
    report: &mut LaunchReport,
) {
    for event in model_rx.try_iter() {
        match event {
            ModelEvent::TreeChanged(tree) => {
                if bridge.state() == BridgeState::Running {
                    if let Err(e) = bridge.push_tree(&tree) {
                        warn!("could not send the dream tree: {e}");
                    }
                }
            }
            ModelEvent::BufferSaved { handle, outcome } => {
                report.saved += 1;
                debug!("{} saved: {outcome:?}", handle.display());
            }
            ModelEvent::CurrentChanged(handle) => debug!("current buffer: {handle:?}"),
        }
    }
}
