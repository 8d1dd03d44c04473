//! Line-delimited JSON transport over a Unix domain socket.

use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::net::Shutdown;
use std::os::unix::net::{UnixListener, UnixStream};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info};

use super::protocol::{Incoming, Notification, Outgoing};
use super::{EditorClient, NotificationStream};
use crate::{DreamError, Result};

const ACCEPT_POLL: Duration = Duration::from_millis(50);

/// The application's end of an editor connection.
pub struct SocketClient {
    writer: UnixStream,
    reader: Option<UnixStream>,
}

impl SocketClient {
    pub fn new(stream: UnixStream) -> Result<Self> {
        let reader = stream.try_clone()?;
        Ok(Self {
            writer: stream,
            reader: Some(reader),
        })
    }
}

impl EditorClient for SocketClient {
    fn send(&mut self, message: &Outgoing) -> Result<()> {
        let mut line = serde_json::to_vec(message)?;
        line.push(b'\n');
        self.writer.write_all(&line)?;
        self.writer.flush()?;
        Ok(())
    }

    fn notifications(&mut self) -> Result<Box<dyn NotificationStream>> {
        let reader = self
            .reader
            .take()
            .ok_or_else(|| DreamError::Transport("notification stream already taken".into()))?;
        Ok(Box::new(SocketStream {
            reader: BufReader::new(reader),
        }))
    }

    fn close(&mut self) -> Result<()> {
        match self.writer.shutdown(Shutdown::Both) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotConnected => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

struct SocketStream {
    reader: BufReader<UnixStream>,
}

impl NotificationStream for SocketStream {
    fn next_notification(&mut self) -> Result<Option<Notification>> {
        let mut line = Vec::new();
        loop {
            line.clear();
            if self.reader.read_until(b'\n', &mut line)? == 0 {
                return Ok(None);
            }
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            // Bytes that are not UTF-8 fail here as a JSON error, like any other bad line.
            let incoming: Incoming = serde_json::from_slice(&line)?;
            return Ok(Some(incoming.into()));
        }
    }
}

/// Waits for the editor to connect to `listener`.
///
/// Gives up after `timeout`, or as soon as `alive` reports that the editor
/// process is gone.
pub fn accept_editor(
    listener: &UnixListener,
    timeout: Duration,
    mut alive: impl FnMut() -> bool,
) -> Result<SocketClient> {
    listener.set_nonblocking(true)?;
    let deadline = Instant::now() + timeout;
    loop {
        match listener.accept() {
            Ok((stream, _)) => {
                stream.set_nonblocking(false)?;
                info!("editor connected");
                return SocketClient::new(stream);
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => {
                if !alive() {
                    return Err(DreamError::Transport(
                        "editor exited before connecting".into(),
                    ));
                }
                if Instant::now() >= deadline {
                    return Err(DreamError::Transport(format!(
                        "editor did not connect within {}s",
                        timeout.as_secs()
                    )));
                }
                debug!("waiting for editor");
                thread::sleep(ACCEPT_POLL);
            }
            Err(e) => return Err(e.into()),
        }
    }
}
