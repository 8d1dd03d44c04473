//! Messages exchanged with the editor process.
//!
//! Every message is one JSON object per line. The application sends
//! [`Outgoing`] messages; the editor answers with notifications on the
//! [`GUI_EVENT`] channel whose first argument names the event.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{DreamError, Result};

/// Name of the notification channel the editor runtime publishes on.
pub const GUI_EVENT: &str = "DreamGuiEvent";

/// A message from the application to the editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outgoing {
    /// Start forwarding notifications of `event` to the application.
    Subscribe { event: String },
    /// Set the global editor variable `name`.
    SetVar { name: String, value: Value },
    /// Run an Ex command.
    Command { command: String },
}

/// A message from the editor to the application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Incoming {
    Notification {
        event: String,
        #[serde(default)]
        args: Vec<Value>,
    },
}

/// A raw notification, before it is interpreted.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub event: String,
    pub args: Vec<Value>,
}

impl From<Incoming> for Notification {
    fn from(incoming: Incoming) -> Self {
        let Incoming::Notification { event, args } = incoming;
        Self { event, args }
    }
}

/// An editor notification the router knows how to handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeEvent {
    /// The working copy at `path` was written.
    Save { path: PathBuf },
    /// The editor is quitting.
    Quit,
    /// The working copy at `path` is now the focused buffer.
    Current { path: PathBuf },
    /// The user picked stored note `id` from the navigation tree.
    Open { id: i64 },
}

impl TryFrom<&Notification> for BridgeEvent {
    type Error = DreamError;

    fn try_from(notification: &Notification) -> Result<Self> {
        if notification.event != GUI_EVENT {
            return Err(DreamError::Transport(format!(
                "unexpected notification channel '{}'",
                notification.event
            )));
        }
        let kind = notification.args.first().and_then(Value::as_str);
        let path = || {
            notification
                .args
                .get(1)
                .and_then(Value::as_str)
                .filter(|p| !p.is_empty())
                .map(PathBuf::from)
                .ok_or_else(|| {
                    DreamError::Transport(format!("{kind:?} notification without a path"))
                })
        };

        let id = || {
            let arg = notification.args.get(1);
            arg.and_then(Value::as_i64)
                .or_else(|| arg.and_then(Value::as_str).and_then(|s| s.trim().parse().ok()))
                .ok_or_else(|| DreamError::Transport("Open notification without a note id".into()))
        };

        match kind {
            Some("Save") => Ok(BridgeEvent::Save { path: path()? }),
            Some("Quit") => Ok(BridgeEvent::Quit),
            Some("Current") => Ok(BridgeEvent::Current { path: path()? }),
            Some("Open") => Ok(BridgeEvent::Open { id: id()? }),
            other => Err(DreamError::Transport(format!(
                "unknown editor event {other:?}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn notification(args: Value) -> Notification {
        let incoming: Incoming = serde_json::from_value(json!({
            "type": "notification",
            "event": GUI_EVENT,
            "args": args,
        }))
        .unwrap();
        incoming.into()
    }

    #[test]
    fn test_parse_known_events() {
        assert_eq!(
            BridgeEvent::try_from(&notification(json!(["Save", "/tmp/dreamA"]))).unwrap(),
            BridgeEvent::Save {
                path: PathBuf::from("/tmp/dreamA")
            }
        );
        assert_eq!(
            BridgeEvent::try_from(&notification(json!(["Quit"]))).unwrap(),
            BridgeEvent::Quit
        );
        assert_eq!(
            BridgeEvent::try_from(&notification(json!(["Current", "/tmp/dreamB"]))).unwrap(),
            BridgeEvent::Current {
                path: PathBuf::from("/tmp/dreamB")
            }
        );
    }

    #[test]
    fn test_parse_open_accepts_number_or_numeric_string() {
        assert_eq!(
            BridgeEvent::try_from(&notification(json!(["Open", 7]))).unwrap(),
            BridgeEvent::Open { id: 7 }
        );
        assert_eq!(
            BridgeEvent::try_from(&notification(json!(["Open", "12"]))).unwrap(),
            BridgeEvent::Open { id: 12 }
        );
        assert!(BridgeEvent::try_from(&notification(json!(["Open"]))).is_err());
        assert!(BridgeEvent::try_from(&notification(json!(["Open", 1.5]))).is_err());
    }

    #[test]
    fn test_reject_malformed_events() {
        for args in [
            json!([]),
            json!(["Save"]),
            json!(["Save", 3]),
            json!(["Open", "/x"]),
            json!(["Close", "/x"]),
        ] {
            assert!(BridgeEvent::try_from(&notification(args)).is_err());
        }

        let other_channel = Notification {
            event: "SomethingElse".to_string(),
            args: vec![json!("Quit")],
        };
        assert!(BridgeEvent::try_from(&other_channel).is_err());
    }

    #[test]
    fn test_outgoing_wire_shape() {
        let msg = Outgoing::SetVar {
            name: "dreamnote_buffer_dir".to_string(),
            value: json!("/tmp/dreamdtb1"),
        };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"type": "set_var", "name": "dreamnote_buffer_dir", "value": "/tmp/dreamdtb1"})
        );

        let incoming: Incoming =
            serde_json::from_str(r#"{"type":"notification","event":"DreamGuiEvent"}"#).unwrap();
        assert_eq!(Notification::from(incoming).args.len(), 0);
    }
}
