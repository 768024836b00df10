//! Live control channel
//!
//! A selection server pushes JSON text frames over a WebSocket: either the
//! file list of the folder the user picked, or a `params` update. The client
//! runs on its own thread with a single-threaded tokio runtime and forwards
//! decoded messages to the render loop over a std channel.

use crate::error::ControlError;
use crate::media::{MediaDescriptor, MediaInfo};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::sync::mpsc::Sender;
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio_tungstenite::tungstenite::Message;

pub const DEFAULT_MEDIA_BASE: &str = "data/";
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Folder selection pushed by the server.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionPayload {
    pub files: Vec<String>,
    pub info: Option<MediaInfo>,
    /// Folder path relative to the media base, informational only.
    pub path: String,
}

impl SelectionPayload {
    /// Descriptor for the first file, resolved against `base`.
    pub fn descriptor(&self, base: &str) -> Option<MediaDescriptor> {
        let first = self.files.first()?;
        Some(MediaDescriptor::from_source(
            format!("{base}{first}"),
            self.info.clone(),
        ))
    }

    fn from_object(obj: &serde_json::Map<String, Value>) -> Self {
        let files = obj
            .get("files")
            .and_then(Value::as_array)
            .map(|a| string_items(a))
            .unwrap_or_default();
        let info = obj.get("info").and_then(Value::as_object).map(|m| {
            m.iter()
                .map(|(k, v)| {
                    let v = match v {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    (k.clone(), v)
                })
                .collect::<MediaInfo>()
        });
        let path = obj
            .get("path")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Self {
            files,
            info: info.filter(|m| !m.is_empty()),
            path,
        }
    }
}

fn string_items(items: &[Value]) -> Vec<String> {
    items
        .iter()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub enum ControlMessage {
    Selection(SelectionPayload),
    /// The `params` object of a `{"type":"params"}` frame.
    Params(Value),
}

pub fn parse_message(text: &str) -> Result<ControlMessage, ControlError> {
    let value: Value = serde_json::from_str(text)?;
    parse_value(value)
}

pub fn parse_value(value: Value) -> Result<ControlMessage, ControlError> {
    match value {
        Value::Array(items) => Ok(ControlMessage::Selection(SelectionPayload {
            files: string_items(&items),
            ..SelectionPayload::default()
        })),
        Value::Object(mut obj) => {
            if obj.get("type").and_then(Value::as_str) == Some("params") {
                let params = obj.remove("params").unwrap_or(Value::Null);
                return Ok(ControlMessage::Params(params));
            }
            Ok(ControlMessage::Selection(SelectionPayload::from_object(&obj)))
        }
        other => Err(ControlError::Unrecognised(other.to_string())),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ControlEvent {
    Connected,
    Disconnected,
    Message(ControlMessage),
}

/// Handle to the background connection. Dropping it stops the client once
/// its current connection attempt or session ends.
pub struct ControlClient {
    outbound: UnboundedSender<String>,
    _thread: JoinHandle<()>,
}

impl ControlClient {
    pub fn spawn(
        url: String,
        reconnect_delay: Duration,
        events: Sender<ControlEvent>,
    ) -> std::io::Result<Self> {
        let (outbound, outbound_rx) = unbounded_channel();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let thread = std::thread::Builder::new()
            .name("control-channel".into())
            .spawn(move || {
                runtime.block_on(run(url, reconnect_delay, events, outbound_rx));
            })?;
        Ok(Self {
            outbound,
            _thread: thread,
        })
    }

    /// Queue a JSON payload for the server to re-broadcast.
    pub fn send(&self, payload: &Value) {
        if self.outbound.send(payload.to_string()).is_err() {
            log::warn!("control channel closed, dropping outbound message");
        }
    }
}

enum SessionEnd {
    Reconnect,
    Shutdown,
}

async fn run(
    url: String,
    delay: Duration,
    events: Sender<ControlEvent>,
    mut outbound: UnboundedReceiver<String>,
) {
    loop {
        match tokio_tungstenite::connect_async(url.as_str()).await {
            Ok((stream, _)) => {
                log::info!("connected to control channel {url}");
                if events.send(ControlEvent::Connected).is_err() {
                    return;
                }
                let end = session(stream, &events, &mut outbound).await;
                log::info!("control channel {url} disconnected");
                if events.send(ControlEvent::Disconnected).is_err() {
                    return;
                }
                if let SessionEnd::Shutdown = end {
                    return;
                }
            }
            Err(e) => log::warn!("control channel {url} unavailable: {e}"),
        }
        tokio::time::sleep(delay).await;
    }
}

async fn session<S>(
    stream: tokio_tungstenite::WebSocketStream<S>,
    events: &Sender<ControlEvent>,
    outbound: &mut UnboundedReceiver<String>,
) -> SessionEnd
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    let (mut write, mut read) = stream.split();
    loop {
        tokio::select! {
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => match parse_message(&text) {
                        Ok(message) => {
                            if events.send(ControlEvent::Message(message)).is_err() {
                                return SessionEnd::Shutdown;
                            }
                        }
                        Err(e) => log::debug!("ignoring control frame: {e}"),
                    },
                    Some(Ok(Message::Ping(data))) => {
                        if write.send(Message::Pong(data)).await.is_err() {
                            return SessionEnd::Reconnect;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => return SessionEnd::Reconnect,
                    Some(Err(e)) => {
                        log::warn!("control channel error: {e}");
                        return SessionEnd::Reconnect;
                    }
                    Some(Ok(_)) => {}
                }
            }
            out = outbound.recv() => {
                match out {
                    Some(text) => {
                        if let Err(e) = write.send(Message::Text(text)).await {
                            log::warn!("failed to send on control channel: {e}");
                            return SessionEnd::Reconnect;
                        }
                    }
                    None => return SessionEnd::Shutdown,
                }
            }
        }
    }
}

/// Ask the server which folder was selected before this viewer started.
/// A non-success status means "nothing selected yet".
pub fn fetch_last_selection(server_url: &str) -> Result<Option<SelectionPayload>, ControlError> {
    let url = format!("{}/api/last-selection", server_url.trim_end_matches('/'));
    let mut response = match ureq::get(&url).header("Cache-Control", "no-store").call() {
        Ok(r) => r,
        Err(ureq::Error::StatusCode(code)) => {
            log::debug!("no last selection ({code})");
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };
    let value: Value = response.body_mut().read_json()?;
    if value.is_null() {
        return Ok(None);
    }
    match parse_value(value)? {
        ControlMessage::Selection(selection) => Ok(Some(selection)),
        ControlMessage::Params(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bare_array_is_a_selection() {
        let msg = parse_message(r#"["trip/a_vr180.mp4", "trip/b.jpg"]"#).unwrap();
        let ControlMessage::Selection(sel) = msg else {
            panic!("expected selection");
        };
        let d = sel.descriptor(DEFAULT_MEDIA_BASE).unwrap();
        assert_eq!(d.source_ref, "data/trip/a_vr180.mp4");
        assert_eq!(d.filename, "a_vr180.mp4");
        assert!(d.is_video);
        assert!(d.info.is_none());
    }

    #[test]
    fn object_selection_carries_info() {
        let value = json!({
            "files": ["room.jpg"],
            "info": {"type": "vr360", "fov": 360},
            "path": "rooms"
        });
        let ControlMessage::Selection(sel) = parse_value(value).unwrap() else {
            panic!("expected selection");
        };
        assert_eq!(sel.path, "rooms");
        let d = sel.descriptor("media/").unwrap();
        assert_eq!(d.source_ref, "media/room.jpg");
        let info = d.info.unwrap();
        assert_eq!(info["type"], "vr360");
        assert_eq!(info["fov"], "360");
    }

    #[test]
    fn empty_selection_has_no_descriptor() {
        let ControlMessage::Selection(sel) = parse_value(json!({"files": []})).unwrap() else {
            panic!("expected selection");
        };
        assert!(sel.descriptor(DEFAULT_MEDIA_BASE).is_none());
    }

    #[test]
    fn params_frame() {
        let msg = parse_message(r#"{"type":"params","params":{"modelScale":2}}"#).unwrap();
        assert_eq!(msg, ControlMessage::Params(json!({"modelScale": 2})));
    }

    #[test]
    fn plain_text_is_rejected() {
        assert!(matches!(parse_message("connected"), Err(ControlError::Payload(_))));
        assert!(matches!(parse_message("42"), Err(ControlError::Unrecognised(_))));
    }
}
