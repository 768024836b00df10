// error.rs - library error types

use crate::mode::ViewMode;
use thiserror::Error;

/// Failures surfaced by the rendering layer behind [`crate::scene::Scene`].
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("unknown entity {0}")]
    UnknownEntity(u32),
    #[error("unknown texture {0}")]
    UnknownTexture(u32),
    #[error("media source not available: {0}")]
    SourceUnavailable(String),
    #[error("texture dispose failed: {0}")]
    Dispose(String),
    #[error("model load failed: {0}")]
    ModelLoad(String),
}

/// Per-asset failures. None of these are fatal: callers log them and keep
/// whatever is currently on screen.
#[derive(Debug, Error)]
pub enum ViewError {
    #[error("no view adapter registered for mode {0:?}")]
    UnsupportedMode(ViewMode),
    #[error("{mode:?} view failed to show {src}: {source}")]
    Show {
        mode: ViewMode,
        src: String,
        #[source]
        source: SceneError,
    },
    #[error(transparent)]
    Scene(#[from] SceneError),
    #[error("invalid parameter {name}: {reason}")]
    InvalidParam { name: &'static str, reason: String },
}

/// Control-channel and initial-state query failures.
#[derive(Debug, Error)]
pub enum ControlError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("http error: {0}")]
    Http(#[from] ureq::Error),
    #[error("malformed payload: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("unrecognised message: {0}")]
    Unrecognised(String),
}

/// Problems with the viewer configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: std::path::PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid config value {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}
