//! Error taxonomy for backends and automation contexts

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AutomationError {
    /// An action was attempted on a context that has already been closed
    #[error("Context {0} is closed")]
    ClosedContext(String),

    #[error("Unsupported backend: {0} (expected one of: auto, generic, native)")]
    UnsupportedBackend(String),

    /// The backend's capability descriptor denies the requested operation
    #[error("{operation} is not supported by the {backend} backend")]
    NotSupported {
        backend: &'static str,
        operation: &'static str,
    },

    #[error("Capture failed: {0}")]
    Capture(String),

    #[error("Input injection failed: {0}")]
    Input(String),

    #[error("Unknown event: {0} (supported: capture, pointerMove, click, keyPress, contextClose)")]
    UnknownEvent(String),

    #[error("Unsupported key combination: {0}")]
    UnsupportedKey(String),

    #[error("Failed to prepare storage at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An event handler vetoed the action by returning an error
    #[error("Event handler failed: {0}")]
    Handler(anyhow::Error),

    #[error("Backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, AutomationError>;
