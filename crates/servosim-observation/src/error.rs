//! Errors of observation sources.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ObservationError {
    #[error("topic {0} has no subscriber")]
    Disconnected(String),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid temperature reading in {}: {content:?}", path.display())]
    InvalidReading { path: PathBuf, content: String },
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
