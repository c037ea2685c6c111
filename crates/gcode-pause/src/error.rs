//! Error types for pause editing.

use std::path::PathBuf;

use thiserror::Error;

/// Fatal errors. An operation that returns one of these leaves the
/// [`Document`](crate::Document) unchanged.
#[derive(Error, Debug)]
pub enum PauseError {
    /// A line shaped like a layer marker whose height does not parse.
    #[error("malformed layer marker on line {}: {:?}", .offset + 1, .text)]
    MalformedLayerMarker {
        /// Zero-based line offset.
        offset: usize,
        /// Line content without terminator.
        text: String,
    },

    /// A pause begin marker that is never closed.
    #[error("pause block starting on line {} has no end marker", .start + 1)]
    UnterminatedPause {
        /// Offset of the begin marker.
        start: usize,
    },

    /// A pause end marker with no open block.
    #[error("pause end marker on line {} has no begin marker", .offset + 1)]
    UnmatchedPauseEnd {
        /// Offset of the end marker.
        offset: usize,
    },

    /// Pause parameters rejected by the template.
    #[error("invalid pause parameters: {0}")]
    InvalidParameters(String),

    /// Input path is missing or not a `.gcode` file.
    #[error("{} is not a valid G-code file", .0.display())]
    NotGcodeFile(PathBuf),

    /// Export requested without a destination or a source path to derive one from.
    #[error("no destination given and document has no source path")]
    NoDestination,

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for pause operations.
pub type Result<T> = std::result::Result<T, PauseError>;
