//! Error types for hyperdoc operations.

use thiserror::Error;

use crate::diagnostic::Diagnostic;
use crate::model::{AnchorId, Capabilities, DocState, Document, TextRange};

/// Errors that can occur while building, editing or serializing a document.
#[derive(Error, Debug)]
pub enum Error {
    #[error("document is not ready (state: {0:?})")]
    NotReady(DocState),

    #[error("anchor range {requested} crosses existing anchor range {existing}")]
    OverlapConflict {
        existing: TextRange,
        requested: TextRange,
    },

    #[error("anchor {0} is detached from its document")]
    AnchorDetached(AnchorId),

    #[error("no anchor with id {0}")]
    UnknownAnchor(AnchorId),

    #[error("no anchor serial numbers left")]
    SerialsExhausted,

    #[error("permission denied: operation requires {required}")]
    PermissionDenied { required: Capabilities },

    #[error("style not found: {0}")]
    StyleNotFound(String),

    #[error("malformed markup ({} diagnostics)", diagnostics.len())]
    ParseFailure {
        diagnostics: Vec<Diagnostic>,
        /// Best-effort document built before and despite the problems.
        partial: Box<Document>,
    },

    #[error("range {start}..{end} is out of bounds for buffer of length {len}")]
    OutOfBounds { start: usize, end: usize, len: usize },

    #[error("access error: {0}")]
    Access(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
