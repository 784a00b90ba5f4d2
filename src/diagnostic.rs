//! Recoverable problems reported while reading markup or style definitions.
//!
//! Readers never abort on malformed input. Each problem they recover from is
//! logged through the `log` facade and collected as a [`Diagnostic`] so that
//! callers can show them or turn them into a hard failure.

use std::fmt;

pub const W_UNKNOWN_TAG: &str = "W_UNKNOWN_TAG";
pub const W_MISMATCHED_CLOSE: &str = "W_MISMATCHED_CLOSE";
pub const W_UNTERMINATED_ANCHOR: &str = "W_UNTERMINATED_ANCHOR";
pub const W_UNTERMINATED_STYLE: &str = "W_UNTERMINATED_STYLE";
pub const W_UNTERMINATED_TAG: &str = "W_UNTERMINATED_TAG";
pub const W_UNKNOWN_ENTITY: &str = "W_UNKNOWN_ENTITY";
pub const W_DUPLICATE_ANCHOR: &str = "W_DUPLICATE_ANCHOR";
pub const W_STYLE_RECORD: &str = "W_STYLE_RECORD";
pub const W_NEXTID_RANGE: &str = "W_NEXTID_RANGE";
pub const W_ANCHOR_LIMIT: &str = "W_ANCHOR_LIMIT";

/// A recovered problem at a byte offset of the input.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
pub struct Diagnostic {
    /// Byte offset into the input where the problem was noticed.
    pub offset: usize,
    pub code: &'static str,
    pub message: String,
}

impl Diagnostic {
    pub fn new(offset: usize, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            offset,
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at byte {}: {}", self.code, self.offset, self.message)
    }
}

/// Collects diagnostics and mirrors each one to `log::warn!`.
#[derive(Debug, Default)]
pub(crate) struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, offset: usize, code: &'static str, message: impl Into<String>) {
        let diagnostic = Diagnostic::new(offset, code, message);
        log::warn!("{diagnostic}");
        self.items.push(diagnostic);
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}
