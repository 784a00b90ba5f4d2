//! # hyperdoc
//!
//! A hypertext document core: styled text with named anchors, read from and
//! written to tagged SGML-style markup.
//!
//! ## Features
//!
//! - Style sheets mapping markup tags to physical text attributes
//! - Documents as a text buffer, a style for every byte, and anchors that
//!   never cross, with styled runs derived on demand
//! - A fast-append protocol for building documents in one pass
//! - A tolerant markup reader that recovers from malformed input and
//!   reports what it recovered from
//! - A markup writer whose output reads back into the same runs and anchors,
//!   with link targets written relative to the document's address
//!
//! ## Quick Start
//!
//! ```
//! use hyperdoc::{load_from_stream, serialize, StyleSheet};
//!
//! let sheet = StyleSheet::standard();
//! let outcome = load_from_stream(
//!     b"<h1>Title</h1><p>See <a href=\"doc2\">this</a>.</p>",
//!     &sheet,
//! )?;
//! let doc = outcome.document;
//! assert_eq!(doc.text(), "Title\nSee this.\n");
//! assert_eq!(doc.runs()?.len(), 4);
//!
//! let markup = serialize(&doc, &sheet, None)?;
//! assert!(markup.contains("<A NAME=\"z1\" HREF=\"doc2\">this</A>"));
//! # Ok::<(), hyperdoc::Error>(())
//! ```
//!
//! ## Editing
//!
//! ```
//! use hyperdoc::{Document, StyleSheet, TextRange};
//!
//! let sheet = StyleSheet::standard();
//! let mut doc = Document::from_plain_text("Hello world\n", sheet.style_named("Body").unwrap());
//! doc.apply_style(sheet.style_named("Heading1").unwrap(), TextRange::new(0, 5))?;
//! let link = doc.create_anchor_for_selection(TextRange::new(6, 11), Some("world.html"))?;
//! assert_eq!(doc.selected_link(TextRange::new(7, 8))?, Some(link));
//! # Ok::<(), hyperdoc::Error>(())
//! ```

pub mod access;
pub mod address;
pub mod diagnostic;
pub mod error;
pub mod markup;
pub mod model;
pub mod style;
pub(crate) mod util;

pub use access::{Access, LocalAccess};
pub use diagnostic::Diagnostic;
pub use error::{Error, Result};
pub use markup::{ParseOutcome, ReadOptions, WriteOptions};
pub use model::{Anchor, AnchorId, Capabilities, DocState, Document, Format, Run, TextRange};
pub use style::{Style, StyleSheet, Termination, TextAttributes};

/// Read a document from markup bytes, tolerating malformed input.
pub fn load_from_stream(bytes: &[u8], sheet: &StyleSheet) -> Result<ParseOutcome> {
    markup::read_bytes(bytes, sheet, &ReadOptions::default())
}

/// Serialize a document to markup, writing anchor targets relative to
/// `base` (or to the document's own address).
pub fn serialize(doc: &Document, sheet: &StyleSheet, base: Option<&str>) -> Result<String> {
    markup::write(
        doc,
        sheet,
        &WriteOptions {
            base: base.map(str::to_string),
        },
    )
}
