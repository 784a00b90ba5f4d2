//! Tagged hypertext markup: a tolerant reader and a round-tripping writer.
//!
//! Reading is layered. The [`Tokenizer`] splits input into text and tags,
//! [`Events`] classifies tags into hypertext events (styles, anchors and
//! header elements) and the [`Reader`] state machine turns events into a
//! [`Document`] through its fast-append protocol.
//!
//! ```
//! use hyperdoc::markup::{self, ReadOptions, WriteOptions};
//! use hyperdoc::style::StyleSheet;
//!
//! let sheet = StyleSheet::standard();
//! let outcome = markup::read("<H1>Title</H1><P>Text</P>", &sheet, &ReadOptions::default())?;
//! assert_eq!(outcome.document.text(), "Title\nText\n");
//!
//! let out = markup::write(&outcome.document, &sheet, &WriteOptions::default())?;
//! assert!(out.contains("<H1>Title</H1>"));
//! # Ok::<(), hyperdoc::Error>(())
//! ```

mod entities;
mod events;
mod reader;
mod tokenizer;
mod writer;

pub use events::{Events, MarkupEvent};
pub use reader::Reader;
pub use tokenizer::{tokenize, Token, Tokenizer};

use crate::diagnostic::Diagnostic;
use crate::error::Result;
use crate::model::Document;
use crate::style::StyleSheet;
use crate::util;

/// Options for reading markup.
#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    /// Fail with [`Error::ParseFailure`](crate::Error::ParseFailure) on any
    /// diagnostic instead of recovering silently.
    pub strict: bool,
    /// Address of the document being read.
    pub address: Option<String>,
}

/// Options for writing markup.
#[derive(Debug, Clone, Default)]
pub struct WriteOptions {
    /// Address that anchor targets are written relative to. Defaults to the
    /// document's own address.
    pub base: Option<String>,
}

/// A tolerantly read document and the problems recovered from.
#[derive(Debug)]
pub struct ParseOutcome {
    pub document: Document,
    pub diagnostics: Vec<Diagnostic>,
}

/// Read a document from markup.
pub fn read(input: &str, sheet: &StyleSheet, options: &ReadOptions) -> Result<ParseOutcome> {
    let mut reader = Reader::new(sheet, options)?;
    let mut events = Events::new(input);
    for (offset, event) in events.by_ref() {
        reader.feed(offset, event)?;
    }
    reader.finish(input.len(), events.into_diagnostics(), options)
}

/// Read a document from markup bytes of unknown encoding.
pub fn read_bytes(bytes: &[u8], sheet: &StyleSheet, options: &ReadOptions) -> Result<ParseOutcome> {
    let text = util::decode_text(bytes, util::sniff_charset(bytes));
    read(&text, sheet, options)
}

/// Serialize a document to markup.
pub fn write(doc: &Document, sheet: &StyleSheet, options: &WriteOptions) -> Result<String> {
    writer::write_document(doc, sheet, options.base.as_deref())
}
