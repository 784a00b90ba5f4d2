//! The hypertext document model.
//!
//! A [`Document`] owns a text buffer, the style applied to every byte of it
//! and a set of [`Anchor`]s bound to ranges of it. Styled [`Run`]s are a
//! derived view: maximal spans sharing one style and one innermost anchor.
//!
//! Documents are built either with the fast-append protocol
//! ([`Document::append_begin`] … [`Document::append_end`]), which the markup
//! reader drives, or from plain text. Once built they accept structural
//! edits: style application, anchor creation and removal, text replacement.
//!
//! # Example
//!
//! ```
//! use hyperdoc::model::{Document, TextRange};
//! use hyperdoc::style::StyleSheet;
//!
//! let sheet = StyleSheet::standard();
//! let body = sheet.style_named("Body").unwrap();
//!
//! let mut doc = Document::new();
//! doc.append_begin().unwrap();
//! doc.append_style(body).unwrap();
//! doc.append_text("See this.\n").unwrap();
//! doc.append_end().unwrap();
//!
//! let anchor = doc
//!     .create_anchor_for_selection(TextRange::new(4, 8), Some("doc2"))
//!     .unwrap();
//! assert_eq!(doc.runs().unwrap().len(), 3);
//! assert_eq!(doc.anchor(anchor).unwrap().target(), Some("doc2"));
//! ```

mod anchor;
mod append;
mod dump;
mod edit;
mod range;
mod runs;

use std::collections::HashSet;

pub use anchor::{Anchor, AnchorId, Capabilities};
pub use range::TextRange;
pub use runs::Run;

use crate::error::{Error, Result};
use crate::style::{AppliedStyle, StyleId, StylePool};

/// Lifecycle of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
pub enum DocState {
    /// Nothing loaded yet.
    Empty,
    /// Inside an append sequence; structural queries are not valid.
    Building,
    /// Built and unmodified.
    Ready,
    /// Built and modified by structural edits.
    Editing,
    Closed,
}

/// On-disk representation a document was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
pub enum Format {
    #[default]
    Html,
    PlainText,
}

/// A contiguous byte range of the buffer carrying one applied style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct StyleSpan {
    pub range: TextRange,
    pub style: StyleId,
}

/// In-progress append sequence.
#[derive(Debug, Clone)]
struct AppendState {
    style: StyleId,
    open_anchors: Vec<AnchorId>,
    /// State to return to once the sequence ends.
    resume: DocState,
}

/// One hypertext node: text, styles and anchors.
#[derive(Debug, Clone)]
pub struct Document {
    text: String,
    /// Covers the buffer with no gaps; adjacent spans differ in style.
    spans: Vec<StyleSpan>,
    styles: StylePool,
    /// Anchor arena; disconnected anchors stay in place, marked detached.
    anchors: Vec<Anchor>,
    node_anchor: Anchor,
    serials: HashSet<u32>,
    next_anchor_number: u32,
    protection: Capabilities,
    format: Format,
    is_index: bool,
    title: Option<String>,
    address: Option<String>,
    state: DocState,
    runs: Vec<Run>,
    append: Option<AppendState>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document with full protection rights.
    pub fn new() -> Self {
        let node_anchor = Anchor::new(AnchorId::NODE, 0, None);
        Self {
            text: String::new(),
            spans: Vec::new(),
            styles: StylePool::new(),
            anchors: Vec::new(),
            node_anchor,
            serials: HashSet::from([0]),
            next_anchor_number: 1,
            protection: Capabilities::ALL,
            format: Format::Html,
            is_index: false,
            title: None,
            address: None,
            state: DocState::Empty,
            runs: Vec::new(),
            append: None,
        }
    }

    /// Create an empty document for the node at `address`.
    pub fn with_address(address: impl Into<String>) -> Self {
        let mut doc = Self::new();
        doc.set_address(Some(address.into()));
        doc
    }

    pub fn state(&self) -> DocState {
        self.state
    }

    /// The text buffer.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Text of a range. Panics if the range is out of bounds.
    pub fn slice(&self, range: TextRange) -> &str {
        &self.text[range.start..range.end]
    }

    /// The derived run sequence.
    pub fn runs(&self) -> Result<&[Run]> {
        self.ensure_ready()?;
        Ok(&self.runs)
    }

    /// An applied style by id.
    pub fn style(&self, id: StyleId) -> Option<&AppliedStyle> {
        self.styles.get(id)
    }

    pub fn styles(&self) -> &StylePool {
        &self.styles
    }

    /// The style applied at byte `pos`.
    pub fn style_at(&self, pos: usize) -> Option<StyleId> {
        let index = self.spans.partition_point(|s| s.range.end <= pos);
        self.spans.get(index).map(|s| s.style)
    }

    /// Look up an anchor, detached or not.
    pub fn anchor(&self, id: AnchorId) -> Result<&Anchor> {
        if id == AnchorId::NODE {
            return Ok(&self.node_anchor);
        }
        self.anchors
            .get(id.0 as usize)
            .ok_or(Error::UnknownAnchor(id))
    }

    /// Live part anchors in creation order.
    pub fn anchors(&self) -> impl Iterator<Item = &Anchor> {
        self.anchors.iter().filter(|a| !a.detached)
    }

    /// Find a live anchor by its markup name.
    pub fn anchor_named(&self, name: &str) -> Option<&Anchor> {
        self.anchors().find(|a| a.name() == name)
    }

    /// The anchor representing the document itself.
    pub fn node_anchor(&self) -> &Anchor {
        &self.node_anchor
    }

    /// Whether `op` is allowed through anchor `id`: the document's
    /// protection, narrowed by the anchor's own mask when it has one.
    pub fn anchor_allows(&self, id: AnchorId, op: Capabilities) -> Result<bool> {
        let anchor = self.anchor(id)?;
        Ok(self.protection.contains(op) && anchor.capability_allows(op))
    }

    pub fn protection(&self) -> Capabilities {
        self.protection
    }

    pub fn set_protection(&mut self, protection: Capabilities) {
        self.protection = protection;
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn set_format(&mut self, format: Format) {
        self.format = format;
    }

    /// Whether the node accepts keyword queries.
    pub fn is_index(&self) -> bool {
        self.is_index
    }

    pub fn set_index(&mut self, is_index: bool) {
        self.is_index = is_index;
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = Some(title.into());
    }

    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    /// Set the node's address; the node anchor and anchors created later
    /// record it as their owning node.
    pub fn set_address(&mut self, address: Option<String>) {
        self.node_anchor.node = address.clone();
        self.address = address;
    }

    /// Serial number the next new anchor will get.
    pub fn next_anchor_number(&self) -> u32 {
        self.next_anchor_number
    }

    /// Raise the serial counter to at least `next`.
    pub fn reserve_anchor_numbers(&mut self, next: u32) {
        self.next_anchor_number = self.next_anchor_number.max(next);
    }

    /// Close the document; every later query fails with `NotReady`.
    pub fn close(&mut self) {
        log::debug!("closing document {:?}", self.address);
        self.append = None;
        self.state = DocState::Closed;
    }

    pub(crate) fn ensure_ready(&self) -> Result<()> {
        match self.state {
            DocState::Ready | DocState::Editing => Ok(()),
            DocState::Empty if self.text.is_empty() => Ok(()),
            state => Err(Error::NotReady(state)),
        }
    }

    /// Allocate a serial for a new anchor. `wanted` is honored when it is
    /// free and non-zero.
    ///
    /// Fails with [`Error::SerialsExhausted`] once no serial is left below
    /// `u32::MAX`; nothing is changed then.
    fn allocate_serial(&mut self, wanted: Option<u32>) -> Result<u32> {
        let serial = match wanted {
            Some(n) if n != 0 && !self.serials.contains(&n) => n,
            _ => {
                let mut n = self.next_anchor_number;
                while self.serials.contains(&n) {
                    n = n.checked_add(1).ok_or(Error::SerialsExhausted)?;
                }
                n
            }
        };
        let next = serial.checked_add(1).ok_or(Error::SerialsExhausted)?;
        self.serials.insert(serial);
        self.next_anchor_number = self.next_anchor_number.max(next);
        Ok(serial)
    }

    fn push_anchor(&mut self, serial: u32, range: TextRange) -> AnchorId {
        let id = AnchorId(self.anchors.len() as u32);
        let mut anchor = Anchor::new(id, serial, Some(range));
        anchor.node = self.address.clone();
        log::trace!("anchor {id} allocated with serial {serial} at {range}");
        self.anchors.push(anchor);
        id
    }

    /// Recompute the derived runs from spans and anchors.
    fn rederive(&mut self) {
        self.runs = runs::derive_runs(&self.spans, &self.anchors);
    }
}
