//! Fast append protocol used by parsers.
//!
//! Text, style changes and anchor boundaries are recorded in one linear
//! pass. Runs are derived once, in [`Document::append_end`], instead of
//! after every token.

use super::{AppendState, DocState, Document, Format, TextRange};
use crate::error::{Error, Result};
use crate::model::{AnchorId, StyleSpan};
use crate::style::{AppliedStyle, Style, StyleId};

impl Document {
    /// Build a document holding `text` in a single style.
    pub fn from_plain_text(text: &str, style: &Style) -> Document {
        let mut doc = Document::new();
        doc.state = DocState::Building;
        doc.append = Some(AppendState {
            style: StyleId::DEFAULT,
            open_anchors: Vec::new(),
            resume: DocState::Ready,
        });
        let id = doc.styles.intern(AppliedStyle::from_style(style));
        doc.push_text(text, id);
        doc.finish_append();
        doc.format = Format::PlainText;
        doc
    }

    /// Start an append sequence. New text goes after any existing text.
    pub fn append_begin(&mut self) -> Result<()> {
        let resume = match self.state {
            DocState::Empty | DocState::Ready => DocState::Ready,
            DocState::Editing => DocState::Editing,
            state => return Err(Error::NotReady(state)),
        };
        log::debug!("append sequence started at byte {}", self.text.len());
        self.state = DocState::Building;
        self.append = Some(AppendState {
            style: StyleId::DEFAULT,
            open_anchors: Vec::new(),
            resume,
        });
        Ok(())
    }

    /// Set the style for text appended from now on.
    pub fn append_style(&mut self, style: &Style) -> Result<StyleId> {
        self.ensure_building()?;
        let id = self.styles.intern(AppliedStyle::from_style(style));
        if let Some(append) = self.append.as_mut() {
            append.style = id;
        }
        Ok(id)
    }

    /// Append text in the current style.
    pub fn append_text(&mut self, text: &str) -> Result<()> {
        let style = self.ensure_building()?.style;
        self.push_text(text, style);
        Ok(())
    }

    /// Open an anchor at the current end of the buffer.
    ///
    /// A `name` of the form `z<n>` asks for serial `n`, which is granted
    /// when unused; any other name is kept as the anchor's explicit name.
    pub fn append_begin_anchor(
        &mut self,
        name: Option<&str>,
        reference: Option<&str>,
    ) -> Result<AnchorId> {
        self.ensure_building()?;

        let wanted = name.and_then(generated_serial);
        let serial = self.allocate_serial(wanted)?;
        let start = self.text.len();
        let id = self.push_anchor(serial, TextRange::point(start));

        let anchor = &mut self.anchors[id.0 as usize];
        if wanted != Some(serial) {
            anchor.name = name.map(str::to_string);
        }
        anchor.target = reference.map(str::to_string);

        if let Some(append) = self.append.as_mut() {
            append.open_anchors.push(id);
        }
        Ok(id)
    }

    /// Close the innermost open anchor at the current end of the buffer.
    ///
    /// Returns `None` when no anchor is open.
    pub fn append_end_anchor(&mut self) -> Result<Option<AnchorId>> {
        self.ensure_building()?;
        let end = self.text.len();
        let Some(id) = self.append.as_mut().and_then(|a| a.open_anchors.pop()) else {
            return Ok(None);
        };
        self.close_anchor(id, end);
        Ok(Some(id))
    }

    /// Close a specific open anchor.
    ///
    /// Anchors opened after it are force-closed at the same point, so the
    /// result never crosses.
    pub fn append_end_anchor_id(&mut self, id: AnchorId) -> Result<()> {
        self.ensure_building()?;
        let end = self.text.len();
        let open = self
            .append
            .as_ref()
            .map(|a| a.open_anchors.as_slice())
            .unwrap_or_default();
        let Some(index) = open.iter().rposition(|&open_id| open_id == id) else {
            return Err(Error::UnknownAnchor(id));
        };

        let closing: Vec<AnchorId> = match self.append.as_mut() {
            Some(append) => append.open_anchors.drain(index..).rev().collect(),
            None => Vec::new(),
        };
        if closing.len() > 1 {
            log::warn!(
                "closing anchor {id} force-closes {} anchor(s) opened inside it",
                closing.len() - 1
            );
        }
        for open_id in closing {
            self.close_anchor(open_id, end);
        }
        Ok(())
    }

    /// End the append sequence: close anchors left open and derive runs.
    ///
    /// Returns the anchors that had to be closed here.
    pub fn append_end(&mut self) -> Result<Vec<AnchorId>> {
        self.ensure_building()?;
        let unclosed = self.finish_append();
        Ok(unclosed)
    }

    /// Anchors currently open in the append sequence, outermost first.
    pub fn open_anchors(&self) -> &[AnchorId] {
        self.append
            .as_ref()
            .map(|a| a.open_anchors.as_slice())
            .unwrap_or_default()
    }

    fn ensure_building(&self) -> Result<&AppendState> {
        match (&self.append, self.state) {
            (Some(append), DocState::Building) => Ok(append),
            (_, state) => Err(Error::NotReady(state)),
        }
    }

    fn finish_append(&mut self) -> Vec<AnchorId> {
        let Some(append) = self.append.take() else {
            return Vec::new();
        };
        let end = self.text.len();
        let unclosed: Vec<AnchorId> = append.open_anchors.iter().rev().copied().collect();
        for &id in &unclosed {
            log::debug!("anchor {id} still open at end of append, closing at {end}");
            self.close_anchor(id, end);
        }
        self.rederive();
        self.state = append.resume;
        log::debug!(
            "append sequence ended: {} bytes, {} runs",
            self.text.len(),
            self.runs.len()
        );
        unclosed
    }

    fn close_anchor(&mut self, id: AnchorId, end: usize) {
        if let Some(anchor) = self.anchors.get_mut(id.0 as usize)
            && let Some(range) = anchor.range.as_mut()
        {
            range.end = end;
        }
    }

    pub(crate) fn push_text(&mut self, text: &str, style: StyleId) {
        if text.is_empty() {
            return;
        }
        let start = self.text.len();
        self.text.push_str(text);
        let end = self.text.len();
        match self.spans.last_mut() {
            Some(last) if last.style == style && last.range.end == start => last.range.end = end,
            _ => self.spans.push(StyleSpan {
                range: TextRange::new(start, end),
                style,
            }),
        }
    }
}

/// Serial encoded in a generated anchor name (`z<n>`).
fn generated_serial(name: &str) -> Option<u32> {
    let digits = name.strip_prefix('z').or_else(|| name.strip_prefix('Z'))?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok().filter(|&n| n != u32::MAX)
}
