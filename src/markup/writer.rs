//! Serialization of a [`Document`] back to tagged markup.
//!
//! The writer walks the runs in order and keeps a mirror of the style stack
//! the reader will build from its output, so every tag it emits puts the
//! reader in the state that reproduces the same runs.

use std::collections::BTreeMap;

use memchr::memchr;

use super::entities::{escape_attribute, escape_text};
use crate::address;
use crate::model::{Anchor, Document};
use crate::style::{same_style, Style, StyleId, StyleSheet, Termination};

/// Non-empty anchors keyed by where they open and close, and zero-length
/// anchors keyed by position.
struct AnchorIndex<'d> {
    opens: BTreeMap<usize, Vec<&'d Anchor>>,
    closes: BTreeMap<usize, Vec<&'d Anchor>>,
    points: BTreeMap<usize, Vec<&'d Anchor>>,
}

impl<'d> AnchorIndex<'d> {
    fn new(doc: &'d Document) -> Self {
        let mut index = Self {
            opens: BTreeMap::new(),
            closes: BTreeMap::new(),
            points: BTreeMap::new(),
        };
        for anchor in doc.anchors() {
            let Some(range) = anchor.range() else { continue };
            if range.is_empty() {
                index.points.entry(range.start).or_default().push(anchor);
            } else {
                index.opens.entry(range.start).or_default().push(anchor);
                index.closes.entry(range.end).or_default().push(anchor);
            }
        }
        // Outermost first when opening, innermost first when closing.
        for list in index.opens.values_mut() {
            list.sort_by_key(|a| (std::cmp::Reverse(a.range().map_or(0, |r| r.end)), a.id()));
        }
        for list in index.closes.values_mut() {
            list.sort_by_key(|a| {
                (
                    std::cmp::Reverse(a.range().map_or(0, |r| r.start)),
                    std::cmp::Reverse(a.id()),
                )
            });
        }
        index
    }
}

/// Sheet styles for the document's applied styles, resolved on first use.
struct StyleResolver<'a> {
    doc: &'a Document,
    sheet: &'a StyleSheet,
    resolved: Vec<Option<Style>>,
}

impl<'a> StyleResolver<'a> {
    fn new(doc: &'a Document, sheet: &'a StyleSheet) -> Self {
        Self {
            doc,
            sheet,
            resolved: vec![None; doc.styles().len()],
        }
    }

    fn get(&mut self, id: StyleId) -> &Style {
        let slot = &mut self.resolved[id.0 as usize];
        slot.get_or_insert_with(|| {
            let Some(applied) = self.doc.style(id) else {
                return Style::untagged();
            };
            let (style, miss) = self
                .sheet
                .resolve_for_write(applied.name.as_deref(), &applied.attributes);
            if let Some(err) = miss {
                log::warn!("{err}; writing as {:?}", style.name);
            }
            style.into_owned()
        })
    }
}

/// Emits markup and tracks the reader's style stack.
struct Writer<'b> {
    out: String,
    base: Option<&'b str>,
    stack: Vec<Style>,
    /// A paragraph's final newline, held back until its close tag.
    pending_newline: bool,
}

impl<'b> Writer<'b> {
    fn header(&mut self, doc: &Document) {
        if let Some(title) = doc.title() {
            self.out.push_str("<TITLE>");
            self.out.push_str(&escape_text(title));
            self.out.push_str("</TITLE>\n");
        }
        self.out
            .push_str(&format!("<NEXTID N=\"z{}\">\n", doc.next_anchor_number()));
        if doc.is_index() {
            self.out.push_str("<ISINDEX>\n");
        }
    }

    fn boundary(&mut self, text: &str, pos: usize, style: &Style, anchors: &AnchorIndex<'_>) {
        self.close_anchors(anchors.closes.get(&pos));
        self.enter(style, line_start(text, pos));
        self.point_anchors(anchors.points.get(&pos));
        if let Some(list) = anchors.opens.get(&pos) {
            for anchor in list {
                self.open_anchor(anchor);
            }
        }
    }

    fn finish(&mut self, text: &str, anchors: &AnchorIndex<'_>) {
        let len = text.len();
        self.close_anchors(anchors.closes.get(&len));
        // None and Line styles end with the stream.
        self.close_paragraphs();
        self.flush_newline();
        self.point_anchors(anchors.points.get(&len));
    }

    /// Write `text` in `style`. With `defer`, a final newline of a
    /// paragraph style is held back so it can follow the close tag.
    fn text(&mut self, text: &str, style: &Style, defer: bool) {
        let mut rest = text;
        while !rest.is_empty() {
            // Line styles end at every newline and are reopened per line.
            if style.termination == Termination::Line
                && !self.stack.last().is_some_and(|top| same_style(top, style))
            {
                self.enter(style, true);
            }
            let line_mode = self
                .stack
                .last()
                .is_some_and(|s| s.termination == Termination::Line);
            let split = match memchr(b'\n', rest.as_bytes()) {
                Some(nl) if line_mode => nl + 1,
                _ => rest.len(),
            };
            let (chunk, after) = rest.split_at(split);

            let hold = defer
                && after.is_empty()
                && chunk.ends_with('\n')
                && style.termination == Termination::EndTag
                && self.stack.last().is_some_and(|top| same_style(top, style));
            if hold {
                self.out.push_str(&escape_text(&chunk[..chunk.len() - 1]));
                self.pending_newline = true;
            } else {
                self.out.push_str(&escape_text(chunk));
            }

            if line_mode && chunk.ends_with('\n') {
                while self
                    .stack
                    .last()
                    .is_some_and(|s| s.termination == Termination::Line)
                {
                    self.stack.pop();
                }
            }
            rest = after;
        }
    }

    /// Make `style` the style the reader applies to the next text.
    fn enter(&mut self, style: &Style, line_start: bool) {
        let Some(tag) = style.tag.as_deref() else {
            if self.can_unwind(0, line_start) {
                self.unwind(0);
            } else {
                log::debug!("cannot leave open paragraph for untagged text mid-line");
                self.flush_newline();
            }
            return;
        };

        if self.stack.last().is_some_and(|top| same_style(top, style)) {
            self.flush_newline();
            return;
        }
        if let Some(i) = self.stack.iter().rposition(|s| same_style(s, style))
            && self.can_unwind(i + 1, line_start)
        {
            self.unwind(i + 1);
            return;
        }

        if line_start {
            self.close_paragraphs();
        }
        self.flush_newline();
        if self
            .stack
            .last()
            .is_some_and(|top| top.termination == Termination::None)
        {
            self.stack.pop();
        }
        self.out.push('<');
        self.out.push_str(tag);
        self.out.push('>');
        self.stack.push(style.clone());
    }

    /// Closing a paragraph style mid-line would make the reader insert a
    /// newline.
    fn can_unwind(&self, depth: usize, line_start: bool) -> bool {
        line_start
            || self.stack[depth..]
                .iter()
                .all(|s| s.termination != Termination::EndTag)
    }

    /// Close every entry above `depth`.
    fn unwind(&mut self, depth: usize) {
        self.flush_unless_closing();
        while self.stack.len() > depth {
            if let Some(style) = self.stack.pop() {
                self.close_tag(&style);
            }
        }
        self.flush_newline();
    }

    /// Close every paragraph style, leaving other entries open.
    fn close_paragraphs(&mut self) {
        self.flush_unless_closing();
        for i in (0..self.stack.len()).rev() {
            if self.stack[i].termination == Termination::EndTag {
                let style = self.stack.remove(i);
                self.close_tag(&style);
            }
        }
    }

    /// A held newline can only be recreated by closing the paragraph style
    /// on top of the stack.
    fn flush_unless_closing(&mut self) {
        if self
            .stack
            .last()
            .is_none_or(|top| top.termination != Termination::EndTag)
        {
            self.flush_newline();
        }
    }

    fn flush_newline(&mut self) {
        if std::mem::take(&mut self.pending_newline) {
            self.out.push('\n');
        }
    }

    /// Closing a paragraph style recreates a held newline, and the reader
    /// swallows one newline right after the close tag.
    fn close_tag(&mut self, style: &Style) {
        if let Some(tag) = &style.tag {
            self.out.push_str("</");
            self.out.push_str(tag);
            self.out.push('>');
        }
        if style.termination == Termination::EndTag {
            self.out.push('\n');
            self.pending_newline = false;
        }
    }

    fn open_anchor(&mut self, anchor: &Anchor) {
        self.out.push_str("<A NAME=\"");
        self.out.push_str(&escape_attribute(&anchor.name()));
        self.out.push('"');
        if let Some(target) = anchor.target() {
            let target = match self.base {
                Some(base) => address::relative_to(base, target),
                None => target.to_string(),
            };
            self.out.push_str(" HREF=\"");
            self.out.push_str(&escape_attribute(&target));
            self.out.push('"');
        }
        self.out.push('>');
    }

    fn close_anchors(&mut self, list: Option<&Vec<&Anchor>>) {
        let Some(list) = list else { return };
        self.flush_newline();
        for _ in list {
            self.out.push_str("</A>");
        }
    }

    fn point_anchors(&mut self, list: Option<&Vec<&Anchor>>) {
        for anchor in list.into_iter().flatten() {
            self.flush_newline();
            self.open_anchor(anchor);
            self.out.push_str("</A>");
        }
    }
}

fn line_start(text: &str, pos: usize) -> bool {
    pos == 0 || text.as_bytes()[pos - 1] == b'\n'
}

/// Whether closing a paragraph after `text[..end - 1]` makes the reader
/// append the newline at `end - 1`.
fn newline_recreated_at(text: &str, end: usize) -> bool {
    end < 2 || text.as_bytes()[end - 2] != b'\n'
}

/// Serialize `doc`, resolving styles through `sheet` and writing anchor
/// targets relative to `base` (the document's own address when `None`).
pub(crate) fn write_document(
    doc: &Document,
    sheet: &StyleSheet,
    base: Option<&str>,
) -> crate::error::Result<String> {
    let runs = doc.runs()?;
    let text = doc.text();
    let anchors = AnchorIndex::new(doc);
    let mut styles = StyleResolver::new(doc, sheet);
    let mut writer = Writer {
        out: String::with_capacity(text.len() + text.len() / 4 + 64),
        base: base.or(doc.address()),
        stack: Vec::new(),
        pending_newline: false,
    };

    writer.header(doc);
    for run in runs {
        let style = styles.get(run.style);
        writer.boundary(text, run.range.start, style, &anchors);

        let mut cursor = run.range.start;
        let inner_points = anchors
            .points
            .range(run.range.start + 1..run.range.end)
            .map(|(&pos, _)| pos);
        for pos in inner_points {
            writer.text(&text[cursor..pos], style, false);
            writer.point_anchors(anchors.points.get(&pos));
            cursor = pos;
        }
        let defer = !anchors.closes.contains_key(&run.range.end)
            && newline_recreated_at(text, run.range.end);
        writer.text(&text[cursor..run.range.end], style, defer);
    }
    writer.finish(text, &anchors);

    log::debug!(
        "wrote {} runs, {} anchors as {} bytes of markup",
        runs.len(),
        doc.anchors().count(),
        writer.out.len()
    );
    Ok(writer.out)
}
