//! The reader state machine: markup events in, a built [`Document`] out.
//!
//! The reader keeps a stack of open styles and drives the document's
//! fast-append protocol. Every problem it meets is recovered locally and
//! recorded as a diagnostic.

use std::borrow::Cow;
use std::collections::HashSet;

use memchr::memchr;

use super::{MarkupEvent, ParseOutcome, ReadOptions};
use crate::diagnostic::{
    Diagnostic, Diagnostics, W_ANCHOR_LIMIT, W_DUPLICATE_ANCHOR, W_MISMATCHED_CLOSE,
    W_NEXTID_RANGE, W_UNKNOWN_TAG, W_UNTERMINATED_ANCHOR, W_UNTERMINATED_STYLE,
};
use crate::error::{Error, Result};
use crate::model::{Document, Format};
use crate::style::{Style, StyleSheet, Termination, UNTAGGED_STYLE_NAME};

/// Tags that only group other elements and carry no style of their own.
const STRUCTURAL_TAGS: &[&str] = &["html", "head", "body", "ul", "ol", "dl", "menu", "dir"];

fn is_structural(tag: &str) -> bool {
    STRUCTURAL_TAGS.iter().any(|t| t.eq_ignore_ascii_case(tag))
}

/// Builds a document from a sequence of [`MarkupEvent`]s.
pub struct Reader<'s> {
    sheet: &'s StyleSheet,
    untagged: Cow<'s, Style>,
    doc: Document,
    stack: Vec<&'s Style>,
    /// Style last handed to the document: `Some(None)` is untagged text.
    applied: Option<Option<&'s Style>>,
    names: HashSet<String>,
    /// One entry per open `<A>`; `false` for one dropped for lack of a serial.
    anchors: Vec<bool>,
    swallow_newline: bool,
    diagnostics: Diagnostics,
    offset: usize,
}

impl<'s> Reader<'s> {
    pub fn new(sheet: &'s StyleSheet, options: &ReadOptions) -> Result<Self> {
        let untagged = match sheet.style_named(UNTAGGED_STYLE_NAME) {
            Some(style) if style.tag.is_none() => Cow::Borrowed(style),
            _ => Cow::Owned(Style::untagged()),
        };
        let mut doc = match &options.address {
            Some(address) => Document::with_address(address.clone()),
            None => Document::new(),
        };
        doc.set_format(Format::Html);
        doc.append_begin()?;
        Ok(Self {
            sheet,
            untagged,
            doc,
            stack: Vec::new(),
            applied: None,
            names: HashSet::new(),
            anchors: Vec::new(),
            swallow_newline: false,
            diagnostics: Diagnostics::new(),
            offset: 0,
        })
    }

    /// Consume one event found at byte `offset` of the input.
    pub fn feed(&mut self, offset: usize, event: MarkupEvent<'_>) -> Result<()> {
        self.offset = offset;
        if !matches!(event, MarkupEvent::Text(_)) {
            self.swallow_newline = false;
        }
        match event {
            MarkupEvent::Text(text) => self.text(&text)?,
            MarkupEvent::TagOpen(tag) => self.open_tag(tag),
            MarkupEvent::TagClose(tag) => self.close_tag(tag)?,
            MarkupEvent::AnchorOpen { name, href } => {
                self.open_anchor(name.as_deref(), href.as_deref())?
            }
            MarkupEvent::AnchorClose => match self.anchors.pop() {
                Some(true) => {
                    self.doc.append_end_anchor()?;
                }
                Some(false) => {}
                None => self.warn(W_MISMATCHED_CLOSE, "</A> without an open anchor"),
            },
            MarkupEvent::Title(title) => {
                self.doc.set_title(title);
                self.swallow_newline = true;
            }
            MarkupEvent::NextId(n) => {
                match u32::try_from(n) {
                    Ok(next) if next < u32::MAX => self.doc.reserve_anchor_numbers(next),
                    _ => self.warn(
                        W_NEXTID_RANGE,
                        format!("<NEXTID> value {n} out of range ignored"),
                    ),
                }
                self.swallow_newline = true;
            }
            MarkupEvent::IsIndex => {
                self.doc.set_index(true);
                self.swallow_newline = true;
            }
        }
        Ok(())
    }

    /// Close whatever is still open and finish the document.
    ///
    /// `end` is the input length, used as the offset of end-of-stream
    /// diagnostics.
    pub fn finish(
        mut self,
        end: usize,
        extra: Vec<Diagnostic>,
        options: &ReadOptions,
    ) -> Result<ParseOutcome> {
        self.offset = end;
        for _ in 0..self.doc.open_anchors().len() {
            self.warn(W_UNTERMINATED_ANCHOR, "anchor still open at end of input");
        }
        while let Some(&style) = self.stack.last() {
            if style.termination == Termination::EndTag {
                self.warn(
                    W_UNTERMINATED_STYLE,
                    format!("<{}> still open at end of input", tag_of(style)),
                );
            }
            self.close_entry(self.stack.len() - 1)?;
        }
        self.doc.append_end()?;

        let mut diagnostics = self.diagnostics.into_vec();
        diagnostics.extend(extra);
        diagnostics.sort_by_key(|d| d.offset);
        log::debug!(
            "read {} bytes of markup: {} bytes of text, {} diagnostics",
            end,
            self.doc.len(),
            diagnostics.len()
        );

        if options.strict && !diagnostics.is_empty() {
            return Err(Error::ParseFailure {
                diagnostics,
                partial: Box::new(self.doc),
            });
        }
        Ok(ParseOutcome {
            document: self.doc,
            diagnostics,
        })
    }

    fn warn(&mut self, code: &'static str, message: impl Into<String>) {
        self.diagnostics.push(self.offset, code, message);
    }

    fn text(&mut self, text: &str) -> Result<()> {
        let mut text = text;
        if std::mem::take(&mut self.swallow_newline) {
            text = text
                .strip_prefix("\r\n")
                .or_else(|| text.strip_prefix('\n'))
                .unwrap_or(text);
        }
        if text.is_empty() {
            return Ok(());
        }

        // Blank lines between block elements are layout, not content.
        if self.stack.is_empty() && self.at_line_start() {
            if text.contains('\n') && text.trim().is_empty() {
                return Ok(());
            }
            let indent = text.len() - text.trim_start().len();
            if let Some(nl) = text[..indent].rfind('\n') {
                text = &text[nl + 1..];
            }
        }

        while !text.is_empty() {
            let line_mode = self
                .stack
                .last()
                .is_some_and(|s| s.termination == Termination::Line);
            let newline = if line_mode {
                memchr(b'\n', text.as_bytes())
            } else {
                None
            };
            let split = newline.map_or(text.len(), |nl| nl + 1);
            self.append(&text[..split])?;
            text = &text[split..];
            if newline.is_some() {
                self.pop_line_styles();
            }
        }
        Ok(())
    }

    fn open_tag(&mut self, tag: &str) {
        if is_structural(tag) {
            return;
        }
        let Some(style) = self.sheet.style_for_tag(tag) else {
            self.warn(W_UNKNOWN_TAG, format!("unknown tag <{tag}> ignored"));
            return;
        };
        if self
            .stack
            .last()
            .is_some_and(|top| top.termination == Termination::None)
        {
            self.stack.pop();
        }
        self.stack.push(style);
    }

    fn close_tag(&mut self, tag: &str) -> Result<()> {
        if is_structural(tag) {
            return Ok(());
        }
        if let Some(index) = self.stack.iter().rposition(|s| s.matches_tag(tag)) {
            return self.close_entry(index);
        }
        if self.sheet.style_for_tag(tag).is_none() {
            return Ok(());
        }
        match self.stack.last() {
            Some(top) => {
                let message = format!("</{tag}> closes <{}>", tag_of(top));
                self.warn(W_MISMATCHED_CLOSE, message);
                self.close_entry(self.stack.len() - 1)
            }
            None => {
                self.warn(W_MISMATCHED_CLOSE, format!("</{tag}> with nothing open"));
                Ok(())
            }
        }
    }

    /// Remove stack entry `index`. Closing a paragraph style ends its
    /// paragraph with a newline in that style.
    fn close_entry(&mut self, index: usize) -> Result<()> {
        let style = self.stack[index];
        if style.termination == Termination::EndTag {
            if !self.doc.text().ends_with('\n') {
                self.apply(Some(style))?;
                self.doc.append_text("\n")?;
            }
            self.swallow_newline = true;
        }
        self.stack.remove(index);
        Ok(())
    }

    fn open_anchor(&mut self, name: Option<&str>, href: Option<&str>) -> Result<()> {
        if let Some(name) = name
            && !self.names.insert(name.to_string())
        {
            self.warn(
                W_DUPLICATE_ANCHOR,
                format!("anchor name {name:?} already used"),
            );
        }
        match self.doc.append_begin_anchor(name, href) {
            Ok(_) => self.anchors.push(true),
            Err(Error::SerialsExhausted) => {
                self.warn(W_ANCHOR_LIMIT, "no anchor serial numbers left, anchor dropped");
                self.anchors.push(false);
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }

    fn pop_line_styles(&mut self) {
        while self
            .stack
            .last()
            .is_some_and(|s| s.termination == Termination::Line)
        {
            self.stack.pop();
        }
    }

    fn at_line_start(&self) -> bool {
        let text = self.doc.text();
        text.is_empty() || text.ends_with('\n')
    }

    fn append(&mut self, text: &str) -> Result<()> {
        self.apply(self.stack.last().copied())?;
        self.doc.append_text(text)
    }

    /// Make `style` (or untagged text, for `None`) current in the document.
    fn apply(&mut self, style: Option<&'s Style>) -> Result<()> {
        let same = match (self.applied, style) {
            (Some(Some(a)), Some(b)) => std::ptr::eq(a, b),
            (Some(None), None) => true,
            _ => false,
        };
        if !same {
            match style {
                Some(style) => self.doc.append_style(style)?,
                None => self.doc.append_style(&self.untagged)?,
            };
            self.applied = Some(style);
        }
        Ok(())
    }
}

fn tag_of(style: &Style) -> &str {
    style.tag.as_deref().unwrap_or(&style.name)
}
