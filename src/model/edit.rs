//! Structural editing: style application, anchor management and text
//! replacement.
//!
//! Every operation validates ranges and capabilities before it touches the
//! document, so a rejected edit leaves no partial mutation behind.

use super::{Anchor, AnchorId, Capabilities, DocState, Document, StyleSpan, TextRange};
use crate::access::Access;
use crate::error::{Error, Result};
use crate::style::{AppliedStyle, Style, StyleId, StyleSheet};

impl Document {
    /// Re-tag every byte of `range` with `style`.
    ///
    /// Anchors survive unless the style clears anchors, in which case the
    /// ones fully inside the range are disconnected.
    pub fn apply_style(&mut self, style: &Style, range: TextRange) -> Result<()> {
        self.ensure_ready()?;
        self.check_range(range)?;
        self.require(Capabilities::WRITE)?;
        self.check_writable_anchors(range)?;
        if range.is_empty() {
            return Ok(());
        }

        let id = self.styles.intern(AppliedStyle::from_style(style));
        self.restyle(range, id);
        if style.clears_anchor {
            self.clear_anchors_in(range);
        }
        log::debug!("applied style {:?} to {range}", style.name);
        self.touch();
        Ok(())
    }

    /// Apply `style` to every span sharing the style found at the start of
    /// `range`.
    pub fn apply_to_similar(&mut self, style: &Style, range: TextRange) -> Result<()> {
        self.ensure_ready()?;
        self.check_range(range)?;
        self.require(Capabilities::WRITE)?;
        let Some(similar) = self.style_at(range.start) else {
            return Ok(());
        };

        let targets: Vec<TextRange> = self
            .spans
            .iter()
            .filter(|s| s.style == similar)
            .map(|s| s.range)
            .collect();
        for &target in &targets {
            self.check_writable_anchors(target)?;
        }

        let id = self.styles.intern(AppliedStyle::from_style(style));
        for &target in &targets {
            self.restyle(target, id);
            if style.clears_anchor {
                self.clear_anchors_in(target);
            }
        }
        log::debug!(
            "applied style {:?} to {} similar span(s)",
            style.name,
            targets.len()
        );
        self.touch();
        Ok(())
    }

    /// The first span whose style `sheet` recognizes neither by name nor by
    /// attributes.
    pub fn select_unstyled(&self, sheet: &StyleSheet) -> Result<Option<TextRange>> {
        self.ensure_ready()?;
        Ok(self
            .spans
            .iter()
            .find(|span| match self.styles.get(span.style) {
                Some(applied) => !recognized(sheet, applied),
                None => true,
            })
            .map(|span| span.range))
    }

    /// Re-resolve the attributes of every span carrying `style.name`.
    ///
    /// Applying the same definition twice leaves the document unchanged.
    pub fn update_style(&mut self, style: &Style) -> Result<()> {
        self.ensure_ready()?;
        self.require(Capabilities::WRITE)?;

        let remap = self.styles.update(style);
        if !remap.is_empty() {
            let spans = std::mem::take(&mut self.spans);
            for span in spans {
                let style = remap.get(&span.style).copied().unwrap_or(span.style);
                push_span(&mut self.spans, span.range, style);
            }
        }
        log::debug!("updated style {:?}", style.name);
        self.touch();
        Ok(())
    }

    /// The sheet style common to the whole of `range`, if there is one.
    ///
    /// An empty range reports the style at its position.
    pub fn selection_style<'s>(
        &self,
        range: TextRange,
        sheet: &'s StyleSheet,
    ) -> Result<Option<&'s Style>> {
        self.ensure_ready()?;
        self.check_range(range)?;

        let common = if range.is_empty() {
            self.style_at(range.start)
        } else {
            let mut ids = self
                .spans
                .iter()
                .filter(|s| s.range.intersects(range))
                .map(|s| s.style);
            let first = ids.next();
            match first {
                Some(id) if ids.all(|other| other == id) => Some(id),
                _ => None,
            }
        };

        Ok(common
            .and_then(|id| self.styles.get(id))
            .and_then(|applied| {
                applied
                    .name
                    .as_deref()
                    .and_then(|name| sheet.style_named(name))
                    .or_else(|| sheet.style_for_attributes(&applied.attributes))
            }))
    }

    /// Bind a new anchor to `range`, optionally linked to `target`.
    pub fn create_anchor_for_selection(
        &mut self,
        range: TextRange,
        target: Option<&str>,
    ) -> Result<AnchorId> {
        self.ensure_ready()?;
        self.check_range(range)?;
        self.require(if target.is_some() {
            Capabilities::LINK_FROM_PART
        } else {
            Capabilities::LINK_TO_PART
        })?;
        if let Some(existing) = self
            .anchors()
            .filter_map(Anchor::range)
            .find(|r| r.crosses(range))
        {
            return Err(Error::OverlapConflict {
                existing,
                requested: range,
            });
        }

        let serial = self.allocate_serial(None)?;
        let id = self.push_anchor(serial, range);
        self.anchors[id.0 as usize].target = target.map(str::to_string);
        log::debug!("created anchor {id} (z{serial}) at {range}");
        self.touch();
        Ok(id)
    }

    /// An anchor marking `range` as a link destination.
    ///
    /// Reuses a live anchor bound to exactly this range, otherwise creates
    /// one without a target.
    pub fn reference_selected(&mut self, range: TextRange) -> Result<AnchorId> {
        self.ensure_ready()?;
        self.check_range(range)?;
        self.require(Capabilities::LINK_TO_PART)?;
        if let Some(anchor) = self.anchors().find(|a| a.range() == Some(range)) {
            return Ok(anchor.id());
        }
        self.create_anchor_for_selection(range, None)
    }

    /// The node anchor, as a destination for links to the whole document.
    pub fn reference_all(&self) -> Result<&Anchor> {
        self.ensure_ready()?;
        self.require(Capabilities::LINK_TO_NODE)?;
        Ok(&self.node_anchor)
    }

    /// Point an existing anchor at `target`.
    pub fn link_anchor(&mut self, id: AnchorId, target: &str) -> Result<()> {
        self.ensure_ready()?;
        self.require(if id == AnchorId::NODE {
            Capabilities::LINK_FROM_NODE
        } else {
            Capabilities::LINK_FROM_PART
        })?;
        let anchor = self.anchor_mut(id)?;
        if !anchor.capability_allows(Capabilities::WRITE) {
            return Err(Error::PermissionDenied {
                required: Capabilities::WRITE,
            });
        }
        anchor.link_to(target)?;
        log::debug!("linked anchor {id} to {target:?}");
        self.mark_edited();
        Ok(())
    }

    /// Set an anchor's own capability mask. An empty mask inherits the
    /// document's protection.
    pub fn set_anchor_capabilities(&mut self, id: AnchorId, capabilities: Capabilities) -> Result<()> {
        self.ensure_ready()?;
        self.require(Capabilities::WRITE)?;
        let anchor = self.anchor_mut(id)?;
        if anchor.is_detached() {
            return Err(Error::AnchorDetached(id));
        }
        anchor.set_capabilities(capabilities);
        log::debug!("anchor {id} capabilities now [{capabilities}]");
        Ok(())
    }

    /// Remove an anchor from the document.
    ///
    /// Returns the orphaned anchor; structural calls on it fail with
    /// [`Error::AnchorDetached`].
    pub fn disconnect_anchor(&mut self, id: AnchorId) -> Result<Anchor> {
        self.ensure_ready()?;
        self.require(Capabilities::WRITE)?;
        let anchor = self
            .anchors
            .get_mut(id.0 as usize)
            .ok_or(Error::UnknownAnchor(id))?;
        if anchor.detached {
            return Err(Error::AnchorDetached(id));
        }
        if !anchor.capability_allows(Capabilities::WRITE) {
            return Err(Error::PermissionDenied {
                required: Capabilities::WRITE,
            });
        }
        anchor.disconnect();
        let orphan = anchor.clone();
        log::debug!("disconnected anchor {id}");
        self.touch();
        Ok(orphan)
    }

    /// Disconnect every anchor lying fully inside `range`. Returns how many
    /// were removed.
    pub fn unlink_selection(&mut self, range: TextRange) -> Result<usize> {
        self.ensure_ready()?;
        self.check_range(range)?;
        self.require(Capabilities::WRITE)?;

        let inside: Vec<AnchorId> = self
            .anchors()
            .filter(|a| a.range().is_some_and(|r| range.contains_range(r)))
            .map(Anchor::id)
            .collect();
        for &id in &inside {
            if !self.anchors[id.0 as usize].capability_allows(Capabilities::WRITE) {
                return Err(Error::PermissionDenied {
                    required: Capabilities::WRITE,
                });
            }
        }
        for &id in &inside {
            self.anchors[id.0 as usize].disconnect();
        }
        if !inside.is_empty() {
            log::debug!("unlinked {} anchor(s) in {range}", inside.len());
            self.touch();
        }
        Ok(inside.len())
    }

    /// The innermost live anchor containing `range`.
    pub fn selected_link(&self, range: TextRange) -> Result<Option<AnchorId>> {
        self.ensure_ready()?;
        self.check_range(range)?;
        Ok(self
            .anchors()
            .filter_map(|a| a.range().map(|r| (r, a.id())))
            .filter(|(r, _)| r.contains_range(range))
            .min_by(|(a, a_id), (b, b_id)| a.len().cmp(&b.len()).then(b_id.cmp(a_id)))
            .map(|(_, id)| id))
    }

    /// Replace the text of `range` with `text` in `style`.
    ///
    /// Anchors inside the replaced range are destroyed; anchors after it
    /// shift and anchors enclosing it stretch.
    pub fn replace_selection(&mut self, range: TextRange, text: &str, style: &Style) -> Result<()> {
        self.ensure_ready()?;
        self.check_range(range)?;
        self.require(Capabilities::WRITE)?;
        self.check_writable_anchors(range)?;

        let id = self.styles.intern(AppliedStyle::from_style(style));
        self.splice(range, text, id);
        self.touch();
        Ok(())
    }

    /// Delete the text of `range`.
    pub fn delete_range(&mut self, range: TextRange) -> Result<()> {
        self.ensure_ready()?;
        self.check_range(range)?;
        self.require(Capabilities::WRITE)?;
        self.check_writable_anchors(range)?;

        self.splice(range, "", StyleId::DEFAULT);
        self.touch();
        Ok(())
    }

    /// Resolve the address anchor `id` leads to and ask `access` to load it.
    ///
    /// An anchor without a target leads back to itself inside this node.
    /// Returns the resolved address.
    pub fn follow_link(&self, id: AnchorId, access: &mut impl Access) -> Result<String> {
        self.ensure_ready()?;
        self.require(Capabilities::READ)?;
        let anchor = self.anchor(id)?;
        if anchor.is_detached() {
            return Err(Error::AnchorDetached(id));
        }
        if !anchor.capability_allows(Capabilities::READ) {
            return Err(Error::PermissionDenied {
                required: Capabilities::READ,
            });
        }

        let reference = match anchor.target() {
            Some(target) => target.to_string(),
            None if id == AnchorId::NODE => String::new(),
            None => format!("#{}", anchor.name()),
        };
        let base = self.address().unwrap_or_default();
        let address = access.resolve_address(base, &reference);
        log::debug!("following anchor {id} to {address:?} via {}", access.name());
        access.load(&address)?;
        Ok(address)
    }

    fn require(&self, required: Capabilities) -> Result<()> {
        if self.protection.contains(required) {
            Ok(())
        } else {
            Err(Error::PermissionDenied { required })
        }
    }

    fn check_range(&self, range: TextRange) -> Result<()> {
        let len = self.text.len();
        if range.start > range.end
            || range.end > len
            || !self.text.is_char_boundary(range.start)
            || !self.text.is_char_boundary(range.end)
        {
            return Err(Error::OutOfBounds {
                start: range.start,
                end: range.end,
                len,
            });
        }
        Ok(())
    }

    /// Reject edits of text covered by an anchor whose own mask forbids
    /// writing.
    fn check_writable_anchors(&self, range: TextRange) -> Result<()> {
        let locked = self.anchors().any(|a| {
            a.range().is_some_and(|r| r.intersects(range))
                && !a.capability_allows(Capabilities::WRITE)
        });
        if locked {
            return Err(Error::PermissionDenied {
                required: Capabilities::WRITE,
            });
        }
        Ok(())
    }

    fn anchor_mut(&mut self, id: AnchorId) -> Result<&mut Anchor> {
        if id == AnchorId::NODE {
            return Ok(&mut self.node_anchor);
        }
        self.anchors
            .get_mut(id.0 as usize)
            .ok_or(Error::UnknownAnchor(id))
    }

    fn clear_anchors_in(&mut self, range: TextRange) {
        for anchor in self.anchors.iter_mut().filter(|a| !a.detached) {
            if anchor.range.is_some_and(|r| range.contains_range(r)) {
                log::debug!("style clears anchor {} at {range}", anchor.id);
                anchor.disconnect();
            }
        }
    }

    /// Replace the style of every byte in `range`.
    fn restyle(&mut self, range: TextRange, style: StyleId) {
        let old = std::mem::take(&mut self.spans);
        let mut placed = false;
        for span in old {
            let r = span.range;
            if r.end <= range.start {
                push_span(&mut self.spans, r, span.style);
                continue;
            }
            if r.start < range.start {
                push_span(&mut self.spans, TextRange::new(r.start, range.start), span.style);
            }
            if !placed {
                push_span(&mut self.spans, range, style);
                placed = true;
            }
            if r.end > range.end {
                let start = r.start.max(range.end);
                push_span(&mut self.spans, TextRange::new(start, r.end), span.style);
            }
        }
        if !placed {
            push_span(&mut self.spans, range, style);
        }
    }

    /// Replace the bytes of `range` with `text` in `style`, keeping spans and
    /// anchors consistent.
    fn splice(&mut self, range: TextRange, text: &str, style: StyleId) {
        let (a, b, n) = (range.start, range.end, text.len());

        for anchor in self.anchors.iter_mut().filter(|a| !a.detached) {
            let Some(r) = anchor.range else { continue };
            let swallowed = if r.is_empty() {
                a < r.start && r.start < b
            } else {
                !range.is_empty() && range.contains_range(r)
            };
            if swallowed {
                log::debug!("anchor {} destroyed by replacing {range}", anchor.id);
                anchor.disconnect();
                continue;
            }
            let (s, e) = (shrink(r.start, a, b), shrink(r.end, a, b));
            let start = if s >= a { s + n } else { s };
            let end = if e > a || s >= a { e + n } else { e };
            anchor.range = Some(TextRange::new(start, end));
        }

        let old = std::mem::take(&mut self.spans);
        let mut placed = n == 0;
        for span in old {
            let r = span.range;
            if r.end <= a {
                push_span(&mut self.spans, r, span.style);
                continue;
            }
            if r.start < a {
                push_span(&mut self.spans, TextRange::new(r.start, a), span.style);
            }
            if !placed {
                push_span(&mut self.spans, TextRange::new(a, a + n), style);
                placed = true;
            }
            if r.end > b {
                let start = r.start.max(b) - (b - a) + n;
                let end = r.end - (b - a) + n;
                push_span(&mut self.spans, TextRange::new(start, end), span.style);
            }
        }
        if !placed {
            push_span(&mut self.spans, TextRange::new(a, a + n), style);
        }

        self.text.replace_range(a..b, text);
        log::debug!("replaced {range} with {n} byte(s)");
    }

    fn mark_edited(&mut self) {
        if matches!(self.state, DocState::Ready | DocState::Empty) {
            self.state = DocState::Editing;
        }
    }

    fn touch(&mut self) {
        self.mark_edited();
        self.rederive();
    }
}

/// Map a position through the deletion of `[a, b)`.
fn shrink(p: usize, a: usize, b: usize) -> usize {
    if p <= a {
        p
    } else if p >= b {
        p - (b - a)
    } else {
        a
    }
}

/// Append a span, merging it into the previous one when the style matches.
fn push_span(spans: &mut Vec<StyleSpan>, range: TextRange, style: StyleId) {
    if range.is_empty() {
        return;
    }
    if let Some(last) = spans.last_mut()
        && last.style == style
        && last.range.end == range.start
    {
        last.range.end = range.end;
        return;
    }
    spans.push(StyleSpan { range, style });
}

fn recognized(sheet: &StyleSheet, applied: &AppliedStyle) -> bool {
    applied
        .name
        .as_deref()
        .is_some_and(|name| sheet.style_named(name).is_some())
        || sheet.style_for_attributes(&applied.attributes).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::{ParagraphFormat, Termination};
    use proptest::prelude::*;

    /// "Title\nSee this.\n": Heading1 then Body, with an anchor on "this".
    fn sample() -> (Document, StyleSheet, AnchorId) {
        let sheet = StyleSheet::standard();
        let mut doc = Document::with_address("http://info.cern.ch/hypertext/WWW/doc1.html");
        doc.append_begin().unwrap();
        doc.append_style(sheet.style_named("Heading1").unwrap()).unwrap();
        doc.append_text("Title\n").unwrap();
        doc.append_style(sheet.style_named("Body").unwrap()).unwrap();
        doc.append_text("See ").unwrap();
        let anchor = doc.append_begin_anchor(None, Some("doc2")).unwrap();
        doc.append_text("this").unwrap();
        doc.append_end_anchor().unwrap();
        doc.append_text(".\n").unwrap();
        doc.append_end().unwrap();
        (doc, sheet, anchor)
    }

    fn assert_covered(doc: &Document) {
        let runs = doc.runs().unwrap();
        let mut pos = 0;
        for run in runs {
            assert_eq!(run.range.start, pos);
            assert!(run.range.end > run.range.start);
            pos = run.range.end;
        }
        assert_eq!(pos, doc.len());
    }

    #[derive(Default)]
    struct Recorder {
        loaded: Vec<String>,
    }

    impl Access for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        fn load(&mut self, address: &str) -> Result<()> {
            self.loaded.push(address.to_string());
            Ok(())
        }
    }

    #[test]
    fn test_apply_style_splits_runs() {
        let (mut doc, sheet, _) = sample();
        doc.apply_style(sheet.style_named("Heading2").unwrap(), TextRange::new(0, 2))
            .unwrap();
        assert_eq!(doc.state(), DocState::Editing);
        let runs = doc.runs().unwrap();
        assert_eq!(runs[0].range, TextRange::new(0, 2));
        assert_eq!(runs[1].range, TextRange::new(2, 6));
        assert_covered(&doc);
    }

    #[test]
    fn test_apply_style_respects_read_only_anchor() {
        let (mut doc, sheet, anchor) = sample();
        doc.anchors[anchor.0 as usize].set_capabilities(Capabilities::READ);
        let before = doc.dump().unwrap();

        let err = doc
            .apply_style(sheet.style_named("Heading2").unwrap(), TextRange::new(8, 12))
            .unwrap_err();
        assert!(matches!(err, Error::PermissionDenied { required } if required == Capabilities::WRITE));
        assert_eq!(doc.dump().unwrap(), before);
        assert_eq!(doc.state(), DocState::Ready);

        // Text outside the anchor is still editable.
        doc.apply_style(sheet.style_named("Heading2").unwrap(), TextRange::new(6, 9))
            .unwrap();
    }

    #[test]
    fn test_document_protection_blocks_edits() {
        let (mut doc, sheet, anchor) = sample();
        doc.set_protection(Capabilities::READ);
        let body = sheet.style_named("Body").unwrap();
        assert!(matches!(
            doc.apply_style(body, TextRange::new(0, 1)),
            Err(Error::PermissionDenied { .. })
        ));
        assert!(matches!(
            doc.create_anchor_for_selection(TextRange::new(0, 1), Some("x")),
            Err(Error::PermissionDenied { .. })
        ));
        assert!(matches!(doc.disconnect_anchor(anchor), Err(Error::PermissionDenied { .. })));
        assert!(matches!(doc.reference_all(), Err(Error::PermissionDenied { .. })));
    }

    #[test]
    fn test_clears_anchor_only_removes_contained_anchors() {
        let (mut doc, sheet, anchor) = sample();
        let heading = sheet.style_named("Heading1").unwrap();
        assert!(heading.clears_anchor);

        // Partial overlap: anchor stays.
        doc.apply_style(heading, TextRange::new(6, 12)).unwrap();
        assert!(!doc.anchor(anchor).unwrap().is_detached());

        // Full containment: anchor goes.
        doc.apply_style(heading, TextRange::new(6, 16)).unwrap();
        assert!(doc.anchor(anchor).unwrap().is_detached());
        assert!(doc.runs().unwrap().iter().all(|r| r.anchor.is_none()));
    }

    #[test]
    fn test_create_anchor_rejects_crossing() {
        let (mut doc, _, anchor) = sample();
        let err = doc
            .create_anchor_for_selection(TextRange::new(9, 12), Some("doc3"))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::OverlapConflict { existing, requested }
                if existing == TextRange::new(10, 14) && requested == TextRange::new(9, 12)
        ));

        // Nesting is allowed both ways.
        let inner = doc
            .create_anchor_for_selection(TextRange::new(11, 13), Some("doc3"))
            .unwrap();
        let outer = doc.create_anchor_for_selection(TextRange::new(6, 16), None).unwrap();
        assert_eq!(doc.anchor(inner).unwrap().serial(), 2);
        assert_eq!(doc.anchor(outer).unwrap().serial(), 3);
        assert_eq!(doc.selected_link(TextRange::new(11, 12)).unwrap(), Some(inner));
        assert_eq!(doc.selected_link(TextRange::new(10, 14)).unwrap(), Some(anchor));
        assert_eq!(doc.selected_link(TextRange::new(6, 8)).unwrap(), Some(outer));
        assert_eq!(doc.selected_link(TextRange::new(0, 2)).unwrap(), None);
        assert_covered(&doc);
    }

    #[test]
    fn test_out_of_bounds_ranges() {
        let (mut doc, _, _) = sample();
        assert!(matches!(
            doc.create_anchor_for_selection(TextRange::new(4, 99), None),
            Err(Error::OutOfBounds { len: 16, .. })
        ));
        assert!(matches!(
            doc.create_anchor_for_selection(TextRange::new(5, 4), None),
            Err(Error::OutOfBounds { .. })
        ));

        let sheet = StyleSheet::standard();
        let mut doc = Document::from_plain_text("naïve", sheet.style_named("Body").unwrap());
        assert!(matches!(
            doc.create_anchor_for_selection(TextRange::new(0, 3), None),
            Err(Error::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_serials_are_never_reused() {
        let (mut doc, _, anchor) = sample();
        doc.disconnect_anchor(anchor).unwrap();
        let next = doc.create_anchor_for_selection(TextRange::new(0, 5), None).unwrap();
        assert_eq!(doc.anchor(next).unwrap().serial(), 2);
    }

    #[test]
    fn test_disconnect_returns_orphan() {
        let (mut doc, _, anchor) = sample();
        let mut orphan = doc.disconnect_anchor(anchor).unwrap();
        assert!(orphan.is_detached());
        assert!(matches!(orphan.link_to("x"), Err(Error::AnchorDetached(_))));
        assert!(matches!(doc.disconnect_anchor(anchor), Err(Error::AnchorDetached(_))));
        assert!(matches!(doc.link_anchor(anchor, "x"), Err(Error::AnchorDetached(_))));
        assert_eq!(doc.anchors().count(), 0);
        assert_eq!(doc.runs().unwrap().len(), 2);
    }

    #[test]
    fn test_update_style_is_idempotent() {
        let (mut doc, mut sheet, _) = sample();
        let mut body = sheet.style_named("Body").unwrap().clone();
        body.font_size = 14.0;
        sheet.add_style(body.clone());

        doc.update_style(&body).unwrap();
        let once = doc.dump().unwrap();
        let id = doc.style_at(6).unwrap();
        assert_eq!(doc.style(id).unwrap().attributes.font_size, 14.0);

        doc.update_style(&body).unwrap();
        assert_eq!(doc.dump().unwrap(), once);
    }

    #[test]
    fn test_update_style_merges_spans() {
        let sheet = StyleSheet::standard();
        let body = sheet.style_named("Body").unwrap();
        let mut older = body.clone();
        older.font_size = 10.0;

        let mut doc = Document::new();
        doc.append_begin().unwrap();
        doc.append_style(body).unwrap();
        doc.append_text("one ").unwrap();
        doc.append_style(&older).unwrap();
        doc.append_text("two").unwrap();
        doc.append_end().unwrap();
        assert_eq!(doc.runs().unwrap().len(), 2);

        doc.update_style(body).unwrap();
        assert_eq!(doc.runs().unwrap().len(), 1);
    }

    #[test]
    fn test_select_unstyled_and_selection_style() {
        let (mut doc, sheet, _) = sample();
        assert_eq!(doc.select_unstyled(&sheet).unwrap(), None);

        let odd = Style::new("Odd")
            .with_tag("BLINK", Termination::EndTag)
            .with_paragraph(ParagraphFormat {
                first_indent: 99.0,
                ..Default::default()
            });
        doc.apply_style(&odd, TextRange::new(6, 9)).unwrap();
        assert_eq!(doc.select_unstyled(&sheet).unwrap(), Some(TextRange::new(6, 9)));

        let style = doc.selection_style(TextRange::new(0, 5), &sheet).unwrap();
        assert_eq!(style.map(|s| s.name.as_str()), Some("Heading1"));
        let style = doc.selection_style(TextRange::new(0, 8), &sheet).unwrap();
        assert!(style.is_none());
        let style = doc.selection_style(TextRange::point(12), &sheet).unwrap();
        assert_eq!(style.map(|s| s.name.as_str()), Some("Body"));
    }

    #[test]
    fn test_apply_to_similar() {
        let sheet = StyleSheet::standard();
        let body = sheet.style_named("Body").unwrap();
        let mut doc = Document::new();
        doc.append_begin().unwrap();
        for (style, text) in [("Body", "a\n"), ("Heading2", "b\n"), ("Body", "c\n")] {
            doc.append_style(sheet.style_named(style).unwrap()).unwrap();
            doc.append_text(text).unwrap();
        }
        doc.append_end().unwrap();

        doc.apply_to_similar(sheet.style_named("Address").unwrap(), TextRange::point(0))
            .unwrap();
        let address = doc.style_at(0).unwrap();
        assert_eq!(doc.style_at(4), Some(address));
        assert_ne!(doc.style_at(2), Some(address));
        assert!(doc.selection_style(TextRange::new(0, 2), &sheet).unwrap() != Some(body));
    }

    #[test]
    fn test_unlink_selection() {
        let (mut doc, _, anchor) = sample();
        assert_eq!(doc.unlink_selection(TextRange::new(0, 12)).unwrap(), 0);
        assert_eq!(doc.unlink_selection(TextRange::new(6, 16)).unwrap(), 1);
        assert!(doc.anchor(anchor).unwrap().is_detached());
    }

    #[test]
    fn test_replace_selection_shifts_and_destroys() {
        let (mut doc, sheet, anchor) = sample();
        let body = sheet.style_named("Body").unwrap();
        let point = doc.create_anchor_for_selection(TextRange::point(15), None).unwrap();

        // Insert before the anchor: it shifts.
        doc.replace_selection(TextRange::point(6), "Go ", body).unwrap();
        assert_eq!(doc.text(), "Title\nGo See this.\n");
        assert_eq!(doc.anchor(anchor).unwrap().range(), Some(TextRange::new(13, 17)));
        assert_eq!(doc.anchor(point).unwrap().range(), Some(TextRange::point(18)));

        // Replace inside the anchor: it stretches.
        doc.replace_selection(TextRange::new(14, 16), "HAT", body).unwrap();
        assert_eq!(doc.slice(doc.anchor(anchor).unwrap().range().unwrap()), "tHATs");

        // Replace the whole anchor: it goes.
        doc.replace_selection(TextRange::new(13, 18), "that", body).unwrap();
        assert!(doc.anchor(anchor).unwrap().is_detached());
        assert_eq!(doc.text(), "Title\nGo See that.\n");
        assert_eq!(doc.anchor(point).unwrap().range(), Some(TextRange::point(18)));
        assert_covered(&doc);
    }

    #[test]
    fn test_delete_range() {
        let (mut doc, _, anchor) = sample();
        doc.delete_range(TextRange::new(0, 6)).unwrap();
        assert_eq!(doc.text(), "See this.\n");
        assert_eq!(doc.anchor(anchor).unwrap().range(), Some(TextRange::new(4, 8)));
        assert_eq!(doc.runs().unwrap().len(), 3);
        assert_covered(&doc);
    }

    #[test]
    fn test_reference_selected_reuses_exact_anchor() {
        let (mut doc, _, anchor) = sample();
        assert_eq!(doc.reference_selected(TextRange::new(10, 14)).unwrap(), anchor);
        let fresh = doc.reference_selected(TextRange::new(0, 5)).unwrap();
        assert_ne!(fresh, anchor);
        assert_eq!(doc.anchor(fresh).unwrap().target(), None);
        assert_eq!(doc.reference_all().unwrap().serial(), 0);
    }

    #[test]
    fn test_follow_link_resolves_against_address() {
        let (mut doc, _, anchor) = sample();
        let mut access = Recorder::default();
        let address = doc.follow_link(anchor, &mut access).unwrap();
        assert_eq!(address, "http://info.cern.ch/hypertext/WWW/doc2");

        let local = doc.create_anchor_for_selection(TextRange::new(0, 5), None).unwrap();
        let address = doc.follow_link(local, &mut access).unwrap();
        assert_eq!(address, "http://info.cern.ch/hypertext/WWW/doc1.html#z2");
        assert_eq!(access.loaded.len(), 2);

        doc.anchors[anchor.0 as usize].set_capabilities(Capabilities::WRITE);
        assert!(matches!(
            doc.follow_link(anchor, &mut access),
            Err(Error::PermissionDenied { .. })
        ));
    }

    #[test]
    fn test_link_anchor_requires_anchor_write() {
        let (mut doc, _, anchor) = sample();
        doc.link_anchor(anchor, "doc3").unwrap();
        assert_eq!(doc.anchor(anchor).unwrap().target(), Some("doc3"));
        doc.anchors[anchor.0 as usize].set_capabilities(Capabilities::READ);
        assert!(matches!(
            doc.link_anchor(anchor, "doc4"),
            Err(Error::PermissionDenied { .. })
        ));
    }

    #[test]
    fn test_create_anchor_fails_when_serials_run_out() {
        let (mut doc, _, _) = sample();
        doc.reserve_anchor_numbers(u32::MAX);
        let before = doc.anchors().count();
        assert!(matches!(
            doc.create_anchor_for_selection(TextRange::new(0, 1), None),
            Err(Error::SerialsExhausted)
        ));
        assert_eq!(doc.anchors().count(), before);
        assert_eq!(doc.next_anchor_number(), u32::MAX);
    }

    #[test]
    fn test_edits_fail_while_building() {
        let sheet = StyleSheet::standard();
        let mut doc = Document::new();
        doc.append_begin().unwrap();
        doc.append_text("abc").unwrap();
        assert!(matches!(
            doc.apply_style(sheet.style_named("Body").unwrap(), TextRange::new(0, 1)),
            Err(Error::NotReady(DocState::Building))
        ));
        assert!(matches!(
            doc.create_anchor_for_selection(TextRange::new(0, 1), None),
            Err(Error::NotReady(_))
        ));
    }

    proptest! {
        #[test]
        fn prop_runs_cover_buffer_after_edits(
            ops in prop::collection::vec((0usize..16, 0usize..16, 0usize..4), 1..12)
        ) {
            let (mut doc, sheet, _) = sample();
            let names = ["Body", "Heading2", "Address", "Heading1"];
            for (a, b, which) in ops {
                let len = doc.len();
                let range = TextRange::new(a.min(b).min(len), a.max(b).min(len));
                let style = sheet.style_named(names[which]).unwrap();
                match which {
                    0 | 1 => { doc.apply_style(style, range).unwrap(); }
                    2 => { let _ = doc.create_anchor_for_selection(range, Some("x")); }
                    _ => { doc.replace_selection(range, "ab", style).unwrap(); }
                }

                let runs = doc.runs().unwrap();
                let mut pos = 0;
                for run in runs {
                    prop_assert_eq!(run.range.start, pos);
                    prop_assert!(run.range.end > pos);
                    pos = run.range.end;
                }
                prop_assert_eq!(pos, doc.len());

                let live: Vec<TextRange> = doc.anchors().filter_map(Anchor::range).collect();
                for x in &live {
                    prop_assert!(x.end <= doc.len());
                    for y in &live {
                        prop_assert!(!x.crosses(*y));
                    }
                }
            }
        }
    }
}
