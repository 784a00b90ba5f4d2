//! Run derivation: one linear sweep over style spans and anchor boundaries.

use super::{Anchor, AnchorId, StyleSpan, TextRange};
use crate::style::StyleId;

/// A maximal span of text sharing one style and one innermost anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
pub struct Run {
    pub range: TextRange,
    pub style: StyleId,
    /// Innermost live anchor enclosing the run.
    pub anchor: Option<AnchorId>,
}

/// Derive the run sequence.
///
/// Anchors never cross, so a stack sorted outermost-first always has the
/// innermost enclosing anchor on top. Zero-length anchors enclose no text
/// and do not split runs.
pub(crate) fn derive_runs(spans: &[StyleSpan], anchors: &[Anchor]) -> Vec<Run> {
    let mut live: Vec<(TextRange, AnchorId)> = anchors
        .iter()
        .filter(|a| !a.detached)
        .filter_map(|a| a.range.filter(|r| !r.is_empty()).map(|r| (r, a.id)))
        .collect();
    live.sort_by(|a, b| {
        a.0.start
            .cmp(&b.0.start)
            .then(b.0.end.cmp(&a.0.end))
            .then(a.1.cmp(&b.1))
    });

    let mut runs: Vec<Run> = Vec::with_capacity(spans.len() + live.len() * 2);
    let mut stack: Vec<(TextRange, AnchorId)> = Vec::new();
    let mut next = 0;

    for span in spans {
        let mut pos = span.range.start;
        while pos < span.range.end {
            while stack.last().is_some_and(|(r, _)| r.end <= pos) {
                stack.pop();
            }
            while next < live.len() && live[next].0.start <= pos {
                if live[next].0.end > pos {
                    stack.push(live[next]);
                }
                next += 1;
            }

            let mut end = span.range.end;
            if let Some((r, _)) = stack.last() {
                end = end.min(r.end);
            }
            if let Some((r, _)) = live.get(next) {
                end = end.min(r.start);
            }

            push_run(
                &mut runs,
                TextRange::new(pos, end),
                span.style,
                stack.last().map(|(_, id)| *id),
            );
            pos = end;
        }
    }

    runs
}

fn push_run(runs: &mut Vec<Run>, range: TextRange, style: StyleId, anchor: Option<AnchorId>) {
    if let Some(last) = runs.last_mut()
        && last.style == style
        && last.anchor == anchor
        && last.range.end == range.start
    {
        last.range.end = range.end;
        return;
    }
    runs.push(Run {
        range,
        style,
        anchor,
    });
}
