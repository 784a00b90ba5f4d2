//! Human-readable trace of a document's runs and anchors.

use std::fmt::Write;

use super::Document;
use crate::error::Result;

impl Document {
    /// Render the runs and anchors for diagnostics.
    ///
    /// ```text
    /// document "Title" (Html, Ready) 16 bytes, next anchor z2
    /// run 0..6 style Heading1 "Title\n"
    /// run 6..10 style Body "See "
    /// run 10..14 style Body anchor z1 "this"
    /// anchor z1 10..14 -> doc2 [------]
    /// ```
    pub fn dump(&self) -> Result<String> {
        self.ensure_ready()?;
        let mut out = String::new();

        let _ = writeln!(
            out,
            "document {:?} ({:?}, {:?}) {} bytes, next anchor z{}{}",
            self.title.as_deref().unwrap_or(""),
            self.format,
            self.state,
            self.text.len(),
            self.next_anchor_number,
            if self.is_index { ", index" } else { "" },
        );
        if let Some(address) = &self.address {
            let _ = writeln!(out, "address {address}");
        }

        for run in &self.runs {
            let name = self
                .styles
                .get(run.style)
                .and_then(|s| s.name.as_deref())
                .unwrap_or("(manual)");
            let _ = write!(out, "run {} style {name}", run.range);
            if let Some(anchor) = run.anchor.and_then(|id| self.anchor(id).ok()) {
                let _ = write!(out, " anchor {}", anchor.name());
            }
            let _ = writeln!(out, " {:?}", self.slice(run.range));
        }

        for anchor in self.anchors() {
            let range = anchor.range().unwrap_or_default();
            let _ = write!(out, "anchor {} {range}", anchor.name());
            if let Some(target) = anchor.target() {
                let _ = write!(out, " -> {target}");
            }
            let _ = writeln!(out, " [{}]", anchor.capabilities());
        }

        Ok(out)
    }
}
