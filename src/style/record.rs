//! Style definition stream: one `[name]` record of `key = value` lines per
//! style.
//!
//! ```text
//! sheet = standard
//!
//! [Heading1]
//! tag = H1
//! termination = endtag
//! font = Helvetica
//! weight = bold
//! size = 18
//! space-before = 12
//! align = center
//! clears-anchor = true
//! ```
//!
//! Keys that are absent keep the [`Style::new`] defaults. A malformed
//! record is skipped with a diagnostic; the rest of the stream still loads.

use std::fmt::Write;

use super::{Color, FontStyle, FontWeight, Style, StyleSheet, TextAlign, Termination};
use crate::diagnostic::{Diagnostic, Diagnostics, W_STYLE_RECORD};

impl StyleSheet {
    /// Read a style sheet from a style definition stream.
    pub fn read(input: &str) -> (StyleSheet, Vec<Diagnostic>) {
        let mut sheet = StyleSheet::new("");
        let mut diagnostics = Diagnostics::new();
        let mut current: Option<PendingRecord> = None;
        let mut offset = 0;

        for raw_line in input.split_inclusive('\n') {
            let line_offset = offset;
            offset += raw_line.len();
            let line = raw_line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some(header) = line.strip_prefix('[') {
                if let Some(record) = current.take() {
                    record.finish(&mut sheet, &mut diagnostics);
                }
                match header.strip_suffix(']').map(str::trim) {
                    Some(name) if !name.is_empty() => {
                        current = Some(PendingRecord::new(name, line_offset));
                    }
                    _ => {
                        diagnostics.push(
                            line_offset,
                            W_STYLE_RECORD,
                            format!("malformed record header {line:?}"),
                        );
                        current = Some(PendingRecord::broken(line_offset));
                    }
                }
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                diagnostics.push(
                    line_offset,
                    W_STYLE_RECORD,
                    format!("expected `key = value`, found {line:?}"),
                );
                if let Some(record) = current.as_mut() {
                    record.malformed = true;
                }
                continue;
            };
            let (key, value) = (key.trim(), value.trim());

            match current.as_mut() {
                Some(record) => {
                    if let Err(message) = record.set(key, value) {
                        diagnostics.push(line_offset, W_STYLE_RECORD, message);
                        record.malformed = true;
                    }
                }
                None if key == "sheet" => sheet.set_name(value),
                None => diagnostics.push(
                    line_offset,
                    W_STYLE_RECORD,
                    format!("`{key}` outside of any style record"),
                ),
            }
        }

        if let Some(record) = current.take() {
            record.finish(&mut sheet, &mut diagnostics);
        }

        (sheet, diagnostics.into_vec())
    }

    /// Write the sheet as a style definition stream.
    pub fn write(&self) -> String {
        let mut out = String::new();
        if !self.name().is_empty() {
            writeln!(out, "sheet = {}", self.name()).unwrap();
        }
        for style in self.iter() {
            out.push('\n');
            write_record(&mut out, style);
        }
        out
    }
}

fn write_record(out: &mut String, style: &Style) {
    writeln!(out, "[{}]", style.name).unwrap();
    if let Some(tag) = &style.tag {
        writeln!(out, "tag = {tag}").unwrap();
    }
    writeln!(out, "termination = {}", style.termination).unwrap();
    writeln!(out, "font = {}", style.font.family).unwrap();
    writeln!(out, "weight = {}", style.font.weight).unwrap();
    writeln!(out, "style = {}", style.font.style).unwrap();
    writeln!(out, "size = {}", style.font_size).unwrap();
    let p = &style.paragraph;
    writeln!(out, "first-indent = {}", p.first_indent).unwrap();
    writeln!(out, "rest-indent = {}", p.rest_indent).unwrap();
    writeln!(out, "space-before = {}", p.space_before).unwrap();
    writeln!(out, "space-after = {}", p.space_after).unwrap();
    writeln!(out, "align = {}", p.alignment).unwrap();
    writeln!(out, "color = {}", style.color).unwrap();
    writeln!(out, "clears-anchor = {}", style.clears_anchor).unwrap();
}

/// A record being read; committed to the sheet when the next header or the
/// end of input is reached.
struct PendingRecord {
    style: Style,
    offset: usize,
    malformed: bool,
}

impl PendingRecord {
    fn new(name: &str, offset: usize) -> Self {
        Self {
            style: Style::new(name),
            offset,
            malformed: false,
        }
    }

    fn broken(offset: usize) -> Self {
        Self {
            style: Style::new(""),
            offset,
            malformed: true,
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), String> {
        let style = &mut self.style;
        match key {
            "tag" => style.tag = (!value.is_empty()).then(|| value.to_string()),
            "termination" => style.termination = keyword(key, value, Termination::from_keyword)?,
            "font" => style.font.family = value.to_string(),
            "weight" => style.font.weight = keyword(key, value, FontWeight::from_keyword)?,
            "style" => style.font.style = keyword(key, value, FontStyle::from_keyword)?,
            "size" => style.font_size = number(key, value)?,
            "first-indent" => style.paragraph.first_indent = number(key, value)?,
            "rest-indent" => style.paragraph.rest_indent = number(key, value)?,
            "space-before" => style.paragraph.space_before = number(key, value)?,
            "space-after" => style.paragraph.space_after = number(key, value)?,
            "align" => style.paragraph.alignment = keyword(key, value, TextAlign::from_keyword)?,
            "color" => style.color = keyword(key, value, Color::from_hex)?,
            "clears-anchor" => {
                style.clears_anchor = value
                    .parse::<bool>()
                    .map_err(|_| format!("invalid clears-anchor value {value:?}"))?
            }
            _ => return Err(format!("unknown key `{key}`")),
        }
        Ok(())
    }

    fn finish(self, sheet: &mut StyleSheet, diagnostics: &mut Diagnostics) {
        if self.malformed {
            diagnostics.push(
                self.offset,
                W_STYLE_RECORD,
                format!("skipping malformed style record {:?}", self.style.name),
            );
            return;
        }
        if sheet.style_named(&self.style.name).is_some() {
            diagnostics.push(
                self.offset,
                W_STYLE_RECORD,
                format!("duplicate style {:?} skipped", self.style.name),
            );
            return;
        }
        sheet.add_style(self.style);
    }
}

fn keyword<T>(key: &str, value: &str, parse: impl Fn(&str) -> Option<T>) -> Result<T, String> {
    parse(value).ok_or_else(|| format!("invalid {key} value {value:?}"))
}

fn number(key: &str, value: &str) -> Result<f32, String> {
    value
        .parse::<f32>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
        .ok_or_else(|| format!("invalid {key} value {value:?}"))
}
