//! Ordered style collection with name and tag lookup.

use std::borrow::Cow;
use std::collections::HashMap;

use super::{
    FontDescriptor, ParagraphFormat, Style, TextAlign, TextAttributes, Termination,
    UNTAGGED_STYLE_NAME,
};
use crate::error::{Error, Result};

/// An ordered, named collection of [`Style`]s.
///
/// Order is lookup precedence: [`style_for_tag`](Self::style_for_tag) returns
/// the first style whose tag matches. Names are unique.
#[derive(Debug, Clone, Default)]
pub struct StyleSheet {
    name: String,
    styles: Vec<Style>,
    by_name: HashMap<String, usize>,
}

impl StyleSheet {
    /// Create an empty sheet.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// The default WWW style sheet.
    pub fn standard() -> Self {
        let serif = FontDescriptor::new("Times");
        let sans = FontDescriptor::new("Helvetica");
        let mono = FontDescriptor::new("Courier");
        let para = |before: f32, after: f32| ParagraphFormat {
            space_before: before,
            space_after: after,
            ..Default::default()
        };
        let indented = |first: f32, rest: f32| ParagraphFormat {
            first_indent: first,
            rest_indent: rest,
            ..Default::default()
        };

        let mut sheet = Self::new("standard");
        let styles = [
            Style::untagged(),
            Style::new("Body")
                .with_tag("P", Termination::EndTag)
                .with_font(serif.clone(), 12.0)
                .with_paragraph(para(0.0, 6.0)),
            Style::new("Heading1")
                .with_tag("H1", Termination::EndTag)
                .with_font(sans.clone().bold(), 18.0)
                .with_paragraph(ParagraphFormat {
                    alignment: TextAlign::Center,
                    ..para(12.0, 6.0)
                })
                .clearing_anchors(),
            Style::new("Heading2")
                .with_tag("H2", Termination::EndTag)
                .with_font(sans.clone().bold(), 16.0)
                .with_paragraph(para(10.0, 4.0)),
            Style::new("Heading3")
                .with_tag("H3", Termination::EndTag)
                .with_font(sans.clone().bold(), 14.0)
                .with_paragraph(para(8.0, 4.0)),
            Style::new("Heading4")
                .with_tag("H4", Termination::EndTag)
                .with_font(sans.clone().italic(), 12.0)
                .with_paragraph(para(6.0, 2.0)),
            Style::new("Address")
                .with_tag("ADDRESS", Termination::EndTag)
                .with_font(serif.clone().italic(), 12.0)
                .with_paragraph(ParagraphFormat {
                    alignment: TextAlign::Right,
                    ..Default::default()
                }),
            Style::new("Example")
                .with_tag("XMP", Termination::EndTag)
                .with_font(mono.clone(), 10.0)
                .with_paragraph(indented(20.0, 20.0)),
            Style::new("Listing")
                .with_tag("LISTING", Termination::EndTag)
                .with_font(mono, 9.0)
                .with_paragraph(indented(10.0, 10.0)),
            Style::new("Term")
                .with_tag("DT", Termination::None)
                .with_font(serif.clone().bold(), 12.0),
            Style::new("Definition")
                .with_tag("DD", Termination::None)
                .with_font(serif.clone(), 12.0)
                .with_paragraph(indented(30.0, 30.0)),
            Style::new("ListItem")
                .with_tag("LI", Termination::Line)
                .with_font(serif, 12.0)
                .with_paragraph(indented(10.0, 20.0)),
        ];
        for style in styles {
            sheet.push(style);
        }
        sheet
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }

    /// Styles in precedence order.
    pub fn iter(&self) -> std::slice::Iter<'_, Style> {
        self.styles.iter()
    }

    /// Exact name lookup.
    pub fn style_named(&self, name: &str) -> Option<&Style> {
        self.by_name.get(name).map(|&i| &self.styles[i])
    }

    /// First style in sheet order whose tag matches (ASCII case-insensitive).
    pub fn style_for_tag(&self, tag: &str) -> Option<&Style> {
        self.styles.iter().find(|s| s.matches_tag(tag))
    }

    /// Best style for a set of physical attributes.
    ///
    /// An exact attribute match wins. Otherwise only styles with the same
    /// paragraph format are candidates, ranked by font family, weight, style
    /// and then size distance. Returns `None` when no style shares the
    /// paragraph format.
    pub fn style_for_attributes(&self, attributes: &TextAttributes) -> Option<&Style> {
        if let Some(style) = self.styles.iter().find(|s| s.attributes() == *attributes) {
            return Some(style);
        }

        self.styles
            .iter()
            .filter(|s| s.paragraph == attributes.paragraph)
            .min_by(|a, b| {
                font_distance(a, attributes)
                    .partial_cmp(&font_distance(b, attributes))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    }

    /// Resolve the style to write for text with this style name and attributes.
    ///
    /// Looks up the style by name, then by attributes, and finally falls
    /// back to the untagged paragraph, so it always produces a style. A name
    /// that is no longer in the sheet is reported as
    /// [`Error::StyleNotFound`] alongside the fallback.
    pub fn resolve_for_write<'a>(
        &'a self,
        name: Option<&str>,
        attributes: &TextAttributes,
    ) -> (Cow<'a, Style>, Option<Error>) {
        let mut miss = None;
        if let Some(name) = name {
            match self.style_named(name) {
                Some(style) => return (Cow::Borrowed(style), None),
                None => miss = Some(Error::StyleNotFound(name.to_string())),
            }
        }
        let style = match self.style_for_attributes(attributes) {
            Some(style) => Cow::Borrowed(style),
            None => match self.style_named(UNTAGGED_STYLE_NAME) {
                Some(style) => Cow::Borrowed(style),
                None => Cow::Owned(Style::untagged()),
            },
        };
        (style, miss)
    }

    /// Add a style, or replace the style of the same name in place.
    pub fn add_style(&mut self, style: Style) {
        match self.by_name.get(&style.name) {
            Some(&i) => self.styles[i] = style,
            None => self.push(style),
        }
    }

    /// Remove a style by name.
    ///
    /// Text already carrying the style keeps its attributes; later writes
    /// resolve it through its attributes instead.
    pub fn remove_style(&mut self, name: &str) -> Result<Style> {
        let index = self
            .by_name
            .remove(name)
            .ok_or_else(|| Error::StyleNotFound(name.to_string()))?;
        let style = self.styles.remove(index);
        for i in self.by_name.values_mut() {
            if *i > index {
                *i -= 1;
            }
        }
        Ok(style)
    }

    fn push(&mut self, style: Style) {
        self.by_name.insert(style.name.clone(), self.styles.len());
        self.styles.push(style);
    }
}

/// Ranking key for nearest-font matching: mismatches in family, weight and
/// style dominate, then the size difference.
fn font_distance(style: &Style, attributes: &TextAttributes) -> f32 {
    let mut distance = (style.font_size - attributes.font_size).abs();
    if style.font.family != attributes.font.family {
        distance += 1000.0;
    }
    if style.font.weight != attributes.font.weight {
        distance += 100.0;
    }
    if style.font.style != attributes.font.style {
        distance += 100.0;
    }
    if style.color != attributes.color {
        distance += 1.0;
    }
    distance
}

/// Identity of a style for writing: sheet entries compare by name.
pub(crate) fn same_style(a: &Style, b: &Style) -> bool {
    a.name == b.name && a.tag == b.tag
}
