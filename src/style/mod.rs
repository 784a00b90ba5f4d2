//! Styles and style sheets.
//!
//! A [`Style`] translates a logical markup tag into physical text
//! attributes. A [`StyleSheet`] is an ordered collection of styles used in
//! both directions: the reader maps tags to styles, the writer maps styles
//! (or bare attributes) back to tags.

mod pool;
mod properties;
mod record;
mod sheet;

pub use pool::{AppliedStyle, StyleId, StylePool};
pub use properties::{
    Color, FontDescriptor, FontStyle, FontWeight, ParagraphFormat, TextAlign, TextAttributes,
    Termination,
};
pub(crate) use sheet::same_style;
pub use sheet::StyleSheet;

/// Name of the generic untagged paragraph style.
pub const UNTAGGED_STYLE_NAME: &str = "Normal";

/// A named rule translating a markup tag into physical text formatting.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
pub struct Style {
    pub name: String,
    /// Markup tag that starts the style; `None` for untagged text.
    pub tag: Option<String>,
    pub termination: Termination,
    pub font: FontDescriptor,
    pub font_size: f32,
    pub paragraph: ParagraphFormat,
    pub color: Color,
    /// Applying this style removes anchors fully inside the affected range.
    pub clears_anchor: bool,
}

impl Style {
    /// Create a style with default attributes.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tag: None,
            termination: Termination::None,
            font: FontDescriptor::default(),
            font_size: 12.0,
            paragraph: ParagraphFormat::default(),
            color: Color::BLACK,
            clears_anchor: false,
        }
    }

    /// The generic untagged paragraph.
    pub fn untagged() -> Self {
        Self::new(UNTAGGED_STYLE_NAME)
    }

    pub fn with_tag(mut self, tag: impl Into<String>, termination: Termination) -> Self {
        self.tag = Some(tag.into());
        self.termination = termination;
        self
    }

    pub fn with_font(mut self, font: FontDescriptor, size: f32) -> Self {
        self.font = font;
        self.font_size = size;
        self
    }

    pub fn with_paragraph(mut self, paragraph: ParagraphFormat) -> Self {
        self.paragraph = paragraph;
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn clearing_anchors(mut self) -> Self {
        self.clears_anchor = true;
        self
    }

    /// Whether the style's tag matches `tag` (ASCII case-insensitive).
    pub fn matches_tag(&self, tag: &str) -> bool {
        self.tag
            .as_deref()
            .is_some_and(|t| t.eq_ignore_ascii_case(tag))
    }

    /// Physical attributes carried by text in this style.
    pub fn attributes(&self) -> TextAttributes {
        TextAttributes {
            font: self.font.clone(),
            font_size: self.font_size,
            paragraph: self.paragraph,
            color: self.color,
        }
    }
}
