//! Physical text attribute types and the `enum_keyword!` macro.
//!
//! These are the values a style record stores: fonts, paragraph metrics,
//! colors and the termination mode of its markup tag.

use std::fmt;
use std::hash::{Hash, Hasher};

/// Macro for defining keyword enums that map one-to-one onto record values.
///
/// # Example
///
/// ```ignore
/// enum_keyword! {
///     /// Font style (normal, italic).
///     pub enum FontStyle {
///         #[default]
///         Normal => "normal",
///         Italic => "italic",
///     }
/// }
/// ```
macro_rules! enum_keyword {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident => $keyword:literal
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        #[cfg_attr(feature = "cli", derive(serde::Serialize))]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant,
            )*
        }

        impl $name {
            /// Returns the record keyword for this value.
            #[inline]
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $keyword,)*
                }
            }

            /// Parse a record keyword (ASCII case-insensitive).
            #[inline]
            pub fn from_keyword(s: &str) -> Option<Self> {
                $(
                    if s.eq_ignore_ascii_case($keyword) {
                        return Some($name::$variant);
                    }
                )*
                None
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

enum_keyword! {
    /// How long a style's markup tag stays in effect while reading.
    pub enum Termination {
        /// Holds until another tag overrides it.
        #[default]
        None => "none",
        /// Holds until the matching end tag.
        EndTag => "endtag",
        /// Holds until the end of the current line.
        Line => "line",
    }
}

enum_keyword! {
    /// Font style (normal, italic).
    pub enum FontStyle {
        #[default]
        Normal => "normal",
        Italic => "italic",
    }
}

enum_keyword! {
    /// Paragraph alignment.
    pub enum TextAlign {
        #[default]
        Left => "left",
        Right => "right",
        Center => "center",
        Justify => "justify",
    }
}

/// Font weight (100-900, with named constants).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
pub struct FontWeight(pub u16);

impl FontWeight {
    pub const NORMAL: FontWeight = FontWeight(400);
    pub const BOLD: FontWeight = FontWeight(700);

    pub fn from_keyword(s: &str) -> Option<Self> {
        if s.eq_ignore_ascii_case("normal") {
            Some(Self::NORMAL)
        } else if s.eq_ignore_ascii_case("bold") {
            Some(Self::BOLD)
        } else {
            s.parse::<u16>()
                .ok()
                .filter(|w| (100..=900).contains(w))
                .map(FontWeight)
        }
    }
}

impl Default for FontWeight {
    fn default() -> Self {
        Self::NORMAL
    }
}

impl fmt::Display for FontWeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            400 => f.write_str("normal"),
            700 => f.write_str("bold"),
            w => write!(f, "{w}"),
        }
    }
}

/// RGBA color (8 bits per channel).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color {
        r: 0,
        g: 0,
        b: 0,
        a: 255,
    };

    /// Create a new opaque color.
    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Parse `#rrggbb` or `#rrggbbaa`.
    pub fn from_hex(s: &str) -> Option<Self> {
        let hex = s.strip_prefix('#')?;
        if !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        match hex.len() {
            6 => Some(Self::rgb(channel(0)?, channel(2)?, channel(4)?)),
            8 => Some(Self {
                r: channel(0)?,
                g: channel(2)?,
                b: channel(4)?,
                a: channel(6)?,
            }),
            _ => None,
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a == 255 {
            write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            write!(
                f,
                "#{:02x}{:02x}{:02x}{:02x}",
                self.r, self.g, self.b, self.a
            )
        }
    }
}

/// A font: family name plus weight and style.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
pub struct FontDescriptor {
    pub family: String,
    pub weight: FontWeight,
    pub style: FontStyle,
}

impl FontDescriptor {
    pub fn new(family: impl Into<String>) -> Self {
        Self {
            family: family.into(),
            weight: FontWeight::NORMAL,
            style: FontStyle::Normal,
        }
    }

    pub fn bold(mut self) -> Self {
        self.weight = FontWeight::BOLD;
        self
    }

    pub fn italic(mut self) -> Self {
        self.style = FontStyle::Italic;
        self
    }
}

impl Default for FontDescriptor {
    fn default() -> Self {
        Self::new("Times")
    }
}

/// Paragraph formatting, in points.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
pub struct ParagraphFormat {
    pub first_indent: f32,
    pub rest_indent: f32,
    pub space_before: f32,
    pub space_after: f32,
    pub alignment: TextAlign,
}

impl Eq for ParagraphFormat {}

impl Hash for ParagraphFormat {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.first_indent.to_bits().hash(state);
        self.rest_indent.to_bits().hash(state);
        self.space_before.to_bits().hash(state);
        self.space_after.to_bits().hash(state);
        self.alignment.hash(state);
    }
}

/// The physical attributes a run of text carries.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
pub struct TextAttributes {
    pub font: FontDescriptor,
    pub font_size: f32,
    pub paragraph: ParagraphFormat,
    pub color: Color,
}

impl Eq for TextAttributes {}

impl Hash for TextAttributes {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.font.hash(state);
        self.font_size.to_bits().hash(state);
        self.paragraph.hash(state);
        self.color.hash(state);
    }
}
