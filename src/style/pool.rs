//! Style pool for interning the styles applied to a document's text.

use std::collections::HashMap;

use super::{Style, TextAttributes};

/// Unique identifier for an applied style in a document's [`StylePool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
pub struct StyleId(pub u32);

impl StyleId {
    /// The untagged default style (always 0).
    pub const DEFAULT: StyleId = StyleId(0);
}

/// A style as it was applied to text: the style name it came from (if any)
/// and the physical attributes resolved at that time.
///
/// Runs keep these attributes even if the originating style is later removed
/// from its sheet.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
pub struct AppliedStyle {
    /// Name of the style sheet entry; `None` for manually formatted text.
    pub name: Option<String>,
    pub attributes: TextAttributes,
}

impl AppliedStyle {
    pub fn from_style(style: &Style) -> Self {
        Self {
            name: Some(style.name.clone()),
            attributes: style.attributes(),
        }
    }

    /// Manually formatted text with no style name.
    pub fn manual(attributes: TextAttributes) -> Self {
        Self {
            name: None,
            attributes,
        }
    }
}

/// Interned applied styles: identical styles share the same [`StyleId`].
#[derive(Clone)]
pub struct StylePool {
    styles: Vec<AppliedStyle>,
    intern_map: HashMap<AppliedStyle, StyleId>,
}

impl Default for StylePool {
    fn default() -> Self {
        Self::new()
    }
}

impl StylePool {
    /// Create a new pool with the untagged style at index 0.
    pub fn new() -> Self {
        let default_style = AppliedStyle::from_style(&Style::untagged());
        let mut intern_map = HashMap::new();
        intern_map.insert(default_style.clone(), StyleId::DEFAULT);

        Self {
            styles: vec![default_style],
            intern_map,
        }
    }

    /// Intern an applied style, returning its id.
    pub fn intern(&mut self, style: AppliedStyle) -> StyleId {
        if let Some(&id) = self.intern_map.get(&style) {
            return id;
        }

        let id = StyleId(self.styles.len() as u32);
        self.intern_map.insert(style.clone(), id);
        self.styles.push(style);
        id
    }

    /// Get a style by id.
    pub fn get(&self, id: StyleId) -> Option<&AppliedStyle> {
        self.styles.get(id.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    /// Always false: the default style is always present.
    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (StyleId, &AppliedStyle)> {
        self.styles
            .iter()
            .enumerate()
            .map(|(i, s)| (StyleId(i as u32), s))
    }

    /// Re-resolve every entry named `style.name` to the style's current
    /// attributes.
    ///
    /// Returns a remapping for ids whose entry became identical to an earlier
    /// one, so callers can merge their references. Updated entries keep
    /// their id.
    pub(crate) fn update(&mut self, style: &Style) -> HashMap<StyleId, StyleId> {
        let attributes = style.attributes();
        for entry in &mut self.styles {
            if entry.name.as_deref() == Some(style.name.as_str()) {
                entry.attributes = attributes.clone();
            }
        }

        self.intern_map.clear();
        let mut remap = HashMap::new();
        for (i, entry) in self.styles.iter().enumerate() {
            let id = StyleId(i as u32);
            match self.intern_map.get(entry) {
                Some(&first) => {
                    remap.insert(id, first);
                }
                None => {
                    self.intern_map.insert(entry.clone(), id);
                }
            }
        }
        remap
    }
}

impl std::fmt::Debug for StylePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StylePool")
            .field("count", &self.styles.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::{FontDescriptor, Termination};

    fn heading() -> Style {
        Style::new("Heading1")
            .with_tag("H1", Termination::EndTag)
            .with_font(FontDescriptor::new("Helvetica").bold(), 18.0)
    }

    #[test]
    fn test_style_pool_interning() {
        let mut pool = StylePool::new();

        let id1 = pool.intern(AppliedStyle::from_style(&heading()));
        let id2 = pool.intern(AppliedStyle::from_style(&heading()));

        assert_eq!(id1, id2);
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.get(StyleId::DEFAULT).unwrap().name.as_deref(), Some("Normal"));
    }

    #[test]
    fn test_update_merges_identical_entries() {
        let mut pool = StylePool::new();
        let first = pool.intern(AppliedStyle::from_style(&heading()));
        let mut older = heading();
        older.font_size = 14.0;
        let second = pool.intern(AppliedStyle::from_style(&older));
        let manual = pool.intern(AppliedStyle::manual(heading().attributes()));
        assert_ne!(first, second);

        let mut changed = heading();
        changed.font_size = 24.0;
        let remap = pool.update(&changed);

        assert_eq!(remap.get(&second), Some(&first));
        assert_eq!(pool.get(first).unwrap().attributes.font_size, 24.0);
        assert_eq!(pool.get(manual).unwrap().attributes.font_size, 18.0);

        // Updating again changes nothing.
        let remap = pool.update(&changed);
        assert_eq!(remap.get(&second), Some(&first));
        assert_eq!(pool.get(first).unwrap().attributes.font_size, 24.0);
    }
}
