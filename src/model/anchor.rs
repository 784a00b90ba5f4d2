//! Anchors: named, capability-gated link ends bound to text ranges.
//!
//! An anchor refers to its target by address only. The target document may
//! not be loaded, so there is no pointer between documents; the address is
//! resolved when the link is followed.

use std::borrow::Cow;
use std::fmt::{self, Write};
use std::ops::{BitAnd, BitOr};

use super::TextRange;
use crate::error::{Error, Result};

/// Index of an anchor in its document's anchor arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
pub struct AnchorId(pub u32);

impl AnchorId {
    /// The node anchor, which lives outside the arena.
    pub const NODE: AnchorId = AnchorId(u32::MAX);
}

impl fmt::Display for AnchorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Bit set of node and anchor capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
pub struct Capabilities(pub u8);

impl Capabilities {
    pub const NONE: Capabilities = Capabilities(0);
    pub const READ: Capabilities = Capabilities(1);
    pub const WRITE: Capabilities = Capabilities(2);
    pub const LINK_TO_NODE: Capabilities = Capabilities(4);
    pub const LINK_TO_PART: Capabilities = Capabilities(8);
    pub const LINK_FROM_NODE: Capabilities = Capabilities(16);
    pub const LINK_FROM_PART: Capabilities = Capabilities(32);
    pub const ALL: Capabilities = Capabilities(63);

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Whether every bit of `other` is set.
    pub fn contains(self, other: Capabilities) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn without(self, other: Capabilities) -> Capabilities {
        Capabilities(self.0 & !other.0)
    }
}

impl BitOr for Capabilities {
    type Output = Capabilities;

    fn bitor(self, rhs: Capabilities) -> Capabilities {
        Capabilities(self.0 | rhs.0)
    }
}

impl BitAnd for Capabilities {
    type Output = Capabilities;

    fn bitand(self, rhs: Capabilities) -> Capabilities {
        Capabilities(self.0 & rhs.0)
    }
}

impl fmt::Display for Capabilities {
    /// One letter per bit: `r` read, `w` write, `N`/`P` link to node/part,
    /// `n`/`p` link from node/part; `-` for a cleared bit.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const LETTERS: [(Capabilities, char); 6] = [
            (Capabilities::READ, 'r'),
            (Capabilities::WRITE, 'w'),
            (Capabilities::LINK_TO_NODE, 'N'),
            (Capabilities::LINK_TO_PART, 'P'),
            (Capabilities::LINK_FROM_NODE, 'n'),
            (Capabilities::LINK_FROM_PART, 'p'),
        ];
        for (bit, letter) in LETTERS {
            f.write_char(if self.contains(bit) { letter } else { '-' })?;
        }
        Ok(())
    }
}

/// A reference from a span of text (or the whole node) to a link target.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
pub struct Anchor {
    pub(crate) id: AnchorId,
    /// Serial number, unique within the owning document.
    pub(crate) serial: u32,
    /// Explicit name from markup, when it is not the generated `z<serial>`.
    pub(crate) name: Option<String>,
    /// Address of the owning document, if it has one.
    pub(crate) node: Option<String>,
    /// Target address; `None` means the anchor is only a link destination.
    pub(crate) target: Option<String>,
    /// Empty means "inherit the document's protection".
    pub(crate) capabilities: Capabilities,
    pub(crate) range: Option<TextRange>,
    pub(crate) detached: bool,
}

impl Anchor {
    pub(crate) fn new(id: AnchorId, serial: u32, range: Option<TextRange>) -> Self {
        Self {
            id,
            serial,
            name: None,
            node: None,
            target: None,
            capabilities: Capabilities::NONE,
            range,
            detached: false,
        }
    }

    pub fn id(&self) -> AnchorId {
        self.id
    }

    pub fn serial(&self) -> u32 {
        self.serial
    }

    /// Name used in markup: the explicit name, or `z<serial>`.
    pub fn name(&self) -> Cow<'_, str> {
        match &self.name {
            Some(name) => Cow::Borrowed(name),
            None => Cow::Owned(format!("z{}", self.serial)),
        }
    }

    pub fn node(&self) -> Option<&str> {
        self.node.as_deref()
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn set_capabilities(&mut self, capabilities: Capabilities) {
        self.capabilities = capabilities;
    }

    /// Bound text range; `None` for the node anchor and detached anchors.
    pub fn range(&self) -> Option<TextRange> {
        self.range
    }

    pub fn is_detached(&self) -> bool {
        self.detached
    }

    /// Whether the anchor's own mask allows `op`.
    ///
    /// An empty mask defers to the owning document and allows everything
    /// here.
    pub fn capability_allows(&self, op: Capabilities) -> bool {
        self.capabilities.is_empty() || self.capabilities.contains(op)
    }

    /// Point the anchor at `target`, replacing any previous target.
    pub fn link_to(&mut self, target: impl Into<String>) -> Result<()> {
        self.ensure_attached()?;
        self.target = Some(target.into());
        Ok(())
    }

    /// Remove the target, leaving a plain destination anchor.
    pub fn unlink(&mut self) -> Result<()> {
        self.ensure_attached()?;
        self.target = None;
        Ok(())
    }

    /// Detach from the owning document. Further structural calls fail with
    /// [`Error::AnchorDetached`].
    pub fn disconnect(&mut self) {
        self.range = None;
        self.detached = true;
    }

    fn ensure_attached(&self) -> Result<()> {
        if self.detached {
            return Err(Error::AnchorDetached(self.id));
        }
        Ok(())
    }
}
