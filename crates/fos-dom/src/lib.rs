//! fOS DOM - Document Object Model
//!
//! Memory-efficient, arena-allocated DOM tree with CSS selector queries
//! and HTML serialization.

mod node;
mod tree;
mod document;
mod element;
mod selector;
mod serialize;

pub use node::{Attribute, ElementData, Node, NodeData};
pub use tree::{Children, DomTree};
pub use document::Document;
pub use element::ElementQuery;
pub use selector::{AttributeMatcher, AttributeSelector, Combinator, CompoundSelector, Selector, SelectorComponent, SelectorError};

/// Node identifier (index into arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Root node ID
    pub const ROOT: NodeId = NodeId(0);

    /// Sentinel for "no node"
    pub const NONE: NodeId = NodeId(u32::MAX);

    /// Whether this id refers to a node slot
    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::NONE
    }

    /// Raw arena index
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::NONE
    }
}
