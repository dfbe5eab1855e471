//! On-disk representation of a committed trie.
//!
//! A file is one rkyv archive of a [`Trie`] record. Every child list is an
//! archived vector reached through a self-relative pointer, so the file can
//! be walked in place straight out of a memory map. rkyv places the root
//! record at the end of the buffer and serializes children before their
//! parents.
//!
//! Multi-byte fields are little-endian and unaligned, so a file is portable
//! across hosts and may sit at any address.

use std::fmt;

use rkyv::util::AlignedVec;
use rkyv::{Archive, Serialize};

use crate::error::{Error, Result};

/// Format revision recorded in every file.
pub const VERSION: u32 = 1;

// =============================================================================
// Schema
// =============================================================================

/// The file-level record. `keys` and `nodes` are the counts at commit time.
#[derive(Archive, Serialize)]
pub(crate) struct Trie {
    pub(crate) version: u32,
    pub(crate) keys: u64,
    pub(crate) nodes: u64,
    pub(crate) root_node: Node,
}

/// One radix node: the edge label leading to it, its children in insertion
/// order, and whether a key ends here.
#[derive(Archive, Serialize)]
#[rkyv(serialize_bounds(
    __S: rkyv::ser::Writer + rkyv::ser::Allocator,
    __S::Error: rkyv::rancor::Source,
))]
#[rkyv(bytecheck(bounds(
    __C: rkyv::validation::ArchiveContext,
    __C::Error: rkyv::rancor::Source,
)))]
pub(crate) struct Node {
    pub(crate) prefix: Vec<u8>,
    #[rkyv(omit_bounds)]
    pub(crate) children: Vec<Node>,
    pub(crate) terminal: bool,
}

/// Serialize a whole trie.
pub(crate) fn encode(trie: &Trie) -> Result<AlignedVec> {
    rkyv::to_bytes::<rkyv::rancor::Error>(trie).map_err(|error| Error::Encode(format!("{error}")))
}

/// Validate `bytes` as a trie archive and return its record.
///
/// Every pointer, length and flag in the file is checked, so views handed
/// out afterwards never read outside `bytes`.
pub(crate) fn access(bytes: &[u8]) -> Result<&ArchivedTrie> {
    let trie = rkyv::access::<ArchivedTrie, rkyv::rancor::Error>(bytes)
        .map_err(|error| Error::Malformed(format!("{error}")))?;
    let version = trie.version.to_native();
    if version != VERSION {
        return Err(Error::Malformed(format!(
            "unsupported format version {version}"
        )));
    }
    Ok(trie)
}

/// Locate the root node of a committed trie.
pub fn root_of(bytes: &[u8]) -> Result<NodeView<'_>> {
    access(bytes).map(|trie| NodeView::new(&trie.root_node))
}

// =============================================================================
// Node views
// =============================================================================

/// Borrowed view of one node inside a trie file.
#[derive(Clone, Copy)]
pub struct NodeView<'a> {
    node: &'a ArchivedNode,
}

impl<'a> NodeView<'a> {
    #[inline]
    pub(crate) fn new(node: &'a ArchivedNode) -> Self {
        Self { node }
    }

    /// The edge label leading to this node. Empty for the root.
    #[inline]
    pub fn prefix_bytes(&self) -> &'a [u8] {
        self.node.prefix.as_slice()
    }

    #[inline]
    pub fn child_count(&self) -> usize {
        self.node.children.len()
    }

    /// Whether a key ends at this node.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.node.terminal
    }

    /// The `i`-th child, in insertion order.
    pub fn child(&self, i: usize) -> Result<NodeView<'a>> {
        let children = self.node.children.as_slice();
        children.get(i).map(NodeView::new).ok_or_else(|| {
            Error::Malformed(format!(
                "child index {i} out of range for a node with {} children",
                children.len()
            ))
        })
    }

    pub fn children(&self) -> impl ExactSizeIterator<Item = NodeView<'a>> + 'a {
        self.node.children.as_slice().iter().map(NodeView::new)
    }

    /// The child whose whole edge label is a prefix of `key`.
    ///
    /// Sibling labels never share a first byte, so at most one child can
    /// match.
    #[inline]
    pub fn find_child(&self, key: &[u8]) -> Option<NodeView<'a>> {
        let &first = key.first()?;
        self.children().find(|child| {
            let label = child.prefix_bytes();
            label.first() == Some(&first) && key.starts_with(label)
        })
    }
}

impl fmt::Debug for NodeView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeView")
            .field("prefix", &String::from_utf8_lossy(self.prefix_bytes()))
            .field("children", &self.child_count())
            .field("terminal", &self.is_terminal())
            .finish()
    }
}
