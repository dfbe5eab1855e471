//! Read side: membership tests against a committed trie file.

use std::fs::File;
use std::mem;
use std::path::Path;

use memmap2::{Mmap, MmapOptions};
use smallvec::SmallVec;

use crate::config::{Access, ReaderConfig};
use crate::error::{Error, Result};
use crate::format::{self, ArchivedTrie, NodeView};

mod sealed {
    pub trait Sealed {}

    impl Sealed for memmap2::Mmap {}
    impl Sealed for Vec<u8> {}
    impl Sealed for Box<[u8]> {}
    impl Sealed for &[u8] {}
}

/// Byte containers a [`Reader`] can sit on.
///
/// Sealed: every implementation hands out the same bytes for as long as it
/// lives, which lets the reader validate the archive once and trust it
/// afterwards.
pub trait Storage: AsRef<[u8]> + sealed::Sealed {}

impl Storage for Mmap {}
impl Storage for Vec<u8> {}
impl Storage for Box<[u8]> {}
impl Storage for &[u8] {}

/// A committed trie, usually backed by a read-only memory map.
///
/// The archive is validated in full when the reader is built. After that,
/// finding the root is pointer arithmetic from the end of the buffer, so
/// lookups never re-check or allocate and may run concurrently from any
/// number of threads.
pub struct Reader<S = Mmap> {
    storage: S,
    keys: u64,
    nodes: u64,
}

impl Reader<Mmap> {
    /// Open and map the trie file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, &ReaderConfig::default())
    }

    pub fn open_with(path: impl AsRef<Path>, config: &ReaderConfig) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        if len < mem::size_of::<ArchivedTrie>() as u64 {
            return Err(Error::Malformed(format!("file of {len} bytes is too short")));
        }

        let mut options = MmapOptions::new();
        if config.populate {
            options.populate();
        }
        // SAFETY: the mapping is read-only and trie files are never modified
        // after commit.
        let mmap = unsafe { options.map(&file)? };
        advise(&mmap, config.access);

        let reader = Self::from_storage(mmap)?;
        if config.verify {
            reader.verify()?;
        }

        tracing::debug!(
            path = %path.display(),
            bytes = len,
            nodes = reader.node_count(),
            keys = reader.len(),
            "trie opened"
        );
        Ok(reader)
    }
}

#[cfg(unix)]
fn advise(mmap: &Mmap, access: Access) {
    use memmap2::Advice;

    let advice = match access {
        Access::Normal => Advice::Normal,
        Access::Random => Advice::Random,
        Access::Sequential => Advice::Sequential,
    };
    // Only a hint; the mapping is usable either way.
    if let Err(err) = mmap.advise(advice) {
        tracing::warn!(?access, error = %err, "madvise failed");
    }
}

#[cfg(not(unix))]
fn advise(_mmap: &Mmap, _access: Access) {}

impl<S: Storage> Reader<S> {
    /// Wrap bytes holding a complete trie file.
    pub fn from_storage(storage: S) -> Result<Self> {
        let trie = format::access(storage.as_ref())?;
        let (keys, nodes) = (trie.keys.to_native(), trie.nodes.to_native());
        Ok(Self {
            storage,
            keys,
            nodes,
        })
    }

    /// The whole file.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        self.storage.as_ref()
    }

    #[inline]
    fn trie(&self) -> &ArchivedTrie {
        // SAFETY: `from_storage` validated these exact bytes, and sealed
        // storage never changes them while the reader is alive.
        unsafe { rkyv::access_unchecked::<ArchivedTrie>(self.as_bytes()) }
    }

    /// Number of keys in the set.
    #[inline]
    pub fn len(&self) -> u64 {
        self.keys
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keys == 0
    }

    /// Number of nodes, root included.
    #[inline]
    pub fn node_count(&self) -> u64 {
        self.nodes
    }

    /// The root node. Views borrow the reader and cannot outlive it.
    #[inline]
    pub fn root(&self) -> NodeView<'_> {
        NodeView::new(&self.trie().root_node)
    }

    /// Whether `key` is in the set.
    pub fn has(&self, key: impl AsRef<[u8]>) -> bool {
        let mut rest = key.as_ref();
        let mut node = self.root();
        loop {
            if rest.is_empty() {
                return node.is_terminal();
            }
            match node.find_child(rest) {
                Some(child) => {
                    rest = &rest[child.prefix_bytes().len()..];
                    node = child;
                }
                None => return false,
            }
        }
    }

    /// Walk every node and check it against the radix invariants and the
    /// counts recorded at commit.
    ///
    /// Opening already guarantees the file is a well-formed archive; this
    /// checks that it is a well-formed radix tree. It touches the whole file,
    /// so open with [`Access::Sequential`] when verifying large files.
    pub fn verify(&self) -> Result<()> {
        let root = self.root();
        if !root.prefix_bytes().is_empty() {
            return Err(Error::Malformed("root has a non-empty edge label".into()));
        }

        let mut nodes = 0u64;
        let mut keys = 0u64;
        let mut stack: SmallVec<[NodeView<'_>; 32]> = SmallVec::new();
        stack.push(root);
        while let Some(node) = stack.pop() {
            nodes += 1;
            keys += u64::from(node.is_terminal());

            let mut firsts = [false; 256];
            for child in node.children() {
                let Some(&first) = child.prefix_bytes().first() else {
                    return Err(Error::Malformed(format!("empty edge label below {node:?}")));
                };
                if mem::replace(&mut firsts[first as usize], true) {
                    return Err(Error::Malformed(format!(
                        "sibling edges below {node:?} share first byte {first:#04x}"
                    )));
                }
                if child.child_count() == 0 && !child.is_terminal() {
                    return Err(Error::Malformed(format!("leaf {child:?} does not end a key")));
                }
                stack.push(child);
            }
        }

        if nodes != self.nodes || keys != self.keys {
            return Err(Error::Malformed(format!(
                "counted {nodes} nodes and {keys} keys, file records {} and {}",
                self.nodes, self.keys
            )));
        }

        tracing::trace!(nodes, keys, "trie verified");
        Ok(())
    }

    /// Release the mapping.
    pub fn close(self) {
        drop(self);
    }
}
