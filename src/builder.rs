//! Mutable in-memory radix tree and the commit path that writes it out.
//!
//! Every node owns its children and the edge label leading to it. Sibling
//! labels never share a first byte, so at most one child can match any key.

use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Cursor, Write};
use std::mem;
use std::path::Path;

use crate::config::BuilderConfig;
use crate::error::{Error, Result};
use crate::format::{self, Node, Trie, VERSION};

/// Compute the shared prefix length between two byte slices.
#[inline]
fn common_prefix_len(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count()
}

// =============================================================================
// Output sink
// =============================================================================

/// Destination of a committed trie.
pub trait Sink: Write {
    /// Push written bytes to stable storage. Defaults to a plain flush.
    fn sync(&mut self) -> io::Result<()> {
        self.flush()
    }
}

impl Sink for File {
    fn sync(&mut self) -> io::Result<()> {
        self.sync_all()
    }
}

impl Sink for BufWriter<File> {
    fn sync(&mut self) -> io::Result<()> {
        self.flush()?;
        self.get_ref().sync_all()
    }
}

impl Sink for Cursor<Vec<u8>> {}

// =============================================================================
// Build nodes
// =============================================================================

impl Node {
    fn root() -> Self {
        Self {
            prefix: Vec::new(),
            children: Vec::new(),
            terminal: false,
        }
    }

    fn leaf(label: &[u8]) -> Self {
        Self {
            prefix: label.to_vec(),
            children: Vec::new(),
            terminal: true,
        }
    }

    /// Split this node's edge after `at` bytes. The node keeps `prefix[..at]`
    /// and becomes the parent of a new node that takes over the rest of the
    /// label, the children and the terminal bit.
    fn split(&mut self, at: usize) {
        debug_assert!(at > 0 && at < self.prefix.len());
        let tail = Node {
            prefix: self.prefix.split_off(at),
            children: mem::take(&mut self.children),
            terminal: mem::replace(&mut self.terminal, false),
        };
        self.children.push(tail);
    }

    /// The child sharing a non-empty prefix with `key` and the shared length.
    #[inline]
    fn find_shared(&self, key: &[u8]) -> Option<(usize, usize)> {
        self.children.iter().enumerate().find_map(|(i, child)| {
            let n = common_prefix_len(&child.prefix, key);
            (n > 0).then_some((i, n))
        })
    }
}

impl Drop for Node {
    // Iterative so that long chains (one node per byte of a long key) cannot
    // overflow the stack.
    fn drop(&mut self) {
        let mut stack = mem::take(&mut self.children);
        while let Some(mut node) = stack.pop() {
            stack.append(&mut node.children);
        }
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Accumulates keys in memory and writes them as a trie file on
/// [`commit`](Builder::commit).
///
/// # Example
///
/// ```rust
/// use drt::{Builder, Reader};
///
/// let mut builder = Builder::in_memory();
/// builder.insert("cat");
/// builder.insert("car");
/// let bytes = builder.commit()?.into_inner();
///
/// let reader = Reader::from_storage(bytes)?;
/// assert!(reader.has(b"car"));
/// assert!(!reader.has(b"ca"));
/// # Ok::<(), drt::Error>(())
/// ```
pub struct Builder<W> {
    sink: W,
    root: Node,
    len: u64,
    nodes: u64,
    config: BuilderConfig,
}

impl Builder<BufWriter<File>> {
    /// Create (or truncate) the file at `path`.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        Self::create_with(path, BuilderConfig::default())
    }

    pub fn create_with(path: impl AsRef<Path>, config: BuilderConfig) -> Result<Self> {
        let file = File::create(path)?;
        let sink = BufWriter::with_capacity(config.buffer_capacity, file);
        Ok(Self::with_config(sink, config))
    }
}

impl Builder<Cursor<Vec<u8>>> {
    /// Builder that commits into a byte vector.
    pub fn in_memory() -> Self {
        let config = BuilderConfig {
            sync: false,
            ..BuilderConfig::default()
        };
        Self::with_config(Cursor::new(Vec::new()), config)
    }
}

impl<W: Sink> Builder<W> {
    pub fn new(sink: W) -> Self {
        Self::with_config(sink, BuilderConfig::default())
    }

    pub fn with_config(sink: W, config: BuilderConfig) -> Self {
        Self {
            sink,
            root: Node::root(),
            len: 0,
            nodes: 1,
            config,
        }
    }

    /// Insert a key. Inserting a key that is already present changes nothing.
    pub fn insert(&mut self, key: impl AsRef<[u8]>) {
        let mut rest = key.as_ref();
        let mut node = &mut self.root;

        loop {
            if rest.is_empty() {
                if !node.terminal {
                    node.terminal = true;
                    self.len += 1;
                }
                return;
            }

            match node.find_shared(rest) {
                // Nothing in common with any sibling.
                None => {
                    node.children.push(Node::leaf(rest));
                    self.nodes += 1;
                    self.len += 1;
                    return;
                }
                // Whole edge matches, keep descending.
                Some((i, n)) if n == node.children[i].prefix.len() => {
                    node = &mut node.children[i];
                    rest = &rest[n..];
                }
                // Key diverges (or ends) inside the edge.
                Some((i, n)) => {
                    let mid = &mut node.children[i];
                    mid.split(n);
                    self.nodes += 1;

                    let rest = &rest[n..];
                    if rest.is_empty() {
                        mid.terminal = true;
                    } else {
                        mid.children.insert(0, Node::leaf(rest));
                        self.nodes += 1;
                    }
                    self.len += 1;
                    return;
                }
            }
        }
    }

    /// Number of distinct keys inserted.
    #[inline]
    pub fn len(&self) -> u64 {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of nodes, root included.
    #[inline]
    pub fn node_count(&self) -> u64 {
        self.nodes
    }

    /// Membership test against the tree built so far.
    pub fn contains(&self, key: impl AsRef<[u8]>) -> bool {
        let mut rest = key.as_ref();
        let mut node = &self.root;
        loop {
            if rest.is_empty() {
                return node.terminal;
            }
            match node.children.iter().find(|c| rest.starts_with(&c.prefix)) {
                Some(child) => {
                    rest = &rest[child.prefix.len()..];
                    node = child;
                }
                None => return false,
            }
        }
    }

    /// Check the radix invariants over the whole tree: the root label is
    /// empty, every other label is non-empty, sibling labels never share a
    /// first byte, and every leaf ends a key.
    pub fn check_invariants(&self) -> Result<()> {
        if !self.root.prefix.is_empty() {
            return Err(Error::Invariant("root has a non-empty edge label".into()));
        }

        let mut stack = vec![&self.root];
        let mut nodes = 0u64;
        let mut keys = 0u64;
        while let Some(node) = stack.pop() {
            nodes += 1;
            keys += u64::from(node.terminal);

            let mut firsts = [false; 256];
            for child in &node.children {
                let Some(&first) = child.prefix.first() else {
                    return Err(Error::Invariant(format!(
                        "empty edge label below {:?}",
                        String::from_utf8_lossy(&node.prefix)
                    )));
                };
                if mem::replace(&mut firsts[first as usize], true) {
                    return Err(Error::Invariant(format!(
                        "sibling edges below {:?} share first byte {first:#04x}",
                        String::from_utf8_lossy(&node.prefix)
                    )));
                }
                if child.children.is_empty() && !child.terminal {
                    return Err(Error::Invariant(format!(
                        "leaf {:?} does not end a key",
                        String::from_utf8_lossy(&child.prefix)
                    )));
                }
                stack.push(child);
            }
        }

        if nodes != self.nodes || keys != self.len {
            return Err(Error::Invariant(format!(
                "counted {nodes} nodes and {keys} keys, expected {} and {}",
                self.nodes, self.len
            )));
        }
        Ok(())
    }

    /// Write the trie to the sink and hand the sink back. Dropping the
    /// returned sink closes it.
    ///
    /// The whole archive is serialized in memory and then written in one
    /// pass. On error the sink holds a partial file which must not be opened.
    pub fn commit(mut self) -> Result<W> {
        if self.config.verify {
            self.check_invariants()?;
        }

        let (keys, nodes) = (self.len, self.nodes);
        let bytes = format::encode(&Trie {
            version: VERSION,
            keys,
            nodes,
            root_node: self.root,
        })?;
        self.sink.write_all(&bytes)?;

        if self.config.sync {
            self.sink.sync()?;
        } else {
            self.sink.flush()?;
        }

        tracing::debug!(keys, nodes, bytes = bytes.len(), "trie committed");
        Ok(self.sink)
    }
}

impl<W: Sink, K: AsRef<[u8]>> Extend<K> for Builder<W> {
    fn extend<I: IntoIterator<Item = K>>(&mut self, iter: I) {
        for key in iter {
            self.insert(key);
        }
    }
}

impl<W> fmt::Debug for Builder<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Builder {{ keys: {}, nodes: {} }}", self.len, self.nodes)?;
        let mut stack = vec![(&self.root, 0usize)];
        while let Some((node, depth)) = stack.pop() {
            writeln!(
                f,
                "{:indent$}{:?}{}",
                "",
                String::from_utf8_lossy(&node.prefix),
                if node.terminal { " *" } else { "" },
                indent = depth * 2
            )?;
            stack.extend(node.children.iter().rev().map(|c| (c, depth + 1)));
        }
        Ok(())
    }
}
