//! Builder and reader configuration.

/// Configuration for a [`Builder`](crate::Builder).
#[derive(Debug, Clone)]
pub struct BuilderConfig {
    /// Capacity of the write buffer used by [`Builder::create`](crate::Builder::create).
    pub buffer_capacity: usize,
    /// Check the radix invariants over the whole tree before writing.
    pub verify: bool,
    /// Flush the sink to stable storage once the archive is written.
    pub sync: bool,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: 64 * 1024,
            verify: true,
            sync: true,
        }
    }
}

/// Access pattern advertised to the kernel for the mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Access {
    /// No advice; the kernel default read-ahead applies.
    Normal,
    /// Pointer-chasing lookups. Discourages read-ahead.
    #[default]
    Random,
    /// Whole-file scans such as [`Reader::verify`](crate::Reader::verify).
    Sequential,
}

/// Configuration for opening a [`Reader`](crate::Reader).
#[derive(Debug, Clone, Default)]
pub struct ReaderConfig {
    pub access: Access,
    /// Pre-fault the whole mapping at open time (Linux `MAP_POPULATE`).
    pub populate: bool,
    /// Also check the radix invariants of every node before returning from
    /// open. The archive itself is always validated.
    pub verify: bool,
}
