//! Block identification and sizing primitives.
//!
//! A block is a fixed-size byte region of a CSV file; its size is a
//! power of two decoded from the file's name (see [`crate::storage::filename`]).
//! Unlike a database page size, it is not a compile-time constant: each
//! store picks its own exponent, so [`BlockSize`] carries the value at
//! runtime.

/// Size of a block in bytes, always a power of two.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSize {
    bytes: u64,
    exponent: u32,
}

impl BlockSize {
    /// Creates a block size of `2^exponent` bytes.
    #[must_use]
    pub const fn from_exponent(exponent: u32) -> Self {
        Self {
            bytes: 1u64 << exponent,
            exponent,
        }
    }

    /// Returns the block size in bytes.
    #[must_use]
    pub const fn bytes(&self) -> u64 {
        self.bytes
    }

    /// Returns the exponent `k` such that `bytes() == 2^k`.
    #[must_use]
    pub const fn exponent(&self) -> u32 {
        self.exponent
    }
}

impl std::fmt::Display for BlockSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}B (2^{})", self.bytes, self.exponent)
    }
}

/// Identifies a block by its index within a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct BlockId(pub u64);

impl BlockId {
    /// The first block in a file.
    pub const FIRST: Self = Self(0);

    /// Returns the byte offset of this block's first byte within the file.
    #[must_use]
    pub const fn offset(&self, block_size: BlockSize) -> u64 {
        self.0 * block_size.bytes()
    }

    /// Returns the next block index.
    #[must_use]
    pub const fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the block index containing byte offset `offset`.
    #[must_use]
    pub const fn containing(offset: u64, block_size: BlockSize) -> Self {
        Self(offset / block_size.bytes())
    }

    /// Returns the index of the last block that a file of `file_size` bytes
    /// reaches into (integer division; `BlockId(0)` if the file is smaller
    /// than one block).
    #[must_use]
    pub const fn last(file_size: u64, block_size: BlockSize) -> Self {
        Self(file_size / block_size.bytes())
    }
}

impl std::fmt::Display for BlockId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Block({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_size_from_exponent() {
        let size = BlockSize::from_exponent(6);
        assert_eq!(size.bytes(), 64);
        assert_eq!(size.exponent(), 6);
    }

    #[test]
    fn block_offset() {
        let size = BlockSize::from_exponent(6);
        assert_eq!(BlockId(0).offset(size), 0);
        assert_eq!(BlockId(1).offset(size), 64);
        assert_eq!(BlockId(10).offset(size), 640);
    }

    #[test]
    fn block_next() {
        assert_eq!(BlockId(5).next(), BlockId(6));
    }

    #[test]
    fn block_containing() {
        let size = BlockSize::from_exponent(6);
        assert_eq!(BlockId::containing(0, size), BlockId(0));
        assert_eq!(BlockId::containing(63, size), BlockId(0));
        assert_eq!(BlockId::containing(64, size), BlockId(1));
        assert_eq!(BlockId::containing(130, size), BlockId(2));
    }

    #[test]
    fn last_block_for_file_size() {
        let size = BlockSize::from_exponent(6);
        assert_eq!(BlockId::last(0, size), BlockId(0));
        assert_eq!(BlockId::last(63, size), BlockId(0));
        assert_eq!(BlockId::last(64, size), BlockId(1));
        assert_eq!(BlockId::last(200, size), BlockId(3));
    }
}
