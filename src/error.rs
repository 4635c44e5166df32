//! Error types for block-aligned CSV store operations.

use thiserror::Error;

/// Result type alias using [`BlockCsvError`].
pub type Result<T> = std::result::Result<T, BlockCsvError>;

/// Error types returned by the lexer, lookup engine, and repadder.
#[derive(Debug, Error)]
pub enum BlockCsvError {
    /// The underlying read, write, or stat syscall failed.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The filename does not match `<name>.<k>.csv`.
    #[error("bad filename ({kind}): {path}")]
    BadFilename { path: String, kind: BadFilenameKind },

    /// The lexer hit a byte sequence it cannot recover from.
    #[error("malformed CSV at offset {offset}: {reason}")]
    MalformedCsv { offset: u64, reason: String },

    /// A CSV row, once encoded, does not fit in a single block.
    #[error("row of {row_len} bytes does not fit in a block of {block_size} bytes")]
    RowTooLarge { row_len: usize, block_size: u64 },

    /// The file is empty or the header row could not be parsed.
    #[error("no header row found")]
    NoHeader,

    /// The requested key has more columns than the header.
    #[error("key has {key_len} columns but the header only has {header_len}")]
    KeyTooWide { key_len: usize, header_len: usize },

    /// A value within the matched key prefix is not valid UTF-8.
    #[error("non-text value in key prefix at offset {offset}")]
    KeyNotText { offset: u64 },

    /// The search completed without finding a matching row.
    #[error("no rows found for the given key")]
    KeyNotFound,
}

/// The reason a filename failed to decode into a name and block size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadFilenameKind {
    /// The path has no filename component.
    NoFilename,
    /// The extension is not (case-insensitively) `csv`.
    WrongExtension,
    /// The filename does not split into exactly three dot-separated parts.
    WrongPartCount,
    /// The block-size component is not a base-10 non-negative integer.
    NotAnInteger,
}

impl std::fmt::Display for BadFilenameKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::NoFilename => "path has no filename",
            Self::WrongExtension => "extension is not .csv",
            Self::WrongPartCount => "expected <name>.<k>.csv",
            Self::NotAnInteger => "block size exponent is not an integer",
        };
        write!(f, "{text}")
    }
}
