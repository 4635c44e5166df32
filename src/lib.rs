//! blockcsv - a read-optimized, append-friendly CSV store.
//!
//! Data files are plain CSV with one twist: every data row begins exactly
//! two bytes past a block boundary. That invariant turns key lookup from a
//! linear scan into a binary search over blocks, without any side index.
//!
//! The store has four moving parts, each its own module under [`storage`]:
//!
//! - [`storage::lexer`] — a byte-level CSV state machine shared by every
//!   other component.
//! - [`storage::filename`] and [`storage::block`] — decoding a data file's
//!   name into a block size, and block/offset arithmetic.
//! - [`storage::repad`] — rewrites an arbitrary CSV into the block-aligned
//!   form the lookup engine requires.
//! - [`storage::lookup`] — binary-searches a block-aligned file for rows
//!   matching a key prefix.

pub mod config;
pub mod error;
pub mod storage;

pub use config::LexerConfig;
pub use error::{BlockCsvError, Result};
pub use storage::{find_rows, find_rows_default, repad_file, BlockId, BlockSize, FilenameParts};
