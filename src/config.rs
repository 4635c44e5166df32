//! Tunables for the lexer and lookup engine.
//!
//! A `Default` plus `with_*` builder setters, validated before use.

use serde::{Deserialize, Serialize};

use crate::error::{BlockCsvError, Result};

/// Minimum chunk size the lexer will read at a time.
pub const MIN_CHUNK_SIZE: usize = 4096;

/// Default number of blocks below which the lookup engine falls back
/// from binary search to a linear scan over the whole window.
///
/// A window of one block or less cannot be split further, so `1` is the
/// cutover the binary search itself requires; raising it trades search
/// steps for a longer final scan.
pub const DEFAULT_LINEAR_SCAN_THRESHOLD: u64 = 1;

/// Configuration shared by the lexer and the lookup engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LexerConfig {
    /// Minimum number of bytes read per chunk while scanning forward.
    pub chunk_size: usize,

    /// When the binary search window (in blocks) shrinks to at most this
    /// many blocks, switch to a linear scan over the whole window.
    pub linear_scan_threshold: u64,
}

impl Default for LexerConfig {
    fn default() -> Self {
        Self {
            chunk_size: MIN_CHUNK_SIZE,
            linear_scan_threshold: DEFAULT_LINEAR_SCAN_THRESHOLD,
        }
    }
}

impl LexerConfig {
    /// Creates a new config with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the minimum read-chunk size.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Sets the binary-search-to-linear-scan cutover threshold.
    #[must_use]
    pub fn with_linear_scan_threshold(mut self, threshold: u64) -> Self {
        self.linear_scan_threshold = threshold;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if `chunk_size` is below [`MIN_CHUNK_SIZE`], or if
    /// `linear_scan_threshold` is `0` (the binary search's window never
    /// shrinks below a two-block span, so a `0` cutover never collapses).
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size < MIN_CHUNK_SIZE {
            return Err(BlockCsvError::MalformedCsv {
                offset: 0,
                reason: format!(
                    "chunk_size must be at least {MIN_CHUNK_SIZE} bytes, got {}",
                    self.chunk_size
                ),
            });
        }
        if self.linear_scan_threshold == 0 {
            return Err(BlockCsvError::MalformedCsv {
                offset: 0,
                reason: "linear_scan_threshold must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}
