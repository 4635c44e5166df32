//! Block-aligned lookup engine.
//!
//! Locates all rows matching a key prefix via a bounded binary search over
//! blocks, falling back to a linear scan when the remaining window is
//! small.

use std::path::Path;

use crate::config::LexerConfig;
use crate::error::{BlockCsvError, Result};
use crate::storage::block::BlockId;
use crate::storage::filename;
use crate::storage::lexer::{lex, RowSink, WarnSink};

/// Counts rows delivered to this module's sinks. Only exists under
/// `#[cfg(test)]` so it costs nothing outside the test binary; backs the
/// unit test for the binary-search row-read bound.
#[cfg(test)]
static ROWS_READ: std::sync::atomic::AtomicU64 = std::sync::atomic::AtomicU64::new(0);

/// Returns every row in `path` whose leftmost `key.len()` columns equal
/// `key`, in file order.
///
/// # Errors
///
/// Returns [`BlockCsvError::BadFilename`] if `path`'s name does not encode
/// a block size, [`BlockCsvError::NoHeader`] if the file has no parseable
/// header, [`BlockCsvError::KeyTooWide`] if `key` has more columns than the
/// header, [`BlockCsvError::KeyNotFound`] if no row matches, and
/// [`BlockCsvError::KeyNotText`] if a matched row's key-prefix column is not
/// valid UTF-8.
pub fn find_rows<K: AsRef<str>>(
    path: &Path,
    key: &[K],
    config: &LexerConfig,
    warn_sink: &mut dyn WarnSink,
) -> Result<Vec<Vec<String>>> {
    let key: Vec<String> = key.iter().map(|k| k.as_ref().to_string()).collect();

    let parts = filename::decode(path)?;
    let block_size = parts.block_size;

    // Step 2: header row.
    let (header_row, header_end) =
        parse_one_row_at(path, 0, config, warn_sink)?.ok_or(BlockCsvError::NoHeader)?;

    // Step 3: key width sanity.
    if header_row.len() < key.len() {
        return Err(BlockCsvError::KeyTooWide {
            key_len: key.len(),
            header_len: header_row.len(),
        });
    }

    let first_data_offset = header_end + 1;

    // Step 4: first data row.
    let (first_row, first_row_end) =
        parse_one_row_at(path, first_data_offset, config, warn_sink)?
            .ok_or(BlockCsvError::KeyNotFound)?;

    // Step 5: exact match on the very first row.
    let first_key = decode_prefix(&first_row, key.len(), first_row_end)?;
    if first_key == key {
        let rows = forward_collect(path, &key, first_data_offset, None, config, warn_sink)?;
        return decode_rows(rows, key.len());
    }

    // Step 6: small files fall straight back to a linear scan.
    let file_size = std::fs::metadata(path)?.len();
    let last_block = BlockId::last(file_size, block_size);
    if last_block.0 <= 1 {
        let rows = forward_collect(path, &key, first_data_offset, None, config, warn_sink)?;
        if rows.is_empty() {
            return Err(BlockCsvError::KeyNotFound);
        }
        return decode_rows(rows, key.len());
    }

    // Step 7: probe the last block.
    let last_block_offset = last_block.offset(block_size);
    let (last_row, last_row_end) = parse_one_row_at(path, last_block_offset, config, warn_sink)?
        .ok_or(BlockCsvError::KeyNotFound)?;
    let last_key = decode_prefix(&last_row, key.len(), last_row_end)?;

    if last_key == key {
        let rows = forward_collect(path, &key, last_block_offset, None, config, warn_sink)?;
        return decode_rows(rows, key.len());
    }
    if key > last_key {
        let rows = forward_collect(path, &key, last_block_offset, None, config, warn_sink)?;
        if rows.is_empty() {
            return Err(BlockCsvError::KeyNotFound);
        }
        return decode_rows(rows, key.len());
    }

    // Step 8: binary search between block 1 and the last block.
    let mut first_block = BlockId(1);
    let mut last_block = last_block;

    loop {
        if last_block.0 - first_block.0 <= config.linear_scan_threshold {
            let window_start = first_block.offset(block_size);
            let window_end = last_block.next().offset(block_size);
            let rows = forward_collect(
                path,
                &key,
                window_start,
                Some(window_end.saturating_sub(1)),
                config,
                warn_sink,
            )?;
            if rows.is_empty() {
                return Err(BlockCsvError::KeyNotFound);
            }
            return decode_rows(rows, key.len());
        }

        let mid = BlockId((first_block.0 + last_block.0) / 2);
        let mid_offset = mid.offset(block_size);
        let (mid_row, mid_end) =
            parse_one_row_at(path, mid_offset, config, warn_sink)?.ok_or(BlockCsvError::KeyNotFound)?;
        let mid_key = decode_prefix(&mid_row, key.len(), mid_end)?;

        if mid_key == key {
            let rows = forward_collect(path, &key, mid_offset, None, config, warn_sink)?;
            return decode_rows(rows, key.len());
        } else if key > mid_key {
            first_block = mid;
        } else {
            last_block = mid;
        }
    }
}

/// Convenience wrapper using default configuration and a stderr warning sink.
///
/// # Errors
///
/// See [`find_rows`].
pub fn find_rows_default<K: AsRef<str>>(path: &Path, key: &[K]) -> Result<Vec<Vec<String>>> {
    find_rows(
        path,
        key,
        &LexerConfig::default(),
        &mut crate::storage::lexer::StderrWarnSink,
    )
}

/// Parses a single row starting at `offset`, returning its values and the
/// absolute offset of its terminator, or `None` if there is no row there.
fn parse_one_row_at(
    path: &Path,
    offset: u64,
    config: &LexerConfig,
    warn_sink: &mut dyn WarnSink,
) -> Result<Option<(Vec<Vec<u8>>, u64)>> {
    struct OneRow(Option<(Vec<Vec<u8>>, u64)>);
    impl RowSink for OneRow {
        fn accept_row(&mut self, row: &[Vec<u8>], end_offset: u64) -> bool {
            #[cfg(test)]
            ROWS_READ.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            self.0 = Some((row.to_vec(), end_offset));
            false
        }
    }

    let mut sink = OneRow(None);
    lex(path, offset, Some(1), Some(&mut sink), warn_sink, config)?;
    Ok(sink.0)
}

/// Decodes the leftmost `n` columns of `row` to text for key comparison.
fn decode_prefix(row: &[Vec<u8>], n: usize, end_offset: u64) -> Result<Vec<String>> {
    row.iter()
        .take(n)
        .map(|value| {
            std::str::from_utf8(value)
                .map(str::to_string)
                .map_err(|_| BlockCsvError::KeyNotText { offset: end_offset })
        })
        .collect()
}

/// Decodes every value of every collected row to text.
fn decode_rows(rows: Vec<Vec<Vec<u8>>>, key_len: usize) -> Result<Vec<Vec<String>>> {
    rows.into_iter()
        .map(|row| {
            row.into_iter()
                .enumerate()
                .map(|(i, value)| {
                    if i < key_len {
                        String::from_utf8(value)
                            .map_err(|_| BlockCsvError::KeyNotText { offset: 0 })
                    } else {
                        Ok(String::from_utf8_lossy(&value).into_owned())
                    }
                })
                .collect::<Result<Vec<String>>>()
        })
        .collect()
}

/// Drives the lexer from `start_offset`, collecting every row whose prefix
/// equals `key`, stopping at the first non-matching row seen *after* any
/// match. A non-matching row seen before any match does not stop the
/// scan — rows are sorted, so all matches are contiguous, but the scan
/// may start mid-padding or on a not-yet-matching neighbor. `max_offset`,
/// when given, additionally bounds how far the scan may read (used by
/// the binary search's window collapse).
fn forward_collect(
    path: &Path,
    key: &[String],
    start_offset: u64,
    max_offset: Option<u64>,
    config: &LexerConfig,
    warn_sink: &mut dyn WarnSink,
) -> Result<Vec<Vec<Vec<u8>>>> {
    struct MatchSink<'a> {
        key: &'a [String],
        max_offset: Option<u64>,
        matched_any: bool,
        rows: Vec<Vec<Vec<u8>>>,
        error: Option<BlockCsvError>,
    }

    impl RowSink for MatchSink<'_> {
        fn accept_row(&mut self, row: &[Vec<u8>], end_offset: u64) -> bool {
            #[cfg(test)]
            ROWS_READ.fetch_add(1, std::sync::atomic::Ordering::Relaxed);

            if let Some(max_offset) = self.max_offset {
                if end_offset > max_offset {
                    return false;
                }
            }

            match decode_prefix(row, self.key.len(), end_offset) {
                Ok(prefix) if prefix == self.key => {
                    self.rows.push(row.to_vec());
                    self.matched_any = true;
                    true
                }
                Ok(_) => !self.matched_any,
                Err(e) => {
                    self.error = Some(e);
                    false
                }
            }
        }
    }

    let mut sink = MatchSink {
        key,
        max_offset,
        matched_any: false,
        rows: Vec::new(),
        error: None,
    };

    lex(path, start_offset, None, Some(&mut sink), warn_sink, config)?;

    if let Some(err) = sink.error {
        return Err(err);
    }

    Ok(sink.rows)
}
