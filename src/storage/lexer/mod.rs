//! Byte-level CSV lexer.
//!
//! A state machine that streams CSV bytes starting at any byte offset,
//! tolerant of the block padding described in [`crate::storage::block`]
//! and of several malformed-but-recoverable byte sequences.

pub mod sink;

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use crate::config::LexerConfig;
use crate::error::{BlockCsvError, Result};
pub use sink::{Collector, NullWarnSink, RowSink, StderrWarnSink, VecWarnSink, WarnSink};

const CR: u8 = 0x0D;
const LF: u8 = 0x0A;
const SP: u8 = 0x20;
const QT: u8 = 0x22;
const CM: u8 = 0x2C;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    RowStart,
    PrePadding,
    InQuoted,
    FirstQuoteOrEndQuoted,
    EndPadding,
    Comma,
    InUnquoted,
    NonValueCr,
}

/// The outcome of a single lex invocation.
#[derive(Debug, Default)]
pub struct LexOutcome {
    /// Absolute offset of the last byte consumed.
    pub final_offset: u64,
    /// Rows collected. Populated only when `lex` was called without a
    /// `RowSink`, mirroring the source's callback-vs-collector modes.
    pub rows: Vec<Vec<Vec<u8>>>,
}

/// Streams CSV bytes from `path` starting at `start_offset`.
///
/// Drives `row_sink` once per completed row (or, if `row_sink` is `None`,
/// an internal collector whose rows are returned in [`LexOutcome::rows`]),
/// and `warn_sink` once per recoverable malformation. Stops when
/// `row_limit` rows have been emitted, the row sink returns `false`, or
/// end of file is reached.
///
/// # Errors
///
/// Returns [`BlockCsvError::IoError`] if the file cannot be opened, sought,
/// or read, and [`BlockCsvError::MalformedCsv`] if the byte stream hits an
/// unrecoverable sequence (an unterminated quote followed by something
/// other than `"`, a space, a comma, or `CRLF`; or a lone `CR` not followed
/// by `LF`).
pub fn lex(
    path: &Path,
    start_offset: u64,
    row_limit: Option<u64>,
    row_sink: Option<&mut dyn RowSink>,
    warn_sink: &mut dyn WarnSink,
    config: &LexerConfig,
) -> Result<LexOutcome> {
    config.validate()?;

    let use_collector = row_sink.is_none();
    let mut collector = Collector::new();
    let sink: &mut dyn RowSink = match row_sink {
        Some(sink) => sink,
        None => &mut collector,
    };

    let mut file = File::open(path)?;
    file.seek(SeekFrom::Start(start_offset))?;

    let mut state = State::RowStart;
    let mut value: Vec<u8> = Vec::new();
    let mut row: Vec<Vec<u8>> = Vec::new();
    let mut pos = start_offset;
    let mut rows_emitted: u64 = 0;
    let mut stopped = false;

    let mut chunk = vec![0u8; config.chunk_size];

    'read: loop {
        let read = file.read(&mut chunk)?;
        if read == 0 {
            break;
        }

        for &c in &chunk[..read] {
            pos += 1;
            let offset = pos - 1;

            match state {
                State::RowStart => match c {
                    LF => {
                        warn_sink.warn(&format!("unexpected bare LF at offset {offset}, expected CRLF; skipping"));
                    }
                    CR => state = State::NonValueCr,
                    SP => state = State::PrePadding,
                    QT => state = State::InQuoted,
                    CM => {
                        emit_value(&mut value, &mut row);
                        state = State::Comma;
                    }
                    _ => {
                        value.push(c);
                        state = State::InUnquoted;
                    }
                },
                State::PrePadding => match c {
                    SP => {}
                    CR => state = State::NonValueCr,
                    QT => state = State::InQuoted,
                    CM => {
                        warn_sink.warn(&format!("trailing comma at offset {offset}"));
                        emit_value(&mut value, &mut row);
                        state = State::Comma;
                    }
                    LF => {
                        warn_sink.warn(&format!("expected CRLF at offset {offset}, found bare LF"));
                        let keep_going = finish_row(&mut value, &mut row, sink, offset);
                        rows_emitted += 1;
                        if !keep_going || row_limit.is_some_and(|limit| rows_emitted >= limit) {
                            stopped = true;
                            break 'read;
                        }
                        state = State::RowStart;
                    }
                    _ => {
                        value.push(c);
                        state = State::InUnquoted;
                    }
                },
                State::InQuoted => {
                    if c == QT {
                        state = State::FirstQuoteOrEndQuoted;
                    } else {
                        value.push(c);
                    }
                }
                State::FirstQuoteOrEndQuoted => match c {
                    QT => {
                        value.push(QT);
                        state = State::InQuoted;
                    }
                    SP => state = State::EndPadding,
                    CR => state = State::NonValueCr,
                    LF => {
                        warn_sink.warn(&format!("expected CRLF at offset {offset}, found bare LF"));
                        let keep_going = finish_row(&mut value, &mut row, sink, offset);
                        rows_emitted += 1;
                        if !keep_going || row_limit.is_some_and(|limit| rows_emitted >= limit) {
                            stopped = true;
                            break 'read;
                        }
                        state = State::RowStart;
                    }
                    CM => {
                        emit_value(&mut value, &mut row);
                        state = State::Comma;
                    }
                    other => {
                        return Err(BlockCsvError::MalformedCsv {
                            offset,
                            reason: format!(
                                "expected a second '\"', a comma, a space, or CRLF after a closing quote, found byte {other:#04x}"
                            ),
                        });
                    }
                },
                State::EndPadding => match c {
                    SP => {}
                    CM => state = State::Comma,
                    CR => state = State::NonValueCr,
                    LF => {
                        warn_sink.warn(&format!("expected CRLF at offset {offset}, found bare LF"));
                        let keep_going = finish_row(&mut value, &mut row, sink, offset);
                        rows_emitted += 1;
                        if !keep_going || row_limit.is_some_and(|limit| rows_emitted >= limit) {
                            stopped = true;
                            break 'read;
                        }
                        state = State::RowStart;
                    }
                    other => {
                        return Err(BlockCsvError::MalformedCsv {
                            offset,
                            reason: format!(
                                "expected a comma, space, or CRLF after padding, found byte {other:#04x}"
                            ),
                        });
                    }
                },
                State::Comma => match c {
                    LF => {
                        warn_sink.warn(&format!("expected CRLF at offset {offset}, found bare LF"));
                        let keep_going = finish_row(&mut value, &mut row, sink, offset);
                        rows_emitted += 1;
                        if !keep_going || row_limit.is_some_and(|limit| rows_emitted >= limit) {
                            stopped = true;
                            break 'read;
                        }
                        state = State::RowStart;
                    }
                    CR => state = State::NonValueCr,
                    SP => state = State::PrePadding,
                    QT => state = State::InQuoted,
                    CM => {
                        emit_value(&mut value, &mut row);
                    }
                    _ => {
                        value.push(c);
                        state = State::InUnquoted;
                    }
                },
                State::InUnquoted => match c {
                    QT => {
                        warn_sink.warn(&format!(
                            "found '\"' inside an unquoted value at offset {offset}; assuming a quote was missed from the front of the value"
                        ));
                        state = State::FirstQuoteOrEndQuoted;
                    }
                    CM => {
                        emit_value(&mut value, &mut row);
                        state = State::Comma;
                    }
                    SP => {
                        warn_sink.warn(&format!(
                            "found ' ' inside an unquoted value at offset {offset}; assuming the quoting was forgotten"
                        ));
                        state = State::FirstQuoteOrEndQuoted;
                    }
                    _ => value.push(c),
                },
                State::NonValueCr => {
                    if c == LF {
                        let keep_going = finish_row(&mut value, &mut row, sink, offset);
                        rows_emitted += 1;
                        if !keep_going || row_limit.is_some_and(|limit| rows_emitted >= limit) {
                            stopped = true;
                            break 'read;
                        }
                        state = State::RowStart;
                    } else {
                        return Err(BlockCsvError::MalformedCsv {
                            offset,
                            reason: format!("expected CRLF at offset {offset}, found bare CR followed by byte {c:#04x}"),
                        });
                    }
                }
            }
        }
    }

    if !stopped && (!row.is_empty() || !value.is_empty()) {
        let end_offset = pos.saturating_sub(1);
        finish_row(&mut value, &mut row, sink, end_offset);
    }

    let rows = if use_collector {
        collector.into_rows()
    } else {
        Vec::new()
    };

    Ok(LexOutcome {
        final_offset: pos.saturating_sub(1),
        rows,
    })
}

fn emit_value(value: &mut Vec<u8>, row: &mut Vec<Vec<u8>>) {
    row.push(std::mem::take(value));
}

fn finish_row(
    value: &mut Vec<u8>,
    row: &mut Vec<Vec<u8>>,
    sink: &mut dyn RowSink,
    end_offset: u64,
) -> bool {
    emit_value(value, row);
    let keep_going = sink.accept_row(row.as_slice(), end_offset);
    row.clear();
    keep_going
}
