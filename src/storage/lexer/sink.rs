//! Capability objects driven by the lexer.
//!
//! Small traits passed by reference rather than closures over shared
//! mutable state: no state lives outside the sink itself.

/// Receives completed rows from the lexer.
///
/// `accept_row` is called once per completed row, with the row's values
/// and the absolute byte offset of its terminating `LF`. Returning
/// `false` stops the lex early (e.g. once a caller has everything it
/// needs).
pub trait RowSink {
    /// Handles one completed row. Return `false` to stop lexing.
    fn accept_row(&mut self, row: &[Vec<u8>], end_offset: u64) -> bool;
}

/// Receives non-fatal recovery diagnostics from the lexer.
///
/// Injected as a dependency (rather than printed directly) so callers —
/// including tests — can observe and assert on recoverable malformations.
pub trait WarnSink {
    /// Handles one warning message.
    fn warn(&mut self, message: &str);
}

/// Default warning sink: writes `[WARNING] <text>` to standard error.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrWarnSink;

impl WarnSink for StderrWarnSink {
    fn warn(&mut self, message: &str) {
        eprintln!("[WARNING] {message}");
    }
}

/// Warning sink that discards every message.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullWarnSink;

impl WarnSink for NullWarnSink {
    fn warn(&mut self, _message: &str) {}
}

/// Warning sink that records every message, for tests that assert on
/// recoverable-malformation diagnostics.
#[derive(Debug, Default, Clone)]
pub struct VecWarnSink {
    messages: Vec<String>,
}

impl VecWarnSink {
    /// Creates an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the messages recorded so far, in emission order.
    #[must_use]
    pub fn messages(&self) -> &[String] {
        &self.messages
    }
}

impl WarnSink for VecWarnSink {
    fn warn(&mut self, message: &str) {
        self.messages.push(message.to_string());
    }
}

/// `RowSink` that collects every row it sees, never stopping early.
///
/// Used internally for the lexer's "collector mode": when a caller does
/// not supply a `RowSink`, the lexer drives a `Collector` and hands the
/// accumulated rows back in its return value.
#[derive(Debug, Default)]
pub struct Collector {
    rows: Vec<Vec<Vec<u8>>>,
}

impl Collector {
    /// Creates an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes the collector, returning the rows gathered.
    #[must_use]
    pub fn into_rows(self) -> Vec<Vec<Vec<u8>>> {
        self.rows
    }
}

impl RowSink for Collector {
    fn accept_row(&mut self, row: &[Vec<u8>], _end_offset: u64) -> bool {
        self.rows.push(row.to_vec());
        true
    }
}
