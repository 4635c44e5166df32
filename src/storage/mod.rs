//! Storage layer: block/filename decoding, the CSV lexer, the repadding
//! writer, and the block-aligned lookup engine.

pub mod block;
pub mod filename;
pub mod lexer;
pub mod lookup;
pub mod repad;

pub use block::{BlockId, BlockSize};
pub use filename::FilenameParts;
pub use lexer::{
    lex, Collector, LexOutcome, NullWarnSink, RowSink, StderrWarnSink, VecWarnSink, WarnSink,
};
pub use lookup::{find_rows, find_rows_default};
pub use repad::{encode_row, repad_file, Repadder};
