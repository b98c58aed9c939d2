//! Resource symbol tables
//!
//! Loading `R.txt` files, writing library `R.java` sources, and the task
//! that ties both to the incremental cache.

pub mod symbol;
pub mod loader;
pub mod writer;
pub mod merge;

pub use symbol::{Symbol, SymbolKind, SymbolLineError, SymbolTable};
pub use loader::{parse_symbols, SymbolLoader, SymbolParseError};
pub use writer::{SymbolWriter, WriteOutcome};
pub use merge::{MergeReport, MergeSymbolsTask, FULL_TABLE_CACHE, MERGE_SYMBOLS_CACHE};
