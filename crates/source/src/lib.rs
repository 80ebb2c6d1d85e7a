//! xray-source: where workflow histories come from.
//!
//! Defines the [`HistorySource`] trait consumed by the CLI, the records it
//! returns, its error type, and two implementations: [`MemorySource`] for
//! tests and embedding, and [`FileSource`] over a directory of exported
//! history JSON files.

pub mod conformance;
mod error;
mod file;
mod memory;
mod record;
mod traits;

pub use error::SourceError;
pub use file::FileSource;
pub use memory::MemorySource;
pub use record::{
    ExecutionDescription, ExecutionPage, ExecutionRef, ExecutionStatus, ListFilter,
    DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT,
};
pub use traits::HistorySource;
