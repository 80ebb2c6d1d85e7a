//! xray-history: Typed workflow history events and JSON deserialization.
//!
//! Provides the closed event type table, typed attribute structs for every
//! event kind the debugger reads, and a single `from_history_json()` entry
//! point that turns an exported history document into an ordered
//! `Vec<HistoryEvent>`.
//!
//! Both the summarizer in xray-core and the history sources in
//! xray-source depend on this crate; neither parses engine JSON itself.

pub mod deserialize;
pub mod event_type;
pub mod types;

pub use deserialize::{from_history_json, HistoryError};
pub use event_type::EventType;
pub use types::*;
