//! Pattern matching for onion addresses.
//!
//! Patterns are regular expressions compiled once and shared read-only
//! by every worker.

mod pattern;

pub use pattern::{Pattern, PatternError};
