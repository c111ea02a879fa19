//! Worker pool for parallel onion address search.
//!
//! This module provides:
//! - CPU workers that generate, encode and test keypairs
//! - A coordinator that accepts the first match and shuts the others down
//! - Shared statistics and the search error taxonomy

mod cpu;
mod pool;

use std::time::Duration;

use crate::matcher::PatternError;

pub use cpu::{CpuWorker, Found, WorkerExit, WorkerReport, WorkerStats};
pub use pool::{
    format_number, search, search_with, SearchConfig, SearchResult, WorkerPool,
    DEFAULT_REPORT_INTERVAL,
};

/// Errors that end a search.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("invalid pattern: {0}")]
    InvalidPattern(#[from] PatternError),

    #[error("invalid worker count {0}: at least one worker is required")]
    InvalidWorkerCount(usize),

    #[error("all {workers} workers failed before finding a match")]
    SearchExhausted { workers: usize },

    #[error("no match found within {0} attempts")]
    AttemptBudgetExhausted(u64),

    #[error("no match found within {0:?}")]
    TimedOut(Duration),

    #[error("search stopped")]
    Stopped,

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),
}
