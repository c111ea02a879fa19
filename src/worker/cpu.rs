//! CPU-based search worker.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::Sender;
use log::{debug, warn};

use crate::crypto::{encode_onion_address, AddressVersion, KeyError, KeySource, Keypair};
use crate::matcher::Pattern;

/// Number of iterations between flushes of the local key counter.
const FLUSH_INTERVAL: u64 = 1024;

/// Counters updated by every worker of one search.
///
/// Key counts are flushed in batches, so `total_keys` may lag behind the
/// keys actually generated by up to one batch per running worker.
#[derive(Debug, Default)]
pub struct WorkerStats {
    pub keys_generated: AtomicU64,
    /// Candidates that passed the pattern, including ones that lost the race.
    pub matches_found: AtomicU64,
}

impl WorkerStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_keys(&self) -> u64 {
        self.keys_generated.load(Ordering::Relaxed)
    }

    pub fn total_matches(&self) -> u64 {
        self.matches_found.load(Ordering::Relaxed)
    }
}

/// Terminal state of a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    /// Found a match and published it
    Matched,
    /// Observed the stop flag
    Cancelled,
    /// Key generation failed
    Errored,
    /// The shared attempt budget was used up
    BudgetReached,
}

/// A matching candidate published by a worker.
#[derive(Debug, Clone)]
pub struct Found {
    pub address: String,
    pub keypair: Keypair,
    pub worker_id: usize,
}

/// Message sent from a worker to the coordinator. Each worker sends at most one.
#[derive(Debug)]
pub enum WorkerReport {
    Matched(Found),
    Errored { worker_id: usize, error: KeyError },
}

/// A CPU worker that generates keypairs and tests their addresses.
pub struct CpuWorker<K> {
    /// Worker ID
    id: usize,
    /// The pattern to match against
    pattern: Pattern,
    /// Address version byte
    version: AddressVersion,
    /// Keypair generator
    key_source: Arc<K>,
    /// Channel to publish the outcome
    result_tx: Sender<WorkerReport>,
    /// Shared stop flag
    stop_flag: Arc<AtomicBool>,
    /// Shared statistics
    stats: Arc<WorkerStats>,
    /// Optional shared attempt budget
    max_attempts: Option<u64>,
}

impl<K: KeySource> CpuWorker<K> {
    /// Creates a new CPU worker.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: usize,
        pattern: Pattern,
        version: AddressVersion,
        key_source: Arc<K>,
        result_tx: Sender<WorkerReport>,
        stop_flag: Arc<AtomicBool>,
        stats: Arc<WorkerStats>,
        max_attempts: Option<u64>,
    ) -> Self {
        Self {
            id,
            pattern,
            version,
            key_source,
            result_tx,
            stop_flag,
            stats,
            max_attempts,
        }
    }

    /// Runs the worker loop.
    ///
    /// Generates keypairs and tests them against the pattern until:
    /// - A match is found (published through the channel)
    /// - The stop flag is set
    /// - Key generation fails (reported through the channel)
    /// - The attempt budget is used up
    ///
    /// The stop flag is checked before every candidate, so a worker performs
    /// at most one more iteration after the flag is raised.
    pub fn run(&self) -> WorkerExit {
        let mut unflushed = 0u64;

        let exit = loop {
            if self.stop_flag.load(Ordering::Acquire) {
                break WorkerExit::Cancelled;
            }

            let keypair = match self.key_source.generate() {
                Ok(keypair) => keypair,
                Err(error) => {
                    warn!("worker {}: {}", self.id, error);
                    // Capacity covers one report per worker, so this never blocks.
                    let _ = self.result_tx.try_send(WorkerReport::Errored {
                        worker_id: self.id,
                        error,
                    });
                    break WorkerExit::Errored;
                }
            };
            unflushed += 1;

            let address = encode_onion_address(keypair.public_key(), self.version);

            if self.pattern.matches(&address) {
                self.stats.matches_found.fetch_add(1, Ordering::Relaxed);
                debug!("worker {} found {}", self.id, address);

                // Ignored if another worker already won and the coordinator hung up.
                let _ = self.result_tx.try_send(WorkerReport::Matched(Found {
                    address,
                    keypair,
                    worker_id: self.id,
                }));
                break WorkerExit::Matched;
            }

            if unflushed == FLUSH_INTERVAL {
                let total =
                    self.stats.keys_generated.fetch_add(unflushed, Ordering::Relaxed) + unflushed;
                unflushed = 0;

                if self.max_attempts.is_some_and(|max| total >= max) {
                    break WorkerExit::BudgetReached;
                }
            }
        };

        self.stats.keys_generated.fetch_add(unflushed, Ordering::Relaxed);
        exit
    }
}
