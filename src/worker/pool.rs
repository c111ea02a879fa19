//! Worker pool management and the first-match coordinator.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};
use log::{debug, info, warn};

use crate::crypto::{AddressVersion, KeySource, Keypair, OsKeySource};
use crate::matcher::Pattern;

use super::cpu::{CpuWorker, Found, WorkerExit, WorkerReport, WorkerStats};
use super::SearchError;

/// Default period between progress reports.
pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_secs(5);

const MIN_REPORT_INTERVAL: Duration = Duration::from_millis(10);

/// Immutable parameters of one search.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    pattern: Pattern,
    workers: usize,
    version: AddressVersion,
    max_attempts: Option<u64>,
    timeout: Option<Duration>,
    report_interval: Duration,
}

impl SearchConfig {
    /// Creates a configuration, rejecting a worker count of zero.
    pub fn new(pattern: Pattern, workers: usize) -> Result<Self, SearchError> {
        if workers == 0 {
            return Err(SearchError::InvalidWorkerCount(workers));
        }

        Ok(Self {
            pattern,
            workers,
            version: AddressVersion::V3,
            max_attempts: None,
            timeout: None,
            report_interval: DEFAULT_REPORT_INTERVAL,
        })
    }

    /// Compiles `pattern` and creates a configuration.
    pub fn from_regex(pattern: &str, workers: usize) -> Result<Self, SearchError> {
        Self::new(Pattern::new(pattern)?, workers)
    }

    pub fn with_version(mut self, version: AddressVersion) -> Self {
        self.version = version;
        self
    }

    /// Gives up after roughly `max_attempts` keys. Workers account in batches,
    /// so the search may overshoot by up to one batch per worker.
    pub fn with_max_attempts(mut self, max_attempts: u64) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_report_interval(mut self, interval: Duration) -> Self {
        self.report_interval = interval.max(MIN_REPORT_INTERVAL);
        self
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn version(&self) -> AddressVersion {
        self.version
    }

    pub fn max_attempts(&self) -> Option<u64> {
        self.max_attempts
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn report_interval(&self) -> Duration {
        self.report_interval
    }
}

/// The winning address of a search.
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// The matching onion address
    pub address: String,
    /// The keypair the address was derived from
    pub keypair: Keypair,
    /// The ID of the worker that found this result
    pub worker_id: usize,
    /// Keys generated by all workers
    pub keys_tried: u64,
    /// Wall-clock duration of the search
    pub elapsed: Duration,
}

impl SearchResult {
    /// Private key as hex of `seed || public key`.
    pub fn private_key_hex(&self) -> String {
        self.keypair.private_key_hex()
    }

    /// Average generation rate (keys per second).
    pub fn keys_per_second(&self) -> f64 {
        let elapsed = self.elapsed.as_secs_f64();
        if elapsed > 0.0 {
            self.keys_tried as f64 / elapsed
        } else {
            0.0
        }
    }
}

/// Spawns the workers of one search and returns the first match.
pub struct WorkerPool<K: KeySource + 'static = OsKeySource> {
    /// Search parameters
    config: SearchConfig,
    /// Keypair generator shared by the workers
    key_source: Arc<K>,
    /// Worker thread handles
    handles: Vec<JoinHandle<WorkerExit>>,
    /// Shared stop flag
    stop_flag: Arc<AtomicBool>,
    /// Shared statistics
    stats: Arc<WorkerStats>,
}

impl WorkerPool<OsKeySource> {
    /// Creates a pool that draws keys from the OS CSPRNG.
    pub fn new(config: SearchConfig) -> Self {
        Self::with_key_source(config, OsKeySource)
    }
}

impl<K: KeySource + 'static> WorkerPool<K> {
    /// Creates a pool with a custom keypair generator.
    pub fn with_key_source(config: SearchConfig, key_source: K) -> Self {
        Self {
            config,
            key_source: Arc::new(key_source),
            handles: Vec::new(),
            stop_flag: Arc::new(AtomicBool::new(false)),
            stats: Arc::new(WorkerStats::new()),
        }
    }

    /// Uses an externally owned stop flag, e.g. one shared with a signal handler.
    pub fn with_stop_flag(mut self, stop_flag: Arc<AtomicBool>) -> Self {
        self.stop_flag = stop_flag;
        self
    }

    /// Runs the search, blocking until a match is found or the search fails.
    ///
    /// Every worker has terminated by the time this returns.
    pub fn run(mut self) -> Result<SearchResult, SearchError> {
        let workers = self.config.workers();
        let pattern = self.config.pattern();

        if pattern.is_trivial(self.config.version()) {
            warn!(
                "pattern {:?} does not constrain the address, the first key will match",
                pattern.as_str()
            );
        }
        info!("searching for {:?} with {} workers", pattern.as_str(), workers);

        let start = Instant::now();
        let result_rx = self.spawn_workers()?;
        let outcome = self.wait_for_winner(&result_rx, start);
        self.shutdown();

        let found = outcome?;
        let result = SearchResult {
            address: found.address,
            keypair: found.keypair,
            worker_id: found.worker_id,
            keys_tried: self.stats.total_keys(),
            elapsed: start.elapsed(),
        };
        info!(
            "worker {} found {} after {} keys",
            result.worker_id, result.address, result.keys_tried
        );

        Ok(result)
    }

    /// Spawns worker threads. The report channel holds one message per
    /// worker so that publishing never blocks.
    fn spawn_workers(&mut self) -> Result<Receiver<WorkerReport>, SearchError> {
        let workers = self.config.workers();
        let (result_tx, result_rx) = bounded(workers);

        for id in 0..workers {
            let worker = CpuWorker::new(
                id,
                self.config.pattern().clone(),
                self.config.version(),
                self.key_source.clone(),
                result_tx.clone(),
                self.stop_flag.clone(),
                self.stats.clone(),
                self.config.max_attempts(),
            );

            let spawned = thread::Builder::new()
                .name(format!("onion-vanity-worker-{}", id))
                .spawn(move || worker.run());

            match spawned {
                Ok(handle) => self.handles.push(handle),
                Err(e) => {
                    self.shutdown();
                    return Err(SearchError::Spawn(e));
                }
            }
        }

        Ok(result_rx)
    }

    /// Blocks until a worker publishes a match or the search cannot succeed.
    fn wait_for_winner(
        &self,
        result_rx: &Receiver<WorkerReport>,
        start: Instant,
    ) -> Result<Found, SearchError> {
        let workers = self.config.workers();
        let interval = self.config.report_interval();
        let mut errored = 0;
        let mut last_report = Instant::now();

        loop {
            let wait = match self.config.timeout() {
                Some(timeout) => timeout.saturating_sub(start.elapsed()).min(interval),
                None => interval,
            };

            match result_rx.recv_timeout(wait) {
                Ok(WorkerReport::Matched(found)) => return Ok(found),
                Ok(WorkerReport::Errored { worker_id, error }) => {
                    errored += 1;
                    debug!(
                        "worker {} gave up ({}/{} failed): {}",
                        worker_id, errored, workers, error
                    );
                    if errored == workers {
                        return Err(SearchError::SearchExhausted { workers });
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => return Err(self.exit_reason(workers)),
            }

            if self.is_stopped() {
                return Err(SearchError::Stopped);
            }
            if let Some(timeout) = self.config.timeout() {
                if start.elapsed() >= timeout {
                    return take_pending_match(result_rx).ok_or(SearchError::TimedOut(timeout));
                }
            }
            if let Some(max) = self.config.max_attempts() {
                if self.stats.total_keys() >= max {
                    return take_pending_match(result_rx)
                        .ok_or(SearchError::AttemptBudgetExhausted(max));
                }
            }
            if last_report.elapsed() >= interval {
                self.log_progress(start);
                last_report = Instant::now();
            }
        }
    }

    /// Explains why every worker exited without publishing a match.
    fn exit_reason(&self, workers: usize) -> SearchError {
        if self.is_stopped() {
            return SearchError::Stopped;
        }
        match self.config.max_attempts() {
            Some(max) if self.stats.total_keys() >= max => {
                SearchError::AttemptBudgetExhausted(max)
            }
            _ => SearchError::SearchExhausted { workers },
        }
    }

    fn log_progress(&self, start: Instant) {
        let keys = self.stats.total_keys();
        let elapsed = start.elapsed();
        let rate = keys as f64 / elapsed.as_secs_f64().max(f64::EPSILON);
        info!(
            "[{:>4}s] generated {} keys ({}/s)",
            elapsed.as_secs(),
            format_number(keys),
            format_number(rate as u64)
        );
    }

    fn is_stopped(&self) -> bool {
        self.stop_flag.load(Ordering::Acquire)
    }

    /// Raises the stop flag and joins every worker.
    fn shutdown(&mut self) {
        self.stop_flag.store(true, Ordering::Release);
        for handle in self.handles.drain(..) {
            let name = handle.thread().name().unwrap_or("worker").to_owned();
            match handle.join() {
                Ok(exit) => debug!("{} exited: {:?}", name, exit),
                Err(_) => warn!("{} panicked", name),
            }
        }
    }
}

impl<K: KeySource + 'static> Drop for WorkerPool<K> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Returns a match that was published while the coordinator was deciding to
/// give up, skipping any queued failure reports.
fn take_pending_match(result_rx: &Receiver<WorkerReport>) -> Option<Found> {
    result_rx.try_iter().find_map(|report| match report {
        WorkerReport::Matched(found) => Some(found),
        WorkerReport::Errored { .. } => None,
    })
}

/// Runs a search for `pattern` with `workers` threads using OS randomness.
pub fn search(pattern: &str, workers: usize) -> Result<SearchResult, SearchError> {
    search_with(pattern, workers, OsKeySource)
}

/// Runs a search with a custom keypair generator.
pub fn search_with<K: KeySource + 'static>(
    pattern: &str,
    workers: usize,
    key_source: K,
) -> Result<SearchResult, SearchError> {
    let config = SearchConfig::from_regex(pattern, workers)?;
    WorkerPool::with_key_source(config, key_source).run()
}

/// Formats a count with a K/M/B suffix.
pub fn format_number(n: u64) -> String {
    if n >= 1_000_000_000 {
        format!("{:.2}B", n as f64 / 1_000_000_000.0)
    } else if n >= 1_000_000 {
        format!("{:.2}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.2}K", n as f64 / 1_000.0)
    } else {
        n.to_string()
    }
}
