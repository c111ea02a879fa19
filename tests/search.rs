//! Coordinator behaviour with instrumented key sources.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use onion_vanity::crypto::{ENCODED_LEN, ONION_SUFFIX};
use onion_vanity::{
    encode_onion_address, search_with, AddressVersion, KeyError, KeySource, Keypair, OnionAddress,
    OsKeySource, SearchConfig, SearchError, WorkerPool,
};

/// Counts calls and, once a stop flag is attached, the calls started after it was raised.
#[derive(Default)]
struct CountingKeySource {
    calls: AtomicUsize,
    calls_after_stop: AtomicUsize,
    stop_flag: Option<Arc<AtomicBool>>,
}

impl CountingKeySource {
    fn watching(stop_flag: Arc<AtomicBool>) -> Self {
        Self {
            stop_flag: Some(stop_flag),
            ..Self::default()
        }
    }
}

impl KeySource for CountingKeySource {
    fn generate(&self) -> Result<Keypair, KeyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(flag) = &self.stop_flag {
            if flag.load(Ordering::SeqCst) {
                self.calls_after_stop.fetch_add(1, Ordering::SeqCst);
            }
        }
        OsKeySource.generate()
    }
}

struct FailingKeySource {
    calls: AtomicUsize,
}

impl KeySource for FailingKeySource {
    fn generate(&self) -> Result<Keypair, KeyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(KeyError::RandomnessUnavailable("no entropy".into()))
    }
}

/// Fails its first `failures` calls, then delegates to the OS source.
struct FlakyKeySource {
    failures: usize,
    calls: AtomicUsize,
}

impl KeySource for FlakyKeySource {
    fn generate(&self) -> Result<Keypair, KeyError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) < self.failures {
            return Err(KeyError::RandomnessUnavailable("entropy pool not ready".into()));
        }
        OsKeySource.generate()
    }
}

#[test]
fn test_exactly_one_result_for_any_worker_count() {
    for workers in 1..=8 {
        let result = search_with("", workers, OsKeySource).unwrap();
        assert!(result.worker_id < workers);
        assert_eq!(
            result.address,
            encode_onion_address(result.keypair.public_key(), AddressVersion::V3)
        );
    }
}

#[test]
fn test_always_true_pattern_matches_first_candidate() {
    let source = Arc::new(CountingKeySource::default());
    let result = search_with(".*", 1, source.clone()).unwrap();
    assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    assert_eq!(result.keys_tried, 1);
}

#[test]
fn test_generated_addresses_are_well_formed() {
    for _ in 0..16 {
        let result = search_with("", 2, OsKeySource).unwrap();
        let encoded = result.address.strip_suffix(ONION_SUFFIX).unwrap();
        assert_eq!(encoded.len(), ENCODED_LEN);
        assert!(encoded.chars().all(|c| matches!(c, 'a'..='z' | '2'..='7')));

        let parsed: OnionAddress = result.address.parse().unwrap();
        assert_eq!(parsed.public_key(), result.keypair.public_key());
    }
}

#[test]
fn test_result_matches_pattern() {
    let result = search_with("^[a-d]", 4, OsKeySource).unwrap();
    let first = result.address.chars().next().unwrap();
    assert!(('a'..='d').contains(&first));
}

#[test]
fn test_cancellation_is_bounded() {
    let workers = 4;
    let stop_flag = Arc::new(AtomicBool::new(false));
    let source = Arc::new(CountingKeySource::watching(stop_flag.clone()));

    let config = SearchConfig::from_regex("^ab", workers).unwrap();
    WorkerPool::with_key_source(config, source.clone())
        .with_stop_flag(stop_flag.clone())
        .run()
        .unwrap();

    assert!(stop_flag.load(Ordering::SeqCst));
    // A worker can be past its stop check by at most one iteration.
    assert!(source.calls_after_stop.load(Ordering::SeqCst) <= workers);

    // Every worker has exited: no further calls happen.
    let calls = source.calls.load(Ordering::SeqCst);
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(source.calls.load(Ordering::SeqCst), calls);
}

#[test]
fn test_all_workers_failing_exhausts_search() {
    let source = Arc::new(FailingKeySource {
        calls: AtomicUsize::new(0),
    });

    let start = Instant::now();
    let err = search_with(".*", 3, source.clone()).unwrap_err();

    assert!(matches!(err, SearchError::SearchExhausted { workers: 3 }));
    assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    assert!(start.elapsed() < Duration::from_secs(5));
}

#[test]
fn test_surviving_workers_still_find_a_match() {
    let source = Arc::new(FlakyKeySource {
        failures: 2,
        calls: AtomicUsize::new(0),
    });

    let result = search_with("", 3, source.clone()).unwrap();
    assert_eq!(
        result.address,
        encode_onion_address(result.keypair.public_key(), AddressVersion::V3)
    );
    // Two workers gave up after one call each; a third call produced the winner.
    assert!(source.calls.load(Ordering::SeqCst) >= 3);
}

#[test]
fn test_external_stop_during_search() {
    let stop_flag = Arc::new(AtomicBool::new(false));
    let config = SearchConfig::from_regex("^A", 2)
        .unwrap()
        .with_report_interval(Duration::from_millis(10));

    let trigger = {
        let stop_flag = stop_flag.clone();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(30));
            stop_flag.store(true, Ordering::SeqCst);
        })
    };

    let err = WorkerPool::new(config)
        .with_stop_flag(stop_flag)
        .run()
        .unwrap_err();
    trigger.join().unwrap();
    assert!(matches!(err, SearchError::Stopped));
}

#[test]
fn test_invalid_pattern_spawns_nothing() {
    let source = Arc::new(CountingKeySource::default());
    let err = search_with("(", 4, source.clone()).unwrap_err();
    assert!(matches!(err, SearchError::InvalidPattern(_)));
    assert_eq!(source.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_zero_workers_spawns_nothing() {
    let source = Arc::new(CountingKeySource::default());
    let err = search_with(".*", 0, source.clone()).unwrap_err();
    assert!(matches!(err, SearchError::InvalidWorkerCount(0)));
    assert_eq!(source.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_custom_version() {
    let config = SearchConfig::from_regex("", 1)
        .unwrap()
        .with_version(AddressVersion::new(4));
    let result = WorkerPool::new(config).run().unwrap();

    let parsed = OnionAddress::parse(&result.address, AddressVersion::new(4)).unwrap();
    assert_eq!(parsed.public_key(), result.keypair.public_key());
    assert!(result.address.parse::<OnionAddress>().is_err());
}
