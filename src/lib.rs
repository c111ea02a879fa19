//! # onion_vanity
//!
//! Multi-threaded Tor v3 onion vanity address generator.
//!
//! ## Architecture
//!
//! - `crypto`: Key generation and onion address derivation
//! - `matcher`: Regular expression matching of addresses
//! - `worker`: Parallel search workers and the first-match coordinator
//! - `hidden_service`: Export of a found key in Tor's on-disk format
//! - `config`: Runtime configuration

pub mod config;
pub mod crypto;
pub mod hidden_service;
pub mod matcher;
pub mod worker;

pub use config::Config;
pub use crypto::{
    encode_onion_address, AddressVersion, KeyError, KeySource, Keypair, OnionAddress, OsKeySource,
};
pub use hidden_service::{write_hidden_service, HiddenServiceError};
pub use matcher::{Pattern, PatternError};
pub use worker::{search, search_with, SearchConfig, SearchError, SearchResult, WorkerPool};
