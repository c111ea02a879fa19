//! Cryptographic operations for onion key and address generation.
//!
//! This module provides:
//! - Ed25519 keypair generation from the OS CSPRNG
//! - Tor v3 onion address derivation using SHA3-256 and base32
//! - Address parsing with checksum validation

mod address;
mod keypair;

pub use address::{
    checksum, encode_onion_address, AddressParseError, AddressVersion, OnionAddress, ENCODED_LEN,
    ONION_SUFFIX, PAYLOAD_LEN, PUBLIC_KEY_LEN,
};
pub use keypair::{KeyError, KeySource, Keypair, OsKeySource, SEED_LEN};
