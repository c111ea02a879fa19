//! Tor v3 onion address representation and derivation.

use std::fmt;
use std::str::FromStr;

use base32::Alphabet;
use tiny_keccak::{Hasher, Sha3};

/// Length of an Ed25519 public key.
pub const PUBLIC_KEY_LEN: usize = 32;

/// Number of checksum bytes embedded in the address payload.
pub const CHECKSUM_LEN: usize = 2;

/// Length of the binary address payload: `pubkey || checksum || version`.
pub const PAYLOAD_LEN: usize = PUBLIC_KEY_LEN + CHECKSUM_LEN + 1;

/// Length of the base32 text of the payload (35 bytes, 280 bits, no padding needed).
pub const ENCODED_LEN: usize = PAYLOAD_LEN * 8 / 5;

/// Literal suffix appended to every address.
pub const ONION_SUFFIX: &str = ".onion";

const CHECKSUM_CONTEXT: &[u8] = b".onion checksum";

/// Version byte identifying the address scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AddressVersion(u8);

impl AddressVersion {
    /// Tor v3 onion services.
    pub const V3: Self = Self(0x03);

    #[inline]
    pub const fn new(byte: u8) -> Self {
        Self(byte)
    }

    #[inline]
    pub const fn as_byte(self) -> u8 {
        self.0
    }
}

impl Default for AddressVersion {
    fn default() -> Self {
        Self::V3
    }
}

/// A decoded onion address (public key, checksum and version).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct OnionAddress {
    public_key: [u8; PUBLIC_KEY_LEN],
    checksum: [u8; CHECKSUM_LEN],
    version: AddressVersion,
}

impl OnionAddress {
    /// Derives the address of an Ed25519 public key.
    ///
    /// Process:
    /// 1. checksum = SHA3-256(".onion checksum" || pubkey || version)[..2]
    /// 2. payload = pubkey || checksum || version
    #[inline]
    pub fn from_public_key(public_key: &[u8; PUBLIC_KEY_LEN], version: AddressVersion) -> Self {
        Self {
            public_key: *public_key,
            checksum: checksum(public_key, version),
            version,
        }
    }

    /// Parses an address and verifies that it carries `version` and a valid checksum.
    ///
    /// The `.onion` suffix is optional and case is ignored.
    pub fn parse(s: &str, version: AddressVersion) -> Result<Self, AddressParseError> {
        let lower = s.trim().to_ascii_lowercase();
        let encoded = lower.strip_suffix(ONION_SUFFIX).unwrap_or(lower.as_str());

        if encoded.len() != ENCODED_LEN {
            return Err(AddressParseError::WrongLength(encoded.len()));
        }
        if let Some(c) = encoded
            .chars()
            .find(|c| !matches!(c, 'a'..='z' | '2'..='7'))
        {
            return Err(AddressParseError::InvalidCharacter(c));
        }

        let payload = base32::decode(
            Alphabet::Rfc4648 { padding: false },
            &encoded.to_ascii_uppercase(),
        )
        .filter(|bytes| bytes.len() == PAYLOAD_LEN)
        .ok_or(AddressParseError::InvalidBase32)?;

        let found = AddressVersion::new(payload[PAYLOAD_LEN - 1]);
        if found != version {
            return Err(AddressParseError::VersionMismatch {
                expected: version.as_byte(),
                found: found.as_byte(),
            });
        }

        let mut public_key = [0u8; PUBLIC_KEY_LEN];
        public_key.copy_from_slice(&payload[..PUBLIC_KEY_LEN]);
        let address = Self::from_public_key(&public_key, version);

        if address.checksum[..] != payload[PUBLIC_KEY_LEN..PUBLIC_KEY_LEN + CHECKSUM_LEN] {
            return Err(AddressParseError::ChecksumMismatch);
        }

        Ok(address)
    }

    #[inline]
    pub fn public_key(&self) -> &[u8; PUBLIC_KEY_LEN] {
        &self.public_key
    }

    #[inline]
    pub fn checksum(&self) -> [u8; CHECKSUM_LEN] {
        self.checksum
    }

    #[inline]
    pub fn version(&self) -> AddressVersion {
        self.version
    }

    /// Returns the binary payload `pubkey || checksum || version`.
    pub fn to_bytes(&self) -> [u8; PAYLOAD_LEN] {
        let mut payload = [0u8; PAYLOAD_LEN];
        payload[..PUBLIC_KEY_LEN].copy_from_slice(&self.public_key);
        payload[PUBLIC_KEY_LEN..PUBLIC_KEY_LEN + CHECKSUM_LEN].copy_from_slice(&self.checksum);
        payload[PAYLOAD_LEN - 1] = self.version.as_byte();
        payload
    }

    /// Returns the textual address: lowercase base32 of the payload plus `.onion`.
    pub fn encode(&self) -> String {
        let mut address = base32::encode(Alphabet::Rfc4648 { padding: true }, &self.to_bytes())
            .to_ascii_lowercase();
        address.push_str(ONION_SUFFIX);
        address
    }
}

impl FromStr for OnionAddress {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s, AddressVersion::V3)
    }
}

impl fmt::Debug for OnionAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OnionAddress({})", self.encode())
    }
}

impl fmt::Display for OnionAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

/// Errors returned when parsing a textual onion address.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressParseError {
    #[error("expected 56 base32 characters, found {0}")]
    WrongLength(usize),

    #[error("invalid base32 character '{0}'")]
    InvalidCharacter(char),

    #[error("invalid base32 payload")]
    InvalidBase32,

    #[error("unexpected address version {found:#04x} (expected {expected:#04x})")]
    VersionMismatch { expected: u8, found: u8 },

    #[error("address checksum mismatch")]
    ChecksumMismatch,
}

/// Computes the two checksum bytes for `public_key` under `version`.
#[inline]
pub fn checksum(public_key: &[u8; PUBLIC_KEY_LEN], version: AddressVersion) -> [u8; CHECKSUM_LEN] {
    let mut hasher = Sha3::v256();
    hasher.update(CHECKSUM_CONTEXT);
    hasher.update(public_key);
    hasher.update(&[version.as_byte()]);

    let mut digest = [0u8; 32];
    hasher.finalize(&mut digest);

    [digest[0], digest[1]]
}

/// Encodes `public_key` under `version` into its textual onion address.
#[inline]
pub fn encode_onion_address(public_key: &[u8; PUBLIC_KEY_LEN], version: AddressVersion) -> String {
    OnionAddress::from_public_key(public_key, version).encode()
}
