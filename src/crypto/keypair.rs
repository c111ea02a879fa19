//! Ed25519 keypair generation.

use std::fmt;

use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use rand::RngCore;

use super::address::PUBLIC_KEY_LEN;

/// Length of an Ed25519 seed (the private key).
pub const SEED_LEN: usize = 32;

/// Errors that can occur while generating keys.
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("randomness unavailable: {0}")]
    RandomnessUnavailable(String),
}

/// An Ed25519 keypair (private seed + derived public key).
#[derive(Clone)]
pub struct Keypair {
    /// The private seed (32 bytes)
    seed: [u8; SEED_LEN],
    /// The derived public key (32 bytes)
    public_key: [u8; PUBLIC_KEY_LEN],
}

impl Keypair {
    /// Derives a keypair from a 32-byte seed.
    pub fn from_seed(seed: [u8; SEED_LEN]) -> Self {
        let public_key = SigningKey::from_bytes(&seed).verifying_key().to_bytes();
        Self { seed, public_key }
    }

    /// Returns the private seed bytes.
    pub fn seed(&self) -> &[u8; SEED_LEN] {
        &self.seed
    }

    /// Returns the public key bytes.
    #[inline]
    pub fn public_key(&self) -> &[u8; PUBLIC_KEY_LEN] {
        &self.public_key
    }

    /// Returns the 64-byte private key encoding `seed || public key`.
    pub fn to_keypair_bytes(&self) -> [u8; 64] {
        let mut bytes = [0u8; 64];
        bytes[..SEED_LEN].copy_from_slice(&self.seed);
        bytes[SEED_LEN..].copy_from_slice(&self.public_key);
        bytes
    }

    /// Returns the private key (`seed || public key`) as a hex string.
    pub fn private_key_hex(&self) -> String {
        hex::encode(self.to_keypair_bytes())
    }

    /// Returns the public key as a hex string.
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key)
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("public_key", &self.public_key_hex())
            .finish_non_exhaustive()
    }
}

/// Source of fresh keypairs.
///
/// Implementations are shared by every worker of a search and must not rely
/// on shared mutable state.
pub trait KeySource: Send + Sync {
    /// Produces a new, independently random keypair.
    fn generate(&self) -> Result<Keypair, KeyError>;
}

/// Generates keypairs from the operating system's CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsKeySource;

impl KeySource for OsKeySource {
    #[inline]
    fn generate(&self) -> Result<Keypair, KeyError> {
        let mut seed = [0u8; SEED_LEN];
        OsRng
            .try_fill_bytes(&mut seed)
            .map_err(|e| KeyError::RandomnessUnavailable(e.to_string()))?;
        Ok(Keypair::from_seed(seed))
    }
}

impl<K: KeySource + ?Sized> KeySource for std::sync::Arc<K> {
    fn generate(&self) -> Result<Keypair, KeyError> {
        (**self).generate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RFC8032_SEED: &str = "9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60";
    const RFC8032_PUBLIC: &str = "d75a980182b10ab7d54bfed3c964073a0ee172f3daa62325af021a68f707511a";

    #[test]
    fn test_keypair_from_known_seed() {
        let seed: [u8; 32] = hex::decode(RFC8032_SEED).unwrap().try_into().unwrap();
        let keypair = Keypair::from_seed(seed);
        assert_eq!(keypair.public_key_hex(), RFC8032_PUBLIC);
        assert_eq!(
            keypair.private_key_hex(),
            format!("{}{}", RFC8032_SEED, RFC8032_PUBLIC)
        );
    }

    #[test]
    fn test_os_key_source_generates_distinct_keys() {
        let source = OsKeySource;
        let a = source.generate().unwrap();
        let b = source.generate().unwrap();
        assert_ne!(a.seed(), b.seed());
        assert_ne!(a.public_key(), b.public_key());
        assert_eq!(Keypair::from_seed(*a.seed()).public_key(), a.public_key());
    }

    #[test]
    fn test_debug_hides_seed() {
        let keypair = Keypair::from_seed([7u8; 32]);
        let debug = format!("{:?}", keypair);
        assert!(debug.contains(&keypair.public_key_hex()));
        assert!(!debug.contains(&hex::encode([7u8; 32])));
    }
}
