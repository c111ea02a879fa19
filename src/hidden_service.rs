//! Export of a found key as a Tor hidden service directory.
//!
//! Layout written under `<dst>/<address without .onion>/`:
//! - `hostname`
//! - `hs_ed25519_public_key`
//! - `hs_ed25519_secret_key`
//! - `authorized_clients/`

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha512};

use crate::crypto::{Keypair, ONION_SUFFIX};

/// Header of Tor's ed25519 secret key file.
pub const SECRET_KEY_PREFIX: &[u8] = b"== ed25519v1-secret: type0 ==\0\0\0";

/// Header of Tor's ed25519 public key file.
pub const PUBLIC_KEY_PREFIX: &[u8] = b"== ed25519v1-public: type0 ==\0\0\0";

#[derive(Debug, thiserror::Error)]
pub enum HiddenServiceError {
    #[error("'{}' is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Expands an Ed25519 seed into Tor's secret key format: the clamped scalar
/// followed by the nonce prefix, both taken from SHA-512(seed).
pub fn expanded_secret_key(seed: &[u8; 32]) -> [u8; 64] {
    let mut expanded = [0u8; 64];
    expanded.copy_from_slice(&Sha512::digest(seed));
    expanded[0] &= 248;
    expanded[31] &= 127;
    expanded[31] |= 64;
    expanded
}

/// Writes the hidden service directory for `address` and returns its path.
pub fn write_hidden_service(
    dst: &Path,
    address: &str,
    keypair: &Keypair,
) -> Result<PathBuf, HiddenServiceError> {
    if !dst.is_dir() {
        return Err(HiddenServiceError::NotADirectory(dst.to_path_buf()));
    }

    let hs_dir = dst.join(address.trim_end_matches(ONION_SUFFIX));
    create_dir(&hs_dir.join("authorized_clients"))?;

    let expanded = expanded_secret_key(keypair.seed());
    let public_key = [PUBLIC_KEY_PREFIX, keypair.public_key().as_slice()].concat();
    let secret_key = [SECRET_KEY_PREFIX, expanded.as_slice()].concat();

    write_file(&hs_dir.join("hostname"), format!("{}\n", address).as_bytes())?;
    write_file(&hs_dir.join("hs_ed25519_public_key"), &public_key)?;
    write_file(&hs_dir.join("hs_ed25519_secret_key"), &secret_key)?;

    Ok(hs_dir)
}

fn create_dir(path: &Path) -> Result<(), HiddenServiceError> {
    fs::create_dir_all(path).map_err(|source| HiddenServiceError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn write_file(path: &Path, contents: &[u8]) -> Result<(), HiddenServiceError> {
    fs::write(path, contents).map_err(|source| HiddenServiceError::Io {
        path: path.to_path_buf(),
        source,
    })
}
