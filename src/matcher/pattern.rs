//! Regular expression matching against textual onion addresses.

use std::fmt;

use regex::{Regex, RegexBuilder};

use crate::crypto::{encode_onion_address, AddressVersion, PUBLIC_KEY_LEN};

/// Errors raised while compiling a pattern.
#[derive(Debug, thiserror::Error)]
pub enum PatternError {
    #[error("{0}")]
    Invalid(#[from] regex::Error),
}

/// A compiled pattern.
///
/// Matching is unanchored: the pattern may match anywhere in the full
/// address, including the `.onion` suffix. Use `^` to anchor a prefix.
/// Cloning is cheap and clones share the compiled program.
#[derive(Clone)]
pub struct Pattern {
    regex: Regex,
    case_insensitive: bool,
}

impl Pattern {
    /// Compiles a case-sensitive pattern.
    pub fn new(pattern: &str) -> Result<Self, PatternError> {
        Self::with_case(pattern, false)
    }

    /// Compiles a pattern, optionally ignoring case.
    pub fn with_case(pattern: &str, case_insensitive: bool) -> Result<Self, PatternError> {
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(case_insensitive)
            .build()?;

        Ok(Self {
            regex,
            case_insensitive,
        })
    }

    /// Returns the pattern source.
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    pub fn is_case_insensitive(&self) -> bool {
        self.case_insensitive
    }

    /// Returns true if the pattern accepts the addresses of both the all-zero
    /// and the all-one public key. Patterns such as `""`, `.*` or `onion`
    /// pass; anything constraining the base32 part fails on one of them.
    pub fn is_trivial(&self, version: AddressVersion) -> bool {
        [[0x00u8; PUBLIC_KEY_LEN], [0xffu8; PUBLIC_KEY_LEN]]
            .iter()
            .all(|key| self.matches(&encode_onion_address(key, version)))
    }

    /// Tests a textual address against this pattern.
    #[inline]
    pub fn matches(&self, address: &str) -> bool {
        self.regex.is_match(address)
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pattern")
            .field("regex", &self.as_str())
            .field("case_insensitive", &self.case_insensitive)
            .finish()
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
