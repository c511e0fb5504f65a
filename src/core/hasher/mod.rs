//! # Hasher Module
//!
//! Content fingerprints for exact-duplicate detection.
//!
//! A fingerprint is a 128-bit XXH3 digest of the whole file. Equal
//! fingerprints are necessary but not sufficient: `identical` always confirms
//! with a byte-for-byte comparison before anything is deleted.

mod file_bytes;

pub use file_bytes::{read_file_bytes, FileBytes};

use crate::error::FingerprintError;
use std::fmt;
use std::path::Path;
use xxhash_rust::xxh3::xxh3_128;

/// Content-derived digest of a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(pub u128);

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

/// Capability: fingerprint files and decide whether two files hold the same bytes
pub trait ContentHasher: Send + Sync {
    /// Compute the fingerprint of a file
    fn fingerprint(&self, path: &Path) -> Result<Fingerprint, FingerprintError>;

    /// Whether two files have identical content
    fn identical(&self, a: &Path, b: &Path) -> Result<bool, FingerprintError>;
}

/// XXH3-128 fingerprints with full byte verification
#[derive(Debug, Clone, Copy, Default)]
pub struct Xxh3Hasher;

impl ContentHasher for Xxh3Hasher {
    fn fingerprint(&self, path: &Path) -> Result<Fingerprint, FingerprintError> {
        let bytes = read_file_bytes(path)?;
        Ok(Fingerprint(xxh3_128(&bytes)))
    }

    fn identical(&self, a: &Path, b: &Path) -> Result<bool, FingerprintError> {
        let size_of = |path: &Path| {
            std::fs::metadata(path)
                .map(|m| m.len())
                .map_err(|source| FingerprintError::Io {
                    path: path.to_path_buf(),
                    source,
                })
        };

        if size_of(a)? != size_of(b)? {
            return Ok(false);
        }

        let (left, right) = rayon::join(|| read_file_bytes(a), || read_file_bytes(b));
        let (left, right) = (left?, right?);

        if xxh3_128(&left) != xxh3_128(&right) {
            return Ok(false);
        }

        // Equal digests still get a full comparison
        Ok(*left == *right)
    }
}
