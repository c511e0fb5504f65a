//! Memory-mapped file reads for large media files.
//!
//! Videos routinely run to hundreds of megabytes; mapping them avoids
//! copying the whole file onto the heap just to hash or compare it.

use crate::error::FingerprintError;
use memmap2::Mmap;
use std::fs::File;
use std::path::Path;

/// Minimum file size to use memory-mapped I/O (1MB)
const MMAP_THRESHOLD: u64 = 1024 * 1024;

/// Read a file's bytes, mapping it when it is at least 1MB.
pub fn read_file_bytes(path: &Path) -> Result<FileBytes, FingerprintError> {
    let io_error = |source| FingerprintError::Io {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(io_error)?;
    let len = file.metadata().map_err(io_error)?.len();

    if len == 0 {
        return Ok(FileBytes::Vec(Vec::new()));
    }

    if len >= MMAP_THRESHOLD {
        // SAFETY: We're only reading the file. Candidates are settled before
        // they reach the hasher, so nothing truncates them while mapped.
        let mmap = unsafe { Mmap::map(&file) }.map_err(io_error)?;
        Ok(FileBytes::Mmap(mmap))
    } else {
        std::fs::read(path).map(FileBytes::Vec).map_err(io_error)
    }
}

/// File bytes that may be either owned or memory-mapped
pub enum FileBytes {
    /// Standard heap-allocated bytes
    Vec(Vec<u8>),
    /// Memory-mapped bytes (zero-copy from disk)
    Mmap(Mmap),
}

impl AsRef<[u8]> for FileBytes {
    fn as_ref(&self) -> &[u8] {
        match self {
            FileBytes::Vec(v) => v,
            FileBytes::Mmap(m) => m,
        }
    }
}

impl std::ops::Deref for FileBytes {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.as_ref()
    }
}
