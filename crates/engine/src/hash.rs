//! Content hashing using SHA-256
//!
//! Snapshots identify file content by a hex-encoded SHA-256 digest computed
//! over the full byte stream, never over metadata.

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

/// Hash a byte slice
///
/// # Examples
///
/// ```
/// use fsguard_engine::hash::hash_content;
///
/// let hash = hash_content(b"Hello, world!");
/// assert_eq!(hash.len(), 64); // 256-bit hash, hex encoded
/// ```
#[must_use]
pub fn hash_content(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}

/// Hash everything a reader yields
///
/// Data is streamed through the hasher, so arbitrarily large inputs are
/// hashed in constant memory.
///
/// # Errors
///
/// Returns the reader's I/O error.
pub fn hash_reader<R: Read>(reader: &mut R) -> io::Result<String> {
    let mut hasher = Sha256::new();
    io::copy(reader, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

/// Hash a file with buffered reading
///
/// ```no_run
/// use fsguard_engine::hash::hash_file;
/// use std::path::Path;
///
/// # fn main() -> std::io::Result<()> {
/// let hash = hash_file(Path::new("/path/to/large/file"))?;
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns an error if the file cannot be opened or read.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    hash_reader(&mut reader)
}
