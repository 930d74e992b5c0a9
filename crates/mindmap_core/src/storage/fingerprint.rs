//! Content fingerprinting and fingerprint validation.
//!
//! # Responsibility
//! - Derive a short, deterministic content hash from document bytes.
//! - Be the single gate turning caller strings into folder names.
//!
//! # Invariants
//! - Hashing streams input in fixed-size chunks; files are never buffered whole.
//! - `ContentHash` values always match `^[a-f0-9]{16}$`.

use crate::storage::error::{StoreError, StoreResult};
use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::fmt::{Display, Formatter};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Length of a content hash in hex characters.
pub const CONTENT_HASH_LEN: usize = 16;
const READ_CHUNK_BYTES: usize = 8 * 1024;

static CONTENT_HASH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-f0-9]{16}$").expect("valid content hash regex"));

/// Validated content hash, safe to use as a directory name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentHash(String);

impl ContentHash {
    /// Validates `value` as a content hash.
    ///
    /// # Errors
    /// - `StoreError::InvalidContentHash` for anything but 16 lowercase hex
    ///   chars, including separators, `..`, percent escapes, NUL and uppercase.
    pub fn parse(value: &str) -> StoreResult<Self> {
        if value.len() != CONTENT_HASH_LEN || !CONTENT_HASH_RE.is_match(value) {
            return Err(StoreError::InvalidContentHash(value.to_string()));
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ContentHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<Path> for ContentHash {
    fn as_ref(&self) -> &Path {
        Path::new(&self.0)
    }
}

/// Returns whether `value` is a well-formed content hash.
pub fn is_valid_content_hash(value: &str) -> bool {
    ContentHash::parse(value).is_ok()
}

/// Streams `reader` through SHA-256 and returns the first 16 hex chars.
pub fn compute_content_hash<R: Read>(mut reader: R) -> io::Result<ContentHash> {
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; READ_CHUNK_BYTES];
    loop {
        let read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(read) => read,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        };
        hasher.update(&buffer[..read]);
    }

    let digest = hasher.finalize();
    let mut hex = hex_encode_lower(&digest);
    hex.truncate(CONTENT_HASH_LEN);
    Ok(ContentHash(hex))
}

/// Hashes the file at `path`.
pub fn compute_file_hash(path: impl AsRef<Path>) -> StoreResult<ContentHash> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|err| StoreError::io(path, err))?;
    compute_content_hash(file).map_err(|err| StoreError::io(path, err))
}

fn hex_encode_lower(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(HEX[(byte >> 4) as usize] as char);
        out.push(HEX[(byte & 0x0f) as usize] as char);
    }
    out
}
