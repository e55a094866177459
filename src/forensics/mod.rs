//! Content-level signals extracted from image bytes and response headers.
//!
//! - SHA-256 digest (the identity used by change detection)
//! - Format detection from magic bytes, independent of the declared type
//! - Byte statistics (size and Shannon entropy)
//! - HTTP provenance headers

mod format;
mod provenance;

pub use format::{sniff_format, ImageFormat};
pub use provenance::Provenance;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Lower-case hex SHA-256 of `bytes`.
pub fn content_hash(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Size and byte-distribution statistics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ByteStats {
    /// Total bytes
    pub size: u64,
    /// Shannon entropy in bits per byte (0.0 to 8.0)
    pub entropy: f64,
}

impl ByteStats {
    /// Computes statistics over `bytes`.
    pub fn of(bytes: &[u8]) -> Self {
        ByteStats {
            size: bytes.len() as u64,
            entropy: shannon_entropy(bytes),
        }
    }
}

/// Shannon entropy in bits per byte. Empty input has zero entropy.
pub fn shannon_entropy(data: &[u8]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }

    let mut counts = [0u64; 256];
    for &byte in data {
        counts[byte as usize] += 1;
    }

    let len = data.len() as f64;
    counts
        .iter()
        .filter(|&&count| count > 0)
        .map(|&count| {
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Everything derived from the bytes alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentSummary {
    /// SHA-256 hex digest
    pub content_hash: String,
    /// Size and entropy
    pub stats: ByteStats,
    /// Format recognized from magic bytes
    pub format: Option<ImageFormat>,
}

/// Digest, statistics and format of `bytes`.
pub fn summarize(bytes: &[u8]) -> ContentSummary {
    ContentSummary {
        content_hash: content_hash(bytes),
        stats: ByteStats::of(bytes),
        format: sniff_format(bytes),
    }
}
