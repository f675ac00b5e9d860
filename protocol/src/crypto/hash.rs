//! # Hashing Utilities
//!
//! The three digests the registry needs, and nothing more:
//!
//! - **SHA-256** — block content hashes. Hex-encoded on the block.
//! - **double SHA-256** — the Bitcoin signed-message digest.
//! - **HASH160** (`RIPEMD160(SHA256(x))`) — public key and redeem script
//!   hashes embedded in Bitcoin addresses.

use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

/// Compute the SHA-256 hash and return a fixed-size array.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// Compute the SHA-256 hash of the input and return it as lowercase hex.
///
/// This is the representation stored in `Block::hash` and
/// `Block::previous_block_hash`.
///
/// # Example
///
/// ```
/// use star_registry::crypto::sha256_hex;
///
/// assert_eq!(sha256_hex(b"star").len(), 64);
/// ```
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

/// Compute the double-SHA-256 hash: `SHA-256(SHA-256(data))`.
pub fn double_sha256(data: &[u8]) -> [u8; 32] {
    sha256(&sha256(data))
}

/// Compute `RIPEMD160(SHA256(data))`, the 20-byte hash Bitcoin addresses
/// are built from.
pub fn hash160(data: &[u8]) -> [u8; 20] {
    let mut hasher = Ripemd160::new();
    hasher.update(sha256(data));
    let result = hasher.finalize();
    let mut output = [0u8; 20];
    output.copy_from_slice(&result);
    output
}
