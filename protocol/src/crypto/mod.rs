//! # Cryptographic Primitives
//!
//! Everything the registry needs to check a wallet's proof of ownership:
//!
//! - **hash** — SHA-256 for block content hashes, double SHA-256 and
//!   HASH160 for the Bitcoin side.
//! - **address** — base58check and bech32 address decoding.
//! - **message** — Bitcoin signed-message verification via secp256k1
//!   public key recovery.
//!
//! The registry only ever verifies. Keys and signing live in the wallet.

pub mod address;
pub mod hash;
pub mod message;

pub use address::{Address, AddressError};
pub use hash::{double_sha256, hash160, sha256, sha256_hex};
pub use message::{verify_message, SignatureError};
