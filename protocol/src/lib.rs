// Copyright (c) 2026 Star Registry Contributors. MIT License.
// See LICENSE for details.

//! # Star Registry — Core Library
//!
//! A minimal private blockchain. Each block wraps one payload, a "star"
//! claimed by a Bitcoin wallet address, and links to its predecessor by
//! SHA-256 hash. New stars are accepted only with a Bitcoin signed-message
//! proof that the submitter controls the address.
//!
//! ## Architecture
//!
//! - **storage** — Blocks and the in-memory chain: append with rollback,
//!   lookups, full-chain validation.
//! - **crypto** — Hashing, Bitcoin address decoding and signed-message
//!   verification.
//! - **error** — [`ChainError`] and [`ValidationIssue`].
//! - **config** — Protocol constants and [`ChainConfig`].
//! - **clock** — Time source abstraction.
//!
//! ## Lifecycle
//!
//! Construct one [`Chain`] at process start; construction mints the
//! genesis block. Share it behind an `Arc` for the life of the process.

pub mod clock;
pub mod config;
pub mod crypto;
pub mod error;
pub mod storage;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use config::ChainConfig;
pub use error::{ChainError, ValidationIssue};
pub use storage::{Block, Chain, StarRecord};
