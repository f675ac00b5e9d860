//! # Storage Module
//!
//! The registry's ledger. Everything lives in process memory; a restart
//! starts a fresh chain from genesis.
//!
//! ## Architecture
//!
//! ```text
//! block.rs  — Block structure, content hash, payload encoding
//! chain.rs  — Append/validate/rollback, ownership proofs, lookups
//! ```
//!
//! ## Data Flow
//!
//! ```text
//! challenge → wallet signs → submit_star → Block::new → Chain::append_block
//!                                                           ↓
//!                                                     validate_chain
//! ```

pub mod block;
pub mod chain;

pub use block::Block;
pub use chain::{Chain, StarRecord};
