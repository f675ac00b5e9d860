//! # In-Memory Chain
//!
//! The registry's single, append-only chain of [`Block`]s.
//!
//! ## Append Protocol
//!
//! ```text
//! 1. LINK     — previousBlockHash = tip hash (None for genesis)
//! 2. STAMP    — time = now, height = tip height + 1
//! 3. SEAL     — hash = SHA-256 of the block with hash = null
//! 4. PUSH     — tentatively push onto the chain
//! 5. VALIDATE — run the full-chain check
//! 6. ROLLBACK — on any issue, pop the block and fail with the issues
//! ```
//!
//! Every successful append therefore leaves a chain that has just been
//! checked end to end.
//!
//! ## Concurrency
//!
//! Blocks live behind a `tokio::sync::RwLock`. An append holds the write
//! guard from step 1 to step 6, so appends are serialized and readers see
//! either the chain before an append or the chain after it, never the
//! tentative state. Read operations share the lock.
//!
//! ## Ownership Proofs
//!
//! A wallet asks for a challenge `<address>:<time>:starRegistry`, signs it
//! off-system, and submits the signature with its star. The issue time is
//! read back out of the message, so the chain keeps no session state.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::block::Block;
use crate::clock::{Clock, SystemClock};
use crate::config::{ChainConfig, CHALLENGE_SEPARATOR, CHALLENGE_SUFFIX};
use crate::crypto::verify_message;
use crate::error::{ChainError, ValidationIssue};

/// Payload of every non-genesis block minted by [`Chain::submit_star`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StarRecord {
    /// Wallet address that proved ownership.
    pub owner: String,
    /// Caller-supplied star data.
    pub star: Value,
}

/// Ordered chain of hash-linked blocks, genesis first.
pub struct Chain {
    blocks: RwLock<Vec<Block>>,
    config: ChainConfig,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chain")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Chain {
    /// Create a chain on the system clock and mint its genesis block.
    pub async fn new(config: ChainConfig) -> Result<Self, ChainError> {
        Self::with_clock(config, Arc::new(SystemClock)).await
    }

    /// Create a chain reading time from `clock` and mint its genesis block.
    pub async fn with_clock(config: ChainConfig, clock: Arc<dyn Clock>) -> Result<Self, ChainError> {
        let chain = Chain {
            blocks: RwLock::new(Vec::new()),
            config,
            clock,
        };
        chain.initialize_chain().await?;
        Ok(chain)
    }

    /// Append the genesis block if the chain is empty. No-op otherwise.
    pub async fn initialize_chain(&self) -> Result<(), ChainError> {
        let mut blocks = self.blocks.write().await;
        if !blocks.is_empty() {
            return Ok(());
        }
        let genesis = self.append_locked(&mut blocks, Block::genesis())?;
        info!(hash = genesis.hash.as_deref().unwrap_or_default(), "genesis block created");
        Ok(())
    }

    /// The configuration this chain was built with.
    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    /// Height of the tip block. Genesis is height 0.
    pub async fn chain_height(&self) -> u64 {
        let blocks = self.blocks.read().await;
        blocks.len().saturating_sub(1) as u64
    }

    /// The most recently appended block.
    pub async fn tip(&self) -> Option<Block> {
        self.blocks.read().await.last().cloned()
    }

    /// A snapshot of every block, in height order.
    pub async fn blocks(&self) -> Vec<Block> {
        self.blocks.read().await.clone()
    }

    /// Link, seal and append `block`, then re-validate the whole chain.
    ///
    /// # Errors
    ///
    /// [`ChainError::ChainValidation`] if the chain does not validate with
    /// the block in place. The block is removed again and the chain is
    /// exactly as it was before the call.
    pub async fn append_block(&self, block: Block) -> Result<Block, ChainError> {
        let mut blocks = self.blocks.write().await;
        self.append_locked(&mut blocks, block)
    }

    fn append_locked(&self, blocks: &mut Vec<Block>, mut block: Block) -> Result<Block, ChainError> {
        block.previous_block_hash = blocks.last().and_then(|tip| tip.hash.clone());
        block.time = self.clock.now_secs();
        block.height = blocks.len() as u64;
        block.hash = Some(block.compute_hash());

        blocks.push(block.clone());

        let issues = validate_blocks(blocks);
        if !issues.is_empty() {
            blocks.pop();
            warn!(
                height = block.height,
                issues = issues.len(),
                "chain failed validation after append, block rolled back"
            );
            return Err(ChainError::ChainValidation(issues));
        }

        debug!(
            height = block.height,
            hash = block.hash.as_deref().unwrap_or_default(),
            "block appended"
        );
        Ok(block)
    }

    /// The challenge a wallet must sign to prove it owns `address`.
    pub fn request_ownership_verification(&self, address: &str) -> String {
        format!(
            "{address}{sep}{time}{sep}{CHALLENGE_SUFFIX}",
            sep = CHALLENGE_SEPARATOR,
            time = self.clock.now_secs()
        )
    }

    /// Mint a block owning `star` for `address`.
    ///
    /// `message` must be a challenge previously issued for `address`, no
    /// older than the validation window, and `signature` must be the
    /// wallet's Bitcoin signed-message signature over it.
    ///
    /// # Errors
    ///
    /// - [`ChainError::InvalidMessage`] if `message` is not a challenge for `address`.
    /// - [`ChainError::FutureMessage`] if the challenge time is after now.
    /// - [`ChainError::ExpiredMessage`] if the window has elapsed.
    /// - [`ChainError::SignatureVerification`] if the signature does not prove ownership.
    /// - [`ChainError::ChainValidation`] if the append is rolled back.
    pub async fn submit_star(
        &self,
        address: &str,
        message: &str,
        signature: &str,
        star: Value,
    ) -> Result<Block, ChainError> {
        if let Err(e) = self.check_ownership_proof(address, message, signature) {
            warn!(address, error = %e, "star submission rejected");
            return Err(e);
        }

        let block = Block::new(&StarRecord {
            owner: address.to_string(),
            star,
        })?;
        let block = self.append_block(block).await?;
        info!(address, height = block.height, "star registered");
        Ok(block)
    }

    fn check_ownership_proof(
        &self,
        address: &str,
        message: &str,
        signature: &str,
    ) -> Result<(), ChainError> {
        let message_time = parse_challenge(address, message)?;
        let now = self.clock.now_secs();

        if message_time > now {
            return Err(ChainError::FutureMessage { message_time, now });
        }
        let elapsed_secs = now - message_time;
        if elapsed_secs >= self.config.validation_window_secs {
            return Err(ChainError::ExpiredMessage {
                elapsed_secs,
                window_secs: self.config.validation_window_secs,
            });
        }

        verify_message(address, message, signature)?;
        Ok(())
    }

    /// First block whose hash equals `hash`.
    pub async fn block_by_hash(&self, hash: &str) -> Option<Block> {
        let blocks = self.blocks.read().await;
        blocks
            .iter()
            .find(|b| b.hash.as_deref() == Some(hash))
            .cloned()
    }

    /// The block at `height`.
    pub async fn block_by_height(&self, height: u64) -> Option<Block> {
        let blocks = self.blocks.read().await;
        blocks.iter().find(|b| b.height == height).cloned()
    }

    /// Stars owned by `address`, in chain order.
    ///
    /// Every non-genesis block is decoded before filtering.
    ///
    /// # Errors
    ///
    /// [`ChainError::Decode`] if any block's body cannot be decoded.
    pub async fn stars_by_wallet_address(&self, address: &str) -> Result<Vec<Value>, ChainError> {
        let blocks = self.blocks.read().await;
        let mut stars = Vec::new();
        for block in blocks.iter().filter(|b| !b.is_genesis()) {
            let mut payload = block.decode_data()?;
            if payload.get("owner").and_then(Value::as_str) == Some(address) {
                stars.push(payload.get_mut("star").map(Value::take).unwrap_or(Value::Null));
            }
        }
        Ok(stars)
    }

    /// Check every block's hash and every link. An empty list means the
    /// chain is intact.
    pub async fn validate_chain(&self) -> Vec<ValidationIssue> {
        let blocks = self.blocks.read().await;
        validate_blocks(&blocks)
    }

    #[cfg(test)]
    pub(crate) async fn tamper(&self, height: u64, f: impl FnOnce(&mut Block)) {
        let mut blocks = self.blocks.write().await;
        if let Some(block) = blocks.iter_mut().find(|b| b.height == height) {
            f(block);
        }
    }
}

/// Full-chain integrity check. Issues are reported by chain position.
fn validate_blocks(blocks: &[Block]) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    for (position, block) in blocks.iter().enumerate() {
        let height = position as u64;
        if !block.validate() {
            issues.push(ValidationIssue::InvalidBlock {
                height,
                hash: block.hash.clone(),
            });
        }
        if let Some(previous) = position.checked_sub(1).map(|p| &blocks[p]) {
            if block.previous_block_hash != previous.hash {
                issues.push(ValidationIssue::BrokenLink {
                    height,
                    previous_height: height - 1,
                    expected: previous.hash.clone(),
                    found: block.previous_block_hash.clone(),
                });
            }
        }
    }
    issues
}

/// Extract the issue time from `<address>:<time>:starRegistry`.
fn parse_challenge(address: &str, message: &str) -> Result<u64, ChainError> {
    let mut parts = message.rsplitn(3, CHALLENGE_SEPARATOR);
    let (suffix, time, owner) = match (parts.next(), parts.next(), parts.next()) {
        (Some(suffix), Some(time), Some(owner)) => (suffix, time, owner),
        _ => {
            return Err(ChainError::InvalidMessage(format!(
                "expected <address>:<time>:{CHALLENGE_SUFFIX}, got {message:?}"
            )))
        }
    };

    if suffix != CHALLENGE_SUFFIX {
        return Err(ChainError::InvalidMessage(format!(
            "unexpected challenge suffix {suffix:?}"
        )));
    }
    if owner != address {
        return Err(ChainError::InvalidMessage(format!(
            "challenge was issued for {owner}, not {address}"
        )));
    }
    time.parse::<u64>()
        .map_err(|_| ChainError::InvalidMessage(format!("challenge time {time:?} is not a number")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
