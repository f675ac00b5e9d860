//! Error types for the registry.
//!
//! Every chain operation that can fail returns a [`ChainError`]. Integrity
//! defects found by a full-chain check are not errors; they are reported
//! as a list of [`ValidationIssue`]s, and only become a [`ChainError`] when
//! an append would leave the chain in that state.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::SignatureError;

/// Errors returned by block and chain operations.
#[derive(Debug, Error)]
pub enum ChainError {
    /// The genesis block carries no star payload.
    #[error("the genesis block has no star data")]
    GenesisBlock,

    /// A block body is not hex-encoded UTF-8 JSON of the expected shape.
    #[error("malformed block body at height {height}: {reason}")]
    Decode {
        /// Height of the offending block.
        height: u64,
        /// What went wrong.
        reason: String,
    },

    /// The payload could not be serialized into a block body.
    #[error("payload could not be encoded: {0}")]
    Encode(String),

    /// The chain failed its integrity check after an append; the append
    /// was rolled back.
    #[error("chain validation failed: {}", join_issues(.0))]
    ChainValidation(Vec<ValidationIssue>),

    /// The challenge is not of the form `<address>:<time>:starRegistry`
    /// for the submitting address.
    #[error("invalid ownership message: {0}")]
    InvalidMessage(String),

    /// The challenge timestamp lies after the current time.
    #[error("message time {message_time} is ahead of current time {now}")]
    FutureMessage {
        /// Timestamp embedded in the message.
        message_time: u64,
        /// Current time when the submission was checked.
        now: u64,
    },

    /// The challenge is older than the validation window.
    #[error("message expired: {elapsed_secs}s elapsed (window: {window_secs}s)")]
    ExpiredMessage {
        /// Seconds since the challenge was issued.
        elapsed_secs: u64,
        /// Configured validation window.
        window_secs: u64,
    },

    /// The wallet signature does not prove ownership of the address.
    #[error("signature verification failed: {0}")]
    SignatureVerification(#[from] SignatureError),
}

fn join_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A single integrity defect found while validating the chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationIssue {
    /// The block's stored hash does not match its content.
    InvalidBlock {
        height: u64,
        hash: Option<String>,
    },
    /// The block does not point at its predecessor's hash.
    BrokenLink {
        height: u64,
        previous_height: u64,
        expected: Option<String>,
        found: Option<String>,
    },
}

impl ValidationIssue {
    /// Height of the block the issue was found on.
    pub fn height(&self) -> u64 {
        match self {
            ValidationIssue::InvalidBlock { height, .. }
            | ValidationIssue::BrokenLink { height, .. } => *height,
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::InvalidBlock { height, hash } => write!(
                f,
                "block {} is invalid (stored hash {})",
                height,
                hash.as_deref().unwrap_or("none")
            ),
            ValidationIssue::BrokenLink {
                height,
                previous_height,
                expected,
                found,
            } => write!(
                f,
                "block {} does not link to block {}: expected previous hash {}, found {}",
                height,
                previous_height,
                expected.as_deref().unwrap_or("none"),
                found.as_deref().unwrap_or("none")
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_display_names_heights() {
        let issue = ValidationIssue::BrokenLink {
            height: 3,
            previous_height: 2,
            expected: Some("aa".into()),
            found: None,
        };
        let text = issue.to_string();
        assert!(text.contains("block 3"));
        assert!(text.contains("block 2"));
        assert!(text.contains("found none"));
        assert_eq!(issue.height(), 3);
    }

    #[test]
    fn chain_validation_error_lists_every_issue() {
        let err = ChainError::ChainValidation(vec![
            ValidationIssue::InvalidBlock {
                height: 1,
                hash: Some("ab".into()),
            },
            ValidationIssue::InvalidBlock {
                height: 2,
                hash: None,
            },
        ]);
        let text = err.to_string();
        assert!(text.contains("block 1 is invalid"));
        assert!(text.contains("block 2 is invalid"));
    }

    #[test]
    fn issue_serializes_with_kind_tag() {
        let issue = ValidationIssue::InvalidBlock {
            height: 1,
            hash: Some("ab".into()),
        };
        let json = serde_json::to_value(&issue).unwrap();
        assert_eq!(json["kind"], "invalid_block");
        assert_eq!(json["height"], 1);
    }
}
