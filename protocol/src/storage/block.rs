//! # Block Structure
//!
//! A block wraps one opaque payload and links to its predecessor by hash.
//!
//! ## Block Layout
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  hash:              Option<String>  (SHA-256 hex)        │
//! │  height:            u64             (genesis = 0)        │
//! │  body:              String          (hex of UTF-8 JSON)  │
//! │  time:              u64             (Unix seconds)       │
//! │  previousBlockHash: Option<String>  (None for genesis)   │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Hash Computation
//!
//! The block hash is the SHA-256 of the block's JSON serialization with
//! `hash` set to `null`. Because the payload is kept as hex text rather
//! than structured JSON, that serialization is byte-stable: any change to
//! any field, payload included, changes the hash.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::GENESIS_DATA;
use crate::crypto::hash::sha256_hex;
use crate::error::ChainError;

/// A single entry in the registry.
///
/// Created once by [`crate::storage::Chain::append_block`], which fills
/// in linkage, time, height and hash. Never modified afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// SHA-256 hex of the block with this field nulled. `None` until the
    /// block is appended.
    pub hash: Option<String>,
    /// Position in the chain.
    pub height: u64,
    /// Hex encoding of the UTF-8 JSON payload.
    pub body: String,
    /// Unix timestamp (seconds) of the append.
    pub time: u64,
    /// Hash of the block at `height - 1`. `None` for genesis.
    #[serde(rename = "previousBlockHash")]
    pub previous_block_hash: Option<String>,
}

/// Borrowed view of a block with `hash` forced to `null`; field names and
/// order match [`Block`].
#[derive(Serialize)]
struct HashPreimage<'a> {
    hash: Option<&'a str>,
    height: u64,
    body: &'a str,
    time: u64,
    #[serde(rename = "previousBlockHash")]
    previous_block_hash: Option<&'a str>,
}

impl Block {
    /// Wrap `data` in a new, unlinked block.
    ///
    /// The body is the hex encoding of `data`'s JSON serialization. Height,
    /// time, linkage and hash are left for the chain to fill in.
    ///
    /// # Errors
    ///
    /// [`ChainError::Encode`] if `data` cannot be serialized to JSON.
    pub fn new<T: Serialize + ?Sized>(data: &T) -> Result<Self, ChainError> {
        let json = serde_json::to_vec(data).map_err(|e| ChainError::Encode(e.to_string()))?;
        Ok(Self::from_body(hex::encode(json)))
    }

    /// The unlinked genesis block carrying `{"data": "Genesis Block"}`.
    pub fn genesis() -> Self {
        let payload = serde_json::json!({ "data": GENESIS_DATA });
        Self::from_body(hex::encode(payload.to_string()))
    }

    fn from_body(body: String) -> Self {
        Block {
            hash: None,
            height: 0,
            body,
            time: 0,
            previous_block_hash: None,
        }
    }

    /// Recompute the content hash from the current fields, ignoring the
    /// stored `hash`.
    pub fn compute_hash(&self) -> String {
        let preimage = HashPreimage {
            hash: None,
            height: self.height,
            body: &self.body,
            time: self.time,
            previous_block_hash: self.previous_block_hash.as_deref(),
        };
        sha256_hex(&serde_json::to_vec(&preimage).unwrap_or_default())
    }

    /// Whether the stored hash matches the block's content.
    ///
    /// A block that has never been hashed is not valid.
    pub fn validate(&self) -> bool {
        match &self.hash {
            Some(stored) => *stored == self.compute_hash(),
            None => false,
        }
    }

    /// Whether this is the genesis block.
    pub fn is_genesis(&self) -> bool {
        self.height == 0
    }

    /// Decode the payload as untyped JSON.
    ///
    /// # Errors
    ///
    /// - [`ChainError::GenesisBlock`] for the genesis block.
    /// - [`ChainError::Decode`] if the body is not hex-encoded UTF-8 JSON.
    pub fn decode_data(&self) -> Result<Value, ChainError> {
        self.decode_as()
    }

    /// Decode the payload into `T`. Same errors as [`Block::decode_data`],
    /// plus [`ChainError::Decode`] when the JSON does not fit `T`.
    pub fn decode_as<T: DeserializeOwned>(&self) -> Result<T, ChainError> {
        if self.is_genesis() {
            return Err(ChainError::GenesisBlock);
        }
        let bytes = hex::decode(&self.body).map_err(|e| self.decode_error(e))?;
        let text = String::from_utf8(bytes).map_err(|e| self.decode_error(e))?;
        serde_json::from_str(&text).map_err(|e| self.decode_error(e))
    }

    fn decode_error(&self, reason: impl ToString) -> ChainError {
        ChainError::Decode {
            height: self.height,
            reason: reason.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sealed(data: &Value, height: u64, previous: Option<&str>) -> Block {
        let mut block = Block::new(data).unwrap();
        block.height = height;
        block.time = 1_700_000_000;
        block.previous_block_hash = previous.map(str::to_string);
        block.hash = Some(block.compute_hash());
        block
    }

    #[test]
    fn new_block_is_unlinked() {
        let block = Block::new(&json!({"star": "Orion"})).unwrap();
        assert_eq!(block.hash, None);
        assert_eq!(block.height, 0);
        assert_eq!(block.time, 0);
        assert_eq!(block.previous_block_hash, None);
    }

    #[test]
    fn body_is_hex_of_json() {
        let block = Block::new(&json!({"a": 1})).unwrap();
        assert_eq!(block.body, hex::encode(r#"{"a":1}"#));
    }

    #[test]
    fn genesis_payload() {
        let genesis = Block::genesis();
        let text = String::from_utf8(hex::decode(&genesis.body).unwrap()).unwrap();
        let payload: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(payload, json!({"data": "Genesis Block"}));
        assert!(genesis.is_genesis());
    }

    #[test]
    fn unhashed_block_does_not_validate() {
        assert!(!Block::genesis().validate());
    }

    #[test]
    fn sealed_block_validates() {
        let block = sealed(&json!({"owner": "a"}), 1, Some("00"));
        assert!(block.validate());
    }

    #[test]
    fn hash_ignores_stored_hash_field() {
        let block = sealed(&json!({"owner": "a"}), 1, Some("00"));
        let mut copy = block.clone();
        copy.hash = Some("ff".repeat(32));
        assert_eq!(block.compute_hash(), copy.compute_hash());
        assert!(!copy.validate());
    }

    #[test]
    fn validate_does_not_mutate() {
        let block = sealed(&json!({"owner": "a"}), 3, Some("00"));
        let before = block.clone();
        assert!(block.validate());
        assert_eq!(block, before);
    }

    #[test]
    fn tampering_any_field_invalidates() {
        let block = sealed(&json!({"owner": "a"}), 2, Some("00"));

        let mut body = block.clone();
        body.body = hex::encode(r#"{"owner":"b"}"#);
        assert!(!body.validate());

        let mut height = block.clone();
        height.height = 3;
        assert!(!height.validate());

        let mut time = block.clone();
        time.time += 1;
        assert!(!time.validate());

        let mut link = block.clone();
        link.previous_block_hash = None;
        assert!(!link.validate());
    }

    #[test]
    fn hash_is_deterministic() {
        let a = sealed(&json!({"x": [1, 2, 3]}), 1, Some("00"));
        let b = sealed(&json!({"x": [1, 2, 3]}), 1, Some("00"));
        assert_eq!(a.hash, b.hash);
        assert_eq!(a.hash.as_ref().map(String::len), Some(64));
    }

    #[test]
    fn decode_returns_original_payload() {
        let payload = json!({"owner": "1A2b3C", "star": {"dec": "68° 52' 56.9", "ra": "16h 29m 1.0s", "story": "found"}});
        let block = sealed(&payload, 1, Some("00"));
        assert_eq!(block.decode_data().unwrap(), payload);
    }

    #[test]
    fn decode_genesis_fails() {
        let mut genesis = Block::genesis();
        genesis.hash = Some(genesis.compute_hash());
        assert!(matches!(genesis.decode_data(), Err(ChainError::GenesisBlock)));
    }

    #[test]
    fn decode_malformed_hex_fails() {
        let mut block = sealed(&json!({}), 4, Some("00"));
        block.body = "zz".into();
        assert!(matches!(
            block.decode_data(),
            Err(ChainError::Decode { height: 4, .. })
        ));
    }

    #[test]
    fn decode_non_json_fails() {
        let mut block = sealed(&json!({}), 1, Some("00"));
        block.body = hex::encode("not json");
        assert!(matches!(block.decode_data(), Err(ChainError::Decode { .. })));
    }

    #[test]
    fn decode_invalid_utf8_fails() {
        let mut block = sealed(&json!({}), 1, Some("00"));
        block.body = hex::encode([0xff, 0xfe]);
        assert!(matches!(block.decode_data(), Err(ChainError::Decode { .. })));
    }

    #[test]
    fn decode_as_typed() {
        #[derive(Deserialize, Debug, PartialEq)]
        struct Payload {
            owner: String,
        }
        let block = sealed(&json!({"owner": "abc"}), 1, Some("00"));
        let payload: Payload = block.decode_as().unwrap();
        assert_eq!(payload.owner, "abc");
    }

    #[test]
    fn unencodable_payload_is_rejected() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(vec![1u8], "value");
        assert!(matches!(Block::new(&map), Err(ChainError::Encode(_))));
    }

    #[test]
    fn serializes_with_camel_case_link() {
        let block = sealed(&json!({}), 1, Some("00"));
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["previousBlockHash"], "00");
        assert!(json.get("previous_block_hash").is_none());

        let recovered: Block = serde_json::from_value(json).unwrap();
        assert_eq!(recovered, block);
        assert!(recovered.validate());
    }
}
