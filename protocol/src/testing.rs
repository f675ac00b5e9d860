//! Test support: a deterministic wallet that signs Bitcoin messages.
//!
//! Only compiled for this crate's tests or with the `test-util` feature.

use base64ct::{Base64, Encoding};
use k256::ecdsa::SigningKey;

use crate::crypto::address::{p2pkh_address, p2sh_p2wpkh_address, p2wpkh_address};
use crate::crypto::message::{message_digest, pubkey_hash};

/// Which address (and signature header) the wallet uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddressKind {
    P2pkhUncompressed,
    P2pkhCompressed,
    P2shP2wpkh,
    P2wpkh,
}

impl AddressKind {
    fn header_base(self) -> u8 {
        match self {
            AddressKind::P2pkhUncompressed => 27,
            AddressKind::P2pkhCompressed => 31,
            AddressKind::P2shP2wpkh => 35,
            AddressKind::P2wpkh => 39,
        }
    }

    fn compressed(self) -> bool {
        !matches!(self, AddressKind::P2pkhUncompressed)
    }
}

/// A secp256k1 key derived from a one-byte seed.
pub struct TestWallet {
    key: SigningKey,
    kind: AddressKind,
}

impl TestWallet {
    /// Build a wallet whose secret scalar is `[seed; 32]`. `seed` must lie
    /// in `1..=0xfe` for that to be a valid scalar.
    pub fn new(seed: u8, kind: AddressKind) -> Self {
        let key = SigningKey::from_slice(&[seed; 32]).expect("seed in 1..=0xfe is a valid scalar");
        Self { key, kind }
    }

    /// The wallet's address in its configured format.
    pub fn address(&self) -> String {
        let hash = pubkey_hash(self.key.verifying_key(), self.kind.compressed());
        match self.kind {
            AddressKind::P2pkhUncompressed | AddressKind::P2pkhCompressed => p2pkh_address(&hash),
            AddressKind::P2shP2wpkh => p2sh_p2wpkh_address(&hash),
            AddressKind::P2wpkh => p2wpkh_address(&hash).expect("20-byte program encodes"),
        }
    }

    /// Sign `message`, returning the base64 compact signature.
    pub fn sign(&self, message: &str) -> String {
        let (signature, recovery_id) = self
            .key
            .sign_prehash_recoverable(&message_digest(message))
            .expect("signing a 32-byte digest");
        let mut raw = Vec::with_capacity(65);
        raw.push(self.kind.header_base() + recovery_id.to_byte());
        raw.extend_from_slice(&signature.to_bytes());
        Base64::encode_string(&raw)
    }
}
