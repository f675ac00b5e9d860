//! # Bitcoin Addresses
//!
//! Wallet addresses own stars. The registry never derives keys for them;
//! it only needs to decode an address far enough to compare it against
//! the key hash recovered from a signature.
//!
//! Two encodings are understood:
//!
//! ```text
//! base58check  version(1) || hash160(20) || checksum(4)   P2PKH / P2SH
//! bech32       hrp "1" witness_version program(20)         P2WPKH (v0)
//! ```
//!
//! The version byte and HRP are kept but not enforced, so mainnet,
//! testnet and regtest addresses all decode.

use bech32::{hrp, segwit, Hrp};
use thiserror::Error;

use super::hash::hash160;

/// Base58 version byte of a mainnet P2PKH address (`1...`).
pub const P2PKH_VERSION: u8 = 0x00;

/// Base58 version byte of a mainnet P2SH address (`3...`).
pub const P2SH_VERSION: u8 = 0x05;

/// Length of a key hash or script hash in bytes.
pub const HASH160_LENGTH: usize = 20;

/// Errors decoding or encoding an address.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("address is neither base58check nor bech32: {0}")]
    Unrecognized(String),

    #[error("address payload must be 20 bytes, got {0}")]
    InvalidPayloadLength(usize),

    #[error("unsupported witness version {0}")]
    UnsupportedWitnessVersion(char),

    #[error("bech32 encoding failed: {0}")]
    Encoding(String),
}

/// A decoded wallet address.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Address {
    /// Legacy base58check address. `hash` is either a public key hash
    /// (P2PKH) or a script hash (P2SH); the version byte tells which.
    Base58 { version: u8, hash: [u8; 20] },
    /// Native segwit v0 key-hash address.
    Segwit { hrp: String, program: [u8; 20] },
}

impl Address {
    /// Decode an address string. Bech32 is tried first, then base58check.
    pub fn parse(address: &str) -> Result<Self, AddressError> {
        if let Ok((hrp, version, program)) = segwit::decode(address) {
            if version != segwit::VERSION_0 {
                return Err(AddressError::UnsupportedWitnessVersion(version.to_char()));
            }
            return Ok(Address::Segwit {
                hrp: hrp.to_string(),
                program: to_hash160(&program)?,
            });
        }

        let raw = bs58::decode(address)
            .with_check(None)
            .into_vec()
            .map_err(|_| AddressError::Unrecognized(address.to_string()))?;
        let (version, payload) = raw
            .split_first()
            .ok_or(AddressError::InvalidPayloadLength(0))?;

        Ok(Address::Base58 {
            version: *version,
            hash: to_hash160(payload)?,
        })
    }

    /// The 20-byte hash this address commits to.
    pub fn hash(&self) -> &[u8; 20] {
        match self {
            Address::Base58 { hash, .. } => hash,
            Address::Segwit { program, .. } => program,
        }
    }

    /// Whether this is a native segwit address.
    pub fn is_segwit(&self) -> bool {
        matches!(self, Address::Segwit { .. })
    }
}

fn to_hash160(bytes: &[u8]) -> Result<[u8; 20], AddressError> {
    if bytes.len() != HASH160_LENGTH {
        return Err(AddressError::InvalidPayloadLength(bytes.len()));
    }
    let mut out = [0u8; 20];
    out.copy_from_slice(bytes);
    Ok(out)
}

/// HASH160 of the P2WPKH redeem script `OP_0 PUSH20 <pubkey_hash>`.
///
/// This is what a P2SH-wrapped segwit address (`3...`) commits to.
pub fn segwit_redeem_hash(pubkey_hash: &[u8; 20]) -> [u8; 20] {
    let mut script = Vec::with_capacity(HASH160_LENGTH + 2);
    script.push(0x00);
    script.push(0x14);
    script.extend_from_slice(pubkey_hash);
    hash160(&script)
}

/// Encode a mainnet P2PKH address for a public key hash.
pub fn p2pkh_address(pubkey_hash: &[u8; 20]) -> String {
    base58_address(P2PKH_VERSION, pubkey_hash)
}

/// Encode a mainnet P2SH-P2WPKH address for a public key hash.
pub fn p2sh_p2wpkh_address(pubkey_hash: &[u8; 20]) -> String {
    base58_address(P2SH_VERSION, &segwit_redeem_hash(pubkey_hash))
}

/// Encode a mainnet native segwit (bech32, `bc1q...`) address.
pub fn p2wpkh_address(pubkey_hash: &[u8; 20]) -> Result<String, AddressError> {
    p2wpkh_address_with_hrp(hrp::BC, pubkey_hash)
}

/// Encode a native segwit address under an arbitrary HRP.
pub fn p2wpkh_address_with_hrp(hrp: Hrp, pubkey_hash: &[u8; 20]) -> Result<String, AddressError> {
    segwit::encode_v0(hrp, pubkey_hash).map_err(|e| AddressError::Encoding(e.to_string()))
}

fn base58_address(version: u8, hash: &[u8; 20]) -> String {
    let mut payload = Vec::with_capacity(HASH160_LENGTH + 1);
    payload.push(version);
    payload.extend_from_slice(hash);
    bs58::encode(payload).with_check().into_string()
}
