//! # Bitcoin Signed Messages
//!
//! Proof of address ownership. A wallet signs the registry's challenge
//! string with the key behind its address; the registry recovers the
//! public key from the signature and checks that it hashes to the address.
//!
//! ## Wire Format
//!
//! ```text
//! base64( header(1) || r(32) || s(32) )
//!
//! header 27..=30   P2PKH, uncompressed key
//! header 31..=34   P2PKH, compressed key
//! header 35..=38   segwit, P2SH-P2WPKH
//! header 39..=42   segwit, native P2WPKH
//! recovery id    = (header - 27) & 3
//! ```
//!
//! The signed digest is
//! `SHA256d(varint(24) || "Bitcoin Signed Message:\n" || varint(len) || message)`,
//! the same as Bitcoin Core, Electrum and bitcoinjs-message produce.

use base64ct::{Base64, Encoding};
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::PublicKey;
use thiserror::Error;

use super::address::{segwit_redeem_hash, Address, AddressError};
use super::hash::{double_sha256, hash160};

/// Prefix mixed into every signed-message digest.
pub const MESSAGE_MAGIC: &str = "Bitcoin Signed Message:\n";

/// Length of a compact recoverable signature in bytes.
pub const COMPACT_SIGNATURE_LENGTH: usize = 65;

/// Lowest valid header byte.
const HEADER_BASE: u8 = 27;

/// Errors verifying a signed message.
#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("signature is not valid base64")]
    InvalidEncoding,

    #[error("signature must be 65 bytes, got {0}")]
    InvalidLength(usize),

    #[error("invalid signature header byte {0}")]
    InvalidHeader(u8),

    #[error("malformed signature: {0}")]
    Malformed(String),

    #[error("public key could not be recovered from signature")]
    Unrecoverable,

    #[error(transparent)]
    Address(#[from] AddressError),

    #[error("signature was not produced by the key behind {0}")]
    AddressMismatch(String),
}

/// Address type a signature's header byte declares.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignatureKind {
    /// Legacy header (27..=34). Also used by Electrum for segwit wallets.
    Legacy,
    /// P2SH-wrapped segwit header (35..=38).
    P2shP2wpkh,
    /// Native segwit header (39..=42).
    P2wpkh,
}

/// The decoded 65-byte signature header and body.
#[derive(Clone, Debug)]
pub struct CompactSignature {
    pub signature: Signature,
    pub recovery_id: RecoveryId,
    pub compressed: bool,
    pub kind: SignatureKind,
}

impl CompactSignature {
    /// Decode a base64 compact signature.
    pub fn from_base64(encoded: &str) -> Result<Self, SignatureError> {
        let raw = Base64::decode_vec(encoded.trim()).map_err(|_| SignatureError::InvalidEncoding)?;
        Self::from_bytes(&raw)
    }

    /// Decode the raw 65-byte form.
    pub fn from_bytes(raw: &[u8]) -> Result<Self, SignatureError> {
        if raw.len() != COMPACT_SIGNATURE_LENGTH {
            return Err(SignatureError::InvalidLength(raw.len()));
        }

        let flag = raw[0]
            .checked_sub(HEADER_BASE)
            .filter(|f| *f <= 15)
            .ok_or(SignatureError::InvalidHeader(raw[0]))?;

        let kind = if flag & 8 == 0 {
            SignatureKind::Legacy
        } else if flag & 4 == 0 {
            SignatureKind::P2shP2wpkh
        } else {
            SignatureKind::P2wpkh
        };

        let recovery_id =
            RecoveryId::from_byte(flag & 3).ok_or(SignatureError::InvalidHeader(raw[0]))?;
        let signature =
            Signature::from_slice(&raw[1..]).map_err(|e| SignatureError::Malformed(e.to_string()))?;

        Ok(CompactSignature {
            signature,
            recovery_id,
            compressed: flag & 12 != 0,
            kind,
        })
    }

    /// Recover the signer's public key for a message digest.
    ///
    /// High-S signatures are normalized first; normalizing negates `s`,
    /// which flips the parity bit of the recovery id.
    pub fn recover(&self, digest: &[u8; 32]) -> Result<VerifyingKey, SignatureError> {
        let (signature, recovery_id) = match self.signature.normalize_s() {
            Some(normalized) => (
                normalized,
                RecoveryId::new(!self.recovery_id.is_y_odd(), self.recovery_id.is_x_reduced()),
            ),
            None => (self.signature, self.recovery_id),
        };
        VerifyingKey::recover_from_prehash(digest, &signature, recovery_id)
            .map_err(|_| SignatureError::Unrecoverable)
    }
}

/// Compute the signed-message digest for `message`.
pub fn message_digest(message: &str) -> [u8; 32] {
    let mut preimage = Vec::with_capacity(MESSAGE_MAGIC.len() + message.len() + 10);
    write_varint(&mut preimage, MESSAGE_MAGIC.len() as u64);
    preimage.extend_from_slice(MESSAGE_MAGIC.as_bytes());
    write_varint(&mut preimage, message.len() as u64);
    preimage.extend_from_slice(message.as_bytes());
    double_sha256(&preimage)
}

/// Bitcoin `CompactSize` encoding.
fn write_varint(buf: &mut Vec<u8>, n: u64) {
    match n {
        0..=0xfc => buf.push(n as u8),
        0xfd..=0xffff => {
            buf.push(0xfd);
            buf.extend_from_slice(&(n as u16).to_le_bytes());
        }
        0x1_0000..=0xffff_ffff => {
            buf.push(0xfe);
            buf.extend_from_slice(&(n as u32).to_le_bytes());
        }
        _ => {
            buf.push(0xff);
            buf.extend_from_slice(&n.to_le_bytes());
        }
    }
}

/// HASH160 of a public key in the serialization the signature header selects.
pub fn pubkey_hash(key: &VerifyingKey, compressed: bool) -> [u8; 20] {
    let point = PublicKey::from(key).to_encoded_point(compressed);
    hash160(point.as_bytes())
}

/// Verify that `signature` over `message` was produced by the owner of
/// `address`.
///
/// Accepts legacy P2PKH signatures, BIP137 segwit signatures (P2SH-P2WPKH
/// and native P2WPKH headers), and Electrum-style signatures that carry a
/// legacy header for a segwit address.
pub fn verify_message(address: &str, message: &str, signature: &str) -> Result<(), SignatureError> {
    let compact = CompactSignature::from_base64(signature)?;
    let key = compact.recover(&message_digest(message))?;
    let key_hash = pubkey_hash(&key, compact.compressed);
    let decoded = Address::parse(address)?;

    let matches = match (compact.kind, &decoded) {
        (SignatureKind::P2wpkh, Address::Segwit { program, .. }) => *program == key_hash,
        (SignatureKind::P2wpkh, Address::Base58 { .. }) => false,
        (SignatureKind::P2shP2wpkh, Address::Base58 { hash, .. }) => {
            *hash == segwit_redeem_hash(&key_hash)
        }
        (SignatureKind::P2shP2wpkh, Address::Segwit { .. }) => false,
        (SignatureKind::Legacy, Address::Segwit { program, .. }) => *program == key_hash,
        (SignatureKind::Legacy, Address::Base58 { hash, .. }) => {
            *hash == key_hash || *hash == segwit_redeem_hash(&key_hash)
        }
    };

    if matches {
        Ok(())
    } else {
        Err(SignatureError::AddressMismatch(address.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{AddressKind, TestWallet};

    const MESSAGE: &str = "1A2b3C:1700000000:starRegistry";

    #[test]
    fn digest_matches_manual_construction() {
        let mut preimage = vec![24u8];
        preimage.extend_from_slice(b"Bitcoin Signed Message:\n");
        preimage.push(5);
        preimage.extend_from_slice(b"hello");
        assert_eq!(message_digest("hello"), double_sha256(&preimage));
    }

    #[test]
    fn varint_boundaries() {
        let mut buf = Vec::new();
        write_varint(&mut buf, 0xfc);
        assert_eq!(buf, vec![0xfc]);

        buf.clear();
        write_varint(&mut buf, 0xfd);
        assert_eq!(buf, vec![0xfd, 0xfd, 0x00]);

        buf.clear();
        write_varint(&mut buf, 0x1_0000);
        assert_eq!(buf, vec![0xfe, 0x00, 0x00, 0x01, 0x00]);
    }

    #[test]
    fn long_message_digest_uses_multibyte_length() {
        let message = "x".repeat(300);
        assert_ne!(message_digest(&message), message_digest(&message[..299]));
    }

    #[test]
    fn verifies_every_address_kind() {
        for kind in [
            AddressKind::P2pkhCompressed,
            AddressKind::P2pkhUncompressed,
            AddressKind::P2shP2wpkh,
            AddressKind::P2wpkh,
        ] {
            let wallet = TestWallet::new(7, kind);
            let signature = wallet.sign(MESSAGE);
            assert!(
                verify_message(&wallet.address(), MESSAGE, &signature).is_ok(),
                "{kind:?} signature should verify"
            );
        }
    }

    #[test]
    fn electrum_style_legacy_header_verifies_segwit_addresses() {
        let wallet = TestWallet::new(11, AddressKind::P2pkhCompressed);
        let signature = wallet.sign(MESSAGE);

        let native = TestWallet::new(11, AddressKind::P2wpkh).address();
        let wrapped = TestWallet::new(11, AddressKind::P2shP2wpkh).address();

        assert!(verify_message(&native, MESSAGE, &signature).is_ok());
        assert!(verify_message(&wrapped, MESSAGE, &signature).is_ok());
    }

    #[test]
    fn segwit_header_rejects_legacy_address() {
        let signer = TestWallet::new(3, AddressKind::P2wpkh);
        let legacy = TestWallet::new(3, AddressKind::P2pkhCompressed).address();
        let err = verify_message(&legacy, MESSAGE, &signer.sign(MESSAGE)).unwrap_err();
        assert!(matches!(err, SignatureError::AddressMismatch(_)));
    }

    #[test]
    fn altered_message_fails() {
        let wallet = TestWallet::new(5, AddressKind::P2pkhCompressed);
        let signature = wallet.sign(MESSAGE);
        let err =
            verify_message(&wallet.address(), "1A2b3C:1700000001:starRegistry", &signature)
                .unwrap_err();
        assert!(matches!(
            err,
            SignatureError::AddressMismatch(_) | SignatureError::Unrecoverable
        ));
    }

    #[test]
    fn other_wallet_address_fails() {
        let signer = TestWallet::new(5, AddressKind::P2pkhCompressed);
        let other = TestWallet::new(6, AddressKind::P2pkhCompressed);
        let err = verify_message(&other.address(), MESSAGE, &signer.sign(MESSAGE)).unwrap_err();
        assert!(matches!(err, SignatureError::AddressMismatch(_)));
    }

    #[test]
    fn compression_flag_matters() {
        // Same key, but the uncompressed address hashes a different encoding.
        let signer = TestWallet::new(9, AddressKind::P2pkhCompressed);
        let uncompressed = TestWallet::new(9, AddressKind::P2pkhUncompressed).address();
        assert!(verify_message(&uncompressed, MESSAGE, &signer.sign(MESSAGE)).is_err());
    }

    #[test]
    fn rejects_non_base64() {
        let wallet = TestWallet::new(1, AddressKind::P2pkhCompressed);
        let err = verify_message(&wallet.address(), MESSAGE, "not base64!!").unwrap_err();
        assert!(matches!(err, SignatureError::InvalidEncoding));
    }

    #[test]
    fn rejects_wrong_length() {
        let short = Base64::encode_string(&[31u8; 64]);
        let err = CompactSignature::from_base64(&short).unwrap_err();
        assert!(matches!(err, SignatureError::InvalidLength(64)));
    }

    #[test]
    fn rejects_out_of_range_header() {
        let mut raw = [1u8; 65];
        raw[0] = 43;
        assert!(matches!(
            CompactSignature::from_bytes(&raw).unwrap_err(),
            SignatureError::InvalidHeader(43)
        ));
        raw[0] = 26;
        assert!(matches!(
            CompactSignature::from_bytes(&raw).unwrap_err(),
            SignatureError::InvalidHeader(26)
        ));
    }

    #[test]
    fn header_decoding() {
        let wallet = TestWallet::new(2, AddressKind::P2shP2wpkh);
        let compact = CompactSignature::from_base64(&wallet.sign(MESSAGE)).unwrap();
        assert_eq!(compact.kind, SignatureKind::P2shP2wpkh);
        assert!(compact.compressed);

        let wallet = TestWallet::new(2, AddressKind::P2pkhUncompressed);
        let compact = CompactSignature::from_base64(&wallet.sign(MESSAGE)).unwrap();
        assert_eq!(compact.kind, SignatureKind::Legacy);
        assert!(!compact.compressed);
    }

    #[test]
    fn undecodable_address_is_reported() {
        let wallet = TestWallet::new(4, AddressKind::P2pkhCompressed);
        let err = verify_message("1A2b3C", MESSAGE, &wallet.sign(MESSAGE)).unwrap_err();
        assert!(matches!(err, SignatureError::Address(_)));
    }

    // Signatures published with bitcoinjs-message. One secp256k1 key signs
    // the same text with header 31 (P2PKH), 35 (P2SH-P2WPKH) and 39 (P2WPKH).
    const WALLET_MESSAGE: &str = "This is an example of a signed message.";
    const WALLET_P2PKH: &str = "1F3sAm6ZtwLAUnj7d38pGFxtP3RVEvtsbV";
    const WALLET_P2SH_P2WPKH: &str = "3DnW8JGpPViEZdpqat8qky1zc26EKbXnmM";
    const WALLET_P2WPKH: &str = "bc1qngw83fg8dz0k749cg7k3emc7v98wy0c74dlrkd";
    const WALLET_SIG_LEGACY: &str =
        "H9L5yLFjti0QTHhPyFrZCT1V/MMnBtXKmoiKDZ78NDBjERki6ZTQZdSMCtkgoNmp17By9ItJr8o7ChX0XxY91nk=";
    const WALLET_SIG_P2SH_P2WPKH: &str =
        "I9L5yLFjti0QTHhPyFrZCT1V/MMnBtXKmoiKDZ78NDBjERki6ZTQZdSMCtkgoNmp17By9ItJr8o7ChX0XxY91nk=";
    const WALLET_SIG_P2WPKH: &str =
        "J9L5yLFjti0QTHhPyFrZCT1V/MMnBtXKmoiKDZ78NDBjERki6ZTQZdSMCtkgoNmp17By9ItJr8o7ChX0XxY91nk=";

    #[test]
    fn wallet_legacy_signature_verifies() {
        let compact = CompactSignature::from_base64(WALLET_SIG_LEGACY).unwrap();
        assert_eq!(compact.kind, SignatureKind::Legacy);
        assert!(compact.compressed);
        verify_message(WALLET_P2PKH, WALLET_MESSAGE, WALLET_SIG_LEGACY).unwrap();
    }

    #[test]
    fn wallet_p2sh_p2wpkh_signature_verifies() {
        let compact = CompactSignature::from_base64(WALLET_SIG_P2SH_P2WPKH).unwrap();
        assert_eq!(compact.kind, SignatureKind::P2shP2wpkh);
        verify_message(WALLET_P2SH_P2WPKH, WALLET_MESSAGE, WALLET_SIG_P2SH_P2WPKH).unwrap();
    }

    #[test]
    fn wallet_p2wpkh_signature_verifies() {
        let compact = CompactSignature::from_base64(WALLET_SIG_P2WPKH).unwrap();
        assert_eq!(compact.kind, SignatureKind::P2wpkh);
        verify_message(WALLET_P2WPKH, WALLET_MESSAGE, WALLET_SIG_P2WPKH).unwrap();
    }

    #[test]
    fn wallet_legacy_signature_verifies_segwit_addresses() {
        verify_message(WALLET_P2SH_P2WPKH, WALLET_MESSAGE, WALLET_SIG_LEGACY).unwrap();
        verify_message(WALLET_P2WPKH, WALLET_MESSAGE, WALLET_SIG_LEGACY).unwrap();
    }

    #[test]
    fn wallet_signatures_reject_mismatches() {
        let err = verify_message(WALLET_P2PKH, WALLET_MESSAGE, WALLET_SIG_P2SH_P2WPKH).unwrap_err();
        assert!(matches!(err, SignatureError::AddressMismatch(_)));

        let err = verify_message(WALLET_P2PKH, WALLET_MESSAGE, WALLET_SIG_P2WPKH).unwrap_err();
        assert!(matches!(err, SignatureError::AddressMismatch(_)));

        let err = verify_message(WALLET_P2PKH, "This is an example of a signed message!", WALLET_SIG_LEGACY)
            .unwrap_err();
        assert!(matches!(
            err,
            SignatureError::AddressMismatch(_) | SignatureError::Unrecoverable
        ));
    }
}
