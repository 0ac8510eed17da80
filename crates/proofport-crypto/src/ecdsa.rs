//! # ECDSA Recovery (secp256k1 / Ethereum)
//!
//! Every signature the engine verifies — the signing callback's signature
//! over `signalHash`, the EIP-712 `TransferWithAuthorization` signature —
//! is an Ethereum-style 65-byte `(r, s, v)` signature recovered against a
//! prehashed digest, never checked against a known public key directly.
//! `recover_address` is the single choke point both callers go through.

use crate::hashing::keccak256;
use crate::CryptoError;
use k256::ecdsa::{RecoveryId, Signature as K256Signature, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;

/// Recovers the checksummed-lowercase Ethereum address that produced
/// `signature` over `digest`.
///
/// `signature` must be 65 bytes: 32-byte `r`, 32-byte `s`, and a 1-byte
/// recovery id in either `{0,1}` or Ethereum's legacy `{27,28}` form.
pub fn recover_address(digest: &[u8; 32], signature: &[u8]) -> Result<String, CryptoError> {
    if signature.len() != 65 {
        return Err(CryptoError::InvalidSignatureFormat);
    }
    let (rs, v) = signature.split_at(64);
    let recovery_byte = v[0];
    let normalized = if recovery_byte >= 27 {
        recovery_byte - 27
    } else {
        recovery_byte
    };
    let recovery_id =
        RecoveryId::from_byte(normalized).ok_or(CryptoError::InvalidSignatureFormat)?;
    let sig = K256Signature::from_slice(rs).map_err(|_| CryptoError::InvalidSignatureFormat)?;

    let verifying_key = VerifyingKey::recover_from_prehash(digest, &sig, recovery_id)
        .map_err(|_| CryptoError::SignatureVerificationFailed)?;

    Ok(public_key_to_address(&verifying_key))
}

/// Derives the lowercase `0x`-prefixed Ethereum address for a public key:
/// the last 20 bytes of `keccak256(uncompressed_point[1..])`.
pub fn public_key_to_address(key: &VerifyingKey) -> String {
    let uncompressed = key.to_encoded_point(false);
    let hash = keccak256(&uncompressed.as_bytes()[1..]);
    format!("0x{}", hex::encode(&hash[12..]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::ecdsa::SigningKey;

    fn sign_prehash(signing_key: &SigningKey, digest: &[u8; 32]) -> Vec<u8> {
        let (sig, recid): (K256Signature, RecoveryId) =
            signing_key.sign_prehash_recoverable(digest).unwrap();
        let mut out = sig.to_bytes().to_vec();
        out.push(recid.to_byte());
        out
    }

    #[test]
    fn recovers_signer_address() {
        let signing_key = SigningKey::from_bytes(&[0x11u8; 32].into()).unwrap();
        let expected = public_key_to_address(signing_key.verifying_key());
        let digest = keccak256(b"zkproofport:demo.test:0xabc");
        let sig = sign_prehash(&signing_key, &digest);

        let recovered = recover_address(&digest, &sig).unwrap();
        assert_eq!(recovered, expected);
    }

    #[test]
    fn wrong_digest_recovers_different_address() {
        let signing_key = SigningKey::from_bytes(&[0x22u8; 32].into()).unwrap();
        let expected = public_key_to_address(signing_key.verifying_key());
        let digest = keccak256(b"message-one");
        let sig = sign_prehash(&signing_key, &digest);

        let other_digest = keccak256(b"message-two");
        let recovered = recover_address(&other_digest, &sig).unwrap();
        assert_ne!(recovered, expected);
    }

    #[test]
    fn rejects_short_signature() {
        let digest = [0u8; 32];
        assert!(recover_address(&digest, &[0u8; 10]).is_err());
    }
}
