//! # Attestation Verification
//!
//! Four independent checks, conjoined into `is_valid`: the certificate
//! chain terminates at the pinned root, every certificate is within its
//! validity window, the COSE-Sign1 signature matches the leaf key, and
//! `userData` carries the expected proof hash.

use crate::cose::{chain_from_sign1, parse_sign1, verify_signature};
use crate::errors::AttestError;
use crate::payload::AttestationPayload;
use p384::ecdsa::VerifyingKey;
use x509_parser::prelude::*;

#[derive(Debug, Clone)]
pub struct Verification {
    pub certificate_chain_valid: bool,
    pub certificates_in_validity_window: bool,
    pub signature_valid: bool,
    pub user_data_matches: bool,
}

impl Verification {
    pub fn is_valid(&self) -> bool {
        self.certificate_chain_valid
            && self.certificates_in_validity_window
            && self.signature_valid
            && self.user_data_matches
    }
}

#[derive(Debug, Clone)]
pub struct Parsed {
    pub payload: AttestationPayload,
    pub chain_der: Vec<Vec<u8>>,
}

pub fn parse(document: &[u8]) -> Result<Parsed, AttestError> {
    let sign1 = parse_sign1(document)?;
    let payload_bytes = sign1
        .payload
        .as_ref()
        .ok_or_else(|| AttestError::Cbor("missing COSE-Sign1 payload".to_string()))?;
    let payload = AttestationPayload::from_cbor(payload_bytes)
        .map_err(|err| AttestError::Cbor(err.to_string()))?;
    let chain_der = chain_from_sign1(&sign1).unwrap_or_default();
    Ok(Parsed { payload, chain_der })
}

/// Verifies a real Nitro-shaped document: chain to `root_der`, each
/// certificate's validity window, and the COSE signature against the
/// leaf's public key.
pub fn verify_nitro(
    document: &[u8],
    root_der: &[u8],
    expected_proof_hash: &str,
) -> Result<Verification, AttestError> {
    let sign1 = parse_sign1(document)?;
    let payload_bytes = sign1
        .payload
        .as_ref()
        .ok_or_else(|| AttestError::Cbor("missing COSE-Sign1 payload".to_string()))?;
    let payload = AttestationPayload::from_cbor(payload_bytes)
        .map_err(|err| AttestError::Cbor(err.to_string()))?;
    let chain = chain_from_sign1(&sign1).unwrap_or_default();

    let certificate_chain_valid = chain_terminates_at_root(&chain, root_der);
    let certificates_in_validity_window = chain.iter().all(|der| certificate_in_window(der));

    let signature_valid = chain
        .first()
        .and_then(|leaf_der| leaf_public_key(leaf_der).ok())
        .map(|leaf_key| verify_signature(&sign1, &leaf_key).is_ok())
        .unwrap_or(false);

    let user_data_matches = user_data_contains_hash(&payload.user_data, expected_proof_hash);

    Ok(Verification {
        certificate_chain_valid,
        certificates_in_validity_window,
        signature_valid,
        user_data_matches,
    })
}

fn chain_terminates_at_root(chain: &[Vec<u8>], root_der: &[u8]) -> bool {
    match chain.last() {
        Some(last) => last.as_slice() == root_der,
        None => false,
    }
}

fn certificate_in_window(der: &[u8]) -> bool {
    match X509Certificate::from_der(der) {
        Ok((_, cert)) => {
            let validity = cert.validity();
            validity.is_valid()
        }
        Err(_) => false,
    }
}

fn leaf_public_key(der: &[u8]) -> Result<VerifyingKey, AttestError> {
    let (_, cert) =
        X509Certificate::from_der(der).map_err(|err| AttestError::Certificate(err.to_string()))?;
    let spki = cert.public_key().raw;
    VerifyingKey::from_sec1_bytes(spki).map_err(|err| AttestError::Certificate(err.to_string()))
}

fn user_data_contains_hash(user_data: &[u8], expected_proof_hash: &str) -> bool {
    let expected = expected_proof_hash.trim_start_matches("0x");
    let expected_bytes = match hex::decode(expected) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };
    user_data == expected_bytes.as_slice()
}
