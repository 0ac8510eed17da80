//! # COSE-Sign1 Envelope
//!
//! Builds and parses the COSE-Sign1 (CBOR) envelope that wraps an
//! `AttestationPayload`. The leaf certificate chain, when present, rides
//! in the unprotected header under label 33 (`x5chain`, RFC 9360) as a
//! length-prefixed concatenation of DER certificates.

use crate::errors::AttestError;
use coset::cbor::value::Value as CborValue;
use coset::{iana, CborSerializable, CoseSign1, CoseSign1Builder, HeaderBuilder};
use p384::ecdsa::signature::{Signer, Verifier};
use p384::ecdsa::{Signature, SigningKey, VerifyingKey};

pub const X5CHAIN_LABEL: i64 = 33;

pub fn encode_chain(certs_der: &[Vec<u8>]) -> Vec<u8> {
    let mut out = Vec::new();
    for cert in certs_der {
        out.extend_from_slice(&(cert.len() as u32).to_be_bytes());
        out.extend_from_slice(cert);
    }
    out
}

pub fn decode_chain(bytes: &[u8]) -> Vec<Vec<u8>> {
    let mut certs = Vec::new();
    let mut cursor = 0;
    while cursor + 4 <= bytes.len() {
        let len = u32::from_be_bytes(bytes[cursor..cursor + 4].try_into().unwrap()) as usize;
        cursor += 4;
        if cursor + len > bytes.len() {
            break;
        }
        certs.push(bytes[cursor..cursor + len].to_vec());
        cursor += len;
    }
    certs
}

pub fn build_sign1(
    payload: &[u8],
    signing_key: &SigningKey,
    chain_der: Option<&[Vec<u8>]>,
) -> Result<Vec<u8>, AttestError> {
    let protected = HeaderBuilder::new().algorithm(iana::Algorithm::ES384).build();

    let mut unprotected_builder = HeaderBuilder::new();
    if let Some(chain) = chain_der {
        let encoded = encode_chain(chain);
        unprotected_builder =
            unprotected_builder.value(X5CHAIN_LABEL, CborValue::Bytes(encoded));
    }
    let unprotected = unprotected_builder.build();

    let sign1 = CoseSign1Builder::new()
        .protected(protected)
        .unprotected(unprotected)
        .payload(payload.to_vec())
        .create_signature(b"", |to_sign| {
            let signature: Signature = signing_key.sign(to_sign);
            signature.to_bytes().to_vec()
        })
        .build();

    sign1
        .to_vec()
        .map_err(|err| AttestError::Cose(err.to_string()))
}

pub fn parse_sign1(document: &[u8]) -> Result<CoseSign1, AttestError> {
    CoseSign1::from_slice(document).map_err(|err| AttestError::Cose(err.to_string()))
}

/// Returns the DER certificate chain embedded in `sign1`'s unprotected
/// header, if any.
pub fn chain_from_sign1(sign1: &CoseSign1) -> Option<Vec<Vec<u8>>> {
    sign1
        .unprotected
        .rest
        .iter()
        .find(|(label, _)| matches!(label, coset::Label::Int(l) if *l == X5CHAIN_LABEL))
        .and_then(|(_, value)| value.as_bytes())
        .map(|bytes| decode_chain(bytes))
}

pub fn verify_signature(sign1: &CoseSign1, verifying_key: &VerifyingKey) -> Result<(), AttestError> {
    sign1
        .verify_signature(b"", |sig, data| -> Result<(), p384::ecdsa::Error> {
            let signature = Signature::from_slice(sig)?;
            verifying_key.verify(data, &signature)
        })
        .map_err(|err| AttestError::Signing(err.to_string()))
}
