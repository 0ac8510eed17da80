//! # Attester
//!
//! A closed set of three providers dispatched through an explicit tag
//! rather than a trait object: `Disabled` issues nothing, `Local` signs
//! a deterministic simulated document (clearly labeled `TeeMode::Local`
//! in its output), `Nitro` signs with the enclave's real P-384 key and
//! carries its certificate chain.

use crate::cose::build_sign1;
use crate::errors::AttestError;
use crate::payload::AttestationPayload;
use crate::verify::{self, Verification};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use p384::ecdsa::SigningKey;
use proofport_types::entities::{AttestationEnvelope, TeeMode};

pub struct NitroAttester {
    pub signing_key: SigningKey,
    pub chain_der: Vec<Vec<u8>>,
    pub root_der: Vec<u8>,
    pub module_id: String,
}

pub struct LocalAttester {
    pub signing_key: SigningKey,
    pub module_id: String,
}

pub enum Attester {
    Disabled,
    Local(LocalAttester),
    Nitro(NitroAttester),
}

impl Attester {
    pub fn mode(&self) -> TeeMode {
        match self {
            Attester::Disabled => TeeMode::Disabled,
            Attester::Local(_) => TeeMode::Local,
            Attester::Nitro(_) => TeeMode::Nitro,
        }
    }

    /// Produces an attestation envelope over `proof_hash`, or `None` when
    /// attestation is disabled.
    pub fn generate(
        &self,
        proof_hash: &str,
        user_data: Option<Vec<u8>>,
        now: i64,
    ) -> Result<Option<AttestationEnvelope>, AttestError> {
        match self {
            Attester::Disabled => Ok(None),
            Attester::Local(attester) => {
                let user_data = user_data.unwrap_or_else(|| proof_hash_bytes(proof_hash));
                let payload = AttestationPayload {
                    module_id: attester.module_id.clone(),
                    digest: "SHA384".to_string(),
                    pcrs: simulated_pcrs(),
                    timestamp: now,
                    user_data,
                    nonce: now.to_be_bytes().to_vec(),
                };
                let encoded = payload
                    .to_cbor()
                    .map_err(|err| AttestError::Cbor(err.to_string()))?;
                let document = build_sign1(&encoded, &attester.signing_key, None)?;
                Ok(Some(AttestationEnvelope {
                    document: STANDARD.encode(document),
                    mode: TeeMode::Local,
                    proof_hash: proof_hash.to_string(),
                    timestamp: now,
                }))
            }
            Attester::Nitro(attester) => {
                let user_data = user_data.unwrap_or_else(|| proof_hash_bytes(proof_hash));
                let payload = AttestationPayload {
                    module_id: attester.module_id.clone(),
                    digest: "SHA384".to_string(),
                    pcrs: simulated_pcrs(),
                    timestamp: now,
                    user_data,
                    nonce: now.to_be_bytes().to_vec(),
                };
                let encoded = payload
                    .to_cbor()
                    .map_err(|err| AttestError::Cbor(err.to_string()))?;
                let document = build_sign1(
                    &encoded,
                    &attester.signing_key,
                    Some(&attester.chain_der),
                )?;
                Ok(Some(AttestationEnvelope {
                    document: STANDARD.encode(document),
                    mode: TeeMode::Nitro,
                    proof_hash: proof_hash.to_string(),
                    timestamp: now,
                }))
            }
        }
    }

    /// Verifies a previously issued envelope. `Local` documents are
    /// reported valid only by signature shape (there is no real chain to
    /// pin); `Nitro` documents run the full four-check verification.
    pub fn verify(&self, envelope: &AttestationEnvelope) -> Result<Verification, AttestError> {
        let document = STANDARD
            .decode(&envelope.document)
            .map_err(|err| AttestError::Cose(err.to_string()))?;
        match (self, envelope.mode) {
            (Attester::Nitro(attester), TeeMode::Nitro) => {
                verify::verify_nitro(&document, &attester.root_der, &envelope.proof_hash)
            }
            (Attester::Local(attester), TeeMode::Local) => {
                let parsed = verify::parse(&document)?;
                let verifying_key = *attester.signing_key.verifying_key();
                let sign1 = crate::cose::parse_sign1(&document)?;
                let signature_valid = crate::cose::verify_signature(&sign1, &verifying_key).is_ok();
                let user_data_matches = hex_matches(&parsed.payload.user_data, &envelope.proof_hash);
                Ok(Verification {
                    certificate_chain_valid: true,
                    certificates_in_validity_window: true,
                    signature_valid,
                    user_data_matches,
                })
            }
            _ => Err(AttestError::Certificate(
                "attester mode does not match envelope mode".to_string(),
            )),
        }
    }
}

fn simulated_pcrs() -> std::collections::BTreeMap<u8, String> {
    let mut pcrs = std::collections::BTreeMap::new();
    pcrs.insert(0, hex::encode([0u8; 48]));
    pcrs.insert(1, hex::encode([0u8; 48]));
    pcrs.insert(2, hex::encode([0u8; 48]));
    pcrs
}

fn proof_hash_bytes(proof_hash: &str) -> Vec<u8> {
    hex::decode(proof_hash.trim_start_matches("0x")).unwrap_or_default()
}

fn hex_matches(user_data: &[u8], expected_proof_hash: &str) -> bool {
    let expected = expected_proof_hash.trim_start_matches("0x");
    match hex::decode(expected) {
        Ok(bytes) => user_data == bytes.as_slice(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> SigningKey {
        SigningKey::from_bytes(&[0x42u8; 48].into()).unwrap()
    }

    #[test]
    fn disabled_generates_nothing() {
        let attester = Attester::Disabled;
        let result = attester.generate("0xab", None, 1000).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn local_roundtrips_generate_and_verify() {
        let attester = Attester::Local(LocalAttester {
            signing_key: key(),
            module_id: "proofport-local".to_string(),
        });
        let proof_hash = format!("0x{}", hex::encode([0x7fu8; 32]));
        let envelope = attester.generate(&proof_hash, None, 1000).unwrap().unwrap();
        assert_eq!(envelope.mode, TeeMode::Local);

        let verification = attester.verify(&envelope).unwrap();
        assert!(verification.signature_valid);
        assert!(verification.user_data_matches);
        assert!(verification.is_valid());
    }

    #[test]
    fn local_verify_rejects_tampered_proof_hash() {
        let attester = Attester::Local(LocalAttester {
            signing_key: key(),
            module_id: "proofport-local".to_string(),
        });
        let proof_hash = format!("0x{}", hex::encode([0x11u8; 32]));
        let mut envelope = attester.generate(&proof_hash, None, 1000).unwrap().unwrap();
        envelope.proof_hash = format!("0x{}", hex::encode([0x22u8; 32]));

        let verification = attester.verify(&envelope).unwrap();
        assert!(!verification.user_data_matches);
        assert!(!verification.is_valid());
    }
}
