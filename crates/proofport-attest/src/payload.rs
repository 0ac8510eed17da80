//! # Attestation Payload
//!
//! `{moduleId, digest, pcrs: {0,1,2}, timestamp, userData, nonce}` — a
//! subset of the AWS Nitro Enclave attestation document fields, CBOR
//! encoded as the COSE-Sign1 payload.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AttestationPayload {
    pub module_id: String,
    pub digest: String,
    /// PCR index (0, 1, 2) to measurement bytes, hex-encoded.
    pub pcrs: BTreeMap<u8, String>,
    pub timestamp: i64,
    pub user_data: Vec<u8>,
    pub nonce: Vec<u8>,
}

impl AttestationPayload {
    pub fn to_cbor(&self) -> Result<Vec<u8>, ciborium::ser::Error<std::io::Error>> {
        let mut bytes = Vec::new();
        ciborium::ser::into_writer(self, &mut bytes)?;
        Ok(bytes)
    }

    pub fn from_cbor(bytes: &[u8]) -> Result<Self, ciborium::de::Error<std::io::Error>> {
        ciborium::de::from_reader(bytes)
    }
}
