//! # Canonical Fingerprint
//!
//! `SHA-256(canonical_json)` truncated to the first 16 hex characters.
//! The JSON is built by hand rather than via `serde_json::to_string` on
//! a struct, so that key order is pinned regardless of `serde_json`'s
//! (unordered, by default) map representation.

use proofport_crypto::sha256;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct FingerprintInputs {
    pub circuit_id: String,
    pub address: String,
    pub scope: String,
    pub country_list: Option<Vec<String>>,
    pub is_included: Option<bool>,
}

/// Computes the 16-hex-char fingerprint of `inputs`.
///
/// Key order is fixed: `circuitId, address, scope, countryList?, isIncluded?`.
/// Absent optional fields are omitted entirely, not emitted as `null`.
pub fn fingerprint(inputs: &FingerprintInputs) -> String {
    let digest = sha256(canonical_json(inputs).as_bytes());
    hex::encode(digest)[..16].to_string()
}

fn canonical_json(inputs: &FingerprintInputs) -> String {
    let mut out = String::from("{");
    out.push_str(&format!("\"circuitId\":{}", json_string(&inputs.circuit_id)));
    out.push_str(&format!(",\"address\":{}", json_string(&inputs.address)));
    out.push_str(&format!(",\"scope\":{}", json_string(&inputs.scope)));
    if let Some(countries) = &inputs.country_list {
        let items: Vec<String> = countries.iter().map(|c| json_string(c)).collect();
        out.push_str(&format!(",\"countryList\":[{}]", items.join(",")));
    }
    if let Some(is_included) = inputs.is_included {
        out.push_str(&format!(",\"isIncluded\":{is_included}"));
    }
    out.push('}');
    out
}

fn json_string(s: &str) -> String {
    serde_json::to_string(s).expect("string serialization never fails")
}
