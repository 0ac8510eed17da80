//! # Core Domain Entities
//!
//! The lifecycle records described in the data model: `SigningRequest`,
//! `PaymentAuthorization`, `Flow`, and `ProofResult`. Each is owned by a
//! single component (see crate-level docs) and persisted as a JSON blob
//! under a single authoritative key in the KV store.

use serde::{Deserialize, Serialize};

/// Lowercase, `0x`-prefixed hex representation of a 20-byte EVM address.
///
/// Comparisons between addresses must be case-insensitive; this newtype
/// normalizes to lowercase on construction so `==` is always correct.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address(String);

impl Address {
    /// Normalizes `raw` to a lowercase `0x...` address.
    ///
    /// Does not validate length/charset; callers that accept addresses
    /// from untrusted input should validate before constructing.
    pub fn new(raw: impl AsRef<str>) -> Self {
        let raw = raw.as_ref();
        let lower = raw.to_ascii_lowercase();
        if lower.starts_with("0x") {
            Self(lower)
        } else {
            Self(format!("0x{lower}"))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Status of a `SigningRequest`'s rendezvous lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SigningStatus {
    Pending,
    Completed,
    Expired,
}

/// A signing rendezvous record (owned by the signing component until
/// `completed`, after which a `Flow` may reference it read-only).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SigningRequest {
    pub id: String,
    pub address: Option<Address>,
    pub scope: String,
    pub circuit_id: String,
    pub signal_hash: Option<String>,
    pub status: SigningStatus,
    pub signature: Option<String>,
    pub created_at: i64,
    pub expires_at: i64,
}

/// Status of a `PaymentAuthorization`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Expired,
}

/// The USDC contract coordinates needed to build the EIP-712 domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsdcDomain {
    pub address: Address,
    pub name: String,
    pub version: String,
}

/// A payment authorization rendezvous record, bound to exactly one
/// `requestId` (owned by the payment component until `completed`/`failed`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentAuthorization {
    pub request_id: String,
    pub circuit_id: String,
    pub scope: String,
    pub amount: String,
    pub pay_to: Address,
    pub chain_id: u64,
    pub usdc: UsdcDomain,
    pub status: PaymentStatus,
    pub tx_hash: Option<String>,
    /// Hex-encoded nonce this payment has provisionally claimed from the
    /// shared `(usdcAddress, from)` nonce set, if any. Lets a re-`submit`
    /// of the same `TransferWithAuthorization` (e.g. after a facilitator
    /// timeout) pass the reuse check again instead of being rejected as
    /// a collision with its own earlier reservation.
    pub reserved_nonce: Option<String>,
    pub created_at: i64,
    pub expires_at: i64,
}

/// The phases a `Flow` may occupy, in the order the state machine allows.
///
/// Transitions are monotonic along the graph in the flow coordinator's
/// design docs; there are no reverse edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowPhase {
    Signing,
    Payment,
    Ready,
    Proving,
    Done,
    Failed,
    Expired,
}

/// A read-only mirror of the relevant `SigningRequest` fields, embedded in
/// the `Flow` snapshot so subscribers don't need a second lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SigningSummary {
    pub request_id: String,
    pub status: SigningStatus,
    pub address: Option<Address>,
}

/// A read-only mirror of the relevant `PaymentAuthorization` fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentSummary {
    pub status: PaymentStatus,
    pub tx_hash: Option<String>,
}

/// A pointer to the proof artifact once a `Flow` reaches `done`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProofRef {
    pub proof_id: String,
    pub fingerprint: String,
}

/// The canonical lifecycle record for a single `requestId`, written only
/// by the flow coordinator. Every state change rewrites this snapshot in
/// full (with a refreshed TTL) and publishes it on `flow:events:<flowId>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flow {
    pub flow_id: String,
    pub request_id: String,
    pub circuit_id: String,
    pub scope: String,
    pub phase: FlowPhase,
    pub signing: SigningSummary,
    pub payment: Option<PaymentSummary>,
    pub result: Option<ProofRef>,
    pub error: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
    pub expires_at: i64,
}

impl Flow {
    /// Subscribers deduplicate on this field: a snapshot with an
    /// `updated_at` no newer than one already observed carries no news.
    pub fn is_newer_than(&self, last_seen_updated_at: i64) -> bool {
        self.updated_at > last_seen_updated_at
    }

    pub fn has_expired(&self, now: i64) -> bool {
        now > self.expires_at
    }
}

/// A TEE attestation document as returned to API clients: the raw
/// COSE-Sign1 bytes plus enough context to interpret them without
/// re-parsing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttestationEnvelope {
    /// Base64-encoded CBOR-encoded COSE-Sign1 document.
    pub document: String,
    pub mode: TeeMode,
    pub proof_hash: String,
    pub timestamp: i64,
}

/// The TEE attestation mode, a closed set of three variants (no open
/// polymorphism at this boundary).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeeMode {
    Disabled,
    Local,
    Nitro,
}

/// The final proof artifact, persisted by the result store with its own
/// TTL and served back to verifiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProofResult {
    pub proof_id: String,
    pub circuit_id: String,
    pub fingerprint: String,
    pub proof: String,
    pub public_inputs: Vec<String>,
    pub nullifier: String,
    pub signal_hash: String,
    pub attestation: Option<AttestationEnvelope>,
    pub created_at: i64,
}

/// Parameters handed to the prover invoker, derived from a verified
/// signing request plus any circuit-specific public inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProveParams {
    pub circuit_id: String,
    pub address: Address,
    pub scope: String,
    pub signal_hash: String,
    pub signature: String,
    pub country_list: Option<Vec<String>>,
    pub is_included: Option<bool>,
}
