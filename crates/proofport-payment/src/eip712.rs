//! # EIP-712 `TransferWithAuthorization` Hashing
//!
//! Builds the typed-data digest the payer signs and the one this crate
//! recovers against, by hand — `keccak256` over the ABI-encoded struct
//! hash and domain separator, per EIP-712 §Specification.

use proofport_crypto::keccak256;
use proofport_types::{Address, UsdcDomain};

const EIP712_DOMAIN_TYPEHASH: &[u8] =
    b"EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";

const TRANSFER_WITH_AUTHORIZATION_TYPEHASH: &[u8] = b"TransferWithAuthorization(address from,address to,uint256 value,uint256 validAfter,uint256 validBefore,bytes32 nonce)";

#[derive(Debug, Clone)]
pub struct TransferWithAuthorization {
    pub from: Address,
    pub to: Address,
    pub value: u128,
    pub valid_after: i64,
    pub valid_before: i64,
    pub nonce: [u8; 32],
}

fn address_to_word(address: &Address) -> [u8; 32] {
    let mut word = [0u8; 32];
    let hex = address.as_str().trim_start_matches("0x");
    let bytes = hex::decode(hex).unwrap_or_default();
    let start = 32 - bytes.len().min(20);
    word[start..start + bytes.len().min(20)].copy_from_slice(&bytes[..bytes.len().min(20)]);
    word
}

fn u256_word(value: u128) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[16..].copy_from_slice(&value.to_be_bytes());
    word
}

fn i64_word(value: i64) -> [u8; 32] {
    u256_word(value.max(0) as u128)
}

fn domain_separator(domain: &UsdcDomain, chain_id: u64) -> [u8; 32] {
    let mut preimage = Vec::with_capacity(32 * 4);
    preimage.extend_from_slice(&keccak256(EIP712_DOMAIN_TYPEHASH));
    preimage.extend_from_slice(&keccak256(domain.name.as_bytes()));
    preimage.extend_from_slice(&keccak256(domain.version.as_bytes()));
    preimage.extend_from_slice(&u256_word(chain_id as u128));
    preimage.extend_from_slice(&address_to_word(&domain.address));
    keccak256(&preimage)
}

fn struct_hash(auth: &TransferWithAuthorization) -> [u8; 32] {
    let mut preimage = Vec::with_capacity(32 * 7);
    preimage.extend_from_slice(&keccak256(TRANSFER_WITH_AUTHORIZATION_TYPEHASH));
    preimage.extend_from_slice(&address_to_word(&auth.from));
    preimage.extend_from_slice(&address_to_word(&auth.to));
    preimage.extend_from_slice(&u256_word(auth.value));
    preimage.extend_from_slice(&i64_word(auth.valid_after));
    preimage.extend_from_slice(&i64_word(auth.valid_before));
    preimage.extend_from_slice(&auth.nonce);
    keccak256(&preimage)
}

/// The final digest a wallet signs: `keccak256(0x1901 || domainSeparator || structHash)`.
pub fn typed_data_digest(
    domain: &UsdcDomain,
    chain_id: u64,
    auth: &TransferWithAuthorization,
) -> [u8; 32] {
    let mut preimage = Vec::with_capacity(2 + 32 + 32);
    preimage.extend_from_slice(&[0x19, 0x01]);
    preimage.extend_from_slice(&domain_separator(domain, chain_id));
    preimage.extend_from_slice(&struct_hash(auth));
    keccak256(&preimage)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_domain() -> UsdcDomain {
        UsdcDomain {
            address: Address::new("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"),
            name: "USD Coin".to_string(),
            version: "2".to_string(),
        }
    }

    fn sample_auth() -> TransferWithAuthorization {
        TransferWithAuthorization {
            from: Address::new("0x1111111111111111111111111111111111111111"),
            to: Address::new("0x2222222222222222222222222222222222222222"),
            value: 100_000,
            valid_after: 0,
            valid_before: 2_000_000_000,
            nonce: [7u8; 32],
        }
    }

    #[test]
    fn digest_is_deterministic() {
        let a = typed_data_digest(&sample_domain(), 8453, &sample_auth());
        let b = typed_data_digest(&sample_domain(), 8453, &sample_auth());
        assert_eq!(a, b);
    }

    #[test]
    fn digest_changes_with_value() {
        let mut other = sample_auth();
        other.value += 1;
        let a = typed_data_digest(&sample_domain(), 8453, &sample_auth());
        let b = typed_data_digest(&sample_domain(), 8453, &other);
        assert_ne!(a, b);
    }

    #[test]
    fn digest_changes_with_chain_id() {
        let a = typed_data_digest(&sample_domain(), 8453, &sample_auth());
        let b = typed_data_digest(&sample_domain(), 1, &sample_auth());
        assert_ne!(a, b);
    }
}
