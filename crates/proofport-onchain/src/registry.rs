//! Static `circuitId × chainId → verifierAddress` map.

use crate::errors::OnchainError;
use std::collections::HashMap;

#[derive(Debug, Default, Clone)]
pub struct VerifierRegistry {
    addresses: HashMap<(String, u64), String>,
}

impl VerifierRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, circuit_id: impl Into<String>, chain_id: u64, address: impl Into<String>) {
        self.addresses.insert((circuit_id.into(), chain_id), address.into());
    }

    pub fn lookup(&self, circuit_id: &str, chain_id: u64) -> Result<&str, OnchainError> {
        match self.addresses.get(&(circuit_id.to_string(), chain_id)) {
            Some(address) if !address.is_empty() => Ok(address.as_str()),
            Some(_) => Err(OnchainError::NoVerifier {
                circuit_id: circuit_id.to_string(),
                chain_id,
            }),
            None => Err(OnchainError::UnknownCircuit {
                circuit_id: circuit_id.to_string(),
                chain_id,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_circuit_is_reported() {
        let registry = VerifierRegistry::new();
        let result = registry.lookup("coinbase_attestation", 8453);
        assert!(matches!(result, Err(OnchainError::UnknownCircuit { .. })));
    }

    #[test]
    fn empty_address_is_no_verifier() {
        let mut registry = VerifierRegistry::new();
        registry.register("coinbase_attestation", 8453, "");
        let result = registry.lookup("coinbase_attestation", 8453);
        assert!(matches!(result, Err(OnchainError::NoVerifier { .. })));
    }

    #[test]
    fn registered_circuit_resolves() {
        let mut registry = VerifierRegistry::new();
        registry.register("coinbase_attestation", 8453, "0xVerifier");
        assert_eq!(registry.lookup("coinbase_attestation", 8453).unwrap(), "0xVerifier");
    }
}
