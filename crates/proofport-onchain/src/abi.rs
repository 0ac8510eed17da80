//! Hand-rolled ABI encoding for the single call this crate makes:
//! `verify(bytes,bytes32[]) returns (bool)`. Kept minimal rather than
//! pulling in a full ABI crate, in the same spirit as the EIP-712
//! encoding in `proofport-payment`.

use proofport_crypto::keccak256;

/// The first 4 bytes of `keccak256("verify(bytes,bytes32[])")`.
pub fn verify_selector() -> [u8; 4] {
    let hash = keccak256(b"verify(bytes,bytes32[])");
    [hash[0], hash[1], hash[2], hash[3]]
}

fn pad32(word: &mut Vec<u8>) {
    let remainder = word.len() % 32;
    if remainder != 0 {
        word.extend(std::iter::repeat(0u8).take(32 - remainder));
    }
}

fn word_u64(value: u64) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&value.to_be_bytes());
    word
}

/// ABI-encodes `verify(bytes proof, bytes32[] publicInputs)` call data,
/// selector included.
pub fn encode_verify_call(proof: &[u8], public_inputs: &[[u8; 32]]) -> Vec<u8> {
    let head_size = 64u64;
    let proof_offset = head_size;

    let mut proof_encoded = Vec::new();
    proof_encoded.extend_from_slice(&word_u64(proof.len() as u64));
    proof_encoded.extend_from_slice(proof);
    pad32(&mut proof_encoded);

    let inputs_offset = proof_offset + proof_encoded.len() as u64;

    let mut inputs_encoded = Vec::new();
    inputs_encoded.extend_from_slice(&word_u64(public_inputs.len() as u64));
    for input in public_inputs {
        inputs_encoded.extend_from_slice(input);
    }

    let mut call_data = Vec::new();
    call_data.extend_from_slice(&verify_selector());
    call_data.extend_from_slice(&word_u64(proof_offset));
    call_data.extend_from_slice(&word_u64(inputs_offset));
    call_data.extend_from_slice(&proof_encoded);
    call_data.extend_from_slice(&inputs_encoded);
    call_data
}

/// Decodes a `bool` return value from an `eth_call` result: the last
/// byte of the single 32-byte return word is non-zero for `true`.
pub fn decode_bool_return(data: &[u8]) -> bool {
    data.last().map(|byte| *byte != 0).unwrap_or(false)
}
