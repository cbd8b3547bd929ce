//! Domain-separated BLAKE3 hashing.
//!
//! BLAKE3 derives ciphertext handles, account identifiers, ECIES keys and the
//! message that decryption proofs sign. Each purpose uses its own registered
//! context string so that outputs from one domain can never be replayed in
//! another.

/// Context strings. Every derivation in the workspace uses one of these.
pub mod contexts {
    pub const CIPHERTEXT_HANDLE: &str = "Tessera v1 ciphertext-handle";
    pub const DECRYPTION_PROOF: &str = "Tessera v1 decryption-proof";
    pub const ACCOUNT_ID: &str = "Tessera v1 account-id";
    pub const ECIES_ENCRYPTION_KEY: &str = "Tessera v1 ecies-encryption-key";
    pub const ECIES_NONCE: &str = "Tessera v1 ecies-nonce";

    pub const ALL_CONTEXTS: &[&str] = &[
        CIPHERTEXT_HANDLE,
        DECRYPTION_PROOF,
        ACCOUNT_ID,
        ECIES_ENCRYPTION_KEY,
        ECIES_NONCE,
    ];
}

/// BLAKE3 in derive-key mode under one of [`contexts`].
pub fn derive_key(context: &str, key_material: &[u8]) -> [u8; 32] {
    ::blake3::derive_key(context, key_material)
}

/// Encode multiple dynamic fields using length-prefixed encoding.
///
/// `LE32(len(field1)) || field1 || LE32(len(field2)) || field2 || ...`
///
/// This is also the wire layout of decrypted cleartext payloads.
pub fn encode_multi_field(fields: &[&[u8]]) -> Vec<u8> {
    let total_len: usize = fields.iter().map(|f| 4 + f.len()).sum();
    let mut output = Vec::with_capacity(total_len);
    for field in fields {
        output.extend_from_slice(&(field.len() as u32).to_le_bytes());
        output.extend_from_slice(field);
    }
    output
}

/// Decode a buffer produced by [`encode_multi_field`].
///
/// Returns `None` if a length prefix is truncated or overruns the buffer.
pub fn decode_multi_field(mut data: &[u8]) -> Option<Vec<Vec<u8>>> {
    let mut fields = Vec::new();
    while !data.is_empty() {
        if data.len() < 4 {
            return None;
        }
        let (prefix, rest) = data.split_at(4);
        let mut len_bytes = [0u8; 4];
        len_bytes.copy_from_slice(prefix);
        let len = u32::from_le_bytes(len_bytes) as usize;
        if rest.len() < len {
            return None;
        }
        let (field, rest) = rest.split_at(len);
        fields.push(field.to_vec());
        data = rest;
    }
    Some(fields)
}
