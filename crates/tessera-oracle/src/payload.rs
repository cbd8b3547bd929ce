//! Cleartext payload encoding.
//!
//! A payload is the ordered list of decrypted values, one field per requested
//! handle, in the length-prefixed layout of
//! [`tessera_crypto::blake3::encode_multi_field`]. Integers travel as decimal
//! ASCII strings and byte strings travel verbatim; the receiver decides how
//! to interpret each field.

use tessera_crypto::blake3;

use crate::{OracleError, Result};

/// One decrypted value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Cleartext {
    U64(u64),
    Bytes(Vec<u8>),
}

impl Cleartext {
    /// Wire form of this value.
    pub fn render(&self) -> Vec<u8> {
        match self {
            Cleartext::U64(v) => v.to_string().into_bytes(),
            Cleartext::Bytes(b) => b.clone(),
        }
    }
}

/// Encode decrypted values into a payload.
pub fn encode(cleartexts: &[Cleartext]) -> Vec<u8> {
    let rendered: Vec<Vec<u8>> = cleartexts.iter().map(Cleartext::render).collect();
    let fields: Vec<&[u8]> = rendered.iter().map(Vec::as_slice).collect();
    blake3::encode_multi_field(&fields)
}

/// Split a payload into exactly `expected` raw fields.
///
/// # Errors
///
/// - [`OracleError::MalformedPayload`] on a truncated buffer or wrong field count
pub fn decode(payload: &[u8], expected: usize) -> Result<Vec<Vec<u8>>> {
    let fields = blake3::decode_multi_field(payload)
        .ok_or_else(|| OracleError::MalformedPayload("truncated field".into()))?;
    if fields.len() != expected {
        return Err(OracleError::MalformedPayload(format!(
            "expected {expected} fields, got {}",
            fields.len()
        )));
    }
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integers_render_as_decimal() {
        assert_eq!(Cleartext::U64(100).render(), b"100");
        assert_eq!(Cleartext::U64(0).render(), b"0");
    }

    #[test]
    fn test_sale_payload_layout() {
        let payload = encode(&[
            Cleartext::Bytes(b"movie-1".to_vec()),
            Cleartext::U64(100),
        ]);
        let fields = decode(&payload, 2).expect("decode");
        assert_eq!(fields[0], b"movie-1");
        assert_eq!(fields[1], b"100");
    }

    #[test]
    fn test_wrong_field_count() {
        let payload = encode(&[Cleartext::U64(7)]);
        assert!(matches!(
            decode(&payload, 2),
            Err(OracleError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_truncated_payload() {
        let mut payload = encode(&[Cleartext::Bytes(b"movie-1".to_vec())]);
        payload.truncate(6);
        assert!(decode(&payload, 1).is_err());
    }
}
