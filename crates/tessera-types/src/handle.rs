//! Opaque ciphertext handles.
//!
//! A handle names a ciphertext held by the coprocessor. Holders can store
//! it, pass it to the coprocessor for homomorphic addition, or hand it to the
//! decryption oracle. Nothing outside the coprocessor can learn the value it
//! refers to.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use crate::ParseError;

/// The plaintext type behind a handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    /// Unsigned integer; supports homomorphic addition.
    U64,
    /// Byte string; opaque, no arithmetic.
    Bytes,
}

impl ValueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::U64 => "u64",
            ValueKind::Bytes => "bytes",
        }
    }
}

impl FromStr for ValueKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "u64" => Ok(ValueKind::U64),
            "bytes" => Ok(ValueKind::Bytes),
            other => Err(ParseError::Kind(other.to_string())),
        }
    }
}

/// Fixed-size token referencing a ciphertext.
#[serde_as]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CiphertextHandle {
    #[serde_as(as = "serde_with::hex::Hex")]
    id: [u8; 32],
    kind: ValueKind,
}

impl CiphertextHandle {
    /// Assemble a handle. Only the coprocessor mints new ids.
    pub fn new(id: [u8; 32], kind: ValueKind) -> Self {
        Self { id, kind }
    }

    pub fn id(&self) -> &[u8; 32] {
        &self.id
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }
}

impl fmt::Debug for CiphertextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CiphertextHandle({self})")
    }
}

/// `kind:hex(id)`, e.g. `u64:9f3c...`.
impl fmt::Display for CiphertextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.as_str(), hex::encode(self.id))
    }
}

impl FromStr for CiphertextHandle {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, id_hex) = s
            .split_once(':')
            .ok_or_else(|| ParseError::Malformed(s.to_string()))?;
        let kind = kind.parse()?;
        let bytes = hex::decode(id_hex)?;
        let len = bytes.len();
        let id: [u8; 32] = bytes.try_into().map_err(|_| ParseError::Length {
            expected: 32,
            actual: len,
        })?;
        Ok(Self { id, kind })
    }
}
