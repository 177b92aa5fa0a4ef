//! Domain-specific identifier types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Network (chain) identifier.
///
/// Every operation and every resource belongs to exactly one context.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ContextId(pub u64);

impl ContextId {
    /// Get the raw value.
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Network-assigned identifier of a table within its context.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ResourceId(pub u64);

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ResourceId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(ResourceId)
    }
}

/// Opaque reference to one submitted operation (a transaction hash).
///
/// A handle uniquely identifies one submission and is never reused, so it
/// is safe to poll indefinitely and to use as a map key.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationHandle(String);

impl OperationHandle {
    /// Length of the hex body of a hash-shaped handle.
    pub const HEX_LEN: usize = 64;

    /// Wrap a handle issued by the network.
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    /// Derive a hash-shaped handle from multiple byte slices using Blake3.
    pub fn from_parts(parts: &[&[u8]]) -> Self {
        let mut hasher = blake3::Hasher::new();
        for part in parts {
            hasher.update(part);
        }
        Self(format!("0x{}", hex::encode(hasher.finalize().as_bytes())))
    }

    /// Parse a `0x`-prefixed 32-byte transaction hash.
    pub fn from_hex(s: &str) -> Result<Self, HandleError> {
        let body = s.strip_prefix("0x").unwrap_or(s);
        if body.len() != Self::HEX_LEN {
            return Err(HandleError::InvalidLength {
                expected: Self::HEX_LEN,
                actual: body.len(),
            });
        }

        let mut bytes = [0u8; 32];
        hex::decode_to_slice(body, &mut bytes).map_err(|_| HandleError::InvalidHex)?;

        Ok(Self(format!("0x{}", hex::encode(bytes))))
    }

    /// The handle as the network spells it.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for OperationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let chars = self.0.chars().count();
        if chars > 16 {
            let head: String = self.0.chars().take(10).collect();
            let tail: String = self.0.chars().skip(chars - 6).collect();
            write!(f, "OperationHandle({head}..{tail})")
        } else {
            write!(f, "OperationHandle({})", self.0)
        }
    }
}

impl fmt::Display for OperationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Errors that can occur when parsing hash-shaped handles.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HandleError {
    /// Invalid hex body length.
    #[error("Invalid handle length: expected {expected} hex chars, got {actual}")]
    InvalidLength {
        /// Expected length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },

    /// Invalid hex characters.
    #[error("Invalid hex in handle")]
    InvalidHex,
}
