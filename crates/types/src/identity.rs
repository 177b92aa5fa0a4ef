//! Signer-backed identity.

use crate::ContextId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An authenticated identity obtained from the signer provider.
///
/// Immutable once obtained. The identity only names the signer; the
/// signing capability itself stays behind the provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    /// Account address, as reported by the signer.
    pub address: String,
    /// Network the signer is currently connected to.
    pub context: ContextId,
}

impl Identity {
    /// Create a new identity.
    pub fn new(address: impl Into<String>, context: ContextId) -> Self {
        Self {
            address: address.into(),
            context,
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.address, self.context)
    }
}
