//! Explicit signer session.
//!
//! Replaces ambient "current wallet" state: every coordinator and
//! provisioner call takes the session it acts for, and the session has an
//! explicit connect/disconnect lifecycle.

use std::sync::Arc;
use tableflow_core::{SignerError, SignerProvider};
use tableflow_types::{ContextId, Identity};
use tracing::info;

/// A connected (or disconnected) signer session.
pub struct Session {
    signer: Arc<dyn SignerProvider>,
    identity: Option<Identity>,
}

impl Session {
    /// Connect to `signer` and capture its identity and context.
    pub async fn connect(signer: Arc<dyn SignerProvider>) -> Result<Self, SignerError> {
        let mut session = Self {
            signer,
            identity: None,
        };
        session.reconnect().await?;
        Ok(session)
    }

    /// Re-read identity and context from the signer.
    ///
    /// Used after the signer switched accounts or networks. On failure the
    /// session is left disconnected.
    pub async fn reconnect(&mut self) -> Result<(), SignerError> {
        self.identity = None;

        let identity = self.signer.identity().await?;
        // The provider's context is authoritative; the identity may predate
        // a network switch.
        let context = self.signer.context_id().await?;
        let identity = Identity::new(identity.address, context);

        info!(identity = %identity, "Session connected");
        self.identity = Some(identity);
        Ok(())
    }

    /// Drop the identity. Every later call fails with `NotConnected`.
    pub fn disconnect(&mut self) {
        if let Some(identity) = self.identity.take() {
            info!(identity = %identity, "Session disconnected");
        }
    }

    /// Whether an identity is held.
    pub fn is_connected(&self) -> bool {
        self.identity.is_some()
    }

    /// The connected identity.
    pub fn identity(&self) -> Result<&Identity, SignerError> {
        self.identity.as_ref().ok_or(SignerError::NotConnected)
    }

    /// The connected network.
    pub fn context(&self) -> Result<ContextId, SignerError> {
        self.identity().map(|identity| identity.context)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}
