//! Simulated wallet.

use async_trait::async_trait;
use parking_lot::Mutex;
use tableflow_core::{SignerError, SignerProvider};
use tableflow_types::{ContextId, Identity};

/// A signer that can be connected, disconnected and moved between networks.
#[derive(Debug)]
pub struct SimulatedSigner {
    address: String,
    state: Mutex<SignerState>,
}

#[derive(Debug)]
struct SignerState {
    connected: bool,
    context: ContextId,
}

impl SimulatedSigner {
    /// A connected signer for `address` on `context`.
    pub fn new(address: impl Into<String>, context: ContextId) -> Self {
        Self {
            address: address.into(),
            state: Mutex::new(SignerState {
                connected: true,
                context,
            }),
        }
    }

    /// Connect or disconnect the wallet.
    pub fn set_connected(&self, connected: bool) {
        self.state.lock().connected = connected;
    }

    /// Move the wallet to another network.
    pub fn switch_context(&self, context: ContextId) {
        self.state.lock().context = context;
    }
}

#[async_trait]
impl SignerProvider for SimulatedSigner {
    async fn identity(&self) -> Result<Identity, SignerError> {
        let state = self.state.lock();
        if !state.connected {
            return Err(SignerError::NotConnected);
        }
        Ok(Identity::new(self.address.clone(), state.context))
    }

    async fn context_id(&self) -> Result<ContextId, SignerError> {
        let state = self.state.lock();
        if !state.connected {
            return Err(SignerError::NotConnected);
        }
        Ok(state.context)
    }
}
