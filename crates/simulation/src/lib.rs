//! Deterministic in-memory network.
//!
//! [`SimulatedNetwork`] implements every external interface the lifecycle
//! core talks to (`NetworkSubmitter`, `Verifier`, `ReadAccessor`) over a
//! shared in-memory table store, and [`SimulatedSigner`] stands in for a
//! wallet. Confirmation behaviour is scripted per operation with a
//! [`StatusScript`], so tests can say "unseen twice, then confirmed"
//! without any wall-clock dependence.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                  SimulatedNetwork                       │
//! │                                                         │
//! │  submit()  ── applies the operation to SimStorage       │
//! │               and records it with its StatusScript      │
//! │                                                         │
//! │  status()  ── steps the operation's script:             │
//! │               transport errors → unseen → terminal      │
//! │                                                         │
//! │  query() / resource_schema() ── read SimStorage         │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! Operations take effect at submission; the script only controls when the
//! verifier admits to having seen them. A rejected operation has no effect.

mod network;
mod script;
mod signer;
mod storage;

pub use network::SimulatedNetwork;
pub use script::StatusScript;
pub use signer::SimulatedSigner;
pub use storage::{SimStorage, SimTable};
