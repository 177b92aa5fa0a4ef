//! Tableflow gateway client.
//!
//! Talks to a validator's REST gateway for everything that does not need a
//! signature: receipt lookups (the verifier side of confirmation polling),
//! table schemas, and read queries. Submission goes through a wallet and is
//! not handled here.
//!
//! # Endpoints
//!
//! | Call                          | Endpoint                                |
//! |-------------------------------|-----------------------------------------|
//! | `Verifier::status`            | `GET /api/v1/receipt/{chain}/{tx}`      |
//! | `Verifier::resource_schema`   | `GET /api/v1/tables/{chain}/{table_id}` |
//! | `ReadAccessor::query`         | `GET /api/v1/query?statement=...`       |
//!
//! A 404 from the receipt endpoint means the transaction has not been
//! indexed yet and is reported as an unseen status, not as an error.

mod config;
mod error;
mod gateway;
mod wire;

pub use config::{ClientConfig, LifecycleSection};
pub use error::{ClientError, ConfigError};
pub use gateway::GatewayClient;
