//! HTTP client for a validator's REST gateway.

use crate::wire::{ReceiptResponse, TableResponse};
use crate::{ClientConfig, ClientError};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tableflow_core::{OperationStatus, ReadAccessor, ReadError, Verifier, VerifierError};
use tableflow_types::{ColumnSpec, ContextId, OperationHandle, ResourceId, Row};
use tracing::{debug, trace};

/// Gateway-backed [`Verifier`] and [`ReadAccessor`].
///
/// Every call is a single request; retrying is left to the poller's cadence.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    client: Client,
    base_url: String,
}

/// Why a gateway request produced no value.
enum FetchError {
    Transport(String),
    Decode(String),
}

impl From<FetchError> for VerifierError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Transport(msg) => VerifierError::Transport(msg),
            FetchError::Decode(msg) => VerifierError::Decode(msg),
        }
    }
}

impl From<FetchError> for ReadError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Transport(msg) => ReadError::Transport(msg),
            FetchError::Decode(msg) => ReadError::Decode(msg),
        }
    }
}

impl GatewayClient {
    /// Create a client for the gateway at `base_url`.
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> Result<Self, ClientError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(ClientError::EmptyGatewayUrl);
        }

        let client = Client::builder()
            .timeout(request_timeout)
            .pool_max_idle_per_host(4)
            .build()?;

        Ok(Self { client, base_url })
    }

    /// Create a client from a loaded configuration.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        Self::new(config.gateway_url.clone(), config.request_timeout)
    }

    /// The gateway base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Send `request` and decode a JSON body. `Ok(None)` on 404.
    async fn fetch<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<Option<T>, FetchError> {
        let response = request
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        if !status.is_success() {
            return Err(FetchError::Transport(format!(
                "gateway returned {}: {}",
                status,
                body.trim()
            )));
        }

        trace!(bytes = body.len(), "Gateway response");
        serde_json::from_str(&body)
            .map(Some)
            .map_err(|e| FetchError::Decode(e.to_string()))
    }
}

#[async_trait]
impl Verifier for GatewayClient {
    async fn status(
        &self,
        context: ContextId,
        handle: &OperationHandle,
    ) -> Result<OperationStatus, VerifierError> {
        let url = self.endpoint(&format!("/api/v1/receipt/{context}/{handle}"));
        let receipt: Option<ReceiptResponse> = self.fetch(self.client.get(&url)).await?;

        match receipt {
            Some(receipt) => Ok(receipt.into_status()),
            None => {
                debug!(handle = %handle, context = %context, "Receipt not yet indexed");
                Ok(OperationStatus::unseen())
            }
        }
    }

    async fn resource_schema(
        &self,
        context: ContextId,
        resource: ResourceId,
    ) -> Result<Vec<ColumnSpec>, VerifierError> {
        let url = self.endpoint(&format!("/api/v1/tables/{context}/{resource}"));
        let table: TableResponse = self
            .fetch(self.client.get(&url))
            .await?
            .ok_or_else(|| VerifierError::NotFound(format!("table {resource} on context {context}")))?;

        Ok(table.schema.columns.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl ReadAccessor for GatewayClient {
    async fn query(
        &self,
        context: ContextId,
        resource_name: &str,
        select: &str,
    ) -> Result<Vec<Row>, ReadError> {
        let request = self
            .client
            .get(self.endpoint("/api/v1/query"))
            .query(&[("statement", select), ("format", "objects")]);

        debug!(context = %context, table = %resource_name, "Querying gateway");
        // A 404 from the query endpoint means the statement matched nothing.
        let rows: Option<Vec<Row>> = self.fetch(request).await?;
        Ok(rows.unwrap_or_default())
    }
}
