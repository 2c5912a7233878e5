//! HTTP transport backed by `reqwest`.

use std::time::Duration;

use futures_util::future::BoxFuture;
use url::Url;

use crate::config::validation::parse_endpoint;
use crate::resilience::timeouts::with_deadline;
use crate::transport::{Transport, TransportError};

/// POSTs JSON payloads to a fixed endpoint.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: Url,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("octomatic-telemetry/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError::Request(e.to_string()))?;

        Ok(Self {
            client,
            endpoint,
            timeout,
        })
    }

    /// Build from a raw endpoint string.
    pub fn from_endpoint(raw: &str, timeout: Duration) -> Result<Self, TransportError> {
        let endpoint = parse_endpoint(raw).map_err(TransportError::Endpoint)?;
        Self::new(endpoint, timeout)
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl Transport for HttpTransport {
    fn send<'a>(&'a self, payload: &'a serde_json::Value) -> BoxFuture<'a, Result<(), TransportError>> {
        Box::pin(async move {
            let request = self.client.post(self.endpoint.clone()).json(payload).send();

            let response = with_deadline(self.timeout, request)
                .await
                .map_err(|_| TransportError::Timeout(self.timeout.as_millis() as u64))?
                .map_err(|e| TransportError::Request(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                tracing::debug!(endpoint = %self.endpoint, status = %status, "Collector rejected payload");
                return Err(TransportError::Status(status.as_u16()));
            }
            Ok(())
        })
    }
}
