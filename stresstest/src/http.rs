//! Contains a remote implementation using HTTP to interact with the loadgen server.

use anyhow::{Context, Result};
use loadgen_service::{WorkloadRequest, WorkloadResult};
use reqwest::StatusCode;

/// A remote implementation using HTTP to interact with the loadgen server.
#[derive(Debug)]
pub struct HttpRemote {
    remote: String,
    client: reqwest::Client,
}

/// The result of a single workload request.
#[derive(Debug)]
pub(crate) enum Outcome {
    /// The server ran the workload and reported its timings.
    Completed(WorkloadResult),
    /// The server was at capacity and rejected the request.
    Throttled,
    /// The request failed for any other reason.
    Failed(String),
}

impl HttpRemote {
    /// Creates a new `HttpRemote` instance with the given remote URL and a default client.
    pub fn new(remote: impl Into<String>) -> Self {
        let mut remote = remote.into();
        while remote.ends_with('/') {
            remote.pop();
        }

        Self {
            remote,
            client: reqwest::Client::new(),
        }
    }

    /// Checks that the server reports itself healthy.
    pub async fn health(&self) -> Result<()> {
        let url = format!("{}/health/", self.remote);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("failed to reach {url}"))?;

        if !response.status().is_success() {
            anyhow::bail!("health check returned {}", response.status());
        }

        Ok(())
    }

    pub(crate) async fn run_workload(&self, request: &WorkloadRequest) -> Outcome {
        let url = format!("{}/cpu-io-no-db/", self.remote);
        let response = match self.client.get(url).query(request).send().await {
            Ok(response) => response,
            Err(err) => return Outcome::Failed(err.to_string()),
        };

        match response.status() {
            StatusCode::OK => match response.json().await {
                Ok(result) => Outcome::Completed(result),
                Err(err) => Outcome::Failed(format!("invalid response: {err}")),
            },
            StatusCode::TOO_MANY_REQUESTS => Outcome::Throttled,
            status => {
                let body = response.text().await.unwrap_or_default();
                Outcome::Failed(format!("{status}: {body}"))
            }
        }
    }
}
