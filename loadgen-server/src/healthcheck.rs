//! Health check against a running server.

use std::time::Duration;

use anyhow::{Context, Result};

use crate::config::Config;
use crate::endpoints::health::HealthResponse;

/// Checks that the server at the configured address reports itself healthy within `timeout`.
pub async fn healthcheck(config: Config, timeout: Duration) -> Result<()> {
    let client = reqwest::Client::builder().timeout(timeout).build()?;
    let url = format!("http://{}/health/", config.http_addr);

    tracing::debug!("sending healthcheck request to {}", url);
    let response = client.get(&url).send().await?;
    if !response.status().is_success() {
        anyhow::bail!("Bad Status: {}", response.status());
    }

    let health: HealthResponse = response
        .json()
        .await
        .context("invalid healthcheck response")?;
    if health.status != "healthy" {
        anyhow::bail!("Unhealthy: {}", health.status);
    }

    tracing::info!(timestamp = health.timestamp, "OK");
    Ok(())
}
