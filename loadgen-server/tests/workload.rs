//! Blackbox tests for the workload and health endpoints.
//!
//! These tests run a full server on a random port and assert the HTTP contract, including how
//! rejected and aborted workloads are reported.

use std::time::Duration;

use anyhow::Result;
use loadgen_server::endpoints::common::ApiErrorResponse;
use loadgen_server::endpoints::health::HealthResponse;
use loadgen_service::WorkloadResult;
use loadgen_test::server::TestServer;
use reqwest::StatusCode;

#[tokio::test]
async fn test_small_workload() -> Result<()> {
    loadgen_test::tracing::init();
    let server = TestServer::new().await;

    let response = reqwest::get(server.url(
        "/cpu-io-no-db/?prime_limit=10&hash_rounds=100&io_kb=4",
    ))
    .await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response.headers()[reqwest::header::SERVER]
            .to_str()?
            .starts_with("loadgen/")
    );

    let result: WorkloadResult = response.json().await?;
    assert_eq!(result.primes_found, 4);
    assert_eq!(result.prime_limit, 10);
    assert_eq!(result.hash_rounds, 100);
    assert_eq!(result.io_kb, 4);
    assert!(result.cpu_time_sec <= result.total_time_sec);

    // 1 MiB of initial contents plus the appended 4 KiB.
    let size = std::fs::metadata(server.scratch_path())?.len();
    assert_eq!(size, 1024 * 1024 + 4 * 1024);

    Ok(())
}

#[tokio::test]
async fn test_response_fields() -> Result<()> {
    let server = TestServer::new().await;

    let response = reqwest::get(server.url("/cpu-io-no-db?prime_limit=2&hash_rounds=0&io_kb=0"))
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let body: serde_json::Value = response.json().await?;
    let object = body.as_object().unwrap();
    let mut keys: Vec<_> = object.keys().map(String::as_str).collect();
    keys.sort_unstable();
    assert_eq!(
        keys,
        [
            "cpu_time_sec",
            "hash_rounds",
            "io_kb",
            "io_time_sec",
            "prime_limit",
            "primes_found",
            "total_time_sec"
        ]
    );
    assert_eq!(body["primes_found"], 0);

    Ok(())
}

#[tokio::test]
async fn test_defaults_apply() -> Result<()> {
    let server = TestServer::new().await;

    let response = reqwest::get(server.url("/cpu-io-no-db/?prime_limit=100&hash_rounds=10")).await?;
    assert_eq!(response.status(), StatusCode::OK);

    let result: WorkloadResult = response.json().await?;
    assert_eq!(result.prime_limit, 100);
    assert_eq!(result.primes_found, 25);
    assert_eq!(result.hash_rounds, 10);
    assert_eq!(result.io_kb, 128);

    Ok(())
}

#[tokio::test]
async fn test_invalid_parameters() -> Result<()> {
    let server = TestServer::with_config(|config| {
        config.limits.max_io_kb = 64;
    })
    .await;

    for query in [
        "prime_limit=abc",
        "hash_rounds=-1",
        "io_kb=1.5",
        "prime_limit=1",
        "prime_limit=10&io_kb=65",
    ] {
        let response = reqwest::get(server.url(&format!("/cpu-io-no-db/?{query}"))).await?;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{query}");

        let body: ApiErrorResponse = response.json().await?;
        assert!(body.detail.is_some(), "{query}");
    }

    // Nothing ran, so the scratch file was never created.
    assert!(!server.scratch_path().exists());

    Ok(())
}

#[tokio::test]
async fn test_at_capacity() -> Result<()> {
    let server = TestServer::with_config(|config| {
        config.service.max_concurrency = 0;
    })
    .await;

    let response = reqwest::get(server.url("/cpu-io-no-db/?prime_limit=10&hash_rounds=0")).await?;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    Ok(())
}

#[tokio::test]
async fn test_max_duration() -> Result<()> {
    let server = TestServer::with_config(|config| {
        config.service.max_duration = Duration::ZERO;
    })
    .await;

    let response =
        reqwest::get(server.url("/cpu-io-no-db/?prime_limit=100000&hash_rounds=0")).await?;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let body: ApiErrorResponse = response.json().await?;
    assert_eq!(body.detail.as_deref(), Some("service unavailable"));
    assert_eq!(body.causes.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_health() -> Result<()> {
    let server = TestServer::new().await;

    let mut last = 0.0;
    for path in ["/health/", "/health", "/health/"] {
        let response = reqwest::get(server.url(path)).await?;
        assert_eq!(response.status(), StatusCode::OK);

        let health: HealthResponse = response.json().await?;
        assert_eq!(health.status, "healthy");
        assert!(health.timestamp >= last);
        last = health.timestamp;
    }

    Ok(())
}
