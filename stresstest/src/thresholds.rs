//! Pass/fail criteria for a stresstest run.

use std::fmt;
use std::time::Duration;

use serde::Deserialize;

use crate::metrics::WorkloadMetrics;

/// Limits that the totals of a stresstest must stay within.
///
/// All thresholds are optional. A run with violated thresholds is reported as failed.
///
/// ```yaml
/// thresholds:
///   p95: 2s
///   max_failure_rate: 0.01
///   min_request_rate: 10
/// ```
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Maximum median latency.
    #[serde(with = "humantime_serde")]
    pub p50: Option<Duration>,
    /// Maximum 90th percentile latency.
    #[serde(with = "humantime_serde")]
    pub p90: Option<Duration>,
    /// Maximum 95th percentile latency.
    #[serde(with = "humantime_serde")]
    pub p95: Option<Duration>,
    /// Maximum 99th percentile latency.
    #[serde(with = "humantime_serde")]
    pub p99: Option<Duration>,
    /// Maximum share of throttled or failed requests, between `0` and `1`.
    pub max_failure_rate: Option<f64>,
    /// Minimum number of completed requests per second.
    pub min_request_rate: Option<f64>,
}

/// Outcome of evaluating a single threshold.
#[derive(Debug)]
pub struct Check {
    /// Name of the threshold.
    pub name: &'static str,
    /// The configured limit.
    pub limit: String,
    /// The measured value, or `None` if nothing was measured.
    pub actual: Option<String>,
    /// Whether the measured value is within the limit.
    pub passed: bool,
}

impl fmt::Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let actual = self.actual.as_deref().unwrap_or("no data");
        write!(f, "{}: {} (limit {})", self.name, actual, self.limit)
    }
}

impl Thresholds {
    /// Returns whether any threshold is configured.
    pub fn is_empty(&self) -> bool {
        self.checks(&WorkloadMetrics::default()).is_empty()
    }

    /// Evaluates all configured thresholds against `metrics`.
    pub fn checks(&self, metrics: &WorkloadMetrics) -> Vec<Check> {
        let mut checks = Vec::new();

        let latencies = [
            ("p50", 0.5, self.p50),
            ("p90", 0.9, self.p90),
            ("p95", 0.95, self.p95),
            ("p99", 0.99, self.p99),
        ];
        for (name, q, limit) in latencies {
            let Some(limit) = limit else { continue };
            let actual = metrics.latency_quantile(q);
            checks.push(Check {
                name,
                limit: format!("{limit:.2?}"),
                actual: actual.map(|actual| format!("{actual:.2?}")),
                passed: actual.is_some_and(|actual| actual <= limit),
            });
        }

        if let Some(limit) = self.max_failure_rate {
            let actual = metrics.failure_rate();
            checks.push(Check {
                name: "failure rate",
                limit: format!("{:.2}%", limit * 100.0),
                actual: Some(format!("{:.2}%", actual * 100.0)),
                passed: actual <= limit,
            });
        }

        if let Some(limit) = self.min_request_rate {
            let actual = metrics.request_rate();
            checks.push(Check {
                name: "request rate",
                limit: format!("{limit:.2}/s"),
                actual: Some(format!("{actual:.2}/s")),
                passed: actual >= limit,
            });
        }

        checks
    }
}
