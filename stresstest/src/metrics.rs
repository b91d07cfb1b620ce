//! Client-side and server-reported measurements of a stresstest.

use std::time::Duration;

use anyhow::Result;
use loadgen_service::WorkloadResult;
use sketches_ddsketch::DDSketch;

/// Measurements collected by one or more virtual users.
#[derive(Default)]
pub struct WorkloadMetrics {
    /// End-to-end latency of completed requests in seconds.
    pub(crate) latency: DDSketch,
    /// Server-reported CPU phase durations in seconds.
    pub(crate) cpu_time: DDSketch,
    /// Server-reported I/O phase durations in seconds.
    pub(crate) io_time: DDSketch,
    /// Requests rejected with `429 Too Many Requests`.
    pub(crate) throttled: u64,
    /// Requests that failed for any other reason.
    pub(crate) failures: u64,
    /// The first failure, kept for the report.
    pub(crate) first_error: Option<String>,
    /// Wall-clock time the measurements cover.
    pub(crate) elapsed: Duration,
}

impl WorkloadMetrics {
    pub(crate) fn record_completed(&mut self, latency: Duration, result: &WorkloadResult) {
        self.latency.add(latency.as_secs_f64());
        self.cpu_time.add(result.cpu_time_sec);
        self.io_time.add(result.io_time_sec);
    }

    pub(crate) fn record_failure(&mut self, error: String) {
        self.failures += 1;
        self.first_error.get_or_insert(error);
    }

    /// Adds the measurements of `other`, keeping the longer elapsed time.
    pub(crate) fn merge(&mut self, other: &WorkloadMetrics) -> Result<()> {
        let merge_err = |err| anyhow::anyhow!("failed to merge sketches: {err:?}");
        self.latency.merge(&other.latency).map_err(merge_err)?;
        self.cpu_time.merge(&other.cpu_time).map_err(merge_err)?;
        self.io_time.merge(&other.io_time).map_err(merge_err)?;

        self.throttled += other.throttled;
        self.failures += other.failures;
        if self.first_error.is_none() {
            self.first_error.clone_from(&other.first_error);
        }
        self.elapsed = self.elapsed.max(other.elapsed);

        Ok(())
    }

    /// Number of requests that completed successfully.
    pub fn completed(&self) -> u64 {
        self.latency.count() as u64
    }

    /// Total number of requests sent.
    pub fn requests(&self) -> u64 {
        self.completed() + self.throttled + self.failures
    }

    /// Share of requests that did not complete successfully, including throttled ones.
    pub fn failure_rate(&self) -> f64 {
        match self.requests() {
            0 => 0.0,
            requests => (self.throttled + self.failures) as f64 / requests as f64,
        }
    }

    /// Completed requests per second.
    pub fn request_rate(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.completed() as f64 / secs
        } else {
            0.0
        }
    }

    /// Returns the latency at quantile `q`, if any request completed.
    pub fn latency_quantile(&self, q: f64) -> Option<Duration> {
        quantile(&self.latency, q).map(Duration::from_secs_f64)
    }
}

/// Returns the value at quantile `q` of a non-empty sketch.
pub(crate) fn quantile(sketch: &DDSketch, q: f64) -> Option<f64> {
    sketch.quantile(q).ok().flatten()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(cpu: f64, io: f64) -> WorkloadResult {
        WorkloadResult {
            primes_found: 4,
            prime_limit: 10,
            hash_rounds: 0,
            io_kb: 0,
            cpu_time_sec: cpu,
            io_time_sec: io,
            total_time_sec: cpu + io,
        }
    }

    #[test]
    fn empty_metrics() {
        let metrics = WorkloadMetrics::default();
        assert_eq!(metrics.requests(), 0);
        assert_eq!(metrics.failure_rate(), 0.0);
        assert_eq!(metrics.request_rate(), 0.0);
        assert_eq!(metrics.latency_quantile(0.5), None);
    }

    #[test]
    fn merges_counts_and_sketches() {
        let mut a = WorkloadMetrics::default();
        a.record_completed(Duration::from_millis(100), &result(0.05, 0.01));
        a.record_failure("first".into());
        a.elapsed = Duration::from_secs(2);

        let mut b = WorkloadMetrics::default();
        b.record_completed(Duration::from_millis(300), &result(0.2, 0.02));
        b.throttled = 2;
        b.record_failure("second".into());
        b.elapsed = Duration::from_secs(4);

        a.merge(&b).unwrap();

        assert_eq!(a.completed(), 2);
        assert_eq!(a.requests(), 6);
        assert_eq!(a.failure_rate(), 4.0 / 6.0);
        assert_eq!(a.elapsed, Duration::from_secs(4));
        assert_eq!(a.request_rate(), 0.5);
        assert_eq!(a.first_error.as_deref(), Some("first"));
        assert_eq!(a.cpu_time.count(), 2);
    }
}
