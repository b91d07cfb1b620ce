//! Workload parameters and results.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default upper bound (exclusive) for prime counting.
pub const DEFAULT_PRIME_LIMIT: u64 = 500_000;
/// Default number of chained SHA-256 rounds.
pub const DEFAULT_HASH_ROUNDS: u64 = 1_000_000;
/// Default number of KiB written to and read from the scratch file.
pub const DEFAULT_IO_KB: u64 = 128;

/// Parameters of a single workload.
///
/// Missing fields take their defaults when deserialized, so this can be extracted directly from
/// a query string.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkloadRequest {
    /// Primes are counted in `2..prime_limit`.
    pub prime_limit: u64,
    /// Number of chained SHA-256 rounds.
    pub hash_rounds: u64,
    /// KiB appended to the scratch file and read back from it.
    pub io_kb: u64,
}

impl Default for WorkloadRequest {
    fn default() -> Self {
        Self {
            prime_limit: DEFAULT_PRIME_LIMIT,
            hash_rounds: DEFAULT_HASH_ROUNDS,
            io_kb: DEFAULT_IO_KB,
        }
    }
}

impl WorkloadRequest {
    /// Checks that every parameter is within `limits`.
    pub fn validate(&self, limits: &WorkloadLimits) -> Result<()> {
        if self.prime_limit < 2 {
            return Err(Error::InvalidRequest(format!(
                "prime_limit must be at least 2, got {}",
                self.prime_limit
            )));
        }

        check_max("prime_limit", self.prime_limit, limits.max_prime_limit)?;
        check_max("hash_rounds", self.hash_rounds, limits.max_hash_rounds)?;
        check_max("io_kb", self.io_kb, limits.max_io_kb)?;

        Ok(())
    }

    /// Size of the I/O phases in bytes.
    pub fn io_bytes(&self) -> u64 {
        self.io_kb.saturating_mul(1024)
    }
}

fn check_max(name: &str, value: u64, max: u64) -> Result<()> {
    if value > max {
        return Err(Error::InvalidRequest(format!(
            "{name} must be at most {max}, got {value}"
        )));
    }
    Ok(())
}

/// Upper bounds for [`WorkloadRequest`] parameters.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct WorkloadLimits {
    /// Maximum accepted `prime_limit`.
    pub max_prime_limit: u64,
    /// Maximum accepted `hash_rounds`.
    pub max_hash_rounds: u64,
    /// Maximum accepted `io_kb`.
    pub max_io_kb: u64,
}

impl Default for WorkloadLimits {
    fn default() -> Self {
        Self {
            max_prime_limit: 5_000_000,
            max_hash_rounds: 50_000_000,
            max_io_kb: 5 * 1024,
        }
    }
}

/// Outcome of a completed workload, as returned to the caller.
///
/// All timings are wall-clock seconds rounded to two decimal places.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct WorkloadResult {
    /// Number of primes below `prime_limit`.
    pub primes_found: u64,
    /// Echo of the request.
    pub prime_limit: u64,
    /// Echo of the request.
    pub hash_rounds: u64,
    /// Echo of the request.
    pub io_kb: u64,
    /// Duration of prime counting and hash chaining.
    pub cpu_time_sec: f64,
    /// Duration of the append and read-back.
    pub io_time_sec: f64,
    /// Duration of all phases.
    pub total_time_sec: f64,
}

impl WorkloadResult {
    pub(crate) fn new(
        request: &WorkloadRequest,
        primes_found: u64,
        cpu_time: Duration,
        total_time: Duration,
    ) -> Self {
        let io_time = total_time.saturating_sub(cpu_time);

        Self {
            primes_found,
            prime_limit: request.prime_limit,
            hash_rounds: request.hash_rounds,
            io_kb: request.io_kb,
            cpu_time_sec: round_secs(cpu_time),
            io_time_sec: round_secs(io_time),
            total_time_sec: round_secs(total_time),
        }
    }
}

fn round_secs(duration: Duration) -> f64 {
    (duration.as_secs_f64() * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let request = WorkloadRequest::default();
        assert_eq!(request.prime_limit, 500_000);
        assert_eq!(request.hash_rounds, 1_000_000);
        assert_eq!(request.io_kb, 128);
        assert_eq!(request.io_bytes(), 128 * 1024);
        request.validate(&WorkloadLimits::default()).unwrap();
    }

    #[test]
    fn rejects_small_prime_limit() {
        let request = WorkloadRequest {
            prime_limit: 1,
            ..Default::default()
        };
        let err = request.validate(&WorkloadLimits::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    #[test]
    fn rejects_values_above_limits() {
        let limits = WorkloadLimits {
            max_prime_limit: 100,
            max_hash_rounds: 10,
            max_io_kb: 1,
        };

        let ok = WorkloadRequest {
            prime_limit: 100,
            hash_rounds: 10,
            io_kb: 1,
        };
        ok.validate(&limits).unwrap();

        for request in [
            WorkloadRequest { prime_limit: 101, ..ok },
            WorkloadRequest { hash_rounds: 11, ..ok },
            WorkloadRequest { io_kb: 2, ..ok },
        ] {
            let err = request.validate(&limits).unwrap_err();
            assert!(matches!(err, Error::InvalidRequest(_)), "{request:?}");
        }
    }

    #[test]
    fn accepts_zero_work() {
        let request = WorkloadRequest {
            prime_limit: 2,
            hash_rounds: 0,
            io_kb: 0,
        };
        request.validate(&WorkloadLimits::default()).unwrap();
    }

    #[test]
    fn result_rounds_timings() {
        let request = WorkloadRequest::default();
        let result = WorkloadResult::new(
            &request,
            41_538,
            Duration::from_millis(1234),
            Duration::from_millis(1567),
        );

        assert_eq!(result.cpu_time_sec, 1.23);
        assert_eq!(result.total_time_sec, 1.57);
        assert_eq!(result.io_time_sec, 0.33);
    }
}
