//! Core workload service and configuration.
//!
//! This module contains [`WorkloadService`], the entry point for running workloads, along with
//! [`ServiceConfig`] for its initialization.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;

use crate::cpu;
use crate::deadline::Deadline;
use crate::error::{Error, Result};
use crate::scratch::{self, AppendOutcome, ScratchConfig, ScratchFile};
use crate::workload::{WorkloadLimits, WorkloadRequest, WorkloadResult};

/// Default maximum number of workloads running at the same time.
pub const DEFAULT_CONCURRENCY_LIMIT: usize = 512;

/// Upper bound for [`ServiceConfig::max_concurrency`].
pub const MAX_CONCURRENCY: usize = if Semaphore::MAX_PERMITS < u32::MAX as usize {
    Semaphore::MAX_PERMITS
} else {
    u32::MAX as usize
};

/// Default maximum duration of a single workload.
pub const DEFAULT_MAX_DURATION: Duration = Duration::from_secs(120);

/// Configuration to initialize a [`WorkloadService`].
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Location and size bounds of the scratch file.
    pub scratch: ScratchConfig,
    /// Upper bounds for request parameters.
    pub limits: WorkloadLimits,
    /// Maximum number of workloads in flight. Further requests are rejected.
    ///
    /// Must not exceed [`MAX_CONCURRENCY`].
    pub max_concurrency: usize,
    /// Workloads running longer than this are aborted.
    pub max_duration: Duration,
}

impl ServiceConfig {
    /// Creates a configuration with default limits for the scratch file at `scratch`.
    pub fn new(scratch: ScratchConfig) -> Self {
        Self {
            scratch,
            limits: WorkloadLimits::default(),
            max_concurrency: DEFAULT_CONCURRENCY_LIMIT,
            max_duration: DEFAULT_MAX_DURATION,
        }
    }
}

/// Runs synthetic CPU and disk workloads.
///
/// Each workload runs four phases in order:
///
///  1. Count primes below `prime_limit` by trial division.
///  2. Chain `hash_rounds` SHA-256 rounds.
///  3. Append `io_kb` KiB of random data to the scratch file and sync it.
///  4. Read `io_kb` KiB back from the start of the scratch file.
///
/// The CPU phases run on the blocking thread pool and share nothing, so they scale with the
/// available cores. The I/O phases contend for the scratch file and are strictly serialized.
///
/// Once accepted, a workload runs to completion on its own task even if the caller goes away.
/// Only the maximum duration can stop it early.
#[derive(Clone, Debug)]
pub struct WorkloadService(Arc<WorkloadServiceInner>);

#[derive(Debug)]
struct WorkloadServiceInner {
    scratch: ScratchFile,
    limits: WorkloadLimits,
    /// One permit per workload that may run. Running workloads hold theirs until they finish.
    permits: Arc<Semaphore>,
    max_concurrency: usize,
    max_duration: Duration,
}

impl WorkloadService {
    /// Creates a new `WorkloadService` with the specified configuration.
    ///
    /// The scratch file is not touched until the first workload runs.
    ///
    /// # Panics
    ///
    /// Panics if `max_concurrency` exceeds [`MAX_CONCURRENCY`].
    pub fn new(config: ServiceConfig) -> Self {
        assert!(
            config.max_concurrency <= MAX_CONCURRENCY,
            "max_concurrency must be at most {MAX_CONCURRENCY}"
        );

        Self(Arc::new(WorkloadServiceInner {
            scratch: ScratchFile::new(config.scratch),
            limits: config.limits,
            permits: Arc::new(Semaphore::new(config.max_concurrency)),
            max_concurrency: config.max_concurrency,
            max_duration: config.max_duration,
        }))
    }

    /// Returns the upper bounds for request parameters.
    pub fn limits(&self) -> &WorkloadLimits {
        &self.0.limits
    }

    /// Returns the shared scratch file.
    pub fn scratch(&self) -> &ScratchFile {
        &self.0.scratch
    }

    /// Returns the number of workloads currently running.
    pub fn in_flight(&self) -> usize {
        self.0.max_concurrency - self.0.permits.available_permits()
    }

    /// Waits until all running workloads have finished.
    ///
    /// New workloads are rejected while this is pending.
    pub async fn drain(&self) {
        // Bounded by MAX_CONCURRENCY in `new`.
        let all = self.0.max_concurrency as u32;
        // Only fails if the semaphore is closed, which never happens.
        let _permits = self.0.permits.acquire_many(all).await;
    }

    /// Validates and runs a workload, returning its timings.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn run(&self, request: WorkloadRequest) -> Result<WorkloadResult> {
        request.validate(&self.0.limits)?;
        let permit = Arc::clone(&self.0.permits)
            .try_acquire_owned()
            .map_err(|_| Error::AtCapacity)?;

        let inner = Arc::clone(&self.0);
        let task = tokio::spawn(async move {
            let _permit = permit;
            inner.execute(request).await
        });

        task.await?
    }
}

impl WorkloadServiceInner {
    async fn execute(&self, request: WorkloadRequest) -> Result<WorkloadResult> {
        self.scratch.ensure().await?;

        let deadline = Deadline::after(self.max_duration);
        let start = Instant::now();

        let primes_found = tokio::task::spawn_blocking(move || {
            let primes = cpu::count_primes(request.prime_limit, &deadline)?;
            let digest = cpu::hash_chain(request.hash_rounds, &deadline)?;
            std::hint::black_box(digest);
            Ok::<_, Error>(primes)
        })
        .await??;

        let cpu_time = start.elapsed();

        let io_bytes = request.io_bytes();
        let data = scratch::random_bytes(io_bytes as usize);

        deadline.check()?;
        let appended = self.scratch.append(&data).await?;
        deadline.check()?;
        let read = self.scratch.read_back(io_bytes).await?;

        let total_time = start.elapsed();

        let appended = match appended {
            AppendOutcome::Written(bytes) => bytes,
            AppendOutcome::Skipped => 0,
        };
        tracing::debug!(
            primes_found,
            ?cpu_time,
            ?total_time,
            appended,
            read,
            "workload complete"
        );

        Ok(WorkloadResult::new(
            &request,
            primes_found,
            cpu_time,
            total_time,
        ))
    }
}
