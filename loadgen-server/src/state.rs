//! Shared state of the web server.

use std::sync::Arc;

use loadgen_service::WorkloadService;

use crate::config::Config;
use crate::endpoints::health::HealthClock;

/// Shared reference to the loadgen [service state](State).
pub type ServiceState = Arc<State>;

/// Reference to the loadgen business logic.
///
/// This structure is created during server startup and shared with all HTTP request handlers.
///
/// In request handlers, use `axum::extract::State<ServiceState>` to retrieve a shared reference to
/// this structure.
#[derive(Debug)]
pub struct State {
    /// The server configuration.
    pub config: Config,
    /// The workload service instance.
    pub service: WorkloadService,
    /// Source of health check timestamps.
    pub health: HealthClock,
}

impl State {
    /// Creates the workload service for the given configuration.
    ///
    /// The scratch file is created lazily by the first workload.
    pub fn new(config: Config) -> anyhow::Result<ServiceState> {
        let service = WorkloadService::new(config.service_config()?);

        tracing::info!(
            scratch = %config.scratch.path.display(),
            max_concurrency = config.service.max_concurrency,
            "workload service ready"
        );

        Ok(Arc::new(Self {
            config,
            service,
            health: HealthClock::default(),
        }))
    }
}
