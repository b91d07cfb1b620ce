use std::io;
use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while running a workload.
#[derive(Debug, Error)]
pub enum Error {
    /// The workload request is outside the accepted parameter range.
    #[error("invalid workload: {0}")]
    InvalidRequest(String),

    /// The maximum number of concurrent workloads is already running.
    #[error("too many concurrent workloads")]
    AtCapacity,

    /// The workload ran past its maximum duration and was aborted.
    #[error("workload exceeded maximum duration of {0:?}")]
    Timeout(Duration),

    /// An operation on the scratch file failed.
    #[error("scratch file {operation} failed")]
    Scratch {
        /// The operation that failed, such as `append` or `read`.
        operation: &'static str,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The task running the workload panicked or was cancelled.
    #[error("workload task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl Error {
    pub(crate) fn scratch(operation: &'static str) -> impl FnOnce(io::Error) -> Self {
        move |source| Self::Scratch { operation, source }
    }
}

/// Result type for workload operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;
