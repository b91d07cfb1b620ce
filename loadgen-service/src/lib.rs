//! The service layer generating synthetic CPU and disk load.
//!
//! A workload burns a tunable amount of CPU time by counting primes with trial division and
//! chaining SHA-256 rounds, then appends to and reads from a shared, size-capped scratch file.
//! Every phase is timed, so load tests can correlate client-side latency with the work the
//! server actually did.
//!
//! It is designed as a library crate to be used by the `server`. See [`WorkloadService`] for
//! the entry point.
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod cpu;
mod deadline;
mod error;
pub mod guard;
pub mod scratch;
pub mod service;
pub mod workload;

pub use deadline::Deadline;
pub use error::{Error, Result};
pub use scratch::{ScratchConfig, ScratchFile};
pub use service::{ServiceConfig, WorkloadService};
pub use workload::{WorkloadLimits, WorkloadRequest, WorkloadResult};
