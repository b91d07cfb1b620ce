//! This is a stresstest library which runs [`Workload`]s against a loadgen server.
//!
//! Each [`Workload`] simulates a number of virtual users, each sending one workload request at a
//! time with an optional think time in between. The number of active users is either constant or
//! ramps linearly through a list of stages, similar to k6's `ramping-vus` executor.
//!
//! After the run, client-side latency percentiles are printed next to the CPU and I/O times the
//! server reported, so queueing on the server can be told apart from the work it did. Optional
//! [`Thresholds`] turn the run into a pass/fail check.
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod http;
pub mod metrics;
pub mod stresstest;
pub mod thresholds;
pub mod workload;

pub use crate::stresstest::run;
pub use crate::thresholds::Thresholds;
pub use crate::workload::Workload;
