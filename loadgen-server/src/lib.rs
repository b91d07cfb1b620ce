//! The HTTP server component.
//!
//! This builds on top of [`loadgen_service`] and exposes its workloads over `HTTP`, so that load
//! testing tools can generate CPU and disk load on the host with plain `GET` requests.
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod cli;
pub mod config;
pub mod endpoints;
pub mod healthcheck;
pub mod observability;
pub mod state;
pub mod web;
