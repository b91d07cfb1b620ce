//! Test utilities for the loadgen server.
//!
//! This crate provides utilities to facilitate black-box testing of the loadgen HTTP API. See the
//! modules for all available utilities.

pub mod server;
pub mod tracing;
