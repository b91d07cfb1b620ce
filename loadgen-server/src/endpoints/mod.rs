//! Contains all HTTP endpoint handlers.
//!
//! Use [`routes`] to create a router with all endpoints.

use axum::Router;

use crate::state::ServiceState;

pub mod common;
pub mod health;
mod workload;

/// Creates a router with the health check and workload endpoints.
pub fn routes() -> Router<ServiceState> {
    Router::new()
        .merge(health::router())
        .merge(workload::router())
}
