//! Module implementing the loadgen webserver.
//!
//! The main server application is implemented in the [`App`] struct, which sets up routing and
//! middleware. It is a tower service that can be run using any compatible server framework.
//!
//! To listen to incoming connections, use the [`server()`] function, which opens a TCP listener,
//! serves the application and drains running workloads on shutdown.
//!
//! # Testing
//!
//! For end-to-end tests of the server, see the `loadgen-test` crate, which provides utilities
//! to start a test server on a random port.

mod app;
mod middleware;
mod server;

pub use app::App;
pub use server::server;
