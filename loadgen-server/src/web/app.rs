use std::future;
use std::net::SocketAddr;

use anyhow::Result;
use axum::Router;
use sentry::integrations::tower::{NewSentryLayer, SentryHttpLayer};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::{DefaultOnFailure, TraceLayer};
use tracing::Level;

use crate::endpoints;
use crate::state::ServiceState;
use crate::web::middleware as m;

/// The loadgen web server application.
///
/// Serves the workload and health endpoints of a shared [`ServiceState`]. Every response carries
/// a `Server: loadgen/<version>` header, and panics in handlers turn into `500` responses.
#[derive(Debug)]
pub struct App {
    router: Router,
    graceful_shutdown: bool,
}

impl App {
    /// Creates the application for the given service state.
    ///
    /// Use [`serve`](Self::serve) to run the server future.
    pub fn new(state: ServiceState) -> Self {
        // Layers run top to bottom on requests and bottom to top on responses.
        let middleware = ServiceBuilder::new()
            .layer(CatchPanicLayer::custom(m::handle_panic))
            .layer(m::set_server_header())
            .layer(NewSentryLayer::new_from_top())
            .layer(SentryHttpLayer::new().enable_transaction())
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(m::make_http_span)
                    .on_failure(DefaultOnFailure::new().level(Level::DEBUG)),
            );

        Self {
            router: endpoints::routes().layer(middleware).with_state(state),
            graceful_shutdown: false,
        }
    }

    /// Stops accepting connections once shutdown is requested via `elegant_departure`.
    ///
    /// Disabled by default, in which case [`serve`](Self::serve) runs until its task is dropped.
    /// Workloads started by earlier requests keep running either way.
    pub fn graceful_shutdown(mut self, enable: bool) -> Self {
        self.graceful_shutdown = enable;
        self
    }

    /// Accepts connections on `listener` and serves requests until shutdown.
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        let shutdown = self
            .graceful_shutdown
            .then(elegant_departure::get_shutdown_guard);

        let service = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, service)
            .with_graceful_shutdown(async move {
                match shutdown {
                    Some(guard) => guard.wait_owned().await,
                    None => future::pending().await,
                }
            })
            .await?;

        Ok(())
    }
}
