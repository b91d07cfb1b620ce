//! Exposes an in-process test server for use in integration tests.
//!
//! ```
//! use loadgen_test::server::TestServer;
//!
//! #[tokio::main]
//! async fn main() {
//!    let server = TestServer::new().await;
//!    let url = server.url("/health/");
//!    // use the URL in tests...
//! }
//! ```

use std::net::{SocketAddr, TcpListener};
use std::path::PathBuf;

use loadgen_server::config::Config;
use loadgen_server::state::State;
use loadgen_server::web::App;
use tempfile::TempDir;

/// An in-process test server for use in integration tests.
///
/// This server runs the full loadgen service with its scratch file in a temporary directory, which
/// is deleted when the server is dropped. It listens on a random available port on localhost.
#[derive(Debug)]
pub struct TestServer {
    handle: tokio::task::JoinHandle<()>,
    socket: SocketAddr,
    tempdir: TempDir,
}

impl TestServer {
    /// Starts a test server with the default configuration.
    pub async fn new() -> Self {
        Self::with_config(|_| ()).await
    }

    /// Starts a test server, letting `configure` adjust the configuration first.
    ///
    /// The scratch file path is set to the temporary directory before `configure` runs.
    pub async fn with_config(configure: impl FnOnce(&mut Config)) -> Self {
        let addr = SocketAddr::from(([127, 0, 0, 1], 0));
        let listener = TcpListener::bind(addr).unwrap();
        listener.set_nonblocking(true).unwrap();
        let socket = listener.local_addr().unwrap();

        let tempdir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.http_addr = socket;
        config.scratch.path = tempdir.path().join("scratch.bin");
        configure(&mut config);

        let state = State::new(config).unwrap();
        let app = App::new(state);

        let handle = tokio::spawn(async move {
            let listener = tokio::net::TcpListener::from_std(listener).unwrap();
            app.serve(listener).await.unwrap();
        });

        Self {
            handle,
            socket,
            tempdir,
        }
    }

    /// Returns a full URL pointing to the given path.
    ///
    /// This URL uses `localhost` as hostname.
    pub fn url(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        format!("http://localhost:{}/{}", self.socket.port(), path)
    }

    /// Returns the path of the scratch file used by this server.
    pub fn scratch_path(&self) -> PathBuf {
        self.tempdir.path().join("scratch.bin")
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
