//! Log capture for tests.

use tracing_subscriber::EnvFilter;

/// Crates whose logs are shown at full verbosity.
const CRATE_NAMES: &[&str] = &["loadgen", "loadgen_server", "loadgen_service"];

/// Initialize the logger for testing.
///
/// Logs go to the output captured by the Rust test runner. Unless `RUST_LOG` is set, only warnings
/// of dependencies are shown, while the loadgen crates log at `DEBUG`. Calling this more than once
/// is harmless.
///
/// # Example
///
/// ```
/// loadgen_test::tracing::init();
/// ```
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        CRATE_NAMES
            .iter()
            .filter_map(|name| format!("{name}=DEBUG").parse().ok())
            .fold(EnvFilter::new("WARN"), EnvFilter::add_directive)
    });

    tracing_subscriber::fmt::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_test_writer()
        .compact()
        .try_init()
        .ok();
}
