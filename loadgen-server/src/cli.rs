//! Command line interface of the `loadgen` binary.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use argh::FromArgs;
use tokio::runtime::Runtime;

use crate::config::Config;
use crate::{healthcheck, observability, web};

/// Synthetic CPU and disk load generator.
#[derive(Debug, FromArgs)]
struct Args {
    /// path to the YAML configuration file
    #[argh(option, short = 'c')]
    config: Option<PathBuf>,

    #[argh(subcommand)]
    command: Command,
}

#[derive(Debug, FromArgs, PartialEq)]
#[argh(subcommand)]
enum Command {
    Run(RunCommand),
    Healthcheck(HealthcheckCommand),
    Version(VersionCommand),
}

/// serve the workload endpoints until terminated
#[derive(Debug, FromArgs, PartialEq)]
#[argh(subcommand, name = "run")]
struct RunCommand {}

/// check that a loadgen server on the configured address is healthy
///
/// Exits with a non-zero status if the server does not answer in time or reports itself
/// unhealthy. This is used for Docker healthchecks.
#[derive(Debug, FromArgs, PartialEq)]
#[argh(subcommand, name = "healthcheck")]
struct HealthcheckCommand {
    /// seconds to wait for the response
    #[argh(option, default = "5")]
    timeout: u64,
}

/// print the loadgen version
#[derive(Debug, FromArgs, PartialEq)]
#[argh(subcommand, name = "version")]
struct VersionCommand {}

/// Parses the command line, sets up logging and runs the selected command.
pub fn execute() -> Result<()> {
    let args: Args = argh::from_env();

    let command = match args.command {
        Command::Version(VersionCommand {}) => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        command => command,
    };

    let config = Config::load(args.config.as_deref())?;

    // Sentry should be initialized before creating the async runtime.
    let _sentry_guard = observability::init_sentry(&config);

    let runtime = build_runtime(&config)?;
    let _runtime_guard = runtime.enter();

    observability::init_tracing(&config);
    tracing::debug!(?config);

    runtime.block_on(async move {
        match command {
            Command::Run(RunCommand {}) => web::server(config).await,
            Command::Healthcheck(HealthcheckCommand { timeout }) => {
                healthcheck::healthcheck(config, Duration::from_secs(timeout)).await
            }
            Command::Version(VersionCommand {}) => Ok(()),
        }
    })
}

/// Builds the multi-threaded runtime serving requests.
///
/// CPU phases of workloads run on the runtime's blocking pool, not on these workers.
fn build_runtime(config: &Config) -> Result<Runtime> {
    let worker_threads = config.runtime.worker_threads;
    if worker_threads == 0 {
        anyhow::bail!("runtime.worker_threads must be at least 1");
    }

    tokio::runtime::Builder::new_multi_thread()
        .thread_name("loadgen-worker")
        .enable_all()
        .worker_threads(worker_threads)
        .build()
        .context("failed to build the async runtime")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::from_args(&["loadgen"], args).unwrap()
    }

    #[test]
    fn parses_config_and_command() {
        let args = parse(&["-c", "loadgen.yml", "run"]);
        assert_eq!(args.config, Some(PathBuf::from("loadgen.yml")));
        assert_eq!(args.command, Command::Run(RunCommand {}));
    }

    #[test]
    fn healthcheck_timeout() {
        let args = parse(&["healthcheck"]);
        assert_eq!(
            args.command,
            Command::Healthcheck(HealthcheckCommand { timeout: 5 })
        );

        let args = parse(&["healthcheck", "--timeout", "1"]);
        assert_eq!(
            args.command,
            Command::Healthcheck(HealthcheckCommand { timeout: 1 })
        );
    }

    #[test]
    fn runtime_needs_workers() {
        let mut config = Config::default();
        config.runtime.worker_threads = 0;
        assert!(build_runtime(&config).is_err());

        config.runtime.worker_threads = 2;
        let runtime = build_runtime(&config).unwrap();
        assert_eq!(runtime.metrics().num_workers(), 2);
    }
}
