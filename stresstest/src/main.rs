//! Command line entry point of the stresstest.
//!
//! Reads a YAML configuration describing the remote, the test duration, optional thresholds and
//! a list of workloads, then runs them with [`stresstest::run`]. Exits with an error if the
//! remote is unhealthy or a threshold is violated.

use std::path::PathBuf;

use anyhow::Context;
use argh::FromArgs;
use stresstest::Workload;
use stresstest::http::HttpRemote;

use crate::config::Config;

mod config;

/// Load driver for the loadgen server
#[derive(Debug, FromArgs)]
pub struct Args {
    /// path to the yaml configuration file
    #[argh(option, short = 'c')]
    pub config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Args = argh::from_env();

    let config_file = std::fs::File::open(args.config).context("failed to open config file")?;
    let config: Config =
        serde_yaml::from_reader(config_file).context("failed to parse config YAML")?;

    let remote = HttpRemote::new(config.remote);
    let workloads = config
        .workloads
        .into_iter()
        .map(|w| {
            w.stages
                .iter()
                .fold(Workload::builder(w.name), |builder, stage| {
                    builder.stage(stage.duration, stage.target)
                })
                .concurrency(w.concurrency)
                .request(w.request)
                .think_time(w.think_time)
                .build()
        })
        .collect();

    stresstest::run(remote, workloads, config.duration, &config.thresholds).await?;

    Ok(())
}
