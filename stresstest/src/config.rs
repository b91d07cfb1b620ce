use std::time::Duration;

use loadgen_service::WorkloadRequest;
use serde::Deserialize;
use stresstest::Thresholds;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub remote: String,

    #[serde(with = "humantime_serde")]
    pub duration: Duration,

    #[serde(default)]
    pub thresholds: Thresholds,

    pub workloads: Vec<Workload>,
}

#[derive(Debug, Deserialize)]
pub struct Workload {
    pub name: String,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default)]
    pub request: WorkloadRequest,
    #[serde(default, with = "humantime_serde")]
    pub think_time: Duration,
    #[serde(default)]
    pub stages: Vec<Stage>,
}

#[derive(Debug, Deserialize)]
pub struct Stage {
    #[serde(with = "humantime_serde")]
    pub duration: Duration,
    pub target: usize,
}

fn default_concurrency() -> usize {
    1
}
