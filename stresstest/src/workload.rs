//! A module for defining a [`Workload`] that drives the loadgen server.

use std::time::Duration;

use loadgen_service::WorkloadRequest;

/// A builder for creating a [`Workload`].
#[derive(Debug)]
pub struct WorkloadBuilder {
    name: String,
    concurrency: usize,
    request: WorkloadRequest,
    think_time: Duration,
    stages: Vec<Stage>,
}

impl WorkloadBuilder {
    /// The number of virtual users, or the starting number if stages are configured.
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// The parameters sent with every request.
    pub fn request(mut self, request: WorkloadRequest) -> Self {
        self.request = request;
        self
    }

    /// Pause of each virtual user between two requests.
    pub fn think_time(mut self, think_time: Duration) -> Self {
        self.think_time = think_time;
        self
    }

    /// Appends a stage ramping the number of virtual users to `target` over `duration`.
    pub fn stage(mut self, duration: Duration, target: usize) -> Self {
        self.stages.push(Stage { duration, target });
        self
    }

    /// Creates the workload instance.
    pub fn build(self) -> Workload {
        Workload {
            name: self.name,
            concurrency: self.concurrency,
            request: self.request,
            think_time: self.think_time,
            stages: self.stages,
        }
    }
}

/// A linear ramp of the number of virtual users.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Stage {
    /// How long the ramp takes.
    pub duration: Duration,
    /// Number of virtual users at the end of the ramp.
    pub target: usize,
}

/// Specification of a load pattern that can be run against a loadgen server.
///
/// Every virtual user sends requests in a loop, one at a time, pausing for the think time in
/// between. Without stages, `concurrency` users run for the whole test. With stages, the number
/// of active users starts at `concurrency` and follows each stage's ramp in turn.
#[derive(Debug)]
pub struct Workload {
    /// Name of the workload for identification in the report.
    pub(crate) name: String,
    /// Initial number of virtual users.
    pub(crate) concurrency: usize,
    /// Parameters of every request.
    pub(crate) request: WorkloadRequest,
    /// Pause between two requests of the same user.
    pub(crate) think_time: Duration,
    /// Ramps applied after each other.
    pub(crate) stages: Vec<Stage>,
}

impl Workload {
    /// Constructs a new workload builder with the given name.
    pub fn builder(name: impl Into<String>) -> WorkloadBuilder {
        WorkloadBuilder {
            name: name.into(),
            concurrency: 1,
            request: WorkloadRequest::default(),
            think_time: Duration::ZERO,
            stages: Vec::new(),
        }
    }

    /// Returns how long this workload runs.
    ///
    /// With stages, this is the sum of their durations. Otherwise `default` is returned.
    pub fn duration(&self, default: Duration) -> Duration {
        if self.stages.is_empty() {
            default
        } else {
            self.stages.iter().map(|stage| stage.duration).sum()
        }
    }

    /// Returns the largest number of virtual users active at any time.
    pub fn max_concurrency(&self) -> usize {
        self.stages
            .iter()
            .map(|stage| stage.target)
            .fold(self.concurrency, usize::max)
    }

    /// Returns the number of virtual users that should be active `elapsed` into the test.
    pub fn target_concurrency(&self, elapsed: Duration) -> usize {
        let mut from = self.concurrency;
        let mut remaining = elapsed;

        for stage in &self.stages {
            if remaining < stage.duration {
                let progress = remaining.as_secs_f64() / stage.duration.as_secs_f64();
                let delta = (stage.target as f64 - from as f64) * progress;
                return (from as f64 + delta).round() as usize;
            }

            remaining -= stage.duration;
            from = stage.target;
        }

        from
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(secs: u64) -> Duration {
        Duration::from_secs(secs)
    }

    #[test]
    fn constant_without_stages() {
        let workload = Workload::builder("test").concurrency(8).build();

        assert_eq!(workload.target_concurrency(secs(0)), 8);
        assert_eq!(workload.target_concurrency(secs(1000)), 8);
        assert_eq!(workload.max_concurrency(), 8);
        assert_eq!(workload.duration(secs(30)), secs(30));
    }

    #[test]
    fn ramps_through_stages() {
        let workload = Workload::builder("test")
            .concurrency(0)
            .stage(secs(10), 10)
            .stage(secs(20), 10)
            .stage(secs(10), 2)
            .build();

        assert_eq!(workload.duration(secs(5)), secs(40));
        assert_eq!(workload.max_concurrency(), 10);

        assert_eq!(workload.target_concurrency(secs(0)), 0);
        assert_eq!(workload.target_concurrency(secs(5)), 5);
        assert_eq!(workload.target_concurrency(secs(10)), 10);
        assert_eq!(workload.target_concurrency(secs(25)), 10);
        assert_eq!(workload.target_concurrency(secs(35)), 6);
        assert_eq!(workload.target_concurrency(secs(40)), 2);
        assert_eq!(workload.target_concurrency(secs(100)), 2);
    }

    #[test]
    fn zero_length_stage_jumps() {
        let workload = Workload::builder("test")
            .concurrency(1)
            .stage(Duration::ZERO, 20)
            .stage(secs(10), 20)
            .build();

        assert_eq!(workload.target_concurrency(secs(0)), 20);
        assert_eq!(workload.max_concurrency(), 20);
    }
}
