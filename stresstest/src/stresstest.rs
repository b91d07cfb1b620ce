//! Run workloads concurrently against a loadgen server and print metrics.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use sketches_ddsketch::DDSketch;
use yansi::Paint;

use crate::http::{HttpRemote, Outcome};
use crate::metrics::{self, WorkloadMetrics};
use crate::thresholds::Thresholds;
use crate::workload::Workload;

/// How often idle virtual users check whether they should become active.
const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Runs the given workloads concurrently against the remote.
///
/// The function checks the health of the remote, runs all workloads concurrently, then prints
/// metrics and evaluates `thresholds` against the totals. Workloads without stages run for
/// `duration`. Returns an error if any threshold is violated.
pub async fn run(
    remote: HttpRemote,
    workloads: Vec<Workload>,
    duration: Duration,
    thresholds: &Thresholds,
) -> Result<()> {
    remote
        .health()
        .await
        .context("remote is not healthy, aborting")?;
    let remote = Arc::new(remote);

    let bar = ProgressBar::new_spinner()
        .with_style(ProgressStyle::with_template("{spinner} {msg} {elapsed}")?)
        .with_message("Running stresstest:");
    bar.enable_steady_tick(Duration::from_millis(100));

    // run the workloads concurrently
    let tasks: Vec<_> = workloads
        .into_iter()
        .map(|workload| {
            let remote = Arc::clone(&remote);
            tokio::spawn(run_workload(remote, workload, duration))
        })
        .collect();

    let finished_tasks = futures::future::join_all(tasks).await;
    bar.finish_and_clear();

    let mut total_metrics = WorkloadMetrics::default();
    for task in finished_tasks {
        let (workload, metrics) = task??;

        println!();
        print!(
            "{} {} (concurrency: {}",
            "## Workload".bold(),
            workload.name.bold().blue(),
            workload.max_concurrency().bold()
        );
        if !workload.stages.is_empty() {
            print!(", stages: {}", workload.stages.len());
        }
        if !workload.think_time.is_zero() {
            print!(", think time: {:?}", workload.think_time);
        }
        println!(")");
        let request = &workload.request;
        println!(
            "  prime_limit: {}; hash_rounds: {}; io_kb: {}",
            request.prime_limit, request.hash_rounds, request.io_kb
        );
        print_metrics(&metrics);

        total_metrics.merge(&metrics)?;
    }

    println!();
    println!("{}", "## TOTALS".bold());
    print_metrics(&total_metrics);

    if thresholds.is_empty() {
        return Ok(());
    }

    println!();
    println!("{}", "## THRESHOLDS".bold());
    let mut violations = 0;
    for check in thresholds.checks(&total_metrics) {
        if check.passed {
            println!("  {} {check}", "✓".green());
        } else {
            println!("  {} {check}", "✗".red());
            violations += 1;
        }
    }

    if violations > 0 {
        anyhow::bail!("{violations} threshold(s) violated");
    }

    Ok(())
}

async fn run_workload(
    remote: Arc<HttpRemote>,
    workload: Workload,
    duration: Duration,
) -> Result<(Arc<Workload>, WorkloadMetrics)> {
    let duration = workload.duration(duration);
    let workload = Arc::new(workload);
    let start = Instant::now();

    // Spawn every user up front. Users beyond the current target stay idle.
    let users: Vec<_> = (0..workload.max_concurrency())
        .map(|index| {
            let remote = Arc::clone(&remote);
            let workload = Arc::clone(&workload);
            tokio::spawn(run_user(remote, workload, index, start, duration))
        })
        .collect();

    let mut metrics = WorkloadMetrics::default();
    for user in futures::future::join_all(users).await {
        metrics.merge(&user?)?;
    }
    metrics.elapsed = start.elapsed();

    Ok((workload, metrics))
}

async fn run_user(
    remote: Arc<HttpRemote>,
    workload: Arc<Workload>,
    index: usize,
    start: Instant,
    duration: Duration,
) -> WorkloadMetrics {
    let mut metrics = WorkloadMetrics::default();

    loop {
        let elapsed = start.elapsed();
        if elapsed >= duration {
            break;
        }

        if index >= workload.target_concurrency(elapsed) {
            tokio::time::sleep(IDLE_POLL_INTERVAL.min(duration - elapsed)).await;
            continue;
        }

        let request_start = Instant::now();
        match remote.run_workload(&workload.request).await {
            Outcome::Completed(result) => metrics.record_completed(request_start.elapsed(), &result),
            Outcome::Throttled => metrics.throttled += 1,
            Outcome::Failed(error) => metrics.record_failure(error),
        }

        if !workload.think_time.is_zero() {
            tokio::time::sleep(workload.think_time).await;
        }
    }

    metrics
}

fn print_metrics(metrics: &WorkloadMetrics) {
    print!(
        "{} ({} ok",
        "REQUESTS:".bold().green(),
        metrics.completed().bold()
    );
    if metrics.throttled > 0 {
        print!(
            ", {}",
            format!("{} throttled", metrics.throttled).bold().yellow()
        );
    }
    if metrics.failures > 0 {
        print!(
            ", {}",
            format!("{} FAILURES", metrics.failures).bold().red()
        );
    }
    println!(")");

    if let Some(error) = &metrics.first_error {
        println!("  first failure: {}", error.red());
    }

    if metrics.completed() == 0 {
        return;
    }

    println!("  {:.2} requests/s", metrics.request_rate().bold());
    print!("  latency    ");
    print_percentiles(&metrics.latency, Duration::from_secs_f64);
    print!("  server cpu ");
    print_percentiles(&metrics.cpu_time, Duration::from_secs_f64);
    print!("  server io  ");
    print_percentiles(&metrics.io_time, Duration::from_secs_f64);
}

fn print_percentiles<T: fmt::Debug>(sketch: &DDSketch, map: impl Fn(f64) -> T) {
    let ops = sketch.count();
    let avg = map(sketch.sum().unwrap_or_default() / ops as f64);
    let quantile = |q| map(metrics::quantile(sketch, q).unwrap_or_default());
    let p50 = quantile(0.5);
    let p90 = quantile(0.9);
    let p95 = quantile(0.95);
    let p99 = quantile(0.99);
    println!(
        "avg: {:.2?}; p50: {p50:.2?}; p90: {p90:.2?}; p95: {p95:.2?}; p99: {p99:.2?}",
        avg.bold()
    );
}
