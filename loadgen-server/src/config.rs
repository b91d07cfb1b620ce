//! Configuration for the loadgen server.
//!
//! This module provides the configuration system for the loadgen HTTP server. Configuration can
//! be loaded from multiple sources with the following precedence (highest to lowest):
//!
//! 1. Environment variables (prefixed with `LG__`)
//! 2. YAML configuration file (specified via `-c` or `--config` flag)
//! 3. Defaults
//!
//! See [`Config`] for a description of all configuration fields and their defaults.
//!
//! # Environment Variables
//!
//! Environment variables use `LG__` as a prefix and double underscores (`__`) to denote nested
//! configuration structures. For example:
//!
//! - `LG__HTTP_ADDR=0.0.0.0:8000` sets the HTTP server address
//! - `LG__SCRATCH__PATH=/data/scratch.bin` sets the scratch file location
//! - `LG__LIMITS__MAX_PRIME_LIMIT=1000000` caps the `prime_limit` parameter
//!
//! # YAML Configuration File
//!
//! Configuration can also be provided via a YAML file. The above configuration in YAML format would
//! look like this:
//!
//! ```yaml
//! http_addr: 0.0.0.0:8000
//!
//! scratch:
//!   path: /data/scratch.bin
//!
//! limits:
//!   max_prime_limit: 1000000
//! ```

use std::borrow::Cow;
use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::thread::available_parallelism;
use std::time::Duration;

use anyhow::Result;
use bytesize::ByteSize;
use figment::providers::{Env, Format, Serialized, Yaml};
use loadgen_service::scratch::{DEFAULT_INITIAL_SIZE, DEFAULT_MAX_SIZE};
use loadgen_service::service::{DEFAULT_CONCURRENCY_LIMIT, DEFAULT_MAX_DURATION, MAX_CONCURRENCY};
use loadgen_service::{ScratchConfig, ServiceConfig, WorkloadLimits};
use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;

/// Environment variable prefix for all configuration options.
const ENV_PREFIX: &str = "LG__";

/// Scratch file configuration.
///
/// The scratch file is the single on-disk resource that all workloads append to and read from.
///
/// Used in: [`Config::scratch`]
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Scratch {
    /// Location of the scratch file.
    ///
    /// Missing parent directories are created on first use. The file is never deleted by the
    /// server and is reused across restarts.
    ///
    /// # Default
    ///
    /// `/tmp/loadgen_scratch.bin`
    ///
    /// # Environment Variable
    ///
    /// `LG__SCRATCH__PATH`
    pub path: PathBuf,

    /// Size cap of the scratch file.
    ///
    /// Once the file has reached this size, the append phase of a workload is skipped. Accepts
    /// human-readable sizes such as `5 MiB`.
    ///
    /// # Default
    ///
    /// `5 MiB`
    ///
    /// # Environment Variable
    ///
    /// `LG__SCRATCH__MAX_SIZE`
    pub max_size: ByteSize,

    /// Size of the random contents written when the scratch file is created.
    ///
    /// # Default
    ///
    /// `1 MiB`
    ///
    /// # Environment Variable
    ///
    /// `LG__SCRATCH__INITIAL_SIZE`
    pub initial_size: ByteSize,
}

impl Default for Scratch {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/tmp/loadgen_scratch.bin"),
            max_size: ByteSize::b(DEFAULT_MAX_SIZE),
            initial_size: ByteSize::b(DEFAULT_INITIAL_SIZE),
        }
    }
}

/// Upper bounds for workload parameters.
///
/// Requests exceeding any of these are rejected with `400 Bad Request` before any work starts.
///
/// Used in: [`Config::limits`]
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Limits {
    /// Maximum accepted `prime_limit`.
    ///
    /// Prime counting uses trial division, so its cost grows faster than linearly with this value.
    ///
    /// # Default
    ///
    /// `5000000`
    ///
    /// # Environment Variable
    ///
    /// `LG__LIMITS__MAX_PRIME_LIMIT`
    pub max_prime_limit: u64,

    /// Maximum accepted `hash_rounds`.
    ///
    /// # Default
    ///
    /// `50000000`
    ///
    /// # Environment Variable
    ///
    /// `LG__LIMITS__MAX_HASH_ROUNDS`
    pub max_hash_rounds: u64,

    /// Maximum accepted `io_kb`.
    ///
    /// # Default
    ///
    /// `5120` (the default scratch file cap)
    ///
    /// # Environment Variable
    ///
    /// `LG__LIMITS__MAX_IO_KB`
    pub max_io_kb: u64,
}

impl Default for Limits {
    fn default() -> Self {
        let limits = WorkloadLimits::default();
        Self {
            max_prime_limit: limits.max_prime_limit,
            max_hash_rounds: limits.max_hash_rounds,
            max_io_kb: limits.max_io_kb,
        }
    }
}

/// Configuration for the [`WorkloadService`](loadgen_service::WorkloadService).
///
/// Used in: [`Config::service`]
///
/// # Environment Variables
///
/// - `LG__SERVICE__MAX_CONCURRENCY`
/// - `LG__SERVICE__MAX_DURATION`
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Service {
    /// Maximum number of concurrent workloads.
    ///
    /// Workloads that exceed the limit are rejected with HTTP 429. Values above
    /// [`MAX_CONCURRENCY`](loadgen_service::service::MAX_CONCURRENCY) are rejected at startup.
    ///
    /// # Default
    ///
    /// [`DEFAULT_CONCURRENCY_LIMIT`](loadgen_service::service::DEFAULT_CONCURRENCY_LIMIT)
    pub max_concurrency: usize,

    /// Maximum duration of a single workload.
    ///
    /// Workloads still running after this duration are aborted and answered with HTTP 503.
    /// Accepts human-readable durations such as `90s` or `2m`.
    ///
    /// # Default
    ///
    /// `2m`
    #[serde(with = "humantime_serde")]
    pub max_duration: Duration,
}

impl Default for Service {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_CONCURRENCY_LIMIT,
            max_duration: DEFAULT_MAX_DURATION,
        }
    }
}

/// Runtime configuration for the Tokio async runtime.
///
/// Controls the threading behavior of the server's async runtime.
///
/// Used in: [`Config::runtime`]
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Runtime {
    /// Number of worker threads for the server runtime.
    ///
    /// The CPU phases of workloads run on the separate blocking pool, so this mostly affects
    /// request handling and file I/O.
    ///
    /// # Default
    ///
    /// Defaults to the number of CPU cores on the host machine.
    ///
    /// # Environment Variable
    ///
    /// `LG__RUNTIME__WORKER_THREADS`
    pub worker_threads: usize,
}

impl Default for Runtime {
    fn default() -> Self {
        Self {
            worker_threads: available_parallelism().map_or(1, |n| n.get()),
        }
    }
}

/// [Sentry](https://sentry.io/) error tracking and performance monitoring configuration.
///
/// Sentry is disabled by default and only enabled when a DSN is provided.
///
/// Used in: [`Config::sentry`]
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Sentry {
    /// Sentry DSN (Data Source Name).
    ///
    /// # Default
    ///
    /// `None` (Sentry disabled)
    ///
    /// # Environment Variable
    ///
    /// `LG__SENTRY__DSN`
    pub dsn: Option<String>,

    /// Environment name for this deployment, such as `"production"` or `"staging"`.
    ///
    /// # Environment Variable
    ///
    /// `LG__SENTRY__ENVIRONMENT`
    pub environment: Option<Cow<'static, str>>,

    /// Server name or identifier, usually the hostname or pod name.
    ///
    /// # Environment Variable
    ///
    /// `LG__SENTRY__SERVER_NAME`
    pub server_name: Option<Cow<'static, str>>,

    /// Error event sampling rate.
    ///
    /// # Default
    ///
    /// `1.0` (send all errors)
    ///
    /// # Environment Variable
    ///
    /// `LG__SENTRY__SAMPLE_RATE`
    pub sample_rate: f32,

    /// Performance trace sampling rate.
    ///
    /// **Important**: Under a load test every request is a transaction. Keep this low.
    ///
    /// # Default
    ///
    /// `0.01` (send 1% of traces)
    ///
    /// # Environment Variable
    ///
    /// `LG__SENTRY__TRACES_SAMPLE_RATE`
    pub traces_sample_rate: f32,

    /// Enable Sentry SDK debug mode.
    ///
    /// # Default
    ///
    /// `false`
    ///
    /// # Environment Variable
    ///
    /// `LG__SENTRY__DEBUG`
    pub debug: bool,
}

impl Sentry {
    /// Returns whether Sentry integration is enabled.
    ///
    /// Sentry is considered enabled if a DSN is configured.
    pub fn is_enabled(&self) -> bool {
        self.dsn.is_some()
    }
}

impl Default for Sentry {
    fn default() -> Self {
        Self {
            dsn: None,
            environment: None,
            server_name: None,
            sample_rate: 1.0,
            traces_sample_rate: 0.01,
            debug: false,
        }
    }
}

/// Log output format.
///
/// Controls how log messages are formatted. The format can be explicitly specified or
/// auto-detected based on whether output is to a TTY.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Auto detect the best format.
    ///
    /// This chooses [`LogFormat::Pretty`] for TTY, otherwise [`LogFormat::Simplified`].
    Auto,

    /// Pretty printing with colors.
    ///
    /// ```text
    ///  INFO  loadgen_server::web::server > HTTP server listening on 0.0.0.0:8000
    /// ```
    Pretty,

    /// Simplified plain text output.
    ///
    /// ```text
    /// 2025-06-04T12:10:32Z  INFO loadgen_server::web::server: HTTP server listening on 0.0.0.0:8000
    /// ```
    Simplified,

    /// Dump out JSON lines.
    ///
    /// ```text
    /// {"timestamp":"2025-06-04T12:11:08.729716Z","level":"INFO","message":"HTTP server listening on 0.0.0.0:8000","target":"loadgen_server::web::server"}
    /// ```
    Json,
}

/// The logging format parse error.
#[derive(Clone, Debug)]
pub struct FormatParseError(String);

impl fmt::Display for FormatParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            r#"error parsing "{}" as format: expected one of "auto", "pretty", "simplified", "json""#,
            self.0
        )
    }
}

impl std::str::FromStr for LogFormat {
    type Err = FormatParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let result = match s {
            "" => LogFormat::Auto,
            s if s.eq_ignore_ascii_case("auto") => LogFormat::Auto,
            s if s.eq_ignore_ascii_case("pretty") => LogFormat::Pretty,
            s if s.eq_ignore_ascii_case("simplified") => LogFormat::Simplified,
            s if s.eq_ignore_ascii_case("json") => LogFormat::Json,
            s => return Err(FormatParseError(s.into())),
        };

        Ok(result)
    }
}

impl std::error::Error for FormatParseError {}

mod display_fromstr {
    pub fn serialize<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
        T: std::fmt::Display,
    {
        serializer.collect_str(&value)
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        D: serde::Deserializer<'de>,
        T: std::str::FromStr,
        <T as std::str::FromStr>::Err: std::fmt::Display,
    {
        use serde::Deserialize;
        let s = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Logging configuration.
///
/// Controls the verbosity and format of log output. Logs are always written to stderr.
///
/// Used in: [`Config::logging`]
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Logging {
    /// Minimum log level to output.
    ///
    /// Valid levels in increasing severity: TRACE, DEBUG, INFO, WARN, ERROR, OFF. The `RUST_LOG`
    /// environment variable provides more granular control per module if needed.
    ///
    /// **Important**: `DEBUG` logs one line per completed workload and `TRACE` one per scratch
    /// file section. Both are very verbose under load.
    ///
    /// # Default
    ///
    /// `INFO`
    ///
    /// # Environment Variable
    ///
    /// `LG__LOGGING__LEVEL`
    #[serde(with = "display_fromstr")]
    pub level: LevelFilter,

    /// Log output format.
    ///
    /// See [`LogFormat`] for available options and examples.
    ///
    /// # Default
    ///
    /// `Auto` (pretty for TTY, simplified otherwise)
    ///
    /// # Environment Variable
    ///
    /// `LG__LOGGING__FORMAT`
    pub format: LogFormat,
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            level: LevelFilter::INFO,
            format: LogFormat::Auto,
        }
    }
}

/// Main configuration struct for the loadgen server.
///
/// Configuration is loaded with the following precedence (highest to lowest):
/// 1. Environment variables (prefixed with `LG__`)
/// 2. YAML configuration file (if provided via `-c` flag)
/// 3. Default values
///
/// See individual field documentation for details on each configuration option, including
/// defaults and environment variables.
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server bind address.
    ///
    /// # Default
    ///
    /// `0.0.0.0:8000`
    ///
    /// # Environment Variable
    ///
    /// `LG__HTTP_ADDR`
    pub http_addr: SocketAddr,

    /// The scratch file shared by all workloads. See [`Scratch`].
    pub scratch: Scratch,

    /// Upper bounds for workload parameters. See [`Limits`].
    pub limits: Limits,

    /// Configuration for the [`WorkloadService`](loadgen_service::WorkloadService).
    pub service: Service,

    /// Configuration of the internal task runtime. See [`Runtime`].
    pub runtime: Runtime,

    /// Logging configuration. See [`Logging`].
    pub logging: Logging,

    /// Optional Sentry integration. See [`Sentry`].
    pub sentry: Sentry,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            scratch: Scratch::default(),
            limits: Limits::default(),
            service: Service::default(),
            runtime: Runtime::default(),
            logging: Logging::default(),
            sentry: Sentry::default(),
        }
    }
}

impl Config {
    /// Loads configuration from the provided arguments.
    ///
    /// Configuration is merged in the following order (later sources override earlier ones):
    /// 1. Default values
    /// 2. YAML configuration file (if provided in `args`)
    /// 3. Environment variables (prefixed with `LG__`)
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The YAML configuration file cannot be read or parsed
    /// - Environment variables contain invalid values
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = figment::Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        let config = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;

        Ok(config)
    }

    /// Builds the configuration of the [`WorkloadService`](loadgen_service::WorkloadService).
    ///
    /// # Errors
    ///
    /// Returns an error if `service.max_concurrency` exceeds
    /// [`MAX_CONCURRENCY`](loadgen_service::service::MAX_CONCURRENCY).
    pub fn service_config(&self) -> Result<ServiceConfig> {
        let max_concurrency = self.service.max_concurrency;
        if max_concurrency > MAX_CONCURRENCY {
            anyhow::bail!(
                "service.max_concurrency must be at most {MAX_CONCURRENCY}, got {max_concurrency}"
            );
        }

        Ok(ServiceConfig {
            scratch: ScratchConfig {
                path: self.scratch.path.clone(),
                max_size: self.scratch.max_size.as_u64(),
                initial_size: self.scratch.initial_size.as_u64(),
            },
            limits: WorkloadLimits {
                max_prime_limit: self.limits.max_prime_limit,
                max_hash_rounds: self.limits.max_hash_rounds,
                max_io_kb: self.limits.max_io_kb,
            },
            max_concurrency,
            max_duration: self.service.max_duration,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults() {
        figment::Jail::expect_with(|_jail| {
            let config = Config::load(None).unwrap();

            assert_eq!(config.http_addr, "0.0.0.0:8000".parse().unwrap());
            assert_eq!(config.scratch.path, Path::new("/tmp/loadgen_scratch.bin"));
            assert_eq!(config.scratch.max_size, ByteSize::mib(5));
            assert_eq!(config.scratch.initial_size, ByteSize::mib(1));
            assert_eq!(config.service.max_duration, Duration::from_secs(120));
            assert_eq!(config.logging.level, LevelFilter::INFO);
            assert!(!config.sentry.is_enabled());

            Ok(())
        });
    }

    #[test]
    fn configurable_via_env() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("LG__HTTP_ADDR", "127.0.0.1:9000");
            jail.set_env("LG__SCRATCH__PATH", "/data/scratch.bin");
            jail.set_env("LG__SCRATCH__MAX_SIZE", "2 MiB");
            jail.set_env("LG__LIMITS__MAX_PRIME_LIMIT", "1000");
            jail.set_env("LG__SERVICE__MAX_CONCURRENCY", "8");
            jail.set_env("LG__SERVICE__MAX_DURATION", "30s");
            jail.set_env("LG__LOGGING__LEVEL", "debug");
            jail.set_env("LG__LOGGING__FORMAT", "json");
            jail.set_env("LG__SENTRY__DSN", "abcde");
            jail.set_env("LG__SENTRY__SAMPLE_RATE", "0.5");

            let config = Config::load(None).unwrap();

            assert_eq!(config.http_addr, "127.0.0.1:9000".parse().unwrap());
            assert_eq!(config.scratch.path, Path::new("/data/scratch.bin"));
            assert_eq!(config.scratch.max_size, ByteSize::mib(2));
            assert_eq!(config.limits.max_prime_limit, 1000);
            assert_eq!(config.service.max_concurrency, 8);
            assert_eq!(config.service.max_duration, Duration::from_secs(30));
            assert_eq!(config.logging.level, LevelFilter::DEBUG);
            assert_eq!(config.logging.format, LogFormat::Json);
            assert_eq!(config.sentry.dsn.as_deref(), Some("abcde"));
            assert_eq!(config.sentry.sample_rate, 0.5);

            Ok(())
        });
    }

    #[test]
    fn configurable_via_yaml() {
        let mut tempfile = tempfile::NamedTempFile::new().unwrap();
        tempfile
            .write_all(
                br#"
            http_addr: 127.0.0.1:9000
            scratch:
                path: /data/scratch.bin
                initial_size: 512 KiB
            limits:
                max_io_kb: 64
            service:
                max_duration: 1m 30s
            "#,
            )
            .unwrap();

        figment::Jail::expect_with(|_jail| {
            let config = Config::load(Some(tempfile.path())).unwrap();

            assert_eq!(config.http_addr, "127.0.0.1:9000".parse().unwrap());
            assert_eq!(config.scratch.path, Path::new("/data/scratch.bin"));
            assert_eq!(config.scratch.initial_size, ByteSize::kib(512));
            // untouched fields keep their defaults
            assert_eq!(config.scratch.max_size, ByteSize::mib(5));
            assert_eq!(config.limits.max_io_kb, 64);
            assert_eq!(config.service.max_duration, Duration::from_secs(90));

            Ok(())
        });
    }

    #[test]
    fn configured_with_env_and_yaml() {
        let mut tempfile = tempfile::NamedTempFile::new().unwrap();
        tempfile
            .write_all(
                br#"
            limits:
                max_hash_rounds: 100
            "#,
            )
            .unwrap();

        figment::Jail::expect_with(|jail| {
            jail.set_env("LG__LIMITS__MAX_HASH_ROUNDS", "200");

            let config = Config::load(Some(tempfile.path())).unwrap();

            // Env should overwrite the yaml config
            assert_eq!(config.limits.max_hash_rounds, 200);

            Ok(())
        });
    }

    #[test]
    fn maps_to_service_config() {
        let config = Config {
            scratch: Scratch {
                path: PathBuf::from("/data/scratch.bin"),
                max_size: ByteSize::kib(64),
                initial_size: ByteSize::kib(16),
            },
            ..Default::default()
        };

        let service = config.service_config().unwrap();

        assert_eq!(service.scratch.path, Path::new("/data/scratch.bin"));
        assert_eq!(service.scratch.max_size, 64 * 1024);
        assert_eq!(service.scratch.initial_size, 16 * 1024);
        assert_eq!(service.limits, WorkloadLimits::default());
        assert_eq!(service.max_concurrency, DEFAULT_CONCURRENCY_LIMIT);
    }

    #[test]
    fn rejects_oversized_concurrency() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("LG__SERVICE__MAX_CONCURRENCY", usize::MAX.to_string());

            let config = Config::load(None).unwrap();
            let err = config.service_config().unwrap_err();
            assert!(err.to_string().contains("max_concurrency"));

            Ok(())
        });
    }

    #[test]
    fn rejects_unknown_log_format() {
        assert!("fancy".parse::<LogFormat>().is_err());
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
    }
}
