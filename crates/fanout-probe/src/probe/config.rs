use anyhow::bail;
use clap::Parser;
use core::time::Duration;
use fanout::{ClientOptions, Concurrency, DEFAULT_CONCURRENCY};
use std::path::PathBuf;

/// Command-line configuration for the `fanout-probe` binary.
///
/// Every option can also be supplied through the environment (or a `.env`
/// file in the working directory).
#[derive(Parser, Debug, Clone)]
#[command(
    name = "fanout-probe",
    version,
    about = "Fans gRPC health checks out to every live worker in a job registry"
)]
pub struct CliArgs {
    /// Path to a JSON file holding an array of worker records.
    ///
    /// Each record is an object with at least `url` and `proc` attributes
    /// (keys may also be written in symbol form, e.g. `":url"`). Records whose
    /// `proc` is missing or empty are skipped.
    ///
    /// Environment variable: `FANOUT_REGISTRY`
    #[arg(long, env = "FANOUT_REGISTRY")]
    pub registry: PathBuf,

    /// Maximum number of health checks in flight at once.
    ///
    /// Environment variable: `FANOUT_CONCURRENCY`
    #[arg(long, env = "FANOUT_CONCURRENCY", default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,

    /// Optional coordinator address to check alongside the workers.
    ///
    /// Environment variable: `FANOUT_COORDINATOR`
    #[arg(long, env = "FANOUT_COORDINATOR")]
    pub coordinator: Option<String>,

    /// gRPC health service name to query. The empty string asks for the
    /// overall server status.
    ///
    /// Environment variable: `HEALTH_SERVICE`
    #[arg(long, env = "HEALTH_SERVICE", default_value_t = String::new())]
    pub service: String,

    /// Timeout, in milliseconds, for establishing each connection.
    ///
    /// Environment variable: `CONNECT_TIMEOUT_MS`
    #[arg(long, env = "CONNECT_TIMEOUT_MS", default_value_t = 2_000)]
    pub connect_timeout_ms: u64,

    /// Timeout, in milliseconds, for each health check request.
    ///
    /// Environment variable: `REQUEST_TIMEOUT_MS`
    #[arg(long, env = "REQUEST_TIMEOUT_MS", default_value_t = 5_000)]
    pub request_timeout_ms: u64,

    /// User agent sent to every peer.
    ///
    /// Environment variable: `FANOUT_USER_AGENT`
    #[arg(long, env = "FANOUT_USER_AGENT")]
    pub user_agent: Option<String>,

    /// Print the report as JSON instead of a table.
    ///
    /// Environment variable: `FANOUT_JSON`
    #[arg(long, env = "FANOUT_JSON", default_value_t = false)]
    pub json: bool,
}

/// Validated probe configuration.
#[derive(Clone, Debug)]
pub struct ProbeConfig {
    pub registry: PathBuf,
    pub concurrency: Concurrency,
    pub coordinator: Option<String>,
    pub service: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub user_agent: Option<String>,
    pub json: bool,
}

impl ProbeConfig {
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            connect_timeout: self.connect_timeout,
            request_timeout: Some(self.request_timeout),
            user_agent: self.user_agent.clone(),
        }
    }
}

impl TryFrom<CliArgs> for ProbeConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let concurrency = Concurrency::new(args.concurrency)?;

        if args.connect_timeout_ms == 0 {
            bail!("connect_timeout_ms must be greater than 0");
        }
        if args.request_timeout_ms == 0 {
            bail!("request_timeout_ms must be greater than 0");
        }
        if !args.registry.is_file() {
            bail!("registry {} is not a readable file", args.registry.display());
        }
        if args.coordinator.as_deref().is_some_and(str::is_empty) {
            bail!("coordinator address must not be empty");
        }

        Ok(Self {
            registry: args.registry,
            concurrency,
            coordinator: args.coordinator,
            service: args.service,
            connect_timeout: Duration::from_millis(args.connect_timeout_ms),
            request_timeout: Duration::from_millis(args.request_timeout_ms),
            user_agent: args.user_agent,
            json: args.json,
        })
    }
}
