#![doc = include_str!("../README.md")]

mod probe;

use clap::Parser;
use fanout::Handler;
use probe::{
    config::{CliArgs, ProbeConfig},
    health::{ProbeReport, probe_peers},
    registry::load_records,
    telemetry::init_telemetry,
};
use std::process::ExitCode;
use tokio::signal;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = ProbeConfig::try_from(args)?;

    init_telemetry()?;
    log_startup_info(&config);

    let records = load_records(&config.registry)?;
    let handler = Handler::new(config.client_options(), records)
        .with_concurrency(config.concurrency.get())?;

    let report = tokio::select! {
        report = probe_peers(&handler, config.coordinator.as_deref(), &config.service) => report?,
        () = shutdown_signal() => {
            #[cfg(feature = "tracing")]
            tracing::warn!("Interrupted before all checks completed");
            return Ok(ExitCode::from(130));
        }
    };

    print_report(&report, config.json)?;

    if report.failures() > 0 {
        #[cfg(feature = "tracing")]
        tracing::warn!("{} peer(s) not serving", report.failures());
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

fn log_startup_info(_config: &ProbeConfig) {
    if cfg!(debug_assertions) {
        #[cfg(feature = "tracing")]
        tracing::info!("Starting probe with full config: {:#?}", _config);
    } else {
        #[cfg(feature = "tracing")]
        tracing::info!(
            "Probing workers from {} with concurrency {}",
            _config.registry.display(),
            _config.concurrency
        );
    }
}

fn print_report(report: &ProbeReport, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        print!("{}", report.render_table());
    }
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(_e) => {
                #[cfg(feature = "tracing")]
                tracing::error!("Failed to install SIGTERM handler: {_e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        if let Err(_e) = signal::ctrl_c().await {
            #[cfg(feature = "tracing")]
            tracing::error!("Failed to install Ctrl+C handler: {_e}");
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        () = ctrl_c => {
            #[cfg(feature = "tracing")]
            tracing::info!("Received Ctrl+C signal");
        },
        () = terminate => {
            #[cfg(feature = "tracing")]
            tracing::info!("Received SIGTERM signal");
        },
    }
}
