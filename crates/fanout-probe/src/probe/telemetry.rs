//! Log output for the probe.
//!
//! Events are written to stderr through `tracing_subscriber::fmt`, filtered by
//! `RUST_LOG` (default `info`). Set `LOG_FORMAT=json` for machine-readable
//! output.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub fn init_telemetry() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let json = std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_current_span(true)
                    .with_timer(tracing_subscriber::fmt::time::ChronoUtc::rfc_3339()),
            )
            .try_init()?;
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_thread_ids(true)
                    .with_line_number(true)
                    .with_target(false)
                    .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339()),
            )
            .try_init()?;
    }

    Ok(())
}
