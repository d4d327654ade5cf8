//! Booking resilience service (v1)
//!
//! Serves the barbershop's service catalog and appointment availability to
//! the WhatsApp assistant, shielding it from the booking site being slow,
//! broken or down.
//!
//! # Architecture Overview
//!
//! ```text
//!   Assistant request
//!   ───────────────▶ http server ──▶ booking service ──▶ fallback chain
//!                                                          │
//!                  ┌─────────────────┬─────────────────────┼──────────────────┐
//!                  ▼                 ▼                     ▼                  ▼
//!           circuit breaker    upstream fetch        tiered cache      static fallback
//!           (shared store)    (scraper service,     (fresh / stale,
//!                              retry schedule)        hard expiry)
//! ```

use clap::Parser;
use std::path::PathBuf;

use booking_resilience::clock;
use booking_resilience::lifecycle::{startup, Runtime, Shutdown};
use booking_resilience::observability::logging::init_logging;

#[derive(Parser)]
#[command(name = "booking-resilience")]
#[command(about = "Resilient catalog and availability service for the booking assistant", long_about = None)]
struct Args {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = startup::load(args.config.as_deref())?;
    init_logging(&config.observability);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "booking-resilience starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        failure_threshold = config.breaker.failure_threshold,
        cooldown_secs = config.breaker.cooldown_secs,
        max_attempts = config.retries.max_attempts,
        "Configuration loaded"
    );

    let runtime = Runtime::build(config, clock::system())?;

    let shutdown = Shutdown::new();
    shutdown.trigger_on_signal();
    runtime.run(&shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
