//! Reproduces the shutdown race between periodic workers and a disposed dependency.
//!
//! ```text
//! cargo run --example rx_async_bug -- --variant token-bound --run-for 2.5
//! cargo run --example rx_async_bug -- --variant fixed --run-for 2.5
//! ```
//!
//! Unsafe variants log `UsedAfterDisposal` during the cleanup linger; safe ones never do.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info, warn};

use tickvisor::{Host, HostConfig, LogWriter, RuntimeError, Subscribe, WorkerVariant};

#[derive(Parser, Debug)]
#[command(name = "rx_async_bug")]
#[command(about = "Periodic worker shutdown race: broken and fixed stop strategies side by side")]
struct Args {
    /// Worker variant to run
    #[arg(long, default_value = "token_bound", help = "unsubscribe, token_bound, fixed or timer")]
    variant: WorkerVariant,

    /// Schedule period in seconds
    #[arg(long, default_value_t = 1.0)]
    interval: f64,

    /// Stop after this many seconds instead of waiting for a signal
    #[arg(long, value_name = "SECS")]
    run_for: Option<f64>,

    /// Host grace period in seconds (0 = wait for every unit)
    #[arg(long, default_value_t = 0.0)]
    grace: f64,

    /// Time the process stays up after shutdown, as a host doing more cleanup would
    #[arg(long, default_value_t = 2.0, value_name = "SECS")]
    linger: f64,

    /// Enable debug logging (every tick)
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.debug);

    let cfg = HostConfig {
        grace: Duration::try_from_secs_f64(args.grace)?,
        ..HostConfig::default()
    };
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let mut host = Host::builder(cfg)
        .with_subscribers(subs)
        .with_resource_name("ticker")
        .build();

    let interval = Duration::try_from_secs_f64(args.interval)?;
    let runner = args.variant.install(&mut host, interval);
    let cfg = runner.config();
    info!(
        variant = %args.variant,
        shutdown_safe = args.variant.is_shutdown_safe(),
        policy = cfg.stop_policy.as_label(),
        dispatch = ?cfg.dispatch,
        ?interval,
        "host starting"
    );

    let outcome = match args.run_for {
        Some(secs) => {
            host.run_until(tokio::time::sleep(Duration::try_from_secs_f64(secs)?))
                .await
        }
        None => host.run_until_signal().await,
    };
    match &outcome {
        Ok(report) => {
            let totals = report.totals();
            info!(
                dispatched = totals.dispatched,
                completed = totals.completed,
                abandoned = totals.abandoned,
                "host stopped"
            );
        }
        Err(RuntimeError::GraceExceeded { stuck, .. }) => {
            warn!(?stuck, "grace exceeded; resource left undisposed");
        }
        Err(e) => error!(error = %e, label = e.as_label(), "shutdown failed"),
    }

    tokio::time::sleep(Duration::try_from_secs_f64(args.linger)?).await;

    let resource = host.resource();
    let violations = resource.violations();
    host.close().await;

    if violations > 0 {
        error!(
            violations,
            accepted = resource.accepted(),
            last_tick = ?resource.last_accepted(),
            "resource used after disposal"
        );
    } else {
        info!(
            accepted = resource.accepted(),
            last_tick = ?resource.last_accepted(),
            "no use after disposal"
        );
    }
    outcome?;
    Ok(())
}

fn init_logging(debug: bool) {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let level = if debug { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("tickvisor={level},rx_async_bug={level}")));

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false))
        .with(env_filter)
        .init();
}
