use clap::Parser;
use couponbot_core::config::CouponConfig;
use tracing::{info, warn};

mod app;
mod cycle;
mod http;
mod service;

const DEFAULT_LOG_FILTER: &str =
    "couponbot_gateway=info,couponbot_store=info,couponbot_publisher=info,couponbot_scheduler=info,tower_http=info";

/// Posts a rotating coupon from a spreadsheet to a Facebook page on a schedule.
#[derive(Debug, Parser)]
#[command(name = "couponbot", version, about)]
struct Args {
    /// Path to couponbot.toml (default: $COUPONBOT_CONFIG, then ./couponbot.toml).
    #[arg(long, short)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .init();

    let args = Args::parse();

    let config = CouponConfig::load(args.config.as_deref()).unwrap_or_else(|e| {
        warn!("Config load failed ({}), using defaults", e);
        let mut cfg = CouponConfig::default();
        cfg.apply_env(|name| std::env::var(name).ok());
        cfg
    });
    info!(
        source = %config.source.path,
        cursor = %config.cursor.path,
        schedule = %config.scheduler.schedule,
        run_on_start = config.scheduler.run_on_start,
        "configuration loaded"
    );

    let service = service::Service::start(config).await?;
    info!(addr = %service.local_addr(), "health endpoint ready");

    shutdown_signal().await;
    info!("shutdown signal received");
    service.shutdown().await
}

/// Resolve on Ctrl-C, or SIGTERM on Unix (what container platforms send).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
