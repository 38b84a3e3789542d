//! Process lifecycle: everything that runs between startup and shutdown.
//!
//! [`Service::start`] owns the three long-lived tasks (scheduler engine,
//! cycle worker, HTTP listener) and [`Service::shutdown`] stops them in
//! order. Nothing here lives in a global.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use couponbot_core::config::CouponConfig;
use couponbot_scheduler::{Job, SchedulerEngine};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::app::{build_router, AppState};
use crate::cycle::{CycleOutcome, Poster};

/// Name of the single scheduled job.
pub const POST_JOB: &str = "post_coupon";

pub struct Service {
    addr: SocketAddr,
    shutdown_tx: watch::Sender<bool>,
    scheduler: JoinHandle<()>,
    worker: JoinHandle<()>,
    server: JoinHandle<std::io::Result<()>>,
}

impl Service {
    /// Build the poster from `config` and start all tasks.
    pub async fn start(config: CouponConfig) -> anyhow::Result<Self> {
        let poster = Poster::from_config(&config).context("building Graph API publisher")?;
        Self::start_with(config, poster).await
    }

    /// Start all tasks around an already-built [`Poster`].
    pub async fn start_with(config: CouponConfig, poster: Poster) -> anyhow::Result<Self> {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        // One slot: a fire arriving while a cycle runs waits; a second one
        // is dropped by the engine so cycles never pile up.
        let (fired_tx, fired_rx) = mpsc::channel::<Job>(1);
        let mut engine = SchedulerEngine::new(fired_tx);
        engine.add_job(
            POST_JOB,
            config.scheduler.schedule.clone(),
            config.scheduler.run_on_start,
        )?;

        let addr: SocketAddr = format!("{}:{}", config.gateway.bind, config.gateway.port)
            .parse()
            .with_context(|| format!("invalid bind address {}", config.gateway.bind))?;
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("binding {addr}"))?;
        let addr = listener.local_addr()?;

        let router = build_router(Arc::new(AppState::new(config)));

        let scheduler = tokio::spawn(engine.run(shutdown_rx.clone()));
        let worker = tokio::spawn(run_worker(poster, fired_rx, shutdown_rx.clone()));
        let server = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(wait_for_shutdown(shutdown_rx))
                .await
        });

        Ok(Self {
            addr,
            shutdown_tx,
            scheduler,
            worker,
            server,
        })
    }

    /// Address the health endpoint is bound to (resolves port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Signal every task to stop and wait for them. A cycle already in
    /// flight is allowed to finish.
    pub async fn shutdown(self) -> anyhow::Result<()> {
        // Err only means every receiver is already gone.
        let _ = self.shutdown_tx.send(true);
        self.scheduler.await.context("scheduler task panicked")?;
        self.worker.await.context("cycle worker panicked")?;
        self.server
            .await
            .context("HTTP server task panicked")?
            .context("HTTP server error")?;
        info!("couponbot stopped");
        Ok(())
    }
}

/// Run one cycle per fired job, strictly one at a time.
///
/// Each cycle runs in its own task so a panic ends that cycle and not the
/// worker.
async fn run_worker(
    poster: Poster,
    mut fired_rx: mpsc::Receiver<Job>,
    mut shutdown: watch::Receiver<bool>,
) {
    let poster = Arc::new(poster);
    loop {
        let job = tokio::select! {
            job = fired_rx.recv() => match job {
                Some(job) => job,
                None => break,
            },
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
                continue;
            }
        };

        info!(job = %job.name, run = job.run_count, "cycle started");
        let cycle = tokio::spawn({
            let poster = Arc::clone(&poster);
            async move { poster.run_cycle().await }
        });
        match cycle.await {
            Ok(outcome) => log_outcome(&job, outcome),
            Err(e) if e.is_panic() => {
                error!(job = %job.name, error = %e, "cycle finished: panicked")
            }
            Err(e) => warn!(job = %job.name, error = %e, "cycle finished: cancelled"),
        }
    }
    info!("cycle worker stopped");
}

fn log_outcome(job: &Job, outcome: CycleOutcome) {
    match outcome {
        CycleOutcome::Published { index, receipt } => {
            info!(job = %job.name, index, post_id = ?receipt.post_id, "cycle finished: published")
        }
        CycleOutcome::NoCoupons => warn!(job = %job.name, "cycle finished: no coupons"),
        CycleOutcome::SourceFailed => {
            warn!(job = %job.name, "cycle finished: coupon table unreadable")
        }
        CycleOutcome::PublishFailed { index, error } => warn!(
            job = %job.name,
            index,
            auth = error.is_auth_failure(),
            "cycle finished: publish failed"
        ),
        CycleOutcome::CursorWriteFailed { index } => {
            warn!(job = %job.name, index, "cycle finished: cursor not saved")
        }
    }
}

async fn wait_for_shutdown(mut rx: watch::Receiver<bool>) {
    while !*rx.borrow() {
        if rx.changed().await.is_err() {
            break;
        }
    }
}
