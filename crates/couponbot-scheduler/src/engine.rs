use chrono::{DateTime, Utc};
use tokio::sync::{
    mpsc::{self, error::TrySendError},
    watch,
};
use tracing::{info, warn};

use crate::{
    error::{Result, SchedulerError},
    schedule::compute_next_run,
    types::Job,
    Schedule,
};

/// Core scheduler: keeps the job table and fires due jobs at ±1 s precision.
///
/// Fired jobs are not executed here. A snapshot is handed to `fired_tx` and
/// the receiving worker runs it, so the tick loop never waits on a slow job.
pub struct SchedulerEngine {
    jobs: Vec<Job>,
    fired_tx: mpsc::Sender<Job>,
}

impl SchedulerEngine {
    /// Create an engine that forwards every fired [`Job`] to `fired_tx`.
    ///
    /// The sender is used with `try_send`: when the receiver still has an
    /// unprocessed fire queued, the new one is dropped with a warning.
    pub fn new(fired_tx: mpsc::Sender<Job>) -> Self {
        Self {
            jobs: Vec::new(),
            fired_tx,
        }
    }

    /// Register a job. With `run_on_start` the first fire happens on the
    /// next tick instead of one schedule period from now.
    pub fn add_job(&mut self, name: &str, schedule: Schedule, run_on_start: bool) -> Result<&Job> {
        self.add_job_at(name, schedule, run_on_start, Utc::now())
    }

    fn add_job_at(
        &mut self,
        name: &str,
        schedule: Schedule,
        run_on_start: bool,
        now: DateTime<Utc>,
    ) -> Result<&Job> {
        schedule.validate()?;
        if self.jobs.iter().any(|j| j.name == name) {
            return Err(SchedulerError::DuplicateJob {
                name: name.to_string(),
            });
        }

        let next_run = if run_on_start {
            Some(now)
        } else {
            compute_next_run(&schedule, now)
        };
        info!(job = %name, %schedule, next_run = ?next_run, "job added");

        self.jobs.push(Job {
            name: name.to_string(),
            schedule,
            last_run: None,
            next_run,
            run_count: 0,
        });
        let idx = self.jobs.len() - 1;
        Ok(&self.jobs[idx])
    }

    /// All registered jobs in insertion order.
    pub fn list_jobs(&self) -> &[Job] {
        &self.jobs
    }

    /// Main event loop. Ticks every second until `shutdown` broadcasts `true`.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(jobs = self.jobs.len(), "scheduler engine started");

        let mut interval = tokio::time::interval(std::time::Duration::from_secs(1));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.tick(Utc::now());
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("scheduler engine shutting down");
                        break;
                    }
                }
            }
        }
    }

    // --- private helpers ---------------------------------------------------

    /// Fire every job whose `next_run` is at or before `now`. Returns how many
    /// fires were handed to the channel.
    fn tick(&mut self, now: DateTime<Utc>) -> usize {
        let mut delivered = 0;
        for job in &mut self.jobs {
            let due = job.next_run.is_some_and(|next| next <= now);
            if !due {
                continue;
            }

            job.run_count += 1;
            job.last_run = Some(now);
            job.next_run = compute_next_run(&job.schedule, now);

            info!(
                job = %job.name,
                run = job.run_count,
                next_run = ?job.next_run,
                "job fired"
            );

            match self.fired_tx.try_send(job.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!(job = %job.name, "previous run still in progress, fire skipped");
                }
                Err(TrySendError::Closed(_)) => {
                    warn!(job = %job.name, "job worker gone, fire dropped");
                }
            }
        }
        delivered
    }
}
