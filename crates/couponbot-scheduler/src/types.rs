use chrono::{DateTime, Utc};

use crate::Schedule;

/// A registered job and its run bookkeeping.
#[derive(Debug, Clone)]
pub struct Job {
    /// Unique label; also used as the log field `job`.
    pub name: String,
    pub schedule: Schedule,
    /// Start of the most recent fire, if any.
    pub last_run: Option<DateTime<Utc>>,
    /// Next planned fire, if any.
    pub next_run: Option<DateTime<Utc>>,
    /// Number of times the job has fired since start.
    pub run_count: u32,
}
