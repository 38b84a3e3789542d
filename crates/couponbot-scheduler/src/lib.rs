//! `couponbot-scheduler`: tokio-based trigger for the publishing cycle.
//!
//! # Overview
//!
//! Jobs live in memory. The [`engine::SchedulerEngine`] ticks every second
//! and forwards any job whose `next_run` has arrived to an mpsc channel,
//! then computes the following run time.
//!
//! # Schedule variants
//!
//! | Variant    | Behaviour                                   |
//! |------------|---------------------------------------------|
//! | `Interval` | Repeat every N seconds                      |
//! | `Hourly`   | Fire at :MM past every hour (UTC)           |

pub mod engine;
pub mod error;
pub mod schedule;
pub mod types;

pub use couponbot_core::types::Schedule;
pub use engine::SchedulerEngine;
pub use error::{Result, SchedulerError};
pub use types::Job;
