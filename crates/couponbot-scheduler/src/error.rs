use thiserror::Error;

/// Errors that can occur within the scheduler subsystem.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The provided schedule definition is invalid.
    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),

    /// A job with the same name is already registered.
    #[error("Duplicate job: {name}")]
    DuplicateJob { name: String },
}

impl From<couponbot_core::CouponError> for SchedulerError {
    fn from(e: couponbot_core::CouponError) -> Self {
        match e {
            couponbot_core::CouponError::InvalidSchedule(msg) => SchedulerError::InvalidSchedule(msg),
            other => SchedulerError::InvalidSchedule(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
