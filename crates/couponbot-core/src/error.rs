use thiserror::Error;

#[derive(Debug, Error)]
pub enum CouponError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),
}

impl CouponError {
    /// Short error code string used in structured log fields.
    pub fn code(&self) -> &'static str {
        match self {
            CouponError::Config(_) => "CONFIG_ERROR",
            CouponError::InvalidSchedule(_) => "INVALID_SCHEDULE",
        }
    }
}

pub type Result<T> = std::result::Result<T, CouponError>;
