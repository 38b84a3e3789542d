//! `couponbot-core`: shared types, configuration and caption rendering.

pub mod caption;
pub mod config;
pub mod error;
pub mod types;

pub use error::{CouponError, Result};
pub use types::{Coupon, Schedule};
