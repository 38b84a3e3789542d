//! `couponbot-store`: the two pieces of local state a cycle reads.
//!
//! - [`source`]: the coupon table, reloaded from a spreadsheet on every call.
//! - [`cursor`]: the index of the last published coupon, kept in a small
//!   JSON file next to the process.

pub mod cursor;
pub mod error;
pub mod source;

pub use cursor::CursorStore;
pub use error::{Result, StoreError};
pub use source::{CouponSource, SpreadsheetSource};
