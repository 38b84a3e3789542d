use serde::{Deserialize, Serialize};

use crate::error::{CouponError, Result};

/// Column headers every coupon table must carry, in caption order.
pub const COUPON_COLUMNS: [&str; 7] = [
    "title",
    "description",
    "code",
    "countries",
    "note",
    "link",
    "image",
];

/// One row of the coupon table.
///
/// Identity is the row position within a single load; records are rebuilt
/// from the spreadsheet on every cycle and never mutated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Coupon {
    pub title: String,
    pub description: String,
    pub code: String,
    pub countries: String,
    pub note: String,
    /// Purchase link shown in the caption.
    pub link: String,
    /// Publicly reachable image URL handed to the publisher.
    pub image: String,
}

impl Coupon {
    /// Build a coupon from cell values ordered like [`COUPON_COLUMNS`].
    pub fn from_fields(fields: [String; 7]) -> Self {
        let [title, description, code, countries, note, link, image] = fields;
        Self {
            title,
            description,
            code,
            countries,
            note,
            link,
            image,
        }
    }
}

/// Defines when the publishing job fires. Wall-clock alignment is UTC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Schedule {
    /// Repeat every N seconds, measured from the previous fire.
    Interval { every_secs: u64 },

    /// Fire once an hour at the given minute (0 = top of the hour).
    Hourly { minute: u8 },
}

impl Default for Schedule {
    fn default() -> Self {
        Schedule::Interval { every_secs: 3600 }
    }
}

impl Schedule {
    /// Reject values that can never produce a next run.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| -> Result<()> { Err(CouponError::InvalidSchedule(msg)) };
        match *self {
            Schedule::Interval { every_secs: 0 } => invalid("every_secs must be > 0".into()),
            Schedule::Hourly { minute } if minute > 59 => {
                invalid(format!("minute {minute} out of range 0..=59"))
            }
            _ => Ok(()),
        }
    }
}

impl std::fmt::Display for Schedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Schedule::Interval { every_secs } => write!(f, "every {every_secs}s"),
            Schedule::Hourly { minute } => write!(f, "hourly at :{minute:02}"),
        }
    }
}
