use chrono::{DateTime, Datelike, Duration, TimeZone, Timelike, Utc};

use crate::Schedule;

/// Compute the next UTC execution time for `schedule` strictly after `from`.
///
/// Returns `None` only when the wall-clock time cannot be built (an
/// out-of-range minute that slipped past validation).
pub fn compute_next_run(schedule: &Schedule, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match schedule {
        Schedule::Interval { every_secs } => {
            Some(from + Duration::seconds((*every_secs).max(1) as i64))
        }

        Schedule::Hourly { minute } => {
            let candidate = Utc
                .with_ymd_and_hms(
                    from.year(),
                    from.month(),
                    from.day(),
                    from.hour(),
                    *minute as u32,
                    0,
                )
                .single()?;
            if candidate > from {
                Some(candidate)
            } else {
                Some(candidate + Duration::hours(1))
            }
        }
    }
}
