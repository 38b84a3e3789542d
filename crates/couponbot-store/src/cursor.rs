use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::Result;

/// On-disk shape of the cursor file.
#[derive(Debug, Serialize, Deserialize)]
struct CursorState {
    last_index: i64,
}

/// Persists the index of the last successfully published coupon.
///
/// The file is written by a single worker only; each write replaces the file
/// through a sibling temp file so a crash never leaves half a JSON object.
pub struct CursorStore {
    path: PathBuf,
}

impl CursorStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored cursor.
    ///
    /// `Ok(None)` when the file does not exist. A JSON document without an
    /// integer `last_index` counts as `-1` (nothing published yet).
    pub fn read_last_index(&self) -> Result<Option<i64>> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let value: Value = serde_json::from_str(&text)?;
        Ok(Some(
            value.get("last_index").and_then(Value::as_i64).unwrap_or(-1),
        ))
    }

    /// Index of the coupon to publish next, in `0..total`.
    ///
    /// Never fails: a missing or unreadable cursor restarts the rotation at 0.
    pub fn next_index(&self, total: usize) -> usize {
        if total == 0 {
            warn!("next_index called with an empty coupon list");
            return 0;
        }
        match self.read_last_index() {
            Ok(Some(last)) => advance(last, total),
            Ok(None) => {
                debug!(path = %self.path.display(), "no cursor file, starting at 0");
                0
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "cursor unreadable, starting at 0");
                0
            }
        }
    }

    /// Overwrite the cursor with `index`.
    pub fn update(&self, index: usize) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let body = serde_json::to_string(&CursorState {
            last_index: index as i64,
        })?;

        let mut tmp_name = self.path.file_name().unwrap_or_default().to_os_string();
        tmp_name.push(".tmp");
        let tmp = self.path.with_file_name(tmp_name);

        std::fs::write(&tmp, body)?;
        std::fs::rename(&tmp, &self.path)?;
        info!(path = %self.path.display(), last_index = index, "cursor updated");
        Ok(())
    }
}

/// Step `last` forward by one with wraparound over `total` (> 0).
///
/// A stored index past the end means the table shrank since the last cycle.
/// Rather than letting the modulo land on an arbitrary row, the cursor is
/// clamped to the last row so the rotation restarts at 0.
pub fn advance(last: i64, total: usize) -> usize {
    let total_i = total as i64;
    let last = if last >= total_i {
        warn!(last, total, "stored cursor is beyond the coupon table, restarting rotation");
        total_i - 1
    } else if last < -1 {
        warn!(last, "stored cursor is negative, restarting rotation");
        -1
    } else {
        last
    };
    ((last + 1) % total_i) as usize
}
