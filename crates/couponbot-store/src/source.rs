use std::path::PathBuf;

use calamine::{open_workbook_auto, Data, Reader};
use couponbot_core::types::{Coupon, COUPON_COLUMNS};
use tracing::debug;

use crate::error::{Result, StoreError};

/// Anything that can produce the ordered coupon list for one cycle.
pub trait CouponSource: Send + Sync {
    /// Read every coupon, in table order. Implementations must not cache
    /// between calls: edits to the backing table show up on the next cycle.
    fn load(&self) -> Result<Vec<Coupon>>;
}

/// Coupon table stored in a spreadsheet (xlsx, xls, xlsb or ods).
pub struct SpreadsheetSource {
    path: PathBuf,
    sheet: Option<String>,
}

impl SpreadsheetSource {
    pub fn new(path: impl Into<PathBuf>, sheet: Option<String>) -> Self {
        Self {
            path: path.into(),
            sheet,
        }
    }
}

impl CouponSource for SpreadsheetSource {
    fn load(&self) -> Result<Vec<Coupon>> {
        let mut workbook = open_workbook_auto(&self.path)?;
        let range = match self.sheet.as_deref() {
            Some(name) => workbook.worksheet_range(name)?,
            None => workbook
                .worksheet_range_at(0)
                .ok_or(StoreError::EmptyWorkbook)??,
        };

        let rows = range
            .rows()
            .map(|row| row.iter().map(cell_text).collect::<Vec<_>>());
        let coupons = coupons_from_rows(rows)?;
        debug!(path = %self.path.display(), count = coupons.len(), "coupon table loaded");
        Ok(coupons)
    }
}

/// Map raw rows (header first) to coupons.
///
/// Headers are matched case-insensitively after trimming; column order is
/// free and unknown columns are ignored. Fully blank rows are skipped.
pub fn coupons_from_rows<I>(rows: I) -> Result<Vec<Coupon>>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut rows = rows.into_iter();
    let header = rows.next().ok_or(StoreError::MissingHeader)?;

    let mut positions = [0usize; COUPON_COLUMNS.len()];
    let mut missing = Vec::new();
    for (slot, column) in COUPON_COLUMNS.iter().enumerate() {
        match header
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(column))
        {
            Some(pos) => positions[slot] = pos,
            None => missing.push(column.to_string()),
        }
    }
    if !missing.is_empty() {
        return Err(StoreError::MissingColumns(missing));
    }

    let coupons = rows
        .filter(|row| row.iter().any(|cell| !cell.trim().is_empty()))
        .map(|row| {
            Coupon::from_fields(positions.map(|pos| row.get(pos).cloned().unwrap_or_default()))
        })
        .collect();
    Ok(coupons)
}

/// Render a cell the way it reads in the spreadsheet UI.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        // Whole numbers are stored as floats; drop the ".0" so codes like
        // 2024 stay "2024".
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}
