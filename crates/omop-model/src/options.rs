//! Configuration options for a linkage run.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Options controlling the linkage pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkOptions {
    /// Anchor date for relative day offsets in provisional visit keys.
    pub index_date: NaiveDate,

    /// Also write the combined, not yet rewritten, tables as checkpoints.
    pub write_checkpoints: bool,
}

impl LinkOptions {
    pub const DEFAULT_INDEX_DATE: (i32, u32, u32) = (2016, 1, 1);

    pub fn with_index_date(mut self, index_date: NaiveDate) -> Self {
        self.index_date = index_date;
        self
    }

    pub fn with_checkpoints(mut self, enable: bool) -> Self {
        self.write_checkpoints = enable;
        self
    }
}

impl Default for LinkOptions {
    fn default() -> Self {
        let (year, month, day) = Self::DEFAULT_INDEX_DATE;
        Self {
            index_date: NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default(),
            write_checkpoints: false,
        }
    }
}
