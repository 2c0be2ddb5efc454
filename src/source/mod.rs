//! Access to the persistence layer that supplies raw weekly rows.
//!
//! [`RowSource`] is the async seam the service fetches through.
//! [`CsvRowSource`] reads a CSV export; [`StaticRowSource`] holds rows in memory.

mod csv_file;
mod memory;

pub use csv_file::CsvRowSource;
pub use memory::StaticRowSource;

use anyhow::Result;
use std::collections::BTreeSet;

use crate::engine::types::RawRow;

/// Returns raw rows for a set of ISO years.
///
/// Implementations may return rows outside the requested years or with
/// malformed fields; the ingestor drops those.
#[async_trait::async_trait]
pub trait RowSource: Send + Sync {
    async fn fetch_rows(&self, years: &BTreeSet<i32>) -> Result<Vec<RawRow>>;
}

/// True when the row's year is in `years`, or cannot be read at all (the
/// ingestor decides what to do with those).
pub(crate) fn in_years(row: &RawRow, years: &BTreeSet<i32>) -> bool {
    match row
        .iso_year
        .as_ref()
        .and_then(|v| v.as_i64())
        .and_then(|y| i32::try_from(y).ok())
    {
        Some(year) => years.contains(&year),
        None => true,
    }
}
