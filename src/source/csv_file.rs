use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing::{debug, warn};

use super::{RowSource, in_years};
use crate::engine::types::RawRow;

/// Reads rows from a CSV export with the header
/// `iso_year,iso_week,state,suspected,confirmed,deaths`.
///
/// Empty cells become missing values. Records that cannot be decoded at all
/// are skipped.
#[derive(Debug, Clone)]
pub struct CsvRowSource {
    path: PathBuf,
}

impl CsvRowSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_all(&self, years: &BTreeSet<i32>) -> Result<Vec<RawRow>> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(&self.path)
            .with_context(|| format!("failed to open '{}'", self.path.display()))?;

        let mut rows = Vec::new();
        let mut skipped = 0usize;

        for result in rdr.deserialize::<RawRow>() {
            match result {
                Ok(row) if in_years(&row, years) => rows.push(row),
                Ok(_) => {}
                Err(e) => {
                    skipped += 1;
                    debug!(error = %e, "Skipping undecodable CSV record");
                }
            }
        }

        if skipped > 0 {
            warn!(path = %self.path.display(), skipped, "Some CSV records could not be decoded");
        }

        Ok(rows)
    }
}

#[async_trait]
impl RowSource for CsvRowSource {
    async fn fetch_rows(&self, years: &BTreeSet<i32>) -> Result<Vec<RawRow>> {
        let source = self.clone();
        let years = years.clone();
        tokio::task::spawn_blocking(move || source.read_all(&years))
            .await
            .context("CSV reader task failed")?
    }
}
