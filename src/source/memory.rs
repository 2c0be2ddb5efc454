use anyhow::Result;
use async_trait::async_trait;
use std::collections::BTreeSet;

use super::{RowSource, in_years};
use crate::engine::types::RawRow;

/// A [`RowSource`] over rows already held in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticRowSource {
    rows: Vec<RawRow>,
}

impl StaticRowSource {
    pub fn new(rows: Vec<RawRow>) -> Self {
        Self { rows }
    }
}

#[async_trait]
impl RowSource for StaticRowSource {
    async fn fetch_rows(&self, years: &BTreeSet<i32>) -> Result<Vec<RawRow>> {
        Ok(self
            .rows
            .iter()
            .filter(|row| in_years(row, years))
            .cloned()
            .collect())
    }
}
