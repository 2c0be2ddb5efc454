//! Async façade that fetches rows through a [`RowSource`] and runs the engine.

use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::config::EngineConfig;
use crate::engine::calendar::DateRange;
use crate::engine::coverage::{CoverageOutcome, aggregate_window};
use crate::engine::metrics::{MetricsPayload, assemble_report_metrics};
use crate::engine::previous_window;
use crate::engine::signals::detect_signals;
use crate::engine::summary::{PeriodSummary, WindowSummary};
use crate::engine::types::{RawRow, StateFilter};
use crate::error::{EngineError, EngineResult};
use crate::source::RowSource;

/// The requested window and the one before it, both aggregated.
struct WindowPair {
    range: DateRange,
    current: CoverageOutcome,
    previous: DateRange,
    before: CoverageOutcome,
}

impl WindowPair {
    fn summary(&self, filter: &StateFilter) -> PeriodSummary {
        PeriodSummary::from_windows(
            filter.label(),
            &WindowSummary::from_outcome(&self.range, &self.current),
            &WindowSummary::from_outcome(&self.previous, &self.before),
        )
    }
}

/// Runs engine operations over rows fetched on demand. Holds no state
/// between calls besides its source and config.
pub struct SurveillanceService<S> {
    source: S,
    config: Arc<EngineConfig>,
}

impl<S: RowSource> SurveillanceService<S> {
    pub fn new(source: S, config: EngineConfig) -> Self {
        Self {
            source,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    async fn fetch(&self, years: &BTreeSet<i32>) -> EngineResult<Vec<RawRow>> {
        let rows = self
            .source
            .fetch_rows(years)
            .await
            .map_err(EngineError::Fetch)?;
        info!(?years, rows = rows.len(), "Rows fetched");
        Ok(rows)
    }

    #[instrument(skip(self, filter), fields(filter = %filter.label()))]
    pub async fn coverage(
        &self,
        start: &str,
        end: &str,
        filter: &StateFilter,
    ) -> EngineResult<CoverageOutcome> {
        let range = DateRange::parse(start, end)?;
        let rows = self.fetch(&range.years()).await?;
        Ok(aggregate_window(
            &rows,
            range,
            filter,
            &self.config.aggregate_state_labels,
        ))
    }

    /// Fetches once for both windows, then aggregates the current and
    /// previous windows as two independent blocking tasks.
    async fn aggregate_windows(
        &self,
        range: DateRange,
        filter: &StateFilter,
    ) -> EngineResult<WindowPair> {
        let previous = previous_window(&range)?;
        let years: BTreeSet<i32> = range.years().union(&previous.years()).copied().collect();
        let rows = Arc::new(self.fetch(&years).await?);

        let spawn_window = |window: DateRange| {
            let rows = Arc::clone(&rows);
            let filter = filter.clone();
            let config = Arc::clone(&self.config);
            tokio::task::spawn_blocking(move || {
                aggregate_window(&rows, window, &filter, &config.aggregate_state_labels)
            })
        };

        let (current, before) = tokio::try_join!(spawn_window(range), spawn_window(previous))?;
        Ok(WindowPair {
            range,
            current,
            previous,
            before,
        })
    }

    #[instrument(skip(self, filter), fields(filter = %filter.label()))]
    pub async fn summary(
        &self,
        start: &str,
        end: &str,
        filter: &StateFilter,
    ) -> EngineResult<PeriodSummary> {
        let range = DateRange::parse(start, end)?;
        Ok(self.aggregate_windows(range, filter).await?.summary(filter))
    }

    /// Coverage, summary and signals combined into one payload.
    #[instrument(skip(self, filter), fields(filter = %filter.label()))]
    pub async fn report_metrics(
        &self,
        start: &str,
        end: &str,
        filter: &StateFilter,
    ) -> EngineResult<MetricsPayload> {
        let range = DateRange::parse(start, end)?;
        let windows = self.aggregate_windows(range, filter).await?;

        let summary = windows.summary(filter);
        let signals = detect_signals(&windows.current, &self.config);

        let payload = assemble_report_metrics(&summary, &windows.current.report, &signals)?;
        info!(
            weeks_reported = payload.weeks_reported(),
            total_weeks = payload.total_weeks(),
            "Report metrics assembled"
        );
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::StaticRowSource;
    use anyhow::anyhow;
    use async_trait::async_trait;

    struct FailingSource;

    #[async_trait]
    impl RowSource for FailingSource {
        async fn fetch_rows(&self, _years: &BTreeSet<i32>) -> anyhow::Result<Vec<RawRow>> {
            Err(anyhow!("connection refused"))
        }
    }

    #[tokio::test]
    async fn test_fetch_failure_is_surfaced() {
        let service = SurveillanceService::new(FailingSource, EngineConfig::default());
        let result = service
            .coverage("2024-01-01", "2024-01-31", &StateFilter::All)
            .await;
        assert!(matches!(result, Err(EngineError::Fetch(_))));
    }

    #[tokio::test]
    async fn test_invalid_range_fails_before_fetch() {
        let service = SurveillanceService::new(FailingSource, EngineConfig::default());
        let result = service
            .summary("2024-02-01", "2024-01-01", &StateFilter::All)
            .await;
        assert!(matches!(result, Err(EngineError::InvalidRange { .. })));
    }

    #[tokio::test]
    async fn test_summary_fetches_previous_window_years() {
        let source = StaticRowSource::new(vec![
            RawRow::new(2023, 52, "Lagos", 4, 4, 0),
            RawRow::new(2024, 1, "Lagos", 6, 8, 0),
        ]);
        let service = SurveillanceService::new(source, EngineConfig::default());

        let summary = service
            .summary("2024-01-01", "2024-01-07", &StateFilter::All)
            .await
            .unwrap();
        assert_eq!(summary.totals.confirmed, 8);
        assert_eq!(summary.previous_totals.confirmed, 4);
        assert_eq!(summary.deltas.confirmed, 100.0);
    }
}
