//! Engine configuration.
//!
//! Stored as a plain JSON object on disk; every field is optional:
//! ```json
//! {
//!   "top_n": 3,
//!   "incomplete_coverage_ratio": 0.75,
//!   "sustained_growth_weeks": 2,
//!   "spike_increase": 25,
//!   "elevated_deaths": 5,
//!   "aggregate_state_labels": ["National"]
//! }
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Thresholds and ranking sizes used by signal detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Length of the contributor and grower rankings.
    pub top_n: usize,
    /// Coverage below this ratio raises `incompleteReporting`.
    pub incomplete_coverage_ratio: f64,
    /// Consecutive positive week-over-week deltas needed for `sustainedGrowth`.
    pub sustained_growth_weeks: usize,
    /// Minimum single-week confirmed increase for `sharpSpike`.
    pub spike_increase: u64,
    /// Minimum single-week deaths for `elevatedDeaths`.
    pub elevated_deaths: u64,
    /// Extra pseudo-state names holding pre-aggregated totals. "Total" is
    /// excluded whether or not it is listed here.
    pub aggregate_state_labels: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            top_n: 3,
            incomplete_coverage_ratio: 0.75,
            sustained_growth_weeks: 2,
            spike_increase: 25,
            elevated_deaths: 5,
            aggregate_state_labels: Vec::new(),
        }
    }
}

impl EngineConfig {
    /// Loads the config from a JSON file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config '{}'", path.display()))?;
        let config: EngineConfig = serde_json::from_str(&content)
            .with_context(|| format!("invalid config '{}'", path.display()))?;
        Ok(config)
    }

    /// Loads from `path` when it exists, otherwise falls back to defaults.
    pub fn load_or_default(path: Option<&str>) -> Result<Self> {
        match path {
            Some(p) if Path::new(p).exists() => Self::load(p),
            Some(p) => {
                debug!(path = p, "Config file not found, using defaults");
                Ok(Self::default())
            }
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs;

    fn temp_path(name: &str) -> String {
        format!("{}/{}", env::temp_dir().display(), name)
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let path = temp_path("surveil_coverage_test_partial.json");
        fs::write(&path, r#"{ "spike_increase": 40, "aggregate_state_labels": ["Total", "National"] }"#)
            .unwrap();

        let config = EngineConfig::load(&path).unwrap();
        assert_eq!(config.spike_increase, 40);
        assert_eq!(config.top_n, 3);
        assert_eq!(config.aggregate_state_labels.len(), 2);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config =
            EngineConfig::load_or_default(Some("/nonexistent/surveil_coverage.json")).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let path = temp_path("surveil_coverage_test_malformed.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(EngineConfig::load(&path).is_err());
        fs::remove_file(&path).unwrap();
    }
}
