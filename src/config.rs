//! Tunables of one analysis run.
//!
//! Every field has a default, so a partial JSON file only overrides what it
//! names. Verbosity is not configured here: the binary reads `CHESS_LOG`.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnalysisConfig {
    /// Pattern groups returned after ranking.
    pub max_patterns: usize,
    /// Game-distinct examples kept per group.
    pub max_examples: usize,
    /// Lower bound of the recurrence threshold.
    pub min_recurring_games: usize,
    /// Share of analysed games a pattern must appear in.
    pub recurrence_fraction: f64,
    /// Threshold used by the fallback scan.
    pub fallback_min_games: usize,
    /// Plies at the start of each game the fallback scan ignores.
    pub fallback_skip_plies: usize,
    /// Leading and follow-up moves attached to each example.
    pub context_window: usize,
    /// Opponent plies inspected when classifying threats.
    pub threat_lookback_plies: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_patterns: 3,
            max_examples: 3,
            min_recurring_games: 2,
            recurrence_fraction: 0.25,
            fallback_min_games: 1,
            fallback_skip_plies: 10,
            context_window: 3,
            threat_lookback_plies: 8,
        }
    }
}

impl AnalysisConfig {
    pub fn from_path(path: &Path) -> Result<Self, AnalysisError> {
        let text = fs::read_to_string(path).map_err(|source| AnalysisError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self, AnalysisError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        if !(self.recurrence_fraction > 0.0 && self.recurrence_fraction <= 1.0) {
            return Err(AnalysisError::Config(format!(
                "recurrenceFraction must be in (0, 1], got {}",
                self.recurrence_fraction
            )));
        }
        if self.max_patterns == 0 {
            return Err(AnalysisError::Config("maxPatterns must be greater than 0".to_string()));
        }
        if self.max_examples == 0 {
            return Err(AnalysisError::Config("maxExamples must be greater than 0".to_string()));
        }
        Ok(())
    }

    /// Distinct games a pattern needs to count as recurring:
    /// `max(minRecurringGames, ceil(recurrenceFraction * total_games))`.
    pub fn recurrence_threshold(&self, total_games: usize) -> usize {
        // 0.3 * 10.0 is 3.0000000000000004; don't let that round up to 4
        let exact = self.recurrence_fraction * total_games as f64;
        let share = (exact - 1e-9).ceil().max(0.0) as usize;
        self.min_recurring_games.max(share)
    }
}
