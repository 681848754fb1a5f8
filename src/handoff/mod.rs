//! The report handed to the narrative collaborator, and what comes back.

mod prompt;
mod response;

pub use prompt::render_prompt;
pub use response::{
    CoachingReport, EndgameTechnique, ImprovementPlan, MiddlegameMastery, VideoReference,
    Weakness, WeaknessExample, parse_coaching_response,
};

use serde::{Deserialize, Serialize};

use crate::engine::{AnalysisReport, ReportSource};
use crate::error::AnalysisError;
use crate::types::PatternGroup;

pub const ESTIMATE_NOTICE: &str = "Severity, centipawn loss and consequence bands are heuristic \
estimates derived from move patterns, not engine evaluations.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandoffPayload {
    pub player: String,
    pub total_games: usize,
    pub analyzed_games: usize,
    pub source: ReportSource,
    pub patterns: Vec<PatternGroup>,
    pub estimate_notice: String,
}

impl HandoffPayload {
    pub fn from_report(player: &str, report: &AnalysisReport) -> Self {
        Self {
            player: player.to_string(),
            total_games: report.total_games,
            analyzed_games: report.analyzed_games,
            source: report.source,
            patterns: report.patterns.clone(),
            estimate_notice: ESTIMATE_NOTICE.to_string(),
        }
    }

    pub fn to_json_pretty(&self) -> Result<String, AnalysisError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self, AnalysisError> {
        Ok(serde_json::from_str(text)?)
    }
}
