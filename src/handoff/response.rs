use std::collections::HashSet;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

static FENCED_JSON_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"```json\s*([\s\S]*?)\s*```").expect("valid fenced json regex")
});

static FENCED_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"```\s*([\s\S]*?)\s*```").expect("valid fenced block regex")
});

static OBJECT_RE: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"\{[\s\S]*\}").expect("valid json object regex"));

/// The coaching report returned by the narrative collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoachingReport {
    pub executive_summary: String,
    pub recurring_weaknesses: Vec<Weakness>,
    #[serde(default)]
    pub middlegame_mastery: Option<MiddlegameMastery>,
    #[serde(default)]
    pub endgame_technique: Option<EndgameTechnique>,
    #[serde(default)]
    pub improvement_plan: Option<ImprovementPlan>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Weakness {
    pub title: String,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub examples: Vec<WeaknessExample>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WeaknessExample {
    pub game_number: u32,
    pub move_number: u32,
    #[serde(rename = "move")]
    pub mv: String,
    pub fen: String,
    pub why_mistake: String,
    pub better_plan: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MiddlegameMastery {
    pub analysis: String,
    pub key_concept_to_study: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EndgameTechnique {
    pub assessment: String,
    pub skill_to_practice: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ImprovementPlan {
    pub three_step_checklist: Vec<String>,
    pub youtube_video: Option<VideoReference>,
    pub master_game: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoReference {
    pub title: String,
    pub creator: String,
}

/// Pulls the JSON document out of a free-text reply: a ```json fence, any
/// fence, or the outermost braces, in that order.
fn extract_json(text: &str) -> &str {
    FENCED_JSON_RE
        .captures(text)
        .or_else(|| FENCED_RE.captures(text))
        .and_then(|caps| caps.get(1))
        .or_else(|| OBJECT_RE.find(text))
        .map_or(text, |m| m.as_str())
}

pub fn parse_coaching_response(text: &str) -> Result<CoachingReport, AnalysisError> {
    let value: serde_json::Value = serde_json::from_str(extract_json(text))?;

    let has_summary = value
        .get("executiveSummary")
        .and_then(serde_json::Value::as_str)
        .is_some_and(|s| !s.trim().is_empty());
    if !has_summary {
        return Err(AnalysisError::Response("missing executiveSummary".to_string()));
    }
    if !value
        .get("recurringWeaknesses")
        .is_some_and(serde_json::Value::is_array)
    {
        return Err(AnalysisError::Response(
            "recurringWeaknesses is missing or not a list".to_string(),
        ));
    }

    let report: CoachingReport = serde_json::from_value(value)?;
    for weakness in &report.recurring_weaknesses {
        let mut seen = HashSet::new();
        if !weakness.examples.iter().all(|e| seen.insert(e.game_number)) {
            tracing::warn!(title = %weakness.title, "weakness repeats a game among its examples");
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = r#"{
  "executiveSummary": "Solid but passive.",
  "recurringWeaknesses": [
    {
      "title": "Early queen sorties",
      "explanation": "The queen goes out alone.",
      "examples": [
        {"gameNumber": 1, "moveNumber": 16, "move": "Qd4", "fen": "x", "whyMistake": "Unsupported.", "betterPlan": "Develop."}
      ]
    }
  ],
  "improvementPlan": {"threeStepChecklist": ["a", "b", "c"], "youtubeVideo": {"title": "t", "creator": "c"}}
}"#;

    #[test]
    fn test_parse_fenced_json() {
        let text = format!("Here is the analysis:\n```json\n{BODY}\n```\nGood luck!");
        let report = parse_coaching_response(&text).unwrap();
        assert_eq!(report.executive_summary, "Solid but passive.");
        assert_eq!(report.recurring_weaknesses.len(), 1);
        assert_eq!(report.recurring_weaknesses[0].examples[0].mv, "Qd4");
        let plan = report.improvement_plan.unwrap();
        assert_eq!(plan.three_step_checklist.len(), 3);
        assert_eq!(plan.youtube_video.unwrap().creator, "c");
        assert!(report.middlegame_mastery.is_none());
    }

    #[test]
    fn test_parse_bare_fence_and_braces() {
        let fenced = format!("```\n{BODY}\n```");
        assert!(parse_coaching_response(&fenced).is_ok());

        let loose = format!("Sure! {BODY} Let me know.");
        assert!(parse_coaching_response(&loose).is_ok());
        assert!(parse_coaching_response(BODY).is_ok());
    }

    #[test]
    fn test_missing_required_fields() {
        let err = parse_coaching_response(r#"{"recurringWeaknesses": []}"#).unwrap_err();
        assert!(matches!(err, AnalysisError::Response(_)));

        let err = parse_coaching_response(r#"{"executiveSummary": "x"}"#).unwrap_err();
        assert!(matches!(err, AnalysisError::Response(_)));

        let err = parse_coaching_response(r#"{"executiveSummary": "x", "recurringWeaknesses": {}}"#)
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Response(_)));
    }

    #[test]
    fn test_unparseable_text_is_json_error() {
        let err = parse_coaching_response("no json here").unwrap_err();
        assert!(matches!(err, AnalysisError::Json(_)));
    }
}
