use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use shakmaty::Color;
use std::fmt;

/// Side of the board. Mirrors `shakmaty::Color` but carries serde support
/// for the game records handed in by the import layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    White,
    Black,
}

impl Side {
    pub fn other(self) -> Self {
        match self {
            Self::White => Self::Black,
            Self::Black => Self::White,
        }
    }

    pub fn color(self) -> Color {
        match self {
            Self::White => Color::White,
            Self::Black => Color::Black,
        }
    }
}

impl From<Color> for Side {
    fn from(color: Color) -> Self {
        match color {
            Color::White => Self::White,
            Color::Black => Self::Black,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::White => "white",
            Self::Black => "black",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Opening,
    Middlegame,
    Endgame,
}

/// Game outcome from the analysed player's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameResult {
    Win,
    Loss,
    Draw,
    #[default]
    Unknown,
}

impl GameResult {
    /// Interprets a PGN result marker (`1-0`, `0-1`, `1/2-1/2`, `*`) for `player`.
    pub fn from_pgn(marker: &str, player: Side) -> Self {
        match (marker.trim(), player) {
            ("1-0", Side::White) | ("0-1", Side::Black) => Self::Win,
            ("1-0", Side::Black) | ("0-1", Side::White) => Self::Loss,
            ("1/2-1/2", _) => Self::Draw,
            _ => Self::Unknown,
        }
    }
}

/// One board state after `mv` was played.
///
/// `move_number` is the full-move number of `mv`; `turn` is the side that
/// played it, so the side to move in `fen` is `turn.other()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub fen: String,
    pub move_number: u32,
    #[serde(rename = "move")]
    pub mv: String,
    pub turn: Side,
    pub phase: Phase,
}

/// A player's game reduced to its positions, as handed in by the importer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRecord {
    pub game_number: u32,
    pub white: String,
    pub black: String,
    /// `None` when the player's name matched neither side.
    pub user_color: Option<Side>,
    pub opponent: String,
    #[serde(default)]
    pub result: GameResult,
    pub positions: Vec<Position>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub white_rating: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub black_rating: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eco: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_control: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub played_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Moderate,
    High,
}

impl Severity {
    pub fn weight(self) -> f64 {
        match self {
            Self::Low => 1.0,
            Self::Moderate => 2.0,
            Self::High => 3.0,
        }
    }
}

/// Closed set of positional themes a mistake can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PatternType {
    PawnBreaks,
    TradeEvaluation,
    PieceActivity,
    Prophylaxis,
    SpaceControl,
    WeakSquares,
    Initiative,
    KingSafety,
    /// Sentinel emitted when neither the detectors nor the fallback scan found anything.
    NoCriticalMistakes,
}

impl PatternType {
    pub const ALL: [PatternType; 9] = [
        Self::PawnBreaks,
        Self::TradeEvaluation,
        Self::PieceActivity,
        Self::Prophylaxis,
        Self::SpaceControl,
        Self::WeakSquares,
        Self::Initiative,
        Self::KingSafety,
        Self::NoCriticalMistakes,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Self::PawnBreaks => "Pawn Break Timing",
            Self::TradeEvaluation => "Trading Pieces Ineffectively",
            Self::PieceActivity => "Piece Activity Misjudgment",
            Self::Prophylaxis => "Lack of Prophylactic Thinking",
            Self::SpaceControl => "Space and Central Control",
            Self::WeakSquares => "Weak Square Creation",
            Self::Initiative => "Losing the Initiative",
            Self::KingSafety => "King Safety Neglect",
            Self::NoCriticalMistakes => "No Critical Mistakes Detected",
        }
    }

    pub fn summary(self) -> &'static str {
        match self {
            Self::PawnBreaks => {
                "Central pawn breaks are launched without preparation, or pawn tension is released too early."
            }
            Self::TradeEvaluation => {
                "Exchanges are accepted that hand over material, the bishop pair, or a favourable endgame."
            }
            Self::PieceActivity => {
                "Pieces drift to passive squares, shuffle without purpose, or go forward without support."
            }
            Self::Prophylaxis => {
                "The opponent's plans are left unchallenged while moves without a clear purpose are played."
            }
            Self::SpaceControl => {
                "Flank pawns advance before the centre is secured, handing over central control."
            }
            Self::WeakSquares => {
                "Pawn moves around the king or on the wings leave holes and isolated or backward pawns."
            }
            Self::Initiative => {
                "Quiet moves in sharp positions and retreats to the back rank hand the initiative over."
            }
            Self::KingSafety => {
                "The king walks toward the centre while heavy pieces remain on the board."
            }
            Self::NoCriticalMistakes => {
                "No recurring strategic mistakes or significant positional errors were found in the analysed games."
            }
        }
    }
}

impl fmt::Display for PatternType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// One suspected mistake on one transition, produced by a detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MistakeCandidate {
    #[serde(rename = "type")]
    pub pattern: PatternType,
    pub game_number: u32,
    pub move_number: u32,
    #[serde(rename = "move")]
    pub mv: String,
    pub fen: String,
    pub description: String,
    pub severity: Severity,
    pub better_plan: Option<String>,
    /// Heuristic ordering signal, not an engine evaluation.
    pub centipawn_loss_estimate: f64,
    /// Index of the position inside its game, used for context enrichment.
    #[serde(skip)]
    pub position_index: usize,
}

/// Threat the opponent was building before a mistake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ThreatKind {
    KingsideAttack,
    CentralBreak,
    PieceActivity,
    Quiet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreatAssessment {
    pub kind: ThreatKind,
    pub urgency: Urgency,
}

/// Coarse evaluation swing band in pawns. Always a heuristic estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsequenceEstimate {
    pub low: f64,
    pub high: f64,
    pub basis: ConsequenceBasis,
    pub engine_verified: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConsequenceBasis {
    CaptureSequence,
    Check,
    Quiet,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MistakeContext {
    pub leading_moves: Vec<String>,
    pub follow_up_moves: Vec<String>,
    pub threat: ThreatAssessment,
    pub consequence: ConsequenceEstimate,
}

/// A selected, enriched example inside a pattern group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternExample {
    pub game_number: u32,
    pub opponent: String,
    pub move_number: u32,
    #[serde(rename = "move")]
    pub mv: String,
    pub fen: String,
    pub description: String,
    pub better_plan: Option<String>,
    pub severity: Severity,
    pub centipawn_loss_estimate: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<MistakeContext>,
}

/// Aggregated view of one recurring theme across the analysed games.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternGroup {
    #[serde(rename = "type")]
    pub pattern: PatternType,
    pub title: String,
    pub frequency: usize,
    pub total_occurrences: usize,
    pub recurrence_rate: f64,
    pub description: String,
    pub examples: Vec<PatternExample>,
}

impl PatternGroup {
    pub fn no_critical_mistakes(total_games: usize) -> Self {
        let pattern = PatternType::NoCriticalMistakes;
        Self {
            pattern,
            title: pattern.title().to_string(),
            frequency: 0,
            total_occurrences: 0,
            recurrence_rate: 0.0,
            description: format!("{} ({total_games} games analysed)", pattern.summary()),
            examples: Vec::new(),
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.pattern == PatternType::NoCriticalMistakes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_result_from_pgn_is_relative_to_player() {
        assert_eq!(GameResult::from_pgn("1-0", Side::White), GameResult::Win);
        assert_eq!(GameResult::from_pgn("1-0", Side::Black), GameResult::Loss);
        assert_eq!(GameResult::from_pgn("0-1", Side::Black), GameResult::Win);
        assert_eq!(GameResult::from_pgn("1/2-1/2", Side::Black), GameResult::Draw);
        assert_eq!(GameResult::from_pgn("*", Side::White), GameResult::Unknown);
    }

    #[test]
    fn test_severity_ordering_and_weights() {
        assert!(Severity::High > Severity::Moderate);
        assert!(Severity::Moderate > Severity::Low);
        assert_eq!(Severity::Moderate.weight(), 2.0);
    }

    #[test]
    fn test_pattern_type_serializes_as_kebab_case() {
        let json = serde_json::to_string(&PatternType::PieceActivity).unwrap();
        assert_eq!(json, r#""piece-activity""#);
        let back: PatternType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, PatternType::PieceActivity);
    }

    #[test]
    fn test_position_uses_move_key() {
        let json = r#"{"fen":"8/8/8/8/8/8/8/K6k w - - 0 1","moveNumber":3,"move":"Kb1","turn":"white","phase":"endgame"}"#;
        let position: Position = serde_json::from_str(json).unwrap();
        assert_eq!(position.mv, "Kb1");
        assert_eq!(position.turn, Side::White);
        assert_eq!(position.phase, Phase::Endgame);
    }

    #[test]
    fn test_sentinel_group_is_empty() {
        let group = PatternGroup::no_critical_mistakes(4);
        assert!(group.is_sentinel());
        assert!(group.examples.is_empty());
        assert!(group.description.contains("4 games"));
    }
}
