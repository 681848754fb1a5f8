//! Positional mistake detectors.
//!
//! Every theme in [`PatternType`] that has a per-move heuristic gets one
//! [`Detector`] implementation. Detectors are pure: they read one transition
//! of one game and return candidates, never touching shared state, so the
//! engine can run them per game in parallel.

mod activity;
mod initiative;
mod pawn_breaks;
mod prophylaxis;
mod space;
mod trades;
mod weak_squares;

pub use activity::PieceActivityDetector;
pub(crate) use activity::unsupported_queen;
pub use initiative::InitiativeDetector;
pub use pawn_breaks::PawnBreaksDetector;
pub use prophylaxis::ProphylaxisDetector;
pub use space::SpaceControlDetector;
pub use trades::TradeEvaluationDetector;
pub use weak_squares::WeakSquaresDetector;

use smallvec::SmallVec;
use shakmaty::Color;

use crate::evaluator::Snapshot;
use crate::moves::MoveInfo;
use crate::timeline::GameTimeline;
use crate::types::{MistakeCandidate, PatternType, Position, Severity};

pub type Candidates = SmallVec<[MistakeCandidate; 2]>;

/// Everything a detector may look at besides the two positions.
pub struct GameContext<'a> {
    pub timeline: &'a GameTimeline<'a>,
    pub index: usize,
    pub before: &'a Snapshot,
    pub after: &'a Snapshot,
    pub played: &'a MoveInfo,
    /// Opponent plies considered by threat-aware detectors.
    pub threat_lookback: usize,
}

impl<'a> GameContext<'a> {
    /// `None` when either board failed to decode or the move could not be read.
    pub fn new(
        timeline: &'a GameTimeline<'a>,
        index: usize,
        threat_lookback: usize,
    ) -> Option<Self> {
        if index == 0 {
            return None;
        }
        Some(Self {
            timeline,
            index,
            before: timeline.snapshot(index - 1)?,
            after: timeline.snapshot(index)?,
            played: timeline.move_at(index)?,
            threat_lookback,
        })
    }

    pub fn player(&self) -> Color {
        self.timeline.player.color()
    }

    pub fn opponent(&self) -> Color {
        self.player().other()
    }

    /// Builds a candidate anchored on the position the player moved from.
    pub fn candidate(
        &self,
        pattern: PatternType,
        severity: Severity,
        centipawn_loss_estimate: f64,
        description: String,
        better_plan: &str,
    ) -> MistakeCandidate {
        let previous = self.timeline.position(self.index - 1);
        let current = self.timeline.position(self.index);
        MistakeCandidate {
            pattern,
            game_number: self.timeline.game.game_number,
            move_number: current.move_number,
            mv: current.mv.clone(),
            fen: previous.fen.clone(),
            description,
            severity,
            better_plan: Some(better_plan.to_string()),
            centipawn_loss_estimate,
            position_index: self.index,
        }
    }
}

pub trait Detector: Send + Sync {
    fn pattern(&self) -> PatternType;

    fn detect(&self, current: &Position, previous: &Position, ctx: &GameContext<'_>) -> Candidates;
}

/// The primary detector for a theme, if it has one.
///
/// Kept as an exhaustive match so a new [`PatternType`] cannot be added
/// without deciding how it is detected.
pub fn detector_for(pattern: PatternType) -> Option<Box<dyn Detector>> {
    match pattern {
        PatternType::PawnBreaks => Some(Box::new(PawnBreaksDetector)),
        PatternType::TradeEvaluation => Some(Box::new(TradeEvaluationDetector)),
        PatternType::PieceActivity => Some(Box::new(PieceActivityDetector)),
        PatternType::Prophylaxis => Some(Box::new(ProphylaxisDetector)),
        PatternType::SpaceControl => Some(Box::new(SpaceControlDetector)),
        PatternType::WeakSquares => Some(Box::new(WeakSquaresDetector)),
        PatternType::Initiative => Some(Box::new(InitiativeDetector)),
        // only reported by the fallback scan
        PatternType::KingSafety | PatternType::NoCriticalMistakes => None,
    }
}

pub struct DetectorRegistry {
    detectors: Vec<Box<dyn Detector>>,
    threat_lookback: usize,
}

impl Default for DetectorRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl DetectorRegistry {
    pub fn empty() -> Self {
        Self {
            detectors: Vec::new(),
            threat_lookback: 8,
        }
    }

    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.detectors = PatternType::ALL.into_iter().filter_map(detector_for).collect();
        registry
    }

    pub fn with_threat_lookback(mut self, plies: usize) -> Self {
        self.threat_lookback = plies;
        self
    }

    pub fn register(&mut self, detector: impl Detector + 'static) -> &mut Self {
        self.detectors.push(Box::new(detector));
        self
    }

    pub fn len(&self) -> usize {
        self.detectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detectors.is_empty()
    }

    pub fn patterns(&self) -> impl Iterator<Item = PatternType> + '_ {
        self.detectors.iter().map(|detector| detector.pattern())
    }

    /// Runs every detector over every player transition of one game.
    ///
    /// Candidates are kept as produced: several detectors firing on one move
    /// all survive to the aggregator.
    pub fn detect_game(&self, timeline: &GameTimeline<'_>) -> Vec<MistakeCandidate> {
        let mut found = Vec::new();
        for index in timeline.player_transitions() {
            let Some(ctx) = GameContext::new(timeline, index, self.threat_lookback) else {
                continue;
            };
            let current = timeline.position(index);
            let previous = timeline.position(index - 1);
            for detector in &self.detectors {
                found.extend(detector.detect(current, previous, &ctx));
            }
        }
        found
    }
}

#[cfg(test)]
pub(crate) fn detect_with(
    detector: impl Detector + 'static,
    record: &crate::types::GameRecord,
) -> Vec<MistakeCandidate> {
    let mut registry = DetectorRegistry::empty();
    registry.register(detector);
    let player = record.user_color.expect("fixture games carry a colour");
    let timeline = GameTimeline::build(record, player);
    registry.detect_game(&timeline)
}
