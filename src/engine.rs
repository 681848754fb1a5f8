//! Batch analysis over a player's games.
//!
//! Games are independent, so detection fans out over rayon's pool one game
//! per task. Grouping and ranking then run once on the merged candidates.

use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::aggregate::Aggregator;
use crate::config::AnalysisConfig;
use crate::detectors::DetectorRegistry;
use crate::error::AnalysisError;
use crate::fallback::FallbackFinder;
use crate::timeline::GameTimeline;
use crate::types::{GameRecord, MistakeCandidate, PatternGroup};

/// Which path produced the returned groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportSource {
    /// Patterns that cleared the recurrence threshold.
    Recurring,
    /// Indicators from the fallback scan.
    Fallback,
    /// Nothing found; `patterns` holds only the sentinel group.
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub total_games: usize,
    pub analyzed_games: usize,
    /// Game numbers skipped because the player's colour was unknown.
    pub coverage_gaps: Vec<u32>,
    pub skipped_transitions: usize,
    pub source: ReportSource,
    /// At most `maxPatterns` groups, never empty.
    pub patterns: Vec<PatternGroup>,
}

struct GameScan<'a> {
    timeline: GameTimeline<'a>,
    candidates: Vec<MistakeCandidate>,
}

pub struct PatternEngine {
    registry: DetectorRegistry,
    config: AnalysisConfig,
}

impl Default for PatternEngine {
    fn default() -> Self {
        Self::new(DetectorRegistry::standard(), AnalysisConfig::default())
    }
}

impl PatternEngine {
    pub fn new(registry: DetectorRegistry, config: AnalysisConfig) -> Self {
        let registry = registry.with_threat_lookback(config.threat_lookback_plies);
        Self { registry, config }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn analyze(&self, games: &[GameRecord]) -> Result<AnalysisReport, AnalysisError> {
        self.analyze_with_cancel(games, &AtomicBool::new(false))
    }

    /// Like [`analyze`](Self::analyze), checking `cancel` before each game.
    pub fn analyze_with_cancel(
        &self,
        games: &[GameRecord],
        cancel: &AtomicBool,
    ) -> Result<AnalysisReport, AnalysisError> {
        let mut coverage_gaps = Vec::new();
        let mut playable = Vec::with_capacity(games.len());
        for game in games {
            match game.user_color {
                Some(player) => playable.push((game, player)),
                None => {
                    tracing::warn!(
                        game = game.game_number,
                        white = %game.white,
                        black = %game.black,
                        "player colour unknown, skipping game"
                    );
                    coverage_gaps.push(game.game_number);
                }
            }
        }

        let scans: Vec<GameScan<'_>> = playable
            .par_iter()
            .map(|&(game, player)| {
                if cancel.load(Ordering::Relaxed) {
                    return Err(AnalysisError::Cancelled);
                }
                let timeline = GameTimeline::build(game, player);
                let candidates = self.registry.detect_game(&timeline);
                Ok(GameScan {
                    timeline,
                    candidates,
                })
            })
            .collect::<Result<_, _>>()?;

        let skipped_transitions = scans
            .iter()
            .map(|scan| scan.timeline.skipped_transitions())
            .sum();
        let analyzed: Vec<&GameRecord> = scans.iter().map(|scan| scan.timeline.game).collect();
        let aggregator = Aggregator::new(&analyzed, &self.config);

        let candidates: Vec<MistakeCandidate> = scans
            .iter()
            .flat_map(|scan| scan.candidates.iter().cloned())
            .collect();
        let threshold = self.config.recurrence_threshold(analyzed.len());
        let mut patterns = aggregator.build_groups(&candidates, threshold);
        let mut source = ReportSource::Recurring;

        if patterns.is_empty() {
            tracing::debug!(
                candidates = candidates.len(),
                threshold,
                "no recurring pattern, running fallback scan"
            );
            if cancel.load(Ordering::Relaxed) {
                return Err(AnalysisError::Cancelled);
            }
            let finder = FallbackFinder::new(
                self.config.fallback_skip_plies,
                self.config.threat_lookback_plies,
            );
            // detector candidates that missed the threshold compete with the
            // fallback indicators
            let mut indicators: Vec<MistakeCandidate> = scans
                .par_iter()
                .flat_map_iter(|scan| finder.scan_game(&scan.timeline))
                .collect();
            indicators.extend(candidates);
            patterns = aggregator.build_groups(&indicators, self.config.fallback_min_games);
            source = ReportSource::Fallback;
        }

        if patterns.is_empty() {
            patterns.push(PatternGroup::no_critical_mistakes(analyzed.len()));
            source = ReportSource::None;
        }

        tracing::info!(
            games = games.len(),
            analyzed = analyzed.len(),
            skipped_transitions,
            source = ?source,
            patterns = patterns.len(),
            "analysis finished"
        );

        Ok(AnalysisReport {
            total_games: games.len(),
            analyzed_games: analyzed.len(),
            coverage_gaps,
            skipped_transitions,
            source,
            patterns,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::{Candidates, Detector, GameContext, PawnBreaksDetector};
    use crate::timeline::fixtures::{game, line, replay};
    use crate::types::{GameResult, PatternType, Position, Severity, Side};
    use std::collections::BTreeSet;

    const BARE: &str = "r2q1rk1/ppp2ppp/8/8/8/8/PPP2PPP/R2Q1RK1 b - - 0 15";

    /// Fires once, on the first player move, in the listed games.
    struct FiresIn {
        pattern: PatternType,
        games: Vec<u32>,
    }

    impl Detector for FiresIn {
        fn pattern(&self) -> PatternType {
            self.pattern
        }

        fn detect(
            &self,
            current: &Position,
            _previous: &Position,
            ctx: &GameContext<'_>,
        ) -> Candidates {
            let mut found = Candidates::new();
            let first = ctx.timeline.player_transitions().next() == Some(ctx.index);
            if first && self.games.contains(&ctx.timeline.game.game_number) {
                found.push(ctx.candidate(
                    self.pattern,
                    Severity::Moderate,
                    50.0,
                    format!("{} flagged", current.mv),
                    "n/a",
                ));
            }
            found
        }
    }

    fn engine_with(detector: FiresIn, config: AnalysisConfig) -> PatternEngine {
        let mut registry = DetectorRegistry::empty();
        registry.register(detector);
        PatternEngine::new(registry, config)
    }

    fn open_games(count: u32) -> Vec<GameRecord> {
        (1..=count)
            .map(|n| {
                let positions = replay(None, &["e4", "e5", "Nf3", "Nc6", "Bb5", "a6"]);
                game(n, Side::White, GameResult::Loss, positions)
            })
            .collect()
    }

    /// Five games from the same middlegame; the listed ones play the
    /// unsupported `Qd4` at move 16, the others tuck the king away.
    fn queen_games(count: u32, with_queen: &[u32]) -> Vec<GameRecord> {
        (1..=count)
            .map(|n| {
                let reply = if with_queen.contains(&n) { "Qd4" } else { "Kh1" };
                game(n, Side::White, GameResult::Loss, line(BARE, &["a6", reply]))
            })
            .collect()
    }

    fn assert_invariants(report: &AnalysisReport) {
        assert!(!report.patterns.is_empty());
        assert!(report.patterns.len() <= 3);
        for group in &report.patterns {
            assert!(group.frequency <= report.analyzed_games);
            if report.analyzed_games > 0 {
                let expected = 100.0 * group.frequency as f64 / report.analyzed_games as f64;
                assert!((group.recurrence_rate - expected).abs() <= 0.05);
            }
            let distinct: BTreeSet<u32> = group.examples.iter().map(|e| e.game_number).collect();
            assert_eq!(distinct.len(), group.examples.len());
        }
    }

    #[test]
    fn test_pattern_in_two_of_four_games_recurs() {
        let engine = engine_with(
            FiresIn {
                pattern: PatternType::Initiative,
                games: vec![1, 3],
            },
            AnalysisConfig::default(),
        );
        let report = engine.analyze(&open_games(4)).unwrap();

        assert_eq!(report.source, ReportSource::Recurring);
        assert_eq!(report.patterns.len(), 1);
        let group = &report.patterns[0];
        assert_eq!(group.pattern, PatternType::Initiative);
        assert_eq!(group.frequency, 2);
        assert_eq!(group.recurrence_rate, 50.0);
        let games: Vec<u32> = group.examples.iter().map(|e| e.game_number).collect();
        assert_eq!(games, vec![1, 3]);
        assert_invariants(&report);
    }

    #[test]
    fn test_single_game_pattern_escalates_to_fallback() {
        let config = AnalysisConfig {
            fallback_skip_plies: 0,
            ..AnalysisConfig::default()
        };
        let engine = engine_with(
            FiresIn {
                pattern: PatternType::PawnBreaks,
                games: vec![1],
            },
            config,
        );
        let report = engine.analyze(&queen_games(4, &[2])).unwrap();

        assert_eq!(report.source, ReportSource::Fallback);
        let found: Vec<(PatternType, usize)> = report
            .patterns
            .iter()
            .map(|g| (g.pattern, g.frequency))
            .collect();
        // equal impact, so declaration order decides
        assert_eq!(
            found,
            vec![(PatternType::PawnBreaks, 1), (PatternType::PieceActivity, 1)]
        );
        assert_invariants(&report);
    }

    #[test]
    fn test_lone_detector_hit_survives_empty_fallback_scan() {
        let tension = "r1bq1rk1/ppp2ppp/2n2n2/4p3/2B1P3/5N2/PPPP1PPP/RNBQ1RK1 w - - 0 12";
        let mut games = open_games(4);
        games[0] = game(1, Side::White, GameResult::Loss, line(tension, &["d4"]));

        let mut registry = DetectorRegistry::empty();
        registry.register(PawnBreaksDetector);
        let engine = PatternEngine::new(registry, AnalysisConfig::default());
        let report = engine.analyze(&games).unwrap();

        assert_eq!(report.source, ReportSource::Fallback);
        assert_eq!(report.patterns.len(), 1);
        let group = &report.patterns[0];
        assert!(!group.is_sentinel());
        assert_eq!(group.pattern, PatternType::PawnBreaks);
        assert_eq!(group.frequency, 1);
        assert_eq!(group.recurrence_rate, 25.0);
        assert_eq!(group.examples[0].mv, "d4");
        assert_invariants(&report);
    }

    #[test]
    fn test_nothing_found_yields_sentinel() {
        let engine = engine_with(
            FiresIn {
                pattern: PatternType::PawnBreaks,
                games: vec![],
            },
            AnalysisConfig::default(),
        );
        let report = engine.analyze(&open_games(3)).unwrap();
        assert_eq!(report.source, ReportSource::None);
        assert_eq!(report.patterns.len(), 1);
        assert!(report.patterns[0].is_sentinel());

        let report = engine.analyze(&[]).unwrap();
        assert!(report.patterns[0].is_sentinel());
        assert_eq!(report.analyzed_games, 0);
    }

    #[test]
    fn test_unsupported_queen_in_three_of_five_games() {
        let engine = PatternEngine::default();
        let report = engine.analyze(&queen_games(5, &[1, 3, 5])).unwrap();

        assert_eq!(report.source, ReportSource::Recurring);
        assert_eq!(report.patterns.len(), 1);
        let group = &report.patterns[0];
        assert_eq!(group.pattern, PatternType::PieceActivity);
        assert_eq!(group.title, "Piece Activity Misjudgment");
        assert_eq!(group.frequency, 3);
        assert_eq!(group.recurrence_rate, 60.0);
        assert_eq!(group.examples.len(), 3);
        let games: BTreeSet<u32> = group.examples.iter().map(|e| e.game_number).collect();
        assert_eq!(games, BTreeSet::from([1, 3, 5]));
        for example in &group.examples {
            assert_eq!(example.mv, "Qd4");
            assert_eq!(example.move_number, 16);
            let context = example.context.as_ref().unwrap();
            assert!(!context.consequence.engine_verified);
            assert_eq!(context.leading_moves.last().map(String::as_str), Some("15... a6"));
        }
        assert_invariants(&report);
    }

    #[test]
    fn test_analysis_is_deterministic() {
        let engine = PatternEngine::default();
        let games = queen_games(5, &[1, 2, 4]);
        let first = serde_json::to_string(&engine.analyze(&games).unwrap()).unwrap();
        let second = serde_json::to_string(&engine.analyze(&games).unwrap()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_games_without_colour_are_coverage_gaps() {
        let engine = PatternEngine::default();
        let mut games = queen_games(4, &[1, 2, 3]);
        games[3].user_color = None;
        let report = engine.analyze(&games).unwrap();

        assert_eq!(report.total_games, 4);
        assert_eq!(report.analyzed_games, 3);
        assert_eq!(report.coverage_gaps, vec![4]);
        assert_eq!(report.patterns[0].recurrence_rate, 100.0);
    }

    #[test]
    fn test_invalid_positions_are_skipped_not_fatal() {
        let engine = PatternEngine::default();
        let mut games = queen_games(3, &[1, 2, 3]);
        games[2].positions[1].fen = "rnbqkbnr/pppppppp/8 w".to_string();
        let report = engine.analyze(&games).unwrap();

        assert_eq!(report.skipped_transitions, 1);
        assert_eq!(report.patterns[0].frequency, 2);
    }

    #[test]
    fn test_cancelled_before_start() {
        let engine = PatternEngine::default();
        let cancel = AtomicBool::new(true);
        let err = engine.analyze_with_cancel(&queen_games(2, &[1]), &cancel).unwrap_err();
        assert!(matches!(err, AnalysisError::Cancelled));
    }
}
