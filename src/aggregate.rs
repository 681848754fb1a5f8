//! Cross-game grouping, ranking and example selection.
//!
//! Runs once per analysis on the merged candidate list, single-threaded:
//! ranking and the diversity step both need every game's candidates.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::config::AnalysisConfig;
use crate::context;
use crate::types::{
    GameRecord, GameResult, MistakeCandidate, PatternExample, PatternGroup, PatternType,
};

/// A pattern type that cleared the threshold, before example selection.
#[derive(Debug, Clone)]
pub struct RankedPattern<'c> {
    pub pattern: PatternType,
    pub frequency: usize,
    pub impact: f64,
    pub average_severity: f64,
    pub occurrences: Vec<&'c MistakeCandidate>,
}

pub struct Aggregator<'a> {
    games: HashMap<u32, &'a GameRecord>,
    total_games: usize,
    config: &'a AnalysisConfig,
}

impl<'a> Aggregator<'a> {
    /// `games` are the analysed games; their count is the denominator of
    /// every rate.
    pub fn new(games: &[&'a GameRecord], config: &'a AnalysisConfig) -> Self {
        let mut by_number = HashMap::with_capacity(games.len());
        for game in games {
            by_number.entry(game.game_number).or_insert(*game);
        }
        Self {
            games: by_number,
            total_games: games.len(),
            config,
        }
    }

    pub fn total_games(&self) -> usize {
        self.total_games
    }

    /// Groups candidates by type, keeps the groups seen in at least
    /// `min_games` distinct games, and orders them by impact.
    pub fn rank<'c>(
        &self,
        candidates: &'c [MistakeCandidate],
        min_games: usize,
    ) -> Vec<RankedPattern<'c>> {
        if self.total_games == 0 {
            return Vec::new();
        }

        let mut grouped: BTreeMap<PatternType, Vec<&'c MistakeCandidate>> = BTreeMap::new();
        for candidate in candidates {
            grouped.entry(candidate.pattern).or_default().push(candidate);
        }

        let mut ranked: Vec<RankedPattern<'c>> = grouped
            .into_iter()
            .filter_map(|(pattern, occurrences)| {
                let frequency = occurrences
                    .iter()
                    .map(|c| c.game_number)
                    .collect::<BTreeSet<_>>()
                    .len();
                if frequency < min_games.max(1) {
                    return None;
                }
                let total = occurrences.len() as f64;
                let non_win = occurrences
                    .iter()
                    .filter(|c| !self.is_win(c.game_number))
                    .count() as f64;
                let average_severity =
                    occurrences.iter().map(|c| c.severity.weight()).sum::<f64>() / total;
                let share = frequency as f64 / self.total_games as f64;
                let impact = share * (non_win / total) * average_severity;
                Some(RankedPattern {
                    pattern,
                    frequency,
                    impact,
                    average_severity,
                    occurrences,
                })
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.impact
                .total_cmp(&a.impact)
                .then_with(|| b.frequency.cmp(&a.frequency))
                .then_with(|| b.average_severity.total_cmp(&a.average_severity))
                .then_with(|| a.pattern.cmp(&b.pattern))
        });
        ranked
    }

    /// Ranks, keeps the top `maxPatterns`, and turns each into a
    /// [`PatternGroup`] with game-distinct, enriched examples.
    pub fn build_groups(
        &self,
        candidates: &[MistakeCandidate],
        min_games: usize,
    ) -> Vec<PatternGroup> {
        let mut used_games = HashSet::new();
        self.rank(candidates, min_games)
            .into_iter()
            .take(self.config.max_patterns)
            .map(|ranked| self.group(&ranked, &mut used_games))
            .collect()
    }

    fn group(&self, ranked: &RankedPattern<'_>, used_games: &mut HashSet<u32>) -> PatternGroup {
        let examples: Vec<PatternExample> =
            select_examples(&ranked.occurrences, self.config.max_examples, used_games)
                .into_iter()
                .map(|candidate| self.example(candidate))
                .collect();
        used_games.extend(examples.iter().map(|example| example.game_number));

        let recurrence_rate =
            (1000.0 * ranked.frequency as f64 / self.total_games as f64).round() / 10.0;
        PatternGroup {
            pattern: ranked.pattern,
            title: ranked.pattern.title().to_string(),
            frequency: ranked.frequency,
            total_occurrences: ranked.occurrences.len(),
            recurrence_rate,
            description: format!(
                "{} Seen in {} of {} games ({} occurrences).",
                ranked.pattern.summary(),
                ranked.frequency,
                self.total_games,
                ranked.occurrences.len()
            ),
            examples,
        }
    }

    fn example(&self, candidate: &MistakeCandidate) -> PatternExample {
        let game = self.games.get(&candidate.game_number);
        let context = game.and_then(|game| {
            let player = game.user_color?;
            (candidate.position_index < game.positions.len()).then(|| {
                context::enrich(
                    &game.positions,
                    candidate.position_index,
                    player,
                    self.config.context_window,
                    self.config.threat_lookback_plies,
                )
            })
        });
        PatternExample {
            game_number: candidate.game_number,
            opponent: game.map(|game| game.opponent.clone()).unwrap_or_default(),
            move_number: candidate.move_number,
            mv: candidate.mv.clone(),
            fen: candidate.fen.clone(),
            description: candidate.description.clone(),
            better_plan: candidate.better_plan.clone(),
            severity: candidate.severity,
            centipawn_loss_estimate: candidate.centipawn_loss_estimate,
            context,
        }
    }

    fn is_win(&self, game_number: u32) -> bool {
        self.games
            .get(&game_number)
            .is_some_and(|game| game.result == GameResult::Win)
    }
}

/// The strongest candidate of each game, then at most `limit` of them:
/// most severe first, preferring games no earlier group has shown.
fn select_examples<'c>(
    occurrences: &[&'c MistakeCandidate],
    limit: usize,
    used_games: &HashSet<u32>,
) -> Vec<&'c MistakeCandidate> {
    let mut best: BTreeMap<u32, &'c MistakeCandidate> = BTreeMap::new();
    for &candidate in occurrences {
        best.entry(candidate.game_number)
            .and_modify(|current| {
                if stronger(candidate, *current) == Ordering::Greater {
                    *current = candidate;
                }
            })
            .or_insert(candidate);
    }

    let mut picks: Vec<&'c MistakeCandidate> = best.into_values().collect();
    picks.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| {
                let a_used = used_games.contains(&a.game_number);
                a_used.cmp(&used_games.contains(&b.game_number))
            })
            .then_with(|| b.centipawn_loss_estimate.total_cmp(&a.centipawn_loss_estimate))
            .then_with(|| a.game_number.cmp(&b.game_number))
    });
    picks.truncate(limit);
    picks
}

fn stronger(a: &MistakeCandidate, b: &MistakeCandidate) -> Ordering {
    a.severity
        .cmp(&b.severity)
        .then_with(|| a.centipawn_loss_estimate.total_cmp(&b.centipawn_loss_estimate))
        .then_with(|| b.position_index.cmp(&a.position_index))
}
