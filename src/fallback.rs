//! Lower-confidence scan used when no pattern recurs.
//!
//! Looks at every player move past the opening plies for a handful of broad
//! indicators. The engine ranks them together with the detector candidates
//! that missed the recurrence threshold, with that threshold relaxed.

use shakmaty::{File, Role};

use crate::detectors::{GameContext, unsupported_queen};
use crate::evaluator::KingSafety;
use crate::moves::{is_wing_file, piece_value, relative_rank};
use crate::timeline::GameTimeline;
use crate::types::{MistakeCandidate, PatternType, Phase, Severity};

const QUEEN_DEADLINE_MOVE: u32 = 30;
const THRUST_MOVE: u32 = 20;
const BACK_RANK_MOVE: u32 = 25;

pub struct FallbackFinder {
    skip_plies: usize,
    threat_lookback: usize,
}

impl FallbackFinder {
    pub fn new(skip_plies: usize, threat_lookback: usize) -> Self {
        Self {
            skip_plies,
            threat_lookback,
        }
    }

    pub fn scan_game(&self, timeline: &GameTimeline<'_>) -> Vec<MistakeCandidate> {
        let mut found = Vec::new();
        for index in timeline.player_transitions().filter(|&idx| idx >= self.skip_plies) {
            if let Some(ctx) = GameContext::new(timeline, index, self.threat_lookback) {
                scan_move(&ctx, &mut found);
            }
        }
        found
    }
}

fn scan_move(ctx: &GameContext<'_>, found: &mut Vec<MistakeCandidate>) {
    let played = ctx.played;
    let current = ctx.timeline.position(ctx.index);
    let me = ctx.player();

    if let Some(captured) = played.captured {
        let gap = piece_value(played.role) - piece_value(captured);
        let defended = !ctx
            .after
            .board
            .attacks_to(played.to, ctx.opponent(), ctx.after.board.occupied())
            .is_empty();
        if gap >= 2 && defended {
            found.push(ctx.candidate(
                PatternType::TradeEvaluation,
                Severity::Moderate,
                150.0,
                format!("{} captures a cheaper piece on a defended square", current.mv),
                "Check what the capturing piece is worth against what it takes before entering the exchange.",
            ));
        }
    }

    if played.role == Role::King
        && played.castle.is_none()
        && ctx.before.phase(current.move_number) == Phase::Middlegame
        && let Some(from) = played.from
        && central_file_distance(played.to.file()) < central_file_distance(from.file())
        && KingSafety::of(ctx.after, me, Phase::Middlegame).exposed
    {
        found.push(ctx.candidate(
            PatternType::KingSafety,
            Severity::High,
            200.0,
            format!("{} walks the king toward the centre with heavy pieces on", current.mv),
            "Keep the king sheltered until the queens are off or the position is closed.",
        ));
    }

    if played.role == Role::Queen
        && !played.capture
        && current.move_number < QUEEN_DEADLINE_MOVE
        && unsupported_queen(ctx.after, played.to, me)
    {
        found.push(ctx.candidate(
            PatternType::PieceActivity,
            Severity::Moderate,
            80.0,
            format!("{} centralises the queen without minor-piece support", current.mv),
            "Bring the knights and bishops out first so the queen has support in the centre.",
        ));
    }

    if played.role == Role::Pawn
        && !played.capture
        && current.move_number > THRUST_MOVE
        && is_wing_file(played.to.file())
        && relative_rank(played.to, me) >= 3
    {
        found.push(ctx.candidate(
            PatternType::WeakSquares,
            Severity::Low,
            40.0,
            format!("{} thrusts a wing pawn and loosens the squares behind it", current.mv),
            "Advance wing pawns only with a concrete target; every step leaves squares behind.",
        ));
    }

    if played.is_quiet()
        && played.role != Role::Pawn
        && played.castle.is_none()
        && current.move_number > BACK_RANK_MOVE
        && relative_rank(played.to, me) == 0
    {
        found.push(ctx.candidate(
            PatternType::Initiative,
            Severity::Low,
            30.0,
            format!("{} is a quiet retreat to the back rank", current.mv),
            "Look for an active plan before retreating; passive moves hand over the initiative.",
        ));
    }
}

/// Files away from the d/e pair: 0 on d and e, 3 on a and h.
fn central_file_distance(file: File) -> u32 {
    let idx = file as u32;
    if idx < 4 { 3 - idx } else { idx - 4 }
}
