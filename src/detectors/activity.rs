use shakmaty::{Color, Role, Square};

use super::{Candidates, Detector, GameContext};
use crate::evaluator::Snapshot;
use crate::moves::{center_distance, is_edge_file, relative_rank};
use crate::types::{PatternType, Position, Severity};

const MIN_MOVE: u32 = 12;
const ROOK_RETREAT_MOVE: u32 = 25;
const QUEEN_DEADLINE_MOVE: u32 = 30;
/// Own moves before the current one that make up the six-move window.
const REPEAT_WINDOW_PLIES: usize = 10;
const REPEAT_COUNT: usize = 3;

/// Passive retreats, aimless shuffling and unsupported queen sorties.
pub struct PieceActivityDetector;

impl Detector for PieceActivityDetector {
    fn pattern(&self) -> PatternType {
        PatternType::PieceActivity
    }

    fn detect(
        &self,
        current: &Position,
        _previous: &Position,
        ctx: &GameContext<'_>,
    ) -> Candidates {
        let mut found = Candidates::new();
        let played = ctx.played;
        if current.move_number <= MIN_MOVE {
            return found;
        }
        let me = ctx.player();

        if played.is_minor()
            && played.is_quiet()
            && let Some(from) = played.from
            && (is_edge_file(played.to) || relative_rank(played.to, me) == 0)
            && relative_rank(played.to, me) < relative_rank(from, me)
        {
            let knight_on_rim = played.role == Role::Knight && is_edge_file(played.to);
            found.push(ctx.candidate(
                PatternType::PieceActivity,
                if knight_on_rim {
                    Severity::Moderate
                } else {
                    Severity::Low
                },
                if knight_on_rim { 50.0 } else { 30.0 },
                format!("{} retreats the piece to a passive square", current.mv),
                "Look for a central outpost or a diagonal that stays active instead of retreating to the edge.",
            ));
        }

        if played.is_quiet() && !matches!(played.role, Role::Pawn | Role::King) {
            // fires once, on the move that brings the count to three
            let earlier_quiet = ctx
                .timeline
                .preceding_player_moves(ctx.index, REPEAT_WINDOW_PLIES)
                .filter(|(_, earlier)| earlier.role == played.role && earlier.is_quiet())
                .count();
            if earlier_quiet + 1 == REPEAT_COUNT {
                found.push(ctx.candidate(
                    PatternType::PieceActivity,
                    Severity::Low,
                    25.0,
                    format!(
                        "{} is the third quiet move by the same kind of piece within six moves",
                        current.mv
                    ),
                    "Improve the worst-placed piece instead of moving the same one again.",
                ));
            }
        }

        if played.role == Role::Rook
            && played.is_quiet()
            && current.move_number > ROOK_RETREAT_MOVE
            && relative_rank(played.to, me) == 0
            && played.from.is_some_and(|from| relative_rank(from, me) > 0)
        {
            found.push(ctx.candidate(
                PatternType::PieceActivity,
                Severity::Moderate,
                40.0,
                format!("{} drops the rook back to the first rank", current.mv),
                "Keep rooks on open files or the seventh rank where they create threats.",
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
                format!(
                    "{} centralises the queen on {} with no minor piece nearby to support it",
                    current.mv, played.to
                ),
                "Develop and centralise the minor pieces first; the queen can then use a protected central post.",
            ));
        }

        found
    }
}

/// A queen on or next to the centre with no own knight or bishop within two squares.
pub(crate) fn unsupported_queen(after: &Snapshot, queen: Square, color: Color) -> bool {
    if center_distance(queen) > 1 {
        return false;
    }
    let minors = after.board.by_color(color)
        & (after.board.by_role(Role::Knight) | after.board.by_role(Role::Bishop));
    minors.into_iter().all(|sq| sq.distance(queen) > 2)
}
