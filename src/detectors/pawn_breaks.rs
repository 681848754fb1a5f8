use shakmaty::{File, Role, Square, attacks};

use super::{Candidates, Detector, GameContext};
use crate::evaluator::Activity;
use crate::moves::{MoveInfo, center_distance};
use crate::types::{PatternType, Position, Severity};

const MIN_MOVE: u32 = 10;
const PREPARATION_PLIES: usize = 10;
const BREAK_SQUARES: [Square; 4] = [Square::D4, Square::E4, Square::D5, Square::E5];

/// Central pawn breaks without preparation and early release of pawn tension.
pub struct PawnBreaksDetector;

impl Detector for PawnBreaksDetector {
    fn pattern(&self) -> PatternType {
        PatternType::PawnBreaks
    }

    fn detect(
        &self,
        current: &Position,
        _previous: &Position,
        ctx: &GameContext<'_>,
    ) -> Candidates {
        let mut found = Candidates::new();
        let played = ctx.played;
        if current.move_number <= MIN_MOVE || played.role != Role::Pawn {
            return found;
        }

        let me = ctx.player();
        let enemy_pawns =
            ctx.after.board.by_color(me.other()) & ctx.after.board.by_role(Role::Pawn);

        if !played.capture
            && BREAK_SQUARES.contains(&played.to)
            && !(attacks::pawn_attacks(me, played.to) & enemy_pawns).is_empty()
            && !prepared(ctx, played.to)
        {
            found.push(ctx.candidate(
                PatternType::PawnBreaks,
                Severity::Moderate,
                60.0,
                format!(
                    "{} strikes at the centre before any piece or flank pawn supports {}",
                    current.mv, played.to
                ),
                "Prepare the break first: bring a knight, bishop or the c/f-pawn to bear on the square, then open the centre.",
            ));
        }

        if played.capture && played.captured == Some(Role::Pawn) {
            let undeveloped = Activity::of(&ctx.before.board, me).undeveloped_minors;
            if undeveloped >= 2 {
                let away_from_centre = played
                    .from
                    .is_some_and(|from| center_distance(played.to) > center_distance(from));
                let severity = if away_from_centre {
                    Severity::Moderate
                } else {
                    Severity::Low
                };
                found.push(ctx.candidate(
                    PatternType::PawnBreaks,
                    severity,
                    if away_from_centre { 45.0 } else { 25.0 },
                    format!(
                        "{} releases the pawn tension while {undeveloped} minor pieces are still at home",
                        current.mv
                    ),
                    "Keep the tension and finish development; let the opponent be the one to resolve it.",
                ));
            }
        }

        found
    }
}

/// A recent own move that supports a break on `target`.
fn prepared(ctx: &GameContext<'_>, target: Square) -> bool {
    ctx.timeline
        .preceding_player_moves(ctx.index, PREPARATION_PLIES)
        .any(|(_, earlier)| supports(earlier, target))
}

fn supports(earlier: &MoveInfo, target: Square) -> bool {
    match earlier.role {
        Role::Pawn => matches!(earlier.to.file(), File::C | File::F),
        Role::King => false,
        _ => earlier.castle.is_none() && earlier.to.distance(target) <= 2,
    }
}
