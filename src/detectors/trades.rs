use shakmaty::{File, Role};

use super::{Candidates, Detector, GameContext};
use crate::evaluator::MaterialBalance;
use crate::moves::relative_rank;
use crate::types::{PatternType, Position, Severity};

const MIN_MOVE: u32 = 12;
const LATE_ROOK_TRADE_MOVE: u32 = 30;
const KING_ACTIVATION_PLIES: usize = 20;

/// Exchanges that give away value, the bishop pair, or a rook ending with a passive king.
pub struct TradeEvaluationDetector;

impl Detector for TradeEvaluationDetector {
    fn pattern(&self) -> PatternType {
        PatternType::TradeEvaluation
    }

    fn detect(
        &self,
        current: &Position,
        _previous: &Position,
        ctx: &GameContext<'_>,
    ) -> Candidates {
        let mut found = Candidates::new();
        let played = ctx.played;
        if current.move_number <= MIN_MOVE || !played.capture {
            return found;
        }
        let Some(captured) = played.captured else {
            return found;
        };

        let recaptured = ctx
            .timeline
            .next_move(ctx.index)
            .is_some_and(|reply| reply.capture && reply.to == played.to);
        if !recaptured {
            return found;
        }
        let Some(settled) = ctx.timeline.snapshot(ctx.index + 1) else {
            return found;
        };

        let me = ctx.player();
        let gap = MaterialBalance::of(&ctx.before.board).for_side(me)
            - MaterialBalance::of(&settled.board).for_side(me);
        if gap >= 2 {
            let severity = if gap >= 4 {
                Severity::High
            } else {
                Severity::Moderate
            };
            found.push(ctx.candidate(
                PatternType::TradeEvaluation,
                severity,
                f64::from(gap) * 100.0,
                format!(
                    "{} gives a {} for a {} and is recaptured",
                    current.mv,
                    role_name(played.role),
                    role_name(captured)
                ),
                "Count the material of the whole exchange before capturing; keep the stronger piece.",
            ));
        }

        if played.role == Role::Bishop
            && captured == Role::Knight
            && ctx.before.has_bishop_pair(me)
        {
            found.push(ctx.candidate(
                PatternType::TradeEvaluation,
                Severity::Moderate,
                50.0,
                format!("{} surrenders the bishop pair for a knight", current.mv),
                "Keep both bishops and open the position so their long-range power tells.",
            ));
        } else if played.role == Role::Knight && captured == Role::Bishop && open_centre(ctx) {
            found.push(ctx.candidate(
                PatternType::TradeEvaluation,
                Severity::Low,
                30.0,
                format!(
                    "{} trades a knight for a bishop in an open centre",
                    current.mv
                ),
                "In open positions prefer keeping the bishop; trade knights for bishops when the centre is locked.",
            ));
        }

        if played.role == Role::Rook
            && captured == Role::Rook
            && current.move_number > LATE_ROOK_TRADE_MOVE
            && !king_activated(ctx)
        {
            found.push(ctx.candidate(
                PatternType::TradeEvaluation,
                Severity::Moderate,
                70.0,
                format!("{} trades rooks while the king is still on the back rank", current.mv),
                "Centralise the king before simplifying into the ending.",
            ));
        }

        found
    }
}

fn role_name(role: Role) -> &'static str {
    match role {
        Role::Pawn => "pawn",
        Role::Knight => "knight",
        Role::Bishop => "bishop",
        Role::Rook => "rook",
        Role::Queen => "queen",
        Role::King => "king",
    }
}

/// At most two pawns left on the d- and e-files.
fn open_centre(ctx: &GameContext<'_>) -> bool {
    ctx.after
        .board
        .by_role(Role::Pawn)
        .into_iter()
        .filter(|sq| matches!(sq.file(), File::D | File::E))
        .count()
        <= 2
}

fn king_activated(ctx: &GameContext<'_>) -> bool {
    let me = ctx.player();
    let king_off_back_rank = ctx
        .before
        .board
        .king_of(me)
        .is_some_and(|king| relative_rank(king, me) > 0);
    king_off_back_rank
        || ctx
            .timeline
            .preceding_player_moves(ctx.index, KING_ACTIVATION_PLIES)
            .any(|(_, earlier)| earlier.role == Role::King && earlier.castle.is_none())
}
