use shakmaty::Role;

use super::{Candidates, Detector, GameContext};
use crate::moves::relative_rank;
use crate::types::{PatternType, Position, Severity};

const MIN_MOVE: u32 = 12;
const PASSIVE_MOVE: u32 = 25;
const EXCHANGE_WINDOW: usize = 4;

/// Letting the initiative go: quiet moves in the middle of a tactical
/// sequence, and late retreats to the back rank.
pub struct InitiativeDetector;

impl Detector for InitiativeDetector {
    fn pattern(&self) -> PatternType {
        PatternType::Initiative
    }

    fn detect(
        &self,
        current: &Position,
        _previous: &Position,
        ctx: &GameContext<'_>,
    ) -> Candidates {
        let mut found = Candidates::new();
        let played = ctx.played;
        if current.move_number <= MIN_MOVE || !played.is_quiet() {
            return found;
        }

        let recent_captures = ctx
            .timeline
            .preceding(ctx.index, EXCHANGE_WINDOW)
            .filter(|(_, info)| info.capture)
            .count();
        if recent_captures >= 2 {
            found.push(ctx.candidate(
                PatternType::Initiative,
                Severity::Moderate,
                50.0,
                format!("{} is a quiet move in the middle of a tactical sequence", current.mv),
                "After a series of exchanges, look for checks, captures and threats before a quiet move.",
            ));
        }

        if current.move_number > PASSIVE_MOVE
            && played.role != Role::Pawn
            && played.castle.is_none()
            && relative_rank(played.to, ctx.player()) == 0
        {
            found.push(ctx.candidate(
                PatternType::Initiative,
                Severity::Low,
                25.0,
                format!("{} retreats to the back rank and hands over the initiative", current.mv),
                "Keep pieces active and create threats that dictate the opponent's replies.",
            ));
        }

        found
    }
}
