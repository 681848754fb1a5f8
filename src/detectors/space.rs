use shakmaty::Role;

use super::{Candidates, Detector, GameContext};
use crate::evaluator::central_control;
use crate::moves::is_wing_file;
use crate::types::{PatternType, Position, Severity};

const MIN_MOVE: u32 = 20;

/// Wing pawn moves played while the centre is contested or already lost.
pub struct SpaceControlDetector;

impl Detector for SpaceControlDetector {
    fn pattern(&self) -> PatternType {
        PatternType::SpaceControl
    }

    fn detect(
        &self,
        current: &Position,
        _previous: &Position,
        ctx: &GameContext<'_>,
    ) -> Candidates {
        let mut found = Candidates::new();
        let played = ctx.played;
        if current.move_number <= MIN_MOVE
            || played.role != Role::Pawn
            || !played.is_quiet()
            || !is_wing_file(played.to.file())
        {
            return found;
        }

        let own = central_control(&ctx.before.board, ctx.player());
        let theirs = central_control(&ctx.before.board, ctx.opponent());
        let (severity, cp, verdict) = if own < theirs {
            (Severity::Moderate, 35.0, "while the opponent controls more of the centre")
        } else if own == theirs {
            (Severity::Low, 15.0, "while the centre is still contested")
        } else {
            return found;
        };

        found.push(ctx.candidate(
            PatternType::SpaceControl,
            severity,
            cp,
            format!("{} spends time on the wing {verdict}", current.mv),
            "Settle the centre first; wing play works once the centre is closed or yours.",
        ));
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::detect_with;
    use crate::timeline::fixtures::{game, line};
    use crate::types::{GameResult, Side};

    #[test]
    fn test_wing_push_when_centre_is_lost() {
        // black holds e5 and d5 with pawns, white has nothing central
        let start = "r5k1/ppp2ppp/8/3pp3/8/8/PPP2PPP/R5K1 w - - 0 22";
        let record = game(1, Side::White, GameResult::Loss, line(start, &["a4"]));
        let found = detect_with(SpaceControlDetector, &record);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].severity, Severity::Moderate);
    }

    #[test]
    fn test_wing_push_with_balanced_centre() {
        let start = "r5k1/ppp2ppp/8/8/8/8/PPP2PPP/R5K1 w - - 0 22";
        let record = game(1, Side::White, GameResult::Draw, line(start, &["h3"]));
        let found = detect_with(SpaceControlDetector, &record);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].severity, Severity::Low);
    }

    #[test]
    fn test_wing_push_with_central_edge_is_fine() {
        let start = "r5k1/ppp2ppp/8/8/3PP3/8/PPP3PP/R5K1 w - - 0 22";
        let record = game(1, Side::White, GameResult::Win, line(start, &["a4"]));
        assert!(detect_with(SpaceControlDetector, &record).is_empty());
    }

    #[test]
    fn test_early_wing_push_is_ignored() {
        let start = "r5k1/ppp2ppp/8/3pp3/8/8/PPP2PPP/R5K1 w - - 0 12";
        let record = game(1, Side::White, GameResult::Loss, line(start, &["a4"]));
        assert!(detect_with(SpaceControlDetector, &record).is_empty());
    }
}
