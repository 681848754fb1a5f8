use shakmaty::{Color, File, Role, Square};

use super::{Candidates, Detector, GameContext};
use crate::evaluator::PawnStructure;
use crate::types::{PatternType, Position, Severity};

const SHELTER_MOVE: u32 = 12;
const THRUST_MOVE: u32 = 20;
const STRUCTURE_MOVE: u32 = 12;

/// Pawn moves that leave holes: loosening the castled king's shelter,
/// over-extending on the wings, or leaving a pawn isolated or backward.
pub struct WeakSquaresDetector;

impl Detector for WeakSquaresDetector {
    fn pattern(&self) -> PatternType {
        PatternType::WeakSquares
    }

    fn detect(
        &self,
        current: &Position,
        _previous: &Position,
        ctx: &GameContext<'_>,
    ) -> Candidates {
        let mut found = Candidates::new();
        let played = ctx.played;
        if played.role != Role::Pawn {
            return found;
        }
        let me = ctx.player();

        if current.move_number > STRUCTURE_MOVE {
            let before = PawnStructure::of(&ctx.before.board, me);
            let after = PawnStructure::of(&ctx.after.board, me);
            if after.weaknesses() > before.weaknesses() {
                let kind = if after.backward > before.backward {
                    "a backward pawn"
                } else if after.isolated > before.isolated {
                    "an isolated pawn"
                } else {
                    "doubled pawns"
                };
                found.push(ctx.candidate(
                    PatternType::WeakSquares,
                    Severity::Moderate,
                    35.0,
                    format!("{} leaves {kind} behind", current.mv),
                    "Move pawns so each one keeps a neighbour able to guard the square in front of it.",
                ));
            }
        }

        if played.capture {
            return found;
        }
        let king = ctx.before.board.king_of(me);

        if current.move_number > SHELTER_MOVE
            && is_shelter_square(played.to, me)
            && king.is_some_and(|sq| matches!(sq.file(), File::F | File::G | File::H))
        {
            let queen_on = !(ctx.before.board.by_color(ctx.opponent())
                & ctx.before.board.by_role(Role::Queen))
            .is_empty();
            let (severity, cp) = if queen_on {
                (Severity::High, 70.0)
            } else {
                (Severity::Moderate, 40.0)
            };
            found.push(ctx.candidate(
                PatternType::WeakSquares,
                severity,
                cp,
                format!("{} weakens the squares around the castled king", current.mv),
                "Keep the pawns in front of the king unmoved unless there is a concrete reason.",
            ));
        }

        if current.move_number > THRUST_MOVE && is_thrust_square(played.to) {
            let kingside_thrust = matches!(played.to.file(), File::G);
            let king_on_wing = king.is_some_and(|sq| {
                if kingside_thrust {
                    sq.file() >= File::F
                } else {
                    sq.file() <= File::C
                }
            });
            let (severity, cp) = if king_on_wing {
                (Severity::Moderate, 45.0)
            } else {
                (Severity::Low, 20.0)
            };
            found.push(ctx.candidate(
                PatternType::WeakSquares,
                severity,
                cp,
                format!("{} leaves holes behind the advanced pawn", current.mv),
                "Before advancing a wing pawn, check which squares it can no longer guard.",
            ));
        }

        found
    }
}

fn is_shelter_square(sq: Square, color: Color) -> bool {
    match color {
        Color::White => matches!(sq, Square::F3 | Square::G3 | Square::H3),
        Color::Black => matches!(sq, Square::F6 | Square::G6 | Square::H6),
    }
}

fn is_thrust_square(sq: Square) -> bool {
    matches!(sq, Square::B4 | Square::B5 | Square::G4 | Square::G5)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::detect_with;
    use crate::timeline::fixtures::{game, line};
    use crate::types::{GameResult, Side};

    #[test]
    fn test_shelter_weakening_with_queens_on() {
        let start = "r1bq1rk1/ppp2ppp/2n5/8/8/2N5/PPP2PPP/R1BQ1RK1 w - - 0 14";
        let record = game(1, Side::White, GameResult::Loss, line(start, &["h3"]));
        let found = detect_with(WeakSquaresDetector, &record);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].severity, Severity::High);
        assert_eq!(found[0].centipawn_loss_estimate, 70.0);
    }

    #[test]
    fn test_shelter_weakening_for_black_without_queens() {
        let start = "r1b2rk1/ppp2ppp/2n5/8/8/2N5/PPP2PPP/R1B2RK1 b - - 0 14";
        let record = game(1, Side::Black, GameResult::Draw, line(start, &["g6"]));
        let found = detect_with(WeakSquaresDetector, &record);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].severity, Severity::Moderate);
    }

    #[test]
    fn test_shelter_push_with_king_in_centre_is_ignored() {
        let start = "r1bqk2r/ppp2ppp/2n5/8/8/2N5/PPP2PPP/R1BQK2R w KQkq - 0 14";
        let record = game(1, Side::White, GameResult::Loss, line(start, &["h3"]));
        assert!(detect_with(WeakSquaresDetector, &record).is_empty());
    }

    #[test]
    fn test_push_that_leaves_a_backward_pawn() {
        // after c4 the d2 pawn has no neighbour beside or behind it and
        // d3 is covered by the e4 pawn
        let start = "6k1/8/8/8/4p3/8/2PP4/6K1 w - - 0 14";
        let record = game(1, Side::White, GameResult::Loss, line(start, &["c4"]));
        let found = detect_with(WeakSquaresDetector, &record);
        assert_eq!(found.len(), 1);
        assert!(found[0].description.contains("backward pawn"));
    }

    #[test]
    fn test_wing_thrust_near_own_king() {
        let start = "r5k1/ppp2ppp/8/8/8/8/PPP2PPP/R5K1 w - - 0 24";
        let record = game(1, Side::White, GameResult::Loss, line(start, &["g4"]));
        let found = detect_with(WeakSquaresDetector, &record);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].severity, Severity::Moderate);

        let record = game(1, Side::White, GameResult::Loss, line(start, &["b4"]));
        let found = detect_with(WeakSquaresDetector, &record);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].severity, Severity::Low);
    }
}
