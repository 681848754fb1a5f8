use shakmaty::{File, Role};

use super::{Candidates, Detector, GameContext};
use crate::context::classify_threat;
use crate::moves::{MoveInfo, center_distance, is_edge_file, relative_rank};
use crate::types::{PatternType, Position, Severity, ThreatKind, Urgency};

const MIN_MOVE: u32 = 15;
const AIMLESS_MOVE: u32 = 25;

/// Ignoring the opponent's build-up, and late moves that change nothing.
pub struct ProphylaxisDetector;

impl Detector for ProphylaxisDetector {
    fn pattern(&self) -> PatternType {
        PatternType::Prophylaxis
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

        let threat = classify_threat(
            &ctx.timeline.game.positions,
            ctx.index,
            ctx.timeline.player,
            ctx.threat_lookback,
        );
        if threat.urgency == Urgency::High && !responds(threat.kind, played) {
            let plan = match threat.kind {
                ThreatKind::KingsideAttack => "the kingside attack",
                ThreatKind::CentralBreak => "the central break",
                ThreatKind::PieceActivity => "the heavy-piece regrouping",
                ThreatKind::Quiet => "the opponent's plan",
            };
            found.push(ctx.candidate(
                PatternType::Prophylaxis,
                Severity::Moderate,
                60.0,
                format!("{} ignores {plan} the opponent has been building", current.mv),
                "Ask what the opponent wants to do next and neutralise it before continuing your own plan.",
            ));
        }

        let me = ctx.player();
        if current.move_number > AIMLESS_MOVE
            && played.is_quiet()
            && !matches!(played.role, Role::Pawn | Role::King)
            && let Some(from) = played.from
        {
            let poorly_placed = is_edge_file(from) || relative_rank(from, me) == 0;
            if !poorly_placed && center_distance(played.to) >= center_distance(from) {
                found.push(ctx.candidate(
                    PatternType::Prophylaxis,
                    Severity::Low,
                    20.0,
                    format!(
                        "{} neither forces anything nor improves a badly placed piece",
                        current.mv
                    ),
                    "When nothing is forced, find your worst piece and improve it, or restrict the opponent's best one.",
                ));
            }
        }

        found
    }
}

fn responds(kind: ThreatKind, played: &MoveInfo) -> bool {
    if played.is_forcing() || played.role == Role::King {
        return true;
    }
    match kind {
        ThreatKind::KingsideAttack => matches!(played.to.file(), File::F | File::G | File::H),
        ThreatKind::CentralBreak => {
            matches!(played.to.file(), File::C | File::D | File::E | File::F)
        }
        ThreatKind::PieceActivity => {
            matches!(played.role, Role::Queen | Role::Rook) || center_distance(played.to) <= 1
        }
        ThreatKind::Quiet => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::detect_with;
    use crate::timeline::fixtures::{game, line};
    use crate::types::{GameResult, Side};

    #[test]
    fn test_ignoring_kingside_build_up() {
        let start = "r1bq1rk1/ppp2ppp/2n5/8/8/2N5/PPP2PPP/R1BQ1RK1 b - - 0 16";
        let record = game(
            1,
            Side::White,
            GameResult::Loss,
            line(start, &["h5", "a3", "g5", "b3", "h4", "a4"]),
        );
        let found = detect_with(ProphylaxisDetector, &record);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].mv, "a4");
        assert!(found[0].description.contains("kingside attack"));
    }

    #[test]
    fn test_meeting_the_build_up_is_fine() {
        let start = "r1bq1rk1/ppp2ppp/2n5/8/8/2N5/PPP2PPP/R1BQ1RK1 b - - 0 16";
        let record = game(
            1,
            Side::White,
            GameResult::Win,
            line(start, &["h5", "a3", "g5", "b3", "h4", "h3"]),
        );
        assert!(detect_with(ProphylaxisDetector, &record).is_empty());
    }

    #[test]
    fn test_aimless_late_move() {
        let start = "r5k1/ppp2ppp/8/8/3N4/8/PPP2PPP/6K1 w - - 0 30";
        let record = game(1, Side::White, GameResult::Draw, line(start, &["Nb5"]));
        let found = detect_with(ProphylaxisDetector, &record);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].severity, Severity::Low);
    }

    #[test]
    fn test_rerouting_a_rim_piece_is_not_aimless() {
        let start = "r5k1/ppp2ppp/8/8/8/N7/PPP2PPP/6K1 w - - 0 30";
        let record = game(1, Side::White, GameResult::Draw, line(start, &["Nb5"]));
        assert!(detect_with(ProphylaxisDetector, &record).is_empty());
    }
}
