//! Narrative context around a suspected mistake.
//!
//! Works from the move list alone. The threat classification and the
//! consequence bands are keyword/file heuristics, not engine output; every
//! [`ConsequenceEstimate`] leaves `engine_verified` false so consumers cannot
//! mistake it for an evaluation.

use shakmaty::{File, Role};

use crate::moves::{MoveInfo, center_distance};
use crate::types::{
    ConsequenceBasis, ConsequenceEstimate, MistakeContext, Position, Side, ThreatAssessment,
    ThreatKind, Urgency,
};

pub fn enrich(
    positions: &[Position],
    idx: usize,
    player: Side,
    window: usize,
    lookback: usize,
) -> MistakeContext {
    let (leading_moves, follow_up_moves) = move_window(positions, idx, window);
    MistakeContext {
        leading_moves,
        follow_up_moves,
        threat: classify_threat(positions, idx, player, lookback),
        consequence: estimate_consequence(positions, idx, window),
    }
}

/// Up to `size` moves before and after `idx`, in game order, with move numbers.
pub fn move_window(positions: &[Position], idx: usize, size: usize) -> (Vec<String>, Vec<String>) {
    let leading = positions[idx.saturating_sub(size)..idx.min(positions.len())]
        .iter()
        .map(numbered)
        .collect();
    let follow_up = positions
        .iter()
        .skip(idx + 1)
        .take(size)
        .map(numbered)
        .collect();
    (leading, follow_up)
}

fn numbered(position: &Position) -> String {
    match position.turn {
        Side::White => format!("{}. {}", position.move_number, position.mv),
        Side::Black => format!("{}... {}", position.move_number, position.mv),
    }
}

fn parsed(position: &Position) -> Option<MoveInfo> {
    MoveInfo::parse(&position.mv, position.turn.color()).ok()
}

/// What the opponent was building in the `lookback` plies before `idx`.
pub fn classify_threat(
    positions: &[Position],
    idx: usize,
    player: Side,
    lookback: usize,
) -> ThreatAssessment {
    let start = idx.saturating_sub(lookback);
    let mut kingside = 0u32;
    let mut central = 0u32;
    let mut activity = 0u32;

    for position in &positions[start..idx.min(positions.len())] {
        if position.turn == player {
            continue;
        }
        let Some(info) = parsed(position) else {
            continue;
        };
        let file = info.to.file();
        let heavy = matches!(info.role, Role::Queen | Role::Rook);

        if matches!(file, File::G | File::H) {
            kingside += 1;
        } else if heavy && file == File::F {
            kingside += 1;
        }

        if matches!(file, File::D | File::E) {
            central += 1;
        } else if info.is_minor() && center_distance(info.to) <= 1 {
            central += 1;
        }

        if heavy {
            activity += 1;
        }
    }

    let (kind, score) = if kingside == 0 && central == 0 && activity == 0 {
        (ThreatKind::Quiet, 0)
    } else if kingside >= central && kingside >= activity {
        (ThreatKind::KingsideAttack, kingside)
    } else if central >= activity {
        (ThreatKind::CentralBreak, central)
    } else {
        (ThreatKind::PieceActivity, activity)
    };

    let urgency = match score {
        3.. => Urgency::High,
        2 => Urgency::Medium,
        _ => Urgency::Low,
    };

    ThreatAssessment { kind, urgency }
}

/// Coarse evaluation swing implied by the `size` plies after `idx`.
pub fn estimate_consequence(
    positions: &[Position],
    idx: usize,
    size: usize,
) -> ConsequenceEstimate {
    let mut captures = 0;
    let mut checks = 0;
    for position in positions.iter().skip(idx + 1).take(size) {
        if let Some(info) = parsed(position) {
            captures += usize::from(info.capture);
            checks += usize::from(info.check);
        }
    }

    let (low, high, basis) = if captures >= 2 {
        (-1.5, -0.8, ConsequenceBasis::CaptureSequence)
    } else if checks >= 1 {
        (-0.7, -0.3, ConsequenceBasis::Check)
    } else {
        (-0.5, -0.2, ConsequenceBasis::Quiet)
    };

    ConsequenceEstimate {
        low,
        high,
        basis,
        engine_verified: false,
    }
}
