use shakmaty::san::{San, SanPlus, Suffix};
use shakmaty::{Board, CastlingSide, Color, File, Rank, Role, Square};

use crate::error::AnalysisError;

/// What a SAN token says about the move, optionally resolved against the
/// boards before and after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveInfo {
    pub role: Role,
    pub to: Square,
    pub capture: bool,
    pub check: bool,
    pub mate: bool,
    pub castle: Option<CastlingSide>,
    pub promotion: Option<Role>,
    /// Filled by [`MoveInfo::resolve`].
    pub from: Option<Square>,
    /// Filled by [`MoveInfo::resolve`].
    pub captured: Option<Role>,
}

impl MoveInfo {
    /// Parses a SAN token such as `Nxe5+`, `O-O`, `exd8=Q#` or `15...g5?`.
    ///
    /// Castling needs the mover to know the king's destination square.
    pub fn parse(token: &str, mover: Color) -> Result<Self, AnalysisError> {
        let cleaned = clean_token(token);
        let san_plus: SanPlus = cleaned.parse().map_err(|e| AnalysisError::InvalidMove {
            san: token.to_string(),
            reason: format!("{e}"),
        })?;

        let (check, mate) = match san_plus.suffix {
            Some(Suffix::Check) => (true, false),
            Some(Suffix::Checkmate) => (true, true),
            None => (false, false),
        };

        match san_plus.san {
            San::Normal {
                role,
                capture,
                to,
                promotion,
                ..
            } => Ok(Self {
                role,
                to,
                capture,
                check,
                mate,
                castle: None,
                promotion,
                from: None,
                captured: None,
            }),
            San::Castle(side) => {
                let rank = back_rank(mover);
                let file = match side {
                    CastlingSide::KingSide => File::G,
                    CastlingSide::QueenSide => File::C,
                };
                Ok(Self {
                    role: Role::King,
                    to: Square::from_coords(file, rank),
                    capture: false,
                    check,
                    mate,
                    castle: Some(side),
                    promotion: None,
                    from: Some(Square::from_coords(File::E, rank)),
                    captured: None,
                })
            }
            San::Put { .. } | San::Null => Err(AnalysisError::InvalidMove {
                san: token.to_string(),
                reason: "drops and null moves are not standard chess".to_string(),
            }),
        }
    }

    /// Finds the origin square and the captured piece by diffing the boards
    /// around the move.
    pub fn resolve(&mut self, before: &Board, after: &Board, mover: Color) {
        if self.capture {
            self.captured = before
                .piece_at(self.to)
                .filter(|piece| piece.color != mover)
                .map(|piece| piece.role)
                .or(Some(Role::Pawn));
        }

        if self.from.is_some() {
            return;
        }

        let moved_role = if self.promotion.is_some() {
            Role::Pawn
        } else {
            self.role
        };

        for sq in before.by_color(mover) & before.by_role(moved_role) {
            let still_there = after
                .piece_at(sq)
                .is_some_and(|piece| piece.color == mover && piece.role == moved_role);
            if !still_there {
                self.from = Some(sq);
                break;
            }
        }
    }

    pub fn is_forcing(&self) -> bool {
        self.capture || self.check
    }

    pub fn is_quiet(&self) -> bool {
        !self.is_forcing()
    }

    pub fn is_minor(&self) -> bool {
        matches!(self.role, Role::Knight | Role::Bishop)
    }
}

/// Strips move-number prefixes (`15.`, `15...`) and annotation glyphs (`!`, `?`).
pub fn clean_token(token: &str) -> &str {
    let token = token.trim();
    let token = match token.rfind('.') {
        Some(idx) => &token[idx + 1..],
        None => token,
    };
    token.trim().trim_end_matches(['!', '?'])
}

/// Standard piece values in pawns; the king counts as zero.
pub fn piece_value(role: Role) -> i32 {
    match role {
        Role::Pawn => 1,
        Role::Knight | Role::Bishop => 3,
        Role::Rook => 5,
        Role::Queen => 9,
        Role::King => 0,
    }
}

pub fn back_rank(color: Color) -> Rank {
    match color {
        Color::White => Rank::First,
        Color::Black => Rank::Eighth,
    }
}

/// Rank index 0..=7 seen from `color`'s side of the board.
pub fn relative_rank(sq: Square, color: Color) -> u32 {
    let rank = sq.rank() as u32;
    match color {
        Color::White => rank,
        Color::Black => 7 - rank,
    }
}

pub fn is_edge_file(sq: Square) -> bool {
    matches!(sq.file(), File::A | File::H)
}

pub fn is_wing_file(file: File) -> bool {
    matches!(file, File::A | File::B | File::G | File::H)
}

pub fn is_central_file(file: File) -> bool {
    matches!(file, File::D | File::E | File::F)
}

/// Chebyshev distance from the four centre squares; 0 on d4/e4/d5/e5, 3 on the rim.
pub fn center_distance(sq: Square) -> u32 {
    let axis = |i: u32| if i < 4 { 3 - i } else { i - 4 };
    axis(sq.file() as u32).max(axis(sq.rank() as u32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shakmaty::fen::Fen;
    use shakmaty::{CastlingMode, Chess, Position};

    fn board(fen: &str) -> Board {
        let fen: Fen = fen.parse().unwrap();
        let pos: Chess = fen.into_position(CastlingMode::Standard).unwrap();
        pos.board().clone()
    }

    #[test]
    fn test_parse_capture_with_check() {
        let info = MoveInfo::parse("Nxe5+", Color::White).unwrap();
        assert_eq!(info.role, Role::Knight);
        assert_eq!(info.to, Square::E5);
        assert!(info.capture);
        assert!(info.check);
        assert!(!info.mate);
        assert!(info.is_forcing());
    }

    #[test]
    fn test_parse_strips_move_numbers_and_annotations() {
        let info = MoveInfo::parse("15...g5?", Color::Black).unwrap();
        assert_eq!(info.role, Role::Pawn);
        assert_eq!(info.to, Square::G5);
        assert!(info.is_quiet());
    }

    #[test]
    fn test_parse_castling_uses_mover_back_rank() {
        let white = MoveInfo::parse("O-O", Color::White).unwrap();
        assert_eq!(white.to, Square::G1);
        assert_eq!(white.from, Some(Square::E1));
        assert_eq!(white.castle, Some(CastlingSide::KingSide));

        let black = MoveInfo::parse("O-O-O", Color::Black).unwrap();
        assert_eq!(black.to, Square::C8);
    }

    #[test]
    fn test_parse_promotion_with_mate() {
        let info = MoveInfo::parse("exd8=Q#", Color::White).unwrap();
        assert_eq!(info.role, Role::Pawn);
        assert_eq!(info.promotion, Some(Role::Queen));
        assert!(info.mate);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(MoveInfo::parse("Zz9", Color::White).is_err());
        assert!(MoveInfo::parse("", Color::White).is_err());
    }

    #[test]
    fn test_resolve_finds_origin_and_captured_piece() {
        let before = board("rnbqkbnr/ppp1pppp/8/3p4/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2");
        let after = board("rnbqkbnr/ppp1pppp/8/3P4/8/8/PPPP1PPP/RNBQKBNR b KQkq - 0 2");
        let mut info = MoveInfo::parse("exd5", Color::White).unwrap();
        info.resolve(&before, &after, Color::White);
        assert_eq!(info.from, Some(Square::E4));
        assert_eq!(info.captured, Some(Role::Pawn));
    }

    #[test]
    fn test_center_distance() {
        assert_eq!(center_distance(Square::D4), 0);
        assert_eq!(center_distance(Square::C6), 1);
        assert_eq!(center_distance(Square::A1), 3);
        assert_eq!(center_distance(Square::H5), 3);
    }

    #[test]
    fn test_relative_rank_flips_for_black() {
        assert_eq!(relative_rank(Square::E2, Color::White), 1);
        assert_eq!(relative_rank(Square::E7, Color::Black), 1);
    }
}
