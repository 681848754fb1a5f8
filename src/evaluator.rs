//! Static, engine-free reading of a single FEN.
//!
//! Everything here is a pure function of the FEN text: two identical FENs
//! always produce identical evaluations.

use shakmaty::fen::Fen;
use shakmaty::{Bitboard, Board, Color, File, Piece, Rank, Role, Square, attacks};

use crate::error::AnalysisError;
use crate::moves::{center_distance, piece_value, relative_rank};
use crate::types::Phase;

const CASTLED_SQUARES_WHITE: [Square; 2] = [Square::G1, Square::C1];
const CASTLED_SQUARES_BLACK: [Square; 2] = [Square::G8, Square::C8];

/// Decoded board state of one FEN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub board: Board,
    pub turn: Color,
    pub castling_rights: Bitboard,
}

impl Snapshot {
    /// Accepts full six-field FENs and four-field EPD-style FENs.
    pub fn decode(fen: &str) -> Result<Self, AnalysisError> {
        let field_count = fen.split_whitespace().count();
        if field_count != 6 && field_count != 4 {
            return Err(AnalysisError::invalid_position(
                fen,
                format!("expected 4 or 6 fields, found {field_count}"),
            ));
        }

        let placement = fen.split_whitespace().next().unwrap_or_default();
        let ranks: Vec<&str> = placement.split('/').collect();
        if ranks.len() != 8 {
            return Err(AnalysisError::invalid_position(
                fen,
                format!("expected 8 ranks, found {}", ranks.len()),
            ));
        }
        for rank in &ranks {
            let width: u32 = rank
                .chars()
                .map(|c| c.to_digit(10).unwrap_or(1))
                .sum();
            if width != 8 {
                return Err(AnalysisError::invalid_position(
                    fen,
                    format!("rank '{rank}' covers {width} squares"),
                ));
            }
        }

        let parsed: Fen = fen
            .parse()
            .map_err(|e| AnalysisError::invalid_position(fen, format!("{e}")))?;
        let setup = parsed.into_setup();

        Ok(Self {
            board: setup.board,
            turn: setup.turn,
            castling_rights: setup.castling_rights,
        })
    }

    pub fn castling_rights_of(&self, color: Color) -> usize {
        let rank = match color {
            Color::White => Rank::First,
            Color::Black => Rank::Eighth,
        };
        (self.castling_rights & Bitboard::from_rank(rank)).count()
    }

    pub fn has_bishop_pair(&self, color: Color) -> bool {
        self.board
            .by_piece(Piece {
                color,
                role: Role::Bishop,
            })
            .count()
            >= 2
    }

    pub fn phase(&self, move_number: u32) -> Phase {
        game_phase(&self.board, move_number)
    }
}

/// Phase from move number and remaining non-pawn material.
pub fn game_phase(board: &Board, move_number: u32) -> Phase {
    let mut non_pawn = 0;
    for sq in board.occupied() {
        if let Some(piece) = board.piece_at(sq)
            && piece.role != Role::Pawn
        {
            non_pawn += piece_value(piece.role);
        }
    }
    let queens = board.by_role(Role::Queen).count();

    if non_pawn <= 26 || (queens == 0 && non_pawn <= 32) {
        Phase::Endgame
    } else if move_number <= 10 {
        Phase::Opening
    } else {
        Phase::Middlegame
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaterialBalance {
    pub white: i32,
    pub black: i32,
    pub difference: i32,
}

impl MaterialBalance {
    pub fn of(board: &Board) -> Self {
        let mut white = 0;
        let mut black = 0;
        for sq in board.occupied() {
            if let Some(piece) = board.piece_at(sq) {
                match piece.color {
                    Color::White => white += piece_value(piece.role),
                    Color::Black => black += piece_value(piece.role),
                }
            }
        }
        Self {
            white,
            black,
            difference: white - black,
        }
    }

    pub fn for_side(&self, color: Color) -> i32 {
        match color {
            Color::White => self.difference,
            Color::Black => -self.difference,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KingSafety {
    pub score: f64,
    pub castling_lost: bool,
    pub exposed: bool,
}

impl KingSafety {
    pub fn of(snapshot: &Snapshot, color: Color, phase: Phase) -> Self {
        let rights = snapshot.castling_rights_of(color);
        let mut score = 5.0 + 0.5 * rights as f64;

        let Some(king) = snapshot.board.king_of(color) else {
            return Self {
                score,
                castling_lost: rights == 0,
                exposed: true,
            };
        };

        let castled_squares = match color {
            Color::White => CASTLED_SQUARES_WHITE,
            Color::Black => CASTLED_SQUARES_BLACK,
        };
        let castled = castled_squares.contains(&king);
        if castled {
            score += 1.0;
        }

        let central = matches!(king.file(), File::D | File::E | File::F);
        let past_opening = phase != Phase::Opening;
        if central && past_opening {
            score -= 1.0;
        }

        let shield = pawn_shield(&snapshot.board, king, color);
        let exposed = past_opening && phase != Phase::Endgame && (central || shield < 2);

        Self {
            score,
            castling_lost: rights == 0 && !castled,
            exposed,
        }
    }
}

/// Own pawns on the king's file and its neighbours, one or two ranks ahead.
fn pawn_shield(board: &Board, king: Square, color: Color) -> usize {
    let own_pawns = board.by_piece(Piece {
        color,
        role: Role::Pawn,
    });
    let king_file = king.file() as i32;
    let king_rank = relative_rank(king, color) as i32;

    own_pawns
        .into_iter()
        .filter(|sq| {
            let df = (sq.file() as i32 - king_file).abs();
            let dr = relative_rank(*sq, color) as i32 - king_rank;
            df <= 1 && (1..=2).contains(&dr)
        })
        .count()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PawnStructure {
    pub isolated: u32,
    pub doubled: u32,
    pub backward: u32,
}

impl PawnStructure {
    pub fn of(board: &Board, color: Color) -> Self {
        let own = board.by_piece(Piece {
            color,
            role: Role::Pawn,
        });
        let enemy = board.by_piece(Piece {
            color: color.other(),
            role: Role::Pawn,
        });

        let mut per_file = [0u32; 8];
        for sq in own {
            per_file[sq.file() as usize] += 1;
        }

        let mut structure = Self::default();
        for count in per_file {
            structure.doubled += count.saturating_sub(1);
        }

        for sq in own {
            let file = sq.file() as usize;
            let neighbours: Vec<Square> = own
                .into_iter()
                .filter(|other| (other.file() as i32 - file as i32).abs() == 1)
                .collect();

            if neighbours.is_empty() {
                structure.isolated += 1;
                continue;
            }

            let rank = relative_rank(sq, color);
            let all_ahead = neighbours
                .iter()
                .all(|other| relative_rank(*other, color) > rank);
            if all_ahead && stop_square_controlled(sq, color, enemy) {
                structure.backward += 1;
            }
        }

        structure
    }

    pub fn weaknesses(&self) -> u32 {
        self.isolated + self.doubled + self.backward
    }
}

fn stop_square_controlled(sq: Square, color: Color, enemy_pawns: Bitboard) -> bool {
    let rank = sq.rank() as i32;
    let stop_rank = match color {
        Color::White => rank + 1,
        Color::Black => rank - 1,
    };
    if !(0..8).contains(&stop_rank) {
        return false;
    }
    let stop = Square::from_coords(sq.file(), Rank::new(stop_rank as u32));
    !(attacks::pawn_attacks(color, stop) & enemy_pawns).is_empty()
}

/// Activity and space for one side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Activity {
    pub score: f64,
    pub space: u32,
    pub central_occupation: u32,
    pub undeveloped_minors: u32,
}

impl Activity {
    pub fn of(board: &Board, color: Color) -> Self {
        let mut score = 0.0;
        let mut space = 0;
        let mut central_occupation = 0;
        let mut undeveloped_minors = 0;

        for sq in board.by_color(color) {
            let Some(piece) = board.piece_at(sq) else {
                continue;
            };
            if piece.role == Role::King {
                continue;
            }

            let rel = relative_rank(sq, color);
            if rel >= 4 {
                space += 1;
            }

            match center_distance(sq) {
                0 => {
                    central_occupation += 1;
                    score += 1.0;
                }
                1 => score += 0.5,
                _ => {}
            }

            match piece.role {
                Role::Knight | Role::Bishop => {
                    if rel == 0 {
                        undeveloped_minors += 1;
                        score -= 0.5;
                    } else if piece.role == Role::Knight && center_distance(sq) == 3 {
                        score -= 0.5;
                    }
                    let reach = board.attacks_from(sq) & !board.by_color(color);
                    score += 0.1 * reach.count() as f64;
                }
                Role::Rook | Role::Queen => {
                    let reach = board.attacks_from(sq) & !board.by_color(color);
                    score += 0.05 * reach.count() as f64;
                }
                Role::Pawn | Role::King => {}
            }
        }

        Self {
            score: (score * 100.0).round() / 100.0,
            space,
            central_occupation,
            undeveloped_minors,
        }
    }
}

/// Central control used by the space detector: own pieces on the four
/// centre squares plus own c-f pawns on the fourth and fifth relative ranks.
pub fn central_control(board: &Board, color: Color) -> u32 {
    let mut control = 0;
    for sq in board.by_color(color) {
        let Some(piece) = board.piece_at(sq) else {
            continue;
        };
        if center_distance(sq) == 0 {
            control += 1;
        }
        if piece.role == Role::Pawn
            && matches!(sq.file(), File::C | File::D | File::E | File::F)
            && matches!(relative_rank(sq, color), 3 | 4)
        {
            control += 1;
        }
    }
    control
}
