use crate::evaluator::Snapshot;
use crate::moves::MoveInfo;
use crate::types::{GameRecord, Position, Side};

/// Decoded view of one game: the board after every position plus the move
/// that produced it, resolved against the previous board when both decode.
pub struct GameTimeline<'a> {
    pub game: &'a GameRecord,
    pub player: Side,
    snapshots: Vec<Option<Snapshot>>,
    moves: Vec<Option<MoveInfo>>,
    invalid_positions: usize,
}

impl<'a> GameTimeline<'a> {
    pub fn build(game: &'a GameRecord, player: Side) -> Self {
        let mut invalid_positions = 0;
        let snapshots: Vec<Option<Snapshot>> = game
            .positions
            .iter()
            .map(|position| match Snapshot::decode(&position.fen) {
                Ok(snapshot) => Some(snapshot),
                Err(err) => {
                    invalid_positions += 1;
                    tracing::debug!(
                        game = game.game_number,
                        move_number = position.move_number,
                        "skipping transition: {err}"
                    );
                    None
                }
            })
            .collect();

        let moves = game
            .positions
            .iter()
            .enumerate()
            .map(|(idx, position)| {
                let mover = position.turn.color();
                let mut info = MoveInfo::parse(&position.mv, mover).ok()?;
                if idx > 0
                    && let (Some(before), Some(after)) = (&snapshots[idx - 1], &snapshots[idx])
                {
                    info.resolve(&before.board, &after.board, mover);
                }
                Some(info)
            })
            .collect();

        Self {
            game,
            player,
            snapshots,
            moves,
            invalid_positions,
        }
    }

    pub fn len(&self) -> usize {
        self.game.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.game.positions.is_empty()
    }

    pub fn invalid_positions(&self) -> usize {
        self.invalid_positions
    }

    pub fn position(&self, idx: usize) -> &'a Position {
        &self.game.positions[idx]
    }

    pub fn snapshot(&self, idx: usize) -> Option<&Snapshot> {
        self.snapshots.get(idx).and_then(Option::as_ref)
    }

    pub fn move_at(&self, idx: usize) -> Option<&MoveInfo> {
        self.moves.get(idx).and_then(Option::as_ref)
    }

    pub fn is_player_ply(&self, idx: usize) -> bool {
        self.game
            .positions
            .get(idx)
            .is_some_and(|position| position.turn == self.player)
    }

    /// Indices of the player's plies whose board and predecessor both decoded.
    pub fn player_transitions(&self) -> impl Iterator<Item = usize> + '_ {
        (1..self.len()).filter(move |&idx| {
            self.is_player_ply(idx)
                && self.snapshot(idx).is_some()
                && self.snapshot(idx - 1).is_some()
                && self.move_at(idx).is_some()
        })
    }

    /// Player plies dropped because their board or its predecessor did not decode.
    pub fn skipped_transitions(&self) -> usize {
        (1..self.len())
            .filter(|&idx| {
                self.is_player_ply(idx)
                    && (self.snapshot(idx).is_none() || self.snapshot(idx - 1).is_none())
            })
            .count()
    }

    /// Up to `plies` moves immediately before `idx`, most recent first.
    pub fn preceding(
        &self,
        idx: usize,
        plies: usize,
    ) -> impl Iterator<Item = (usize, &MoveInfo)> + '_ {
        let start = idx.saturating_sub(plies);
        (start..idx)
            .rev()
            .filter_map(move |i| self.move_at(i).map(|info| (i, info)))
    }

    /// The player's own moves among the `plies` plies before `idx`, most recent first.
    pub fn preceding_player_moves(
        &self,
        idx: usize,
        plies: usize,
    ) -> impl Iterator<Item = (usize, &MoveInfo)> + '_ {
        self.preceding(idx, plies)
            .filter(move |(i, _)| self.is_player_ply(*i))
    }

    pub fn next_move(&self, idx: usize) -> Option<&MoveInfo> {
        self.move_at(idx + 1)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::types::{GameRecord, GameResult, Phase, Position, Side};
    use shakmaty::fen::Fen;
    use shakmaty::san::SanPlus;
    use shakmaty::{CastlingMode, Chess, EnPassantMode, Position as _};

    /// Replays `sans` from `start` (standard position when `None`) and
    /// records one `Position` per ply.
    pub fn replay(start: Option<&str>, sans: &[&str]) -> Vec<Position> {
        let mut pos: Chess = match start {
            Some(fen) => {
                let fen: Fen = fen.parse().unwrap();
                fen.into_position(CastlingMode::Standard).unwrap()
            }
            None => Chess::default(),
        };

        let mut positions = Vec::new();
        for token in sans {
            let mover = pos.turn();
            let move_number = pos.fullmoves().get();
            let san: SanPlus = token.parse().unwrap();
            let m = san.san.to_move(&pos).unwrap();
            pos.play_unchecked(m);
            let fen = Fen::from_position(&pos, EnPassantMode::Legal).to_string();
            positions.push(Position {
                fen,
                move_number,
                mv: token.to_string(),
                turn: mover.into(),
                phase: if move_number <= 10 {
                    Phase::Opening
                } else {
                    Phase::Middlegame
                },
            });
        }
        positions
    }

    /// The starting FEN as a position of its own (with an unreadable `--`
    /// move) followed by the replayed moves, so the first move is a transition.
    pub fn line(fen: &str, sans: &[&str]) -> Vec<Position> {
        let parsed: Fen = fen.parse().unwrap();
        let setup = parsed.as_setup();
        let to_move = setup.turn;
        let fullmoves = setup.fullmoves.get();
        let seed = Position {
            fen: fen.to_string(),
            move_number: if to_move.is_white() {
                fullmoves.saturating_sub(1)
            } else {
                fullmoves
            },
            mv: "--".to_string(),
            turn: to_move.other().into(),
            phase: Phase::Middlegame,
        };

        let mut positions = vec![seed];
        positions.extend(replay(Some(fen), sans));
        positions
    }

    pub fn game(
        game_number: u32,
        player: Side,
        result: GameResult,
        positions: Vec<Position>,
    ) -> GameRecord {
        let (white, black) = ("hero".to_string(), format!("rival{game_number}"));
        let opponent = match player {
            Side::White => black.clone(),
            Side::Black => white.clone(),
        };
        GameRecord {
            game_number,
            white,
            black,
            user_color: Some(player),
            opponent,
            result,
            positions,
            ..GameRecord::default()
        }
    }
}
