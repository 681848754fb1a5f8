use std::mem;
use std::ops::ControlFlow;

use chrono::{Datelike, NaiveDate};
use pgn_reader::{Outcome, RawTag, SanPlus, Skip, Visitor};
use shakmaty::fen::Fen;
use shakmaty::{CastlingMode, Chess, EnPassantMode, Position as _};

use crate::error::ErrorAccumulator;
use crate::evaluator::game_phase;
use crate::types::Position;

/// One PGN game as read, before it is tied to the analysed player.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PgnGame {
    pub white: Option<String>,
    pub black: Option<String>,
    pub result: Option<String>,
    pub white_elo: Option<u32>,
    pub black_elo: Option<u32>,
    pub eco: Option<String>,
    pub time_control: Option<String>,
    pub site: Option<String>,
    pub date: Option<NaiveDate>,
    /// Positions up to the last legal move.
    pub positions: Vec<Position>,
    pub parse_error: Option<String>,
}

#[derive(Default)]
struct HeaderFields {
    white: String,
    black: String,
    result: String,
    white_elo: String,
    black_elo: String,
    utc_date: String,
    date: String,
    event_date: String,
    eco: String,
    time_control: String,
    site: String,
    fen: String,
}

impl HeaderFields {
    fn clear(&mut self) {
        *self = Self::default();
    }

    fn opt_take(field: &mut String) -> Option<String> {
        if field.is_empty() {
            None
        } else {
            Some(mem::take(field))
        }
    }

    fn set_known_tag(&mut self, key: &[u8], value: RawTag<'_>) {
        let slot: &mut String = match key {
            b"White" => &mut self.white,
            b"Black" => &mut self.black,
            b"Result" => &mut self.result,
            b"WhiteElo" => &mut self.white_elo,
            b"BlackElo" => &mut self.black_elo,
            b"UTCDate" => &mut self.utc_date,
            b"Date" => &mut self.date,
            b"EventDate" => &mut self.event_date,
            b"ECO" => &mut self.eco,
            b"TimeControl" => &mut self.time_control,
            b"Site" => &mut self.site,
            b"FEN" => &mut self.fen,
            _ => return,
        };

        if !slot.is_empty() {
            return;
        }

        let bytes = value.as_bytes();
        if bytes.is_empty() {
            return;
        }

        *slot = String::from_utf8_lossy(bytes).into_owned();
    }
}

/// Streaming PGN visitor (pgn-reader).
///
/// Replays the mainline with shakmaty and records one [`Position`] per ply.
/// The first illegal move stops the replay; the game keeps the positions
/// before it and carries the error.
pub struct GameVisitor {
    headers: HeaderFields,
    board: Chess,
    positions: Vec<Position>,
    stopped: bool,
    result_marker: Option<String>,
    parse_error: ErrorAccumulator,
    pub current_game: Option<PgnGame>,
}

impl Default for GameVisitor {
    fn default() -> Self {
        Self::new()
    }
}

impl GameVisitor {
    pub fn new() -> Self {
        Self {
            headers: HeaderFields::default(),
            board: Chess::default(),
            positions: Vec::new(),
            stopped: false,
            result_marker: None,
            parse_error: ErrorAccumulator::default(),
            current_game: None,
        }
    }

    fn setup_board(&mut self) {
        self.board = Chess::default();
        if self.headers.fen.is_empty() {
            return;
        }
        let raw = self.headers.fen.trim();
        match raw
            .parse::<Fen>()
            .map_err(|e| e.to_string())
            .and_then(|fen| fen.into_position(CastlingMode::Standard).map_err(|e| e.to_string()))
        {
            Ok(position) => self.board = position,
            Err(e) => {
                self.parse_error.push(&format!("Invalid FEN header '{raw}': {e}"));
                self.stopped = true;
            }
        }
    }

    fn normalize_date_separators(s: &str) -> String {
        let s = s.trim();
        if s.contains('.') {
            s.replace('.', "-")
        } else {
            s.to_string()
        }
    }

    fn date_completeness_score(raw: &str) -> u8 {
        let norm = Self::normalize_date_separators(raw);
        let parts: Vec<&str> = norm.split('-').collect();
        if parts.len() != 3 || parts[0].contains('?') || parts[0].parse::<i32>().is_err() {
            return 0;
        }
        1 + parts[1..]
            .iter()
            .filter(|part| !part.contains('?') && part.parse::<u32>().is_ok())
            .count() as u8
    }

    fn last_day_of_month(year: i32, month: u32) -> Option<u32> {
        let first_day_next_month = if month == 12 {
            NaiveDate::from_ymd_opt(year.checked_add(1)?, 1, 1)?
        } else {
            NaiveDate::from_ymd_opt(year, month.checked_add(1)?, 1)?
        };
        first_day_next_month.pred_opt().map(|d| d.day())
    }

    /// Best of UTCDate, Date and EventDate: most complete first, then in that
    /// order. Unknown month or day (`??`) become 1; an unknown year gives `None`.
    fn parse_best_date(&mut self) -> Option<NaiveDate> {
        let mut ranked: Vec<(u8, u8, String, &'static str)> = Vec::new();
        for (precedence, raw, label) in [
            (0u8, &self.headers.utc_date, "UTCDate"),
            (1u8, &self.headers.date, "Date"),
            (2u8, &self.headers.event_date, "EventDate"),
        ] {
            let s = raw.trim();
            if s.is_empty() {
                continue;
            }
            ranked.push((Self::date_completeness_score(s), precedence, s.to_string(), label));
        }
        ranked.sort_by(|left, right| right.0.cmp(&left.0).then_with(|| left.1.cmp(&right.1)));

        ranked
            .into_iter()
            .find_map(|(_, _, raw, label)| {
                Self::parse_date_field(&raw, label, &mut self.parse_error)
            })
    }

    fn parse_date_field(
        s: &str,
        label: &str,
        parse_error: &mut ErrorAccumulator,
    ) -> Option<NaiveDate> {
        let norm = Self::normalize_date_separators(s);
        let parts: Vec<&str> = norm.split('-').collect();
        if parts.len() != 3 {
            parse_error.push(&format!("Conversion error: {label}='{s}'"));
            return None;
        }
        if parts[0].contains('?') {
            return None;
        }

        let component = |part: &str| {
            if part.contains('?') {
                "01".to_string()
            } else {
                part.to_string()
            }
        };
        let parsed = (
            parts[0].parse::<i32>(),
            component(parts[1]).parse::<u32>(),
            component(parts[2]).parse::<u32>(),
        );
        let (Ok(year), Ok(month), Ok(day)) = parsed else {
            parse_error.push(&format!("Conversion error: {label}='{s}'"));
            return None;
        };

        let Some(last_day) = Self::last_day_of_month(year, month) else {
            parse_error.push(&format!(
                "Conversion error: {label}='{s}' (chrono: input is out of range)"
            ));
            return None;
        };

        let date = NaiveDate::from_ymd_opt(year, month, day.min(last_day));
        if date.is_none() {
            parse_error.push(&format!(
                "Conversion error: {label}='{s}' (chrono: input is out of range)"
            ));
        }
        date
    }

    fn parse_uinteger_field(
        raw: &str,
        label: &str,
        parse_error: &mut ErrorAccumulator,
    ) -> Option<u32> {
        let s = raw.trim();
        if s.is_empty() || s == "?" || s == "-" {
            return None;
        }
        match s.parse::<u32>() {
            Ok(v) => Some(v),
            Err(_) => {
                parse_error.push(&format!("Conversion error: {label}='{s}'"));
                None
            }
        }
    }

    fn build_game(&mut self) {
        let white_elo =
            Self::parse_uinteger_field(&self.headers.white_elo, "WhiteElo", &mut self.parse_error);
        let black_elo =
            Self::parse_uinteger_field(&self.headers.black_elo, "BlackElo", &mut self.parse_error);
        let date = self.parse_best_date();

        self.current_game = Some(PgnGame {
            white: HeaderFields::opt_take(&mut self.headers.white),
            black: HeaderFields::opt_take(&mut self.headers.black),
            result: self
                .result_marker
                .take()
                .or_else(|| HeaderFields::opt_take(&mut self.headers.result)),
            white_elo,
            black_elo,
            eco: HeaderFields::opt_take(&mut self.headers.eco),
            time_control: HeaderFields::opt_take(&mut self.headers.time_control),
            site: HeaderFields::opt_take(&mut self.headers.site),
            date,
            positions: mem::take(&mut self.positions),
            parse_error: self.parse_error.take(),
        });
    }

    pub fn finalize_game_with_error(&mut self, error_msg: String) {
        self.parse_error.push(&error_msg);
        self.build_game();
    }
}

impl Visitor for GameVisitor {
    type Tags = ();
    type Movetext = ();
    type Output = ();

    fn begin_tags(&mut self) -> ControlFlow<Self::Output, Self::Tags> {
        self.headers.clear();
        self.positions.clear();
        self.stopped = false;
        self.result_marker = None;
        self.parse_error = ErrorAccumulator::default();
        self.current_game = None;
        ControlFlow::Continue(())
    }

    fn tag(
        &mut self,
        _: &mut Self::Tags,
        key: &[u8],
        value: RawTag<'_>,
    ) -> ControlFlow<Self::Output> {
        self.headers.set_known_tag(key, value);
        ControlFlow::Continue(())
    }

    fn begin_movetext(&mut self, _: Self::Tags) -> ControlFlow<Self::Output, Self::Movetext> {
        self.setup_board();
        ControlFlow::Continue(())
    }

    fn begin_variation(&mut self, _: &mut Self::Movetext) -> ControlFlow<Self::Output, Skip> {
        ControlFlow::Continue(Skip(true))
    }

    fn san(&mut self, _: &mut Self::Movetext, san_plus: SanPlus) -> ControlFlow<Self::Output> {
        if self.stopped {
            return ControlFlow::Continue(());
        }

        let mover = self.board.turn();
        let move_number = self.board.fullmoves().get();
        match san_plus.san.to_move(&self.board) {
            Ok(m) => {
                self.board.play_unchecked(m);
                self.positions.push(Position {
                    fen: Fen::from_position(&self.board, EnPassantMode::Legal).to_string(),
                    move_number,
                    mv: san_plus.to_string(),
                    turn: mover.into(),
                    phase: game_phase(self.board.board(), move_number),
                });
            }
            Err(e) => {
                self.parse_error.push(&format!(
                    "Illegal move '{san_plus}' at move {move_number}: {e}"
                ));
                self.stopped = true;
            }
        }
        ControlFlow::Continue(())
    }

    fn outcome(&mut self, _: &mut Self::Movetext, outcome: Outcome) -> ControlFlow<Self::Output> {
        self.result_marker = Some(outcome.to_string());
        ControlFlow::Continue(())
    }

    fn end_game(&mut self, _: Self::Movetext) -> Self::Output {
        self.build_game();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Phase, Side};
    use pgn_reader::Reader;

    fn read_one(pgn: &str) -> PgnGame {
        let mut reader = Reader::new(pgn.as_bytes());
        let mut visitor = GameVisitor::new();
        reader.read_game(&mut visitor).unwrap();
        visitor.current_game.expect("Should have parsed a game")
    }

    #[test]
    fn test_visitor_replays_mainline() {
        let game = read_one(
            r#"[White "Alice"]
[Black "Bob"]
[Result "1-0"]
[WhiteElo "1850"]
[ECO "C50"]

1. e4 e5 2. Nf3 (2. f4 exf4) Nc6 3. Bc4 1-0"#,
        );
        assert_eq!(game.white.as_deref(), Some("Alice"));
        assert_eq!(game.result.as_deref(), Some("1-0"));
        assert_eq!(game.white_elo, Some(1850));
        assert_eq!(game.black_elo, None);
        assert_eq!(game.eco.as_deref(), Some("C50"));
        assert!(game.parse_error.is_none());

        let moves: Vec<&str> = game.positions.iter().map(|p| p.mv.as_str()).collect();
        assert_eq!(moves, vec!["e4", "e5", "Nf3", "Nc6", "Bc4"]);
        let last = game.positions.last().unwrap();
        assert_eq!(last.move_number, 3);
        assert_eq!(last.turn, Side::White);
        assert_eq!(last.phase, Phase::Opening);
        assert_eq!(
            last.fen,
            "r1bqkbnr/pppp1ppp/2n5/4p3/2B1P3/5N2/PPPP1PPP/RNBQK2R b KQkq - 3 3"
        );
    }

    #[test]
    fn test_visitor_stops_at_illegal_move() {
        let game = read_one("1. e4 e5 2. Ke3 Nc6 3. Nf3 *");
        assert_eq!(game.positions.len(), 2);
        let err = game.parse_error.unwrap();
        assert!(err.contains("Illegal move 'Ke3' at move 2"));
    }

    #[test]
    fn test_visitor_starts_from_fen_header() {
        let game = read_one(
            r#"[FEN "4k3/8/8/8/8/8/4P3/4K3 w - - 0 40"]
[SetUp "1"]

40. e4 Kd7 1/2-1/2"#,
        );
        assert_eq!(game.positions.len(), 2);
        assert_eq!(game.positions[0].move_number, 40);
        assert_eq!(game.positions[1].turn, Side::Black);
        assert_eq!(game.positions[1].phase, Phase::Endgame);
    }

    #[test]
    fn test_visitor_date_prefers_most_complete() {
        let game = read_one(
            r#"[UTCDate "2024.??.??"]
[Date "2024.03.15"]

1. e4 *"#,
        );
        assert_eq!(game.date, NaiveDate::from_ymd_opt(2024, 3, 15));
    }

    #[test]
    fn test_visitor_date_partial_and_clamped() {
        let game = read_one("[Date \"2023.02.??\"]\n\n1. d4 *");
        assert_eq!(game.date, NaiveDate::from_ymd_opt(2023, 2, 1));

        let game = read_one("[Date \"2023.02.31\"]\n\n1. d4 *");
        assert_eq!(game.date, NaiveDate::from_ymd_opt(2023, 2, 28));

        let game = read_one("[Date \"????.??.??\"]\n\n1. d4 *");
        assert_eq!(game.date, None);
        assert!(game.parse_error.is_none());
    }

    #[test]
    fn test_visitor_records_conversion_errors() {
        let game = read_one("[WhiteElo \"strong\"]\n[Date \"yesterday\"]\n\n1. d4 *");
        let err = game.parse_error.unwrap();
        assert!(err.contains("Conversion error: WhiteElo='strong'"));
        assert!(err.contains("Conversion error: Date='yesterday'"));
    }
}
