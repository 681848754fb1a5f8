use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use pgn_reader::Reader;
use zstd::stream::read::Decoder as ZstdDecoder;

use super::visitor::{GameVisitor, PgnGame};
use crate::error::AnalysisError;
use crate::types::{GameRecord, GameResult, Side};

pub type PgnInput = Box<dyn Read + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    #[default]
    Plain,
    Zstd,
}

impl Compression {
    pub fn parse(raw: &str) -> Result<Self, AnalysisError> {
        let normalized = raw.trim();
        if normalized.eq_ignore_ascii_case("zstd") {
            Ok(Self::Zstd)
        } else {
            Err(AnalysisError::Config(format!(
                "Invalid compression value '{normalized}'. Supported values: 'zstd' or omitted."
            )))
        }
    }

    /// `.zst` files are always decompressed, whatever was requested.
    fn for_path(self, path: &Path) -> Self {
        let zst = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("zst"));
        if zst { Self::Zstd } else { self }
    }
}

impl FromStr for Compression {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// A single path, or every match of a pattern containing `*` or `?`.
pub fn expand_paths(pattern: &str) -> Result<Vec<PathBuf>, AnalysisError> {
    if pattern.contains('*') || pattern.contains('?') {
        let mut paths: Vec<PathBuf> = glob::glob(pattern)?.filter_map(|entry| entry.ok()).collect();
        paths.sort();
        Ok(paths)
    } else {
        Ok(vec![PathBuf::from(pattern)])
    }
}

fn open_input_stream(path: &Path, compression: Compression) -> Result<PgnInput, AnalysisError> {
    let file = File::open(path).map_err(|source| AnalysisError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    match compression.for_path(path) {
        Compression::Plain => Ok(Box::new(BufReader::new(file))),
        Compression::Zstd => ZstdDecoder::new(file)
            .map(|decoder| Box::new(decoder) as PgnInput)
            .map_err(|source| AnalysisError::Io {
                path: path.to_path_buf(),
                source,
            }),
    }
}

/// Reads every game of every file matching `pattern` and ties each to
/// `player` by name. Games numbered from 1 in file order.
///
/// A file that cannot be opened is fatal only when it is the sole input.
pub fn read_games(
    pattern: &str,
    compression: Compression,
    player: &str,
) -> Result<Vec<GameRecord>, AnalysisError> {
    let paths = expand_paths(pattern)?;
    if paths.is_empty() {
        return Err(AnalysisError::NoGames(pattern.to_string()));
    }

    let mut games = Vec::new();
    for path in &paths {
        let input = match open_input_stream(path, compression) {
            Ok(input) => input,
            Err(err) if paths.len() == 1 => return Err(err),
            Err(err) => {
                tracing::warn!("{err}");
                continue;
            }
        };
        let first_number = games.len() as u32 + 1;
        games.extend(read_pgn(input, path, player, first_number));
    }

    tracing::info!(files = paths.len(), games = games.len(), "PGN import finished");
    Ok(games)
}

/// Reads all games from one PGN stream. A parser-stage error ends the
/// stream; games read before it are kept.
pub fn read_pgn(
    input: impl Read,
    source: &Path,
    player: &str,
    first_number: u32,
) -> Vec<GameRecord> {
    let mut reader = Reader::new(input);
    let mut visitor = GameVisitor::new();
    let mut games = Vec::new();
    let mut game_index = 1;

    loop {
        match reader.read_game(&mut visitor) {
            Ok(Some(())) => {}
            Ok(None) => break,
            Err(error) => {
                let err = AnalysisError::Pgn {
                    path: source.to_path_buf(),
                    game_index,
                    message: error.to_string(),
                };
                tracing::warn!("{err}");
                break;
            }
        }

        if let Some(game) = visitor.current_game.take() {
            if let Some(message) = &game.parse_error {
                let err = AnalysisError::Pgn {
                    path: source.to_path_buf(),
                    game_index,
                    message: message.clone(),
                };
                tracing::warn!("{err}");
            }
            let game_number = first_number + games.len() as u32;
            games.push(into_record(game, game_number, player));
        }
        game_index += 1;
    }
    games
}

fn into_record(game: PgnGame, game_number: u32, player: &str) -> GameRecord {
    let white = game.white.unwrap_or_default();
    let black = game.black.unwrap_or_default();
    let user_color = player_side(&white, &black, player);
    let opponent = match user_color {
        Some(Side::White) => black.clone(),
        Some(Side::Black) => white.clone(),
        None => String::new(),
    };
    let result = match (user_color, game.result.as_deref()) {
        (Some(side), Some(marker)) => GameResult::from_pgn(marker, side),
        _ => GameResult::Unknown,
    };

    GameRecord {
        game_number,
        white,
        black,
        user_color,
        opponent,
        result,
        positions: game.positions,
        white_rating: game.white_elo,
        black_rating: game.black_elo,
        eco: game.eco,
        time_control: game.time_control,
        url: game.site,
        played_on: game.date,
    }
}

fn player_side(white: &str, black: &str, player: &str) -> Option<Side> {
    let player = player.trim();
    if player.is_empty() {
        return None;
    }
    if white.trim().eq_ignore_ascii_case(player) {
        Some(Side::White)
    } else if black.trim().eq_ignore_ascii_case(player) {
        Some(Side::Black)
    } else {
        None
    }
}

/// Games already reduced to positions, as a JSON array of [`GameRecord`].
pub fn read_json_games(path: &Path) -> Result<Vec<GameRecord>, AnalysisError> {
    let file = File::open(path).map_err(|source| AnalysisError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const TWO_GAMES: &str = r#"[White "Hero"]
[Black "Rival"]
[Result "0-1"]
[Site "https://example.org/game/1"]

1. e4 e5 2. Qh5 Nc6 3. Bc4 Nf6 4. Qxf7# 0-1

[White "Other"]
[Black "HERO"]
[Result "1-0"]

1. d4 d5 1-0
"#;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("chess-patterns-{}-{name}", std::process::id()))
    }

    #[test]
    fn test_parse_compression_zstd_case_insensitive() {
        assert_eq!(Compression::parse("zstd").unwrap(), Compression::Zstd);
        assert_eq!(Compression::parse(" ZSTD ").unwrap(), Compression::Zstd);
        let err = Compression::parse("gzip").unwrap_err().to_string();
        assert!(err.contains("Invalid compression value 'gzip'"));
        assert!(Compression::parse("").is_err());
    }

    #[test]
    fn test_read_pgn_assigns_player_side() {
        let games = read_pgn(TWO_GAMES.as_bytes(), Path::new("inline.pgn"), "hero", 1);
        assert_eq!(games.len(), 2);

        assert_eq!(games[0].game_number, 1);
        assert_eq!(games[0].user_color, Some(Side::White));
        assert_eq!(games[0].opponent, "Rival");
        assert_eq!(games[0].result, GameResult::Loss);
        assert_eq!(games[0].positions.len(), 7);
        assert_eq!(games[0].url.as_deref(), Some("https://example.org/game/1"));

        assert_eq!(games[1].game_number, 2);
        assert_eq!(games[1].user_color, Some(Side::Black));
        assert_eq!(games[1].result, GameResult::Loss);
    }

    #[test]
    fn test_unknown_player_leaves_colour_empty() {
        let games = read_pgn(TWO_GAMES.as_bytes(), Path::new("inline.pgn"), "nobody", 1);
        assert!(games.iter().all(|g| g.user_color.is_none()));
        assert!(games.iter().all(|g| g.result == GameResult::Unknown));
    }

    #[test]
    fn test_read_games_plain_and_zstd() {
        let plain = temp_path("games.pgn");
        fs::write(&plain, TWO_GAMES).unwrap();
        let compressed = temp_path("games.pgn.zst");
        fs::write(&compressed, zstd::encode_all(TWO_GAMES.as_bytes(), 0).unwrap()).unwrap();

        let games = read_games(plain.to_str().unwrap(), Compression::Plain, "Hero").unwrap();
        assert_eq!(games.len(), 2);
        let games = read_games(compressed.to_str().unwrap(), Compression::Plain, "Hero").unwrap();
        assert_eq!(games.len(), 2);
        assert_eq!(games[1].positions.len(), 2);

        fs::remove_file(plain).ok();
        fs::remove_file(compressed).ok();
    }

    #[test]
    fn test_missing_single_file_is_fatal() {
        let err = read_games("/nonexistent/games.pgn", Compression::Plain, "hero").unwrap_err();
        assert!(matches!(err, AnalysisError::Io { .. }));
        assert!(err.to_string().contains("Failed to open file '/nonexistent/games.pgn'"));
    }

    #[test]
    fn test_empty_glob_is_no_games() {
        let err = read_games("/nonexistent/dir/*.pgn", Compression::Plain, "hero").unwrap_err();
        assert!(matches!(err, AnalysisError::NoGames(_)));
    }

    #[test]
    fn test_read_json_games() {
        let path = temp_path("games.json");
        let games = read_pgn(TWO_GAMES.as_bytes(), Path::new("inline.pgn"), "hero", 1);
        fs::write(&path, serde_json::to_string(&games).unwrap()).unwrap();

        let back = read_json_games(&path).unwrap();
        assert_eq!(back, games);
        fs::remove_file(path).ok();
    }
}
