//! Local game import: PGN files (plain or zstd) and JSON game records.

mod reader;
mod visitor;

pub use reader::{Compression, expand_paths, read_games, read_json_games, read_pgn};
pub use visitor::{GameVisitor, PgnGame};
