//! Recurring weakness detection over a player's chess games.
//!
//! Games come in as positions (FEN plus the move that produced it), either
//! built by the caller or imported from PGN with [`import`]. The
//! [`engine::PatternEngine`] runs the positional [`detectors`] over every
//! player move, groups what they find by theme, keeps the themes that recur
//! across games, and returns at most a few ranked [`types::PatternGroup`]s
//! with game-distinct examples. When nothing recurs it falls back to a
//! broader single-move scan, and when that finds nothing too it returns an
//! explicit "no critical mistakes" group rather than an empty list.

pub mod aggregate;
pub mod config;
pub mod context;
pub mod detectors;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod fallback;
pub mod handoff;
pub mod import;
pub mod moves;
pub mod timeline;
pub mod types;

pub use config::AnalysisConfig;
pub use engine::{AnalysisReport, PatternEngine, ReportSource};
pub use error::AnalysisError;
pub use types::{GameRecord, PatternGroup, PatternType, Position};
