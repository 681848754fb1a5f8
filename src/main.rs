use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use chess_patterns::config::AnalysisConfig;
use chess_patterns::detectors::DetectorRegistry;
use chess_patterns::engine::PatternEngine;
use chess_patterns::handoff::{HandoffPayload, render_prompt};
use chess_patterns::import::{self, Compression};
use chess_patterns::types::Side;
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Handoff payload as pretty JSON
    Json,
    /// Coaching prompt text
    Prompt,
}

#[derive(Debug, Clone, Parser)]
#[command(
    author,
    version,
    about = "Find recurring positional weaknesses in a player's games",
    long_about = None
)]
struct Args {
    /// PGN file or glob pattern, or a `.json` file of game records
    input: String,

    /// Player whose games are analysed (required for PGN input)
    #[arg(long)]
    player: Option<String>,

    /// Decompress PGN input (`zstd`); `.zst` files are detected automatically
    #[arg(long, value_parser = Compression::parse)]
    compression: Option<Compression>,

    /// JSON file overriding the analysis defaults
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("CHESS_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => AnalysisConfig::from_path(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => AnalysisConfig::default(),
    };

    let is_json = args.input.to_ascii_lowercase().ends_with(".json");
    let games = if is_json {
        import::read_json_games(Path::new(&args.input))
            .with_context(|| format!("Failed to read game records: {}", args.input))?
    } else {
        let Some(player) = args.player.as_deref() else {
            bail!("--player is required for PGN input");
        };
        import::read_games(&args.input, args.compression.unwrap_or_default(), player)
            .with_context(|| format!("Failed to import PGN: {}", args.input))?
    };

    let engine = PatternEngine::new(DetectorRegistry::standard(), config);
    let report = engine.analyze(&games)?;

    let player = args.player.clone().unwrap_or_else(|| {
        games
            .iter()
            .find_map(|game| match game.user_color? {
                Side::White => Some(game.white.clone()),
                Side::Black => Some(game.black.clone()),
            })
            .unwrap_or_default()
    });
    let payload = HandoffPayload::from_report(&player, &report);

    match args.format {
        OutputFormat::Json => println!("{}", payload.to_json_pretty()?),
        OutputFormat::Prompt => {
            let prompt = render_prompt(&payload, &games);
            print!("{prompt}");
        }
    }

    if !report.coverage_gaps.is_empty() {
        tracing::warn!(
            skipped = report.coverage_gaps.len(),
            "games skipped because the player's colour was unknown"
        );
    }
    Ok(())
}
