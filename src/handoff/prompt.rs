use super::HandoffPayload;
use crate::engine::ReportSource;
use crate::types::{GameRecord, GameResult};

const RESPONSE_SCHEMA: &str = r#"{
  "executiveSummary": "One paragraph on the player's overall style and the main theme of this report.",
  "recurringWeaknesses": [
    {
      "title": "Short name of the weakness",
      "explanation": "Why this habit costs games in the long run.",
      "examples": [
        {
          "gameNumber": 1,
          "moveNumber": 15,
          "move": "15...g5?",
          "fen": "FEN of the position before the move",
          "whyMistake": "Why the move is a strategic mistake here.",
          "betterPlan": "The stronger plan and the idea behind it."
        }
      ]
    }
  ],
  "middlegameMastery": {
    "analysis": "Are the middlegame plans coherent? Is the right side of the board chosen?",
    "keyConceptToStudy": "One middlegame concept to study."
  },
  "endgameTechnique": {
    "assessment": "How well are advantages converted and bad endgames defended?",
    "skillToPractice": "One endgame skill to practise."
  },
  "improvementPlan": {
    "threeStepChecklist": ["Step 1", "Step 2", "Step 3"],
    "youtubeVideo": { "title": "Video title", "creator": "Channel name" },
    "masterGame": "A classic game that illustrates the main concept."
  }
}"#;

/// Renders the coaching prompt: one block per game with every move and its
/// FEN, the detected patterns, and the JSON shape expected back.
pub fn render_prompt(payload: &HandoffPayload, games: &[GameRecord]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "You are a chess coach. Analyse the games of '{}' and find the strategic habits \
         that cost them results, not isolated tactical blunders.\n\n",
        payload.player
    ));

    out.push_str("GAMES:\n");
    let blocks: Vec<String> = games.iter().map(game_block).collect();
    out.push_str(&blocks.join("\n---\n\n"));

    out.push_str("\nDETECTED PATTERNS:\n");
    out.push_str(&pattern_summary(payload));

    out.push_str("\nRespond with JSON in exactly this shape:\n\n");
    out.push_str(RESPONSE_SCHEMA);
    out.push_str(
        "\n\nRequirements:\n\
         1. Exactly 3 recurring weaknesses.\n\
         2. Each weakness has 3 examples, each from a different game.\n\
         3. Examples are strategic mistakes, not tactical blunders.\n\
         4. Return only valid JSON, no other text.\n",
    );
    out
}

fn game_block(game: &GameRecord) -> String {
    let mut block = format!("GAME {}\n", game.game_number);
    block.push_str(&format!("White: {} ({})\n", game.white, rating(game.white_rating)));
    block.push_str(&format!("Black: {} ({})\n", game.black, rating(game.black_rating)));
    block.push_str(&format!("Result: {}\n", result_label(game.result)));
    block.push_str(&format!("ECO: {}\n", game.eco.as_deref().unwrap_or("?")));
    block.push_str(&format!(
        "Time Control: {}\n",
        game.time_control.as_deref().unwrap_or("?")
    ));
    block.push_str(&format!(
        "User Color: {}\n",
        game.user_color.map_or_else(|| "unknown".to_string(), |side| side.to_string())
    ));
    block.push_str(&format!("Opponent: {}\n\nMoves:\n", game.opponent));
    for position in &game.positions {
        block.push_str(&format!(
            "Move {}: {} (FEN: {})\n",
            position.move_number, position.mv, position.fen
        ));
    }
    block
}

fn pattern_summary(payload: &HandoffPayload) -> String {
    let mut summary = match payload.source {
        ReportSource::Recurring => format!(
            "Recurring across {} analysed games:\n",
            payload.analyzed_games
        ),
        ReportSource::Fallback => format!(
            "No theme recurred across {} analysed games; the most significant single moves:\n",
            payload.analyzed_games
        ),
        ReportSource::None => String::new(),
    };
    for group in &payload.patterns {
        summary.push_str(&format!(
            "- {} ({} of {} games, {:.1}%): {}\n",
            group.title,
            group.frequency,
            payload.analyzed_games,
            group.recurrence_rate,
            group.description
        ));
        for example in &group.examples {
            summary.push_str(&format!(
                "  - game {} vs {}, move {} {}: {}\n",
                example.game_number,
                example.opponent,
                example.move_number,
                example.mv,
                example.description
            ));
        }
    }
    summary.push_str(&format!("Note: {}\n", payload.estimate_notice));
    summary
}

fn rating(value: Option<u32>) -> String {
    value.map_or_else(|| "?".to_string(), |r| r.to_string())
}

fn result_label(result: GameResult) -> &'static str {
    match result {
        GameResult::Win => "win",
        GameResult::Loss => "loss",
        GameResult::Draw => "draw",
        GameResult::Unknown => "unknown",
    }
}
