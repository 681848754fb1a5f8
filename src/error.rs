use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("Invalid position '{fen}': {reason}")]
    InvalidPosition { fen: String, reason: String },

    #[error("Invalid move '{san}': {reason}")]
    InvalidMove { san: String, reason: String },

    #[error("Failed to open file '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "Parser-stage error: file='{}'; game_index={game_index}; error={message}",
        .path.display()
    )]
    Pgn {
        path: PathBuf,
        game_index: usize,
        message: String,
    },

    #[error("Invalid path pattern: {0}")]
    Glob(#[from] glob::PatternError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("Unusable coaching response: {0}")]
    Response(String),

    #[error("No games matched '{0}'")]
    NoGames(String),

    #[error("Analysis cancelled")]
    Cancelled,
}

impl AnalysisError {
    pub(crate) fn invalid_position(fen: &str, reason: impl Into<String>) -> Self {
        Self::InvalidPosition {
            fen: fen.to_string(),
            reason: reason.into(),
        }
    }
}

/// Collects per-game diagnostics into one `; `-separated message.
#[derive(Debug, Clone, Default)]
pub struct ErrorAccumulator(Option<String>);

impl ErrorAccumulator {
    pub fn push(&mut self, msg: &str) {
        match &mut self.0 {
            Some(existing) => {
                existing.push_str("; ");
                existing.push_str(msg);
            }
            None => {
                self.0 = Some(msg.to_string());
            }
        }
    }

    pub fn take(&mut self) -> Option<String> {
        self.0.take()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }
}
