use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArenaError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("cannot {action} while {stage}")]
    InvalidTransition {
        stage: &'static str,
        action: &'static str,
    },

    #[error("config parse error: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ArenaError>;
