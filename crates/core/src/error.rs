use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuleBookError {
    #[error("rule '{rule}' has no responses")]
    EmptyResponses { rule: String },

    #[error("rule '{rule}' has no keywords")]
    EmptyKeywords { rule: String },

    #[error("rule '{rule}' contains a blank keyword")]
    BlankKeyword { rule: String },

    #[error("rule name '{rule}' is used more than once")]
    DuplicateRule { rule: String },

    #[error("fallback response list is empty")]
    EmptyFallback,

    #[error("exit keyword list is empty")]
    EmptyExitKeywords,

    #[error("exit keyword list contains a blank keyword")]
    BlankExitKeyword,

    #[error("failed to compile matcher for rule '{rule}': {source}")]
    Matcher {
        rule: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid rule book json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to read rule book {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
