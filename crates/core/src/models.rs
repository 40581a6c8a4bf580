use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    User,
    Bot,
}

impl Speaker {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Bot => "bot",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub speaker: Speaker,
    pub text: String,
    pub at: DateTime<Utc>,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::User,
            text: text.into(),
            at: Utc::now(),
        }
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Bot,
            text: text.into(),
            at: Utc::now(),
        }
    }
}

/// Append-only record of a conversation, owned by whichever shell runs it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn push_user(&mut self, text: impl Into<String>) {
        self.push(Turn::user(text));
    }

    pub fn push_bot(&mut self, text: impl Into<String>) {
        self.push(Turn::bot(text));
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Drops the oldest turns so at most `max_turns` remain.
    pub fn retain_latest(&mut self, max_turns: usize) {
        if self.turns.len() > max_turns {
            let keep_from = self.turns.len() - max_turns;
            self.turns = self.turns.split_off(keep_from);
        }
    }

    pub fn summary(&self) -> TranscriptSummary {
        let user_turns = self
            .turns
            .iter()
            .filter(|turn| turn.speaker == Speaker::User)
            .count();
        let bot_turns = self
            .turns
            .iter()
            .filter(|turn| turn.speaker == Speaker::Bot)
            .count();

        TranscriptSummary {
            user_turns,
            bot_turns,
            total_turns: self.turns.len(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptSummary {
    pub user_turns: usize,
    pub bot_turns: usize,
    pub total_turns: usize,
}

/// Which stage of classification produced the reply text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReplySource {
    Arithmetic,
    Rule { name: String },
    Fallback,
}

impl ReplySource {
    pub fn label(&self) -> &str {
        match self {
            Self::Arithmetic => "arithmetic",
            Self::Rule { name } => name.as_str(),
            Self::Fallback => "fallback",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub reply_text: String,
    pub should_exit: bool,
    pub source: ReplySource,
}
