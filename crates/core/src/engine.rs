use std::sync::Arc;

use chrono::{DateTime, Local};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::arithmetic;
use crate::models::{ClassificationResult, ReplySource};
use crate::rules::RuleBook;

pub const TIME_FORMAT: &str = "%I:%M %p";
pub const DATE_FORMAT: &str = "%B %d, %Y";

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Local>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Local> {
        self.0
    }
}

/// Source of uniform indexes used to choose among candidate replies.
pub trait ReplyPicker: Send + Sync {
    /// Returns an index in `0..len`. `len` is always non-zero.
    fn pick(&self, len: usize) -> usize;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRngPicker;

impl ReplyPicker for ThreadRngPicker {
    fn pick(&self, len: usize) -> usize {
        rand::thread_rng().gen_range(0..len)
    }
}

#[derive(Debug)]
pub struct SeededPicker {
    rng: Mutex<StdRng>,
}

impl SeededPicker {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl ReplyPicker for SeededPicker {
    fn pick(&self, len: usize) -> usize {
        self.rng.lock().gen_range(0..len)
    }
}

/// Maps one utterance to one reply and an exit decision.
///
/// Holds no per-conversation state; callers own their transcripts.
#[derive(Clone)]
pub struct ResponseEngine {
    book: Arc<RuleBook>,
    clock: Arc<dyn Clock>,
    picker: Arc<dyn ReplyPicker>,
}

impl ResponseEngine {
    pub fn new(book: RuleBook) -> Self {
        Self::with_seams(book, Arc::new(SystemClock), Arc::new(ThreadRngPicker))
    }

    pub fn with_seams(
        book: RuleBook,
        clock: Arc<dyn Clock>,
        picker: Arc<dyn ReplyPicker>,
    ) -> Self {
        Self {
            book: Arc::new(book),
            clock,
            picker,
        }
    }

    pub fn rule_book(&self) -> &RuleBook {
        &self.book
    }

    pub fn classify(&self, utterance: &str) -> ClassificationResult {
        let trimmed = utterance.trim();

        let (reply_text, rule_exit, source) = if let Some(reply) = arithmetic::evaluate(trimmed) {
            (reply, false, ReplySource::Arithmetic)
        } else if let Some(rule) = self.book.first_match(trimmed) {
            let template = self.choose(rule.responses());
            (
                self.render(template),
                rule.exits(),
                ReplySource::Rule {
                    name: rule.name().to_string(),
                },
            )
        } else {
            let template = self.choose(self.book.fallback());
            (self.render(template), false, ReplySource::Fallback)
        };

        // Runs regardless of which stage produced the reply.
        let keyword_exit = self.book.has_exit_keyword(trimmed);

        ClassificationResult {
            reply_text,
            should_exit: rule_exit || keyword_exit,
            source,
        }
    }

    fn choose<'a>(&self, candidates: &'a [String]) -> &'a str {
        let idx = self.picker.pick(candidates.len()).min(candidates.len() - 1);
        candidates[idx].as_str()
    }

    fn render(&self, template: &str) -> String {
        if !template.contains('{') {
            return template.to_string();
        }

        let now = self.clock.now();
        template
            .replace("{time}", &now.format(TIME_FORMAT).to_string())
            .replace("{date}", &now.format(DATE_FORMAT).to_string())
    }
}

impl Default for ResponseEngine {
    fn default() -> Self {
        Self::new(RuleBook::builtin())
    }
}
