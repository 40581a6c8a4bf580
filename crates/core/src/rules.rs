use std::collections::HashSet;
use std::fs;
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::RuleBookError;

/// Serialized form of a single rule, as stored in a rule book file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub name: String,
    pub keywords: Vec<String>,
    pub responses: Vec<String>,
    #[serde(default)]
    pub exits: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleBookSpec {
    pub rules: Vec<RuleSpec>,
    pub fallback: Vec<String>,
    pub exit_keywords: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Rule {
    name: String,
    keywords: Vec<String>,
    matcher: Regex,
    responses: Vec<String>,
    exits: bool,
}

impl Rule {
    pub fn compile(spec: RuleSpec) -> Result<Self, RuleBookError> {
        if spec.responses.is_empty() {
            return Err(RuleBookError::EmptyResponses { rule: spec.name });
        }
        if spec.keywords.is_empty() {
            return Err(RuleBookError::EmptyKeywords { rule: spec.name });
        }
        if spec.keywords.iter().any(|keyword| keyword.trim().is_empty()) {
            return Err(RuleBookError::BlankKeyword { rule: spec.name });
        }

        let alternation = spec
            .keywords
            .iter()
            .map(|keyword| regex::escape(keyword.trim()))
            .collect::<Vec<_>>()
            .join("|");
        let matcher = Regex::new(&format!(r"(?i)\b(?:{alternation})\b")).map_err(|source| {
            RuleBookError::Matcher {
                rule: spec.name.clone(),
                source,
            }
        })?;

        Ok(Self {
            name: spec.name,
            keywords: spec.keywords,
            matcher,
            responses: spec.responses,
            exits: spec.exits,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// Never empty.
    pub fn responses(&self) -> &[String] {
        &self.responses
    }

    pub fn exits(&self) -> bool {
        self.exits
    }

    pub fn matches(&self, utterance: &str) -> bool {
        self.matcher.is_match(utterance)
    }

    fn to_spec(&self) -> RuleSpec {
        RuleSpec {
            name: self.name.clone(),
            keywords: self.keywords.clone(),
            responses: self.responses.clone(),
            exits: self.exits,
        }
    }
}

/// The ordered rule table plus fallback replies and exit keywords.
///
/// Fixed once built: the engine only ever reads it.
#[derive(Debug, Clone)]
pub struct RuleBook {
    rules: Vec<Rule>,
    fallback: Vec<String>,
    exit_keywords: Vec<String>,
}

impl RuleBook {
    pub fn builtin() -> Self {
        Self::from_spec(builtin_spec()).expect("built-in rule book is valid")
    }

    pub fn from_spec(spec: RuleBookSpec) -> Result<Self, RuleBookError> {
        if spec.fallback.is_empty() {
            return Err(RuleBookError::EmptyFallback);
        }
        if spec.exit_keywords.is_empty() {
            return Err(RuleBookError::EmptyExitKeywords);
        }
        if spec.exit_keywords.iter().any(|keyword| keyword.trim().is_empty()) {
            return Err(RuleBookError::BlankExitKeyword);
        }

        let mut seen = HashSet::new();
        let mut rules = Vec::with_capacity(spec.rules.len());
        for rule in spec.rules {
            if !seen.insert(rule.name.clone()) {
                return Err(RuleBookError::DuplicateRule { rule: rule.name });
            }
            rules.push(Rule::compile(rule)?);
        }

        Ok(Self {
            rules,
            fallback: spec.fallback,
            exit_keywords: spec
                .exit_keywords
                .into_iter()
                .map(|keyword| keyword.trim().to_lowercase())
                .collect(),
        })
    }

    pub fn from_json(raw: &str) -> Result<Self, RuleBookError> {
        let spec: RuleBookSpec = serde_json::from_str(raw)?;
        Self::from_spec(spec)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, RuleBookError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| RuleBookError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn to_spec(&self) -> RuleBookSpec {
        RuleBookSpec {
            rules: self.rules.iter().map(Rule::to_spec).collect(),
            fallback: self.fallback.clone(),
            exit_keywords: self.exit_keywords.clone(),
        }
    }

    pub fn to_json_pretty(&self) -> Result<String, RuleBookError> {
        Ok(serde_json::to_string_pretty(&self.to_spec())?)
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn rule(&self, name: &str) -> Option<&Rule> {
        self.rules.iter().find(|rule| rule.name == name)
    }

    /// First rule whose matcher hits, in table order.
    pub fn first_match(&self, utterance: &str) -> Option<&Rule> {
        self.rules.iter().find(|rule| rule.matches(utterance))
    }

    pub fn fallback(&self) -> &[String] {
        &self.fallback
    }

    pub fn exit_keywords(&self) -> &[String] {
        &self.exit_keywords
    }

    pub fn has_exit_keyword(&self, utterance: &str) -> bool {
        let lower = utterance.to_lowercase();
        self.exit_keywords
            .iter()
            .any(|keyword| lower.contains(keyword.as_str()))
    }
}

impl Default for RuleBook {
    fn default() -> Self {
        Self::builtin()
    }
}

fn rule(name: &str, keywords: &[&str], responses: &[&str], exits: bool) -> RuleSpec {
    RuleSpec {
        name: name.to_string(),
        keywords: keywords.iter().map(|value| value.to_string()).collect(),
        responses: responses.iter().map(|value| value.to_string()).collect(),
        exits,
    }
}

pub fn builtin_spec() -> RuleBookSpec {
    RuleBookSpec {
        rules: vec![
            rule(
                "greeting",
                &[
                    "hello",
                    "hi",
                    "hey",
                    "greetings",
                    "good morning",
                    "good afternoon",
                    "good evening",
                ],
                &[
                    "Hello! How can I help you today?",
                    "Hi there! What's on your mind?",
                    "Hey! Nice to meet you. What would you like to talk about?",
                    "Greetings! I'm here to chat. What can I do for you?",
                ],
                false,
            ),
            rule(
                "farewell",
                &["bye", "goodbye", "see you", "farewell", "take care", "later"],
                &[
                    "Goodbye! It was nice chatting with you.",
                    "See you later! Have a great day!",
                    "Take care! Feel free to come back anytime.",
                    "Farewell! Thanks for the conversation.",
                ],
                true,
            ),
            rule(
                "how_are_you",
                &["how are you", "how do you feel", "what's up", "how's it going"],
                &[
                    "I'm doing great! Thanks for asking. How are you?",
                    "I'm fantastic! Ready to help you with anything you need.",
                    "I'm doing well! What about you?",
                    "All systems running smoothly! How can I assist you today?",
                ],
                false,
            ),
            rule(
                "name_query",
                &["what's your name", "who are you", "what are you called"],
                &[
                    "I'm a simple chatbot created to demonstrate basic conversation patterns!",
                    "You can call me ChatBot. I'm here to chat and help with simple questions.",
                    "I'm your friendly neighborhood chatbot! What should I call you?",
                ],
                false,
            ),
            rule(
                "weather",
                &[
                    "weather",
                    "rain",
                    "sunny",
                    "cloudy",
                    "temperature",
                    "hot",
                    "cold",
                    "snow",
                ],
                &[
                    "I wish I could check the weather for you! Try looking outside or checking a weather app.",
                    "I don't have access to real weather data, but I hope it's nice where you are!",
                    "Weather is always a great conversation starter! What's it like where you are?",
                ],
                false,
            ),
            rule(
                "time_date",
                &["time", "clock", "what time", "when", "date", "today"],
                &[
                    "The current time is {time}",
                    "Today is {date}. The time is {time}",
                    "Time flies when you're having a good conversation!",
                ],
                false,
            ),
            rule(
                "math_topic",
                &["calculate", "math", "plus", "minus", "multiply", "divide"],
                &[
                    "I can do simple math! Try asking me something like '5 + 3' or 'what is 10 times 2?'",
                    "Math is fun! Give me a simple calculation and I'll try to help.",
                    "I love numbers! What would you like me to calculate?",
                ],
                false,
            ),
            rule(
                "compliment",
                &[
                    "good", "great", "awesome", "amazing", "nice", "cool", "smart", "helpful",
                ],
                &[
                    "Thank you! That's very kind of you to say.",
                    "I appreciate the compliment! You're pretty great yourself.",
                    "Aww, thanks! I try my best to be helpful.",
                    "You're making me blush! Well, if I could blush...",
                ],
                false,
            ),
            rule(
                "capabilities",
                &["what can you do", "help", "capabilities", "features"],
                &[
                    "I can chat with you, answer simple questions, do basic math, and respond to common conversation topics!",
                    "I'm a simple chatbot that can have basic conversations. Try asking about weather, time, or just chat!",
                    "I can respond to greetings, answer questions, do simple calculations, and have friendly conversations!",
                ],
                false,
            ),
            rule(
                "thanks",
                &["thank you", "thanks", "appreciate"],
                &[
                    "You're welcome! Happy to help.",
                    "No problem at all! Glad I could assist.",
                    "My pleasure! Feel free to ask anything else.",
                    "Anytime! That's what I'm here for.",
                ],
                false,
            ),
        ],
        fallback: vec![
            "That's interesting! Tell me more about that.".to_string(),
            "I'm not sure I understand completely, but I'm here to listen!".to_string(),
            "Could you rephrase that? I'd love to help if I can.".to_string(),
            "That's a great point! What else would you like to talk about?".to_string(),
            "I'm still learning! Can you ask me something else?".to_string(),
            "Hmm, that's beyond my current knowledge. Try asking about the weather, time, or math!"
                .to_string(),
        ],
        exit_keywords: ["bye", "goodbye", "quit", "exit", "see you", "farewell"]
            .iter()
            .map(|value| value.to_string())
            .collect(),
    }
}
