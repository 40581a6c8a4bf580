pub mod arithmetic;
pub mod engine;
pub mod error;
pub mod models;
pub mod rules;

pub use arithmetic::DIVIDE_BY_ZERO_REPLY;
pub use engine::{
    Clock, FixedClock, ReplyPicker, ResponseEngine, SeededPicker, SystemClock, ThreadRngPicker,
};
pub use error::RuleBookError;
pub use models::*;
pub use rules::{Rule, RuleBook, RuleBookSpec, RuleSpec};
