use num_bigint::BigInt;
use num_traits::{ToPrimitive, Zero};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

pub const DIVIDE_BY_ZERO_REPLY: &str = "I can't divide by zero! That would break the universe!";

const FRACTION_DIGITS: u32 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Operator {
    /// Evaluation order when an utterance contains more than one operator.
    pub const PRIORITY: [Operator; 4] = [
        Operator::Add,
        Operator::Subtract,
        Operator::Multiply,
        Operator::Divide,
    ];

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "×",
            Self::Divide => "÷",
        }
    }

    fn pattern(self) -> &'static Regex {
        match self {
            Self::Add => &ADD,
            Self::Subtract => &SUBTRACT,
            Self::Multiply => &MULTIPLY,
            Self::Divide => &DIVIDE,
        }
    }
}

static ADD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([0-9]+)\s*\+\s*([0-9]+)").expect("valid addition regex"));
static SUBTRACT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([0-9]+)\s*-\s*([0-9]+)").expect("valid subtraction regex"));
static MULTIPLY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([0-9]+)\s*[*x×]\s*([0-9]+)").expect("valid multiplication regex"));
static DIVIDE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([0-9]+)\s*[/÷]\s*([0-9]+)").expect("valid division regex"));

/// Finds the first arithmetic expression by operator priority and renders its reply.
///
/// Returns `None` only when no operator pattern matches. Operands of any length
/// are computed exactly.
pub fn evaluate(utterance: &str) -> Option<String> {
    Operator::PRIORITY.into_iter().find_map(|operator| {
        operator
            .pattern()
            .captures(utterance)
            .map(|captures| compute(operator, &captures))
    })
}

fn compute(operator: Operator, captures: &Captures<'_>) -> String {
    let lhs_text = &captures[1];
    let rhs_text = &captures[2];
    let lhs = parse_operand(lhs_text);
    let rhs = parse_operand(rhs_text);

    let result = match operator {
        Operator::Add => (&lhs + &rhs).to_string(),
        Operator::Subtract => (&lhs - &rhs).to_string(),
        Operator::Multiply => (&lhs * &rhs).to_string(),
        Operator::Divide => {
            if rhs.is_zero() {
                return DIVIDE_BY_ZERO_REPLY.to_string();
            }
            format_quotient(&lhs, &rhs)
        }
    };

    format!("{lhs_text} {} {rhs_text} = {result}", operator.symbol())
}

fn parse_operand(digits: &str) -> BigInt {
    // Captures are `[0-9]+`, which always parse.
    BigInt::parse_bytes(digits.as_bytes(), 10).unwrap_or_default()
}

fn format_quotient(lhs: &BigInt, rhs: &BigInt) -> String {
    if (lhs % rhs).is_zero() {
        return (lhs / rhs).to_string();
    }

    match (lhs.to_f64(), rhs.to_f64()) {
        (Some(l), Some(r)) if l.is_finite() && r.is_finite() => (l / r).to_string(),
        _ => scaled_quotient(lhs, rhs),
    }
}

/// Decimal quotient for operands beyond `f64` range, truncated to
/// `FRACTION_DIGITS` places.
fn scaled_quotient(lhs: &BigInt, rhs: &BigInt) -> String {
    let scaled = (lhs * BigInt::from(10_u64.pow(FRACTION_DIGITS))) / rhs;
    let width = FRACTION_DIGITS as usize + 1;
    let digits = format!("{:0>width$}", scaled.to_string());
    let (whole, fraction) = digits.split_at(digits.len() - FRACTION_DIGITS as usize);
    let fraction = fraction.trim_end_matches('0');

    if fraction.is_empty() {
        whole.to_string()
    } else {
        format!("{whole}.{fraction}")
    }
}
