//! Per-step run conditions
//!
//! A deliberately small grammar over context variables: equality and
//! inequality on string form, an existence check, and bare-variable
//! truthiness. Every input string parses to some variant, so evaluation is
//! total and nothing here can raise — the fail-open bias toward running a
//! step is structural.

use serde_json::Value;
use stepcore::Context;

/// Parsed form of a step's run condition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    Equals { variable: String, expected: String },
    NotEquals { variable: String, expected: String },
    Exists { variable: String },
    Truthy { variable: String },
}

impl Condition {
    /// Parse a condition string, in precedence order: `" == "`, `" != "`,
    /// trailing `" exists"`, then bare variable name.
    pub fn parse(input: &str) -> Condition {
        if let Some((variable, expected)) = input.split_once(" == ") {
            return Condition::Equals {
                variable: variable.trim().to_string(),
                expected: strip_quotes(expected.trim()).to_string(),
            };
        }
        if let Some((variable, expected)) = input.split_once(" != ") {
            return Condition::NotEquals {
                variable: variable.trim().to_string(),
                expected: strip_quotes(expected.trim()).to_string(),
            };
        }
        if let Some(variable) = input.strip_suffix(" exists") {
            return Condition::Exists {
                variable: variable.trim().to_string(),
            };
        }
        Condition::Truthy {
            variable: input.trim().to_string(),
        }
    }

    pub fn evaluate(&self, context: &Context) -> bool {
        match self {
            Condition::Equals { variable, expected } => {
                string_form(context.get(variable)) == *expected
            }
            Condition::NotEquals { variable, expected } => {
                string_form(context.get(variable)) != *expected
            }
            Condition::Exists { variable } => {
                context.get(variable).map_or(false, |value| !value.is_null())
            }
            Condition::Truthy { variable } => {
                context.get(variable).map_or(false, is_truthy)
            }
        }
    }
}

/// Decide run/skip for a step. No condition (or a blank one) always runs.
pub fn should_run(condition: Option<&str>, context: &Context) -> bool {
    match condition {
        None => true,
        Some(c) if c.trim().is_empty() => true,
        Some(c) => Condition::parse(c).evaluate(context),
    }
}

/// Comparison is on string form: strings raw, other values as compact JSON,
/// missing variables as "null".
fn string_form(value: Option<&Value>) -> String {
    match value {
        None => "null".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn strip_quotes(s: &str) -> &str {
    s.trim_matches(|c| c == '"' || c == '\'')
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(false, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}
