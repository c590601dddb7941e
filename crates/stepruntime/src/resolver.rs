//! Variable substitution over step parameters
//!
//! Replaces `{{path.to.value}}` placeholders inside strings, recursing
//! through maps and sequences. Paths are dotted: map keys and numeric
//! sequence indices. A placeholder whose path is missing, null, or not
//! traversable is left in the output verbatim so downstream actions (or
//! humans) can detect the unresolved binding.

use serde_json::Value;
use stepcore::{Context, Parameters};

/// Resolve placeholders in a whole parameter block against the context.
pub fn resolve_parameters(parameters: &Parameters, context: &Context) -> Parameters {
    parameters
        .iter()
        .map(|(key, value)| (key.clone(), resolve_value(value, context)))
        .collect()
}

/// Resolve placeholders in a single value, recursing into containers.
pub fn resolve_value(value: &Value, context: &Context) -> Value {
    match value {
        Value::String(s) => Value::String(resolve_string(s, context)),
        Value::Array(items) => Value::Array(
            items.iter().map(|item| resolve_value(item, context)).collect(),
        ),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, item)| (key.clone(), resolve_value(item, context)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Substitute every `{{expr}}` occurrence in a string.
///
/// A resolved value is substituted in string form even when the placeholder
/// is the entire string; a value pulled through `{{x}}` always arrives as a
/// string.
pub fn resolve_string(input: &str, context: &Context) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let expr = &after[..end];
                match lookup_path(context, expr.trim()) {
                    Some(value) if !value.is_null() => out.push_str(&render(value)),
                    // Missing or null: keep the token verbatim.
                    _ => {
                        out.push_str("{{");
                        out.push_str(expr);
                        out.push_str("}}");
                    }
                }
                rest = &after[end + 2..];
            }
            // Unterminated placeholder, nothing left to substitute.
            None => {
                out.push_str(&rest[start..]);
                return out;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Walk a dotted path through the context. Any traversal error (indexing a
/// non-container, out-of-range or non-numeric index) is a miss.
fn lookup_path<'a>(context: &'a Context, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut current = context.get(parts.next()?)?;
    for part in parts {
        current = match current {
            Value::Object(map) => map.get(part)?,
            Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// String form of a resolved value: strings render raw, everything else as
/// compact JSON.
fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
