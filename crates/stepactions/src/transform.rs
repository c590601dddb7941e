use async_trait::async_trait;
use serde_json::{Map, Value};
use stepcore::{Action, ActionError, Context, Parameters};
use stepruntime::{condition, ActionFactory};

/// Reshape context data without calling out anywhere
///
/// The `operations` parameter is a sequence of objects, each with a `type`
/// (`extract`, `filter`, `map`, `combine`), a `source` variable to read
/// from the context, and a `target` name for the produced value. The result
/// is the map of all produced targets.
pub struct DataTransformAction;

#[async_trait]
impl Action for DataTransformAction {
    fn action_type(&self) -> &str {
        "data_transform"
    }

    fn validate(&self, parameters: &Parameters) -> Result<(), ActionError> {
        match parameters.get("operations") {
            None => Err(ActionError::MissingParameter("operations".to_string())),
            Some(Value::Array(_)) => Ok(()),
            Some(_) => Err(ActionError::InvalidParameter {
                field: "operations".to_string(),
                reason: "expected a sequence of operations".to_string(),
            }),
        }
    }

    async fn execute(&self, parameters: &Parameters, context: &Context) -> Result<Value, ActionError> {
        let operations = parameters
            .get("operations")
            .and_then(Value::as_array)
            .ok_or_else(|| ActionError::MissingParameter("operations".to_string()))?;

        tracing::info!("executing {} data transformations", operations.len());

        let mut result = Map::new();
        for op in operations {
            let op_type = op.get("type").and_then(Value::as_str).unwrap_or("");
            let source = op.get("source").and_then(Value::as_str).unwrap_or("");
            let Some(target) = op.get("target").and_then(Value::as_str) else {
                continue;
            };

            let value = match op_type {
                "extract" => {
                    let path = op.get("path").and_then(Value::as_str).unwrap_or("");
                    extract(context.get(source), path)
                }
                "filter" => {
                    let condition = op.get("condition").and_then(Value::as_str).unwrap_or("");
                    filter(context.get(source), condition)
                }
                "map" => {
                    let field = op.get("field").and_then(Value::as_str);
                    map_field(context.get(source), field)
                }
                "combine" => {
                    let sources = op.get("sources").and_then(Value::as_array);
                    combine(context, sources)
                }
                other => {
                    tracing::warn!("unknown transform operation: {}", other);
                    continue;
                }
            };
            result.insert(target.to_string(), value);
        }

        Ok(Value::Object(result))
    }
}

/// Follow a dotted path into the source value; any miss yields null.
fn extract(source: Option<&Value>, path: &str) -> Value {
    let Some(mut current) = source else {
        return Value::Null;
    };
    for part in path.split('.').filter(|p| !p.is_empty()) {
        let next = match current {
            Value::Object(map) => map.get(part),
            Value::Array(items) => part.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        };
        match next {
            Some(value) => current = value,
            None => return Value::Null,
        }
    }
    current.clone()
}

/// Keep sequence items whose fields satisfy the condition. A blank
/// condition keeps everything; non-object items never match one.
fn filter(source: Option<&Value>, condition: &str) -> Value {
    let items = source.and_then(Value::as_array).cloned().unwrap_or_default();
    if condition.trim().is_empty() {
        return Value::Array(items);
    }

    let kept = items
        .into_iter()
        .filter(|item| {
            let fields: Context = match item {
                Value::Object(map) => map.clone().into_iter().collect(),
                _ => Context::new(),
            };
            condition::should_run(Some(condition), &fields)
        })
        .collect();
    Value::Array(kept)
}

/// Project a field out of each sequence item; non-object items pass through.
fn map_field(source: Option<&Value>, field: Option<&str>) -> Value {
    let items = source.and_then(Value::as_array).cloned().unwrap_or_default();
    let mapped = items
        .into_iter()
        .map(|item| match (&item, field) {
            (Value::Object(map), Some(field)) => map.get(field).cloned().unwrap_or(Value::Null),
            _ => item,
        })
        .collect();
    Value::Array(mapped)
}

/// Merge the named context sources that are objects into one object.
fn combine(context: &Context, sources: Option<&Vec<Value>>) -> Value {
    let mut combined = Map::new();
    if let Some(sources) = sources {
        for name in sources.iter().filter_map(Value::as_str) {
            if let Some(Value::Object(map)) = context.get(name) {
                combined.extend(map.clone());
            }
        }
    }
    Value::Object(combined)
}

pub struct DataTransformFactory;

impl ActionFactory for DataTransformFactory {
    fn create(&self) -> Box<dyn Action> {
        Box::new(DataTransformAction)
    }

    fn action_type(&self) -> &str {
        "data_transform"
    }

    fn description(&self) -> String {
        "Extract, filter, map and combine context data".to_string()
    }
}
