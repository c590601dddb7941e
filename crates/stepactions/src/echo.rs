use async_trait::async_trait;
use serde_json::Value;
use stepcore::{Action, ActionError, Context, Parameters};
use stepruntime::ActionFactory;

/// Returns its `value` parameter unchanged
///
/// The smallest useful action: handy for binding literals or resolved
/// placeholders into the context, and for exercising workflows end to end.
pub struct EchoAction;

#[async_trait]
impl Action for EchoAction {
    fn action_type(&self) -> &str {
        "echo"
    }

    fn validate(&self, parameters: &Parameters) -> Result<(), ActionError> {
        if !parameters.contains_key("value") {
            return Err(ActionError::MissingParameter("value".to_string()));
        }
        Ok(())
    }

    async fn execute(&self, parameters: &Parameters, _context: &Context) -> Result<Value, ActionError> {
        Ok(parameters.get("value").cloned().unwrap_or(Value::Null))
    }
}

pub struct EchoFactory;

impl ActionFactory for EchoFactory {
    fn create(&self) -> Box<dyn Action> {
        Box::new(EchoAction)
    }

    fn action_type(&self) -> &str {
        "echo"
    }

    fn description(&self) -> String {
        "Return the value parameter".to_string()
    }
}
