use async_trait::async_trait;
use serde_json::{json, Value};
use stepcore::{Action, ActionError, Context, Parameters};
use stepruntime::ActionFactory;
use tokio::time::{sleep, Duration};

/// Delay execution for a specified duration
pub struct DelayAction;

#[async_trait]
impl Action for DelayAction {
    fn action_type(&self) -> &str {
        "delay"
    }

    async fn execute(&self, parameters: &Parameters, _context: &Context) -> Result<Value, ActionError> {
        let delay_ms = parameters
            .get("delay_ms")
            .and_then(Value::as_u64)
            .unwrap_or(1000);

        tracing::info!("delaying for {}ms", delay_ms);
        sleep(Duration::from_millis(delay_ms)).await;

        Ok(json!({ "delayed_ms": delay_ms }))
    }
}

pub struct DelayFactory;

impl ActionFactory for DelayFactory {
    fn create(&self) -> Box<dyn Action> {
        Box::new(DelayAction)
    }

    fn action_type(&self) -> &str {
        "delay"
    }

    fn description(&self) -> String {
        "Delay execution for delay_ms milliseconds".to_string()
    }
}
