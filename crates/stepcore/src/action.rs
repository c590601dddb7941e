use crate::error::ActionError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

/// Variables visible to a step at execution time
pub type Context = HashMap<String, Value>;

/// Action parameter block
pub type Parameters = HashMap<String, Value>;

/// Core trait that all workflow actions implement
///
/// Instances are constructed fresh per invocation through an
/// `ActionFactory` and must not retain state across calls.
#[async_trait]
pub trait Action: Send + Sync {
    /// Unique type identifier (e.g. "http_request", "data_transform")
    fn action_type(&self) -> &str;

    /// Validate the parameter block, naming the missing or malformed field.
    ///
    /// Called at workflow-definition time, so malformed workflows are
    /// rejected before any run exists, and again immediately before each
    /// execution attempt.
    fn validate(&self, _parameters: &Parameters) -> Result<(), ActionError> {
        Ok(())
    }

    /// Execute the action. `parameters` arrive with `{{...}}` placeholders
    /// already resolved against `context`. The result becomes the value
    /// bound to the step's output variable.
    async fn execute(&self, parameters: &Parameters, context: &Context)
        -> Result<Value, ActionError>;
}
