use crate::execution::{ExecutionId, ExecutionStatus};
use crate::workflow::{TemplateId, WorkflowId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("workflow definition invalid: {0}")]
    Definition(#[from] DefinitionError),

    #[error("workflow {0} not found")]
    WorkflowNotFound(WorkflowId),

    #[error("execution {0} not found")]
    ExecutionNotFound(ExecutionId),

    #[error("template {0} not found")]
    TemplateNotFound(TemplateId),

    #[error("workflow {0} is disabled")]
    Disabled(WorkflowId),

    #[error("cannot cancel execution in status {status}")]
    InvalidStateTransition { status: ExecutionStatus },

    #[error("unknown action type: {0}")]
    UnknownAction(String),

    #[error("step {index} failed: {source}")]
    Step {
        index: usize,
        #[source]
        source: ActionError,
    },

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Rejected at workflow create/update time, before any execution exists
#[derive(Error, Debug)]
pub enum DefinitionError {
    #[error("workflow must have at least one step")]
    EmptySteps,

    #[error("step {index} references unknown action type: {action}")]
    UnknownAction { index: usize, action: String },

    #[error("step {index} parameters invalid: {source}")]
    InvalidParameters {
        index: usize,
        #[source]
        source: ActionError,
    },
}

#[derive(Error, Debug, Clone)]
pub enum ActionError {
    #[error("missing required parameter: {0}")]
    MissingParameter(String),

    #[error("invalid parameter '{field}': {reason}")]
    InvalidParameter { field: String, reason: String },

    #[error("execution failed: {0}")]
    ExecutionFailed(String),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}
