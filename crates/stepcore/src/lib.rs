//! Core abstractions for the stepflow engine
//!
//! This crate provides the fundamental types and traits that all other
//! components depend on: the workflow/execution data model, the action
//! contract, the storage contract, and the error taxonomy.

mod action;
mod error;
mod execution;
mod store;
mod workflow;

pub use action::{Action, Context, Parameters};
pub use error::{ActionError, DefinitionError, EngineError, StoreError};
pub use execution::{
    Execution, ExecutionId, ExecutionStatus, StepExecution, StepExecutionId, StepStatus,
};
pub use store::{ExecutionFilter, TemplateFilter, WorkflowFilter, WorkflowStore};
pub use workflow::{StepDef, TemplateId, Workflow, WorkflowId, WorkflowTemplate};

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
