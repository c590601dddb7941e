use crate::error::StoreError;
use crate::execution::{Execution, ExecutionId, ExecutionStatus, StepExecution};
use crate::workflow::{TemplateId, Workflow, WorkflowId, WorkflowTemplate};
use async_trait::async_trait;

/// Filter for listing workflows
#[derive(Debug, Clone, Default)]
pub struct WorkflowFilter {
    pub enabled_only: bool,
    pub skip: usize,
    pub limit: Option<usize>,
}

/// Filter for listing executions
#[derive(Debug, Clone, Default)]
pub struct ExecutionFilter {
    pub workflow_id: Option<WorkflowId>,
    pub status: Option<ExecutionStatus>,
    pub skip: usize,
    pub limit: Option<usize>,
}

/// Filter for listing templates
#[derive(Debug, Clone, Default)]
pub struct TemplateFilter {
    pub category: Option<String>,
    pub public_only: bool,
    pub skip: usize,
    pub limit: Option<usize>,
}

/// Storage contract for workflow, execution and template records.
///
/// Any backend exposing create/get/list/update over these shapes satisfies
/// the engine; the engine relies only on single-row update atomicity.
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    async fn create_workflow(&self, workflow: &Workflow) -> Result<(), StoreError>;
    async fn get_workflow(&self, id: WorkflowId) -> Result<Option<Workflow>, StoreError>;
    async fn list_workflows(&self, filter: WorkflowFilter) -> Result<Vec<Workflow>, StoreError>;
    async fn update_workflow(&self, workflow: &Workflow) -> Result<(), StoreError>;
    /// Returns false when no workflow with the given id existed.
    async fn delete_workflow(&self, id: WorkflowId) -> Result<bool, StoreError>;

    async fn create_execution(&self, execution: &Execution) -> Result<(), StoreError>;
    async fn get_execution(&self, id: ExecutionId) -> Result<Option<Execution>, StoreError>;
    async fn list_executions(&self, filter: ExecutionFilter)
        -> Result<Vec<Execution>, StoreError>;
    async fn update_execution(&self, execution: &Execution) -> Result<(), StoreError>;

    async fn create_step_execution(&self, step: &StepExecution) -> Result<(), StoreError>;
    async fn update_step_execution(&self, step: &StepExecution) -> Result<(), StoreError>;
    /// Step rows for an execution, ordered by step index.
    async fn list_step_executions(
        &self,
        execution_id: ExecutionId,
    ) -> Result<Vec<StepExecution>, StoreError>;

    async fn create_template(&self, template: &WorkflowTemplate) -> Result<(), StoreError>;
    async fn get_template(&self, id: TemplateId)
        -> Result<Option<WorkflowTemplate>, StoreError>;
    async fn list_templates(
        &self,
        filter: TemplateFilter,
    ) -> Result<Vec<WorkflowTemplate>, StoreError>;
    async fn update_template(&self, template: &WorkflowTemplate) -> Result<(), StoreError>;
}
