use async_trait::async_trait;
use std::collections::HashMap;
use stepcore::{
    Execution, ExecutionFilter, ExecutionId, StepExecution, StepExecutionId, StoreError,
    TemplateFilter, TemplateId, Workflow, WorkflowFilter, WorkflowId, WorkflowStore,
    WorkflowTemplate,
};
use tokio::sync::RwLock;

/// In-memory store backed by `RwLock`ed tables.
///
/// Suitable for tests, the CLI and single-process server deployments; a
/// database-backed implementation only needs to satisfy `WorkflowStore`.
#[derive(Default)]
pub struct MemoryStore {
    workflows: RwLock<HashMap<WorkflowId, Workflow>>,
    executions: RwLock<HashMap<ExecutionId, Execution>>,
    step_executions: RwLock<HashMap<StepExecutionId, StepExecution>>,
    templates: RwLock<HashMap<TemplateId, WorkflowTemplate>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn paginate<T>(mut items: Vec<T>, skip: usize, limit: Option<usize>) -> Vec<T> {
    if skip > 0 {
        items = items.into_iter().skip(skip).collect();
    }
    if let Some(limit) = limit {
        items.truncate(limit);
    }
    items
}

#[async_trait]
impl WorkflowStore for MemoryStore {
    async fn create_workflow(&self, workflow: &Workflow) -> Result<(), StoreError> {
        self.workflows
            .write()
            .await
            .insert(workflow.id, workflow.clone());
        Ok(())
    }

    async fn get_workflow(&self, id: WorkflowId) -> Result<Option<Workflow>, StoreError> {
        Ok(self.workflows.read().await.get(&id).cloned())
    }

    async fn list_workflows(&self, filter: WorkflowFilter) -> Result<Vec<Workflow>, StoreError> {
        let mut workflows: Vec<Workflow> = self
            .workflows
            .read()
            .await
            .values()
            .filter(|w| !filter.enabled_only || w.enabled)
            .cloned()
            .collect();
        workflows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(paginate(workflows, filter.skip, filter.limit))
    }

    async fn update_workflow(&self, workflow: &Workflow) -> Result<(), StoreError> {
        let mut workflows = self.workflows.write().await;
        if !workflows.contains_key(&workflow.id) {
            return Err(StoreError::NotFound(format!("workflow {}", workflow.id)));
        }
        workflows.insert(workflow.id, workflow.clone());
        Ok(())
    }

    async fn delete_workflow(&self, id: WorkflowId) -> Result<bool, StoreError> {
        Ok(self.workflows.write().await.remove(&id).is_some())
    }

    async fn create_execution(&self, execution: &Execution) -> Result<(), StoreError> {
        self.executions
            .write()
            .await
            .insert(execution.id, execution.clone());
        Ok(())
    }

    async fn get_execution(&self, id: ExecutionId) -> Result<Option<Execution>, StoreError> {
        Ok(self.executions.read().await.get(&id).cloned())
    }

    async fn list_executions(
        &self,
        filter: ExecutionFilter,
    ) -> Result<Vec<Execution>, StoreError> {
        let mut executions: Vec<Execution> = self
            .executions
            .read()
            .await
            .values()
            .filter(|e| filter.workflow_id.map_or(true, |id| e.workflow_id == id))
            .filter(|e| filter.status.map_or(true, |status| e.status == status))
            .cloned()
            .collect();
        executions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(paginate(executions, filter.skip, filter.limit))
    }

    async fn update_execution(&self, execution: &Execution) -> Result<(), StoreError> {
        let mut executions = self.executions.write().await;
        if !executions.contains_key(&execution.id) {
            return Err(StoreError::NotFound(format!("execution {}", execution.id)));
        }
        executions.insert(execution.id, execution.clone());
        Ok(())
    }

    async fn create_step_execution(&self, step: &StepExecution) -> Result<(), StoreError> {
        self.step_executions
            .write()
            .await
            .insert(step.id, step.clone());
        Ok(())
    }

    async fn update_step_execution(&self, step: &StepExecution) -> Result<(), StoreError> {
        let mut steps = self.step_executions.write().await;
        if !steps.contains_key(&step.id) {
            return Err(StoreError::NotFound(format!("step execution {}", step.id)));
        }
        steps.insert(step.id, step.clone());
        Ok(())
    }

    async fn list_step_executions(
        &self,
        execution_id: ExecutionId,
    ) -> Result<Vec<StepExecution>, StoreError> {
        let mut steps: Vec<StepExecution> = self
            .step_executions
            .read()
            .await
            .values()
            .filter(|s| s.execution_id == execution_id)
            .cloned()
            .collect();
        steps.sort_by_key(|s| s.step_index);
        Ok(steps)
    }

    async fn create_template(&self, template: &WorkflowTemplate) -> Result<(), StoreError> {
        self.templates
            .write()
            .await
            .insert(template.id, template.clone());
        Ok(())
    }

    async fn get_template(
        &self,
        id: TemplateId,
    ) -> Result<Option<WorkflowTemplate>, StoreError> {
        Ok(self.templates.read().await.get(&id).cloned())
    }

    async fn list_templates(
        &self,
        filter: TemplateFilter,
    ) -> Result<Vec<WorkflowTemplate>, StoreError> {
        let mut templates: Vec<WorkflowTemplate> = self
            .templates
            .read()
            .await
            .values()
            .filter(|t| !filter.public_only || t.is_public)
            .filter(|t| {
                filter
                    .category
                    .as_deref()
                    .map_or(true, |category| t.category.as_deref() == Some(category))
            })
            .cloned()
            .collect();
        templates.sort_by(|a, b| b.usage_count.cmp(&a.usage_count));
        Ok(paginate(templates, filter.skip, filter.limit))
    }

    async fn update_template(&self, template: &WorkflowTemplate) -> Result<(), StoreError> {
        let mut templates = self.templates.write().await;
        if !templates.contains_key(&template.id) {
            return Err(StoreError::NotFound(format!("template {}", template.id)));
        }
        templates.insert(template.id, template.clone());
        Ok(())
    }
}
