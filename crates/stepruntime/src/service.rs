use crate::executor::WorkflowExecutor;
use crate::registry::ActionRegistry;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use stepcore::{
    DefinitionError, EngineError, Execution, ExecutionFilter, ExecutionId, Result, StepDef,
    StepExecution, TemplateFilter, TemplateId, Workflow, WorkflowFilter, WorkflowId,
    WorkflowStore, WorkflowTemplate,
};

/// Request to create a workflow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewWorkflow {
    pub name: String,
    pub description: Option<String>,
    pub steps: Vec<StepDef>,
    #[serde(default)]
    pub variables: HashMap<String, Value>,
    pub created_by: Option<String>,
    pub template_id: Option<TemplateId>,
}

/// Partial update to a workflow; absent fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub steps: Option<Vec<StepDef>>,
    pub variables: Option<HashMap<String, Value>>,
    pub enabled: Option<bool>,
}

/// Request to create a workflow template
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTemplate {
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub steps: Vec<StepDef>,
    #[serde(default)]
    pub default_variables: HashMap<String, Value>,
    #[serde(default)]
    pub required_variables: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub author: Option<String>,
    #[serde(default)]
    pub is_public: bool,
}

/// An execution together with its per-step records
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionDetail {
    pub execution: Execution,
    pub steps: Vec<StepExecution>,
}

/// Service for managing workflows, templates and execution history.
///
/// Owns workflow and template lifecycles; run lifecycle is delegated
/// entirely to the executor.
pub struct WorkflowService {
    store: Arc<dyn WorkflowStore>,
    registry: Arc<ActionRegistry>,
    executor: WorkflowExecutor,
}

impl WorkflowService {
    pub fn new(store: Arc<dyn WorkflowStore>, registry: Arc<ActionRegistry>) -> Self {
        let executor = WorkflowExecutor::new(store.clone(), registry.clone());
        Self {
            store,
            registry,
            executor,
        }
    }

    // Workflow CRUD

    pub async fn create_workflow(&self, new: NewWorkflow) -> Result<Workflow> {
        self.validate_steps(&new.steps)?;

        let mut workflow = Workflow::new(new.name, new.steps);
        workflow.description = new.description;
        workflow.variables = new.variables;
        workflow.created_by = new.created_by;
        workflow.template_id = new.template_id;

        self.store.create_workflow(&workflow).await?;
        tracing::info!(workflow = %workflow.id, name = %workflow.name, "created workflow");
        Ok(workflow)
    }

    pub async fn get_workflow(&self, id: WorkflowId) -> Result<Workflow> {
        self.store
            .get_workflow(id)
            .await?
            .ok_or(EngineError::WorkflowNotFound(id))
    }

    pub async fn list_workflows(&self, filter: WorkflowFilter) -> Result<Vec<Workflow>> {
        Ok(self.store.list_workflows(filter).await?)
    }

    pub async fn update_workflow(
        &self,
        id: WorkflowId,
        update: WorkflowUpdate,
    ) -> Result<Workflow> {
        let mut workflow = self.get_workflow(id).await?;
        let mut bump_version = false;

        if let Some(name) = update.name {
            workflow.name = name;
        }
        if let Some(description) = update.description {
            workflow.description = Some(description);
        }
        if let Some(steps) = update.steps {
            self.validate_steps(&steps)?;
            workflow.steps = steps;
            bump_version = true;
        }
        if let Some(variables) = update.variables {
            workflow.variables = variables;
            bump_version = true;
        }
        if let Some(enabled) = update.enabled {
            workflow.enabled = enabled;
        }

        if bump_version {
            workflow.version += 1;
        }
        workflow.updated_at = chrono::Utc::now();

        self.store.update_workflow(&workflow).await?;
        tracing::info!(workflow = %id, version = workflow.version, "updated workflow");
        Ok(workflow)
    }

    pub async fn delete_workflow(&self, id: WorkflowId) -> Result<()> {
        if !self.store.delete_workflow(id).await? {
            return Err(EngineError::WorkflowNotFound(id));
        }
        tracing::info!(workflow = %id, "deleted workflow");
        Ok(())
    }

    // Execution

    pub async fn execute_workflow(
        &self,
        id: WorkflowId,
        input_data: HashMap<String, Value>,
    ) -> Result<Execution> {
        self.executor.execute(id, input_data).await
    }

    pub async fn get_execution(&self, id: ExecutionId) -> Result<ExecutionDetail> {
        let execution = self
            .store
            .get_execution(id)
            .await?
            .ok_or(EngineError::ExecutionNotFound(id))?;
        let steps = self.store.list_step_executions(id).await?;
        Ok(ExecutionDetail { execution, steps })
    }

    pub async fn list_executions(&self, filter: ExecutionFilter) -> Result<Vec<Execution>> {
        Ok(self.store.list_executions(filter).await?)
    }

    pub async fn cancel_execution(&self, id: ExecutionId) -> Result<()> {
        self.executor.cancel(id).await
    }

    // Templates

    pub async fn create_template(&self, new: NewTemplate) -> Result<WorkflowTemplate> {
        self.validate_steps(&new.steps)?;

        let mut template = WorkflowTemplate::new(new.name, new.steps);
        template.description = new.description;
        template.category = new.category;
        template.default_variables = new.default_variables;
        template.required_variables = new.required_variables;
        template.tags = new.tags;
        template.author = new.author;
        template.is_public = new.is_public;

        self.store.create_template(&template).await?;
        tracing::info!(template = %template.id, name = %template.name, "created template");
        Ok(template)
    }

    pub async fn get_template(&self, id: TemplateId) -> Result<WorkflowTemplate> {
        self.store
            .get_template(id)
            .await?
            .ok_or(EngineError::TemplateNotFound(id))
    }

    pub async fn list_templates(&self, filter: TemplateFilter) -> Result<Vec<WorkflowTemplate>> {
        Ok(self.store.list_templates(filter).await?)
    }

    /// Create a workflow from a template: template defaults overlaid by the
    /// caller's variables, usage counter incremented.
    pub async fn instantiate_template(
        &self,
        template_id: TemplateId,
        name: impl Into<String>,
        variables: HashMap<String, Value>,
        created_by: Option<String>,
    ) -> Result<Workflow> {
        let mut template = self.get_template(template_id).await?;

        let mut merged = template.default_variables.clone();
        merged.extend(variables);

        let workflow = self
            .create_workflow(NewWorkflow {
                name: name.into(),
                description: template.description.clone(),
                steps: template.steps.clone(),
                variables: merged,
                created_by,
                template_id: Some(template_id),
            })
            .await?;

        template.usage_count += 1;
        self.store.update_template(&template).await?;

        tracing::info!(
            workflow = %workflow.id,
            template = %template_id,
            "created workflow from template"
        );
        Ok(workflow)
    }

    // Discovery

    pub fn list_actions(&self) -> HashMap<String, String> {
        self.registry.list_actions()
    }

    /// Definition-time validation: a workflow with zero steps, an
    /// unregistered action type, or parameters an action rejects is invalid
    /// before anything persists.
    pub fn validate_steps(&self, steps: &[StepDef]) -> std::result::Result<(), DefinitionError> {
        if steps.is_empty() {
            return Err(DefinitionError::EmptySteps);
        }
        for (index, step) in steps.iter().enumerate() {
            let action = self.registry.resolve(&step.action).ok_or_else(|| {
                DefinitionError::UnknownAction {
                    index,
                    action: step.action.clone(),
                }
            })?;
            action
                .validate(&step.parameters)
                .map_err(|source| DefinitionError::InvalidParameters { index, source })?;
        }
        Ok(())
    }
}
