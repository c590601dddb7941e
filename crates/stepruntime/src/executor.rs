use crate::condition;
use crate::registry::ActionRegistry;
use crate::resolver;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use stepcore::{
    Action, ActionError, Context, EngineError, Execution, ExecutionId, ExecutionStatus, Result,
    StepDef, StepExecution, WorkflowId, WorkflowStore,
};

/// Drives one workflow run from `pending` to a terminal state.
///
/// A single execution runs on one task from start to finish; the executor
/// exclusively owns its execution row and step rows for the duration of the
/// run. Distinct executions may run concurrently without coordination.
pub struct WorkflowExecutor {
    store: Arc<dyn WorkflowStore>,
    registry: Arc<ActionRegistry>,
}

impl WorkflowExecutor {
    pub fn new(store: Arc<dyn WorkflowStore>, registry: Arc<ActionRegistry>) -> Self {
        Self { store, registry }
    }

    /// Execute a workflow against the given input.
    ///
    /// Returns once the run reaches a terminal state. Step failures abort
    /// the run, are recorded on the execution and the offending step row,
    /// and are re-signaled to the caller.
    pub async fn execute(
        &self,
        workflow_id: WorkflowId,
        input_data: HashMap<String, Value>,
    ) -> Result<Execution> {
        let workflow = self
            .store
            .get_workflow(workflow_id)
            .await?
            .ok_or(EngineError::WorkflowNotFound(workflow_id))?;

        if !workflow.enabled {
            return Err(EngineError::Disabled(workflow_id));
        }

        let mut execution = Execution::new(workflow_id, input_data.clone());
        self.store.create_execution(&execution).await?;

        tracing::info!(
            execution = %execution.id,
            workflow = %workflow_id,
            "starting workflow execution"
        );

        // Seed the context: workflow defaults first, caller input wins on
        // key collision.
        let mut context: Context = workflow.variables.clone();
        context.extend(input_data);

        execution.mark_running();
        if let Some(cancelled) = self.update_unless_cancelled(&execution).await? {
            return Ok(cancelled);
        }

        for (index, step) in workflow.steps.iter().enumerate() {
            if !condition::should_run(step.condition.as_deref(), &context) {
                tracing::info!(
                    execution = %execution.id,
                    step = index,
                    "skipping step, condition not met"
                );
                let record = StepExecution::skipped(execution.id, index, step);
                self.store.create_step_execution(&record).await?;
                continue;
            }

            match self.run_step(execution.id, index, step, &context).await {
                Ok(output) => {
                    context.insert(step.output_name(index), output);
                    execution.context = context.clone();
                    execution.current_step = index + 1;
                    // Persisting progress doubles as the step-boundary
                    // cancellation check.
                    if let Some(cancelled) = self.update_unless_cancelled(&execution).await? {
                        tracing::info!(
                            execution = %execution.id,
                            "execution cancelled, stopping after step {}",
                            index
                        );
                        return Ok(cancelled);
                    }
                }
                Err(err) => {
                    tracing::error!(
                        execution = %execution.id,
                        step = index,
                        error = %err,
                        "step failed, aborting run"
                    );
                    let message = match &err {
                        EngineError::Step { source, .. } => source.to_string(),
                        other => other.to_string(),
                    };
                    execution.mark_failed(index, message);
                    execution.context = context.clone();
                    self.store.update_execution(&execution).await?;
                    return Err(err);
                }
            }
        }

        execution.mark_completed(context);
        if let Some(cancelled) = self.update_unless_cancelled(&execution).await? {
            return Ok(cancelled);
        }

        tracing::info!(execution = %execution.id, "workflow execution completed");
        Ok(execution)
    }

    /// Cancel a pending or running execution.
    ///
    /// Cooperative: an in-flight step always runs to completion; the run
    /// loop observes the cancel at the next step boundary.
    pub async fn cancel(&self, execution_id: ExecutionId) -> Result<()> {
        let mut execution = self
            .store
            .get_execution(execution_id)
            .await?
            .ok_or(EngineError::ExecutionNotFound(execution_id))?;

        if !execution.status.is_cancellable() {
            return Err(EngineError::InvalidStateTransition {
                status: execution.status,
            });
        }

        execution.mark_cancelled();
        self.store.update_execution(&execution).await?;

        tracing::info!(execution = %execution_id, "cancelled execution");
        Ok(())
    }

    /// Execute exactly one step against the live context.
    async fn run_step(
        &self,
        execution_id: ExecutionId,
        index: usize,
        step: &StepDef,
        context: &Context,
    ) -> Result<Value> {
        // A vanished action type aborts the whole run; it is not skippable.
        let action = self
            .registry
            .resolve(&step.action)
            .ok_or_else(|| EngineError::UnknownAction(step.action.clone()))?;

        let mut record = StepExecution::running(execution_id, index, step);
        self.store.create_step_execution(&record).await?;

        tracing::info!(
            execution = %execution_id,
            step = index,
            action = %step.action,
            "executing step"
        );

        match Self::attempt(action.as_ref(), step, context, &mut record).await {
            Ok(output) => {
                record.mark_completed(output.clone());
                self.store.update_step_execution(&record).await?;
                Ok(output)
            }
            Err(source) => {
                record.mark_failed(source.to_string());
                self.store.update_step_execution(&record).await?;
                Err(EngineError::Step { index, source })
            }
        }
    }

    /// Validate, resolve, execute. Raw parameters are validated; the action
    /// itself sees the resolved block.
    async fn attempt(
        action: &dyn Action,
        step: &StepDef,
        context: &Context,
        record: &mut StepExecution,
    ) -> std::result::Result<Value, ActionError> {
        action.validate(&step.parameters)?;
        let resolved = resolver::resolve_parameters(&step.parameters, context);
        record.input_data = Some(resolved.clone());
        action.execute(&resolved, context).await
    }

    /// Write the execution row unless an externally written cancel won the
    /// race, in which case the cancelled row is returned and the write is
    /// dropped.
    async fn update_unless_cancelled(
        &self,
        execution: &Execution,
    ) -> Result<Option<Execution>> {
        if let Some(stored) = self.store.get_execution(execution.id).await? {
            if stored.status == ExecutionStatus::Cancelled {
                return Ok(Some(stored));
            }
        }
        self.store.update_execution(execution).await?;
        Ok(None)
    }
}
