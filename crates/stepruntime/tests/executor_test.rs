use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use stepcore::{
    Action, ActionError, Context, EngineError, ExecutionFilter, ExecutionStatus, Parameters,
    StepDef, StepStatus, Workflow, WorkflowStore,
};
use stepruntime::{ActionFactory, ActionRegistry, MemoryStore, WorkflowExecutor};

// Small purpose-built actions; the built-in library is exercised separately.

struct EchoAction;

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

struct EchoFactory;

impl ActionFactory for EchoFactory {
    fn create(&self) -> Box<dyn Action> {
        Box::new(EchoAction)
    }

    fn action_type(&self) -> &str {
        "echo"
    }
}

struct FailAction;

#[async_trait]
impl Action for FailAction {
    fn action_type(&self) -> &str {
        "fail"
    }

    async fn execute(&self, _parameters: &Parameters, _context: &Context) -> Result<Value, ActionError> {
        Err(ActionError::ExecutionFailed("boom".to_string()))
    }
}

struct FailFactory;

impl ActionFactory for FailFactory {
    fn create(&self) -> Box<dyn Action> {
        Box::new(FailAction)
    }

    fn action_type(&self) -> &str {
        "fail"
    }
}

struct SleepAction;

#[async_trait]
impl Action for SleepAction {
    fn action_type(&self) -> &str {
        "sleep"
    }

    async fn execute(&self, parameters: &Parameters, _context: &Context) -> Result<Value, ActionError> {
        let ms = parameters
            .get("ms")
            .and_then(Value::as_u64)
            .unwrap_or(100);
        tokio::time::sleep(Duration::from_millis(ms)).await;
        Ok(json!({ "slept_ms": ms }))
    }
}

struct SleepFactory;

impl ActionFactory for SleepFactory {
    fn create(&self) -> Box<dyn Action> {
        Box::new(SleepAction)
    }

    fn action_type(&self) -> &str {
        "sleep"
    }
}

fn harness() -> (Arc<MemoryStore>, WorkflowExecutor) {
    let store = Arc::new(MemoryStore::new());
    let mut registry = ActionRegistry::new();
    registry.register(Arc::new(EchoFactory));
    registry.register(Arc::new(FailFactory));
    registry.register(Arc::new(SleepFactory));
    let executor = WorkflowExecutor::new(store.clone(), Arc::new(registry));
    (store, executor)
}

async fn seed_workflow(store: &MemoryStore, steps: Vec<StepDef>) -> Workflow {
    let workflow = Workflow::new("test", steps);
    store.create_workflow(&workflow).await.unwrap();
    workflow
}

fn input(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

#[tokio::test]
async fn happy_path_completes_and_binds_outputs() {
    let (store, executor) = harness();
    let workflow = seed_workflow(
        &store,
        vec![
            StepDef::new("echo")
                .with_parameter("value", json!("{{msg}}"))
                .with_output("greeting"),
            StepDef::new("echo").with_parameter("value", json!("done")),
        ],
    )
    .await;

    let execution = executor
        .execute(workflow.id, input(&[("msg", json!("hi"))]))
        .await
        .unwrap();

    assert_eq!(execution.status, ExecutionStatus::Completed);
    assert_eq!(execution.current_step, 2);
    assert_eq!(execution.context.get("msg"), Some(&json!("hi")));
    assert_eq!(execution.context.get("greeting"), Some(&json!("hi")));
    assert_eq!(execution.context.get("step_1_output"), Some(&json!("done")));
    assert_eq!(execution.output_data, Some(execution.context.clone()));
    assert!(execution.duration_ms.is_some());

    let steps = store.list_step_executions(execution.id).await.unwrap();
    assert_eq!(steps.len(), 2);
    assert!(steps.iter().all(|s| s.status == StepStatus::Completed));
    assert!(steps.iter().all(|s| s.duration_ms.is_some()));
    assert_eq!(steps[0].output_data, Some(json!("hi")));
}

#[tokio::test]
async fn failing_step_aborts_the_run() {
    let (store, executor) = harness();
    let workflow = seed_workflow(
        &store,
        vec![
            StepDef::new("echo").with_parameter("value", json!("a")),
            StepDef::new("fail"),
            StepDef::new("echo").with_parameter("value", json!("never")),
        ],
    )
    .await;

    let err = executor
        .execute(workflow.id, HashMap::new())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Step { index: 1, .. }));

    let executions = store
        .list_executions(ExecutionFilter::default())
        .await
        .unwrap();
    assert_eq!(executions.len(), 1);
    let execution = &executions[0];
    assert_eq!(execution.status, ExecutionStatus::Failed);
    assert_eq!(execution.error_step, Some(1));
    assert!(execution.error_message.as_deref().unwrap().contains("boom"));
    assert!(execution.output_data.is_none());
    // Step 0's output was still persisted onto the context snapshot.
    assert_eq!(execution.context.get("step_0_output"), Some(&json!("a")));

    // Later steps are never attempted.
    let steps = store.list_step_executions(execution.id).await.unwrap();
    assert_eq!(steps.len(), 2);
    assert_eq!(steps[0].status, StepStatus::Completed);
    assert_eq!(steps[1].status, StepStatus::Failed);
    assert!(steps[1].error_message.as_deref().unwrap().contains("boom"));
}

#[tokio::test]
async fn false_condition_skips_without_mutating_context() {
    let (store, executor) = harness();
    let workflow = seed_workflow(
        &store,
        vec![
            StepDef::new("echo")
                .with_parameter("value", json!("a"))
                .with_output("first"),
            StepDef::new("echo")
                .with_parameter("value", json!("b"))
                .with_output("second")
                .with_condition("missing_flag"),
            StepDef::new("echo")
                .with_parameter("value", json!("c"))
                .with_output("third"),
        ],
    )
    .await;

    let execution = executor.execute(workflow.id, HashMap::new()).await.unwrap();

    assert_eq!(execution.status, ExecutionStatus::Completed);
    assert_eq!(execution.current_step, 3);
    assert!(execution.context.contains_key("first"));
    assert!(!execution.context.contains_key("second"));
    assert!(execution.context.contains_key("third"));

    let steps = store.list_step_executions(execution.id).await.unwrap();
    assert_eq!(steps.len(), 3);
    assert_eq!(steps[1].status, StepStatus::Skipped);
    assert!(steps[1].started_at.is_none());
    assert!(steps[1].completed_at.is_none());
    assert!(steps[1].output_data.is_none());
}

#[tokio::test]
async fn condition_on_string_false_skips() {
    // Comparison is on string form: "false" != "true".
    let (store, executor) = harness();
    let workflow = seed_workflow(
        &store,
        vec![StepDef::new("echo")
            .with_parameter("value", json!("x"))
            .with_condition("flag == true")],
    )
    .await;

    let execution = executor
        .execute(workflow.id, input(&[("flag", json!("false"))]))
        .await
        .unwrap();

    let steps = store.list_step_executions(execution.id).await.unwrap();
    assert_eq!(steps[0].status, StepStatus::Skipped);
}

#[tokio::test]
async fn unknown_action_at_run_time_fails_the_run() {
    let (store, executor) = harness();
    // Inserted directly, bypassing definition-time validation: the action
    // type has vanished from the registry (configuration drift).
    let workflow = seed_workflow(&store, vec![StepDef::new("ghost")]).await;

    let err = executor
        .execute(workflow.id, HashMap::new())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::UnknownAction(ref t) if t == "ghost"));

    let executions = store
        .list_executions(ExecutionFilter::default())
        .await
        .unwrap();
    assert_eq!(executions[0].status, ExecutionStatus::Failed);
    assert_eq!(executions[0].error_step, Some(0));
    // No step row exists: the action could not even be resolved.
    let steps = store.list_step_executions(executions[0].id).await.unwrap();
    assert!(steps.is_empty());
}

#[tokio::test]
async fn runtime_validation_failure_is_recorded_on_the_step() {
    let (store, executor) = harness();
    let workflow = seed_workflow(&store, vec![StepDef::new("echo")]).await;

    let err = executor
        .execute(workflow.id, HashMap::new())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Step { index: 0, .. }));

    let executions = store
        .list_executions(ExecutionFilter::default())
        .await
        .unwrap();
    let steps = store.list_step_executions(executions[0].id).await.unwrap();
    assert_eq!(steps[0].status, StepStatus::Failed);
    assert!(steps[0]
        .error_message
        .as_deref()
        .unwrap()
        .contains("missing required parameter"));
    // Validation failed before any parameters were fed to the action.
    assert!(steps[0].input_data.is_none());
}

#[tokio::test]
async fn disabled_workflow_is_rejected_before_any_execution_exists() {
    let (store, executor) = harness();
    let mut workflow = Workflow::new("off", vec![StepDef::new("echo")]);
    workflow.enabled = false;
    store.create_workflow(&workflow).await.unwrap();

    let err = executor
        .execute(workflow.id, HashMap::new())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Disabled(_)));

    let executions = store
        .list_executions(ExecutionFilter::default())
        .await
        .unwrap();
    assert!(executions.is_empty());
}

#[tokio::test]
async fn missing_workflow_is_not_found() {
    let (_store, executor) = harness();
    let err = executor
        .execute(uuid::Uuid::new_v4(), HashMap::new())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::WorkflowNotFound(_)));
}

#[tokio::test]
async fn input_overlays_workflow_variables() {
    let (store, executor) = harness();
    let mut variables = HashMap::new();
    variables.insert("greeting".to_string(), json!("default"));
    variables.insert("keep".to_string(), json!("kept"));
    let workflow = Workflow::new(
        "vars",
        vec![StepDef::new("echo").with_parameter("value", json!("{{greeting}} {{keep}}"))],
    )
    .with_variables(variables);
    store.create_workflow(&workflow).await.unwrap();

    let execution = executor
        .execute(workflow.id, input(&[("greeting", json!("override"))]))
        .await
        .unwrap();

    assert_eq!(
        execution.context.get("step_0_output"),
        Some(&json!("override kept"))
    );
}

#[tokio::test]
async fn cancel_stops_the_run_at_the_next_step_boundary() {
    let (store, executor) = harness();
    let executor = Arc::new(executor);
    let workflow = seed_workflow(
        &store,
        vec![
            StepDef::new("sleep").with_parameter("ms", json!(400)),
            StepDef::new("echo").with_parameter("value", json!("never")),
        ],
    )
    .await;

    let task = {
        let executor = executor.clone();
        let workflow_id = workflow.id;
        tokio::spawn(async move { executor.execute(workflow_id, HashMap::new()).await })
    };

    // Let the run enter the first (slow) step, then cancel.
    tokio::time::sleep(Duration::from_millis(100)).await;
    let executions = store
        .list_executions(ExecutionFilter::default())
        .await
        .unwrap();
    assert_eq!(executions.len(), 1);
    executor.cancel(executions[0].id).await.unwrap();

    let execution = task.await.unwrap().unwrap();
    assert_eq!(execution.status, ExecutionStatus::Cancelled);

    // The in-flight step ran to completion; the next step never started.
    let steps = store.list_step_executions(execution.id).await.unwrap();
    assert_eq!(steps.len(), 1);
    assert_eq!(steps[0].status, StepStatus::Completed);

    // Cancellation succeeds exactly once.
    let err = executor.cancel(execution.id).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::InvalidStateTransition {
            status: ExecutionStatus::Cancelled
        }
    ));
}

#[tokio::test]
async fn cancelling_a_terminal_execution_is_rejected() {
    let (store, executor) = harness();
    let workflow = seed_workflow(
        &store,
        vec![StepDef::new("echo").with_parameter("value", json!("x"))],
    )
    .await;

    let execution = executor.execute(workflow.id, HashMap::new()).await.unwrap();
    assert_eq!(execution.status, ExecutionStatus::Completed);

    let err = executor.cancel(execution.id).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::InvalidStateTransition {
            status: ExecutionStatus::Completed
        }
    ));
}

#[tokio::test]
async fn cancelling_a_pending_execution_succeeds() {
    let (store, executor) = harness();
    let execution = stepcore::Execution::new(uuid::Uuid::new_v4(), HashMap::new());
    store.create_execution(&execution).await.unwrap();

    executor.cancel(execution.id).await.unwrap();

    let stored = store.get_execution(execution.id).await.unwrap().unwrap();
    assert_eq!(stored.status, ExecutionStatus::Cancelled);
    assert!(stored.completed_at.is_some());
    // Never started, so no duration is derived.
    assert!(stored.duration_ms.is_none());
}
