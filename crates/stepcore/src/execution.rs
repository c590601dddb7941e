use crate::workflow::{StepDef, WorkflowId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub type ExecutionId = Uuid;
pub type StepExecutionId = Uuid;

/// Status of a workflow execution.
///
/// `pending → running → {completed | failed | cancelled}`; `pending` is
/// terminal only when cancelled before the run loop starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl ExecutionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Cancellation is only valid before a terminal state is reached.
    pub fn is_cancellable(&self) -> bool {
        matches!(self, Self::Pending | Self::Running)
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

impl FromStr for ExecutionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(format!("unknown execution status: {}", other)),
        }
    }
}

/// Status of a single step within an execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
}

/// One run of a workflow against a given input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Execution {
    pub id: ExecutionId,
    pub workflow_id: WorkflowId,
    pub status: ExecutionStatus,
    /// Index of the next step to run; monotonically non-decreasing
    pub current_step: usize,
    pub input_data: HashMap<String, Value>,
    /// Final context, populated only on success
    pub output_data: Option<HashMap<String, Value>>,
    /// Snapshot of all variables seen so far
    pub context: HashMap<String, Value>,
    pub error_message: Option<String>,
    pub error_step: Option<usize>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl Execution {
    pub fn new(workflow_id: WorkflowId, input_data: HashMap<String, Value>) -> Self {
        Self {
            id: Uuid::new_v4(),
            workflow_id,
            status: ExecutionStatus::Pending,
            current_step: 0,
            input_data,
            output_data: None,
            context: HashMap::new(),
            error_message: None,
            error_step: None,
            started_at: None,
            completed_at: None,
            duration_ms: None,
            created_at: Utc::now(),
        }
    }

    /// Enter the run loop; stamps the start timestamp.
    pub fn mark_running(&mut self) {
        self.status = ExecutionStatus::Running;
        self.started_at = Some(Utc::now());
    }

    pub fn mark_completed(&mut self, output: HashMap<String, Value>) {
        self.status = ExecutionStatus::Completed;
        self.output_data = Some(output);
        self.finish();
    }

    pub fn mark_failed(&mut self, step_index: usize, message: impl Into<String>) {
        self.status = ExecutionStatus::Failed;
        self.error_message = Some(message.into());
        self.error_step = Some(step_index);
        self.finish();
    }

    pub fn mark_cancelled(&mut self) {
        self.status = ExecutionStatus::Cancelled;
        self.finish();
    }

    /// Duration is derived, and only once both timestamps exist.
    fn finish(&mut self) {
        let completed = Utc::now();
        self.completed_at = Some(completed);
        if let Some(started) = self.started_at {
            self.duration_ms = Some((completed - started).num_milliseconds());
        }
    }
}

/// Persisted record of one step's attempt (or skip) within an execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepExecution {
    pub id: StepExecutionId,
    pub execution_id: ExecutionId,
    /// 0-based position in the workflow's step sequence
    pub step_index: usize,
    pub step_name: Option<String>,
    pub action_type: String,
    pub status: StepStatus,
    /// Raw parameter block, pre-resolution
    pub parameters: HashMap<String, Value>,
    /// Resolved parameters fed to the action
    pub input_data: Option<HashMap<String, Value>>,
    pub output_data: Option<Value>,
    pub error_message: Option<String>,
    /// Reserved for a future retry policy; nothing increments it today
    pub retry_count: u32,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<i64>,
}

impl StepExecution {
    /// Record for a step entering execution.
    pub fn running(execution_id: ExecutionId, step_index: usize, step: &StepDef) -> Self {
        Self {
            id: Uuid::new_v4(),
            execution_id,
            step_index,
            step_name: step.name.clone(),
            action_type: step.action.clone(),
            status: StepStatus::Running,
            parameters: step.parameters.clone(),
            input_data: None,
            output_data: None,
            error_message: None,
            retry_count: 0,
            started_at: Some(Utc::now()),
            completed_at: None,
            duration_ms: None,
        }
    }

    /// Record for a step whose condition evaluated false. Carries no timing.
    pub fn skipped(execution_id: ExecutionId, step_index: usize, step: &StepDef) -> Self {
        Self {
            id: Uuid::new_v4(),
            execution_id,
            step_index,
            step_name: step.name.clone(),
            action_type: step.action.clone(),
            status: StepStatus::Skipped,
            parameters: step.parameters.clone(),
            input_data: None,
            output_data: None,
            error_message: None,
            retry_count: 0,
            started_at: None,
            completed_at: None,
            duration_ms: None,
        }
    }

    pub fn mark_completed(&mut self, output: Value) {
        self.status = StepStatus::Completed;
        self.output_data = Some(output);
        self.finish();
    }

    pub fn mark_failed(&mut self, message: impl Into<String>) {
        self.status = StepStatus::Failed;
        self.error_message = Some(message.into());
        self.finish();
    }

    fn finish(&mut self) {
        let completed = Utc::now();
        self.completed_at = Some(completed);
        if let Some(started) = self.started_at {
            self.duration_ms = Some((completed - started).num_milliseconds());
        }
    }
}
