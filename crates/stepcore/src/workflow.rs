use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

pub type WorkflowId = Uuid;
pub type TemplateId = Uuid;

/// Complete workflow definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub id: WorkflowId,
    pub name: String,
    pub description: Option<String>,
    pub steps: Vec<StepDef>,
    #[serde(default)]
    pub variables: HashMap<String, Value>,
    pub enabled: bool,
    pub version: u32,
    pub created_by: Option<String>,
    pub template_id: Option<TemplateId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Workflow {
    pub fn new(name: impl Into<String>, steps: Vec<StepDef>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            steps,
            variables: HashMap::new(),
            enabled: true,
            version: 1,
            created_by: None,
            template_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_variables(mut self, variables: HashMap<String, Value>) -> Self {
        self.variables = variables;
        self
    }
}

/// One entry in a workflow's ordered step sequence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepDef {
    pub name: Option<String>,
    /// Action type identifier resolved through the registry
    pub action: String,
    #[serde(default)]
    pub parameters: HashMap<String, Value>,
    pub output_variable: Option<String>,
    pub condition: Option<String>,
}

impl StepDef {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            name: None,
            action: action.into(),
            parameters: HashMap::new(),
            output_variable: None,
            condition: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn with_output(mut self, variable: impl Into<String>) -> Self {
        self.output_variable = Some(variable.into());
        self
    }

    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    /// Context variable name the step result is bound under.
    /// Defaults to a name derived from the step's position.
    pub fn output_name(&self, index: usize) -> String {
        self.output_variable
            .clone()
            .unwrap_or_else(|| format!("step_{}_output", index))
    }
}

/// Reusable, versionless blueprint from which workflows are instantiated
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowTemplate {
    pub id: TemplateId,
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
    pub is_public: bool,
    pub usage_count: u64,
    pub created_at: DateTime<Utc>,
}

impl WorkflowTemplate {
    pub fn new(name: impl Into<String>, steps: Vec<StepDef>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            category: None,
            steps,
            default_variables: HashMap::new(),
            required_variables: Vec::new(),
            tags: Vec::new(),
            author: None,
            is_public: false,
            usage_count: 0,
            created_at: Utc::now(),
        }
    }
}
