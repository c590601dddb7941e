use anyhow::Result;
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use stepcore::{ExecutionFilter, StepDef, StepStatus};
use stepruntime::{ActionRegistry, MemoryStore, NewWorkflow, WorkflowService};

#[derive(Parser)]
#[command(name = "step")]
#[command(about = "Stepflow workflow CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a workflow definition file
    Run {
        /// Path to workflow JSON file
        #[arg(short, long)]
        file: PathBuf,

        /// Input data as JSON object string
        #[arg(short, long)]
        input: Option<String>,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Validate a workflow definition file
    Validate {
        /// Path to workflow JSON file
        file: PathBuf,
    },

    /// List available action types
    Actions,

    /// Create a new example workflow definition
    Init {
        /// Output file path
        #[arg(short, long, default_value = "workflow.json")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            file,
            input,
            verbose,
        } => {
            if verbose {
                tracing_subscriber::fmt()
                    .with_max_level(tracing::Level::DEBUG)
                    .init();
            } else {
                tracing_subscriber::fmt()
                    .with_max_level(tracing::Level::WARN)
                    .init();
            }

            run_workflow(file, input).await?;
        }

        Commands::Validate { file } => {
            validate_workflow(file)?;
        }

        Commands::Actions => {
            list_actions();
        }

        Commands::Init { output } => {
            create_example_workflow(output)?;
        }
    }

    Ok(())
}

fn new_service() -> WorkflowService {
    let mut registry = ActionRegistry::new();
    stepactions::register_all(&mut registry);
    WorkflowService::new(Arc::new(MemoryStore::new()), Arc::new(registry))
}

fn load_definition(file: &PathBuf) -> Result<NewWorkflow> {
    let json = std::fs::read_to_string(file)?;
    Ok(serde_json::from_str(&json)?)
}

fn parse_input(input: Option<String>) -> Result<HashMap<String, Value>> {
    match input {
        None => Ok(HashMap::new()),
        Some(raw) => {
            let json: Value = serde_json::from_str(&raw)?;
            match json {
                Value::Object(map) => Ok(map.into_iter().collect()),
                _ => Err(anyhow::anyhow!("input must be a JSON object")),
            }
        }
    }
}

async fn run_workflow(file: PathBuf, input: Option<String>) -> Result<()> {
    println!("🚀 Loading workflow from: {}", file.display());

    let definition = load_definition(&file)?;
    let input_data = parse_input(input)?;

    println!("📋 Workflow: {}", definition.name);
    println!("   Steps: {}", definition.steps.len());
    println!();

    let service = new_service();
    let workflow = service.create_workflow(definition).await?;
    let workflow_id = workflow.id;

    let result = service.execute_workflow(workflow_id, input_data).await;

    let execution_id = match &result {
        Ok(execution) => Some(execution.id),
        // The failed execution row is still persisted; find it for display.
        Err(_) => service
            .list_executions(ExecutionFilter {
                workflow_id: Some(workflow_id),
                ..Default::default()
            })
            .await?
            .first()
            .map(|execution| execution.id),
    };

    if let Some(execution_id) = execution_id {
        let detail = service.get_execution(execution_id).await?;

        println!("📊 Execution Summary:");
        println!("   Execution ID: {}", detail.execution.id);
        println!("   Status: {}", detail.execution.status);
        if let Some(duration) = detail.execution.duration_ms {
            println!("   Duration: {}ms", duration);
        }
        println!();

        for step in &detail.steps {
            let name = step
                .step_name
                .clone()
                .unwrap_or_else(|| step.action_type.clone());
            match step.status {
                StepStatus::Completed => {
                    println!("  ✅ [{}] {}", step.step_index, name);
                }
                StepStatus::Skipped => {
                    println!("  ⏭️  [{}] {} (condition not met)", step.step_index, name);
                }
                StepStatus::Failed => {
                    println!(
                        "  ❌ [{}] {}: {}",
                        step.step_index,
                        name,
                        step.error_message.as_deref().unwrap_or("unknown error")
                    );
                }
                _ => {
                    println!("  ⏳ [{}] {}", step.step_index, name);
                }
            }
        }

        if let Some(output) = &detail.execution.output_data {
            println!();
            println!("📤 Output:");
            println!("{}", serde_json::to_string_pretty(output)?);
        }
    }

    match result {
        Ok(_) => Ok(()),
        Err(e) => {
            println!();
            println!("💥 Workflow failed: {}", e);
            Err(e.into())
        }
    }
}

fn validate_workflow(file: PathBuf) -> Result<()> {
    println!("🔍 Validating workflow: {}", file.display());

    let definition = load_definition(&file)?;
    let service = new_service();

    match service.validate_steps(&definition.steps) {
        Ok(()) => {
            println!("✅ Workflow is valid:");
            println!("   Name: {}", definition.name);
            println!("   Steps: {}", definition.steps.len());
            Ok(())
        }
        Err(e) => {
            println!("❌ Invalid workflow: {}", e);
            Err(e.into())
        }
    }
}

fn list_actions() {
    println!("📦 Available Action Types:");
    println!();

    let mut registry = ActionRegistry::new();
    stepactions::register_all(&mut registry);

    let mut actions: Vec<_> = registry.list_actions().into_iter().collect();
    actions.sort();
    for (action_type, description) in actions {
        println!("  • {}", action_type);
        println!("    {}", description);
    }
}

fn create_example_workflow(output: PathBuf) -> Result<()> {
    let mut variables = HashMap::new();
    variables.insert("name".to_string(), Value::String("world".to_string()));

    let definition = NewWorkflow {
        name: "Example Workflow".to_string(),
        description: Some("Greets by name, then fetches a URL when one is provided".to_string()),
        steps: vec![
            StepDef::new("echo")
                .with_name("Greet")
                .with_parameter("value", "hello {{name}}")
                .with_output("greeting"),
            StepDef::new("http_request")
                .with_name("Fetch")
                .with_parameter("url", "{{api_url}}")
                .with_parameter("method", "GET")
                .with_condition("api_url exists")
                .with_output("response"),
        ],
        variables,
        created_by: None,
        template_id: None,
    };

    let json = serde_json::to_string_pretty(&definition)?;
    std::fs::write(&output, json)?;

    println!("✨ Created example workflow: {}", output.display());
    println!();
    println!("Run it with:");
    println!(
        "  step run --file {} --input '{{\"name\": \"there\"}}'",
        output.display()
    );

    Ok(())
}
