use actix_cors::Cors;
use actix_web::{
    delete, get, post, put, web, App, HttpResponse, HttpServer, Responder, Result as ActixResult,
};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use stepcore::{EngineError, ExecutionFilter, ExecutionStatus, TemplateFilter, WorkflowFilter};
use stepruntime::{
    ActionRegistry, MemoryStore, NewTemplate, NewWorkflow, WorkflowService, WorkflowUpdate,
};
use tracing::{error, info};
use uuid::Uuid;

/// Application state shared across handlers
struct AppState {
    service: Arc<WorkflowService>,
}

/// Request body for workflow execution
#[derive(Debug, Deserialize)]
struct ExecuteRequest {
    #[serde(default)]
    input_data: HashMap<String, Value>,
}

/// Request body for instantiating a template
#[derive(Debug, Deserialize)]
struct InstantiateRequest {
    name: String,
    #[serde(default)]
    variables: HashMap<String, Value>,
    created_by: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WorkflowListQuery {
    #[serde(default)]
    enabled_only: bool,
    #[serde(default)]
    skip: usize,
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct ExecutionListQuery {
    workflow_id: Option<Uuid>,
    status: Option<String>,
    #[serde(default)]
    skip: usize,
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct TemplateListQuery {
    category: Option<String>,
    #[serde(default)]
    public_only: bool,
    #[serde(default)]
    skip: usize,
    limit: Option<usize>,
}

/// Map engine errors onto HTTP status codes
fn error_response(err: &EngineError) -> HttpResponse {
    let body = serde_json::json!({ "error": err.to_string() });
    match err {
        EngineError::WorkflowNotFound(_)
        | EngineError::ExecutionNotFound(_)
        | EngineError::TemplateNotFound(_) => HttpResponse::NotFound().json(body),
        EngineError::Definition(_)
        | EngineError::Disabled(_)
        | EngineError::InvalidStateTransition { .. } => HttpResponse::BadRequest().json(body),
        _ => HttpResponse::InternalServerError().json(body),
    }
}

#[get("/health")]
async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "stepserver"
    }))
}

#[post("/api/workflows")]
async fn create_workflow(
    data: web::Data<AppState>,
    body: web::Json<NewWorkflow>,
) -> ActixResult<impl Responder> {
    match data.service.create_workflow(body.into_inner()).await {
        Ok(workflow) => Ok(HttpResponse::Created().json(workflow)),
        Err(e) => Ok(error_response(&e)),
    }
}

#[get("/api/workflows")]
async fn list_workflows(
    data: web::Data<AppState>,
    query: web::Query<WorkflowListQuery>,
) -> ActixResult<impl Responder> {
    let filter = WorkflowFilter {
        enabled_only: query.enabled_only,
        skip: query.skip,
        limit: query.limit,
    };
    match data.service.list_workflows(filter).await {
        Ok(workflows) => Ok(HttpResponse::Ok().json(workflows)),
        Err(e) => Ok(error_response(&e)),
    }
}

#[get("/api/workflows/{id}")]
async fn get_workflow(
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> ActixResult<impl Responder> {
    match data.service.get_workflow(path.into_inner()).await {
        Ok(workflow) => Ok(HttpResponse::Ok().json(workflow)),
        Err(e) => Ok(error_response(&e)),
    }
}

#[put("/api/workflows/{id}")]
async fn update_workflow(
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<WorkflowUpdate>,
) -> ActixResult<impl Responder> {
    match data
        .service
        .update_workflow(path.into_inner(), body.into_inner())
        .await
    {
        Ok(workflow) => Ok(HttpResponse::Ok().json(workflow)),
        Err(e) => Ok(error_response(&e)),
    }
}

#[delete("/api/workflows/{id}")]
async fn delete_workflow(
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> ActixResult<impl Responder> {
    let id = path.into_inner();
    match data.service.delete_workflow(id).await {
        Ok(()) => {
            info!("deleted workflow {}", id);
            Ok(HttpResponse::Ok().json(serde_json::json!({
                "message": "workflow deleted"
            })))
        }
        Err(e) => Ok(error_response(&e)),
    }
}

#[post("/api/workflows/{id}/execute")]
async fn execute_workflow(
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<ExecuteRequest>,
) -> ActixResult<impl Responder> {
    let id = path.into_inner();
    info!("executing workflow {}", id);

    match data
        .service
        .execute_workflow(id, body.into_inner().input_data)
        .await
    {
        Ok(execution) => Ok(HttpResponse::Ok().json(execution)),
        Err(e) => {
            error!("workflow {} execution failed: {}", id, e);
            Ok(error_response(&e))
        }
    }
}

#[get("/api/executions")]
async fn list_executions(
    data: web::Data<AppState>,
    query: web::Query<ExecutionListQuery>,
) -> ActixResult<impl Responder> {
    let status = match query.status.as_deref() {
        Some(raw) => match raw.parse::<ExecutionStatus>() {
            Ok(status) => Some(status),
            Err(e) => {
                return Ok(HttpResponse::BadRequest()
                    .json(serde_json::json!({ "error": e })))
            }
        },
        None => None,
    };
    let filter = ExecutionFilter {
        workflow_id: query.workflow_id,
        status,
        skip: query.skip,
        limit: query.limit,
    };
    match data.service.list_executions(filter).await {
        Ok(executions) => Ok(HttpResponse::Ok().json(executions)),
        Err(e) => Ok(error_response(&e)),
    }
}

#[get("/api/executions/{id}")]
async fn get_execution(
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> ActixResult<impl Responder> {
    match data.service.get_execution(path.into_inner()).await {
        Ok(detail) => Ok(HttpResponse::Ok().json(detail)),
        Err(e) => Ok(error_response(&e)),
    }
}

#[post("/api/executions/{id}/cancel")]
async fn cancel_execution(
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> ActixResult<impl Responder> {
    let id = path.into_inner();
    match data.service.cancel_execution(id).await {
        Ok(()) => {
            info!("cancelled execution {}", id);
            Ok(HttpResponse::Ok().json(serde_json::json!({
                "message": "execution cancelled"
            })))
        }
        Err(e) => Ok(error_response(&e)),
    }
}

#[post("/api/templates")]
async fn create_template(
    data: web::Data<AppState>,
    body: web::Json<NewTemplate>,
) -> ActixResult<impl Responder> {
    match data.service.create_template(body.into_inner()).await {
        Ok(template) => Ok(HttpResponse::Created().json(template)),
        Err(e) => Ok(error_response(&e)),
    }
}

#[get("/api/templates")]
async fn list_templates(
    data: web::Data<AppState>,
    query: web::Query<TemplateListQuery>,
) -> ActixResult<impl Responder> {
    let filter = TemplateFilter {
        category: query.category.clone(),
        public_only: query.public_only,
        skip: query.skip,
        limit: query.limit,
    };
    match data.service.list_templates(filter).await {
        Ok(templates) => Ok(HttpResponse::Ok().json(templates)),
        Err(e) => Ok(error_response(&e)),
    }
}

#[get("/api/templates/{id}")]
async fn get_template(
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> ActixResult<impl Responder> {
    match data.service.get_template(path.into_inner()).await {
        Ok(template) => Ok(HttpResponse::Ok().json(template)),
        Err(e) => Ok(error_response(&e)),
    }
}

#[post("/api/templates/{id}/instantiate")]
async fn instantiate_template(
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<InstantiateRequest>,
) -> ActixResult<impl Responder> {
    let body = body.into_inner();
    match data
        .service
        .instantiate_template(path.into_inner(), body.name, body.variables, body.created_by)
        .await
    {
        Ok(workflow) => Ok(HttpResponse::Created().json(workflow)),
        Err(e) => Ok(error_response(&e)),
    }
}

#[get("/api/actions")]
async fn list_actions(data: web::Data<AppState>) -> ActixResult<impl Responder> {
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "actions": data.service.list_actions()
    })))
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("starting stepflow server");

    let mut registry = ActionRegistry::new();
    stepactions::register_all(&mut registry);

    let service = Arc::new(WorkflowService::new(
        Arc::new(MemoryStore::new()),
        Arc::new(registry),
    ));

    info!("service initialized with standard actions");

    let app_state = web::Data::new(AppState { service });

    let bind_address =
        std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

    info!("server starting on http://{}", bind_address);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(app_state.clone())
            .wrap(cors)
            .wrap(actix_web::middleware::Logger::default())
            .service(health_check)
            .service(create_workflow)
            .service(list_workflows)
            .service(get_workflow)
            .service(update_workflow)
            .service(delete_workflow)
            .service(execute_workflow)
            .service(list_executions)
            .service(get_execution)
            .service(cancel_execution)
            .service(create_template)
            .service(list_templates)
            .service(get_template)
            .service(instantiate_template)
            .service(list_actions)
    })
    .bind(&bind_address)?
    .run()
    .await?;

    Ok(())
}
