use actix_web::{delete, get, post, web, HttpRequest, HttpResponse, Responder, Result as ActixResult};
use actix_ws::Message;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{error, info, warn};
use wirecore::trigger::{google_form_initial_data, stripe_initial_data};
use wirecore::{FlowError, RunEvent, Workflow, WorkflowError};
use wireruntime::{validate_workflow, ExecutionResult, WireRuntime};

/// Application state shared across handlers
pub struct AppState {
    pub runtime: Arc<WireRuntime>,
}

/// Optional body of a manual run
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExecuteRequest {
    #[serde(default)]
    initial_data: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WorkflowQuery {
    workflow_id: String,
}

#[derive(Debug, Deserialize)]
struct ChannelQuery {
    channel: String,
}

/// Response for accepted run-trigger events
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AcceptedResponse {
    event_id: String,
    workflow_id: String,
}

/// Error response
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_body(message: impl Into<String>) -> ErrorResponse {
    ErrorResponse {
        error: message.into(),
    }
}

fn flow_error_response(e: &FlowError) -> HttpResponse {
    let body = error_body(e.to_string());
    match e {
        FlowError::Workflow(WorkflowError::NotFound(_)) => HttpResponse::NotFound().json(body),
        FlowError::AlreadyFailed { .. } | FlowError::EventConflict { .. } => {
            HttpResponse::Conflict().json(body)
        }
        FlowError::Workflow(_) | FlowError::Node(_) => HttpResponse::UnprocessableEntity().json(body),
        _ => HttpResponse::InternalServerError().json(body),
    }
}

fn result_body(result: &ExecutionResult) -> Value {
    json!({
        "execution": result.execution,
        "output": result.output,
        "replayed": result.replayed,
    })
}

/// Health check endpoint
#[get("/health")]
async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "wireflow"
    }))
}

/// List all workflows
#[get("/api/workflows")]
async fn list_workflows(data: web::Data<AppState>) -> ActixResult<impl Responder> {
    let workflows = match data.runtime.stores().workflows.list_workflows().await {
        Ok(workflows) => workflows,
        Err(e) => {
            error!("Listing workflows failed: {}", e);
            return Ok(HttpResponse::InternalServerError().json(error_body(e.to_string())));
        }
    };

    let workflow_list: Vec<_> = workflows
        .iter()
        .map(|w| {
            json!({
                "id": w.id,
                "name": w.name,
                "owner": w.owner,
                "nodes": w.nodes.len(),
                "connections": w.connections.len(),
            })
        })
        .collect();

    Ok(HttpResponse::Ok().json(workflow_list))
}

/// Create or replace a workflow
#[post("/api/workflows")]
async fn create_workflow(
    data: web::Data<AppState>,
    workflow: web::Json<Workflow>,
) -> ActixResult<impl Responder> {
    let workflow = workflow.into_inner();

    if let Err(e) = validate_workflow(&workflow, data.runtime.registry()) {
        warn!("Rejected workflow {}: {}", workflow.id, e);
        return Ok(HttpResponse::BadRequest().json(error_body(e.to_string())));
    }

    info!("Saving workflow: {} ({})", workflow.name, workflow.id);

    if let Err(e) = data.runtime.register_workflow(&workflow).await {
        error!("Saving workflow {} failed: {}", workflow.id, e);
        return Ok(flow_error_response(&e));
    }

    Ok(HttpResponse::Created().json(json!({
        "id": workflow.id,
        "message": "Workflow saved"
    })))
}

/// Get a specific workflow
#[get("/api/workflows/{id}")]
async fn get_workflow(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> ActixResult<impl Responder> {
    let workflow_id = path.into_inner();

    match data.runtime.stores().workflows.get_workflow(&workflow_id).await {
        Ok(Some(workflow)) => Ok(HttpResponse::Ok().json(workflow)),
        Ok(None) => Ok(HttpResponse::NotFound().json(error_body(format!(
            "Workflow {} not found",
            workflow_id
        )))),
        Err(e) => Ok(HttpResponse::InternalServerError().json(error_body(e.to_string()))),
    }
}

/// Delete a workflow together with its execution history
#[delete("/api/workflows/{id}")]
async fn delete_workflow(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> ActixResult<impl Responder> {
    let workflow_id = path.into_inner();

    match data.runtime.stores().workflows.delete_workflow(&workflow_id).await {
        Ok(true) => {
            info!("Deleted workflow: {}", workflow_id);
            Ok(HttpResponse::Ok().json(json!({ "message": "Workflow deleted" })))
        }
        Ok(false) => Ok(HttpResponse::NotFound().json(error_body(format!(
            "Workflow {} not found",
            workflow_id
        )))),
        Err(e) => Ok(HttpResponse::InternalServerError().json(error_body(e.to_string()))),
    }
}

/// Run a workflow by hand and wait for the outcome
#[post("/api/workflows/{id}/execute")]
async fn execute_workflow(
    data: web::Data<AppState>,
    path: web::Path<String>,
    body: Option<web::Json<ExecuteRequest>>,
) -> ActixResult<impl Responder> {
    let workflow_id = path.into_inner();
    let request = body.map(web::Json::into_inner).unwrap_or_default();

    let mut event = RunEvent::new(workflow_id.clone());
    if let Some(initial_data) = request.initial_data {
        event = event.with_initial_data(initial_data);
    }

    info!("Executing workflow {} (event {})", workflow_id, event.id);

    match data.runtime.run(event).await {
        Ok(result) => Ok(HttpResponse::Ok().json(result_body(&result))),
        Err(e) => {
            error!("Workflow {} execution failed: {}", workflow_id, e);
            Ok(flow_error_response(&e))
        }
    }
}

/// Start a run in the background once the workflow is known to exist
async fn accept(data: &AppState, event: RunEvent) -> HttpResponse {
    match data.runtime.stores().workflows.get_workflow(&event.workflow_id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return HttpResponse::NotFound().json(error_body(format!(
                "Workflow {} not found",
                event.workflow_id
            )))
        }
        Err(e) => return HttpResponse::InternalServerError().json(error_body(e.to_string())),
    }

    let accepted = AcceptedResponse {
        event_id: event.id.clone(),
        workflow_id: event.workflow_id.clone(),
    };

    let runtime = data.runtime.clone();
    actix_web::rt::spawn(async move {
        let event_id = event.id.clone();
        if let Err(e) = runtime.run(event).await {
            error!("Run for event {} ended with error: {}", event_id, e);
        }
    });

    HttpResponse::Accepted().json(accepted)
}

/// Ingest a run-trigger event; redelivery of the same id is idempotent
#[post("/api/events")]
async fn ingest_event(
    data: web::Data<AppState>,
    event: web::Json<RunEvent>,
) -> ActixResult<impl Responder> {
    Ok(accept(&data, event.into_inner()).await)
}

/// Run event for an inbound submission, keyed on the sender's own id when
/// present. The key includes the workflow so one submission can feed several.
fn delivery_event(workflow_id: String, payload: &Value, id_field: &str, prefix: &str) -> RunEvent {
    match payload.get(id_field).and_then(Value::as_str) {
        Some(id) if !id.is_empty() => {
            let event_id = format!("{}-{}-{}", prefix, workflow_id, id);
            RunEvent::new(workflow_id).with_id(event_id)
        }
        _ => RunEvent::new(workflow_id),
    }
}

#[post("/api/webhooks/google-form")]
async fn google_form_webhook(
    data: web::Data<AppState>,
    query: web::Query<WorkflowQuery>,
    payload: web::Json<Value>,
) -> ActixResult<impl Responder> {
    let payload = payload.into_inner();
    let event = delivery_event(query.into_inner().workflow_id, &payload, "responseId", "google-form")
        .with_initial_data(google_form_initial_data(&payload));

    Ok(accept(&data, event).await)
}

#[post("/api/webhooks/stripe")]
async fn stripe_webhook(
    data: web::Data<AppState>,
    query: web::Query<WorkflowQuery>,
    payload: web::Json<Value>,
) -> ActixResult<impl Responder> {
    let payload = payload.into_inner();
    let event = delivery_event(query.into_inner().workflow_id, &payload, "id", "stripe")
        .with_initial_data(stripe_initial_data(&payload));

    Ok(accept(&data, event).await)
}

/// Execution history of a workflow, newest first
#[get("/api/executions")]
async fn list_executions(
    data: web::Data<AppState>,
    query: web::Query<WorkflowQuery>,
) -> ActixResult<impl Responder> {
    match data
        .runtime
        .stores()
        .executions
        .list_for_workflow(&query.workflow_id)
        .await
    {
        Ok(executions) => Ok(HttpResponse::Ok().json(executions)),
        Err(e) => Ok(HttpResponse::InternalServerError().json(error_body(e.to_string()))),
    }
}

#[get("/api/executions/{id}")]
async fn get_execution(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> ActixResult<impl Responder> {
    let execution_id = path.into_inner();

    match data.runtime.stores().executions.get(&execution_id).await {
        Ok(Some(execution)) => Ok(HttpResponse::Ok().json(execution)),
        Ok(None) => Ok(HttpResponse::NotFound().json(error_body(format!(
            "Execution {} not found",
            execution_id
        )))),
        Err(e) => Ok(HttpResponse::InternalServerError().json(error_body(e.to_string()))),
    }
}

/// WebSocket stream of node status messages for one channel
#[get("/api/realtime")]
async fn realtime(
    req: HttpRequest,
    stream: web::Payload,
    data: web::Data<AppState>,
    query: web::Query<ChannelQuery>,
) -> ActixResult<HttpResponse> {
    let (res, mut session, mut msg_stream) = actix_ws::handle(&req, stream)?;

    let mut statuses = data.runtime.subscribe_channel(query.into_inner().channel);
    info!("Realtime client subscribed to {}", statuses.channel());

    actix_web::rt::spawn(async move {
        loop {
            tokio::select! {
                message = statuses.recv() => {
                    let Some(message) = message else { break };
                    match serde_json::to_string(&message) {
                        Ok(json) => {
                            if session.text(json).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => warn!("Dropping unserializable status message: {}", e),
                    }
                }

                Some(Ok(msg)) = msg_stream.recv() => {
                    match msg {
                        Message::Ping(bytes) => {
                            if session.pong(&bytes).await.is_err() {
                                break;
                            }
                        }
                        Message::Close(_) => break,
                        _ => {}
                    }
                }

                else => break,
            }
        }

        info!("Realtime client disconnected");
        let _ = session.close(None).await;
    });

    Ok(res)
}

/// List available node types
#[get("/api/nodes")]
async fn list_node_types(data: web::Data<AppState>) -> ActixResult<impl Responder> {
    let registry = data.runtime.registry();

    let nodes: Vec<_> = registry
        .list_node_types()
        .into_iter()
        .map(|node_type| {
            let metadata = registry.get_metadata(node_type);
            json!({
                "type": node_type,
                "name": node_type.display_name(),
                "channel": node_type.status_channel(),
                "description": metadata.as_ref().map(|m| m.description).unwrap_or_default(),
                "category": metadata.as_ref().map(|m| m.category).unwrap_or_default(),
            })
        })
        .collect();

    Ok(HttpResponse::Ok().json(nodes))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health_check)
        .service(list_workflows)
        .service(create_workflow)
        .service(get_workflow)
        .service(delete_workflow)
        .service(execute_workflow)
        .service(ingest_event)
        .service(google_form_webhook)
        .service(stripe_webhook)
        .service(list_executions)
        .service(get_execution)
        .service(realtime)
        .service(list_node_types);
}
