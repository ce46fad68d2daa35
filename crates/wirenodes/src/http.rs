use crate::transport::{HttpClient, HttpMethod, OutboundRequest, TransportError};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use wirecore::{ExecutionContext, ExecutorMetadata, NodeContext, NodeError, NodeExecutor, NodeType};

const NODE: &str = "HTTP Request";

/// Calls an arbitrary HTTP endpoint.
///
/// Config: `endpoint` and `variableName` (required), `method` (defaults to
/// GET) and `body` (JSON template, POST/PUT/PATCH only). The result is
/// stored as `{ httpResponse: { status, statusText, data } }`.
pub struct HttpRequestExecutor {
    client: Arc<dyn HttpClient>,
}

impl HttpRequestExecutor {
    pub fn new(client: Arc<dyn HttpClient>) -> Self {
        Self { client }
    }
}

pub(crate) fn request_failed(node: &'static str, error: TransportError) -> NodeError {
    NodeError::Request {
        node,
        message: error.to_string(),
    }
}

#[async_trait]
impl NodeExecutor for HttpRequestExecutor {
    fn node_type(&self) -> NodeType {
        NodeType::HttpRequest
    }

    async fn execute(&self, ctx: NodeContext) -> Result<ExecutionContext, NodeError> {
        ctx.status.loading();

        let endpoint = ctx.require_config("endpoint")?;
        let variable_name = ctx.require_config("variableName")?.to_string();
        let method: HttpMethod = ctx
            .data
            .get_str("method")
            .unwrap_or("GET")
            .parse()
            .map_err(|message| ctx.fail(NodeError::Configuration { node: NODE, message }))?;

        let url = ctx.render(endpoint)?;
        let mut request = OutboundRequest::new(method, url);

        if method.allows_body() {
            let body = ctx.render(ctx.data.get_str("body").unwrap_or("{}"))?;
            if let Err(e) = serde_json::from_str::<Value>(&body) {
                return Err(ctx.fail(NodeError::InvalidBody {
                    node: NODE,
                    message: e.to_string(),
                }));
            }
            request = request.json_body(body);
        }

        let client = self.client.clone();
        let response: Value = ctx
            .step
            .run("http-request", || async move {
                let response = client
                    .send(request)
                    .await
                    .and_then(|r| r.error_for_status())
                    .map_err(|e| request_failed(NODE, e))?;

                let data = if response.is_json() {
                    response.json().map_err(|e| request_failed(NODE, e))?
                } else {
                    Value::String(response.body.clone())
                };

                Ok(json!({
                    "status": response.status,
                    "statusText": response.status_text,
                    "data": data,
                }))
            })
            .await
            .map_err(|e| ctx.fail(e))?;

        ctx.status.success();
        Ok(ctx
            .context
            .with(variable_name, json!({ "httpResponse": response })))
    }

    fn metadata(&self) -> ExecutorMetadata {
        ExecutorMetadata {
            description: "Make HTTP requests",
            category: "http",
        }
    }
}
