//! MCP server: exposes the tool registry over rmcp.
//!
//! Malformed arguments, unknown tools and tools blocked by the current mode
//! are protocol errors (`invalid_params`). Store failures are tool results
//! with `isError: true` and the error payload as text.

use std::future::Future;
use std::sync::Arc;

use rmcp::model::{
    CallToolRequestParam, CallToolResult, Content, Implementation, JsonObject, ListToolsResult,
    PaginatedRequestParam, ServerCapabilities, ServerInfo,
};
use rmcp::service::RequestContext;
use rmcp::{ErrorData, RoleServer, ServerHandler, ServiceExt};

use crate::tools::{ToolError, ToolRegistry};

const LIMITATIONS: &str = "\
Limitations:
- Sections/headers within lists are not accessible (UI-only feature)
- Colors may shift slightly due to iCloud color space conversion
- Recurrence rules are not supported";

/// Failure to start or run the stdio service.
#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error("MCP initialization failed: {0}")]
    Initialize(String),
    #[error("MCP service stopped abnormally: {0}")]
    Service(String),
}

/// rmcp handler backed by a [`ToolRegistry`].
#[derive(Clone)]
pub struct RemindersServer {
    registry: Arc<ToolRegistry>,
}

impl RemindersServer {
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    /// Instructions text: available tools plus known limitations.
    pub fn instructions(&self) -> String {
        let mut text = String::from(
            "Access to the macOS Reminders app: read, create, update and delete \
             reminders and reminder lists.\n\nAvailable tools:\n",
        );
        for tool in self.registry.available() {
            let summary = tool
                .description()
                .split(". ")
                .next()
                .unwrap_or_default()
                .trim_end_matches('.');
            text.push_str(&format!("- {}: {}\n", tool.name(), summary));
        }
        text.push('\n');
        text.push_str(LIMITATIONS);
        text
    }

    /// Tool descriptors for `tools/list`, in name order.
    pub fn tool_descriptors(&self) -> Vec<rmcp::model::Tool> {
        self.registry
            .available()
            .iter()
            .map(|tool| {
                let schema: JsonObject = match tool.schema() {
                    serde_json::Value::Object(map) => map,
                    _ => JsonObject::new(),
                };
                rmcp::model::Tool::new(
                    tool.name().to_owned(),
                    tool.description().to_owned(),
                    Arc::new(schema),
                )
            })
            .collect()
    }

    /// Execute one tool call and map the outcome to MCP.
    pub async fn dispatch(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<CallToolResult, ErrorData> {
        let Some(tool) = self.registry.get(name) else {
            let message = if self.registry.is_blocked_by_mode(name) {
                format!("tool '{name}' is not available in read-only mode")
            } else {
                format!("unknown tool '{name}'")
            };
            return Err(ErrorData::invalid_params(message, None));
        };

        let started = std::time::Instant::now();
        match tool.execute(arguments).await {
            Ok(value) => {
                tracing::debug!(
                    tool = name,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "tool succeeded"
                );
                Ok(CallToolResult::success(vec![Content::text(value.to_string())]))
            }
            Err(ToolError::InvalidArguments(message)) => {
                tracing::debug!(tool = name, %message, "rejected malformed arguments");
                Err(ErrorData::invalid_params(
                    format!("invalid arguments for '{name}': {message}"),
                    None,
                ))
            }
            Err(ToolError::Reminders(e)) => {
                tracing::warn!(tool = name, code = e.code(), error = %e, "tool failed");
                Ok(CallToolResult::error(vec![Content::text(
                    e.to_payload().to_string(),
                )]))
            }
        }
    }

    /// Serve over stdin/stdout until the client disconnects or `shutdown`
    /// resolves.
    pub async fn serve_stdio<S>(self, shutdown: S) -> Result<(), ServeError>
    where
        S: Future<Output = ()>,
    {
        let service = self
            .serve(rmcp::transport::stdio())
            .await
            .map_err(|e| ServeError::Initialize(e.to_string()))?;
        let cancel = service.cancellation_token();

        tokio::select! {
            quit = service.waiting() => {
                let reason = quit.map_err(|e| ServeError::Service(e.to_string()))?;
                tracing::info!(?reason, "client disconnected");
            }
            () = shutdown => {
                tracing::info!("shutdown requested");
                cancel.cancel();
            }
        }
        Ok(())
    }
}

impl ServerHandler for RemindersServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: env!("CARGO_PKG_NAME").to_owned(),
                version: env!("CARGO_PKG_VERSION").to_owned(),
                ..Implementation::default()
            },
            instructions: Some(self.instructions()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..ServerInfo::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _ctx: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        Ok(ListToolsResult::with_all_items(self.tool_descriptors()))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _ctx: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        let arguments = request
            .arguments
            .map(serde_json::Value::Object)
            .unwrap_or_else(|| serde_json::Value::Object(serde_json::Map::new()));
        self.dispatch(&request.name, arguments).await
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use std::time::Duration;

    use rmcp::model::ErrorCode;
    use serde_json::json;

    use super::*;
    use crate::access::StoreAccess;
    use crate::backend::memory::MemoryConnector;
    use crate::tools::{ToolMode, build_registry};

    fn server(mode: ToolMode) -> RemindersServer {
        let store = Arc::new(StoreAccess::new(
            Arc::new(MemoryConnector::granted()),
            Duration::from_secs(5),
        ));
        RemindersServer::new(build_registry(store, mode, None))
    }

    fn text_of(result: &CallToolResult) -> serde_json::Value {
        let raw = serde_json::to_value(result).unwrap();
        let text = raw["content"][0]["text"].as_str().unwrap().to_owned();
        serde_json::from_str(&text).unwrap()
    }

    #[tokio::test]
    async fn success_is_json_text() {
        let server = server(ToolMode::Full);
        let result = server.dispatch("list_reminder_lists", json!({})).await.unwrap();
        assert_ne!(result.is_error, Some(true));
        let body = text_of(&result);
        assert_eq!(body["lists"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn store_error_is_tool_error_result() {
        let server = server(ToolMode::Full);
        let result = server
            .dispatch("get_reminder", json!({"reminder_id": "missing"}))
            .await
            .unwrap();
        assert_eq!(result.is_error, Some(true));
        let body = text_of(&result);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
        assert_eq!(body["error"]["retryable"], false);
    }

    #[tokio::test]
    async fn malformed_arguments_are_invalid_params() {
        let server = server(ToolMode::Full);
        let err = server
            .dispatch("get_reminder", json!({"reminder_id": 42}))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn unknown_and_blocked_tools_are_invalid_params() {
        let server = server(ToolMode::ReadOnly);
        let unknown = server.dispatch("nope", json!({})).await.unwrap_err();
        assert!(unknown.message.contains("unknown tool"));
        let blocked = server
            .dispatch("delete_reminder", json!({"reminder_id": "x"}))
            .await
            .unwrap_err();
        assert!(blocked.message.contains("read-only"));
    }

    #[test]
    fn descriptors_follow_mode() {
        let full = server(ToolMode::Full).tool_descriptors();
        assert_eq!(full.len(), 16);
        let read_only = server(ToolMode::ReadOnly).tool_descriptors();
        assert_eq!(read_only.len(), 5);
        assert!(read_only.iter().all(|t| !t.name.starts_with("delete")));
    }

    #[test]
    fn instructions_list_tools_and_limitations() {
        let text = server(ToolMode::Full).instructions();
        assert!(text.contains("- add_reminders:"));
        assert!(text.contains("Sections/headers"));
    }
}
