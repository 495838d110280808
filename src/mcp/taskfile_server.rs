//! MCP server exposing Taskfile tasks as tools.
//!
//! The tool list is fixed at startup, so `list_tools` and `call_tool` are
//! implemented directly on the handler instead of through a static tool box.

use crate::bootstrap::Bootstrap;
use crate::error::{Error, Result};
use crate::invoke::{invoke_task, InvocationResult};
use crate::mcp_logging::ToolCallGuard;
use crate::registry::{ToolRegistration, ToolRegistry};
use crate::traits::TaskExecutor;
use rmcp::model::{
    CallToolRequestParam, CallToolResult, Content, Implementation, ListToolsResult,
    PaginatedRequestParam, ProtocolVersion, ServerCapabilities, ServerInfo, Tool,
};
use rmcp::service::RequestContext;
use rmcp::Error as McpError;
use rmcp::{RoleServer, ServiceExt};
use serde_json::{Map, Value};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Name reported in the MCP handshake.
pub const SERVER_NAME: &str = "taskfile-mcp-server";

/// Instructions for the MCP server, shown to agents using this server.
const INSTRUCTIONS: &str = "Each tool runs the Taskfile task of the same name in the project \
directory. Tool arguments are passed to the task as variables; omitted variables keep the \
Taskfile defaults shown in each parameter description. The response starts with a status line \
and includes the task's Output and Errors when it printed any. A failed task is reported as an \
error result, not a protocol error.";

/// MCP server for Taskfile tasks.
pub struct TaskfileServer<E> {
    registry: Arc<ToolRegistry>,
    executor: Arc<E>,
    workdir: Arc<PathBuf>,
}

impl<E> Clone for TaskfileServer<E> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            executor: Arc::clone(&self.executor),
            workdir: Arc::clone(&self.workdir),
        }
    }
}

/// Describe a registration as an MCP tool.
fn tool_for(registration: &ToolRegistration) -> Tool {
    Tool::new(
        registration.name.clone(),
        registration.description.clone(),
        Arc::new(registration.schema.to_json_schema()),
    )
}

/// Turn an invocation result into a tool response.
///
/// Task failure is an error *result*, which the client shows to the model.
fn to_call_result(result: &InvocationResult) -> CallToolResult {
    let content = vec![Content::text(result.message())];
    if result.is_success() {
        CallToolResult::success(content)
    } else {
        CallToolResult::error(content)
    }
}

impl<E: TaskExecutor> TaskfileServer<E> {
    /// Create a server for a registry of tools run in `workdir`.
    pub fn new(registry: ToolRegistry, workdir: impl Into<PathBuf>, executor: E) -> Self {
        Self {
            registry: Arc::new(registry),
            executor: Arc::new(executor),
            workdir: Arc::new(workdir.into()),
        }
    }

    /// Create a server from the startup state.
    pub fn from_bootstrap(bootstrap: Bootstrap, executor: E) -> Self {
        Self::new(bootstrap.registry, bootstrap.workdir, executor)
    }

    /// The working directory tasks run in.
    #[must_use]
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Every tool, in name order.
    #[must_use]
    pub fn tools(&self) -> Vec<Tool> {
        self.registry.iter().map(tool_for).collect()
    }

    /// Run the tool `name`.
    ///
    /// # Errors
    ///
    /// Returns an `invalid_params` error if no such tool is registered. Task
    /// failures are returned as error results, never as `Err`.
    pub async fn call<C>(
        &self,
        name: &str,
        arguments: Option<&Map<String, Value>>,
        cancelled: C,
    ) -> std::result::Result<CallToolResult, McpError>
    where
        C: Future<Output = ()> + Send,
    {
        if self.registry.get(name).is_none() {
            return Err(McpError::invalid_params(format!("Unknown tool: {name}"), None));
        }

        let mut guard = ToolCallGuard::new(name);
        let result =
            invoke_task(self.executor.as_ref(), &self.workdir, name, arguments, cancelled).await;
        if !result.is_success() {
            guard.mark_error();
        }

        Ok(to_call_result(&result))
    }
}

impl<E: TaskExecutor> rmcp::ServerHandler for TaskfileServer<E> {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            instructions: Some(INSTRUCTIONS.to_string()),
        }
    }

    fn list_tools(
        &self,
        _request: PaginatedRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> impl Future<Output = std::result::Result<ListToolsResult, McpError>> + Send + '_ {
        std::future::ready(Ok(ListToolsResult { next_cursor: None, tools: self.tools() }))
    }

    #[allow(clippy::manual_async_fn)]
    fn call_tool(
        &self,
        request: CallToolRequestParam,
        context: RequestContext<RoleServer>,
    ) -> impl Future<Output = std::result::Result<CallToolResult, McpError>> + Send + '_ {
        async move {
            let ct = context.ct;
            self.call(&request.name, request.arguments.as_ref(), ct.cancelled()).await
        }
    }
}

/// Serve over stdio until the client disconnects or the process is interrupted.
///
/// # Errors
///
/// Returns an error if the transport fails to start or aborts.
pub async fn serve_stdio<E: TaskExecutor>(server: TaskfileServer<E>) -> Result<()> {
    let service = server
        .serve(rmcp::transport::stdio())
        .await
        .map_err(|e| Error::Transport(e.to_string()))?;
    tracing::info!("MCP server running on stdio");

    tokio::select! {
        quit = service.waiting() => {
            let reason = quit.map_err(|e| Error::Transport(e.to_string()))?;
            tracing::info!(reason = ?reason, "transport closed");
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            tracing::info!("interrupted, shutting down");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taskfile::parse;
    use crate::testing::MockExecutor;
    use rmcp::ServerHandler;
    use serde_json::json;
    use std::future::pending;

    fn server(yaml: &str) -> TaskfileServer<MockExecutor> {
        let manifest = parse(yaml).unwrap();
        let registry = ToolRegistry::from_manifest(&manifest).unwrap();
        TaskfileServer::new(registry, "/project", MockExecutor::new())
    }

    fn response(result: &CallToolResult) -> (bool, String) {
        let value = serde_json::to_value(result).unwrap();
        let is_error = value["isError"].as_bool().unwrap_or(false);
        let text = value["content"][0]["text"].as_str().unwrap().to_string();
        (is_error, text)
    }

    const TASKFILE: &str = r"
version: '3'
vars:
  ENV: dev
tasks:
  build:
    desc: Build it
  greet:
    vars:
      NAME: world
  ':internal-helper': echo helper
";

    #[test]
    fn test_tools_listed_in_name_order() {
        let server = server(TASKFILE);
        let names: Vec<String> = server.tools().iter().map(|t| t.name.to_string()).collect();
        assert_eq!(names, ["build", "greet"]);
    }

    #[test]
    fn test_tool_json_shape() {
        let server = server(TASKFILE);
        let tools = server.tools();
        let greet = serde_json::to_value(&tools[1]).unwrap();

        assert_eq!(greet["name"], "greet");
        assert_eq!(greet["description"], "Execute task: greet");
        assert_eq!(
            greet["inputSchema"],
            json!({
                "type": "object",
                "properties": {
                    "ENV": { "type": "string", "description": "Variable: ENV (default: dev)" },
                    "NAME": { "type": "string", "description": "Variable: NAME (default: world)" }
                }
            })
        );
        let build = serde_json::to_value(&tools[0]).unwrap();
        assert_eq!(build["description"], "Build it");
    }

    #[test]
    fn test_get_info() {
        let info = server(TASKFILE).get_info();
        assert_eq!(info.server_info.name, SERVER_NAME);
        assert!(info.capabilities.tools.is_some());
        assert!(info.instructions.is_some());
    }

    #[tokio::test]
    async fn test_call_success() {
        let server = server(TASKFILE);
        server.executor.expect_success("greet", "hello bob\n", "");
        let arguments = json!({ "NAME": "bob" });

        let result = server.call("greet", arguments.as_object(), pending()).await.unwrap();

        let (is_error, text) = response(&result);
        assert!(!is_error);
        assert_eq!(text, "Task 'greet' completed successfully.\n\nOutput:\nhello bob\n");
        assert_eq!(server.executor.calls()[0].vars.get("NAME"), Some("bob"));
    }

    #[tokio::test]
    async fn test_call_failure_is_error_result() {
        let server = server(TASKFILE);
        server.executor.expect_failure("build", "exit status 1", "", "");

        let result = server.call("build", None, pending()).await.unwrap();

        let (is_error, text) = response(&result);
        assert!(is_error);
        assert!(text.contains("build"));
        assert!(text.contains("exit status 1"));
    }

    #[tokio::test]
    async fn test_unknown_tool_is_protocol_error() {
        let server = server(TASKFILE);
        let err = server.call("deploy", None, pending()).await.unwrap_err();
        assert!(err.message.contains("deploy"));
        assert!(server.executor.calls().is_empty());
    }

    #[tokio::test]
    async fn test_internal_task_not_callable() {
        let server = server(TASKFILE);
        assert!(server.call(":internal-helper", None, pending()).await.is_err());
    }

    #[tokio::test]
    async fn test_cancelled_call_still_answers() {
        let server = server(TASKFILE);
        server.executor.expect_hang("build", "");

        let result = server.call("build", None, std::future::ready(())).await.unwrap();

        let (is_error, text) = response(&result);
        assert!(is_error);
        assert!(text.contains("task cancelled"));
    }

    #[tokio::test]
    async fn test_concurrent_calls_keep_output_apart() {
        let server = server(TASKFILE);
        server.executor.expect_success("build", "built\n", "");
        server.executor.expect_success("greet", "hello\n", "");

        let other = server.clone();
        let (build, greet) = tokio::join!(
            tokio::spawn(async move { other.call("build", None, pending()).await }),
            server.call("greet", None, pending()),
        );

        let (_, build_text) = response(&build.unwrap().unwrap());
        let (_, greet_text) = response(&greet.unwrap());
        assert!(build_text.contains("built") && !build_text.contains("hello"));
        assert!(greet_text.contains("hello") && !greet_text.contains("built"));
    }
}
