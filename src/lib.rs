//! # `taskfile_mcp`
//!
//! Exposes the tasks of a Taskfile as MCP tools. Each public task becomes one
//! tool whose parameters are the task's variables; calling the tool runs the
//! task once and returns its status and output.

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod executor;
pub mod invoke;
pub mod mcp;
pub mod mcp_logging;
pub mod registry;
pub mod schema;
pub mod taskfile;
pub mod testing;
pub mod traits;

pub use bootstrap::Bootstrap;
pub use config::ServerConfig;
pub use error::{Error, Result};
pub use executor::TaskCli;
pub use invoke::{invoke_task, InvocationResult, VariableBindings};
pub use registry::{ToolRegistration, ToolRegistry};
pub use traits::{ExecutionContext, TaskCall, TaskExecutor};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
