//! MCP (Model Context Protocol) server implementation.
//!
//! This module exposes the tasks of a Taskfile to MCP clients.

#[cfg(feature = "mcp")]
pub mod taskfile_server;

#[cfg(feature = "mcp")]
pub use taskfile_server::{serve_stdio, TaskfileServer, SERVER_NAME};
