//! MCP server binary for Taskfile tasks.
//!
//! This binary loads the Taskfile of the working directory and serves its
//! tasks as MCP tools over stdio.

use clap::Parser;
use std::process::ExitCode;
use taskfile_mcp::config::Cli;
use taskfile_mcp::mcp::{serve_stdio, TaskfileServer};
use taskfile_mcp::{mcp_logging, Bootstrap, ServerConfig};

#[tokio::main]
async fn main() -> ExitCode {
    let config = ServerConfig::from(Cli::parse());

    // Stdout carries the protocol, so diagnostics go to stderr.
    if let Err(e) = mcp_logging::init(&config.log_level, config.log_file.as_deref()) {
        eprintln!("Warning: logging init failed: {e}");
    }
    mcp_logging::install_panic_hook();

    let bootstrap = match Bootstrap::load(&config) {
        Ok(bootstrap) => bootstrap,
        Err(e) => {
            tracing::error!(error = %e, "startup failed");
            eprintln!("Failed to create taskfile server: {e}");
            return ExitCode::FAILURE;
        }
    };

    let server = TaskfileServer::from_bootstrap(bootstrap, Bootstrap::executor(&config));
    match serve_stdio(server).await {
        Ok(()) => {
            tracing::info!("SHUTDOWN: normal");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "server error");
            eprintln!("Server error: {e}");
            ExitCode::FAILURE
        }
    }
}
