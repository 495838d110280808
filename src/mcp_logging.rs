//! Logging for the MCP server.
//!
//! Stdout carries the MCP protocol, so logs go to stderr or to a log file.
//! Events are emitted through `tracing`; this module installs the subscriber,
//! a panic hook, and a guard that times tool calls.

use crate::error::{Error, Result};
use std::fs::{self, File, OpenOptions};
use std::panic;
use std::path::Path;
use std::sync::Mutex;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Maximum log file size before rotation (1MB).
const MAX_LOG_SIZE: u64 = 1_048_576;

/// Parse a filter directive such as `info` or `taskfile_mcp=debug`.
///
/// # Errors
///
/// Returns an error if the directive is malformed.
pub fn build_filter(directive: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(directive).map_err(|e| Error::Logging(e.to_string()))
}

/// Open the log file for appending, rotating it first if it grew too large.
///
/// # Errors
///
/// Returns an error if the file or its parent directory cannot be created.
pub fn open_log_file(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    if let Ok(metadata) = fs::metadata(path) {
        if metadata.len() > MAX_LOG_SIZE {
            let backup = path.with_extension("log.old");
            let _ = fs::rename(path, backup);
        }
    }

    OpenOptions::new().create(true).append(true).open(path)
}

/// Install the global subscriber.
///
/// Logs go to `log_file` when given, otherwise to stderr.
///
/// # Errors
///
/// Returns an error if the filter is malformed, the log file cannot be opened,
/// or a subscriber is already installed.
pub fn init(log_level: &str, log_file: Option<&Path>) -> Result<()> {
    let filter = build_filter(log_level)?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_ansi(false);

    let installed = match log_file {
        Some(path) => builder.with_writer(Mutex::new(open_log_file(path)?)).try_init(),
        None => builder.with_writer(std::io::stderr).try_init(),
    };
    installed.map_err(|e| Error::Logging(e.to_string()))?;

    tracing::info!(version = crate::VERSION, "MCP server starting");
    Ok(())
}

/// Log a panic with its location.
#[allow(deprecated)] // PanicInfo is deprecated but PanicHookInfo requires Rust 1.81+
fn log_panic(info: &panic::PanicInfo<'_>) {
    let location = format_panic_location(info.location());

    let payload = info
        .payload()
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| info.payload().downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string());

    tracing::error!(location = %location, "PANIC: {payload}");
}

/// Format a panic location for logging.
fn format_panic_location(location: Option<&panic::Location<'_>>) -> String {
    location.map_or_else(
        || "unknown".to_string(),
        |loc| format!("{}:{}:{}", loc.file(), loc.line(), loc.column()),
    )
}

/// Install a panic hook that logs panics before the default handling.
///
/// This should be called after `init()`.
pub fn install_panic_hook() {
    let original_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        log_panic(info);
        original_hook(info);
    }));

    tracing::debug!("panic hook installed");
}

/// A guard that logs tool call duration when dropped.
///
/// ```ignore
/// let mut guard = ToolCallGuard::new("build");
/// // ... run the task ...
/// if failed { guard.mark_error(); }
/// ```
pub struct ToolCallGuard {
    tool_name: String,
    start: Instant,
    success: bool,
}

impl ToolCallGuard {
    /// Create a new tool call guard and log the start.
    #[must_use]
    pub fn new(tool_name: &str) -> Self {
        tracing::info!(tool = tool_name, "TOOL_START");
        Self { tool_name: tool_name.to_string(), start: Instant::now(), success: true }
    }

    /// Mark the tool call as failed.
    pub fn mark_error(&mut self) {
        self.success = false;
    }
}

impl Drop for ToolCallGuard {
    fn drop(&mut self) {
        let duration_ms = u64::try_from(self.start.elapsed().as_millis()).unwrap_or(u64::MAX);
        let status = if self.success { "OK" } else { "ERROR" };
        tracing::info!(tool = %self.tool_name, duration_ms, "TOOL_END [{status}]");
    }
}
