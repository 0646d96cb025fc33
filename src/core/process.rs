//! Process execution utilities with timeout support
//!
//! Provides helpers for running external processes (yt-dlp, ffmpeg, ffprobe)
//! with configurable timeouts and an optional cancellation token, so a hung
//! tool never blocks a user's download forever.

use std::process::Output;
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// Why an external tool did not produce an `Output`.
///
/// A non-zero exit is not an error here: callers inspect `Output::status`.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("failed to launch {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} timed out after {}s", .timeout.as_secs())]
    TimedOut { tool: String, timeout: Duration },

    #[error("{tool} was cancelled")]
    Cancelled { tool: String },
}

fn program_name(cmd: &Command) -> String {
    cmd.as_std().get_program().to_string_lossy().into_owned()
}

/// Run an async Command with a timeout and an optional cancellation signal.
///
/// The child is spawned with `kill_on_drop`, so when the timeout fires or the
/// token is cancelled the process is killed rather than left running.
pub async fn run_with_timeout(
    cmd: &mut Command,
    timeout: Duration,
    cancel: Option<&CancellationToken>,
) -> Result<Output, ToolError> {
    let tool = program_name(cmd);
    cmd.kill_on_drop(true);

    let run = tokio::time::timeout(timeout, cmd.output());
    let result = match cancel {
        Some(token) => {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    log::info!("{} cancelled by user", tool);
                    return Err(ToolError::Cancelled { tool });
                }
                result = run => result,
            }
        }
        None => run.await,
    };

    match result {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(source)) => Err(ToolError::Spawn { tool, source }),
        Err(_) => {
            log::error!("{} timed out after {}s, killed", tool, timeout.as_secs());
            Err(ToolError::TimedOut { tool, timeout })
        }
    }
}

/// Returns the first line of `<bin> <version_flag>` output, if the tool runs.
pub async fn tool_version(bin: &str, version_flag: &str) -> Option<String> {
    let output = run_with_timeout(
        Command::new(bin).arg(version_flag),
        Duration::from_secs(10),
        None,
    )
    .await
    .ok()?;

    if !output.status.success() {
        return None;
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(|line| line.trim().to_string())
}

/// Last lines of a tool's stderr, for log messages.
pub fn stderr_tail(output: &Output, max_lines: usize) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let lines: Vec<&str> = stderr.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(max_lines);
    lines[start..].join("\n")
}
