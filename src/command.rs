//! Default [`CommandRunner`] backed by `tokio::process`.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::config::LogLevel;
use crate::contract::{BoxError, CommandRunner};

/// Runs external commands as child processes.
///
/// Stdout is streamed through only at verbose log levels; stderr is streamed
/// unless logging is off entirely. The child's working directory is always
/// the explicit `dir` argument.
pub struct DefaultCommandRunner {
    stream_stdout: bool,
    stream_stderr: bool,
}

impl DefaultCommandRunner {
    pub fn new(log_level: LogLevel) -> Self {
        Self {
            stream_stdout: log_level.verbose_enabled(),
            stream_stderr: log_level.errors_enabled(),
        }
    }
}

fn split_command(command: &str) -> Result<(String, Vec<String>), BoxError> {
    let mut parts = command.split_whitespace().map(str::to_owned);
    let program = parts.next().ok_or("empty command")?;
    Ok((program, parts.collect()))
}

#[async_trait]
impl CommandRunner for DefaultCommandRunner {
    async fn run(&self, dir: &Path, command: &str) -> Result<i32, BoxError> {
        let (program, args) = split_command(command)?;
        debug!(program = %program, ?args, dir = %dir.display(), "Running command");

        let stdout = if self.stream_stdout {
            Stdio::inherit()
        } else {
            Stdio::null()
        };
        let stderr = if self.stream_stderr {
            Stdio::inherit()
        } else {
            Stdio::null()
        };

        let status = Command::new(&program)
            .args(&args)
            .current_dir(dir)
            .stdout(stdout)
            .stderr(stderr)
            .status()
            .await
            .map_err(|e| format!("failed to launch {program}: {e}"))?;

        Ok(status.code().unwrap_or(-1))
    }

    async fn capture(&self, dir: &Path, command: &str) -> Result<String, BoxError> {
        let (program, args) = split_command(command)?;
        debug!(program = %program, ?args, dir = %dir.display(), "Capturing command output");

        let output = Command::new(&program)
            .args(&args)
            .current_dir(dir)
            .output()
            .await
            .map_err(|e| format!("failed to launch {program}: {e}"))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format!(
                "{command} exited with {}: {}",
                output.status,
                stderr.trim()
            )
            .into());
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}
