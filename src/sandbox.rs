//! Sandboxed execution of model-emitted code.
//!
//! One snippet per invocation, bounded by a wall-clock timeout, run with a
//! cleared environment in a scratch directory. Every failure mode of the
//! code under test — nonzero exit, timeout, even a missing interpreter — is
//! reported in the structured [`ExecutionResult`] so the environment can
//! always append a tool message to the trajectory.

use crate::config::SandboxConfig;
use crate::models::ExecutionResult;
use crate::Result;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

pub struct SandboxExecutor {
    config: SandboxConfig,
}

impl SandboxExecutor {
    #[tracing::instrument(skip_all)]
    pub fn new(config: SandboxConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    /// Execute one snippet. Independent per invocation; safe to call
    /// concurrently. Never returns `Err` for code under test.
    #[tracing::instrument(skip_all)]
    pub async fn execute(&self, code: &str) -> ExecutionResult {
        let mut cmd = Command::new(&self.config.interpreter);
        cmd.args(&self.config.args)
            .current_dir(std::env::temp_dir())
            .env_clear()
            .env("PATH", "/usr/local/bin:/usr/bin:/bin")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                return ExecutionResult {
                    error: Some(format!(
                        "failed to launch {}: {e}",
                        self.config.interpreter
                    )),
                    ..Default::default()
                }
            }
        };

        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(code.as_bytes()).await {
                return ExecutionResult {
                    error: Some(format!("failed to write program to stdin: {e}")),
                    ..Default::default()
                };
            }
            // Dropping stdin closes it so the interpreter sees EOF.
        }

        let timeout = Duration::from_millis(self.config.timeout_ms);
        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return ExecutionResult {
                    error: Some(format!("failed to collect output: {e}")),
                    ..Default::default()
                }
            }
            // The dropped child is killed via kill_on_drop.
            Err(_) => {
                tracing::warn!(timeout_ms = self.config.timeout_ms, "sandbox execution timed out");
                return ExecutionResult {
                    timed_out: true,
                    error: Some(format!(
                        "execution exceeded {}ms",
                        self.config.timeout_ms
                    )),
                    ..Default::default()
                };
            }
        };

        let cap = self.config.max_output_bytes;
        let stdout = truncate_output(&String::from_utf8_lossy(&output.stdout), cap);
        let stderr = truncate_output(&String::from_utf8_lossy(&output.stderr), cap);
        let error = if output.status.success() {
            None
        } else {
            Some(exception_text(&stderr, output.status.code()))
        };

        ExecutionResult {
            stdout,
            stderr,
            error,
            timed_out: false,
        }
    }
}

/// Last non-empty stderr line — for Python tracebacks this is the exception
/// itself.
fn exception_text(stderr: &str, exit_code: Option<i32>) -> String {
    stderr
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| match exit_code {
            Some(code) => format!("process exited with status {code}"),
            None => "process terminated by signal".to_string(),
        })
}

fn truncate_output(s: &str, cap: usize) -> String {
    if s.len() <= cap {
        return s.to_string();
    }
    let mut end = cap;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}\n[truncated]", &s[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    /// /bin/sh reads its program from stdin when invoked without arguments,
    /// which keeps these tests independent of any particular interpreter.
    fn sh_executor(timeout_ms: u64, max_output_bytes: usize) -> SandboxExecutor {
        SandboxExecutor::new(SandboxConfig {
            interpreter: "/bin/sh".to_string(),
            args: vec![],
            timeout_ms,
            max_output_bytes,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn captures_stdout() {
        let result = sh_executor(5_000, 16 * 1024).execute("echo 7").await;
        assert_eq!(result.stdout.trim(), "7");
        assert!(result.error.is_none());
        assert!(!result.timed_out);
    }

    #[tokio::test]
    async fn nonzero_exit_reports_error_without_raising() {
        let result = sh_executor(5_000, 16 * 1024)
            .execute("definitely_not_a_command_xyz")
            .await;
        assert!(result.error.is_some());
        assert!(!result.stderr.is_empty());
        assert!(!result.timed_out);
    }

    #[tokio::test]
    async fn timeout_is_reported_not_raised() {
        let result = sh_executor(200, 16 * 1024).execute("sleep 5").await;
        assert!(result.timed_out);
        assert!(result.error.is_some());
    }

    #[tokio::test]
    async fn oversized_stdout_is_truncated() {
        let result = sh_executor(5_000, 64)
            .execute("i=0; while [ $i -lt 100 ]; do echo aaaaaaaaaaaaaaaa; i=$((i+1)); done")
            .await;
        assert!(result.stdout.ends_with("[truncated]"));
        assert!(result.stdout.len() < 100);
    }

    #[tokio::test]
    async fn missing_interpreter_is_a_structured_error() {
        let executor = SandboxExecutor::new(SandboxConfig {
            interpreter: "/nonexistent/interpreter".to_string(),
            args: vec![],
            ..Default::default()
        })
        .unwrap();
        let result = executor.execute("echo hi").await;
        assert!(result.error.unwrap().contains("failed to launch"));
    }
}
