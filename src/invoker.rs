//! Runs the `oc` CLI and captures its standard output.
//!
//! Commands are always spawned with structured argv (never through a shell), so
//! credential values containing quotes, `$`, backticks or leading dashes reach
//! the CLI unchanged.

use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::io::AsyncReadExt;
use tokio::process::Command;

use crate::credentials::Credentials;
use crate::error::OcError;

/// Append credential flags (if any) to `base`.
///
/// `--username <u> --password <p>` is added only when `credentials` resolves to
/// a pair; a `FromFile` source is resolved here.
pub async fn command_with_credentials(
    base: &[String],
    credentials: &Credentials,
) -> crate::Result<Vec<String>> {
    let mut command = base.to_vec();
    command.extend(credentials.flags().await?);
    Ok(command)
}

/// Run `command` with no timeout and return its stdout.
pub async fn stdout_of(command: &[String]) -> crate::Result<String> {
    CommandRunner::default().stdout_of(command).await
}

/// Spawns commands and collects their output.
#[derive(Debug, Clone, Default)]
pub struct CommandRunner {
    timeout: Option<Duration>,
}

impl CommandRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Kill the child and fail with `OcError::Timeout` if it runs longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Run `command[0]` with `command[1..]` as arguments and return stdout as text.
    ///
    /// Non-zero exit codes return `OcError::Execution` with the captured output.
    pub async fn stdout_of(&self, command: &[String]) -> crate::Result<String> {
        let Some((program, args)) = command.split_first() else {
            return Err(OcError::InvalidConfig("command must not be empty".to_string()));
        };

        let start = Instant::now();

        let mut cmd = Command::new(program);
        cmd.args(args);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| OcError::Spawn(program.clone(), e))?;

        // Take pipes so child stays borrowable for kill() on timeout
        let stdout_pipe = child.stdout.take();
        let stderr_pipe = child.stderr.take();

        let collect = async {
            let mut stdout_bytes = Vec::new();
            let mut stderr_bytes = Vec::new();
            let read_stdout = async {
                if let Some(mut out) = stdout_pipe {
                    out.read_to_end(&mut stdout_bytes).await?;
                }
                Ok::<(), std::io::Error>(())
            };
            let read_stderr = async {
                if let Some(mut err) = stderr_pipe {
                    err.read_to_end(&mut stderr_bytes).await?;
                }
                Ok::<(), std::io::Error>(())
            };
            tokio::try_join!(read_stdout, read_stderr)?;
            let status = child.wait().await?;
            Ok::<_, std::io::Error>((status, stdout_bytes, stderr_bytes))
        };

        let outcome = match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, collect)
                .await
                .map_err(|_elapsed| timeout),
            None => Ok(collect.await),
        };
        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(timeout) => {
                // Kill the process itself, not just the future
                let _ = child.kill().await;
                return Err(OcError::Timeout(program.clone(), timeout));
            }
        };
        let (status, stdout_bytes, stderr_bytes) =
            outcome.map_err(|e| OcError::Io(program.clone(), e))?;

        let stdout = String::from_utf8_lossy(&stdout_bytes).into_owned();
        let stderr = String::from_utf8_lossy(&stderr_bytes).into_owned();

        tracing::info!(
            command = %program,
            args = ?redact(args),
            exit_code = ?status.code(),
            duration_ms = %start.elapsed().as_millis(),
            "oc invocation"
        );

        if !stderr.is_empty() {
            tracing::debug!(command = %program, stderr = %stderr, "oc stderr");
        }

        if !status.success() {
            return Err(OcError::Execution {
                command: program.clone(),
                code: status.code(),
                stdout,
                stderr,
            });
        }

        Ok(stdout)
    }
}

/// Copy of `args` with the value following `--password` masked, for logging.
fn redact(args: &[String]) -> Vec<&str> {
    let mut redacted = Vec::with_capacity(args.len());
    let mut mask_next = false;
    for arg in args {
        if mask_next {
            redacted.push("***");
            mask_next = false;
        } else {
            redacted.push(arg.as_str());
            mask_next = arg == "--password";
        }
    }
    redacted
}
