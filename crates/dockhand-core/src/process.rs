//! External process invocation.
//!
//! Pull, CLI inspection, file copy and directory listing go through the
//! engine's command-line client rather than the HTTP API. The
//! [`CommandRunner`] trait is the seam: [`TokioCommandRunner`] spawns real
//! processes, tests substitute a recording fake.

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};

use crate::BoxFuture;

/// Errors from running an external process.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("{context} failed ({status}): {stderr}")]
    Failed {
        context: String,
        status: i32,
        stderr: String,
    },
}

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code, `-1` when the process was terminated by a signal.
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }

    /// Convert a non-zero exit into [`ProcessError::Failed`], embedding the
    /// captured stderr.
    pub fn check(self, context: impl Into<String>) -> Result<Self, ProcessError> {
        if self.success() {
            Ok(self)
        } else {
            Err(ProcessError::Failed {
                context: context.into(),
                status: self.status,
                stderr: self.stderr.trim().to_string(),
            })
        }
    }

    fn from_std(status: ExitStatus, stdout: Vec<u8>, stderr: Vec<u8>) -> Self {
        Self {
            status: status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
        }
    }
}

/// Runs an argv to completion and captures its output.
///
/// A non-zero exit is not an error at this level; callers decide with
/// [`ProcessOutput::check`].
pub trait CommandRunner: Send + Sync {
    fn run<'a>(&'a self, argv: &'a [String]) -> BoxFuture<'a, Result<ProcessOutput, ProcessError>>;
}

/// [`CommandRunner`] backed by `tokio::process`.
#[derive(Debug, Clone, Default)]
pub struct TokioCommandRunner {
    /// Working directory for spawned processes, inherited when `None`.
    cwd: Option<PathBuf>,
}

impl TokioCommandRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }
}

impl CommandRunner for TokioCommandRunner {
    fn run<'a>(&'a self, argv: &'a [String]) -> BoxFuture<'a, Result<ProcessOutput, ProcessError>> {
        Box::pin(async move {
            let Some((program, args)) = argv.split_first() else {
                return Err(ProcessError::Spawn {
                    program: String::new(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        "empty command line",
                    ),
                });
            };

            tracing::debug!(program = %program, args = ?args, "spawning process");

            let mut command = tokio::process::Command::new(program);
            command
                .args(args)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true);
            if let Some(cwd) = &self.cwd {
                command.current_dir(cwd);
            }

            let output = command
                .output()
                .await
                .map_err(|source| ProcessError::Spawn {
                    program: program.clone(),
                    source,
                })?;

            let output = ProcessOutput::from_std(output.status, output.stdout, output.stderr);
            tracing::debug!(program = %program, status = output.status, "process exited");
            Ok(output)
        })
    }
}
