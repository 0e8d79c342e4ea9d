//! Recording [`CommandRunner`] for engine operations that shell out.

use std::sync::Mutex;

use dockhand_core::{BoxFuture, CommandRunner, ProcessError, ProcessOutput};

/// Records every argv and answers with canned output.
///
/// Outputs are chosen by the engine CLI subcommand (`argv[1]`, e.g. `pull`,
/// `cp`, `exec`); unknown subcommands succeed with empty output.
#[derive(Default)]
pub struct RecordingRunner {
    outputs: Mutex<Vec<(String, ProcessOutput)>>,
    calls: Mutex<Vec<Vec<String>>>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `subcommand` with `output`.
    pub fn respond(self, subcommand: &str, output: ProcessOutput) -> Self {
        self.outputs
            .lock()
            .expect("outputs poisoned")
            .push((subcommand.to_string(), output));
        self
    }

    /// Answer `subcommand` with a successful exit and `stdout`.
    pub fn stdout(self, subcommand: &str, stdout: &str) -> Self {
        self.respond(
            subcommand,
            ProcessOutput {
                status: 0,
                stdout: stdout.to_string(),
                stderr: String::new(),
            },
        )
    }

    /// Answer `subcommand` with exit status `status` and `stderr`.
    pub fn fail(self, subcommand: &str, status: i32, stderr: &str) -> Self {
        self.respond(
            subcommand,
            ProcessOutput {
                status,
                stdout: String::new(),
                stderr: stderr.to_string(),
            },
        )
    }

    /// Every argv run so far.
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().expect("calls poisoned").clone()
    }
}

impl CommandRunner for RecordingRunner {
    fn run<'a>(&'a self, argv: &'a [String]) -> BoxFuture<'a, Result<ProcessOutput, ProcessError>> {
        self.calls.lock().expect("calls poisoned").push(argv.to_vec());
        let subcommand = argv.get(1).map(String::as_str).unwrap_or_default();
        let output = self
            .outputs
            .lock()
            .expect("outputs poisoned")
            .iter()
            .rev()
            .find(|(name, _)| name == subcommand)
            .map(|(_, output)| output.clone())
            .unwrap_or_default();
        Box::pin(async move { Ok(output) })
    }
}
