//! Timeout-bounded execution of generated programs.
//!
//! Each run gets its own temporary directory holding the program, the
//! captured stderr and any artifact files the program writes. The directory
//! is removed when the [`Sandbox`] is dropped, on every exit path.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    process::Stdio,
    time::Duration,
};

use async_trait::async_trait;
use rustc_hash::FxHashMap;
use serde::Serialize;
use tempfile::TempDir;
use thiserror::Error;
use tokio::process::Command;

use crate::config::AnalyzerConfig;

pub const PROGRAM_FILE: &str = "program.py";
pub const ERRORS_FILE: &str = "errors.log";

#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("sandbox io failed: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to spawn interpreter '{program}'")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

impl SandboxError {
    fn io(context: impl Into<String>) -> impl FnOnce(std::io::Error) -> Self {
        let context = context.into();
        move |source| SandboxError::Io { context, source }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionOutcome {
    Completed,
    TimedOut,
    RuntimeFault(String),
}

/// Outcome of one run plus the artifact files that were requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxReport {
    pub outcome: ExecutionOutcome,
    artifacts: FxHashMap<String, String>,
}

impl SandboxReport {
    pub fn new(outcome: ExecutionOutcome) -> Self {
        Self {
            outcome,
            artifacts: FxHashMap::default(),
        }
    }

    pub fn with_artifact(mut self, name: impl Into<String>, content: impl Into<String>) -> Self {
        self.artifacts.insert(name.into(), content.into());
        self
    }

    /// Contents of an artifact the program wrote, if it exists.
    pub fn artifact(&self, name: &str) -> Option<&str> {
        self.artifacts.get(name).map(String::as_str)
    }
}

/// Runs a program and reports how it ended.
#[async_trait]
pub trait ProgramRunner: Send + Sync {
    /// `artifacts` names files in the working directory to collect after
    /// the run.
    async fn run(&self, program: &str, artifacts: &[&str]) -> Result<SandboxReport, SandboxError>;
}

/// [`ProgramRunner`] backed by a fresh [`Sandbox`] per call.
#[derive(Debug, Clone)]
pub struct SandboxRunner {
    config: AnalyzerConfig,
}

impl SandboxRunner {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ProgramRunner for SandboxRunner {
    async fn run(&self, program: &str, artifacts: &[&str]) -> Result<SandboxReport, SandboxError> {
        Sandbox::create(&self.config, program)
            .await?
            .run(artifacts)
            .await
    }
}

pub struct Sandbox {
    dir: TempDir,
    python: String,
    isolated: bool,
    timeout: Duration,
}

impl Sandbox {
    pub async fn create(config: &AnalyzerConfig, program: &str) -> Result<Self, SandboxError> {
        // A single mkdir; `tempfile` has no async API.
        let dir = tempfile::Builder::new()
            .prefix("algoscope-")
            .tempdir()
            .map_err(SandboxError::io("create sandbox directory"))?;
        tokio::fs::write(dir.path().join(PROGRAM_FILE), program)
            .await
            .map_err(SandboxError::io("write program"))?;
        Ok(Self {
            dir,
            python: config.python.clone(),
            isolated: config.isolated,
            timeout: config.timeout(),
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Runs the program to completion or until the timeout fires.
    ///
    /// Dropping the returned future kills the child and removes the
    /// directory.
    pub async fn run(self, artifacts: &[&str]) -> Result<SandboxReport, SandboxError> {
        let errors = tokio::fs::File::create(self.file(ERRORS_FILE))
            .await
            .map_err(SandboxError::io("create error log"))?
            .into_std()
            .await;

        let mut command = Command::new(&self.python);
        if self.isolated {
            command.args(["-I", "-S"]);
        }
        command
            .arg(PROGRAM_FILE)
            .current_dir(self.dir.path())
            .env_clear()
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::from(errors))
            .kill_on_drop(true);
        if let Some(path) = std::env::var_os("PATH") {
            command.env("PATH", path);
        }

        let mut child = command.spawn().map_err(|source| SandboxError::Spawn {
            program: self.python.clone(),
            source,
        })?;
        let timeout_ms = self.timeout.as_millis() as u64;
        tracing::debug!(pid = child.id(), timeout_ms, dir = %self.path().display(), "sandbox started");

        // Timer first: a child finishing at the deadline still counts as timed out.
        let status = tokio::select! {
            biased;
            () = tokio::time::sleep(self.timeout) => None,
            status = child.wait() => Some(status),
        };

        let outcome = match status {
            None => {
                tracing::warn!(timeout_ms, "sandbox timed out, killing child");
                if let Err(error) = child.kill().await {
                    tracing::warn!(%error, "failed to kill timed out child");
                }
                ExecutionOutcome::TimedOut
            }
            Some(status) => {
                let status = status.map_err(SandboxError::io("wait for child"))?;
                let stderr = tokio::fs::read(self.file(ERRORS_FILE))
                    .await
                    .map_err(SandboxError::io("read error log"))?;
                let stderr = String::from_utf8_lossy(&stderr);
                tracing::debug!(%status, stderr_bytes = stderr.len(), "sandbox finished");
                if !stderr.is_empty() {
                    ExecutionOutcome::RuntimeFault(stderr.trim_end().to_string())
                } else if !status.success() {
                    ExecutionOutcome::RuntimeFault(status.to_string())
                } else {
                    ExecutionOutcome::Completed
                }
            }
        };

        let mut report = SandboxReport::new(outcome);
        for &name in artifacts {
            match tokio::fs::read_to_string(self.file(name)).await {
                Ok(content) => report = report.with_artifact(name, content),
                Err(error) if error.kind() == ErrorKind::NotFound => {}
                Err(source) => {
                    return Err(SandboxError::Io {
                        context: format!("read artifact {name}"),
                        source,
                    });
                }
            }
        }
        Ok(report)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn config(timeout_ms: u64) -> Option<AnalyzerConfig> {
        let Some(python) = test_support::detect_python_interpreter() else {
            assert!(
                !test_support::python_required(),
                "python interpreter required but not found"
            );
            eprintln!("skipping sandbox test: no python interpreter found");
            return None;
        };
        Some(AnalyzerConfig {
            python,
            timeout_ms,
            isolated: true,
        })
    }

    async fn run(program: &str, timeout_ms: u64, artifacts: &[&str]) -> Option<SandboxReport> {
        let config = config(timeout_ms)?;
        Some(
            SandboxRunner::new(config)
                .run(program, artifacts)
                .await
                .expect("sandbox should run"),
        )
    }

    #[tokio::test]
    async fn completes_clean_program() {
        let Some(report) = run("x = 1\n", 5_000, &[]).await else {
            return;
        };
        assert_eq!(report.outcome, ExecutionOutcome::Completed);
    }

    #[tokio::test]
    async fn stderr_output_is_a_runtime_fault() {
        let Some(report) = run("raise ValueError('boom')\n", 5_000, &[]).await else {
            return;
        };
        let ExecutionOutcome::RuntimeFault(message) = report.outcome else {
            panic!("expected runtime fault, got {:?}", report.outcome);
        };
        assert!(message.contains("ValueError: boom"), "{message}");
    }

    #[tokio::test]
    async fn silent_nonzero_exit_is_a_runtime_fault() {
        let Some(report) = run("import sys\nsys.exit(3)\n", 5_000, &[]).await else {
            return;
        };
        assert!(matches!(
            report.outcome,
            ExecutionOutcome::RuntimeFault(message) if message.contains('3')
        ));
    }

    #[tokio::test]
    async fn endless_loop_times_out() {
        let Some(report) = run("while True:\n    pass\n", 200, &[]).await else {
            return;
        };
        assert_eq!(report.outcome, ExecutionOutcome::TimedOut);
    }

    #[tokio::test]
    async fn collects_requested_artifacts() {
        let program = "handle = open('out.txt', 'w')\nhandle.write('1')\nhandle.close()\n";
        let Some(report) = run(program, 5_000, &["out.txt", "missing.txt"]).await else {
            return;
        };
        assert_eq!(report.artifact("out.txt"), Some("1"));
        assert_eq!(report.artifact("missing.txt"), None);
    }

    #[tokio::test]
    async fn environment_is_cleared() {
        let program = "import os\nhandle = open('env.txt', 'w')\nhandle.write(str('HOME' in os.environ))\nhandle.close()\n";
        let Some(report) = run(program, 5_000, &["env.txt"]).await else {
            return;
        };
        assert_eq!(report.artifact("env.txt"), Some("False"));
    }

    #[tokio::test]
    async fn directory_is_removed_after_run() {
        let Some(config) = config(5_000) else {
            return;
        };
        let sandbox = Sandbox::create(&config, "x = 1\n")
            .await
            .expect("sandbox should be created");
        let path = sandbox.path().to_path_buf();
        assert!(path.join(PROGRAM_FILE).exists());
        sandbox.run(&[]).await.expect("sandbox should run");
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn concurrent_sandboxes_do_not_share_storage() {
        let config = AnalyzerConfig::default();
        let (first, second) = tokio::join!(
            Sandbox::create(&config, "a = 1\n"),
            Sandbox::create(&config, "b = 2\n"),
        );
        let (first, second) = (first.expect("first sandbox"), second.expect("second sandbox"));
        assert_ne!(first.path(), second.path());
        assert_eq!(
            tokio::fs::read_to_string(first.path().join(PROGRAM_FILE))
                .await
                .expect("first program"),
            "a = 1\n"
        );
    }

    #[tokio::test]
    async fn missing_interpreter_is_a_spawn_error() {
        let config = AnalyzerConfig {
            python: "/nonexistent/algoscope-python".into(),
            ..AnalyzerConfig::default()
        };
        let result = SandboxRunner::new(config).run("x = 1\n", &[]).await;
        assert!(matches!(result, Err(SandboxError::Spawn { .. })));
    }
}
