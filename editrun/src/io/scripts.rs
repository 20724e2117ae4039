//! Script and test execution for edited files.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, instrument, warn};

use crate::core::types::StageReport;
use crate::io::config::EditrunConfig;
use crate::io::process::run_command_with_timeout;

/// One script or test file to execute.
#[derive(Debug, Clone)]
pub struct ScriptInvocation {
    pub workdir: PathBuf,
    /// Path of the script or test file, as passed on the command line.
    pub path: PathBuf,
}

/// Abstraction over script/test execution backends.
///
/// As with [`crate::io::editor::Editor`], `Err` means the process could not
/// be run; a failing script or test is an `Ok` report with `success = false`.
pub trait ScriptRunner {
    fn run_script(&self, request: &ScriptInvocation) -> Result<StageReport>;
    fn run_tests(&self, request: &ScriptInvocation) -> Result<StageReport>;
}

/// Runs scripts with an interpreter and tests with a test-runner command.
pub struct CommandScriptRunner {
    interpreter: Vec<String>,
    script_timeout: Duration,
    test_command: Vec<String>,
    test_timeout: Duration,
    output_limit_bytes: usize,
}

impl CommandScriptRunner {
    pub fn new(config: &EditrunConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            interpreter: config.scripts.interpreter.clone(),
            script_timeout: config.scripts.timeout(),
            test_command: config.tests.command.clone(),
            test_timeout: config.tests.timeout(),
            output_limit_bytes: config.output_limit_bytes,
        })
    }

    fn run(
        &self,
        label: &str,
        program: &[String],
        target: &Path,
        workdir: &Path,
        timeout: Duration,
    ) -> Result<StageReport> {
        let mut cmd = Command::new(&program[0]);
        cmd.args(&program[1..]).arg(target).current_dir(workdir);
        let capture = run_command_with_timeout(cmd, timeout, self.output_limit_bytes)
            .with_context(|| format!("run {label} {}", target.display()))?;
        if capture.success() {
            debug!(label, "completed successfully");
        } else {
            warn!(
                label,
                exit_code = ?capture.status.code(),
                timed_out = capture.timed_out,
                "failed"
            );
        }
        Ok(capture.into_report(timeout))
    }
}

impl ScriptRunner for CommandScriptRunner {
    #[instrument(skip_all, fields(path = %request.path.display()))]
    fn run_script(&self, request: &ScriptInvocation) -> Result<StageReport> {
        self.run(
            "script",
            &self.interpreter,
            &request.path,
            &request.workdir,
            self.script_timeout,
        )
    }

    #[instrument(skip_all, fields(path = %request.path.display()))]
    fn run_tests(&self, request: &ScriptInvocation) -> Result<StageReport> {
        self.run(
            "tests",
            &self.test_command,
            &request.path,
            &request.workdir,
            self.test_timeout,
        )
    }
}
