//! Test-only helpers: scripted collaborators, a capturing sink, and temporary
//! workspaces with real files.

use std::cell::RefCell;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{Result, anyhow};
use tempfile::TempDir;

use crate::core::error::ConfigurationError;
use crate::core::types::{ExecuteRequest, ExecutionResult, Outcome, Stage, StageReport};
use crate::io::editor::{EditInvocation, Editor};
use crate::io::recorder::{Recorder, Sink};
use crate::io::scripts::{ScriptInvocation, ScriptRunner};

/// Line appended to a file by [`ScriptedEditor`] on a successful edit.
pub const EDIT_MARKER: &str = "# edited";

/// Deterministic result in directory `d1`.
pub fn result(file: &str, stage: Stage, outcome: Outcome) -> ExecutionResult {
    result_in("d1", file, stage, outcome)
}

/// Deterministic result with empty output.
pub fn result_in(dir: &str, file: &str, stage: Stage, outcome: Outcome) -> ExecutionResult {
    ExecutionResult {
        directory: PathBuf::from(dir),
        file: PathBuf::from(file),
        stage,
        test_file: None,
        outcome,
        exit_code: Some(if outcome == Outcome::Success { 0 } else { 1 }),
        stdout: String::new(),
        stderr: String::new(),
        detail: None,
        tests: None,
        timestamp: "2024-01-01T00:00:00+00:00".to_string(),
        duration_ms: 5,
    }
}

/// Sink that keeps every emission. Clones share the same buffer.
#[derive(Clone, Default)]
pub struct CollectingSink {
    emissions: Rc<RefCell<Vec<String>>>,
}

impl CollectingSink {
    pub fn emissions(&self) -> Vec<String> {
        self.emissions.borrow().clone()
    }
}

impl Sink for CollectingSink {
    fn emit(&mut self, text: &str) -> Result<()> {
        self.emissions.borrow_mut().push(text.to_string());
        Ok(())
    }
}

/// Sink whose every emission fails, like stdout after the reader of a pipe
/// has gone away. Clones share the attempt counter.
#[derive(Clone, Default)]
pub struct FailingSink {
    attempts: Rc<RefCell<usize>>,
}

impl FailingSink {
    pub fn attempts(&self) -> usize {
        *self.attempts.borrow()
    }
}

impl Sink for FailingSink {
    fn emit(&mut self, _text: &str) -> Result<()> {
        *self.attempts.borrow_mut() += 1;
        Err(anyhow!("broken pipe"))
    }
}

/// In-memory recorder. Emits only at the end unless the request is verbose.
pub fn quiet_recorder() -> Recorder<CollectingSink> {
    Recorder::new("run-test", "test-model", CollectingSink::default(), None)
}

fn success_report(stdout: &str) -> StageReport {
    StageReport {
        success: true,
        exit_code: Some(0),
        stdout: stdout.to_string(),
        ..StageReport::default()
    }
}

fn failure_report(stderr: &str) -> StageReport {
    StageReport {
        success: false,
        exit_code: Some(1),
        stderr: stderr.to_string(),
        ..StageReport::default()
    }
}

/// Editor that appends [`EDIT_MARKER`] to each file instead of calling a
/// model. Files named in `fail_on` report failure; files named in
/// `error_on` make `edit` return `Err`.
#[derive(Default)]
pub struct ScriptedEditor {
    fail_on: Vec<String>,
    error_on: Vec<String>,
    calls: RefCell<Vec<PathBuf>>,
}

impl ScriptedEditor {
    pub fn succeeding() -> Self {
        Self::default()
    }

    pub fn failing_on(files: &[&str]) -> Self {
        Self {
            fail_on: files.iter().map(|f| f.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn erroring_on(files: &[&str]) -> Self {
        Self {
            error_on: files.iter().map(|f| f.to_string()).collect(),
            ..Self::default()
        }
    }

    /// Full paths of every file the editor was asked to edit, in order.
    pub fn calls(&self) -> Vec<PathBuf> {
        self.calls.borrow().clone()
    }
}

impl Editor for ScriptedEditor {
    fn edit(&self, request: &EditInvocation) -> Result<StageReport> {
        let path = request.workdir.join(&request.file);
        self.calls.borrow_mut().push(path.clone());
        if self.error_on.contains(&request.file) {
            return Err(anyhow!("editor unavailable for {}", request.file));
        }
        if self.fail_on.contains(&request.file) {
            return Ok(failure_report("model refused the edit"));
        }
        let mut file = OpenOptions::new().append(true).open(&path)?;
        writeln!(file, "{EDIT_MARKER}")?;
        Ok(success_report(&format!("Applied edit to {}", request.file)))
    }
}

/// Script runner that records calls. Test runs print `test_output`; test
/// files named in `fail_tests_on` fail.
#[derive(Default)]
pub struct RecordingScriptRunner {
    test_output: String,
    fail_tests_on: Vec<String>,
    script_calls: RefCell<Vec<PathBuf>>,
    test_calls: RefCell<Vec<PathBuf>>,
}

impl RecordingScriptRunner {
    pub fn succeeding() -> Self {
        Self::with_test_output("===== 1 passed in 0.01s =====\n")
    }

    pub fn with_test_output(output: &str) -> Self {
        Self {
            test_output: output.to_string(),
            ..Self::default()
        }
    }

    pub fn failing_tests_on(test_files: &[&str]) -> Self {
        Self {
            fail_tests_on: test_files.iter().map(|f| f.to_string()).collect(),
            ..Self::succeeding()
        }
    }

    /// Full paths of scripts run, in order.
    pub fn script_calls(&self) -> Vec<PathBuf> {
        self.script_calls.borrow().clone()
    }

    /// Full paths of test files run, in order.
    pub fn test_calls(&self) -> Vec<PathBuf> {
        self.test_calls.borrow().clone()
    }
}

impl ScriptRunner for RecordingScriptRunner {
    fn run_script(&self, request: &ScriptInvocation) -> Result<StageReport> {
        self.script_calls
            .borrow_mut()
            .push(request.workdir.join(&request.path));
        Ok(success_report("script ran\n"))
    }

    fn run_tests(&self, request: &ScriptInvocation) -> Result<StageReport> {
        self.test_calls
            .borrow_mut()
            .push(request.workdir.join(&request.path));
        let name = request.path.to_string_lossy();
        if self.fail_tests_on.iter().any(|f| *f == name) {
            let mut report = failure_report("");
            report.stdout = "===== 1 failed in 0.01s =====\n".to_string();
            return Ok(report);
        }
        Ok(success_report(&self.test_output))
    }
}

/// Temporary tree of directories with real files to edit.
pub struct TestWorkspace {
    temp: TempDir,
    layout: Vec<(PathBuf, Vec<String>)>,
}

impl TestWorkspace {
    /// Create `dir/file` for every `(dir, files)` pair.
    pub fn new(layout: &[(&str, &[&str])]) -> Result<Self> {
        let temp = tempfile::tempdir()?;
        let mut dirs = Vec::new();
        for (dir, files) in layout {
            let dir_path = temp.path().join(dir);
            fs::create_dir_all(&dir_path)?;
            for file in *files {
                fs::write(dir_path.join(file), "print('hello')\n")?;
            }
            dirs.push((dir_path, files.iter().map(|f| f.to_string()).collect()));
        }
        Ok(Self { temp, layout: dirs })
    }

    pub fn root(&self) -> &Path {
        self.temp.path()
    }

    pub fn write(&self, rel: &str, contents: &str) -> Result<()> {
        let path = self.root().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, contents)?;
        Ok(())
    }

    /// Request covering every directory, with per-directory flags.
    pub fn request(
        &self,
        record_output: &[bool],
        run_tests: &[bool],
    ) -> Result<ExecuteRequest, ConfigurationError> {
        ExecuteRequest::from_parallel_lists(
            self.layout.iter().map(|(dir, _)| dir.clone()).collect(),
            self.layout.iter().map(|(_, files)| files.clone()).collect(),
            "test-model",
            record_output,
            run_tests,
            &["Add docstrings.".to_string()],
            false,
        )
    }
}
