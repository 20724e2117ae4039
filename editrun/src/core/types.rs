//! Shared types for a batch edit run.
//!
//! Requests are built once at invocation time and never mutated while the run
//! is in progress. Results are created per stage and never mutated after
//! creation.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::error::ConfigurationError;
use crate::core::validator::{build_directory_requests, validate_request};

/// Stage of per-file processing. Results for one file always appear in
/// declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Edit,
    Run,
    Test,
}

impl Stage {
    pub fn label(self) -> &'static str {
        match self {
            Stage::Edit => "edit",
            Stage::Run => "run",
            Stage::Test => "test",
        }
    }
}

/// Outcome of a single stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Failure,
}

/// Pass/fail counts reported by the test collaborator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCounts {
    pub passed: u32,
    pub failed: u32,
    pub errors: u32,
    pub skipped: u32,
}

/// What a collaborator reported for one invocation, before it is stamped
/// into an [`ExecutionResult`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageReport {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub detail: Option<String>,
}

/// Captured outcome of one stage for one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub directory: PathBuf,
    pub file: PathBuf,
    pub stage: Stage,
    /// Test file that was run, relative to `directory`. Only set for
    /// [`Stage::Test`]; `file` stays the edited file.
    pub test_file: Option<PathBuf>,
    pub outcome: Outcome,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    /// Diagnostic text when the stage could not complete normally
    /// (spawn error, timeout, truncation notice).
    pub detail: Option<String>,
    /// Only populated for [`Stage::Test`].
    pub tests: Option<TestCounts>,
    /// RFC 3339 timestamp taken when the stage finished.
    pub timestamp: String,
    pub duration_ms: u64,
}

impl ExecutionResult {
    pub fn succeeded(&self) -> bool {
        self.outcome == Outcome::Success
    }
}

/// Per-directory toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryFlags {
    /// Keep captured stdout/stderr of edit and run stages.
    pub record_output: bool,
    /// Keep captured stdout/stderr of test stages.
    pub record_test_output: bool,
    /// Run the associated test file of each edited file.
    pub run_tests: bool,
    /// Execute each edited file as a standalone script.
    pub run_scripts: bool,
}

impl DirectoryFlags {
    /// Flags where script execution follows `run_tests` and test output
    /// recording follows `record_output`.
    pub fn new(record_output: bool, run_tests: bool) -> Self {
        Self {
            record_output,
            record_test_output: record_output,
            run_tests,
            run_scripts: run_tests,
        }
    }
}

/// Work for one directory: which files to edit and what to do afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryRequest {
    pub directory: PathBuf,
    pub files: Vec<String>,
    /// Explicit test files aligned with `files`. `None` means each file's
    /// test is discovered by naming convention.
    pub tests: Option<Vec<String>>,
    pub instructions: Vec<String>,
    pub flags: DirectoryFlags,
}

impl DirectoryRequest {
    pub fn file_path(&self, file: &str) -> PathBuf {
        self.directory.join(file)
    }

    /// Test file associated with `files[index]`, relative to `directory`.
    pub fn test_name(&self, index: usize) -> Option<PathBuf> {
        match &self.tests {
            Some(tests) => tests.get(index).map(PathBuf::from),
            None => self.files.get(index).map(|name| conventional_test_name(name)),
        }
    }

    pub fn test_path(&self, index: usize) -> Option<PathBuf> {
        self.test_name(index).map(|name| self.directory.join(name))
    }
}

/// `pkg/foo.py` -> `pkg/test_foo.py`.
pub fn conventional_test_name(file: &str) -> PathBuf {
    let path = Path::new(file);
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let test_name = format!("test_{name}");
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.join(test_name),
        _ => PathBuf::from(test_name),
    }
}

/// Everything one invocation of `execute` works through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecuteRequest {
    pub model: String,
    pub directories: Vec<DirectoryRequest>,
    pub verbose: bool,
}

impl ExecuteRequest {
    /// Build a request from per-directory parallel lists. Every directory
    /// gets the same instructions.
    pub fn from_parallel_lists(
        directory_paths: Vec<PathBuf>,
        files_by_directory: Vec<Vec<String>>,
        model: &str,
        record_output_flag: &[bool],
        run_tests_flag: &[bool],
        instructions: &[String],
        verbose: bool,
    ) -> Result<Self, ConfigurationError> {
        let directories = build_directory_requests(
            directory_paths,
            files_by_directory,
            record_output_flag,
            run_tests_flag,
            instructions,
        )?;
        let request = Self {
            model: model.to_string(),
            directories,
            verbose,
        };
        validate_request(&request)?;
        Ok(request)
    }

    /// Override per-directory test output recording, one flag per directory.
    pub fn with_test_output_flags(
        mut self,
        record_test_output: &[bool],
    ) -> Result<Self, ConfigurationError> {
        if record_test_output.len() != self.directories.len() {
            return Err(ConfigurationError::LengthMismatch {
                list: "record_test_output",
                expected: self.directories.len(),
                actual: record_test_output.len(),
            });
        }
        for (dir, &record) in self.directories.iter_mut().zip(record_test_output) {
            dir.flags.record_test_output = record;
        }
        Ok(self)
    }

    pub fn total_files(&self) -> usize {
        self.directories.iter().map(|dir| dir.files.len()).sum()
    }
}
