//! Run recording: the in-memory RunLog, console output, and the per-run log
//! artifacts under `<log_dir>/<run_id>/`.
//!
//! Console output goes through a [`Sink`]. In verbose mode every result is
//! emitted as soon as it is recorded; otherwise the whole report is emitted
//! once when the run finishes. The log files are written either way.

use std::fmt::Write as _;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::summary::RunSummary;
use crate::core::types::{ExecutionResult, Outcome};

/// Destination for user-facing run output.
pub trait Sink {
    fn emit(&mut self, text: &str) -> Result<()>;
}

/// Writes to stdout.
pub struct ConsoleSink;

impl Sink for ConsoleSink {
    fn emit(&mut self, text: &str) -> Result<()> {
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{text}").context("write stdout")?;
        stdout.flush().context("flush stdout")
    }
}

/// Results for one directory, in the order they were produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryLog {
    pub directory: PathBuf,
    pub results: Vec<ExecutionResult>,
}

/// Everything recorded for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunLog {
    pub run_id: String,
    pub model: String,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub directories: Vec<DirectoryLog>,
}

impl RunLog {
    pub fn results(&self) -> impl Iterator<Item = &ExecutionResult> {
        self.directories.iter().flat_map(|dir| dir.results.iter())
    }
}

#[derive(Debug, Clone)]
pub struct RunPaths {
    pub dir: PathBuf,
    pub json_path: PathBuf,
    pub text_path: PathBuf,
}

impl RunPaths {
    pub fn new(log_dir: &Path, run_id: &str) -> Self {
        let dir = log_dir.join(run_id);
        Self {
            json_path: dir.join("run.json"),
            text_path: dir.join("run.log"),
            dir,
        }
    }
}

/// What `Recorder::finish` hands back.
#[derive(Debug, Clone)]
pub struct RecordedRun {
    pub log: RunLog,
    pub summary: RunSummary,
    pub paths: Option<RunPaths>,
}

pub struct Recorder<S: Sink> {
    log: RunLog,
    verbose: bool,
    sink: S,
    sink_failed: bool,
    log_dir: Option<PathBuf>,
}

impl<S: Sink> Recorder<S> {
    /// `log_dir = None` keeps the run in memory only. Starts quiet; see
    /// [`Recorder::set_verbose`].
    pub fn new(run_id: &str, model: &str, sink: S, log_dir: Option<PathBuf>) -> Self {
        Self {
            log: RunLog {
                run_id: run_id.to_string(),
                model: model.to_string(),
                started_at: now_rfc3339(),
                finished_at: None,
                directories: Vec::new(),
            },
            verbose: false,
            sink,
            sink_failed: false,
            log_dir,
        }
    }

    /// Stream each result as it is recorded instead of one report at the end.
    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    pub fn run_id(&self) -> &str {
        &self.log.run_id
    }

    pub fn log(&self) -> &RunLog {
        &self.log
    }

    /// Append a result, grouping it under its directory.
    pub fn record(&mut self, result: ExecutionResult) {
        if self.verbose {
            self.emit(&render_result(&result));
        }
        match self.log.directories.last_mut() {
            Some(group) if group.directory == result.directory => group.results.push(result),
            _ => self.log.directories.push(DirectoryLog {
                directory: result.directory.clone(),
                results: vec![result],
            }),
        }
    }

    /// Close the run: emit the final output, then write the log artifacts.
    /// A failed write is logged and leaves `paths` empty.
    pub fn finish(mut self) -> RecordedRun {
        self.log.finished_at = Some(now_rfc3339());
        let summary = RunSummary::from_results(&self.log.run_id, self.log.results());
        let report = render_report(&self.log, &summary);

        if self.verbose {
            self.emit(&summary.to_string());
        } else {
            self.emit(&report);
        }

        let paths = self
            .log_dir
            .as_deref()
            .and_then(|log_dir| match write_run(log_dir, &self.log, &report) {
                Ok(paths) => Some(paths),
                Err(err) => {
                    warn!(err = %format!("{err:#}"), "failed to write run log");
                    None
                }
            });
        RecordedRun {
            log: self.log,
            summary,
            paths,
        }
    }

    /// Console output is best effort. After the first failure the sink is
    /// not used again.
    fn emit(&mut self, text: &str) {
        if self.sink_failed {
            return;
        }
        if let Err(err) = self.sink.emit(text) {
            warn!(err = %format!("{err:#}"), "console output failed, continuing without it");
            self.sink_failed = true;
        }
    }
}

fn write_run(log_dir: &Path, log: &RunLog, report: &str) -> Result<RunPaths> {
    let paths = RunPaths::new(log_dir, &log.run_id);
    fs::create_dir_all(&paths.dir)
        .with_context(|| format!("create run log dir {}", paths.dir.display()))?;
    let mut json = serde_json::to_string_pretty(log).context("serialize run log")?;
    json.push('\n');
    fs::write(&paths.json_path, json)
        .with_context(|| format!("write {}", paths.json_path.display()))?;
    fs::write(&paths.text_path, report)
        .with_context(|| format!("write {}", paths.text_path.display()))?;
    debug!(dir = %paths.dir.display(), "run log written");
    Ok(paths)
}

pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// `run-YYYYmmdd_HHMMSS`, suffixed with `-2`, `-3`, ... if a run directory
/// with that id already exists under `log_dir`.
pub fn unique_run_id(log_dir: &Path) -> String {
    let base = format!("run-{}", chrono::Utc::now().format("%Y%m%d_%H%M%S"));
    if !log_dir.join(&base).exists() {
        return base;
    }
    (2..)
        .map(|n| format!("{base}-{n}"))
        .find(|id| !log_dir.join(id).exists())
        .unwrap_or(base)
}

/// Human-readable rendering of one result.
pub fn render_result(result: &ExecutionResult) -> String {
    let mut buf = String::new();
    let outcome = match result.outcome {
        Outcome::Success => "ok",
        Outcome::Failure => "FAILED",
    };
    let exit = result
        .exit_code
        .map_or_else(|| "none".to_string(), |code| code.to_string());
    let _ = write!(
        buf,
        "== [{}] {}",
        result.stage.label(),
        result.directory.join(&result.file).display()
    );
    if let Some(test_file) = &result.test_file {
        let _ = write!(buf, " ({})", test_file.display());
    }
    let _ = write!(buf, ": {outcome} (exit {exit}, {} ms)", result.duration_ms);
    if let Some(detail) = &result.detail {
        let _ = write!(buf, "\n{detail}");
    }
    if let Some(tests) = &result.tests {
        let _ = write!(
            buf,
            "\ntests: {} passed, {} failed, {} errors, {} skipped",
            tests.passed, tests.failed, tests.errors, tests.skipped
        );
    }
    for (label, text) in [("stdout", &result.stdout), ("stderr", &result.stderr)] {
        if !text.is_empty() {
            let _ = write!(buf, "\n--- {label} ---\n{}", text.trim_end());
        }
    }
    buf
}

/// Full report for the run, grouped by directory.
pub fn render_report(log: &RunLog, summary: &RunSummary) -> String {
    let mut buf = format!("run {} (model {})\n", log.run_id, log.model);
    for dir in &log.directories {
        let _ = writeln!(buf, "\n# {}", dir.directory.display());
        for result in &dir.results {
            let _ = writeln!(buf, "{}", render_result(result));
        }
    }
    let _ = writeln!(buf, "\n{summary}");
    buf
}
