//! Orchestration for one batch edit run.
//!
//! Directories are processed in order, files within a directory in order, and
//! for each file the stages edit → run → test. Only configuration errors stop
//! the run; every per-file failure is recorded and processing moves on.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Result;
use tracing::{info, instrument, warn};

use crate::core::test_summary::parse_test_counts;
use crate::core::types::{
    DirectoryRequest, ExecuteRequest, ExecutionResult, Outcome, Stage, StageReport,
};
use crate::core::validator::validate_request;
use crate::io::editor::{EditInvocation, Editor};
use crate::io::plan::check_files_exist;
use crate::io::recorder::{RecordedRun, Recorder, Sink, now_rfc3339};
use crate::io::scripts::{ScriptInvocation, ScriptRunner};

/// Run every edit, script and test described by `request`.
///
/// Returns a [`crate::core::error::ConfigurationError`] (wrapped in
/// `anyhow`) before any collaborator is called if the request is malformed or
/// references missing files. Nothing after that point fails the run: stage
/// failures are recorded, console and log-file problems are logged.
#[instrument(
    skip_all,
    fields(run_id = %recorder.run_id(), directories = request.directories.len())
)]
pub fn execute<E: Editor, R: ScriptRunner, S: Sink>(
    request: &ExecuteRequest,
    editor: &E,
    scripts: &R,
    mut recorder: Recorder<S>,
) -> Result<RecordedRun> {
    validate_request(request)?;
    check_files_exist(request)?;

    recorder.set_verbose(request.verbose);
    info!(
        model = %request.model,
        files = request.total_files(),
        "starting run"
    );
    for dir in &request.directories {
        process_directory(request, dir, editor, scripts, &mut recorder);
    }

    let run = recorder.finish();
    info!(summary = %run.summary, "run finished");
    Ok(run)
}

#[instrument(skip_all, fields(directory = %dir.directory.display()))]
fn process_directory<E: Editor, R: ScriptRunner, S: Sink>(
    request: &ExecuteRequest,
    dir: &DirectoryRequest,
    editor: &E,
    scripts: &R,
    recorder: &mut Recorder<S>,
) {
    info!(files = dir.files.len(), flags = ?dir.flags, "processing directory");
    for (index, file) in dir.files.iter().enumerate() {
        let file_path = Path::new(file);
        let started = Instant::now();
        let report = editor.edit(&EditInvocation {
            workdir: dir.directory.clone(),
            file: file.clone(),
            model: request.model.clone(),
            instructions: dir.instructions.clone(),
        });
        recorder.record(stamp(dir, file_path, None, Stage::Edit, report, started));

        if dir.flags.run_scripts {
            let started = Instant::now();
            let report = scripts.run_script(&ScriptInvocation {
                workdir: dir.directory.clone(),
                path: PathBuf::from(file),
            });
            recorder.record(stamp(dir, file_path, None, Stage::Run, report, started));
        }

        if dir.flags.run_tests
            && let Some(test_name) = dir.test_name(index)
        {
            let started = Instant::now();
            let report = scripts.run_tests(&ScriptInvocation {
                workdir: dir.directory.clone(),
                path: test_name.clone(),
            });
            recorder.record(stamp(
                dir,
                file_path,
                Some(test_name),
                Stage::Test,
                report,
                started,
            ));
        }
    }
}

/// Turn a collaborator report (or its failure to run) into a result.
fn stamp(
    dir: &DirectoryRequest,
    file: &Path,
    test_file: Option<PathBuf>,
    stage: Stage,
    report: Result<StageReport>,
    started: Instant,
) -> ExecutionResult {
    let report = report.unwrap_or_else(|err| StageReport {
        detail: Some(format!("{err:#}")),
        ..StageReport::default()
    });
    let outcome = if report.success {
        Outcome::Success
    } else {
        warn!(
            file = %file.display(),
            stage = stage.label(),
            exit_code = ?report.exit_code,
            "stage failed"
        );
        Outcome::Failure
    };
    let (tests, keep_output) = if stage == Stage::Test {
        (parse_test_counts(&report.stdout), dir.flags.record_test_output)
    } else {
        (None, dir.flags.record_output)
    };
    let (stdout, stderr) = if keep_output {
        (report.stdout, report.stderr)
    } else {
        (String::new(), String::new())
    };
    ExecutionResult {
        directory: dir.directory.clone(),
        file: file.to_path_buf(),
        stage,
        test_file,
        outcome,
        exit_code: report.exit_code,
        stdout,
        stderr,
        detail: report.detail,
        tests,
        timestamp: now_rfc3339(),
        duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ConfigurationError;
    use crate::test_support::{
        CollectingSink, RecordingScriptRunner, ScriptedEditor, TestWorkspace, quiet_recorder,
    };

    #[test]
    fn single_file_without_tests_records_one_edit() {
        let ws = TestWorkspace::new(&[("d1", &["a.py"])]).expect("workspace");
        let request = ws.request(&[true], &[false]).expect("request");
        let editor = ScriptedEditor::succeeding();
        let scripts = RecordingScriptRunner::succeeding();

        let run = execute(&request, &editor, &scripts, quiet_recorder()).expect("run");

        assert_eq!(editor.calls(), vec![ws.root().join("d1").join("a.py")]);
        assert!(scripts.test_calls().is_empty());
        assert!(scripts.script_calls().is_empty());
        let results: Vec<_> = run.log.results().collect();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].stage, Stage::Edit);
        assert_eq!(results[0].outcome, Outcome::Success);
    }

    #[test]
    fn test_counts_are_parsed_and_output_dropped_when_not_recorded() {
        let ws = TestWorkspace::new(&[("d1", &["a.py"])]).expect("workspace");
        let request = ws.request(&[false], &[true]).expect("request");
        let editor = ScriptedEditor::succeeding();
        let scripts = RecordingScriptRunner::with_test_output("===== 2 passed in 0.01s =====\n");

        let run = execute(&request, &editor, &scripts, quiet_recorder()).expect("run");

        let test = run
            .log
            .results()
            .find(|r| r.stage == Stage::Test)
            .expect("test result");
        assert_eq!(test.file, PathBuf::from("a.py"));
        assert_eq!(test.test_file, Some(PathBuf::from("test_a.py")));
        assert_eq!(test.tests.expect("counts").passed, 2);
        assert!(test.stdout.is_empty());
    }

    #[test]
    fn test_output_is_recorded_independently_of_script_output() {
        let ws = TestWorkspace::new(&[("d1", &["a.py"])]).expect("workspace");
        let request = ws
            .request(&[false], &[true])
            .and_then(|request| request.with_test_output_flags(&[true]))
            .expect("request");
        let editor = ScriptedEditor::succeeding();
        let scripts = RecordingScriptRunner::succeeding();

        let run = execute(&request, &editor, &scripts, quiet_recorder()).expect("run");

        for result in run.log.results() {
            match result.stage {
                Stage::Test => assert!(result.stdout.contains("1 passed")),
                Stage::Edit | Stage::Run => assert!(result.stdout.is_empty()),
            }
        }
    }

    #[test]
    fn collaborator_errors_become_failures() {
        let ws = TestWorkspace::new(&[("d1", &["a.py", "b.py"])]).expect("workspace");
        let request = ws.request(&[true], &[false]).expect("request");
        let editor = ScriptedEditor::erroring_on(&["a.py"]);
        let scripts = RecordingScriptRunner::succeeding();

        let run = execute(&request, &editor, &scripts, quiet_recorder()).expect("run");

        let results: Vec<_> = run.log.results().collect();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].outcome, Outcome::Failure);
        assert!(
            results[0]
                .detail
                .as_deref()
                .expect("detail")
                .contains("editor unavailable")
        );
        assert_eq!(results[1].outcome, Outcome::Success);
        assert_eq!(run.summary.edit.failed, 1);
    }

    #[test]
    fn missing_file_stops_before_any_edit() {
        let ws = TestWorkspace::new(&[("d1", &["a.py"])]).expect("workspace");
        let mut request = ws.request(&[true], &[true]).expect("request");
        request.directories[0].files.push("ghost.py".to_string());
        let editor = ScriptedEditor::succeeding();
        let scripts = RecordingScriptRunner::succeeding();
        let sink = CollectingSink::default();
        request.verbose = true;
        let recorder = Recorder::new("run-1", "m", sink.clone(), None);

        let err = execute(&request, &editor, &scripts, recorder).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ConfigurationError>(),
            Some(ConfigurationError::MissingFile { index: 0, .. })
        ));
        assert!(editor.calls().is_empty());
        assert!(sink.emissions().is_empty());
    }
}
