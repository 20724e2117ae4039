//! Run plans: which directories and files to edit, and what to do with them.
//!
//! Plans are TOML files. Relative directory paths resolve against the plan
//! file's parent directory.
//!
//! ```toml
//! model = "openrouter/anthropic/claude-3.5-sonnet"
//! instructions = ["Add type hints to every function."]
//!
//! [[directories]]
//! path = "project_a"
//! files = ["main.py", "utils.py"]
//! record_output = true
//! run_tests = true
//! record_test_output = false
//! ```

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

use crate::core::error::ConfigurationError;
use crate::core::types::{DirectoryFlags, DirectoryRequest, ExecuteRequest};
use crate::core::validator::validate_request;

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PlanFile {
    /// Overrides the configured model.
    pub model: Option<String>,
    /// Default instructions for directories that name none.
    #[serde(default)]
    pub instructions: Vec<String>,
    #[serde(default)]
    pub directories: Vec<PlanDirectory>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PlanDirectory {
    pub path: PathBuf,
    pub files: Vec<String>,
    /// Test files aligned with `files`. Discovered as `test_<file>` when
    /// omitted.
    pub tests: Option<Vec<String>>,
    pub instructions: Option<Vec<String>>,
    #[serde(default)]
    pub record_output: bool,
    #[serde(default)]
    pub run_tests: bool,
    /// Defaults to `run_tests`.
    pub run_scripts: Option<bool>,
    /// Defaults to `record_output`.
    pub record_test_output: Option<bool>,
}

impl PlanFile {
    pub fn load(path: &Path) -> Result<Self> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("read plan {}", path.display()))?;
        Self::parse_str(&contents).with_context(|| format!("parse plan {}", path.display()))
    }

    pub fn parse_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Convert to a validated request. `base_dir` anchors relative paths;
    /// `default_model` applies when the plan names no model.
    pub fn into_request(
        self,
        base_dir: &Path,
        default_model: &str,
        verbose: bool,
    ) -> Result<ExecuteRequest, ConfigurationError> {
        let model = self.model.unwrap_or_else(|| default_model.to_string());
        let directories = self
            .directories
            .into_iter()
            .map(|dir| DirectoryRequest {
                directory: base_dir.join(&dir.path),
                files: dir.files,
                tests: dir.tests,
                instructions: dir
                    .instructions
                    .unwrap_or_else(|| self.instructions.clone()),
                flags: DirectoryFlags {
                    record_output: dir.record_output,
                    record_test_output: dir.record_test_output.unwrap_or(dir.record_output),
                    run_tests: dir.run_tests,
                    run_scripts: dir.run_scripts.unwrap_or(dir.run_tests),
                },
            })
            .collect();
        let request = ExecuteRequest {
            model,
            directories,
            verbose,
        };
        validate_request(&request)?;
        Ok(request)
    }
}

/// Load a plan file and check that everything it references exists.
pub fn load_request(
    plan_path: &Path,
    default_model: &str,
    verbose: bool,
) -> Result<ExecuteRequest> {
    let plan = PlanFile::load(plan_path)?;
    let base_dir = plan_path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let request = plan.into_request(base_dir, default_model, verbose)?;
    check_files_exist(&request)?;
    debug!(
        directories = request.directories.len(),
        files = request.total_files(),
        "plan loaded"
    );
    Ok(request)
}

/// Every directory must exist and every listed file must be readable.
/// Explicit test files are checked only where tests are enabled.
pub fn check_files_exist(request: &ExecuteRequest) -> Result<(), ConfigurationError> {
    for (index, dir) in request.directories.iter().enumerate() {
        if !dir.directory.is_dir() {
            return Err(ConfigurationError::MissingDirectory {
                index,
                directory: dir.directory.clone(),
            });
        }
        for file in &dir.files {
            ensure_readable(index, &dir.file_path(file))?;
        }
        if dir.flags.run_tests
            && let Some(tests) = &dir.tests
        {
            for test in tests {
                ensure_readable(index, &dir.file_path(test))?;
            }
        }
    }
    Ok(())
}

fn ensure_readable(index: usize, path: &Path) -> Result<(), ConfigurationError> {
    if path.is_file() && File::open(path).is_ok() {
        return Ok(());
    }
    Err(ConfigurationError::MissingFile {
        index,
        path: path.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAN: &str = r#"
model = "openrouter/some-model"
instructions = ["Add docstrings."]

[[directories]]
path = "d1"
files = ["a.py"]
record_output = true

[[directories]]
path = "d2"
files = ["b.py", "c.py"]
tests = ["check_b.py", "check_c.py"]
instructions = ["Rename variables."]
record_output = true
run_tests = true
run_scripts = false
record_test_output = false
"#;

    fn write(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(path, "print('hi')\n").expect("write");
    }

    #[test]
    fn converts_plan_to_request() {
        let plan = PlanFile::parse_str(PLAN).expect("parse");
        let request = plan
            .into_request(Path::new("/work"), "fallback-model", true)
            .expect("request");

        assert_eq!(request.model, "openrouter/some-model");
        assert!(request.verbose);
        assert_eq!(request.total_files(), 3);

        let d1 = &request.directories[0];
        assert_eq!(d1.directory, PathBuf::from("/work/d1"));
        assert_eq!(d1.instructions, vec!["Add docstrings."]);
        assert_eq!(d1.flags, DirectoryFlags::new(true, false));

        let d2 = &request.directories[1];
        assert_eq!(d2.instructions, vec!["Rename variables."]);
        assert!(d2.flags.run_tests);
        assert!(!d2.flags.run_scripts);
        assert!(d2.flags.record_output);
        assert!(!d2.flags.record_test_output);
        assert_eq!(d2.test_path(0), Some(PathBuf::from("/work/d2/check_b.py")));
    }

    #[test]
    fn falls_back_to_default_model() {
        let plan = PlanFile::parse_str(
            "instructions = [\"x\"]\n[[directories]]\npath = \"d\"\nfiles = [\"a.py\"]\n",
        )
        .expect("parse");
        let request = plan
            .into_request(Path::new("."), "fallback-model", false)
            .expect("request");
        assert_eq!(request.model, "fallback-model");
    }

    #[test]
    fn plan_without_directories_is_rejected() {
        let plan = PlanFile::parse_str("instructions = [\"x\"]\n").expect("parse");
        let err = plan.into_request(Path::new("."), "m", false).unwrap_err();
        assert_eq!(err, ConfigurationError::EmptyDirectories);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err =
            PlanFile::parse_str("[[directories]]\npath = \"d\"\nfiles = []\nrun_test = true\n")
                .unwrap_err();
        assert!(format!("{err:#}").contains("run_test"));
    }

    #[test]
    fn load_request_resolves_against_plan_dir_and_checks_files() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path();
        write(root, "d1/a.py");
        write(root, "d2/b.py");
        write(root, "d2/c.py");
        write(root, "d2/check_b.py");
        write(root, "d2/check_c.py");
        let plan_path = root.join("plan.toml");
        fs::write(&plan_path, PLAN).expect("write plan");

        let request = load_request(&plan_path, "m", false).expect("load");
        assert_eq!(request.directories[0].directory, root.join("d1"));

        fs::remove_file(root.join("d2/c.py")).expect("remove");
        let err = load_request(&plan_path, "m", false).unwrap_err();
        let config_err = err
            .downcast_ref::<ConfigurationError>()
            .expect("configuration error");
        assert_eq!(
            config_err,
            &ConfigurationError::MissingFile {
                index: 1,
                path: root.join("d2/c.py"),
            }
        );
    }

    #[test]
    fn missing_directory_is_reported_by_index() {
        let temp = tempfile::tempdir().expect("tempdir");
        let plan = PlanFile::parse_str(
            "instructions = [\"x\"]\n[[directories]]\npath = \"nope\"\nfiles = [\"a.py\"]\n",
        )
        .expect("parse");
        let request = plan.into_request(temp.path(), "m", false).expect("request");
        let err = check_files_exist(&request).unwrap_err();
        assert!(matches!(err, ConfigurationError::MissingDirectory { index: 0, .. }));
    }

    #[test]
    fn explicit_tests_only_checked_when_enabled() {
        let temp = tempfile::tempdir().expect("tempdir");
        write(temp.path(), "d/a.py");
        let plan = PlanFile::parse_str(concat!(
            "instructions = [\"x\"]\n",
            "[[directories]]\npath = \"d\"\nfiles = [\"a.py\"]\ntests = [\"test_a.py\"]\n",
        ))
        .expect("parse");
        let mut request = plan.into_request(temp.path(), "m", false).expect("request");
        check_files_exist(&request).expect("tests disabled");

        request.directories[0].flags.run_tests = true;
        let err = check_files_exist(&request).unwrap_err();
        assert!(matches!(err, ConfigurationError::MissingFile { index: 0, .. }));
    }
}
