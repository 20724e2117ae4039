//! Structural validation of run input.
//!
//! Everything here is pure: it inspects the shape of the request without
//! touching the filesystem. Existence checks live in `io::plan`.

use std::path::{Path, PathBuf};

use crate::core::error::ConfigurationError;
use crate::core::types::{DirectoryFlags, DirectoryRequest, ExecuteRequest};

/// Check that the parallel per-directory lists line up and are non-empty.
pub fn validate_parallel_lists(
    directories: &[PathBuf],
    files_by_directory: &[Vec<String>],
    record_output: &[bool],
    run_tests: &[bool],
) -> Result<(), ConfigurationError> {
    if directories.is_empty() {
        return Err(ConfigurationError::EmptyDirectories);
    }
    let expected = directories.len();
    for (list, actual) in [
        ("files_by_directory", files_by_directory.len()),
        ("record_output", record_output.len()),
        ("run_tests", run_tests.len()),
    ] {
        if actual != expected {
            return Err(ConfigurationError::LengthMismatch {
                list,
                expected,
                actual,
            });
        }
    }
    for (index, (directory, files)) in directories.iter().zip(files_by_directory).enumerate() {
        validate_file_list(index, directory, files)?;
    }
    Ok(())
}

/// Validate an already-assembled request.
pub fn validate_request(request: &ExecuteRequest) -> Result<(), ConfigurationError> {
    if request.model.trim().is_empty() {
        return Err(ConfigurationError::EmptyModel);
    }
    if request.directories.is_empty() {
        return Err(ConfigurationError::EmptyDirectories);
    }
    for (index, dir) in request.directories.iter().enumerate() {
        validate_directory(index, dir)?;
    }
    Ok(())
}

fn validate_directory(index: usize, dir: &DirectoryRequest) -> Result<(), ConfigurationError> {
    validate_file_list(index, &dir.directory, &dir.files)?;
    if let Some(tests) = &dir.tests
        && tests.len() != dir.files.len()
    {
        return Err(ConfigurationError::TestListMismatch {
            index,
            directory: dir.directory.clone(),
            files: dir.files.len(),
            tests: tests.len(),
        });
    }
    if dir.instructions.iter().all(|line| line.trim().is_empty()) {
        return Err(ConfigurationError::EmptyInstructions {
            index,
            directory: dir.directory.clone(),
        });
    }
    Ok(())
}

fn validate_file_list(
    index: usize,
    directory: &Path,
    files: &[String],
) -> Result<(), ConfigurationError> {
    if files.is_empty() {
        return Err(ConfigurationError::EmptyFileList {
            index,
            directory: directory.to_path_buf(),
        });
    }
    if let Some(position) = files.iter().position(|name| name.trim().is_empty()) {
        return Err(ConfigurationError::BlankFileName {
            index,
            directory: directory.to_path_buf(),
            position,
        });
    }
    Ok(())
}

/// Assemble per-directory requests from parallel lists.
///
/// Every directory receives the same instructions; tests are discovered by
/// naming convention.
pub fn build_directory_requests(
    directories: Vec<PathBuf>,
    files_by_directory: Vec<Vec<String>>,
    record_output: &[bool],
    run_tests: &[bool],
    instructions: &[String],
) -> Result<Vec<DirectoryRequest>, ConfigurationError> {
    validate_parallel_lists(&directories, &files_by_directory, record_output, run_tests)?;
    Ok(directories
        .into_iter()
        .zip(files_by_directory)
        .enumerate()
        .map(|(index, (directory, files))| DirectoryRequest {
            directory,
            files,
            tests: None,
            instructions: instructions.to_vec(),
            flags: DirectoryFlags::new(record_output[index], run_tests[index]),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dirs(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(PathBuf::from).collect()
    }

    fn files(groups: &[&[&str]]) -> Vec<Vec<String>> {
        groups
            .iter()
            .map(|group| group.iter().map(|name| name.to_string()).collect())
            .collect()
    }

    #[test]
    fn accepts_aligned_lists() {
        validate_parallel_lists(
            &dirs(&["d1", "d2"]),
            &files(&[&["a.py"], &["b.py", "c.py"]]),
            &[true, false],
            &[false, true],
        )
        .expect("valid");
    }

    #[test]
    fn rejects_flag_length_mismatch() {
        let err = validate_parallel_lists(
            &dirs(&["d1", "d2"]),
            &files(&[&["a.py"], &["b.py"]]),
            &[true, false],
            &[true],
        )
        .unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::LengthMismatch {
                list: "run_tests",
                expected: 2,
                actual: 1,
            }
        );
    }

    #[test]
    fn rejects_files_length_mismatch() {
        let err = validate_parallel_lists(
            &dirs(&["d1"]),
            &files(&[&["a.py"], &["b.py"]]),
            &[true],
            &[true],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::LengthMismatch {
                list: "files_by_directory",
                ..
            }
        ));
    }

    #[test]
    fn rejects_empty_inputs() {
        let err = validate_parallel_lists(&[], &[], &[], &[]).unwrap_err();
        assert_eq!(err, ConfigurationError::EmptyDirectories);

        let err = validate_parallel_lists(
            &dirs(&["d1", "d2"]),
            &files(&[&["a.py"], &[]]),
            &[true, true],
            &[true, true],
        )
        .unwrap_err();
        assert!(matches!(err, ConfigurationError::EmptyFileList { index: 1, .. }));
    }

    #[test]
    fn rejects_blank_file_name() {
        let err = validate_parallel_lists(
            &dirs(&["d1"]),
            &files(&[&["a.py", "  "]]),
            &[true],
            &[true],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::BlankFileName {
                index: 0,
                position: 1,
                ..
            }
        ));
    }

    #[test]
    fn request_checks_tests_and_instructions() {
        let mut built = build_directory_requests(
            dirs(&["d1"]),
            files(&[&["a.py", "b.py"]]),
            &[true],
            &[true],
            &["refactor".to_string()],
        )
        .expect("build");
        built[0].tests = Some(vec!["test_a.py".to_string()]);
        let mut request = ExecuteRequest {
            model: "openrouter/some-model".to_string(),
            directories: built,
            verbose: false,
        };
        assert!(matches!(
            validate_request(&request).unwrap_err(),
            ConfigurationError::TestListMismatch { files: 2, tests: 1, .. }
        ));

        request.directories[0].tests = None;
        request.directories[0].instructions = vec![" ".to_string()];
        assert!(matches!(
            validate_request(&request).unwrap_err(),
            ConfigurationError::EmptyInstructions { index: 0, .. }
        ));

        request.directories[0].instructions = vec!["refactor".to_string()];
        request.model = String::new();
        assert_eq!(validate_request(&request).unwrap_err(), ConfigurationError::EmptyModel);
    }

    #[test]
    fn build_aligns_flags_by_index() {
        let built = build_directory_requests(
            dirs(&["d1", "d2"]),
            files(&[&["a.py"], &["b.py"]]),
            &[true, false],
            &[false, true],
            &["tidy".to_string()],
        )
        .expect("build");
        assert_eq!(built[0].flags, DirectoryFlags::new(true, false));
        assert_eq!(built[1].flags, DirectoryFlags::new(false, true));
        assert!(!built[0].flags.run_scripts);
    }
}
