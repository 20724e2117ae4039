//! Fatal configuration errors.
//!
//! These are the only errors that abort a run, and they are always raised
//! before the first collaborator call. Per-file failures are recorded as
//! results instead.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("no directories given")]
    EmptyDirectories,

    #[error("{list} has {actual} entries but {expected} directories were given")]
    LengthMismatch {
        list: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("directory #{index} ({}) has an empty file list", directory.display())]
    EmptyFileList { index: usize, directory: PathBuf },

    #[error(
        "directory #{index} ({}) has a blank file name at position {position}",
        directory.display()
    )]
    BlankFileName {
        index: usize,
        directory: PathBuf,
        position: usize,
    },

    #[error(
        "directory #{index} ({}) lists {tests} test files for {files} files",
        directory.display()
    )]
    TestListMismatch {
        index: usize,
        directory: PathBuf,
        files: usize,
        tests: usize,
    },

    #[error("directory #{index} ({}) has no edit instructions", directory.display())]
    EmptyInstructions { index: usize, directory: PathBuf },

    #[error("directory #{index} ({}) does not exist", directory.display())]
    MissingDirectory { index: usize, directory: PathBuf },

    #[error("directory #{index}: file {} does not exist or is not readable", path.display())]
    MissingFile { index: usize, path: PathBuf },

    #[error("model identifier must be non-empty")]
    EmptyModel,

    #[error("environment variable {var} is not set")]
    MissingCredential { var: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_index() {
        let err = ConfigurationError::EmptyFileList {
            index: 2,
            directory: PathBuf::from("d3"),
        };
        assert_eq!(err.to_string(), "directory #2 (d3) has an empty file list");

        let err = ConfigurationError::LengthMismatch {
            list: "run_tests",
            expected: 2,
            actual: 1,
        };
        assert!(err.to_string().contains("run_tests has 1 entries"));
    }
}
