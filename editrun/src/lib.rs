//! Batch driver for an AI code-editing CLI.
//!
//! Walks a list of directories and files, asks an external editor (by default
//! `aider`) to rewrite each file, optionally runs the edited scripts and their
//! tests, and records everything that happened. The crate keeps a strict
//! split:
//!
//! - **[`core`]**: Pure logic (request types, validation, summaries, test
//!   output parsing). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting collaborators (processes, config, plans,
//!   recording). Traits at the seams so tests can script them.
//!
//! [`execute`] ties the two together.

pub mod core;
pub mod execute;
pub mod exit_codes;
pub mod io;
pub mod logging;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
