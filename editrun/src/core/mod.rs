//! Pure logic for batch edit runs.
//!
//! Core modules are free of I/O side effects: they inspect and build
//! in-memory request/result values and are tested in isolation.

pub mod error;
pub mod summary;
pub mod test_summary;
pub mod types;
pub mod validator;
