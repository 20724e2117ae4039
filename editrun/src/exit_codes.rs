//! Stable exit codes for editrun CLI commands.

/// Command succeeded; every recorded stage succeeded.
pub const OK: i32 = 0;
/// Invalid input/config/environment or another error stopped the command.
pub const INVALID: i32 = 1;
/// `editrun run` finished, but at least one edit, script or test failed.
pub const FAILURES: i32 = 2;
