//! I/O collaborators for batch edit runs.

pub mod config;
pub mod credentials;
pub mod editor;
pub mod files;
pub mod plan;
pub mod process;
pub mod recorder;
pub mod scripts;
