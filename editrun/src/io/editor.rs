//! Editor abstraction for AI-assisted file edits.
//!
//! The [`Editor`] trait decouples run orchestration from the editing backend
//! (currently the `aider` CLI). Tests use scripted editors that return
//! predetermined reports without spawning processes.

use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result};
use minijinja::{Environment, context};
use tracing::{debug, info, instrument, warn};

use crate::core::types::StageReport;
use crate::io::config::{EditorConfig, EditrunConfig};
use crate::io::credentials::ApiKey;
use crate::io::process::run_command_with_timeout;

/// Parameters for one edit of one file.
#[derive(Debug, Clone)]
pub struct EditInvocation {
    /// Directory the editor runs in.
    pub workdir: PathBuf,
    /// File to edit, relative to `workdir`.
    pub file: String,
    pub model: String,
    pub instructions: Vec<String>,
}

/// Abstraction over editing backends.
///
/// `Ok` means the editor ran; whether the edit succeeded is in the report.
/// `Err` means the editor could not be run at all.
pub trait Editor {
    fn edit(&self, request: &EditInvocation) -> Result<StageReport>;
}

/// Editor that spawns the `aider` CLI once per file.
pub struct AiderEditor {
    command: Vec<String>,
    extra_args: Vec<String>,
    message_template: String,
    api_key: ApiKey,
    timeout: Duration,
    output_limit_bytes: usize,
}

impl AiderEditor {
    /// Build from config. Fails if the message template does not render.
    pub fn new(config: &EditrunConfig, api_key: ApiKey) -> Result<Self> {
        config.validate()?;
        let editor: &EditorConfig = &config.editor;
        render_message(&editor.message_template, &["check".to_string()], "f.py", "d")
            .context("render editor.message_template")?;
        Ok(Self {
            command: editor.command.clone(),
            extra_args: editor.extra_args.clone(),
            message_template: editor.message_template.clone(),
            api_key,
            timeout: editor.timeout(),
            output_limit_bytes: config.output_limit_bytes,
        })
    }

    fn build_command(&self, request: &EditInvocation, message: &str) -> Command {
        let mut cmd = Command::new(&self.command[0]);
        cmd.args(&self.command[1..])
            .arg("--model")
            .arg(&request.model)
            // Non-interactive: accept every confirmation, never touch git.
            .arg("--yes-always")
            .arg("--no-auto-commits")
            .arg("--no-git")
            .arg("--no-pretty")
            .arg("--message")
            .arg(message)
            .args(&self.extra_args)
            .arg(&request.file)
            .current_dir(&request.workdir)
            .env(self.api_key.var(), self.api_key.expose());
        cmd
    }
}

impl Editor for AiderEditor {
    #[instrument(skip_all, fields(file = %request.file, model = %request.model))]
    fn edit(&self, request: &EditInvocation) -> Result<StageReport> {
        info!(workdir = %request.workdir.display(), "starting editor");
        let message = render_message(
            &self.message_template,
            &request.instructions,
            &request.file,
            &request.workdir.display().to_string(),
        )?;
        let cmd = self.build_command(request, &message);
        let capture = run_command_with_timeout(cmd, self.timeout, self.output_limit_bytes)
            .context("run editor")?;

        if capture.timed_out {
            warn!(timeout_secs = self.timeout.as_secs(), "editor timed out");
        } else if !capture.status.success() {
            warn!(exit_code = ?capture.status.code(), "editor failed");
        } else {
            debug!("editor completed successfully");
        }
        Ok(capture.into_report(self.timeout))
    }
}

/// Render the message sent to the editor for one file.
pub fn render_message(
    template: &str,
    instructions: &[String],
    file: &str,
    directory: &str,
) -> Result<String> {
    let env = Environment::new();
    let instructions: Vec<&str> = instructions
        .iter()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .collect();
    let rendered = env.render_str(
        template,
        context! {
            instructions => instructions,
            file => file,
            directory => directory,
        },
    )?;
    Ok(rendered.trim().to_string())
}
