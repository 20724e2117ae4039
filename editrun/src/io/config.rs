//! Tool configuration stored in `editrun.toml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_FILE: &str = "editrun.toml";

/// Editor message template. Rendered with `instructions`, `file` and
/// `directory`.
pub const DEFAULT_MESSAGE_TEMPLATE: &str = "\
{% for line in instructions %}{{ line }}
{% endfor %}
Only modify {{ file }}.";

/// Tool configuration (TOML).
///
/// Meant to be edited by humans. Missing fields fall back to defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EditrunConfig {
    /// Model identifier passed to the editor when the plan names none.
    pub model: String,

    /// Directory that receives one subdirectory of logs per run.
    pub log_dir: PathBuf,

    /// Keep at most this many bytes of each captured stream.
    pub output_limit_bytes: usize,

    pub editor: EditorConfig,
    pub scripts: ScriptConfig,
    pub tests: TestConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EditorConfig {
    /// Editor executable and leading arguments (e.g. `["aider"]`).
    pub command: Vec<String>,
    /// Environment variable holding the editor's API key.
    pub api_key_env: String,
    pub timeout_secs: u64,
    pub message_template: String,
    /// Extra arguments appended before the file name.
    pub extra_args: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ScriptConfig {
    /// Interpreter used to execute edited files (e.g. `["python"]`).
    pub interpreter: Vec<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TestConfig {
    /// Test runner invoked with the test file as its last argument.
    pub command: Vec<String>,
    pub timeout_secs: u64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            command: vec!["aider".to_string()],
            api_key_env: "OPENROUTER_API_KEY".to_string(),
            timeout_secs: 15 * 60,
            message_template: DEFAULT_MESSAGE_TEMPLATE.to_string(),
            extra_args: Vec::new(),
        }
    }
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            interpreter: vec!["python".to_string()],
            timeout_secs: 2 * 60,
        }
    }
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            command: vec!["pytest".to_string()],
            timeout_secs: 10 * 60,
        }
    }
}

impl Default for EditrunConfig {
    fn default() -> Self {
        Self {
            model: "openrouter/anthropic/claude-3.5-sonnet".to_string(),
            log_dir: PathBuf::from(".editrun/runs"),
            output_limit_bytes: 100_000,
            editor: EditorConfig::default(),
            scripts: ScriptConfig::default(),
            tests: TestConfig::default(),
        }
    }
}

impl EditorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl ScriptConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl TestConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl EditrunConfig {
    pub fn validate(&self) -> Result<()> {
        if self.output_limit_bytes == 0 {
            return Err(anyhow!("output_limit_bytes must be > 0"));
        }
        if self.editor.timeout_secs == 0 {
            return Err(anyhow!("editor.timeout_secs must be > 0"));
        }
        if self.scripts.timeout_secs == 0 {
            return Err(anyhow!("scripts.timeout_secs must be > 0"));
        }
        if self.tests.timeout_secs == 0 {
            return Err(anyhow!("tests.timeout_secs must be > 0"));
        }
        ensure_command("editor.command", &self.editor.command)?;
        ensure_command("scripts.interpreter", &self.scripts.interpreter)?;
        ensure_command("tests.command", &self.tests.command)?;
        if self.editor.api_key_env.trim().is_empty() {
            return Err(anyhow!("editor.api_key_env must be non-empty"));
        }
        Ok(())
    }
}

fn ensure_command(name: &str, command: &[String]) -> Result<()> {
    if command.is_empty() || command[0].trim().is_empty() {
        return Err(anyhow!("{name} must be a non-empty array"));
    }
    Ok(())
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `EditrunConfig::default()`.
pub fn load_config(path: &Path) -> Result<EditrunConfig> {
    if !path.exists() {
        let cfg = EditrunConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: EditrunConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("validate {}", path.display()))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, EditrunConfig::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("editrun.toml");
        fs::write(
            &path,
            "model = \"gpt-4o\"\n[tests]\ncommand = [\"python\", \"-m\", \"pytest\"]\n",
        )
        .expect("write");

        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.model, "gpt-4o");
        assert_eq!(cfg.tests.command, vec!["python", "-m", "pytest"]);
        assert_eq!(cfg.tests.timeout_secs, TestConfig::default().timeout_secs);
        assert_eq!(cfg.editor, EditorConfig::default());
    }

    #[test]
    fn rejects_zero_timeout_and_empty_command() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("editrun.toml");
        fs::write(&path, "[scripts]\ntimeout_secs = 0\n").expect("write");
        let err = load_config(&path).unwrap_err();
        assert!(format!("{err:#}").contains("scripts.timeout_secs must be > 0"));

        let cfg = EditrunConfig {
            editor: EditorConfig {
                command: vec![" ".to_string()],
                ..EditorConfig::default()
            },
            ..EditrunConfig::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("editor.command"));
    }
}
