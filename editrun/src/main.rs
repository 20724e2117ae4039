//! `editrun`: run an AI code editor over a plan of directories and files,
//! then optionally execute the edited scripts and their tests.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use editrun::execute::execute;
use editrun::exit_codes;
use editrun::io::config::{DEFAULT_CONFIG_FILE, EditrunConfig, load_config};
use editrun::io::credentials::api_key_from_env;
use editrun::io::editor::AiderEditor;
use editrun::io::files::list_files;
use editrun::io::plan::load_request;
use editrun::io::recorder::{ConsoleSink, Recorder, unique_run_id};
use editrun::io::scripts::CommandScriptRunner;
use editrun::logging;

#[derive(Parser)]
#[command(
    name = "editrun",
    version,
    about = "Batch AI code edits with optional script and test runs"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Edit every file in a plan, then run scripts and tests where enabled.
    Run {
        /// Plan file (TOML) listing directories, files and flags.
        #[arg(long)]
        plan: PathBuf,
        #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,
        /// Model identifier; overrides the plan and the config.
        #[arg(long)]
        model: Option<String>,
        /// Where per-run logs are written; overrides the config.
        #[arg(long)]
        log_dir: Option<PathBuf>,
        /// Print each result as it is produced.
        #[arg(short, long)]
        verbose: bool,
    },
    /// Check a plan, its files and the API key without editing anything.
    Validate {
        #[arg(long)]
        plan: PathBuf,
        #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,
    },
    /// List files under a directory, relative to it.
    List { dir: PathBuf },
}

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let verbose = matches!(cli.command, Command::Run { verbose: true, .. });
    logging::init(verbose);
    match cli.command {
        Command::Run {
            plan,
            config,
            model,
            log_dir,
            verbose,
        } => cmd_run(&plan, &config, model, log_dir, verbose),
        Command::Validate { plan, config } => cmd_validate(&plan, &config),
        Command::List { dir } => cmd_list(&dir),
    }
}

fn cmd_run(
    plan: &Path,
    config_path: &Path,
    model: Option<String>,
    log_dir: Option<PathBuf>,
    verbose: bool,
) -> Result<i32> {
    let mut config = load_config(config_path)?;
    if let Some(log_dir) = log_dir {
        config.log_dir = log_dir;
    }
    let api_key = api_key_from_env(&config.editor.api_key_env)?;
    let mut request = load_request(plan, &config.model, verbose)?;
    if let Some(model) = model {
        request.model = model;
    }

    let editor = AiderEditor::new(&config, api_key)?;
    let scripts = CommandScriptRunner::new(&config)?;
    let run_id = unique_run_id(&config.log_dir);
    let recorder = Recorder::new(
        &run_id,
        &request.model,
        ConsoleSink,
        Some(config.log_dir.clone()),
    );

    let run = execute(&request, &editor, &scripts, recorder).context("execute run")?;
    if let Some(paths) = &run.paths {
        info!(dir = %paths.dir.display(), "run logs written");
        eprintln!("logs: {}", paths.dir.display());
    }
    Ok(if run.summary.has_failures() {
        exit_codes::FAILURES
    } else {
        exit_codes::OK
    })
}

fn cmd_validate(plan: &Path, config_path: &Path) -> Result<i32> {
    let config: EditrunConfig = load_config(config_path)?;
    api_key_from_env(&config.editor.api_key_env)?;
    let request = load_request(plan, &config.model, false)?;
    println!(
        "ok: {} directories, {} files, model {}",
        request.directories.len(),
        request.total_files(),
        request.model
    );
    Ok(exit_codes::OK)
}

fn cmd_list(dir: &Path) -> Result<i32> {
    for file in list_files(dir)? {
        println!("{}", file.display());
    }
    Ok(exit_codes::OK)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_run_with_overrides() {
        let cli = Cli::parse_from([
            "editrun",
            "run",
            "--plan",
            "plan.toml",
            "--model",
            "gpt-4o",
            "-v",
        ]);
        match cli.command {
            Command::Run {
                plan,
                config,
                model,
                log_dir,
                verbose,
            } => {
                assert_eq!(plan, PathBuf::from("plan.toml"));
                assert_eq!(config, PathBuf::from(DEFAULT_CONFIG_FILE));
                assert_eq!(model.as_deref(), Some("gpt-4o"));
                assert!(log_dir.is_none());
                assert!(verbose);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn parse_validate_and_list() {
        let cli = Cli::parse_from(["editrun", "validate", "--plan", "p.toml"]);
        assert!(matches!(cli.command, Command::Validate { .. }));

        let cli = Cli::parse_from(["editrun", "list", "src"]);
        assert!(matches!(cli.command, Command::List { dir } if dir == PathBuf::from("src")));
    }

    #[test]
    fn run_requires_plan() {
        assert!(Cli::try_parse_from(["editrun", "run"]).is_err());
    }
}
