// EN: src/bin/oneshot.rs

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use oneshot::{
    cli::{Action, Cli, CommandArgs},
    core::{config_loader, runner},
    models::{RunDefinition, RunMode, RunReport},
    system::executor::RunError,
};
use std::fs;
use std::io;
use std::path::Path;

/// The main entry point of the `oneshot` application.
/// It sets up logging, parses arguments, runs the requested action,
/// and performs centralized error handling.
fn main() {
    env_logger::init();

    if let Err(e) = run_cli(Cli::parse()) {
        // A RunError already names its cause, and the execution envelope must
        // reach stderr exactly as rendered. Everything else prints its chain.
        let message = match e.downcast_ref::<RunError>() {
            Some(run_error) => run_error.to_string(),
            None => format!("{:#}", e),
        };
        eprint!("{}: {}", "Error".red().bold(), message);
        if !message.ends_with('\n') {
            eprintln!();
        }
        std::process::exit(1);
    }
}

fn run_cli(cli: Cli) -> Result<()> {
    log::debug!("CLI args parsed: {:?}", cli);

    let config = config_loader::load_config(cli.config.as_deref())?;

    let report = match cli.action {
        Action::Run(args) => run_command(args, RunMode::Apply, &config.default_shell)?,
        Action::Plan(args) => run_command(args, RunMode::Plan, &config.default_shell)?,
        Action::Apply { file } => {
            let definition = load_definition(&file)?;
            runner::apply(&definition, &config.default_shell)?
        }
        Action::PlanFile { file } => {
            let definition = load_definition(&file)?;
            match runner::plan(&definition, &config.default_shell)? {
                Some(report) => report,
                None => {
                    log::info!("'{}' has no plan_command; nothing to run.", file.display());
                    return Ok(());
                }
            }
        }
    };

    emit(&report, cli.json)
}

/// Runs an ad-hoc command given on the command line.
fn run_command(args: CommandArgs, mode: RunMode, default_shell: &str) -> Result<RunReport> {
    let spec = args.into_spec(mode, default_shell);
    Ok(runner::run_spec(spec, mode)?)
}

fn load_definition(path: &Path) -> Result<RunDefinition> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read run definition '{}'", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse run definition '{}'", path.display()))
}

/// Replays the captured streams, or prints the report as JSON.
fn emit(report: &RunReport, json: bool) -> Result<()> {
    if json {
        let rendered = serde_json::to_string_pretty(report)?;
        println!("{}", rendered);
        return Ok(());
    }

    runner::replay(report, &mut io::stdout().lock(), &mut io::stderr().lock())?;
    Ok(())
}
