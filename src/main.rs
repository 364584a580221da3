#![allow(
    clippy::collapsible_else_if,
    clippy::collapsible_if,
    clippy::module_inception,
    clippy::useless_format
)]
#![deny(
    clippy::get_unwrap,
    clippy::panic,
    clippy::print_stdout,
    clippy::unwrap_used,
    clippy::use_debug,
    clippy::used_underscore_binding,
    clippy::used_underscore_items
)]

mod config;
mod logger;
mod ns;
mod sandbox;
mod util;

use anyhow::{Context, Result, anyhow};
use clap::{CommandFactory, Parser};
use clap_complete::CompleteEnv;
use config::cli::Args;
use log::{Log, info};
use nix::unistd::execvp;
use sandbox::{Role, SandboxRegistry};
use std::ffi::CString;
use std::path::Path;

pub fn main() -> Result<()> {
    let logger = logger::SandboxLogger::new(log::LevelFilter::Info)
        .init()
        .map_err(|e| anyhow!("Failed to initialize logger: {}", e))?;

    if std::env::var("COMPLETE").is_ok() {
        CompleteEnv::with_factory(Args::command).complete();
        return Ok(());
    }

    let cli = Args::parse();
    if let Some(log_level) = cli.log_level {
        logger.set_level(log_level);
    }

    /* With no sandbox and no process requested there is nothing to do. */
    if cli.sandbox_name.is_none() && cli.process_name.is_none() {
        Args::command().print_help().context("Failed to print usage")?;
        return Ok(());
    }

    /* A bare -p runs the process in the system sandbox. */
    let role = match &cli.sandbox_name {
        Some(name) => name.parse::<Role>()?,
        None => Role::System,
    };

    run_sandbox(role, cli.config_file.as_deref())?;

    let command = match &cli.process_name {
        Some(process_name) => process_name
            .split_whitespace()
            .map(String::from)
            .collect::<Vec<_>>(),
        None => vec![std::env::var("SHELL").unwrap_or("sh".to_string())],
    };
    if command.is_empty() {
        return Err(anyhow!("process name is empty"));
    }

    logger.flush();
    exec(&command)
}

/* Builds the sandbox inside a fresh mount namespace, then hops back to the
 * default namespace so the final enter() goes through the same captured
 * handle any other process would be handed. */
fn run_sandbox(role: Role, config_file: Option<&Path>) -> Result<()> {
    ns::init_default_namespace()
        .context("Failed to capture the default namespace")?;

    let mut registry = SandboxRegistry::new();
    registry
        .init_sandbox(role, config_file)
        .with_context(|| format!("Failed to initialize sandbox '{}'", role))?;
    registry.dump_sandbox(role);
    registry
        .prepare_sandbox(role)
        .with_context(|| format!("Failed to prepare sandbox '{}'", role))?;

    ns::enter_default_namespace()
        .context("Failed to re-enter the default namespace")?;
    ns::close_default_namespace();

    registry
        .enter_sandbox(role)
        .with_context(|| format!("Failed to enter sandbox '{}'", role))
}

/* On success this never returns. */
fn exec(command: &[String]) -> Result<()> {
    info!("Executing '{}' inside the sandbox", command.join(" "));
    let argv = command
        .iter()
        .map(|s| CString::new(s.as_str()))
        .collect::<Result<Vec<_>, _>>()
        .context("command contains an interior nul byte")?;

    let Err(e) = execvp(&argv[0], &argv);
    Err(anyhow!(
        "Failed to execute '{}': {}",
        command.join(" "),
        e
    ))
}
