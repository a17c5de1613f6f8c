// src/bin/preflight.rs

use anyhow::{Context, Result};
use colored::*;
use preflight::{
    cli,
    constants::COMMANDS_PATH_ENV,
    core::{
        bootstrap::{Bootstrap, BootstrapOutcome, Invocation},
        command_registry::CommandRegistry,
        deprecation::DeprecationLogger,
        input_resolver::InputResolver,
    },
};
use std::env;
use std::path::Path;

/// Entry point: resolves the invocation and its service configuration, then
/// prints help, the version, or the resolved invocation as JSON.
fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("\n{}: {:#}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let registry = load_registry()?;
    let deprecations = DeprecationLogger::from_env();
    let resolver = InputResolver::new(env::args().skip(1).collect(), &registry, &deprecations);
    let cwd = env::current_dir().context("Could not determine the working directory")?;

    // Variable sources and their grammar are provided by the host tool; on
    // its own the binary reads the configuration without resolving it.
    let outcome = Bootstrap::new(&resolver, &deprecations, cwd).run()?;

    match outcome {
        BootstrapOutcome::Version => println!("{}", cli::render_version()),
        BootstrapOutcome::Ready(invocation) if invocation.input.is_help_request => {
            print_help(&registry, &invocation)
        }
        BootstrapOutcome::Ready(invocation) => {
            log::debug!("Invocation {} ready", invocation.id);
            println!("{}", serde_json::to_string_pretty(&invocation)?);
        }
    }
    Ok(())
}

/// Built-in commands, extended by the file named in `PREFLIGHT_COMMANDS_PATH`.
fn load_registry() -> Result<CommandRegistry> {
    let mut registry = CommandRegistry::builtin();
    if let Ok(path) = env::var(COMMANDS_PATH_ENV) {
        let extra = CommandRegistry::load_file(Path::new(&path))
            .with_context(|| format!("Failed to load commands from '{}'", path))?;
        log::debug!("Loaded {} extra commands from '{}'", extra.len(), path);
        registry.extend(extra);
    }
    Ok(registry)
}

fn print_help(registry: &CommandRegistry, invocation: &Invocation) {
    let command = invocation.input.command();
    let help = match command.as_str() {
        "" | "help" => None,
        name => cli::render_command_help(registry, name),
    };
    println!("{}", help.unwrap_or_else(|| cli::render_general_help(registry)));
}
