//! optdeps - optional Python dependency audit CLI tool
//!
//! Declares the configured dependencies against one or more site-packages
//! directories and reports whether each is installed and compatible:
//! - exit code 0: every dependency satisfied
//! - exit code 2: at least one dependency missing or mismatched
//! - exit code 1: invalid declarations, config or environment

use clap::Parser;
use colored::Colorize;
use optdeps::cli::CliArgs;
use optdeps::orchestrator::Orchestrator;
use optdeps::output::{create_formatter, OutputConfig};
use std::io::{self, IsTerminal, Write};
use std::process::ExitCode;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let args = CliArgs::parse();
    init_logging(&args);

    // Run the main logic and handle errors
    match run(args) {
        Ok(exit_code) => exit_code,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

/// Log to stderr; `OPTDEPS_LOG` overrides the level chosen by the flags
fn init_logging(args: &CliArgs) {
    let level = if args.verbose {
        LevelFilter::DEBUG
    } else if args.quiet {
        LevelFilter::ERROR
    } else {
        LevelFilter::WARN
    };

    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .with_env_var("OPTDEPS_LOG")
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .without_time()
        .init();
}

/// Main application logic
fn run(args: CliArgs) -> anyhow::Result<ExitCode> {
    let orchestrator = Orchestrator::new(args.clone())?;
    let result = orchestrator.run()?;

    let mut output_config = OutputConfig::from_cli(args.json, args.verbose, args.quiet);
    output_config.color = io::stdout().is_terminal();
    let formatter = create_formatter(output_config);

    let mut stdout = io::stdout().lock();
    formatter.format(&result, &mut stdout)?;
    stdout.flush()?;

    if result.all_satisfied() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(2))
    }
}
