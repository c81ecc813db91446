pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "payhub",
    about = "Payhub operator CLI",
    long_about = "Inspect payhub configuration, check Visa Acceptance readiness, and preview query routing.",
    after_help = "Examples:\n  payhub doctor --json\n  payhub config\n  payhub parse \"list paid invoices\""
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Validate config, credential completeness, toolkit construction, and LLM setup")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Show which tool and arguments the rule-based selector picks for a query")]
    Parse {
        #[arg(help = "Free-text request, e.g. \"Create an invoice for $100 for jane@example.com\"")]
        query: Vec<String>,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Doctor { json } => commands::doctor::run(json),
        Command::Config => commands::CommandResult { exit_code: 0, output: commands::config::run() },
        Command::Parse { query } => commands::parse::run(&query.join(" ")),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
