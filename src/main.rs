//! Boardkeep CLI entry point.

use bk::cli::commands;
use bk::cli::{Cli, Commands};
use bk::error::Error;
use clap::Parser;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    init_tracing(cli.verbose, cli.quiet);

    // JSON when asked for, or when stdout is not a terminal
    let json = cli.json || !std::io::IsTerminal::is_terminal(&std::io::stdout());

    match run(&cli, json) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if json {
                eprintln!("{}", e.to_structured_json());
            } else if !cli.quiet {
                if let Some(hint) = e.hint() {
                    eprintln!("Error: {e}\n  Hint: {hint}");
                } else {
                    eprintln!("Error: {e}");
                }
            }
            ExitCode::from(e.exit_code())
        }
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    if quiet {
        return;
    }

    // Honor RUST_LOG if set, otherwise use verbosity flag
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("info"),
            2 => EnvFilter::new("debug,rusqlite=info"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn run(cli: &Cli, json: bool) -> Result<(), Error> {
    let db = cli.db.as_ref();
    let actor = cli.actor.as_deref();

    match &cli.command {
        Commands::Init { force } => {
            let actor = commands::resolve_actor(actor);
            commands::init::execute(db, &actor, *force, json)
        }
        Commands::Version => commands::version::execute(json),

        Commands::Workspace { command } => commands::workspace::execute(command, db, actor, json),
        Commands::Board { command } => commands::board::execute(command, db, actor, json),
        Commands::Column { command } => commands::column::execute(command, db, actor, json),
        Commands::Task { command } => commands::task::execute(command, db, actor, json),
        Commands::Item { command } => commands::item::execute(command, db, actor, json),
        Commands::Analytics { command } => commands::analytics::execute(command, db, actor, json),

        // Backlog
        Commands::Stale { days } => commands::backlog::execute_stale(*days, db, actor, json),
        Commands::Sweep { days, batch } => {
            commands::backlog::execute_sweep(*days, *batch, db, actor, json)
        }

        // Snapshots
        Commands::Export { output } => commands::transfer::execute_export(output, db, actor, json),
        Commands::Import { input } => commands::transfer::execute_import(input, db, actor, json),

        Commands::Doctor => commands::doctor::execute(db, actor, json),
        Commands::Completions { shell } => commands::completions::execute(shell),
    }
}
