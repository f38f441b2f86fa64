mod cli;
mod dates;
mod error;
mod export;
mod fmt;
mod headers;
mod importer;
mod layout;
mod ledger;
mod models;
mod parse;
#[cfg(feature = "pdf")]
mod pdf;
mod render;
mod reports;
mod settings;
mod users;

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use cli::statements::StatementArgs;
use cli::{Cli, Commands, ConfigCommands};
use reports::ReportFilter;

fn setup_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn main() {
    setup_logging();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Import {
            files,
            mode,
            output,
        } => cli::import::run(&files, mode, output),
        Commands::Show { files, mode } => cli::show::run(&files, mode),
        Commands::Add { file, entries } => cli::entry::add(&file, &entries),
        Commands::Remove { file, row, all } => cli::entry::remove(&file, row, all),
        Commands::Statements {
            files,
            mode,
            from_id,
            to_id,
            from_date,
            to_date,
            no_snap,
            output,
        } => cli::statements::run(StatementArgs {
            files,
            mode,
            filter: ReportFilter {
                id_min: from_id,
                id_max: to_id,
                from_date,
                to_date,
                snap: !no_snap,
            },
            output,
        }),
        Commands::Users => cli::users::run(),
        Commands::Config { command } => match command {
            ConfigCommands::Show => cli::config::show(),
            ConfigCommands::Set { key, value } => cli::config::set(&key, &value),
        },
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "milkbook", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
