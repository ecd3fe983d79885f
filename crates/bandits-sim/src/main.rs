use std::error::Error;

use clap::{Parser, Subcommand};
use commands::{
    history::{self, HistoryArgs},
    run::{self, RunArgs},
    suggest::{self, SuggestArgs},
};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser, Debug)]
#[command(name = "banditsflow", about = "Tune and evaluate bandit actors with cached revival")]
struct Cli {
    /// Only log warnings and errors (overridden by RUST_LOG).
    #[arg(long, global = true)]
    quiet: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run optimize, evaluate and report for every configured actor.
    Run(RunArgs),
    /// Sample one parameter set from an actor's suggestion list.
    Suggest(SuggestArgs),
    /// Show what the history store holds for an actor.
    History(HistoryArgs),
}

fn init_tracing(quiet: bool) {
    let fallback = if quiet { "warn" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_tracing(cli.quiet);
    match cli.command {
        Command::Run(args) => run::run(&args),
        Command::Suggest(args) => suggest::run(&args),
        Command::History(args) => history::run(&args),
    }
}
