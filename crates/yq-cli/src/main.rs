//! yuniql CLI - versioned schema migrations for relational databases

use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;

use cli::Cli;
use commands::common::ExitCode;
use commands::{erase, init, list, platforms, rebase, run, vnext};

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    init_logging(cli.global.debug);

    match dispatch(&cli).await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(err) => match err.downcast_ref::<ExitCode>() {
            Some(ExitCode(code)) => std::process::ExitCode::from(u8::try_from(*code).unwrap_or(1)),
            None => {
                eprintln!("Error: {:#}", err);
                std::process::ExitCode::from(1)
            }
        },
    }
}

async fn dispatch(cli: &Cli) -> Result<()> {
    match &cli.command {
        cli::Commands::Init => init::execute(&cli.global).await,
        cli::Commands::Vnext(args) => vnext::execute(args, &cli.global).await,
        cli::Commands::Run(args) => run::execute(args, &cli.global, false).await,
        cli::Commands::Verify(args) => run::execute(args, &cli.global, true).await,
        cli::Commands::List(args) => list::execute(args, &cli.global).await,
        cli::Commands::Erase(args) => erase::execute(args, &cli.global).await,
        cli::Commands::Rebase(args) => rebase::execute(args, &cli.global).await,
        cli::Commands::Platforms => platforms::execute().await,
    }
}

/// `RUST_LOG` wins over `--debug`
fn init_logging(debug: bool) {
    let level = if debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .format_target(false)
        .init();
}
