mod cli;
mod commands;
mod formatting;
mod settings;

use std::process::ExitCode;

use cli::Commands;
use commands::{run_extract, run_plugins};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    run().await
}

async fn run() -> ExitCode {
    let raw_args: Vec<String> = std::env::args().collect();
    let args = cli::parse();
    init_tracing(args.verbose);

    match args.command {
        Commands::Extract(extract) => {
            run_extract(&raw_args, args.config, args.verbose, extract).await
        }
        Commands::Plugins { format } => run_plugins(args.config, args.verbose, format),
    }
}

/// Structured logs go to stderr; `RUST_LOG` overrides the default level.
fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("dsx={level},dsx_lib={level},warn")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}
