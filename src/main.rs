mod artifact;
mod boundary;
mod cli;
mod config;
mod download;
mod error;
mod fonts;
mod gas;
mod parquet;
mod raster;
mod report;
mod series;

#[cfg(test)]
mod fixtures;

use anyhow::Result;
use clap::Parser;
use cli::{command, Cli, Commands};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result: Result<String> = match &cli.command {
        Commands::Report(args) => command::report(args),
        Commands::Series(args) => command::series(args),
        Commands::Fetch { url, data_dir } => command::fetch(url, data_dir).await,
    };

    match result {
        Ok(path) => println!("File saved to `{}`", path),
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
    }
}

/// `RUST_LOG` wins; otherwise info, or debug with `--verbose`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "airrep=debug" } else { "airrep=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
