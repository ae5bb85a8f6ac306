mod app;
mod cli;
mod config;
mod media;
mod paths;
mod recording;
mod session;

#[cfg(test)]
mod testing;

use anyhow::Result;
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("bootcamp_dl=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = cli::Cli::parse();
    let selection = match cli.selection() {
        Ok(selection) => selection,
        Err(message) => cli::Cli::command()
            .error(ErrorKind::ArgumentConflict, message)
            .exit(),
    };
    app::run(&cli, selection)
}
