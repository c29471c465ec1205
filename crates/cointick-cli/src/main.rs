mod cli;
mod commands;
mod error;
mod logging;
mod output;
mod service;
mod tools;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use cointick_core::{MarketDataClient, Settings};

use crate::cli::Cli;
use crate::error::CliError;
use crate::service::ToolService;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::from(error.exit_code())
        }
    }
}

async fn run() -> Result<ExitCode, CliError> {
    let cli = Cli::parse();
    let settings = cli.apply(Settings::from_env()?);
    logging::init(&settings.log_level);

    let client = Arc::new(MarketDataClient::new(&settings.client));
    let service = ToolService::new(client, settings.cache.build(), cli.cache_mode());

    commands::run(&cli, &service).await
}
