mod batch;
mod catalog;
mod cli;
mod download;
mod enumerate;
mod extract;
mod flatten;
mod tool;

use std::process::ExitCode;

use anyhow::{Error, Result};
use clap::Parser;
use cli::{command, Cli, Commands};
use tracing::error;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    if let Err(e) = init_tracing(&cli.log_level, cli.log_json) {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let result = match &cli.command {
        Commands::Download(args) => command::download(args).await,
        Commands::Fetch { url, dir, timeout } => command::fetch(url, dir, *timeout).await,
        Commands::Extract { file } => command::extract(file).await,
        Commands::Dump {
            file,
            program,
            tool_args,
            out,
        } => command::dump(file, program, tool_args, out.as_ref()).await,
        Commands::Flatten { file } => command::flatten(file),
    };

    match result {
        Ok(message) => {
            if !message.is_empty() {
                println!("{}", message);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Command failed");
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(log_level: &str, json: bool) -> Result<(), Error> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(log_level))?;

    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    if json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }

    Ok(())
}
