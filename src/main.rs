#![deny(warnings)]
#![deny(clippy::unwrap_used)]

use std::process::ExitCode;

use clap::Parser;
use dotenv::dotenv;
use rcon_cli::backend::{Backends, ConnectionSettings};
use rcon_cli::cli::Cli;
use rcon_cli::config::FileConfigSource;
use rcon_cli::logger::FileLogSink;
use rcon_cli::{AppError, Dispatcher, credentials, interactive};
use tokio::io::BufReader;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// `RUST_LOG` wins; otherwise `-v` raises the level for this crate.
fn create_env_filter(verbosity: u8) -> EnvFilter {
    if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        match verbosity {
            0 => EnvFilter::new("rcon_cli=warn"),
            1 => EnvFilter::new("rcon_cli=info"),
            2 => EnvFilter::new("rcon_cli=debug"),
            _ => EnvFilter::new("rcon_cli=trace,tokio_tungstenite=debug"),
        }
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let source = FileConfigSource::new(cli.cfg.clone());
    let session = credentials::resolve(cli.overrides(), &source, cli.env.as_deref())?;
    debug!("Resolved session: {:?}", session);

    let settings = ConnectionSettings::resolve(cli.timeout);
    let dispatcher = Dispatcher::new(
        Backends::network(settings),
        Box::new(FileLogSink::default()),
    );

    let mut stdout = tokio::io::stdout();

    match cli.command_text() {
        Some(command) => {
            if session.address.is_empty() {
                return Err(AppError::missing_address());
            }
            if session.password.is_empty() {
                return Err(AppError::missing_password());
            }
            dispatcher.execute(&mut stdout, &session, &command).await
        }
        None => {
            let mut stdin = BufReader::new(tokio::io::stdin());
            interactive::run(&dispatcher, &mut stdin, &mut stdout, session).await
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();

    let cli = Cli::parse();

    // Diagnostics go to stderr; stdout carries command output only.
    tracing_subscriber::fmt()
        .with_env_filter(create_env_filter(cli.verbose))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            debug!("Exiting with error: {:?}", e);
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}
