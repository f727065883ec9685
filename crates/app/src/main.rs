use std::process::ExitCode;

use clap::Parser;
use migration::{Migrator, MigratorTrait};

use crate::{
    cli::Cli,
    error::{AppError, Result},
    settings::Settings,
};

mod cli;
mod error;
mod settings;

/// sysexits.h: temporary failure, the user is invited to retry.
const EX_TEMPFAIL: u8 = 75;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let settings = match Settings::new(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "bizledger={level},engine={level}",
            level = settings.app.level
        ))
        .with_writer(std::io::stderr)
        .init();

    match run(cli, &settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(AppError::Engine(err)) if err.is_retryable() => {
            tracing::warn!("{err}");
            eprintln!("{err} (try again)");
            ExitCode::from(EX_TEMPFAIL)
        }
        Err(err) => {
            tracing::error!("{err}");
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, settings: &Settings) -> Result<()> {
    let db = connect(&settings.database).await?;
    let engine = engine::Engine::builder()
        .database(db)
        .lock_timeout(settings.engine.lock_timeout())
        .build()
        .await?;

    cli::run(&engine, cli.command, cli.actor).await
}

async fn connect(config: &settings::Database) -> Result<sea_orm::DatabaseConnection> {
    let url = config.url();
    tracing::debug!(%url, "opening database");
    let database = sea_orm::Database::connect(url).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}
