use anyhow::Result;
use clap::{Parser, Subcommand};
use voicehub_backend::api;
use voicehub_backend::config::VoiceHubConfig;
use voicehub_backend::database::Database;
use voicehub_backend::telemetry;

#[derive(Parser)]
#[command(author, version, about = "VoiceHub feedback platform backend")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (Axum) for REST/API access
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init_tracing();

    let args = Args::parse();

    let config = VoiceHubConfig::from_env()?;
    config.paths.ensure_dirs()?;

    let database = Database::connect(&config.paths)?;
    let fresh = database.ensure_migrations()?;
    tracing::info!(
        db_path = %config.paths.db_path.display(),
        fresh,
        "database ready"
    );

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => api::serve_http(config, database).await,
    }
}
