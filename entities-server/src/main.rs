mod config;
mod db;
mod error;
mod logger;
mod models;
mod services;
mod state;

use crate::config::AppConfig;
use crate::db::connection::{close_pool, create_pool};
use crate::db::migrate::migrate;
use crate::error::CatalogError;
use crate::models::artist;
use crate::services::backup_runner::{
    drain_limit, run_backup, wait_for_running_backup, RunOutcome, Trigger,
};
use crate::services::backup_scheduler::BackupScheduler;
use crate::state::AppState;
use clap::{Parser, Subcommand};
use rand::Rng;
use std::sync::Arc;
use tokio::signal;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log level (trace, debug, info, warn, error); overrides LOG_LEVEL
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the backup scheduler until interrupted (default)
    Serve,
    /// Run one backup now and exit
    Backup,
    /// Create the database schema and exit
    Migrate,
    /// Add an artist to the catalog
    AddArtist { name: String },
    /// Print an artist by id or name
    ShowArtist { id_or_name: String },
    /// Print a random artist from the catalog
    RandomArtist,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = AppConfig::from_env()?;

    let log_level = args.log_level.as_deref().unwrap_or(&config.log_level);
    logger::init(log_level)?;

    let pool = create_pool(&config.db_path)?;
    migrate(&pool)?;

    let result = match args.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(pool.clone(), config).await,
        Command::Backup => backup_once(pool.clone(), config).await,
        Command::Migrate => Ok(()),
        Command::AddArtist { name } => add_artist(&pool, &name),
        Command::ShowArtist { id_or_name } => show_artist(&pool, &id_or_name),
        Command::RandomArtist => random_artist(&pool),
    };

    close_pool(&pool);
    result
}

async fn serve(pool: db::connection::DbPool, config: AppConfig) -> anyhow::Result<()> {
    tracing::info!(
        "Starting entities-server v{} (db: {})",
        env!("CARGO_PKG_VERSION"),
        config.db_path.display()
    );

    let state = Arc::new(AppState::new(pool, config).await?);
    let artists = artist::count(&*state.db.get()?)?;
    tracing::info!(artists, "Catalog opened");

    let scheduler = BackupScheduler::new(state.clone()).await?;
    scheduler.schedule_backup(&state.config.schedule).await?;
    scheduler.start().await?;

    shutdown_signal().await;

    tracing::info!("Shutting down...");
    if let Err(e) = scheduler.shutdown().await {
        tracing::warn!("Scheduler shutdown error: {}", e);
    }
    if !wait_for_running_backup(&state, drain_limit(state.config.storage_timeout)).await {
        tracing::warn!("Exiting while a backup run is in progress");
    }
    tracing::info!("Server stopped");
    Ok(())
}

async fn backup_once(pool: db::connection::DbPool, config: AppConfig) -> anyhow::Result<()> {
    let state = Arc::new(AppState::new(pool, config).await?);
    match run_backup(state, Trigger::Manual).await? {
        RunOutcome::Completed(run) => {
            println!(
                "uploaded {} ({} archived, pruned: {})",
                run.uploaded_object.unwrap_or_default(),
                run.inventory.len(),
                run.deleted_object.as_deref().unwrap_or("none")
            );
            Ok(())
        }
        RunOutcome::Skipped => anyhow::bail!("a backup is already running"),
    }
}

fn add_artist(pool: &db::connection::DbPool, name: &str) -> anyhow::Result<()> {
    let conn = pool.get()?;
    match artist::create(&conn, name) {
        Ok(a) => {
            println!("{}\t{}", a.id, a.name);
            Ok(())
        }
        Err(CatalogError::Internal(e)) => Err(e),
        Err(e) => anyhow::bail!("{}", e),
    }
}

fn show_artist(pool: &db::connection::DbPool, id_or_name: &str) -> anyhow::Result<()> {
    let conn = pool.get()?;
    let found = match artist::find_by_id(&conn, id_or_name)? {
        Some(a) => Some(a),
        None => artist::find_by_name(&conn, id_or_name)?,
    }
    .ok_or_else(|| CatalogError::NotFound(format!("Artist not found: {}", id_or_name)))?;
    println!("{}\t{}\t{}", found.id, found.name, found.created_at);
    Ok(())
}

fn random_artist(pool: &db::connection::DbPool) -> anyhow::Result<()> {
    let conn = pool.get()?;
    let total = artist::count(&conn)?;
    if total == 0 {
        return Err(CatalogError::NotFound("The catalog is empty".into()).into());
    }
    let offset = rand::thread_rng().gen_range(0..total);
    let picked = artist::find_at_offset(&conn, offset)?
        .ok_or_else(|| CatalogError::NotFound(format!("No artist at offset {}", offset)))?;
    println!("{}\t{}", picked.id, picked.name);
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to listen for ctrl+c");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to listen for SIGTERM")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT"),
        _ = terminate => tracing::info!("Received SIGTERM"),
    }
}
