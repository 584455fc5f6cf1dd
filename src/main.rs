use anyhow::Result;
use chatstore::config::Config;
use chatstore::db;
use chatstore::maintenance::Sweeper;
use sea_orm_migration::MigratorTrait;
use tracing::info;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::load()?;

    let log_level = config.log_level();
    let log_dir = &config.logging.dir;

    // Create log directory if it doesn't exist
    std::fs::create_dir_all(log_dir)?;

    // Setup file appender (daily rotation)
    let file_appender = tracing_appender::rolling::daily(log_dir, "chatstore.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    // Use local time for log timestamps
    let local_timer = ChronoLocal::rfc_3339();

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_line_number(true)
        .with_file(true)
        .with_target(false)
        .with_timer(local_timer.clone());

    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_timer(local_timer)
        .with_writer(non_blocking);

    let filter_layer = EnvFilter::from_default_env()
        .add_directive(log_level.into())
        .add_directive("sqlx=warn".parse().unwrap())
        .add_directive("sea_orm=warn".parse().unwrap());

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    info!("Starting chatstore...");
    info!("Logs are written to: {}", log_dir);

    // Connect to database
    let db = db::establish_connection(&config.database.url).await?;
    info!("Database connection established");

    // Run migrations
    migration::Migrator::up(&db, None).await?;
    info!("Database migrations completed");

    // Initialize repository
    let repo = std::sync::Arc::new(db::repo::Repo::new(db.clone()));

    repo.ping().await?;
    info!("Database ping successful");

    let sessions = repo.count_sessions().await?;
    let active_jobs = repo.count_active_jobs().await?;
    info!("{} sessions, {} active jobs", sessions, active_jobs);

    // Spawn retention sweeper in background
    let sweeper = Sweeper::new(
        repo.clone(),
        config.maintenance.sweep_interval_sec,
        config.maintenance.retention_days,
    );
    let sweeper_handle = tokio::spawn(async move {
        sweeper.run().await;
    });

    info!("chatstore initialization complete");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Received Ctrl+C, shutting down...");

    sweeper_handle.abort();

    info!("Shutdown complete");
    Ok(())
}
