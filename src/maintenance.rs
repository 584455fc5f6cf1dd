//! Background retention sweeper.
//!
//! Soft-deleted jobs stay in the table so they remain retrievable by id;
//! this loop physically removes the ones past the retention window.

use crate::db::repo::Repo;
use chrono::Local;
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tracing::{error, info};

pub struct Sweeper {
    repo: Arc<Repo>,
    sweep_interval_sec: u64,
    retention_days: u64,
}

impl Sweeper {
    pub fn new(repo: Arc<Repo>, sweep_interval_sec: u64, retention_days: u64) -> Self {
        Self {
            repo,
            sweep_interval_sec,
            retention_days,
        }
    }

    /// Main sweeper loop - runs indefinitely
    pub async fn run(&self) {
        info!("Retention sweeper started");

        loop {
            sleep(Duration::from_secs(self.sweep_interval_sec)).await;

            if let Err(e) = self.tick().await {
                error!("Sweeper tick error: {}", e);
            }
        }
    }

    /// Single tick - purge jobs soft-deleted before the retention cutoff
    async fn tick(&self) -> anyhow::Result<()> {
        let cutoff = Local::now() - chrono::Duration::days(self.retention_days as i64);
        let purged = self.repo.purge_deleted_jobs(cutoff).await?;

        if purged > 0 {
            info!("Purged {} soft-deleted jobs older than {}", purged, cutoff);
        }

        Ok(())
    }
}
