use chrono::{Local, NaiveDateTime, NaiveTime, TimeDelta};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::ModelRegistry;

/// Handle for stopping the daily reset job
pub struct ResetJobHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl ResetJobHandle {
    /// Signals the job to stop and waits for it to exit.
    ///
    /// A reset already in progress completes first.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Daily reset job ended abnormally");
        }
        tracing::info!("Daily reset job stopped");
    }
}

/// Spawns the job that empties the catalog and re-fits once a day at `at`
/// local time
pub fn spawn_daily_reset(registry: Arc<ModelRegistry>, at: NaiveTime) -> ResetJobHandle {
    let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
    let task = tokio::spawn(async move {
        reset_job_task(registry, at, shutdown_rx).await;
    });

    ResetJobHandle { shutdown_tx, task }
}

async fn reset_job_task(
    registry: Arc<ModelRegistry>,
    at: NaiveTime,
    mut shutdown_rx: mpsc::Receiver<()>,
) {
    tracing::info!(at = %at, "Daily catalog reset scheduled");

    loop {
        let wait = until_next(Local::now().naive_local(), at);
        tracing::debug!(wait_secs = wait.as_secs(), "Waiting for next catalog reset");

        tokio::select! {
            _ = tokio::time::sleep(wait) => {
                tracing::info!("Running daily catalog reset");
                match registry.reset_catalog().await {
                    Ok(()) => tracing::info!("Daily catalog reset completed"),
                    Err(e) => tracing::error!(error = %e, "Daily catalog reset failed"),
                }
            }
            _ = shutdown_rx.recv() => {
                tracing::info!("Daily reset job shutting down");
                break;
            }
        }
    }
}

/// First moment strictly after `now` whose wall-clock time is `at`
pub fn next_occurrence(now: NaiveDateTime, at: NaiveTime) -> NaiveDateTime {
    let today = now.date().and_time(at);
    if today > now {
        today
    } else {
        today + TimeDelta::days(1)
    }
}

fn until_next(now: NaiveDateTime, at: NaiveTime) -> Duration {
    (next_occurrence(now, at) - now)
        .to_std()
        .unwrap_or(Duration::ZERO)
}
