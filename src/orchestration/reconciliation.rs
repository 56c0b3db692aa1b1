//! # Reconciliation Sweep
//!
//! Restores at-least-once delivery for tasks whose queue entry was lost:
//!
//! - `in_progress` tasks untouched for longer than `stale_after`, left behind
//!   by a worker that crashed mid-flight
//! - `pending` tasks that never got a queue entry because every enqueue
//!   attempt at submission failed
//!
//! `pending` tasks with a recorded queue entry are left alone however long
//! the backlog is. Before re-enqueueing, the sweep claims the task with a
//! compare-and-set on `updated_at`; a task changed by a worker since the
//! lookup is skipped, and a claimed task only looks stale again a full
//! `stale_after` later. The sweep never writes status or result.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::config::ReconciliationConfig;
use crate::constants::components;
use crate::error::{OrchestraError, OrchestraResult};
use crate::logging::log_error;
use crate::messaging::TaskQueue;
use crate::store::TaskStore;

pub struct ReconciliationSweep {
    store: Arc<dyn TaskStore>,
    queue: Arc<dyn TaskQueue>,
    config: ReconciliationConfig,
}

impl ReconciliationSweep {
    pub fn new(
        store: Arc<dyn TaskStore>,
        queue: Arc<dyn TaskQueue>,
        config: ReconciliationConfig,
    ) -> Self {
        Self {
            store,
            queue,
            config,
        }
    }

    /// Re-enqueue every stale task once; returns how many were queued
    #[instrument(skip(self))]
    pub async fn sweep_once(&self, now: DateTime<Utc>) -> OrchestraResult<usize> {
        let stale_after = chrono::Duration::from_std(self.config.stale_after()).map_err(|e| {
            OrchestraError::ConfigurationError(format!("stale_after out of range: {e}"))
        })?;
        let cutoff = now - stale_after;

        let stale = self
            .store
            .find_stale(cutoff, self.config.batch_size)
            .await?;

        let mut requeued = 0;
        for task in stale {
            match self.store.claim_stale(task.id, task.updated_at, now).await {
                Ok(true) => {}
                Ok(false) => {
                    debug!(task_id = %task.id, "Task changed since lookup; not re-enqueued");
                    continue;
                }
                Err(e) => {
                    warn!(task_id = %task.id, error = %e, "Failed to claim stale task");
                    continue;
                }
            }

            if let Err(e) = self.queue.enqueue(task.id).await {
                warn!(task_id = %task.id, error = %e, "Failed to re-enqueue stale task");
                continue;
            }
            if let Err(e) = self.store.mark_enqueued(task.id, now).await {
                warn!(task_id = %task.id, error = %e, "Failed to record queue entry");
            }

            requeued += 1;
            info!(
                task_id = %task.id,
                status = %task.status,
                updated_at = %task.updated_at,
                "♻️ Re-enqueued stale task"
            );
        }

        Ok(requeued)
    }

    /// Sweep every `interval` until shutdown
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            stale_after_s = self.config.stale_after_seconds,
            interval_s = self.config.interval_seconds,
            "🚀 Reconciliation sweep started"
        );

        loop {
            if *shutdown.borrow() || shutdown.has_changed().is_err() {
                break;
            }

            if let Err(e) = self.sweep_once(Utc::now()).await {
                log_error(components::RECONCILIATION, "sweep_once", &e.to_string(), None);
            }

            tokio::select! {
                _ = tokio::time::sleep(self.config.interval()) => {},
                _ = shutdown.changed() => {},
            }
        }

        info!("🛑 Reconciliation sweep stopped");
    }
}
