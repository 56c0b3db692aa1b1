//! Orchestra Worker Binary
//!
//! Runs the task worker (and the reconciliation sweep when enabled) against
//! Postgres, pgmq and the HTTP inference service until Ctrl-C.

use anyhow::Context;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::watch;
use tracing::info;

use llm_orchestra::config::ConfigManager;
use llm_orchestra::database::{connect, health_check, run_migrations};
use llm_orchestra::gateway::HttpInferenceGateway;
use llm_orchestra::logging::init_structured_logging;
use llm_orchestra::messaging::PgmqTaskQueue;
use llm_orchestra::orchestration::{ReconciliationSweep, TaskWorker};
use llm_orchestra::store::PgTaskStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_structured_logging();

    let manager = ConfigManager::load().context("loading configuration")?;
    let config = manager.config().clone();

    let pool = connect(&config.database)
        .await
        .context("connecting to the database")?;
    if !health_check(&pool).await.context("database health check")? {
        anyhow::bail!("database health check returned an unexpected value");
    }
    run_migrations(&pool).await.context("running migrations")?;

    let queue = PgmqTaskQueue::with_pool(pool.clone(), &config.queue).await;
    queue.ensure_queue().await.context("creating task queue")?;

    let store = Arc::new(PgTaskStore::new(pool.clone()));
    let queue = Arc::new(queue);
    let gateway = Arc::new(HttpInferenceGateway::new(&config.gateway).context("building gateway")?);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let worker = TaskWorker::new(store.clone(), queue.clone(), gateway, &config);
    let worker_handle = tokio::spawn({
        let shutdown = shutdown_rx.clone();
        async move { worker.run(shutdown).await }
    });

    let sweep_handle = config.reconciliation.enabled.then(|| {
        let sweep = ReconciliationSweep::new(store, queue, config.reconciliation.clone());
        let shutdown = shutdown_rx.clone();
        tokio::spawn(async move { sweep.run(shutdown).await })
    });

    info!(
        environment = manager.environment(),
        queue = %config.queue.name,
        reconciliation = config.reconciliation.enabled,
        "Orchestra worker running; press Ctrl-C to stop"
    );

    signal::ctrl_c().await.context("waiting for Ctrl-C")?;
    info!("Shutdown signal received");
    shutdown_tx.send_replace(true);

    let stats = worker_handle.await.context("joining worker task")?;
    if let Some(handle) = sweep_handle {
        handle.await.context("joining reconciliation task")?;
    }

    pool.close().await;
    info!(?stats, "Orchestra worker stopped");
    Ok(())
}
