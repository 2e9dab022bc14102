/// Orchestrator module - coordinates all components
///
/// The orchestrator owns the lifecycle of the engine:
/// - Opens the database and runs migrations
/// - Builds the region dispatcher, result cache and notifier from config
/// - Runs the scheduler until shutdown, then flushes every pending buffer


use std::sync::Arc;

use anyhow::Result;
use probekit::ProbeExecutor;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use uuid::Uuid;

use crate::config::Config;
use crate::database::{CheckStore, DatabaseImpl, ResultStore, initialize_database};
use crate::monitoring::cache::FlushOutcome;
use crate::monitoring::{
    AlertTrigger, BatchWriter, InMemoryResultCache, MonitoringScheduler, ProbeOutcome,
    RegionDispatcher, SchedulerOptions, notifier_from_config,
};
use crate::pool::LibsqlPool;

/// Main orchestrator for the Downwatch engine
pub struct Orchestrator {
    database: Arc<DatabaseImpl>,
    dispatcher: Arc<RegionDispatcher>,
    scheduler: MonitoringScheduler,
}

impl Orchestrator {
    /// Create and run an orchestrator until `shutdown` fires
    pub async fn start(config: Config, pool: LibsqlPool, shutdown: CancellationToken) -> Result<()> {
        let orchestrator = Self::new(&config, pool).await?;
        orchestrator.run(shutdown).await
    }

    /// Create a new orchestrator instance
    pub async fn new(config: &Config, pool: LibsqlPool) -> Result<Self> {
        // Get database connection for initialization
        let conn = pool.get().await?;
        info!("Initializing database schema...");
        initialize_database(&conn).await?;
        drop(conn);

        let database = Arc::new(DatabaseImpl::new_from_pool(pool));

        let executor = ProbeExecutor::new(config.probe.executor_config())?;
        let dispatcher = Arc::new(RegionDispatcher::from_config(config, executor)?);
        info!(regions = ?dispatcher.regions().collect::<Vec<_>>(), "Regions configured");

        let cache = Arc::new(InMemoryResultCache::new(config.scheduler.flush_threshold));
        let writer = Arc::new(BatchWriter::new(
            cache,
            database.clone(),
            config.scheduler.flush_policy,
        ));
        let alerts = AlertTrigger::new(notifier_from_config(&config.notification)?)
            .with_deadline(config.notification.timeout());

        let scheduler = MonitoringScheduler::new(
            database.clone(),
            dispatcher.clone(),
            writer,
            alerts,
            SchedulerOptions {
                tick: config.scheduler.tick(),
                deny_private_targets: config.validation.deny_private_targets,
            },
        );

        Ok(Self { database, dispatcher, scheduler })
    }

    /// Run the scheduler until shutdown, then flush everything still buffered
    pub async fn run(&self, shutdown: CancellationToken) -> Result<()> {
        info!("Starting Downwatch orchestrator...");
        self.scheduler.run(shutdown).await;

        info!("Flushing buffered results before exit");
        let mut lost = 0;
        for (check_id, outcome) in self.scheduler.writer().flush_all().await {
            if let FlushOutcome::Lost(rows) | FlushOutcome::Retained(rows) = outcome {
                error!(%check_id, rows, "Results could not be persisted on shutdown");
                lost += rows;
            }
        }

        info!(lost, "Orchestrator stopped");
        Ok(())
    }

    /// Probe one stored check from all its regions once, without scheduling
    /// or persisting anything
    pub async fn probe_once(&self, check_id: Uuid) -> Result<Vec<ProbeOutcome>> {
        let check = self
            .database
            .get_check(check_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("No check with id {check_id}"))?;

        Ok(self.dispatcher.dispatch_all(&check).await)
    }

    pub fn checks(&self) -> Arc<dyn CheckStore> {
        self.database.clone()
    }

    pub fn results(&self) -> Arc<dyn ResultStore> {
        self.database.clone()
    }
}
