/// Monitoring engine module - decides what runs when and where results go
///
/// This module is responsible for:
/// - Scheduling due checks on a fixed tick
/// - Fanning each check out to its regions
/// - Buffering outcomes and flushing them in batches
/// - Alerting when a region reports down
pub mod alert;
pub mod cache;
pub mod checker;
pub mod dispatcher;
pub mod scheduler;
pub mod types;
pub mod validation;

pub use alert::{AlertTrigger, Notifier, notifier_from_config};
pub use cache::{BatchWriter, FlushPolicy, InMemoryResultCache, ResultCache};
pub use checker::{LocalProber, Prober, RemoteProber};
pub use dispatcher::RegionDispatcher;
pub use scheduler::{MonitoringScheduler, SchedulerOptions, TickSummary};
pub use types::{Check, ProbeOutcome, TickBatch};
