//! Periodic optimization trigger.
//!
//! Runs the configured action list against the engine on a fixed interval.
//! Each tick derives the open-tab count from the inventory and awaits the
//! actions one after another.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tracing::{debug, warn};
use wattwise_core::config::ScheduleConfig;

use crate::collaborator::TabInventory;
use crate::orchestrator::ActionEngine;
use crate::types::{ActionContext, ExecutionResult};

/// Background loop driving `ActionEngine` on a timer.
pub struct OptimizationScheduler {
    engine: Arc<ActionEngine>,
    tabs: Arc<dyn TabInventory>,
    config: ScheduleConfig,
    shutdown: Arc<Notify>,
}

impl OptimizationScheduler {
    pub fn new(engine: Arc<ActionEngine>, tabs: Arc<dyn TabInventory>, config: ScheduleConfig) -> Self {
        Self {
            engine,
            tabs,
            config,
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Context for one tick. `active_tabs` stays unknown when the inventory
    /// cannot be read, which the tab-count guard treats as unsafe.
    async fn tick_context(&self) -> ActionContext {
        let active_tabs = match self.tabs.list_tabs().await {
            Ok(tabs) => Some(tabs.len()),
            Err(e) => {
                warn!(error = %e, "Tab inventory unavailable for scheduled run");
                None
            }
        };
        ActionContext {
            active_tabs,
            ..ActionContext::default()
        }
    }

    /// Run every configured action once, in order.
    ///
    /// Unknown action names are logged and skipped.
    pub async fn run_once(&self) -> Vec<ExecutionResult> {
        let context = self.tick_context().await;
        let mut results = Vec::with_capacity(self.config.actions.len());
        for action in &self.config.actions {
            match self.engine.execute_action(action, &context).await {
                Ok(result) => results.push(result),
                Err(e) => warn!(action = %action, error = %e, "Scheduled action skipped"),
            }
        }
        results
    }

    /// Start the loop. Returns on shutdown signal, or immediately when
    /// scheduling is disabled.
    pub async fn run(&self) {
        if !self.config.enabled {
            debug!("Optimization schedule disabled");
            return;
        }
        let period = Duration::from_secs(self.config.interval_secs.max(1));
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let results = self.run_once().await;
                    let saved: f64 = results.iter().map(|r| r.energy_saved).sum();
                    debug!(actions = results.len(), saved, "Scheduled optimization tick");
                }
                _ = self.shutdown.notified() => return,
            }
        }
    }

    /// Signal the scheduler to shut down gracefully.
    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }
}
