//! Browser-side collaborators consumed by the engine.
//!
//! Every trait is an async seam; the engine only ever talks to the browser
//! through these. `InMemoryBrowser` implements all of them for tests and the
//! CLI.

pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::CollaboratorError;
use crate::types::{
    BatteryStatus, MutationOutcome, ResourcePrediction, SuspendMethod, TabId, TabMetrics,
    TabSnapshot, VideoQuality,
};

pub use memory::{BrowserSnapshot, InMemoryBrowser, Mutation, TabEntry};

/// Source of the current tab list.
#[async_trait]
pub trait TabInventory: Send + Sync {
    async fn list_tabs(&self) -> Result<Vec<TabSnapshot>, CollaboratorError>;

    async fn get_tab(&self, id: TabId) -> Result<TabSnapshot, CollaboratorError> {
        self.list_tabs()
            .await?
            .into_iter()
            .find(|t| t.id == id)
            .ok_or(CollaboratorError::TabNotFound(id))
    }
}

/// Per-tab resource usage.
#[async_trait]
pub trait MetricsSource: Send + Sync {
    async fn tab_metrics(&self, id: TabId) -> Result<TabMetrics, CollaboratorError>;
}

/// Historical access frequency, if known.
#[async_trait]
pub trait AccessHistory: Send + Sync {
    /// Frequency in `(0.1, 0.9)`, or `None` when there is no history for the tab.
    async fn access_frequency(&self, id: TabId) -> Option<f64>;
}

/// Battery level and performance mode.
#[async_trait]
pub trait BatterySource: Send + Sync {
    async fn battery_status(&self) -> Result<BatteryStatus, CollaboratorError>;
}

/// Mutations applied to tabs.
#[async_trait]
pub trait TabController: Send + Sync {
    async fn suspend_tab(
        &self,
        id: TabId,
        method: SuspendMethod,
    ) -> Result<MutationOutcome, CollaboratorError>;

    async fn set_video_quality(
        &self,
        id: TabId,
        quality: VideoQuality,
    ) -> Result<MutationOutcome, CollaboratorError>;

    /// Register block rules, scoped to one tab or global when `id` is `None`.
    async fn register_block_rules(
        &self,
        id: Option<TabId>,
        rules: &[ResourcePrediction],
    ) -> Result<MutationOutcome, CollaboratorError>;

    async fn is_dark_mode(&self, id: TabId) -> Result<bool, CollaboratorError>;

    async fn set_dark_mode(
        &self,
        id: TabId,
        enabled: bool,
    ) -> Result<MutationOutcome, CollaboratorError>;
}

/// The full set of collaborators handed to the default handlers.
#[derive(Clone)]
pub struct Collaborators {
    pub tabs: Arc<dyn TabInventory>,
    pub metrics: Arc<dyn MetricsSource>,
    pub history: Arc<dyn AccessHistory>,
    pub battery: Arc<dyn BatterySource>,
    pub controller: Arc<dyn TabController>,
}

impl Collaborators {
    /// Wire every seam to the same in-memory browser.
    pub fn from_browser(browser: Arc<InMemoryBrowser>) -> Self {
        Self {
            tabs: browser.clone(),
            metrics: browser.clone(),
            history: browser.clone(),
            battery: browser.clone(),
            controller: browser,
        }
    }
}
