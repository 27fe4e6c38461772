//! In-memory browser implementing every collaborator trait.
//!
//! Loaded from a JSON `BrowserSnapshot`. Records each mutation it receives
//! and can be switched into failure modes to exercise degraded paths.

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use wattwise_core::error::WattwiseError;

use super::{AccessHistory, BatterySource, MetricsSource, TabController, TabInventory};
use crate::error::CollaboratorError;
use crate::types::{
    BatteryStatus, MutationOutcome, ResourcePrediction, SuspendMethod, TabId, TabMetrics,
    TabSnapshot, VideoQuality,
};

/// A tab together with everything the collaborators report about it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabEntry {
    #[serde(flatten)]
    pub snapshot: TabSnapshot,
    #[serde(default)]
    pub metrics: TabMetrics,
    #[serde(default)]
    pub access_frequency: Option<f64>,
    #[serde(default)]
    pub dark_mode: bool,
    #[serde(default)]
    pub suspended: bool,
}

impl TabEntry {
    pub fn new(snapshot: TabSnapshot, metrics: TabMetrics) -> Self {
        Self {
            snapshot,
            metrics,
            access_frequency: None,
            dark_mode: false,
            suspended: false,
        }
    }
}

/// Serializable browser state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BrowserSnapshot {
    pub tabs: Vec<TabEntry>,
    #[serde(default)]
    pub battery: BatteryStatus,
}

/// A mutation the browser was asked to apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Mutation {
    Suspend { tab: TabId, method: SuspendMethod },
    VideoQuality { tab: TabId, quality: VideoQuality },
    BlockRules { tab: Option<TabId>, patterns: Vec<String> },
    DarkMode { tab: TabId, enabled: bool },
}

#[derive(Debug, Default)]
struct BrowserState {
    snapshot: BrowserSnapshot,
    mutations: Vec<Mutation>,
    inventory_down: bool,
    battery_down: bool,
    reject_mutations: bool,
}

/// Browser double backed by a `BrowserSnapshot`.
#[derive(Debug, Default)]
pub struct InMemoryBrowser {
    state: Mutex<BrowserState>,
}

impl InMemoryBrowser {
    pub fn new(snapshot: BrowserSnapshot) -> Self {
        Self {
            state: Mutex::new(BrowserState {
                snapshot,
                ..BrowserState::default()
            }),
        }
    }

    /// Parse a JSON `BrowserSnapshot`.
    pub fn from_json(json: &str) -> Result<Self, WattwiseError> {
        let snapshot: BrowserSnapshot = serde_json::from_str(json)?;
        Ok(Self::new(snapshot))
    }

    fn state(&self) -> MutexGuard<'_, BrowserState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every mutation applied so far, in order.
    pub fn mutations(&self) -> Vec<Mutation> {
        self.state().mutations.clone()
    }

    pub fn suspended_tabs(&self) -> Vec<TabId> {
        self.state()
            .snapshot
            .tabs
            .iter()
            .filter(|e| e.suspended)
            .map(|e| e.snapshot.id)
            .collect()
    }

    pub fn tab_count(&self) -> usize {
        self.state().snapshot.tabs.len()
    }

    pub fn set_inventory_available(&self, available: bool) {
        self.state().inventory_down = !available;
    }

    pub fn set_battery_available(&self, available: bool) {
        self.state().battery_down = !available;
    }

    pub fn set_reject_mutations(&self, reject: bool) {
        self.state().reject_mutations = reject;
    }

    fn apply(
        &self,
        id: Option<TabId>,
        mutation: Mutation,
        update: impl FnOnce(&mut TabEntry),
    ) -> Result<MutationOutcome, CollaboratorError> {
        let mut state = self.state();
        if state.reject_mutations {
            return Ok(MutationOutcome::rejected("browser refused the mutation"));
        }
        if let Some(id) = id {
            let entry = state
                .snapshot
                .tabs
                .iter_mut()
                .find(|e| e.snapshot.id == id)
                .ok_or(CollaboratorError::TabNotFound(id))?;
            update(entry);
        }
        state.mutations.push(mutation);
        Ok(MutationOutcome::ok())
    }
}

#[async_trait]
impl TabInventory for InMemoryBrowser {
    async fn list_tabs(&self) -> Result<Vec<TabSnapshot>, CollaboratorError> {
        let state = self.state();
        if state.inventory_down {
            return Err(CollaboratorError::Unavailable("tab inventory".to_string()));
        }
        Ok(state.snapshot.tabs.iter().map(|e| e.snapshot.clone()).collect())
    }
}

#[async_trait]
impl MetricsSource for InMemoryBrowser {
    async fn tab_metrics(&self, id: TabId) -> Result<TabMetrics, CollaboratorError> {
        self.state()
            .snapshot
            .tabs
            .iter()
            .find(|e| e.snapshot.id == id)
            .map(|e| e.metrics)
            .ok_or(CollaboratorError::TabNotFound(id))
    }
}

#[async_trait]
impl AccessHistory for InMemoryBrowser {
    async fn access_frequency(&self, id: TabId) -> Option<f64> {
        self.state()
            .snapshot
            .tabs
            .iter()
            .find(|e| e.snapshot.id == id)
            .and_then(|e| e.access_frequency)
    }
}

#[async_trait]
impl BatterySource for InMemoryBrowser {
    async fn battery_status(&self) -> Result<BatteryStatus, CollaboratorError> {
        let state = self.state();
        if state.battery_down {
            return Err(CollaboratorError::Unavailable("battery".to_string()));
        }
        Ok(state.snapshot.battery)
    }
}

#[async_trait]
impl TabController for InMemoryBrowser {
    async fn suspend_tab(
        &self,
        id: TabId,
        method: SuspendMethod,
    ) -> Result<MutationOutcome, CollaboratorError> {
        self.apply(Some(id), Mutation::Suspend { tab: id, method }, |entry| {
            entry.suspended = true;
            // A suspended tab stops drawing power.
            entry.metrics = TabMetrics::default();
        })
    }

    async fn set_video_quality(
        &self,
        id: TabId,
        quality: VideoQuality,
    ) -> Result<MutationOutcome, CollaboratorError> {
        self.apply(Some(id), Mutation::VideoQuality { tab: id, quality }, |_| {})
    }

    async fn register_block_rules(
        &self,
        id: Option<TabId>,
        rules: &[ResourcePrediction],
    ) -> Result<MutationOutcome, CollaboratorError> {
        let patterns = rules.iter().map(|r| r.url_pattern.clone()).collect();
        self.apply(id, Mutation::BlockRules { tab: id, patterns }, |_| {})
    }

    async fn is_dark_mode(&self, id: TabId) -> Result<bool, CollaboratorError> {
        self.state()
            .snapshot
            .tabs
            .iter()
            .find(|e| e.snapshot.id == id)
            .map(|e| e.dark_mode)
            .ok_or(CollaboratorError::TabNotFound(id))
    }

    async fn set_dark_mode(
        &self,
        id: TabId,
        enabled: bool,
    ) -> Result<MutationOutcome, CollaboratorError> {
        self.apply(Some(id), Mutation::DarkMode { tab: id, enabled }, |entry| {
            entry.dark_mode = enabled;
        })
    }
}
