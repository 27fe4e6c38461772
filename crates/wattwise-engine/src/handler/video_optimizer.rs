//! Video quality strategy.
//!
//! Picks a target rung on the quality ladder from the energy budget, battery
//! level and network speed, and only steps down when the current rung is
//! more than one above the target.

use async_trait::async_trait;
use tracing::{debug, info, warn};
use wattwise_core::config::VideoConfig;

use crate::collaborator::Collaborators;
use crate::error::ActionError;
use crate::handler::ActionHandler;
use crate::types::{
    ActionContext, EnergyBudget, HandlerOutcome, NetworkSpeed, UserImpact, VideoQuality,
};

/// Handler for `dynamicVideoOptimization`.
pub struct VideoOptimizer {
    config: VideoConfig,
    collaborators: Collaborators,
}

impl VideoOptimizer {
    pub fn new(config: VideoConfig, collaborators: Collaborators) -> Self {
        Self {
            config,
            collaborators,
        }
    }

    pub fn optimal_quality(
        &self,
        budget: EnergyBudget,
        battery_level: Option<f64>,
        network: NetworkSpeed,
    ) -> VideoQuality {
        let low_battery = battery_level.is_some_and(|l| l < self.config.low_battery_threshold);
        match (budget, network) {
            _ if budget == EnergyBudget::Low || low_battery => VideoQuality::P360,
            (EnergyBudget::Medium, n) if n != NetworkSpeed::High => VideoQuality::P480,
            (EnergyBudget::High, NetworkSpeed::High) => VideoQuality::P720,
            _ => VideoQuality::P480,
        }
    }

    /// True only when `current` is more than one rung above `target`.
    pub fn should_change(current: VideoQuality, target: VideoQuality) -> bool {
        current.level() > target.level() + 1
    }

    /// Saving relative to full-quality playback.
    pub fn energy_saved(target: VideoQuality) -> f64 {
        VideoQuality::P1080.energy_units() - target.energy_units()
    }
}

#[async_trait]
impl ActionHandler for VideoOptimizer {
    async fn execute(&self, context: &ActionContext) -> Result<HandlerOutcome, ActionError> {
        let tab_id = context
            .tab_id
            .ok_or_else(|| ActionError::InvalidContext("tab_id is required".to_string()))?;
        // Without the playing quality any change could be a step up.
        let Some(current) = context.current_quality else {
            debug!(tab = %tab_id, "Current quality unknown, leaving playback alone");
            return Ok(HandlerOutcome::no_effect(serde_json::json!({
                "tab_id": tab_id,
                "changed": false,
                "reason": "current quality unknown",
            })));
        };

        let battery = if context.energy_budget.is_none() || context.battery_level.is_none() {
            match self.collaborators.battery.battery_status().await {
                Ok(status) => Some(status),
                Err(e) => {
                    debug!(error = %e, "Battery status unavailable");
                    None
                }
            }
        } else {
            None
        };

        let budget = context
            .energy_budget
            .or_else(|| battery.map(|b| b.mode.energy_budget()))
            .unwrap_or(EnergyBudget::Medium);
        // A charging device is never treated as low on battery.
        let battery_level = context
            .battery_level
            .or_else(|| battery.filter(|b| !b.charging).map(|b| b.level));
        let network = context.network_speed.unwrap_or(NetworkSpeed::Medium);

        let target = self.optimal_quality(budget, battery_level, network);
        if !Self::should_change(current, target) {
            return Ok(HandlerOutcome::no_effect(serde_json::json!({
                "tab_id": tab_id,
                "current": current,
                "target": target,
                "changed": false,
            })));
        }

        match self
            .collaborators
            .controller
            .set_video_quality(tab_id, target)
            .await
        {
            Ok(outcome) if outcome.success => {
                let saved = Self::energy_saved(target);
                info!(tab = %tab_id, %current, %target, saved, "Video quality lowered");
                Ok(HandlerOutcome {
                    energy_saved: saved,
                    user_impact: UserImpact::Low,
                    details: serde_json::json!({
                        "tab_id": tab_id,
                        "current": current,
                        "target": target,
                        "changed": true,
                    }),
                })
            }
            Ok(outcome) => {
                warn!(tab = %tab_id, reason = ?outcome.message, "Quality change rejected");
                Ok(HandlerOutcome::no_effect(serde_json::json!({
                    "tab_id": tab_id,
                    "changed": false,
                    "rejected": outcome.message,
                })))
            }
            Err(e) => {
                warn!(tab = %tab_id, error = %e, "Quality change failed");
                Ok(HandlerOutcome::no_effect(serde_json::json!({
                    "tab_id": tab_id,
                    "changed": false,
                    "rejected": e.to_string(),
                })))
            }
        }
    }
}
