//! Tab suspension strategy.
//!
//! Scores every open tab, selects a bounded set of candidates, and suspends
//! them one at a time with the gentlest method that fits each tab.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info, warn};
use wattwise_core::config::SuspensionConfig;
use wattwise_core::types::Timestamp;

use crate::analyzer::TabUsageAnalyzer;
use crate::collaborator::Collaborators;
use crate::error::ActionError;
use crate::handler::ActionHandler;
use crate::safety::SafetyGovernor;
use crate::types::{ActionContext, HandlerOutcome, SuspendMethod, TabAnalysis, TabId, UserImpact};

#[derive(Debug, Serialize)]
struct SuspendedTab {
    tab_id: TabId,
    url: String,
    method: SuspendMethod,
    energy_saved: f64,
    user_impact: UserImpact,
}

/// Handler for `intelligentTabSuspension`.
pub struct TabSuspender {
    analyzer: TabUsageAnalyzer,
    governor: Arc<SafetyGovernor>,
    collaborators: Collaborators,
    config: SuspensionConfig,
}

impl TabSuspender {
    pub fn new(
        analyzer: TabUsageAnalyzer,
        governor: Arc<SafetyGovernor>,
        collaborators: Collaborators,
        config: SuspensionConfig,
    ) -> Self {
        Self {
            analyzer,
            governor,
            collaborators,
            config,
        }
    }

    /// Resource pause for valued tabs, content freeze for heavy ones,
    /// native discard otherwise.
    pub fn choose_method(&self, analysis: &TabAnalysis) -> SuspendMethod {
        if analysis.user_importance > self.config.resource_pause_importance {
            SuspendMethod::ResourcePause
        } else if analysis.energy_impact > self.config.content_freeze_energy {
            SuspendMethod::ContentFreeze
        } else {
            SuspendMethod::Native
        }
    }

    pub fn energy_saved(&self, analysis: &TabAnalysis) -> f64 {
        let factor = if analysis.user_importance > self.config.resource_pause_importance {
            self.config.partial_saving_factor
        } else {
            1.0
        };
        analysis.metrics.power_usage_watts * factor
    }

    pub fn user_impact(&self, analysis: &TabAnalysis) -> UserImpact {
        if analysis.user_importance > self.config.medium_impact_importance {
            UserImpact::Medium
        } else if analysis.user_importance > self.config.low_impact_importance {
            UserImpact::Low
        } else {
            UserImpact::Minimal
        }
    }
}

#[async_trait]
impl ActionHandler for TabSuspender {
    async fn execute(&self, _context: &ActionContext) -> Result<HandlerOutcome, ActionError> {
        let now = Timestamp::now();
        let analyses = self.analyzer.analyze_tabs(&self.collaborators, now).await;
        let candidates = self.analyzer.select_candidates(&analyses);

        let mut suspended = Vec::new();
        let mut total_saved = 0.0;
        let mut impact = UserImpact::Minimal;

        // One at a time: each suspension is awaited before the next starts.
        for candidate in &candidates {
            let tab = &candidate.snapshot;
            if !self.governor.can_suspend_tab(candidate) {
                debug!(tab = %tab.id, "Suspension vetoed by safety governor");
                continue;
            }

            let method = self.choose_method(candidate);
            match self.collaborators.controller.suspend_tab(tab.id, method).await {
                Ok(outcome) if outcome.success => {
                    let saved = self.energy_saved(candidate);
                    let tab_impact = self.user_impact(candidate);
                    total_saved += saved;
                    impact = impact.max(tab_impact);
                    info!(tab = %tab.id, %method, saved, "Tab suspended");
                    suspended.push(SuspendedTab {
                        tab_id: tab.id,
                        url: tab.url.clone(),
                        method,
                        energy_saved: saved,
                        user_impact: tab_impact,
                    });
                }
                Ok(outcome) => {
                    warn!(tab = %tab.id, reason = ?outcome.message, "Suspension rejected by browser");
                }
                Err(e) => {
                    warn!(tab = %tab.id, error = %e, "Suspension failed");
                }
            }
        }

        Ok(HandlerOutcome {
            energy_saved: total_saved,
            user_impact: impact,
            details: serde_json::json!({
                "analyzed": analyses.len(),
                "candidates": candidates.len(),
                "suspended": suspended,
            }),
        })
    }
}
