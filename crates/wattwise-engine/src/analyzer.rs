//! Tab usage analysis and suspension candidate selection.
//!
//! Turns a tab snapshot plus its metrics into a scored `TabAnalysis`. All
//! scoring functions are pure: the same inputs always produce the same
//! scores, and every score is clipped to its declared range.

use std::cmp::Ordering;

use tracing::{debug, warn};
use wattwise_core::config::{ScoringConfig, SuspensionConfig, WattwiseConfig};
use wattwise_core::types::{clip, Timestamp};

use crate::collaborator::Collaborators;
use crate::site::{host_of, matches_any};
use crate::types::{TabAnalysis, TabMetrics, TabSnapshot, UsagePattern};

/// Scores tabs and picks the ones worth suspending.
#[derive(Debug, Clone)]
pub struct TabUsageAnalyzer {
    scoring: ScoringConfig,
    suspension: SuspensionConfig,
}

impl Default for TabUsageAnalyzer {
    fn default() -> Self {
        Self::new(ScoringConfig::default(), SuspensionConfig::default())
    }
}

impl TabUsageAnalyzer {
    pub fn new(scoring: ScoringConfig, suspension: SuspensionConfig) -> Self {
        Self {
            scoring,
            suspension,
        }
    }

    pub fn from_config(config: &WattwiseConfig) -> Self {
        Self::new(config.scoring.clone(), config.suspension.clone())
    }

    pub fn scoring(&self) -> &ScoringConfig {
        &self.scoring
    }

    /// Importance of the kind of site the tab shows.
    pub fn type_importance(&self, url: &str) -> f64 {
        let s = &self.scoring;
        let host = host_of(url);
        if host.is_empty() {
            s.default_importance
        } else if matches_any(&host, &s.productivity_domains) {
            s.productivity_importance
        } else if matches_any(&host, &s.entertainment_domains) {
            s.entertainment_importance
        } else if matches_any(&host, &s.social_domains) {
            s.social_importance
        } else {
            s.default_importance
        }
    }

    pub fn tab_importance(&self, snapshot: &TabSnapshot, type_importance: f64) -> f64 {
        let s = &self.scoring;
        let raw = s.tab_importance_base
            + flag(snapshot.active) * s.active_bonus
            + flag(snapshot.pinned) * s.pinned_bonus
            + flag(snapshot.audible) * s.audible_bonus
            + type_importance * s.type_bonus;
        clip(raw, 0.0, 1.0)
    }

    /// Access frequency in `[0, 1]`.
    ///
    /// Pinned and active tabs get fixed values. Otherwise the history value
    /// is used, or a deterministic estimate that decays with inactivity.
    pub fn access_frequency(
        &self,
        snapshot: &TabSnapshot,
        history: Option<f64>,
        inactive_minutes: f64,
    ) -> f64 {
        if snapshot.active {
            return self.scoring.active_access_frequency;
        }
        if snapshot.pinned {
            return self.scoring.pinned_access_frequency;
        }
        match history {
            Some(freq) => clip(freq, 0.1, 0.9),
            None => {
                let inactive_hours = inactive_minutes / 60.0;
                let decay = (inactive_hours / self.scoring.recency_horizon_hours).min(1.0);
                clip(0.9 - 0.8 * decay, 0.1, 0.9)
            }
        }
    }

    pub fn usage_pattern(
        &self,
        snapshot: &TabSnapshot,
        history: Option<f64>,
        now: Timestamp,
    ) -> UsagePattern {
        let inactive_minutes = if snapshot.active {
            0.0
        } else {
            snapshot.last_active.minutes_until(now)
        };
        let type_importance = self.type_importance(&snapshot.url);
        UsagePattern {
            inactive_minutes,
            importance_score: self.tab_importance(snapshot, type_importance),
            access_frequency: self.access_frequency(snapshot, history, inactive_minutes),
            type_importance,
            is_background: !snapshot.active,
            has_audio: snapshot.audible,
            is_pinned: snapshot.pinned,
        }
    }

    pub fn user_importance(&self, pattern: &UsagePattern) -> f64 {
        let s = &self.scoring;
        let inactive_hours = pattern.inactive_minutes / 60.0;
        let recency =
            ((s.recency_horizon_hours - inactive_hours) / s.recency_horizon_hours).max(0.0);
        let raw = s.access_frequency_weight * pattern.access_frequency
            + s.recency_weight * recency
            + s.type_weight * pattern.type_importance;
        clip(raw, 0.0, 1.0)
    }

    /// Suspension score before the active/audible/pinned dampeners.
    pub fn raw_suspension_score(
        &self,
        pattern: &UsagePattern,
        metrics: &TabMetrics,
        user_importance: f64,
    ) -> f64 {
        let s = &self.scoring;
        let inactivity = (pattern.inactive_minutes / s.inactivity_saturation_minutes).min(1.0);
        let power = (metrics.power_usage_watts / s.power_saturation_watts).min(1.0);
        let raw = s.inactivity_weight * inactivity
            + s.power_weight * power
            + s.unimportance_weight * (1.0 - user_importance);
        clip(raw, 0.0, 1.0)
    }

    /// Dampened suspension score in `[0, 1]`. Dampeners stack multiplicatively.
    pub fn suspension_score(
        &self,
        pattern: &UsagePattern,
        metrics: &TabMetrics,
        user_importance: f64,
    ) -> f64 {
        let s = &self.scoring;
        let mut score = self.raw_suspension_score(pattern, metrics, user_importance);
        if !pattern.is_background {
            score *= s.active_dampener;
        }
        if pattern.has_audio {
            score *= s.audible_dampener;
        }
        if pattern.is_pinned {
            score *= s.pinned_dampener;
        }
        clip(score, 0.0, 1.0)
    }

    /// Relative ranking score; not a physical unit.
    pub fn energy_impact(&self, metrics: &TabMetrics) -> f64 {
        (metrics.power_usage_watts
            + self.scoring.cpu_coefficient * metrics.cpu_percent
            + self.scoring.memory_coefficient * metrics.memory_mb)
            .max(0.0)
    }

    pub fn analyze(
        &self,
        snapshot: TabSnapshot,
        metrics: TabMetrics,
        history: Option<f64>,
        now: Timestamp,
    ) -> TabAnalysis {
        let usage_pattern = self.usage_pattern(&snapshot, history, now);
        let user_importance = self.user_importance(&usage_pattern);
        let suspension_score = self.suspension_score(&usage_pattern, &metrics, user_importance);
        let energy_impact = self.energy_impact(&metrics);
        TabAnalysis {
            snapshot,
            metrics,
            usage_pattern,
            suspension_score,
            energy_impact,
            user_importance,
        }
    }

    /// Read the tab inventory and score every tab.
    ///
    /// An unreachable inventory yields no analyses; a tab whose metrics
    /// cannot be read is skipped.
    pub async fn analyze_tabs(&self, collaborators: &Collaborators, now: Timestamp) -> Vec<TabAnalysis> {
        let tabs = match collaborators.tabs.list_tabs().await {
            Ok(tabs) => tabs,
            Err(e) => {
                warn!(error = %e, "Tab inventory unavailable; nothing to analyze");
                return Vec::new();
            }
        };

        let mut analyses = Vec::with_capacity(tabs.len());
        for snapshot in tabs {
            let metrics = match collaborators.metrics.tab_metrics(snapshot.id).await {
                Ok(m) => m,
                Err(e) => {
                    debug!(tab = %snapshot.id, error = %e, "Skipping tab without metrics");
                    continue;
                }
            };
            let history = collaborators.history.access_frequency(snapshot.id).await;
            analyses.push(self.analyze(snapshot, metrics, history, now));
        }
        analyses
    }

    /// Maximum number of candidates for `eligible` filtered tabs.
    pub fn candidate_cap(&self, eligible: usize) -> usize {
        let fractional = (self.suspension.candidate_fraction * eligible as f64).floor() as usize;
        fractional.min(self.suspension.max_candidates)
    }

    /// Filter, then sort by suspension score descending, then cap.
    ///
    /// The order matters: capping before sorting would not keep the
    /// highest-value candidates.
    pub fn select_candidates(&self, analyses: &[TabAnalysis]) -> Vec<TabAnalysis> {
        let cfg = &self.suspension;
        let mut eligible: Vec<TabAnalysis> = analyses
            .iter()
            .filter(|a| {
                a.suspension_score > cfg.min_suspension_score
                    && a.user_importance < cfg.max_user_importance
                    && a.energy_impact > cfg.min_energy_impact
                    && !a.snapshot.active
                    && !a.snapshot.audible
            })
            .cloned()
            .collect();

        eligible.sort_by(|a, b| {
            b.suspension_score
                .partial_cmp(&a.suspension_score)
                .unwrap_or(Ordering::Equal)
        });

        let cap = self.candidate_cap(eligible.len());
        eligible.truncate(cap);
        debug!(
            scanned = analyses.len(),
            selected = eligible.len(),
            cap,
            "Suspension candidates selected"
        );
        eligible
    }
}

fn flag(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}
