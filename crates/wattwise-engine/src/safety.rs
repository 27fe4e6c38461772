//! Safety governor: rolling rate limits and disruption guards.
//!
//! Every action passes through two layers before its handler runs: a
//! per-type rolling-window rate limit and the context guard declared on the
//! action's definition. Executors additionally veto individual tabs with
//! `can_suspend_tab` right before mutating them.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;
use wattwise_core::config::SafetyConfig;
use wattwise_core::types::Timestamp;

use crate::types::{ActionContext, ActionExecutionRecord, ContextGuard, SafetyCheckResult, TabAnalysis};

/// Rate limiter and guard evaluator shared by the engine and its executors.
///
/// Owns the rolling window of execution records. Records are appended only
/// for executions that actually started; expired records are pruned lazily
/// on each check.
pub struct SafetyGovernor {
    config: SafetyConfig,
    records: Mutex<VecDeque<ActionExecutionRecord>>,
}

impl Default for SafetyGovernor {
    fn default() -> Self {
        Self::new(SafetyConfig::default())
    }
}

impl SafetyGovernor {
    pub fn new(config: SafetyConfig) -> Self {
        Self {
            config,
            records: Mutex::new(VecDeque::new()),
        }
    }

    pub fn config(&self) -> &SafetyConfig {
        &self.config
    }

    fn records(&self) -> MutexGuard<'_, VecDeque<ActionExecutionRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Hourly ceiling for `action_type`.
    pub fn limit_for(&self, action_type: &str) -> u32 {
        self.config
            .action_limits
            .get(action_type)
            .copied()
            .unwrap_or(self.config.default_hourly_limit)
    }

    /// Check `action_type` against its rate limit and `guard` at the current time.
    pub fn check_action(
        &self,
        action_type: &str,
        guard: ContextGuard,
        context: &ActionContext,
    ) -> SafetyCheckResult {
        self.check_action_at(action_type, guard, context, Timestamp::now())
    }

    /// Check at an explicit instant. Never appends a record.
    pub fn check_action_at(
        &self,
        action_type: &str,
        guard: ContextGuard,
        context: &ActionContext,
        now: Timestamp,
    ) -> SafetyCheckResult {
        let count = self.recent_count(action_type, now);
        let limit = self.limit_for(action_type);
        if count >= limit as usize {
            debug!(action_type, count, limit, "Rate limit reached");
            return SafetyCheckResult::unsafe_because(format!(
                "Rate limit exceeded: {} of {} {} actions in the last hour",
                count, limit, action_type
            ));
        }

        match guard {
            ContextGuard::None => SafetyCheckResult::safe(),
            ContextGuard::MinActiveTabs => match context.active_tabs {
                None => SafetyCheckResult::unsafe_because("Open tab count unknown"),
                Some(n) if n <= self.config.min_active_tabs => {
                    SafetyCheckResult::unsafe_because(format!(
                        "Too few tabs open to suspend safely: {} (must exceed {})",
                        n, self.config.min_active_tabs
                    ))
                }
                Some(_) => SafetyCheckResult::safe(),
            },
            ContextGuard::NotWhileWatching => {
                if context.user_actively_watching {
                    SafetyCheckResult::unsafe_because("User is actively watching video")
                } else {
                    SafetyCheckResult::safe()
                }
            }
        }
    }

    /// Records of `action_type` inside the trailing window ending at `now`.
    ///
    /// Prunes expired records of every type as a side effect.
    pub fn recent_count(&self, action_type: &str, now: Timestamp) -> usize {
        let window = self.config.window_ms;
        let mut records = self.records();
        records.retain(|r| now.0 - r.timestamp.0 < window);
        records
            .iter()
            .filter(|r| r.action_type == action_type && r.timestamp <= now)
            .count()
    }

    /// Total records currently held, expired or not.
    pub fn record_count(&self) -> usize {
        self.records().len()
    }

    /// Append a record for an execution that started now.
    pub fn record_action(&self, action_type: &str) {
        self.record_action_at(action_type, Timestamp::now());
    }

    pub fn record_action_at(&self, action_type: &str, timestamp: Timestamp) {
        self.records().push_back(ActionExecutionRecord {
            timestamp,
            action_type: action_type.to_string(),
        });
    }

    /// Per-tab veto applied immediately before a tab is mutated.
    ///
    /// Active, audible, and pinned tabs are never suspended, nor are
    /// important tabs the user touched within the recent-access window.
    pub fn can_suspend_tab(&self, analysis: &TabAnalysis) -> bool {
        let tab = &analysis.snapshot;
        if tab.active || tab.audible || tab.pinned {
            return false;
        }
        let recently_used =
            analysis.usage_pattern.inactive_minutes < self.config.recent_access_minutes;
        !(recently_used && analysis.user_importance > self.config.protected_importance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TabId, TabMetrics, TabSnapshot, UsagePattern};
    use std::collections::BTreeMap;

    const SUSPEND: &str = "intelligentTabSuspension";
    const NOW: Timestamp = Timestamp(10 * Timestamp::MILLIS_PER_HOUR);

    fn governor_with_limit(limit: u32) -> SafetyGovernor {
        let mut action_limits = BTreeMap::new();
        action_limits.insert(SUSPEND.to_string(), limit);
        SafetyGovernor::new(SafetyConfig {
            action_limits,
            ..SafetyConfig::default()
        })
    }

    fn ctx_with_tabs(n: usize) -> ActionContext {
        ActionContext {
            active_tabs: Some(n),
            ..ActionContext::default()
        }
    }

    fn analysis(inactive_minutes: f64, user_importance: f64) -> TabAnalysis {
        TabAnalysis {
            snapshot: TabSnapshot {
                id: TabId(1),
                url: "https://example.com".to_string(),
                title: String::new(),
                active: false,
                pinned: false,
                audible: false,
                last_active: Timestamp(0),
            },
            metrics: TabMetrics::default(),
            usage_pattern: UsagePattern {
                inactive_minutes,
                importance_score: 0.5,
                access_frequency: 0.5,
                type_importance: 0.5,
                is_background: true,
                has_audio: false,
                is_pinned: false,
            },
            suspension_score: 0.9,
            energy_impact: 10.0,
            user_importance,
        }
    }

    #[test]
    fn test_limit_for_default_and_override() {
        let g = governor_with_limit(3);
        assert_eq!(g.limit_for(SUSPEND), 3);
        assert_eq!(g.limit_for("adaptiveDarkMode"), 20);
    }

    #[test]
    fn test_rate_limit_rejects_at_ceiling() {
        let g = governor_with_limit(3);
        for i in 0..3 {
            g.record_action_at(SUSPEND, NOW.minus_minutes(10 + i));
        }
        let result = g.check_action_at(SUSPEND, ContextGuard::MinActiveTabs, &ctx_with_tabs(8), NOW);
        assert!(!result.safe);
        let reason = result.reason.unwrap();
        assert!(reason.contains("3 of 3"), "{}", reason);
    }

    #[test]
    fn test_rate_limit_allows_below_ceiling() {
        let g = governor_with_limit(3);
        g.record_action_at(SUSPEND, NOW.minus_minutes(5));
        g.record_action_at(SUSPEND, NOW.minus_minutes(6));
        assert!(g.check_action_at(SUSPEND, ContextGuard::MinActiveTabs, &ctx_with_tabs(8), NOW).safe);
    }

    #[test]
    fn test_expired_records_are_pruned() {
        let g = governor_with_limit(3);
        for i in 0..3 {
            g.record_action_at(SUSPEND, NOW.minus_minutes(61 + i));
        }
        assert!(g.check_action_at(SUSPEND, ContextGuard::MinActiveTabs, &ctx_with_tabs(8), NOW).safe);
        assert_eq!(g.record_count(), 0);
    }

    #[test]
    fn test_window_edge_is_exclusive() {
        let g = SafetyGovernor::default();
        let window = g.config().window_ms;
        g.record_action_at(SUSPEND, Timestamp(NOW.0 - window));
        g.record_action_at(SUSPEND, Timestamp(NOW.0 - window + 1));

        assert_eq!(g.recent_count(SUSPEND, NOW), 1);
        // The record exactly one window old is pruned, the younger one stays.
        assert_eq!(g.record_count(), 1);
    }

    #[test]
    fn test_record_just_inside_window_counts_toward_limit() {
        let g = governor_with_limit(1);
        g.record_action_at(SUSPEND, Timestamp(NOW.0 - 3_599_999));
        assert!(!g.check_action_at(SUSPEND, ContextGuard::MinActiveTabs, &ctx_with_tabs(8), NOW).safe);

        let g = governor_with_limit(1);
        g.record_action_at(SUSPEND, Timestamp(NOW.0 - 3_600_000));
        assert!(g.check_action_at(SUSPEND, ContextGuard::MinActiveTabs, &ctx_with_tabs(8), NOW).safe);
    }

    #[test]
    fn test_rate_limit_is_per_action_type() {
        let g = governor_with_limit(1);
        g.record_action_at("adaptiveDarkMode", NOW.minus_minutes(1));
        assert!(g.check_action_at(SUSPEND, ContextGuard::MinActiveTabs, &ctx_with_tabs(8), NOW).safe);
        g.record_action_at(SUSPEND, NOW.minus_minutes(1));
        assert!(!g.check_action_at(SUSPEND, ContextGuard::MinActiveTabs, &ctx_with_tabs(8), NOW).safe);
    }

    #[test]
    fn test_rejection_never_records() {
        let g = governor_with_limit(1);
        g.record_action_at(SUSPEND, NOW.minus_minutes(1));
        for _ in 0..5 {
            let result = g.check_action_at(SUSPEND, ContextGuard::MinActiveTabs, &ctx_with_tabs(8), NOW);
            assert!(!result.safe);
        }
        assert_eq!(g.record_count(), 1);
        assert_eq!(g.recent_count(SUSPEND, NOW), 1);
    }

    #[test]
    fn test_min_active_tabs_guard() {
        let g = SafetyGovernor::default();
        assert!(!g.check_action_at(SUSPEND, ContextGuard::MinActiveTabs, &ctx_with_tabs(2), NOW).safe);
        assert!(g.check_action_at(SUSPEND, ContextGuard::MinActiveTabs, &ctx_with_tabs(3), NOW).safe);
        // Unknown tab count fails closed.
        let result = g.check_action_at(SUSPEND, ContextGuard::MinActiveTabs, &ActionContext::default(), NOW);
        assert!(!result.safe);
        assert_eq!(result.reason.as_deref(), Some("Open tab count unknown"));
    }

    #[test]
    fn test_not_while_watching_guard() {
        let g = SafetyGovernor::default();
        let watching = ActionContext {
            user_actively_watching: true,
            ..ActionContext::default()
        };
        assert!(!g.check_action_at("dynamicVideoOptimization", ContextGuard::NotWhileWatching, &watching, NOW).safe);
        assert!(g
            .check_action_at("dynamicVideoOptimization", ContextGuard::NotWhileWatching, &ActionContext::default(), NOW)
            .safe);
    }

    #[test]
    fn test_unguarded_action_passes() {
        let g = SafetyGovernor::default();
        assert!(g.check_action_at("adaptiveDarkMode", ContextGuard::None, &ActionContext::default(), NOW).safe);
    }

    #[test]
    fn test_can_suspend_tab_vetoes_protected_tabs() {
        let g = SafetyGovernor::default();
        assert!(g.can_suspend_tab(&analysis(30.0, 0.2)));

        let mut a = analysis(30.0, 0.2);
        a.snapshot.active = true;
        assert!(!g.can_suspend_tab(&a));

        let mut a = analysis(30.0, 0.2);
        a.snapshot.audible = true;
        assert!(!g.can_suspend_tab(&a));

        let mut a = analysis(30.0, 0.2);
        a.snapshot.pinned = true;
        assert!(!g.can_suspend_tab(&a));
    }

    #[test]
    fn test_can_suspend_tab_protects_recent_important_tabs() {
        let g = SafetyGovernor::default();
        assert!(!g.can_suspend_tab(&analysis(2.0, 0.8)));
        // Recent but unimportant, or important but stale, may be suspended.
        assert!(g.can_suspend_tab(&analysis(2.0, 0.6)));
        assert!(g.can_suspend_tab(&analysis(10.0, 0.8)));
    }
}
