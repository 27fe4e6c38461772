//! Adaptive dark mode.

use async_trait::async_trait;
use chrono::Timelike;
use tracing::{debug, info, warn};
use wattwise_core::config::DarkModeConfig;

use crate::collaborator::Collaborators;
use crate::error::ActionError;
use crate::handler::ActionHandler;
use crate::site::{host_of, matches_any};
use crate::types::{ActionContext, HandlerOutcome, UserImpact};

/// Handler for `adaptiveDarkMode`.
pub struct DarkModeAdvisor {
    config: DarkModeConfig,
    collaborators: Collaborators,
}

impl DarkModeAdvisor {
    pub fn new(config: DarkModeConfig, collaborators: Collaborators) -> Self {
        Self {
            config,
            collaborators,
        }
    }

    pub fn is_night(&self, hour: u32) -> bool {
        hour >= self.config.night_start_hour || hour <= self.config.night_end_hour
    }

    /// Benefit coefficient for `host`, or `None` if the site is not supported.
    pub fn benefit_for(&self, host: &str) -> Option<f64> {
        if matches_any(host, &self.config.high_benefit_sites) {
            Some(self.config.high_benefit)
        } else if matches_any(host, &self.config.medium_benefit_sites) {
            Some(self.config.medium_benefit)
        } else if matches_any(host, &self.config.other_supported_sites) {
            Some(self.config.default_benefit)
        } else {
            None
        }
    }

    fn skipped(reason: &str) -> HandlerOutcome {
        HandlerOutcome::no_effect(serde_json::json!({ "enabled": false, "reason": reason }))
    }
}

#[async_trait]
impl ActionHandler for DarkModeAdvisor {
    async fn execute(&self, context: &ActionContext) -> Result<HandlerOutcome, ActionError> {
        let tab_id = context
            .tab_id
            .ok_or_else(|| ActionError::InvalidContext("tab_id is required".to_string()))?;
        if let Some(hour) = context.hour.filter(|h| *h > 23) {
            return Err(ActionError::InvalidContext(format!(
                "hour must be 0-23, got {}",
                hour
            )));
        }

        if context.auto_dark_mode_disabled {
            return Ok(Self::skipped("disabled"));
        }
        let hour = context.hour.unwrap_or_else(|| chrono::Local::now().hour());
        if !self.is_night(hour) {
            return Ok(Self::skipped("daytime"));
        }

        let tab = match self.collaborators.tabs.get_tab(tab_id).await {
            Ok(tab) => tab,
            Err(e) => {
                warn!(tab = %tab_id, error = %e, "Tab lookup failed");
                return Ok(Self::skipped("tab unavailable"));
            }
        };
        let host = host_of(&tab.url);
        let benefit = match self.benefit_for(&host) {
            Some(b) if b > self.config.min_benefit => b,
            Some(_) => return Ok(Self::skipped("low benefit")),
            None => return Ok(Self::skipped("unsupported site")),
        };

        match self.collaborators.controller.is_dark_mode(tab_id).await {
            Ok(true) => return Ok(Self::skipped("already dark")),
            Ok(false) => {}
            Err(e) => {
                debug!(tab = %tab_id, error = %e, "Dark mode state unknown");
                return Ok(Self::skipped("state unavailable"));
            }
        }

        match self.collaborators.controller.set_dark_mode(tab_id, true).await {
            Ok(outcome) if outcome.success => {
                info!(tab = %tab_id, %host, benefit, "Dark mode enabled");
                Ok(HandlerOutcome {
                    energy_saved: benefit,
                    user_impact: UserImpact::Minimal,
                    details: serde_json::json!({ "enabled": true, "host": host, "hour": hour }),
                })
            }
            Ok(outcome) => {
                warn!(tab = %tab_id, reason = ?outcome.message, "Dark mode rejected");
                Ok(Self::skipped("rejected"))
            }
            Err(e) => {
                warn!(tab = %tab_id, error = %e, "Dark mode toggle failed");
                Ok(Self::skipped("rejected"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborator::{BrowserSnapshot, InMemoryBrowser, Mutation, TabEntry};
    use crate::types::{TabId, TabMetrics, TabSnapshot};
    use std::sync::Arc;
    use wattwise_core::types::Timestamp;

    fn browser(url: &str, dark: bool) -> Arc<InMemoryBrowser> {
        let mut tab = TabEntry::new(
            TabSnapshot {
                id: TabId(1),
                url: url.to_string(),
                title: "Page".to_string(),
                active: true,
                pinned: false,
                audible: false,
                last_active: Timestamp::now(),
            },
            TabMetrics::default(),
        );
        tab.dark_mode = dark;
        Arc::new(InMemoryBrowser::new(BrowserSnapshot {
            tabs: vec![tab],
            ..BrowserSnapshot::default()
        }))
    }

    fn advisor(browser: Arc<InMemoryBrowser>) -> DarkModeAdvisor {
        DarkModeAdvisor::new(DarkModeConfig::default(), Collaborators::from_browser(browser))
    }

    fn at(hour: u32) -> ActionContext {
        ActionContext {
            tab_id: Some(TabId(1)),
            hour: Some(hour),
            ..ActionContext::default()
        }
    }

    #[test]
    fn test_night_window_bounds() {
        let a = advisor(browser("https://github.com", false));
        assert!(a.is_night(18));
        assert!(a.is_night(23));
        assert!(a.is_night(0));
        assert!(a.is_night(6));
        assert!(!a.is_night(7));
        assert!(!a.is_night(17));
    }

    #[test]
    fn test_benefit_tiers() {
        let a = advisor(browser("https://github.com", false));
        assert_eq!(a.benefit_for("www.youtube.com"), Some(12.0));
        assert_eq!(a.benefit_for("github.com"), Some(8.0));
        assert_eq!(a.benefit_for("google.com"), Some(5.0));
        assert_eq!(a.benefit_for("example.com"), None);
    }

    #[tokio::test]
    async fn test_enables_at_night_on_high_benefit_site() {
        let b = browser("https://www.youtube.com/watch?v=1", false);
        let outcome = advisor(b.clone()).execute(&at(22)).await.unwrap();
        assert_eq!(outcome.energy_saved, 12.0);
        assert_eq!(outcome.user_impact, UserImpact::Minimal);
        assert_eq!(
            b.mutations(),
            vec![Mutation::DarkMode {
                tab: TabId(1),
                enabled: true
            }]
        );
    }

    #[tokio::test]
    async fn test_skips_during_the_day() {
        let b = browser("https://github.com", false);
        let outcome = advisor(b.clone()).execute(&at(12)).await.unwrap();
        assert_eq!(outcome.energy_saved, 0.0);
        assert_eq!(outcome.details["reason"], "daytime");
        assert!(b.mutations().is_empty());
    }

    #[tokio::test]
    async fn test_skips_default_benefit_site() {
        let b = browser("https://www.google.com/search?q=x", false);
        let outcome = advisor(b.clone()).execute(&at(21)).await.unwrap();
        assert_eq!(outcome.details["reason"], "low benefit");
        assert!(b.mutations().is_empty());
    }

    #[tokio::test]
    async fn test_skips_when_already_dark_or_disabled() {
        let b = browser("https://github.com", true);
        let outcome = advisor(b.clone()).execute(&at(21)).await.unwrap();
        assert_eq!(outcome.details["reason"], "already dark");

        let b = browser("https://github.com", false);
        let mut ctx = at(21);
        ctx.auto_dark_mode_disabled = true;
        let outcome = advisor(b.clone()).execute(&ctx).await.unwrap();
        assert_eq!(outcome.details["reason"], "disabled");
        assert!(b.mutations().is_empty());
    }

    #[tokio::test]
    async fn test_missing_tab_is_absorbed() {
        let b = browser("https://github.com", false);
        let mut ctx = at(21);
        ctx.tab_id = Some(TabId(99));
        let outcome = advisor(b).execute(&ctx).await.unwrap();
        assert_eq!(outcome.energy_saved, 0.0);
        assert_eq!(outcome.details["reason"], "tab unavailable");
    }

    #[tokio::test]
    async fn test_rejects_out_of_range_hour() {
        let b = browser("https://www.youtube.com/watch?v=1", false);
        let err = advisor(b.clone()).execute(&at(30)).await.unwrap_err();
        assert!(matches!(err, ActionError::InvalidContext(ref msg) if msg.contains("30")));
        assert!(b.mutations().is_empty());

        let outcome = advisor(b).execute(&at(23)).await.unwrap();
        assert_eq!(outcome.energy_saved, 12.0);
    }

    #[tokio::test]
    async fn test_requires_tab_id() {
        let a = advisor(browser("https://github.com", false));
        let err = a.execute(&ActionContext::default()).await.unwrap_err();
        assert!(matches!(err, ActionError::InvalidContext(_)));
    }
}
