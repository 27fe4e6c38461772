//! Predictive resource blocking.
//!
//! Each site category carries a fixed table of resources its pages are
//! expected to load. Predictions that pass the blocking rule for the current
//! aggressiveness are registered with the controller as block rules.

use async_trait::async_trait;
use tracing::{debug, info, warn};
use wattwise_core::config::{BlockingConfig, ScoringConfig};

use crate::collaborator::Collaborators;
use crate::error::ActionError;
use crate::handler::ActionHandler;
use crate::site::classify_site;
use crate::types::{
    ActionContext, Aggressiveness, HandlerOutcome, ResourcePrediction, ResourceType, SiteType,
    UserImpact,
};

type PredictionRow = (&'static str, ResourceType, f64, f64);

const VIDEO_PREDICTIONS: &[PredictionRow] = &[
    ("*/ads/preroll*", ResourceType::Advertising, 0.9, 4.0),
    ("*doubleclick.net*", ResourceType::Advertising, 0.8, 3.0),
    ("*/analytics*", ResourceType::Analytics, 0.7, 2.0),
    ("*/autoplay-preview*", ResourceType::Media, 0.6, 8.0),
    ("*/tracking*", ResourceType::Tracking, 0.5, 1.0),
];

const SOCIAL_PREDICTIONS: &[PredictionRow] = &[
    ("*/ads/*", ResourceType::Advertising, 0.8, 3.0),
    ("*/pixel*", ResourceType::Tracking, 0.9, 2.0),
    ("*/analytics*", ResourceType::Analytics, 0.7, 2.0),
    ("*/autoplay*", ResourceType::Media, 0.5, 7.0),
];

const NEWS_PREDICTIONS: &[PredictionRow] = &[
    ("*/ads/*", ResourceType::Advertising, 0.9, 5.0),
    ("*taboola.com*", ResourceType::Widget, 0.8, 6.0),
    ("*outbrain.com*", ResourceType::Widget, 0.8, 6.0),
    ("*/analytics*", ResourceType::Analytics, 0.8, 2.0),
    ("*/tracking*", ResourceType::Tracking, 0.7, 1.0),
];

const ECOMMERCE_PREDICTIONS: &[PredictionRow] = &[
    ("*/retargeting*", ResourceType::Advertising, 0.6, 3.0),
    ("*criteo.com*", ResourceType::Tracking, 0.8, 2.0),
    ("*hotjar.com*", ResourceType::Analytics, 0.7, 6.0),
    ("*/recommendations*", ResourceType::Widget, 0.5, 4.0),
];

const GENERAL_PREDICTIONS: &[PredictionRow] = &[
    ("*doubleclick.net*", ResourceType::Advertising, 0.5, 3.0),
    ("*/analytics*", ResourceType::Analytics, 0.6, 2.0),
    ("*/tracking*", ResourceType::Tracking, 0.4, 1.0),
];

/// Resources a page of the given category is expected to load.
pub fn predict_resources(site: SiteType) -> Vec<ResourcePrediction> {
    let rows = match site {
        SiteType::Video => VIDEO_PREDICTIONS,
        SiteType::Social => SOCIAL_PREDICTIONS,
        SiteType::News => NEWS_PREDICTIONS,
        SiteType::Ecommerce => ECOMMERCE_PREDICTIONS,
        SiteType::General => GENERAL_PREDICTIONS,
    };
    rows.iter()
        .map(|&(pattern, resource_type, probability, cost)| ResourcePrediction {
            url_pattern: pattern.to_string(),
            resource_type,
            probability,
            cost,
        })
        .collect()
}

/// Handler for `predictiveResourceBlocking`.
pub struct ResourceBlocker {
    config: BlockingConfig,
    scoring: ScoringConfig,
    collaborators: Collaborators,
}

impl ResourceBlocker {
    pub fn new(config: BlockingConfig, scoring: ScoringConfig, collaborators: Collaborators) -> Self {
        Self {
            config,
            scoring,
            collaborators,
        }
    }

    pub fn should_block(&self, prediction: &ResourcePrediction, level: Aggressiveness) -> bool {
        if prediction.cost > self.config.always_block_cost {
            return true;
        }
        match prediction.resource_type {
            ResourceType::Advertising | ResourceType::Tracking => {
                level != Aggressiveness::Conservative
            }
            ResourceType::Analytics => level == Aggressiveness::Aggressive,
            ResourceType::Media | ResourceType::Widget | ResourceType::Script => false,
        }
    }

    fn default_aggressiveness(&self) -> Aggressiveness {
        self.config
            .default_aggressiveness
            .parse()
            .unwrap_or_else(|e| {
                warn!(value = %self.config.default_aggressiveness, error = %e, "Bad aggressiveness in config");
                Aggressiveness::Moderate
            })
    }

    async fn site_type(&self, context: &ActionContext) -> SiteType {
        if let Some(site) = context.site_type {
            return site;
        }
        let Some(id) = context.tab_id else {
            return SiteType::General;
        };
        match self.collaborators.tabs.get_tab(id).await {
            Ok(tab) => classify_site(&tab.url, &self.scoring),
            Err(e) => {
                debug!(tab = %id, error = %e, "Tab lookup failed, using general predictions");
                SiteType::General
            }
        }
    }
}

#[async_trait]
impl ActionHandler for ResourceBlocker {
    async fn execute(&self, context: &ActionContext) -> Result<HandlerOutcome, ActionError> {
        let site = self.site_type(context).await;
        let level = context
            .aggressiveness
            .unwrap_or_else(|| self.default_aggressiveness());

        let predictions = predict_resources(site);
        let blocked: Vec<ResourcePrediction> = predictions
            .iter()
            .filter(|p| self.should_block(p, level))
            .cloned()
            .collect();

        if blocked.is_empty() {
            return Ok(HandlerOutcome::no_effect(serde_json::json!({
                "site_type": site,
                "predicted": predictions.len(),
                "blocked": [],
            })));
        }

        let outcome = match self
            .collaborators
            .controller
            .register_block_rules(context.tab_id, &blocked)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, "Block rule registration failed");
                return Ok(HandlerOutcome::no_effect(serde_json::json!({
                    "site_type": site,
                    "blocked": [],
                    "rejected": e.to_string(),
                })));
            }
        };
        if !outcome.success {
            warn!(reason = ?outcome.message, "Block rules rejected");
            return Ok(HandlerOutcome::no_effect(serde_json::json!({
                "site_type": site,
                "blocked": [],
                "rejected": outcome.message,
            })));
        }

        let saved: f64 = blocked.iter().map(|p| p.probability * p.cost).sum();
        let visible = blocked.iter().any(|p| {
            matches!(
                p.resource_type,
                ResourceType::Media | ResourceType::Widget | ResourceType::Script
            )
        });
        info!(%site, blocked = blocked.len(), saved, "Block rules registered");

        Ok(HandlerOutcome {
            energy_saved: saved,
            user_impact: if visible {
                UserImpact::Low
            } else {
                UserImpact::Minimal
            },
            details: serde_json::json!({
                "site_type": site,
                "predicted": predictions.len(),
                "blocked": blocked,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborator::{BrowserSnapshot, InMemoryBrowser, Mutation, TabEntry};
    use crate::types::{TabId, TabMetrics, TabSnapshot};
    use std::sync::Arc;
    use wattwise_core::types::Timestamp;

    fn browser(url: &str) -> Arc<InMemoryBrowser> {
        let tab = TabEntry::new(
            TabSnapshot {
                id: TabId(3),
                url: url.to_string(),
                title: "Page".to_string(),
                active: true,
                pinned: false,
                audible: false,
                last_active: Timestamp::now(),
            },
            TabMetrics::default(),
        );
        Arc::new(InMemoryBrowser::new(BrowserSnapshot {
            tabs: vec![tab],
            ..BrowserSnapshot::default()
        }))
    }

    fn blocker(browser: Arc<InMemoryBrowser>) -> ResourceBlocker {
        ResourceBlocker::new(
            BlockingConfig::default(),
            ScoringConfig::default(),
            Collaborators::from_browser(browser),
        )
    }

    fn prediction(resource_type: ResourceType, cost: f64) -> ResourcePrediction {
        ResourcePrediction {
            url_pattern: "*/x*".to_string(),
            resource_type,
            probability: 0.5,
            cost,
        }
    }

    #[test]
    fn test_analytics_blocked_only_when_aggressive() {
        let b = blocker(browser("https://example.com"));
        let analytics = prediction(ResourceType::Analytics, 3.0);
        assert!(!b.should_block(&analytics, Aggressiveness::Moderate));
        assert!(b.should_block(&analytics, Aggressiveness::Aggressive));
        assert!(!b.should_block(&analytics, Aggressiveness::Conservative));
    }

    #[test]
    fn test_ads_and_tracking_blocked_unless_conservative() {
        let b = blocker(browser("https://example.com"));
        for kind in [ResourceType::Advertising, ResourceType::Tracking] {
            let p = prediction(kind, 2.0);
            assert!(b.should_block(&p, Aggressiveness::Moderate));
            assert!(b.should_block(&p, Aggressiveness::Aggressive));
            assert!(!b.should_block(&p, Aggressiveness::Conservative));
        }
    }

    #[test]
    fn test_expensive_resources_always_blocked() {
        let b = blocker(browser("https://example.com"));
        let media = prediction(ResourceType::Media, 8.0);
        assert!(b.should_block(&media, Aggressiveness::Conservative));
        let cheap_media = prediction(ResourceType::Media, 5.0);
        assert!(!b.should_block(&cheap_media, Aggressiveness::Aggressive));
    }

    #[test]
    fn test_every_site_type_has_predictions() {
        for site in [
            SiteType::Video,
            SiteType::Social,
            SiteType::News,
            SiteType::Ecommerce,
            SiteType::General,
        ] {
            let predictions = predict_resources(site);
            assert!(!predictions.is_empty());
            assert!(predictions
                .iter()
                .all(|p| p.probability > 0.0 && p.probability <= 1.0));
        }
    }

    #[tokio::test]
    async fn test_execute_classifies_from_tab_url() {
        let b = browser("https://www.youtube.com/watch?v=1");
        let blocker = blocker(b.clone());
        let ctx = ActionContext {
            tab_id: Some(TabId(3)),
            ..ActionContext::default()
        };
        let outcome = blocker.execute(&ctx).await.unwrap();

        // Video table at moderate: two ads, the autoplay preview and tracking.
        assert!((outcome.energy_saved - 11.3).abs() < 1e-9);
        assert_eq!(outcome.user_impact, UserImpact::Low);
        assert_eq!(outcome.details["site_type"], "video");

        let mutations = b.mutations();
        assert_eq!(mutations.len(), 1);
        match &mutations[0] {
            Mutation::BlockRules { tab, patterns } => {
                assert_eq!(*tab, Some(TabId(3)));
                assert_eq!(patterns.len(), 4);
                assert!(!patterns.contains(&"*/analytics*".to_string()));
            }
            other => panic!("unexpected mutation {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_execute_conservative_general_blocks_nothing() {
        let b = browser("https://example.com");
        let blocker = blocker(b.clone());
        let ctx = ActionContext {
            site_type: Some(SiteType::General),
            aggressiveness: Some(Aggressiveness::Conservative),
            ..ActionContext::default()
        };
        let outcome = blocker.execute(&ctx).await.unwrap();
        assert_eq!(outcome.energy_saved, 0.0);
        assert!(b.mutations().is_empty());
    }

    #[tokio::test]
    async fn test_execute_global_rules_without_tab() {
        let b = browser("https://example.com");
        let blocker = blocker(b.clone());
        let ctx = ActionContext {
            site_type: Some(SiteType::General),
            aggressiveness: Some(Aggressiveness::Aggressive),
            ..ActionContext::default()
        };
        let outcome = blocker.execute(&ctx).await.unwrap();
        // 0.5*3 + 0.6*2 + 0.4*1
        assert!((outcome.energy_saved - 3.1).abs() < 1e-9);
        assert_eq!(outcome.user_impact, UserImpact::Minimal);
        assert!(matches!(
            b.mutations().as_slice(),
            [Mutation::BlockRules { tab: None, .. }]
        ));
    }

    #[tokio::test]
    async fn test_execute_rejected_rules_save_nothing() {
        let b = browser("https://example.com");
        b.set_reject_mutations(true);
        let blocker = blocker(b);
        let ctx = ActionContext {
            site_type: Some(SiteType::News),
            ..ActionContext::default()
        };
        let outcome = blocker.execute(&ctx).await.unwrap();
        assert_eq!(outcome.energy_saved, 0.0);
    }
}
