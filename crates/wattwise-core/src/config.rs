use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, WattwiseError};

/// Top-level configuration for Wattwise.
///
/// Loaded from `~/.wattwise/config.toml` by default. Every scoring constant
/// and guard threshold used by the optimization engine lives here so the
/// scoring law can be audited and overridden without code changes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WattwiseConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub suspension: SuspensionConfig,
    #[serde(default)]
    pub safety: SafetyConfig,
    #[serde(default)]
    pub video: VideoConfig,
    #[serde(default)]
    pub blocking: BlockingConfig,
    #[serde(default)]
    pub dark_mode: DarkModeConfig,
    #[serde(default)]
    pub impact: ImpactConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

impl WattwiseConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: WattwiseConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| WattwiseError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Weights and saturation points of the tab scoring law.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Inactivity (minutes) at which the inactivity term saturates.
    pub inactivity_saturation_minutes: f64,
    /// Power draw (watts) at which the power term saturates.
    pub power_saturation_watts: f64,
    pub inactivity_weight: f64,
    pub power_weight: f64,
    pub unimportance_weight: f64,

    pub access_frequency_weight: f64,
    pub recency_weight: f64,
    pub type_weight: f64,
    /// Hours after which the recency term of user importance reaches zero.
    pub recency_horizon_hours: f64,

    pub tab_importance_base: f64,
    pub active_bonus: f64,
    pub pinned_bonus: f64,
    pub audible_bonus: f64,
    pub type_bonus: f64,

    pub active_dampener: f64,
    pub audible_dampener: f64,
    pub pinned_dampener: f64,

    pub cpu_coefficient: f64,
    pub memory_coefficient: f64,

    pub productivity_importance: f64,
    pub entertainment_importance: f64,
    pub social_importance: f64,
    pub default_importance: f64,

    pub pinned_access_frequency: f64,
    pub active_access_frequency: f64,

    pub productivity_domains: Vec<String>,
    pub entertainment_domains: Vec<String>,
    pub social_domains: Vec<String>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            inactivity_saturation_minutes: 30.0,
            power_saturation_watts: 20.0,
            inactivity_weight: 0.4,
            power_weight: 0.3,
            unimportance_weight: 0.3,
            access_frequency_weight: 0.4,
            recency_weight: 0.3,
            type_weight: 0.3,
            recency_horizon_hours: 24.0,
            tab_importance_base: 0.5,
            active_bonus: 0.4,
            pinned_bonus: 0.3,
            audible_bonus: 0.2,
            type_bonus: 0.3,
            active_dampener: 0.1,
            audible_dampener: 0.2,
            pinned_dampener: 0.3,
            cpu_coefficient: 0.1,
            memory_coefficient: 0.05,
            productivity_importance: 0.9,
            entertainment_importance: 0.6,
            social_importance: 0.4,
            default_importance: 0.5,
            pinned_access_frequency: 0.9,
            active_access_frequency: 1.0,
            productivity_domains: to_strings(&[
                "docs.google.com",
                "sheets.google.com",
                "mail.google.com",
                "calendar.google.com",
                "drive.google.com",
                "github.com",
                "gitlab.com",
                "notion.so",
                "slack.com",
                "teams.microsoft.com",
                "office.com",
                "atlassian.net",
                "figma.com",
                "trello.com",
            ]),
            entertainment_domains: to_strings(&[
                "youtube.com",
                "netflix.com",
                "twitch.tv",
                "hulu.com",
                "disneyplus.com",
                "vimeo.com",
                "spotify.com",
                "primevideo.com",
            ]),
            social_domains: to_strings(&[
                "facebook.com",
                "twitter.com",
                "x.com",
                "instagram.com",
                "reddit.com",
                "tiktok.com",
                "linkedin.com",
                "pinterest.com",
            ]),
        }
    }
}

/// Candidate selection and strategy thresholds for tab suspension.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SuspensionConfig {
    pub min_suspension_score: f64,
    pub max_user_importance: f64,
    pub min_energy_impact: f64,
    /// Absolute cap on candidates per invocation.
    pub max_candidates: usize,
    /// Fraction of eligible tabs that may be suspended per invocation.
    pub candidate_fraction: f64,
    /// Above this user importance the gentlest strategy (resource pause) is used.
    pub resource_pause_importance: f64,
    /// Above this energy impact the most aggressive strategy (content freeze) is used.
    pub content_freeze_energy: f64,
    /// Share of power draw saved when the tab is only partially paused.
    pub partial_saving_factor: f64,
    /// Suspending a tab above this user importance is a medium disruption.
    pub medium_impact_importance: f64,
    /// Suspending a tab above this user importance is a low disruption.
    pub low_impact_importance: f64,
}

impl Default for SuspensionConfig {
    fn default() -> Self {
        Self {
            min_suspension_score: 0.6,
            max_user_importance: 0.4,
            min_energy_impact: 5.0,
            max_candidates: 5,
            candidate_fraction: 0.3,
            resource_pause_importance: 0.5,
            content_freeze_energy: 20.0,
            partial_saving_factor: 0.7,
            medium_impact_importance: 0.7,
            low_impact_importance: 0.4,
        }
    }
}

/// Rate limits and guards applied before any action executes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyConfig {
    /// Length of the rolling rate-limit window in milliseconds.
    pub window_ms: i64,
    /// Ceiling for action types without a specific limit.
    pub default_hourly_limit: u32,
    /// Per-action-type ceilings, keyed by action name.
    pub action_limits: BTreeMap<String, u32>,
    /// Tab suspension is refused at or below this many open tabs.
    pub min_active_tabs: usize,
    /// Tabs accessed within this many minutes are protected when important.
    pub recent_access_minutes: f64,
    pub protected_importance: f64,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            window_ms: 3_600_000,
            default_hourly_limit: 20,
            action_limits: BTreeMap::new(),
            min_active_tabs: 2,
            recent_access_minutes: 5.0,
            protected_importance: 0.7,
        }
    }
}

/// Video quality optimization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    /// Battery level (0.0 to 1.0) below which the lowest rung is chosen.
    pub low_battery_threshold: f64,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            low_battery_threshold: 0.2,
        }
    }
}

/// Predictive resource blocking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockingConfig {
    /// Aggressiveness when the caller does not specify one:
    /// "conservative", "moderate", or "aggressive".
    pub default_aggressiveness: String,
    /// Resources costlier than this are blocked regardless of type.
    pub always_block_cost: f64,
}

impl Default for BlockingConfig {
    fn default() -> Self {
        Self {
            default_aggressiveness: "moderate".to_string(),
            always_block_cost: 5.0,
        }
    }
}

/// Adaptive dark mode settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DarkModeConfig {
    /// Local hour at or after which it counts as night.
    pub night_start_hour: u32,
    /// Local hour at or before which it still counts as night.
    pub night_end_hour: u32,
    pub high_benefit_sites: Vec<String>,
    pub medium_benefit_sites: Vec<String>,
    /// Supported sites without a specific benefit rating.
    pub other_supported_sites: Vec<String>,
    pub high_benefit: f64,
    pub medium_benefit: f64,
    pub default_benefit: f64,
    /// Dark mode is only enabled when the site benefit exceeds this.
    pub min_benefit: f64,
}

impl Default for DarkModeConfig {
    fn default() -> Self {
        Self {
            night_start_hour: 18,
            night_end_hour: 6,
            high_benefit_sites: to_strings(&["youtube.com", "netflix.com", "twitch.tv", "reddit.com"]),
            medium_benefit_sites: to_strings(&[
                "github.com",
                "stackoverflow.com",
                "twitter.com",
                "x.com",
                "wikipedia.org",
            ]),
            other_supported_sites: to_strings(&["google.com", "amazon.com", "news.ycombinator.com"]),
            high_benefit: 12.0,
            medium_benefit: 8.0,
            default_benefit: 5.0,
            min_benefit: 5.0,
        }
    }
}

/// Thresholds used by the post-execution impact assessment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImpactConfig {
    pub high_efficiency: f64,
    pub medium_efficiency: f64,
    pub high_sustainability: f64,
    pub medium_sustainability: f64,
    /// Energy saving that maps to a full energy term in the overall score.
    pub saving_normalizer: f64,
    /// Execution time (ms) that maps to a zero speed term in the overall score.
    pub execution_time_normalizer_ms: f64,
    /// User-impact scores below this are considered acceptable.
    pub acceptable_user_impact: f64,
}

impl Default for ImpactConfig {
    fn default() -> Self {
        Self {
            high_efficiency: 0.1,
            medium_efficiency: 0.01,
            high_sustainability: 10.0,
            medium_sustainability: 5.0,
            saving_normalizer: 30.0,
            execution_time_normalizer_ms: 1000.0,
            acceptable_user_impact: 0.7,
        }
    }
}

/// Periodic optimization trigger.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub enabled: bool,
    pub interval_secs: u64,
    /// Action names run on every tick, in order.
    pub actions: Vec<String>,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 300,
            actions: to_strings(&["intelligentTabSuspension"]),
        }
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
