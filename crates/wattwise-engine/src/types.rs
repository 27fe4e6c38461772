//! Core types and value objects for the optimization engine.
//!
//! Defines tab snapshots and their derived analyses, action definitions'
//! supporting enumerations, caller context, and execution results.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
use wattwise_core::types::Timestamp;

// =============================================================================
// Identity
// =============================================================================

/// Browser tab identifier as assigned by the tab inventory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TabId(pub i64);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Enums
// =============================================================================

/// Disruption risk of an action, declared at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Minimal,
    Low,
    Medium,
    High,
}

/// Rough wall-clock cost class of an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionTimeClass {
    Fast,
    Medium,
    Slow,
}

/// Observed disruption to the user caused by an executed action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserImpact {
    #[default]
    Minimal,
    Low,
    Medium,
    High,
}

impl UserImpact {
    /// Disruption score on the fixed `[0, 1]` scale.
    pub fn score(&self) -> f64 {
        match self {
            UserImpact::Minimal => 0.1,
            UserImpact::Low => 0.3,
            UserImpact::Medium => 0.6,
            UserImpact::High => 0.9,
        }
    }
}

impl fmt::Display for UserImpact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserImpact::Minimal => write!(f, "minimal"),
            UserImpact::Low => write!(f, "low"),
            UserImpact::Medium => write!(f, "medium"),
            UserImpact::High => write!(f, "high"),
        }
    }
}

/// Context check a definition requires before its handler may run.
///
/// Attached to the definition as data, so the safety governor never has to
/// branch on action names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextGuard {
    #[default]
    None,
    /// Refuse unless more than the configured floor of tabs are open.
    MinActiveTabs,
    /// Refuse while the user is actively watching video.
    NotWhileWatching,
}

/// How a tab gets suspended, from gentlest to most aggressive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuspendMethod {
    ResourcePause,
    Native,
    ContentFreeze,
}

impl fmt::Display for SuspendMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SuspendMethod::ResourcePause => write!(f, "resource_pause"),
            SuspendMethod::Native => write!(f, "native"),
            SuspendMethod::ContentFreeze => write!(f, "content_freeze"),
        }
    }
}

/// Rung of the video quality ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum VideoQuality {
    #[serde(rename = "360p")]
    P360,
    #[serde(rename = "480p")]
    P480,
    #[serde(rename = "720p")]
    P720,
    #[serde(rename = "1080p")]
    P1080,
}

impl VideoQuality {
    /// Position on the ladder; 0 is the lowest rung.
    pub fn level(&self) -> u8 {
        match self {
            VideoQuality::P360 => 0,
            VideoQuality::P480 => 1,
            VideoQuality::P720 => 2,
            VideoQuality::P1080 => 3,
        }
    }

    /// Relative energy cost of playback at this rung.
    pub fn energy_units(&self) -> f64 {
        match self {
            VideoQuality::P1080 => 25.0,
            VideoQuality::P720 => 18.0,
            VideoQuality::P480 => 12.0,
            VideoQuality::P360 => 8.0,
        }
    }
}

impl fmt::Display for VideoQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VideoQuality::P360 => write!(f, "360p"),
            VideoQuality::P480 => write!(f, "480p"),
            VideoQuality::P720 => write!(f, "720p"),
            VideoQuality::P1080 => write!(f, "1080p"),
        }
    }
}

/// Energy budget the caller is willing to spend on playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnergyBudget {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkSpeed {
    Low,
    Medium,
    High,
}

/// Power profile reported by the battery/performance-mode source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceMode {
    Efficient,
    #[default]
    Balanced,
    Performance,
}

impl PerformanceMode {
    pub fn energy_budget(&self) -> EnergyBudget {
        match self {
            PerformanceMode::Efficient => EnergyBudget::Low,
            PerformanceMode::Balanced => EnergyBudget::Medium,
            PerformanceMode::Performance => EnergyBudget::High,
        }
    }
}

/// How eagerly predicted resources are blocked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggressiveness {
    Conservative,
    #[default]
    Moderate,
    Aggressive,
}

impl std::str::FromStr for Aggressiveness {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "conservative" => Ok(Aggressiveness::Conservative),
            "moderate" => Ok(Aggressiveness::Moderate),
            "aggressive" => Ok(Aggressiveness::Aggressive),
            _ => Err(format!("Unknown aggressiveness: {}", s)),
        }
    }
}

/// Site category used to predict which resources a page will load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiteType {
    Video,
    Social,
    News,
    Ecommerce,
    #[default]
    General,
}

impl fmt::Display for SiteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SiteType::Video => write!(f, "video"),
            SiteType::Social => write!(f, "social"),
            SiteType::News => write!(f, "news"),
            SiteType::Ecommerce => write!(f, "ecommerce"),
            SiteType::General => write!(f, "general"),
        }
    }
}

/// Category of a predicted network resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Advertising,
    Tracking,
    Analytics,
    Media,
    Widget,
    Script,
}

/// Three-step qualitative rating used in impact assessments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rating {
    Low,
    Medium,
    High,
}

/// Why an execution did not succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Rate limit or context guard refused the action. Nothing ran.
    SafetyRejection,
    /// The handler returned an error or panicked.
    HandlerFailure,
}

// =============================================================================
// Tabs
// =============================================================================

/// A tab as reported by the tab inventory. Read fresh per invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabSnapshot {
    pub id: TabId,
    pub url: String,
    pub title: String,
    pub active: bool,
    pub pinned: bool,
    pub audible: bool,
    pub last_active: Timestamp,
}

/// Resource usage of a tab as reported by the metrics source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TabMetrics {
    pub power_usage_watts: f64,
    pub cpu_percent: f64,
    pub memory_mb: f64,
    pub network_requests_per_min: f64,
}

/// Derived usage features of a tab.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UsagePattern {
    pub inactive_minutes: f64,
    /// Tab importance in `[0, 1]`.
    pub importance_score: f64,
    pub access_frequency: f64,
    pub type_importance: f64,
    pub is_background: bool,
    pub has_audio: bool,
    pub is_pinned: bool,
}

/// A scored tab.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabAnalysis {
    pub snapshot: TabSnapshot,
    pub metrics: TabMetrics,
    pub usage_pattern: UsagePattern,
    pub suspension_score: f64,
    /// Composite ranking score, not a physical unit.
    pub energy_impact: f64,
    pub user_importance: f64,
}

/// Battery level and power profile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatteryStatus {
    /// Charge level in `[0, 1]`.
    pub level: f64,
    pub charging: bool,
    pub mode: PerformanceMode,
}

impl Default for BatteryStatus {
    fn default() -> Self {
        Self {
            level: 1.0,
            charging: true,
            mode: PerformanceMode::Balanced,
        }
    }
}

/// A resource the page is predicted to load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourcePrediction {
    pub url_pattern: String,
    pub resource_type: ResourceType,
    pub probability: f64,
    pub cost: f64,
}

/// Acknowledgement returned by a mutation collaborator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MutationOutcome {
    pub success: bool,
    pub message: Option<String>,
}

impl MutationOutcome {
    pub fn ok() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

// =============================================================================
// Execution
// =============================================================================

/// Caller-supplied parameters for one `execute_action` invocation.
///
/// Every field is optional; handlers fall back to collaborators or config
/// defaults when a value is absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionContext {
    /// Number of open tabs, consulted by the tab-suspension guard.
    pub active_tabs: Option<usize>,
    pub user_actively_watching: bool,
    /// Target tab for single-tab actions.
    pub tab_id: Option<TabId>,
    pub current_quality: Option<VideoQuality>,
    pub energy_budget: Option<EnergyBudget>,
    pub battery_level: Option<f64>,
    pub network_speed: Option<NetworkSpeed>,
    pub aggressiveness: Option<Aggressiveness>,
    pub site_type: Option<SiteType>,
    /// Local hour override (0-23).
    pub hour: Option<u32>,
    pub auto_dark_mode_disabled: bool,
}

/// What a handler reports back to the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandlerOutcome {
    pub energy_saved: f64,
    pub user_impact: UserImpact,
    pub details: serde_json::Value,
}

impl HandlerOutcome {
    /// An outcome that changed nothing.
    pub fn no_effect(details: serde_json::Value) -> Self {
        Self {
            energy_saved: 0.0,
            user_impact: UserImpact::Minimal,
            details,
        }
    }
}

/// Entry of the rolling rate-limit window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionExecutionRecord {
    pub timestamp: Timestamp,
    pub action_type: String,
}

/// Verdict of a safety check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyCheckResult {
    pub safe: bool,
    pub reason: Option<String>,
}

impl SafetyCheckResult {
    pub fn safe() -> Self {
        Self {
            safe: true,
            reason: None,
        }
    }

    pub fn unsafe_because(reason: impl Into<String>) -> Self {
        Self {
            safe: false,
            reason: Some(reason.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyImpact {
    pub saved: f64,
    pub efficiency: Rating,
    pub sustainability: Rating,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserExperienceImpact {
    pub level: UserImpact,
    pub score: f64,
    pub acceptable: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceImpact {
    pub execution_time_ms: f64,
}

/// Post-execution tradeoff assessment. Advisory only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactAssessment {
    pub energy_impact: EnergyImpact,
    pub user_experience_impact: UserExperienceImpact,
    pub performance_impact: PerformanceImpact,
    pub overall_score: f64,
}

/// Uniform result of `ActionEngine::execute_action`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub id: Uuid,
    pub success: bool,
    pub action_type: String,
    pub execution_time_ms: f64,
    pub energy_saved: f64,
    pub user_impact: UserImpact,
    pub details: serde_json::Value,
    pub timestamp: Timestamp,
    pub failure: Option<FailureKind>,
    pub reason: Option<String>,
    pub impact: Option<ImpactAssessment>,
}

impl ExecutionResult {
    /// A failed result carrying `reason`; nothing was saved.
    pub fn failed(action_type: &str, kind: FailureKind, reason: String, execution_time_ms: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            success: false,
            action_type: action_type.to_string(),
            execution_time_ms,
            energy_saved: 0.0,
            user_impact: UserImpact::Minimal,
            details: serde_json::json!({ "error": reason }),
            timestamp: Timestamp::now(),
            failure: Some(kind),
            reason: Some(reason),
            impact: None,
        }
    }
}

/// Running counters kept by the orchestrator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineStats {
    pub executed: u64,
    pub rejected: u64,
    pub failed: u64,
    pub total_energy_saved: f64,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_quality_ladder() {
        assert_eq!(VideoQuality::P1080.energy_units(), 25.0);
        assert_eq!(VideoQuality::P720.energy_units(), 18.0);
        assert_eq!(VideoQuality::P480.energy_units(), 12.0);
        assert_eq!(VideoQuality::P360.energy_units(), 8.0);
        assert!(VideoQuality::P1080.level() > VideoQuality::P720.level());
        assert!(VideoQuality::P480 < VideoQuality::P720);
    }

    #[test]
    fn test_video_quality_serde_names() {
        assert_eq!(serde_json::to_string(&VideoQuality::P720).unwrap(), "\"720p\"");
        let q: VideoQuality = serde_json::from_str("\"360p\"").unwrap();
        assert_eq!(q, VideoQuality::P360);
        assert_eq!(VideoQuality::P1080.to_string(), "1080p");
    }

    #[test]
    fn test_user_impact_scores_and_order() {
        assert_eq!(UserImpact::Minimal.score(), 0.1);
        assert_eq!(UserImpact::Low.score(), 0.3);
        assert_eq!(UserImpact::Medium.score(), 0.6);
        assert_eq!(UserImpact::High.score(), 0.9);
        assert!(UserImpact::Medium > UserImpact::Low);
    }

    #[test]
    fn test_aggressiveness_from_str() {
        assert_eq!(
            "conservative".parse::<Aggressiveness>().unwrap(),
            Aggressiveness::Conservative
        );
        assert_eq!("moderate".parse::<Aggressiveness>().unwrap(), Aggressiveness::Moderate);
        assert_eq!(
            "aggressive".parse::<Aggressiveness>().unwrap(),
            Aggressiveness::Aggressive
        );
        assert!("reckless".parse::<Aggressiveness>().is_err());
    }

    #[test]
    fn test_performance_mode_energy_budget() {
        assert_eq!(PerformanceMode::Efficient.energy_budget(), EnergyBudget::Low);
        assert_eq!(PerformanceMode::Balanced.energy_budget(), EnergyBudget::Medium);
        assert_eq!(PerformanceMode::Performance.energy_budget(), EnergyBudget::High);
    }

    #[test]
    fn test_action_context_deserializes_sparse_json() {
        let ctx: ActionContext =
            serde_json::from_str(r#"{"active_tabs": 6, "tab_id": 12, "current_quality": "1080p"}"#)
                .unwrap();
        assert_eq!(ctx.active_tabs, Some(6));
        assert_eq!(ctx.tab_id, Some(TabId(12)));
        assert_eq!(ctx.current_quality, Some(VideoQuality::P1080));
        assert!(!ctx.user_actively_watching);
        assert!(ctx.aggressiveness.is_none());
    }

    #[test]
    fn test_failed_result_carries_reason() {
        let result = ExecutionResult::failed(
            "intelligentTabSuspension",
            FailureKind::SafetyRejection,
            "too many".to_string(),
            0.0,
        );
        assert!(!result.success);
        assert_eq!(result.energy_saved, 0.0);
        assert_eq!(result.failure, Some(FailureKind::SafetyRejection));
        assert_eq!(result.reason.as_deref(), Some("too many"));
        assert_eq!(result.details["error"], "too many");
        assert!(result.impact.is_none());
    }
}
