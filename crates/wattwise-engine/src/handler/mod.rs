//! Action handler registry and trait definition.
//!
//! Defines the `ActionHandler` async trait, the immutable `ActionDefinition`
//! wrapping each handler, and the registry the orchestrator dispatches from.
//! New optimization kinds are added by registering another definition.

pub mod dark_mode;
pub mod resource_blocker;
pub mod tab_suspender;
pub mod video_optimizer;

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use wattwise_core::config::WattwiseConfig;

use crate::analyzer::TabUsageAnalyzer;
use crate::collaborator::Collaborators;
use crate::error::ActionError;
use crate::safety::SafetyGovernor;
use crate::types::{ActionContext, ContextGuard, ExecutionTimeClass, HandlerOutcome, RiskLevel};

pub use dark_mode::DarkModeAdvisor;
pub use resource_blocker::ResourceBlocker;
pub use tab_suspender::TabSuspender;
pub use video_optimizer::VideoOptimizer;

pub const INTELLIGENT_TAB_SUSPENSION: &str = "intelligentTabSuspension";
pub const DYNAMIC_VIDEO_OPTIMIZATION: &str = "dynamicVideoOptimization";
pub const PREDICTIVE_RESOURCE_BLOCKING: &str = "predictiveResourceBlocking";
pub const ADAPTIVE_DARK_MODE: &str = "adaptiveDarkMode";

/// One optimization technique.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    /// Run the optimization. Collaborator failures should be absorbed into
    /// a zero-effect outcome; an `Err` is reported as a handler failure.
    async fn execute(&self, context: &ActionContext) -> Result<HandlerOutcome, ActionError>;
}

/// A named action and its static metadata. Immutable once registered.
#[derive(Clone)]
pub struct ActionDefinition {
    pub name: String,
    pub handler: Arc<dyn ActionHandler>,
    /// Expected saving in relative units.
    pub energy_saving_estimate: f64,
    pub risk_level: RiskLevel,
    pub execution_time_class: ExecutionTimeClass,
    pub description: String,
    pub guard: ContextGuard,
}

impl fmt::Debug for ActionDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionDefinition")
            .field("name", &self.name)
            .field("energy_saving_estimate", &self.energy_saving_estimate)
            .field("risk_level", &self.risk_level)
            .field("execution_time_class", &self.execution_time_class)
            .field("guard", &self.guard)
            .finish_non_exhaustive()
    }
}

/// Registry mapping action names to definitions.
#[derive(Default)]
pub struct ActionRegistry {
    definitions: RwLock<HashMap<String, Arc<ActionDefinition>>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `definition` under `name`, replacing any previous one.
    ///
    /// Returns the replaced definition, if any.
    pub fn register(
        &self,
        name: impl Into<String>,
        mut definition: ActionDefinition,
    ) -> Option<Arc<ActionDefinition>> {
        let name = name.into();
        definition.name = name.clone();
        let previous = self
            .definitions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.clone(), Arc::new(definition));
        if previous.is_some() {
            tracing::info!(action = %name, "Action definition replaced");
        }
        previous
    }

    pub fn get(&self, name: &str) -> Option<Arc<ActionDefinition>> {
        self.definitions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .definitions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.definitions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Register the four built-in strategies.
    pub fn register_defaults(
        &self,
        config: &WattwiseConfig,
        collaborators: Collaborators,
        governor: Arc<SafetyGovernor>,
    ) {
        let analyzer = TabUsageAnalyzer::from_config(config);

        self.register(
            INTELLIGENT_TAB_SUSPENSION,
            ActionDefinition {
                name: String::new(),
                handler: Arc::new(TabSuspender::new(
                    analyzer.clone(),
                    governor,
                    collaborators.clone(),
                    config.suspension.clone(),
                )),
                energy_saving_estimate: 15.0,
                risk_level: RiskLevel::Low,
                execution_time_class: ExecutionTimeClass::Fast,
                description: "Suspend inactive, power-hungry background tabs".to_string(),
                guard: ContextGuard::MinActiveTabs,
            },
        );

        self.register(
            DYNAMIC_VIDEO_OPTIMIZATION,
            ActionDefinition {
                name: String::new(),
                handler: Arc::new(VideoOptimizer::new(
                    config.video.clone(),
                    collaborators.clone(),
                )),
                energy_saving_estimate: 13.0,
                risk_level: RiskLevel::Low,
                execution_time_class: ExecutionTimeClass::Fast,
                description: "Lower video quality to match the energy budget".to_string(),
                guard: ContextGuard::NotWhileWatching,
            },
        );

        self.register(
            PREDICTIVE_RESOURCE_BLOCKING,
            ActionDefinition {
                name: String::new(),
                handler: Arc::new(ResourceBlocker::new(
                    config.blocking.clone(),
                    analyzer.scoring().clone(),
                    collaborators.clone(),
                )),
                energy_saving_estimate: 8.0,
                risk_level: RiskLevel::Minimal,
                execution_time_class: ExecutionTimeClass::Medium,
                description: "Block predicted ads, trackers and heavy page resources"
                    .to_string(),
                guard: ContextGuard::None,
            },
        );

        self.register(
            ADAPTIVE_DARK_MODE,
            ActionDefinition {
                name: String::new(),
                handler: Arc::new(DarkModeAdvisor::new(config.dark_mode.clone(), collaborators)),
                energy_saving_estimate: 5.0,
                risk_level: RiskLevel::Minimal,
                execution_time_class: ExecutionTimeClass::Fast,
                description: "Enable dark mode on supported sites at night".to_string(),
                guard: ContextGuard::None,
            },
        );
    }
}
