//! Optimization action engine for Wattwise.
//!
//! Scores open tabs, gates every optimization through a rate-limiting safety
//! governor, dispatches to pluggable strategy handlers, and rates the
//! outcome of each run.

pub mod analyzer;
pub mod collaborator;
pub mod error;
pub mod handler;
pub mod impact;
pub mod orchestrator;
pub mod safety;
pub mod scheduler;
pub mod site;
pub mod types;

pub use analyzer::TabUsageAnalyzer;
pub use collaborator::{BrowserSnapshot, Collaborators, InMemoryBrowser, Mutation, TabEntry};
pub use error::{ActionError, CollaboratorError};
pub use handler::{
    ActionDefinition, ActionHandler, ActionRegistry, ADAPTIVE_DARK_MODE, DYNAMIC_VIDEO_OPTIMIZATION,
    INTELLIGENT_TAB_SUSPENSION, PREDICTIVE_RESOURCE_BLOCKING,
};
pub use impact::ImpactAnalyzer;
pub use orchestrator::ActionEngine;
pub use safety::SafetyGovernor;
pub use scheduler::OptimizationScheduler;
pub use types::*;
