//! Action engine orchestrator.
//!
//! Coordinates definition lookup, the safety gate, handler execution, rate
//! limit bookkeeping and impact assessment for every `execute_action` call.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use tracing::{info, warn};
use uuid::Uuid;
use wattwise_core::config::WattwiseConfig;
use wattwise_core::types::Timestamp;

use crate::collaborator::Collaborators;
use crate::error::ActionError;
use crate::handler::{ActionDefinition, ActionRegistry};
use crate::impact::ImpactAnalyzer;
use crate::safety::SafetyGovernor;
use crate::types::{ActionContext, EngineStats, ExecutionResult, FailureKind};

/// Results kept for `recent_results`.
const RECENT_RESULTS: usize = 50;

/// Registry plus orchestrator. Shared by reference; all state is internally
/// synchronized.
pub struct ActionEngine {
    registry: ActionRegistry,
    governor: Arc<SafetyGovernor>,
    impact: ImpactAnalyzer,
    stats: Mutex<EngineStats>,
    recent: Mutex<VecDeque<ExecutionResult>>,
}

impl ActionEngine {
    pub fn new(registry: ActionRegistry, governor: Arc<SafetyGovernor>, impact: ImpactAnalyzer) -> Self {
        Self {
            registry,
            governor,
            impact,
            stats: Mutex::new(EngineStats::default()),
            recent: Mutex::new(VecDeque::with_capacity(RECENT_RESULTS)),
        }
    }

    /// Engine with the four built-in actions registered against `collaborators`.
    pub fn with_defaults(config: &WattwiseConfig, collaborators: Collaborators) -> Self {
        let governor = Arc::new(SafetyGovernor::new(config.safety.clone()));
        let registry = ActionRegistry::new();
        registry.register_defaults(config, collaborators, Arc::clone(&governor));
        Self::new(registry, governor, ImpactAnalyzer::new(config.impact.clone()))
    }

    /// Store or overwrite the definition for `name`.
    pub fn register_action(&self, name: impl Into<String>, definition: ActionDefinition) {
        self.registry.register(name, definition);
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    pub fn governor(&self) -> &Arc<SafetyGovernor> {
        &self.governor
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Most recent results, oldest first.
    pub fn recent_results(&self) -> Vec<ExecutionResult> {
        self.recent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Run `action_type` with `context`.
    ///
    /// Only an unregistered action type is an `Err`. Safety rejections and
    /// handler failures, including panics, come back as unsuccessful results.
    pub async fn execute_action(
        &self,
        action_type: &str,
        context: &ActionContext,
    ) -> Result<ExecutionResult, ActionError> {
        let definition = self
            .registry
            .get(action_type)
            .ok_or_else(|| ActionError::UnknownAction(action_type.to_string()))?;

        let check = self
            .governor
            .check_action(action_type, definition.guard, context);
        if !check.safe {
            let reason = check
                .reason
                .unwrap_or_else(|| "Safety check failed".to_string());
            warn!(action_type, %reason, "Action rejected by safety governor");
            let result = ExecutionResult::failed(action_type, FailureKind::SafetyRejection, reason, 0.0);
            self.finish(&result);
            return Ok(result);
        }

        let started = Instant::now();
        let handler_definition = Arc::clone(&definition);
        let handler_context = context.clone();
        let joined = tokio::spawn(async move {
            handler_definition.handler.execute(&handler_context).await
        })
        .await;
        let execution_time_ms = started.elapsed().as_secs_f64() * 1000.0;

        let outcome = match joined {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                warn!(action_type, error = %e, "Action handler failed");
                let result = ExecutionResult::failed(
                    action_type,
                    FailureKind::HandlerFailure,
                    e.to_string(),
                    execution_time_ms,
                );
                self.finish(&result);
                return Ok(result);
            }
            Err(e) => {
                let reason = if e.is_panic() {
                    "Action handler panicked".to_string()
                } else {
                    format!("Action handler aborted: {}", e)
                };
                warn!(action_type, %reason, "Action handler did not complete");
                let result = ExecutionResult::failed(
                    action_type,
                    FailureKind::HandlerFailure,
                    reason,
                    execution_time_ms,
                );
                self.finish(&result);
                return Ok(result);
            }
        };

        self.governor.record_action(action_type);
        let impact = self
            .impact
            .analyze(outcome.energy_saved, outcome.user_impact, execution_time_ms);

        info!(
            action_type,
            energy_saved = outcome.energy_saved,
            user_impact = %outcome.user_impact,
            execution_time_ms,
            overall_score = impact.overall_score,
            "Action executed"
        );

        let result = ExecutionResult {
            id: Uuid::new_v4(),
            success: true,
            action_type: action_type.to_string(),
            execution_time_ms,
            energy_saved: outcome.energy_saved,
            user_impact: outcome.user_impact,
            details: outcome.details,
            timestamp: Timestamp::now(),
            failure: None,
            reason: None,
            impact: Some(impact),
        };
        self.finish(&result);
        Ok(result)
    }

    fn finish(&self, result: &ExecutionResult) {
        {
            let mut stats = self.stats.lock().unwrap_or_else(PoisonError::into_inner);
            match result.failure {
                None => {
                    stats.executed += 1;
                    stats.total_energy_saved += result.energy_saved;
                }
                Some(FailureKind::SafetyRejection) => stats.rejected += 1,
                Some(FailureKind::HandlerFailure) => stats.failed += 1,
            }
        }
        let mut recent = self.recent.lock().unwrap_or_else(PoisonError::into_inner);
        if recent.len() == RECENT_RESULTS {
            recent.pop_front();
        }
        recent.push_back(result.clone());
    }
}
