//! Error types for the optimization engine.

use crate::types::TabId;
use wattwise_core::error::WattwiseError;

/// Errors from action lookup and handler execution.
///
/// Only `UnknownAction` ever reaches the caller of `ActionEngine::execute_action`;
/// every other variant is converted into a failed `ExecutionResult`.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("Action type not registered: {0}")]
    UnknownAction(String),
    #[error("Action handler failed: {0}")]
    HandlerFailed(String),
    #[error("Invalid action context: {0}")]
    InvalidContext(String),
    #[error("Collaborator error: {0}")]
    Collaborator(#[from] CollaboratorError),
    #[error("Core error: {0}")]
    Core(#[from] WattwiseError),
}

/// Errors reported by browser-side collaborators.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CollaboratorError {
    #[error("Collaborator unavailable: {0}")]
    Unavailable(String),
    #[error("Mutation rejected: {0}")]
    Rejected(String),
    #[error("Tab not found: {0}")]
    TabNotFound(TabId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_error_display() {
        let err = ActionError::UnknownAction("teleportTabs".to_string());
        assert_eq!(err.to_string(), "Action type not registered: teleportTabs");

        let err = ActionError::HandlerFailed("boom".to_string());
        assert_eq!(err.to_string(), "Action handler failed: boom");

        let err = ActionError::InvalidContext("tab_id is required".to_string());
        assert_eq!(err.to_string(), "Invalid action context: tab_id is required");
    }

    #[test]
    fn test_collaborator_error_display() {
        assert_eq!(
            CollaboratorError::TabNotFound(TabId(7)).to_string(),
            "Tab not found: 7"
        );
        assert_eq!(
            CollaboratorError::Rejected("frozen".to_string()).to_string(),
            "Mutation rejected: frozen"
        );
    }

    #[test]
    fn test_action_error_from_collaborator_error() {
        let err: ActionError = CollaboratorError::Unavailable("tabs".to_string()).into();
        assert!(matches!(err, ActionError::Collaborator(_)));
        assert!(err.to_string().contains("tabs"));
    }

    #[test]
    fn test_action_error_from_core_error() {
        let err: ActionError = WattwiseError::Config("missing".to_string()).into();
        assert!(matches!(err, ActionError::Core(_)));
        assert!(err.to_string().contains("missing"));
    }
}
