use thiserror::Error;

use crate::db::DatabaseError;

pub type WorkflowResult<T> = Result<T, WorkflowError>;

/// Every variant aborts the whole transition; nothing is partially written.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not authorized: {0}")]
    NotAuthorized(String),

    #[error("Already processed: {0}")]
    AlreadyProcessed(String),

    #[error("Routing unavailable: {0}")]
    RoutingUnavailable(String),

    #[error("No recipient configured: {0}")]
    NoRecipientConfigured(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage failure: {0}")]
    StorageFailure(#[from] DatabaseError),
}

impl WorkflowError {
    /// The one message shown to the caller. Causes stay in the logs.
    pub fn user_message(&self) -> &'static str {
        match self {
            WorkflowError::InvalidInput(_) => "The request is invalid. Please check the details and try again.",
            WorkflowError::NotAuthorized(_) => "You are not allowed to act on this complaint.",
            WorkflowError::AlreadyProcessed(_) => "This complaint has already been handled by someone else.",
            WorkflowError::RoutingUnavailable(_) => "No one is currently available to receive this escalation.",
            WorkflowError::NoRecipientConfigured(_) => "No recipient is configured for the selected role.",
            WorkflowError::NotFound(_) => "The requested record does not exist.",
            WorkflowError::StorageFailure(_) => "A temporary storage problem occurred. Please retry.",
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            WorkflowError::InvalidInput(_) => "invalid_input",
            WorkflowError::NotAuthorized(_) => "not_authorized",
            WorkflowError::AlreadyProcessed(_) => "already_processed",
            WorkflowError::RoutingUnavailable(_) => "routing_unavailable",
            WorkflowError::NoRecipientConfigured(_) => "no_recipient_configured",
            WorkflowError::NotFound(_) => "not_found",
            WorkflowError::StorageFailure(_) => "storage_failure",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, WorkflowError::StorageFailure(_))
    }

    /// Maps a failed `apply`: lost races become `AlreadyProcessed`.
    pub(crate) fn from_apply(err: DatabaseError) -> Self {
        match err {
            err if err.is_conflict() => WorkflowError::AlreadyProcessed(err.to_string()),
            DatabaseError::NotFound(what) => WorkflowError::NotFound(what),
            err => WorkflowError::StorageFailure(err),
        }
    }
}
