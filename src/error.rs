//! Error taxonomy of report operations.

use crate::evaluation::EvaluationError;
use crate::model::ConflictSet;
use crate::store::{EntityKind, StoreError};
use crate::validation::ValidationError;

/// Errors returned by [`ReportService`](crate::service::ReportService).
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Invalid payload, e.g. reports that cannot be combined.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The operation would break dependents; retry with `force` to cascade.
    #[error("Operation conflicts with {} dependent item(s)", .0.len())]
    Conflict(ConflictSet),

    #[error("{kind} '{id}' not found")]
    NotFound { kind: EntityKind, id: String },

    /// Another writer changed an entity between read and commit.
    #[error("{kind} '{id}' was modified concurrently, retry the operation")]
    ConcurrentModification { kind: EntityKind, id: String },

    #[error("Store error: {0}")]
    Store(StoreError),

    #[error("Evaluation error: {0}")]
    Evaluation(#[from] EvaluationError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::RevisionConflict { kind, id } => {
                ServiceError::ConcurrentModification { kind, id }
            }
            other => ServiceError::Store(other),
        }
    }
}

impl ServiceError {
    pub(crate) fn not_found(kind: EntityKind, id: &str) -> Self {
        ServiceError::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// HTTP-like status class of the error.
    pub fn status(&self) -> u16 {
        match self {
            ServiceError::Validation(_) | ServiceError::BadRequest(_) => 400,
            ServiceError::NotFound { .. } => 404,
            ServiceError::Conflict(_) | ServiceError::ConcurrentModification { .. } => 409,
            ServiceError::Store(_) | ServiceError::Evaluation(_) => 500,
        }
    }

    /// Conflicting dependents, when this is a conflict.
    pub fn conflicts(&self) -> Option<&ConflictSet> {
        match self {
            ServiceError::Conflict(conflicts) => Some(conflicts),
            _ => None,
        }
    }
}
