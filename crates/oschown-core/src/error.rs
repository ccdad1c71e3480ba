//! Error taxonomy for resolution and mutation.

use thiserror::Error;

use crate::types::ResourceId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChownError {
    #[error("resource {id} not found")]
    ResourceNotFound { id: ResourceId },

    #[error("resource {id} cannot be transferred: {reason}")]
    UnsupportedOperation { id: ResourceId, reason: String },

    /// The provider cannot resolve the resource yet; it stays pending and is
    /// retried on the next pass.
    #[error("resolution of {id} deferred: {reason}")]
    ResolutionDeferred { id: ResourceId, reason: String },

    #[error("unknown resource type '{}' for {id}", id.provider())]
    UnknownResourceType { id: ResourceId },

    #[error("unable to resolve resources: {}", join_ids(pending))]
    UnableToResolveResources { pending: Vec<ResourceId> },

    #[error("failed to change ownership of {id}: {reason}")]
    MutationFailed { id: ResourceId, reason: String },

    #[error("invalid resource identifier '{0}' (expected provider:id)")]
    InvalidResourceId(String),

    #[error("provider check failed for {provider}: {reason}")]
    CheckFailed { provider: String, reason: String },

    #[error("backend error: {0}")]
    Backend(String),
}

impl ChownError {
    /// Whether this error belongs to the resolution phase (no mutation happened).
    pub fn is_resolution_failure(&self) -> bool {
        !matches!(self, ChownError::MutationFailed { .. })
    }
}

fn join_ids(ids: &[ResourceId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

pub type Result<T> = std::result::Result<T, ChownError>;
