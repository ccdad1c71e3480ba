//! Per-resource results of the mutation phase.

use serde::Serialize;

use crate::error::ChownError;
use crate::types::ResourceId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ChownStatus {
    /// Ownership was changed.
    Changed,
    /// Dry run: ownership would have been changed.
    WouldChange,
    /// The provider failed to change ownership.
    Failed { reason: String },
    /// Not attempted because an earlier resource failed.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChownOutcome {
    pub id: ResourceId,
    #[serde(flatten)]
    pub status: ChownStatus,
}

/// Outcome of [`super::ResourceCollection::chown_all`], in resolution order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MutationReport {
    pub outcomes: Vec<ChownOutcome>,
    /// Error returned by the resource that failed, if any.
    #[serde(skip)]
    pub error: Option<ChownError>,
}

impl MutationReport {
    pub(crate) fn push(&mut self, id: ResourceId, status: ChownStatus) {
        self.outcomes.push(ChownOutcome { id, status });
    }

    /// The first resource that failed, if any.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn changed(&self) -> Vec<&ResourceId> {
        self.outcomes
            .iter()
            .filter(|o| o.status == ChownStatus::Changed)
            .map(|o| &o.id)
            .collect()
    }
}
