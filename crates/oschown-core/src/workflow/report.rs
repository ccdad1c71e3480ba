//! Report returned by every workflow run.

use serde::{Serialize, Serializer};

use crate::engine::MutationReport;
use crate::error::ChownError;
use crate::types::ResourceId;

/// Report from a workflow run
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowReport {
    /// Workflow that produced this report
    pub workflow: String,
    /// Root resource, for single-root workflows
    pub root: Option<ResourceId>,
    /// Whether mutation was suppressed
    pub dry_run: bool,
    /// Resolved resources, in resolution (and mutation) order
    pub resolved: Vec<ResourceId>,
    /// Resources still pending when resolution failed
    pub unresolved: Vec<ResourceId>,
    /// Per-resource mutation outcomes (empty if resolution failed)
    pub mutations: MutationReport,
    /// Error that ended the run early
    #[serde(serialize_with = "serialize_error")]
    pub error: Option<ChownError>,
}

impl WorkflowReport {
    pub(crate) fn new(workflow: &str, root: Option<ResourceId>, dry_run: bool) -> Self {
        Self {
            workflow: workflow.to_string(),
            root,
            dry_run,
            resolved: Vec::new(),
            unresolved: Vec::new(),
            mutations: MutationReport::default(),
            error: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Whether the run failed before any mutation was attempted.
    pub fn failed_resolution(&self) -> bool {
        self.error
            .as_ref()
            .is_some_and(ChownError::is_resolution_failure)
    }
}

fn serialize_error<S: Serializer>(
    error: &Option<ChownError>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match error {
        Some(e) => serializer.serialize_some(&e.to_string()),
        None => serializer.serialize_none(),
    }
}
