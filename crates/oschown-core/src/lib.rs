//! oschown core library
//!
//! Changes the owning user and project of cloud resources. A root resource
//! is resolved together with everything that must move with it, across
//! services, before any ownership is changed.

pub mod backend;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod identity;
pub mod provider;
pub mod types;
pub mod workflow;

/// Re-exports of commonly used types
pub mod prelude {
    pub use crate::context::AppContext;
    pub use crate::error::{ChownError, Result};
    pub use crate::types::{ChownContext, ResourceId};

    // Configuration
    pub use crate::config::{ConfigStore, OschownConfig};
    pub use crate::identity::{IdentityDirectory, StaticDirectory, resolve_context};

    // Resolution
    pub use crate::engine::{ChownOutcome, ChownStatus, MutationReport, ResourceCollection};
    pub use crate::provider::{ProviderRegistry, Resource, ResourceProvider};

    // Workflows
    pub use crate::workflow::{
        OwnerWorkflow, RootWorkflow, Workflow, WorkflowRegistry, WorkflowReport,
    };
}
