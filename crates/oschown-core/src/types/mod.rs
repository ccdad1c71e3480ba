//! Shared core types used by providers, the resolution engine and workflows.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ChownError;

/// Provider-qualified identifier of a single resource, e.g. `nova:<uuid>`.
///
/// Ordering is lexicographic on `(provider, local_id)` so identifiers can be
/// kept in ordered sets when comparing resolution passes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceId {
    provider: String,
    local_id: String,
}

impl ResourceId {
    /// Build an identifier from its two halves.
    pub fn new(provider: impl Into<String>, local_id: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            local_id: local_id.into(),
        }
    }

    /// Parse `"provider:local_id"`, splitting on the first `:`.
    pub fn parse(s: &str) -> Result<Self, ChownError> {
        match s.split_once(':') {
            Some((provider, local_id)) if !provider.is_empty() && !local_id.is_empty() => {
                Ok(Self::new(provider, local_id))
            }
            _ => Err(ChownError::InvalidResourceId(s.to_string())),
        }
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn local_id(&self) -> &str {
        &self.local_id
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.provider, self.local_id)
    }
}

impl FromStr for ResourceId {
    type Err = ChownError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ResourceId {
    type Error = ChownError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ResourceId> for String {
    fn from(id: ResourceId) -> Self {
        id.to_string()
    }
}

/// Request-scoped parameters of a single chown invocation.
///
/// Built once by the caller after the target user and project have been
/// normalized, then handed by reference to every provider call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChownContext {
    target_user_id: String,
    target_project_id: String,
    dry_run: bool,
}

impl ChownContext {
    pub fn new(
        target_user_id: impl Into<String>,
        target_project_id: impl Into<String>,
        dry_run: bool,
    ) -> Self {
        Self {
            target_user_id: target_user_id.into(),
            target_project_id: target_project_id.into(),
            dry_run,
        }
    }

    pub fn target_user_id(&self) -> &str {
        &self.target_user_id
    }

    pub fn target_project_id(&self) -> &str {
        &self.target_project_id
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }
}
