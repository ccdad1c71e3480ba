//! User and project normalization.
//!
//! Operators may name the target user and project either by name or by id.
//! An [`IdentityDirectory`] turns either form into the id that providers
//! write into their services. The static directory is fed from the
//! `[identity]` section of oschown.toml.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::types::ChownContext;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("user '{0}' not found")]
    UserNotFound(String),

    #[error("project '{0}' not found")]
    ProjectNotFound(String),
}

/// `[identity]` section of oschown.toml
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// User name to user id
    #[serde(default)]
    pub users: BTreeMap<String, String>,

    /// Project name to project id
    #[serde(default)]
    pub projects: BTreeMap<String, String>,
}

impl IdentityConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, id) in &self.users {
            if id.trim().is_empty() {
                anyhow::bail!("user '{}' has an empty id", name);
            }
        }
        for (name, id) in &self.projects {
            if id.trim().is_empty() {
                anyhow::bail!("project '{}' has an empty id", name);
            }
        }
        Ok(())
    }
}

/// Resolves user and project references to ids.
pub trait IdentityDirectory {
    fn resolve_user(&self, name_or_id: &str) -> Result<String, IdentityError>;

    fn resolve_project(&self, name_or_id: &str) -> Result<String, IdentityError>;
}

/// Directory backed by fixed name to id tables.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    users: BTreeMap<String, String>,
    projects: BTreeMap<String, String>,
}

impl StaticDirectory {
    pub fn new(config: &IdentityConfig) -> Self {
        Self {
            users: config.users.clone(),
            projects: config.projects.clone(),
        }
    }
}

/// Look up by name first, then accept the input if it is a known id.
fn lookup(table: &BTreeMap<String, String>, name_or_id: &str) -> Option<String> {
    if let Some(id) = table.get(name_or_id) {
        return Some(id.clone());
    }
    table
        .values()
        .find(|id| id.as_str() == name_or_id)
        .cloned()
}

impl IdentityDirectory for StaticDirectory {
    fn resolve_user(&self, name_or_id: &str) -> Result<String, IdentityError> {
        let id = lookup(&self.users, name_or_id)
            .ok_or_else(|| IdentityError::UserNotFound(name_or_id.to_string()))?;
        debug!("Resolved user {} to {}", name_or_id, id);
        Ok(id)
    }

    fn resolve_project(&self, name_or_id: &str) -> Result<String, IdentityError> {
        let id = lookup(&self.projects, name_or_id)
            .ok_or_else(|| IdentityError::ProjectNotFound(name_or_id.to_string()))?;
        debug!("Resolved project {} to {}", name_or_id, id);
        Ok(id)
    }
}

/// Build a [`ChownContext`] from user and project references.
///
/// With no directory the references are taken as ids verbatim.
pub fn resolve_context(
    directory: Option<&dyn IdentityDirectory>,
    user: &str,
    project: &str,
    dry_run: bool,
) -> Result<ChownContext, IdentityError> {
    let Some(directory) = directory else {
        return Ok(ChownContext::new(user, project, dry_run));
    };
    let user_id = directory.resolve_user(user)?;
    let project_id = directory.resolve_project(project)?;
    Ok(ChownContext::new(user_id, project_id, dry_run))
}
