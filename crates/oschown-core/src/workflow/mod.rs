//! Workflows: seed a resource collection, resolve it, then chown it.
//!
//! Every workflow follows the same two phases. Resolution must complete
//! before anything is mutated; if it fails, the run ends with zero
//! mutations. Single-root workflows are registered per resource kind in a
//! [`WorkflowRegistry`]; [`OwnerWorkflow`] seeds from everything an owner
//! holds instead.

pub mod report;

use std::fmt;

use tracing::{error, info};

use crate::engine::ResourceCollection;
use crate::error::Result;
use crate::provider::ProviderRegistry;
use crate::provider::cinder::CINDER;
use crate::provider::nova::NOVA;
use crate::types::{ChownContext, ResourceId};

pub use report::WorkflowReport;

/// A workflow rooted at one resource of a given kind.
pub trait Workflow: fmt::Debug {
    /// Resource kind accepted as root, e.g. `nova`.
    fn kind(&self) -> &'static str;

    fn description(&self) -> &'static str;

    fn run(&self, providers: &ProviderRegistry, ctx: &ChownContext, local_id: &str)
    -> WorkflowReport;
}

/// Changes ownership of a root resource and everything it depends on.
#[derive(Debug, Clone)]
pub struct RootWorkflow {
    kind: &'static str,
    description: &'static str,
}

impl RootWorkflow {
    pub fn new(kind: &'static str, description: &'static str) -> Self {
        Self { kind, description }
    }

    /// Instance and dependent resources.
    pub fn nova() -> Self {
        Self::new(
            NOVA,
            "Resolve and change ownership of an instance and dependent resources",
        )
    }

    /// Volume and dependent resources.
    pub fn cinder() -> Self {
        Self::new(
            CINDER,
            "Resolve and change ownership of a volume and dependent resources",
        )
    }
}

impl Workflow for RootWorkflow {
    fn kind(&self) -> &'static str {
        self.kind
    }

    fn description(&self) -> &'static str {
        self.description
    }

    fn run(
        &self,
        providers: &ProviderRegistry,
        ctx: &ChownContext,
        local_id: &str,
    ) -> WorkflowReport {
        let root = ResourceId::new(self.kind, local_id);
        let mut report = WorkflowReport::new(self.kind, Some(root.clone()), ctx.dry_run());

        let mut collection = ResourceCollection::new(providers);
        collection.need(root);
        let resolved = run_checks(providers, ctx).and_then(|()| collection.resolve_all(ctx));
        finish(&collection, ctx, resolved, &mut report);
        report
    }
}

/// Changes ownership of everything a user or project holds.
#[derive(Debug, Clone, Copy, Default)]
pub struct OwnerWorkflow;

impl OwnerWorkflow {
    pub fn run(
        &self,
        providers: &ProviderRegistry,
        ctx: &ChownContext,
        owner_user_id: Option<&str>,
        owner_project_id: &str,
    ) -> WorkflowReport {
        let mut report = WorkflowReport::new("project", None, ctx.dry_run());
        let mut collection = ResourceCollection::new(providers);

        let resolved = run_checks(providers, ctx)
            .and_then(|()| {
                seed_from_owner(
                    &mut collection,
                    providers,
                    ctx,
                    owner_user_id,
                    owner_project_id,
                )
            })
            .and_then(|()| collection.resolve_all(ctx));
        finish(&collection, ctx, resolved, &mut report);
        report
    }
}

fn seed_from_owner(
    collection: &mut ResourceCollection<'_>,
    providers: &ProviderRegistry,
    ctx: &ChownContext,
    owner_user_id: Option<&str>,
    owner_project_id: &str,
) -> Result<()> {
    for provider in providers.all() {
        for resource in provider.collect_by_owner(ctx, owner_user_id, owner_project_id)? {
            collection.add_resolved(resource);
        }
    }
    info!(
        "Collected {} resources owned by project {}",
        collection.len(),
        owner_project_id
    );
    Ok(())
}

/// Run every provider's pre-flight check.
pub fn run_checks(providers: &ProviderRegistry, ctx: &ChownContext) -> Result<()> {
    for provider in providers.all() {
        provider.check(ctx)?;
    }
    Ok(())
}

/// Record the resolution result and, if it succeeded, chown the collection.
fn finish(
    collection: &ResourceCollection<'_>,
    ctx: &ChownContext,
    resolved: Result<()>,
    report: &mut WorkflowReport,
) {
    report.resolved = collection.resolved_ids();
    report.unresolved = collection.unresolved();

    if let Err(e) = resolved {
        error!("Unable to resolve resources: {}", e);
        report.error = Some(e);
        return;
    }

    info!(
        "Resolved {} resources to be chowned: {}",
        report.resolved.len(),
        report
            .resolved
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",")
    );

    report.mutations = collection.chown_all(ctx);
    report.error = report.mutations.error.clone();
}

/// Registry of single-root workflows keyed by resource kind.
#[derive(Debug)]
pub struct WorkflowRegistry {
    workflows: Vec<Box<dyn Workflow>>,
}

impl Default for WorkflowRegistry {
    fn default() -> Self {
        Self::with_default_workflows()
    }
}

impl WorkflowRegistry {
    /// Registry with the nova and cinder root workflows.
    pub fn with_default_workflows() -> Self {
        let workflows: Vec<Box<dyn Workflow>> = vec![
            Box::new(RootWorkflow::nova()),
            Box::new(RootWorkflow::cinder()),
        ];
        Self { workflows }
    }

    pub fn get(&self, kind: &str) -> Option<&dyn Workflow> {
        self.workflows
            .iter()
            .find(|w| w.kind() == kind)
            .map(|w| w.as_ref())
    }

    pub fn kinds(&self) -> Vec<&'static str> {
        self.workflows.iter().map(|w| w.kind()).collect()
    }

    pub fn all(&self) -> &[Box<dyn Workflow>] {
        &self.workflows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_workflows_registered() {
        let registry = WorkflowRegistry::with_default_workflows();
        assert_eq!(registry.kinds(), vec!["nova", "cinder"]);
        assert!(registry.get("neutron").is_none());
    }

    #[test]
    fn test_root_id_uses_kind_namespace() {
        let providers = ProviderRegistry::new();
        let ctx = ChownContext::new("u", "p", true);
        let report = RootWorkflow::cinder().run(&providers, &ctx, "VOL1");

        assert_eq!(report.root, Some(ResourceId::new("cinder", "VOL1")));
        assert_eq!(report.unresolved, vec![ResourceId::new("cinder", "VOL1")]);
        assert!(report.failed_resolution());
    }
}
