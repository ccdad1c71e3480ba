//! Resolution engine.
//!
//! A [`ResourceCollection`] tracks every resource that must change ownership
//! together. Resources only reveal their dependencies once fetched, so the
//! collection resolves in passes: each pass fetches whatever was pending when
//! it started, and the dependencies it discovers wait for the next pass. The
//! loop ends when nothing is pending, or fails when a pass makes no progress.
//!
//! Mutation happens strictly after resolution has completed, in the order the
//! resources were resolved.

pub mod outcome;

use std::collections::{BTreeSet, HashMap};

use indexmap::IndexMap;
use tracing::{debug, info, warn};

use crate::error::{ChownError, Result};
use crate::provider::{ProviderRegistry, Resource};
use crate::types::{ChownContext, ResourceId};

pub use outcome::{ChownOutcome, ChownStatus, MutationReport};

/// Progress made by a single resolution pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    /// Identifiers fetched successfully during the pass.
    pub resolved: usize,
    /// Identifiers first seen during the pass.
    pub discovered: usize,
    /// Identifiers the providers asked to retry later.
    pub deferred: usize,
}

impl PassSummary {
    pub fn made_progress(&self) -> bool {
        self.resolved > 0 || self.discovered > 0
    }
}

/// Working set of resources that must be chowned together.
///
/// `None` slots are pending, `Some` slots are resolved, and iteration
/// follows insertion order. Resolved slots are keyed by the identifier the
/// resource reports. A requested id the provider resolves under another
/// identifier becomes an alias of it and is tracked only once.
pub struct ResourceCollection<'r> {
    registry: &'r ProviderRegistry,
    resources: IndexMap<ResourceId, Option<Box<dyn Resource>>>,
    aliases: HashMap<ResourceId, ResourceId>,
}

impl<'r> ResourceCollection<'r> {
    pub fn new(registry: &'r ProviderRegistry) -> Self {
        Self {
            registry,
            resources: IndexMap::new(),
            aliases: HashMap::new(),
        }
    }

    /// Mark a resource as needed. Returns `false` if it was already tracked.
    pub fn need(&mut self, id: ResourceId) -> bool {
        if self.contains(&id) {
            return false;
        }
        debug!("Need resource {}", id);
        self.resources.insert(id, None);
        true
    }

    /// Add an already-fetched resource, e.g. from bulk collection.
    ///
    /// Its dependencies become pending. Returns the number newly tracked.
    pub fn add_resolved(&mut self, resource: Box<dyn Resource>) -> usize {
        let discovered = resource
            .dependencies()
            .iter()
            .cloned()
            .collect::<Vec<_>>();
        self.resources
            .insert(resource.identifier().clone(), Some(resource));
        discovered.into_iter().filter(|dep| self.need(dep.clone())).count()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Whether `id` is tracked, directly or as an alias.
    pub fn contains(&self, id: &ResourceId) -> bool {
        self.resources.contains_key(id) || self.aliases.contains_key(id)
    }

    /// Pending identifiers, in insertion order.
    pub fn unresolved(&self) -> Vec<ResourceId> {
        self.resources
            .iter()
            .filter(|(_, slot)| slot.is_none())
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn have_all_resources(&self) -> bool {
        self.resources.values().all(Option::is_some)
    }

    /// Resolved resources, in the order they were resolved.
    pub fn resolved(&self) -> Vec<&dyn Resource> {
        self.resources
            .values()
            .filter_map(|slot| slot.as_deref())
            .collect()
    }

    pub fn resolved_ids(&self) -> Vec<ResourceId> {
        self.resolved()
            .into_iter()
            .map(|r| r.identifier().clone())
            .collect()
    }

    /// Make one pass over the identifiers pending at entry.
    ///
    /// Dependencies discovered along the way are only registered; they are
    /// fetched by the next pass.
    pub fn resolve_one_pass(&mut self, ctx: &ChownContext) -> Result<PassSummary> {
        let mut summary = PassSummary::default();

        for id in self.unresolved() {
            // An alias resolved earlier in this pass may have filled it.
            if !matches!(self.resources.get(&id), Some(None)) {
                continue;
            }

            let provider = self
                .registry
                .get(id.provider())
                .ok_or_else(|| ChownError::UnknownResourceType { id: id.clone() })?;

            let resource = match provider.collect_by_id(ctx, id.local_id()) {
                Ok(resource) => resource,
                Err(ChownError::ResolutionDeferred { id, reason }) => {
                    warn!("Deferring resolution of {}: {}", id, reason);
                    summary.deferred += 1;
                    continue;
                }
                Err(e) => return Err(e),
            };
            summary.resolved += 1;

            let deps = resource.dependencies().to_vec();
            if !self.store(&id, resource) {
                continue;
            }

            for dep in deps {
                if self.need(dep) {
                    summary.discovered += 1;
                }
            }
        }

        Ok(summary)
    }

    /// Fill the slot of the requested `id` with its resource.
    ///
    /// Returns `false` when the resource turned out to be tracked already
    /// under its own identifier, in which case it is dropped.
    fn store(&mut self, id: &ResourceId, resource: Box<dyn Resource>) -> bool {
        let canonical = resource.identifier().clone();
        if &canonical == id {
            if let Some(slot) = self.resources.get_mut(id) {
                *slot = Some(resource);
            }
            return true;
        }

        debug!("Resource {} resolved as {}", id, canonical);
        let position = self.resources.get_index_of(id);
        self.resources.shift_remove(id);
        self.aliases.insert(id.clone(), canonical.clone());

        match self.resources.get_mut(&canonical) {
            Some(Some(_)) => false,
            Some(slot) => {
                *slot = Some(resource);
                true
            }
            None => {
                let index = position.unwrap_or(self.resources.len());
                self.resources.shift_insert(index, canonical, Some(resource));
                true
            }
        }
    }

    /// Resolve passes until nothing is pending.
    ///
    /// Fails with [`ChownError::UnableToResolveResources`] when a pass leaves
    /// the pending set unchanged.
    pub fn resolve_all(&mut self, ctx: &ChownContext) -> Result<()> {
        let mut pass = 0usize;
        while !self.have_all_resources() {
            pass += 1;
            let before: BTreeSet<ResourceId> = self.unresolved().into_iter().collect();
            debug!("Resolution pass {} over {} pending", pass, before.len());

            let summary = self.resolve_one_pass(ctx)?;

            let after: BTreeSet<ResourceId> = self.unresolved().into_iter().collect();
            debug!(
                "Resolution pass {}: {} resolved, {} discovered, {} deferred",
                pass, summary.resolved, summary.discovered, summary.deferred
            );
            if !summary.made_progress() && before == after {
                let pending = self.unresolved();
                warn!(
                    "Resolution stalled after {} passes with {} pending",
                    pass,
                    pending.len()
                );
                return Err(ChownError::UnableToResolveResources { pending });
            }
        }
        Ok(())
    }

    /// Change ownership of every resolved resource, in resolution order.
    ///
    /// Under dry run nothing is mutated. Stops at the first failure; the
    /// remaining resources are reported as skipped.
    pub fn chown_all(&self, ctx: &ChownContext) -> MutationReport {
        let mut report = MutationReport::default();
        let mut failed = false;

        for resource in self.resolved() {
            let id = resource.identifier().clone();
            if failed {
                report.push(id, ChownStatus::Skipped);
            } else if ctx.dry_run() {
                info!("Would chown resource {}", id);
                report.push(id, ChownStatus::WouldChange);
            } else {
                info!("Chowning resource {}", id);
                match resource.chown(ctx) {
                    Ok(()) => report.push(id, ChownStatus::Changed),
                    Err(e) => {
                        warn!("Failed to chown resource {}: {}", id, e);
                        failed = true;
                        report.push(
                            id,
                            ChownStatus::Failed {
                                reason: e.to_string(),
                            },
                        );
                        report.error = Some(e);
                    }
                }
            }
        }

        report
    }
}

impl std::fmt::Debug for ResourceCollection<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceCollection")
            .field("providers", &self.registry.names())
            .field("resolved", &self.resolved_ids())
            .field("unresolved", &self.unresolved())
            .finish()
    }
}
