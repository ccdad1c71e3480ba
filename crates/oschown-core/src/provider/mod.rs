//! Provider layer: one adapter per backing service.
//!
//! A provider knows how to fetch a resource from its service by local id and
//! turns it into a [`Resource`] that reports which other resources must move
//! along with it. Providers never change ownership while collecting; only
//! [`Resource::chown`] mutates.

pub mod cinder;
pub mod neutron;
pub mod nova;
pub mod registry;

use std::fmt;

use crate::error::Result;
use crate::types::{ChownContext, ResourceId};

pub use cinder::{CinderConfig, CinderProvider, CinderResource};
pub use neutron::{NeutronConfig, NeutronProvider};
pub use nova::{NovaConfig, NovaProvider, NovaResource};
pub use registry::ProviderRegistry;

/// A resolved resource whose ownership can be changed.
pub trait Resource: fmt::Debug {
    /// Globally unique, provider-qualified identifier.
    fn identifier(&self) -> &ResourceId;

    /// Resources that must change ownership together with this one.
    ///
    /// Computed once when the resource is collected.
    fn dependencies(&self) -> &[ResourceId];

    /// Change ownership in the backing service.
    ///
    /// Called at most once per resource per workflow run.
    fn chown(&self, ctx: &ChownContext) -> Result<()>;
}

/// Adapter for one backing service.
pub trait ResourceProvider: fmt::Debug {
    /// Namespace prefix used in resource identifiers.
    fn name(&self) -> &'static str;

    /// Fetch a single resource and its dependencies.
    fn collect_by_id(&self, ctx: &ChownContext, local_id: &str) -> Result<Box<dyn Resource>>;

    /// Fetch every resource held by the given owner.
    ///
    /// With no `user_id`, everything in the project is returned. Providers
    /// that cannot enumerate their service return nothing.
    fn collect_by_owner(
        &self,
        _ctx: &ChownContext,
        _user_id: Option<&str>,
        _project_id: &str,
    ) -> Result<Vec<Box<dyn Resource>>> {
        Ok(Vec::new())
    }

    /// Side-effect free pre-flight validation.
    fn check(&self, _ctx: &ChownContext) -> Result<()> {
        Ok(())
    }

    /// Build an identifier in this provider's namespace.
    fn resource_id(&self, local_id: &str) -> ResourceId {
        ResourceId::new(self.name(), local_id)
    }
}
