//! In-memory providers for exercising resolution and workflows.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use oschown_core::error::{ChownError, Result};
use oschown_core::provider::{Resource, ResourceProvider};
use oschown_core::types::{ChownContext, ResourceId};

/// Calls observed across every fake provider sharing it.
#[derive(Debug, Default)]
pub struct CallLog {
    collected: RefCell<Vec<ResourceId>>,
    chowned: RefCell<Vec<ResourceId>>,
}

impl CallLog {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn collected(&self) -> Vec<String> {
        self.collected.borrow().iter().map(ToString::to_string).collect()
    }

    /// Every chown attempt, including failed ones.
    pub fn chowned(&self) -> Vec<String> {
        self.chowned.borrow().iter().map(ToString::to_string).collect()
    }

    pub fn collect_count(&self, id: &str) -> usize {
        self.collected
            .borrow()
            .iter()
            .filter(|c| c.to_string() == id)
            .count()
    }
}

#[derive(Debug)]
pub struct FakeResource {
    id: ResourceId,
    deps: Vec<ResourceId>,
    fail_chown: bool,
    log: Rc<CallLog>,
}

impl Resource for FakeResource {
    fn identifier(&self) -> &ResourceId {
        &self.id
    }

    fn dependencies(&self) -> &[ResourceId] {
        &self.deps
    }

    fn chown(&self, _ctx: &ChownContext) -> Result<()> {
        self.log.chowned.borrow_mut().push(self.id.clone());
        if self.fail_chown {
            return Err(ChownError::MutationFailed {
                id: self.id.clone(),
                reason: "backend refused".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct FakeProvider {
    name: &'static str,
    deps: HashMap<String, Vec<ResourceId>>,
    not_found: HashSet<String>,
    unsupported: HashSet<String>,
    deferred: HashSet<String>,
    failing: HashSet<String>,
    canonical: HashMap<String, String>,
    owned: Vec<String>,
    check_error: Option<String>,
    log: Rc<CallLog>,
}

impl FakeProvider {
    pub fn new(name: &'static str, log: &Rc<CallLog>) -> Self {
        Self {
            name,
            deps: HashMap::new(),
            not_found: HashSet::new(),
            unsupported: HashSet::new(),
            deferred: HashSet::new(),
            failing: HashSet::new(),
            canonical: HashMap::new(),
            owned: Vec::new(),
            check_error: None,
            log: Rc::clone(log),
        }
    }

    /// `local_id` depends on the given `provider:id` strings.
    pub fn with_deps(mut self, local_id: &str, deps: &[&str]) -> Self {
        let deps = deps
            .iter()
            .map(|d| ResourceId::parse(d).expect("valid dependency id"))
            .collect();
        self.deps.insert(local_id.to_string(), deps);
        self
    }

    pub fn missing(mut self, local_id: &str) -> Self {
        self.not_found.insert(local_id.to_string());
        self
    }

    pub fn unsupported(mut self, local_id: &str) -> Self {
        self.unsupported.insert(local_id.to_string());
        self
    }

    pub fn deferred(mut self, local_id: &str) -> Self {
        self.deferred.insert(local_id.to_string());
        self
    }

    pub fn failing_chown(mut self, local_id: &str) -> Self {
        self.failing.insert(local_id.to_string());
        self
    }

    /// Looking up `alias` yields the resource known as `local_id`.
    pub fn canonical(mut self, alias: &str, local_id: &str) -> Self {
        self.canonical
            .insert(alias.to_string(), local_id.to_string());
        self
    }

    pub fn owning(mut self, local_id: &str) -> Self {
        self.owned.push(local_id.to_string());
        self
    }

    pub fn failing_check(mut self, reason: &str) -> Self {
        self.check_error = Some(reason.to_string());
        self
    }

    pub fn boxed(self) -> Box<dyn ResourceProvider> {
        Box::new(self)
    }

    fn build(&self, requested: &str) -> Box<dyn Resource> {
        self.log
            .collected
            .borrow_mut()
            .push(self.resource_id(requested));
        let local_id = self
            .canonical
            .get(requested)
            .map_or(requested, String::as_str);
        Box::new(FakeResource {
            id: self.resource_id(local_id),
            deps: self.deps.get(local_id).cloned().unwrap_or_default(),
            fail_chown: self.failing.contains(local_id),
            log: Rc::clone(&self.log),
        })
    }
}

impl ResourceProvider for FakeProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    fn collect_by_id(&self, _ctx: &ChownContext, local_id: &str) -> Result<Box<dyn Resource>> {
        let id = self.resource_id(local_id);
        if self.not_found.contains(local_id) {
            return Err(ChownError::ResourceNotFound { id });
        }
        if self.unsupported.contains(local_id) {
            return Err(ChownError::UnsupportedOperation {
                id,
                reason: "not transferable".to_string(),
            });
        }
        if self.deferred.contains(local_id) {
            return Err(ChownError::ResolutionDeferred {
                id,
                reason: "service busy".to_string(),
            });
        }
        Ok(self.build(local_id))
    }

    fn collect_by_owner(
        &self,
        _ctx: &ChownContext,
        _user_id: Option<&str>,
        _project_id: &str,
    ) -> Result<Vec<Box<dyn Resource>>> {
        Ok(self.owned.iter().map(|local| self.build(local)).collect())
    }

    fn check(&self, _ctx: &ChownContext) -> Result<()> {
        match &self.check_error {
            Some(reason) => Err(ChownError::CheckFailed {
                provider: self.name.to_string(),
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }
}

pub fn ctx() -> ChownContext {
    ChownContext::new("new-user", "new-project", false)
}

pub fn dry_run_ctx() -> ChownContext {
    ChownContext::new("new-user", "new-project", true)
}

pub fn id(s: &str) -> ResourceId {
    ResourceId::parse(s).expect("valid id")
}
