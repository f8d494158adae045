//! # Manager
//!
//! Shared registry of named resources that conditions may depend on.
//!
//! A stage receives a `&dyn Manager` at construction and passes it down to
//! its condition. Resource lookups happen only during construction.

use crate::SieveError;
use crate::condition::{self, Condition};
use crate::metrics::{Metrics, Namespaced};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::Span;

/// Resolves named dependencies for conditions.
pub trait Manager: Send + Sync {
    /// Look up a shared condition by name.
    fn get_condition(&self, name: &str) -> Result<Arc<dyn Condition>, SieveError>;
}

/// Declarative resources, as found under `resources` in a config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourcesConfig {
    /// Named conditions available to `resource` conditions.
    pub conditions: BTreeMap<String, condition::Config>,
}

/// BTreeMap-backed [`Manager`].
#[derive(Default)]
pub struct Resources {
    conditions: BTreeMap<String, Arc<dyn Condition>>,
}

impl Resources {
    /// Create an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build every declared resource.
    ///
    /// A condition is built after every resource it references, so
    /// declaration order does not matter. Reference cycles are rejected.
    /// Metrics are namespaced under `resource.condition.<name>`.
    pub fn from_config(
        conf: &ResourcesConfig,
        log: &Span,
        stats: Arc<dyn Metrics>,
    ) -> Result<Self, SieveError> {
        let mut resources = Self::new();
        for name in build_order(conf)? {
            let Some(cond_conf) = conf.conditions.get(name) else {
                continue;
            };
            resources
                .add_condition(name, cond_conf, log, Arc::clone(&stats))
                .map_err(|e| {
                    SieveError::InvalidConfig(format!(
                        "failed to build resource condition '{}': {}",
                        name, e
                    ))
                })?;
        }
        Ok(resources)
    }

    /// Build a condition and register it under `name`.
    pub fn add_condition(
        &mut self,
        name: &str,
        conf: &condition::Config,
        log: &Span,
        stats: Arc<dyn Metrics>,
    ) -> Result<(), SieveError> {
        let log = tracing::debug_span!(parent: log, "resource", name);
        let ns = Arc::new(Namespaced::new(stats, format!("resource.condition.{}", name)));
        let cond = condition::new(conf, &*self, &log, ns)?;
        self.conditions.insert(name.to_string(), cond);
        Ok(())
    }

    /// Names of every registered condition, in order.
    pub fn condition_names(&self) -> impl Iterator<Item = &str> {
        self.conditions.keys().map(String::as_str)
    }
}

// =============================================================================
// DEPENDENCY ORDER
// =============================================================================

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    InProgress,
    Done,
}

/// Declared resource names, each placed after the resources it references.
/// Ties keep name order.
fn build_order(conf: &ResourcesConfig) -> Result<Vec<&str>, SieveError> {
    let mut state: BTreeMap<&str, Visit> = BTreeMap::new();
    let mut order = Vec::with_capacity(conf.conditions.len());
    for name in conf.conditions.keys() {
        visit(name, conf, &mut state, &mut order)?;
    }
    Ok(order)
}

fn visit<'a>(
    name: &'a str,
    conf: &'a ResourcesConfig,
    state: &mut BTreeMap<&'a str, Visit>,
    order: &mut Vec<&'a str>,
) -> Result<(), SieveError> {
    match state.get(name) {
        Some(Visit::Done) => return Ok(()),
        Some(Visit::InProgress) => {
            return Err(SieveError::InvalidConfig(format!(
                "resource condition '{}' references itself",
                name
            )));
        }
        None => {}
    }
    // Undeclared names are reported by the `resource` constructor.
    let Some(cond) = conf.conditions.get(name) else {
        return Ok(());
    };

    state.insert(name, Visit::InProgress);
    let mut refs = Vec::new();
    references(cond, &mut refs);
    for target in refs {
        visit(target, conf, state, order)?;
    }
    state.insert(name, Visit::Done);
    order.push(name);
    Ok(())
}

/// Resource names a condition config reaches.
fn references<'a>(conf: &'a condition::Config, out: &mut Vec<&'a str>) {
    match conf.kind.as_str() {
        "resource" => out.push(conf.resource.as_str()),
        "and" => conf.and.iter().for_each(|c| references(c, out)),
        "or" => conf.or.iter().for_each(|c| references(c, out)),
        "not" => {
            if let Some(child) = conf.not.as_deref() {
                references(child, out);
            }
        }
        _ => {}
    }
}

impl Manager for Resources {
    fn get_condition(&self, name: &str) -> Result<Arc<dyn Condition>, SieveError> {
        self.conditions
            .get(name)
            .cloned()
            .ok_or_else(|| SieveError::ResourceNotFound(name.to_string()))
    }
}
