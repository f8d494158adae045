//! Per-part metadata comparison.

use super::{CheckCounters, Condition, Config};
use crate::SieveError;
use crate::manager::Manager;
use crate::message::Locked;
use crate::metrics::Metrics;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::Span;

/// Section for the `metadata` condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    /// One of the operator names accepted by [`MetadataOperator::parse`].
    pub operator: String,
    /// Index of the part to test. Negative values count from the end.
    pub part: i64,
    /// Metadata key to read.
    pub key: String,
    /// Comparison argument. Ignored by `exists`.
    pub arg: String,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            operator: "equals_cs".to_string(),
            part: 0,
            key: String::new(),
            arg: String::new(),
        }
    }
}

/// Comparison applied by the `metadata` condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataOperator {
    EqualsCs(String),
    /// Argument stored lowercased.
    Equals(String),
    Exists,
    HasPrefix(String),
    GreaterThan(i64),
    LessThan(i64),
}

impl MetadataOperator {
    /// Parse an operator name together with its argument.
    ///
    /// Numeric operators require an integer argument.
    pub fn parse(name: &str, arg: &str) -> Result<Self, SieveError> {
        let numeric = || {
            arg.trim().parse::<i64>().map_err(|_| {
                SieveError::InvalidConfig(format!(
                    "metadata operator '{}' requires an integer arg, got '{}'",
                    name, arg
                ))
            })
        };

        match name {
            "equals_cs" => Ok(Self::EqualsCs(arg.to_string())),
            "equals" => Ok(Self::Equals(arg.to_lowercase())),
            "exists" => Ok(Self::Exists),
            "has_prefix" => Ok(Self::HasPrefix(arg.to_string())),
            "greater_than" => numeric().map(Self::GreaterThan),
            "less_than" => numeric().map(Self::LessThan),
            other => Err(SieveError::InvalidConfig(format!(
                "metadata operator '{}' was not recognised",
                other
            ))),
        }
    }

    fn apply(&self, value: Option<&str>) -> bool {
        let Some(value) = value else {
            return false;
        };
        match self {
            Self::EqualsCs(arg) => value == arg,
            Self::Equals(arg) => value.to_lowercase() == *arg,
            Self::Exists => true,
            Self::HasPrefix(arg) => value.starts_with(arg.as_str()),
            Self::GreaterThan(arg) => value.trim().parse::<i64>().is_ok_and(|v| v > *arg),
            Self::LessThan(arg) => value.trim().parse::<i64>().is_ok_and(|v| v < *arg),
        }
    }
}

/// Tests one metadata value of one part.
pub struct Metadata {
    operator: MetadataOperator,
    part: i64,
    key: String,
    log: Span,
    counters: CheckCounters,
}

impl Condition for Metadata {
    fn check(&self, msg: Locked<'_>) -> bool {
        let Some(part) = msg.get(self.part) else {
            tracing::debug!(parent: &self.log, index = self.part, "part index out of range");
            return self.counters.record(false);
        };
        let result = self.operator.apply(part.metadata_get(&self.key));
        self.counters.record(result)
    }
}

pub(super) fn new(
    conf: &Config,
    _mgr: &dyn Manager,
    log: &Span,
    stats: Arc<dyn Metrics>,
) -> Result<Arc<dyn Condition>, SieveError> {
    let section = &conf.metadata;
    if section.key.is_empty() {
        return Err(SieveError::InvalidConfig(
            "metadata condition requires a key".to_string(),
        ));
    }

    Ok(Arc::new(Metadata {
        operator: MetadataOperator::parse(&section.operator, &section.arg)?,
        part: section.part,
        key: section.key.clone(),
        log: tracing::debug_span!(parent: log, "condition", kind = "metadata"),
        counters: CheckCounters::register(stats.as_ref(), "metadata"),
    }))
}
