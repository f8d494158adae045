//! # Conditions
//!
//! Boolean predicates evaluated against a single locked part.
//!
//! Conditions are built from a [`Config`] whose `type` field selects an
//! entry in the registry returned by [`constructors`]. Each entry maps the
//! type name to a constructor function, so new variants only need a
//! registry line and a `Condition` impl.
//!
//! ## Registered Types
//!
//! | Type | Behavior |
//! |------|----------|
//! | `static` | Always returns the configured boolean |
//! | `text` | Compares the part content against an argument |
//! | `metadata` | Compares a part metadata value against an argument |
//! | `and` | True if every child is true |
//! | `or` | True if any child is true |
//! | `not` | Inverts its child |
//! | `resource` | Delegates to a named condition held by the manager |

mod logic;
mod metadata;
mod resource;
mod static_value;
mod text;

pub use logic::{And, Not, Or};
pub use metadata::{Metadata, MetadataConfig, MetadataOperator};
pub use resource::Resource;
pub use static_value::Static;
pub use text::{Text, TextConfig, TextOperator};

use crate::SieveError;
use crate::manager::Manager;
use crate::message::Locked;
use crate::metrics::{Metrics, StatCounter};
use crate::primitives::MAX_CONDITION_DEPTH;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};
use tracing::Span;

// =============================================================================
// CONDITION TRAIT
// =============================================================================

/// A predicate over a single part.
///
/// `check` must not mutate the part (the locked view makes that
/// impossible) and must be safe to call from several threads at once. Any
/// internal state is the implementation's own business, including its
/// synchronization.
pub trait Condition: Send + Sync {
    /// Evaluate the condition against a locked part.
    fn check(&self, msg: Locked<'_>) -> bool;
}

// =============================================================================
// CONFIG
// =============================================================================

/// Condition configuration: a type discriminator plus one section per
/// registered type. Only the section matching `type` is read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Registry key of the condition to build.
    #[serde(rename = "type")]
    pub kind: String,
    /// Section for `static`.
    #[serde(rename = "static")]
    pub static_value: bool,
    /// Section for `text`.
    pub text: TextConfig,
    /// Section for `metadata`.
    pub metadata: MetadataConfig,
    /// Section for `and`.
    pub and: Vec<Config>,
    /// Section for `or`.
    pub or: Vec<Config>,
    /// Section for `not`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not: Option<Box<Config>>,
    /// Section for `resource`.
    pub resource: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            kind: "text".to_string(),
            static_value: true,
            text: TextConfig::default(),
            metadata: MetadataConfig::default(),
            and: Vec::new(),
            or: Vec::new(),
            not: None,
            resource: String::new(),
        }
    }
}

impl Config {
    /// Default config switched to the given type.
    #[must_use]
    pub fn of_kind(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Self::default()
        }
    }

    /// Nesting depth of combinator sections reachable from this config.
    /// A leaf condition has depth 1.
    #[must_use]
    pub fn depth(&self) -> usize {
        let children = match self.kind.as_str() {
            "and" => self.and.iter().map(Config::depth).max().unwrap_or(0),
            "or" => self.or.iter().map(Config::depth).max().unwrap_or(0),
            "not" => self.not.as_deref().map(Config::depth).unwrap_or(0),
            _ => 0,
        };
        children.saturating_add(1)
    }
}

// =============================================================================
// REGISTRY
// =============================================================================

/// Signature shared by every condition constructor.
pub type Constructor = fn(
    conf: &Config,
    mgr: &dyn Manager,
    log: &Span,
    stats: Arc<dyn Metrics>,
) -> Result<Arc<dyn Condition>, SieveError>;

/// A registered condition type.
#[derive(Clone, Copy)]
pub struct TypeSpec {
    /// Builds the condition from its config.
    pub constructor: Constructor,
    /// One-paragraph description used by `sieve list`.
    pub description: &'static str,
}

/// All registered condition types, keyed by their `type` name.
pub fn constructors() -> &'static BTreeMap<&'static str, TypeSpec> {
    static REGISTRY: OnceLock<BTreeMap<&'static str, TypeSpec>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let mut m: BTreeMap<&'static str, TypeSpec> = BTreeMap::new();
        m.insert(
            "static",
            TypeSpec {
                constructor: static_value::new,
                description: "Always resolves to the configured boolean value.",
            },
        );
        m.insert(
            "text",
            TypeSpec {
                constructor: text::new,
                description: "Tests the content of a part against a string argument \
                              using one of the equals, contains, prefix or suffix \
                              operators, each with a case-sensitive `_cs` variant.",
            },
        );
        m.insert(
            "metadata",
            TypeSpec {
                constructor: metadata::new,
                description: "Tests a metadata value of a part. Operators: equals_cs, \
                              equals, exists, has_prefix, greater_than, less_than.",
            },
        );
        m.insert(
            "and",
            TypeSpec {
                constructor: logic::new_and,
                description: "Resolves to true only if every child condition does. \
                              Children are evaluated in order and stop at the first false.",
            },
        );
        m.insert(
            "or",
            TypeSpec {
                constructor: logic::new_or,
                description: "Resolves to true if any child condition does. Children \
                              are evaluated in order and stop at the first true.",
            },
        );
        m.insert(
            "not",
            TypeSpec {
                constructor: logic::new_not,
                description: "Inverts the result of its child condition.",
            },
        );
        m.insert(
            "resource",
            TypeSpec {
                constructor: resource::new,
                description: "Delegates to a condition declared under \
                              `resources.conditions`, referenced by name.",
            },
        );
        m
    })
}

/// Build a condition from config.
///
/// Fails if the type is not registered, if the config nests combinators
/// deeper than `MAX_CONDITION_DEPTH`, or if the variant's own constructor
/// rejects its section.
pub fn new(
    conf: &Config,
    mgr: &dyn Manager,
    log: &Span,
    stats: Arc<dyn Metrics>,
) -> Result<Arc<dyn Condition>, SieveError> {
    let spec = constructors()
        .get(conf.kind.as_str())
        .ok_or_else(|| SieveError::UnknownConditionType(conf.kind.clone()))?;

    let depth = conf.depth();
    if depth > MAX_CONDITION_DEPTH {
        return Err(SieveError::InvalidConfig(format!(
            "condition nesting depth {} exceeds maximum {}",
            depth, MAX_CONDITION_DEPTH
        )));
    }

    (spec.constructor)(conf, mgr, log, stats)
}

// =============================================================================
// SANITIZE
// =============================================================================

/// Reduce a config to its `type` field and the section that type reads,
/// recursing through `and`, `or` and `not`.
pub fn sanitize(conf: &Config) -> Result<serde_json::Value, SieveError> {
    use serde_json::Value;

    if !constructors().contains_key(conf.kind.as_str()) {
        return Err(SieveError::UnknownConditionType(conf.kind.clone()));
    }

    let mut out = serde_json::Map::new();
    out.insert("type".to_string(), Value::String(conf.kind.clone()));

    let section = match conf.kind.as_str() {
        "and" => Value::Array(conf.and.iter().map(sanitize).collect::<Result<_, _>>()?),
        "or" => Value::Array(conf.or.iter().map(sanitize).collect::<Result<_, _>>()?),
        "not" => match conf.not.as_deref() {
            Some(child) => sanitize(child)?,
            None => Value::Null,
        },
        kind => {
            let full = serde_json::to_value(conf)
                .map_err(|e| SieveError::Serialization(e.to_string()))?;
            full.get(kind).cloned().unwrap_or(Value::Null)
        }
    };
    out.insert(conf.kind.clone(), section);

    Ok(Value::Object(out))
}

// =============================================================================
// SHARED COUNTERS
// =============================================================================

/// The `count`/`true`/`false` counters every leaf condition registers
/// under `condition.<type>`.
pub(crate) struct CheckCounters {
    count: Arc<dyn StatCounter>,
    hit: Arc<dyn StatCounter>,
    miss: Arc<dyn StatCounter>,
}

impl CheckCounters {
    pub(crate) fn register(stats: &dyn Metrics, kind: &str) -> Self {
        Self {
            count: stats.counter(&format!("condition.{}.count", kind)),
            hit: stats.counter(&format!("condition.{}.true", kind)),
            miss: stats.counter(&format!("condition.{}.false", kind)),
        }
    }

    /// Record a result and pass it through.
    pub(crate) fn record(&self, result: bool) -> bool {
        self.count.incr(1);
        if result {
            self.hit.incr(1);
        } else {
            self.miss.incr(1);
        }
        result
    }
}

// =============================================================================
// TESTS
// =============================================================================
