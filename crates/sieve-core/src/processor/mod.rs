//! # Processors
//!
//! Pipeline stages that turn one inbound batch into zero or more outbound
//! batches, or into a response sent back to the message source.
//!
//! Like conditions, processors are built from a typed [`Config`] through a
//! registry keyed by the `type` field.

mod filter_parts;

pub use filter_parts::{FilterParts, FilterPartsConfig};

use crate::SieveError;
use crate::manager::Manager;
use crate::message::Message;
use crate::metrics::Metrics;
use crate::primitives::FILTER_PARTS_TYPE;
use crate::types::Response;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};
use tracing::Span;

// =============================================================================
// PROCESSOR TRAIT
// =============================================================================

/// A synchronous pipeline stage.
///
/// Implementations are shared between worker threads, so
/// `process_message` takes `&self` and must be safe to call concurrently.
pub trait Processor: Send + Sync {
    /// Apply the stage to one batch.
    ///
    /// Returns either at least one output batch and no response, or no
    /// batches and a response for the message source.
    fn process_message(&self, msg: &Message) -> (Vec<Message>, Option<Response>);
}

// =============================================================================
// CONFIG
// =============================================================================

/// Processor configuration: a type discriminator plus one section per type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Registry key of the processor to build.
    #[serde(rename = "type")]
    pub kind: String,
    /// Section for `filter_parts`.
    pub filter_parts: FilterPartsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            kind: FILTER_PARTS_TYPE.to_string(),
            filter_parts: FilterPartsConfig::default(),
        }
    }
}

// =============================================================================
// REGISTRY
// =============================================================================

/// Signature shared by every processor constructor.
pub type Constructor = fn(
    conf: &Config,
    mgr: &dyn Manager,
    log: &Span,
    stats: Arc<dyn Metrics>,
) -> Result<Arc<dyn Processor>, SieveError>;

/// Strips a processor config down to what documents it.
pub type Sanitizer = fn(conf: &Config) -> Result<serde_json::Value, SieveError>;

/// A registered processor type.
#[derive(Clone, Copy)]
pub struct TypeSpec {
    /// Builds the processor from its config.
    pub constructor: Constructor,
    /// Produces the documented form of the type's section.
    pub sanitize: Sanitizer,
    /// Long-form description used by `sieve list`.
    pub description: &'static str,
}

/// All registered processor types, keyed by their `type` name.
pub fn constructors() -> &'static BTreeMap<&'static str, TypeSpec> {
    static REGISTRY: OnceLock<BTreeMap<&'static str, TypeSpec>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let mut m: BTreeMap<&'static str, TypeSpec> = BTreeMap::new();
        m.insert(
            FILTER_PARTS_TYPE,
            TypeSpec {
                constructor: filter_parts::new,
                sanitize: filter_parts::sanitize,
                description: "Tests each individual part of a message batch against a \
                              condition; parts that fail are dropped. If the resulting \
                              batch is empty it is dropped and the source acknowledged. \
                              Each condition sees a part as if it were a single-part \
                              message. Useful for removing specific parts from batches.",
            },
        );
        m
    })
}

/// Build a processor from config.
pub fn new(
    conf: &Config,
    mgr: &dyn Manager,
    log: &Span,
    stats: Arc<dyn Metrics>,
) -> Result<Arc<dyn Processor>, SieveError> {
    let spec = constructors()
        .get(conf.kind.as_str())
        .ok_or_else(|| SieveError::UnknownProcessorType(conf.kind.clone()))?;
    (spec.constructor)(conf, mgr, log, stats)
}

/// Reduce a config to `{"type": <kind>, <kind>: <sanitized section>}`.
pub fn sanitize(conf: &Config) -> Result<serde_json::Value, SieveError> {
    let spec = constructors()
        .get(conf.kind.as_str())
        .ok_or_else(|| SieveError::UnknownProcessorType(conf.kind.clone()))?;

    let mut out = serde_json::Map::new();
    out.insert("type".to_string(), serde_json::Value::String(conf.kind.clone()));
    out.insert(conf.kind.clone(), (spec.sanitize)(conf)?);
    Ok(serde_json::Value::Object(out))
}

// =============================================================================
// TESTS
// =============================================================================
