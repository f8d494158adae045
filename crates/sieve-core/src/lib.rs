//! # sieve-core
//!
//! Condition-driven part filtering for batched pipeline messages.
//!
//! The central piece is [`FilterParts`], a pipeline stage that evaluates a
//! [`Condition`] against every part of a batch, keeps the parts that pass
//! and acknowledges the source when none do.
//!
//! ## Architectural Constraints
//!
//! - Synchronous: stages never block, suspend or perform I/O
//! - Shareable: stages and conditions are `Send + Sync` and take `&self`
//! - Injected sinks: logging spans, metrics registries and the resource
//!   manager are passed in at construction, never global
//! - Stable: filtering preserves the relative order of surviving parts

// =============================================================================
// MODULES
// =============================================================================

pub mod condition;
pub mod manager;
pub mod message;
pub mod metrics;
pub mod primitives;
pub mod processor;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types
// =============================================================================

pub use types::{Response, SieveError};

// =============================================================================
// RE-EXPORTS: Message Model
// =============================================================================

pub use message::{Locked, Message, Part, lock};

// =============================================================================
// RE-EXPORTS: Stage + Collaborators
// =============================================================================

pub use condition::Condition;
pub use manager::{Manager, Resources, ResourcesConfig};
pub use metrics::{Local, Metrics, Namespaced, Noop, StatCounter};
pub use processor::{FilterParts, FilterPartsConfig, Processor};
