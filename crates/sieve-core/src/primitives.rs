//! # Primitives
//!
//! Fixed names and limits compiled into the stage.
//!
//! Counter paths are part of the observable contract: dashboards and alerts
//! key on them, so they never change at runtime.

/// Registry name of the part-filtering processor.
pub const FILTER_PARTS_TYPE: &str = "filter_parts";

/// Namespace under which the filter stage scopes its condition's log and
/// metrics.
pub const FILTER_PARTS_NAMESPACE: &str = "processor.filter_parts";

// =============================================================================
// FILTER_PARTS COUNTERS
// =============================================================================

/// Incremented once per `process_message` call.
pub const COUNTER_COUNT: &str = "processor.filter_parts.count";

/// Incremented once per part the condition rejected.
pub const COUNTER_PART_DROPPED: &str = "processor.filter_parts.part.dropped";

/// Incremented once per batch that ended up empty.
pub const COUNTER_DROPPED: &str = "processor.filter_parts.dropped";

/// Incremented once per non-empty output batch.
pub const COUNTER_SENT: &str = "processor.filter_parts.sent";

/// Incremented by the length of each non-empty output batch.
pub const COUNTER_PARTS_SENT: &str = "processor.filter_parts.parts.sent";

// =============================================================================
// CONDITION LIMITS
// =============================================================================

/// Maximum nesting depth of `and`/`or`/`not` conditions.
///
/// Deeper configs are rejected at construction time.
pub const MAX_CONDITION_DEPTH: usize = 32;

/// Maximum number of children in a single `and`/`or` condition.
pub const MAX_CONDITION_CHILDREN: usize = 256;
