//! Constant condition.

use super::{CheckCounters, Condition, Config};
use crate::SieveError;
use crate::manager::Manager;
use crate::message::Locked;
use crate::metrics::Metrics;
use std::sync::Arc;
use tracing::Span;

/// Always resolves to a fixed value.
pub struct Static {
    value: bool,
    counters: CheckCounters,
}

impl Condition for Static {
    fn check(&self, _msg: Locked<'_>) -> bool {
        self.counters.record(self.value)
    }
}

pub(super) fn new(
    conf: &Config,
    _mgr: &dyn Manager,
    _log: &Span,
    stats: Arc<dyn Metrics>,
) -> Result<Arc<dyn Condition>, SieveError> {
    Ok(Arc::new(Static {
        value: conf.static_value,
        counters: CheckCounters::register(stats.as_ref(), "static"),
    }))
}
