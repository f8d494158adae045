//! Reference to a condition held by the manager.

use super::{Condition, Config};
use crate::SieveError;
use crate::manager::Manager;
use crate::message::Locked;
use crate::metrics::Metrics;
use std::sync::Arc;
use tracing::Span;

/// Delegates to a shared, named condition.
///
/// The target is resolved once at construction; a missing name fails
/// construction rather than every check.
pub struct Resource {
    target: Arc<dyn Condition>,
}

impl Condition for Resource {
    fn check(&self, msg: Locked<'_>) -> bool {
        self.target.check(msg)
    }
}

pub(super) fn new(
    conf: &Config,
    mgr: &dyn Manager,
    _log: &Span,
    _stats: Arc<dyn Metrics>,
) -> Result<Arc<dyn Condition>, SieveError> {
    if conf.resource.is_empty() {
        return Err(SieveError::InvalidConfig(
            "resource condition requires a name".to_string(),
        ));
    }
    let target = mgr.get_condition(&conf.resource)?;
    Ok(Arc::new(Resource { target }))
}
