//! Boolean combinators over child conditions.

use super::{Condition, Config};
use crate::SieveError;
use crate::manager::Manager;
use crate::message::Locked;
use crate::metrics::{Metrics, Namespaced};
use crate::primitives::MAX_CONDITION_CHILDREN;
use std::sync::Arc;
use tracing::Span;

/// True if every child is true. Stops at the first false child.
pub struct And {
    children: Vec<Arc<dyn Condition>>,
}

impl Condition for And {
    fn check(&self, msg: Locked<'_>) -> bool {
        self.children.iter().all(|c| c.check(msg))
    }
}

/// True if any child is true. Stops at the first true child.
pub struct Or {
    children: Vec<Arc<dyn Condition>>,
}

impl Condition for Or {
    fn check(&self, msg: Locked<'_>) -> bool {
        self.children.iter().any(|c| c.check(msg))
    }
}

/// Inverts its child.
pub struct Not {
    child: Arc<dyn Condition>,
}

impl Condition for Not {
    fn check(&self, msg: Locked<'_>) -> bool {
        !self.child.check(msg)
    }
}

/// Build each child with metrics namespaced under `<kind>.<index>`.
fn children(
    kind: &str,
    confs: &[Config],
    mgr: &dyn Manager,
    log: &Span,
    stats: &Arc<dyn Metrics>,
) -> Result<Vec<Arc<dyn Condition>>, SieveError> {
    if confs.is_empty() {
        return Err(SieveError::InvalidConfig(format!(
            "{} condition requires at least one child",
            kind
        )));
    }
    if confs.len() > MAX_CONDITION_CHILDREN {
        return Err(SieveError::InvalidConfig(format!(
            "{} condition has {} children, maximum is {}",
            kind,
            confs.len(),
            MAX_CONDITION_CHILDREN
        )));
    }

    let log = tracing::debug_span!(parent: log, "condition", kind);
    confs
        .iter()
        .enumerate()
        .map(|(i, child)| {
            let ns: Arc<dyn Metrics> =
                Arc::new(Namespaced::new(Arc::clone(stats), format!("{}.{}", kind, i)));
            super::new(child, mgr, &log, ns)
        })
        .collect()
}

pub(super) fn new_and(
    conf: &Config,
    mgr: &dyn Manager,
    log: &Span,
    stats: Arc<dyn Metrics>,
) -> Result<Arc<dyn Condition>, SieveError> {
    let children = children("and", &conf.and, mgr, log, &stats)?;
    Ok(Arc::new(And { children }))
}

pub(super) fn new_or(
    conf: &Config,
    mgr: &dyn Manager,
    log: &Span,
    stats: Arc<dyn Metrics>,
) -> Result<Arc<dyn Condition>, SieveError> {
    let children = children("or", &conf.or, mgr, log, &stats)?;
    Ok(Arc::new(Or { children }))
}

pub(super) fn new_not(
    conf: &Config,
    mgr: &dyn Manager,
    log: &Span,
    stats: Arc<dyn Metrics>,
) -> Result<Arc<dyn Condition>, SieveError> {
    let child_conf = conf.not.as_deref().ok_or_else(|| {
        SieveError::InvalidConfig("not condition requires a child".to_string())
    })?;
    let log = tracing::debug_span!(parent: log, "condition", kind = "not");
    let child = super::new(
        child_conf,
        mgr,
        &log,
        Arc::new(Namespaced::new(stats, "not")),
    )?;
    Ok(Arc::new(Not { child }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::Resources;
    use crate::message::Part;
    use crate::metrics::Local;

    fn constant(value: bool) -> Config {
        Config {
            static_value: value,
            ..Config::of_kind("static")
        }
    }

    fn build(conf: &Config, stats: Arc<Local>) -> Arc<dyn Condition> {
        super::super::new(conf, &Resources::new(), &Span::none(), stats).expect("build")
    }

    fn eval(cond: &Arc<dyn Condition>) -> bool {
        let part = Part::new("x");
        cond.check(Locked::new(&part))
    }

    #[test]
    fn and_requires_all() {
        let stats = Arc::new(Local::new());
        let conf = Config {
            and: vec![constant(true), constant(false), constant(true)],
            ..Config::of_kind("and")
        };
        assert!(!eval(&build(&conf, stats.clone())));
        // Short-circuits after the false child.
        assert_eq!(stats.value("and.2.condition.static.count"), Some(0));
        assert_eq!(stats.value("and.1.condition.static.false"), Some(1));
    }

    #[test]
    fn or_requires_any() {
        let conf = Config {
            or: vec![constant(false), constant(true)],
            ..Config::of_kind("or")
        };
        assert!(eval(&build(&conf, Arc::new(Local::new()))));

        let none = Config {
            or: vec![constant(false), constant(false)],
            ..Config::of_kind("or")
        };
        assert!(!eval(&build(&none, Arc::new(Local::new()))));
    }

    #[test]
    fn not_inverts() {
        let conf = Config {
            not: Some(Box::new(constant(false))),
            ..Config::of_kind("not")
        };
        let stats = Arc::new(Local::new());
        assert!(eval(&build(&conf, stats.clone())));
        assert_eq!(stats.value("not.condition.static.false"), Some(1));
    }

    #[test]
    fn empty_combinators_are_rejected() {
        for kind in ["and", "or", "not"] {
            let result = super::super::new(
                &Config::of_kind(kind),
                &Resources::new(),
                &Span::none(),
                Arc::new(Local::new()),
            );
            assert!(matches!(result, Err(SieveError::InvalidConfig(_))), "{}", kind);
        }
    }

    #[test]
    fn child_errors_propagate() {
        let conf = Config {
            and: vec![constant(true), Config::of_kind("unknown")],
            ..Config::of_kind("and")
        };
        let result = super::super::new(
            &conf,
            &Resources::new(),
            &Span::none(),
            Arc::new(Local::new()),
        );
        assert!(matches!(result, Err(SieveError::UnknownConditionType(_))));
    }
}
