//! # Filter Parts
//!
//! Tests each part of a batch against a condition and drops the parts that
//! fail. If nothing survives, the batch is dropped and the source is
//! acknowledged so it is not re-delivered.
//!
//! Useful after batching messages together, to remove specific parts
//! without discarding the whole batch. Each part is presented to the
//! condition as if it were a single-part message.

use super::{Config, Processor};
use crate::SieveError;
use crate::condition::{self, Condition};
use crate::manager::Manager;
use crate::message::{Locked, Message};
use crate::metrics::{Metrics, Namespaced, StatCounter};
use crate::primitives::{
    COUNTER_COUNT, COUNTER_DROPPED, COUNTER_PART_DROPPED, COUNTER_PARTS_SENT, COUNTER_SENT,
    FILTER_PARTS_NAMESPACE,
};
use crate::types::Response;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::Span;

// =============================================================================
// CONFIG
// =============================================================================

/// Configuration for [`FilterParts`]: the condition config, flattened.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterPartsConfig {
    /// The condition every part is tested against.
    #[serde(flatten)]
    pub condition: condition::Config,
}

impl FilterPartsConfig {
    /// Wrap a condition config.
    #[must_use]
    pub fn new(condition: condition::Config) -> Self {
        Self { condition }
    }
}

// =============================================================================
// PROCESSOR
// =============================================================================

/// Removes parts of a batch that fail a condition.
pub struct FilterParts {
    log: Span,
    condition: Arc<dyn Condition>,

    m_count: Arc<dyn StatCounter>,
    m_part_dropped: Arc<dyn StatCounter>,
    m_dropped: Arc<dyn StatCounter>,
    m_sent: Arc<dyn StatCounter>,
    m_sent_parts: Arc<dyn StatCounter>,
}

impl FilterParts {
    /// Build the stage and its condition.
    ///
    /// The condition's log and metrics are scoped under
    /// `processor.filter_parts`; the stage's own counters are registered on
    /// `stats` directly with their full paths.
    pub fn new(
        conf: &FilterPartsConfig,
        mgr: &dyn Manager,
        log: &Span,
        stats: Arc<dyn Metrics>,
    ) -> Result<Self, SieveError> {
        let ns_log = tracing::info_span!(parent: log, "processor.filter_parts");
        let ns_stats = Arc::new(Namespaced::new(Arc::clone(&stats), FILTER_PARTS_NAMESPACE));

        let cond = condition::new(&conf.condition, mgr, &ns_log, ns_stats).map_err(|e| {
            SieveError::ConditionConstruction {
                kind: conf.condition.kind.clone(),
                source: Box::new(e),
            }
        })?;

        tracing::debug!(parent: &ns_log, condition = %conf.condition.kind, "filter_parts ready");

        Ok(Self {
            log: ns_log,
            condition: cond,

            m_count: stats.counter(COUNTER_COUNT),
            m_part_dropped: stats.counter(COUNTER_PART_DROPPED),
            m_dropped: stats.counter(COUNTER_DROPPED),
            m_sent: stats.counter(COUNTER_SENT),
            m_sent_parts: stats.counter(COUNTER_PARTS_SENT),
        })
    }
}

impl Processor for FilterParts {
    fn process_message(&self, msg: &Message) -> (Vec<Message>, Option<Response>) {
        self.m_count.incr(1);

        let mut new_msg = Message::new();
        for part in msg {
            if self.condition.check(Locked::new(part)) {
                new_msg.append(part.clone());
            } else {
                self.m_part_dropped.incr(1);
            }
        }

        if !new_msg.is_empty() {
            self.m_sent.incr(1);
            self.m_sent_parts.incr(new_msg.len() as i64);
            return (vec![new_msg], None);
        }

        tracing::trace!(parent: &self.log, parts = msg.len(), "all parts dropped");
        self.m_dropped.incr(1);
        (Vec::new(), Some(Response::Ack))
    }
}

/// Registry constructor.
pub(super) fn new(
    conf: &Config,
    mgr: &dyn Manager,
    log: &Span,
    stats: Arc<dyn Metrics>,
) -> Result<Arc<dyn Processor>, SieveError> {
    Ok(Arc::new(FilterParts::new(&conf.filter_parts, mgr, log, stats)?))
}

/// Registry sanitizer: only the embedded condition is documented.
pub(super) fn sanitize(conf: &Config) -> Result<serde_json::Value, SieveError> {
    condition::sanitize(&conf.filter_parts.condition)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::Resources;
    use crate::message::Part;
    use crate::metrics::Local;

    fn status_is_ok() -> FilterPartsConfig {
        let mut cond = condition::Config::of_kind("metadata");
        cond.metadata.key = "status".to_string();
        cond.metadata.arg = "ok".to_string();
        FilterPartsConfig::new(cond)
    }

    fn stage(conf: &FilterPartsConfig) -> (FilterParts, Arc<Local>) {
        let stats = Arc::new(Local::new());
        let proc = FilterParts::new(conf, &Resources::new(), &Span::none(), stats.clone())
            .expect("construct");
        (proc, stats)
    }

    #[test]
    fn keeps_matching_parts_in_order() {
        let (proc, stats) = stage(&status_is_ok());
        let msg = Message::from_parts(vec![
            Part::new("keep").with_metadata("status", "ok"),
            Part::new("drop").with_metadata("status", "bad"),
            Part::new("keep2").with_metadata("status", "ok"),
        ]);

        let (out, resp) = proc.process_message(&msg);

        assert!(resp.is_none());
        assert_eq!(out.len(), 1);
        let contents: Vec<_> = out[0].iter().map(|p| p.as_str().into_owned()).collect();
        assert_eq!(contents, vec!["keep", "keep2"]);

        assert_eq!(stats.value(COUNTER_COUNT), Some(1));
        assert_eq!(stats.value(COUNTER_PART_DROPPED), Some(1));
        assert_eq!(stats.value(COUNTER_DROPPED), Some(0));
        assert_eq!(stats.value(COUNTER_SENT), Some(1));
        assert_eq!(stats.value(COUNTER_PARTS_SENT), Some(2));
    }

    #[test]
    fn empty_batch_is_acknowledged() {
        let (proc, stats) = stage(&status_is_ok());

        let (out, resp) = proc.process_message(&Message::new());

        assert!(out.is_empty());
        assert_eq!(resp, Some(Response::Ack));
        assert_eq!(stats.value(COUNTER_COUNT), Some(1));
        assert_eq!(stats.value(COUNTER_DROPPED), Some(1));
        assert_eq!(stats.value(COUNTER_PART_DROPPED), Some(0));
        assert_eq!(stats.value(COUNTER_SENT), Some(0));
    }

    #[test]
    fn all_failing_parts_are_acknowledged() {
        let (proc, stats) = stage(&status_is_ok());
        let msg = Message::from_parts(vec![Part::new("a"), Part::new("b"), Part::new("c")]);

        let (out, resp) = proc.process_message(&msg);

        assert!(out.is_empty());
        assert_eq!(resp, Some(Response::Ack));
        assert_eq!(stats.value(COUNTER_PART_DROPPED), Some(3));
        assert_eq!(stats.value(COUNTER_DROPPED), Some(1));
        assert_eq!(stats.value(COUNTER_PARTS_SENT), Some(0));
    }

    #[test]
    fn condition_metrics_are_namespaced() {
        let (proc, stats) = stage(&status_is_ok());
        let msg = Message::from_parts(vec![Part::new("a").with_metadata("status", "ok")]);
        let _ = proc.process_message(&msg);

        assert_eq!(
            stats.value("processor.filter_parts.condition.metadata.true"),
            Some(1)
        );
    }

    #[test]
    fn unknown_condition_wraps_type_name() {
        let conf = FilterPartsConfig::new(condition::Config::of_kind("bogus"));
        let result = FilterParts::new(
            &conf,
            &Resources::new(),
            &Span::none(),
            Arc::new(Local::new()),
        );
        let err = result.err().expect("construction should fail");
        assert!(matches!(err, SieveError::ConditionConstruction { ref kind, .. } if kind == "bogus"));
        assert!(err.to_string().contains("'bogus'"));
    }

    #[test]
    fn config_flattens_condition_fields() {
        let conf: FilterPartsConfig = serde_json::from_str(
            r#"{"type": "text", "text": {"operator": "contains", "arg": "x"}}"#,
        )
        .expect("parse");
        assert_eq!(conf.condition.kind, "text");
        assert_eq!(conf.condition.text.operator, "contains");
    }
}
