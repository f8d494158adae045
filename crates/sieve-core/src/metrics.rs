//! # Metrics
//!
//! Named, monotonically incrementing counters injected into stages.
//!
//! - `Metrics`: a registry that hands out counter handles by path
//! - `Local`: in-memory registry, used by the CLI and by tests
//! - `Namespaced`: prefixes every path before delegating
//! - `Noop`: discards everything
//!
//! Counter handles are resolved once at construction time and then
//! incremented lock-free from any thread.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

// =============================================================================
// TRAITS
// =============================================================================

/// A thread-safe counter handle.
pub trait StatCounter: Send + Sync {
    /// Add `n` to the counter.
    fn incr(&self, n: i64);
}

/// A registry of named counters.
pub trait Metrics: Send + Sync {
    /// Get (or create) the counter registered at `path`.
    fn counter(&self, path: &str) -> Arc<dyn StatCounter>;
}

// =============================================================================
// LOCAL (IN-MEMORY) REGISTRY
// =============================================================================

/// A single in-memory counter.
#[derive(Debug, Default)]
pub struct LocalCounter {
    value: AtomicI64,
}

impl LocalCounter {
    /// Current value.
    #[must_use]
    pub fn value(&self) -> i64 {
        self.value.load(Ordering::Relaxed)
    }
}

impl StatCounter for LocalCounter {
    fn incr(&self, n: i64) {
        self.value.fetch_add(n, Ordering::Relaxed);
    }
}

/// In-memory metrics registry.
///
/// Requesting the same path twice returns the same underlying counter.
/// Paths are kept in a BTreeMap so snapshots are ordered.
#[derive(Debug, Default)]
pub struct Local {
    counters: Mutex<BTreeMap<String, Arc<LocalCounter>>>,
}

impl Local {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a counter without creating it.
    #[must_use]
    pub fn value(&self, path: &str) -> Option<i64> {
        self.counters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .map(|c| c.value())
    }

    /// Point-in-time copy of every counter.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, i64> {
        self.counters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(path, c)| (path.clone(), c.value()))
            .collect()
    }
}

impl Metrics for Local {
    fn counter(&self, path: &str) -> Arc<dyn StatCounter> {
        let mut counters = self
            .counters
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let counter = counters
            .entry(path.to_string())
            .or_insert_with(|| Arc::new(LocalCounter::default()));
        Arc::clone(counter) as Arc<dyn StatCounter>
    }
}

// =============================================================================
// NAMESPACED
// =============================================================================

/// Prefixes every counter path with `<namespace>.`.
pub struct Namespaced {
    namespace: String,
    inner: Arc<dyn Metrics>,
}

impl Namespaced {
    /// Wrap a registry under a namespace.
    #[must_use]
    pub fn new(inner: Arc<dyn Metrics>, namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            inner,
        }
    }
}

impl Metrics for Namespaced {
    fn counter(&self, path: &str) -> Arc<dyn StatCounter> {
        self.inner.counter(&format!("{}.{}", self.namespace, path))
    }
}

// =============================================================================
// NOOP
// =============================================================================

/// Registry whose counters discard every increment.
#[derive(Debug, Default, Clone, Copy)]
pub struct Noop;

struct NoopCounter;

impl StatCounter for NoopCounter {
    fn incr(&self, _n: i64) {}
}

impl Metrics for Noop {
    fn counter(&self, _path: &str) -> Arc<dyn StatCounter> {
        Arc::new(NoopCounter)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_counter_accumulates() {
        let local = Local::new();
        let c = local.counter("a.b");
        c.incr(1);
        c.incr(4);
        assert_eq!(local.value("a.b"), Some(5));
        assert_eq!(local.value("missing"), None);
    }

    #[test]
    fn same_path_shares_counter() {
        let local = Local::new();
        local.counter("x").incr(2);
        local.counter("x").incr(3);
        assert_eq!(local.value("x"), Some(5));
    }

    #[test]
    fn namespaced_prefixes_paths() {
        let local = Arc::new(Local::new());
        let ns = Namespaced::new(local.clone(), "processor.filter_parts");
        ns.counter("condition.text.true").incr(1);
        assert_eq!(
            local.value("processor.filter_parts.condition.text.true"),
            Some(1)
        );
    }

    #[test]
    fn snapshot_is_ordered() {
        let local = Local::new();
        local.counter("b").incr(1);
        local.counter("a").incr(2);
        let keys: Vec<_> = local.snapshot().into_keys().collect();
        assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn counters_are_thread_safe() {
        let local = Arc::new(Local::new());
        let counter = local.counter("hits");
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let c = Arc::clone(&counter);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        c.incr(1);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().expect("join");
        }
        assert_eq!(local.value("hits"), Some(4000));
    }
}
