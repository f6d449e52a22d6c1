//! Flush policies applied after every successful write
//!
//! A logger evaluates its policy once per outputter after handing it a line.
//! Policies are lazy: nothing is flushed on a timer, only when a message is
//! emitted.

use super::error::Result;
use super::outputter::Outputter;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

/// Default threshold of [`FlushPolicy::TimeThreshold`].
pub const DEFAULT_FLUSH_THRESHOLD: Duration = Duration::from_secs(1);

/// Whether an every-N policy counts writes globally or per outputter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CounterScope {
    /// One counter for all outputters the policy is applied to
    #[default]
    Shared,
    /// One counter per outputter
    PerOutputter,
}

/// Counter state of [`FlushPolicy::EveryN`].
///
/// Cloning shares the counters; use [`FlushPolicy::fork`] for an independent copy.
#[derive(Clone, Default)]
pub struct EveryNState {
    shared: Arc<AtomicU64>,
    // A live weak handle pins the allocation, so its address cannot be
    // handed to a new outputter until the entry is pruned
    per_outputter: Arc<Mutex<Vec<(Weak<dyn Outputter>, u64)>>>,
}

impl EveryNState {
    fn tick(&self, scope: CounterScope, outputter: &Arc<dyn Outputter>) -> u64 {
        match scope {
            CounterScope::Shared => self.shared.fetch_add(1, Ordering::Relaxed) + 1,
            CounterScope::PerOutputter => {
                let mut counters = self.per_outputter.lock();
                counters.retain(|(weak, _)| weak.strong_count() > 0);

                let target = Arc::downgrade(outputter);
                let idx = match counters.iter().position(|(weak, _)| weak.ptr_eq(&target)) {
                    Some(idx) => idx,
                    None => {
                        counters.push((target, 0));
                        counters.len() - 1
                    }
                };
                counters[idx].1 += 1;
                counters[idx].1
            }
        }
    }

    #[cfg(test)]
    fn tracked_outputters(&self) -> usize {
        self.per_outputter.lock().len()
    }
}

/// Callback type for custom flush policies
/// The callback returns whether it flushed.
pub type FlushFn = Arc<dyn Fn(&dyn Outputter) -> Result<bool> + Send + Sync>;

/// Policy deciding, after each write, whether to force buffered lines out.
///
/// # Example
///
/// ```
/// use segment_logger::FlushPolicy;
/// use std::time::Duration;
///
/// // Default: flush after every line
/// let policy = FlushPolicy::default();
///
/// // Flush at most once per 250ms of activity
/// let policy = FlushPolicy::TimeThreshold(Duration::from_millis(250));
///
/// // Flush every 100 writes
/// let policy = FlushPolicy::every_n(100);
/// ```
#[derive(Clone)]
pub enum FlushPolicy {
    /// Leave flushing to buffer overflow, explicit `flush()` and drop
    Never,
    /// Flush after every write
    Always,
    /// Flush when the outputter's last flush is older than the threshold
    TimeThreshold(Duration),
    /// Flush on every `n`-th write
    EveryN {
        n: u64,
        scope: CounterScope,
        state: EveryNState,
    },
    /// Arbitrary callback
    Custom(FlushFn),
}

impl Default for FlushPolicy {
    fn default() -> Self {
        FlushPolicy::Always
    }
}

impl FlushPolicy {
    /// Flush every `n`-th write, counting across all outputters.
    #[must_use]
    pub fn every_n(n: u64) -> Self {
        Self::every_n_scoped(n, CounterScope::Shared)
    }

    #[must_use]
    pub fn every_n_scoped(n: u64, scope: CounterScope) -> Self {
        FlushPolicy::EveryN {
            n: n.max(1),
            scope,
            state: EveryNState::default(),
        }
    }

    #[must_use]
    pub fn time_threshold() -> Self {
        FlushPolicy::TimeThreshold(DEFAULT_FLUSH_THRESHOLD)
    }

    #[must_use]
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&dyn Outputter) -> Result<bool> + Send + Sync + 'static,
    {
        FlushPolicy::Custom(Arc::new(f))
    }

    /// Copy of this policy with its own, zeroed counters.
    #[must_use]
    pub fn fork(&self) -> Self {
        match self {
            FlushPolicy::EveryN { n, scope, .. } => Self::every_n_scoped(*n, *scope),
            other => other.clone(),
        }
    }

    /// Evaluate the policy for one write to `outputter`.
    ///
    /// Returns whether a flush was forced.
    pub fn apply(&self, outputter: &Arc<dyn Outputter>) -> Result<bool> {
        let due = match self {
            FlushPolicy::Never => false,
            FlushPolicy::Always => true,
            FlushPolicy::TimeThreshold(threshold) => outputter.last_flush().elapsed() >= *threshold,
            FlushPolicy::EveryN { n, scope, state } => state.tick(*scope, outputter) % *n == 0,
            FlushPolicy::Custom(f) => return f(outputter.as_ref()),
        };

        if due {
            outputter.flush()?;
        }
        Ok(due)
    }
}

impl fmt::Debug for FlushPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlushPolicy::Never => write!(f, "Never"),
            FlushPolicy::Always => write!(f, "Always"),
            FlushPolicy::TimeThreshold(d) => write!(f, "TimeThreshold({:?})", d),
            FlushPolicy::EveryN { n, scope, .. } => write!(f, "EveryN({}, {:?})", n, scope),
            FlushPolicy::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

impl fmt::Display for FlushPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outputters::MemoryOutputter;

    fn memory() -> (Arc<MemoryOutputter>, Arc<dyn Outputter>) {
        let concrete = Arc::new(MemoryOutputter::new());
        let dynamic: Arc<dyn Outputter> = concrete.clone();
        (concrete, dynamic)
    }

    #[test]
    fn test_default_is_always() {
        assert!(matches!(FlushPolicy::default(), FlushPolicy::Always));
    }

    #[test]
    fn test_never_and_always() {
        let (mem, out) = memory();
        assert!(!FlushPolicy::Never.apply(&out).unwrap());
        assert_eq!(mem.flush_count(), 0);
        assert!(FlushPolicy::Always.apply(&out).unwrap());
        FlushPolicy::Always.apply(&out).unwrap();
        assert_eq!(mem.flush_count(), 2);
    }

    #[test]
    fn test_time_threshold() {
        let (mem, out) = memory();
        let policy = FlushPolicy::TimeThreshold(Duration::from_secs(3600));
        policy.apply(&out).unwrap();
        assert_eq!(mem.flush_count(), 0);

        let policy = FlushPolicy::TimeThreshold(Duration::ZERO);
        policy.apply(&out).unwrap();
        assert_eq!(mem.flush_count(), 1);
    }

    #[test]
    fn test_every_n_shared() {
        let (mem_a, a) = memory();
        let (mem_b, b) = memory();
        let policy = FlushPolicy::every_n(3);

        policy.apply(&a).unwrap();
        policy.apply(&b).unwrap();
        policy.apply(&a).unwrap(); // 3rd call overall

        assert_eq!(mem_a.flush_count(), 1);
        assert_eq!(mem_b.flush_count(), 0);
    }

    #[test]
    fn test_every_n_per_outputter() {
        let (mem_a, a) = memory();
        let (mem_b, b) = memory();
        let policy = FlushPolicy::every_n_scoped(2, CounterScope::PerOutputter);

        policy.apply(&a).unwrap();
        policy.apply(&b).unwrap();
        policy.apply(&b).unwrap();

        assert_eq!(mem_a.flush_count(), 0);
        assert_eq!(mem_b.flush_count(), 1);
    }

    #[test]
    fn test_every_n_per_outputter_forgets_dropped_outputters() {
        let policy = FlushPolicy::every_n_scoped(2, CounterScope::PerOutputter);
        let FlushPolicy::EveryN { state, .. } = &policy else {
            panic!("expected EveryN");
        };

        for _ in 0..50 {
            let (_, first) = memory();
            policy.apply(&first).unwrap();
            drop(first);

            // A fresh outputter starts counting at zero, whatever its address
            let (mem, second) = memory();
            assert!(!policy.apply(&second).unwrap());
            assert_eq!(mem.flush_count(), 0);
            assert!(policy.apply(&second).unwrap());
            assert_eq!(mem.flush_count(), 1);
        }
        assert!(state.tracked_outputters() <= 1);
    }

    #[test]
    fn test_fork_resets_counter_clone_shares_it() {
        let (mem, out) = memory();
        let policy = FlushPolicy::every_n(2);
        policy.apply(&out).unwrap();

        let shared = policy.clone();
        shared.apply(&out).unwrap();
        assert_eq!(mem.flush_count(), 1);

        let forked = policy.fork();
        forked.apply(&out).unwrap();
        assert_eq!(mem.flush_count(), 1);
        forked.apply(&out).unwrap();
        assert_eq!(mem.flush_count(), 2);
    }

    #[test]
    fn test_every_n_zero_is_clamped() {
        assert!(matches!(FlushPolicy::every_n(0), FlushPolicy::EveryN { n: 1, .. }));
    }

    #[test]
    fn test_custom_policy() {
        let (mem, out) = memory();
        let policy = FlushPolicy::custom(|o| o.flush().map(|_| true));
        assert!(policy.apply(&out).unwrap());
        assert_eq!(mem.flush_count(), 1);
    }

    #[test]
    fn test_display() {
        assert_eq!(FlushPolicy::Never.to_string(), "Never");
        assert_eq!(
            FlushPolicy::TimeThreshold(Duration::from_millis(100)).to_string(),
            "TimeThreshold(100ms)"
        );
        assert_eq!(FlushPolicy::every_n(5).to_string(), "EveryN(5, Shared)");
    }
}
