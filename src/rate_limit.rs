//! Fixed-window admission gate keyed by client identity.
//!
//! Every key gets its own counter that resets once the key's window has
//! elapsed. Windows are fixed, not sliding: a burst straddling a boundary
//! can be admitted up to `2 * limit` times across it.
//!
//! The whole check (lookup, eviction, expiry, compare, increment) runs under
//! one mutex, so concurrent callers for the same key can never overrun the
//! limit and two first-time keys can never both evict for the same slot.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::error::GateError;

/// Source of "now" for the gate. Tests swap in a manual clock.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> Instant;
}

/// Monotonic wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Immutable gate parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateConfig {
    pub interval: Duration,
    pub max_tracked_keys: usize,
    /// Limit used by `check_default`.
    pub max_per_interval: u32,
}

impl GateConfig {
    pub fn new(
        interval: Duration,
        max_tracked_keys: usize,
        max_per_interval: u32,
    ) -> Result<Self, GateError> {
        if interval.is_zero() {
            return Err(GateError::Configuration(
                "interval must be greater than zero".to_string(),
            ));
        }
        if max_tracked_keys == 0 {
            return Err(GateError::Configuration(
                "max_tracked_keys must be greater than zero".to_string(),
            ));
        }
        if max_per_interval == 0 {
            return Err(GateError::Configuration(
                "max_per_interval must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            interval,
            max_tracked_keys,
            max_per_interval,
        })
    }
}

// Counter row for one client key
struct WindowCounter {
    count: u32,
    window_start: Instant,
    last_access: u64,
}

#[derive(Default)]
struct CounterTable {
    counters: HashMap<String, WindowCounter>,
    // last_access stamp -> key, oldest first
    recency: BTreeMap<u64, String>,
    tick: u64,
}

impl CounterTable {
    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    fn evict_oldest(&mut self) -> Option<String> {
        let (_, key) = self.recency.pop_first()?;
        self.counters.remove(&key);
        Some(key)
    }

    fn remove(&mut self, key: &str) {
        if let Some(counter) = self.counters.remove(key) {
            self.recency.remove(&counter.last_access);
        }
    }
}

/// In-memory fixed-window rate limiter shared by all request handlers.
///
/// Cloning is cheap and every clone sees the same counter table.
#[derive(Clone)]
pub struct AdmissionGate<C: Clock = SystemClock> {
    inner: Arc<GateInner<C>>,
}

struct GateInner<C> {
    config: GateConfig,
    clock: C,
    table: Mutex<CounterTable>,
}

impl AdmissionGate<SystemClock> {
    pub fn new(config: GateConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> AdmissionGate<C> {
    pub fn with_clock(config: GateConfig, clock: C) -> Self {
        Self {
            inner: Arc::new(GateInner {
                config,
                clock,
                table: Mutex::new(CounterTable::default()),
            }),
        }
    }

    pub fn config(&self) -> &GateConfig {
        &self.inner.config
    }

    /// Admits one request for `key` if it has fewer than `limit` admissions
    /// in its current window.
    ///
    /// Returns [`GateError::RateLimitExceeded`] when the key is exhausted;
    /// the counter is left untouched in that case.
    pub fn check(&self, limit: u32, key: &str) -> Result<(), GateError> {
        if limit == 0 {
            return Err(GateError::InvalidArgument(
                "limit must be greater than zero".to_string(),
            ));
        }
        if key.is_empty() {
            return Err(GateError::InvalidArgument(
                "client key must not be empty".to_string(),
            ));
        }

        let config = &self.inner.config;
        let now = self.inner.clock.now();
        let mut table = self.inner.table.lock();

        if !table.counters.contains_key(key)
            && table.counters.len() >= config.max_tracked_keys
        {
            if let Some(evicted) = table.evict_oldest() {
                tracing::debug!(
                    evicted_key = %evicted,
                    "evicted least recently used client key"
                );
            }
        }

        let tick = table.next_tick();
        let CounterTable {
            counters, recency, ..
        } = &mut *table;
        let counter = counters.entry(key.to_string()).or_insert_with(|| {
            recency.insert(tick, key.to_string());
            WindowCounter {
                count: 0,
                window_start: now,
                last_access: tick,
            }
        });

        if now.saturating_duration_since(counter.window_start) >= config.interval {
            counter.count = 0;
            counter.window_start = now;
        }

        if counter.count < limit {
            counter.count += 1;
            recency.remove(&counter.last_access);
            counter.last_access = tick;
            recency.insert(tick, key.to_string());
            return Ok(());
        }

        let elapsed = now.saturating_duration_since(counter.window_start);
        Err(GateError::RateLimitExceeded {
            key: key.to_string(),
            limit,
            retry_after: config.interval.saturating_sub(elapsed),
        })
    }

    /// `check` with the configured per-interval default.
    pub fn check_default(&self, key: &str) -> Result<(), GateError> {
        self.check(self.inner.config.max_per_interval, key)
    }

    /// Drops every counter whose window has expired. Returns how many went.
    pub fn purge_expired(&self) -> usize {
        let now = self.inner.clock.now();
        let interval = self.inner.config.interval;
        let mut table = self.inner.table.lock();

        let expired: Vec<String> = table
            .counters
            .iter()
            .filter(|(_, c)| now.saturating_duration_since(c.window_start) >= interval)
            .map(|(k, _)| k.clone())
            .collect();
        for key in &expired {
            table.remove(key);
        }
        expired.len()
    }

    /// Number of tracked client keys.
    pub fn len(&self) -> usize {
        self.inner.table.lock().counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.table.lock().counters.contains_key(key)
    }

    /// Admissions recorded for `key` in its current window, if tracked.
    pub fn count(&self, key: &str) -> Option<u32> {
        self.inner.table.lock().counters.get(key).map(|c| c.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Clock that only moves when told to.
    #[derive(Clone)]
    struct ManualClock {
        base: Instant,
        offset: Arc<Mutex<Duration>>,
    }

    impl ManualClock {
        fn new() -> Self {
            Self {
                base: Instant::now(),
                offset: Arc::new(Mutex::new(Duration::ZERO)),
            }
        }

        fn advance(&self, by: Duration) {
            *self.offset.lock() += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            self.base + *self.offset.lock()
        }
    }

    fn gate(max_keys: usize) -> (AdmissionGate<ManualClock>, ManualClock) {
        let clock = ManualClock::new();
        let config = GateConfig::new(Duration::from_secs(60), max_keys, 5).unwrap();
        (AdmissionGate::with_clock(config, clock.clone()), clock)
    }

    #[test]
    fn rejects_invalid_config() {
        assert!(matches!(
            GateConfig::new(Duration::ZERO, 10, 5),
            Err(GateError::Configuration(_))
        ));
        assert!(matches!(
            GateConfig::new(Duration::from_secs(60), 0, 5),
            Err(GateError::Configuration(_))
        ));
        assert!(matches!(
            GateConfig::new(Duration::from_secs(60), 10, 0),
            Err(GateError::Configuration(_))
        ));
    }

    #[test]
    fn rejects_invalid_arguments() {
        let (gate, _) = gate(10);
        assert!(matches!(gate.check(0, "k"), Err(GateError::InvalidArgument(_))));
        assert!(matches!(gate.check(5, ""), Err(GateError::InvalidArgument(_))));
        assert!(gate.is_empty());
    }

    #[test]
    fn sixth_call_in_window_is_rejected_then_resets() {
        let (gate, clock) = gate(10);

        for _ in 0..5 {
            gate.check(5, "k").unwrap();
            clock.advance(Duration::from_millis(2));
        }

        match gate.check(5, "k") {
            Err(GateError::RateLimitExceeded { key, limit, retry_after }) => {
                assert_eq!(key, "k");
                assert_eq!(limit, 5);
                assert!(retry_after <= Duration::from_secs(60));
                assert!(retry_after > Duration::from_secs(59));
            }
            other => panic!("expected rate limit, got {other:?}"),
        }
        assert_eq!(gate.count("k"), Some(5));

        clock.advance(Duration::from_secs(61));
        gate.check(5, "k").unwrap();
        assert_eq!(gate.count("k"), Some(1));
    }

    #[test]
    fn window_expires_exactly_at_interval() {
        let (gate, clock) = gate(10);
        for _ in 0..5 {
            gate.check(5, "k").unwrap();
        }
        clock.advance(Duration::from_millis(59_999));
        assert!(gate.check(5, "k").is_err());
        clock.advance(Duration::from_millis(1));
        assert!(gate.check(5, "k").is_ok());
    }

    #[test]
    fn keys_do_not_share_counters() {
        let (gate, _) = gate(10);
        for _ in 0..5 {
            gate.check(5, "a").unwrap();
        }
        assert!(gate.check(5, "a").is_err());
        gate.check(5, "b").unwrap();
        assert_eq!(gate.count("b"), Some(1));
    }

    #[test]
    fn per_call_limit_overrides_default() {
        let (gate, _) = gate(10);
        gate.check(1, "k").unwrap();
        assert!(gate.check(1, "k").is_err());
        // a larger limit on another call site still sees the same counter
        gate.check(2, "k").unwrap();
        assert!(gate.check(2, "k").is_err());
        assert!(gate.check_default("k").is_ok());
    }

    #[test]
    fn evicts_least_recently_used_key() {
        let (gate, _) = gate(2);
        gate.check(5, "a").unwrap();
        gate.check(5, "b").unwrap();
        gate.check(5, "c").unwrap();

        assert_eq!(gate.len(), 2);
        assert!(!gate.contains("a"));
        assert!(gate.contains("b"));
        assert!(gate.contains("c"));

        // "a" comes back fresh and pushes out "b"
        gate.check(5, "a").unwrap();
        assert_eq!(gate.count("a"), Some(1));
        assert!(!gate.contains("b"));
    }

    #[test]
    fn admission_refreshes_recency() {
        let (gate, _) = gate(2);
        gate.check(5, "a").unwrap();
        gate.check(5, "b").unwrap();
        gate.check(5, "a").unwrap();
        gate.check(5, "c").unwrap();

        assert!(gate.contains("a"));
        assert!(!gate.contains("b"));
    }

    #[test]
    fn table_never_exceeds_bound() {
        let (gate, _) = gate(3);
        for i in 0..50 {
            gate.check(5, &format!("key-{i}")).unwrap();
            assert!(gate.len() <= 3);
        }
        assert_eq!(gate.len(), 3);
    }

    #[test]
    fn purge_removes_only_expired() {
        let (gate, clock) = gate(10);
        gate.check(5, "old").unwrap();
        clock.advance(Duration::from_secs(30));
        gate.check(5, "new").unwrap();
        clock.advance(Duration::from_secs(31));

        assert_eq!(gate.purge_expired(), 1);
        assert!(!gate.contains("old"));
        assert!(gate.contains("new"));

        // recency index stays consistent after purge
        gate.check(5, "x").unwrap();
        assert_eq!(gate.len(), 2);
    }

    #[test]
    fn concurrent_checks_never_over_admit() {
        let config = GateConfig::new(Duration::from_secs(60), 100, 5).unwrap();
        let gate = AdmissionGate::new(config);

        let handles: Vec<_> = (0..64)
            .map(|_| {
                let gate = gate.clone();
                std::thread::spawn(move || gate.check(7, "shared").is_ok())
            })
            .collect();
        let admitted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();

        assert_eq!(admitted, 7);
        assert_eq!(gate.count("shared"), Some(7));
    }

    #[test]
    fn concurrent_first_sightings_respect_bound() {
        let config = GateConfig::new(Duration::from_secs(60), 4, 5).unwrap();
        let gate = AdmissionGate::new(config);

        let handles: Vec<_> = (0..32)
            .map(|i| {
                let gate = gate.clone();
                std::thread::spawn(move || gate.check(5, &format!("k{i}")).is_ok())
            })
            .collect();
        for h in handles {
            assert!(h.join().unwrap());
        }
        assert_eq!(gate.len(), 4);
    }
}
