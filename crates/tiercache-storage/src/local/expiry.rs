//! Hashed timing wheel for local entry expiry

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

/// Time wheel that finds expired keys without scanning every entry
///
/// Keys are bucketed by deadline. A deadline further away than one turn of
/// the wheel lands in the bucket it would hit after wrapping; when that
/// bucket is drained early the key is put back with its remaining time.
pub struct ExpiryWheel {
    /// Bucket resolution
    tick: Duration,
    buckets: Vec<HashSet<String>>,
    current: usize,
    /// key -> (bucket, deadline)
    deadlines: HashMap<String, (usize, Instant)>,
    last_tick: Instant,
}

impl ExpiryWheel {
    /// Create a wheel with `tick` resolution spanning roughly `span`
    ///
    /// The bucket count is capped; longer TTLs simply take more turns.
    pub fn new(tick: Duration, span: Duration) -> Self {
        let tick = tick.max(Duration::from_millis(1));
        let num_buckets = ((span.as_millis() / tick.as_millis()) as usize + 1).clamp(60, 4096);

        Self {
            tick,
            buckets: vec![HashSet::new(); num_buckets],
            current: 0,
            deadlines: HashMap::new(),
            last_tick: Instant::now(),
        }
    }

    /// Schedule a key for expiry after `ttl`
    ///
    /// A deadline `Instant` cannot represent is never scheduled.
    pub fn schedule(&mut self, key: String, ttl: Duration) {
        self.remove(&key);
        if let Some(deadline) = Instant::now().checked_add(ttl) {
            self.place(key, deadline);
        }
    }

    fn place(&mut self, key: String, deadline: Instant) {
        let remaining = deadline.saturating_duration_since(self.last_tick);
        let len = self.buckets.len();
        let ticks = (remaining.as_millis() / self.tick.as_millis()).max(1) % len as u128;
        let bucket = (self.current + ticks as usize) % len;

        self.buckets[bucket].insert(key.clone());
        self.deadlines.insert(key, (bucket, deadline));
    }

    /// Remove a key from the wheel
    pub fn remove(&mut self, key: &str) {
        if let Some((bucket, _)) = self.deadlines.remove(key) {
            self.buckets[bucket].remove(key);
        }
    }

    /// Check if a key is scheduled
    pub fn contains(&self, key: &str) -> bool {
        self.deadlines.contains_key(key)
    }

    /// Advance the wheel and return keys whose deadline has passed
    pub fn advance(&mut self) -> Vec<String> {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_tick);
        let ticks = (elapsed.as_millis() / self.tick.as_millis()) as usize;

        if ticks == 0 {
            return Vec::new();
        }

        let mut expired = Vec::new();
        let mut pending = Vec::new();

        for _ in 0..ticks.min(self.buckets.len()) {
            self.current = (self.current + 1) % self.buckets.len();
            for key in self.buckets[self.current].drain() {
                match self.deadlines.remove(&key) {
                    Some((_, deadline)) if deadline <= now => expired.push(key),
                    Some((_, deadline)) => pending.push((key, deadline)),
                    None => {}
                }
            }
        }

        self.last_tick = now;
        for (key, deadline) in pending {
            self.place(key, deadline);
        }

        expired
    }

    /// Number of scheduled keys
    pub fn len(&self) -> usize {
        self.deadlines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deadlines.is_empty()
    }

    /// Clear all scheduled keys
    pub fn clear(&mut self) {
        for bucket in &mut self.buckets {
            bucket.clear();
        }
        self.deadlines.clear();
    }
}
