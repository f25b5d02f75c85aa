use std::time::{Duration, Instant};

/// A value held by the local tier together with its deadline
///
/// The deadline is fixed at write time; reads never extend it.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub value: T,
    pub written_at: Instant,
    /// `None` lives until removed or evicted, also when the deadline is
    /// past what `Instant` can represent
    pub expires_at: Option<Instant>,
}

impl<T> CacheEntry<T> {
    pub fn new(value: T, ttl: Option<Duration>) -> Self {
        let written_at = Instant::now();
        Self {
            value,
            written_at,
            expires_at: ttl.and_then(|ttl| written_at.checked_add(ttl)),
        }
    }

    /// Lifetime the entry was written with
    pub fn ttl(&self) -> Option<Duration> {
        self.expires_at.map(|at| at.duration_since(self.written_at))
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }

    /// Time left before expiry, `None` for entries without a deadline or already expired
    pub fn remaining(&self) -> Option<Duration> {
        self.expires_at
            .and_then(|at| at.checked_duration_since(Instant::now()))
            .filter(|left| !left.is_zero())
    }

    /// Replace the value and restart the clock with the same lifetime
    pub fn renew(&mut self, value: T) {
        *self = Self::new(value, self.ttl());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_without_deadline() {
        let entry = CacheEntry::new("v", None);
        assert!(!entry.is_expired());
        assert_eq!(entry.ttl(), None);
        assert_eq!(entry.remaining(), None);
    }

    #[test]
    fn test_deadline_passes() {
        let mut entry = CacheEntry::new(1u8, Some(Duration::from_millis(5)));
        assert_eq!(entry.ttl(), Some(Duration::from_millis(5)));
        std::thread::sleep(Duration::from_millis(20));
        assert!(entry.is_expired());
        assert_eq!(entry.remaining(), None);

        entry.renew(2);
        assert!(!entry.is_expired());
        assert_eq!(entry.value, 2);
        assert_eq!(entry.ttl(), Some(Duration::from_millis(5)));
    }

    #[test]
    fn test_unrepresentable_deadline_never_expires() {
        let entry = CacheEntry::new((), Some(Duration::MAX));
        assert_eq!(entry.expires_at, None);
        assert!(!entry.is_expired());
    }
}
