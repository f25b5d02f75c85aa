use std::fmt;

/// Point-in-time counters of a local tier
///
/// Counters are cumulative since the store was created; `entries`,
/// `collections` and `approx_bytes` describe the store right now.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LocalStats {
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
    pub removals: u64,
    /// Entries dropped because their TTL ran out
    pub expirations: u64,
    /// Entries dropped to stay within capacity
    pub evictions: u64,
    pub entries: usize,
    pub collections: usize,
    /// Encoded value bytes plus key bytes
    pub approx_bytes: usize,
}

impl LocalStats {
    /// Reads answered by the store, hits and misses
    pub fn lookups(&self) -> u64 {
        self.hits + self.misses
    }

    /// Share of lookups that hit; 0.0 before the first lookup
    pub fn hit_ratio(&self) -> f64 {
        match self.lookups() {
            0 => 0.0,
            n => self.hits as f64 / n as f64,
        }
    }
}

impl fmt::Display for LocalStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} entries, {} collections, {:.1}% hits over {} lookups, {} expired, {} evicted",
            self.entries,
            self.collections,
            self.hit_ratio() * 100.0,
            self.lookups(),
            self.expirations,
            self.evictions
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio_without_lookups() {
        assert_eq!(LocalStats::default().hit_ratio(), 0.0);
    }

    #[test]
    fn test_ratio_and_display() {
        let stats = LocalStats {
            hits: 3,
            misses: 1,
            entries: 2,
            ..Default::default()
        };
        assert_eq!(stats.lookups(), 4);
        assert!((stats.hit_ratio() - 0.75).abs() < f64::EPSILON);
        assert!(stats.to_string().starts_with("2 entries, 0 collections, 75.0% hits"));
    }
}
