//! Lightweight counters and peak tracking for the cache.
//!
//! Keep this cheap. Downstream can export the snapshot to whatever metrics
//! stack it uses.

/// Snapshot of cache activity since construction.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Entries built by a factory.
    pub created: u64,
    /// Acquisitions served by an entry that was still live.
    pub hits: u64,
    /// Acquisitions served by an entry pulled out of the grace buffer.
    pub rescues: u64,
    /// Successful releases.
    pub releases: u64,
    /// Releases of unknown keys/instances or of entries already at zero.
    pub rejected_releases: u64,
    /// Entries evicted because the grace buffer overflowed.
    pub evictions: u64,
    /// Entries disposed while tearing the cache down.
    pub teardown_disposals: u64,
    /// High-water mark of indexed entries (live + grace-buffered).
    pub peak_entries: usize,
}

#[derive(Debug, Default)]
pub struct PeakTracker {
    peak: usize,
}

impl PeakTracker {
    pub fn new() -> Self {
        Self { peak: 0 }
    }

    /// Record the current entry count; updates peak if higher.
    pub fn record(&mut self, entries: usize) {
        if entries > self.peak {
            self.peak = entries;
        }
        #[cfg(feature = "tracing")]
        tracing::trace!(entries, peak = self.peak, "cache size");
    }

    pub fn peak(&self) -> usize {
        self.peak
    }
}
