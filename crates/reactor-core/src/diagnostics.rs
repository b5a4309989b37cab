//! Memory-tracker diagnostics (component J): per-(file,line) allocation
//! counters for the slab allocator, compiled out entirely when the
//! `diagnostics` feature is off.
//!
//! With the feature disabled, [`MemoryTracker`] is a zero-sized unit type
//! and every call site collapses at compile time — the same "zero
//! runtime cost when disabled" property the original got from a
//! preprocessor gate, here from `cfg` plus monomorphization.

#[cfg(feature = "diagnostics")]
mod enabled {
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// One call site's running allocation count and live byte total.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SiteStats {
        pub count: u64,
        pub live_bytes: u64,
    }

    #[derive(Default)]
    pub struct MemoryTracker {
        sites: Mutex<HashMap<(&'static str, u32), SiteStats>>,
    }

    impl MemoryTracker {
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        pub fn record_alloc(&self, file: &'static str, line: u32, size: usize) {
            let mut sites = self.sites.lock().expect("memory tracker mutex poisoned");
            let entry = sites.entry((file, line)).or_default();
            entry.count += 1;
            entry.live_bytes += size as u64;
            tracing::trace!(file, line, size, "slab allocation recorded");
        }

        pub fn record_dealloc(&self, file: &'static str, line: u32, size: usize) {
            let mut sites = self.sites.lock().expect("memory tracker mutex poisoned");
            if let Some(entry) = sites.get_mut(&(file, line)) {
                entry.live_bytes = entry.live_bytes.saturating_sub(size as u64);
            }
            tracing::trace!(file, line, size, "slab deallocation recorded");
        }

        /// Fills `buf` with the call sites carrying the most live bytes,
        /// descending, and returns how many entries were written.
        pub fn report_most_used(&self, buf: &mut [(&'static str, u32, SiteStats)]) -> usize {
            let sites = self.sites.lock().expect("memory tracker mutex poisoned");
            let mut entries: Vec<_> = sites.iter().map(|(&(f, l), &s)| (f, l, s)).collect();
            entries.sort_unstable_by(|a, b| b.2.live_bytes.cmp(&a.2.live_bytes));
            let n = entries.len().min(buf.len());
            buf[..n].copy_from_slice(&entries[..n]);
            n
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn report_most_used_sorts_by_live_bytes_descending() {
            let tracker = MemoryTracker::new();
            tracker.record_alloc("a.rs", 10, 64);
            tracker.record_alloc("b.rs", 20, 256);
            tracker.record_alloc("c.rs", 30, 128);

            let mut buf = [("", 0u32, SiteStats::default()); 2];
            let n = tracker.report_most_used(&mut buf);
            assert_eq!(n, 2);
            assert_eq!(buf[0].0, "b.rs");
            assert_eq!(buf[1].0, "c.rs");
        }

        #[test]
        fn dealloc_reduces_live_bytes_but_keeps_the_count() {
            let tracker = MemoryTracker::new();
            tracker.record_alloc("a.rs", 1, 100);
            tracker.record_dealloc("a.rs", 1, 40);
            let mut buf = [("", 0u32, SiteStats::default()); 1];
            tracker.report_most_used(&mut buf);
            assert_eq!(buf[0].2.live_bytes, 60);
            assert_eq!(buf[0].2.count, 1);
        }
    }
}

#[cfg(feature = "diagnostics")]
pub use enabled::{MemoryTracker, SiteStats};

#[cfg(not(feature = "diagnostics"))]
mod disabled {
    #[derive(Default)]
    pub struct MemoryTracker;

    #[derive(Debug, Clone, Copy, Default)]
    pub struct SiteStats {
        pub count: u64,
        pub live_bytes: u64,
    }

    impl MemoryTracker {
        #[must_use]
        pub fn new() -> Self {
            Self
        }

        #[inline(always)]
        pub fn record_alloc(&self, _file: &'static str, _line: u32, _size: usize) {}

        #[inline(always)]
        pub fn record_dealloc(&self, _file: &'static str, _line: u32, _size: usize) {}

        #[inline(always)]
        pub fn report_most_used(&self, _buf: &mut [(&'static str, u32, SiteStats)]) -> usize {
            0
        }
    }
}

#[cfg(not(feature = "diagnostics"))]
pub use disabled::{MemoryTracker, SiteStats};
