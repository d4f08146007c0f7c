//! Hybrid timestamp source
//! Wall-clock anchored at startup, advanced by the monotonic clock

use std::time::Instant;

/// Nanosecond clock that never goes backwards within a process, even if the
/// system clock is adjusted, while staying close to Unix wall time.
#[derive(Debug, Clone, Copy)]
pub struct HybridClock {
    wall_base_ns: i64,
    perf_base: Instant,
}

impl HybridClock {
    pub fn new() -> Self {
        let wall_base_ns = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
        Self::anchored(wall_base_ns, Instant::now())
    }

    /// Clock anchored at an explicit wall time / monotonic instant pair.
    pub fn anchored(wall_base_ns: i64, perf_base: Instant) -> Self {
        Self {
            wall_base_ns,
            perf_base,
        }
    }

    pub fn now_ns(&self) -> i64 {
        let elapsed = i64::try_from(self.perf_base.elapsed().as_nanos()).unwrap_or(i64::MAX);
        self.wall_base_ns.saturating_add(elapsed)
    }
}

impl Default for HybridClock {
    fn default() -> Self {
        Self::new()
    }
}
