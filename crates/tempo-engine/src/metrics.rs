//! Per-tick timing metrics.

/// Timing and shape data for a single `tick()` call.
///
/// Durations are in microseconds, measured on the orchestrating
/// thread. Consumers read them from the returned value or from the
/// scheduler's most recent copy.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TickMetrics {
    /// Wall-clock time for the entire tick.
    pub total_us: u64,
    /// Time from first dispatch until the tick barrier drained (the
    /// whole sweep, in sequential mode).
    pub tick_phase_us: u64,
    /// Time spent in the tracking phase; zero when the phase was
    /// skipped or disabled.
    pub tracking_phase_us: u64,
    /// Number of units advanced.
    pub unit_count: usize,
    /// Whether the units ran on the worker pool.
    pub parallel: bool,
    /// Whether the ticker cache was rebuilt this tick.
    pub cache_rebuilt: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_metrics_are_zero() {
        let m = TickMetrics::default();
        assert_eq!(m.total_us, 0);
        assert_eq!(m.tick_phase_us, 0);
        assert_eq!(m.tracking_phase_us, 0);
        assert_eq!(m.unit_count, 0);
        assert!(!m.parallel);
        assert!(!m.cache_rebuilt);
    }
}
