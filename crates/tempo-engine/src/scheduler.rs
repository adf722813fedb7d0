//! Tick scheduler: the orchestrating entry point.
//!
//! [`TickScheduler::tick()`] advances every active unit exactly once,
//! either inline on the calling thread or fanned out over the worker
//! pool with a barrier at each phase boundary, and returns only after
//! every unit — and, in two-phase mode, every tracking sub-task — has
//! completed. No consumer ever observes a partially ticked unit set.

use std::sync::Arc;
use std::time::Instant;

use tempo_core::{
    BarrierError, FlushControl, Simulation, TickError, TickId, UnitRegistry,
};

use crate::barrier::Barrier;
use crate::config::{SchedulerConfig, SchedulerError};
use crate::flush::FlushPause;
use crate::metrics::TickMetrics;
use crate::pool::WorkerPool;
use crate::ticker::{FailureRecord, FailureSink, UnitTicker};

// ── CacheShape ───────────────────────────────────────────────────

/// The shape the ticker cache was built for. A mismatch on any field
/// discards and rebuilds the cache, which is what keeps a mode flip
/// between two ticks from leaving stale tickers behind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct CacheShape {
    unit_count: usize,
    parallel: bool,
    two_phase: bool,
}

// ── TickScheduler ────────────────────────────────────────────────

/// Orchestrates one tick across all active simulation units.
///
/// Owns the ticker cache, both phase barriers, and the worker pool.
/// Constructed explicitly and handed to the server loop; there is no
/// ambient global instance.
pub struct TickScheduler {
    backend: Arc<dyn Simulation>,
    registry: Arc<dyn UnitRegistry>,
    network: Arc<dyn FlushControl>,
    config: SchedulerConfig,
    pool: WorkerPool,
    tick_barrier: Arc<Barrier>,
    track_barrier: Arc<Barrier>,
    tickers: Vec<Arc<UnitTicker>>,
    cache_shape: Option<CacheShape>,
    cache_generation: u64,
    failures: FailureSink,
    current_tick: TickId,
    last_metrics: TickMetrics,
}

impl TickScheduler {
    /// Construct a scheduler over the given collaborators.
    pub fn new(
        backend: Arc<dyn Simulation>,
        registry: Arc<dyn UnitRegistry>,
        network: Arc<dyn FlushControl>,
        config: SchedulerConfig,
    ) -> Result<Self, SchedulerError> {
        let pool = WorkerPool::new()
            .map_err(|source| SchedulerError::ThreadSpawnFailed { source })?;
        Ok(Self {
            backend,
            registry,
            network,
            config,
            pool,
            tick_barrier: Arc::new(Barrier::new(0)),
            track_barrier: Arc::new(Barrier::new(0)),
            tickers: Vec::new(),
            cache_shape: None,
            cache_generation: 0,
            failures: FailureSink::new(),
            current_tick: TickId(0),
            last_metrics: TickMetrics::default(),
        })
    }

    /// Advance every active unit exactly once.
    ///
    /// Returns after all units — and, in two-phase mode, all tracking
    /// sub-tasks — have completed. Per-unit failures never stop sibling
    /// units; they are aggregated into [`TickError::UnitsFailed`] after
    /// the phase barrier drains. Barrier underflow and cancelled waits
    /// are structural: they escalate immediately and invalidate the
    /// ticker cache so the next call starts from a rebuilt, re-armed
    /// state.
    pub fn tick(&mut self) -> Result<TickMetrics, TickError> {
        let tick_start = Instant::now();
        let config = self.config;
        let cache_rebuilt = self.refresh_cache(config);
        let unit_count = self.tickers.len();

        let phases = if config.parallel_units {
            self.run_parallel(config)
        } else {
            let phase_start = Instant::now();
            for ticker in &self.tickers {
                ticker.advance();
            }
            Ok(PhaseTimings {
                tick_phase_us: elapsed_us(phase_start),
                tracking_phase_us: 0,
            })
        };

        let timings = match phases {
            Ok(timings) => timings,
            Err(e) => return Err(self.structural_abort(e)),
        };

        let mut unit_failures = Vec::new();
        let mut barrier_violation = None;
        for record in self.failures.drain() {
            match record {
                FailureRecord::Unit(failure) => unit_failures.push(failure),
                FailureRecord::Barrier(e) => {
                    if barrier_violation.is_none() {
                        barrier_violation = Some(e);
                    }
                }
            }
        }
        if let Some(e) = barrier_violation {
            for failure in &unit_failures {
                log::warn!("unit failure discarded by structural abort: {failure}");
            }
            return Err(self.structural_abort(e));
        }

        // The tick boundary was reached: every unit ran exactly once,
        // whether or not some of them failed.
        self.current_tick = TickId(self.current_tick.0 + 1);
        let metrics = TickMetrics {
            total_us: elapsed_us(tick_start),
            tick_phase_us: timings.tick_phase_us,
            tracking_phase_us: timings.tracking_phase_us,
            unit_count,
            parallel: config.parallel_units,
            cache_rebuilt,
        };
        self.last_metrics = metrics.clone();

        if unit_failures.is_empty() {
            Ok(metrics)
        } else {
            Err(TickError::UnitsFailed(unit_failures))
        }
    }

    /// Replace the scheduling configuration for subsequent ticks.
    ///
    /// Takes effect at the next `tick()` call; a mode change rebuilds
    /// the ticker cache there.
    pub fn set_config(&mut self, config: SchedulerConfig) {
        self.config = config;
    }

    /// The current scheduling configuration.
    pub fn config(&self) -> SchedulerConfig {
        self.config
    }

    /// Number of ticks completed so far.
    pub fn current_tick(&self) -> TickId {
        self.current_tick
    }

    /// Incremented every time the ticker cache is rebuilt.
    pub fn cache_generation(&self) -> u64 {
        self.cache_generation
    }

    /// The cached tickers, one per active unit.
    ///
    /// Exposed for identity checks: two consecutive ticks with an
    /// unchanged unit count and mode reuse the same entries.
    pub fn cached_tickers(&self) -> &[Arc<UnitTicker>] {
        &self.tickers
    }

    /// Metrics from the most recent completed tick.
    pub fn last_metrics(&self) -> &TickMetrics {
        &self.last_metrics
    }

    // ── internals ────────────────────────────────────────────────

    /// Rebuild the ticker cache when the active-unit count or the
    /// scheduling mode changed. Returns whether a rebuild happened.
    fn refresh_cache(&mut self, config: SchedulerConfig) -> bool {
        let units = self.registry.active_units();
        let shape = CacheShape {
            unit_count: units.len(),
            parallel: config.parallel_units,
            two_phase: config.parallel_units && config.fully_parallel_tracking,
        };
        if self.cache_shape == Some(shape) {
            return false;
        }

        self.tickers.clear();
        for unit in units {
            let ticker = if shape.parallel {
                let track_barrier = if shape.two_phase {
                    Some(Arc::clone(&self.track_barrier))
                } else {
                    None
                };
                UnitTicker::parallel(
                    unit,
                    Arc::clone(&self.backend),
                    self.failures.clone(),
                    Arc::clone(&self.tick_barrier),
                    track_barrier,
                )
            } else {
                UnitTicker::sequential(
                    unit,
                    Arc::clone(&self.backend),
                    self.failures.clone(),
                )
            };
            self.tickers.push(Arc::new(ticker));
        }

        if shape.parallel {
            self.tick_barrier.reset(shape.unit_count);
            if shape.two_phase {
                self.track_barrier.reset(shape.unit_count);
            }
        }
        self.cache_shape = Some(shape);
        self.cache_generation += 1;
        log::debug!(
            "ticker cache rebuilt: {} unit(s), parallel={}, two_phase={}",
            shape.unit_count,
            shape.parallel,
            shape.two_phase
        );
        true
    }

    /// Run the barriered tick phase and, when enabled, the tracking
    /// phase.
    fn run_parallel(
        &mut self,
        config: SchedulerConfig,
    ) -> Result<PhaseTimings, BarrierError> {
        let phase_start = Instant::now();
        let count = self.tickers.len();
        if count > 0 {
            // All but the last go to the pool; the calling thread takes
            // the last one instead of idling at the barrier. Any single
            // unit would do; the last is convention.
            for ticker in &self.tickers[..count - 1] {
                let ticker = Arc::clone(ticker);
                self.pool.submit(move || ticker.advance());
            }
            self.tickers[count - 1].advance();
            self.tick_barrier.wait_until_zero()?;
            self.tick_barrier.reset(count);
        }
        let tick_phase_us = elapsed_us(phase_start);

        let mut tracking_phase_us = 0;
        if config.fully_parallel_tracking && count > 0 {
            let track_start = Instant::now();
            self.run_tracking(count)?;
            tracking_phase_us = elapsed_us(track_start);
        }

        Ok(PhaseTimings {
            tick_phase_us,
            tracking_phase_us,
        })
    }

    /// The separately-barriered tracking phase, with flush suspended on
    /// every connection for its duration.
    fn run_tracking(&mut self, count: usize) -> Result<(), BarrierError> {
        // No connections means no packet bursts to batch; skip the
        // whole suspend/track/resume dance.
        if self.network.connection_count() == 0 {
            return Ok(());
        }

        let _flush_pause = FlushPause::new(self.network.as_ref());
        for ticker in &self.tickers[..count - 1] {
            let ticker = Arc::clone(ticker);
            self.pool.submit(move || ticker.advance_tracking());
        }
        self.tickers[count - 1].advance_tracking();
        // On a cancelled wait, _flush_pause still resumes every
        // suspended endpoint on the way out.
        self.track_barrier.wait_until_zero()?;
        self.track_barrier.reset(count);
        Ok(())
    }

    /// Invalidate the cache after a structural failure so the next
    /// `tick()` rebuilds tickers and re-arms both barriers.
    fn structural_abort(&mut self, error: BarrierError) -> TickError {
        for record in self.failures.drain() {
            log::warn!("record discarded by structural abort: {record:?}");
        }
        self.cache_shape = None;
        TickError::Barrier(error)
    }
}

struct PhaseTimings {
    tick_phase_us: u64,
    tracking_phase_us: u64,
}

fn elapsed_us(start: Instant) -> u64 {
    start.elapsed().as_micros() as u64
}
