//! Per-unit tick tasks: the sequential/parallel variant dispatch.
//!
//! A [`UnitTicker`] advances exactly one unit by one step. The
//! scheduler caches one ticker per active unit and rebuilds the set
//! wholesale when the unit count or scheduling mode changes; the
//! variant is fixed at cache-build time.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tempo_core::{
    BarrierError, SimError, Simulation, TickPhase, UnitFailure, UnitHandle,
};

use crate::barrier::Barrier;

// ── FailureSink ──────────────────────────────────────────────────

/// Shared collector for failures raised while units advance.
///
/// Tickers record here *before* decrementing a phase barrier, so every
/// failure of a finished phase is visible to the orchestrator by the
/// time its barrier wait returns.
#[derive(Clone, Default)]
pub struct FailureSink {
    records: Arc<Mutex<Vec<FailureRecord>>>,
}

/// One recorded failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FailureRecord {
    /// A backend failure confined to one unit.
    Unit(UnitFailure),
    /// A barrier protocol violation observed by a worker — structural.
    Barrier(BarrierError),
}

impl FailureSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a unit's backend failure.
    pub fn record_unit(&self, failure: UnitFailure) {
        log::debug!("unit failure recorded: {failure}");
        self.lock().push(FailureRecord::Unit(failure));
    }

    /// Record a barrier violation.
    pub fn record_barrier(&self, error: BarrierError) {
        log::error!("barrier violation while advancing units: {error}");
        self.lock().push(FailureRecord::Barrier(error));
    }

    /// Take every record accumulated since the last drain.
    pub fn drain(&self) -> Vec<FailureRecord> {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, Vec<FailureRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ── UnitTicker ───────────────────────────────────────────────────

enum Mode {
    /// Runs on the orchestrating thread; ticks and tracks inline.
    Sequential,
    /// Runs on a pool thread; decrements `tick_barrier` when done.
    /// With a tracking barrier present, visibility tracking is split
    /// into its own separately-barriered phase and skipped during
    /// [`UnitTicker::advance`].
    Parallel {
        tick_barrier: Arc<Barrier>,
        track_barrier: Option<Arc<Barrier>>,
    },
}

/// Advances one unit by one step.
pub struct UnitTicker {
    unit: Arc<UnitHandle>,
    backend: Arc<dyn Simulation>,
    failures: FailureSink,
    mode: Mode,
}

impl UnitTicker {
    /// Build the sequential variant: runs inline on the calling thread.
    pub fn sequential(
        unit: Arc<UnitHandle>,
        backend: Arc<dyn Simulation>,
        failures: FailureSink,
    ) -> Self {
        Self {
            unit,
            backend,
            failures,
            mode: Mode::Sequential,
        }
    }

    /// Build the parallel variant.
    ///
    /// Passing a `track_barrier` splits visibility tracking out of
    /// [`advance`](UnitTicker::advance) into
    /// [`advance_tracking`](UnitTicker::advance_tracking).
    pub fn parallel(
        unit: Arc<UnitHandle>,
        backend: Arc<dyn Simulation>,
        failures: FailureSink,
        tick_barrier: Arc<Barrier>,
        track_barrier: Option<Arc<Barrier>>,
    ) -> Self {
        Self {
            unit,
            backend,
            failures,
            mode: Mode::Parallel {
                tick_barrier,
                track_barrier,
            },
        }
    }

    /// The unit this ticker advances.
    pub fn unit(&self) -> &Arc<UnitHandle> {
        &self.unit
    }

    /// Advance the unit by one step.
    ///
    /// Holds the unit's tick lock for the whole step, so no cross-unit
    /// operation races this unit's in-progress tick. For the parallel
    /// variant the tick barrier is decremented on every exit path;
    /// failures (including caught backend panics) are recorded first,
    /// so the orchestrator sees them once the barrier drains.
    pub fn advance(&self) {
        let track_inline = match &self.mode {
            Mode::Sequential => true,
            Mode::Parallel { track_barrier, .. } => track_barrier.is_none(),
        };
        let result = {
            let _tick_guard = self.unit.lock();
            catch_sim(|| {
                self.backend.tick(&self.unit)?;
                if track_inline {
                    self.backend.track_visibility(&self.unit)?;
                }
                Ok(())
            })
        };
        if let Err(error) = result {
            self.failures.record_unit(UnitFailure {
                unit: self.unit.id(),
                phase: TickPhase::Tick,
                error,
            });
        }
        if let Mode::Parallel { tick_barrier, .. } = &self.mode {
            if let Err(e) = tick_barrier.decrement() {
                self.failures.record_barrier(e);
            }
        }
    }

    /// Run only the visibility-tracking portion of the step.
    ///
    /// Only dispatched for a parallel ticker built with a tracking
    /// barrier; that barrier is decremented on every exit path, exactly
    /// like [`advance`](UnitTicker::advance) and the tick barrier.
    pub fn advance_tracking(&self) {
        let result = {
            let _tick_guard = self.unit.lock();
            catch_sim(|| self.backend.track_visibility(&self.unit))
        };
        if let Err(error) = result {
            self.failures.record_unit(UnitFailure {
                unit: self.unit.id(),
                phase: TickPhase::Tracking,
                error,
            });
        }
        if let Mode::Parallel {
            track_barrier: Some(track_barrier),
            ..
        } = &self.mode
        {
            if let Err(e) = track_barrier.decrement() {
                self.failures.record_barrier(e);
            }
        }
    }
}

/// Run a backend call, converting panics into [`SimError::Panicked`].
///
/// A panic that unwound through a pool worker would leave the phase
/// barrier undrained and the orchestrator blocked forever; catching at
/// this boundary keeps the countdown-on-all-paths guarantee.
fn catch_sim(f: impl FnOnce() -> Result<(), SimError>) -> Result<(), SimError> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(SimError::Panicked {
            message: panic_message(payload.as_ref()),
        }),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempo_core::UnitId;
    use tempo_test_utils::{CountingSim, FailingSim, PanickingSim};

    fn unit(id: u32) -> Arc<UnitHandle> {
        Arc::new(UnitHandle::new(UnitId(id)))
    }

    #[test]
    fn sequential_advance_ticks_and_tracks() {
        let backend = Arc::new(CountingSim::new());
        let ticker = UnitTicker::sequential(unit(0), backend.clone(), FailureSink::new());

        ticker.advance();

        assert_eq!(backend.tick_count(UnitId(0)), 1);
        assert_eq!(backend.track_count(UnitId(0)), 1);
    }

    #[test]
    fn parallel_advance_decrements_on_success() {
        let barrier = Arc::new(Barrier::new(1));
        let backend = Arc::new(CountingSim::new());
        let ticker = UnitTicker::parallel(
            unit(0),
            backend,
            FailureSink::new(),
            Arc::clone(&barrier),
            None,
        );

        ticker.advance();
        assert_eq!(barrier.count(), 0);
    }

    #[test]
    fn parallel_advance_decrements_and_records_on_failure() {
        let barrier = Arc::new(Barrier::new(1));
        let failures = FailureSink::new();
        let backend = Arc::new(FailingSim::new().fail_tick_for(UnitId(0)));
        let ticker = UnitTicker::parallel(
            unit(0),
            backend,
            failures.clone(),
            Arc::clone(&barrier),
            None,
        );

        ticker.advance();

        assert_eq!(barrier.count(), 0);
        let records = failures.drain();
        assert_eq!(records.len(), 1);
        match &records[0] {
            FailureRecord::Unit(f) => {
                assert_eq!(f.unit, UnitId(0));
                assert_eq!(f.phase, TickPhase::Tick);
            }
            other => panic!("expected unit failure, got {other:?}"),
        }
    }

    #[test]
    fn parallel_advance_decrements_on_backend_panic() {
        let barrier = Arc::new(Barrier::new(1));
        let failures = FailureSink::new();
        let backend = Arc::new(PanickingSim::new(UnitId(0)));
        let ticker = UnitTicker::parallel(
            unit(0),
            backend,
            failures.clone(),
            Arc::clone(&barrier),
            None,
        );

        ticker.advance();

        assert_eq!(barrier.count(), 0);
        match &failures.drain()[..] {
            [FailureRecord::Unit(f)] => {
                assert!(matches!(f.error, SimError::Panicked { .. }));
            }
            other => panic!("expected one panic record, got {other:?}"),
        }
    }

    #[test]
    fn two_phase_advance_skips_tracking() {
        let tick_barrier = Arc::new(Barrier::new(1));
        let track_barrier = Arc::new(Barrier::new(1));
        let backend = Arc::new(CountingSim::new());
        let ticker = UnitTicker::parallel(
            unit(3),
            backend.clone(),
            FailureSink::new(),
            Arc::clone(&tick_barrier),
            Some(Arc::clone(&track_barrier)),
        );

        ticker.advance();
        assert_eq!(backend.tick_count(UnitId(3)), 1);
        assert_eq!(backend.track_count(UnitId(3)), 0);
        assert_eq!(tick_barrier.count(), 0);
        assert_eq!(track_barrier.count(), 1);

        ticker.advance_tracking();
        assert_eq!(backend.track_count(UnitId(3)), 1);
        assert_eq!(track_barrier.count(), 0);
    }

    #[test]
    fn duplicate_decrement_is_recorded_as_barrier_violation() {
        let barrier = Arc::new(Barrier::new(1));
        let failures = FailureSink::new();
        let backend = Arc::new(CountingSim::new());
        let ticker = UnitTicker::parallel(
            unit(0),
            backend,
            failures.clone(),
            Arc::clone(&barrier),
            None,
        );

        ticker.advance();
        // A second completion signal for the same cycle is a bug, and
        // must surface rather than wrap the count.
        ticker.advance();

        let records = failures.drain();
        assert!(records
            .iter()
            .any(|r| matches!(r, FailureRecord::Barrier(BarrierError::Underflow))));
    }
}
