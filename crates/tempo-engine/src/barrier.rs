//! Reusable countdown barrier for phase synchronization.
//!
//! One barrier exists per barriered phase (tick, tracking), created at
//! scheduler startup and re-armed with [`reset()`](Barrier::reset)
//! after each drain, so a tight tick budget never pays for per-cycle
//! primitive allocation. [`decrement()`](Barrier::decrement) may be
//! called from any worker thread; `wait_until_zero()` and `reset()`
//! belong to the orchestrating thread only.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use tempo_core::BarrierError;

struct State {
    count: usize,
    cancelled: bool,
}

/// Reusable countdown barrier.
///
/// The count never goes below zero: a decrement at zero is reported as
/// [`BarrierError::Underflow`], a duplicate completion signal that
/// always indicates a scheduling bug.
///
/// `reset()` must only be called once `wait_until_zero()` has returned
/// `Ok`: at that point every decrement of the finished cycle has been
/// published under the barrier's own lock, which is the happens-before
/// edge the orchestrator relies on.
pub struct Barrier {
    state: Mutex<State>,
    zero: Condvar,
}

// Compile-time assertion: Barrier must be Send + Sync.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<Barrier>();
};

impl Barrier {
    /// Construct a barrier armed with the given count.
    pub fn new(initial_count: usize) -> Self {
        Self {
            state: Mutex::new(State {
                count: initial_count,
                cancelled: false,
            }),
            zero: Condvar::new(),
        }
    }

    /// Atomically reduce the count by one, waking the waiter when the
    /// count reaches zero.
    pub fn decrement(&self) -> Result<(), BarrierError> {
        let mut state = self.lock_state();
        if state.count == 0 {
            return Err(BarrierError::Underflow);
        }
        state.count -= 1;
        if state.count == 0 {
            self.zero.notify_all();
        }
        Ok(())
    }

    /// Block the calling thread until the count reaches zero.
    ///
    /// Returns immediately if the count is already zero. A concurrent
    /// [`cancel()`](Barrier::cancel) aborts the wait with
    /// [`BarrierError::WaitCancelled`].
    pub fn wait_until_zero(&self) -> Result<(), BarrierError> {
        let mut state = self.lock_state();
        loop {
            if state.count == 0 {
                return Ok(());
            }
            if state.cancelled {
                return Err(BarrierError::WaitCancelled);
            }
            state = self
                .zero
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Re-arm the barrier for the next cycle and clear any pending
    /// cancellation.
    ///
    /// Precondition: the previous cycle has fully drained, i.e. the single
    /// waiting thread has seen `wait_until_zero()` return `Ok` and no
    /// decrements from that cycle are still in flight.
    pub fn reset(&self, new_count: usize) {
        let mut state = self.lock_state();
        state.count = new_count;
        state.cancelled = false;
    }

    /// Abort a pending `wait_until_zero()` from another thread, e.g.
    /// on server shutdown. Stays in effect until the next `reset()`.
    pub fn cancel(&self) {
        let mut state = self.lock_state();
        state.cancelled = true;
        self.zero.notify_all();
    }

    /// Snapshot of the current count, for tests and diagnostics.
    pub fn count(&self) -> usize {
        self.lock_state().count
    }

    // The state guards a plain counter; a poisoned lock is recovered
    // rather than propagated.
    fn lock_state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
