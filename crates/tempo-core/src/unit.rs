//! Unit handles: identity plus the per-unit tick lock.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::id::UnitId;

/// Handle to one active simulation unit.
///
/// The handle carries the unit's identity and the exclusive lock that
/// serializes the unit's own tick against cross-unit operations such as
/// entity transfer. The lock guards no data of its own (world state
/// lives behind the simulation backend), so a poisoned lock (a backend
/// panic while ticking) is recovered rather than propagated.
#[derive(Debug)]
pub struct UnitHandle {
    id: UnitId,
    tick_lock: Mutex<()>,
}

impl UnitHandle {
    /// Create a handle for the unit with the given id.
    pub fn new(id: UnitId) -> Self {
        Self {
            id,
            tick_lock: Mutex::new(()),
        }
    }

    /// The unit's stable identity.
    pub fn id(&self) -> UnitId {
        self.id
    }

    /// Acquire the unit's exclusive tick lock.
    ///
    /// Held by the ticker for the full duration of the unit's advance;
    /// held by cross-unit operations (via [`lock_both`]) while mutating
    /// either side of a transfer.
    pub fn lock(&self) -> MutexGuard<'_, ()> {
        self.tick_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Acquire two units' locks in canonical (ascending id) order.
///
/// Cross-unit operations must hold both locks before mutating either
/// side. Taking them in id order keeps concurrent transfers from
/// deadlocking against each other and against in-progress ticks,
/// regardless of the caller's argument order. The returned guards are
/// in argument order: `(guard_a, guard_b)`.
///
/// # Panics
///
/// Panics if both handles name the same unit; a transfer within one
/// unit needs only that unit's [`lock`](UnitHandle::lock).
pub fn lock_both<'a>(
    a: &'a UnitHandle,
    b: &'a UnitHandle,
) -> (MutexGuard<'a, ()>, MutexGuard<'a, ()>) {
    assert!(
        a.id != b.id,
        "lock_both requires two distinct units, got {} twice",
        a.id
    );
    if a.id < b.id {
        let guard_a = a.lock();
        let guard_b = b.lock();
        (guard_a, guard_b)
    } else {
        let guard_b = b.lock();
        let guard_a = a.lock();
        (guard_a, guard_b)
    }
}
