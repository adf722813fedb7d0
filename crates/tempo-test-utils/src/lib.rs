//! Test utilities and mock collaborators for Tempo development.
//!
//! Provides mock implementations of the core traits ([`Simulation`],
//! [`UnitRegistry`], [`FlushControl`]) for exercising the scheduler
//! without a real server around it:
//!
//! - [`CountingSim`]: counts tick/track calls per unit, never fails.
//! - [`FailingSim`]: fails scripted units' calls, counting either way.
//! - [`PanickingSim`]: panics while ticking scripted units.
//! - [`RecordingSim`]: appends every call to a globally ordered log.
//! - [`StaticRegistry`]: registry over a mutable fixed unit list.
//! - [`MockNetwork`]: flush controller that counts suspends/resumes.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tempo_core::{
    EndpointId, FlushControl, SimError, Simulation, TickPhase, UnitHandle, UnitId, UnitRegistry,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ── CountingSim ──────────────────────────────────────────────────

/// Backend that counts tick and track calls per unit and never fails.
#[derive(Default)]
pub struct CountingSim {
    ticks: Mutex<HashMap<UnitId, usize>>,
    tracks: Mutex<HashMap<UnitId, usize>>,
}

impl CountingSim {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times `tick()` ran for `unit`.
    pub fn tick_count(&self, unit: UnitId) -> usize {
        lock(&self.ticks).get(&unit).copied().unwrap_or(0)
    }

    /// How many times `track_visibility()` ran for `unit`.
    pub fn track_count(&self, unit: UnitId) -> usize {
        lock(&self.tracks).get(&unit).copied().unwrap_or(0)
    }

    /// Total `tick()` calls across all units.
    pub fn total_ticks(&self) -> usize {
        lock(&self.ticks).values().sum()
    }
}

impl Simulation for CountingSim {
    fn tick(&self, unit: &UnitHandle) -> Result<(), SimError> {
        *lock(&self.ticks).entry(unit.id()).or_insert(0) += 1;
        Ok(())
    }

    fn track_visibility(&self, unit: &UnitHandle) -> Result<(), SimError> {
        *lock(&self.tracks).entry(unit.id()).or_insert(0) += 1;
        Ok(())
    }
}

// ── FailingSim ───────────────────────────────────────────────────

/// Backend that fails scripted units' calls deterministically, counting
/// like [`CountingSim`] either way.
#[derive(Default)]
pub struct FailingSim {
    inner: CountingSim,
    fail_tick: Vec<UnitId>,
    fail_tracking: Vec<UnitId>,
}

impl FailingSim {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `tick()` fail for `unit`.
    pub fn fail_tick_for(mut self, unit: UnitId) -> Self {
        self.fail_tick.push(unit);
        self
    }

    /// Make `track_visibility()` fail for `unit`.
    pub fn fail_tracking_for(mut self, unit: UnitId) -> Self {
        self.fail_tracking.push(unit);
        self
    }

    pub fn tick_count(&self, unit: UnitId) -> usize {
        self.inner.tick_count(unit)
    }

    pub fn track_count(&self, unit: UnitId) -> usize {
        self.inner.track_count(unit)
    }
}

impl Simulation for FailingSim {
    fn tick(&self, unit: &UnitHandle) -> Result<(), SimError> {
        self.inner.tick(unit)?;
        if self.fail_tick.contains(&unit.id()) {
            return Err(SimError::ExecutionFailed {
                reason: format!("scripted tick failure for unit {}", unit.id()),
            });
        }
        Ok(())
    }

    fn track_visibility(&self, unit: &UnitHandle) -> Result<(), SimError> {
        self.inner.track_visibility(unit)?;
        if self.fail_tracking.contains(&unit.id()) {
            return Err(SimError::ExecutionFailed {
                reason: format!("scripted tracking failure for unit {}", unit.id()),
            });
        }
        Ok(())
    }
}

// ── PanickingSim ─────────────────────────────────────────────────

/// Backend that panics while ticking one scripted unit.
///
/// Exercises the decrement-on-all-exit-paths guarantee: even a panic
/// must not leave a phase barrier undrained.
pub struct PanickingSim {
    inner: CountingSim,
    panic_unit: UnitId,
}

impl PanickingSim {
    pub fn new(panic_unit: UnitId) -> Self {
        Self {
            inner: CountingSim::new(),
            panic_unit,
        }
    }

    pub fn tick_count(&self, unit: UnitId) -> usize {
        self.inner.tick_count(unit)
    }
}

impl Simulation for PanickingSim {
    fn tick(&self, unit: &UnitHandle) -> Result<(), SimError> {
        self.inner.tick(unit)?;
        assert!(
            unit.id() != self.panic_unit,
            "scripted panic for unit {}",
            unit.id()
        );
        Ok(())
    }

    fn track_visibility(&self, unit: &UnitHandle) -> Result<(), SimError> {
        self.inner.track_visibility(unit)
    }
}

// ── RecordingSim ─────────────────────────────────────────────────

/// Backend that appends every call to a single, globally ordered log.
///
/// The log's push order is the global timestamp: if every tick-phase
/// entry precedes every tracking-phase entry, the phases were properly
/// barriered.
#[derive(Default)]
pub struct RecordingSim {
    events: Mutex<Vec<(TickPhase, UnitId)>>,
}

impl RecordingSim {
    pub fn new() -> Self {
        Self::default()
    }

    /// The recorded `(phase, unit)` events, in global order.
    pub fn events(&self) -> Vec<(TickPhase, UnitId)> {
        lock(&self.events).clone()
    }
}

impl Simulation for RecordingSim {
    fn tick(&self, unit: &UnitHandle) -> Result<(), SimError> {
        lock(&self.events).push((TickPhase::Tick, unit.id()));
        Ok(())
    }

    fn track_visibility(&self, unit: &UnitHandle) -> Result<(), SimError> {
        lock(&self.events).push((TickPhase::Tracking, unit.id()));
        Ok(())
    }
}

// ── StaticRegistry ───────────────────────────────────────────────

/// Registry over a fixed, test-mutable unit list.
#[derive(Default)]
pub struct StaticRegistry {
    units: Mutex<Vec<Arc<UnitHandle>>>,
}

impl StaticRegistry {
    /// Registry holding units `0..count`.
    pub fn new(count: u32) -> Self {
        let registry = Self::default();
        registry.set_count(count);
        registry
    }

    /// Replace the unit list with fresh handles `0..count`.
    pub fn set_count(&self, count: u32) {
        *lock(&self.units) = (0..count)
            .map(|id| Arc::new(UnitHandle::new(UnitId(id))))
            .collect();
    }

    /// Append one unit to the list.
    pub fn push(&self, unit: Arc<UnitHandle>) {
        lock(&self.units).push(unit);
    }
}

impl UnitRegistry for StaticRegistry {
    fn active_units(&self) -> Vec<Arc<UnitHandle>> {
        lock(&self.units).clone()
    }
}

// ── MockNetwork ──────────────────────────────────────────────────

/// Flush controller that records suspend/resume calls per endpoint.
#[derive(Default)]
pub struct MockNetwork {
    endpoints: Mutex<Vec<EndpointId>>,
    suspends: Mutex<HashMap<EndpointId, usize>>,
    resumes: Mutex<HashMap<EndpointId, usize>>,
}

impl MockNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connected endpoint.
    pub fn connect(&self, endpoint: EndpointId) {
        lock(&self.endpoints).push(endpoint);
    }

    /// Remove a connected endpoint.
    pub fn disconnect(&self, endpoint: EndpointId) {
        lock(&self.endpoints).retain(|&e| e != endpoint);
    }

    pub fn suspend_count(&self, endpoint: EndpointId) -> usize {
        lock(&self.suspends).get(&endpoint).copied().unwrap_or(0)
    }

    pub fn resume_count(&self, endpoint: EndpointId) -> usize {
        lock(&self.resumes).get(&endpoint).copied().unwrap_or(0)
    }

    pub fn total_suspends(&self) -> usize {
        lock(&self.suspends).values().sum()
    }

    pub fn total_resumes(&self) -> usize {
        lock(&self.resumes).values().sum()
    }
}

impl FlushControl for MockNetwork {
    fn connected_endpoints(&self) -> Vec<EndpointId> {
        lock(&self.endpoints).clone()
    }

    fn connection_count(&self) -> usize {
        lock(&self.endpoints).len()
    }

    fn suspend_flush(&self, endpoint: EndpointId) {
        *lock(&self.suspends).entry(endpoint).or_insert(0) += 1;
    }

    fn resume_flush(&self, endpoint: EndpointId) {
        *lock(&self.resumes).entry(endpoint).or_insert(0) += 1;
    }
}
