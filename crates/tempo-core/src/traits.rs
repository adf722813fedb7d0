//! Collaborator interfaces consumed by the scheduler.
//!
//! The scheduler drives these narrow traits and nothing else. What a
//! tick actually does (physics, AI, block updates), where the unit list
//! comes from, and how network flushing works are all owned elsewhere.

use std::sync::Arc;

use crate::error::SimError;
use crate::id::EndpointId;
use crate::unit::UnitHandle;

/// The simulation backend: the work performed inside one tick.
///
/// Both operations are invoked with the unit's tick lock already held,
/// and may run concurrently across *different* units. The backend must
/// not assume any ordering between units within a phase.
pub trait Simulation: Send + Sync {
    /// Advance one unit's world state by one step.
    fn tick(&self, unit: &UnitHandle) -> Result<(), SimError>;

    /// Update which observers can see which entities in `unit`.
    fn track_visibility(&self, unit: &UnitHandle) -> Result<(), SimError>;
}

/// Source of the active unit set, queried once per `tick()` call.
pub trait UnitRegistry: Send + Sync {
    /// All active units, in registration order.
    fn active_units(&self) -> Vec<Arc<UnitHandle>>;
}

/// Network-layer flush control, toggled around the tracking phase.
///
/// Suspending flush batches the tracking phase's packet bursts into one
/// flush per endpoint instead of one per packet.
pub trait FlushControl: Send + Sync {
    /// The endpoints connected at this instant.
    fn connected_endpoints(&self) -> Vec<EndpointId>;

    /// Number of currently connected endpoints.
    fn connection_count(&self) -> usize;

    /// Stop automatic packet flushing on `endpoint`.
    fn suspend_flush(&self, endpoint: EndpointId);

    /// Re-enable automatic packet flushing on `endpoint`.
    fn resume_flush(&self, endpoint: EndpointId);
}
