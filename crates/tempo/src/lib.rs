//! Tempo: a parallel tick scheduler for multi-world simulation servers.
//!
//! This is the top-level facade crate that re-exports the public API
//! from the Tempo sub-crates. For most users, adding `tempo` as a
//! single dependency is sufficient.
//!
//! A server hosts several independent simulation units ("worlds") and
//! advances each once per fixed time step. [`prelude::TickScheduler`]
//! decides, per configuration, whether the units run one after another
//! on the calling thread or concurrently on a worker pool, while the
//! caller always observes one globally ordered tick boundary.
//!
//! # Quick start
//!
//! ```rust
//! use std::sync::Arc;
//! use tempo::prelude::*;
//!
//! // A backend whose ticks do nothing.
//! struct Idle;
//! impl Simulation for Idle {
//!     fn tick(&self, _unit: &UnitHandle) -> Result<(), SimError> {
//!         Ok(())
//!     }
//!     fn track_visibility(&self, _unit: &UnitHandle) -> Result<(), SimError> {
//!         Ok(())
//!     }
//! }
//!
//! // Two fixed worlds.
//! struct Worlds(Vec<Arc<UnitHandle>>);
//! impl UnitRegistry for Worlds {
//!     fn active_units(&self) -> Vec<Arc<UnitHandle>> {
//!         self.0.clone()
//!     }
//! }
//!
//! // No connected clients.
//! struct NoClients;
//! impl FlushControl for NoClients {
//!     fn connected_endpoints(&self) -> Vec<EndpointId> {
//!         Vec::new()
//!     }
//!     fn connection_count(&self) -> usize {
//!         0
//!     }
//!     fn suspend_flush(&self, _endpoint: EndpointId) {}
//!     fn resume_flush(&self, _endpoint: EndpointId) {}
//! }
//!
//! let worlds = Worlds(
//!     (0..2).map(|i| Arc::new(UnitHandle::new(UnitId(i)))).collect(),
//! );
//! let config = SchedulerConfig {
//!     parallel_units: true,
//!     ..SchedulerConfig::default()
//! };
//! let mut scheduler = TickScheduler::new(
//!     Arc::new(Idle),
//!     Arc::new(worlds),
//!     Arc::new(NoClients),
//!     config,
//! )
//! .unwrap();
//!
//! scheduler.tick().unwrap();
//! assert_eq!(scheduler.current_tick(), TickId(1));
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types, traits, and IDs (`tempo-core`).
///
/// Contains the identifiers, the error taxonomy, [`types::UnitHandle`],
/// and the collaborator traits ([`types::Simulation`],
/// [`types::UnitRegistry`], [`types::FlushControl`]).
pub use tempo_core as types;

/// Tick scheduling and orchestration (`tempo-engine`).
///
/// [`engine::TickScheduler`] is the per-step entry point;
/// [`engine::Barrier`] and [`engine::WorkerPool`] are the reusable
/// synchronization and dispatch building blocks underneath it.
pub use tempo_engine as engine;

/// The most commonly used items, re-exported flat.
pub mod prelude {
    pub use tempo_core::{
        BarrierError, EndpointId, FlushControl, SimError, Simulation, TickError, TickId,
        TickPhase, UnitFailure, UnitHandle, UnitId, UnitRegistry,
    };
    pub use tempo_engine::{SchedulerConfig, SchedulerError, TickMetrics, TickScheduler};
}
