//! Tick scheduling, barriers, and worker-pool orchestration for Tempo.
//!
//! Provides the [`TickScheduler`] that advances every hosted simulation
//! unit once per fixed time step, either inline on the calling thread
//! or fanned out over an elastic worker pool with a reusable countdown
//! [`Barrier`] at each phase boundary.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod barrier;
pub mod config;
pub mod flush;
pub mod metrics;
pub mod pool;
pub mod scheduler;
pub mod ticker;

pub use barrier::Barrier;
pub use config::{SchedulerConfig, SchedulerError};
pub use flush::FlushPause;
pub use metrics::TickMetrics;
pub use pool::WorkerPool;
pub use scheduler::TickScheduler;
pub use ticker::{FailureRecord, FailureSink, UnitTicker};
