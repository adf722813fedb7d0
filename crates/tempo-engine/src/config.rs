//! Scheduler configuration and construction errors.

use std::error::Error;
use std::fmt;
use std::io;

/// Scheduling-mode configuration, consulted once at the start of each
/// `tick()` call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Advance units concurrently on the worker pool instead of one
    /// after another on the calling thread.
    pub parallel_units: bool,
    /// Split entity-visibility tracking into its own parallel phase
    /// with network flush suspended around it. Only takes effect
    /// together with `parallel_units`: tracking runs as the second
    /// phase of a concurrent tick, so the flag is inert in sequential
    /// mode.
    pub fully_parallel_tracking: bool,
}

/// Errors constructing a [`TickScheduler`](crate::TickScheduler).
#[derive(Debug)]
pub enum SchedulerError {
    /// The pool's initial worker thread could not be spawned.
    ThreadSpawnFailed {
        /// The underlying I/O error.
        source: io::Error,
    },
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ThreadSpawnFailed { source } => {
                write!(f, "could not spawn pool worker: {source}")
            }
        }
    }
}

impl Error for SchedulerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::ThreadSpawnFailed { source } => Some(source),
        }
    }
}
