//! Error types for the Tempo scheduler, organized by subsystem:
//! simulation backend, barrier protocol, and whole-tick results.

use std::error::Error;
use std::fmt;

use crate::id::UnitId;

/// Errors raised by the simulation backend while advancing a unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SimError {
    /// The backend's step logic failed.
    ExecutionFailed {
        /// Human-readable description of the failure.
        reason: String,
    },
    /// The backend panicked mid-step. The panic is caught at the ticker
    /// boundary so the phase barrier still counts down; the payload
    /// message is preserved here.
    Panicked {
        /// The panic payload, if it was a string.
        message: String,
    },
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExecutionFailed { reason } => write!(f, "execution failed: {reason}"),
            Self::Panicked { message } => write!(f, "backend panicked: {message}"),
        }
    }
}

impl Error for SimError {}

/// The phase of a tick in which a failure occurred.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TickPhase {
    /// The main world-advance phase.
    Tick,
    /// The entity-visibility tracking phase.
    Tracking,
}

impl fmt::Display for TickPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tick => write!(f, "tick"),
            Self::Tracking => write!(f, "tracking"),
        }
    }
}

/// Errors from the reusable countdown barrier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BarrierError {
    /// `decrement()` was called with the count already at zero — a
    /// duplicate completion signal, which means a scheduling bug.
    Underflow,
    /// The blocking wait was cancelled before the count reached zero.
    WaitCancelled,
}

impl fmt::Display for BarrierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Underflow => write!(f, "barrier decremented below zero"),
            Self::WaitCancelled => write!(f, "barrier wait cancelled"),
        }
    }
}

impl Error for BarrierError {}

/// One unit's failure during one phase of a tick.
///
/// Sibling units are unaffected: the scheduler aggregates these and
/// reports them together after the phase barrier drains.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnitFailure {
    /// The unit that failed.
    pub unit: UnitId,
    /// The phase in which it failed.
    pub phase: TickPhase,
    /// The underlying backend error.
    pub error: SimError,
}

impl fmt::Display for UnitFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unit {} failed in {} phase: {}",
            self.unit, self.phase, self.error
        )
    }
}

impl Error for UnitFailure {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.error)
    }
}

/// Error returned from a whole `tick()` invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TickError {
    /// Barrier underflow or a cancelled wait. Structural: the current
    /// tick is unrecoverable and the caller decides whether to retry or
    /// shut down.
    Barrier(BarrierError),
    /// One or more units failed. Every sibling unit still ran to
    /// completion before this was reported.
    UnitsFailed(Vec<UnitFailure>),
}

impl fmt::Display for TickError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Barrier(e) => write!(f, "barrier protocol failure: {e}"),
            Self::UnitsFailed(failures) => {
                write!(f, "{} unit(s) failed", failures.len())?;
                if let Some(first) = failures.first() {
                    write!(f, "; first: {first}")?;
                }
                Ok(())
            }
        }
    }
}

impl Error for TickError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Barrier(e) => Some(e),
            Self::UnitsFailed(failures) => failures.first().map(|f| f as &(dyn Error + 'static)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_failure_display_names_unit_and_phase() {
        let failure = UnitFailure {
            unit: UnitId(3),
            phase: TickPhase::Tracking,
            error: SimError::ExecutionFailed {
                reason: "chunk load".into(),
            },
        };
        let text = failure.to_string();
        assert!(text.contains("unit 3"));
        assert!(text.contains("tracking"));
        assert!(text.contains("chunk load"));
    }

    #[test]
    fn tick_error_source_chains_to_first_failure() {
        let err = TickError::UnitsFailed(vec![UnitFailure {
            unit: UnitId(0),
            phase: TickPhase::Tick,
            error: SimError::Panicked {
                message: "boom".into(),
            },
        }]);
        let source = err.source().expect("has source");
        assert!(source.to_string().contains("unit 0"));
    }

    #[test]
    fn barrier_error_display() {
        assert_eq!(
            TickError::Barrier(BarrierError::Underflow).to_string(),
            "barrier protocol failure: barrier decremented below zero"
        );
    }
}
