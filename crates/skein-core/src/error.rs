//! Error types for the Skein simulation kernel.

use std::error::Error;
use std::fmt;

use crate::id::ElementKey;

/// Errors raised by instruction readiness polls and completion effects.
///
/// Failures from user-supplied predicates or process bodies are not
/// represented here: those propagate as panics out of the driver call that
/// triggered them and abort the run. Re-polling a not-ready instruction is
/// scheduling, not error handling, and goes through
/// [`Readiness`](crate::Readiness) instead.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InstructionError {
    /// An allocation was requested for a zero amount.
    ZeroAllocation,
    /// An allocation was completed without the spare capacity to cover it.
    InsufficientCapacity {
        /// The amount the allocation asked for.
        requested: u32,
        /// The combined spare capacity actually available.
        available: u32,
    },
    /// A release targeted an allocation that was already released.
    AlreadyReleased,
    /// A release targeted an allocation that was never granted.
    NotGranted,
}

impl fmt::Display for InstructionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroAllocation => write!(f, "allocation amount must be nonzero"),
            Self::InsufficientCapacity {
                requested,
                available,
            } => write!(
                f,
                "insufficient spare capacity: requested {requested}, available {available}"
            ),
            Self::AlreadyReleased => write!(f, "allocation already released"),
            Self::NotGranted => write!(f, "allocation was never granted"),
        }
    }
}

impl Error for InstructionError {}

/// Errors returned from a simulation run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SimulationError {
    /// An instruction poll or completion effect failed while the driver was
    /// servicing a process.
    InstructionFailed {
        /// Key of the process whose instruction failed.
        process: ElementKey,
        /// The underlying instruction error.
        source: InstructionError,
    },
}

impl fmt::Display for SimulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InstructionFailed { process, source } => {
                write!(f, "instruction failed in process '{process}': {source}")
            }
        }
    }
}

impl Error for SimulationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InstructionFailed { source, .. } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_context() {
        let err = SimulationError::InstructionFailed {
            process: ElementKey::from("machine-1"),
            source: InstructionError::InsufficientCapacity {
                requested: 5,
                available: 2,
            },
        };
        let text = err.to_string();
        assert!(text.contains("machine-1"));
        assert!(text.contains("requested 5"));
        assert!(err.source().is_some());
    }

    #[test]
    fn double_release_is_distinct_from_never_granted() {
        assert_ne!(
            InstructionError::AlreadyReleased,
            InstructionError::NotGranted
        );
    }
}
