//! The result of polling an instruction for readiness.

use crate::id::TimePeriod;

/// Outcome of an instruction readiness poll.
///
/// `recheck_at` is an advisory hint for the earliest period at which
/// re-evaluation might newly succeed; the driver may use it to skip
/// pointless polls, but correctness never depends on honoring it — a
/// deferred instruction is re-evaluated once its process is next cycled
/// into a period queue.
///
/// # Examples
///
/// ```
/// use skein_core::{Readiness, TimePeriod};
///
/// let blocked = Readiness::blocked_until(TimePeriod(9));
/// assert!(!blocked.is_ready());
/// assert_eq!(blocked.recheck_at(), Some(TimePeriod(9)));
/// assert!(Readiness::Ready.is_ready());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Readiness {
    /// The instruction can complete in the current period.
    Ready,
    /// The instruction cannot complete yet.
    Blocked {
        /// Earliest period at which another poll might succeed, if knowable.
        recheck_at: Option<TimePeriod>,
    },
}

impl Readiness {
    /// Blocked with no knowable recheck period (poll again every period).
    pub fn blocked() -> Readiness {
        Readiness::Blocked { recheck_at: None }
    }

    /// Blocked until at least `period`.
    pub fn blocked_until(period: TimePeriod) -> Readiness {
        Readiness::Blocked {
            recheck_at: Some(period),
        }
    }

    /// Whether this poll reported ready.
    pub fn is_ready(&self) -> bool {
        matches!(self, Readiness::Ready)
    }

    /// The recheck hint, if blocked with one.
    pub fn recheck_at(&self) -> Option<TimePeriod> {
        match self {
            Readiness::Ready => None,
            Readiness::Blocked { recheck_at } => *recheck_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_round_trip() {
        assert_eq!(Readiness::blocked(), Readiness::Blocked { recheck_at: None });
        assert_eq!(
            Readiness::blocked_until(TimePeriod(4)).recheck_at(),
            Some(TimePeriod(4))
        );
        assert_eq!(Readiness::Ready.recheck_at(), None);
    }
}
