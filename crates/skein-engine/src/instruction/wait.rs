//! Time- and condition-based waiting.

use std::any::Any;

use skein_core::{InstructionError, Priority, Readiness, TimePeriod};

use crate::context::SimulationContext;
use crate::instruction::Instruction;

/// Hold the issuing process for a fixed number of periods.
///
/// Ready once the current period has reached the raise period plus the
/// wait; until then the poll reports exactly that period as its recheck
/// hint, so the driver can skip re-polling entirely.
pub struct WaitInstruction {
    periods: u64,
    priority: Priority,
}

impl WaitInstruction {
    /// Wait for `periods` periods from the raise period.
    pub fn new(periods: u64) -> Self {
        Self {
            periods,
            priority: Priority::Medium,
        }
    }

    /// Same wait with an explicit scheduling priority.
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// The number of periods to wait.
    pub fn periods(&self) -> u64 {
        self.periods
    }
}

impl Instruction for WaitInstruction {
    fn priority(&self) -> Priority {
        self.priority
    }

    fn can_complete(
        &mut self,
        ctx: &SimulationContext,
        raised_in: TimePeriod,
    ) -> Result<Readiness, InstructionError> {
        let due = raised_in.plus(self.periods);
        if ctx.time_period() >= due {
            Ok(Readiness::Ready)
        } else {
            Ok(Readiness::blocked_until(due))
        }
    }

    fn complete(&mut self, _ctx: &SimulationContext) -> Result<(), InstructionError> {
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Hold the issuing process until the period changes.
///
/// Not ready in the raise period, ready in any later one. Unlike
/// [`WaitInstruction`] it reports no recheck hint.
pub struct PassInstruction;

impl PassInstruction {
    /// A pass over the remainder of the current period.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self
    }
}

impl Instruction for PassInstruction {
    fn can_complete(
        &mut self,
        ctx: &SimulationContext,
        raised_in: TimePeriod,
    ) -> Result<Readiness, InstructionError> {
        if ctx.time_period() > raised_in {
            Ok(Readiness::Ready)
        } else {
            Ok(Readiness::blocked())
        }
    }

    fn complete(&mut self, _ctx: &SimulationContext) -> Result<(), InstructionError> {
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Hold the issuing process until a caller-supplied condition holds.
///
/// The predicate is evaluated on every poll; no recheck period is knowable,
/// so a blocked wait-condition is re-polled each period.
pub struct WaitConditionInstruction {
    condition: Box<dyn Fn() -> bool>,
}

impl WaitConditionInstruction {
    /// Wait until `condition` evaluates true.
    pub fn new(condition: impl Fn() -> bool + 'static) -> Self {
        Self {
            condition: Box::new(condition),
        }
    }
}

impl Instruction for WaitConditionInstruction {
    fn can_complete(
        &mut self,
        _ctx: &SimulationContext,
        _raised_in: TimePeriod,
    ) -> Result<Readiness, InstructionError> {
        if (self.condition)() {
            Ok(Readiness::Ready)
        } else {
            Ok(Readiness::blocked())
        }
    }

    fn complete(&mut self, _ctx: &SimulationContext) -> Result<(), InstructionError> {
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
