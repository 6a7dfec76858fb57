//! Process activation, activity scheduling, and run control.

use std::any::Any;
use std::rc::Rc;

use skein_core::{InstructionError, Readiness, TimePeriod};

use crate::activity::{ActivityHandle, ActivityHostProcess};
use crate::context::SimulationContext;
use crate::instruction::Instruction;
use crate::process::ProcessHandle;

/// Return a process to scheduling.
///
/// Always ready; completion sets the target's active flag and adds it to
/// the active set. The process joins the work queue at the next period
/// rebuild, not the current one.
pub struct ActivateInstruction {
    process: ProcessHandle,
}

impl ActivateInstruction {
    /// Activate `process` on completion.
    pub fn new(process: ProcessHandle) -> Self {
        Self { process }
    }
}

impl Instruction for ActivateInstruction {
    fn can_complete(
        &mut self,
        _ctx: &SimulationContext,
        _raised_in: TimePeriod,
    ) -> Result<Readiness, InstructionError> {
        Ok(Readiness::Ready)
    }

    fn complete(&mut self, ctx: &SimulationContext) -> Result<(), InstructionError> {
        ctx.activate(&self.process);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Remove a process from scheduling.
///
/// Always ready; completion clears the target's active flag and removes it
/// from the active set. The target is not unwound and keeps any resources
/// it holds — releasing them stays the holder's responsibility.
pub struct DeactivateInstruction {
    process: ProcessHandle,
}

impl DeactivateInstruction {
    /// Deactivate `process` on completion.
    pub fn new(process: ProcessHandle) -> Self {
        Self { process }
    }
}

impl Instruction for DeactivateInstruction {
    fn can_complete(
        &mut self,
        _ctx: &SimulationContext,
        _raised_in: TimePeriod,
    ) -> Result<Readiness, InstructionError> {
        Ok(Readiness::Ready)
    }

    fn complete(&mut self, ctx: &SimulationContext) -> Result<(), InstructionError> {
        ctx.deactivate(&self.process);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Schedule an activity to run after a fixed delay.
///
/// Always ready; completion constructs and registers a new
/// [`ActivityHostProcess`] for the activity and activates it, so the host
/// enters scheduling at the next period rebuild and issues its wait first.
pub struct ScheduleActivityInstruction {
    activity: ActivityHandle,
    wait_time: u64,
}

impl ScheduleActivityInstruction {
    /// Host `activity` after `wait_time` periods.
    pub fn new(activity: ActivityHandle, wait_time: u64) -> Self {
        Self {
            activity,
            wait_time,
        }
    }
}

impl Instruction for ScheduleActivityInstruction {
    fn can_complete(
        &mut self,
        _ctx: &SimulationContext,
        _raised_in: TimePeriod,
    ) -> Result<Readiness, InstructionError> {
        Ok(Readiness::Ready)
    }

    fn complete(&mut self, ctx: &SimulationContext) -> Result<(), InstructionError> {
        let host = ActivityHostProcess::new(ctx, Rc::clone(&self.activity), self.wait_time);
        ctx.activate(&(host as ProcessHandle));
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Flag the run to stop at the next period boundary.
///
/// Always ready; completion sets the context's one-way stopping flag.
/// Processes already enqueued still run the current period to its fixed
/// point. Setting an already-set flag has no further effect.
pub struct StopSimulationInstruction;

impl StopSimulationInstruction {
    /// A stop request.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self
    }
}

impl Instruction for StopSimulationInstruction {
    fn can_complete(
        &mut self,
        _ctx: &SimulationContext,
        _raised_in: TimePeriod,
    ) -> Result<Readiness, InstructionError> {
        Ok(Readiness::Ready)
    }

    fn complete(&mut self, ctx: &SimulationContext) -> Result<(), InstructionError> {
        ctx.request_stop();
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Flag the run to terminate without finishing the current period.
///
/// Always ready; completion sets the context's one-way terminating flag;
/// the driver abandons the remaining work queue as soon as it observes it.
pub struct TerminateSimulationInstruction;

impl TerminateSimulationInstruction {
    /// A terminate request.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self
    }
}

impl Instruction for TerminateSimulationInstruction {
    fn can_complete(
        &mut self,
        _ctx: &SimulationContext,
        _raised_in: TimePeriod,
    ) -> Result<Readiness, InstructionError> {
        Ok(Readiness::Ready)
    }

    fn complete(&mut self, ctx: &SimulationContext) -> Result<(), InstructionError> {
        ctx.request_terminate();
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
