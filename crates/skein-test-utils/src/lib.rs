//! Scripted processes, activities, and instructions for Skein tests.
//!
//! These types let tests drive the kernel with fully predetermined
//! behavior: [`SequenceProcess`] yields a fixed instruction list,
//! [`ListActivity`] does the same as a hosted activity, and
//! [`ProbeInstruction`] reports a configurable readiness while counting
//! how often the driver polled and completed it.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use skein_core::{
    Capability, ElementKey, InstanceIndex, InstructionError, Priority, Readiness, TimePeriod,
};
use skein_engine::activity::Activity;
use skein_engine::context::SimulationContext;
use skein_engine::element::SimulationElement;
use skein_engine::instruction::{Instruction, InstructionHandle};
use skein_engine::process::{InstructionSequence, Process, ProcessCore, ProcessState};

/// A process that yields a fixed, pre-built list of instructions in order.
pub struct SequenceProcess {
    core: ProcessCore,
    instructions: Vec<InstructionHandle>,
}

impl SequenceProcess {
    /// Construct and register a process yielding `instructions` in order.
    pub fn new(
        ctx: &SimulationContext,
        instructions: Vec<InstructionHandle>,
    ) -> Rc<RefCell<SequenceProcess>> {
        Self::build(ctx, Priority::Medium, instructions)
    }

    /// Same, with an explicit process priority.
    pub fn with_priority(
        ctx: &SimulationContext,
        priority: Priority,
        instructions: Vec<InstructionHandle>,
    ) -> Rc<RefCell<SequenceProcess>> {
        Self::build(ctx, priority, instructions)
    }

    fn build(
        ctx: &SimulationContext,
        priority: Priority,
        instructions: Vec<InstructionHandle>,
    ) -> Rc<RefCell<SequenceProcess>> {
        let mut core = ProcessCore::new(ctx);
        core.set_priority(priority);
        let process = Rc::new(RefCell::new(SequenceProcess { core, instructions }));
        ctx.register_process(Rc::clone(&process));
        process
    }
}

impl SimulationElement for SequenceProcess {
    fn key(&self) -> &ElementKey {
        self.core.key()
    }

    fn capabilities(&self) -> &[Capability] {
        ProcessCore::capabilities()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn as_process(&self) -> Option<&dyn Process> {
        Some(self)
    }
}

impl Process for SequenceProcess {
    fn instance_index(&self) -> InstanceIndex {
        self.core.instance_index()
    }

    fn priority(&self) -> Priority {
        self.core.priority()
    }

    fn state(&self) -> &ProcessState {
        self.core.state()
    }

    fn state_mut(&mut self) -> &mut ProcessState {
        self.core.state_mut()
    }

    fn simulate(&mut self) -> InstructionSequence {
        Box::new(self.instructions.clone().into_iter())
    }
}

/// An activity that yields a fixed, pre-built list of instructions.
pub struct ListActivity {
    instructions: Vec<InstructionHandle>,
}

impl ListActivity {
    pub fn new(instructions: Vec<InstructionHandle>) -> Rc<RefCell<ListActivity>> {
        Rc::new(RefCell::new(ListActivity { instructions }))
    }
}

impl Activity for ListActivity {
    fn simulate(&mut self) -> InstructionSequence {
        Box::new(self.instructions.clone().into_iter())
    }
}

/// An instruction with scripted readiness and poll/completion counters.
///
/// Tests hold the typed `Rc<RefCell<ProbeInstruction>>` to reconfigure the
/// probe or read its counters while the kernel drives it through an
/// [`InstructionHandle`].
pub struct ProbeInstruction {
    ready: bool,
    recheck_at: Option<TimePeriod>,
    priority: Priority,
    polls: u64,
    completions: u64,
}

impl ProbeInstruction {
    /// A probe that reports ready on every poll.
    pub fn ready() -> Self {
        Self::with_readiness(true)
    }

    /// A probe that reports blocked (no recheck hint) on every poll.
    pub fn blocked() -> Self {
        Self::with_readiness(false)
    }

    fn with_readiness(ready: bool) -> Self {
        Self {
            ready,
            recheck_at: None,
            priority: Priority::Medium,
            polls: 0,
            completions: 0,
        }
    }

    /// Builder: report this recheck hint while blocked.
    pub fn with_recheck_at(mut self, period: TimePeriod) -> Self {
        self.recheck_at = Some(period);
        self
    }

    /// Builder: report this instruction priority.
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }

    pub fn set_recheck_at(&mut self, recheck_at: Option<TimePeriod>) {
        self.recheck_at = recheck_at;
    }

    /// How often `can_complete` ran.
    pub fn polls(&self) -> u64 {
        self.polls
    }

    /// How often `complete` ran.
    pub fn completions(&self) -> u64 {
        self.completions
    }
}

impl Instruction for ProbeInstruction {
    fn priority(&self) -> Priority {
        self.priority
    }

    fn can_complete(
        &mut self,
        _ctx: &SimulationContext,
        _raised_in: TimePeriod,
    ) -> Result<Readiness, InstructionError> {
        self.polls += 1;
        if self.ready {
            Ok(Readiness::Ready)
        } else {
            Ok(Readiness::Blocked {
                recheck_at: self.recheck_at,
            })
        }
    }

    fn complete(&mut self, _ctx: &SimulationContext) -> Result<(), InstructionError> {
        self.completions += 1;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// An instruction that fails with the given error, for driver error paths.
pub struct FailingInstruction {
    error: InstructionError,
    fail_on_poll: bool,
}

impl FailingInstruction {
    /// Fail from `can_complete`.
    pub fn on_poll(error: InstructionError) -> Self {
        Self {
            error,
            fail_on_poll: true,
        }
    }

    /// Poll ready, then fail from `complete`.
    pub fn on_complete(error: InstructionError) -> Self {
        Self {
            error,
            fail_on_poll: false,
        }
    }
}

impl Instruction for FailingInstruction {
    fn can_complete(
        &mut self,
        _ctx: &SimulationContext,
        _raised_in: TimePeriod,
    ) -> Result<Readiness, InstructionError> {
        if self.fail_on_poll {
            Err(self.error)
        } else {
            Ok(Readiness::Ready)
        }
    }

    fn complete(&mut self, _ctx: &SimulationContext) -> Result<(), InstructionError> {
        Err(self.error)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
