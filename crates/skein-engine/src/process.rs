//! The process execution model: lazy instruction production and per-process
//! run-time state.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use skein_core::{Capability, ElementKey, InstanceIndex, Priority, TimePeriod};

use crate::context::SimulationContext;
use crate::element::SimulationElement;
use crate::instruction::InstructionHandle;

/// A process's lazily produced instruction sequence.
///
/// The iterator is the process's suspended continuation: it is produced at
/// most once per process (single-pass, never restarted), yields exactly
/// one instruction per driver resumption, and its captured state persists
/// across arbitrarily many periods. Sequences may be finite or infinite.
pub type InstructionSequence = Box<dyn Iterator<Item = InstructionHandle>>;

/// Shared handle to a schedulable process.
pub type ProcessHandle = Rc<RefCell<dyn Process>>;

/// An independently scheduled simulation entity.
///
/// A concrete process supplies exactly one operation beyond its element
/// identity: [`simulate`](Process::simulate), which produces the lazy
/// instruction sequence the driver resumes one instruction at a time. The
/// kernel invokes `simulate` at most once per process, with the process
/// exclusively borrowed — implementations typically clone `Rc` handles to
/// whatever shared state the sequence needs and must not reach back into
/// their own cell through the context.
pub trait Process: SimulationElement {
    /// Per-context monotonic index, the final scheduling tie-break.
    fn instance_index(&self) -> InstanceIndex;

    /// Scheduling priority of the process itself.
    fn priority(&self) -> Priority {
        Priority::Medium
    }

    /// Run-time bookkeeping owned by the kernel.
    fn state(&self) -> &ProcessState;

    /// Mutable run-time bookkeeping.
    fn state_mut(&mut self) -> &mut ProcessState;

    /// Produce this process's instruction sequence.
    fn simulate(&mut self) -> InstructionSequence;
}

/// A produced-but-not-completed instruction together with the kernel's
/// bookkeeping for it.
pub struct PendingInstruction {
    instruction: InstructionHandle,
    raised_in: Option<TimePeriod>,
    recheck_at: Option<TimePeriod>,
}

impl PendingInstruction {
    fn new(instruction: InstructionHandle) -> Self {
        Self {
            instruction,
            raised_in: None,
            recheck_at: None,
        }
    }

    /// The pending instruction itself.
    pub fn instruction(&self) -> &InstructionHandle {
        &self.instruction
    }

    /// Period of the first driver evaluation, once stamped.
    pub fn raised_in(&self) -> Option<TimePeriod> {
        self.raised_in
    }

    /// Stamp the raise period on first evaluation; later calls keep the
    /// original stamp.
    pub(crate) fn stamp(&mut self, period: TimePeriod) -> TimePeriod {
        *self.raised_in.get_or_insert(period)
    }

    /// The last recheck hint reported by a blocked poll.
    pub fn recheck_at(&self) -> Option<TimePeriod> {
        self.recheck_at
    }

    pub(crate) fn set_recheck_at(&mut self, hint: Option<TimePeriod>) {
        self.recheck_at = hint;
    }
}

/// Per-process run-time state.
///
/// Created active; toggled by the activate/deactivate instructions; marked
/// complete when the instruction sequence is exhausted. An inactive process
/// is excluded from scheduling but keeps any resources it holds until an
/// explicit release.
pub struct ProcessState {
    active: bool,
    interrupted: bool,
    complete: bool,
    started: bool,
    pending: Option<PendingInstruction>,
    sequence: Option<InstructionSequence>,
}

impl Default for ProcessState {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessState {
    /// Fresh state: active, not interrupted, not complete, nothing pending.
    pub fn new() -> Self {
        Self {
            active: true,
            interrupted: false,
            complete: false,
            started: false,
            pending: None,
            sequence: None,
        }
    }

    /// Whether the process participates in scheduling.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Set the scheduling flag. Membership in the context's active set is
    /// maintained by [`SimulationContext::activate`] and
    /// [`SimulationContext::deactivate`], which call this.
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Whether the process has been interrupted.
    pub fn is_interrupted(&self) -> bool {
        self.interrupted
    }

    /// Set the interrupted flag. The kernel carries this flag but never
    /// acts on it; cancellation stays cooperative.
    pub fn set_interrupted(&mut self, interrupted: bool) {
        self.interrupted = interrupted;
    }

    /// Whether the instruction sequence has been exhausted.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub(crate) fn mark_complete(&mut self) {
        self.complete = true;
    }

    /// The instruction produced but not yet completed, if any.
    pub fn pending(&self) -> Option<&PendingInstruction> {
        self.pending.as_ref()
    }

    pub(crate) fn pending_mut(&mut self) -> Option<&mut PendingInstruction> {
        self.pending.as_mut()
    }

    pub(crate) fn set_pending(&mut self, instruction: InstructionHandle) {
        self.pending = Some(PendingInstruction::new(instruction));
    }

    pub(crate) fn clear_pending(&mut self) {
        self.pending = None;
    }

    pub(crate) fn has_started(&self) -> bool {
        self.started
    }

    pub(crate) fn mark_started(&mut self) {
        self.started = true;
    }

    /// Detach the stored continuation so the driver can resume it without
    /// holding the process borrowed.
    pub(crate) fn take_sequence(&mut self) -> Option<InstructionSequence> {
        self.sequence.take()
    }

    pub(crate) fn store_sequence(&mut self, sequence: InstructionSequence) {
        self.sequence = Some(sequence);
    }
}

/// Identity, priority, and state shared by every process implementation.
///
/// Concrete processes embed a `ProcessCore` and delegate their
/// [`SimulationElement`] and [`Process`] plumbing to it; only
/// [`Process::simulate`] is theirs to write.
pub struct ProcessCore {
    key: ElementKey,
    index: InstanceIndex,
    priority: Priority,
    state: ProcessState,
}

impl ProcessCore {
    /// Allocate identity from `ctx` with a fresh auto key.
    pub fn new(ctx: &SimulationContext) -> Self {
        Self::with_key(ctx, ctx.auto_key())
    }

    /// Allocate identity from `ctx` under a caller-supplied key.
    pub fn with_key(ctx: &SimulationContext, key: impl Into<ElementKey>) -> Self {
        Self {
            key: key.into(),
            index: ctx.allocate_instance_index(),
            priority: Priority::Medium,
            state: ProcessState::new(),
        }
    }

    /// The element key.
    pub fn key(&self) -> &ElementKey {
        &self.key
    }

    /// The instance index.
    pub fn instance_index(&self) -> InstanceIndex {
        self.index
    }

    /// The process priority.
    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// Change the process priority.
    pub fn set_priority(&mut self, priority: Priority) {
        self.priority = priority;
    }

    /// The run-time state.
    pub fn state(&self) -> &ProcessState {
        &self.state
    }

    /// Mutable run-time state.
    pub fn state_mut(&mut self) -> &mut ProcessState {
        &mut self.state
    }

    /// The capability tags every plain process satisfies.
    pub fn capabilities() -> &'static [Capability] {
        &[Capability::ELEMENT, Capability::PROCESS]
    }
}

/// A process that produces an empty sequence and completes on its first
/// resumption.
pub struct IdleProcess {
    core: ProcessCore,
}

impl IdleProcess {
    /// Construct and register an idle process.
    pub fn new(ctx: &SimulationContext) -> Rc<RefCell<IdleProcess>> {
        let process = Rc::new(RefCell::new(IdleProcess {
            core: ProcessCore::new(ctx),
        }));
        ctx.register_process(Rc::clone(&process));
        process
    }
}

impl SimulationElement for IdleProcess {
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

impl Process for IdleProcess {
    fn instance_index(&self) -> InstanceIndex {
        self.core.instance_index()
    }

    fn state(&self) -> &ProcessState {
        self.core.state()
    }

    fn state_mut(&mut self) -> &mut ProcessState {
        self.core.state_mut()
    }

    fn simulate(&mut self) -> InstructionSequence {
        Box::new(std::iter::empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_state_is_active_and_incomplete() {
        let state = ProcessState::new();
        assert!(state.is_active());
        assert!(!state.is_interrupted());
        assert!(!state.is_complete());
        assert!(state.pending().is_none());
    }

    #[test]
    fn instance_indices_are_monotonic_per_context() {
        let ctx = SimulationContext::new();
        let a = IdleProcess::new(&ctx);
        let b = IdleProcess::new(&ctx);
        assert!(a.borrow().instance_index() < b.borrow().instance_index());

        let other = SimulationContext::new();
        let c = IdleProcess::new(&other);
        assert_eq!(c.borrow().instance_index(), a.borrow().instance_index());
    }

    #[test]
    fn idle_process_registers_under_process_capability() {
        let ctx = SimulationContext::new();
        let process = IdleProcess::new(&ctx);
        let registered = ctx.get_by_capability(Capability::PROCESS);
        assert_eq!(registered.len(), 1);
        let key = process.borrow().key().clone();
        assert_eq!(registered[0].borrow().key(), &key);
    }

    #[test]
    fn idle_sequence_is_empty() {
        let ctx = SimulationContext::new();
        let process = IdleProcess::new(&ctx);
        let mut sequence = process.borrow_mut().simulate();
        assert!(sequence.next().is_none());
    }

    #[test]
    fn stamp_keeps_the_first_period() {
        let ctx = SimulationContext::new();
        let process = IdleProcess::new(&ctx);
        let wait = crate::instruction::handle(crate::instruction::WaitInstruction::new(1));
        let mut p = process.borrow_mut();
        p.state_mut().set_pending(wait);
        let pending = p.state_mut().pending_mut().unwrap();
        assert_eq!(pending.stamp(TimePeriod(2)), TimePeriod(2));
        assert_eq!(pending.stamp(TimePeriod(5)), TimePeriod(2));
    }
}
