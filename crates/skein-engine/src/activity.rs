//! Activities and the host process that drives them.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use skein_core::{Capability, ElementKey, InstanceIndex};

use crate::context::SimulationContext;
use crate::element::SimulationElement;
use crate::instruction::{handle, WaitInstruction};
use crate::process::{InstructionSequence, Process, ProcessCore, ProcessState};

/// A reusable instruction-producing entity.
///
/// Same production contract as [`Process::simulate`] — lazy, single-pass,
/// one instruction per resumption — but an activity is never scheduled
/// directly; it only runs inside an [`ActivityHostProcess`].
pub trait Activity: 'static {
    /// Produce the activity's instruction sequence.
    fn simulate(&mut self) -> InstructionSequence;
}

/// Shared handle to an activity.
pub type ActivityHandle = Rc<RefCell<dyn Activity>>;

/// A process that waits a fixed delay, then drives a hosted activity to
/// completion.
///
/// Produces exactly: one wait for `wait_time` periods, then every
/// instruction produced by the activity, forwarded unchanged until the
/// activity's sequence is exhausted. The activity's sequence is produced
/// lazily, on the first resumption after the wait completes.
pub struct ActivityHostProcess {
    core: ProcessCore,
    activity: ActivityHandle,
    wait_time: u64,
}

impl ActivityHostProcess {
    /// Construct and register a host for `activity`.
    pub fn new(
        ctx: &SimulationContext,
        activity: ActivityHandle,
        wait_time: u64,
    ) -> Rc<RefCell<ActivityHostProcess>> {
        let host = Rc::new(RefCell::new(ActivityHostProcess {
            core: ProcessCore::new(ctx),
            activity,
            wait_time,
        }));
        ctx.register_process(Rc::clone(&host));
        host
    }

    /// Periods to wait before the activity starts.
    pub fn wait_time(&self) -> u64 {
        self.wait_time
    }

    /// The hosted activity.
    pub fn activity(&self) -> &ActivityHandle {
        &self.activity
    }
}

impl SimulationElement for ActivityHostProcess {
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

impl Process for ActivityHostProcess {
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
        let wait = handle(WaitInstruction::new(self.wait_time));
        let forwarded = ForwardedActivity {
            activity: Rc::clone(&self.activity),
            sequence: None,
        };
        Box::new(std::iter::once(wait).chain(forwarded))
    }
}

/// Iterator adapter that produces the activity's sequence on first demand
/// and then forwards it unchanged.
struct ForwardedActivity {
    activity: ActivityHandle,
    sequence: Option<InstructionSequence>,
}

impl Iterator for ForwardedActivity {
    type Item = crate::instruction::InstructionHandle;

    fn next(&mut self) -> Option<Self::Item> {
        if self.sequence.is_none() {
            self.sequence = Some(self.activity.borrow_mut().simulate());
        }
        self.sequence.as_mut().and_then(Iterator::next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::PassInstruction;

    struct OnePass;

    impl Activity for OnePass {
        fn simulate(&mut self) -> InstructionSequence {
            Box::new(std::iter::once(handle(PassInstruction::new())))
        }
    }

    #[test]
    fn host_produces_wait_then_activity_instructions() {
        let ctx = SimulationContext::new();
        let activity: ActivityHandle = Rc::new(RefCell::new(OnePass));
        let host = ActivityHostProcess::new(&ctx, activity, 10);

        assert!(host.borrow().state().is_active());
        assert_eq!(host.borrow().wait_time(), 10);

        let mut sequence = host.borrow_mut().simulate();
        let first = sequence.next().expect("wait instruction");
        {
            let borrowed = first.borrow();
            let wait = borrowed
                .as_any()
                .downcast_ref::<WaitInstruction>()
                .expect("first instruction is the wait");
            assert_eq!(wait.periods(), 10);
        }
        let second = sequence.next().expect("forwarded activity instruction");
        assert!(second
            .borrow()
            .as_any()
            .downcast_ref::<PassInstruction>()
            .is_some());
        assert!(sequence.next().is_none());
    }

    #[test]
    fn host_registers_as_a_process() {
        let ctx = SimulationContext::new();
        let activity: ActivityHandle = Rc::new(RefCell::new(OnePass));
        let _host = ActivityHostProcess::new(&ctx, activity, 1);
        assert_eq!(ctx.get_by_capability(Capability::PROCESS).len(), 1);
    }
}
