//! Grouping instructions into a single all-or-nothing unit.

use std::any::Any;

use skein_core::{InstructionError, Readiness, TimePeriod};

use crate::context::SimulationContext;
use crate::instruction::{Instruction, InstructionHandle};

/// A group of instructions that completes as one unit.
///
/// The poll is ready only when every member is ready, and every member is
/// polled on every evaluation — no short-circuiting, so members that track
/// their own poll-time state observe each poll. The recheck hint is the
/// minimum over the non-ready members' hints, or none if any non-ready
/// member reports none (or if the composite is ready). Completion runs
/// every member's effect in order; the first member error aborts the rest.
pub struct CompositeInstruction {
    members: Vec<InstructionHandle>,
}

impl CompositeInstruction {
    /// Group `members` into one instruction.
    pub fn new(members: Vec<InstructionHandle>) -> Self {
        Self { members }
    }

    /// The grouped instructions.
    pub fn members(&self) -> &[InstructionHandle] {
        &self.members
    }
}

impl Instruction for CompositeInstruction {
    fn can_complete(
        &mut self,
        ctx: &SimulationContext,
        raised_in: TimePeriod,
    ) -> Result<Readiness, InstructionError> {
        let mut all_ready = true;
        let mut recheck_at = None;
        let mut unknowable = false;

        // Members never individually enter the driver, so they share the
        // composite's raise period.
        for member in &self.members {
            match member.borrow_mut().can_complete(ctx, raised_in)? {
                Readiness::Ready => {}
                Readiness::Blocked { recheck_at: hint } => {
                    all_ready = false;
                    match hint {
                        Some(period) => {
                            recheck_at =
                                Some(recheck_at.map_or(period, |r: TimePeriod| r.min(period)));
                        }
                        None => unknowable = true,
                    }
                }
            }
        }

        if all_ready {
            Ok(Readiness::Ready)
        } else if unknowable {
            Ok(Readiness::blocked())
        } else {
            Ok(Readiness::Blocked { recheck_at })
        }
    }

    fn complete(&mut self, ctx: &SimulationContext) -> Result<(), InstructionError> {
        for member in &self.members {
            member.borrow_mut().complete(ctx)?;
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::handle;
    use skein_test_utils::ProbeInstruction;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn probes(n: u64) -> (Vec<Rc<RefCell<ProbeInstruction>>>, CompositeInstruction) {
        let probes: Vec<Rc<RefCell<ProbeInstruction>>> = (1..=n)
            .map(|i| {
                Rc::new(RefCell::new(
                    ProbeInstruction::ready().with_recheck_at(TimePeriod(i)),
                ))
            })
            .collect();
        let members = probes
            .iter()
            .map(|p| Rc::clone(p) as InstructionHandle)
            .collect();
        (probes, CompositeInstruction::new(members))
    }

    #[test]
    fn ready_only_when_every_member_is_ready() {
        let ctx = SimulationContext::new();
        let (members, mut composite) = probes(10);

        let polled = composite.can_complete(&ctx, TimePeriod(0)).unwrap();
        assert!(polled.is_ready());
        assert_eq!(polled.recheck_at(), None);
        for member in &members {
            assert_eq!(member.borrow().polls(), 1);
        }

        for member in members.iter().take(4) {
            member.borrow_mut().set_ready(false);
        }
        let polled = composite.can_complete(&ctx, TimePeriod(0)).unwrap();
        assert!(!polled.is_ready());
        // Every member polled again, despite the early not-ready results.
        for member in &members {
            assert_eq!(member.borrow().polls(), 2);
        }
        // The hint is the lowest of the non-ready members' hints.
        assert_eq!(polled.recheck_at(), Some(TimePeriod(1)));
    }

    #[test]
    fn hint_collapses_to_none_when_any_member_has_none() {
        let ctx = SimulationContext::new();
        let (members, mut composite) = probes(3);
        members[0].borrow_mut().set_ready(false);
        members[0].borrow_mut().set_recheck_at(None);
        members[2].borrow_mut().set_ready(false);

        let polled = composite.can_complete(&ctx, TimePeriod(0)).unwrap();
        assert!(!polled.is_ready());
        assert_eq!(polled.recheck_at(), None);
    }

    #[test]
    fn completion_reaches_every_member_in_order() {
        let ctx = SimulationContext::new();
        let (members, mut composite) = probes(5);

        composite.complete(&ctx).unwrap();
        for member in &members {
            assert_eq!(member.borrow().completions(), 1);
        }
    }
}
