//! All-or-nothing resource allocation and its reversal.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use skein_core::{Capability, ElementKey, InstructionError, Priority, Readiness, TimePeriod};
use smallvec::SmallVec;

use crate::context::SimulationContext;
use crate::instruction::Instruction;

/// Per-resource quantities granted by a completed allocation.
pub type GrantList = SmallVec<[(ElementKey, u32); 4]>;

/// Claim `amount` units of spare capacity from the resources of one kind.
///
/// The allocation is all-or-nothing: the poll is ready only when the
/// combined spare capacity of every resource registered under `kind`
/// covers the full amount, and a blocked poll carries no recheck hint —
/// capacity freeing cannot be predicted, so the driver re-polls every
/// period. Completion spreads the claim across one or more resources in
/// registration order and records each grant so a later
/// [`ReleaseInstruction`] can reverse them exactly.
pub struct AllocateInstruction {
    kind: Capability,
    amount: u32,
    priority: Priority,
    allocations: GrantList,
    granted: bool,
    released: bool,
}

impl AllocateInstruction {
    /// Allocate `amount` units from the resources tagged `kind`.
    pub fn new(kind: Capability, amount: u32) -> Self {
        Self {
            kind,
            amount,
            priority: Priority::Medium,
            allocations: GrantList::new(),
            granted: false,
            released: false,
        }
    }

    /// Same allocation with an explicit scheduling priority.
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// The resource kind this allocation draws from.
    pub fn kind(&self) -> Capability {
        self.kind
    }

    /// The requested amount.
    pub fn amount(&self) -> u32 {
        self.amount
    }

    /// The per-resource grants recorded at completion.
    pub fn allocations(&self) -> &[(ElementKey, u32)] {
        &self.allocations
    }

    /// Whether the allocation has been granted.
    pub fn is_granted(&self) -> bool {
        self.granted
    }

    /// Whether the allocation has been released again.
    pub fn is_released(&self) -> bool {
        self.released
    }

    fn spare_capacity(&self, ctx: &SimulationContext) -> u32 {
        ctx.get_by_capability(self.kind)
            .iter()
            .filter_map(|h| h.borrow().as_resource().map(|r| r.spare()))
            .sum()
    }

    pub(crate) fn release_grants(&mut self, ctx: &SimulationContext) -> Result<(), InstructionError> {
        if !self.granted {
            return Err(InstructionError::NotGranted);
        }
        if self.released {
            return Err(InstructionError::AlreadyReleased);
        }
        for (key, amount) in &self.allocations {
            if let Some(resource) = ctx.get_by_key(Capability::RESOURCE, key) {
                let mut el = resource.borrow_mut();
                if let Some(r) = el.as_resource_mut() {
                    r.release(*amount);
                }
            }
        }
        self.released = true;
        Ok(())
    }
}

impl Instruction for AllocateInstruction {
    fn priority(&self) -> Priority {
        self.priority
    }

    fn can_complete(
        &mut self,
        ctx: &SimulationContext,
        _raised_in: TimePeriod,
    ) -> Result<Readiness, InstructionError> {
        if self.amount == 0 {
            return Err(InstructionError::ZeroAllocation);
        }
        if self.spare_capacity(ctx) >= self.amount {
            Ok(Readiness::Ready)
        } else {
            Ok(Readiness::blocked())
        }
    }

    fn complete(&mut self, ctx: &SimulationContext) -> Result<(), InstructionError> {
        if self.amount == 0 {
            return Err(InstructionError::ZeroAllocation);
        }
        let available = self.spare_capacity(ctx);
        if available < self.amount {
            return Err(InstructionError::InsufficientCapacity {
                requested: self.amount,
                available,
            });
        }

        let mut remaining = self.amount;
        for handle in ctx.get_by_capability(self.kind) {
            if remaining == 0 {
                break;
            }
            let mut el = handle.borrow_mut();
            let Some(resource) = el.as_resource_mut() else {
                continue;
            };
            let take = remaining.min(resource.spare());
            if take > 0 {
                resource.allocate(take);
                self.allocations.push((el.key().clone(), take));
                remaining -= take;
            }
        }
        self.granted = true;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Return every grant of a completed allocation to its resource.
///
/// Always ready. Completion reverses the allocation's recorded grants
/// exactly and marks it released; releasing an allocation that was never
/// granted, or releasing one twice, is an error.
pub struct ReleaseInstruction {
    allocation: Rc<RefCell<AllocateInstruction>>,
}

impl ReleaseInstruction {
    /// Release the grants recorded by `allocation`.
    pub fn new(allocation: Rc<RefCell<AllocateInstruction>>) -> Self {
        Self { allocation }
    }
}

impl Instruction for ReleaseInstruction {
    fn can_complete(
        &mut self,
        _ctx: &SimulationContext,
        _raised_in: TimePeriod,
    ) -> Result<Readiness, InstructionError> {
        Ok(Readiness::Ready)
    }

    fn complete(&mut self, ctx: &SimulationContext) -> Result<(), InstructionError> {
        self.allocation.borrow_mut().release_grants(ctx)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::Resource;

    const CREW: Capability = Capability::user(0);

    #[test]
    fn allocation_takes_from_resources_in_registration_order() {
        let ctx = SimulationContext::new();
        let first = Resource::with_key(&ctx, "first", CREW, 3);
        let second = Resource::with_key(&ctx, "second", CREW, 3);

        let mut alloc = AllocateInstruction::new(CREW, 4);
        assert!(alloc.can_complete(&ctx, TimePeriod(0)).unwrap().is_ready());
        alloc.complete(&ctx).unwrap();

        assert_eq!(first.borrow().allocated(), 3);
        assert_eq!(second.borrow().allocated(), 1);
        assert!(alloc.is_granted());
        assert_eq!(
            alloc.allocations(),
            &[
                (ElementKey::from("first"), 3),
                (ElementKey::from("second"), 1)
            ]
        );
    }

    #[test]
    fn blocked_allocation_reports_no_recheck_hint() {
        let ctx = SimulationContext::new();
        let _crew = Resource::new(&ctx, CREW, 2);

        let mut alloc = AllocateInstruction::new(CREW, 3);
        let polled = alloc.can_complete(&ctx, TimePeriod(0)).unwrap();
        assert!(!polled.is_ready());
        assert_eq!(polled.recheck_at(), None);
    }

    #[test]
    fn insufficient_capacity_leaves_resources_untouched() {
        let ctx = SimulationContext::new();
        let crew = Resource::new(&ctx, CREW, 2);

        let mut alloc = AllocateInstruction::new(CREW, 5);
        assert_eq!(
            alloc.complete(&ctx),
            Err(InstructionError::InsufficientCapacity {
                requested: 5,
                available: 2,
            })
        );
        assert_eq!(crew.borrow().allocated(), 0);
        assert!(!alloc.is_granted());
    }

    #[test]
    fn zero_amount_is_rejected() {
        let ctx = SimulationContext::new();
        let mut alloc = AllocateInstruction::new(CREW, 0);
        assert_eq!(
            alloc.can_complete(&ctx, TimePeriod(0)),
            Err(InstructionError::ZeroAllocation)
        );
    }

    #[test]
    fn release_restores_the_preallocation_state_exactly() {
        let ctx = SimulationContext::new();
        let crew = Resource::new(&ctx, CREW, 5);

        let alloc = Rc::new(RefCell::new(AllocateInstruction::new(CREW, 5)));
        alloc.borrow_mut().complete(&ctx).unwrap();
        assert_eq!(crew.borrow().allocated(), 5);

        let mut release = ReleaseInstruction::new(Rc::clone(&alloc));
        assert!(release
            .can_complete(&ctx, TimePeriod(0))
            .unwrap()
            .is_ready());
        release.complete(&ctx).unwrap();

        assert_eq!(crew.borrow().allocated(), 0);
        assert!(alloc.borrow().is_released());
    }

    #[test]
    fn double_release_fails() {
        let ctx = SimulationContext::new();
        let _crew = Resource::new(&ctx, CREW, 2);

        let alloc = Rc::new(RefCell::new(AllocateInstruction::new(CREW, 1)));
        alloc.borrow_mut().complete(&ctx).unwrap();

        let mut release = ReleaseInstruction::new(Rc::clone(&alloc));
        release.complete(&ctx).unwrap();
        assert_eq!(release.complete(&ctx), Err(InstructionError::AlreadyReleased));
    }

    #[test]
    fn releasing_an_ungranted_allocation_fails() {
        let ctx = SimulationContext::new();
        let alloc = Rc::new(RefCell::new(AllocateInstruction::new(CREW, 1)));
        let mut release = ReleaseInstruction::new(alloc);
        assert_eq!(release.complete(&ctx), Err(InstructionError::NotGranted));
    }
}
