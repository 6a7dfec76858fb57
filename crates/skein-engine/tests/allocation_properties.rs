//! Property tests for the resource allocation invariants.

use std::cell::RefCell;
use std::rc::Rc;

use proptest::prelude::*;
use skein_core::{Capability, TimePeriod};
use skein_engine::instruction::{AllocateInstruction, Instruction, ReleaseInstruction};
use skein_engine::{Resource, SimulationContext};

const POOL: Capability = Capability::user(7);

fn pool_allocated(ctx: &SimulationContext) -> u32 {
    ctx.get_by_capability(POOL)
        .iter()
        .filter_map(|h| h.borrow().as_resource().map(|r| r.allocated()))
        .sum()
}

fn invariant_holds(ctx: &SimulationContext) -> bool {
    ctx.get_by_capability(POOL).iter().all(|h| {
        let el = h.borrow();
        let r = el.as_resource().unwrap();
        r.allocated() <= r.capacity()
    })
}

proptest! {
    /// Interleaved allocations and releases keep every resource inside
    /// `0 <= allocated <= capacity`, and releasing everything restores the
    /// pre-allocation state exactly.
    #[test]
    fn allocations_never_overdraw_and_release_restores(
        capacities in prop::collection::vec(1u32..=8, 1..4),
        requests in prop::collection::vec(1u32..=6, 1..12),
    ) {
        let ctx = SimulationContext::new();
        for capacity in &capacities {
            Resource::new(&ctx, POOL, *capacity);
        }
        let total: u32 = capacities.iter().sum();

        let mut granted = Vec::new();
        let mut expected_allocated = 0u32;

        for amount in requests {
            let mut alloc = AllocateInstruction::new(POOL, amount);
            let ready = alloc
                .can_complete(&ctx, TimePeriod(0))
                .unwrap()
                .is_ready();
            prop_assert_eq!(ready, expected_allocated + amount <= total);
            if ready {
                alloc.complete(&ctx).unwrap();
                expected_allocated += amount;
                granted.push(Rc::new(RefCell::new(alloc)));
            }
            prop_assert!(invariant_holds(&ctx));
            prop_assert_eq!(pool_allocated(&ctx), expected_allocated);
        }

        // Release in reverse grant order; every step stays inside bounds.
        for alloc in granted.iter().rev() {
            let amount = alloc.borrow().amount();
            ReleaseInstruction::new(Rc::clone(alloc))
                .complete(&ctx)
                .unwrap();
            expected_allocated -= amount;
            prop_assert!(invariant_holds(&ctx));
            prop_assert_eq!(pool_allocated(&ctx), expected_allocated);
        }
        prop_assert_eq!(pool_allocated(&ctx), 0);

        // A second release of any grant is a hard error.
        if let Some(alloc) = granted.first() {
            prop_assert!(ReleaseInstruction::new(Rc::clone(alloc))
                .complete(&ctx)
                .is_err());
        }
    }
}
