//! Shared scenario builders for the Skein benchmarks.

#![forbid(unsafe_code)]
#![allow(missing_docs)]

use std::rc::Rc;

use skein_engine::instruction::{handle, WaitInstruction};
use skein_engine::{SimulationContext, Simulator};
use skein_test_utils::SequenceProcess;

/// A context with `processes` processes, each issuing `waits` staggered
/// wait instructions.
pub fn staggered_waits(processes: u64, waits: u64) -> Simulator {
    let ctx = SimulationContext::new();
    for p in 0..processes {
        let instructions = (0..waits)
            .map(|w| handle(WaitInstruction::new(1 + (p + w) % 5)))
            .collect();
        SequenceProcess::new(&ctx, instructions);
    }
    Simulator::new(Rc::clone(&ctx))
}
