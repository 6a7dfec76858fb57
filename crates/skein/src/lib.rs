//! Skein: a discrete-event simulation kernel with coroutine-style processes.
//!
//! Independent processes issue typed instructions — wait, allocate, raise
//! or await a notification, activate, schedule, stop — as lazy, resumable
//! sequences. A single-threaded driver polls each pending instruction for
//! readiness, applies its effect, and advances a discrete integer period
//! clock only once no enqueued process can make further progress within
//! the current period.
//!
//! This is the top-level facade crate re-exporting the public API of the
//! Skein sub-crates; adding `skein` as a single dependency is sufficient
//! for most users.
//!
//! # Quick start
//!
//! ```rust
//! use skein::prelude::*;
//! use skein::instruction::{handle, WaitInstruction};
//!
//! // Processes are registered against a shared context...
//! let ctx = SimulationContext::new();
//! let napper = SequenceProcessExample::new(&ctx);
//!
//! // ...and a driver runs them period by period to completion.
//! let mut simulator = Simulator::new(std::rc::Rc::clone(&ctx));
//! let metrics = simulator.simulate().unwrap();
//! assert_eq!(metrics.final_period, TimePeriod(7));
//! assert!(napper.borrow().state().is_complete());
//!
//! // A process supplies one operation: produce its instruction sequence.
//! struct SequenceProcessExample {
//!     core: ProcessCore,
//! }
//!
//! impl SequenceProcessExample {
//!     fn new(ctx: &SimulationContext) -> std::rc::Rc<std::cell::RefCell<Self>> {
//!         let p = std::rc::Rc::new(std::cell::RefCell::new(Self {
//!             core: ProcessCore::new(ctx),
//!         }));
//!         ctx.register_process(std::rc::Rc::clone(&p));
//!         p
//!     }
//! }
//!
//! impl SimulationElement for SequenceProcessExample {
//!     fn key(&self) -> &ElementKey { self.core.key() }
//!     fn capabilities(&self) -> &[Capability] { ProcessCore::capabilities() }
//!     fn as_any(&self) -> &dyn std::any::Any { self }
//!     fn as_any_mut(&mut self) -> &mut dyn std::any::Any { self }
//!     fn as_process(&self) -> Option<&dyn Process> { Some(self) }
//! }
//!
//! impl Process for SequenceProcessExample {
//!     fn instance_index(&self) -> InstanceIndex { self.core.instance_index() }
//!     fn state(&self) -> &ProcessState { self.core.state() }
//!     fn state_mut(&mut self) -> &mut ProcessState { self.core.state_mut() }
//!     fn simulate(&mut self) -> InstructionSequence {
//!         Box::new(vec![
//!             handle(WaitInstruction::new(3)),
//!             handle(WaitInstruction::new(4)),
//!         ].into_iter())
//!     }
//! }
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core identifiers, priorities, readiness, and errors (`skein-core`).
pub use skein_core as types;

/// Context, process model, instruction set, and driver (`skein-engine`).
pub use skein_engine as engine;

/// The instruction contract and built-in instruction variants.
pub use skein_engine::instruction;

/// Everything most simulations need.
pub mod prelude {
    pub use skein_core::{
        Capability, ElementKey, InstanceIndex, InstructionError, Priority, Readiness,
        SimulationError, TimePeriod,
    };
    pub use skein_engine::{
        Activity, ActivityHandle, ActivityHostProcess, ElementHandle, IdleProcess, Instruction,
        InstructionHandle, InstructionSequence, Process, ProcessCore, ProcessHandle, ProcessState,
        Resource, RunMetrics, SimulationContext, SimulationElement, Simulator,
    };
}
