//! The Skein simulation kernel.
//!
//! Independent processes run as cooperative, lazily resumed instruction
//! sequences; a single-threaded driver polls instructions for readiness,
//! applies their effects, and advances a discrete period clock only when no
//! further progress is possible within the current period. This crate
//! provides the simulation context, the process/activity execution model,
//! the built-in instruction set, the notification hub, and the driver loop.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod activity;
pub mod context;
pub mod element;
pub mod instruction;
pub mod metrics;
pub mod notification;
pub mod process;
pub mod registry;
pub mod resource;
pub mod simulator;

pub use activity::{Activity, ActivityHandle, ActivityHostProcess};
pub use context::SimulationContext;
pub use element::{ElementHandle, SimulationElement};
pub use instruction::{Instruction, InstructionHandle};
pub use metrics::RunMetrics;
pub use notification::NotificationHub;
pub use process::{
    IdleProcess, InstructionSequence, PendingInstruction, Process, ProcessCore, ProcessHandle,
    ProcessState,
};
pub use registry::ElementRegistry;
pub use resource::Resource;
pub use simulator::Simulator;
