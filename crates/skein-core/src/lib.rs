//! Core types for the Skein simulation kernel.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! strongly-typed identifiers, the scheduling priority ordering, the
//! readiness result of an instruction poll, and the kernel error types
//! shared throughout the Skein workspace.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod id;
pub mod priority;
pub mod readiness;

pub use error::{InstructionError, SimulationError};
pub use id::{Capability, ElementKey, InstanceIndex, TimePeriod};
pub use priority::Priority;
pub use readiness::Readiness;
