//! `cyto-sim` — the simulation object and its fixed-timestep scheduler.
//!
//! # What lives here
//!
//! | Module         | Contents                                                |
//! |----------------|---------------------------------------------------------|
//! | [`simulation`] | `Simulation` — owns store, index, substances, RNGs      |
//! | [`builder`]    | fluent construction of a `Simulation`                   |
//! | [`scheduler`]  | the main loop: operations, restore shortcut, backups    |
//! | [`operation`]  | `Operation` trait, frequencies, compute-target tags     |
//! | [`ops`]        | the seven default operations                            |
//! | [`force`]      | the sphere-sphere mechanical force                      |
//! | [`init`]       | bulk agent placement helpers                            |
//!
//! # Step anatomy
//!
//! ```text
//! setup execution contexts
//! update spatial index
//! run export/visualization hook
//! row-wise ops in registration order (one parallel sweep each)
//! column-wise ops in registration order
//! teardown execution contexts (apply deferred creates/removes/deposits)
//! backup when the wall-clock interval elapsed
//! ```

pub mod builder;
pub mod error;
pub mod force;
pub mod init;
pub mod operation;
pub mod ops;
pub mod scheduler;
pub mod simulation;

#[cfg(test)]
mod tests;

pub use builder::SimulationBuilder;
pub use error::{SimError, SimResult};
pub use operation::{ComputeTarget, OpKind, Operation, ScheduledOp};
pub use scheduler::Scheduler;
pub use simulation::Simulation;
