//! `cyto-checkpoint` — periodic backup and restore of the full simulation.
//!
//! A snapshot contains everything needed to continue a run bit-for-bit:
//! the agents (AoS form), the completed-step counter, every diffusion grid,
//! the per-thread RNG stream states, and a [`RuntimeVariables`] summary of
//! the machine that wrote it (compared on restore, mismatch warns).
//!
//! Snapshots are written with bincode to a temporary file which is renamed
//! over the previous backup, so a crash mid-write never corrupts the last
//! good backup.

pub mod backup;
pub mod error;
pub mod runtime;
pub mod snapshot;

#[cfg(test)]
mod tests;

pub use backup::Backup;
pub use error::{CheckpointError, CheckpointResult};
pub use runtime::RuntimeVariables;
pub use snapshot::{Snapshot, SnapshotRef};
