//! The snapshot model.
//!
//! Two mirrored types: [`SnapshotRef`] borrows live simulation state for
//! writing without cloning the substance grids, [`Snapshot`] owns the data
//! read back.  Field order and types match, so they are wire-compatible.

use cyto_agent::Cell;
use cyto_core::SimStream;
use cyto_diffusion::Substances;

use crate::runtime::RuntimeVariables;

/// Borrowed view of simulation state, for writing.
#[derive(serde::Serialize)]
pub struct SnapshotRef<'a> {
    pub completed_steps: u64,
    pub runtime: RuntimeVariables,
    pub agents: &'a [Cell],
    pub substances: &'a Substances,
    pub rng_streams: &'a [SimStream],
}

/// Owned simulation state, as read from a restore file.
#[derive(serde::Deserialize)]
pub struct Snapshot {
    pub completed_steps: u64,
    pub runtime: RuntimeVariables,
    pub agents: Vec<Cell>,
    pub substances: Substances,
    pub rng_streams: Vec<SimStream>,
}

impl Snapshot {
    /// Warn when the restoring system differs from the writing one.
    pub fn check_runtime(&self) {
        let current = RuntimeVariables::detect();
        if self.runtime != current {
            log::warn!(
                "Snapshot: restoring a simulation written on {} onto {}",
                self.runtime,
                current
            );
        }
    }
}
