//! Flat row types handed to output writers.

use cyto_core::AgentUid;

/// One agent at one exported step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AgentSnapshotRow {
    pub uid: AgentUid,
    pub step: u64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub diameter: f64,
}

/// One diffusion voxel at one exported step.
#[derive(Clone, Debug, PartialEq)]
pub struct SubstanceSnapshotRow {
    pub substance: String,
    pub step: u64,
    /// Voxel center.
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub concentration: f64,
    /// Raw gradient, present only when the substance's export entry asks
    /// for it.
    pub gradient: Option<[f64; 3]>,
}
