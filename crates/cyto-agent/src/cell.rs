//! The spherical `Cell` agent and its division event.

use cyto_core::event::cell_division;
use cyto_core::{AgentUid, Real3, SimStream};

use crate::behavior::Behavior;

/// Smallest volume a cell can shrink to (the volume of a sphere with a
/// diameter of 0.01).
pub const MIN_CELL_VOLUME: f64 = 5.235_987_7e-7;

/// A spherical agent.
///
/// This is the AoS form used for construction, event buffering and
/// checkpointing; live agents are stored column-wise in
/// [`CellSoa`](crate::soa::CellSoa).
#[derive(Clone, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct Cell {
    pub uid: AgentUid,
    pub position: Real3,
    /// Active movement requested by behaviors; consumed and reset by the
    /// displacement operation.
    pub tractor_force: Real3,
    pub diameter: f64,
    pub volume: f64,
    /// Force threshold below which the cell does not translate.
    pub adherence: f64,
    pub density: f64,
    /// Cached spatial-index box, refreshed on every index rebuild.
    pub box_idx: u64,
    pub behaviors: Vec<Behavior>,
    /// Whether the displacement operation runs for this agent this step.
    pub run_displacement: bool,
    /// Displacement flag for the next step, committed by the last operation.
    pub run_displacement_next: bool,
}

impl Cell {
    pub fn new() -> Cell {
        Cell {
            uid: AgentUid::generate(),
            position: Real3::ZERO,
            tractor_force: Real3::ZERO,
            diameter: 0.0,
            volume: 0.0,
            adherence: 0.0,
            density: 1.0,
            box_idx: u64::MAX,
            behaviors: Vec::new(),
            run_displacement: true,
            run_displacement_next: true,
        }
    }

    pub fn with_diameter(diameter: f64) -> Cell {
        let mut cell = Cell::new();
        cell.set_diameter(diameter);
        cell
    }

    pub fn with_position(position: Real3) -> Cell {
        let mut cell = Cell::new();
        cell.position = position;
        cell
    }

    #[inline]
    pub fn mass(&self) -> f64 {
        self.density * self.volume
    }

    /// Set the diameter and keep the volume consistent.
    pub fn set_diameter(&mut self, diameter: f64) {
        self.diameter = diameter;
        self.volume = volume_from_diameter(diameter);
    }

    /// Set the volume and keep the diameter consistent.
    pub fn set_volume(&mut self, volume: f64) {
        self.volume = volume;
        self.diameter = diameter_from_volume(volume);
    }

    pub fn set_mass(&mut self, mass: f64) {
        self.density = mass / self.volume;
    }

    /// Grow (or shrink) by `speed` scaled with the integration step.
    pub fn change_volume(&mut self, speed: f64, time_step: f64) {
        self.volume = (self.volume + speed * time_step).max(MIN_CELL_VOLUME);
        self.diameter = diameter_from_volume(self.volume);
    }

    pub fn add_behavior(&mut self, behavior: Behavior) {
        self.behaviors.push(behavior);
    }

    /// Divide this cell in place, returning the daughter.
    ///
    /// The mother keeps `1/(ratio+1)` of its volume and moves backwards along
    /// the division axis; the daughter takes the rest and moves forwards.
    /// Behaviors are copied to the daughter and removed from the mother
    /// according to their event masks for the cell-division event.
    pub fn divide_with(&mut self, event: &CellDivisionEvent) -> Cell {
        let split = split_for_division(
            &mut self.position,
            &mut self.volume,
            &mut self.diameter,
            event,
        );

        let kind = cell_division();
        let daughter_behaviors: Vec<Behavior> = self
            .behaviors
            .iter()
            .filter(|b| b.base().copy_on(kind))
            .cloned()
            .collect();
        self.behaviors.retain(|b| !b.base().remove_on(kind));

        self.run_displacement_next = true;

        let mut daughter = Cell::new();
        daughter.position = split.daughter_position;
        daughter.set_volume(split.daughter_volume);
        daughter.adherence = self.adherence;
        daughter.density = self.density;
        daughter.box_idx = self.box_idx;
        daughter.behaviors = daughter_behaviors;
        daughter
    }
}

impl Default for Cell {
    fn default() -> Self {
        Cell::new()
    }
}

// ── Volume/diameter consistency ───────────────────────────────────────────────

/// `V = (π/6)·d³`
#[inline]
pub fn volume_from_diameter(diameter: f64) -> f64 {
    std::f64::consts::PI / 6.0 * diameter.powi(3)
}

#[inline]
pub fn diameter_from_volume(volume: f64) -> f64 {
    (volume * 6.0 / std::f64::consts::PI).cbrt()
}

// ── Division event ────────────────────────────────────────────────────────────

/// Parameters of one cell division.
#[derive(Clone, Copy, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct CellDivisionEvent {
    /// Daughter/mother volume ratio.
    pub volume_ratio: f64,
    /// Polar angle of the division axis.
    pub phi: f64,
    /// Azimuthal angle of the division axis.
    pub theta: f64,
}

impl CellDivisionEvent {
    pub fn new(volume_ratio: f64, phi: f64, theta: f64) -> CellDivisionEvent {
        CellDivisionEvent {
            volume_ratio,
            phi,
            theta,
        }
    }

    /// A random division: ratio uniform in `[0.9, 1.1)`, axis uniform on the
    /// sphere (<http://mathworld.wolfram.com/SpherePointPicking.html>).
    pub fn sample(rng: &mut SimStream) -> CellDivisionEvent {
        let volume_ratio = rng.uniform_in(0.9, 1.1);
        let theta = 2.0 * std::f64::consts::PI * rng.uniform();
        let phi = (2.0 * rng.uniform() - 1.0).acos();
        CellDivisionEvent {
            volume_ratio,
            phi,
            theta,
        }
    }

    /// Unit vector of the division axis.
    pub fn axis(&self) -> Real3 {
        Real3::new(
            self.theta.cos() * self.phi.sin(),
            self.theta.sin() * self.phi.sin(),
            self.phi.cos(),
        )
    }
}

/// Outcome of splitting the mother's state in place.
pub(crate) struct DivisionSplit {
    pub daughter_position: Real3,
    pub daughter_volume: f64,
}

/// Apply the division to the mother fields and return the daughter's share.
///
/// Volume is conserved exactly: the daughter receives
/// `V·ratio/(ratio+1)`, the mother keeps the rest.  The centers move apart
/// by `radius/4` in total, split inversely proportional to the volumes.
pub(crate) fn split_for_division(
    position: &mut Real3,
    volume: &mut f64,
    diameter: &mut f64,
    event: &CellDivisionEvent,
) -> DivisionSplit {
    let radius = *diameter * 0.5;
    let axis = event.axis();

    let total_displacement = radius / 4.0;
    let d_daughter = total_displacement / (event.volume_ratio + 1.0);
    let d_mother = total_displacement - d_daughter;

    let mother_volume = *volume;
    let new_mother_volume = mother_volume / (event.volume_ratio + 1.0);
    let daughter_volume = mother_volume - new_mother_volume;

    let daughter_position = *position + axis * d_daughter;
    *position -= axis * d_mother;
    *volume = new_mother_volume;
    *diameter = diameter_from_volume(new_mother_volume);

    DivisionSplit {
        daughter_position,
        daughter_volume,
    }
}
