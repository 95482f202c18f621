//! `CellSoa` — Structure-of-Arrays storage for one NUMA partition.
//!
//! Every `Vec` field has exactly `len()` elements; the element index of an
//! [`AgentHandle`](cyto_core::AgentHandle) is the index into all of them.
//! Columns are `pub` so hot paths (spatial-index build, displacement) can
//! borrow exactly the columns they need instead of a whole-agent view.

use cyto_core::{AgentUid, Real3};
use rayon::prelude::*;

use crate::behavior::Behavior;
use crate::cell::Cell;

/// One NUMA partition's column store.
#[derive(Default)]
pub struct CellSoa {
    pub uid: Vec<AgentUid>,
    pub position: Vec<Real3>,
    pub tractor_force: Vec<Real3>,
    pub diameter: Vec<f64>,
    pub volume: Vec<f64>,
    pub adherence: Vec<f64>,
    pub density: Vec<f64>,
    pub box_idx: Vec<u64>,
    pub behaviors: Vec<Vec<Behavior>>,
    pub run_displacement: Vec<bool>,
    pub run_displacement_next: Vec<bool>,
}

/// Mutable whole-agent view over one SoA slot.
pub struct CellMut<'a> {
    pub uid: AgentUid,
    pub position: &'a mut Real3,
    pub tractor_force: &'a mut Real3,
    pub diameter: &'a mut f64,
    pub volume: &'a mut f64,
    pub adherence: &'a mut f64,
    pub density: &'a mut f64,
    pub box_idx: &'a mut u64,
    pub behaviors: &'a mut Vec<Behavior>,
    pub run_displacement: &'a mut bool,
    pub run_displacement_next: &'a mut bool,
}

impl CellMut<'_> {
    #[inline]
    pub fn mass(&self) -> f64 {
        *self.density * *self.volume
    }
}

/// Shared whole-agent view over one SoA slot.
pub struct CellRef<'a> {
    pub uid: AgentUid,
    pub position: Real3,
    pub diameter: f64,
    pub volume: f64,
    pub adherence: f64,
    pub density: f64,
    pub box_idx: u64,
    pub behaviors: &'a [Behavior],
    pub run_displacement: bool,
    pub run_displacement_next: bool,
}

impl CellSoa {
    pub fn new() -> CellSoa {
        CellSoa::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.uid.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.uid.is_empty()
    }

    /// Append an agent, scattering its fields into the columns.
    pub fn push(&mut self, cell: Cell) {
        self.uid.push(cell.uid);
        self.position.push(cell.position);
        self.tractor_force.push(cell.tractor_force);
        self.diameter.push(cell.diameter);
        self.volume.push(cell.volume);
        self.adherence.push(cell.adherence);
        self.density.push(cell.density);
        self.box_idx.push(cell.box_idx);
        self.behaviors.push(cell.behaviors);
        self.run_displacement.push(cell.run_displacement);
        self.run_displacement_next.push(cell.run_displacement_next);
    }

    /// Remove slot `i` by swapping the last element into it.
    ///
    /// Returns the removed agent and, when a swap happened, the UID of the
    /// agent that now occupies slot `i` (its handle must be re-mapped by the
    /// caller in the same critical section).
    pub fn swap_remove(&mut self, i: usize) -> (Cell, Option<AgentUid>) {
        let cell = Cell {
            uid: self.uid.swap_remove(i),
            position: self.position.swap_remove(i),
            tractor_force: self.tractor_force.swap_remove(i),
            diameter: self.diameter.swap_remove(i),
            volume: self.volume.swap_remove(i),
            adherence: self.adherence.swap_remove(i),
            density: self.density.swap_remove(i),
            box_idx: self.box_idx.swap_remove(i),
            behaviors: self.behaviors.swap_remove(i),
            run_displacement: self.run_displacement.swap_remove(i),
            run_displacement_next: self.run_displacement_next.swap_remove(i),
        };
        let moved = (i < self.len()).then(|| self.uid[i]);
        (cell, moved)
    }

    /// Clone slot `i` back into AoS form.
    pub fn extract(&self, i: usize) -> Cell {
        Cell {
            uid: self.uid[i],
            position: self.position[i],
            tractor_force: self.tractor_force[i],
            diameter: self.diameter[i],
            volume: self.volume[i],
            adherence: self.adherence[i],
            density: self.density[i],
            box_idx: self.box_idx[i],
            behaviors: self.behaviors[i].clone(),
            run_displacement: self.run_displacement[i],
            run_displacement_next: self.run_displacement_next[i],
        }
    }

    /// Pre-allocate room for `additional` more agents in every column.
    pub fn reserve(&mut self, additional: usize) {
        self.uid.reserve(additional);
        self.position.reserve(additional);
        self.tractor_force.reserve(additional);
        self.diameter.reserve(additional);
        self.volume.reserve(additional);
        self.adherence.reserve(additional);
        self.density.reserve(additional);
        self.box_idx.reserve(additional);
        self.behaviors.reserve(additional);
        self.run_displacement.reserve(additional);
        self.run_displacement_next.reserve(additional);
    }

    /// Drop all agents but keep column capacity.
    pub fn clear(&mut self) {
        self.uid.clear();
        self.position.clear();
        self.tractor_force.clear();
        self.diameter.clear();
        self.volume.clear();
        self.adherence.clear();
        self.density.clear();
        self.box_idx.clear();
        self.behaviors.clear();
        self.run_displacement.clear();
        self.run_displacement_next.clear();
    }

    /// Shared view of slot `i`.
    pub fn get(&self, i: usize) -> CellRef<'_> {
        CellRef {
            uid: self.uid[i],
            position: self.position[i],
            diameter: self.diameter[i],
            volume: self.volume[i],
            adherence: self.adherence[i],
            density: self.density[i],
            box_idx: self.box_idx[i],
            behaviors: &self.behaviors[i],
            run_displacement: self.run_displacement[i],
            run_displacement_next: self.run_displacement_next[i],
        }
    }

    /// Sequential sweep with a mutable whole-agent view.
    pub fn each_mut(&mut self, mut f: impl FnMut(usize, CellMut<'_>)) {
        for i in 0..self.len() {
            f(
                i,
                CellMut {
                    uid: self.uid[i],
                    position: &mut self.position[i],
                    tractor_force: &mut self.tractor_force[i],
                    diameter: &mut self.diameter[i],
                    volume: &mut self.volume[i],
                    adherence: &mut self.adherence[i],
                    density: &mut self.density[i],
                    box_idx: &mut self.box_idx[i],
                    behaviors: &mut self.behaviors[i],
                    run_displacement: &mut self.run_displacement[i],
                    run_displacement_next: &mut self.run_displacement_next[i],
                },
            );
        }
    }

    /// Parallel sweep with a mutable whole-agent view.
    ///
    /// Rayon's multizip hands each worker disjoint column slices, so the view
    /// never aliases across threads.
    pub fn par_each_mut<F>(&mut self, f: F)
    where
        F: Fn(usize, CellMut<'_>) + Send + Sync,
    {
        let uids = &self.uid;
        (
            &mut self.position,
            &mut self.tractor_force,
            &mut self.diameter,
            &mut self.volume,
            &mut self.adherence,
            &mut self.density,
            &mut self.box_idx,
            &mut self.behaviors,
            &mut self.run_displacement,
            &mut self.run_displacement_next,
        )
            .into_par_iter()
            .enumerate()
            .for_each(
                |(
                    i,
                    (
                        position,
                        tractor_force,
                        diameter,
                        volume,
                        adherence,
                        density,
                        box_idx,
                        behaviors,
                        run_displacement,
                        run_displacement_next,
                    ),
                )| {
                    f(
                        i,
                        CellMut {
                            uid: uids[i],
                            position,
                            tractor_force,
                            diameter,
                            volume,
                            adherence,
                            density,
                            box_idx,
                            behaviors,
                            run_displacement,
                            run_displacement_next,
                        },
                    )
                },
            );
    }
}
