//! The substance registry: one owned [`DiffusionGrid`] per substance id.

use std::collections::BTreeMap;

use cyto_core::{SubstanceField, SubstanceId, SubstanceLookup};

use crate::grid::DiffusionGrid;

/// Map from substance id to its diffusion grid.
///
/// Iteration order is by id, so per-step operations over all substances are
/// deterministic.
#[derive(Default)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct Substances {
    grids: BTreeMap<u64, DiffusionGrid>,
}

impl Substances {
    pub fn new() -> Substances {
        Substances::default()
    }

    /// Define a new substance.
    ///
    /// # Panics
    /// Registering a duplicate substance id is fatal — every consumer of the
    /// id would silently read the wrong grid.
    pub fn define(
        &mut self,
        id: SubstanceId,
        name: &str,
        diffusion_coefficient: f64,
        decay_constant: f64,
        resolution: u32,
    ) {
        if self.grids.contains_key(&id.0) {
            panic!("Substances: substance id {id} ('{name}') is already defined");
        }
        self.grids.insert(
            id.0,
            DiffusionGrid::new(id, name, diffusion_coefficient, decay_constant, resolution),
        );
    }

    pub fn len(&self) -> usize {
        self.grids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grids.is_empty()
    }

    pub fn get(&self, id: SubstanceId) -> Option<&DiffusionGrid> {
        self.grids.get(&id.0)
    }

    pub fn get_mut(&mut self, id: SubstanceId) -> Option<&mut DiffusionGrid> {
        self.grids.get_mut(&id.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DiffusionGrid> {
        self.grids.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut DiffusionGrid> {
        self.grids.values_mut()
    }

    /// Initialize every not-yet-initialized grid over the given threshold
    /// cube and sample its initializers.
    pub fn initialize_all(&mut self, thresholds: [i32; 2]) {
        let dims = [
            thresholds[0],
            thresholds[1],
            thresholds[0],
            thresholds[1],
            thresholds[0],
            thresholds[1],
        ];
        for grid in self.grids.values_mut() {
            if !grid.is_initialized() {
                grid.initialize(dims);
                grid.run_initializers();
            }
        }
    }

    /// Replace the whole registry (restore path).
    pub fn replace(&mut self, other: Substances) {
        self.grids = other.grids;
    }
}

impl SubstanceLookup for Substances {
    fn field(&self, id: SubstanceId) -> Option<&dyn SubstanceField> {
        self.get(id).map(|g| g as &dyn SubstanceField)
    }
}
