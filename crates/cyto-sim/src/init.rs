//! Bulk agent placement helpers.

use cyto_agent::Cell;
use cyto_core::{Real3, SimStream};

/// A cubic lattice of `cells_per_dim³` agents with `spacing` between lattice
/// points, starting at the origin.
pub fn grid_3d(cells_per_dim: usize, spacing: f64, mut factory: impl FnMut(Real3) -> Cell) -> Vec<Cell> {
    let mut cells = Vec::with_capacity(cells_per_dim.pow(3));
    for x in 0..cells_per_dim {
        for y in 0..cells_per_dim {
            for z in 0..cells_per_dim {
                let pos = Real3::new(
                    x as f64 * spacing,
                    y as f64 * spacing,
                    z as f64 * spacing,
                );
                cells.push(factory(pos));
            }
        }
    }
    cells
}

/// `count` agents uniformly distributed in `[min, max)³`.
pub fn random_uniform(
    count: usize,
    min: f64,
    max: f64,
    rng: &mut SimStream,
    mut factory: impl FnMut(Real3) -> Cell,
) -> Vec<Cell> {
    (0..count)
        .map(|_| {
            let pos = Real3::new(
                rng.uniform_in(min, max),
                rng.uniform_in(min, max),
                rng.uniform_in(min, max),
            );
            factory(pos)
        })
        .collect()
}
