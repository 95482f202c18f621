//! Half-Moore pair traversal.
//!
//! Pairwise forces are symmetric, so every unordered pair of agents should be
//! evaluated exactly once.  The sweep achieves this with two ideas:
//!
//! 1. **Half-Moore set.**  For each center box, only 14 of the 27 boxes in
//!    its 3×3×3 neighborhood are visited — the center plus 13 neighbors
//!    chosen so that every unordered pair of adjacent boxes is represented by
//!    exactly one center.  Pairs inside the center box are enumerated as an
//!    upper triangle.
//!
//! 2. **Red-black phases.**  The grid is traversed in nine phases indexed by
//!    `(y_phase, z_phase) ∈ {1,2,3}²`; within a phase, rows parallelize over
//!    the `(y, z)` sub-lattice with stride 3.  Two centers of the same phase
//!    are at least three boxes apart in y and z, so their half-Moore sets
//!    never share a box and callbacks touching per-agent accumulators of the
//!    pair members cannot race.
//!
//! As a row's center slides along +x, the 14 chains shift through fixed
//! roles (behind / current / ahead columns), so only the five boxes of the
//! new ahead column are read per step.

use cyto_agent::AgentStore;
use cyto_core::{AgentHandle, Real3};
use rayon::prelude::*;
use smallvec::SmallVec;

use crate::grid::UniformGrid;

/// Agents of one box with their positions resolved once.
type Chain = SmallVec<[(AgentHandle, Real3); 16]>;

impl UniformGrid {
    /// Invoke `f` exactly once for every unordered pair of distinct agents
    /// whose centers lie within `squared_radius` of each other.
    ///
    /// Requires `squared_radius ≤ (box_edge·√3)²`; larger radii would need
    /// neighbors beyond the Moore shell and are a logged no-op.
    pub fn for_each_pair_within<F>(&self, store: &AgentStore, squared_radius: f64, f: F)
    where
        F: Fn(AgentHandle, AgentHandle) + Send + Sync,
    {
        if !self.is_initialized() {
            return;
        }
        let edge = self.box_edge() as f64;
        if squared_radius > 3.0 * edge * edge {
            log::warn!(
                "UniformGrid: pair radius² {squared_radius} exceeds the Moore shell \
                 ({}); traversal skipped",
                3.0 * edge * edge
            );
            return;
        }

        let [nx, ny, nz] = self.num_boxes_axis();
        if nx < 3 || ny < 3 || nz < 3 {
            return;
        }

        for phase in 0..9u32 {
            let y_start = 1 + phase % 3;
            let z_start = 1 + phase / 3;

            let rows: Vec<(u32, u32)> = (z_start..nz - 1)
                .step_by(3)
                .flat_map(|z| (y_start..ny - 1).step_by(3).map(move |y| (y, z)))
                .collect();

            rows.par_iter()
                .for_each(|&(y, z)| self.sweep_row(store, y, z, squared_radius, &f));
        }
    }

    /// Slide the half-Moore window along one `(y, z)` row.
    fn sweep_row<F>(&self, store: &AgentStore, y: u32, z: u32, squared_radius: f64, f: &F)
    where
        F: Fn(AgentHandle, AgentHandle),
    {
        let nx = self.num_boxes_axis()[0] as u64;
        let nxy = self.boxes_per_plane();

        let center_idx = self.box_index_of([1, y, z]);

        // Relative offsets of the half-Moore roles around the center `c`.
        // Behind column (x-1): four boxes; current column (x): four boxes;
        // ahead column (x+1): five boxes.
        let behind_off = [nx - 1, nxy - nx - 1, nxy - 1, nxy + nx - 1];
        let current_off = [nx, nxy - nx, nxy, nxy + nx];
        let ahead_off = [1, nx + 1, nxy - nx + 1, nxy + 1, nxy + nx + 1];

        let mut center = self.chain_of(store, center_idx);
        let mut behind: [Chain; 4] = behind_off.map(|o| self.chain_of(store, center_idx + o));
        let mut current: [Chain; 4] = current_off.map(|o| self.chain_of(store, center_idx + o));
        let mut ahead: [Chain; 5] = ahead_off.map(|o| self.chain_of(store, center_idx + o));

        let mut x = 1;
        loop {
            self.emit_pairs(&center, &behind, &current, &ahead, squared_radius, f);

            x += 1;
            if x >= self.num_boxes_axis()[0] - 1 {
                break;
            }

            // Shift roles: the old current column moves behind, the first
            // four ahead boxes become the current column, the old east box
            // becomes the center, and five fresh boxes are read.
            behind = current;
            center = std::mem::take(&mut ahead[0]);
            current = [
                std::mem::take(&mut ahead[1]),
                std::mem::take(&mut ahead[2]),
                std::mem::take(&mut ahead[3]),
                std::mem::take(&mut ahead[4]),
            ];
            let new_center_idx = self.box_index_of([x, y, z]);
            ahead = ahead_off.map(|o| self.chain_of(store, new_center_idx + o));
        }
    }

    fn emit_pairs<F>(
        &self,
        center: &Chain,
        behind: &[Chain; 4],
        current: &[Chain; 4],
        ahead: &[Chain; 5],
        squared_radius: f64,
        f: &F,
    ) where
        F: Fn(AgentHandle, AgentHandle),
    {
        if center.is_empty() {
            return;
        }

        // Upper triangle within the center box.
        for i in 0..center.len() {
            let (ha, pa) = center[i];
            for &(hb, pb) in &center[i + 1..] {
                if pa.squared_distance(pb) < squared_radius {
                    f(ha, hb);
                }
            }
        }

        // Cross pairs: center × each of the 13 neighbor boxes.
        let neighbors = behind.iter().chain(current.iter()).chain(ahead.iter());
        for chain in neighbors {
            for &(hb, pb) in chain {
                for &(ha, pa) in center {
                    if pa.squared_distance(pb) < squared_radius {
                        f(ha, hb);
                    }
                }
            }
        }
    }

    fn chain_of(&self, store: &AgentStore, box_idx: u64) -> Chain {
        let mut chain = Chain::new();
        self.for_each_in_box(box_idx, |handle| {
            chain.push((handle, store.position(handle)));
        });
        chain
    }
}
