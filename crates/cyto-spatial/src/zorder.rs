//! Z-order (Morton) walk over the index.
//!
//! The NUMA rebalance wants agents laid out so that workers visiting nearby
//! boxes also visit nearby memory.  Walking the boxes in Morton order and
//! concatenating their chains yields exactly that: a spatially coherent
//! sequence of handles that the store splits into contiguous per-domain
//! blocks.

use cyto_core::AgentHandle;

use crate::grid::UniformGrid;

impl UniformGrid {
    /// Every agent handle, ordered by the Morton code of its box.
    ///
    /// Empty before the first [`UniformGrid::update`].
    pub fn z_order_handles(&self) -> Vec<AgentHandle> {
        if !self.is_initialized() {
            return Vec::new();
        }

        let mut occupied: Vec<(u64, u64)> = self
            .boxes()
            .iter()
            .enumerate()
            .filter(|(_, b)| !b.is_empty())
            .map(|(idx, _)| {
                let [x, y, z] = self.box_coordinates(idx as u64);
                (morton3(x, y, z), idx as u64)
            })
            .collect();
        occupied.sort_unstable();

        let mut handles = Vec::new();
        for (_, box_idx) in occupied {
            self.for_each_in_box(box_idx, |h| handles.push(h));
        }
        handles
    }
}

/// Interleave the low 21 bits of three coordinates into one Morton code.
pub fn morton3(x: u32, y: u32, z: u32) -> u64 {
    spread_bits(x as u64) | (spread_bits(y as u64) << 1) | (spread_bits(z as u64) << 2)
}

/// Spread the low 21 bits of `v` so consecutive bits land 3 apart.
fn spread_bits(mut v: u64) -> u64 {
    v &= 0x1f_ffff;
    v = (v | (v << 32)) & 0x1f00_0000_ffff;
    v = (v | (v << 16)) & 0x1f_0000_ff00_00ff;
    v = (v | (v << 8)) & 0x100f_00f0_0f00_f00f;
    v = (v | (v << 4)) & 0x10c3_0c30_c30c_30c3;
    v = (v | (v << 2)) & 0x1249_2492_4924_9249;
    v
}
