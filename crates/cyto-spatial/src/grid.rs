//! Grid storage, rebuild, and Moore-neighborhood queries.

use std::sync::atomic::{AtomicU16, AtomicU64, Ordering};

use cyto_agent::AgentStore;
use cyto_core::{AgentHandle, AgentKind, Real3};
use rayon::prelude::*;

/// A single cubic bucket of the index.
///
/// `head` starts a singly-linked list threaded through the grid's successor
/// vector; `length` counts its nodes.  Boxes on the outer perimeter are
/// padding and stay empty.
pub struct SpatialBox {
    /// Packed [`AgentHandle`] of the first agent in this box.
    pub(crate) head: AtomicU64,
    pub(crate) length: AtomicU16,
}

impl SpatialBox {
    fn new() -> SpatialBox {
        SpatialBox {
            head: AtomicU64::new(AgentHandle::INVALID_PACKED),
            length: AtomicU16::new(0),
        }
    }

    fn reset(&self) {
        self.head
            .store(AgentHandle::INVALID_PACKED, Ordering::Relaxed);
        self.length.store(0, Ordering::Relaxed);
    }

    pub fn is_empty(&self) -> bool {
        self.length.load(Ordering::Relaxed) == 0
    }

    pub fn len(&self) -> usize {
        self.length.load(Ordering::Relaxed) as usize
    }

    /// Lock-free insertion: exchange the head with our own handle and link
    /// the previous head as our successor.  Relaxed ordering suffices — the
    /// build sweep and all readers are separated by the parallel-for barrier.
    fn add(&self, handle: AgentHandle, slot: usize, successors: &[AtomicU64]) {
        self.length.fetch_add(1, Ordering::Relaxed);
        let old = self.head.swap(handle.pack(), Ordering::Relaxed);
        if old != AgentHandle::INVALID_PACKED {
            successors[slot].store(old, Ordering::Relaxed);
        }
    }
}

/// The uniform spatial index.
pub struct UniformGrid {
    boxes: Vec<SpatialBox>,
    /// Per-agent successor links, indexed by flat agent slot
    /// (`partition_offsets[numa] + element`).
    successors: Vec<AtomicU64>,
    partition_offsets: Vec<usize>,

    box_edge: u32,
    num_boxes_axis: [u32; 3],
    num_boxes_xy: u64,
    /// Rounded and padded AABB: `{x_min, x_max, y_min, y_max, z_min, z_max}`.
    dimensions: [i32; 6],
    threshold_dimensions: [i32; 2],
    largest_diameter: f64,
    grown: bool,
    initialized: bool,
}

impl UniformGrid {
    pub fn new() -> UniformGrid {
        UniformGrid {
            boxes: Vec::new(),
            successors: Vec::new(),
            partition_offsets: Vec::new(),
            box_edge: 1,
            num_boxes_axis: [0; 3],
            num_boxes_xy: 0,
            dimensions: [0; 6],
            threshold_dimensions: [0; 2],
            largest_diameter: 0.0,
            grown: false,
            initialized: false,
        }
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn box_edge(&self) -> u32 {
        self.box_edge
    }

    pub fn num_boxes_axis(&self) -> [u32; 3] {
        self.num_boxes_axis
    }

    pub fn dimensions(&self) -> [i32; 6] {
        self.dimensions
    }

    /// `{lower, upper}` bound across all axes — the cube handed to diffusion
    /// grids so they always cover the agent population.
    pub fn dimension_thresholds(&self) -> [i32; 2] {
        self.threshold_dimensions
    }

    /// Diameter of the largest agent seen by the last rebuild.
    pub fn largest_object_size(&self) -> f64 {
        self.largest_diameter
    }

    /// `true` when the last rebuild enlarged the threshold dimensions.
    pub fn has_grown(&self) -> bool {
        self.grown
    }

    // ── Build ─────────────────────────────────────────────────────────────

    /// Clear and rebuild the index from the current store.
    ///
    /// Also refreshes every agent's cached box index.
    pub fn update(&mut self, store: &mut AgentStore) {
        if store.is_empty() {
            self.initialized = false;
            return;
        }

        let (dims, largest) = aabb_of(store);
        self.largest_diameter = largest;

        // Round outward to integer coordinates.
        let mut rounded = [0i32; 6];
        for axis in 0..3 {
            rounded[2 * axis] = dims[2 * axis].floor() as i32;
            rounded[2 * axis + 1] = dims[2 * axis + 1].ceil() as i32;
        }

        let edge = largest.ceil() as i32;
        let edge = edge.max(1);
        self.box_edge = edge as u32;

        for axis in 0..3 {
            let length = rounded[2 * axis + 1] - rounded[2 * axis];
            let r = length % edge;
            if r != 0 {
                // Extend so the axis is a multiple of the box edge.
                rounded[2 * axis + 1] += edge - r;
            } else {
                // The outermost agent lies exactly on the border.
                rounded[2 * axis + 1] += edge;
            }
        }

        // One box of padding on all sides keeps Moore lookups bounds-free.
        for axis in 0..3 {
            rounded[2 * axis] -= edge;
            rounded[2 * axis + 1] += edge;
        }
        self.dimensions = rounded;

        for axis in 0..3 {
            let length = rounded[2 * axis + 1] - rounded[2 * axis];
            self.num_boxes_axis[axis] = (length / edge) as u32;
        }
        self.num_boxes_xy = self.num_boxes_axis[0] as u64 * self.num_boxes_axis[1] as u64;
        let total = self.num_boxes_xy as usize * self.num_boxes_axis[2] as usize;

        if self.boxes.len() != total {
            self.boxes = (0..total).map(|_| SpatialBox::new()).collect();
        } else {
            for b in &self.boxes {
                b.reset();
            }
        }

        // Successor storage and per-partition offsets.
        let mut offset = 0;
        self.partition_offsets = store
            .partitions()
            .iter()
            .map(|p| {
                let o = offset;
                offset += p.len();
                o
            })
            .collect();
        if self.successors.len() != offset {
            self.successors = (0..offset)
                .map(|_| AtomicU64::new(AgentHandle::INVALID_PACKED))
                .collect();
        }

        // Threshold growth detection.
        let lo = rounded[0].min(rounded[2]).min(rounded[4]);
        let hi = rounded[1].max(rounded[3]).max(rounded[5]);
        self.grown = self.initialized
            && (lo < self.threshold_dimensions[0] || hi > self.threshold_dimensions[1]);
        self.threshold_dimensions = [lo, hi];
        self.initialized = true;

        // Assign agents to boxes, in parallel, with atomic head exchange.
        let grid = &*self;
        let offsets = grid.partition_offsets.clone();
        store
            .partitions_mut()
            .par_iter_mut()
            .enumerate()
            .for_each(|(numa, partition)| {
                let base = offsets[numa];
                (&partition.position, &mut partition.box_idx)
                    .into_par_iter()
                    .enumerate()
                    .for_each(|(element, (position, box_idx))| {
                        let idx = grid.box_index(*position);
                        let handle =
                            AgentHandle::new(numa as u16, AgentKind::Cell, element as u32);
                        grid.boxes[idx as usize].add(handle, base + element, &grid.successors);
                        *box_idx = idx;
                    });
            });
    }

    // ── Indexing ──────────────────────────────────────────────────────────

    /// Flat box index of the box containing `position`.
    pub fn box_index(&self, position: Real3) -> u64 {
        let edge = self.box_edge as i64;
        let x = (position[0].floor() as i64 - self.dimensions[0] as i64) / edge;
        let y = (position[1].floor() as i64 - self.dimensions[2] as i64) / edge;
        let z = (position[2].floor() as i64 - self.dimensions[4] as i64) / edge;
        self.box_index_of([x as u32, y as u32, z as u32])
    }

    /// Flat index from box coordinates.
    #[inline]
    pub fn box_index_of(&self, coord: [u32; 3]) -> u64 {
        coord[2] as u64 * self.num_boxes_xy
            + coord[1] as u64 * self.num_boxes_axis[0] as u64
            + coord[0] as u64
    }

    /// Box coordinates from a flat index.
    pub fn box_coordinates(&self, idx: u64) -> [u32; 3] {
        let z = idx / self.num_boxes_xy;
        let rem = idx % self.num_boxes_xy;
        let y = rem / self.num_boxes_axis[0] as u64;
        let x = rem % self.num_boxes_axis[0] as u64;
        [x as u32, y as u32, z as u32]
    }

    #[inline]
    pub(crate) fn flat_slot(&self, handle: AgentHandle) -> usize {
        self.partition_offsets[handle.numa as usize] + handle.element_index()
    }

    /// Walk the agent chain of one box.
    pub(crate) fn for_each_in_box(&self, box_idx: u64, mut f: impl FnMut(AgentHandle)) {
        let b = &self.boxes[box_idx as usize];
        let mut countdown = b.length.load(Ordering::Relaxed);
        if countdown == 0 {
            return;
        }
        let mut current = b.head.load(Ordering::Relaxed);
        loop {
            let handle = AgentHandle::unpack(current);
            f(handle);
            countdown -= 1;
            if countdown == 0 {
                break;
            }
            current = self.successors[self.flat_slot(handle)].load(Ordering::Relaxed);
        }
    }

    pub(crate) fn boxes(&self) -> &[SpatialBox] {
        &self.boxes
    }

    #[inline]
    pub(crate) fn boxes_per_plane(&self) -> u64 {
        self.num_boxes_xy
    }

    // ── Neighbor queries ──────────────────────────────────────────────────

    /// Flat per-agent slot (`partition offset + element`), aligned with the
    /// store layout at the time of the last [`UniformGrid::update`].  Used by
    /// operations that keep per-agent scratch arrays.
    #[inline]
    pub fn agent_slot(&self, handle: AgentHandle) -> usize {
        self.flat_slot(handle)
    }

    /// Total agent slots covered by the last update.
    pub fn agent_slot_count(&self) -> usize {
        self.successors.len()
    }

    /// Visit the chains of the 27 Moore boxes around `box_idx` (handles only,
    /// no distance filtering).
    pub fn for_each_in_moore(&self, box_idx: u64, mut f: impl FnMut(AgentHandle)) {
        if !self.initialized {
            return;
        }
        let nx = self.num_boxes_axis[0] as i64;
        let nxy = self.num_boxes_xy as i64;
        for dz in -1i64..=1 {
            for dy in -1i64..=1 {
                for dx in -1i64..=1 {
                    let idx = box_idx as i64 + dz * nxy + dy * nx + dx;
                    self.for_each_in_box(idx as u64, &mut f);
                }
            }
        }
    }

    /// Visit every agent within `squared_radius` of `query`, excluding the
    /// query agent itself.  Before the first [`UniformGrid::update`] the
    /// neighborhood is empty.
    pub fn for_each_neighbor_within(
        &self,
        store: &AgentStore,
        query: AgentHandle,
        squared_radius: f64,
        mut f: impl FnMut(AgentHandle),
    ) {
        if !self.initialized {
            return;
        }
        let position = store.position(query);
        let center = store.box_idx(query);
        let nx = self.num_boxes_axis[0] as i64;
        let nxy = self.num_boxes_xy as i64;

        for dz in -1i64..=1 {
            for dy in -1i64..=1 {
                for dx in -1i64..=1 {
                    let idx = center as i64 + dz * nxy + dy * nx + dx;
                    self.for_each_in_box(idx as u64, |neighbor| {
                        if neighbor == query {
                            return;
                        }
                        let np = store.position(neighbor);
                        if position.squared_distance(np) < squared_radius {
                            f(neighbor);
                        }
                    });
                }
            }
        }
    }
}

impl Default for UniformGrid {
    fn default() -> Self {
        UniformGrid::new()
    }
}

/// AABB of all agent centers and the largest diameter, reduced in parallel
/// over partitions.
fn aabb_of(store: &AgentStore) -> ([f64; 6], f64) {
    let identity = (
        [
            f64::INFINITY,
            f64::NEG_INFINITY,
            f64::INFINITY,
            f64::NEG_INFINITY,
            f64::INFINITY,
            f64::NEG_INFINITY,
        ],
        0.0f64,
    );
    store
        .partitions()
        .par_iter()
        .map(|partition| {
            let mut dims = identity.0;
            let mut largest = 0.0f64;
            for i in 0..partition.len() {
                let p = partition.position[i];
                for axis in 0..3 {
                    dims[2 * axis] = dims[2 * axis].min(p[axis]);
                    dims[2 * axis + 1] = dims[2 * axis + 1].max(p[axis]);
                }
                largest = largest.max(partition.diameter[i]);
            }
            (dims, largest)
        })
        .reduce(
            || identity,
            |(a, la), (b, lb)| {
                let mut dims = a;
                for axis in 0..3 {
                    dims[2 * axis] = dims[2 * axis].min(b[2 * axis]);
                    dims[2 * axis + 1] = dims[2 * axis + 1].max(b[2 * axis + 1]);
                }
                (dims, la.max(lb))
            },
        )
}
