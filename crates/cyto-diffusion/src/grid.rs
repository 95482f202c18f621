//! The per-substance diffusion grid.

use cyto_core::{Real3, SubstanceField, SubstanceId};
use rayon::prelude::*;

/// Concentration initializer sampled at box centers.
pub type Initializer = Box<dyn Fn(f64, f64, f64) -> f64 + Send + Sync>;

/// Boundary handling of the coefficient stencil.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum BoundaryPolicy {
    /// Out-of-grid reads are replaced by the edge cell's own value; substance
    /// accumulates at the edges (reflecting, Neumann-0).
    Closed,
    /// Stencil coefficients reaching outside the grid are zeroed; substance
    /// leaves the simulation space (Dirichlet-0).
    Leaking,
}

/// A regular Cartesian grid holding one substance's concentration and its
/// cached gradient.
///
/// Invariants: `box_edge > 0`; each axis length is a multiple of `box_edge`;
/// the AABB only ever grows.  Double-buffered (`c1` live, `c2` scratch).
#[derive(serde::Serialize, serde::Deserialize)]
pub struct DiffusionGrid {
    substance: SubstanceId,
    name: String,
    /// Stencil coefficients `[cc, cw, ce, cs, cn, cb, ct]` with
    /// `cc = 1 − D` and the six face weights `D/6`.
    dc: [f64; 7],
    mu: f64,
    resolution: u32,

    box_edge: f64,
    /// `{x_min, x_max, y_min, y_max, z_min, z_max}`.
    dims: [f64; 6],
    num_boxes_axis: [usize; 3],
    total_boxes: usize,

    c1: Vec<f64>,
    c2: Vec<f64>,
    /// Raw central-difference gradients, `3·total_boxes`, xyz-interleaved.
    gradients: Vec<f64>,

    /// Concentration clamp applied at deposition sites.
    cmax: f64,
    initialized: bool,

    #[serde(skip)]
    initializers: Vec<Initializer>,
}

impl DiffusionGrid {
    /// Define a substance grid.
    ///
    /// # Panics
    /// `diffusion_coefficient` outside `[0, 1)` or a negative decay constant
    /// would produce unphysical behavior and are fatal.
    pub fn new(
        substance: SubstanceId,
        name: &str,
        diffusion_coefficient: f64,
        decay_constant: f64,
        resolution: u32,
    ) -> DiffusionGrid {
        if !(0.0..1.0).contains(&diffusion_coefficient) {
            panic!(
                "DiffusionGrid: diffusion coefficient {diffusion_coefficient} of '{name}' \
                 must lie in [0, 1) for a stable stencil"
            );
        }
        if decay_constant < 0.0 {
            panic!("DiffusionGrid: negative decay constant {decay_constant} for '{name}'");
        }
        if resolution == 0 {
            panic!("DiffusionGrid: resolution of '{name}' cannot be zero");
        }
        let d6 = diffusion_coefficient / 6.0;
        DiffusionGrid {
            substance,
            name: name.to_string(),
            dc: [1.0 - diffusion_coefficient, d6, d6, d6, d6, d6, d6],
            mu: decay_constant,
            resolution,
            box_edge: 0.0,
            dims: [0.0; 6],
            num_boxes_axis: [0; 3],
            total_boxes: 0,
            c1: Vec::new(),
            c2: Vec::new(),
            gradients: Vec::new(),
            cmax: 1e15,
            initialized: false,
            initializers: Vec::new(),
        }
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    pub fn substance(&self) -> SubstanceId {
        self.substance
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    pub fn box_edge(&self) -> f64 {
        self.box_edge
    }

    pub fn dimensions(&self) -> [f64; 6] {
        self.dims
    }

    pub fn num_boxes_axis(&self) -> [usize; 3] {
        self.num_boxes_axis
    }

    pub fn num_boxes(&self) -> usize {
        self.total_boxes
    }

    pub fn decay_constant(&self) -> f64 {
        self.mu
    }

    pub fn diffusion_coefficients(&self) -> [f64; 7] {
        self.dc
    }

    pub fn concentration_threshold(&self) -> f64 {
        self.cmax
    }

    pub fn set_concentration_threshold(&mut self, cmax: f64) {
        self.cmax = cmax;
    }

    pub fn concentrations(&self) -> &[f64] {
        &self.c1
    }

    pub fn gradients(&self) -> &[f64] {
        &self.gradients
    }

    /// Total substance mass (Σ c1) — handy for conservation checks.
    pub fn total_concentration(&self) -> f64 {
        self.c1.iter().sum()
    }

    // ── Initialization ────────────────────────────────────────────────────

    /// Allocate storage covering `dims` (usually the spatial index's
    /// threshold cube).  The box edge is the largest axis length divided by
    /// the resolution; each axis is extended so its length is a multiple of
    /// the edge.
    ///
    /// # Panics
    /// A non-positive box edge is fatal.
    pub fn initialize(&mut self, dims: [i32; 6]) {
        let mut fdims = [0.0f64; 6];
        for i in 0..6 {
            fdims[i] = dims[i] as f64;
        }

        let longest = (0..3)
            .map(|a| fdims[2 * a + 1] - fdims[2 * a])
            .fold(0.0f64, f64::max);
        self.box_edge = longest / self.resolution as f64;
        if self.box_edge <= 0.0 {
            panic!(
                "DiffusionGrid: box edge of '{}' must be greater than zero",
                self.name
            );
        }

        for axis in 0..3 {
            let length = fdims[2 * axis + 1] - fdims[2 * axis];
            let boxes = (length / self.box_edge).ceil().max(1.0) as usize;
            self.num_boxes_axis[axis] = boxes;
            fdims[2 * axis + 1] = fdims[2 * axis] + boxes as f64 * self.box_edge;
        }
        self.dims = fdims;
        self.total_boxes =
            self.num_boxes_axis[0] * self.num_boxes_axis[1] * self.num_boxes_axis[2];

        self.c1 = vec![0.0; self.total_boxes];
        self.c2 = vec![0.0; self.total_boxes];
        self.gradients = vec![0.0; 3 * self.total_boxes];
        self.initialized = true;
    }

    /// Register a concentration initializer, evaluated at box centers by
    /// [`DiffusionGrid::run_initializers`].
    pub fn add_initializer(&mut self, f: Initializer) {
        self.initializers.push(f);
    }

    /// Sample all registered initializers onto the grid (values clamp at the
    /// concentration threshold).
    pub fn run_initializers(&mut self) {
        if self.initializers.is_empty() {
            return;
        }
        let [nx, ny, _] = self.num_boxes_axis;
        let initializers = std::mem::take(&mut self.initializers);
        for idx in 0..self.total_boxes {
            let x = idx % nx;
            let y = (idx / nx) % ny;
            let z = idx / (nx * ny);
            let cx = self.dims[0] + (x as f64 + 0.5) * self.box_edge;
            let cy = self.dims[2] + (y as f64 + 0.5) * self.box_edge;
            let cz = self.dims[4] + (z as f64 + 0.5) * self.box_edge;
            for f in &initializers {
                self.c1[idx] = (self.c1[idx] + f(cx, cy, cz)).min(self.cmax);
            }
        }
    }

    // ── Growth ────────────────────────────────────────────────────────────

    /// Enlarge the grid to cover `thresholds` (`{lower, upper}` cube bounds),
    /// re-centering existing values inside the larger arrays with zero-padded
    /// margins.  The grid never shrinks; a shrink request is a logged no-op.
    /// Odd growth along an axis is rounded up to even to preserve centering.
    pub fn update(&mut self, thresholds: [i32; 2]) {
        let min_t = thresholds[0] as f64;
        let max_t = thresholds[1] as f64;

        let old_boxes = self.num_boxes_axis;
        let mut new_boxes = [0usize; 3];
        for axis in 0..3 {
            let length = max_t - min_t;
            let boxes = (length / self.box_edge).ceil().max(1.0) as usize;
            if boxes < old_boxes[axis] {
                log::warn!(
                    "DiffusionGrid: '{}' was asked to shrink from {} to {boxes} boxes \
                     on axis {axis}; it can only grow — request ignored",
                    self.name,
                    old_boxes[axis],
                );
                return;
            }
            // Round odd increments up to even so the old data stays centered.
            let mut incr = boxes - old_boxes[axis];
            if incr % 2 != 0 {
                incr += 1;
            }
            new_boxes[axis] = old_boxes[axis] + incr;
        }
        if new_boxes == old_boxes {
            return;
        }

        for axis in 0..3 {
            self.dims[2 * axis] = min_t;
            self.dims[2 * axis + 1] = min_t + new_boxes[axis] as f64 * self.box_edge;
        }
        self.copy_old_data(new_boxes);
    }

    /// Move the current arrays into larger zero-filled ones, centered.
    fn copy_old_data(&mut self, new_boxes: [usize; 3]) {
        let old_boxes = self.num_boxes_axis;
        let new_total = new_boxes[0] * new_boxes[1] * new_boxes[2];

        let off = [
            (new_boxes[0] - old_boxes[0]) / 2,
            (new_boxes[1] - old_boxes[1]) / 2,
            (new_boxes[2] - old_boxes[2]) / 2,
        ];

        let mut c1 = vec![0.0; new_total];
        let mut gradients = vec![0.0; 3 * new_total];

        let old_xy = old_boxes[0] * old_boxes[1];
        let new_xy = new_boxes[0] * new_boxes[1];
        for z in 0..old_boxes[2] {
            for y in 0..old_boxes[1] {
                for x in 0..old_boxes[0] {
                    let old_idx = z * old_xy + y * old_boxes[0] + x;
                    let new_idx =
                        (z + off[2]) * new_xy + (y + off[1]) * new_boxes[0] + (x + off[0]);
                    c1[new_idx] = self.c1[old_idx];
                    gradients[3 * new_idx] = self.gradients[3 * old_idx];
                    gradients[3 * new_idx + 1] = self.gradients[3 * old_idx + 1];
                    gradients[3 * new_idx + 2] = self.gradients[3 * old_idx + 2];
                }
            }
        }

        self.c1 = c1;
        self.c2 = vec![0.0; new_total];
        self.gradients = gradients;
        self.num_boxes_axis = new_boxes;
        self.total_boxes = new_total;
    }

    // ── Coefficient-stencil step ──────────────────────────────────────────

    /// Advance one step with the 7-point coefficient stencil and the given
    /// boundary policy, then swap the buffers.
    pub fn step(&mut self, policy: BoundaryPolicy) {
        if !self.initialized {
            return;
        }
        let [nx, ny, nz] = self.num_boxes_axis;
        let decay = 1.0 - self.mu;
        let dc = self.dc;
        let c1 = &self.c1;

        self.c2
            .par_chunks_mut(nx * ny)
            .enumerate()
            .for_each(|(z, plane)| {
                for y in 0..ny {
                    // Per-row coefficient copy; leaking edges zero the weights
                    // that would read outside the grid.
                    let mut w = dc;
                    let row = y * nx + z * nx * ny;

                    let (n, s, b, t);
                    if y == 0 {
                        n = 0isize;
                        if policy == BoundaryPolicy::Leaking {
                            w[4] = 0.0;
                        }
                    } else {
                        n = -(nx as isize);
                    }
                    if y == ny - 1 {
                        s = 0isize;
                        if policy == BoundaryPolicy::Leaking {
                            w[3] = 0.0;
                        }
                    } else {
                        s = nx as isize;
                    }
                    if z == 0 {
                        b = 0isize;
                        if policy == BoundaryPolicy::Leaking {
                            w[5] = 0.0;
                        }
                    } else {
                        b = -((nx * ny) as isize);
                    }
                    if z == nz - 1 {
                        t = 0isize;
                        if policy == BoundaryPolicy::Leaking {
                            w[6] = 0.0;
                        }
                    } else {
                        t = (nx * ny) as isize;
                    }

                    let face = |c: usize, offset: isize| c1[(c as isize + offset) as usize];

                    for x in 0..nx {
                        let c = row + x;
                        let west = if x == 0 {
                            match policy {
                                BoundaryPolicy::Closed => c1[c],
                                BoundaryPolicy::Leaking => 0.0,
                            }
                        } else {
                            c1[c - 1]
                        };
                        let east = if x == nx - 1 {
                            match policy {
                                BoundaryPolicy::Closed => c1[c],
                                BoundaryPolicy::Leaking => 0.0,
                            }
                        } else {
                            c1[c + 1]
                        };
                        plane[y * nx + x] = (w[0] * c1[c]
                            + w[1] * west
                            + w[2] * east
                            + w[3] * face(c, s)
                            + w[4] * face(c, n)
                            + w[5] * face(c, b)
                            + w[6] * face(c, t))
                            * decay;
                    }
                }
            });
        std::mem::swap(&mut self.c1, &mut self.c2);
    }

    // ── Box-edge-aware integrators ────────────────────────────────────────

    /// Euler step of `∂c/∂t = D ∇²c − μ c` with the discrete Laplacian
    /// `(Σ neighbors − 6c)/edge²` and a unit time step.  Boundary reads
    /// reflect (Neumann-0), so mass is conserved for `μ = 0`.
    pub fn euler_step(&mut self) {
        if !self.initialized {
            return;
        }
        let c1 = std::mem::take(&mut self.c1);
        let mut c2 = std::mem::take(&mut self.c2);
        self.apply_operator(&c1, &mut c2);
        for (out, &c) in c2.iter_mut().zip(&c1) {
            *out += c;
        }
        self.c1 = c2;
        self.c2 = c1;
    }

    /// Classic fourth-order Runge–Kutta step over the same spatial operator:
    /// `c' = c + (k1 + 2k2 + 2k3 + k4)/6`.
    pub fn rk4_step(&mut self) {
        if !self.initialized {
            return;
        }
        let n = self.total_boxes;
        let mut k = vec![0.0; n];
        let mut stage = vec![0.0; n];
        let mut acc = vec![0.0; n];

        // k1
        self.apply_operator(&self.c1, &mut k);
        for i in 0..n {
            acc[i] += k[i];
            stage[i] = self.c1[i] + 0.5 * k[i];
        }
        // k2
        self.apply_operator(&stage, &mut k);
        for i in 0..n {
            acc[i] += 2.0 * k[i];
            stage[i] = self.c1[i] + 0.5 * k[i];
        }
        // k3
        self.apply_operator(&stage, &mut k);
        for i in 0..n {
            acc[i] += 2.0 * k[i];
            stage[i] = self.c1[i] + k[i];
        }
        // k4
        self.apply_operator(&stage, &mut k);
        for i in 0..n {
            self.c1[i] += (acc[i] + k[i]) / 6.0;
        }
    }

    /// `out[i] = D/edge²·(Σ neighbors − 6·c) − μ·c`, reflecting at faces.
    fn apply_operator(&self, input: &[f64], out: &mut [f64]) {
        let [nx, ny, nz] = self.num_boxes_axis;
        let d = 1.0 - self.dc[0];
        let ibl2 = 1.0 / (self.box_edge * self.box_edge);
        let mu = self.mu;

        out.par_chunks_mut(nx * ny).enumerate().for_each(|(z, plane)| {
            for y in 0..ny {
                for x in 0..nx {
                    let c = x + y * nx + z * nx * ny;
                    let v = input[c];
                    let west = if x == 0 { v } else { input[c - 1] };
                    let east = if x == nx - 1 { v } else { input[c + 1] };
                    let north = if y == 0 { v } else { input[c - nx] };
                    let south = if y == ny - 1 { v } else { input[c + nx] };
                    let bottom = if z == 0 { v } else { input[c - nx * ny] };
                    let top = if z == nz - 1 { v } else { input[c + nx * ny] };
                    let laplacian = west + east + north + south + bottom + top - 6.0 * v;
                    plane[x + y * nx] = d * ibl2 * laplacian - mu * v;
                }
            }
        });
    }

    // ── Gradient ──────────────────────────────────────────────────────────

    /// Recompute the cached gradient with central differences
    /// `(c[w] − c[e])/(2·edge)`; at a boundary face the inside neighbor is
    /// taken twice so edge gradients point outward correctly.  Stored raw;
    /// normalization happens on sampling.
    pub fn calculate_gradient(&mut self) {
        if !self.initialized {
            return;
        }
        let [nx, ny, nz] = self.num_boxes_axis;
        let gd = 1.0 / (self.box_edge * 2.0);
        let c1 = &self.c1;

        self.gradients
            .par_chunks_mut(3 * nx * ny)
            .enumerate()
            .for_each(|(z, plane)| {
                for y in 0..ny {
                    for x in 0..nx {
                        let c = x + y * nx + z * nx * ny;

                        let (e, w) = if x == 0 {
                            (c, c + 2)
                        } else if x == nx - 1 {
                            (c - 2, c)
                        } else {
                            (c - 1, c + 1)
                        };
                        let (s, n) = if y == 0 {
                            (c, c + 2 * nx)
                        } else if y == ny - 1 {
                            (c - 2 * nx, c)
                        } else {
                            (c - nx, c + nx)
                        };
                        let (b, t) = if z == 0 {
                            (c, c + 2 * nx * ny)
                        } else if z == nz - 1 {
                            (c - 2 * nx * ny, c)
                        } else {
                            (c - nx * ny, c + nx * ny)
                        };

                        let local = 3 * (x + y * nx);
                        // Gradient points from low to high concentration.
                        plane[local] = (c1[w] - c1[e]) * gd;
                        plane[local + 1] = (c1[n] - c1[s]) * gd;
                        plane[local + 2] = (c1[t] - c1[b]) * gd;
                    }
                }
            });
    }

    // ── Deposition & sampling ─────────────────────────────────────────────

    /// Add `amount` to the box containing `pos`, clamped at the
    /// concentration threshold.
    ///
    /// # Panics
    /// Depositing outside the grid is a violated precondition.
    pub fn increase_at(&mut self, pos: Real3, amount: f64) {
        let idx = self.box_index(pos);
        assert!(
            idx < self.total_boxes,
            "DiffusionGrid: deposition at {pos:?} is outside '{}'",
            self.name
        );
        self.c1[idx] = (self.c1[idx] + amount).min(self.cmax);
    }

    /// Concentration of the box containing `pos`.
    pub fn concentration(&self, pos: Real3) -> f64 {
        self.c1[self.box_index(pos)]
    }

    /// Cached gradient at `pos`, normalized to unit length when its
    /// magnitude exceeds `1e-10`.
    pub fn gradient(&self, pos: Real3) -> Real3 {
        let idx = self.box_index(pos);
        let g = Real3::new(
            self.gradients[3 * idx],
            self.gradients[3 * idx + 1],
            self.gradients[3 * idx + 2],
        );
        let norm = g.norm();
        if norm > 1e-10 {
            g * (1.0 / norm)
        } else {
            g
        }
    }

    /// Visit every voxel: center position, concentration, raw gradient.
    /// Used by export adaptors.
    pub fn for_each_box(&self, mut f: impl FnMut(Real3, f64, Real3)) {
        let [nx, ny, _] = self.num_boxes_axis;
        for idx in 0..self.total_boxes {
            let x = idx % nx;
            let y = (idx / nx) % ny;
            let z = idx / (nx * ny);
            let center = Real3::new(
                self.dims[0] + (x as f64 + 0.5) * self.box_edge,
                self.dims[2] + (y as f64 + 0.5) * self.box_edge,
                self.dims[4] + (z as f64 + 0.5) * self.box_edge,
            );
            let gradient = Real3::new(
                self.gradients[3 * idx],
                self.gradients[3 * idx + 1],
                self.gradients[3 * idx + 2],
            );
            f(center, self.c1[idx], gradient);
        }
    }

    // ── Indexing ──────────────────────────────────────────────────────────

    pub fn box_coordinates(&self, pos: Real3) -> [u32; 3] {
        let mut coord = [0u32; 3];
        for axis in 0..3 {
            coord[axis] =
                ((pos[axis].floor() - self.dims[2 * axis]) / self.box_edge).floor() as u32;
        }
        coord
    }

    #[inline]
    pub fn box_index_of(&self, coord: [u32; 3]) -> usize {
        coord[2] as usize * self.num_boxes_axis[0] * self.num_boxes_axis[1]
            + coord[1] as usize * self.num_boxes_axis[0]
            + coord[0] as usize
    }

    pub fn box_index(&self, pos: Real3) -> usize {
        self.box_index_of(self.box_coordinates(pos))
    }
}

impl SubstanceField for DiffusionGrid {
    fn concentration_at(&self, pos: Real3) -> f64 {
        self.concentration(pos)
    }

    fn gradient_at(&self, pos: Real3) -> Real3 {
        self.gradient(pos)
    }
}
