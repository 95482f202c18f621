//! `cyto-diffusion` — Eulerian grids for extracellular substances.
//!
//! One [`DiffusionGrid`] per substance integrates the reaction–diffusion
//! equation `∂c/∂t = D ∇²c − μ c` on a regular Cartesian grid and caches the
//! concentration gradient for agent queries.  The [`Substances`] registry maps
//! substance ids to their grids and implements the read-only sampling seam
//! consumed by agent behaviors.
//!
//! Two integrator families are provided (both are part of the contract):
//!
//! - [`DiffusionGrid::step`] — the coefficient stencil `[1−D, D/6 ×6]` with
//!   selectable closed/leaking boundary policy; this is what the scheduler's
//!   diffusion operation drives every step.
//! - [`DiffusionGrid::euler_step`] / [`DiffusionGrid::rk4_step`] — the
//!   box-edge-aware form `c' = c(1−μ) + D/edge²·(Σn − 6c)`, which converges
//!   to the analytic solution under grid refinement.

pub mod grid;
pub mod initializer;
pub mod substances;


pub use grid::{BoundaryPolicy, DiffusionGrid, Initializer};
pub use initializer::{gaussian_band, Axis};
pub use substances::Substances;
