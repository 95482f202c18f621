//! `cyto-spatial` — the uniform-grid spatial index.
//!
//! A cubic-cell grid covering the AABB of all agent centers, rebuilt from the
//! store at every step.  The box edge is the largest agent diameter rounded
//! up, so any two interacting agents are guaranteed to sit in the same or in
//! adjacent boxes; one box of padding on every side makes the 27-box Moore
//! lookup bounds-free.
//!
//! Two traversal primitives are exposed:
//!
//! - [`UniformGrid::for_each_neighbor_within`] — the 27-box Moore
//!   neighborhood of one agent;
//! - [`UniformGrid::for_each_pair_within`] — every unordered agent pair
//!   within a radius, visited exactly once via a red-black half-Moore sweep
//!   (see [`pairs`] for the scheme).

pub mod grid;
pub mod pairs;
pub mod zorder;


pub use grid::{SpatialBox, UniformGrid};
