//! The sphere-sphere mechanical force.

use cyto_core::{RandomStreams, Real3};

/// Tunable constants of the pairwise force.
#[derive(Copy, Clone, Debug)]
pub struct ForceParams {
    /// Repulsion coefficient `k`.
    pub repulsion: f64,
    /// Attraction (adhesion) coefficient `γ`.
    pub attraction: f64,
    /// Extra interaction margin `σ` added to the radius sum, giving a
    /// distant attraction band.  Zero restricts forces to true overlap.
    pub margin: f64,
}

impl Default for ForceParams {
    fn default() -> Self {
        ForceParams {
            repulsion: 2.0,
            attraction: 1.0,
            margin: 0.0,
        }
    }
}

/// Force exerted **on** the agent at `pos` by the neighbor at `nb_pos`.
///
/// With overlap `δ = r1 + r2 + σ − ‖c1 − c2‖`:
///
/// - `δ < 0` — no contact, zero force;
/// - coincident centers (within `1e-8`) — a random jitter so the pair
///   separates instead of dividing by zero;
/// - otherwise `F = k·δ − γ·√(R·δ)` along the center line, where
///   `R = r1·r2/(r1+r2)` — linear repulsion minus a bounded adhesive pull.
pub fn force_between_spheres(
    pos: Real3,
    diameter: f64,
    nb_pos: Real3,
    nb_diameter: f64,
    params: &ForceParams,
    rngs: &RandomStreams,
) -> Real3 {
    let r1 = 0.5 * diameter;
    let r2 = 0.5 * nb_diameter;

    let delta_vec = pos - nb_pos;
    let distance = delta_vec.norm();
    let delta = r1 + r2 + params.margin - distance;

    if delta < 0.0 {
        return Real3::ZERO;
    }
    if distance < 1e-8 {
        return rngs.with_current(|rng| rng.noise3(3.0));
    }

    let r = (r1 * r2) / (r1 + r2);
    let f = params.repulsion * delta - params.attraction * (r * delta).sqrt();
    delta_vec * (f / distance)
}
