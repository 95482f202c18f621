//! Read-only substance field access.
//!
//! Agent behaviors sample extracellular concentrations and gradients but must
//! not depend on the diffusion crate (the dependency points the other way at
//! the simulation layer).  These traits are the seam: `cyto-diffusion`
//! implements them, `cyto-agent` consumes them.

use crate::ids::SubstanceId;
use crate::math::Real3;

/// One substance's sampled view: concentration and normalized gradient.
pub trait SubstanceField: Send + Sync {
    /// Concentration of the voxel containing `pos`.
    fn concentration_at(&self, pos: Real3) -> f64;

    /// Cached gradient at `pos`, normalized to unit length when its magnitude
    /// exceeds `1e-10` (zero vector otherwise).
    fn gradient_at(&self, pos: Real3) -> Real3;
}

/// Lookup of substance fields by id.
pub trait SubstanceLookup: Sync {
    fn field(&self, id: SubstanceId) -> Option<&dyn SubstanceField>;
}

/// The empty lookup — used by tests and stores running without diffusion.
pub struct NoSubstances;

impl SubstanceLookup for NoSubstances {
    fn field(&self, _id: SubstanceId) -> Option<&dyn SubstanceField> {
        None
    }
}
