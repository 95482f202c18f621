//! `cyto-core` — foundational types for the `cytodyn` simulation engine.
//!
//! This crate is a dependency of every other `cyto-*` crate.  It intentionally
//! has no `cyto-*` dependencies and a minimal external surface (rand, serde,
//! log, toml, thiserror).
//!
//! # What lives here
//!
//! | Module        | Contents                                                |
//! |---------------|---------------------------------------------------------|
//! | [`ids`]       | `AgentUid`, `SubstanceId`, `AgentKind`                  |
//! | [`handle`]    | `AgentHandle` — (numa, kind, element) storage coordinate|
//! | [`math`]      | `Real3` and small vector helpers                        |
//! | [`event`]     | event-kind factory and copy/remove bit masks            |
//! | [`rng`]       | `SimStream` (per-thread), `RandomStreams`               |
//! | [`substance`] | read-only substance field traits (seam to diffusion)    |
//! | [`thread`]    | `ThreadInfo` — worker↔NUMA-domain topology              |
//! | [`params`]    | `Params` — TOML-backed runtime configuration            |
//! | [`timing`]    | per-operation wall-clock statistics                     |
//! | [`error`]     | `CoreError`, `CoreResult`                               |

pub mod error;
pub mod event;
pub mod handle;
pub mod ids;
pub mod math;
pub mod params;
pub mod rng;
pub mod substance;
pub mod thread;
pub mod timing;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use error::{CoreError, CoreResult};
pub use event::{EventKind, EventMask, EventRegistry, ALL_EVENTS, NO_EVENTS};
pub use handle::AgentHandle;
pub use ids::{AgentKind, AgentUid, SubstanceId};
pub use math::Real3;
pub use params::Params;
pub use rng::{RandomStreams, SimStream};
pub use substance::{SubstanceField, SubstanceLookup};
pub use thread::ThreadInfo;
pub use timing::TimingAggregator;
