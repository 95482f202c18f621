//! Strongly typed identifiers.
//!
//! `AgentUid` is the only process-global resource in the engine: it is minted
//! from a single atomic counter so that uniqueness holds across every store,
//! partition and thread for the lifetime of one process.  Everything else that
//! used to be a global in comparable engines (active simulation, operation
//! registry, parameters) is an explicit value passed by reference.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Generate a typed ID wrapper around a primitive integer.
macro_rules! typed_id {
    ($(#[$attr:meta])* $vis:vis struct $name:ident($inner:ty);) => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
        #[derive(serde::Serialize, serde::Deserialize)]
        $vis struct $name(pub $inner);

        impl $name {
            /// Sentinel meaning "no valid ID".
            pub const INVALID: $name = $name(<$inner>::MAX);

            /// Cast to `usize` for direct use as a map or `Vec` key.
            #[inline(always)]
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl Default for $name {
            /// Returns the `INVALID` sentinel so uninitialized IDs are visibly invalid.
            #[inline(always)]
            fn default() -> Self {
                Self::INVALID
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

typed_id! {
    /// Process-unique 64-bit agent identifier, stable across storage
    /// relocation (compaction, NUMA rebalancing).  Mint via [`AgentUid::generate`].
    pub struct AgentUid(u64);
}

typed_id! {
    /// Identifier of an extracellular substance (one diffusion grid each).
    pub struct SubstanceId(u64);
}

/// Monotonic counter backing [`AgentUid::generate`].
static UID_COUNTER: AtomicU64 = AtomicU64::new(0);

impl AgentUid {
    /// Mint the next process-unique agent UID.
    #[inline]
    pub fn generate() -> AgentUid {
        AgentUid(UID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

// ── AgentKind ─────────────────────────────────────────────────────────────────

/// The closed set of concrete agent kinds.
///
/// The engine stores each kind as its own Structure-of-Arrays block per NUMA
/// partition and dispatches on the kind index carried in
/// [`AgentHandle`](crate::AgentHandle).  The core ships spherical cells;
/// cylindrical kinds (neurite elements) are the concern of a downstream agent
/// library and plug into the same dispatch.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
#[repr(u16)]
pub enum AgentKind {
    Cell = 0,
}

impl AgentKind {
    /// Number of kinds known to this build.
    pub const COUNT: usize = 1;

    /// The kind index stored in an [`AgentHandle`](crate::AgentHandle).
    #[inline(always)]
    pub fn index(self) -> u16 {
        self as u16
    }

    /// Inverse of [`AgentKind::index`].  Unknown indices are a logic error.
    pub fn from_index(idx: u16) -> Option<AgentKind> {
        match idx {
            0 => Some(AgentKind::Cell),
            _ => None,
        }
    }
}
