//! `AgentHandle` — the intra-store storage coordinate of an agent.
//!
//! A handle addresses one SoA slot directly: `(numa node, kind, element)`.
//! Handles are cheap and dense but **unstable**: any compaction or NUMA
//! rebalance invalidates them.  Long-lived references must go through
//! [`AgentUid`](crate::AgentUid) and the store's UID map instead.
//!
//! Handles pack into a single `u64` so the spatial index can store them in
//! atomic box heads and successor links.

use std::fmt;

use crate::ids::AgentKind;

/// Storage coordinate `(numa, kind, element)` of one agent.
///
/// Packed layout (most significant first): 16 bits numa | 16 bits kind |
/// 32 bits element.  `u64::MAX` is reserved as the null sentinel, which is
/// unambiguous because numa `0xffff` is never a valid node id.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct AgentHandle {
    pub numa: u16,
    pub kind: u16,
    pub element: u32,
}

impl AgentHandle {
    /// The null handle; packs to `u64::MAX`.
    pub const INVALID: AgentHandle = AgentHandle {
        numa: u16::MAX,
        kind: u16::MAX,
        element: u32::MAX,
    };

    /// Packed sentinel value, usable as an atomic "empty" marker.
    pub const INVALID_PACKED: u64 = u64::MAX;

    #[inline]
    pub fn new(numa: u16, kind: AgentKind, element: u32) -> AgentHandle {
        AgentHandle {
            numa,
            kind: kind.index(),
            element,
        }
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self.numa != u16::MAX
    }

    /// Pack into a `u64` for atomic storage.
    #[inline]
    pub fn pack(self) -> u64 {
        ((self.numa as u64) << 48) | ((self.kind as u64) << 32) | self.element as u64
    }

    /// Inverse of [`AgentHandle::pack`].
    #[inline]
    pub fn unpack(packed: u64) -> AgentHandle {
        AgentHandle {
            numa: (packed >> 48) as u16,
            kind: (packed >> 32) as u16,
            element: packed as u32,
        }
    }

    #[inline]
    pub fn element_index(self) -> usize {
        self.element as usize
    }
}

impl Default for AgentHandle {
    fn default() -> Self {
        Self::INVALID
    }
}

impl fmt::Display for AgentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.numa, self.kind, self.element)
    }
}
