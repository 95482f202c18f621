//! Event kinds and behavior copy/remove masks.
//!
//! An *event* is a named state transition of an agent (creation, division,
//! branching, …).  Each behavior attached to an agent carries two bit masks
//! keyed on event kinds: a *copy mask* (copy this behavior onto the agent
//! born from the event?) and a *remove mask* (drop this behavior from the
//! triggering agent afterwards?).
//!
//! Masks are a single `u64`, so at most 64 distinct event kinds can exist in
//! one process; requesting a 65th is fatal.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::OnceLock;

/// Bit set of event kinds, used for behavior copy/remove decisions.
pub type EventMask = u64;

/// Mask matching every event kind — behaviors with this copy mask follow the
/// agent through every event.
pub const ALL_EVENTS: EventMask = u64::MAX;

/// The empty mask — never copy / never remove.
pub const NO_EVENTS: EventMask = 0;

/// A single event kind.  Invariant: exactly one bit set.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct EventKind(pub u64);

impl EventKind {
    /// `true` if this kind is contained in `mask`.
    #[inline]
    pub fn is_in(self, mask: EventMask) -> bool {
        self.0 & mask != 0
    }
}

// ── EventRegistry ─────────────────────────────────────────────────────────────

/// Mints unique event kinds satisfying the one-bit invariant.
///
/// Use [`EventRegistry::global`] for process-wide kinds; instantiate a local
/// registry only in tests that need to exercise exhaustion.
#[derive(Default)]
pub struct EventRegistry {
    counter: AtomicU32,
}

impl EventRegistry {
    pub const fn new() -> EventRegistry {
        EventRegistry {
            counter: AtomicU32::new(0),
        }
    }

    /// The process-wide registry.
    pub fn global() -> &'static EventRegistry {
        static GLOBAL: EventRegistry = EventRegistry::new();
        &GLOBAL
    }

    /// Mint the next unique event kind.
    ///
    /// # Panics
    /// Fatal after 64 kinds — masks are stored in a single `u64`.
    pub fn mint(&self) -> EventKind {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        if n >= 64 {
            panic!(
                "EventRegistry: only 64 unique event kinds are supported, \
                 a 65th was requested"
            );
        }
        EventKind(1u64 << n)
    }
}

/// The cell-division event, predefined because the core's division plumbing
/// triggers it.
pub fn cell_division() -> EventKind {
    static KIND: OnceLock<EventKind> = OnceLock::new();
    *KIND.get_or_init(|| EventRegistry::global().mint())
}
