//! Thread-local execution contexts for deferred structural mutation.
//!
//! During a parallel sweep an operation may not insert into or remove from
//! the store — that would invalidate the slices every other worker is
//! iterating.  Instead, each worker buffers its structural effects in its own
//! slot here; the scheduler merges all slots single-threaded at the end of
//! the iteration ("teardown"), at which point the effects become globally
//! visible.
//!
//! Slots are indexed by `rayon::current_thread_index()`.  Each mutex guards a
//! slot only its own thread pushes to, so the locks never contend; they exist
//! to satisfy the borrow checker across the `Fn` closure boundary.

use std::sync::Mutex;

use cyto_core::{AgentUid, Real3, SubstanceId};

use crate::cell::Cell;
use crate::store::AgentStore;

/// A substance deposition queued by a behavior.
#[derive(Clone, Copy, Debug)]
pub struct Deposition {
    pub substance: SubstanceId,
    pub position: Real3,
    pub amount: f64,
}

/// One thread's buffered structural effects.
#[derive(Default)]
pub struct ExecutionContext {
    pub new_agents: Vec<Cell>,
    pub removals: Vec<AgentUid>,
    pub depositions: Vec<Deposition>,
}

impl ExecutionContext {
    pub fn is_empty(&self) -> bool {
        self.new_agents.is_empty() && self.removals.is_empty() && self.depositions.is_empty()
    }
}

/// All threads' execution contexts.
pub struct ExecutionContexts {
    slots: Vec<Mutex<ExecutionContext>>,
}

impl ExecutionContexts {
    /// One slot per worker thread (slot 0 doubles for the scheduler thread).
    pub fn new(threads: usize) -> ExecutionContexts {
        ExecutionContexts {
            slots: (0..threads.max(1))
                .map(|_| Mutex::new(ExecutionContext::default()))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Access the calling thread's slot.
    pub fn with_current<R>(&self, f: impl FnOnce(&mut ExecutionContext) -> R) -> R {
        let slot = rayon::current_thread_index().unwrap_or(0) % self.slots.len();
        let mut ctx = self.slots[slot]
            .lock()
            .expect("ExecutionContexts: poisoned slot");
        f(&mut ctx)
    }

    /// Begin an iteration.  All slots must have been drained by the previous
    /// teardown; leftovers indicate a scheduling bug and are reported.
    pub fn setup_iteration(&self) {
        for (i, slot) in self.slots.iter().enumerate() {
            let ctx = slot.lock().expect("ExecutionContexts: poisoned slot");
            if !ctx.is_empty() {
                log::warn!(
                    "ExecutionContexts: slot {i} entered an iteration with \
                     unapplied buffered effects"
                );
            }
        }
    }

    /// End an iteration: apply all buffered creations, then removals, to the
    /// store, and hand the buffered depositions back to the caller (the
    /// substance grids live a layer above this crate).
    ///
    /// Must be called from a single thread with no sweep in flight.
    pub fn teardown_iteration(&self, store: &mut AgentStore) -> Vec<Deposition> {
        let mut new_agents = Vec::new();
        let mut removals = Vec::new();
        let mut depositions = Vec::new();
        for slot in &self.slots {
            let mut ctx = slot.lock().expect("ExecutionContexts: poisoned slot");
            new_agents.append(&mut ctx.new_agents);
            removals.append(&mut ctx.removals);
            depositions.append(&mut ctx.depositions);
        }

        for cell in new_agents {
            store.push(cell);
        }
        for uid in removals {
            store.remove(uid);
        }
        depositions
    }
}
