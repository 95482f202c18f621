//! `AgentPtr` — a stable, weak reference to an agent.
//!
//! Stores only the [`AgentUid`] and resolves to the current storage slot
//! through the store's UID map at each dereference, so it survives
//! compaction and NUMA rebalancing.  Dereferencing a pointer whose agent was
//! removed yields `None`.

use cyto_core::{AgentHandle, AgentUid};

use crate::store::AgentStore;

/// UID-keyed indirection to an agent.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct AgentPtr {
    uid: AgentUid,
}

impl AgentPtr {
    pub fn new(uid: AgentUid) -> AgentPtr {
        AgentPtr { uid }
    }

    #[inline]
    pub fn uid(self) -> AgentUid {
        self.uid
    }

    /// Current storage slot, or `None` if the agent was removed.
    pub fn handle(self, store: &AgentStore) -> Option<AgentHandle> {
        store.handle(self.uid)
    }

    pub fn is_alive(self, store: &AgentStore) -> bool {
        store.contains(self.uid)
    }
}
