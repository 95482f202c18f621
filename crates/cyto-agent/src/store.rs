//! `AgentStore` — owns every agent, partitioned by NUMA domain.
//!
//! Each domain holds one [`CellSoa`] block; an agent's storage coordinate is
//! its [`AgentHandle`] `(numa, kind, element)`.  Handles are invalidated by
//! removal (swap-and-pop) and by [`AgentStore::rebalance`]; stable identity is
//! the [`AgentUid`], resolved through the store's UID map.

use std::sync::atomic::{AtomicU64, Ordering};

use cyto_core::{AgentHandle, AgentKind, AgentUid, Real3, ThreadInfo};
use rayon::prelude::*;
use rustc_hash::FxHashMap;

use crate::cell::Cell;
use crate::pointer::AgentPtr;
use crate::soa::{CellMut, CellRef, CellSoa};

/// NUMA-partitioned Structure-of-Arrays container of all agents.
pub struct AgentStore {
    partitions: Vec<CellSoa>,
    uid_map: FxHashMap<AgentUid, AgentHandle>,
    thread_info: ThreadInfo,
    /// Per-domain count of elements processed by a non-local worker during
    /// parallel sweeps.
    steal_counters: Vec<AtomicU64>,
}

impl AgentStore {
    pub fn new(thread_info: ThreadInfo) -> AgentStore {
        let nodes = thread_info.numa_nodes();
        AgentStore {
            partitions: (0..nodes).map(|_| CellSoa::new()).collect(),
            uid_map: FxHashMap::default(),
            thread_info,
            steal_counters: (0..nodes).map(|_| AtomicU64::new(0)).collect(),
        }
    }

    pub fn thread_info(&self) -> &ThreadInfo {
        &self.thread_info
    }

    pub fn numa_nodes(&self) -> usize {
        self.partitions.len()
    }

    pub fn num_agents(&self) -> usize {
        self.partitions.iter().map(CellSoa::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.iter().all(CellSoa::is_empty)
    }

    /// Pre-allocate room for `additional` more agents, spread across the
    /// partitions.  Useful before bulk factory inserts.
    pub fn reserve(&mut self, additional: usize) {
        let per_node = additional.div_ceil(self.partitions.len());
        for p in &mut self.partitions {
            p.reserve(per_node);
        }
    }

    /// Remove all agents; keeps SoA capacity.
    pub fn clear(&mut self) {
        for p in &mut self.partitions {
            p.clear();
        }
        self.uid_map.clear();
    }

    // ── Insertion / removal ───────────────────────────────────────────────

    /// Insert an agent into the least-loaded partition; returns a stable
    /// pointer to it.
    pub fn push(&mut self, cell: Cell) -> AgentPtr {
        let numa = self
            .partitions
            .iter()
            .enumerate()
            .min_by_key(|(_, p)| p.len())
            .map(|(i, _)| i)
            .unwrap_or(0);
        self.push_to(numa, cell)
    }

    /// Insert into a specific partition (rebalance and restore paths).
    pub(crate) fn push_to(&mut self, numa: usize, cell: Cell) -> AgentPtr {
        let uid = cell.uid;
        let partition = &mut self.partitions[numa];
        let handle = AgentHandle::new(numa as u16, AgentKind::Cell, partition.len() as u32);
        partition.push(cell);
        self.uid_map.insert(uid, handle);
        AgentPtr::new(uid)
    }

    /// Remove the agent with `uid`.
    ///
    /// Swap-and-pop within the owning partition; the displaced agent's handle
    /// is re-mapped in the same critical section.  An unknown UID is a
    /// logged no-op.
    pub fn remove(&mut self, uid: AgentUid) {
        let Some(handle) = self.uid_map.remove(&uid) else {
            log::warn!("AgentStore: removal of unknown agent {uid} ignored");
            return;
        };
        let (_, moved) = self.partitions[handle.numa as usize].swap_remove(handle.element_index());
        if let Some(moved_uid) = moved {
            self.uid_map.insert(moved_uid, handle);
        }
    }

    // ── Lookup ────────────────────────────────────────────────────────────

    /// Current storage slot of `uid`, or `None` for removed agents.
    pub fn handle(&self, uid: AgentUid) -> Option<AgentHandle> {
        self.uid_map.get(&uid).copied()
    }

    pub fn contains(&self, uid: AgentUid) -> bool {
        self.uid_map.contains_key(&uid)
    }

    pub fn get(&self, handle: AgentHandle) -> CellRef<'_> {
        self.partitions[handle.numa as usize].get(handle.element_index())
    }

    #[inline]
    pub fn position(&self, handle: AgentHandle) -> Real3 {
        self.partitions[handle.numa as usize].position[handle.element_index()]
    }

    #[inline]
    pub fn diameter(&self, handle: AgentHandle) -> f64 {
        self.partitions[handle.numa as usize].diameter[handle.element_index()]
    }

    #[inline]
    pub fn uid(&self, handle: AgentHandle) -> AgentUid {
        self.partitions[handle.numa as usize].uid[handle.element_index()]
    }

    #[inline]
    pub fn box_idx(&self, handle: AgentHandle) -> u64 {
        self.partitions[handle.numa as usize].box_idx[handle.element_index()]
    }

    /// Direct access to the partition blocks (hot paths borrow single columns).
    pub fn partitions(&self) -> &[CellSoa] {
        &self.partitions
    }

    pub fn partitions_mut(&mut self) -> &mut [CellSoa] {
        &mut self.partitions
    }

    // ── Iteration ─────────────────────────────────────────────────────────

    /// Visit every agent exactly once, sequentially.
    pub fn for_each_agent(&self, mut f: impl FnMut(AgentHandle, CellRef<'_>)) {
        for (numa, partition) in self.partitions.iter().enumerate() {
            for i in 0..partition.len() {
                f(
                    AgentHandle::new(numa as u16, AgentKind::Cell, i as u32),
                    partition.get(i),
                );
            }
        }
    }

    /// Visit every agent exactly once, in parallel.
    ///
    /// Workers prefer their own NUMA domain's partition; when rayon schedules
    /// an element onto a non-local worker, the owning domain's work-steal
    /// counter is incremented.
    pub fn for_each_agent_parallel<F>(&mut self, f: F)
    where
        F: Fn(AgentHandle, CellMut<'_>) + Send + Sync,
    {
        let thread_info = self.thread_info.clone();
        let steal_counters = &self.steal_counters;
        self.partitions
            .par_iter_mut()
            .enumerate()
            .for_each(|(numa, partition)| {
                partition.par_each_mut(|element, cm| {
                    if let Some(tid) = rayon::current_thread_index() {
                        if thread_info.numa_node_of(tid) != numa {
                            steal_counters[numa].fetch_add(1, Ordering::Relaxed);
                        }
                    }
                    f(
                        AgentHandle::new(numa as u16, AgentKind::Cell, element as u32),
                        cm,
                    );
                });
            });
    }

    /// Elements of `node`'s partition processed by non-local workers since the
    /// last reset.
    pub fn work_steal_count(&self, node: usize) -> u64 {
        self.steal_counters[node].load(Ordering::Relaxed)
    }

    pub fn reset_work_steal_counters(&self) {
        for c in &self.steal_counters {
            c.store(0, Ordering::Relaxed);
        }
    }

    // ── Rebalancing / bulk transfer ───────────────────────────────────────

    /// Redistribute agents across NUMA partitions following `order` (normally
    /// a spatial Z-order walk), so that each domain holds `N / num_nodes`
    /// agents laid out contiguously.
    ///
    /// Invalidates every [`AgentHandle`]; UIDs and agent state are preserved.
    /// An `order` that does not cover the store exactly is a logged no-op.
    pub fn rebalance(&mut self, order: &[AgentHandle]) {
        if order.len() != self.num_agents() {
            log::warn!(
                "AgentStore: rebalance order covers {} of {} agents; ignored",
                order.len(),
                self.num_agents()
            );
            return;
        }

        let cells: Vec<Cell> = order
            .iter()
            .map(|h| self.partitions[h.numa as usize].extract(h.element_index()))
            .collect();

        self.clear();
        let nodes = self.partitions.len();
        let total = cells.len();
        let base = total / nodes;
        let remainder = total % nodes;

        let mut iter = cells.into_iter();
        for node in 0..nodes {
            let share = base + usize::from(node < remainder);
            for _ in 0..share {
                let cell = iter.next().expect("AgentStore: rebalance share mismatch");
                self.push_to(node, cell);
            }
        }
    }

    /// Clone every agent back into AoS form (checkpointing).
    pub fn extract_all(&self) -> Vec<Cell> {
        let mut cells = Vec::with_capacity(self.num_agents());
        for partition in &self.partitions {
            for i in 0..partition.len() {
                cells.push(partition.extract(i));
            }
        }
        cells
    }

    /// Rebuild a store from an AoS agent list (restore path); agents are
    /// spread evenly across partitions.
    pub fn from_agents(thread_info: ThreadInfo, cells: Vec<Cell>) -> AgentStore {
        let mut store = AgentStore::new(thread_info);
        let nodes = store.partitions.len();
        let total = cells.len();
        let base = total / nodes;
        let remainder = total % nodes;

        let mut iter = cells.into_iter();
        for node in 0..nodes {
            let share = base + usize::from(node < remainder);
            for _ in 0..share {
                let cell = iter.next().expect("AgentStore: restore share mismatch");
                store.push_to(node, cell);
            }
        }
        store
    }
}
