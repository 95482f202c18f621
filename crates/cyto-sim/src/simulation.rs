//! The `Simulation` object.
//!
//! Everything that comparable engines keep in process-wide singletons is
//! bundled here and passed by reference into every operation: the agent
//! store, the spatial index, the substance registry, the per-thread RNG
//! streams, the execution contexts, and the parameters.  The only process
//! global left is the agent UID counter, whose uniqueness requirement really
//! is process-wide.

use cyto_agent::{AgentPtr, AgentStore, Cell, ExecutionContexts};
use cyto_core::{Params, RandomStreams, SubstanceId, ThreadInfo};
use cyto_diffusion::{Initializer, Substances};
use cyto_spatial::UniformGrid;

/// One simulation: parameters, state, and per-thread resources.
pub struct Simulation {
    pub params: Params,
    pub store: AgentStore,
    pub grid: UniformGrid,
    pub substances: Substances,
    pub rngs: RandomStreams,
    pub exec: ExecutionContexts,
    pub thread_info: ThreadInfo,
}

impl Simulation {
    /// Create an empty simulation with the current machine topology.
    pub fn new(params: Params, seed: u64) -> Simulation {
        let thread_info = ThreadInfo::detect();
        Self::with_thread_info(params, seed, thread_info)
    }

    /// Create with an explicit topology (tests pin this for determinism).
    pub fn with_thread_info(params: Params, seed: u64, thread_info: ThreadInfo) -> Simulation {
        let workers = thread_info.max_threads();
        Simulation {
            params,
            store: AgentStore::new(thread_info.clone()),
            grid: UniformGrid::new(),
            substances: Substances::new(),
            rngs: RandomStreams::new(seed, workers),
            exec: ExecutionContexts::new(workers),
            thread_info,
        }
    }

    /// Insert an agent directly (setup phase; inside a step use the
    /// execution context instead).
    pub fn push_agent(&mut self, cell: Cell) -> AgentPtr {
        self.store.push(cell)
    }

    /// Define an extracellular substance.  Duplicate ids are fatal.
    pub fn define_substance(
        &mut self,
        id: SubstanceId,
        name: &str,
        diffusion_coefficient: f64,
        decay_constant: f64,
        resolution: u32,
    ) {
        self.substances
            .define(id, name, diffusion_coefficient, decay_constant, resolution);
    }

    /// Attach a concentration initializer to a defined substance.
    pub fn initialize_substance(&mut self, id: SubstanceId, f: Initializer) {
        match self.substances.get_mut(id) {
            Some(grid) => grid.add_initializer(f),
            None => log::warn!("Simulation: initializer for unknown substance {id} ignored"),
        }
    }

    /// Redistribute agents across NUMA partitions along the spatial Z-order.
    ///
    /// Invalidates all handles; requires an up-to-date index.
    pub fn rebalance(&mut self) {
        let order = self.grid.z_order_handles();
        self.store.rebalance(&order);
    }

    /// Apply all buffered structural effects (creations, removals, substance
    /// depositions) from the execution contexts.
    pub(crate) fn teardown_exec(&mut self) {
        let depositions = self.exec.teardown_iteration(&mut self.store);
        for d in depositions {
            match self.substances.get_mut(d.substance) {
                Some(grid) if grid.is_initialized() => grid.increase_at(d.position, d.amount),
                _ => log::warn!(
                    "Simulation: deposition into unknown or uninitialized substance {} dropped",
                    d.substance
                ),
            }
        }
    }
}
