//! Fluent builder for constructing a [`Simulation`] plus its [`Scheduler`].

use cyto_agent::Cell;
use cyto_core::{Params, SubstanceId, ThreadInfo};
use cyto_diffusion::Initializer;

use crate::scheduler::Scheduler;
use crate::simulation::Simulation;

/// Fluent builder for [`Simulation`].
///
/// # Example
///
/// ```rust,ignore
/// let (mut sim, mut scheduler) = SimulationBuilder::new(Params::default())
///     .seed(42)
///     .substance(SubstanceId(0), "Kalium", 0.4, 0.0, 20)
///     .agents(init::grid_3d(4, 20.0, |pos| {
///         let mut c = Cell::with_diameter(30.0);
///         c.position = pos;
///         c
///     }))
///     .build();
/// scheduler.simulate(&mut sim, 100)?;
/// ```
pub struct SimulationBuilder {
    params: Params,
    seed: u64,
    thread_info: Option<ThreadInfo>,
    agents: Vec<Cell>,
    substances: Vec<(SubstanceId, String, f64, f64, u32)>,
    initializers: Vec<(SubstanceId, Initializer)>,
}

impl SimulationBuilder {
    pub fn new(params: Params) -> SimulationBuilder {
        SimulationBuilder {
            params,
            seed: 0,
            thread_info: None,
            agents: Vec::new(),
            substances: Vec::new(),
            initializers: Vec::new(),
        }
    }

    /// Master RNG seed; the same seed replays the same trajectories.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Pin the worker/NUMA topology (tests use this for determinism).
    pub fn thread_info(mut self, info: ThreadInfo) -> Self {
        self.thread_info = Some(info);
        self
    }

    pub fn agent(mut self, cell: Cell) -> Self {
        self.agents.push(cell);
        self
    }

    pub fn agents(mut self, cells: Vec<Cell>) -> Self {
        self.agents.extend(cells);
        self
    }

    /// Define an extracellular substance.
    pub fn substance(
        mut self,
        id: SubstanceId,
        name: &str,
        diffusion_coefficient: f64,
        decay_constant: f64,
        resolution: u32,
    ) -> Self {
        self.substances.push((
            id,
            name.to_string(),
            diffusion_coefficient,
            decay_constant,
            resolution,
        ));
        self
    }

    /// Attach a concentration initializer to a substance defined above.
    pub fn initializer(mut self, id: SubstanceId, f: Initializer) -> Self {
        self.initializers.push((id, f));
        self
    }

    /// Assemble the simulation and a scheduler with the default operations.
    pub fn build(self) -> (Simulation, Scheduler) {
        let thread_info = self.thread_info.unwrap_or_default();
        let scheduler = Scheduler::new(&self.params);
        let mut sim = Simulation::with_thread_info(self.params, self.seed, thread_info);

        for (id, name, dc, mu, resolution) in self.substances {
            sim.define_substance(id, &name, dc, mu, resolution);
        }
        for (id, f) in self.initializers {
            sim.initialize_substance(id, f);
        }
        for cell in self.agents {
            sim.push_agent(cell);
        }
        (sim, scheduler)
    }
}
