//! The default operations.
//!
//! Registered by the scheduler in this order: `"first op"`, `"bound space"`,
//! `"behaviors"`, `"displacement"`, `"discretization"`, `"diffusion"`,
//! `"last op"`.  The four marked *protected* (`first op`, `behaviors`,
//! `discretization`, `last op`) cannot be unscheduled.

use std::sync::Mutex;

use cyto_agent::{run_agent_behaviors, BehaviorResources};
use cyto_core::Real3;
use rayon::prelude::*;

use crate::force::{force_between_spheres, ForceParams};
use crate::operation::{ComputeTarget, OpKind, Operation};
use crate::simulation::Simulation;

/// Movements below this length do not keep an agent mechanically awake.
const WAKE_THRESHOLD: f64 = 1e-9;

// ── first op ──────────────────────────────────────────────────────────────────

/// Commit each agent's next-step displacement flag into the current one.
pub struct FirstOp;

impl Operation for FirstOp {
    fn name(&self) -> &'static str {
        "first op"
    }

    fn kind(&self) -> OpKind {
        OpKind::RowWise
    }

    fn execute(&mut self, sim: &mut Simulation) {
        sim.store.for_each_agent_parallel(|_, cm| {
            *cm.run_displacement = *cm.run_displacement_next;
            *cm.run_displacement_next = false;
        });
    }
}

// ── bound space ───────────────────────────────────────────────────────────────

/// Clamp agent positions into `[min_bound, max_bound)`.
pub struct BoundSpaceOp;

/// Clamp one position into the cube `[lb, rb)`.
///
/// The upper bound is exclusive by a small margin so clamped agents stay
/// strictly inside the simulation space.
pub fn apply_bounding_box(position: &mut Real3, lb: f64, rb: f64) {
    const EPS: f64 = 1e-10;
    for axis in 0..3 {
        if position[axis] < lb {
            position[axis] = lb;
        } else if position[axis] >= rb {
            position[axis] = rb - EPS;
        }
    }
}

impl Operation for BoundSpaceOp {
    fn name(&self) -> &'static str {
        "bound space"
    }

    fn kind(&self) -> OpKind {
        OpKind::RowWise
    }

    fn execute(&mut self, sim: &mut Simulation) {
        if !sim.params.simulation.bound_space {
            return;
        }
        let lb = sim.params.simulation.min_bound;
        let rb = sim.params.simulation.max_bound;
        sim.store
            .for_each_agent_parallel(|_, cm| apply_bounding_box(cm.position, lb, rb));
    }
}

// ── behaviors ─────────────────────────────────────────────────────────────────

/// Invoke every behavior's `run` for every agent.
pub struct BehaviorsOp;

impl Operation for BehaviorsOp {
    fn name(&self) -> &'static str {
        "behaviors"
    }

    fn kind(&self) -> OpKind {
        OpKind::RowWise
    }

    fn execute(&mut self, sim: &mut Simulation) {
        let Simulation {
            store,
            rngs,
            exec,
            substances,
            params,
            ..
        } = sim;
        let resources = BehaviorResources {
            rngs: &*rngs,
            exec: &*exec,
            substances: &*substances,
            time_step: params.simulation.time_step,
        };
        store.for_each_agent_parallel(|_, cm| run_agent_behaviors(cm, &resources));
    }
}

// ── displacement ──────────────────────────────────────────────────────────────

/// Mechanical interactions: accumulate pairwise forces over the half-Moore
/// sweep into per-thread scratch, reduce, and apply a capped position update.
pub struct DisplacementOp {
    pub force_params: ForceParams,
}

impl DisplacementOp {
    pub fn new() -> DisplacementOp {
        DisplacementOp {
            force_params: ForceParams::default(),
        }
    }
}

impl Default for DisplacementOp {
    fn default() -> Self {
        DisplacementOp::new()
    }
}

impl Operation for DisplacementOp {
    fn name(&self) -> &'static str {
        "displacement"
    }

    fn kind(&self) -> OpKind {
        OpKind::RowWise
    }

    fn supported_targets(&self) -> &[ComputeTarget] {
        // GPU displacement kernels are replaceable implementations selected
        // by this tag; this build ships the CPU path.
        &[ComputeTarget::Cpu]
    }

    fn execute(&mut self, sim: &mut Simulation) {
        if !sim.params.simulation.run_mechanical_interactions || !sim.grid.is_initialized() {
            return;
        }

        let largest = sim.grid.largest_object_size();
        let squared_radius = largest * largest;
        let slots = sim.grid.agent_slot_count();
        let threads = rayon::current_num_threads().max(1);

        // Per-thread force rows; each row is only ever locked by its own
        // thread, the mutexes satisfy the Fn closure bound.
        let scratch: Vec<Mutex<Vec<Real3>>> = (0..threads)
            .map(|_| Mutex::new(vec![Real3::ZERO; slots]))
            .collect();

        {
            let grid = &sim.grid;
            let store = &sim.store;
            let rngs = &sim.rngs;
            let force_params = &self.force_params;
            grid.for_each_pair_within(store, squared_radius, |a, b| {
                let force = force_between_spheres(
                    store.position(a),
                    store.diameter(a),
                    store.position(b),
                    store.diameter(b),
                    force_params,
                    rngs,
                );
                let row_idx = rayon::current_thread_index().unwrap_or(0) % threads;
                let mut row = scratch[row_idx]
                    .lock()
                    .expect("DisplacementOp: poisoned force row");
                row[grid.agent_slot(a)] += force;
                row[grid.agent_slot(b)] -= force;
            });
        }

        // Reduce the thread rows into one force per agent.
        let rows: Vec<Vec<Real3>> = scratch
            .into_iter()
            .map(|m| m.into_inner().expect("DisplacementOp: poisoned force row"))
            .collect();
        let mut forces = vec![Real3::ZERO; slots];
        forces.par_iter_mut().enumerate().for_each(|(i, total)| {
            for row in &rows {
                *total += row[i];
            }
        });

        let h = sim.params.simulation.time_step;
        let max_displacement = sim.params.simulation.max_displacement;
        let Simulation { store, grid, .. } = sim;
        store.for_each_agent_parallel(|handle, cm| {
            if !*cm.run_displacement {
                return;
            }

            // Active (tractor) movement plus mechanics when the force breaks
            // the agent's adherence.
            let mut movement = *cm.tractor_force * h;
            let force = forces[grid.agent_slot(handle)];
            if force.norm() > *cm.adherence {
                movement += force * (h / cm.mass());
            }
            if movement.norm() > max_displacement {
                movement = movement.normalized() * max_displacement;
            }

            *cm.position += movement;
            *cm.tractor_force = Real3::ZERO;
            if movement.norm() > WAKE_THRESHOLD {
                *cm.run_displacement_next = true;
            }
        });
    }
}

// ── discretization ────────────────────────────────────────────────────────────

/// Kind-specific post-step adjustment.  Spherical cells need none;
/// cylindrical agent kinds re-segment their chains here.
pub struct DiscretizationOp;

impl Operation for DiscretizationOp {
    fn name(&self) -> &'static str {
        "discretization"
    }

    fn kind(&self) -> OpKind {
        OpKind::RowWise
    }

    fn execute(&mut self, _sim: &mut Simulation) {}
}

// ── diffusion ─────────────────────────────────────────────────────────────────

/// Advance every substance grid one step and refresh its gradient.
pub struct DiffusionOp;

impl Operation for DiffusionOp {
    fn name(&self) -> &'static str {
        "diffusion"
    }

    fn kind(&self) -> OpKind {
        OpKind::ColumnWise
    }

    fn execute(&mut self, sim: &mut Simulation) {
        if !sim.grid.is_initialized() {
            return;
        }
        let thresholds = sim.grid.dimension_thresholds();
        let grown = sim.grid.has_grown();
        let policy = if sim.params.simulation.leaking_edges {
            cyto_diffusion::BoundaryPolicy::Leaking
        } else {
            cyto_diffusion::BoundaryPolicy::Closed
        };

        for grid in sim.substances.iter_mut() {
            if grown && !sim.params.simulation.bound_space {
                log::info!(
                    "DiffusionOp: agents are approaching the edge of the simulation \
                     space; growing substance grid '{}'",
                    grid.name()
                );
                grid.update(thresholds);
            }
            grid.step(policy);
            if sim.params.simulation.calculate_gradients {
                grid.calculate_gradient();
            }
        }
    }
}

// ── last op ───────────────────────────────────────────────────────────────────

/// Finalize next-step displacement flags: agents that moved stay awake, and
/// so do their neighbors within the interaction radius.
pub struct LastOp;

impl Operation for LastOp {
    fn name(&self) -> &'static str {
        "last op"
    }

    fn kind(&self) -> OpKind {
        OpKind::RowWise
    }

    fn execute(&mut self, sim: &mut Simulation) {
        if !sim.grid.is_initialized() {
            return;
        }
        let largest = sim.grid.largest_object_size();
        let squared_radius = largest * largest;
        let slots = sim.grid.agent_slot_count();

        // Snapshot flat state: the wake decision must read a stable view,
        // not flags other workers are writing.
        let mut positions = vec![Real3::ZERO; slots];
        let mut boxes = vec![0u64; slots];
        let mut moved = vec![false; slots];
        {
            let grid = &sim.grid;
            sim.store.for_each_agent(|h, cell| {
                let slot = grid.agent_slot(h);
                positions[slot] = cell.position;
                boxes[slot] = cell.box_idx;
                moved[slot] = cell.run_displacement_next;
            });
        }

        let grid = &sim.grid;
        let wake: Vec<bool> = (0..slots)
            .into_par_iter()
            .map(|i| {
                if moved[i] {
                    return true;
                }
                let mut wake = false;
                grid.for_each_in_moore(boxes[i], |nb| {
                    let j = grid.agent_slot(nb);
                    if j != i
                        && moved[j]
                        && positions[i].squared_distance(positions[j]) < squared_radius
                    {
                        wake = true;
                    }
                });
                wake
            })
            .collect();

        let Simulation { store, grid, .. } = sim;
        store.for_each_agent_parallel(|handle, cm| {
            *cm.run_displacement_next = wake[grid.agent_slot(handle)];
        });
    }
}
