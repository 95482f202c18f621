//! The scheduler: registered operations, the main loop, restore and backup.

use std::time::Instant;

use cyto_checkpoint::{Backup, RuntimeVariables, Snapshot, SnapshotRef};
use cyto_core::timing::maybe_time;
use cyto_core::{Params, TimingAggregator};
use cyto_output::{AgentSnapshotRow, CsvWriter, OutputWriter, SubstanceSnapshotRow};

use crate::operation::{ComputeTarget, OpKind, Operation, ScheduledOp};
use crate::ops::{
    BehaviorsOp, BoundSpaceOp, DiffusionOp, DiscretizationOp, DisplacementOp, FirstOp, LastOp,
};
use crate::simulation::Simulation;
use crate::{SimError, SimResult};

/// Operations that cannot be unscheduled.
const PROTECTED_OPS: [&str; 4] = ["first op", "behaviors", "discretization", "last op"];

/// Drives the fixed-timestep main loop.
pub struct Scheduler {
    row_ops: Vec<ScheduledOp>,
    column_ops: Vec<ScheduledOp>,
    pending_schedule: Vec<ScheduledOp>,
    pending_unschedule: Vec<String>,

    total_steps: u64,
    initialized: bool,

    backup: Backup,
    restore_point: Option<u64>,
    last_backup: Instant,

    exporter: Option<Box<dyn OutputWriter>>,
    timing: Option<TimingAggregator>,
}

impl Scheduler {
    /// Build a scheduler with the default operations registered in order.
    pub fn new(params: &Params) -> Scheduler {
        let mut pending_schedule = Vec::new();
        let defaults: [Box<dyn Operation>; 7] = [
            Box::new(FirstOp),
            Box::new(BoundSpaceOp),
            Box::new(BehaviorsOp),
            Box::new(DisplacementOp::new()),
            Box::new(DiscretizationOp),
            Box::new(DiffusionOp),
            Box::new(LastOp),
        ];
        for op in defaults {
            pending_schedule.push(ScheduledOp::new(op, 1));
        }

        let backup = Backup::new(
            &params.simulation.backup_file,
            &params.simulation.restore_file,
        );
        let restore_point = if backup.restore_enabled() {
            match backup.steps_in_restore() {
                Ok(steps) => Some(steps),
                Err(e) => {
                    log::warn!("Scheduler: restore file unreadable ({e}); starting fresh");
                    None
                }
            }
        } else {
            None
        };

        let exporter: Option<Box<dyn OutputWriter>> = if params.visualization.export {
            match CsvWriter::new(std::path::Path::new(&params.visualization.output_dir)) {
                Ok(writer) => Some(Box::new(writer)),
                Err(e) => {
                    log::warn!("Scheduler: could not open export writer ({e}); export disabled");
                    None
                }
            }
        } else {
            None
        };

        Scheduler {
            row_ops: Vec::new(),
            column_ops: Vec::new(),
            pending_schedule,
            pending_unschedule: Vec::new(),
            total_steps: 0,
            initialized: false,
            backup,
            restore_point,
            last_backup: Instant::now(),
            exporter,
            timing: params.development.statistics.then(TimingAggregator::new),
        }
    }

    /// Number of completed simulation steps.
    pub fn total_steps(&self) -> u64 {
        self.total_steps
    }

    /// `true` once [`Scheduler::simulate`] has initialized the operation
    /// lists and resources.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    // ── Operation registry ────────────────────────────────────────────────

    /// Register an operation; applied at the next initialization or step
    /// boundary.  Duplicate names are a logged no-op.
    pub fn schedule(&mut self, op: Box<dyn Operation>, frequency: u64) {
        let name = op.name();
        if self.is_scheduled(name) {
            log::warn!("Scheduler: operation '{name}' is already scheduled; request ignored");
            return;
        }
        self.pending_schedule.push(ScheduledOp::new(op, frequency));
    }

    /// Remove an operation by name at the next boundary.  Protected
    /// operations and unknown names are logged no-ops.
    pub fn unschedule(&mut self, name: &str) {
        if PROTECTED_OPS.contains(&name) {
            log::warn!(
                "Scheduler: tried to remove the protected operation '{name}'; request ignored"
            );
            return;
        }
        if !self.is_scheduled(name) {
            log::warn!("Scheduler: cannot unschedule unknown operation '{name}'");
            return;
        }
        self.pending_unschedule.push(name.to_string());
    }

    fn is_scheduled(&self, name: &str) -> bool {
        self.row_ops.iter().any(|s| s.name() == name)
            || self.column_ops.iter().any(|s| s.name() == name)
            || self.pending_schedule.iter().any(|s| s.name() == name)
    }

    /// Currently (or pending) scheduled operation names, row-wise first.
    pub fn scheduled_op_names(&self) -> Vec<&'static str> {
        self.row_ops
            .iter()
            .chain(self.column_ops.iter())
            .chain(self.pending_schedule.iter())
            .map(|s| s.name())
            .collect()
    }

    fn apply_op_changes(&mut self, params: &Params) {
        for mut sched in self.pending_schedule.drain(..) {
            sched.target = select_target(sched.op.as_ref(), params);
            match sched.kind() {
                OpKind::RowWise => self.row_ops.push(sched),
                OpKind::ColumnWise => self.column_ops.push(sched),
            }
        }
        for name in self.pending_unschedule.drain(..) {
            self.row_ops.retain(|s| s.name() != name);
            self.column_ops.retain(|s| s.name() != name);
        }
    }

    // ── Main loop ─────────────────────────────────────────────────────────

    /// Run `steps` simulation steps.
    ///
    /// When a restore file is configured, the call participates in the
    /// restore window logic: calls entirely before the restore point are
    /// counted but skipped; the call containing it loads the snapshot and
    /// runs only the remaining steps.
    ///
    /// # Panics
    /// A simulation without agents is fatal.
    pub fn simulate(&mut self, sim: &mut Simulation, steps: u64) -> SimResult<()> {
        let mut steps = steps;
        if self.restore(sim, &mut steps)? {
            return Ok(());
        }

        self.initialize(sim);
        for _ in 0..steps {
            self.execute(sim);
            self.total_steps += 1;
            self.backup_if_due(sim)?;
        }
        Ok(())
    }

    /// Restore handling; `true` means this call is already accounted for.
    fn restore(&mut self, sim: &mut Simulation, steps: &mut u64) -> SimResult<bool> {
        let Some(restore_point) = self.restore_point else {
            return Ok(false);
        };
        if restore_point >= self.total_steps + *steps {
            // The restore point lies at or beyond this whole call: count it
            // as done without simulating.
            self.total_steps += *steps;
            if self.total_steps == restore_point {
                // The window boundary landed exactly on the restore point;
                // load now so the next call continues from restored state.
                let snapshot = self.backup.load().map_err(SimError::from)?;
                apply_snapshot(sim, snapshot);
                self.restore_point = None;
            }
            return Ok(true);
        }
        if restore_point > self.total_steps {
            let snapshot = self.backup.load().map_err(SimError::from)?;
            apply_snapshot(sim, snapshot);
            *steps = self.total_steps + *steps - restore_point;
            self.total_steps = restore_point;
            self.restore_point = None;
        }
        Ok(false)
    }

    fn initialize(&mut self, sim: &mut Simulation) {
        // Commit anything buffered outside a step (factory inserts go
        // directly to the store, but behaviors may have queued effects in
        // earlier calls).
        sim.teardown_exec();

        if sim.store.is_empty() {
            panic!("Scheduler: simulation must contain at least one agent");
        }

        if sim.params.simulation.bound_space {
            let lb = sim.params.simulation.min_bound;
            let rb = sim.params.simulation.max_bound;
            sim.store
                .for_each_agent_parallel(|_, cm| crate::ops::apply_bounding_box(cm.position, lb, rb));
        }

        sim.grid.update(&mut sim.store);
        sim.substances.initialize_all(sim.grid.dimension_thresholds());

        self.apply_op_changes(&sim.params);
        self.initialized = true;
    }

    /// One step.
    fn execute(&mut self, sim: &mut Simulation) {
        let timing = self.timing.as_ref();

        maybe_time(timing, "setup exec context", || sim.exec.setup_iteration());
        maybe_time(timing, "update index", || sim.grid.update(&mut sim.store));

        // Export/visualization hook.
        if let Some(exporter) = self.exporter.as_mut() {
            let interval = sim.params.visualization.export_interval.max(1);
            if self.total_steps % interval == 0 {
                let rows = snapshot_rows(sim, self.total_steps);
                let substance_rows = substance_rows(sim, self.total_steps);
                if let Err(e) = exporter
                    .write_snapshot(&rows)
                    .and_then(|_| exporter.write_substances(&substance_rows))
                {
                    log::warn!("Scheduler: export failed at step {} ({e})", self.total_steps);
                }
            }
        }

        let step = self.total_steps;
        for sched in &mut self.row_ops {
            if step % sched.frequency == 0 {
                maybe_time(timing, sched.op.name(), || sched.op.execute(sim));
            }
        }
        for sched in &mut self.column_ops {
            if step % sched.frequency == 0 {
                maybe_time(timing, sched.op.name(), || sched.op.execute(sim));
            }
        }

        maybe_time(timing, "teardown exec context", || sim.teardown_exec());

        if sim.params.development.show_simulation_step
            && step % sim.params.development.simulation_step_freq.max(1) == 0
        {
            log::info!("step {step} ({} agents)", sim.store.num_agents());
        }

        self.apply_op_changes(&sim.params);
    }

    // ── Backup ────────────────────────────────────────────────────────────

    fn backup_if_due(&mut self, sim: &Simulation) -> SimResult<()> {
        if !self.backup.backup_enabled() {
            return Ok(());
        }
        if self.last_backup.elapsed().as_secs() < sim.params.simulation.backup_interval {
            return Ok(());
        }
        self.last_backup = Instant::now();
        self.backup_now(sim);
        Ok(())
    }

    /// Take a snapshot immediately.  A failed write skips this backup and
    /// the simulation continues.
    pub fn backup_now(&mut self, sim: &Simulation) {
        let agents = sim.store.extract_all();
        let streams = sim.rngs.snapshot();
        let snapshot = SnapshotRef {
            completed_steps: self.total_steps,
            runtime: RuntimeVariables::detect(),
            agents: &agents,
            substances: &sim.substances,
            rng_streams: &streams,
        };
        if let Err(e) = self.backup.save(&snapshot) {
            log::warn!(
                "Scheduler: backup at step {} failed ({e}); continuing without it",
                self.total_steps
            );
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if let Some(exporter) = self.exporter.as_mut() {
            if let Err(e) = exporter.finish() {
                log::warn!("Scheduler: closing the export writer failed ({e})");
            }
        }
        if let Some(timing) = &self.timing {
            log::info!("operation statistics:\n{timing}");
        }
    }
}

// ── Snapshot plumbing ─────────────────────────────────────────────────────────

fn apply_snapshot(sim: &mut Simulation, snapshot: Snapshot) {
    snapshot.check_runtime();
    log::info!(
        "Scheduler: restoring simulation state at step {} ({} agents)",
        snapshot.completed_steps,
        snapshot.agents.len()
    );
    sim.store = cyto_agent::AgentStore::from_agents(sim.thread_info.clone(), snapshot.agents);
    sim.substances.replace(snapshot.substances);
    sim.rngs.restore(snapshot.rng_streams);
    // The index is rebuilt from the restored store at the next step.
    sim.grid = cyto_spatial::UniformGrid::new();
}

/// Voxel rows for every substance named in a `[[visualize_diffusion]]` entry.
fn substance_rows(sim: &Simulation, step: u64) -> Vec<SubstanceSnapshotRow> {
    let mut rows = Vec::new();
    for entry in &sim.params.visualize_diffusion {
        let Some(grid) = sim.substances.iter().find(|g| g.name() == entry.name) else {
            log::warn!(
                "Scheduler: [[visualize_diffusion]] names unknown substance '{}'",
                entry.name
            );
            continue;
        };
        if !entry.concentration && !entry.gradient {
            continue;
        }
        grid.for_each_box(|center, concentration, gradient| {
            rows.push(SubstanceSnapshotRow {
                substance: entry.name.clone(),
                step,
                x: center[0],
                y: center[1],
                z: center[2],
                concentration,
                gradient: entry.gradient.then(|| gradient.0),
            });
        });
    }
    rows
}

fn snapshot_rows(sim: &Simulation, step: u64) -> Vec<AgentSnapshotRow> {
    let mut rows = Vec::with_capacity(sim.store.num_agents());
    sim.store.for_each_agent(|_, cell| {
        rows.push(AgentSnapshotRow {
            uid: cell.uid,
            step,
            x: cell.position[0],
            y: cell.position[1],
            z: cell.position[2],
            diameter: cell.diameter,
        });
    });
    rows
}

fn select_target(op: &dyn Operation, params: &Params) -> ComputeTarget {
    if params.experimental.use_gpu {
        let wanted = if params.experimental.use_opencl {
            ComputeTarget::OpenCl
        } else {
            ComputeTarget::Cuda
        };
        if op.supported_targets().contains(&wanted) {
            return wanted;
        }
        log::warn!(
            "Scheduler: operation '{}' has no {wanted:?} implementation; \
             falling back to the CPU",
            op.name()
        );
    }
    ComputeTarget::Cpu
}
