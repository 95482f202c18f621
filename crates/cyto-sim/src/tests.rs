//! Unit and end-to-end tests for cyto-sim.

#[cfg(test)]
mod helpers {
    use crate::{Scheduler, Simulation, SimulationBuilder};
    use cyto_agent::{Behavior, BehaviorBase, Cell, GrowDivide};
    use cyto_core::{Params, Real3, ThreadInfo, ALL_EVENTS, NO_EVENTS};

    /// A growth-only behavior: never reaches its division threshold, so the
    /// trajectory consumes no randomness and is bitwise reproducible.
    pub fn growth_only() -> Behavior {
        Behavior::GrowDivide(GrowDivide::new(
            1e9,
            300.0,
            BehaviorBase::new(ALL_EVENTS, NO_EVENTS),
        ))
    }

    /// 3×3×3 lattice of identical growing cells.
    pub fn growing_lattice(params: Params, seed: u64) -> (Simulation, Scheduler) {
        let cells = crate::init::grid_3d(3, 20.0, |pos| {
            let mut c = Cell::with_diameter(10.0);
            c.position = pos;
            c.adherence = 0.4;
            c.add_behavior(growth_only());
            c
        });
        SimulationBuilder::new(params)
            .seed(seed)
            .thread_info(ThreadInfo::with_layout(4, 2))
            .agents(cells)
            .build()
    }

    /// Collected `(position, diameter)` sorted by UID.
    pub fn state_of(sim: &Simulation) -> Vec<(u64, Real3, f64)> {
        let mut out = Vec::new();
        sim.store
            .for_each_agent(|_, c| out.push((c.uid.0, c.position, c.diameter)));
        out.sort_by_key(|e| e.0);
        out
    }
}

#[cfg(test)]
mod scheduler {
    use super::helpers::growing_lattice;
    use crate::operation::{OpKind, Operation};
    use crate::simulation::Simulation;
    use crate::SimulationBuilder;
    use cyto_core::Params;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    struct CountingOp {
        calls: Arc<AtomicU64>,
    }

    impl Operation for CountingOp {
        fn name(&self) -> &'static str {
            "counting op"
        }
        fn kind(&self) -> OpKind {
            OpKind::ColumnWise
        }
        fn execute(&mut self, _sim: &mut Simulation) {
            self.calls.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn runs_requested_steps() {
        let (mut sim, mut scheduler) = growing_lattice(Params::default(), 1);
        scheduler.simulate(&mut sim, 10).unwrap();
        assert_eq!(scheduler.total_steps(), 10);
        assert_eq!(sim.store.num_agents(), 27);
    }

    #[test]
    #[should_panic(expected = "at least one agent")]
    fn empty_simulation_is_fatal() {
        let (mut sim, mut scheduler) = SimulationBuilder::new(Params::default()).build();
        let _ = scheduler.simulate(&mut sim, 1);
    }

    #[test]
    fn operation_frequency_is_respected() {
        let (mut sim, mut scheduler) = growing_lattice(Params::default(), 1);
        let calls = Arc::new(AtomicU64::new(0));
        scheduler.schedule(
            Box::new(CountingOp {
                calls: calls.clone(),
            }),
            3,
        );
        scheduler.simulate(&mut sim, 10).unwrap();
        // Steps 0, 3, 6, 9.
        assert_eq!(calls.load(Ordering::Relaxed), 4);
    }

    #[test]
    fn duplicate_operation_name_is_ignored() {
        let (_, mut scheduler) = growing_lattice(Params::default(), 1);
        let calls = Arc::new(AtomicU64::new(0));
        scheduler.schedule(Box::new(CountingOp { calls: calls.clone() }), 1);
        scheduler.schedule(Box::new(CountingOp { calls }), 1);
        let names: Vec<_> = scheduler
            .scheduled_op_names()
            .into_iter()
            .filter(|n| *n == "counting op")
            .collect();
        assert_eq!(names.len(), 1);
    }

    #[test]
    fn protected_operations_cannot_be_unscheduled() {
        let (mut sim, mut scheduler) = growing_lattice(Params::default(), 1);
        scheduler.simulate(&mut sim, 1).unwrap();
        for name in ["first op", "behaviors", "discretization", "last op"] {
            scheduler.unschedule(name);
        }
        scheduler.simulate(&mut sim, 1).unwrap();
        for name in ["first op", "behaviors", "discretization", "last op"] {
            assert!(scheduler.scheduled_op_names().contains(&name), "{name} removed");
        }
    }

    #[test]
    fn unprotected_operations_can_be_unscheduled() {
        let (mut sim, mut scheduler) = growing_lattice(Params::default(), 1);
        scheduler.simulate(&mut sim, 1).unwrap();
        scheduler.unschedule("displacement");
        scheduler.simulate(&mut sim, 1).unwrap();
        assert!(!scheduler.scheduled_op_names().contains(&"displacement"));
    }

    #[test]
    fn unknown_unschedule_is_a_noop() {
        let (_, mut scheduler) = growing_lattice(Params::default(), 1);
        scheduler.unschedule("no such op");
    }

    /// `simulate(n)` then `simulate(m)` equals one `simulate(n + m)` when the
    /// seed is fixed and no backup interferes.
    #[test]
    fn split_simulation_matches_single_run() {
        let (mut sim_a, mut sched_a) = growing_lattice(Params::default(), 7);
        sched_a.simulate(&mut sim_a, 60).unwrap();
        sched_a.simulate(&mut sim_a, 40).unwrap();

        let (mut sim_b, mut sched_b) = growing_lattice(Params::default(), 7);
        sched_b.simulate(&mut sim_b, 100).unwrap();

        assert_eq!(sched_a.total_steps(), sched_b.total_steps());
        let a = super::helpers::state_of(&sim_a);
        let b = super::helpers::state_of(&sim_b);
        assert_eq!(a.len(), b.len());
        for (ea, eb) in a.iter().zip(&b) {
            assert_eq!(ea.1, eb.1, "position drift");
            assert_eq!(ea.2, eb.2, "diameter drift");
        }
    }
}

#[cfg(test)]
mod mechanics {
    use crate::SimulationBuilder;
    use cyto_agent::Cell;
    use cyto_core::{Params, Real3, ThreadInfo};

    fn two_overlapping_cells(params: Params) -> (crate::Simulation, crate::Scheduler) {
        let mut a = Cell::with_diameter(10.0);
        a.position = Real3::new(0.0, 0.0, 0.0);
        let mut b = Cell::with_diameter(10.0);
        b.position = Real3::new(6.0, 0.0, 0.0);
        SimulationBuilder::new(params)
            .thread_info(ThreadInfo::with_layout(2, 1))
            .agent(a)
            .agent(b)
            .build()
    }

    #[test]
    fn overlapping_cells_repel() {
        let (mut sim, mut scheduler) = two_overlapping_cells(Params::default());
        scheduler.simulate(&mut sim, 20).unwrap();

        let mut xs: Vec<f64> = Vec::new();
        sim.store.for_each_agent(|_, c| xs.push(c.position[0]));
        xs.sort_by(|p, q| p.partial_cmp(q).unwrap());
        // Overlap of 4 units shrinks as the pair is pushed apart.
        let gap = xs[1] - xs[0];
        assert!(gap > 6.0, "cells did not separate (gap {gap})");
        // Symmetric forces: the midpoint stays put.
        assert!(((xs[0] + xs[1]) / 2.0 - 3.0).abs() < 1e-9);
    }

    #[test]
    fn mechanics_can_be_disabled() {
        let mut params = Params::default();
        params.simulation.run_mechanical_interactions = false;
        let (mut sim, mut scheduler) = two_overlapping_cells(params);
        scheduler.simulate(&mut sim, 20).unwrap();
        let mut xs: Vec<f64> = Vec::new();
        sim.store.for_each_agent(|_, c| xs.push(c.position[0]));
        xs.sort_by(|p, q| p.partial_cmp(q).unwrap());
        assert_eq!(xs, vec![0.0, 6.0]);
    }

    #[test]
    fn displacement_is_capped() {
        let mut params = Params::default();
        params.simulation.max_displacement = 0.05;
        let (mut sim, mut scheduler) = two_overlapping_cells(params);
        let before: Vec<Real3> = {
            let mut v = Vec::new();
            sim.store.for_each_agent(|_, c| v.push(c.position));
            v
        };
        scheduler.simulate(&mut sim, 1).unwrap();
        let mut moved = Vec::new();
        sim.store.for_each_agent(|_, c| moved.push(c.position));
        for (a, b) in before.iter().zip(&moved) {
            assert!(a.squared_distance(*b).sqrt() <= 0.05 + 1e-12);
        }
    }

    #[test]
    fn bound_space_clamps_positions() {
        let mut params = Params::default();
        params.simulation.bound_space = true;
        params.simulation.min_bound = 0.0;
        params.simulation.max_bound = 10.0;

        let mut stray = Cell::with_diameter(5.0);
        stray.position = Real3::new(-3.0, 25.0, 5.0);
        let (mut sim, mut scheduler) = SimulationBuilder::new(params)
            .thread_info(ThreadInfo::with_layout(1, 1))
            .agent(stray)
            .build();
        scheduler.simulate(&mut sim, 1).unwrap();

        sim.store.for_each_agent(|_, c| {
            for axis in 0..3 {
                assert!(c.position[axis] >= 0.0);
                assert!(c.position[axis] < 10.0);
            }
        });
    }
}

#[cfg(test)]
mod population {
    use crate::SimulationBuilder;
    use cyto_agent::{Behavior, BehaviorBase, Cell, GrowDivide};
    use cyto_core::{Params, ThreadInfo, ALL_EVENTS, NO_EVENTS};

    /// Cells just below the division threshold divide within a few steps and
    /// the daughters inherit the behavior.
    #[test]
    fn grow_divide_increases_population() {
        let cells = crate::init::grid_3d(2, 30.0, |pos| {
            let mut c = Cell::with_diameter(39.0);
            c.position = pos;
            c.add_behavior(Behavior::GrowDivide(GrowDivide::new(
                40.0,
                300_000.0,
                BehaviorBase::new(ALL_EVENTS, NO_EVENTS),
            )));
            c
        });
        let (mut sim, mut scheduler) = SimulationBuilder::new(Params::default())
            .seed(11)
            .thread_info(ThreadInfo::with_layout(4, 2))
            .agents(cells)
            .build();

        scheduler.simulate(&mut sim, 10).unwrap();
        assert!(
            sim.store.num_agents() >= 16,
            "population did not grow: {}",
            sim.store.num_agents()
        );
        // Daughters carry the behavior (copy mask matches all events).
        sim.store
            .for_each_agent(|_, c| assert_eq!(c.behaviors.len(), 1));
    }

    #[test]
    fn rebalance_keeps_population_intact() {
        let (mut sim, mut scheduler) = super::helpers::growing_lattice(Params::default(), 3);
        scheduler.simulate(&mut sim, 5).unwrap();

        let before = super::helpers::state_of(&sim);
        sim.rebalance();
        let after = super::helpers::state_of(&sim);
        assert_eq!(before, after);

        // The simulation continues normally on the rebalanced layout.
        scheduler.simulate(&mut sim, 5).unwrap();
        assert_eq!(sim.store.num_agents(), 27);
    }
}

#[cfg(test)]
mod chemotaxis {
    use crate::SimulationBuilder;
    use cyto_agent::{Behavior, BehaviorBase, Cell, Chemotaxis};
    use cyto_core::{Params, Real3, SubstanceId, ThreadInfo, ALL_EVENTS, NO_EVENTS};
    use cyto_diffusion::{gaussian_band, Axis};

    /// A cell in a Gaussian band gradient drifts towards the band's center.
    #[test]
    fn cell_follows_gradient() {
        let mut cell = Cell::with_diameter(10.0);
        cell.position = Real3::new(40.0, 0.0, 0.0);
        cell.adherence = 1e9; // mechanics off the table; tractor force only
        cell.add_behavior(Behavior::Chemotaxis(Chemotaxis::new(
            SubstanceId(0),
            100.0,
            BehaviorBase::new(ALL_EVENTS, NO_EVENTS),
        )));
        let mut anchor = Cell::with_diameter(10.0);
        anchor.position = Real3::new(-60.0, 0.0, 0.0);

        let (mut sim, mut scheduler) = SimulationBuilder::new(Params::default())
            .thread_info(ThreadInfo::with_layout(1, 1))
            .substance(SubstanceId(0), "attractant", 0.4, 0.0, 10)
            .initializer(SubstanceId(0), gaussian_band(0.0, 30.0, Axis::X))
            .agent(cell)
            .agent(anchor)
            .build();

        scheduler.simulate(&mut sim, 50).unwrap();

        let mut xs = Vec::new();
        sim.store.for_each_agent(|_, c| xs.push(c.position[0]));
        let follower = xs.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        assert!(follower < 40.0, "cell did not move towards the band center");
    }
}

#[cfg(test)]
mod checkpointing {
    use super::helpers::{growing_lattice, state_of};
    use cyto_core::Params;

    /// Backup after 100 steps, restore into a fresh simulation, run 100 more:
    /// bit-identical to a single 200-step run.
    #[test]
    fn backup_restore_matches_uninterrupted_run() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sim.bin");
        let path_str = path.to_str().unwrap();

        // Reference: 200 uninterrupted steps.
        let (mut reference, mut ref_sched) = growing_lattice(Params::default(), 99);
        ref_sched.simulate(&mut reference, 200).unwrap();

        // Interrupted run: 100 steps, explicit backup.
        let mut params = Params::default();
        params.simulation.backup_file = path_str.to_string();
        let (mut first, mut first_sched) = growing_lattice(params, 99);
        first_sched.simulate(&mut first, 100).unwrap();
        first_sched.backup_now(&first);

        // Fresh process: restore and continue for the remaining window.
        let mut params = Params::default();
        params.simulation.restore_file = path_str.to_string();
        let (mut resumed, mut resumed_sched) = growing_lattice(params, 1234);
        resumed_sched.simulate(&mut resumed, 200).unwrap();
        assert_eq!(resumed_sched.total_steps(), 200);

        let a = state_of(&reference);
        let b = state_of(&resumed);
        assert_eq!(a.len(), b.len());
        for (ea, eb) in a.iter().zip(&b) {
            assert_eq!(ea.1, eb.1, "position mismatch after restore");
            assert_eq!(ea.2, eb.2, "diameter mismatch after restore");
        }
    }

    /// A call entirely before the restore point is counted without work.
    #[test]
    fn restore_short_circuits_completed_calls() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sim.bin");
        let path_str = path.to_str().unwrap();

        let mut params = Params::default();
        params.simulation.backup_file = path_str.to_string();
        let (mut donor, mut donor_sched) = growing_lattice(params, 5);
        donor_sched.simulate(&mut donor, 100).unwrap();
        donor_sched.backup_now(&donor);

        let mut params = Params::default();
        params.simulation.restore_file = path_str.to_string();
        let (mut resumed, mut resumed_sched) = growing_lattice(params, 5);
        resumed_sched.simulate(&mut resumed, 40).unwrap();
        // Counted, but nothing simulated yet.
        assert_eq!(resumed_sched.total_steps(), 40);
        resumed_sched.simulate(&mut resumed, 100).unwrap();
        assert_eq!(resumed_sched.total_steps(), 140);
    }
}

#[cfg(test)]
mod secretion {
    use crate::SimulationBuilder;
    use cyto_agent::{Behavior, BehaviorBase, Cell, Secretion};
    use cyto_core::{Params, Real3, SubstanceId, ThreadInfo, ALL_EVENTS, NO_EVENTS};

    /// A secreting cell raises the local concentration; the deposit lands at
    /// iteration teardown and diffuses on the following step.
    #[test]
    fn secreted_substance_accumulates() {
        let mut cell = Cell::with_diameter(10.0);
        cell.position = Real3::new(5.0, 5.0, 5.0);
        cell.add_behavior(Behavior::Secretion(Secretion::new(
            SubstanceId(0),
            4.0,
            BehaviorBase::new(ALL_EVENTS, NO_EVENTS),
        )));
        let mut far = Cell::with_diameter(10.0);
        far.position = Real3::new(-40.0, -40.0, -40.0);

        let (mut sim, mut scheduler) = SimulationBuilder::new(Params::default())
            .thread_info(ThreadInfo::with_layout(1, 1))
            .substance(SubstanceId(0), "signal", 0.1, 0.0, 8)
            .agent(cell)
            .agent(far)
            .build();

        scheduler.simulate(&mut sim, 20).unwrap();

        let grid = sim.substances.get(SubstanceId(0)).unwrap();
        let near = grid.concentration(Real3::new(5.0, 5.0, 5.0));
        assert!(near > 0.0, "secreted substance missing near the source");
        // Leaking edges plus distance: far corner sees much less.
        assert!(grid.concentration(Real3::new(-40.0, -40.0, -40.0)) < near);
    }
}

#[cfg(test)]
mod export {
    use super::helpers::growing_lattice;
    use cyto_core::Params;

    #[test]
    fn export_writes_snapshot_rows() {
        let dir = tempfile::tempdir().unwrap();
        let mut params = Params::default();
        params.visualization.export = true;
        params.visualization.export_interval = 5;
        params.visualization.output_dir = dir.path().to_str().unwrap().to_string();

        let (mut sim, mut scheduler) = growing_lattice(params, 2);
        scheduler.simulate(&mut sim, 10).unwrap();
        drop(scheduler);

        let text = std::fs::read_to_string(dir.path().join("agent_snapshots.csv")).unwrap();
        // Header + 27 agents at steps 0 and 5.
        assert_eq!(text.lines().count(), 1 + 2 * 27);
        assert!(text.lines().nth(1).unwrap().ends_with(",10"));
    }

    #[test]
    fn export_writes_substance_voxels_when_configured() {
        use cyto_agent::Cell;
        use cyto_core::params::VisualizeDiffusion;
        use cyto_core::{Real3, SubstanceId, ThreadInfo};

        let dir = tempfile::tempdir().unwrap();
        let mut params = Params::default();
        params.visualization.export = true;
        params.visualization.export_interval = 10;
        params.visualization.output_dir = dir.path().to_str().unwrap().to_string();
        params.visualize_diffusion.push(VisualizeDiffusion {
            name: "signal".to_string(),
            concentration: true,
            gradient: true,
        });

        let mut cell = Cell::with_diameter(10.0);
        cell.position = Real3::new(0.0, 0.0, 0.0);
        let (mut sim, mut scheduler) = crate::SimulationBuilder::new(params)
            .thread_info(ThreadInfo::with_layout(1, 1))
            .substance(SubstanceId(0), "signal", 0.2, 0.0, 4)
            .agent(cell)
            .build();
        scheduler.simulate(&mut sim, 1).unwrap();
        drop(scheduler);

        let text =
            std::fs::read_to_string(dir.path().join("substance_snapshots.csv")).unwrap();
        let voxels = sim.substances.get(SubstanceId(0)).unwrap().num_boxes();
        assert_eq!(text.lines().count(), 1 + voxels);
        assert!(text.lines().next().unwrap().starts_with("substance,step,"));
    }
}

#[cfg(test)]
mod force {
    use crate::force::{force_between_spheres, ForceParams};
    use cyto_core::{RandomStreams, Real3};

    #[test]
    fn no_contact_no_force() {
        let rngs = RandomStreams::new(0, 1);
        let f = force_between_spheres(
            Real3::ZERO,
            10.0,
            Real3::new(20.0, 0.0, 0.0),
            10.0,
            &ForceParams::default(),
            &rngs,
        );
        assert_eq!(f, Real3::ZERO);
    }

    #[test]
    fn overlap_pushes_apart() {
        let rngs = RandomStreams::new(0, 1);
        let f = force_between_spheres(
            Real3::ZERO,
            10.0,
            Real3::new(6.0, 0.0, 0.0),
            10.0,
            &ForceParams::default(),
            &rngs,
        );
        // Force on the reference points away from the neighbor (−x).
        assert!(f[0] < 0.0);
        assert_eq!(f[1], 0.0);
        assert_eq!(f[2], 0.0);
    }

    #[test]
    fn coincident_centers_jitter() {
        let rngs = RandomStreams::new(0, 1);
        let f = force_between_spheres(
            Real3::ZERO,
            10.0,
            Real3::ZERO,
            10.0,
            &ForceParams::default(),
            &rngs,
        );
        assert!(f.norm() > 0.0);
        for axis in 0..3 {
            assert!(f[axis].abs() <= 3.0);
        }
    }

    #[test]
    fn adhesion_reduces_net_repulsion() {
        let rngs = RandomStreams::new(0, 1);
        let pos = Real3::new(6.0, 0.0, 0.0);
        let strong = force_between_spheres(
            Real3::ZERO,
            10.0,
            pos,
            10.0,
            &ForceParams {
                repulsion: 2.0,
                attraction: 0.0,
                margin: 0.0,
            },
            &rngs,
        );
        let with_adhesion =
            force_between_spheres(Real3::ZERO, 10.0, pos, 10.0, &ForceParams::default(), &rngs);
        assert!(with_adhesion.norm() < strong.norm());
    }
}
