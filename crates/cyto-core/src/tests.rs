//! Unit tests for cyto-core.

#[cfg(test)]
mod ids {
    use crate::{AgentHandle, AgentKind, AgentUid};
    use std::collections::HashSet;

    #[test]
    fn uids_are_unique_across_threads() {
        let mut handles = vec![];
        for _ in 0..8 {
            handles.push(std::thread::spawn(|| {
                (0..1000).map(|_| AgentUid::generate()).collect::<Vec<_>>()
            }));
        }
        let mut seen = HashSet::new();
        for h in handles {
            for uid in h.join().unwrap() {
                assert!(seen.insert(uid), "duplicate uid {uid}");
            }
        }
        assert_eq!(seen.len(), 8000);
    }

    #[test]
    fn handle_packs_and_unpacks() {
        let h = AgentHandle::new(3, AgentKind::Cell, 123_456);
        assert_eq!(AgentHandle::unpack(h.pack()), h);
        assert!(h.is_valid());
    }

    #[test]
    fn invalid_handle_is_sentinel() {
        assert_eq!(AgentHandle::INVALID.pack(), AgentHandle::INVALID_PACKED);
        assert!(!AgentHandle::INVALID.is_valid());
        assert_eq!(AgentHandle::default(), AgentHandle::INVALID);
    }

    #[test]
    fn kind_index_round_trip() {
        assert_eq!(AgentKind::from_index(AgentKind::Cell.index()), Some(AgentKind::Cell));
        assert_eq!(AgentKind::from_index(999), None);
    }
}

#[cfg(test)]
mod math {
    use crate::Real3;

    #[test]
    fn basic_ops() {
        let a = Real3::new(1.0, 2.0, 3.0);
        let b = Real3::new(4.0, 5.0, 6.0);
        assert_eq!(a + b, Real3::new(5.0, 7.0, 9.0));
        assert_eq!(b - a, Real3::new(3.0, 3.0, 3.0));
        assert_eq!(a * 2.0, Real3::new(2.0, 4.0, 6.0));
        assert_eq!(a.dot(b), 32.0);
    }

    #[test]
    fn norm_and_distance() {
        let v = Real3::new(3.0, 4.0, 0.0);
        assert_eq!(v.norm(), 5.0);
        assert_eq!(v.squared_norm(), 25.0);
        assert_eq!(Real3::ZERO.squared_distance(v), 25.0);
    }

    #[test]
    fn normalize_handles_zero() {
        assert_eq!(Real3::ZERO.normalized(), Real3::ZERO);
        let n = Real3::new(0.0, 0.0, 2.0).normalized();
        assert!((n.norm() - 1.0).abs() < 1e-15);
    }
}

#[cfg(test)]
mod event {
    use crate::event::{cell_division, EventRegistry};

    #[test]
    fn minted_kinds_are_single_bits() {
        let registry = EventRegistry::new();
        let a = registry.mint();
        let b = registry.mint();
        assert_eq!(a.0.count_ones(), 1);
        assert_eq!(b.0.count_ones(), 1);
        assert_ne!(a, b);
    }

    #[test]
    fn mask_membership() {
        let registry = EventRegistry::new();
        let a = registry.mint();
        let b = registry.mint();
        let mask = a.0 | b.0;
        assert!(a.is_in(mask));
        assert!(b.is_in(mask));
        assert!(!registry.mint().is_in(mask));
    }

    #[test]
    #[should_panic(expected = "64 unique event kinds")]
    fn sixty_fifth_kind_is_fatal() {
        let registry = EventRegistry::new();
        for _ in 0..65 {
            registry.mint();
        }
    }

    #[test]
    fn cell_division_is_stable() {
        assert_eq!(cell_division(), cell_division());
    }
}

#[cfg(test)]
mod rng {
    use crate::{RandomStreams, SimStream};

    #[test]
    fn same_seed_same_sequence() {
        let mut a = SimStream::new(42, 0);
        let mut b = SimStream::new(42, 0);
        for _ in 0..16 {
            assert_eq!(a.uniform(), b.uniform());
        }
    }

    #[test]
    fn different_streams_differ() {
        let mut a = SimStream::new(42, 0);
        let mut b = SimStream::new(42, 1);
        assert_ne!(a.uniform(), b.uniform());
    }

    #[test]
    fn noise3_respects_bounds() {
        let mut s = SimStream::new(7, 0);
        for _ in 0..100 {
            let n = s.noise3(3.0);
            for axis in 0..3 {
                assert!(n[axis] >= -3.0 && n[axis] <= 3.0);
            }
        }
    }

    #[test]
    fn snapshot_restore_replays() {
        let streams = RandomStreams::new(123, 4);
        let saved = streams.snapshot();
        let first: f64 = streams.with_current(|s| s.uniform());

        let mut restored = RandomStreams::new(999, 4);
        restored.restore(saved);
        let replayed: f64 = restored.with_current(|s| s.uniform());
        assert_eq!(first, replayed);
    }

    #[test]
    fn restore_with_fewer_streams_keeps_extras() {
        let donor = RandomStreams::new(5, 2);
        let mut target = RandomStreams::new(6, 4);
        target.restore(donor.snapshot());
        assert_eq!(target.len(), 4);
    }
}

#[cfg(test)]
mod thread_info {
    use crate::ThreadInfo;

    #[test]
    fn block_assignment_partitions_workers() {
        let info = ThreadInfo::with_layout(8, 2);
        assert_eq!(info.numa_nodes(), 2);
        assert_eq!(info.threads_in_node(0) + info.threads_in_node(1), 8);
        // Contiguous blocks: first half on node 0, second half on node 1.
        assert_eq!(info.numa_node_of(0), 0);
        assert_eq!(info.numa_node_of(7), 1);
        // Per-domain ids restart at zero.
        assert_eq!(info.numa_thread_id(0), 0);
        assert_eq!(info.numa_thread_id(4), 0);
    }

    #[test]
    fn more_domains_than_threads_is_clamped() {
        let info = ThreadInfo::with_layout(2, 16);
        assert_eq!(info.numa_nodes(), 2);
    }

    #[test]
    fn detect_yields_at_least_one_domain() {
        let info = ThreadInfo::detect();
        assert!(info.numa_nodes() >= 1);
        assert!(info.max_threads() >= 1);
    }
}

#[cfg(test)]
mod params {
    use crate::Params;

    #[test]
    fn defaults_match_documentation() {
        let p = Params::default();
        assert_eq!(p.simulation.backup_interval, 1800);
        assert_eq!(p.simulation.time_step, 0.01);
        assert_eq!(p.simulation.max_displacement, 3.0);
        assert!(p.simulation.run_mechanical_interactions);
        assert!(!p.simulation.bound_space);
        assert!(p.simulation.leaking_edges);
        assert!(p.simulation.calculate_gradients);
        assert_eq!(p.development.simulation_step_freq, 10);
    }

    #[test]
    fn parses_partial_config() {
        let p = Params::from_toml_str(
            r#"
            [simulation]
            time_step = 0.0125
            bound_space = true
            min_bound = -50.0
            max_bound = 50.0

            [visualization]
            export = true
            export_interval = 10
            "#,
        )
        .unwrap();
        assert_eq!(p.simulation.time_step, 0.0125);
        assert!(p.simulation.bound_space);
        assert_eq!(p.simulation.min_bound, -50.0);
        assert!(p.visualization.export);
        assert_eq!(p.visualization.export_interval, 10);
        // Untouched keys keep their defaults.
        assert_eq!(p.simulation.max_displacement, 3.0);
        assert!(!p.has_unknown_keys());
    }

    #[test]
    fn unknown_keys_are_tolerated() {
        let p = Params::from_toml_str(
            r#"
            [simulation]
            time_step = 0.5
            no_such_key = 1

            [no_such_section]
            x = 2
            "#,
        )
        .unwrap();
        assert_eq!(p.simulation.time_step, 0.5);
        assert!(p.has_unknown_keys());
    }

    #[test]
    fn malformed_config_is_an_error() {
        assert!(Params::from_toml_str("[simulation]\ntime_step = \"fast\"").is_err());
    }

    #[test]
    fn repeatable_visualize_tables() {
        let p = Params::from_toml_str(
            r#"
            [visualization]
            export = true

            [[visualize_agent]]
            name = "Cell"
            additional_data_members = ["density"]

            [[visualize_diffusion]]
            name = "Kalium"

            [[visualize_diffusion]]
            name = "Natrium"
            concentration = true
            gradient = true
            "#,
        )
        .unwrap();
        assert_eq!(p.visualize_agents.len(), 1);
        assert_eq!(p.visualize_agents[0].name, "Cell");
        assert_eq!(p.visualize_agents[0].additional_data_members, ["density"]);

        assert_eq!(p.visualize_diffusion.len(), 2);
        assert!(p.visualize_diffusion[0].concentration);
        assert!(!p.visualize_diffusion[0].gradient);
        assert!(p.visualize_diffusion[1].gradient);
        assert!(!p.has_unknown_keys());
    }
}

#[cfg(test)]
mod timing {
    use crate::timing::maybe_time;
    use crate::TimingAggregator;

    #[test]
    fn accumulates_counts() {
        let agg = TimingAggregator::new();
        for _ in 0..3 {
            agg.time("op", || {});
        }
        let report = agg.to_string();
        assert!(report.contains("op"));
        assert!(report.contains(" 3"));
    }

    #[test]
    fn maybe_time_without_aggregator_runs() {
        assert_eq!(maybe_time(None, "x", || 41 + 1), 42);
    }
}
