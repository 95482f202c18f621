//! Unit tests for cyto-checkpoint.

#[cfg(test)]
mod backup {
    use crate::{Backup, RuntimeVariables, SnapshotRef};
    use cyto_agent::Cell;
    use cyto_core::{Real3, SimStream, SubstanceId};
    use cyto_diffusion::Substances;

    fn sample_state() -> (Vec<Cell>, Substances, Vec<SimStream>) {
        let mut cells = Vec::new();
        for i in 0..5 {
            let mut c = Cell::with_diameter(10.0 + i as f64);
            c.position = Real3::new(i as f64, 2.0 * i as f64, -1.0);
            cells.push(c);
        }
        let mut substances = Substances::new();
        substances.define(SubstanceId(0), "Kalium", 0.4, 0.0, 5);
        substances.initialize_all([-100, 100]);
        substances
            .get_mut(SubstanceId(0))
            .unwrap()
            .increase_at(Real3::ZERO, 4.0);

        let streams = vec![SimStream::new(1, 0), SimStream::new(1, 1)];
        (cells, substances, streams)
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sim.bin");
        let backup = Backup::new(path.to_str().unwrap(), path.to_str().unwrap());
        assert!(backup.backup_enabled());
        assert!(backup.restore_enabled());

        let (cells, substances, streams) = sample_state();
        backup
            .save(&SnapshotRef {
                completed_steps: 42,
                runtime: RuntimeVariables::detect(),
                agents: &cells,
                substances: &substances,
                rng_streams: &streams,
            })
            .unwrap();

        let snapshot = backup.load().unwrap();
        assert_eq!(snapshot.completed_steps, 42);
        assert_eq!(snapshot.agents.len(), 5);
        assert_eq!(snapshot.agents[3].position, Real3::new(3.0, 6.0, -1.0));
        assert!(
            (snapshot
                .substances
                .get(SubstanceId(0))
                .unwrap()
                .concentration(Real3::ZERO)
                - 4.0)
                .abs()
                < 1e-12
        );
        assert_eq!(snapshot.rng_streams.len(), 2);
        assert_eq!(backup.steps_in_restore().unwrap(), 42);
    }

    #[test]
    fn restored_streams_replay_identically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sim.bin");
        let backup = Backup::new(path.to_str().unwrap(), path.to_str().unwrap());

        let (cells, substances, mut streams) = sample_state();
        backup
            .save(&SnapshotRef {
                completed_steps: 0,
                runtime: RuntimeVariables::detect(),
                agents: &cells,
                substances: &substances,
                rng_streams: &streams,
            })
            .unwrap();

        let expected: f64 = streams[0].uniform();
        let mut snapshot = backup.load().unwrap();
        let replayed: f64 = snapshot.rng_streams[0].uniform();
        assert_eq!(expected, replayed);
    }

    #[test]
    fn empty_paths_disable_directions() {
        let backup = Backup::new("", "");
        assert!(!backup.backup_enabled());
        assert!(!backup.restore_enabled());
        assert!(backup.load().is_err());
    }

    #[test]
    fn interrupted_write_leaves_previous_backup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sim.bin");
        let backup = Backup::new(path.to_str().unwrap(), path.to_str().unwrap());

        let (cells, substances, streams) = sample_state();
        for steps in [1u64, 2] {
            backup
                .save(&SnapshotRef {
                    completed_steps: steps,
                    runtime: RuntimeVariables::detect(),
                    agents: &cells,
                    substances: &substances,
                    rng_streams: &streams,
                })
                .unwrap();
        }
        // No stray temp file remains and the newest snapshot wins.
        assert!(!dir.path().join("tmp_sim.bin").exists());
        assert_eq!(backup.steps_in_restore().unwrap(), 2);
    }

    #[test]
    fn runtime_detection_is_stable() {
        assert_eq!(RuntimeVariables::detect(), RuntimeVariables::detect());
    }
}
