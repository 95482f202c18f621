//! Unit tests for cyto-output.

#[cfg(test)]
mod csv {
    use crate::{AgentSnapshotRow, CsvWriter, OutputWriter};
    use cyto_core::AgentUid;

    fn row(uid: u64, step: u64) -> AgentSnapshotRow {
        AgentSnapshotRow {
            uid: AgentUid(uid),
            step,
            x: 1.5,
            y: -2.0,
            z: 0.0,
            diameter: 10.0,
        }
    }

    #[test]
    fn writes_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = CsvWriter::new(dir.path()).unwrap();
        writer.write_snapshot(&[row(0, 0), row(1, 0)]).unwrap();
        writer.write_snapshot(&[row(0, 5)]).unwrap();
        writer.finish().unwrap();

        let text = std::fs::read_to_string(dir.path().join("agent_snapshots.csv")).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "uid,step,x,y,z,diameter");
        assert_eq!(lines[1], "0,0,1.5,-2,0,10");
        assert_eq!(lines[3], "0,5,1.5,-2,0,10");
    }

    #[test]
    fn creates_missing_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("out/run1");
        let mut writer = CsvWriter::new(&nested).unwrap();
        writer.finish().unwrap();
        assert!(nested.join("agent_snapshots.csv").is_file());
    }

    #[test]
    fn finish_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = CsvWriter::new(dir.path()).unwrap();
        writer.finish().unwrap();
        writer.finish().unwrap();
    }

    #[test]
    fn substance_file_is_created_lazily() {
        use crate::SubstanceSnapshotRow;

        let dir = tempfile::tempdir().unwrap();
        let mut writer = CsvWriter::new(dir.path()).unwrap();
        writer.write_substances(&[]).unwrap();
        assert!(!dir.path().join("substance_snapshots.csv").exists());

        writer
            .write_substances(&[SubstanceSnapshotRow {
                substance: "Kalium".to_string(),
                step: 3,
                x: 0.5,
                y: 1.5,
                z: -2.5,
                concentration: 4.0,
                gradient: Some([0.1, 0.0, -0.1]),
            }])
            .unwrap();
        writer.finish().unwrap();

        let text =
            std::fs::read_to_string(dir.path().join("substance_snapshots.csv")).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "substance,step,x,y,z,concentration,gx,gy,gz");
        assert_eq!(lines[1], "Kalium,3,0.5,1.5,-2.5,4,0.1,0,-0.1");
    }
}
