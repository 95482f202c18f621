//! CSV output backend.
//!
//! Creates two files in the configured output directory:
//! - `agent_snapshots.csv` — one row per agent per exported step;
//! - `substance_snapshots.csv` — one row per exported diffusion voxel
//!   (opened lazily, only when substances are actually exported).

use std::fs::File;
use std::path::{Path, PathBuf};

use csv::Writer;

use crate::writer::OutputWriter;
use crate::{AgentSnapshotRow, OutputResult, SubstanceSnapshotRow};

/// Writes agent and substance snapshots to CSV files.
pub struct CsvWriter {
    dir: PathBuf,
    snapshots: Writer<File>,
    substances: Option<Writer<File>>,
    finished: bool,
}

impl CsvWriter {
    /// Create the output directory if needed, open the agent CSV file, and
    /// write the header row.
    pub fn new(dir: &Path) -> OutputResult<CsvWriter> {
        std::fs::create_dir_all(dir)?;
        let mut snapshots = Writer::from_path(dir.join("agent_snapshots.csv"))?;
        snapshots.write_record(["uid", "step", "x", "y", "z", "diameter"])?;
        Ok(CsvWriter {
            dir: dir.to_path_buf(),
            snapshots,
            substances: None,
            finished: false,
        })
    }

    fn substances_writer(&mut self) -> OutputResult<&mut Writer<File>> {
        if self.substances.is_none() {
            let mut writer = Writer::from_path(self.dir.join("substance_snapshots.csv"))?;
            writer.write_record([
                "substance",
                "step",
                "x",
                "y",
                "z",
                "concentration",
                "gx",
                "gy",
                "gz",
            ])?;
            self.substances = Some(writer);
        }
        Ok(self.substances.as_mut().unwrap())
    }
}

impl OutputWriter for CsvWriter {
    fn write_snapshot(&mut self, rows: &[AgentSnapshotRow]) -> OutputResult<()> {
        for row in rows {
            self.snapshots.write_record(&[
                row.uid.0.to_string(),
                row.step.to_string(),
                row.x.to_string(),
                row.y.to_string(),
                row.z.to_string(),
                row.diameter.to_string(),
            ])?;
        }
        self.snapshots.flush()?;
        Ok(())
    }

    fn write_substances(&mut self, rows: &[SubstanceSnapshotRow]) -> OutputResult<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let writer = self.substances_writer()?;
        for row in rows {
            let [gx, gy, gz] = row.gradient.unwrap_or([0.0; 3]);
            writer.write_record(&[
                row.substance.clone(),
                row.step.to_string(),
                row.x.to_string(),
                row.y.to_string(),
                row.z.to_string(),
                row.concentration.to_string(),
                gx.to_string(),
                gy.to_string(),
                gz.to_string(),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.snapshots.flush()?;
        if let Some(substances) = self.substances.as_mut() {
            substances.flush()?;
        }
        Ok(())
    }
}
