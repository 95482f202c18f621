//! The output writer seam.

use crate::{AgentSnapshotRow, OutputResult, SubstanceSnapshotRow};

/// Backend-agnostic sink for exported simulation state.
pub trait OutputWriter: Send {
    /// Append one exported step's agent rows.
    fn write_snapshot(&mut self, rows: &[AgentSnapshotRow]) -> OutputResult<()>;

    /// Append one exported step's substance voxel rows.
    ///
    /// Default: substances are not exported by this backend.
    fn write_substances(&mut self, _rows: &[SubstanceSnapshotRow]) -> OutputResult<()> {
        Ok(())
    }

    /// Flush and close.  Idempotent.
    fn finish(&mut self) -> OutputResult<()>;
}
