//! Crash-safe snapshot files.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use crate::error::{CheckpointError, CheckpointResult};
use crate::snapshot::{Snapshot, SnapshotRef};

/// Writes backups to `backup_file` and reads restores from `restore_file`.
/// Either path may be empty to disable that direction.
pub struct Backup {
    backup_file: Option<PathBuf>,
    restore_file: Option<PathBuf>,
}

impl Backup {
    pub fn new(backup_file: &str, restore_file: &str) -> Backup {
        Backup {
            backup_file: (!backup_file.is_empty()).then(|| PathBuf::from(backup_file)),
            restore_file: (!restore_file.is_empty()).then(|| PathBuf::from(restore_file)),
        }
    }

    pub fn backup_enabled(&self) -> bool {
        self.backup_file.is_some()
    }

    pub fn restore_enabled(&self) -> bool {
        self.restore_file.is_some()
    }

    /// Serialize `snapshot` to the backup file.
    ///
    /// Writes to `<file>.tmp` first and renames, so an interrupted write
    /// leaves the previous backup intact.
    pub fn save(&self, snapshot: &SnapshotRef<'_>) -> CheckpointResult<()> {
        let path = self
            .backup_file
            .as_ref()
            .ok_or(CheckpointError::BackupNotConfigured)?;

        let tmp = tmp_path(path);
        {
            let file = File::create(&tmp)?;
            let mut writer = BufWriter::new(file);
            bincode::serialize_into(&mut writer, snapshot)?;
        }
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Read the restore file back into an owned snapshot.
    pub fn load(&self) -> CheckpointResult<Snapshot> {
        let path = self
            .restore_file
            .as_ref()
            .ok_or(CheckpointError::RestoreNotConfigured)?;
        let file = File::open(path)?;
        let snapshot: Snapshot = bincode::deserialize_from(BufReader::new(file))?;
        Ok(snapshot)
    }

    /// Completed-step counter stored in the restore file.
    pub fn steps_in_restore(&self) -> CheckpointResult<u64> {
        Ok(self.load()?.completed_steps)
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = std::ffi::OsString::from("tmp_");
    name.push(path.file_name().unwrap_or_else(|| "backup".as_ref()));
    path.with_file_name(name)
}
