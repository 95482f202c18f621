use thiserror::Error;

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("no backup file configured")]
    BackupNotConfigured,

    #[error("no restore file configured")]
    RestoreNotConfigured,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("encoding error: {0}")]
    Encode(#[from] bincode::Error),
}

pub type CheckpointResult<T> = Result<T, CheckpointError>;
