use cyto_checkpoint::CheckpointError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("simulation configuration error: {0}")]
    Config(String),

    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),
}

pub type SimResult<T> = Result<T, SimError>;
