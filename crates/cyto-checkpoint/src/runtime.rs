//! Machine summary embedded in every snapshot.

use std::fmt;

/// Coarse description of the system a snapshot was taken on.
///
/// Restoring on a different system is allowed but worth a warning — thread
/// counts and floating-point environments can change trajectories.
#[derive(Clone, Debug, PartialEq, Eq)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct RuntimeVariables {
    pub os: String,
    pub arch: String,
    pub cpu_count: usize,
}

impl RuntimeVariables {
    pub fn detect() -> RuntimeVariables {
        RuntimeVariables {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            cpu_count: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        }
    }
}

impl fmt::Display for RuntimeVariables {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} with {} cpus", self.os, self.arch, self.cpu_count)
    }
}
