//! Framework error type and severity policy.
//!
//! Sub-crates define their own error enums and either convert into
//! `CoreError` via `From` impls or wrap it as one variant.  Severity is
//! handled uniformly across the workspace:
//!
//! - **Recoverable** conditions return `Err` or fall back with a
//!   `log::warn!` (missing config file, unsupported compute target,
//!   failed backup write).
//! - **Logic errors** — violated preconditions of a core API (duplicate
//!   operation name, removing an unknown UID, shrinking a diffusion grid) —
//!   are logged as warnings and become no-ops; the simulation continues.
//! - **Fatal** conditions, where continuing would corrupt state (no agents
//!   at the start of a run, a 65th event kind, a non-positive box edge),
//!   `panic!` with a `Component: message` payload.

use thiserror::Error;

/// The top-level error type for `cyto-core` and a common base for sub-crates.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shorthand result type for all `cyto-*` crates.
pub type CoreResult<T> = Result<T, CoreError>;
