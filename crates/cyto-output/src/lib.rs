//! `cyto-output` — post-hoc export of simulation state.
//!
//! The core deliberately has no visualization engine; what it offers instead
//! is a small writer seam plus a CSV backend that dumps one row per agent at
//! a configurable step interval.  External visualization adaptors consume
//! these files (or implement [`OutputWriter`] themselves).

pub mod csv_writer;
pub mod error;
pub mod row;
pub mod writer;

#[cfg(test)]
mod tests;

pub use csv_writer::CsvWriter;
pub use error::{OutputError, OutputResult};
pub use row::{AgentSnapshotRow, SubstanceSnapshotRow};
pub use writer::OutputWriter;
