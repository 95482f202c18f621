//! `cyto-agent` — agent model and storage for the `cytodyn` engine.
//!
//! # What lives here
//!
//! | Module       | Contents                                                   |
//! |--------------|------------------------------------------------------------|
//! | [`cell`]     | the spherical `Cell` agent and its division event          |
//! | [`soa`]      | `CellSoa` — one flat array per data member                 |
//! | [`store`]    | `AgentStore` — NUMA partitions, UID map, parallel sweeps   |
//! | [`behavior`] | the `Behavior` tagged union and its per-agent runner       |
//! | [`exec`]     | thread-local `ExecutionContext` buffers, iteration teardown|
//! | [`pointer`]  | `AgentPtr` — UID-keyed weak reference                      |
//!
//! # Mutation model
//!
//! Parallel sweeps over the store are read-mostly: an operation may freely
//! write the fields of the agent it is visiting, but structural mutation
//! (creating or removing agents, depositing into substance grids) is buffered
//! in the calling thread's [`ExecutionContext`](exec::ExecutionContext) and
//! only applied in the single-threaded teardown at the end of the iteration.

pub mod behavior;
pub mod cell;
pub mod exec;
pub mod pointer;
pub mod soa;
pub mod store;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use behavior::{
    run_agent_behaviors, Behavior, BehaviorBase, BehaviorCtx, BehaviorResources, Chemotaxis,
    GrowDivide, Secretion,
};
pub use cell::{Cell, CellDivisionEvent};
pub use exec::{Deposition, ExecutionContext, ExecutionContexts};
pub use pointer::AgentPtr;
pub use soa::{CellMut, CellRef, CellSoa};
pub use store::AgentStore;
