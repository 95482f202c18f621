//! A 4×4×4 block of cells that grow and divide under mechanical pressure.
//!
//! Run with `RUST_LOG=info cargo run --bin cell_division [steps]`.

use anyhow::Result;
use cyto_agent::{Behavior, Cell, GrowDivide};
use cyto_core::Params;
use cyto_sim::{init, SimulationBuilder};

fn main() -> Result<()> {
    env_logger::init();

    let steps: u64 = std::env::args()
        .nth(1)
        .map(|s| s.parse())
        .transpose()?
        .unwrap_or(500);

    let cells = init::grid_3d(4, 20.0, |pos| {
        let mut cell = Cell::with_diameter(30.0);
        cell.position = pos;
        cell.adherence = 0.4;
        cell.add_behavior(Behavior::GrowDivide(GrowDivide::default()));
        cell
    });

    let (mut sim, mut scheduler) = SimulationBuilder::new(Params::default())
        .seed(4357)
        .agents(cells)
        .build();

    scheduler.simulate(&mut sim, steps)?;

    println!(
        "simulated {} steps, population grew to {} agents",
        scheduler.total_steps(),
        sim.store.num_agents()
    );
    Ok(())
}
