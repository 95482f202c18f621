//! Long-running simulation with periodic backups.
//!
//! First run: `cargo run --bin persistent -- --backup sim.bin`
//! Resume:    `cargo run --bin persistent -- --backup sim.bin --restore sim.bin`
//!
//! Interrupt the first run at any point; the resume run fast-forwards to the
//! last backup and continues from there.

use anyhow::{bail, Result};
use cyto_agent::{Behavior, Cell, GrowDivide};
use cyto_core::Params;
use cyto_sim::{init, SimulationBuilder};

const TOTAL_STEPS: u64 = 2000;

fn main() -> Result<()> {
    env_logger::init();

    let mut params = Params::default();
    params.simulation.backup_interval = 10;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-b" | "--backup" => {
                params.simulation.backup_file =
                    args.next().ok_or_else(|| anyhow::anyhow!("--backup needs a path"))?;
            }
            "-r" | "--restore" => {
                params.simulation.restore_file =
                    args.next().ok_or_else(|| anyhow::anyhow!("--restore needs a path"))?;
            }
            other => bail!("unknown argument '{other}'"),
        }
    }

    let cells = init::grid_3d(3, 20.0, |pos| {
        let mut cell = Cell::with_diameter(10.0);
        cell.position = pos;
        cell.adherence = 0.4;
        cell.add_behavior(Behavior::GrowDivide(GrowDivide::new(
            18.0,
            30.0,
            cyto_agent::BehaviorBase::new(cyto_core::ALL_EVENTS, cyto_core::NO_EVENTS),
        )));
        cell
    });

    let (mut sim, mut scheduler) = SimulationBuilder::new(params)
        .seed(1902)
        .agents(cells)
        .build();

    scheduler.simulate(&mut sim, TOTAL_STEPS)?;

    println!(
        "done after {} total steps with {} agents",
        scheduler.total_steps(),
        sim.store.num_agents()
    );
    Ok(())
}
