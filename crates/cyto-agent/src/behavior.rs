//! Behaviors — per-agent update rules with event-keyed copy/remove masks.
//!
//! # Design
//!
//! Behaviors form a closed tagged union rather than an open trait-object
//! hierarchy: the set of variants is known at compile time, which keeps them
//! `Clone + serde` (required for division events and checkpointing) without
//! any dynamic registry.  Each variant embeds a [`BehaviorBase`] carrying two
//! event masks:
//!
//! - *copy mask* — copy this behavior onto an agent born from the event?
//! - *remove mask* — drop this behavior from the triggering agent afterwards?
//!
//! `run` receives a [`BehaviorCtx`]: mutable access to the owning agent's own
//! fields plus read access to the shared step resources (RNG stream,
//! execution context, substance fields).  Structural effects (division,
//! removal, deposition) are queued and applied outside the parallel sweep.

use cyto_core::event::cell_division;
use cyto_core::substance::SubstanceLookup;
use cyto_core::{AgentUid, EventKind, EventMask, Real3, RandomStreams, SubstanceId};

use crate::cell::{self, Cell, CellDivisionEvent, MIN_CELL_VOLUME};
use crate::exec::{Deposition, ExecutionContexts};
use crate::soa::CellMut;

// ── BehaviorBase ──────────────────────────────────────────────────────────────

/// Copy/remove event masks shared by every behavior variant.
#[derive(Clone, Copy, Debug, Default)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct BehaviorBase {
    pub copy_mask: EventMask,
    pub remove_mask: EventMask,
}

impl BehaviorBase {
    pub fn new(copy_mask: EventMask, remove_mask: EventMask) -> BehaviorBase {
        BehaviorBase {
            copy_mask,
            remove_mask,
        }
    }

    /// Copy onto agents born from `event`?
    #[inline]
    pub fn copy_on(&self, event: EventKind) -> bool {
        event.is_in(self.copy_mask)
    }

    /// Remove from the triggering agent after `event`?
    #[inline]
    pub fn remove_on(&self, event: EventKind) -> bool {
        event.is_in(self.remove_mask)
    }
}

// ── Behavior variants ─────────────────────────────────────────────────────────

/// Grow until the diameter reaches a threshold, then divide.
#[derive(Clone, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct GrowDivide {
    pub base: BehaviorBase,
    pub threshold: f64,
    pub growth_rate: f64,
}

impl GrowDivide {
    pub fn new(threshold: f64, growth_rate: f64, base: BehaviorBase) -> GrowDivide {
        GrowDivide {
            base,
            threshold,
            growth_rate,
        }
    }

    fn run(&mut self, ctx: &mut BehaviorCtx<'_>) {
        if *ctx.diameter <= self.threshold {
            ctx.change_volume(self.growth_rate);
        } else {
            ctx.divide();
        }
    }
}

impl Default for GrowDivide {
    fn default() -> Self {
        GrowDivide {
            base: BehaviorBase::new(cyto_core::ALL_EVENTS, cyto_core::NO_EVENTS),
            threshold: 40.0,
            growth_rate: 300.0,
        }
    }
}

/// Move along a substance gradient by setting the tractor force.
#[derive(Clone, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct Chemotaxis {
    pub base: BehaviorBase,
    pub substance: SubstanceId,
    pub speed: f64,
}

impl Chemotaxis {
    pub fn new(substance: SubstanceId, speed: f64, base: BehaviorBase) -> Chemotaxis {
        Chemotaxis {
            base,
            substance,
            speed,
        }
    }

    fn run(&mut self, ctx: &mut BehaviorCtx<'_>) {
        let gradient = ctx.gradient(self.substance);
        *ctx.tractor_force += gradient * self.speed;
        if self.speed != 0.0 {
            *ctx.run_displacement_next = true;
        }
    }
}

/// Deposit a fixed quantity of a substance at the agent's position every
/// step (applied at iteration teardown).
#[derive(Clone, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct Secretion {
    pub base: BehaviorBase,
    pub substance: SubstanceId,
    pub quantity: f64,
}

impl Secretion {
    pub fn new(substance: SubstanceId, quantity: f64, base: BehaviorBase) -> Secretion {
        Secretion {
            base,
            substance,
            quantity,
        }
    }

    fn run(&mut self, ctx: &mut BehaviorCtx<'_>) {
        ctx.deposit(self.substance, self.quantity);
    }
}

/// The closed set of behaviors known to this build.
#[derive(Clone, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub enum Behavior {
    GrowDivide(GrowDivide),
    Chemotaxis(Chemotaxis),
    Secretion(Secretion),
}

impl Behavior {
    pub fn base(&self) -> &BehaviorBase {
        match self {
            Behavior::GrowDivide(b) => &b.base,
            Behavior::Chemotaxis(b) => &b.base,
            Behavior::Secretion(b) => &b.base,
        }
    }

    pub fn run(&mut self, ctx: &mut BehaviorCtx<'_>) {
        match self {
            Behavior::GrowDivide(b) => b.run(ctx),
            Behavior::Chemotaxis(b) => b.run(ctx),
            Behavior::Secretion(b) => b.run(ctx),
        }
    }
}

// ── Behavior execution context ────────────────────────────────────────────────

/// Shared, read-only step resources available to every behavior invocation.
pub struct BehaviorResources<'a> {
    pub rngs: &'a RandomStreams,
    pub exec: &'a ExecutionContexts,
    pub substances: &'a dyn SubstanceLookup,
    pub time_step: f64,
}

/// Per-invocation view handed to [`Behavior::run`]: the owning agent's fields
/// plus queued structural effects.
pub struct BehaviorCtx<'a> {
    pub uid: AgentUid,
    pub position: &'a mut Real3,
    pub tractor_force: &'a mut Real3,
    pub diameter: &'a mut f64,
    pub volume: &'a mut f64,
    pub adherence: &'a mut f64,
    pub density: &'a mut f64,
    pub box_idx: u64,
    pub run_displacement_next: &'a mut bool,

    res: &'a BehaviorResources<'a>,
    pending_divisions: Vec<CellDivisionEvent>,
    removed: bool,
}

impl<'a> BehaviorCtx<'a> {
    #[inline]
    pub fn mass(&self) -> f64 {
        *self.density * *self.volume
    }

    #[inline]
    pub fn time_step(&self) -> f64 {
        self.res.time_step
    }

    /// Grow (or shrink) by `speed` scaled with the integration step; wakes the
    /// displacement operation for the next step.
    pub fn change_volume(&mut self, speed: f64) {
        *self.volume = (*self.volume + speed * self.res.time_step).max(MIN_CELL_VOLUME);
        *self.diameter = cell::diameter_from_volume(*self.volume);
        *self.run_displacement_next = true;
    }

    /// Queue a division with a randomly sampled axis and volume ratio.
    pub fn divide(&mut self) {
        let event = self.res.rngs.with_current(CellDivisionEvent::sample);
        self.divide_with(event);
    }

    /// Queue a division with explicit parameters.
    pub fn divide_with(&mut self, event: CellDivisionEvent) {
        self.pending_divisions.push(event);
    }

    /// Queue removal of the owning agent at iteration teardown.
    pub fn remove_from_simulation(&mut self) {
        self.removed = true;
    }

    /// Draw from the calling thread's random stream.
    pub fn with_rng<R>(&self, f: impl FnOnce(&mut cyto_core::SimStream) -> R) -> R {
        self.res.rngs.with_current(f)
    }

    /// Concentration of `substance` at the agent's position (0 for unknown ids).
    pub fn concentration(&self, substance: SubstanceId) -> f64 {
        match self.res.substances.field(substance) {
            Some(field) => field.concentration_at(*self.position),
            None => 0.0,
        }
    }

    /// Normalized gradient of `substance` at the agent's position.
    pub fn gradient(&self, substance: SubstanceId) -> Real3 {
        match self.res.substances.field(substance) {
            Some(field) => field.gradient_at(*self.position),
            None => Real3::ZERO,
        }
    }

    /// Queue a deposition into `substance` at the agent's position, applied at
    /// iteration teardown.
    pub fn deposit(&self, substance: SubstanceId, amount: f64) {
        let position = *self.position;
        self.res.exec.with_current(|ctx| {
            ctx.depositions.push(Deposition {
                substance,
                position,
                amount,
            })
        });
    }
}

/// Run every behavior of one agent, then apply queued division/removal events.
///
/// Called from inside the parallel behaviors sweep; all structural effects go
/// through the calling thread's execution context.
pub fn run_agent_behaviors(cm: CellMut<'_>, res: &BehaviorResources<'_>) {
    let CellMut {
        uid,
        position,
        tractor_force,
        diameter,
        volume,
        adherence,
        density,
        box_idx,
        behaviors,
        run_displacement: _,
        run_displacement_next,
    } = cm;

    if behaviors.is_empty() {
        return;
    }
    let mut local = std::mem::take(behaviors);

    let mut ctx = BehaviorCtx {
        uid,
        position,
        tractor_force,
        diameter,
        volume,
        adherence,
        density,
        box_idx: *box_idx,
        run_displacement_next,
        res,
        pending_divisions: Vec::new(),
        removed: false,
    };

    for behavior in local.iter_mut() {
        behavior.run(&mut ctx);
    }

    // Event handling: build daughters after the run loop so every behavior saw
    // the pre-division mother.
    let kind = cell_division();
    for event in std::mem::take(&mut ctx.pending_divisions) {
        let split =
            cell::split_for_division(ctx.position, ctx.volume, ctx.diameter, &event);

        let mut daughter = Cell::new();
        daughter.position = split.daughter_position;
        daughter.set_volume(split.daughter_volume);
        daughter.adherence = *ctx.adherence;
        daughter.density = *ctx.density;
        daughter.box_idx = ctx.box_idx;
        daughter.behaviors = local
            .iter()
            .filter(|b| b.base().copy_on(kind))
            .cloned()
            .collect();
        local.retain(|b| !b.base().remove_on(kind));
        *ctx.run_displacement_next = true;

        res.exec.with_current(|c| c.new_agents.push(daughter));
    }

    let removed = ctx.removed;
    *behaviors = local;
    if removed {
        res.exec.with_current(|c| c.removals.push(uid));
    }
}
