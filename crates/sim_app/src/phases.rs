//! The demo phase pipeline: movement, then production, then contact
//! detection.

use std::collections::HashSet;

use glam::DVec3;
use sim_component::{ComponentTypeId, Entity};
use sim_kernel::{Phase, PhaseContext, PhaseError, PhaseProcessor};
use tracing::{debug, info};

use crate::components::{Owner, Population, Position, Velocity};

pub const SECONDS_PER_YEAR: f64 = 365.25 * 86_400.0;

/// Default distance at which craft of different factions detect each other.
pub const DEFAULT_CONTACT_RANGE_M: f64 = 1.0e6;

/// Build the standard pipeline in its fixed order.
///
/// # Errors
///
/// Returns [`PhaseError`] if a phase name collides.
pub fn standard_pipeline(contact_range_m: f64) -> Result<PhaseProcessor, PhaseError> {
    let mut phases = PhaseProcessor::new();
    phases.register(Box::new(MovementPhase))?;
    phases.register(Box::new(ProductionPhase))?;
    phases.register(Box::new(ContactPhase::new(contact_range_m)))?;
    Ok(phases)
}

/// Integrates `Position` by `Velocity` over the elapsed subpulse.
#[derive(Debug, Default)]
pub struct MovementPhase;

impl Phase for MovementPhase {
    fn name(&self) -> &str {
        "movement"
    }

    fn process(&mut self, ctx: &mut PhaseContext<'_>, elapsed_secs: u64) {
        let dt = elapsed_secs as f64;
        let velocities: Vec<(Entity, DVec3)> = ctx
            .store
            .column::<Velocity>()
            .map(|column| column.iter().map(|(e, v)| (e, v.0)).collect())
            .unwrap_or_default();

        for (entity, velocity) in velocities {
            if let Some(position) = ctx.store.get_component_mut::<Position>(entity) {
                position.0 += velocity * dt;
            }
        }
    }
}

/// Compounds every `Population` by its annual growth rate.
#[derive(Debug, Default)]
pub struct ProductionPhase;

impl Phase for ProductionPhase {
    fn name(&self) -> &str {
        "production"
    }

    fn process(&mut self, ctx: &mut PhaseContext<'_>, elapsed_secs: u64) {
        let years = elapsed_secs as f64 / SECONDS_PER_YEAR;
        if let Some(mut column) = ctx.store.column_mut::<Population>() {
            for (_, population) in column.iter_mut() {
                population.count *= (1.0 + population.annual_growth).powf(years);
            }
        }
    }
}

/// Detects craft of different factions coming within range of each other.
///
/// While two craft are closing, it asks for the next subpulse to end no
/// later than their projected contact. A new contact interrupts the advance
/// so the owners can react; a contact that persists is reported once.
#[derive(Debug)]
pub struct ContactPhase {
    range_m: f64,
    in_contact: HashSet<(Entity, Entity)>,
}

impl ContactPhase {
    /// A detector reporting contacts within `range_m` metres.
    #[must_use]
    pub fn new(range_m: f64) -> Self {
        Self {
            range_m,
            in_contact: HashSet::new(),
        }
    }
}

impl Phase for ContactPhase {
    fn name(&self) -> &str {
        "contact"
    }

    fn process(&mut self, ctx: &mut PhaseContext<'_>, _elapsed_secs: u64) {
        let required = [ComponentTypeId::of::<Position>(), ComponentTypeId::of::<Owner>()];
        let craft: Vec<(Entity, Entity, DVec3, DVec3)> = ctx
            .store
            .entities_with_all(&required)
            .into_iter()
            .filter_map(|entity| {
                let owner = ctx.store.get_component::<Owner>(entity)?.0;
                let position = ctx.store.get_component::<Position>(entity)?.0;
                let velocity = ctx
                    .store
                    .get_component::<Velocity>(entity)
                    .map_or(DVec3::ZERO, |v| v.0);
                Some((entity, owner, position, velocity))
            })
            .collect();

        let present: HashSet<Entity> = craft.iter().map(|&(entity, ..)| entity).collect();
        self.in_contact
            .retain(|(a, b)| present.contains(a) && present.contains(b));

        for (i, &(a, owner_a, pos_a, vel_a)) in craft.iter().enumerate() {
            for &(b, owner_b, pos_b, vel_b) in &craft[i + 1..] {
                if owner_a == owner_b {
                    continue;
                }
                let offset = pos_b - pos_a;
                let distance = offset.length();

                if distance <= self.range_m {
                    if self.in_contact.insert((a, b)) {
                        info!(%a, %b, distance, now = ctx.now, "contact");
                        ctx.signal_interrupt();
                    }
                    continue;
                }
                self.in_contact.remove(&(a, b));

                let closing_speed = -offset.dot(vel_b - vel_a) / distance;
                if closing_speed > 0.0 {
                    let secs = ((distance - self.range_m) / closing_speed).ceil() as u64;
                    if ctx.request_subpulse(secs) {
                        debug!(%a, %b, secs, "closing; subpulse shortened");
                    }
                }
            }
        }
    }
}
