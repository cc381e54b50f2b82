//! NATS subject hierarchy.
//!
//! Every faction owns two subjects under the `sim.` prefix:
//!
//! - `sim.faction.<id>.in`: external actor → kernel (commands).
//! - `sim.faction.<id>.out`: kernel → external actor (replies and echoes).

use sim_component::Entity;

use crate::error::NetError;

/// Root prefix for all simulation subjects.
pub const PREFIX: &str = "sim";

/// Wildcard matching every faction's inbound subject.
pub const FACTION_INBOUND_WILDCARD: &str = "sim.faction.*.in";

/// `sim.faction.<id>.in`
#[must_use]
pub fn faction_inbound(faction: Entity) -> String {
    format!("{PREFIX}.faction.{}.in", faction.id())
}

/// `sim.faction.<id>.out`
#[must_use]
pub fn faction_outbound(faction: Entity) -> String {
    format!("{PREFIX}.faction.{}.out", faction.id())
}

/// Extract the faction from an inbound subject.
///
/// # Errors
///
/// Returns [`NetError::MalformedSubject`] unless `subject` has the shape
/// `sim.faction.<id>.in` with a valid, non-zero id.
pub fn parse_inbound_faction(subject: &str) -> Result<Entity, NetError> {
    let malformed = || NetError::MalformedSubject(subject.to_string());
    let mut parts = subject.split('.');
    let (Some(PREFIX), Some("faction"), Some(id), Some("in"), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return Err(malformed());
    };
    let entity = Entity::from_raw(id.parse().map_err(|_| malformed())?);
    if entity.is_valid() {
        Ok(entity)
    } else {
        Err(malformed())
    }
}
