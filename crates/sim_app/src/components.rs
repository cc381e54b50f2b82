//! Component types for the demo world.

use glam::DVec3;
use serde::{Deserialize, Serialize};
use sim_component::{Component, Entity};

/// Marks an entity as a faction: an external actor with its own command
/// queues.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Faction {
    pub name: String,
}

impl Component for Faction {
    fn type_name() -> &'static str {
        "Faction"
    }
}

/// The faction an entity belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner(pub Entity);

impl Component for Owner {
    fn type_name() -> &'static str {
        "Owner"
    }
}

/// System-relative position, in metres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position(pub DVec3);

impl Component for Position {
    fn type_name() -> &'static str {
        "Position"
    }
}

/// Velocity, in metres per second.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Velocity(pub DVec3);

impl Component for Velocity {
    fn type_name() -> &'static str {
        "Velocity"
    }
}

/// A colony population growing at a fixed annual rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Population {
    pub count: f64,
    /// Fractional growth per simulated year, e.g. `0.02` for 2%.
    pub annual_growth: f64,
}

impl Component for Population {
    fn type_name() -> &'static str {
        "Population"
    }
}
