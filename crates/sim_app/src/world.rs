//! Demo world generation.

use glam::DVec3;
use sim_component::{BoxedComponent, Entity};
use sim_kernel::{Store, StoreError};
use tracing::info;

use crate::components::{Faction, Owner, Population, Position, Velocity};

/// Mean distance of each home colony from the origin, in metres.
const HOME_ORBIT_M: f64 = 1.496e11;

/// Scout cruise speed, in metres per second.
const SCOUT_SPEED: f64 = 5.0e4;

/// Populate `store` with `factions` factions. Each gets a home colony spaced
/// evenly around the origin and a scout heading inward. Returns the faction
/// entities in creation order.
///
/// # Errors
///
/// Returns [`StoreError`] if a component cannot be attached.
pub fn seed(store: &mut Store, factions: usize) -> Result<Vec<Entity>, StoreError> {
    let mut created = Vec::with_capacity(factions);
    for index in 0..factions {
        let angle = std::f64::consts::TAU * index as f64 / factions as f64;
        let home = DVec3::new(angle.cos(), angle.sin(), 0.0) * HOME_ORBIT_M;

        let faction = store.create_entity_with(vec![BoxedComponent::new(Faction {
            name: format!("Faction {}", index + 1),
        })])?;
        store.create_entity_with(vec![
            BoxedComponent::new(Owner(faction)),
            BoxedComponent::new(Position(home)),
            BoxedComponent::new(Population {
                count: 1.0e9,
                annual_growth: 0.015,
            }),
        ])?;
        store.create_entity_with(vec![
            BoxedComponent::new(Owner(faction)),
            BoxedComponent::new(Position(home)),
            BoxedComponent::new(Velocity(-home.normalize_or_zero() * SCOUT_SPEED)),
        ])?;
        created.push(faction);
    }
    info!(
        factions,
        entities = store.entity_count(),
        "world seeded"
    );
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_creates_factions_with_assets() {
        let mut store = Store::new();
        let factions = seed(&mut store, 3).unwrap();

        assert_eq!(factions.len(), 3);
        assert_eq!(store.entity_count(), 9);
        assert_eq!(store.entities_with::<Faction>().len(), 3);
        assert_eq!(store.entities_with::<Population>().len(), 3);
        assert_eq!(store.entities_with::<Velocity>().len(), 3);
        assert!(store.check_consistency());

        for faction in factions {
            let owned = store
                .entities_with::<Owner>()
                .into_iter()
                .filter(|&e| store.get_component::<Owner>(e) == Some(&Owner(faction)))
                .count();
            assert_eq!(owned, 2);
        }
    }

    #[test]
    fn test_seed_zero_factions() {
        let mut store = Store::new();
        assert!(seed(&mut store, 0).unwrap().is_empty());
        assert_eq!(store.entity_count(), 0);
    }
}
