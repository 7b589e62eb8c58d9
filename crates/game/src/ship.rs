//! Ship records and the player/NPC distinction.

use engine_core::{EnergyPool, Pose, Vec3, Vitals};
use physics::{BodyKind, FlightProfile};
use serde::{Deserialize, Serialize};

use crate::catalog::ShipSpec;

/// NPC role, which decides how it reacts to being shot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NpcRole {
    Pirate,
    Police,
    Trader,
}

/// Who is flying a ship. Every identity branch matches on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Combatant {
    Player,
    Npc(NpcRole),
}

impl Combatant {
    pub fn body_kind(self) -> BodyKind {
        match self {
            Combatant::Player => BodyKind::Player,
            Combatant::Npc(_) => BodyKind::Npc,
        }
    }
}

/// Hull, shields and energy of a ship plus its kinematics mirrored from the body.
#[derive(Debug, Clone, PartialEq)]
pub struct Ship {
    pub name: String,
    pub class: String,
    pub vitals: Vitals,
    pub energy: EnergyPool,
    pub profile: FlightProfile,
    pub radius: f32,
    /// Mirrored from the body after each step.
    pub pose: Pose,
    /// Mirrored from the body after each step.
    pub velocity: Vec3,
}

impl Ship {
    pub fn from_spec(name: impl Into<String>, class: &str, spec: &ShipSpec, pose: Pose) -> Self {
        Self {
            name: name.into(),
            class: class.to_string(),
            vitals: Vitals::new(spec.hull, spec.shields, spec.shield_regen),
            energy: EnergyPool::new(spec.energy, spec.energy_regen),
            profile: spec.flight,
            radius: spec.radius,
            pose,
            velocity: Vec3::ZERO,
        }
    }

    pub fn is_destroyed(&self) -> bool {
        self.vitals.is_destroyed()
    }

    /// Distance ahead of the ship centre at which its projectiles spawn.
    pub fn muzzle_offset(&self) -> f32 {
        self.radius + 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;

    #[test]
    fn ship_from_spec_starts_full() {
        let catalog = Catalog::default();
        let spec = catalog.ship("cobra").unwrap();
        let ship = Ship::from_spec("Jameson", "cobra", spec, Pose::default());
        assert_eq!(ship.vitals.hull, spec.hull);
        assert_eq!(ship.vitals.shields, spec.shields);
        assert_eq!(ship.energy.current, spec.energy);
        assert!(ship.muzzle_offset() > ship.radius);
    }

    #[test]
    fn combatant_maps_to_body_kind() {
        assert_eq!(Combatant::Player.body_kind(), BodyKind::Player);
        assert_eq!(Combatant::Npc(NpcRole::Trader).body_kind(), BodyKind::Npc);
    }
}
