//! Read-only ship and weapon spec tables.
//!
//! The economy/equipment data lives outside the sim; this is the slice of it
//! the physics and combat code reads. A missing entry is a configuration
//! error: callers log it and skip the operation.

use physics::FlightProfile;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("unknown ship type '{0}'")]
    UnknownShip(String),
    #[error("unknown weapon type '{0}'")]
    UnknownWeapon(String),
}

/// Stats for one weapon type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeaponSpec {
    pub damage: f32,
    /// Shots per second.
    pub fire_rate: f32,
    /// Energy drawn per shot.
    pub energy_cost: f32,
    pub projectile_speed: f32,
    /// Seconds before an unspent projectile expires.
    pub projectile_life: f32,
    pub projectile_radius: f32,
    /// Max steering rate toward the locked target (rad/s); 0 = unguided.
    #[serde(default)]
    pub homing_turn_rate: f32,
}

/// Stats for one ship class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipSpec {
    pub mass: f32,
    /// Collision sphere radius.
    pub radius: f32,
    pub flight: FlightProfile,
    pub hull: f32,
    pub shields: f32,
    /// Shield points per second.
    #[serde(default)]
    pub shield_regen: f32,
    pub energy: f32,
    /// Energy per second.
    #[serde(default)]
    pub energy_regen: f32,
    /// Weapon type per slot.
    pub weapons: Vec<String>,
    #[serde(default)]
    pub missiles: u32,
    #[serde(default)]
    pub cargo_capacity: u32,
}

/// Ship and weapon lookup tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub ships: HashMap<String, ShipSpec>,
    pub weapons: HashMap<String, WeaponSpec>,
}

/// Weapon type fired from a missile rack.
pub const MISSILE_WEAPON: &str = "homing_missile";

impl Default for Catalog {
    fn default() -> Self {
        let weapons = HashMap::from([
            (
                "pulse_laser".to_string(),
                WeaponSpec {
                    damage: 10.0,
                    fire_rate: 4.0,
                    energy_cost: 5.0,
                    projectile_speed: 600.0,
                    projectile_life: 2.0,
                    projectile_radius: 1.0,
                    homing_turn_rate: 0.0,
                },
            ),
            (
                "beam_laser".to_string(),
                WeaponSpec {
                    damage: 18.0,
                    fire_rate: 2.5,
                    energy_cost: 12.0,
                    projectile_speed: 800.0,
                    projectile_life: 1.5,
                    projectile_radius: 1.0,
                    homing_turn_rate: 0.0,
                },
            ),
            (
                "mining_laser".to_string(),
                WeaponSpec {
                    damage: 4.0,
                    fire_rate: 2.0,
                    energy_cost: 3.0,
                    projectile_speed: 400.0,
                    projectile_life: 1.0,
                    projectile_radius: 1.0,
                    homing_turn_rate: 0.0,
                },
            ),
            (
                MISSILE_WEAPON.to_string(),
                WeaponSpec {
                    damage: 120.0,
                    fire_rate: 0.5,
                    energy_cost: 0.0,
                    projectile_speed: 300.0,
                    projectile_life: 8.0,
                    projectile_radius: 1.5,
                    homing_turn_rate: 2.5,
                },
            ),
        ]);

        let ships = HashMap::from([
            (
                "cobra".to_string(),
                ShipSpec {
                    mass: 100.0,
                    radius: 12.0,
                    flight: FlightProfile {
                        thrust_force: 12_000.0,
                        strafe_force: 6_000.0,
                        torque: 20_000.0,
                        max_speed: 250.0,
                        max_turn_rate: 1.8,
                    },
                    hull: 200.0,
                    shields: 100.0,
                    shield_regen: 4.0,
                    energy: 100.0,
                    energy_regen: 10.0,
                    weapons: vec!["pulse_laser".into(), "pulse_laser".into()],
                    missiles: 3,
                    cargo_capacity: 20,
                },
            ),
            (
                "sidewinder".to_string(),
                ShipSpec {
                    mass: 60.0,
                    radius: 9.0,
                    flight: FlightProfile {
                        thrust_force: 9_000.0,
                        strafe_force: 4_000.0,
                        torque: 10_000.0,
                        max_speed: 280.0,
                        max_turn_rate: 2.2,
                    },
                    hull: 80.0,
                    shields: 40.0,
                    shield_regen: 2.0,
                    energy: 60.0,
                    energy_regen: 8.0,
                    weapons: vec!["pulse_laser".into()],
                    missiles: 0,
                    cargo_capacity: 5,
                },
            ),
            (
                "viper".to_string(),
                ShipSpec {
                    mass: 80.0,
                    radius: 10.0,
                    flight: FlightProfile {
                        thrust_force: 11_000.0,
                        strafe_force: 5_000.0,
                        torque: 14_000.0,
                        max_speed: 300.0,
                        max_turn_rate: 2.0,
                    },
                    hull: 140.0,
                    shields: 80.0,
                    shield_regen: 3.0,
                    energy: 80.0,
                    energy_regen: 10.0,
                    weapons: vec!["beam_laser".into()],
                    missiles: 0,
                    cargo_capacity: 4,
                },
            ),
            (
                "hauler".to_string(),
                ShipSpec {
                    mass: 300.0,
                    radius: 20.0,
                    flight: FlightProfile {
                        thrust_force: 15_000.0,
                        strafe_force: 5_000.0,
                        torque: 60_000.0,
                        max_speed: 150.0,
                        max_turn_rate: 0.8,
                    },
                    hull: 250.0,
                    shields: 60.0,
                    shield_regen: 1.0,
                    energy: 40.0,
                    energy_regen: 4.0,
                    weapons: vec!["mining_laser".into()],
                    missiles: 0,
                    cargo_capacity: 60,
                },
            ),
        ]);

        Self { ships, weapons }
    }
}

impl Catalog {
    /// Load a catalog from a RON file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        use anyhow::Context;
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("reading catalog {:?}", path))?;
        let catalog =
            ron::from_str(&data).with_context(|| format!("parsing catalog {:?}", path))?;
        Ok(catalog)
    }

    pub fn ship(&self, class: &str) -> Result<&ShipSpec, CatalogError> {
        self.ships
            .get(class)
            .ok_or_else(|| CatalogError::UnknownShip(class.to_string()))
    }

    pub fn weapon(&self, name: &str) -> Result<&WeaponSpec, CatalogError> {
        self.weapons
            .get(name)
            .ok_or_else(|| CatalogError::UnknownWeapon(name.to_string()))
    }

    /// Resolve every weapon slot of a ship class.
    pub fn loadout(&self, class: &str) -> Result<Vec<WeaponSpec>, CatalogError> {
        self.ship(class)?
            .weapons
            .iter()
            .map(|w| self.weapon(w).cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_default_loadouts_resolve() {
        let c = Catalog::default();
        for class in c.ships.keys() {
            assert!(c.loadout(class).is_ok(), "loadout for {}", class);
        }
        assert!(c.weapon(MISSILE_WEAPON).is_ok());
    }

    #[test]
    fn catalog_unknown_ship_is_config_error() {
        let c = Catalog::default();
        assert_eq!(
            c.ship("dreadnought").unwrap_err(),
            CatalogError::UnknownShip("dreadnought".into())
        );
    }

    #[test]
    fn catalog_unknown_weapon_in_loadout() {
        let mut c = Catalog::default();
        if let Some(s) = c.ships.get_mut("viper") {
            s.weapons.push("railgun".into());
        }
        assert_eq!(
            c.loadout("viper").unwrap_err(),
            CatalogError::UnknownWeapon("railgun".into())
        );
    }

    #[test]
    fn catalog_ron_roundtrip() {
        let c = Catalog::default();
        let text = ron::to_string(&c).unwrap();
        let back: Catalog = ron::from_str(&text).unwrap();
        assert_eq!(back, c);
    }
}
