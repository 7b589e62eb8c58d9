//! Simulation settings. Loaded from sim.ron at startup.

use engine_core::Vec3;
use physics::{FlightMode, DEFAULT_FIXED_DT, DEFAULT_SUBSTEPS};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::catalog::Catalog;
use crate::mission::SystemId;
use crate::ship::NpcRole;

/// An NPC placed in the system at session start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncounterConfig {
    pub name: String,
    pub class: String,
    pub role: NpcRole,
    #[serde(default)]
    pub hostile: bool,
    pub position: Vec3,
}

/// A static body: planet, moon or station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CelestialConfig {
    pub name: String,
    pub position: Vec3,
    pub radius: f32,
    #[serde(default)]
    pub dockable: bool,
}

/// Persistent sim settings. Loaded from `sim.ron` in the current directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    /// Seed for patrol wander and salvage rolls.
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Physics iterations per tick.
    #[serde(default = "default_substeps")]
    pub substeps: u32,
    /// Physics iteration length in seconds.
    #[serde(default = "default_fixed_dt")]
    pub fixed_dt: f32,
    #[serde(default = "default_player_ship")]
    pub player_ship: String,
    #[serde(default = "default_player_name")]
    pub player_name: String,
    #[serde(default)]
    pub flight_mode: FlightMode,
    #[serde(default)]
    pub start_system: SystemId,
    #[serde(default = "default_credits")]
    pub credits: u64,
    /// Max distance from ship centre to a salvage canister for scooping.
    #[serde(default = "default_scoop_range")]
    pub scoop_range: f32,
    /// Max distance from a dockable celestial's surface for docking.
    #[serde(default = "default_dock_range")]
    pub dock_range: f32,
    /// Seconds before unscooped salvage disappears.
    #[serde(default = "default_salvage_lifetime")]
    pub salvage_lifetime: f32,
    #[serde(default = "default_encounters")]
    pub encounters: Vec<EncounterConfig>,
    #[serde(default = "default_celestials")]
    pub celestials: Vec<CelestialConfig>,
    /// Optional RON ship/weapon table replacing the built-in one.
    #[serde(default)]
    pub catalog_path: Option<PathBuf>,
}

fn default_seed() -> u64 {
    0x5eed
}
fn default_substeps() -> u32 {
    DEFAULT_SUBSTEPS
}
fn default_fixed_dt() -> f32 {
    DEFAULT_FIXED_DT
}
fn default_player_ship() -> String {
    "cobra".to_string()
}
fn default_player_name() -> String {
    "Jameson".to_string()
}
fn default_credits() -> u64 {
    100
}
fn default_scoop_range() -> f32 {
    30.0
}
fn default_dock_range() -> f32 {
    100.0
}
fn default_salvage_lifetime() -> f32 {
    120.0
}
fn default_encounters() -> Vec<EncounterConfig> {
    vec![
        EncounterConfig {
            name: "Krait Raider".to_string(),
            class: "sidewinder".to_string(),
            role: NpcRole::Pirate,
            hostile: true,
            position: Vec3::new(150.0, 20.0, -700.0),
        },
        EncounterConfig {
            name: "Lakon Hauler".to_string(),
            class: "hauler".to_string(),
            role: NpcRole::Trader,
            hostile: false,
            position: Vec3::new(-400.0, 0.0, -300.0),
        },
    ]
}
fn default_celestials() -> Vec<CelestialConfig> {
    vec![CelestialConfig {
        name: "Coriolis Station".to_string(),
        position: Vec3::new(0.0, 0.0, 1500.0),
        radius: 60.0,
        dockable: true,
    }]
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            substeps: default_substeps(),
            fixed_dt: default_fixed_dt(),
            player_ship: default_player_ship(),
            player_name: default_player_name(),
            flight_mode: FlightMode::default(),
            start_system: 0,
            credits: default_credits(),
            scoop_range: default_scoop_range(),
            dock_range: default_dock_range(),
            salvage_lifetime: default_salvage_lifetime(),
            encounters: default_encounters(),
            celestials: default_celestials(),
            catalog_path: None,
        }
    }
}

impl SimConfig {
    /// Load config from a RON file. If the file is missing or invalid, returns default config.
    pub fn load_from(path: &Path) -> Self {
        if let Ok(data) = std::fs::read_to_string(path) {
            match ron::from_str(&data) {
                Ok(c) => return c,
                Err(e) => log::warn!("Invalid config at {:?}: {}, using defaults", path, e),
            }
        }
        Self::default()
    }

    /// Load `sim.ron`, writing the defaults there first if it does not exist yet.
    pub fn load_or_create() -> Self {
        let path = config_path();
        if path.exists() {
            return Self::load_from(&path);
        }
        let config = Self::default();
        config.save_to(&path);
        config
    }

    /// Write the config as RON. Logs on error.
    pub fn save_to(&self, path: &Path) {
        match ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default()) {
            Ok(s) => {
                if let Err(e) = std::fs::write(path, s) {
                    log::warn!("Could not write config to {:?}: {}", path, e);
                }
            }
            Err(e) => log::warn!("Could not serialize config: {}", e),
        }
    }

    /// The ship catalog: the override file if set and readable, else the built-in table.
    pub fn catalog(&self) -> Catalog {
        let Some(path) = &self.catalog_path else {
            return Catalog::default();
        };
        match Catalog::load(path) {
            Ok(catalog) => catalog,
            Err(e) => {
                log::warn!("{:#}, using built-in catalog", e);
                Catalog::default()
            }
        }
    }
}

fn config_path() -> PathBuf {
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join("sim.ron")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_fills_defaults() {
        let c: SimConfig = ron::from_str("(seed: 9, player_ship: \"viper\")").unwrap();
        assert_eq!(c.seed, 9);
        assert_eq!(c.player_ship, "viper");
        assert_eq!(c.substeps, DEFAULT_SUBSTEPS);
        assert_eq!(c.flight_mode, FlightMode::Assisted);
        assert_eq!(c.encounters.len(), 2);
    }

    #[test]
    fn saved_config_loads_back() {
        let path = std::env::temp_dir().join(format!("voidtrader-sim-{}.ron", std::process::id()));
        let config = SimConfig {
            seed: 77,
            scoop_range: 45.0,
            ..Default::default()
        };
        config.save_to(&path);
        let back = SimConfig::load_from(&path);
        let _ = std::fs::remove_file(&path);
        assert_eq!(back, config);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let c = SimConfig::load_from(Path::new("/nonexistent/sim.ron"));
        assert_eq!(c, SimConfig::default());
    }

    #[test]
    fn bad_catalog_path_uses_builtin() {
        let c = SimConfig {
            catalog_path: Some(PathBuf::from("/nonexistent/ships.ron")),
            ..Default::default()
        };
        assert!(c.catalog().ship("cobra").is_ok());
    }
}
