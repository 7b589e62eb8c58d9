//! Per-frame read-only views for presentation, and the persisted save snapshot.

use anyhow::Context;
use engine_core::{Entity, Pose, Vec3, Vitals};
use physics::FlightMode;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::cargo::Commander;
use crate::catalog::CatalogError;
use crate::effects::{Effect, SoundCue};
use crate::mission::{Mission, MissionTracker, SystemId};
use crate::npc_ai::AiState;
use crate::ship::{NpcRole, Ship};
use crate::state::{GameMessage, GamePhase};
use crate::weapons::MissileState;

#[derive(Debug, Clone, PartialEq)]
pub struct ShipView {
    pub entity: Entity,
    pub name: String,
    pub class: String,
    pub pose: Pose,
    pub velocity: Vec3,
    pub vitals: Vitals,
    pub energy: f32,
    pub max_energy: f32,
}

impl ShipView {
    pub fn new(entity: Entity, ship: &Ship) -> Self {
        Self {
            entity,
            name: ship.name.clone(),
            class: ship.class.clone(),
            pose: ship.pose,
            velocity: ship.velocity,
            vitals: ship.vitals,
            energy: ship.energy.current,
            max_energy: ship.energy.max,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerView {
    pub ship: ShipView,
    pub flight_mode: FlightMode,
    pub missile: MissileState,
    pub missiles: u32,
    pub target: Option<Entity>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NpcView {
    pub ship: ShipView,
    pub role: NpcRole,
    pub state: AiState,
    pub hostile: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectileView {
    pub position: Vec3,
    pub velocity: Vec3,
    pub from_player: bool,
    pub homing: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SalvageView {
    pub id: u64,
    pub commodity: String,
    pub quantity: u32,
    pub position: Vec3,
}

/// Everything the presentation layer may read for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSnapshot {
    pub frame: u64,
    pub elapsed: f32,
    pub phase: GamePhase,
    pub system: SystemId,
    pub player: Option<PlayerView>,
    pub npcs: Vec<NpcView>,
    pub projectiles: Vec<ProjectileView>,
    pub salvage: Vec<SalvageView>,
    pub effects: Vec<Effect>,
    /// Cues raised this tick only.
    pub sounds: Vec<SoundCue>,
    pub mission: Option<Mission>,
    pub messages: Vec<GameMessage>,
    pub credits: u64,
}

impl FrameSnapshot {
    pub fn empty(phase: GamePhase, system: SystemId) -> Self {
        Self {
            frame: 0,
            elapsed: 0.0,
            phase,
            system,
            player: None,
            npcs: Vec::new(),
            projectiles: Vec::new(),
            salvage: Vec::new(),
            effects: Vec::new(),
            sounds: Vec::new(),
            mission: None,
            messages: Vec::new(),
            credits: 0,
        }
    }

    pub fn npc(&self, entity: Entity) -> Option<&NpcView> {
        self.npcs.iter().find(|n| n.ship.entity == entity)
    }
}

/// Why a save cannot be restored.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RestoreError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("saved ship {0} is destroyed")]
    ShipDestroyed(String),
}

/// Persisted player state. Body handles and weapon cooldowns are re-derived on restore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveSnapshot {
    pub ship_name: String,
    pub ship_class: String,
    pub vitals: Vitals,
    pub energy: f32,
    pub pose: Pose,
    pub velocity: Vec3,
    pub missiles: u32,
    pub flight_mode: FlightMode,
    pub system: SystemId,
    pub commander: Commander,
    #[serde(default)]
    pub missions: MissionTracker,
}

impl SaveSnapshot {
    pub fn to_ron(&self) -> anyhow::Result<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .context("serializing save snapshot")
    }

    pub fn from_ron(data: &str) -> anyhow::Result<Self> {
        ron::from_str(data).context("parsing save snapshot")
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        std::fs::write(path, self.to_ron()?)
            .with_context(|| format!("writing save to {:?}", path))
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("reading save from {:?}", path))?;
        Self::from_ron(&data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cargo::CargoItem;
    use crate::mission::Mission;
    use engine_core::Quat;

    #[test]
    fn save_snapshot_survives_ron() {
        let mut commander = Commander::new(1234, 20);
        commander.hold.add(&CargoItem::new("scrap", 3)).unwrap();
        let mut missions = MissionTracker::new();
        missions.offer(Mission::bounty(1, NpcRole::Pirate, 2, 400, 3, 3));
        let mut vitals = Vitals::new(100.0, 50.0, 2.0);
        vitals.apply_damage(70.0);

        let save = SaveSnapshot {
            ship_name: "Jameson".to_string(),
            ship_class: "cobra".to_string(),
            vitals,
            energy: 42.5,
            pose: Pose::new(Vec3::new(1.0, 2.0, 3.0), Quat::from_rotation_y(0.5)),
            velocity: Vec3::new(0.0, 0.0, -20.0),
            missiles: 2,
            flight_mode: FlightMode::Raw,
            system: 3,
            commander,
            missions,
        };
        let text = save.to_ron().unwrap();
        let back = SaveSnapshot::from_ron(&text).unwrap();
        assert_eq!(back, save);
    }

    #[test]
    fn malformed_save_is_an_error() {
        assert!(SaveSnapshot::from_ron("(ship_name: 3)").is_err());
    }
}
