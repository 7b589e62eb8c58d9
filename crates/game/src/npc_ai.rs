//! NPC state machine and the pilot that turns its actions into flight inputs.
//!
//! The state machine only reads distances and hull fraction and emits an
//! [`AiAction`]; it never touches a body. [`pilot`] converts the action into
//! yaw/pitch/thrust and a fire request for the session to apply.

use engine_core::{Entity, Pose, Vec3};
use rand::Rng;

use crate::ship::NpcRole;

/// Patrolling hostiles engage inside this distance.
pub const ENGAGE_RANGE: f32 = 800.0;
/// Attackers give up beyond this distance.
pub const DISENGAGE_RANGE: f32 = 1000.0;
/// Fleeing ships consider themselves safe beyond this distance.
pub const ESCAPE_RANGE: f32 = 1200.0;
/// Attackers flee below this hull fraction.
pub const FLEE_HULL_FRACTION: f32 = 0.2;
/// Attackers close in until this distance, then open fire.
pub const GUN_RANGE: f32 = 400.0;
/// How far past the ship the flee waypoint sits, away from the player.
pub const FLEE_DISTANCE: f32 = 1000.0;
/// Per-tick chance that a patroller picks a new wander point.
pub const WANDER_CHANCE: f64 = 0.01;
pub const WANDER_RADIUS: f32 = 300.0;

/// Proportional gain from local-frame target offset to rotation input.
const STEER_GAIN: f32 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AiState {
    #[default]
    Patrolling,
    Attacking,
    Fleeing,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AiAction {
    Idle,
    MoveTowards(Vec3),
    /// Fire weapons at the player.
    Attack,
}

/// Per-NPC AI component.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NpcBrain {
    pub role: NpcRole,
    pub state: AiState,
    pub hostile: bool,
    pub target: Option<Entity>,
}

impl NpcBrain {
    pub fn new(role: NpcRole, hostile: bool) -> Self {
        Self {
            role,
            state: AiState::Patrolling,
            hostile,
            target: None,
        }
    }

    /// Advance the state machine from the current distance and hull fraction.
    pub fn transition(&mut self, distance: f32, hull_fraction: f32) -> AiState {
        self.state = match self.state {
            AiState::Patrolling if self.hostile && distance < ENGAGE_RANGE => AiState::Attacking,
            AiState::Patrolling => AiState::Patrolling,
            AiState::Attacking if hull_fraction < FLEE_HULL_FRACTION => AiState::Fleeing,
            AiState::Attacking if distance > DISENGAGE_RANGE => AiState::Patrolling,
            AiState::Attacking => AiState::Attacking,
            AiState::Fleeing if distance > ESCAPE_RANGE => AiState::Patrolling,
            AiState::Fleeing => AiState::Fleeing,
        };
        self.state
    }

    /// Action for the current state.
    pub fn act(&self, own: Vec3, player: Vec3, rng: &mut impl Rng) -> AiAction {
        match self.state {
            AiState::Attacking => {
                if own.distance(player) > GUN_RANGE {
                    AiAction::MoveTowards(player)
                } else {
                    AiAction::Attack
                }
            }
            AiState::Fleeing => {
                let away = (own - player).try_normalize().unwrap_or(Vec3::Z);
                AiAction::MoveTowards(own + away * FLEE_DISTANCE)
            }
            AiState::Patrolling => {
                if rng.gen_bool(WANDER_CHANCE) {
                    let offset = Vec3::new(
                        rng.gen_range(-1.0..1.0),
                        rng.gen_range(-1.0..1.0),
                        rng.gen_range(-1.0..1.0),
                    ) * WANDER_RADIUS;
                    AiAction::MoveTowards(own + offset)
                } else {
                    AiAction::Idle
                }
            }
        }
    }

    /// One AI evaluation: transition, then pick an action.
    pub fn think(
        &mut self,
        own: Vec3,
        player: Vec3,
        player_entity: Entity,
        hull_fraction: f32,
        rng: &mut impl Rng,
    ) -> AiAction {
        let previous = self.state;
        let state = self.transition(own.distance(player), hull_fraction);
        if state != previous {
            log::debug!("{:?} npc {:?} -> {:?}", self.role, previous, state);
        }
        self.target = match state {
            AiState::Attacking => Some(player_entity),
            AiState::Patrolling | AiState::Fleeing => None,
        };
        self.act(own, player, rng)
    }

    /// Reaction to being hit by the player.
    pub fn react_to_player_fire(&mut self) {
        self.hostile = true;
        self.state = match self.role {
            NpcRole::Pirate | NpcRole::Police => AiState::Attacking,
            NpcRole::Trader => AiState::Fleeing,
        };
    }
}

/// Flight and fire inputs derived from an action.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PilotCommand {
    pub yaw: f32,
    pub pitch: f32,
    pub thrust: f32,
    pub fire: bool,
}

/// Rotation inputs that turn `pose` toward `point`, and how aligned it already is (-1..1).
fn steer(pose: &Pose, point: Vec3) -> (f32, f32, f32) {
    let Some(dir) = (point - pose.position).try_normalize() else {
        return (0.0, 0.0, 1.0);
    };
    let local = pose.to_local(dir);
    let alignment = -local.z;
    if local.z > 0.0 {
        // Behind: hard turn on the nearer side.
        let yaw = if local.x >= 0.0 { 1.0 } else { -1.0 };
        return (yaw, 0.0, alignment);
    }
    (
        (local.x * STEER_GAIN).clamp(-1.0, 1.0),
        (local.y * STEER_GAIN).clamp(-1.0, 1.0),
        alignment,
    )
}

/// Translate an action into flight inputs for a ship at `pose`.
pub fn pilot(pose: &Pose, action: AiAction, player: Vec3) -> PilotCommand {
    match action {
        AiAction::Idle => PilotCommand::default(),
        AiAction::MoveTowards(point) => {
            let (yaw, pitch, alignment) = steer(pose, point);
            let thrust = if alignment > 0.8 {
                1.0
            } else if alignment > 0.0 {
                0.3
            } else {
                0.0
            };
            PilotCommand {
                yaw,
                pitch,
                thrust,
                fire: false,
            }
        }
        AiAction::Attack => {
            let (yaw, pitch, _) = steer(pose, player);
            PilotCommand {
                yaw,
                pitch,
                thrust: 0.0,
                fire: true,
            }
        }
    }
}
