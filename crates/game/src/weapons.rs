//! Fire control: weapon slot cooldowns, energy-gated volleys and missiles.

use engine_core::{EnergyPool, Entity, InsufficientEnergy, Pose, Quat, Vec3};
use thiserror::Error;

use crate::catalog::{Catalog, CatalogError, WeaponSpec, MISSILE_WEAPON};

/// One equipped weapon and its cooldown.
#[derive(Debug, Clone, PartialEq)]
pub struct WeaponSlot {
    pub weapon: String,
    pub spec: WeaponSpec,
    /// Seconds until the slot can fire again.
    pub cooldown: f32,
}

impl WeaponSlot {
    pub fn new(weapon: impl Into<String>, spec: WeaponSpec) -> Self {
        Self {
            weapon: weapon.into(),
            spec,
            cooldown: 0.0,
        }
    }

    pub fn update(&mut self, dt: f32) {
        self.cooldown = (self.cooldown - dt).max(0.0);
    }

    pub fn is_ready(&self) -> bool {
        self.cooldown <= 0.0
    }

    fn trigger(&mut self) {
        self.cooldown = if self.spec.fire_rate > 0.0 {
            1.0 / self.spec.fire_rate
        } else {
            f32::INFINITY
        };
    }
}

/// A projectile to be spawned by the session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectileLaunch {
    pub pose: Pose,
    pub velocity: Vec3,
    pub damage: f32,
    pub life: f32,
    pub radius: f32,
}

impl ProjectileLaunch {
    fn from_firer(spec: &WeaponSpec, pose: &Pose, velocity: Vec3, muzzle: f32) -> Self {
        let forward = pose.forward();
        Self {
            pose: Pose::new(pose.ahead(muzzle), pose.orientation),
            velocity: velocity + forward * spec.projectile_speed,
            damage: spec.damage,
            life: spec.projectile_life,
            radius: spec.projectile_radius,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum FireRejected {
    #[error("weapons cycling")]
    NothingReady,
    #[error(transparent)]
    InsufficientEnergy(#[from] InsufficientEnergy),
}

/// All weapon slots of a ship.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WeaponBank {
    pub slots: Vec<WeaponSlot>,
}

impl WeaponBank {
    pub fn new(slots: Vec<WeaponSlot>) -> Self {
        Self { slots }
    }

    /// Equip the loadout of a ship class. Cooldowns start at zero.
    pub fn for_class(catalog: &Catalog, class: &str) -> Result<Self, CatalogError> {
        let names = &catalog.ship(class)?.weapons;
        let specs = catalog.loadout(class)?;
        Ok(Self::new(
            names
                .iter()
                .zip(specs)
                .map(|(name, spec)| WeaponSlot::new(name.clone(), spec))
                .collect(),
        ))
    }

    /// Tick every slot's cooldown toward zero.
    pub fn update(&mut self, dt: f32) {
        for slot in &mut self.slots {
            slot.update(dt);
        }
    }

    /// Combined energy draw of the slots that are ready.
    pub fn ready_energy_cost(&self) -> f32 {
        self.slots
            .iter()
            .filter(|s| s.is_ready())
            .map(|s| s.spec.energy_cost)
            .sum()
    }

    /// Discharge every ready slot at once, or nothing at all.
    ///
    /// Energy is debited once for the whole volley.
    pub fn fire(
        &mut self,
        energy: &mut EnergyPool,
        pose: &Pose,
        velocity: Vec3,
        muzzle: f32,
    ) -> Result<Vec<ProjectileLaunch>, FireRejected> {
        if !self.slots.iter().any(WeaponSlot::is_ready) {
            return Err(FireRejected::NothingReady);
        }
        energy.try_spend(self.ready_energy_cost())?;

        let launches = self
            .slots
            .iter_mut()
            .filter(|s| s.is_ready())
            .map(|slot| {
                slot.trigger();
                ProjectileLaunch::from_firer(&slot.spec, pose, velocity, muzzle)
            })
            .collect();
        Ok(launches)
    }
}

/// Missile fire-control state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissileState {
    #[default]
    Unarmed,
    Armed,
    Locked(Entity),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MissileError {
    #[error("no missiles left")]
    NoMissiles,
    #[error("missile not armed")]
    NotArmed,
    #[error("no target lock")]
    NotLocked,
}

/// Missile rack: `Unarmed -> Armed -> Locked -> (fire) -> Unarmed`.
#[derive(Debug, Clone, PartialEq)]
pub struct MissileRack {
    pub state: MissileState,
    pub count: u32,
    pub spec: WeaponSpec,
}

impl MissileRack {
    pub fn new(count: u32, spec: WeaponSpec) -> Self {
        Self {
            state: MissileState::Unarmed,
            count,
            spec,
        }
    }

    pub fn for_class(catalog: &Catalog, class: &str) -> Result<Self, CatalogError> {
        let count = catalog.ship(class)?.missiles;
        Ok(Self::new(count, catalog.weapon(MISSILE_WEAPON)?.clone()))
    }

    pub fn arm(&mut self) -> Result<(), MissileError> {
        if self.count == 0 {
            return Err(MissileError::NoMissiles);
        }
        if self.state == MissileState::Unarmed {
            self.state = MissileState::Armed;
        }
        Ok(())
    }

    pub fn disarm(&mut self) {
        self.state = MissileState::Unarmed;
    }

    /// Lock automatically when armed with a target; fall back to armed when
    /// the target is cleared. Returns true if the state changed.
    pub fn update_lock(&mut self, target: Option<Entity>) -> bool {
        let next = match (self.state, target) {
            (MissileState::Unarmed, _) => MissileState::Unarmed,
            (MissileState::Armed, Some(t)) | (MissileState::Locked(_), Some(t)) => {
                MissileState::Locked(t)
            }
            (MissileState::Armed, None) | (MissileState::Locked(_), None) => MissileState::Armed,
        };
        let changed = next != self.state;
        self.state = next;
        changed
    }

    /// Launch at the locked target. The rack returns to unarmed.
    pub fn fire(
        &mut self,
        pose: &Pose,
        velocity: Vec3,
        muzzle: f32,
    ) -> Result<(ProjectileLaunch, Entity), MissileError> {
        let target = match self.state {
            MissileState::Locked(t) => t,
            MissileState::Armed => return Err(MissileError::NotLocked),
            MissileState::Unarmed => return Err(MissileError::NotArmed),
        };
        if self.count == 0 {
            self.state = MissileState::Unarmed;
            return Err(MissileError::NoMissiles);
        }
        self.count -= 1;
        self.state = MissileState::Unarmed;
        Ok((
            ProjectileLaunch::from_firer(&self.spec, pose, velocity, muzzle),
            target,
        ))
    }
}

/// Projectile in flight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projectile {
    pub damage: f32,
    /// Ship that fired it; never collides with it.
    pub source: Entity,
    pub from_player: bool,
    /// Homing target for missiles.
    pub homing: Option<Entity>,
    /// Max steering rate (rad/s) when homing.
    pub turn_rate: f32,
    /// Mirrored from the body.
    pub position: Vec3,
    /// Mirrored from the body.
    pub velocity: Vec3,
}

/// Rotate `velocity` toward `to_target` by at most `max_angle` radians, keeping speed.
pub fn steer_towards(velocity: Vec3, to_target: Vec3, max_angle: f32) -> Vec3 {
    let speed = velocity.length();
    let (Some(current), Some(wanted)) = (velocity.try_normalize(), to_target.try_normalize())
    else {
        return velocity;
    };
    let angle = current.angle_between(wanted);
    if angle <= max_angle {
        return wanted * speed;
    }
    let turn = Quat::IDENTITY.slerp(Quat::from_rotation_arc(current, wanted), max_angle / angle);
    (turn * current).normalize() * speed
}
