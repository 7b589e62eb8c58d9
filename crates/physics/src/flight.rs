//! Flight model: turns thrust/strafe/rotation intents into forces and torques,
//! or servo-steers velocity in assisted mode.
//!
//! Conventions: forward is local -Z, right +X, up +Y. Positive yaw turns
//! right, positive pitch raises the nose, positive roll banks right.

use crate::physics_world::PhysicsWorld;
use engine_core::{Vec2, Vec3};
use rapier3d::prelude::RigidBodyHandle;
use serde::{Deserialize, Serialize};

/// Velocity smoothing base for assisted flight: fraction left after one second.
pub const ASSIST_LINEAR_BASE: f32 = 0.01;
/// Angular damping base for assisted flight: fraction left after one second.
pub const ASSIST_ANGULAR_BASE: f32 = 0.001;

pub const MIN_THRUST: f32 = -0.5;
pub const MAX_THRUST: f32 = 1.0;

/// Per-ship-class force constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlightProfile {
    /// Main engine force at full throttle.
    pub thrust_force: f32,
    /// Lateral/vertical thruster force at full deflection.
    pub strafe_force: f32,
    /// Torque at full rotational input.
    pub torque: f32,
    /// Rated top speed; velocity is hard-clamped to it.
    pub max_speed: f32,
    /// Rated turn rate (rad/s); angular velocity is hard-clamped to it.
    pub max_turn_rate: f32,
}

/// Time-independent smoothing factor: same half-life at any frame rate.
pub fn decay_factor(base: f32, dt: f32) -> f32 {
    1.0 - base.powf(dt.max(0.0))
}

impl PhysicsWorld {
    /// Main engine force along the body's forward axis. `amount` in [-0.5, 1].
    pub fn apply_thrust(&mut self, handle: RigidBodyHandle, profile: &FlightProfile, amount: f32) {
        let Some(state) = self.body_state(handle) else {
            return;
        };
        let amount = amount.clamp(MIN_THRUST, MAX_THRUST);
        self.add_force(handle, state.pose.forward() * amount * profile.thrust_force);
    }

    /// Thruster force along local right (x) and up (y). Components in [-1, 1].
    pub fn apply_strafe(&mut self, handle: RigidBodyHandle, profile: &FlightProfile, strafe: Vec2) {
        let Some(state) = self.body_state(handle) else {
            return;
        };
        let s = strafe.clamp(Vec2::splat(-1.0), Vec2::ONE);
        let force = (state.pose.right() * s.x + state.pose.up() * s.y) * profile.strafe_force;
        self.add_force(handle, force);
    }

    pub fn apply_yaw(&mut self, handle: RigidBodyHandle, profile: &FlightProfile, amount: f32) {
        self.apply_local_torque(handle, profile, Vec3::NEG_Y, amount);
    }

    pub fn apply_pitch(&mut self, handle: RigidBodyHandle, profile: &FlightProfile, amount: f32) {
        self.apply_local_torque(handle, profile, Vec3::X, amount);
    }

    pub fn apply_roll(&mut self, handle: RigidBodyHandle, profile: &FlightProfile, amount: f32) {
        self.apply_local_torque(handle, profile, Vec3::NEG_Z, amount);
    }

    fn apply_local_torque(
        &mut self,
        handle: RigidBodyHandle,
        profile: &FlightProfile,
        local_axis: Vec3,
        amount: f32,
    ) {
        let Some(state) = self.body_state(handle) else {
            return;
        };
        let amount = amount.clamp(-1.0, 1.0);
        if amount == 0.0 {
            return;
        }
        let axis = state.pose.to_world(local_axis);
        self.add_torque(handle, axis * amount * profile.torque);
    }

    /// Servo the body's velocity toward the assisted target and, when no
    /// rotation was commanded this tick, bleed off angular velocity.
    pub fn update_assisted(
        &mut self,
        handle: RigidBodyHandle,
        profile: &FlightProfile,
        thrust: f32,
        strafe: Vec2,
        rotation_commanded: bool,
        dt: f32,
    ) {
        let Some(state) = self.body_state(handle) else {
            return;
        };
        let pose = state.pose;
        let thrust = thrust.clamp(MIN_THRUST, MAX_THRUST);
        let strafe = strafe.clamp(Vec2::splat(-1.0), Vec2::ONE);
        let target = (pose.forward() * thrust + pose.right() * strafe.x + pose.up() * strafe.y)
            * profile.max_speed;

        let k = decay_factor(ASSIST_LINEAR_BASE, dt);
        self.set_velocity(handle, state.velocity + (target - state.velocity) * k);

        if !rotation_commanded {
            let k = decay_factor(ASSIST_ANGULAR_BASE, dt);
            self.set_angular_velocity(handle, state.angular_velocity * (1.0 - k));
        }
    }

    /// Rescale velocity to `max_speed` if it is faster. Returns true when clamped.
    pub fn enforce_speed_cap(&mut self, handle: RigidBodyHandle, max_speed: f32) -> bool {
        let Some(state) = self.body_state(handle) else {
            return false;
        };
        if state.velocity.length() > max_speed {
            self.set_velocity(handle, state.velocity.clamp_length_max(max_speed));
            true
        } else {
            false
        }
    }

    /// Rescale angular velocity to `max_turn_rate` if it spins faster.
    pub fn enforce_turn_rate(&mut self, handle: RigidBodyHandle, max_turn_rate: f32) {
        let Some(state) = self.body_state(handle) else {
            return;
        };
        if state.angular_velocity.length() > max_turn_rate {
            self.set_angular_velocity(handle, state.angular_velocity.clamp_length_max(max_turn_rate));
        }
    }
}

/// Raw force control, or velocity/rotation servo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FlightMode {
    Raw,
    #[default]
    Assisted,
}

/// Per-ship flight computer: routes intents to raw forces or assisted targets.
///
/// Call the intent methods during the tick, then [`FlightController::finish`]
/// once before the world step.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FlightController {
    pub mode: FlightMode,
    assisted_thrust: f32,
    assisted_strafe: Vec2,
    rotation_commanded: bool,
}

impl FlightController {
    pub fn new(mode: FlightMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    pub fn toggle_mode(&mut self) -> FlightMode {
        self.mode = match self.mode {
            FlightMode::Raw => FlightMode::Assisted,
            FlightMode::Assisted => FlightMode::Raw,
        };
        self.assisted_thrust = 0.0;
        self.assisted_strafe = Vec2::ZERO;
        self.mode
    }

    pub fn set_assisted_thrust(&mut self, amount: f32) {
        self.assisted_thrust = amount.clamp(MIN_THRUST, MAX_THRUST);
    }

    pub fn set_assisted_strafe(&mut self, strafe: Vec2) {
        self.assisted_strafe = strafe.clamp(Vec2::splat(-1.0), Vec2::ONE);
    }

    pub fn assisted_thrust(&self) -> f32 {
        self.assisted_thrust
    }

    pub fn thrust(
        &mut self,
        world: &mut PhysicsWorld,
        handle: RigidBodyHandle,
        profile: &FlightProfile,
        amount: f32,
    ) {
        match self.mode {
            FlightMode::Raw => world.apply_thrust(handle, profile, amount),
            FlightMode::Assisted => self.set_assisted_thrust(amount),
        }
    }

    pub fn strafe(
        &mut self,
        world: &mut PhysicsWorld,
        handle: RigidBodyHandle,
        profile: &FlightProfile,
        strafe: Vec2,
    ) {
        match self.mode {
            FlightMode::Raw => world.apply_strafe(handle, profile, strafe),
            FlightMode::Assisted => self.set_assisted_strafe(strafe),
        }
    }

    /// Yaw, pitch and roll are torques in both modes.
    pub fn rotate(
        &mut self,
        world: &mut PhysicsWorld,
        handle: RigidBodyHandle,
        profile: &FlightProfile,
        yaw: f32,
        pitch: f32,
        roll: f32,
    ) {
        if yaw != 0.0 || pitch != 0.0 || roll != 0.0 {
            self.rotation_commanded = true;
        }
        world.apply_yaw(handle, profile, yaw);
        world.apply_pitch(handle, profile, pitch);
        world.apply_roll(handle, profile, roll);
    }

    /// Apply the assisted servo for this tick and reset per-tick state.
    pub fn finish(
        &mut self,
        world: &mut PhysicsWorld,
        handle: RigidBodyHandle,
        profile: &FlightProfile,
        dt: f32,
    ) {
        if self.mode == FlightMode::Assisted {
            world.update_assisted(
                handle,
                profile,
                self.assisted_thrust,
                self.assisted_strafe,
                self.rotation_commanded,
                dt,
            );
        }
        self.rotation_commanded = false;
    }
}
