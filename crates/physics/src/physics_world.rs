//! Physics world management with Rapier3D.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::collision::{BodyKind, BodyTag, PhysicsBody};
use engine_core::{Pose, Quat, Vec3};
use rapier3d::na::{Isometry3, Quaternion, Translation3, UnitQuaternion};
use rapier3d::prelude::*;

/// Default solver step (seconds).
pub const DEFAULT_FIXED_DT: f32 = 1.0 / 60.0;
/// Default solver iterations per `step` call.
pub const DEFAULT_SUBSTEPS: u32 = 3;

/// Everything needed to create a body.
#[derive(Debug, Clone, Copy)]
pub struct BodyDesc {
    pub pose: Pose,
    pub velocity: Vec3,
    /// Zero or negative makes the body static.
    pub mass: f32,
    /// Radius of the sphere collision shape.
    pub radius: f32,
}

impl BodyDesc {
    pub fn new(pose: Pose, mass: f32, radius: f32) -> Self {
        Self {
            pose,
            velocity: Vec3::ZERO,
            mass,
            radius,
        }
    }

    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn is_static(&self) -> bool {
        self.mass <= 0.0
    }
}

/// Read-only kinematic state of a body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyState {
    pub pose: Pose,
    pub velocity: Vec3,
    pub angular_velocity: Vec3,
    pub mass: f32,
}

/// One side of a reported contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContactSide {
    pub body: RigidBodyHandle,
    pub tag: BodyTag,
}

/// A new overlap between two bodies, reported once per `step`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContactEvent {
    pub first: ContactSide,
    pub second: ContactSide,
}

impl ContactEvent {
    /// If one side is a projectile, return `(projectile, other)`.
    pub fn projectile_hit(&self) -> Option<(ContactSide, ContactSide)> {
        match (self.first.tag.kind, self.second.tag.kind) {
            (BodyKind::Projectile, _) => Some((self.first, self.second)),
            (_, BodyKind::Projectile) => Some((self.second, self.first)),
            _ => None,
        }
    }
}

/// Collects collider pairs that started touching during a solver step.
#[derive(Default)]
struct ContactCollector {
    started: Mutex<Vec<(ColliderHandle, ColliderHandle)>>,
}

impl ContactCollector {
    fn drain(&self) -> Vec<(ColliderHandle, ColliderHandle)> {
        match self.started.lock() {
            Ok(mut started) => std::mem::take(&mut *started),
            Err(_) => Vec::new(),
        }
    }
}

impl EventHandler for ContactCollector {
    fn handle_collision_event(
        &self,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        event: CollisionEvent,
        _contact_pair: Option<&ContactPair>,
    ) {
        if let CollisionEvent::Started(h1, h2, _) = event {
            if let Ok(mut started) = self.started.lock() {
                started.push((h1, h2));
            }
        }
    }

    fn handle_contact_force_event(
        &self,
        _dt: Real,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        _contact_pair: &ContactPair,
        _total_force_magnitude: Real,
    ) {
    }
}

/// Main physics world containing all simulation state.
///
/// The world only moves bodies and reports contacts. It never touches game
/// state such as hull or shields.
pub struct PhysicsWorld {
    pub rigid_body_set: RigidBodySet,
    pub collider_set: ColliderSet,
    pub gravity: Vector<Real>,
    pub integration_parameters: IntegrationParameters,
    pub physics_pipeline: PhysicsPipeline,
    pub island_manager: IslandManager,
    pub broad_phase: DefaultBroadPhase,
    pub narrow_phase: NarrowPhase,
    pub impulse_joint_set: ImpulseJointSet,
    pub multibody_joint_set: MultibodyJointSet,
    pub ccd_solver: CCDSolver,
    pub query_pipeline: QueryPipeline,
    substeps: u32,
    collector: ContactCollector,
    pub(crate) tags: HashMap<ColliderHandle, ContactSide>,
    /// Projectile pairs already reported; a shot reports each body at most once.
    reported: HashSet<(ColliderHandle, ColliderHandle)>,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsWorld {
    /// Create a zero-gravity world with the default 3 × 1/60 s step.
    pub fn new() -> Self {
        Self::with_steps(DEFAULT_SUBSTEPS, DEFAULT_FIXED_DT)
    }

    pub fn with_steps(substeps: u32, fixed_dt: f32) -> Self {
        let mut integration_parameters = IntegrationParameters::default();
        integration_parameters.dt = fixed_dt;
        Self {
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            gravity: vector![0.0, 0.0, 0.0],
            integration_parameters,
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            substeps: substeps.max(1),
            collector: ContactCollector::default(),
            tags: HashMap::new(),
            reported: HashSet::new(),
        }
    }

    /// Advance every dynamic body by the fixed sub-step count, clear the
    /// accumulated forces and return the contacts that began during the step.
    ///
    /// The frame's wall-clock dt does not influence the step. Projectile paths
    /// are swept each sub-step so fast shots cannot pass through a ship.
    pub fn step(&mut self) -> Vec<ContactEvent> {
        let mut started = Vec::new();
        let mut spent = HashSet::new();
        for _ in 0..self.substeps {
            let starts = self.projectile_positions();
            self.physics_pipeline.step(
                &self.gravity,
                &self.integration_parameters,
                &mut self.island_manager,
                &mut self.broad_phase,
                &mut self.narrow_phase,
                &mut self.rigid_body_set,
                &mut self.collider_set,
                &mut self.impulse_joint_set,
                &mut self.multibody_joint_set,
                &mut self.ccd_solver,
                Some(&mut self.query_pipeline),
                &(),
                &self.collector,
            );
            self.query_pipeline.update(&self.collider_set);

            self.sweep_projectiles(&starts, &mut started, &mut spent);
            started.extend(self.collector.drain());
        }

        for (_, body) in self.rigid_body_set.iter_mut() {
            body.reset_forces(false);
            body.reset_torques(false);
        }

        self.collect_contacts(started)
    }

    fn collect_contacts(
        &mut self,
        started: Vec<(ColliderHandle, ColliderHandle)>,
    ) -> Vec<ContactEvent> {
        let mut seen: HashSet<(ColliderHandle, ColliderHandle)> = HashSet::new();
        let mut contacts = Vec::new();

        for (h1, h2) in started {
            let key = if h1.into_raw_parts() <= h2.into_raw_parts() {
                (h1, h2)
            } else {
                (h2, h1)
            };
            let (Some(first), Some(second)) = (self.tags.get(&h1), self.tags.get(&h2)) else {
                continue;
            };
            let event = ContactEvent {
                first: *first,
                second: *second,
            };
            if let Some((projectile, other)) = event.projectile_hit() {
                if other.tag.kind == BodyKind::Projectile
                    || projectile.tag.source == Some(other.tag.entity)
                {
                    continue;
                }
                if !self.reported.insert(key) {
                    continue;
                }
            } else if !seen.insert(key) {
                continue;
            }
            log::trace!("contact {:?} <-> {:?}", first.tag.kind, second.tag.kind);
            contacts.push(event);
        }

        contacts
    }

    /// Add a sphere body for an entity. Static when `desc.mass <= 0`.
    pub fn add_body(&mut self, desc: &BodyDesc, tag: BodyTag) -> PhysicsBody {
        let builder = if desc.is_static() {
            RigidBodyBuilder::fixed()
        } else {
            RigidBodyBuilder::dynamic()
                .linvel(to_na(desc.velocity))
                .can_sleep(false)
        };
        let rigid_body = builder.position(to_isometry(&desc.pose)).build();
        let body_handle = self.rigid_body_set.insert(rigid_body);

        let mut collider = ColliderBuilder::ball(desc.radius)
            .collision_groups(tag.groups())
            .active_events(ActiveEvents::COLLISION_EVENTS)
            .active_collision_types(ActiveCollisionTypes::all())
            .sensor(tag.kind == BodyKind::Projectile);
        if !desc.is_static() {
            collider = collider.mass(desc.mass);
        }
        let collider_handle = self.collider_set.insert_with_parent(
            collider.build(),
            body_handle,
            &mut self.rigid_body_set,
        );

        self.tags.insert(
            collider_handle,
            ContactSide {
                body: body_handle,
                tag,
            },
        );

        PhysicsBody {
            rigid_body: body_handle,
            collider: collider_handle,
        }
    }

    /// Remove a body together with its collider.
    pub fn remove_body(&mut self, body: PhysicsBody) {
        self.tags.remove(&body.collider);
        self.reported
            .retain(|(a, b)| *a != body.collider && *b != body.collider);
        self.rigid_body_set.remove(
            body.rigid_body,
            &mut self.island_manager,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            true,
        );
    }

    /// Drop every body and collider in one pass.
    pub fn clear(&mut self) {
        let substeps = self.substeps;
        let dt = self.integration_parameters.dt;
        *self = Self::with_steps(substeps, dt);
    }

    pub fn body_count(&self) -> usize {
        self.rigid_body_set.len()
    }

    pub fn contains(&self, handle: RigidBodyHandle) -> bool {
        self.rigid_body_set.contains(handle)
    }

    pub fn body_state(&self, handle: RigidBodyHandle) -> Option<BodyState> {
        self.rigid_body_set.get(handle).map(|body| BodyState {
            pose: Pose::new(from_na(body.translation()), from_na_rotation(body.rotation())),
            velocity: from_na(body.linvel()),
            angular_velocity: from_na(body.angvel()),
            mass: body.mass(),
        })
    }

    pub fn set_velocity(&mut self, handle: RigidBodyHandle, velocity: Vec3) {
        if let Some(body) = self.rigid_body_set.get_mut(handle) {
            body.set_linvel(to_na(velocity), true);
        }
    }

    pub fn set_angular_velocity(&mut self, handle: RigidBodyHandle, angular: Vec3) {
        if let Some(body) = self.rigid_body_set.get_mut(handle) {
            body.set_angvel(to_na(angular), true);
        }
    }

    /// Accumulate a world-space force until the end of the next `step`.
    pub fn add_force(&mut self, handle: RigidBodyHandle, force: Vec3) {
        if let Some(body) = self.rigid_body_set.get_mut(handle) {
            body.add_force(to_na(force), true);
        }
    }

    /// Accumulate a world-space torque until the end of the next `step`.
    pub fn add_torque(&mut self, handle: RigidBodyHandle, torque: Vec3) {
        if let Some(body) = self.rigid_body_set.get_mut(handle) {
            body.add_torque(to_na(torque), true);
        }
    }
}

fn to_na(v: Vec3) -> Vector<Real> {
    vector![v.x, v.y, v.z]
}

fn from_na(v: &Vector<Real>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

fn from_na_rotation(rot: &UnitQuaternion<Real>) -> Quat {
    Quat::from_xyzw(rot.i, rot.j, rot.k, rot.w)
}

fn to_isometry(pose: &Pose) -> Isometry3<Real> {
    let q = pose.orientation;
    Isometry3::from_parts(
        Translation3::new(pose.position.x, pose.position.y, pose.position.z),
        UnitQuaternion::from_quaternion(Quaternion::new(q.w, q.x, q.y, q.z)),
    )
}
