//! Swept projectile hits.
//!
//! A fast shot can cross a small ship between two sub-steps without ever
//! overlapping it, so after every sub-step a ray is cast along the path each
//! projectile just travelled.

use std::collections::HashSet;

use crate::collision::BodyKind;
use crate::PhysicsWorld;
use engine_core::Vec3;
use rapier3d::prelude::*;

/// A projectile collider and where it was before the sub-step.
pub(crate) type SweepStart = (ColliderHandle, Vec3);

impl PhysicsWorld {
    pub(crate) fn projectile_positions(&self) -> Vec<SweepStart> {
        self.tags
            .iter()
            .filter(|(_, side)| side.tag.kind == BodyKind::Projectile)
            .filter_map(|(collider, side)| {
                let t = self.rigid_body_set.get(side.body)?.translation();
                Some((*collider, Vec3::new(t.x, t.y, t.z)))
            })
            .collect()
    }

    /// Cast from each start to the projectile's current position and record
    /// the first body crossed. A projectile in `spent` is not swept again.
    pub(crate) fn sweep_projectiles(
        &self,
        starts: &[SweepStart],
        hits: &mut Vec<(ColliderHandle, ColliderHandle)>,
        spent: &mut HashSet<ColliderHandle>,
    ) {
        for &(collider, from) in starts {
            if spent.contains(&collider) {
                continue;
            }
            let Some(side) = self.tags.get(&collider) else {
                continue;
            };
            let Some(body) = self.rigid_body_set.get(side.body) else {
                continue;
            };
            let t = body.translation();
            let path = Vec3::new(t.x, t.y, t.z) - from;
            if path.length_squared() <= f32::EPSILON {
                continue;
            }

            let ray = Ray::new(point![from.x, from.y, from.z], vector![path.x, path.y, path.z]);
            let source = side.tag.source;
            let tags = &self.tags;
            let not_owner = |handle: ColliderHandle, _: &Collider| {
                tags.get(&handle)
                    .is_some_and(|other| Some(other.tag.entity) != source)
            };
            let filter = QueryFilter::default()
                .exclude_sensors()
                .exclude_collider(collider)
                .groups(side.tag.groups())
                .predicate(&not_owner);

            if let Some((target, _)) = self.query_pipeline.cast_ray(
                &self.rigid_body_set,
                &self.collider_set,
                &ray,
                1.0,
                true,
                filter,
            ) {
                spent.insert(collider);
                hits.push((collider, target));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::collision::{BodyKind, BodyTag};
    use crate::physics_world::BodyDesc;
    use crate::PhysicsWorld;
    use engine_core::{Pose, Vec3, World};

    /// Fire one radius-1 shot along -Z from the origin at a radius-9 ship and
    /// count the hits reported over 30 steps.
    fn hits_for(target_start: Vec3, target_velocity: Vec3, shot_speed: f32) -> usize {
        let mut world = World::new();
        let (ship, shot, shooter) = (world.spawn(()), world.spawn(()), world.spawn(()));
        let mut physics = PhysicsWorld::new();
        physics.add_body(
            &BodyDesc::new(Pose::from_position(target_start), 10.0, 9.0)
                .with_velocity(target_velocity),
            BodyTag::ship(BodyKind::Npc, ship),
        );
        physics.add_body(
            &BodyDesc::new(Pose::default(), 0.1, 1.0)
                .with_velocity(Vec3::new(0.0, 0.0, -shot_speed)),
            BodyTag::projectile(shot, shooter, true),
        );
        (0..30)
            .map(|_| {
                physics
                    .step()
                    .iter()
                    .filter(|c| c.projectile_hit().is_some())
                    .count()
            })
            .sum()
    }

    #[test]
    fn fast_shot_hits_closing_target_at_every_phase() {
        // One sub-step of relative travel split into 20 start offsets.
        let stride = (1100.0 + 280.0) / 60.0 / 20.0;
        for phase in 0..20 {
            let start = Vec3::new(0.0, 0.0, -300.0 - phase as f32 * stride);
            let hits = hits_for(start, Vec3::new(0.0, 0.0, 280.0), 1100.0);
            assert_eq!(hits, 1, "phase {}", phase);
        }
    }

    #[test]
    fn fast_shot_hits_off_centre_inside_radius() {
        let stride = 850.0 / 60.0 / 20.0;
        for phase in 0..20 {
            let start = Vec3::new(8.0, 0.0, -200.0 - phase as f32 * stride);
            assert_eq!(hits_for(start, Vec3::ZERO, 850.0), 1, "phase {}", phase);
        }
    }

    #[test]
    fn fast_shot_clear_of_radius_misses() {
        assert_eq!(hits_for(Vec3::new(12.0, 0.0, -200.0), Vec3::ZERO, 850.0), 0);
    }
}
