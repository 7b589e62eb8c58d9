//! Pose of a body in world space and helpers for its local axes.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Position and orientation of a ship, projectile or celestial.
///
/// Ships fly along their local -Z axis (right-handed, Y up).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec3,
    pub orientation: Quat,
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
        }
    }
}

impl Pose {
    /// Create a pose at the given position with identity orientation.
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    pub fn new(position: Vec3, orientation: Quat) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// Get the forward direction (negative Z in right-handed coordinates).
    pub fn forward(&self) -> Vec3 {
        self.orientation * -Vec3::Z
    }

    /// Get the right direction (positive X).
    pub fn right(&self) -> Vec3 {
        self.orientation * Vec3::X
    }

    /// Get the up direction (positive Y).
    pub fn up(&self) -> Vec3 {
        self.orientation * Vec3::Y
    }

    /// Express a world-space direction in this pose's local frame.
    pub fn to_local(&self, world_dir: Vec3) -> Vec3 {
        self.orientation.inverse() * world_dir
    }

    /// Express a local-frame vector (x = right, y = up, z = back) in world space.
    pub fn to_world(&self, local: Vec3) -> Vec3 {
        self.orientation * local
    }

    /// Point `distance` units ahead of the pose along its forward axis.
    pub fn ahead(&self, distance: f32) -> Vec3 {
        self.position + self.forward() * distance
    }

    /// Orientation whose forward axis points from `position` toward `target`.
    pub fn facing(position: Vec3, target: Vec3) -> Self {
        let dir = (target - position).normalize_or_zero();
        let orientation = if dir.length_squared() > 0.0001 {
            Quat::from_rotation_arc(-Vec3::Z, dir)
        } else {
            Quat::IDENTITY
        };
        Self {
            position,
            orientation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pose_identity_axes() {
        let p = Pose::default();
        assert!((p.forward() - -Vec3::Z).length() < 1e-5);
        assert!((p.right() - Vec3::X).length() < 1e-5);
        assert!((p.up() - Vec3::Y).length() < 1e-5);
    }

    #[test]
    fn pose_facing_points_forward_at_target() {
        let p = Pose::facing(Vec3::ZERO, Vec3::new(100.0, 0.0, 0.0));
        assert!((p.forward() - Vec3::X).length() < 1e-4);
        let local = p.to_local(Vec3::X);
        assert!((local - -Vec3::Z).length() < 1e-4);
    }

    #[test]
    fn pose_ahead_offsets_along_forward() {
        let p = Pose::from_position(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(p.ahead(10.0), Vec3::new(1.0, 2.0, -7.0));
    }
}
