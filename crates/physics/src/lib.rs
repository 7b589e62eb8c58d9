//! Rigid-body world and flight model built on Rapier3D.

pub mod collision;
pub mod flight;
pub mod physics_world;
mod sweep;

pub use collision::*;
pub use flight::*;
pub use physics_world::*;

// Re-export Rapier for downstream crates
pub use rapier3d;

// Re-export common Rapier types
pub use rapier3d::prelude::{ColliderHandle, RigidBodyHandle};
