//! Core simulation types shared by every crate in the workspace.
//!
//! This crate provides the foundational types used across all sim systems:
//! - Pose (position + orientation) and local-axis helpers
//! - Simulation clock
//! - Ship vitals, energy pool and lifetime components for the ECS

pub mod components;
pub mod time;
pub mod transform;

pub use components::*;
pub use time::*;
pub use transform::*;

// Re-export commonly used types
pub use glam::{Quat, Vec2, Vec3};
pub use hecs::{Entity, World};
