//! Voidtrader simulation core.
//!
//! A [`session::Session`] owns the entity store, the physics world and every
//! registry, and advances them once per frame in a fixed order: player input,
//! NPC AI, flight, physics step, speed caps, hit resolution, event drain,
//! timers, proximity checks, snapshot publish.

pub mod cargo;
pub mod catalog;
pub mod combat;
pub mod config;
pub mod effects;
pub mod events;
pub mod mission;
pub mod npc_ai;
pub mod salvage;
pub mod session;
pub mod ship;
pub mod snapshot;
pub mod state;
pub mod weapons;

pub use catalog::{Catalog, CatalogError};
pub use config::SimConfig;
pub use session::Session;
pub use snapshot::{FrameSnapshot, RestoreError, SaveSnapshot};
pub use state::{GameMessage, GameMessages, GamePhase};
