//! Per-tick event queue.
//!
//! The resolver and other tick stages push events here; the session drains
//! the queue once per tick, in push order, into the effects, salvage,
//! targeting and mission consumers.

use engine_core::{Entity, Vec3};
use std::collections::VecDeque;

use crate::cargo::CargoItem;
use crate::effects::{EffectKind, SoundCue};
use crate::ship::NpcRole;

/// A ship that was destroyed this tick.
#[derive(Debug, Clone, PartialEq)]
pub struct Destruction {
    pub entity: Entity,
    pub name: String,
    pub role: NpcRole,
    pub position: Vec3,
    /// The killing shot came from the player.
    pub by_player: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SimEvent {
    Effect { kind: EffectKind, position: Vec3 },
    Sound(SoundCue),
    SalvageDropped { item: CargoItem, position: Vec3 },
    NpcDestroyed(Destruction),
    PlayerDestroyed { position: Vec3 },
}

/// FIFO of events produced during a tick.
#[derive(Debug, Default)]
pub struct EventQueue {
    events: VecDeque<SimEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: SimEvent) {
        self.events.push_back(event);
    }

    pub fn pop(&mut self) -> Option<SimEvent> {
        self.events.pop_front()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
