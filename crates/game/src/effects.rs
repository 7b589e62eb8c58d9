//! Timed visual effects and sound cues for the presentation layer.

use glam::Vec3;

/// Kind of visual effect.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EffectKind {
    /// Ship destroyed.
    LargeExplosion,
    /// Shot landed without destroying the target.
    Impact,
    /// Missile or projectile fizzled against a celestial.
    Spark,
}

impl EffectKind {
    pub fn duration(self) -> f32 {
        match self {
            EffectKind::LargeExplosion => 2.0,
            EffectKind::Impact => 0.4,
            EffectKind::Spark => 0.25,
        }
    }

    /// Radius the renderer should draw at full size.
    pub fn size(self) -> f32 {
        match self {
            EffectKind::LargeExplosion => 40.0,
            EffectKind::Impact => 4.0,
            EffectKind::Spark => 2.0,
        }
    }
}

/// Sound the audio layer should play this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundCue {
    Explosion,
    Hit,
    LaserFire,
    MissileLaunch,
    MissileLock,
    Scoop,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Effect {
    pub kind: EffectKind,
    pub position: Vec3,
    pub remaining: f32,
}

impl Effect {
    /// 0 at spawn, 1 at expiry.
    pub fn progress(&self) -> f32 {
        1.0 - (self.remaining / self.kind.duration()).clamp(0.0, 1.0)
    }
}

/// Live effects, expired on update.
#[derive(Debug, Default)]
pub struct EffectsRegistry {
    effects: Vec<Effect>,
}

impl EffectsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, kind: EffectKind, position: Vec3) {
        self.effects.push(Effect {
            kind,
            position,
            remaining: kind.duration(),
        });
    }

    pub fn update(&mut self, dt: f32) {
        for e in &mut self.effects {
            e.remaining -= dt;
        }
        self.effects.retain(|e| e.remaining > 0.0);
    }

    pub fn clear(&mut self) {
        self.effects.clear();
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Effect> {
        self.effects.iter()
    }
}
