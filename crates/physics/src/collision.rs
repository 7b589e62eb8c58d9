//! Collision groups, body kinds and the tags that link bodies to entities.

use engine_core::Entity;
use rapier3d::prelude::*;

/// What a body represents in the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BodyKind {
    Player,
    Npc,
    Celestial,
    Projectile,
}

impl BodyKind {
    pub fn is_ship(self) -> bool {
        matches!(self, BodyKind::Player | BodyKind::Npc)
    }
}

/// Collision groups for different body types.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionGroup {
    /// Planets, moons, stations
    Celestial = 1 << 0,
    /// Player ship
    Player = 1 << 1,
    /// NPC ships
    Npc = 1 << 2,
    /// Projectiles fired by the player
    PlayerProjectile = 1 << 3,
    /// Projectiles fired by NPCs
    NpcProjectile = 1 << 4,
}

impl CollisionGroup {
    fn bits(groups: &[CollisionGroup]) -> Group {
        Group::from_bits_retain(groups.iter().fold(0, |acc, g| acc | *g as u32))
    }

    /// Celestials block everything.
    pub fn celestial() -> InteractionGroups {
        InteractionGroups::new(Self::bits(&[Self::Celestial]), Group::ALL)
    }

    pub fn player() -> InteractionGroups {
        InteractionGroups::new(
            Self::bits(&[Self::Player]),
            Self::bits(&[Self::Celestial, Self::Npc, Self::NpcProjectile]),
        )
    }

    pub fn npc() -> InteractionGroups {
        InteractionGroups::new(
            Self::bits(&[Self::Npc]),
            Self::bits(&[
                Self::Celestial,
                Self::Player,
                Self::Npc,
                Self::PlayerProjectile,
                Self::NpcProjectile,
            ]),
        )
    }

    /// Projectiles never see other projectiles.
    pub fn player_projectile() -> InteractionGroups {
        InteractionGroups::new(
            Self::bits(&[Self::PlayerProjectile]),
            Self::bits(&[Self::Celestial, Self::Npc]),
        )
    }

    pub fn npc_projectile() -> InteractionGroups {
        InteractionGroups::new(
            Self::bits(&[Self::NpcProjectile]),
            Self::bits(&[Self::Celestial, Self::Player, Self::Npc]),
        )
    }
}

/// Back-reference from a body to the game entity that owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BodyTag {
    pub kind: BodyKind,
    /// Entity owning this body.
    pub entity: Entity,
    /// For projectiles: the ship that fired it.
    pub source: Option<Entity>,
    /// For projectiles: whether the player fired it.
    pub from_player: bool,
}

impl BodyTag {
    pub fn ship(kind: BodyKind, entity: Entity) -> Self {
        Self {
            kind,
            entity,
            source: None,
            from_player: kind == BodyKind::Player,
        }
    }

    pub fn celestial(entity: Entity) -> Self {
        Self {
            kind: BodyKind::Celestial,
            entity,
            source: None,
            from_player: false,
        }
    }

    pub fn projectile(entity: Entity, source: Entity, from_player: bool) -> Self {
        Self {
            kind: BodyKind::Projectile,
            entity,
            source: Some(source),
            from_player,
        }
    }

    /// Interaction groups for this body.
    pub fn groups(&self) -> InteractionGroups {
        match self.kind {
            BodyKind::Player => CollisionGroup::player(),
            BodyKind::Npc => CollisionGroup::npc(),
            BodyKind::Celestial => CollisionGroup::celestial(),
            BodyKind::Projectile if self.from_player => CollisionGroup::player_projectile(),
            BodyKind::Projectile => CollisionGroup::npc_projectile(),
        }
    }
}

/// Component linking an ECS entity to its physics body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhysicsBody {
    pub rigid_body: RigidBodyHandle,
    pub collider: ColliderHandle,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projectile_groups_skip_projectiles() {
        let p = CollisionGroup::player_projectile();
        let n = CollisionGroup::npc_projectile();
        assert!(!p.test(n));
        assert!(!p.test(p));
    }

    #[test]
    fn player_projectile_hits_npc_not_player() {
        let p = CollisionGroup::player_projectile();
        assert!(p.test(CollisionGroup::npc()));
        assert!(!p.test(CollisionGroup::player()));
        assert!(p.test(CollisionGroup::celestial()));
    }

    #[test]
    fn npc_projectile_hits_ships() {
        let n = CollisionGroup::npc_projectile();
        assert!(n.test(CollisionGroup::player()));
        assert!(n.test(CollisionGroup::npc()));
    }
}
