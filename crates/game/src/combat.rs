//! Projectile hit resolution: damage, hostile reactions and the destruction cascade.
//!
//! The resolver runs once per projectile contact returned by the physics step.
//! It consumes the projectile immediately, so a second report of the same
//! projectile finds nothing and does nothing.

use engine_core::{DamageReport, Vec3};
use hecs::{Entity, World};
use physics::{PhysicsBody, PhysicsWorld};
use rand::rngs::StdRng;
use rand::Rng;

use crate::cargo::{CargoItem, SCRAP};
use crate::effects::{EffectKind, SoundCue};
use crate::events::{Destruction, EventQueue, SimEvent};
use crate::npc_ai::{AiState, NpcBrain};
use crate::ship::{Combatant, Ship};
use crate::weapons::Projectile;

/// Scrap units dropped by a destroyed NPC, inclusive.
pub const SALVAGE_SCRAP_MIN: u32 = 1;
pub const SALVAGE_SCRAP_MAX: u32 = 5;

/// What a resolved contact did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HitOutcome {
    /// The projectile was already consumed or the target is gone.
    Ignored,
    /// Hit something without vitals (a celestial). Projectile consumed.
    Absorbed,
    Damaged(DamageReport),
    Destroyed(DamageReport),
}

/// Mutable state the resolver needs for one tick.
pub struct Resolver<'a> {
    pub world: &'a mut World,
    pub physics: &'a mut PhysicsWorld,
    pub events: &'a mut EventQueue,
    pub rng: &'a mut StdRng,
}

impl<'a> Resolver<'a> {
    pub fn new(
        world: &'a mut World,
        physics: &'a mut PhysicsWorld,
        events: &'a mut EventQueue,
        rng: &'a mut StdRng,
    ) -> Self {
        Self {
            world,
            physics,
            events,
            rng,
        }
    }

    /// Resolve `projectile` striking `target`.
    pub fn resolve(&mut self, projectile: Entity, target: Entity) -> HitOutcome {
        let Some(shot) = self.consume_projectile(projectile) else {
            return HitOutcome::Ignored;
        };

        let Ok(combatant) = self.world.get::<&Combatant>(target).map(|c| *c) else {
            if self.world.contains(target) {
                self.events.push(SimEvent::Effect {
                    kind: EffectKind::Spark,
                    position: shot.position,
                });
                return HitOutcome::Absorbed;
            }
            return HitOutcome::Ignored;
        };

        let (report, position, name) = {
            let Ok(mut ship) = self.world.get::<&mut Ship>(target) else {
                log::error!("combatant {:?} has no ship record", target);
                return HitOutcome::Ignored;
            };
            if ship.is_destroyed() {
                return HitOutcome::Ignored;
            }
            let report = ship.vitals.apply_damage(shot.damage);
            (report, ship.pose.position, ship.name.clone())
        };
        log::debug!(
            "{} hit for {:.1} shield / {:.1} hull",
            name,
            report.shield_damage,
            report.hull_damage
        );

        if shot.from_player {
            if let Ok(mut brain) = self.world.get::<&mut NpcBrain>(target) {
                if !brain.hostile || brain.state == AiState::Patrolling {
                    brain.react_to_player_fire();
                }
            }
        }

        if !report.destroyed {
            self.events.push(SimEvent::Effect {
                kind: EffectKind::Impact,
                position: shot.position,
            });
            self.events.push(SimEvent::Sound(SoundCue::Hit));
            return HitOutcome::Damaged(report);
        }

        self.destroy(target, combatant, name, position, shot.from_player);
        HitOutcome::Destroyed(report)
    }

    /// Despawn a projectile and its body, returning its state if it still existed.
    fn consume_projectile(&mut self, projectile: Entity) -> Option<Projectile> {
        let shot = self.world.get::<&Projectile>(projectile).ok().map(|p| *p)?;
        self.remove_entity(projectile);
        Some(shot)
    }

    fn destroy(
        &mut self,
        target: Entity,
        combatant: Combatant,
        name: String,
        position: Vec3,
        by_player: bool,
    ) {
        self.events.push(SimEvent::Effect {
            kind: EffectKind::LargeExplosion,
            position,
        });
        self.events.push(SimEvent::Sound(SoundCue::Explosion));

        match combatant {
            Combatant::Npc(role) => {
                let quantity = self.rng.gen_range(SALVAGE_SCRAP_MIN..=SALVAGE_SCRAP_MAX);
                self.events.push(SimEvent::SalvageDropped {
                    item: CargoItem::new(SCRAP, quantity),
                    position,
                });
                self.remove_entity(target);
                log::info!("{} destroyed", name);
                self.events.push(SimEvent::NpcDestroyed(Destruction {
                    entity: target,
                    name,
                    role,
                    position,
                    by_player,
                }));
            }
            Combatant::Player => {
                log::info!("player ship destroyed");
                self.events.push(SimEvent::PlayerDestroyed { position });
            }
        }
    }

    fn remove_entity(&mut self, entity: Entity) {
        if let Ok(body) = self.world.get::<&PhysicsBody>(entity).map(|b| *b) {
            self.physics.remove_body(body);
        }
        if self.world.despawn(entity).is_err() {
            log::error!("entity {:?} vanished during resolution", entity);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ship::NpcRole;
    use engine_core::{Pose, Vitals};
    use physics::{BodyDesc, BodyTag, FlightProfile};
    use rand::SeedableRng;

    struct Fixture {
        world: World,
        physics: PhysicsWorld,
        events: EventQueue,
        rng: StdRng,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                world: World::new(),
                physics: PhysicsWorld::new(),
                events: EventQueue::new(),
                rng: StdRng::seed_from_u64(7),
            }
        }

        fn spawn_ship(&mut self, combatant: Combatant, hull: f32, shields: f32) -> Entity {
            let profile = FlightProfile {
                thrust_force: 100.0,
                strafe_force: 50.0,
                torque: 10.0,
                max_speed: 100.0,
                max_turn_rate: 2.0,
            };
            let mut ship = Ship {
                name: "Krait".to_string(),
                class: "krait".to_string(),
                vitals: Vitals::new(hull, shields, 0.0),
                energy: engine_core::EnergyPool::new(50.0, 0.0),
                profile,
                radius: 5.0,
                pose: Pose::default(),
                velocity: Vec3::ZERO,
            };
            ship.pose.position = Vec3::new(10.0, 0.0, 0.0);
            let entity = self.world.spawn((ship, combatant));
            let body = self.physics.add_body(
                &BodyDesc::new(Pose::from_position(Vec3::new(10.0, 0.0, 0.0)), 10.0, 5.0),
                BodyTag::ship(combatant.body_kind(), entity),
            );
            self.world.insert_one(entity, body).unwrap();
            if let Combatant::Npc(role) = combatant {
                self.world
                    .insert_one(entity, NpcBrain::new(role, false))
                    .unwrap();
            }
            entity
        }

        fn spawn_projectile(&mut self, source: Entity, damage: f32, from_player: bool) -> Entity {
            let entity = self.world.spawn((Projectile {
                damage,
                source,
                from_player,
                homing: None,
                turn_rate: 0.0,
                position: Vec3::ZERO,
                velocity: Vec3::ZERO,
            },));
            let body = self.physics.add_body(
                &BodyDesc::new(Pose::default(), 0.1, 0.5),
                BodyTag::projectile(entity, source, from_player),
            );
            self.world.insert_one(entity, body).unwrap();
            entity
        }

        fn resolver(&mut self) -> Resolver<'_> {
            Resolver::new(
                &mut self.world,
                &mut self.physics,
                &mut self.events,
                &mut self.rng,
            )
        }

        fn drain(&mut self) -> Vec<SimEvent> {
            std::iter::from_fn(|| self.events.pop()).collect()
        }
    }

    #[test]
    fn hit_applies_shields_then_hull() {
        let mut f = Fixture::new();
        let player = f.spawn_ship(Combatant::Player, 100.0, 100.0);
        let npc = f.spawn_ship(Combatant::Npc(NpcRole::Pirate), 100.0, 30.0);
        let shot = f.spawn_projectile(player, 50.0, true);

        let outcome = f.resolver().resolve(shot, npc);
        assert!(matches!(outcome, HitOutcome::Damaged(_)));
        let ship = f.world.get::<&Ship>(npc).unwrap();
        assert_eq!(ship.vitals.shields, 0.0);
        assert_eq!(ship.vitals.hull, 80.0);
    }

    #[test]
    fn second_resolution_of_same_projectile_is_ignored() {
        let mut f = Fixture::new();
        let player = f.spawn_ship(Combatant::Player, 100.0, 0.0);
        let npc = f.spawn_ship(Combatant::Npc(NpcRole::Pirate), 100.0, 0.0);
        let shot = f.spawn_projectile(player, 10.0, true);
        let bodies = f.physics.body_count();

        f.resolver().resolve(shot, npc);
        assert_eq!(f.resolver().resolve(shot, npc), HitOutcome::Ignored);
        assert_eq!(f.world.get::<&Ship>(npc).unwrap().vitals.hull, 90.0);
        assert_eq!(f.physics.body_count(), bodies - 1);
        assert!(!f.world.contains(shot));
    }

    #[test]
    fn player_hit_turns_trader_hostile_and_fleeing() {
        let mut f = Fixture::new();
        let player = f.spawn_ship(Combatant::Player, 100.0, 0.0);
        let trader = f.spawn_ship(Combatant::Npc(NpcRole::Trader), 100.0, 50.0);
        let shot = f.spawn_projectile(player, 5.0, true);
        f.resolver().resolve(shot, trader);
        let brain = f.world.get::<&NpcBrain>(trader).unwrap();
        assert!(brain.hostile);
        assert_eq!(brain.state, AiState::Fleeing);
    }

    #[test]
    fn npc_fire_does_not_provoke() {
        let mut f = Fixture::new();
        let pirate = f.spawn_ship(Combatant::Npc(NpcRole::Pirate), 100.0, 0.0);
        let police = f.spawn_ship(Combatant::Npc(NpcRole::Police), 100.0, 0.0);
        let shot = f.spawn_projectile(pirate, 5.0, false);
        f.resolver().resolve(shot, police);
        assert!(!f.world.get::<&NpcBrain>(police).unwrap().hostile);
    }

    #[test]
    fn exact_zero_hull_runs_cascade_once() {
        let mut f = Fixture::new();
        let player = f.spawn_ship(Combatant::Player, 100.0, 0.0);
        let npc = f.spawn_ship(Combatant::Npc(NpcRole::Pirate), 40.0, 10.0);
        let shot = f.spawn_projectile(player, 50.0, true);

        let outcome = f.resolver().resolve(shot, npc);
        assert!(matches!(outcome, HitOutcome::Destroyed(_)));
        assert!(!f.world.contains(npc));
        assert_eq!(f.physics.body_count(), 1);

        let events = f.drain();
        assert_eq!(
            events[0],
            SimEvent::Effect {
                kind: EffectKind::LargeExplosion,
                position: Vec3::new(10.0, 0.0, 0.0)
            }
        );
        assert_eq!(events[1], SimEvent::Sound(SoundCue::Explosion));
        let salvage: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                SimEvent::SalvageDropped { item, .. } => Some(item.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(salvage.len(), 1);
        assert_eq!(salvage[0].commodity, SCRAP);
        assert!((SALVAGE_SCRAP_MIN..=SALVAGE_SCRAP_MAX).contains(&salvage[0].quantity));
        let kills = events
            .iter()
            .filter(|e| matches!(e, SimEvent::NpcDestroyed(d) if d.by_player && d.entity == npc))
            .count();
        assert_eq!(kills, 1);
        assert!(matches!(events.last(), Some(SimEvent::NpcDestroyed(_))));
    }

    #[test]
    fn player_destruction_drops_no_salvage() {
        let mut f = Fixture::new();
        let player = f.spawn_ship(Combatant::Player, 10.0, 0.0);
        let pirate = f.spawn_ship(Combatant::Npc(NpcRole::Pirate), 100.0, 0.0);
        let shot = f.spawn_projectile(pirate, 25.0, false);

        f.resolver().resolve(shot, player);
        let events = f.drain();
        assert!(events
            .iter()
            .all(|e| !matches!(e, SimEvent::SalvageDropped { .. })));
        assert!(matches!(events.last(), Some(SimEvent::PlayerDestroyed { .. })));
        assert!(f.world.contains(player));
    }

    #[test]
    fn celestial_absorbs_projectile() {
        let mut f = Fixture::new();
        let player = f.spawn_ship(Combatant::Player, 100.0, 0.0);
        let planet = f.world.spawn(());
        let shot = f.spawn_projectile(player, 10.0, true);
        assert_eq!(f.resolver().resolve(shot, planet), HitOutcome::Absorbed);
        assert!(!f.world.contains(shot));
        assert!(matches!(
            f.drain()[0],
            SimEvent::Effect {
                kind: EffectKind::Spark,
                ..
            }
        ));
    }
}
