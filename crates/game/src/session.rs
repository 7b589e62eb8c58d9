//! The simulation session: owns the world, the physics and every registry,
//! and advances them in a fixed order once per frame.

use engine_core::{Lifetime, Pose, Time, Vec3};
use hecs::{Entity, World};
use input::{Control, ControlState};
use physics::{
    BodyDesc, BodyKind, BodyTag, FlightController, FlightMode, PhysicsBody, PhysicsWorld,
    RigidBodyHandle,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::cargo::Commander;
use crate::catalog::{Catalog, CatalogError};
use crate::combat::Resolver;
use crate::config::SimConfig;
use crate::effects::{EffectsRegistry, SoundCue};
use crate::events::{Destruction, EventQueue, SimEvent};
use crate::mission::{
    AbandonReport, DockOutcome, KillReport, Mission, MissionError, MissionProgress,
    MissionTracker, SystemId,
};
use crate::npc_ai::{pilot, NpcBrain};
use crate::salvage::{SalvageRegistry, ScoopError};
use crate::ship::{Combatant, NpcRole, Ship};
use crate::snapshot::{
    FrameSnapshot, NpcView, PlayerView, ProjectileView, RestoreError, SalvageView, SaveSnapshot,
    ShipView,
};
use crate::state::{GameMessages, GamePhase};
use crate::weapons::{
    steer_towards, FireRejected, MissileRack, MissileState, Projectile, ProjectileLaunch,
    WeaponBank,
};

/// Projectile body mass; small enough that sensors never shove anything.
const PROJECTILE_MASS: f32 = 0.1;

/// Planet, moon or station. Static.
#[derive(Debug, Clone, PartialEq)]
pub struct Celestial {
    pub name: String,
    pub position: Vec3,
    pub radius: f32,
    pub dockable: bool,
}

/// One play session in one star system.
pub struct Session {
    config: SimConfig,
    catalog: Catalog,
    world: World,
    physics: PhysicsWorld,
    events: EventQueue,
    effects: EffectsRegistry,
    salvage: SalvageRegistry,
    missions: MissionTracker,
    commander: Commander,
    messages: GameMessages,
    time: Time,
    rng: StdRng,
    phase: GamePhase,
    system: SystemId,
    player: Option<Entity>,
    target: Option<Entity>,
    sounds: Vec<SoundCue>,
    snapshot: FrameSnapshot,
}

impl Session {
    /// Build a session with the player ship and the configured system contents.
    pub fn new(config: SimConfig, catalog: Catalog) -> Result<Self, CatalogError> {
        let capacity = catalog.ship(&config.player_ship)?.cargo_capacity;
        let mut session = Self {
            physics: PhysicsWorld::with_steps(config.substeps, config.fixed_dt),
            rng: StdRng::seed_from_u64(config.seed),
            commander: Commander::new(config.credits, capacity),
            system: config.start_system,
            snapshot: FrameSnapshot::empty(GamePhase::Playing, config.start_system),
            catalog,
            world: World::new(),
            events: EventQueue::new(),
            effects: EffectsRegistry::new(),
            salvage: SalvageRegistry::new(),
            missions: MissionTracker::new(),
            messages: GameMessages::new(),
            time: Time::new(),
            phase: GamePhase::Playing,
            player: None,
            target: None,
            sounds: Vec::new(),
            config,
        };

        let class = session.config.player_ship.clone();
        let name = session.config.player_name.clone();
        session.spawn_player(&name, &class, Pose::default())?;
        session.spawn_configured_celestials();
        for encounter in session.config.encounters.clone() {
            session.spawn_npc(
                &encounter.name,
                &encounter.class,
                encounter.role,
                encounter.hostile,
                Pose::facing(encounter.position, Vec3::ZERO),
            );
        }
        log::info!(
            "session started in system {} with {} bodies",
            session.system,
            session.physics.body_count()
        );
        session.publish();
        Ok(session)
    }

    fn spawn_player(
        &mut self,
        name: &str,
        class: &str,
        pose: Pose,
    ) -> Result<Entity, CatalogError> {
        let spec = self.catalog.ship(class)?.clone();
        let bank = WeaponBank::for_class(&self.catalog, class)?;
        let rack = MissileRack::for_class(&self.catalog, class)?;

        let entity = self.world.reserve_entity();
        let body = self.physics.add_body(
            &BodyDesc::new(pose, spec.mass, spec.radius),
            BodyTag::ship(BodyKind::Player, entity),
        );
        self.world.spawn_at(
            entity,
            (
                Ship::from_spec(name, class, &spec, pose),
                Combatant::Player,
                body,
                FlightController::new(self.config.flight_mode),
                bank,
                rack,
            ),
        );
        self.player = Some(entity);
        Ok(entity)
    }

    /// Spawn an NPC ship. An unknown class is logged and nothing is spawned.
    pub fn spawn_npc(
        &mut self,
        name: &str,
        class: &str,
        role: NpcRole,
        hostile: bool,
        pose: Pose,
    ) -> Option<Entity> {
        let loaded = self.catalog.ship(class).cloned().and_then(|spec| {
            let bank = WeaponBank::for_class(&self.catalog, class)?;
            Ok((spec, bank))
        });
        let (spec, bank) = match loaded {
            Ok(loaded) => loaded,
            Err(e) => {
                log::warn!("not spawning {}: {}", name, e);
                return None;
            }
        };

        let entity = self.world.reserve_entity();
        let combatant = Combatant::Npc(role);
        let body = self.physics.add_body(
            &BodyDesc::new(pose, spec.mass, spec.radius),
            BodyTag::ship(combatant.body_kind(), entity),
        );
        self.world.spawn_at(
            entity,
            (
                Ship::from_spec(name, class, &spec, pose),
                combatant,
                body,
                FlightController::new(FlightMode::Assisted),
                bank,
                NpcBrain::new(role, hostile),
            ),
        );
        log::debug!("spawned {:?} {} ({})", role, name, class);
        Some(entity)
    }

    pub fn spawn_celestial(
        &mut self,
        name: &str,
        position: Vec3,
        radius: f32,
        dockable: bool,
    ) -> Entity {
        let entity = self.world.reserve_entity();
        let body = self.physics.add_body(
            &BodyDesc::new(Pose::from_position(position), 0.0, radius),
            BodyTag::celestial(entity),
        );
        self.world.spawn_at(
            entity,
            (
                Celestial {
                    name: name.to_string(),
                    position,
                    radius,
                    dockable,
                },
                body,
            ),
        );
        entity
    }

    fn spawn_configured_celestials(&mut self) {
        for c in self.config.celestials.clone() {
            self.spawn_celestial(&c.name, c.position, c.radius, c.dockable);
        }
    }

    fn spawn_projectile(
        &mut self,
        launch: ProjectileLaunch,
        source: Entity,
        from_player: bool,
        homing: Option<(Entity, f32)>,
    ) -> Entity {
        let entity = self.world.reserve_entity();
        let body = self.physics.add_body(
            &BodyDesc::new(launch.pose, PROJECTILE_MASS, launch.radius)
                .with_velocity(launch.velocity),
            BodyTag::projectile(entity, source, from_player),
        );
        self.world.spawn_at(
            entity,
            (
                Projectile {
                    damage: launch.damage,
                    source,
                    from_player,
                    homing: homing.map(|(target, _)| target),
                    turn_rate: homing.map_or(0.0, |(_, rate)| rate),
                    position: launch.pose.position,
                    velocity: launch.velocity,
                },
                Lifetime::new(launch.life),
                body,
            ),
        );
        entity
    }

    /// Advance the simulation by one frame and publish a fresh snapshot.
    pub fn tick(&mut self, controls: &ControlState, dt: f32) -> &FrameSnapshot {
        self.sounds.clear();
        if self.phase != GamePhase::Playing {
            self.publish();
            return &self.snapshot;
        }
        let dt = self.time.advance(dt);

        self.apply_player_input(controls);
        self.run_ai();
        self.finish_flight(dt);
        self.steer_missiles(dt);

        let contacts = self.physics.step();
        self.enforce_caps();
        self.mirror_bodies();

        let mut resolver = Resolver::new(
            &mut self.world,
            &mut self.physics,
            &mut self.events,
            &mut self.rng,
        );
        for contact in &contacts {
            if let Some((shot, other)) = contact.projectile_hit() {
                resolver.resolve(shot.tag.entity, other.tag.entity);
            }
        }

        self.drain_events();
        self.update_timers(dt);
        self.check_proximity(controls);
        self.publish();
        &self.snapshot
    }

    fn apply_player_input(&mut self, controls: &ControlState) {
        let Some(player) = self.player else {
            return;
        };
        if controls.is_pressed(Control::CycleTarget) {
            self.cycle_target();
        }
        if controls.is_pressed(Control::ClearTarget) {
            self.clear_target();
        }

        let mut launches = Vec::new();
        let mut missile = None;
        {
            let Ok((ship, body, controller, bank, rack)) = self.world.query_one_mut::<(
                &mut Ship,
                &PhysicsBody,
                &mut FlightController,
                &mut WeaponBank,
                &mut MissileRack,
            )>(player) else {
                log::error!("player entity is missing flight components");
                return;
            };
            let handle = body.rigid_body;
            if rack.update_lock(self.target) && matches!(rack.state, MissileState::Locked(_)) {
                self.events.push(SimEvent::Sound(SoundCue::MissileLock));
            }

            if controls.is_pressed(Control::ToggleAssist) {
                let mode = controller.toggle_mode();
                self.messages.info(format!("Flight assist: {:?}", mode));
            }
            controller.thrust(&mut self.physics, handle, &ship.profile, controls.thrust());
            controller.strafe(&mut self.physics, handle, &ship.profile, controls.strafe());
            controller.rotate(
                &mut self.physics,
                handle,
                &ship.profile,
                controls.yaw(),
                controls.pitch(),
                controls.roll(),
            );

            let muzzle = ship.muzzle_offset();
            if controls.is_held(Control::FireWeapons) {
                match bank.fire(&mut ship.energy, &ship.pose, ship.velocity, muzzle) {
                    Ok(shots) => launches = shots,
                    Err(FireRejected::InsufficientEnergy(_)) => {
                        self.messages.warning("Insufficient energy")
                    }
                    Err(FireRejected::NothingReady) => {}
                }
            }

            if controls.is_pressed(Control::ArmMissile) && rack.state != MissileState::Unarmed {
                rack.disarm();
            } else if controls.is_pressed(Control::ArmMissile) {
                match rack.arm() {
                    Ok(()) => {
                        if rack.update_lock(self.target)
                            && matches!(rack.state, MissileState::Locked(_))
                        {
                            self.events.push(SimEvent::Sound(SoundCue::MissileLock));
                        }
                    }
                    Err(e) => self.messages.warning(format!("Missile: {}", e)),
                }
            }
            if controls.is_pressed(Control::FireMissile) {
                match rack.fire(&ship.pose, ship.velocity, muzzle) {
                    Ok((launch, target)) => {
                        missile = Some((launch, target, rack.spec.homing_turn_rate))
                    }
                    Err(e) => self.messages.warning(format!("Missile: {}", e)),
                }
            }
        }

        if !launches.is_empty() {
            self.events.push(SimEvent::Sound(SoundCue::LaserFire));
        }
        for launch in launches {
            self.spawn_projectile(launch, player, true, None);
        }
        if let Some((launch, target, turn_rate)) = missile {
            self.spawn_projectile(launch, player, true, Some((target, turn_rate)));
            self.events.push(SimEvent::Sound(SoundCue::MissileLaunch));
        }
    }

    fn player_position(&self) -> Option<Vec3> {
        let player = self.player?;
        let ship = self.world.get::<&Ship>(player).ok()?;
        Some(ship.pose.position)
    }

    /// Evaluate every NPC brain and turn the resulting actions into flight and fire calls.
    fn run_ai(&mut self) {
        let (Some(player), Some(player_pos)) = (self.player, self.player_position()) else {
            return;
        };

        let mut firing = Vec::new();
        for (entity, (ship, body, controller, brain)) in self.world.query_mut::<(
            &Ship,
            &PhysicsBody,
            &mut FlightController,
            &mut NpcBrain,
        )>() {
            let action = brain.think(
                ship.pose.position,
                player_pos,
                player,
                ship.vitals.hull_fraction(),
                &mut self.rng,
            );
            let cmd = pilot(&ship.pose, action, player_pos);
            let handle = body.rigid_body;
            controller.thrust(&mut self.physics, handle, &ship.profile, cmd.thrust);
            controller.rotate(&mut self.physics, handle, &ship.profile, cmd.yaw, cmd.pitch, 0.0);
            if cmd.fire {
                firing.push(entity);
            }
        }

        for entity in firing {
            let Ok((ship, bank)) = self.world.query_one_mut::<(&mut Ship, &mut WeaponBank)>(entity)
            else {
                continue;
            };
            let muzzle = ship.muzzle_offset();
            let Ok(shots) = bank.fire(&mut ship.energy, &ship.pose, ship.velocity, muzzle) else {
                continue;
            };
            for launch in shots {
                self.spawn_projectile(launch, entity, false, None);
            }
        }
    }

    fn finish_flight(&mut self, dt: f32) {
        for (_, (ship, body, controller)) in self
            .world
            .query_mut::<(&Ship, &PhysicsBody, &mut FlightController)>()
        {
            controller.finish(&mut self.physics, body.rigid_body, &ship.profile, dt);
        }
    }

    fn steer_missiles(&mut self, dt: f32) {
        let homing: Vec<(RigidBodyHandle, Vec3, Vec3, Entity, f32)> = self
            .world
            .query::<(&Projectile, &PhysicsBody)>()
            .iter()
            .filter_map(|(_, (p, body))| {
                p.homing
                    .map(|t| (body.rigid_body, p.position, p.velocity, t, p.turn_rate))
            })
            .collect();

        for (handle, position, velocity, target, turn_rate) in homing {
            let Ok(target_pos) = self.world.get::<&Ship>(target).map(|s| s.pose.position) else {
                continue;
            };
            let steered = steer_towards(velocity, target_pos - position, turn_rate * dt);
            self.physics.set_velocity(handle, steered);
        }
    }

    fn enforce_caps(&mut self) {
        for (_, (ship, body)) in self.world.query::<(&Ship, &PhysicsBody)>().iter() {
            self.physics
                .enforce_speed_cap(body.rigid_body, ship.profile.max_speed);
            self.physics
                .enforce_turn_rate(body.rigid_body, ship.profile.max_turn_rate);
        }
    }

    /// Copy body kinematics into ship and projectile records.
    fn mirror_bodies(&mut self) {
        for (_, (ship, body)) in self.world.query_mut::<(&mut Ship, &PhysicsBody)>() {
            if let Some(state) = self.physics.body_state(body.rigid_body) {
                ship.pose = state.pose;
                ship.velocity = state.velocity;
            }
        }
        for (_, (projectile, body)) in self.world.query_mut::<(&mut Projectile, &PhysicsBody)>() {
            if let Some(state) = self.physics.body_state(body.rigid_body) {
                projectile.position = state.pose.position;
                projectile.velocity = state.velocity;
            }
        }
    }

    fn drain_events(&mut self) {
        while let Some(event) = self.events.pop() {
            match event {
                SimEvent::Effect { kind, position } => self.effects.spawn(kind, position),
                SimEvent::Sound(cue) => self.sounds.push(cue),
                SimEvent::SalvageDropped { item, position } => {
                    let drift = Vec3::new(
                        self.rng.gen_range(-1.0..1.0),
                        self.rng.gen_range(-1.0..1.0),
                        self.rng.gen_range(-1.0..1.0),
                    );
                    self.salvage
                        .spawn(item, position, drift, self.config.salvage_lifetime);
                }
                SimEvent::NpcDestroyed(destruction) => self.on_npc_destroyed(destruction),
                SimEvent::PlayerDestroyed { .. } => {
                    self.phase = GamePhase::Destroyed;
                    self.target = None;
                    self.messages.warning("Your ship has been destroyed");
                }
            }
        }
    }

    fn on_npc_destroyed(&mut self, d: Destruction) {
        if self.target == Some(d.entity) {
            self.target = None;
        }
        if d.by_player {
            self.messages.success(format!("{} destroyed", d.name));
        }
        let kill = KillReport {
            name: d.name,
            role: d.role,
            system: self.system,
            by_player: d.by_player,
        };
        match self.missions.record_kill(&kill) {
            Some(MissionProgress::KillCounted { kills, required }) => {
                self.messages.info(format!("Bounty: {}/{}", kills, required))
            }
            Some(MissionProgress::Completed) => self
                .messages
                .success("Mission objective complete, return to collect your reward"),
            None => {}
        }
    }

    fn update_timers(&mut self, dt: f32) {
        for (_, bank) in self.world.query_mut::<&mut WeaponBank>() {
            bank.update(dt);
        }
        for (_, ship) in self.world.query_mut::<&mut Ship>() {
            ship.energy.recharge(dt);
            ship.vitals.recharge(dt);
        }

        let expired: Vec<Entity> = self
            .world
            .query_mut::<&mut Lifetime>()
            .into_iter()
            .filter_map(|(entity, life)| life.update(dt).then_some(entity))
            .collect();
        for entity in expired {
            self.despawn(entity);
        }

        if let Some(player) = self.player {
            if let Ok(mut rack) = self.world.get::<&mut MissileRack>(player) {
                if rack.update_lock(self.target) && matches!(rack.state, MissileState::Locked(_)) {
                    self.sounds.push(SoundCue::MissileLock);
                }
            }
        }

        self.effects.update(dt);
        self.salvage.update(dt);
        self.messages.update(dt);
    }

    fn check_proximity(&mut self, controls: &ControlState) {
        if self.phase != GamePhase::Playing {
            return;
        }
        if controls.is_held(Control::Scoop) {
            self.scoop(controls.is_pressed(Control::Scoop));
        }
        if controls.is_pressed(Control::Dock) {
            self.try_dock();
        }
    }

    fn scoop(&mut self, report_empty: bool) {
        let Some(position) = self.player_position() else {
            return;
        };
        match self
            .salvage
            .try_scoop(position, self.config.scoop_range, &mut self.commander.hold)
        {
            Ok(item) => {
                self.sounds.push(SoundCue::Scoop);
                self.messages
                    .success(format!("Scooped {} {}", item.quantity, item.commodity));
            }
            Err(ScoopError::CargoFull(_)) => self.messages.warning("Cargo hold full"),
            Err(ScoopError::NothingInRange) if report_empty => {
                self.messages.info("Nothing in scoop range")
            }
            Err(ScoopError::NothingInRange) => {}
        }
    }

    /// Dock at a dockable celestial in range, settling the active mission.
    pub fn try_dock(&mut self) -> Option<DockOutcome> {
        let position = self.player_position()?;
        let dock_range = self.config.dock_range;
        let station = self
            .world
            .query::<&Celestial>()
            .iter()
            .filter(|(_, c)| c.dockable && c.position.distance(position) - c.radius <= dock_range)
            .map(|(_, c)| c.name.clone())
            .next();
        let Some(station) = station else {
            self.messages.warning("No station in docking range");
            return None;
        };

        log::info!("docked at {} in system {}", station, self.system);
        let outcome = self.missions.dock(self.system, &mut self.commander);
        match &outcome {
            DockOutcome::Paid { reward, .. } => {
                self.messages.success(format!("Mission complete: {} cr paid", reward))
            }
            DockOutcome::Shortfall {
                commodity,
                needed,
                held,
            } => self.messages.warning(format!(
                "Delivery short: {} of {} {} aboard",
                held, needed, commodity
            )),
            DockOutcome::NoChange => self.messages.info(format!("Docked at {}", station)),
        }
        Some(outcome)
    }

    fn despawn(&mut self, entity: Entity) {
        if let Ok(body) = self.world.get::<&PhysicsBody>(entity).map(|b| *b) {
            self.physics.remove_body(body);
        }
        let _ = self.world.despawn(entity);
    }

    /// NPCs sorted by distance from the player.
    fn npcs_by_distance(&self) -> Vec<Entity> {
        let origin = self.player_position().unwrap_or(Vec3::ZERO);
        let mut npcs: Vec<(Entity, f32)> = self
            .world
            .query::<(&Ship, &NpcBrain)>()
            .iter()
            .map(|(e, (ship, _))| (e, ship.pose.position.distance(origin)))
            .collect();
        npcs.sort_by(|a, b| a.1.total_cmp(&b.1));
        npcs.into_iter().map(|(e, _)| e).collect()
    }

    /// Select the next NPC by distance, wrapping around.
    pub fn cycle_target(&mut self) -> Option<Entity> {
        let npcs = self.npcs_by_distance();
        let next = match self.target.and_then(|t| npcs.iter().position(|e| *e == t)) {
            Some(i) => npcs.get((i + 1) % npcs.len()).copied(),
            None => npcs.first().copied(),
        };
        self.target = next;
        next
    }

    /// Target a specific NPC. Returns false if it is not a live NPC.
    pub fn select_target(&mut self, entity: Entity) -> bool {
        if self.world.satisfies::<&NpcBrain>(entity).unwrap_or(false) {
            self.target = Some(entity);
            true
        } else {
            false
        }
    }

    pub fn clear_target(&mut self) {
        self.target = None;
    }

    pub fn offer_mission(&mut self, mission: Mission) {
        self.missions.offer(mission);
    }

    pub fn accept_mission(&mut self, id: u64) -> Result<(), MissionError> {
        match self.missions.accept(id, &mut self.commander) {
            Ok(mission) => {
                let text = mission.describe();
                self.messages.info(text);
                Ok(())
            }
            Err(e) => {
                self.messages.warning(e.to_string());
                Err(e)
            }
        }
    }

    pub fn abandon_mission(&mut self) -> Result<AbandonReport, MissionError> {
        let report = self.missions.abandon(&mut self.commander)?;
        self.messages
            .warning(format!("Mission abandoned: fined {} cr", report.fine));
        Ok(report)
    }

    /// Remove every entity, body, timer and registry entry.
    pub fn teardown(&mut self) {
        self.world.clear();
        self.physics.clear();
        self.events.clear();
        self.effects.clear();
        self.salvage.clear();
        self.missions.clear();
        self.messages.clear();
        self.sounds.clear();
        self.time.reset();
        self.player = None;
        self.target = None;
        self.phase = GamePhase::Ended;
        self.snapshot = FrameSnapshot::empty(GamePhase::Ended, self.system);
        log::info!("session torn down");
    }

    /// Capture the player's persistent state. None unless a live ship is in play.
    pub fn save(&self) -> Option<SaveSnapshot> {
        if self.phase != GamePhase::Playing {
            return None;
        }
        let player = self.player?;
        let mut query = self
            .world
            .query_one::<(&Ship, &FlightController, &MissileRack)>(player)
            .ok()?;
        let (ship, controller, rack) = query.get()?;
        if ship.is_destroyed() {
            return None;
        }
        Some(SaveSnapshot {
            ship_name: ship.name.clone(),
            ship_class: ship.class.clone(),
            vitals: ship.vitals,
            energy: ship.energy.current,
            pose: ship.pose,
            velocity: ship.velocity,
            missiles: rack.count,
            flight_mode: controller.mode,
            system: self.system,
            commander: self.commander.clone(),
            missions: self.missions.clone(),
        })
    }

    /// Replace the session with a saved game. Weapon cooldowns start ready.
    pub fn restore(&mut self, save: &SaveSnapshot) -> Result<(), RestoreError> {
        self.catalog.ship(&save.ship_class)?;
        if save.vitals.is_destroyed() {
            return Err(RestoreError::ShipDestroyed(save.ship_name.clone()));
        }
        self.teardown();
        self.system = save.system;
        self.commander = save.commander.clone();
        self.missions = save.missions.clone();
        self.phase = GamePhase::Playing;

        let player = self.spawn_player(&save.ship_name, &save.ship_class, save.pose)?;
        if let Ok((ship, body, controller, rack)) = self.world.query_one_mut::<(
            &mut Ship,
            &PhysicsBody,
            &mut FlightController,
            &mut MissileRack,
        )>(player)
        {
            ship.vitals = save.vitals;
            ship.energy.current = save.energy.min(ship.energy.max);
            ship.velocity = save.velocity;
            controller.mode = save.flight_mode;
            rack.count = save.missiles;
            self.physics.set_velocity(body.rigid_body, save.velocity);
        }
        self.spawn_configured_celestials();
        log::info!("restored {} in system {}", save.ship_name, save.system);
        self.publish();
        Ok(())
    }

    fn publish(&mut self) {
        let player = self.player.and_then(|p| {
            let mut query = self
                .world
                .query_one::<(&Ship, &FlightController, &MissileRack)>(p)
                .ok()?;
            let (ship, controller, rack) = query.get()?;
            Some(PlayerView {
                ship: ShipView::new(p, ship),
                flight_mode: controller.mode,
                missile: rack.state,
                missiles: rack.count,
                target: self.target,
            })
        });
        let npcs = self
            .world
            .query::<(&Ship, &NpcBrain)>()
            .iter()
            .map(|(e, (ship, brain))| NpcView {
                ship: ShipView::new(e, ship),
                role: brain.role,
                state: brain.state,
                hostile: brain.hostile,
            })
            .collect();
        let projectiles = self
            .world
            .query::<&Projectile>()
            .iter()
            .map(|(_, p)| ProjectileView {
                position: p.position,
                velocity: p.velocity,
                from_player: p.from_player,
                homing: p.homing.is_some(),
            })
            .collect();
        let salvage = self
            .salvage
            .iter()
            .map(|s| SalvageView {
                id: s.id,
                commodity: s.contents.commodity.clone(),
                quantity: s.contents.quantity,
                position: s.position,
            })
            .collect();

        self.snapshot = FrameSnapshot {
            frame: self.time.frame_count(),
            elapsed: self.time.elapsed_seconds(),
            phase: self.phase,
            system: self.system,
            player,
            npcs,
            projectiles,
            salvage,
            effects: self.effects.iter().copied().collect(),
            sounds: self.sounds.clone(),
            mission: self.missions.active().cloned(),
            messages: self.messages.messages.clone(),
            credits: self.commander.credits,
        };
    }

    pub fn snapshot(&self) -> &FrameSnapshot {
        &self.snapshot
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn player(&self) -> Option<Entity> {
        self.player
    }

    pub fn target(&self) -> Option<Entity> {
        self.target
    }

    pub fn system(&self) -> SystemId {
        self.system
    }

    /// Whether an entity is still alive in the session.
    pub fn contains(&self, entity: Entity) -> bool {
        self.world.contains(entity)
    }

    pub fn entity_count(&self) -> usize {
        self.world.len() as usize
    }

    pub fn body_count(&self) -> usize {
        self.physics.body_count()
    }

    pub fn commander(&self) -> &Commander {
        &self.commander
    }

    pub fn missions(&self) -> &MissionTracker {
        &self.missions
    }

    pub fn messages(&self) -> &GameMessages {
        &self.messages
    }

    pub fn salvage(&self) -> &SalvageRegistry {
        &self.salvage
    }

    pub fn effects(&self) -> &EffectsRegistry {
        &self.effects
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cargo::{CargoItem, SCRAP};
    use crate::mission::MissionStatus;
    use crate::npc_ai::AiState;

    const DT: f32 = 1.0 / 60.0;

    fn empty_config() -> SimConfig {
        SimConfig {
            encounters: Vec::new(),
            celestials: Vec::new(),
            ..Default::default()
        }
    }

    fn session() -> Session {
        Session::new(empty_config(), Catalog::default()).unwrap()
    }

    fn idle(s: &mut Session, ticks: usize) {
        let controls = ControlState::new();
        for _ in 0..ticks {
            s.tick(&controls, DT);
        }
    }

    fn fire_once(s: &mut Session) {
        let mut controls = ControlState::new();
        controls.press(Control::FireWeapons);
        s.tick(&controls, DT);
    }

    fn ship(s: &Session, e: Entity) -> Ship {
        (*s.world.get::<&Ship>(e).unwrap()).clone()
    }

    fn freeze_energy(s: &mut Session) {
        for (_, ship) in s.world.query_mut::<&mut Ship>() {
            ship.energy.recharge_rate = 0.0;
            ship.vitals.shield_regen = 0.0;
        }
    }

    /// Trader dead ahead of the player, in gun range but out of aggro.
    fn trader_ahead(s: &mut Session) -> Entity {
        s.spawn_npc(
            "Lakon",
            "sidewinder",
            NpcRole::Trader,
            false,
            Pose::from_position(Vec3::new(0.0, 0.0, -80.0)),
        )
        .unwrap()
    }

    #[test]
    fn session_starts_with_player_body() {
        let s = session();
        assert_eq!(s.body_count(), 1);
        let view = s.snapshot().player.as_ref().unwrap();
        assert_eq!(view.ship.class, "cobra");
        assert_eq!(view.missiles, 3);
        assert_eq!(s.commander().hold.capacity, 20);
    }

    #[test]
    fn unknown_npc_class_is_skipped() {
        let mut s = session();
        assert!(s
            .spawn_npc("Ghost", "thargoid", NpcRole::Pirate, true, Pose::default())
            .is_none());
        assert_eq!(s.body_count(), 1);
        assert!(s.snapshot().npcs.is_empty());
    }

    #[test]
    fn each_projectile_damages_once() {
        let mut s = session();
        let npc = trader_ahead(&mut s);
        freeze_energy(&mut s);
        let before = ship(&s, npc).vitals;

        fire_once(&mut s);
        assert_eq!(s.snapshot().projectiles.len(), 2);
        idle(&mut s, 30);

        let after = ship(&s, npc).vitals;
        let dealt = (before.shields - after.shields) + (before.hull - after.hull);
        assert!((dealt - 20.0).abs() < 1e-3, "dealt {}", dealt);
        assert!(s.snapshot().projectiles.is_empty());
        assert_eq!(s.body_count(), 2);
    }

    #[test]
    fn player_hit_sends_trader_fleeing() {
        let mut s = session();
        let npc = trader_ahead(&mut s);
        fire_once(&mut s);
        idle(&mut s, 5);
        let view = s.snapshot().npc(npc).unwrap();
        assert!(view.hostile);
        assert_eq!(view.state, AiState::Fleeing);
    }

    #[test]
    fn fire_without_energy_spawns_nothing() {
        let mut s = session();
        freeze_energy(&mut s);
        let player = s.player().unwrap();
        s.world.get::<&mut Ship>(player).unwrap().energy.current = 9.0;

        fire_once(&mut s);
        assert!(s.snapshot().projectiles.is_empty());
        assert_eq!(ship(&s, player).energy.current, 9.0);
        assert_eq!(s.body_count(), 1);
        assert!(s
            .messages()
            .messages
            .iter()
            .any(|m| m.text == "Insufficient energy"));
    }

    #[test]
    fn destroying_npc_drops_one_salvage_and_counts_kill() {
        let mut s = session();
        let npc = trader_ahead(&mut s);
        freeze_energy(&mut s);
        {
            let mut target = s.world.get::<&mut Ship>(npc).unwrap();
            target.vitals.shields = 0.0;
            target.vitals.hull = 10.0;
        }
        s.offer_mission(Mission::bounty(1, NpcRole::Trader, 1, 250, 0, 0));
        s.accept_mission(1).unwrap();
        s.select_target(npc);

        fire_once(&mut s);
        idle(&mut s, 30);

        assert!(!s.contains(npc));
        assert_eq!(s.salvage().len(), 1);
        assert_eq!(s.target(), None);
        assert_eq!(s.missions().active().unwrap().status, MissionStatus::Completed);
        let notices = s
            .messages()
            .messages
            .iter()
            .filter(|m| m.text == "Lakon destroyed")
            .count();
        assert_eq!(notices, 1);
    }

    #[test]
    fn scoop_moves_salvage_into_hold() {
        let mut s = session();
        s.salvage
            .spawn(CargoItem::new(SCRAP, 3), Vec3::new(5.0, 0.0, 0.0), Vec3::ZERO, 60.0);
        let mut controls = ControlState::new();
        controls.press(Control::Scoop);
        s.tick(&controls, DT);
        assert_eq!(s.commander().hold.quantity(SCRAP), 3);
        assert!(s.salvage().is_empty());
        assert!(s.snapshot().sounds.contains(&SoundCue::Scoop));
    }

    #[test]
    fn dock_pays_completed_bounty_once() {
        let mut s = session();
        s.spawn_celestial("Coriolis", Vec3::new(0.0, 0.0, 150.0), 60.0, true);
        s.offer_mission(Mission::bounty(1, NpcRole::Pirate, 1, 500, 0, 0));
        s.accept_mission(1).unwrap();
        s.on_npc_destroyed(Destruction {
            entity: s.player().unwrap(),
            name: "Raider".to_string(),
            role: NpcRole::Pirate,
            position: Vec3::ZERO,
            by_player: true,
        });

        let credits = s.commander().credits;
        assert!(matches!(s.try_dock(), Some(DockOutcome::Paid { reward: 500, .. })));
        assert_eq!(s.commander().credits, credits + 500);
        assert_eq!(s.try_dock(), Some(DockOutcome::NoChange));
        assert_eq!(s.commander().credits, credits + 500);
    }

    #[test]
    fn dock_out_of_range_is_refused() {
        let mut s = session();
        s.spawn_celestial("Coriolis", Vec3::new(0.0, 0.0, 5000.0), 60.0, true);
        assert_eq!(s.try_dock(), None);
    }

    #[test]
    fn raw_thrust_never_exceeds_speed_cap() {
        let mut s = session();
        let mut controls = ControlState::new();
        controls.press(Control::ToggleAssist);
        s.tick(&controls, DT);
        controls.begin_frame();
        controls.press(Control::ThrustForward);
        let max = ship(&s, s.player().unwrap()).profile.max_speed;
        for _ in 0..300 {
            let snap = s.tick(&controls, DT);
            let speed = snap.player.as_ref().unwrap().ship.velocity.length();
            assert!(speed <= max + 1e-2, "speed {}", speed);
        }
        let speed = ship(&s, s.player().unwrap()).velocity.length();
        assert!(speed > max * 0.9);
    }

    #[test]
    fn missile_locks_and_homes() {
        let mut s = session();
        let npc = s
            .spawn_npc(
                "Krait",
                "sidewinder",
                NpcRole::Pirate,
                false,
                Pose::from_position(Vec3::new(300.0, 0.0, -300.0)),
            )
            .unwrap();
        assert_eq!(s.cycle_target(), Some(npc));

        let mut controls = ControlState::new();
        controls.press(Control::ArmMissile);
        s.tick(&controls, DT);
        let view = s.snapshot().player.clone().unwrap();
        assert_eq!(view.missile, MissileState::Locked(npc));

        controls.begin_frame();
        controls.release(Control::ArmMissile);
        controls.press(Control::FireMissile);
        s.tick(&controls, DT);
        let snap = s.snapshot();
        assert_eq!(snap.player.as_ref().unwrap().missiles, 2);
        assert_eq!(snap.player.as_ref().unwrap().missile, MissileState::Unarmed);
        assert!(snap.projectiles.iter().any(|p| p.homing));
        assert!(snap.sounds.contains(&SoundCue::MissileLaunch));
    }

    #[test]
    fn clearing_target_cancels_missile_fired_same_tick() {
        let mut s = session();
        let npc = s
            .spawn_npc(
                "Krait",
                "sidewinder",
                NpcRole::Pirate,
                false,
                Pose::from_position(Vec3::new(300.0, 0.0, -300.0)),
            )
            .unwrap();
        s.select_target(npc);
        let mut controls = ControlState::new();
        controls.press(Control::ArmMissile);
        s.tick(&controls, DT);
        assert_eq!(s.snapshot().player.as_ref().unwrap().missile, MissileState::Locked(npc));

        controls.release(Control::ArmMissile);
        controls.begin_frame();
        controls.press(Control::FireMissile);
        controls.press(Control::ClearTarget);
        s.tick(&controls, DT);
        let snap = s.snapshot();
        let view = snap.player.as_ref().unwrap();
        assert_eq!(view.target, None);
        assert_eq!(view.missile, MissileState::Armed);
        assert_eq!(view.missiles, 3);
        assert!(!snap.projectiles.iter().any(|p| p.homing));
    }

    #[test]
    fn arm_key_toggles_missile() {
        let mut s = session();
        let mut controls = ControlState::new();
        controls.press(Control::ArmMissile);
        s.tick(&controls, DT);
        assert_eq!(s.snapshot().player.as_ref().unwrap().missile, MissileState::Armed);

        controls.release(Control::ArmMissile);
        controls.begin_frame();
        controls.press(Control::ArmMissile);
        s.tick(&controls, DT);
        let view = s.snapshot().player.as_ref().unwrap();
        assert_eq!(view.missile, MissileState::Unarmed);
        assert_eq!(view.missiles, 3);
    }

    #[test]
    fn cycle_target_orders_by_distance_and_wraps() {
        let mut s = session();
        let police = |s: &mut Session, name: &str, z: f32| {
            s.spawn_npc(
                name,
                "viper",
                NpcRole::Police,
                false,
                Pose::from_position(Vec3::new(0.0, 0.0, z)),
            )
            .unwrap()
        };
        let far = police(&mut s, "Far", -900.0);
        let near = police(&mut s, "Near", 300.0);
        assert_eq!(s.cycle_target(), Some(near));
        assert_eq!(s.cycle_target(), Some(far));
        assert_eq!(s.cycle_target(), Some(near));
        s.clear_target();
        assert_eq!(s.target(), None);
        assert!(!s.select_target(s.player().unwrap()));
    }

    #[test]
    fn teardown_leaves_nothing_behind() {
        let mut s = Session::new(SimConfig::default(), Catalog::default()).unwrap();
        fire_once(&mut s);
        s.salvage
            .spawn(CargoItem::new(SCRAP, 1), Vec3::ZERO, Vec3::ZERO, 60.0);
        assert!(s.body_count() > 3);

        s.teardown();
        assert_eq!(s.body_count(), 0);
        assert_eq!(s.entity_count(), 0);
        assert!(s.salvage().is_empty());
        assert!(s.effects().is_empty());
        assert_eq!(s.phase(), GamePhase::Ended);

        let snap = s.tick(&ControlState::new(), DT);
        assert!(snap.player.is_none());
        assert_eq!(s.body_count(), 0);
    }

    #[test]
    fn player_destruction_ends_play() {
        let mut s = session();
        let player = s.player().unwrap();
        let pirate = s
            .spawn_npc(
                "Krait",
                "sidewinder",
                NpcRole::Pirate,
                true,
                Pose::facing(Vec3::new(0.0, 0.0, -100.0), Vec3::ZERO),
            )
            .unwrap();
        {
            let mut ship = s.world.get::<&mut Ship>(player).unwrap();
            ship.vitals.shields = 0.0;
            ship.vitals.hull = 1.0;
            ship.vitals.shield_regen = 0.0;
        }
        for _ in 0..120 {
            s.tick(&ControlState::new(), DT);
            if s.phase() == GamePhase::Destroyed {
                break;
            }
        }
        assert_eq!(s.phase(), GamePhase::Destroyed);
        assert!(s.salvage().is_empty());
        assert!(s.contains(pirate));
        let frame = s.snapshot().frame;
        s.tick(&ControlState::new(), DT);
        assert_eq!(s.snapshot().frame, frame);
        assert!(s.save().is_none());
    }

    #[test]
    fn restore_rejects_destroyed_ship() {
        let mut s = session();
        let mut save = s.save().unwrap();
        save.vitals.apply_damage(save.vitals.max_shields + save.vitals.max_hull);
        assert_eq!(
            s.restore(&save),
            Err(RestoreError::ShipDestroyed("Jameson".to_string()))
        );
        assert_eq!(s.phase(), GamePhase::Playing);
        assert_eq!(s.body_count(), 1);
    }

    #[test]
    fn missed_shots_expire_with_their_bodies() {
        let mut s = session();
        fire_once(&mut s);
        assert_eq!(s.snapshot().projectiles.len(), 2);
        assert_eq!(s.body_count(), 3);

        // Pulse laser bolts live 2 s.
        idle(&mut s, 100);
        assert_eq!(s.snapshot().projectiles.len(), 2);
        idle(&mut s, 30);
        assert!(s.snapshot().projectiles.is_empty());
        assert_eq!(s.body_count(), 1);
        assert_eq!(s.entity_count(), 1);
    }

    #[test]
    fn damage_is_seen_by_ai_on_the_next_tick() {
        let mut s = session();
        let pirate = s
            .spawn_npc(
                "Krait",
                "sidewinder",
                NpcRole::Pirate,
                true,
                Pose::from_position(Vec3::new(0.0, 0.0, -80.0)),
            )
            .unwrap();
        freeze_energy(&mut s);
        idle(&mut s, 1);
        assert_eq!(s.snapshot().npc(pirate).unwrap().state, AiState::Attacking);
        {
            let mut ship = s.world.get::<&mut Ship>(pirate).unwrap();
            ship.vitals.shields = 0.0;
            ship.vitals.hull = 25.0;
        }

        fire_once(&mut s);
        for _ in 0..30 {
            let view = s.snapshot().npc(pirate).unwrap().clone();
            if view.ship.vitals.hull_fraction() < 0.2 {
                assert_eq!(view.state, AiState::Attacking);
                idle(&mut s, 1);
                assert_eq!(s.snapshot().npc(pirate).unwrap().state, AiState::Fleeing);
                return;
            }
            idle(&mut s, 1);
        }
        panic!("pirate was never hit");
    }

    #[test]
    fn save_and_restore_player_state() {
        let mut s = session();
        let player = s.player().unwrap();
        {
            let mut ship = s.world.get::<&mut Ship>(player).unwrap();
            ship.vitals.apply_damage(150.0);
        }
        s.commander.hold.add(&CargoItem::new(SCRAP, 4)).unwrap();
        let save = s.save().unwrap();

        s.restore(&save).unwrap();
        let restored = s.player().unwrap();
        let ship = ship(&s, restored);
        assert_eq!(ship.vitals, save.vitals);
        assert_eq!(ship.class, "cobra");
        assert_eq!(s.commander().hold.quantity(SCRAP), 4);
        assert_eq!(s.body_count(), 1);
        assert_eq!(s.phase(), GamePhase::Playing);
    }
}
