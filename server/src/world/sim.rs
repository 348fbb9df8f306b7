//
// Copyright 2025 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Simulated world backed by a `hecs` entity store
//!
//! Implements [`SpatialQuery`], [`Geodata`] and [`ActorModel`] over a flat,
//! rectangular-obstacle map. Monsters chase and retaliate, actors walk, swing
//! and cast on a simulated clock advanced with [`SimWorld::step`]. Every
//! intent issued through the actor API is logged per actor so tests can
//! assert on what an agent did.

use super::{AbilityId, ActorModel, ActorSpawn, ActorStatus, Geodata, Intention, SpatialQuery, WorldError};
use crate::config::DemoConfig;
use autobot_common::{Archetype, EntityClass, EntityFilter, EntityId, EntityView, Location, ZoneKind};
use hecs::Entity;
use rand::Rng;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

/// Axis-aligned rectangle on the horizontal plane
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Rect {
    /// Create a new rectangle from two corners in any order
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self {
            min_x: x1.min(x2),
            min_y: y1.min(y2),
            max_x: x1.max(x2),
            max_y: y1.max(y2),
        }
    }

    /// Square of half-width `extent` centered on `center`
    pub fn around(center: &Location, extent: f64) -> Self {
        Self::new(
            center.x - extent,
            center.y - extent,
            center.x + extent,
            center.y + extent,
        )
    }

    pub fn contains(&self, location: &Location) -> bool {
        location.x >= self.min_x
            && location.x <= self.max_x
            && location.y >= self.min_y
            && location.y <= self.max_y
    }

    /// Liang-Barsky clip of the segment `a -> b` against this rectangle
    pub fn intersects_segment(&self, a: &Location, b: &Location) -> bool {
        let dx = b.x - a.x;
        let dy = b.y - a.y;
        let mut t0 = 0.0_f64;
        let mut t1 = 1.0_f64;
        let edges = [
            (-dx, a.x - self.min_x),
            (dx, self.max_x - a.x),
            (-dy, a.y - self.min_y),
            (dy, self.max_y - a.y),
        ];
        for (p, q) in edges {
            if p == 0.0 {
                if q < 0.0 {
                    return false;
                }
                continue;
            }
            let r = q / p;
            if p < 0.0 {
                if r > t1 {
                    return false;
                }
                t0 = t0.max(r);
            } else {
                if r < t0 {
                    return false;
                }
                t1 = t1.min(r);
            }
        }
        t0 <= t1
    }
}

/// Intent recorded when the actor API is called
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Intent {
    Move(Location),
    Attack(EntityId),
    Cast(AbilityId, EntityId),
    Stop,
    Sit,
    Stand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbilityKind {
    /// Ranged damage spell
    Spell,
    /// Melee special attack
    Strike,
    Heal,
}

/// Definition of an ability in the lookup table
#[derive(Debug, Clone)]
pub struct AbilityDef {
    pub id: AbilityId,
    pub name: String,
    pub kind: AbilityKind,
    /// Damage dealt, or fraction of max health restored for heals
    pub power: f64,
    pub range: f64,
    pub mana_cost: f64,
    pub cast_time: Duration,
    pub cooldown: Duration,
}

pub const WIND_STRIKE: AbilityId = AbilityId(1177);
pub const BATTLE_HEAL: AbilityId = AbilityId(1015);
pub const POWER_STRIKE: AbilityId = AbilityId(3);

/// Description of a monster to place in the world
#[derive(Debug, Clone)]
pub struct MonsterSpec {
    pub name: String,
    pub location: Location,
    pub level: u32,
    pub class: EntityClass,
    pub max_health: f64,
    pub damage: f64,
    pub retaliates: bool,
    pub respawn_after: Option<Duration>,
}

impl MonsterSpec {
    /// Create a new regular monster spec with level-derived stats
    pub fn new(name: impl Into<String>, location: Location, level: u32) -> Self {
        Self {
            name: name.into(),
            location,
            level,
            class: EntityClass::Regular,
            max_health: 80.0 + level as f64 * 15.0,
            damage: 4.0 + level as f64 * 0.5,
            retaliates: true,
            respawn_after: None,
        }
    }

    pub fn with_class(mut self, class: EntityClass) -> Self {
        self.class = class;
        if class == EntityClass::Boss {
            self.max_health *= 10.0;
        } else if class == EntityClass::Elite {
            self.max_health *= 3.0;
        }
        self
    }

    pub fn with_retaliation(mut self, retaliates: bool) -> Self {
        self.retaliates = retaliates;
        self
    }

    pub fn with_respawn(mut self, after: Duration) -> Self {
        self.respawn_after = Some(after);
        self
    }
}

// ============================================================================
// Components
// ============================================================================

#[derive(Debug, Clone)]
struct Identity {
    id: EntityId,
    name: String,
}

#[derive(Debug, Clone, Copy)]
struct Position(Location);

#[derive(Debug, Clone)]
struct Vitals {
    health: f64,
    max_health: f64,
    mana: f64,
    max_mana: f64,
    level: u32,
    dead_since: Option<Duration>,
}

impl Vitals {
    fn alive(&self) -> bool {
        self.dead_since.is_none()
    }
}

#[derive(Debug, Clone)]
struct Profile {
    class: EntityClass,
    controlled: bool,
    attackable: bool,
    pvp_flagged: bool,
    speed: f64,
    attack_range: f64,
    damage: f64,
    retaliates: bool,
    home: Location,
    respawn_after: Option<Duration>,
}

#[derive(Debug, Clone, Copy)]
struct PendingCast {
    ability: AbilityId,
    target: EntityId,
    completes_at: Duration,
}

#[derive(Debug, Clone, Default)]
struct Activity {
    intention: Intention,
    target: Option<EntityId>,
    destination: Option<Location>,
    attacking: bool,
    casting: Option<PendingCast>,
    sitting: bool,
    next_swing: Duration,
    last_attacker: Option<EntityId>,
}

impl Activity {
    fn reset(&mut self) {
        self.intention = Intention::Idle;
        self.destination = None;
        self.attacking = false;
        self.casting = None;
    }
}

#[derive(Debug, Clone, Default)]
struct Spellbook {
    ready_at: HashMap<AbilityId, Duration>,
}

// ============================================================================
// World
// ============================================================================

struct SimState {
    world: hecs::World,
    index: HashMap<EntityId, Entity>,
    next_id: u64,
    clock: Duration,
    obstacles: Vec<Rect>,
    zones: Vec<(Rect, ZoneKind)>,
    abilities: HashMap<AbilityId, AbilityDef>,
    intents: HashMap<EntityId, Vec<Intent>>,
}

impl SimState {
    fn allocate(&mut self) -> EntityId {
        self.next_id += 1;
        EntityId(self.next_id)
    }

    fn blocked(&self, from: &Location, to: &Location) -> bool {
        self.obstacles.iter().any(|r| r.intersects_segment(from, to))
    }

    fn zone_at(&self, location: &Location) -> ZoneKind {
        self.zones
            .iter()
            .find(|(rect, _)| rect.contains(location))
            .map(|(_, zone)| *zone)
            .unwrap_or_default()
    }

    fn log(&mut self, actor: EntityId, intent: Intent) {
        self.intents.entry(actor).or_default().push(intent);
    }

    fn view(&self, entity: Entity) -> Option<EntityView> {
        let identity = self.world.get::<&Identity>(entity).ok()?;
        let position = self.world.get::<&Position>(entity).ok()?;
        let vitals = self.world.get::<&Vitals>(entity).ok()?;
        let profile = self.world.get::<&Profile>(entity).ok()?;
        let activity = self.world.get::<&Activity>(entity).ok()?;
        let id = identity.id;

        let attackers = self
            .world
            .query::<(&Identity, &Vitals, &Activity)>()
            .iter()
            .filter(|(_, v, a)| {
                v.alive() && a.target == Some(id) && (a.attacking || a.casting.is_some())
            })
            .map(|(i, _, _)| i.id)
            .collect();
        let target_is_player = activity
            .target
            .and_then(|target| self.index.get(&target))
            .and_then(|entity| self.world.get::<&Profile>(*entity).ok())
            .is_some_and(|profile| profile.class == EntityClass::Player);

        Some(EntityView {
            id,
            name: identity.name.clone(),
            location: position.0,
            health: if vitals.max_health > 0.0 {
                (vitals.health / vitals.max_health).clamp(0.0, 1.0)
            } else {
                0.0
            },
            level: vitals.level,
            alive: vitals.alive(),
            attackable: profile.attackable,
            class: profile.class,
            controlled: profile.controlled,
            pvp_flagged: profile.pvp_flagged,
            target: activity.target,
            target_is_player,
            attacking: activity.attacking || activity.casting.is_some(),
            attackers,
            zone: self.zone_at(&position.0),
        })
    }

    fn with_activity<T>(&mut self, actor: EntityId, f: impl FnOnce(&mut Activity) -> T) -> Option<T> {
        let entity = *self.index.get(&actor)?;
        let alive = self.world.get::<&Vitals>(entity).ok()?.alive();
        if !alive {
            return None;
        }
        let mut activity = self.world.get::<&mut Activity>(entity).ok()?;
        Some(f(&mut activity))
    }

    fn location_of(&self, id: EntityId) -> Option<Location> {
        let entity = *self.index.get(&id)?;
        self.world.get::<&Position>(entity).ok().map(|p| p.0)
    }

    fn ability_ready(&self, actor: EntityId, ability: AbilityId) -> bool {
        let Some(entity) = self.index.get(&actor) else {
            return false;
        };
        self.world
            .get::<&Spellbook>(*entity)
            .map(|book| book.ready_at.get(&ability).is_some_and(|at| *at <= self.clock))
            .unwrap_or(false)
    }

    fn ready_of_kind(&self, actor: EntityId, kind: AbilityKind) -> Option<AbilityId> {
        let entity = *self.index.get(&actor)?;
        let book = self.world.get::<&Spellbook>(entity).ok()?;
        let mut ready: Vec<AbilityId> = book
            .ready_at
            .iter()
            .filter(|(id, at)| {
                **at <= self.clock && self.abilities.get(*id).is_some_and(|d| d.kind == kind)
            })
            .map(|(id, _)| *id)
            .collect();
        ready.sort_by_key(|id| id.0);
        ready.first().copied()
    }
}

enum Effect {
    Damage {
        target: EntityId,
        attacker: EntityId,
        amount: f64,
    },
    Heal {
        target: EntityId,
        fraction: f64,
    },
}

/// An in-memory world for the demo binary and tests
pub struct SimWorld {
    state: RwLock<SimState>,
}

impl SimWorld {
    /// Create a new empty world with the default ability table
    pub fn new() -> Self {
        let mut abilities = HashMap::new();
        for def in [
            AbilityDef {
                id: WIND_STRIKE,
                name: "Wind Strike".to_string(),
                kind: AbilityKind::Spell,
                power: 35.0,
                range: 650.0,
                mana_cost: 10.0,
                cast_time: Duration::from_millis(1000),
                cooldown: Duration::from_millis(2500),
            },
            AbilityDef {
                id: BATTLE_HEAL,
                name: "Battle Heal".to_string(),
                kind: AbilityKind::Heal,
                power: 0.3,
                range: 0.0,
                mana_cost: 20.0,
                cast_time: Duration::from_millis(500),
                cooldown: Duration::from_secs(10),
            },
            AbilityDef {
                id: POWER_STRIKE,
                name: "Power Strike".to_string(),
                kind: AbilityKind::Strike,
                power: 30.0,
                range: 80.0,
                mana_cost: 5.0,
                cast_time: Duration::from_millis(300),
                cooldown: Duration::from_secs(5),
            },
        ] {
            abilities.insert(def.id, def);
        }

        Self {
            state: RwLock::new(SimState {
                world: hecs::World::new(),
                index: HashMap::new(),
                next_id: 0,
                clock: Duration::ZERO,
                obstacles: Vec::new(),
                zones: Vec::new(),
                abilities,
                intents: HashMap::new(),
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, SimState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, SimState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    // ============================================================================
    // Map Setup
    // ============================================================================

    pub fn add_obstacle(&self, rect: Rect) {
        self.write().obstacles.push(rect);
    }

    /// Add a zone; earlier zones take precedence where they overlap
    pub fn add_zone(&self, rect: Rect, zone: ZoneKind) {
        self.write().zones.push((rect, zone));
    }

    /// Add or replace an ability in the lookup table
    pub fn register_ability(&self, def: AbilityDef) {
        self.write().abilities.insert(def.id, def);
    }

    /// Remove an ability from the lookup table
    pub fn unregister_ability(&self, ability: AbilityId) {
        self.write().abilities.remove(&ability);
    }

    // ============================================================================
    // Entity Setup
    // ============================================================================

    /// Spawn a monster
    pub fn spawn_monster(&self, spec: MonsterSpec) -> EntityId {
        let mut state = self.write();
        let id = state.allocate();
        let entity = state.world.spawn((
            Identity {
                id,
                name: spec.name,
            },
            Position(spec.location),
            Vitals {
                health: spec.max_health,
                max_health: spec.max_health,
                mana: 0.0,
                max_mana: 0.0,
                level: spec.level,
                dead_since: None,
            },
            Profile {
                class: spec.class,
                controlled: false,
                attackable: true,
                pvp_flagged: false,
                speed: 100.0,
                attack_range: 60.0,
                damage: spec.damage,
                retaliates: spec.retaliates,
                home: spec.location,
                respawn_after: spec.respawn_after,
            },
            Activity::default(),
        ));
        state.index.insert(id, entity);
        id
    }

    /// Spawn a human-controlled player character
    pub fn spawn_player(&self, name: impl Into<String>, location: Location, level: u32) -> EntityId {
        let mut state = self.write();
        let id = state.allocate();
        let max_health = 100.0 + level as f64 * 20.0;
        let entity = state.world.spawn((
            Identity {
                id,
                name: name.into(),
            },
            Position(location),
            Vitals {
                health: max_health,
                max_health,
                mana: 100.0,
                max_mana: 100.0,
                level,
                dead_since: None,
            },
            Profile {
                class: EntityClass::Player,
                controlled: false,
                attackable: true,
                pvp_flagged: false,
                speed: 120.0,
                attack_range: 60.0,
                damage: 10.0,
                retaliates: false,
                home: location,
                respawn_after: None,
            },
            Activity::default(),
        ));
        state.index.insert(id, entity);
        id
    }

    pub fn set_health(&self, id: EntityId, fraction: f64) {
        let mut state = self.write();
        if let Some(entity) = state.index.get(&id).copied() {
            if let Ok(mut vitals) = state.world.get::<&mut Vitals>(entity) {
                vitals.health = vitals.max_health * fraction.clamp(0.0, 1.0);
            }
        }
    }

    pub fn set_mana(&self, id: EntityId, mana: f64) {
        let mut state = self.write();
        if let Some(entity) = state.index.get(&id).copied() {
            if let Ok(mut vitals) = state.world.get::<&mut Vitals>(entity) {
                vitals.mana = mana;
            }
        }
    }

    pub fn set_position(&self, id: EntityId, location: Location) {
        let mut state = self.write();
        if let Some(entity) = state.index.get(&id).copied() {
            if let Ok(mut position) = state.world.get::<&mut Position>(entity) {
                position.0 = location;
            }
        }
    }

    /// Make `attacker` target and attack `target` without logging an intent
    pub fn set_attacking(&self, attacker: EntityId, target: EntityId) {
        self.write().with_activity(attacker, |activity| {
            activity.target = Some(target);
            activity.attacking = true;
            activity.intention = Intention::Attack;
        });
    }

    /// Put `actor` into a walk towards `destination` without logging an intent
    pub fn set_moving(&self, actor: EntityId, destination: Location) {
        self.write().with_activity(actor, |activity| {
            activity.destination = Some(destination);
            activity.intention = Intention::Move;
        });
    }

    /// Teach `ability` and put it on cooldown for `remaining`
    pub fn set_cooldown(&self, actor: EntityId, ability: AbilityId, remaining: Duration) {
        let mut state = self.write();
        let ready = state.clock + remaining;
        if let Some(entity) = state.index.get(&actor).copied() {
            if let Ok(mut book) = state.world.get::<&mut Spellbook>(entity) {
                book.ready_at.insert(ability, ready);
            }
        }
    }

    /// Kill an entity immediately
    pub fn kill(&self, id: EntityId) {
        let mut state = self.write();
        let clock = state.clock;
        if let Some(entity) = state.index.get(&id).copied() {
            if let Ok(mut vitals) = state.world.get::<&mut Vitals>(entity) {
                vitals.health = 0.0;
                vitals.dead_since = Some(clock);
            }
            if let Ok(mut activity) = state.world.get::<&mut Activity>(entity) {
                activity.reset();
            }
        }
    }

    // ============================================================================
    // Inspection
    // ============================================================================

    /// Intents issued to `actor` since the last [`SimWorld::clear_intents`]
    pub fn intents(&self, actor: EntityId) -> Vec<Intent> {
        self.read().intents.get(&actor).cloned().unwrap_or_default()
    }

    pub fn clear_intents(&self, actor: EntityId) {
        self.write().intents.remove(&actor);
    }

    pub fn location(&self, id: EntityId) -> Option<Location> {
        self.read().location_of(id)
    }

    pub fn clock(&self) -> Duration {
        self.read().clock
    }

    pub fn len(&self) -> usize {
        self.read().index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ============================================================================
    // Simulation
    // ============================================================================

    /// Advance the simulated clock by `dt`, resolving movement, swings, casts,
    /// deaths and respawns
    pub fn step(&self, dt: Duration) {
        let mut guard = self.write();
        let state = &mut *guard;
        state.clock += dt;
        let clock = state.clock;
        let seconds = dt.as_secs_f64();

        // Snapshot positions and liveness for target lookups
        let positions: HashMap<EntityId, (Location, bool)> = state
            .world
            .query::<(&Identity, &Position, &Vitals)>()
            .iter()
            .map(|(i, p, v)| (i.id, (p.0, v.alive())))
            .collect();

        let mut effects = Vec::new();
        let mut moves: Vec<(Entity, Location)> = Vec::new();
        let obstacles = state.obstacles.clone();
        let blocked = |a: &Location, b: &Location| obstacles.iter().any(|r| r.intersects_segment(a, b));

        for (entity, identity, position, vitals, profile, activity) in state
            .world
            .query_mut::<(Entity, &Identity, &Position, &mut Vitals, &Profile, &mut Activity)>()
        {
            if !vitals.alive() {
                continue;
            }
            vitals.mana = (vitals.mana + seconds * 2.0).min(vitals.max_mana.max(vitals.mana));

            // Casting completes before anything else
            if let Some(cast) = activity.casting {
                if cast.completes_at <= clock {
                    activity.casting = None;
                    activity.intention = Intention::Idle;
                    if let Some(def) = state.abilities.get(&cast.ability) {
                        match def.kind {
                            AbilityKind::Heal => effects.push(Effect::Heal {
                                target: cast.target,
                                fraction: def.power,
                            }),
                            _ => effects.push(Effect::Damage {
                                target: cast.target,
                                attacker: identity.id,
                                amount: def.power,
                            }),
                        }
                    }
                }
                continue;
            }

            if activity.attacking {
                match activity.target.and_then(|t| positions.get(&t).copied()) {
                    Some((target_location, true)) => {
                        let distance = position.0.distance_2d(&target_location);
                        if distance > profile.attack_range {
                            let next = position.0.towards(&target_location, profile.speed * seconds);
                            if !blocked(&position.0, &next) {
                                moves.push((entity, next));
                            }
                        } else if activity.next_swing <= clock {
                            activity.next_swing = clock + Duration::from_secs(1);
                            if let Some(target) = activity.target {
                                effects.push(Effect::Damage {
                                    target,
                                    attacker: identity.id,
                                    amount: profile.damage,
                                });
                            }
                        }
                    }
                    _ => {
                        activity.attacking = false;
                        activity.intention = Intention::Idle;
                    }
                }
                continue;
            }

            if let Some(destination) = activity.destination {
                let next = position.0.towards(&destination, profile.speed * seconds);
                if blocked(&position.0, &next) {
                    activity.destination = None;
                    activity.intention = Intention::Idle;
                } else {
                    moves.push((entity, next));
                    if next.distance_2d(&destination) <= 1.0 {
                        activity.destination = None;
                        if activity.intention == Intention::Move {
                            activity.intention = Intention::Idle;
                        }
                    }
                }
            }
        }

        for (entity, location) in moves {
            if let Ok(mut position) = state.world.get::<&mut Position>(entity) {
                position.0 = location;
            }
        }

        for effect in effects {
            match effect {
                Effect::Damage {
                    target,
                    attacker,
                    amount,
                } => {
                    let Some(entity) = state.index.get(&target).copied() else {
                        continue;
                    };
                    let died = match state.world.get::<&mut Vitals>(entity) {
                        Ok(mut vitals) if vitals.alive() => {
                            vitals.health -= amount;
                            if vitals.health <= 0.0 {
                                vitals.health = 0.0;
                                vitals.dead_since = Some(clock);
                                true
                            } else {
                                false
                            }
                        }
                        _ => continue,
                    };
                    let retaliates = state
                        .world
                        .get::<&Profile>(entity)
                        .map(|p| p.retaliates)
                        .unwrap_or(false);
                    if let Ok(mut activity) = state.world.get::<&mut Activity>(entity) {
                        activity.last_attacker = Some(attacker);
                        if died {
                            activity.reset();
                        } else if retaliates && !activity.attacking {
                            activity.target = Some(attacker);
                            activity.attacking = true;
                            activity.intention = Intention::Attack;
                        }
                    }
                    if died {
                        tracing::trace!("Entity {} killed by {}", target, attacker);
                    }
                }
                Effect::Heal { target, fraction } => {
                    if let Some(entity) = state.index.get(&target).copied() {
                        if let Ok(mut vitals) = state.world.get::<&mut Vitals>(entity) {
                            if vitals.alive() {
                                vitals.health =
                                    (vitals.health + vitals.max_health * fraction).min(vitals.max_health);
                            }
                        }
                    }
                }
            }
        }

        // Respawn monsters whose timer elapsed
        for (vitals, position, profile, activity) in
            state
                .world
                .query_mut::<(&mut Vitals, &mut Position, &Profile, &mut Activity)>()
        {
            if let (Some(died), Some(after)) = (vitals.dead_since, profile.respawn_after) {
                if died + after <= clock {
                    vitals.dead_since = None;
                    vitals.health = vitals.max_health;
                    position.0 = profile.home;
                    *activity = Activity::default();
                }
            }
        }
    }

    /// Populate a demo map: a town safe zone at the origin, a PvP field in one
    /// corner, a few walls, and monsters scattered outside town
    pub fn populate<R: Rng + ?Sized>(&self, config: &DemoConfig, rng: &mut R) {
        let extent = config.world_extent.max(500.0);
        let origin = Location::default();
        self.add_zone(Rect::around(&origin, 300.0), ZoneKind::Peace);
        self.add_zone(
            Rect::new(extent * 0.6, extent * 0.6, extent, extent),
            ZoneKind::Pvp,
        );
        self.add_obstacle(Rect::new(-extent * 0.5, 600.0, extent * 0.2, 660.0));
        self.add_obstacle(Rect::new(900.0, -extent * 0.4, 960.0, extent * 0.1));

        const KINDS: [(&str, u32); 4] = [("Gremlin", 5), ("Goblin", 12), ("Wolf", 18), ("Orc Brute", 25)];
        for i in 0..config.monsters {
            let location = loop {
                let candidate = Location::new(
                    rng.random_range(-extent..extent),
                    rng.random_range(-extent..extent),
                    0.0,
                );
                let walled = self.read().obstacles.iter().any(|r| r.contains(&candidate));
                if candidate.distance_2d(&origin) > 450.0 && !walled {
                    break candidate;
                }
            };
            let (name, base_level) = KINDS[i % KINDS.len()];
            let level = base_level + rng.random_range(0..5);
            let class = if i % 25 == 24 {
                EntityClass::Boss
            } else if i % 10 == 9 {
                EntityClass::Elite
            } else {
                EntityClass::Regular
            };
            self.spawn_monster(
                MonsterSpec::new(name, location, level)
                    .with_class(class)
                    .with_respawn(Duration::from_secs(30)),
            );
        }
        tracing::info!(
            "Populated demo world with {} monsters (extent {})",
            config.monsters,
            extent
        );
    }
}

impl Default for SimWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl SpatialQuery for SimWorld {
    fn entities_in_radius(
        &self,
        origin: &Location,
        radius: f64,
        filter: EntityFilter,
    ) -> Vec<EntityView> {
        let state = self.read();
        let nearby: Vec<Entity> = state
            .world
            .query::<(Entity, &Position)>()
            .iter()
            .filter(|(_, p)| p.0.distance_2d(origin) <= radius)
            .map(|(e, _)| e)
            .collect();
        nearby
            .into_iter()
            .filter_map(|e| state.view(e))
            .filter(|v| filter.matches(v))
            .collect()
    }

    fn entity(&self, id: EntityId) -> Option<EntityView> {
        let state = self.read();
        let entity = *state.index.get(&id)?;
        state.view(entity)
    }

    fn zone_at(&self, location: &Location) -> ZoneKind {
        self.read().zone_at(location)
    }
}

impl Geodata for SimWorld {
    fn can_move(&self, from: &Location, to: &Location) -> bool {
        !self.read().blocked(from, to)
    }

    fn can_see(&self, from: &Location, to: &Location) -> bool {
        !self.read().blocked(from, to)
    }

    fn height(&self, _x: f64, _y: f64, _z: f64) -> f64 {
        0.0
    }
}

impl ActorModel for SimWorld {
    fn spawn_actor(&self, spawn: &ActorSpawn) -> Result<EntityId, WorldError> {
        let mut state = self.write();
        if state.obstacles.iter().any(|r| r.contains(&spawn.location)) {
            return Err(WorldError::SpawnFailed {
                name: spawn.name.clone(),
                reason: format!("{} is inside an obstacle", spawn.location),
            });
        }

        let id = state.allocate();
        let level = spawn.level as f64;
        let max_health = 100.0 + level * 20.0;
        let max_mana = 100.0 + level * 10.0;
        let mut book = Spellbook::default();
        match spawn.class.archetype {
            Archetype::Caster => {
                book.ready_at.insert(BATTLE_HEAL, Duration::ZERO);
            }
            Archetype::Melee => {
                book.ready_at.insert(POWER_STRIKE, Duration::ZERO);
            }
        }

        let entity = state.world.spawn((
            Identity {
                id,
                name: spawn.name.clone(),
            },
            Position(spawn.location),
            Vitals {
                health: max_health,
                max_health,
                mana: max_mana,
                max_mana,
                level: spawn.level,
                dead_since: None,
            },
            Profile {
                class: EntityClass::Player,
                controlled: true,
                attackable: true,
                pvp_flagged: false,
                speed: 120.0,
                attack_range: match spawn.class.archetype {
                    Archetype::Melee => 60.0,
                    Archetype::Caster => 40.0,
                },
                damage: 8.0 + level * 1.5,
                retaliates: false,
                home: spawn.location,
                respawn_after: None,
            },
            Activity::default(),
            book,
        ));
        state.index.insert(id, entity);
        Ok(id)
    }

    fn despawn_actor(&self, actor: EntityId) -> bool {
        let mut state = self.write();
        match state.index.remove(&actor) {
            Some(entity) => {
                state.intents.remove(&actor);
                state.world.despawn(entity).is_ok()
            }
            None => false,
        }
    }

    fn status(&self, actor: EntityId) -> Option<ActorStatus> {
        let state = self.read();
        let entity = *state.index.get(&actor)?;
        let position = state.world.get::<&Position>(entity).ok()?;
        let vitals = state.world.get::<&Vitals>(entity).ok()?;
        let profile = state.world.get::<&Profile>(entity).ok()?;
        let activity = state.world.get::<&Activity>(entity).ok()?;
        Some(ActorStatus {
            location: position.0,
            health: if vitals.max_health > 0.0 {
                (vitals.health / vitals.max_health).clamp(0.0, 1.0)
            } else {
                0.0
            },
            mana: vitals.mana,
            max_mana: vitals.max_mana,
            level: vitals.level,
            alive: vitals.alive(),
            moving: activity.destination.is_some(),
            casting: activity.casting.is_some(),
            attacking: activity.attacking,
            sitting: activity.sitting,
            intention: activity.intention,
            target: activity.target,
            destination: activity.destination,
            attack_range: profile.attack_range,
            last_attacker: activity.last_attacker,
        })
    }

    fn move_to(&self, actor: EntityId, destination: Location) {
        let mut state = self.write();
        let issued = state.with_activity(actor, |activity| {
            activity.destination = Some(destination);
            activity.intention = Intention::Move;
            activity.attacking = false;
            activity.sitting = false;
        });
        if issued.is_some() {
            state.log(actor, Intent::Move(destination));
        }
    }

    fn attack(&self, actor: EntityId, target: EntityId) {
        let mut state = self.write();
        let issued = state.with_activity(actor, |activity| {
            activity.target = Some(target);
            activity.attacking = true;
            activity.destination = None;
            activity.sitting = false;
            activity.intention = Intention::Attack;
        });
        if issued.is_some() {
            state.log(actor, Intent::Attack(target));
        }
    }

    fn cast(&self, actor: EntityId, ability: AbilityId, target: EntityId) -> bool {
        let mut state = self.write();
        let Some(def) = state.abilities.get(&ability).cloned() else {
            return false;
        };
        if !state.ability_ready(actor, ability) {
            return false;
        }
        let (Some(from), Some(to)) = (state.location_of(actor), state.location_of(target)) else {
            return false;
        };
        if def.kind != AbilityKind::Heal && from.distance_2d(&to) > def.range {
            return false;
        }
        let Some(entity) = state.index.get(&actor).copied() else {
            return false;
        };
        match state.world.get::<&mut Vitals>(entity) {
            Ok(mut vitals) if vitals.alive() && vitals.mana >= def.mana_cost => {
                vitals.mana -= def.mana_cost;
            }
            _ => return false,
        }
        let clock = state.clock;
        if let Ok(mut book) = state.world.get::<&mut Spellbook>(entity) {
            book.ready_at.insert(ability, clock + def.cooldown);
        }
        state.with_activity(actor, |activity| {
            activity.casting = Some(PendingCast {
                ability,
                target,
                completes_at: clock + def.cast_time,
            });
            if def.kind != AbilityKind::Heal {
                activity.target = Some(target);
            }
            activity.destination = None;
            activity.attacking = false;
            activity.intention = Intention::Cast;
        });
        state.log(actor, Intent::Cast(ability, target));
        true
    }

    fn stop(&self, actor: EntityId) {
        let mut state = self.write();
        if state.with_activity(actor, Activity::reset).is_some() {
            state.log(actor, Intent::Stop);
        }
    }

    fn set_target(&self, actor: EntityId, target: Option<EntityId>) {
        self.write().with_activity(actor, |activity| {
            activity.target = target;
            if target.is_none() {
                activity.attacking = false;
            }
        });
    }

    fn sit(&self, actor: EntityId) {
        let mut state = self.write();
        let issued = state.with_activity(actor, |activity| {
            activity.reset();
            activity.sitting = true;
            activity.intention = Intention::Rest;
        });
        if issued.is_some() {
            state.log(actor, Intent::Sit);
        }
    }

    fn stand(&self, actor: EntityId) {
        let mut state = self.write();
        let issued = state.with_activity(actor, |activity| {
            activity.sitting = false;
            if activity.intention == Intention::Rest {
                activity.intention = Intention::Idle;
            }
        });
        if issued.is_some() {
            state.log(actor, Intent::Stand);
        }
    }

    fn knows_ability(&self, actor: EntityId, ability: AbilityId) -> bool {
        let state = self.read();
        let Some(entity) = state.index.get(&actor) else {
            return false;
        };
        state
            .world
            .get::<&Spellbook>(*entity)
            .map(|book| book.ready_at.contains_key(&ability))
            .unwrap_or(false)
    }

    fn ability_ready(&self, actor: EntityId, ability: AbilityId) -> bool {
        self.read().ability_ready(actor, ability)
    }

    fn grant_ability(&self, actor: EntityId, ability: AbilityId) -> bool {
        let mut state = self.write();
        if !state.abilities.contains_key(&ability) {
            return false;
        }
        let Some(entity) = state.index.get(&actor).copied() else {
            return false;
        };
        let clock = state.clock;
        match state.world.get::<&mut Spellbook>(entity) {
            Ok(mut book) => {
                book.ready_at.entry(ability).or_insert(clock);
                true
            }
            Err(_) => false,
        }
    }

    fn restore_mana(&self, actor: EntityId, amount: f64) {
        let mut state = self.write();
        if let Some(entity) = state.index.get(&actor).copied() {
            if let Ok(mut vitals) = state.world.get::<&mut Vitals>(entity) {
                vitals.mana = amount;
            }
        }
    }

    fn healing_ability(&self, actor: EntityId) -> Option<AbilityId> {
        self.read().ready_of_kind(actor, AbilityKind::Heal)
    }

    fn offensive_ability(&self, actor: EntityId) -> Option<AbilityId> {
        self.read().ready_of_kind(actor, AbilityKind::Strike)
    }
}
