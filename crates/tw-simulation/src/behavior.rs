//! Per-actor planning.
//!
//! The planner looks at one actor and the map around it and decides what the
//! actor does this tick. It records the chosen state machine state on the
//! actor's component, but never moves anything: executing the action is the
//! caller's job.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use tw_core::{
    AutonomousBehaviorComponent, BehaviorState, Coordinate, Disposition, DomainError,
    GrowthStage, MonsterAggregate, MonsterSkillInfo, Mover, ObjectComponent, PhysicalMap,
    SkillLoadout, WorldObject, WorldObjectId, WorldTick,
};

use crate::aggro::AggroEntry;
use crate::config::BehaviorConfig;
use crate::error::SimResult;
use crate::pathfinding::Pathfinder;

/// Skills the actor could use this tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkillContext {
    /// MP available to pay skill costs.
    pub current_mp: u32,
    /// One entry per loadout slot.
    pub skills: Vec<MonsterSkillInfo>,
}

impl SkillContext {
    /// Snapshot a loadout for planning.
    pub fn from_loadout(loadout: &SkillLoadout, current_mp: u32, now: WorldTick) -> Self {
        Self {
            current_mp,
            skills: loadout.skill_infos(now),
        }
    }

    /// Slots usable against a target `distance` cells away, strongest first.
    pub fn usable_slot_indices(&self, distance: u32) -> Vec<usize> {
        let mut usable: Vec<&MonsterSkillInfo> = self
            .skills
            .iter()
            .filter(|info| info.is_usable(self.current_mp, distance))
            .collect();
        usable.sort_by(|a, b| b.power.cmp(&a.power).then(a.slot_index.cmp(&b.slot_index)));
        usable.into_iter().map(|info| info.slot_index).collect()
    }
}

/// Remembered attackers, highest threat first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TargetContext {
    /// Threat table entries, already filtered by the actor's memory policy.
    pub threats: Vec<AggroEntry>,
}

/// The growth stage a monster has reached.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrowthContext {
    /// Latest stage reached.
    pub stage: GrowthStage,
    /// Age of the monster.
    pub ticks_since_spawn: u64,
}

impl GrowthContext {
    /// `None` when the template has no stage reached yet.
    pub fn from_monster(monster: &MonsterAggregate, now: WorldTick) -> Option<Self> {
        let ticks_since_spawn = monster.ticks_since_spawn(now);
        monster
            .template
            .growth_stage_at(ticks_since_spawn)
            .map(|stage| Self {
                stage: *stage,
                ticks_since_spawn,
            })
    }
}

/// Everything the caller resolved about an actor before planning.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActorContexts {
    /// Skills, when the actor has a loadout.
    pub skill: Option<SkillContext>,
    /// Threats, when an aggro store is attached and the actor is autonomous.
    pub target: Option<TargetContext>,
    /// Growth stage, for monsters whose template defines stages.
    pub growth: Option<GrowthContext>,
    /// Current HP over max HP, when the actor has a status record.
    pub hp_ratio: Option<f64>,
}

/// What an actor does this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BehaviorAction {
    /// Do nothing.
    Wait,
    /// Step onto an adjacent cell.
    Move(Coordinate),
    /// `slot_index` must be set; a missing slot is rejected by the executor.
    UseSkill {
        /// Loadout slot to fire.
        slot_index: Option<usize>,
        /// Object to face, if any.
        target: Option<WorldObjectId>,
    },
}

/// Decides one actor's action for the current tick.
pub trait BehaviorPlanner: std::fmt::Debug + Send {
    /// Choose `actor_id`'s action.
    ///
    /// May record state on the actor's component but must not move anything.
    /// A domain error fails only this actor.
    fn plan_action(
        &mut self,
        actor_id: WorldObjectId,
        map: &mut PhysicalMap,
        contexts: &ActorContexts,
        now: WorldTick,
    ) -> SimResult<BehaviorAction>;

    /// Called once after every actor of every active spot was planned.
    fn end_tick(&mut self, _now: WorldTick) {}
}

struct Decision {
    state: BehaviorState,
    action: BehaviorAction,
    target: Option<WorldObjectId>,
    advance_patrol: bool,
}

impl Decision {
    fn new(state: BehaviorState, action: BehaviorAction) -> Self {
        Self {
            state,
            action,
            target: None,
            advance_patrol: false,
        }
    }

    fn targeting(mut self, target: WorldObjectId) -> Self {
        self.target = Some(target);
        self
    }
}

/// State machine planner for players on auto-move and autonomous actors.
#[derive(Debug)]
pub struct BehaviorService {
    rng: StdRng,
    pathfinder: Pathfinder,
    wander_chance: f64,
}

impl BehaviorService {
    /// A planner seeded for reproducible wandering.
    pub fn new(config: &BehaviorConfig, seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            pathfinder: Pathfinder::new(config.path_cache_ttl_ticks, config.max_path_nodes),
            wander_chance: config.wander_chance,
        }
    }

    /// The path search and its cache.
    pub fn pathfinder(&self) -> &Pathfinder {
        &self.pathfinder
    }

    fn step_toward(
        &mut self,
        map: &PhysicalMap,
        actor_id: WorldObjectId,
        from: Coordinate,
        goal: Coordinate,
        mover: &Mover,
        now: WorldTick,
    ) -> BehaviorAction {
        self.pathfinder
            .next_step(map, actor_id, from, goal, mover, now)
            .map_or(BehaviorAction::Wait, BehaviorAction::Move)
    }

    fn select_target(
        from: Coordinate,
        ai: &AutonomousBehaviorComponent,
        map: &PhysicalMap,
        contexts: &ActorContexts,
    ) -> Option<(WorldObjectId, Coordinate)> {
        let remembered = contexts.target.as_ref().and_then(|ctx| {
            ctx.threats.iter().find_map(|entry| {
                map.object(entry.attacker)
                    .map(|attacker| (attacker.id, attacker.coordinate()))
            })
        });
        if remembered.is_some() || ai.disposition != Disposition::Aggressive {
            return remembered;
        }

        map.player_objects()
            .filter(|player| map.is_visible(from, player.coordinate(), ai.vision_range))
            .map(|player| {
                (
                    from.euclidean_distance(player.coordinate()),
                    player.id,
                    player.coordinate(),
                )
            })
            .min_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)))
            .map(|(_, id, at)| (id, at))
    }

    fn flee_step(
        map: &PhysicalMap,
        from: Coordinate,
        threat: Coordinate,
        mover: &Mover,
    ) -> Option<Coordinate> {
        let current = from.euclidean_distance(threat);
        let mut options: Vec<(f64, Coordinate)> = from
            .neighbors()
            .into_iter()
            .filter(|cell| map.is_passable(*cell, mover))
            .map(|cell| (cell.euclidean_distance(threat), cell))
            .filter(|(distance, _)| *distance > current)
            .collect();
        options.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));
        options.first().map(|(_, cell)| *cell)
    }

    fn wander(
        &mut self,
        map: &PhysicalMap,
        from: Coordinate,
        mover: &Mover,
    ) -> BehaviorAction {
        let chance = self.wander_chance;
        if chance.is_nan() || chance <= 0.0 || !self.rng.random_bool(chance.min(1.0)) {
            return BehaviorAction::Wait;
        }
        let options: Vec<Coordinate> = from
            .neighbors()
            .into_iter()
            .filter(|cell| map.is_passable(*cell, mover))
            .collect();
        if options.is_empty() {
            return BehaviorAction::Wait;
        }
        let pick = self.rng.random_range(0..options.len());
        BehaviorAction::Move(options[pick])
    }

    fn decide(
        &mut self,
        object: &WorldObject,
        ai: &AutonomousBehaviorComponent,
        map: &PhysicalMap,
        contexts: &ActorContexts,
        now: WorldTick,
    ) -> Decision {
        let actor_id = object.id;
        let from = object.coordinate();
        let mover = object.mover();
        let growth = contexts.growth.as_ref().map(|ctx| ctx.stage);

        if let Some((target_id, target_at)) = Self::select_target(from, ai, map, contexts) {
            let flee_ratio =
                ai.flee_hp_ratio * growth.map_or(1.0, |stage| stage.flee_threshold_multiplier);
            let should_flee = flee_ratio > 0.0
                && contexts.hp_ratio.is_some_and(|ratio| ratio <= flee_ratio);
            if should_flee {
                let action = Self::flee_step(map, from, target_at, &mover)
                    .map_or(BehaviorAction::Wait, BehaviorAction::Move);
                return Decision::new(BehaviorState::Flee, action).targeting(target_id);
            }

            let distance = from.manhattan_distance(target_at);
            let slot = contexts
                .skill
                .as_ref()
                .and_then(|ctx| ctx.usable_slot_indices(distance).first().copied());
            if let Some(slot_index) = slot {
                let action = BehaviorAction::UseSkill {
                    slot_index: Some(slot_index),
                    target: Some(target_id),
                };
                return Decision::new(BehaviorState::Attack, action).targeting(target_id);
            }

            if growth.is_none_or(|stage| stage.can_chase) {
                let action = if from.is_adjacent(target_at) {
                    BehaviorAction::Wait
                } else {
                    self.step_toward(map, actor_id, from, target_at, &mover, now)
                };
                return Decision::new(BehaviorState::Chase, action).targeting(target_id);
            }
            return Decision::new(BehaviorState::Idle, BehaviorAction::Wait).targeting(target_id);
        }

        if let Some(point) = ai.current_patrol_point() {
            let mut decision = Decision::new(BehaviorState::Patrol, BehaviorAction::Wait);
            let goal = if from == point {
                decision.advance_patrol = true;
                let next = (ai.patrol_index + 1) % ai.patrol_points.len();
                ai.patrol_points.get(next).copied().unwrap_or(point)
            } else {
                point
            };
            decision.action = self.step_toward(map, actor_id, from, goal, &mover, now);
            return decision;
        }

        Decision::new(BehaviorState::Idle, self.wander(map, from, &mover))
    }
}

impl BehaviorPlanner for BehaviorService {
    fn plan_action(
        &mut self,
        actor_id: WorldObjectId,
        map: &mut PhysicalMap,
        contexts: &ActorContexts,
        now: WorldTick,
    ) -> SimResult<BehaviorAction> {
        let object = map
            .object(actor_id)
            .ok_or(DomainError::ObjectNotFound(actor_id))?
            .clone();
        let from = object.coordinate();

        match &object.component {
            ObjectComponent::Actor(actor) => {
                let Some(destination) = actor.destination else {
                    return Ok(BehaviorAction::Wait);
                };
                if destination == from {
                    if let Some(actor) = map
                        .component_mut(actor_id)
                        .and_then(ObjectComponent::as_actor_mut)
                    {
                        actor.destination = None;
                    }
                    return Ok(BehaviorAction::Wait);
                }
                Ok(self
                    .pathfinder
                    .next_step(map, actor_id, from, destination, &object.mover(), now)
                    .map_or(BehaviorAction::Wait, BehaviorAction::Move))
            }
            ObjectComponent::AutonomousBehavior(ai) => {
                let decision = self.decide(&object, ai, map, contexts, now);
                if let Some(component) = map
                    .component_mut(actor_id)
                    .and_then(ObjectComponent::as_autonomous_mut)
                {
                    component.state = decision.state;
                    component.target = decision.target;
                    if decision.advance_patrol {
                        component.advance_patrol();
                    }
                }
                Ok(decision.action)
            }
            ObjectComponent::Interactable(_) | ObjectComponent::Harvestable(_) => {
                Err(DomainError::NotAnActor(actor_id).into())
            }
        }
    }

    fn end_tick(&mut self, now: WorldTick) {
        self.pathfinder.cache_mut().evict_expired(now);
    }
}
