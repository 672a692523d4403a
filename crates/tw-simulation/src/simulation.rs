use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use tw_core::{
    AggroMemoryPolicy, DomainError, MonsterAggregate, ObjectComponent, PhysicalMap, SpotId,
    WorldEvent, WorldObjectId, WorldTick,
};

use crate::aggro::AggroStore;
use crate::behavior::{
    ActorContexts, BehaviorAction, BehaviorPlanner, BehaviorService, GrowthContext, SkillContext,
    TargetContext,
};
use crate::clock::{SimClock, TimeOfDay, TimeProvider};
use crate::config::{
    AggroConfigService, HitBoxConfigService, SimConfig, WorldTimeConfigService,
};
use crate::error::{SimError, SimResult};
use crate::event::{EventPublisher, InMemoryEventPublisher};
use crate::hitbox::{CollisionGuard, HitBoxCollisionEngine, TargetHit};
use crate::repository::{
    HitBoxRepository, MonsterRepository, PhysicalMapRepository, PlayerStatusRepository,
    Repository, SkillLoadoutRepository, TickTransaction, UnitOfWork, WeatherZoneRepository,
};
use crate::weather::WeatherSimulationService;

/// Repository ports the simulation reads from and writes to.
#[derive(Clone)]
pub struct SimulationPorts {
    /// Physical maps.
    pub maps: Arc<dyn PhysicalMapRepository>,
    /// Weather zones.
    pub weather_zones: Arc<dyn WeatherZoneRepository>,
    /// Player status.
    pub players: Arc<dyn PlayerStatusRepository>,
    /// Hitboxes.
    pub hit_boxes: Arc<dyn HitBoxRepository>,
    /// Monsters.
    pub monsters: Arc<dyn MonsterRepository>,
    /// Skill loadouts.
    pub loadouts: Arc<dyn SkillLoadoutRepository>,
}

impl fmt::Debug for SimulationPorts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulationPorts").finish_non_exhaustive()
    }
}

/// Summary of one completed tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// The tick this report covers.
    pub tick: WorldTick,
    /// Spots with at least one player.
    pub active_spots: usize,
    /// Spots skipped this tick.
    pub inactive_spots: usize,
    /// Actors handed to the planner.
    pub planned_actors: usize,
    /// Actors whose planning or action failed with a domain error.
    pub failed_actors: usize,
    /// Hitboxes stepped without error.
    pub hit_boxes_advanced: usize,
    /// Hitboxes whose step failed with a domain error.
    pub failed_hit_boxes: usize,
    /// Monsters brought back this tick.
    pub respawned: usize,
    /// Published events, deduplicated.
    pub events: Vec<WorldEvent>,
}

/// Objects that moved this tick, per spot.
type MovedObjects = HashMap<SpotId, HashSet<WorldObjectId>>;

/// The tick orchestrator.
///
/// Owns the clock, planner, weather roller, optional aggro store and event
/// publisher. World state lives behind the repository ports and is loaded,
/// mutated and saved back every tick.
pub struct WorldSimulation {
    clock: Box<dyn TimeProvider>,
    config: SimConfig,
    ports: SimulationPorts,
    planner: Box<dyn BehaviorPlanner>,
    weather: WeatherSimulationService,
    engine: HitBoxCollisionEngine,
    aggro: Option<AggroStore>,
    publisher: Box<dyn EventPublisher>,
}

impl fmt::Debug for WorldSimulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorldSimulation")
            .field("tick", &self.clock.current_tick())
            .field("aggro_entries", &self.aggro.as_ref().map(AggroStore::len))
            .field("pending_events", &self.publisher.pending_len())
            .finish()
    }
}

impl WorldSimulation {
    /// Create a simulation at tick zero with the default planner, an aggro
    /// store and an in-memory publisher.
    pub fn new(ports: SimulationPorts, config: SimConfig) -> Self {
        Self {
            clock: Box::new(SimClock::new()),
            planner: Box::new(BehaviorService::new(&config.behavior, config.seed)),
            weather: WeatherSimulationService::new(config.seed.wrapping_add(1)),
            engine: HitBoxCollisionEngine::new(),
            aggro: Some(AggroStore::new()),
            publisher: Box::new(InMemoryEventPublisher::new(config.max_events)),
            config,
            ports,
        }
    }

    /// Replace the clock.
    pub fn with_time_provider(mut self, clock: impl TimeProvider + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Replace the planner.
    pub fn with_planner(mut self, planner: impl BehaviorPlanner + 'static) -> Self {
        self.planner = Box::new(planner);
        self
    }

    /// Replace the event publisher.
    pub fn with_publisher(mut self, publisher: impl EventPublisher + 'static) -> Self {
        self.publisher = Box::new(publisher);
        self
    }

    /// Run without threat tracking. Planners then get no target context.
    pub fn without_aggro_store(mut self) -> Self {
        self.aggro = None;
        self
    }

    /// The last tick started.
    pub fn current_tick(&self) -> WorldTick {
        self.clock.current_tick()
    }

    /// Configuration in effect.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Threat tables, unless running without them.
    pub fn aggro_store(&self) -> Option<&AggroStore> {
        self.aggro.as_ref()
    }

    /// Mutable threat tables, for seeding threat from outside the tick.
    pub fn aggro_store_mut(&mut self) -> Option<&mut AggroStore> {
        self.aggro.as_mut()
    }

    /// Advance the world by one tick.
    ///
    /// Every write of the tick is staged and reaches the stores only after
    /// the last step succeeded. Domain errors that reach this boundary come
    /// back as application errors; repository failures come back as system
    /// errors. Either way the staged writes, the pending events and the
    /// tick's threat changes are dropped.
    pub fn tick(&mut self) -> SimResult<TickReport> {
        let tick = self.clock.advance_tick(1);
        debug!(tick = tick.value(), "tick started");

        let transaction = TickTransaction::begin(&self.ports);
        let live = std::mem::replace(&mut self.ports, transaction.ports());
        let aggro_before = self.aggro.clone();
        let outcome = self.run_tick(tick);
        self.ports = live;

        let outcome = outcome.and_then(|report| {
            let written = transaction.commit()?;
            debug!(tick = tick.value(), written, "tick committed");
            Ok(report)
        });
        match outcome {
            Ok(mut report) => {
                report.events = self.publisher.flush(tick);
                info!(
                    tick = tick.value(),
                    active_spots = report.active_spots,
                    planned = report.planned_actors,
                    events = report.events.len(),
                    "tick complete"
                );
                Ok(report)
            }
            Err(err) => {
                self.publisher.discard();
                self.aggro = aggro_before;
                let err = err.into_tick_failure(tick);
                error!(tick = tick.value(), %err, "tick aborted");
                Err(err)
            }
        }
    }

    /// Advance the world by `n` ticks, stopping at the first failure.
    pub fn run(&mut self, n: u64) -> SimResult<Vec<TickReport>> {
        (0..n).map(|_| self.tick()).collect()
    }

    fn run_tick(&mut self, tick: WorldTick) -> SimResult<TickReport> {
        let mut report = TickReport {
            tick,
            ..TickReport::default()
        };

        let maps = self.ports.maps.find_all()?;
        self.sweep_aggro(&maps, tick);
        let (mut active, inactive): (Vec<PhysicalMap>, Vec<PhysicalMap>) =
            maps.into_iter().partition(PhysicalMap::has_players);
        report.active_spots = active.len();
        report.inactive_spots = inactive.len();

        let mut moved = MovedObjects::new();
        for map in &mut active {
            let spot_moved = self.process_actors(map, tick, &mut report)?;
            moved.insert(map.spot_id(), spot_moved);
        }
        self.planner.end_tick(tick);
        for map in &active {
            self.ports.maps.save(map)?;
        }

        let mut guard = CollisionGuard::new(self.config.hit_box.max_collision_checks_per_tick());
        for map in &mut active {
            self.advance_hit_boxes(map, tick, &mut guard, &mut report)?;
        }

        self.update_weather(&mut active, tick)?;
        self.apply_environment(&active, &moved)?;
        self.respawn_monsters(&mut active, tick, &mut report)?;
        Ok(report)
    }

    /// Forget stale threat on every spot, active or not, on sweep ticks.
    fn sweep_aggro(&mut self, maps: &[PhysicalMap], tick: WorldTick) {
        let interval = self.config.aggro.sweep_interval_ticks();
        if interval == 0 || tick.value() % interval != 0 {
            return;
        }
        let fallback = self.config.aggro.fallback_policy();
        let Some(store) = self.aggro.as_mut() else {
            return;
        };
        let policies: HashMap<(SpotId, WorldObjectId), AggroMemoryPolicy> = maps
            .iter()
            .flat_map(|map| {
                map.objects().filter_map(move |object| {
                    object
                        .component
                        .as_autonomous()
                        .map(|ai| ((map.spot_id(), object.id), ai.aggro_policy))
                })
            })
            .collect();
        let forgotten = store.sweep(
            tick,
            |spot, defender| policies.get(&(spot, defender)).copied(),
            &fallback,
        );
        if forgotten > 0 {
            debug!(tick = tick.value(), forgotten, "stale threat swept");
        }
    }

    // -----------------------------------------------------------------------
    // Actors
    // -----------------------------------------------------------------------

    /// Plan and execute every ready actor of one spot, nearest to a player first.
    fn process_actors(
        &mut self,
        map: &mut PhysicalMap,
        tick: WorldTick,
        report: &mut TickReport,
    ) -> SimResult<HashSet<WorldObjectId>> {
        let time_of_day = TimeOfDay::at(tick, self.config.world_time.ticks_per_day());
        let mut order: Vec<(f64, WorldObjectId)> = map
            .objects()
            .filter(|object| object.component.is_schedulable() && !object.is_busy(tick))
            .filter(|object| {
                object
                    .component
                    .as_autonomous()
                    .is_none_or(|ai| time_of_day.allows(ai.active_time))
            })
            .map(|object| {
                let distance = map
                    .distance_to_nearest_player(object.coordinate())
                    .unwrap_or(f64::INFINITY);
                (distance, object.id)
            })
            .collect();
        order.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        let mut moved = HashSet::new();
        for (_, actor_id) in order {
            report.planned_actors += 1;
            match self.plan_and_execute(map, actor_id, tick, &mut moved) {
                Ok(()) => {}
                Err(SimError::Domain(err)) => {
                    report.failed_actors += 1;
                    warn!(
                        tick = tick.value(),
                        spot = %map.spot_id(),
                        actor = %actor_id,
                        %err,
                        "actor action failed"
                    );
                }
                Err(err) => return Err(err),
            }
        }
        Ok(moved)
    }

    fn plan_and_execute(
        &mut self,
        map: &mut PhysicalMap,
        actor_id: WorldObjectId,
        tick: WorldTick,
        moved: &mut HashSet<WorldObjectId>,
    ) -> SimResult<()> {
        let policy = map
            .object(actor_id)
            .and_then(|object| object.component.as_autonomous())
            .map(|ai| ai.aggro_policy);
        if let (Some(store), Some(policy)) = (self.aggro.as_mut(), policy) {
            store.forget_stale(map.spot_id(), actor_id, &policy, tick);
        }

        let contexts = self.build_contexts(map, actor_id, tick)?;
        let action = self.planner.plan_action(actor_id, map, &contexts, tick)?;
        self.execute(map, actor_id, action, tick, moved)
    }

    fn build_contexts(
        &self,
        map: &PhysicalMap,
        actor_id: WorldObjectId,
        tick: WorldTick,
    ) -> SimResult<ActorContexts> {
        let object = map
            .object(actor_id)
            .ok_or(DomainError::ObjectNotFound(actor_id))?;
        let ai = object.component.as_autonomous();

        let monster = match ai {
            Some(_) => self.ports.monsters.find_by_object_id(actor_id)?,
            None => None,
        };
        let player = match object.player_id() {
            Some(player_id) => self.ports.players.find_by_id(player_id)?,
            None => None,
        };
        let current_mp = monster
            .as_ref()
            .map(MonsterAggregate::mp)
            .or_else(|| player.as_ref().map(|status| status.mp()))
            .unwrap_or(0);

        let skill = self
            .ports
            .loadouts
            .find_by_id(actor_id)?
            .map(|loadout| SkillContext::from_loadout(&loadout, current_mp, tick));
        let target = match (&self.aggro, ai) {
            (Some(store), Some(ai)) => Some(TargetContext {
                threats: store.threat_table(map.spot_id(), actor_id, &ai.aggro_policy, tick),
            }),
            _ => None,
        };

        Ok(ActorContexts {
            skill,
            target,
            growth: monster
                .as_ref()
                .and_then(|monster| GrowthContext::from_monster(monster, tick)),
            hp_ratio: monster.as_ref().map(MonsterAggregate::hp_ratio),
        })
    }

    fn execute(
        &mut self,
        map: &mut PhysicalMap,
        actor_id: WorldObjectId,
        action: BehaviorAction,
        tick: WorldTick,
        moved: &mut HashSet<WorldObjectId>,
    ) -> SimResult<()> {
        match action {
            BehaviorAction::Wait => Ok(()),
            BehaviorAction::Move(to) => {
                let capability = map
                    .object(actor_id)
                    .ok_or(DomainError::ObjectNotFound(actor_id))?
                    .capability();
                let events = map.move_object(actor_id, to, &capability, tick)?;
                moved.insert(actor_id);
                if let Some(actor) = map
                    .component_mut(actor_id)
                    .and_then(ObjectComponent::as_actor_mut)
                {
                    if actor.destination == Some(to) {
                        actor.destination = None;
                    }
                }
                self.publisher.record(events);
                Ok(())
            }
            BehaviorAction::UseSkill {
                slot_index: None, ..
            } => Err(SimError::application(format!(
                "{actor_id} planned a skill use without a slot index"
            ))),
            BehaviorAction::UseSkill {
                slot_index: Some(slot_index),
                target,
            } => self.use_skill(map, actor_id, slot_index, target, tick),
        }
    }

    /// Turn toward the target, pay the MP, start the cooldown and spawn the hitbox.
    fn use_skill(
        &mut self,
        map: &mut PhysicalMap,
        actor_id: WorldObjectId,
        slot_index: usize,
        target: Option<WorldObjectId>,
        tick: WorldTick,
    ) -> SimResult<()> {
        let mut loadout = self.ports.loadouts.find_by_id(actor_id)?.ok_or(
            DomainError::SkillSlotNotFound {
                owner: actor_id,
                slot: slot_index,
            },
        )?;
        let skill = loadout.ready_skill(slot_index, tick)?.clone();

        let actor = map
            .object(actor_id)
            .ok_or(DomainError::ObjectNotFound(actor_id))?;
        let origin = actor.coordinate();
        let player_id = actor.player_id();
        let facing = target
            .and_then(|target| map.object(target))
            .and_then(|target| origin.direction_to(target.coordinate()))
            .unwrap_or(actor.direction);

        let mut power_multiplier = 1.0;
        if let Some(mut monster) = self.ports.monsters.find_by_object_id(actor_id)? {
            monster.consume_mp(skill.mp_cost)?;
            power_multiplier = GrowthContext::from_monster(&monster, tick)
                .map_or(1.0, |growth| growth.stage.stat_multiplier);
            self.ports.monsters.save(&monster)?;
        } else if let Some(player_id) = player_id {
            if let Some(mut status) = self.ports.players.find_by_id(player_id)? {
                status.consume_mp(skill.mp_cost)?;
                self.ports.players.save(&status)?;
            }
        }

        map.set_direction(actor_id, facing)?;
        let hit_box =
            skill.spawn_hit_box(actor_id, map.spot_id(), origin, facing, tick, power_multiplier);
        loadout.mark_used(slot_index, tick)?;
        self.ports.loadouts.save(&loadout)?;
        self.ports.hit_boxes.save(&hit_box)?;
        map.set_busy_until(actor_id, tick.plus(skill.cast_ticks))?;

        self.publisher.record(vec![
            WorldEvent::SkillUsed {
                spot_id: map.spot_id(),
                actor_id,
                skill_id: skill.id,
                slot_index,
            },
            WorldEvent::HitBoxSpawned {
                spot_id: map.spot_id(),
                hit_box_id: hit_box.id,
                owner_id: actor_id,
                at: hit_box.current_coordinate(),
            },
        ]);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Hitboxes
    // -----------------------------------------------------------------------

    fn advance_hit_boxes(
        &mut self,
        map: &mut PhysicalMap,
        tick: WorldTick,
        guard: &mut CollisionGuard,
        report: &mut TickReport,
    ) -> SimResult<()> {
        let repository = Arc::clone(&self.ports.hit_boxes);
        let mut unit = UnitOfWork::new(&*repository);
        let mut map_changed = false;

        for mut hit_box in repository.find_active_by_spot_id(map.spot_id())? {
            let outcome =
                match self
                    .engine
                    .advance(&mut hit_box, map, tick, &self.config.hit_box, guard)
                {
                    Ok(outcome) => outcome,
                    Err(err) => {
                        report.failed_hit_boxes += 1;
                        warn!(tick = tick.value(), hit_box = %hit_box.id, %err, "hitbox step failed");
                        continue;
                    }
                };
            report.hit_boxes_advanced += 1;
            self.publisher.record(outcome.events);

            for hit in outcome.hits {
                match self.resolve_hit(map, hit, tick) {
                    Ok(removed) => map_changed |= removed,
                    Err(SimError::Domain(err)) => {
                        warn!(
                            tick = tick.value(),
                            hit_box = %hit.hit_box_id,
                            target = %hit.target_id,
                            %err,
                            "hit could not be applied"
                        );
                    }
                    Err(err) => return Err(err),
                }
            }

            if hit_box.is_active() {
                unit.register(&hit_box);
            } else {
                unit.register_delete(hit_box.id);
            }
        }

        unit.commit()?;
        if map_changed {
            self.ports.maps.save(map)?;
        }
        Ok(())
    }

    /// Apply a hit's power to the target's player or monster record.
    ///
    /// Returns whether the target died and left the map. The caller saves the map.
    fn resolve_hit(
        &mut self,
        map: &mut PhysicalMap,
        hit: TargetHit,
        tick: WorldTick,
    ) -> SimResult<bool> {
        let Some(target) = map.object(hit.target_id) else {
            warn!(target = %hit.target_id, "hit target is no longer on the map");
            return Ok(false);
        };
        let target_at = target.coordinate();
        let target_player = target.player_id();

        if let Some(store) = self.aggro.as_mut() {
            store.add_aggro(hit.spot_id, hit.target_id, hit.owner_id, u64::from(hit.power), tick);
        }

        if let Some(player_id) = target_player {
            let Some(mut status) = self.ports.players.find_by_id(player_id)? else {
                warn!(player = %player_id, "hit player has no status record");
                return Ok(false);
            };
            let event = status.take_damage(hit.power);
            self.ports.players.save(&status)?;
            self.publisher.record(vec![event]);
            return Ok(false);
        }

        let Some(mut monster) = self.ports.monsters.find_by_object_id(hit.target_id)? else {
            warn!(target = %hit.target_id, "hit target has no monster record");
            return Ok(false);
        };
        let events = monster.take_damage(hit.power, tick)?;
        let died = !monster.is_alive();
        if died {
            monster.coordinate = target_at;
            let (_, removed) = map.remove_object(hit.target_id)?;
            if let Some(store) = self.aggro.as_mut() {
                store.clear_object(map.spot_id(), hit.target_id);
            }
            self.publisher.record(removed);
            info!(tick = tick.value(), monster = %monster.id, spot = %map.spot_id(), "monster died");
        }
        self.ports.monsters.save(&monster)?;
        self.publisher.record(events);
        Ok(died)
    }

    // -----------------------------------------------------------------------
    // Environment
    // -----------------------------------------------------------------------

    /// Roll zones covering an active spot, then push the resolved weather onto active maps.
    fn update_weather(&mut self, maps: &mut [PhysicalMap], tick: WorldTick) -> SimResult<()> {
        for mut zone in self.ports.weather_zones.find_all()? {
            if !maps.iter().any(|map| zone.covers(map.spot_id())) {
                continue;
            }
            if let Some(update) = self.weather.update_zone(&mut zone, tick, &self.config.weather) {
                self.ports.weather_zones.save(&zone)?;
                if let Some(event) = update.event {
                    debug!(tick = tick.value(), zone = %zone.id, weather = %update.state.weather_type, "weather changed");
                    self.publisher.record(vec![event]);
                }
            }
        }

        for map in maps.iter_mut() {
            let zone = self.ports.weather_zones.find_by_spot_id(map.spot_id())?;
            if map.set_weather(WeatherSimulationService::resolve_for_spot(zone.as_ref())) {
                self.ports.maps.save(map)?;
            }
        }
        Ok(())
    }

    /// Weather stamina drain for players, then continuous area triggers.
    fn apply_environment(&mut self, maps: &[PhysicalMap], moved: &MovedObjects) -> SimResult<()> {
        let nobody = HashSet::new();
        for map in maps {
            let drain = map.weather().stamina_drain();
            if drain > 0 {
                for player_id in map.player_objects().filter_map(|object| object.player_id()) {
                    let Some(mut status) = self.ports.players.find_by_id(player_id)? else {
                        warn!(player = %player_id, spot = %map.spot_id(), "no status record, skipping weather effects");
                        continue;
                    };
                    if !status.can_act() {
                        continue;
                    }
                    let amount = status.drain_stamina(drain);
                    if amount == 0 {
                        continue;
                    }
                    self.ports.players.save(&status)?;
                    self.publisher.record(vec![WorldEvent::StaminaDrained {
                        player_id,
                        amount,
                        remaining: status.stamina(),
                    }]);
                }
            }

            let moved_here = moved.get(&map.spot_id()).unwrap_or(&nobody);
            self.publisher
                .record(map.continuous_trigger_events(moved_here));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Respawn
    // -----------------------------------------------------------------------

    /// Bring back dead monsters whose respawn interval elapsed.
    ///
    /// A monster whose spawn cell is taken stays dead and is retried next tick.
    fn respawn_monsters(
        &mut self,
        maps: &mut [PhysicalMap],
        tick: WorldTick,
        report: &mut TickReport,
    ) -> SimResult<()> {
        for map in maps.iter_mut() {
            let mut changed = false;
            for monster in self.ports.monsters.find_by_spot_id(map.spot_id())? {
                if !monster.is_ready_to_respawn(tick) {
                    continue;
                }
                let mut revived = monster.clone();
                let mut events = revived.respawn(tick)?;
                match map.add_object(revived.to_world_object()) {
                    Ok(added) => events.extend(added),
                    Err(err) => {
                        warn!(
                            tick = tick.value(),
                            monster = %monster.id,
                            at = %monster.spawn_coordinate,
                            %err,
                            "respawn deferred"
                        );
                        continue;
                    }
                }
                self.ports.monsters.save(&revived)?;
                self.publisher.record(events);
                report.respawned += 1;
                changed = true;
                info!(tick = tick.value(), monster = %revived.id, spot = %map.spot_id(), "monster respawned");
            }
            if changed {
                self.ports.maps.save(map)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryRepositories;
    use tw_core::{
        ActorComponent, AreaId, AreaTrigger, Area, CollisionPolicy, Coordinate, HitBox,
        HitBoxShape, MonsterId, MonsterTemplate, MonsterTemplateId, ObjectType, PlayerId,
        PlayerStatus, SkillDefinition, SkillId, SkillLoadout, TerrainType, TriggerEffect,
        Velocity, WorldObject,
    };

    const SPOT: SpotId = SpotId::new(1);
    const HERO: WorldObjectId = WorldObjectId::new(1);

    fn hero(at: Coordinate) -> WorldObject {
        WorldObject::new(
            HERO,
            at,
            ObjectType::Player,
            ObjectComponent::Actor(ActorComponent::player(PlayerId::new(1))),
        )
    }

    fn world() -> (InMemoryRepositories, PhysicalMap) {
        let repos = InMemoryRepositories::new();
        let mut map = PhysicalMap::filled(SPOT, "Glade", 8, 8, TerrainType::Grass);
        map.add_object(hero(Coordinate::planar(1, 1))).unwrap();
        repos.players.save(&PlayerStatus::new(PlayerId::new(1), 20, 10, 100)).unwrap();
        (repos, map)
    }

    fn simulation(repos: &InMemoryRepositories) -> WorldSimulation {
        WorldSimulation::new(repos.ports(), SimConfig::default().with_wander_chance(0.0))
    }

    #[test]
    fn player_skill_spawns_a_hitbox_and_starts_cooldown() {
        let (repos, mut map) = world();
        let skill = SkillDefinition::new(SkillId::new(1), "Slash")
            .with_mp_cost(3)
            .with_cooldown(5);
        repos.loadouts.save(&SkillLoadout::new(HERO, [skill])).unwrap();

        let mut sim = simulation(&repos);
        sim.use_skill(&mut map, HERO, 0, None, WorldTick::new(1)).unwrap();

        assert_eq!(repos.hit_boxes.len().unwrap(), 1);
        let status = repos.players.find_by_id(PlayerId::new(1)).unwrap().unwrap();
        assert_eq!(status.mp(), 7);
        let loadout = repos.loadouts.find_by_id(HERO).unwrap().unwrap();
        assert_eq!(loadout.slot(0).unwrap().ready_at, WorldTick::new(6));
        assert_eq!(map.object(HERO).unwrap().busy_until, WorldTick::new(2));
    }

    #[test]
    fn lethal_hit_removes_the_monster_and_records_death() {
        let (repos, mut map) = world();
        let template = MonsterTemplate::new(MonsterTemplateId::new(1), "Slime", 3, 0);
        let slime = MonsterAggregate::spawn(
            MonsterId::new(1),
            WorldObjectId::new(50),
            template,
            SPOT,
            Coordinate::planar(3, 3),
            WorldTick::ZERO,
        );
        map.add_object(slime.to_world_object()).unwrap();
        repos.monsters.save(&slime).unwrap();
        repos.maps.save(&map).unwrap();

        let mut sim = simulation(&repos);
        let hit = TargetHit {
            hit_box_id: tw_core::HitBoxId::generate(),
            spot_id: SPOT,
            owner_id: HERO,
            target_id: WorldObjectId::new(50),
            power: 5,
        };
        assert!(sim.resolve_hit(&mut map, hit, WorldTick::new(4)).unwrap());

        assert!(!map.contains_object(WorldObjectId::new(50)));
        let stored = repos.monsters.find_by_id(MonsterId::new(1)).unwrap().unwrap();
        assert!(!stored.is_alive());
        assert_eq!(stored.death_tick(), Some(WorldTick::new(4)));
        assert!(sim.aggro_store().unwrap().is_empty());
    }

    #[test]
    fn two_deaths_from_one_hitbox_save_the_map_once() {
        let (repos, mut map) = world();
        let template = MonsterTemplate::new(MonsterTemplateId::new(1), "Slime", 3, 0);
        for (id, y) in [(1, 1), (2, 2)] {
            let slime = MonsterAggregate::spawn(
                MonsterId::new(id),
                WorldObjectId::new(50 + id),
                template.clone(),
                SPOT,
                Coordinate::planar(3, y),
                WorldTick::ZERO,
            );
            map.add_object(slime.to_world_object()).unwrap();
            repos.monsters.save(&slime).unwrap();
        }
        repos.maps.save(&map).unwrap();
        let aura = HitBox::new(
            SPOT,
            HERO,
            Coordinate::planar(1, 1),
            Velocity::new(1.0, 0.0, 0.0),
            WorldTick::new(1),
            10,
        )
        .with_shape(HitBoxShape::Square { radius: 2 })
        .with_power(5)
        .with_policies(CollisionPolicy::PassThrough, CollisionPolicy::PassThrough);
        repos.hit_boxes.save(&aura).unwrap();

        let mut sim = simulation(&repos);
        let mut guard = CollisionGuard::new(sim.config().hit_box.max_collision_checks_per_tick());
        let mut report = TickReport::default();
        sim.advance_hit_boxes(&mut map, WorldTick::new(1), &mut guard, &mut report)
            .unwrap();

        assert!(!map.contains_object(WorldObjectId::new(51)));
        assert!(!map.contains_object(WorldObjectId::new(52)));
        assert_eq!(repos.maps.version_of(SPOT).unwrap(), Some(2));
    }

    #[test]
    fn hits_on_survivors_build_threat() {
        let (repos, mut map) = world();
        let template = MonsterTemplate::new(MonsterTemplateId::new(1), "Golem", 50, 0);
        let golem = MonsterAggregate::spawn(
            MonsterId::new(2),
            WorldObjectId::new(60),
            template,
            SPOT,
            Coordinate::planar(4, 4),
            WorldTick::ZERO,
        );
        map.add_object(golem.to_world_object()).unwrap();
        repos.monsters.save(&golem).unwrap();

        let mut sim = simulation(&repos);
        let hit = TargetHit {
            hit_box_id: tw_core::HitBoxId::generate(),
            spot_id: SPOT,
            owner_id: HERO,
            target_id: WorldObjectId::new(60),
            power: 5,
        };
        assert!(!sim.resolve_hit(&mut map, hit, WorldTick::new(2)).unwrap());
        let table = sim.aggro_store().unwrap().threat_table(
            SPOT,
            WorldObjectId::new(60),
            &tw_core::AggroMemoryPolicy::default(),
            WorldTick::new(2),
        );
        assert_eq!(table.len(), 1);
        assert_eq!(table[0].attacker, HERO);
        assert_eq!(table[0].threat, 5);
    }

    #[test]
    fn continuous_triggers_fire_for_idle_objects() {
        let (repos, mut map) = world();
        map.add_area_trigger(AreaTrigger {
            id: AreaId::new(1),
            name: "Campfire".into(),
            area: Area::rect(Coordinate::planar(0, 0), Coordinate::planar(2, 2)),
            effect: TriggerEffect::Heal { amount: 1 },
        });
        repos.maps.save(&map).unwrap();

        let mut sim = simulation(&repos);
        let report = sim.tick().unwrap();
        assert!(report
            .events
            .iter()
            .any(|e| matches!(e, WorldEvent::AreaTriggered { object_id, .. } if *object_id == HERO)));
    }

    #[test]
    fn debug_output_mentions_the_tick() {
        let (repos, map) = world();
        repos.maps.save(&map).unwrap();
        let mut sim = simulation(&repos);
        sim.tick().unwrap();
        assert!(format!("{sim:?}").contains("tick"));
    }
}
