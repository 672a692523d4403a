use serde::{Deserialize, Serialize};

use crate::component::{
    ActiveTime, AggroMemoryPolicy, AutonomousBehaviorComponent, Disposition, ObjectComponent,
};
use crate::coordinate::Coordinate;
use crate::error::{DomainError, DomainResult};
use crate::event::WorldEvent;
use crate::ids::{MonsterId, MonsterTemplateId, SpotId, WorldObjectId};
use crate::object::{ObjectType, WorldObject};
use crate::terrain::MovementCapability;
use crate::tick::WorldTick;

/// Monster life-cycle state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MonsterStatus {
    /// On the map.
    #[default]
    Alive,
    /// Waiting to respawn.
    Dead,
}

/// When a dead monster comes back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RespawnInfo {
    /// Ticks between death and respawn.
    pub respawn_interval_ticks: u64,
    /// Whether the simulation respawns the monster on its own.
    pub is_auto_respawn: bool,
}

impl Default for RespawnInfo {
    fn default() -> Self {
        Self {
            respawn_interval_ticks: 100,
            is_auto_respawn: true,
        }
    }
}

/// Template-defined scaling reached after living for `after_ticks`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GrowthStage {
    /// Ticks since spawn at which the stage starts.
    pub after_ticks: u64,
    /// Multiplier applied to skill power.
    pub stat_multiplier: f64,
    /// Multiplier applied to the flee HP ratio.
    pub flee_threshold_multiplier: f64,
    /// Whether the monster may chase at this stage.
    pub can_chase: bool,
}

/// Shared definition of a kind of monster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonsterTemplate {
    /// Identifier.
    pub id: MonsterTemplateId,
    /// Display name.
    pub name: String,
    /// HP on spawn.
    pub max_hp: u32,
    /// MP on spawn.
    pub max_mp: u32,
    /// Vision range in cells.
    pub vision_range: u32,
    /// How it moves.
    pub capability: MovementCapability,
    /// When it is awake.
    pub active_time: ActiveTime,
    /// Whether it seeks players on sight.
    pub disposition: Disposition,
    /// Threat memory.
    pub aggro_policy: AggroMemoryPolicy,
    /// HP ratio at or below which it flees.
    pub flee_hp_ratio: f64,
    /// Respawn rules.
    pub respawn: RespawnInfo,
    /// Growth stages, in any order.
    pub growth_stages: Vec<GrowthStage>,
}

impl MonsterTemplate {
    /// A passive, always-active walker.
    pub fn new(id: MonsterTemplateId, name: impl Into<String>, max_hp: u32, max_mp: u32) -> Self {
        Self {
            id,
            name: name.into(),
            max_hp,
            max_mp,
            vision_range: 5,
            capability: MovementCapability::walker(),
            active_time: ActiveTime::Always,
            disposition: Disposition::Passive,
            aggro_policy: AggroMemoryPolicy::default(),
            flee_hp_ratio: 0.0,
            respawn: RespawnInfo::default(),
            growth_stages: Vec::new(),
        }
    }

    /// Set the disposition.
    pub fn with_disposition(mut self, disposition: Disposition) -> Self {
        self.disposition = disposition;
        self
    }

    /// Set the active time.
    pub fn with_active_time(mut self, active_time: ActiveTime) -> Self {
        self.active_time = active_time;
        self
    }

    /// Set the threat memory.
    pub fn with_aggro_policy(mut self, aggro_policy: AggroMemoryPolicy) -> Self {
        self.aggro_policy = aggro_policy;
        self
    }

    /// Set the respawn rules.
    pub fn with_respawn(mut self, respawn: RespawnInfo) -> Self {
        self.respawn = respawn;
        self
    }

    /// Add a growth stage.
    pub fn with_growth_stage(mut self, stage: GrowthStage) -> Self {
        self.growth_stages.push(stage);
        self
    }

    /// The latest stage reached after `ticks_since_spawn`.
    pub fn growth_stage_at(&self, ticks_since_spawn: u64) -> Option<&GrowthStage> {
        self.growth_stages
            .iter()
            .filter(|stage| stage.after_ticks <= ticks_since_spawn)
            .max_by_key(|stage| stage.after_ticks)
    }

    /// Fresh AI component for a monster of this kind.
    pub fn behavior_component(&self, patrol_points: Vec<Coordinate>) -> AutonomousBehaviorComponent {
        AutonomousBehaviorComponent {
            vision_range: self.vision_range,
            patrol_points,
            capability: self.capability,
            active_time: self.active_time,
            disposition: self.disposition,
            aggro_policy: self.aggro_policy,
            flee_hp_ratio: self.flee_hp_ratio,
            ..AutonomousBehaviorComponent::default()
        }
    }
}

/// A monster's life cycle, tied to a world object by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonsterAggregate {
    /// Identifier.
    pub id: MonsterId,
    /// World object representing the monster while alive.
    pub object_id: WorldObjectId,
    /// Kind of monster.
    pub template: MonsterTemplate,
    status: MonsterStatus,
    /// Map the monster belongs to.
    pub spot_id: SpotId,
    /// Last known cell.
    pub coordinate: Coordinate,
    /// Cell it respawns on.
    pub spawn_coordinate: Coordinate,
    hp: u32,
    mp: u32,
    spawned_at: WorldTick,
    death_tick: Option<WorldTick>,
    /// Patrol route handed to the AI component.
    pub patrol_points: Vec<Coordinate>,
}

impl MonsterAggregate {
    /// A living monster at full HP and MP.
    pub fn spawn(
        id: MonsterId,
        object_id: WorldObjectId,
        template: MonsterTemplate,
        spot_id: SpotId,
        at: Coordinate,
        now: WorldTick,
    ) -> Self {
        Self {
            id,
            object_id,
            hp: template.max_hp,
            mp: template.max_mp,
            template,
            status: MonsterStatus::Alive,
            spot_id,
            coordinate: at,
            spawn_coordinate: at,
            spawned_at: now,
            death_tick: None,
            patrol_points: Vec::new(),
        }
    }

    /// Set the patrol route.
    pub fn with_patrol(mut self, points: impl IntoIterator<Item = Coordinate>) -> Self {
        self.patrol_points = points.into_iter().collect();
        self
    }

    /// Current status.
    pub fn status(&self) -> MonsterStatus {
        self.status
    }

    /// Whether the monster is alive.
    pub fn is_alive(&self) -> bool {
        self.status == MonsterStatus::Alive
    }

    /// Current HP.
    pub fn hp(&self) -> u32 {
        self.hp
    }

    /// Current MP.
    pub fn mp(&self) -> u32 {
        self.mp
    }

    /// HP as a fraction of the maximum.
    pub fn hp_ratio(&self) -> f64 {
        if self.template.max_hp == 0 {
            return 0.0;
        }
        f64::from(self.hp) / f64::from(self.template.max_hp)
    }

    /// Tick of the last (re)spawn.
    pub fn spawned_at(&self) -> WorldTick {
        self.spawned_at
    }

    /// Tick of death while dead.
    pub fn death_tick(&self) -> Option<WorldTick> {
        self.death_tick
    }

    /// Ticks alive since the last (re)spawn.
    pub fn ticks_since_spawn(&self, now: WorldTick) -> u64 {
        now.since(self.spawned_at)
    }

    /// Lose HP. Lethal damage kills the monster and records the death tick.
    pub fn take_damage(&mut self, amount: u32, now: WorldTick) -> DomainResult<Vec<WorldEvent>> {
        if !self.is_alive() {
            return Err(DomainError::MonsterNotAlive(self.id));
        }
        let lost = amount.min(self.hp);
        self.hp -= lost;
        let mut events = vec![WorldEvent::MonsterDamaged {
            monster_id: self.id,
            amount: lost,
            remaining_hp: self.hp,
        }];
        if self.hp == 0 {
            self.status = MonsterStatus::Dead;
            self.death_tick = Some(now);
            events.push(WorldEvent::MonsterDied {
                monster_id: self.id,
                spot_id: self.spot_id,
                at: now,
            });
        }
        Ok(events)
    }

    /// Spend MP.
    pub fn consume_mp(&mut self, amount: u32) -> DomainResult<()> {
        if amount > self.mp {
            return Err(DomainError::InsufficientMp {
                required: amount,
                available: self.mp,
            });
        }
        self.mp -= amount;
        Ok(())
    }

    /// First tick a respawn is allowed, while dead.
    pub fn respawn_ready_at(&self) -> Option<WorldTick> {
        self.death_tick
            .map(|died| died.plus(self.template.respawn.respawn_interval_ticks))
    }

    /// Whether the simulation should respawn this monster at `now`.
    pub fn is_ready_to_respawn(&self, now: WorldTick) -> bool {
        self.status == MonsterStatus::Dead
            && self.template.respawn.is_auto_respawn
            && self.respawn_ready_at().is_some_and(|ready| ready <= now)
    }

    /// Bring the monster back at its spawn coordinate with full HP and MP.
    pub fn respawn(&mut self, now: WorldTick) -> DomainResult<Vec<WorldEvent>> {
        if !self.is_ready_to_respawn(now) {
            return Err(DomainError::RespawnNotReady {
                monster: self.id,
                ready_at: self.respawn_ready_at().unwrap_or(now),
            });
        }
        self.status = MonsterStatus::Alive;
        self.hp = self.template.max_hp;
        self.mp = self.template.max_mp;
        self.coordinate = self.spawn_coordinate;
        self.spawned_at = now;
        self.death_tick = None;
        Ok(vec![WorldEvent::MonsterRespawned {
            monster_id: self.id,
            spot_id: self.spot_id,
            at: self.spawn_coordinate,
        }])
    }

    /// The world object to place for this monster.
    pub fn to_world_object(&self) -> WorldObject {
        WorldObject::new(
            self.object_id,
            self.coordinate,
            ObjectType::Monster,
            ObjectComponent::AutonomousBehavior(
                self.template.behavior_component(self.patrol_points.clone()),
            ),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slime(interval: u64) -> MonsterAggregate {
        let template = MonsterTemplate::new(MonsterTemplateId::new(1), "Slime", 10, 4).with_respawn(
            RespawnInfo {
                respawn_interval_ticks: interval,
                is_auto_respawn: true,
            },
        );
        MonsterAggregate::spawn(
            MonsterId::new(1),
            WorldObjectId::new(10),
            template,
            SpotId::new(1),
            Coordinate::planar(2, 2),
            WorldTick::ZERO,
        )
    }

    #[test]
    fn lethal_damage_kills_and_records_death_tick() {
        let mut monster = slime(50);
        let events = monster.take_damage(4, WorldTick::new(90)).unwrap();
        assert_eq!(events.len(), 1);
        assert!(monster.is_alive());

        let events = monster.take_damage(20, WorldTick::new(100)).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(monster.status(), MonsterStatus::Dead);
        assert_eq!(monster.death_tick(), Some(WorldTick::new(100)));
        assert!(matches!(
            monster.take_damage(1, WorldTick::new(101)),
            Err(DomainError::MonsterNotAlive(_))
        ));
    }

    #[test]
    fn respawn_waits_for_the_interval() {
        let mut monster = slime(50);
        monster.coordinate = Coordinate::planar(4, 4);
        monster.take_damage(10, WorldTick::new(100)).unwrap();

        assert!(!monster.is_ready_to_respawn(WorldTick::new(149)));
        assert!(monster.respawn(WorldTick::new(149)).is_err());
        assert!(monster.is_ready_to_respawn(WorldTick::new(150)));

        monster.respawn(WorldTick::new(150)).unwrap();
        assert!(monster.is_alive());
        assert_eq!(monster.coordinate, Coordinate::planar(2, 2));
        assert_eq!(monster.hp(), 10);
        assert_eq!(monster.ticks_since_spawn(WorldTick::new(160)), 10);
    }

    #[test]
    fn manual_respawn_templates_stay_dead() {
        let mut monster = slime(0);
        monster.template.respawn.is_auto_respawn = false;
        monster.take_damage(10, WorldTick::new(5)).unwrap();
        assert!(!monster.is_ready_to_respawn(WorldTick::new(500)));
    }

    #[test]
    fn growth_stage_is_the_latest_reached() {
        let stage = |after_ticks, stat_multiplier| GrowthStage {
            after_ticks,
            stat_multiplier,
            flee_threshold_multiplier: 1.0,
            can_chase: true,
        };
        let template = MonsterTemplate::new(MonsterTemplateId::new(1), "Wolf", 10, 0)
            .with_growth_stage(stage(100, 2.0))
            .with_growth_stage(stage(0, 1.0));
        assert_eq!(template.growth_stage_at(50).map(|s| s.after_ticks), Some(0));
        assert_eq!(template.growth_stage_at(100).map(|s| s.after_ticks), Some(100));

        let bare = MonsterTemplate::new(MonsterTemplateId::new(2), "Bat", 5, 0);
        assert!(bare.growth_stage_at(1_000).is_none());
    }

    #[test]
    fn world_object_carries_template_behavior() {
        let mut monster = slime(50);
        monster.template.disposition = Disposition::Aggressive;
        let object = monster.to_world_object();
        assert_eq!(object.id, WorldObjectId::new(10));
        assert_eq!(object.object_type, ObjectType::Monster);
        let ai = object.component.as_autonomous().unwrap();
        assert_eq!(ai.disposition, Disposition::Aggressive);
    }
}
