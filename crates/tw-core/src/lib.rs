//! Core types for Tileworld: the spatial model and the aggregates the
//! simulation drives each tick.
//!
//! This crate owns the data model only. [`PhysicalMap`] is the spatial truth
//! for one spot, [`HitBox`] is an independently moving collision volume and
//! [`MonsterAggregate`] tracks a monster's life cycle. Aggregates reference
//! each other by id, never by embedding. Every mutating call returns the
//! [`WorldEvent`]s it produced so callers decide when to publish them.

/// Generational arena backing the map's object index.
pub mod arena;
/// Named regions: area triggers, location areas and gateways.
pub mod area;
/// Polymorphic object components (actor, autonomous, interactable, harvestable).
pub mod component;
/// Coordinates and facing directions.
pub mod coordinate;
/// Domain error types.
pub mod error;
/// Domain events emitted by aggregate mutations.
pub mod event;
/// The hitbox aggregate.
pub mod hitbox;
/// Identifier newtypes.
pub mod ids;
/// The physical map aggregate.
pub mod map;
/// Monster templates and the monster aggregate.
pub mod monster;
/// World objects placed on a map.
pub mod object;
/// Player status aggregate (HP, MP, stamina).
pub mod player;
/// Skills, loadouts and skill-to-hitbox translation.
pub mod skill;
/// Terrain types and movement capabilities.
pub mod terrain;
/// The world tick counter.
pub mod tick;
/// Map tiles.
pub mod tile;
/// Weather states and weather zones.
pub mod weather;

pub use area::{Area, AreaTrigger, Gateway, LocationArea, TriggerEffect};
pub use component::{
    ActiveTime, ActorComponent, AggroMemoryPolicy, AutonomousBehaviorComponent, BehaviorState,
    Disposition, HarvestState, HarvestableComponent, InteractableComponent, ObjectComponent,
};
pub use coordinate::{Coordinate, Direction};
pub use error::{DomainError, DomainResult};
pub use event::{DeactivationReason, WorldEvent};
pub use hitbox::{CollisionPolicy, HitBox, HitBoxShape, HitBoxStatus, PrecisePosition, Velocity};
pub use ids::{
    AreaId, HitBoxId, MonsterId, MonsterTemplateId, PlayerId, SkillId, SpotId, WeatherZoneId,
    WorldObjectId,
};
pub use map::PhysicalMap;
pub use monster::{GrowthStage, MonsterAggregate, MonsterStatus, MonsterTemplate, RespawnInfo};
pub use object::{Mover, ObjectType, WorldObject};
pub use player::PlayerStatus;
pub use skill::{HitBoxTemplate, MonsterSkillInfo, SkillDefinition, SkillLoadout, SkillSlot};
pub use terrain::{MovementCapability, TerrainType};
pub use tick::WorldTick;
pub use tile::Tile;
pub use weather::{WeatherState, WeatherType, WeatherZone};
