//! Repository ports.
//!
//! The simulation depends on these traits, never on a concrete store. Every
//! read returns an independent copy: mutating it does not touch stored state
//! until it is saved again.

mod memory;
mod staged;
mod unit_of_work;

pub use memory::{InMemoryRepositories, InMemoryStore};
pub use staged::{StagedRepository, TickTransaction};
pub use unit_of_work::UnitOfWork;

use tw_core::{
    HitBox, HitBoxId, MonsterAggregate, MonsterId, PhysicalMap, PlayerId, PlayerStatus,
    SkillLoadout, SpotId, WeatherZone, WeatherZoneId, WorldObjectId,
};

use crate::error::RepositoryResult;

/// Aggregates that know their own storage key.
pub trait Keyed {
    /// Key type.
    type Key: Copy + Ord + std::fmt::Debug + Send + Sync;

    /// This aggregate's key.
    fn key(&self) -> Self::Key;
}

impl Keyed for PhysicalMap {
    type Key = SpotId;
    fn key(&self) -> SpotId {
        self.spot_id()
    }
}

impl Keyed for WeatherZone {
    type Key = WeatherZoneId;
    fn key(&self) -> WeatherZoneId {
        self.id
    }
}

impl Keyed for PlayerStatus {
    type Key = PlayerId;
    fn key(&self) -> PlayerId {
        self.player_id
    }
}

impl Keyed for HitBox {
    type Key = HitBoxId;
    fn key(&self) -> HitBoxId {
        self.id
    }
}

impl Keyed for MonsterAggregate {
    type Key = MonsterId;
    fn key(&self) -> MonsterId {
        self.id
    }
}

impl Keyed for SkillLoadout {
    type Key = WorldObjectId;
    fn key(&self) -> WorldObjectId {
        self.owner_id
    }
}

/// Basic storage contract shared by every aggregate repository.
pub trait Repository<V: Keyed>: Send + Sync {
    /// Look up one aggregate.
    fn find_by_id(&self, id: V::Key) -> RepositoryResult<Option<V>>;

    /// Every stored aggregate, in key order.
    fn find_all(&self) -> RepositoryResult<Vec<V>>;

    /// Store a copy of `value`, replacing any previous version.
    fn save(&self, value: &V) -> RepositoryResult<()>;

    /// Remove an aggregate. Returns whether it existed.
    fn delete(&self, id: V::Key) -> RepositoryResult<bool>;
}

// =============================================================================
// Aggregate ports
// =============================================================================

/// Port for physical maps.
pub trait PhysicalMapRepository: Repository<PhysicalMap> {}

/// Port for weather zones.
pub trait WeatherZoneRepository: Repository<WeatherZone> {
    /// The zone covering a spot, if any.
    fn find_by_spot_id(&self, spot_id: SpotId) -> RepositoryResult<Option<WeatherZone>>;
}

/// Port for player status.
pub trait PlayerStatusRepository: Repository<PlayerStatus> {}

/// Port for hitboxes.
pub trait HitBoxRepository: Repository<HitBox> {
    /// Hitboxes of a spot that have not been deactivated.
    fn find_active_by_spot_id(&self, spot_id: SpotId) -> RepositoryResult<Vec<HitBox>>;
}

/// Port for monsters.
pub trait MonsterRepository: Repository<MonsterAggregate> {
    /// The monster represented by a world object.
    fn find_by_object_id(&self, object_id: WorldObjectId)
    -> RepositoryResult<Option<MonsterAggregate>>;

    /// Monsters belonging to a spot.
    fn find_by_spot_id(&self, spot_id: SpotId) -> RepositoryResult<Vec<MonsterAggregate>>;
}

/// Port for skill loadouts, keyed by owning object.
pub trait SkillLoadoutRepository: Repository<SkillLoadout> {}
