use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tw_core::{
    HitBox, MonsterAggregate, PhysicalMap, PlayerStatus, SkillLoadout, SpotId, WeatherZone,
    WorldObjectId,
};

use super::{
    HitBoxRepository, Keyed, MonsterRepository, PhysicalMapRepository, PlayerStatusRepository,
    Repository, SkillLoadoutRepository, WeatherZoneRepository,
};
use crate::error::{RepositoryError, RepositoryResult};
use crate::simulation::SimulationPorts;

#[derive(Debug)]
struct Versioned<V> {
    version: u64,
    value: V,
}

/// Copy-on-save store backed by a lock-protected ordered map.
///
/// Saves store a clone and bump the entry's version; reads hand out clones.
#[derive(Debug)]
pub struct InMemoryStore<V: Keyed> {
    name: &'static str,
    entries: RwLock<BTreeMap<V::Key, Versioned<V>>>,
}

impl<V: Keyed + Clone> InMemoryStore<V> {
    /// Create an empty store. `name` shows up in lock errors.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    /// Create a store pre-filled with `values`, all at version 1.
    pub fn with_values(name: &'static str, values: impl IntoIterator<Item = V>) -> Self {
        let entries = values
            .into_iter()
            .map(|value| (value.key(), Versioned { version: 1, value }))
            .collect();
        Self {
            name,
            entries: RwLock::new(entries),
        }
    }

    fn read(&self) -> RepositoryResult<RwLockReadGuard<'_, BTreeMap<V::Key, Versioned<V>>>> {
        self.entries
            .read()
            .map_err(|_| RepositoryError::LockPoisoned(self.name))
    }

    fn write(&self) -> RepositoryResult<RwLockWriteGuard<'_, BTreeMap<V::Key, Versioned<V>>>> {
        self.entries
            .write()
            .map_err(|_| RepositoryError::LockPoisoned(self.name))
    }

    /// Stored version of an aggregate. Starts at 1 and grows with every save.
    pub fn version_of(&self, id: V::Key) -> RepositoryResult<Option<u64>> {
        Ok(self.read()?.get(&id).map(|entry| entry.version))
    }

    /// Number of stored aggregates.
    pub fn len(&self) -> RepositoryResult<usize> {
        Ok(self.read()?.len())
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> RepositoryResult<bool> {
        Ok(self.read()?.is_empty())
    }

    /// Copies of every aggregate matching `predicate`, in key order.
    pub fn find_where(&self, predicate: impl Fn(&V) -> bool) -> RepositoryResult<Vec<V>> {
        Ok(self
            .read()?
            .values()
            .filter(|entry| predicate(&entry.value))
            .map(|entry| entry.value.clone())
            .collect())
    }
}

impl<V: Keyed + Clone + Send + Sync> Repository<V> for InMemoryStore<V> {
    fn find_by_id(&self, id: V::Key) -> RepositoryResult<Option<V>> {
        Ok(self.read()?.get(&id).map(|entry| entry.value.clone()))
    }

    fn find_all(&self) -> RepositoryResult<Vec<V>> {
        self.find_where(|_| true)
    }

    fn save(&self, value: &V) -> RepositoryResult<()> {
        let mut entries = self.write()?;
        let entry = entries.entry(value.key()).or_insert_with(|| Versioned {
            version: 0,
            value: value.clone(),
        });
        entry.version += 1;
        entry.value = value.clone();
        Ok(())
    }

    fn delete(&self, id: V::Key) -> RepositoryResult<bool> {
        Ok(self.write()?.remove(&id).is_some())
    }
}

impl PhysicalMapRepository for InMemoryStore<PhysicalMap> {}

impl WeatherZoneRepository for InMemoryStore<WeatherZone> {
    fn find_by_spot_id(&self, spot_id: SpotId) -> RepositoryResult<Option<WeatherZone>> {
        Ok(self.find_where(|zone| zone.covers(spot_id))?.into_iter().next())
    }
}

impl PlayerStatusRepository for InMemoryStore<PlayerStatus> {}

impl HitBoxRepository for InMemoryStore<HitBox> {
    fn find_active_by_spot_id(&self, spot_id: SpotId) -> RepositoryResult<Vec<HitBox>> {
        self.find_where(|hit_box| hit_box.spot_id == spot_id && hit_box.is_active())
    }
}

impl MonsterRepository for InMemoryStore<MonsterAggregate> {
    fn find_by_object_id(
        &self,
        object_id: WorldObjectId,
    ) -> RepositoryResult<Option<MonsterAggregate>> {
        Ok(self
            .find_where(|monster| monster.object_id == object_id)?
            .into_iter()
            .next())
    }

    fn find_by_spot_id(&self, spot_id: SpotId) -> RepositoryResult<Vec<MonsterAggregate>> {
        self.find_where(|monster| monster.spot_id == spot_id)
    }
}

impl SkillLoadoutRepository for InMemoryStore<SkillLoadout> {}

/// One in-memory store per port, kept concrete so callers can inspect versions.
#[derive(Debug, Clone)]
pub struct InMemoryRepositories {
    /// Physical maps by spot.
    pub maps: Arc<InMemoryStore<PhysicalMap>>,
    /// Weather zones.
    pub weather_zones: Arc<InMemoryStore<WeatherZone>>,
    /// Player status records.
    pub players: Arc<InMemoryStore<PlayerStatus>>,
    /// Hitboxes, active or not.
    pub hit_boxes: Arc<InMemoryStore<HitBox>>,
    /// Monster life cycles.
    pub monsters: Arc<InMemoryStore<MonsterAggregate>>,
    /// Skill loadouts by owner.
    pub loadouts: Arc<InMemoryStore<SkillLoadout>>,
}

impl Default for InMemoryRepositories {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRepositories {
    /// Empty stores.
    pub fn new() -> Self {
        Self {
            maps: Arc::new(InMemoryStore::new("maps")),
            weather_zones: Arc::new(InMemoryStore::new("weather_zones")),
            players: Arc::new(InMemoryStore::new("players")),
            hit_boxes: Arc::new(InMemoryStore::new("hit_boxes")),
            monsters: Arc::new(InMemoryStore::new("monsters")),
            loadouts: Arc::new(InMemoryStore::new("loadouts")),
        }
    }

    /// Port handles sharing these stores.
    pub fn ports(&self) -> SimulationPorts {
        SimulationPorts {
            maps: self.maps.clone(),
            weather_zones: self.weather_zones.clone(),
            players: self.players.clone(),
            hit_boxes: self.hit_boxes.clone(),
            monsters: self.monsters.clone(),
            loadouts: self.loadouts.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tw_core::{Coordinate, PlayerId, TerrainType, WeatherZoneId};

    #[test]
    fn save_then_find_returns_an_independent_copy() {
        let store = InMemoryStore::new("players");
        let status = PlayerStatus::new(PlayerId::new(1), 20, 5, 100);
        store.save(&status).unwrap();

        let mut copy = store.find_by_id(PlayerId::new(1)).unwrap().unwrap();
        assert_eq!(copy, status);
        copy.drain_stamina(50);

        let stored = store.find_by_id(PlayerId::new(1)).unwrap().unwrap();
        assert_eq!(stored.stamina(), 100);
    }

    #[test]
    fn caller_mutation_after_save_does_not_leak() {
        let store = InMemoryStore::new("maps");
        let mut map = PhysicalMap::filled(SpotId::new(1), "Field", 3, 3, TerrainType::Grass);
        store.save(&map).unwrap();
        map.set_terrain(Coordinate::planar(0, 0), TerrainType::Wall)
            .unwrap();

        let stored = store.find_by_id(SpotId::new(1)).unwrap().unwrap();
        assert_eq!(
            stored.tile(Coordinate::planar(0, 0)).unwrap().terrain,
            TerrainType::Grass
        );
    }

    #[test]
    fn versions_grow_with_each_save() {
        let store = InMemoryStore::new("players");
        let status = PlayerStatus::new(PlayerId::new(1), 20, 5, 100);
        assert_eq!(store.version_of(PlayerId::new(1)).unwrap(), None);
        store.save(&status).unwrap();
        store.save(&status).unwrap();
        assert_eq!(store.version_of(PlayerId::new(1)).unwrap(), Some(2));
        assert!(store.delete(PlayerId::new(1)).unwrap());
        assert!(!store.delete(PlayerId::new(1)).unwrap());
    }

    #[test]
    fn weather_zone_lookup_by_spot() {
        let store = InMemoryStore::with_values(
            "weather_zones",
            [WeatherZone::new(WeatherZoneId::new(1), "Coast", [SpotId::new(2)])],
        );
        assert!(store.find_by_spot_id(SpotId::new(2)).unwrap().is_some());
        assert!(store.find_by_spot_id(SpotId::new(3)).unwrap().is_none());
    }

    #[test]
    fn ports_share_the_underlying_stores() {
        let repos = InMemoryRepositories::new();
        let ports = repos.ports();
        ports
            .players
            .save(&PlayerStatus::new(PlayerId::new(4), 1, 1, 1))
            .unwrap();
        assert_eq!(repos.players.len().unwrap(), 1);
    }
}
