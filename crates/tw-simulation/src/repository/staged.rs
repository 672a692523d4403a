use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tw_core::{
    HitBox, MonsterAggregate, PhysicalMap, PlayerStatus, SkillLoadout, SpotId, WeatherZone,
    WorldObjectId,
};

use super::{
    HitBoxRepository, Keyed, MonsterRepository, PhysicalMapRepository, PlayerStatusRepository,
    Repository, SkillLoadoutRepository, UnitOfWork, WeatherZoneRepository,
};
use crate::error::{RepositoryError, RepositoryResult};
use crate::simulation::SimulationPorts;

type Pending<V> = BTreeMap<<V as Keyed>::Key, Option<V>>;

/// A repository that holds writes back until [`StagedRepository::commit`].
///
/// Reads and finders see the staged writes layered over the wrapped store.
/// Dropping it without committing leaves the wrapped store untouched.
pub struct StagedRepository<V: Keyed, R: ?Sized> {
    name: &'static str,
    inner: Arc<R>,
    // `None` marks a staged delete.
    pending: RwLock<Pending<V>>,
}

impl<V: Keyed, R: ?Sized> fmt::Debug for StagedRepository<V, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StagedRepository")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl<V, R> StagedRepository<V, R>
where
    V: Keyed + Clone + Send + Sync,
    R: Repository<V> + ?Sized,
{
    /// Stage writes in front of `inner`. `name` shows up in lock errors.
    pub fn new(name: &'static str, inner: Arc<R>) -> Self {
        Self {
            name,
            inner,
            pending: RwLock::new(BTreeMap::new()),
        }
    }

    fn read(&self) -> RepositoryResult<RwLockReadGuard<'_, Pending<V>>> {
        self.pending
            .read()
            .map_err(|_| RepositoryError::LockPoisoned(self.name))
    }

    fn write(&self) -> RepositoryResult<RwLockWriteGuard<'_, Pending<V>>> {
        self.pending
            .write()
            .map_err(|_| RepositoryError::LockPoisoned(self.name))
    }

    /// Number of staged writes.
    pub fn pending_len(&self) -> RepositoryResult<usize> {
        Ok(self.read()?.len())
    }

    /// Replace stored rows with their staged versions and add staged rows
    /// matching `keep`, in key order.
    fn overlay(&self, stored: Vec<V>, keep: impl Fn(&V) -> bool) -> RepositoryResult<Vec<V>> {
        let pending = self.read()?;
        let mut merged: BTreeMap<V::Key, V> = stored
            .into_iter()
            .filter(|value| !pending.contains_key(&value.key()))
            .map(|value| (value.key(), value))
            .collect();
        merged.extend(
            pending
                .values()
                .flatten()
                .filter(|value| keep(value))
                .map(|value| (value.key(), value.clone())),
        );
        Ok(merged.into_values().collect())
    }

    /// Push the staged writes into the wrapped store in key order.
    ///
    /// Returns how many were applied. The stage is empty afterwards, even
    /// when the wrapped store fails part way.
    pub fn commit(&self) -> RepositoryResult<usize> {
        let pending = std::mem::take(&mut *self.write()?);
        let mut unit = UnitOfWork::new(&*self.inner);
        for (id, staged) in pending {
            match staged {
                Some(value) => unit.register(&value),
                None => unit.register_delete(id),
            }
        }
        unit.commit()
    }
}

impl<V, R> Repository<V> for StagedRepository<V, R>
where
    V: Keyed + Clone + Send + Sync,
    R: Repository<V> + ?Sized,
{
    fn find_by_id(&self, id: V::Key) -> RepositoryResult<Option<V>> {
        if let Some(staged) = self.read()?.get(&id) {
            return Ok(staged.clone());
        }
        self.inner.find_by_id(id)
    }

    fn find_all(&self) -> RepositoryResult<Vec<V>> {
        self.overlay(self.inner.find_all()?, |_| true)
    }

    fn save(&self, value: &V) -> RepositoryResult<()> {
        self.write()?.insert(value.key(), Some(value.clone()));
        Ok(())
    }

    fn delete(&self, id: V::Key) -> RepositoryResult<bool> {
        let existed = self.find_by_id(id)?.is_some();
        self.write()?.insert(id, None);
        Ok(existed)
    }
}

impl<R: PhysicalMapRepository + ?Sized> PhysicalMapRepository for StagedRepository<PhysicalMap, R> {}

impl<R: WeatherZoneRepository + ?Sized> WeatherZoneRepository for StagedRepository<WeatherZone, R> {
    fn find_by_spot_id(&self, spot_id: SpotId) -> RepositoryResult<Option<WeatherZone>> {
        Ok(self
            .find_all()?
            .into_iter()
            .find(|zone| zone.covers(spot_id)))
    }
}

impl<R: PlayerStatusRepository + ?Sized> PlayerStatusRepository
    for StagedRepository<PlayerStatus, R>
{
}

impl<R: HitBoxRepository + ?Sized> HitBoxRepository for StagedRepository<HitBox, R> {
    fn find_active_by_spot_id(&self, spot_id: SpotId) -> RepositoryResult<Vec<HitBox>> {
        self.overlay(self.inner.find_active_by_spot_id(spot_id)?, |hit_box| {
            hit_box.spot_id == spot_id && hit_box.is_active()
        })
    }
}

impl<R: MonsterRepository + ?Sized> MonsterRepository for StagedRepository<MonsterAggregate, R> {
    fn find_by_object_id(
        &self,
        object_id: WorldObjectId,
    ) -> RepositoryResult<Option<MonsterAggregate>> {
        let stored = self.inner.find_by_object_id(object_id)?.into_iter().collect();
        Ok(self
            .overlay(stored, |monster| monster.object_id == object_id)?
            .into_iter()
            .next())
    }

    fn find_by_spot_id(&self, spot_id: SpotId) -> RepositoryResult<Vec<MonsterAggregate>> {
        self.overlay(self.inner.find_by_spot_id(spot_id)?, |monster| {
            monster.spot_id == spot_id
        })
    }
}

impl<R: SkillLoadoutRepository + ?Sized> SkillLoadoutRepository
    for StagedRepository<SkillLoadout, R>
{
}

/// All writes of one tick, staged in front of the live ports.
///
/// The simulation runs a tick against [`TickTransaction::ports`] and commits
/// only once every step succeeded. Dropping the transaction rolls the tick
/// back.
#[derive(Debug)]
pub struct TickTransaction {
    maps: Arc<StagedRepository<PhysicalMap, dyn PhysicalMapRepository>>,
    weather_zones: Arc<StagedRepository<WeatherZone, dyn WeatherZoneRepository>>,
    players: Arc<StagedRepository<PlayerStatus, dyn PlayerStatusRepository>>,
    monsters: Arc<StagedRepository<MonsterAggregate, dyn MonsterRepository>>,
    loadouts: Arc<StagedRepository<SkillLoadout, dyn SkillLoadoutRepository>>,
    hit_boxes: Arc<StagedRepository<HitBox, dyn HitBoxRepository>>,
}

impl TickTransaction {
    /// Open a transaction over `ports`.
    pub fn begin(ports: &SimulationPorts) -> Self {
        Self {
            maps: Arc::new(StagedRepository::new("maps", Arc::clone(&ports.maps))),
            weather_zones: Arc::new(StagedRepository::new(
                "weather_zones",
                Arc::clone(&ports.weather_zones),
            )),
            players: Arc::new(StagedRepository::new("players", Arc::clone(&ports.players))),
            monsters: Arc::new(StagedRepository::new("monsters", Arc::clone(&ports.monsters))),
            loadouts: Arc::new(StagedRepository::new("loadouts", Arc::clone(&ports.loadouts))),
            hit_boxes: Arc::new(StagedRepository::new(
                "hit_boxes",
                Arc::clone(&ports.hit_boxes),
            )),
        }
    }

    /// Ports that read through and write into this transaction.
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

    /// Staged writes across all ports.
    pub fn pending_len(&self) -> RepositoryResult<usize> {
        Ok(self.maps.pending_len()?
            + self.weather_zones.pending_len()?
            + self.players.pending_len()?
            + self.monsters.pending_len()?
            + self.loadouts.pending_len()?
            + self.hit_boxes.pending_len()?)
    }

    /// Apply every staged write, store by store. Returns how many were applied.
    pub fn commit(self) -> RepositoryResult<usize> {
        Ok(self.maps.commit()?
            + self.weather_zones.commit()?
            + self.players.commit()?
            + self.monsters.commit()?
            + self.loadouts.commit()?
            + self.hit_boxes.commit()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{InMemoryRepositories, InMemoryStore};
    use tw_core::{
        Coordinate, DeactivationReason, MonsterId, MonsterTemplate, MonsterTemplateId, PlayerId,
        TerrainType, Velocity, WorldTick,
    };

    fn status(id: u64, stamina: u32) -> PlayerStatus {
        PlayerStatus::new(PlayerId::new(id), 10, 10, 100).with_stamina(stamina)
    }

    fn slime(id: u64, object: u64, spot: SpotId) -> MonsterAggregate {
        MonsterAggregate::spawn(
            MonsterId::new(id),
            WorldObjectId::new(object),
            MonsterTemplate::new(MonsterTemplateId::new(1), "Slime", 10, 0),
            spot,
            Coordinate::planar(1, 1),
            WorldTick::ZERO,
        )
    }

    #[test]
    fn staged_writes_stay_out_of_the_store_until_commit() {
        let store = Arc::new(InMemoryStore::with_values("players", [status(1, 100)]));
        let staged = StagedRepository::new("players", Arc::clone(&store));
        staged.save(&status(1, 40)).unwrap();
        staged.save(&status(2, 70)).unwrap();

        assert_eq!(staged.find_by_id(PlayerId::new(1)).unwrap().unwrap().stamina(), 40);
        assert_eq!(store.find_by_id(PlayerId::new(1)).unwrap().unwrap().stamina(), 100);
        assert_eq!(staged.find_all().unwrap().len(), 2);
        assert_eq!(store.len().unwrap(), 1);

        assert_eq!(staged.commit().unwrap(), 2);
        assert_eq!(store.find_by_id(PlayerId::new(1)).unwrap().unwrap().stamina(), 40);
        assert_eq!(store.version_of(PlayerId::new(1)).unwrap(), Some(2));
        assert_eq!(staged.pending_len().unwrap(), 0);
    }

    #[test]
    fn finders_see_staged_saves_and_deletes() {
        let spot = SpotId::new(1);
        let store = Arc::new(InMemoryStore::with_values(
            "monsters",
            [slime(1, 50, spot), slime(2, 51, spot)],
        ));
        let staged = StagedRepository::new("monsters", Arc::clone(&store));

        assert!(staged.delete(MonsterId::new(1)).unwrap());
        staged.save(&slime(3, 52, spot)).unwrap();
        staged.save(&slime(4, 53, SpotId::new(2))).unwrap();

        let ids: Vec<MonsterId> = staged
            .find_by_spot_id(spot)
            .unwrap()
            .into_iter()
            .map(|monster| monster.id)
            .collect();
        assert_eq!(ids, vec![MonsterId::new(2), MonsterId::new(3)]);
        assert!(staged.find_by_object_id(WorldObjectId::new(50)).unwrap().is_none());
        assert_eq!(
            staged.find_by_object_id(WorldObjectId::new(52)).unwrap().map(|m| m.id),
            Some(MonsterId::new(3))
        );
    }

    #[test]
    fn deactivated_hit_boxes_drop_out_of_the_active_finder() {
        let spot = SpotId::new(1);
        let hit_box = HitBox::new(
            spot,
            WorldObjectId::new(1),
            Coordinate::planar(0, 0),
            Velocity::new(1.0, 0.0, 0.0),
            WorldTick::ZERO,
            3,
        );
        let store = Arc::new(InMemoryStore::with_values("hit_boxes", [hit_box.clone()]));
        let staged = StagedRepository::new("hit_boxes", Arc::clone(&store));
        assert_eq!(staged.find_active_by_spot_id(spot).unwrap().len(), 1);

        let mut spent = hit_box;
        spent.deactivate(DeactivationReason::Expired);
        staged.save(&spent).unwrap();
        assert!(staged.find_active_by_spot_id(spot).unwrap().is_empty());
        assert_eq!(store.find_active_by_spot_id(spot).unwrap().len(), 1);
    }

    #[test]
    fn dropped_transaction_leaves_every_store_untouched() {
        let repos = InMemoryRepositories::new();
        let map = PhysicalMap::filled(SpotId::new(1), "Field", 4, 4, TerrainType::Grass);
        repos.maps.save(&map).unwrap();
        {
            let transaction = TickTransaction::begin(&repos.ports());
            let ports = transaction.ports();
            ports.players.save(&status(1, 10)).unwrap();
            ports.maps.delete(SpotId::new(1)).unwrap();
            assert!(ports.maps.find_all().unwrap().is_empty());
            assert_eq!(transaction.pending_len().unwrap(), 2);
        }
        assert!(repos.players.is_empty().unwrap());
        assert_eq!(repos.maps.version_of(SpotId::new(1)).unwrap(), Some(1));
    }

    #[test]
    fn committed_transaction_reaches_the_stores() {
        let repos = InMemoryRepositories::new();
        let transaction = TickTransaction::begin(&repos.ports());
        let ports = transaction.ports();
        ports.players.save(&status(1, 10)).unwrap();
        ports.monsters.save(&slime(1, 50, SpotId::new(1))).unwrap();
        drop(ports);

        assert_eq!(transaction.commit().unwrap(), 2);
        assert_eq!(repos.players.len().unwrap(), 1);
        assert_eq!(repos.monsters.len().unwrap(), 1);
    }
}
