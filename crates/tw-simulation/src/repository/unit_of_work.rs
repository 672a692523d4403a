use std::collections::BTreeMap;

use super::{Keyed, Repository};
use crate::error::RepositoryResult;

/// Pending writes against one repository.
///
/// Reads through the unit of work see its own uncommitted writes; nothing
/// reaches the repository before [`UnitOfWork::commit`]. Dropping it discards
/// the pending writes.
#[derive(Debug)]
pub struct UnitOfWork<'a, V: Keyed, R: Repository<V> + ?Sized> {
    repository: &'a R,
    // `None` marks a pending delete.
    pending: BTreeMap<V::Key, Option<V>>,
}

impl<'a, V: Keyed + Clone, R: Repository<V> + ?Sized> UnitOfWork<'a, V, R> {
    /// Start a unit of work on `repository`.
    pub fn new(repository: &'a R) -> Self {
        Self {
            repository,
            pending: BTreeMap::new(),
        }
    }

    /// Register a copy of `value` to be saved on commit.
    pub fn register(&mut self, value: &V) {
        self.pending.insert(value.key(), Some(value.clone()));
    }

    /// Register a delete.
    pub fn register_delete(&mut self, id: V::Key) {
        self.pending.insert(id, None);
    }

    /// Pending state first, then the repository.
    pub fn find_by_id(&self, id: V::Key) -> RepositoryResult<Option<V>> {
        match self.pending.get(&id) {
            Some(pending) => Ok(pending.clone()),
            None => self.repository.find_by_id(id),
        }
    }

    /// Number of pending writes.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Apply all pending writes in key order. Returns how many were applied.
    pub fn commit(self) -> RepositoryResult<usize> {
        let count = self.pending.len();
        for (id, pending) in self.pending {
            match pending {
                Some(value) => self.repository.save(&value)?,
                None => {
                    self.repository.delete(id)?;
                }
            }
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryStore;
    use tw_core::{PlayerId, PlayerStatus};

    fn status(id: u64, stamina: u32) -> PlayerStatus {
        PlayerStatus::new(PlayerId::new(id), 10, 10, 100).with_stamina(stamina)
    }

    #[test]
    fn pending_writes_are_visible_only_inside_the_unit() {
        let store = InMemoryStore::with_values("players", [status(1, 100)]);
        let mut uow = UnitOfWork::new(&store);
        uow.register(&status(1, 40));

        assert_eq!(uow.find_by_id(PlayerId::new(1)).unwrap().unwrap().stamina(), 40);
        assert_eq!(store.find_by_id(PlayerId::new(1)).unwrap().unwrap().stamina(), 100);

        assert_eq!(uow.commit().unwrap(), 1);
        assert_eq!(store.find_by_id(PlayerId::new(1)).unwrap().unwrap().stamina(), 40);
    }

    #[test]
    fn pending_deletes_hide_stored_values() {
        let store = InMemoryStore::with_values("players", [status(1, 100)]);
        let mut uow = UnitOfWork::new(&store);
        uow.register_delete(PlayerId::new(1));
        assert!(uow.find_by_id(PlayerId::new(1)).unwrap().is_none());
        uow.commit().unwrap();
        assert!(store.find_by_id(PlayerId::new(1)).unwrap().is_none());
    }

    #[test]
    fn dropping_discards_pending_writes() {
        let store = InMemoryStore::with_values("players", [status(1, 100)]);
        {
            let mut uow = UnitOfWork::new(&store);
            uow.register(&status(1, 1));
            assert_eq!(uow.pending_len(), 1);
        }
        assert_eq!(store.find_by_id(PlayerId::new(1)).unwrap().unwrap().stamina(), 100);
    }
}
