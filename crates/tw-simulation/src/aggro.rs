use std::collections::BTreeMap;

use tw_core::{AggroMemoryPolicy, SpotId, WorldObjectId, WorldTick};

/// Threat one attacker has built up against one defender.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggroEntry {
    /// Spot the threat was built on.
    pub spot_id: SpotId,
    /// Object that was attacked.
    pub defender: WorldObjectId,
    /// Object that attacked it.
    pub attacker: WorldObjectId,
    /// Accumulated threat.
    pub threat: u64,
    /// Last tick the attacker added threat.
    pub last_seen: WorldTick,
}

type AggroKey = (SpotId, WorldObjectId, WorldObjectId);

/// Per-spot threat tables: defender to attacker to accumulated threat.
#[derive(Debug, Clone, Default)]
pub struct AggroStore {
    entries: BTreeMap<AggroKey, AggroEntry>,
}

impl AggroStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add threat from `attacker` against `defender`.
    pub fn add_aggro(
        &mut self,
        spot_id: SpotId,
        defender: WorldObjectId,
        attacker: WorldObjectId,
        amount: u64,
        now: WorldTick,
    ) {
        let entry = self
            .entries
            .entry((spot_id, defender, attacker))
            .or_insert(AggroEntry {
                spot_id,
                defender,
                attacker,
                threat: 0,
                last_seen: now,
            });
        entry.threat = entry.threat.saturating_add(amount);
        entry.last_seen = entry.last_seen.max(now);
    }

    /// Remembered attackers of `defender`, highest threat first.
    ///
    /// Ties go to the most recently seen attacker, then the lowest id.
    pub fn threat_table(
        &self,
        spot_id: SpotId,
        defender: WorldObjectId,
        policy: &AggroMemoryPolicy,
        now: WorldTick,
    ) -> Vec<AggroEntry> {
        let mut table: Vec<AggroEntry> = self
            .entries
            .range((spot_id, defender, WorldObjectId::new(0))..=(spot_id, defender, WorldObjectId::new(u64::MAX)))
            .map(|(_, entry)| *entry)
            .filter(|entry| policy.remembers(entry.last_seen, now))
            .collect();
        table.sort_by(|a, b| {
            b.threat
                .cmp(&a.threat)
                .then(b.last_seen.cmp(&a.last_seen))
                .then(a.attacker.cmp(&b.attacker))
        });
        table
    }

    /// Drop entries for `defender` that the policy no longer remembers.
    pub fn forget_stale(
        &mut self,
        spot_id: SpotId,
        defender: WorldObjectId,
        policy: &AggroMemoryPolicy,
        now: WorldTick,
    ) -> usize {
        let before = self.entries.len();
        self.entries.retain(|(spot, def, _), entry| {
            *spot != spot_id || *def != defender || policy.remembers(entry.last_seen, now)
        });
        before - self.entries.len()
    }

    /// Forget stale threat across every table.
    ///
    /// `policy_of` names a defender's own memory. Defenders it does not know,
    /// players and objects that left their map, use `fallback`.
    pub fn sweep(
        &mut self,
        now: WorldTick,
        policy_of: impl Fn(SpotId, WorldObjectId) -> Option<AggroMemoryPolicy>,
        fallback: &AggroMemoryPolicy,
    ) -> usize {
        let before = self.entries.len();
        self.entries.retain(|(spot, defender, _), entry| {
            policy_of(*spot, *defender)
                .unwrap_or(*fallback)
                .remembers(entry.last_seen, now)
        });
        before - self.entries.len()
    }

    /// Forget everything about an object, as defender or attacker.
    pub fn clear_object(&mut self, spot_id: SpotId, object: WorldObjectId) {
        self.entries
            .retain(|(spot, defender, attacker), _| {
                *spot != spot_id || (*defender != object && *attacker != object)
            });
    }

    /// Number of attacker entries across all tables.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no threat is remembered anywhere.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPOT: SpotId = SpotId::new(1);
    const WOLF: WorldObjectId = WorldObjectId::new(10);

    fn attacker(id: u64) -> WorldObjectId {
        WorldObjectId::new(id)
    }

    #[test]
    fn threat_accumulates_per_attacker() {
        let mut store = AggroStore::new();
        store.add_aggro(SPOT, WOLF, attacker(1), 5, WorldTick::new(1));
        store.add_aggro(SPOT, WOLF, attacker(1), 3, WorldTick::new(2));
        store.add_aggro(SPOT, WOLF, attacker(2), 6, WorldTick::new(2));

        let table = store.threat_table(SPOT, WOLF, &AggroMemoryPolicy::default(), WorldTick::new(3));
        assert_eq!(table.len(), 2);
        assert_eq!(table[0].attacker, attacker(1));
        assert_eq!(table[0].threat, 8);
        assert_eq!(table[0].last_seen, WorldTick::new(2));
    }

    #[test]
    fn forgotten_attackers_are_filtered() {
        let mut store = AggroStore::new();
        store.add_aggro(SPOT, WOLF, attacker(1), 50, WorldTick::new(1));
        store.add_aggro(SPOT, WOLF, attacker(2), 1, WorldTick::new(20));
        let policy = AggroMemoryPolicy::forget_after(10);

        let table = store.threat_table(SPOT, WOLF, &policy, WorldTick::new(25));
        assert_eq!(table.len(), 1);
        assert_eq!(table[0].attacker, attacker(2));

        assert_eq!(store.forget_stale(SPOT, WOLF, &policy, WorldTick::new(25)), 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn tables_are_scoped_by_spot_and_defender() {
        let mut store = AggroStore::new();
        store.add_aggro(SPOT, WOLF, attacker(1), 5, WorldTick::new(1));
        store.add_aggro(SpotId::new(2), WOLF, attacker(1), 5, WorldTick::new(1));
        store.add_aggro(SPOT, attacker(3), attacker(1), 5, WorldTick::new(1));
        let table = store.threat_table(SPOT, WOLF, &AggroMemoryPolicy::default(), WorldTick::new(1));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn sweep_uses_each_defenders_policy_and_the_fallback_for_the_rest() {
        let mut store = AggroStore::new();
        let hero = attacker(1);
        // wolf never forgets, the hero has no policy of its own
        store.add_aggro(SPOT, WOLF, hero, 5, WorldTick::new(1));
        store.add_aggro(SPOT, hero, WOLF, 5, WorldTick::new(1));
        store.add_aggro(SpotId::new(2), attacker(20), hero, 5, WorldTick::new(8));

        let policy_of = |_: SpotId, defender: WorldObjectId| {
            (defender == WOLF).then(AggroMemoryPolicy::default)
        };
        let fallback = AggroMemoryPolicy::forget_after(5);
        assert_eq!(store.sweep(WorldTick::new(10), policy_of, &fallback), 1);
        assert_eq!(store.len(), 2);
        assert!(store
            .threat_table(SPOT, hero, &AggroMemoryPolicy::default(), WorldTick::new(10))
            .is_empty());
        assert_eq!(store.sweep(WorldTick::new(14), policy_of, &fallback), 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn clearing_an_object_removes_both_roles() {
        let mut store = AggroStore::new();
        store.add_aggro(SPOT, WOLF, attacker(1), 5, WorldTick::new(1));
        store.add_aggro(SPOT, attacker(1), WOLF, 5, WorldTick::new(1));
        store.add_aggro(SPOT, attacker(2), attacker(3), 5, WorldTick::new(1));
        store.clear_object(SPOT, WOLF);
        assert_eq!(store.len(), 1);
    }
}
