use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use tw_core::{Coordinate, Mover, PhysicalMap, WorldObjectId, WorldTick};

/// Fixed-point scale for movement costs so the open set can order on integers.
const COST_SCALE: f64 = 100.0;

fn step_cost(map: &PhysicalMap, cell: Coordinate) -> Option<u64> {
    map.get_movement_cost(cell)
        .map(|cost| (cost * COST_SCALE).round().max(1.0) as u64)
}

fn heuristic(from: Coordinate, to: Coordinate) -> u64 {
    // Every tile costs at least 1.0 and weather never makes movement cheaper.
    u64::from(from.manhattan_distance(to)) * COST_SCALE as u64
}

/// A* over the four planar neighbours, weighted by movement cost.
///
/// The returned path excludes `from` and ends at `to`. The goal may be held by
/// a blocking object (the usual case when chasing) as long as its terrain is
/// passable. Gives up after expanding `max_nodes` cells.
pub fn find_path(
    map: &PhysicalMap,
    from: Coordinate,
    to: Coordinate,
    mover: &Mover,
    max_nodes: usize,
) -> Option<Vec<Coordinate>> {
    if from == to {
        return Some(Vec::new());
    }
    let goal_enterable = map
        .tile(to)
        .is_some_and(|tile| tile.terrain.is_passable_for(&mover.capability));
    if !goal_enterable {
        return None;
    }

    let mut open = BinaryHeap::new();
    let mut best_cost: HashMap<Coordinate, u64> = HashMap::new();
    let mut came_from: HashMap<Coordinate, Coordinate> = HashMap::new();
    let mut expanded = 0usize;

    best_cost.insert(from, 0);
    open.push(Reverse((heuristic(from, to), 0u64, from)));

    while let Some(Reverse((_, cost, cell))) = open.pop() {
        if cell == to {
            return Some(reconstruct(&came_from, from, to));
        }
        if best_cost.get(&cell).is_some_and(|best| cost > *best) {
            continue;
        }
        expanded += 1;
        if expanded > max_nodes {
            return None;
        }

        for next in cell.neighbors() {
            if next != to && !map.is_passable(next, mover) {
                continue;
            }
            let Some(step) = step_cost(map, next) else {
                continue;
            };
            let next_cost = cost + step;
            if best_cost.get(&next).is_none_or(|old| next_cost < *old) {
                best_cost.insert(next, next_cost);
                came_from.insert(next, cell);
                open.push(Reverse((next_cost + heuristic(next, to), next_cost, next)));
            }
        }
    }
    None
}

fn reconstruct(
    came_from: &HashMap<Coordinate, Coordinate>,
    from: Coordinate,
    to: Coordinate,
) -> Vec<Coordinate> {
    let mut path = vec![to];
    let mut current = to;
    while let Some(previous) = came_from.get(&current) {
        if *previous == from {
            break;
        }
        path.push(*previous);
        current = *previous;
    }
    path.reverse();
    path
}

#[derive(Debug, Clone)]
struct CachedPath {
    goal: Coordinate,
    // Starts with the cell the search began on.
    path: Vec<Coordinate>,
    computed_at: WorldTick,
}

/// Paths per actor, valid for `ttl_ticks` while the goal stays the same.
#[derive(Debug, Clone)]
pub struct PathCache {
    ttl_ticks: u64,
    entries: HashMap<WorldObjectId, CachedPath>,
    hits: u64,
    misses: u64,
}

impl PathCache {
    /// A cache whose entries live for `ttl_ticks`. Zero disables caching.
    pub fn new(ttl_ticks: u64) -> Self {
        Self {
            ttl_ticks,
            entries: HashMap::new(),
            hits: 0,
            misses: 0,
        }
    }

    /// The cached step after `from`, if the actor's path to `goal` is still fresh.
    pub fn lookup(
        &mut self,
        actor: WorldObjectId,
        from: Coordinate,
        goal: Coordinate,
        now: WorldTick,
    ) -> Option<Coordinate> {
        let step = self.entries.get(&actor).and_then(|entry| {
            if entry.goal != goal || now.since(entry.computed_at) >= self.ttl_ticks {
                return None;
            }
            let position = entry.path.iter().position(|cell| *cell == from)?;
            entry.path.get(position + 1).copied()
        });
        match step {
            Some(_) => self.hits += 1,
            None => {
                self.misses += 1;
                self.entries.remove(&actor);
            }
        }
        step
    }

    /// Remember a path starting at the actor's current cell.
    pub fn store(
        &mut self,
        actor: WorldObjectId,
        goal: Coordinate,
        path: Vec<Coordinate>,
        now: WorldTick,
    ) {
        if self.ttl_ticks == 0 {
            return;
        }
        self.entries.insert(
            actor,
            CachedPath {
                goal,
                path,
                computed_at: now,
            },
        );
    }

    /// Forget an actor's path.
    pub fn invalidate(&mut self, actor: WorldObjectId) {
        self.entries.remove(&actor);
    }

    /// Drop every entry older than the TTL.
    pub fn evict_expired(&mut self, now: WorldTick) {
        let ttl = self.ttl_ticks;
        self.entries
            .retain(|_, entry| now.since(entry.computed_at) < ttl);
    }

    /// Lookups answered from the cache.
    pub fn hits(&self) -> u64 {
        self.hits
    }

    /// Lookups that fell through to a search.
    pub fn misses(&self) -> u64 {
        self.misses
    }

    /// Number of cached paths.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no path is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Path search with a per-actor cache in front of it.
#[derive(Debug, Clone)]
pub struct Pathfinder {
    cache: PathCache,
    max_nodes: usize,
}

impl Pathfinder {
    /// Cache paths for `ttl_ticks` and expand at most `max_nodes` cells per search.
    pub fn new(ttl_ticks: u64, max_nodes: usize) -> Self {
        Self {
            cache: PathCache::new(ttl_ticks),
            max_nodes,
        }
    }

    /// The path cache.
    pub fn cache(&self) -> &PathCache {
        &self.cache
    }

    /// The path cache, for eviction.
    pub fn cache_mut(&mut self) -> &mut PathCache {
        &mut self.cache
    }

    /// The next cell on the way from `from` to `goal`, `None` when already there or unreachable.
    ///
    /// An occupied goal is never handed out as a step: the mover waits next to it.
    pub fn next_step(
        &mut self,
        map: &PhysicalMap,
        actor: WorldObjectId,
        from: Coordinate,
        goal: Coordinate,
        mover: &Mover,
        now: WorldTick,
    ) -> Option<Coordinate> {
        if from == goal {
            return None;
        }
        if let Some(step) = self.cache.lookup(actor, from, goal, now) {
            if map.is_passable(step, mover) {
                return Some(step);
            }
            if step == goal {
                return None;
            }
            self.cache.invalidate(actor);
        }

        let path = find_path(map, from, goal, mover, self.max_nodes)?;
        let first = path.first().copied()?;
        let mut full = Vec::with_capacity(path.len() + 1);
        full.push(from);
        full.extend(path);
        self.cache.store(actor, goal, full, now);
        map.is_passable(first, mover).then_some(first)
    }
}
