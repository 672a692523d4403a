use std::collections::{HashMap, HashSet};

use crate::area::{AreaTrigger, Gateway, LocationArea};
use crate::arena::{Arena, Handle};
use crate::component::ObjectComponent;
use crate::coordinate::{Coordinate, Direction};
use crate::error::{DomainError, DomainResult};
use crate::event::WorldEvent;
use crate::ids::{SpotId, WorldObjectId};
use crate::object::{Mover, WorldObject};
use crate::terrain::{MovementCapability, TerrainType};
use crate::tick::WorldTick;
use crate::tile::Tile;
use crate::weather::WeatherState;

/// Spatial truth for one spot: tiles, placed objects, named regions and weather.
///
/// Objects live in a generational arena; the id and coordinate indexes hold
/// handles into it. Every mutation returns the events it raised.
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicalMap {
    spot_id: SpotId,
    name: String,
    tiles: HashMap<Coordinate, Tile>,
    objects: Arena<WorldObject>,

    // Indexes
    by_id: HashMap<WorldObjectId, Handle>,
    by_coordinate: HashMap<Coordinate, Vec<Handle>>,

    area_triggers: Vec<AreaTrigger>,
    location_areas: Vec<LocationArea>,
    gateways: Vec<Gateway>,
    weather: WeatherState,
}

impl PhysicalMap {
    /// Create a map from a set of tiles.
    pub fn new(spot_id: SpotId, name: impl Into<String>, tiles: impl IntoIterator<Item = Tile>) -> Self {
        Self {
            spot_id,
            name: name.into(),
            tiles: tiles.into_iter().map(|t| (t.coordinate, t)).collect(),
            objects: Arena::new(),
            by_id: HashMap::new(),
            by_coordinate: HashMap::new(),
            area_triggers: Vec::new(),
            location_areas: Vec::new(),
            gateways: Vec::new(),
            weather: WeatherState::clear(),
        }
    }

    /// Create a rectangular layer-zero map of a single terrain.
    pub fn filled(
        spot_id: SpotId,
        name: impl Into<String>,
        width: i32,
        height: i32,
        terrain: TerrainType,
    ) -> Self {
        let tiles = (0..height)
            .flat_map(|y| (0..width).map(move |x| Tile::new(Coordinate::planar(x, y), terrain)));
        Self::new(spot_id, name, tiles)
    }

    /// Replace the terrain of an existing tile.
    pub fn set_terrain(&mut self, at: Coordinate, terrain: TerrainType) -> DomainResult<()> {
        let tile = self
            .tiles
            .get_mut(&at)
            .ok_or(DomainError::TileNotFound(at))?;
        tile.terrain = terrain;
        Ok(())
    }

    /// Register an area trigger.
    pub fn add_area_trigger(&mut self, trigger: AreaTrigger) {
        self.area_triggers.push(trigger);
    }

    /// Register a location area.
    pub fn add_location_area(&mut self, area: LocationArea) {
        self.location_areas.push(area);
    }

    /// Register a gateway.
    pub fn add_gateway(&mut self, gateway: Gateway) {
        self.gateways.push(gateway);
    }

    /// Spot this map belongs to.
    pub fn spot_id(&self) -> SpotId {
        self.spot_id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tile at a coordinate.
    pub fn tile(&self, at: Coordinate) -> Option<&Tile> {
        self.tiles.get(&at)
    }

    /// Number of tiles.
    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    /// Weather currently applied to the map.
    pub fn weather(&self) -> WeatherState {
        self.weather
    }

    /// Replace the weather. Returns `true` when it changed.
    pub fn set_weather(&mut self, weather: WeatherState) -> bool {
        if self.weather == weather {
            return false;
        }
        self.weather = weather;
        true
    }

    // -----------------------------------------------------------------------
    // Object queries
    // -----------------------------------------------------------------------

    /// Look up an object by id.
    pub fn object(&self, id: WorldObjectId) -> Option<&WorldObject> {
        self.by_id.get(&id).and_then(|h| self.objects.get(*h))
    }

    /// Whether an object is on the map.
    pub fn contains_object(&self, id: WorldObjectId) -> bool {
        self.by_id.contains_key(&id)
    }

    /// All objects in insertion order.
    pub fn objects(&self) -> impl Iterator<Item = &WorldObject> {
        self.objects.iter().map(|(_, obj)| obj)
    }

    /// Objects standing on a cell.
    pub fn objects_at(&self, at: Coordinate) -> impl Iterator<Item = &WorldObject> {
        self.by_coordinate
            .get(&at)
            .into_iter()
            .flatten()
            .filter_map(|h| self.objects.get(*h))
    }

    /// Number of placed objects.
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Objects controlled by a player.
    pub fn player_objects(&self) -> impl Iterator<Item = &WorldObject> {
        self.objects().filter(|o| o.is_player())
    }

    /// Whether at least one player is present.
    pub fn has_players(&self) -> bool {
        self.player_objects().next().is_some()
    }

    /// Distance from `at` to the closest player, `None` without players.
    pub fn distance_to_nearest_player(&self, at: Coordinate) -> Option<f64> {
        self.player_objects()
            .map(|p| at.euclidean_distance(p.coordinate))
            .min_by(f64::total_cmp)
    }

    /// Mutable access to an object's component. Position and blocking stay map-owned.
    pub fn component_mut(&mut self, id: WorldObjectId) -> Option<&mut ObjectComponent> {
        self.object_mut(id).map(|o| &mut o.component)
    }

    fn object_mut(&mut self, id: WorldObjectId) -> Option<&mut WorldObject> {
        let handle = *self.by_id.get(&id)?;
        self.objects.get_mut(handle)
    }

    fn require_mut(&mut self, id: WorldObjectId) -> DomainResult<&mut WorldObject> {
        self.object_mut(id).ok_or(DomainError::ObjectNotFound(id))
    }

    // -----------------------------------------------------------------------
    // Placement and movement
    // -----------------------------------------------------------------------

    /// Check whether an object could stand on `at`.
    ///
    /// At most one blocking object per cell: a blocking placement needs an
    /// empty cell, a non-blocking one only needs the absence of blockers.
    /// Non-blocking ghost walkers ignore blockers entirely.
    pub fn validate_placement(
        &self,
        at: Coordinate,
        capability: &MovementCapability,
        is_blocking: bool,
        exclude: Option<WorldObjectId>,
    ) -> DomainResult<()> {
        let tile = self.tiles.get(&at).ok_or_else(|| DomainError::InvalidPlacement {
            coordinate: at,
            reason: "no tile".into(),
        })?;
        if !tile.terrain.is_passable_for(capability) {
            return Err(DomainError::InvalidPlacement {
                coordinate: at,
                reason: format!("terrain {:?} is impassable", tile.terrain),
            });
        }

        if let Some(other) = self.occupant_conflict(at, capability, is_blocking, exclude) {
            let reason = if is_blocking {
                format!("occupied by {}", other.id)
            } else {
                format!("blocked by {}", other.id)
            };
            return Err(DomainError::InvalidPlacement {
                coordinate: at,
                reason,
            });
        }
        Ok(())
    }

    /// Whether `mover` may enter `at`, by the same rules as [`Self::validate_placement`].
    ///
    /// Ghost walk only lets non-blocking movers through occupied cells.
    pub fn is_passable(&self, at: Coordinate, mover: &Mover) -> bool {
        let Some(tile) = self.tiles.get(&at) else {
            return false;
        };
        tile.terrain.is_passable_for(&mover.capability)
            && self
                .occupant_conflict(at, &mover.capability, mover.is_blocking, None)
                .is_none()
    }

    fn occupant_conflict(
        &self,
        at: Coordinate,
        capability: &MovementCapability,
        is_blocking: bool,
        exclude: Option<WorldObjectId>,
    ) -> Option<&WorldObject> {
        let mut others = self.objects_at(at).filter(|o| Some(o.id) != exclude);
        if is_blocking {
            others.next()
        } else if capability.ghost_walk {
            None
        } else {
            others.find(|o| o.is_blocking)
        }
    }

    /// Cost of entering `at`: terrain base cost times the weather multiplier.
    pub fn get_movement_cost(&self, at: Coordinate) -> Option<f64> {
        self.tiles
            .get(&at)
            .map(|t| t.terrain.base_cost() * self.weather.movement_multiplier())
    }

    /// Ticks needed to enter `at`, at least one.
    pub fn movement_duration(&self, at: Coordinate) -> Option<u64> {
        self.get_movement_cost(at)
            .map(|cost| cost.ceil().max(1.0) as u64)
    }

    /// Place a new object.
    pub fn add_object(&mut self, object: WorldObject) -> DomainResult<Vec<WorldEvent>> {
        if self.by_id.contains_key(&object.id) {
            return Err(DomainError::DuplicateObject(object.id));
        }
        self.validate_placement(
            object.coordinate,
            &object.capability(),
            object.is_blocking,
            None,
        )?;

        let id = object.id;
        let at = object.coordinate;
        let handle = self.objects.insert(object);
        self.by_id.insert(id, handle);
        self.by_coordinate.entry(at).or_default().push(handle);
        self.refresh_tile_override(at);

        let mut events = vec![WorldEvent::ObjectAdded {
            spot_id: self.spot_id,
            object_id: id,
            at,
        }];
        events.extend(self.check_area_triggers(id, None, Some(at)));
        Ok(events)
    }

    /// Take an object off the map.
    pub fn remove_object(
        &mut self,
        id: WorldObjectId,
    ) -> DomainResult<(WorldObject, Vec<WorldEvent>)> {
        let handle = self
            .by_id
            .remove(&id)
            .ok_or(DomainError::ObjectNotFound(id))?;
        let object = self
            .objects
            .remove(handle)
            .ok_or(DomainError::ObjectNotFound(id))?;
        let at = object.coordinate;
        self.detach(handle, at);
        self.refresh_tile_override(at);

        let mut events = vec![WorldEvent::ObjectRemoved {
            spot_id: self.spot_id,
            object_id: id,
            at,
        }];
        events.extend(self.check_area_triggers(id, Some(at), None));
        Ok((object, events))
    }

    /// Move an object, making it busy for the cost of the destination tile.
    pub fn move_object(
        &mut self,
        id: WorldObjectId,
        to: Coordinate,
        capability: &MovementCapability,
        now: WorldTick,
    ) -> DomainResult<Vec<WorldEvent>> {
        let object = self.object(id).ok_or(DomainError::ObjectNotFound(id))?;
        if object.is_busy(now) {
            return Err(DomainError::ActorBusy {
                object: id,
                busy_until: object.busy_until,
            });
        }
        let from = object.coordinate;
        self.validate_placement(to, capability, object.is_blocking, Some(id))
            .map_err(|err| DomainError::InvalidMovement {
                object: id,
                to,
                reason: err.to_string(),
            })?;
        let duration = self
            .movement_duration(to)
            .ok_or(DomainError::TileNotFound(to))?;
        let busy_until = now.plus(duration);

        let handle = *self.by_id.get(&id).ok_or(DomainError::ObjectNotFound(id))?;
        self.detach(handle, from);
        self.by_coordinate.entry(to).or_default().push(handle);
        let object = self.require_mut(id)?;
        object.coordinate = to;
        object.busy_until = busy_until;
        if let Some(direction) = from.direction_to(to) {
            object.direction = direction;
        }
        self.refresh_tile_override(from);
        self.refresh_tile_override(to);

        let mut events = vec![WorldEvent::ObjectMoved {
            spot_id: self.spot_id,
            object_id: id,
            from,
            to,
            busy_until,
        }];
        events.extend(self.check_area_triggers(id, Some(from), Some(to)));
        Ok(events)
    }

    /// Turn an object.
    pub fn set_direction(&mut self, id: WorldObjectId, direction: Direction) -> DomainResult<()> {
        self.require_mut(id)?.direction = direction;
        Ok(())
    }

    /// Keep an object busy until `until`.
    pub fn set_busy_until(&mut self, id: WorldObjectId, until: WorldTick) -> DomainResult<()> {
        self.require_mut(id)?.busy_until = until;
        Ok(())
    }

    fn detach(&mut self, handle: Handle, at: Coordinate) {
        if let Some(handles) = self.by_coordinate.get_mut(&at) {
            handles.retain(|h| *h != handle);
            if handles.is_empty() {
                self.by_coordinate.remove(&at);
            }
        }
    }

    fn refresh_tile_override(&mut self, at: Coordinate) {
        let blocked = self.objects_at(at).any(|o| o.is_blocking);
        if let Some(tile) = self.tiles.get_mut(&at) {
            tile.set_blocked_by_object(blocked);
        }
    }

    // -----------------------------------------------------------------------
    // Triggers
    // -----------------------------------------------------------------------

    /// Compare old and new membership for every named region.
    ///
    /// Area triggers fire on entry and on every check while the object stays
    /// inside; locations and gateways fire only on transitions.
    fn check_area_triggers(
        &self,
        id: WorldObjectId,
        old: Option<Coordinate>,
        new: Option<Coordinate>,
    ) -> Vec<WorldEvent> {
        let spot_id = self.spot_id;
        let mut events = Vec::new();

        for trigger in &self.area_triggers {
            let was_inside = trigger.area.contains_opt(old);
            let is_inside = trigger.area.contains_opt(new);
            if is_inside && !was_inside {
                events.push(WorldEvent::AreaEntered {
                    spot_id,
                    area_id: trigger.id,
                    object_id: id,
                });
            }
            if is_inside {
                events.push(WorldEvent::AreaTriggered {
                    spot_id,
                    area_id: trigger.id,
                    object_id: id,
                    effect: trigger.effect.clone(),
                });
            }
            if was_inside && !is_inside {
                events.push(WorldEvent::AreaExited {
                    spot_id,
                    area_id: trigger.id,
                    object_id: id,
                });
            }
        }

        for location in &self.location_areas {
            let was_inside = location.area.contains_opt(old);
            let is_inside = location.area.contains_opt(new);
            if is_inside && !was_inside {
                events.push(WorldEvent::LocationEntered {
                    spot_id,
                    area_id: location.id,
                    object_id: id,
                });
            } else if was_inside && !is_inside {
                events.push(WorldEvent::LocationExited {
                    spot_id,
                    area_id: location.id,
                    object_id: id,
                });
            }
        }

        for gateway in &self.gateways {
            if gateway.area.contains_opt(new) && !gateway.area.contains_opt(old) {
                events.push(WorldEvent::GatewayTriggered {
                    spot_id,
                    area_id: gateway.id,
                    object_id: id,
                    destination_spot: gateway.destination_spot,
                    landing: gateway.landing,
                });
            }
        }
        events
    }

    /// Re-fire area triggers for objects standing inside them, skipping `moved`.
    pub fn continuous_trigger_events(&self, moved: &HashSet<WorldObjectId>) -> Vec<WorldEvent> {
        let mut standing: Vec<&WorldObject> = self
            .objects()
            .filter(|o| !moved.contains(&o.id))
            .collect();
        standing.sort_by_key(|o| o.id);

        let mut events = Vec::new();
        for object in standing {
            for trigger in &self.area_triggers {
                if trigger.area.contains(object.coordinate) {
                    events.push(WorldEvent::AreaTriggered {
                        spot_id: self.spot_id,
                        area_id: trigger.id,
                        object_id: object.id,
                        effect: trigger.effect.clone(),
                    });
                }
            }
        }
        events
    }

    // -----------------------------------------------------------------------
    // Harvesting
    // -----------------------------------------------------------------------

    fn check_harvester(
        &self,
        actor_id: WorldObjectId,
        target_id: WorldObjectId,
    ) -> DomainResult<&WorldObject> {
        let actor = self
            .object(actor_id)
            .ok_or(DomainError::ObjectNotFound(actor_id))?;
        if actor.component.as_actor().is_none() {
            return Err(DomainError::NotAnActor(actor_id));
        }
        let target = self
            .object(target_id)
            .ok_or(DomainError::ObjectNotFound(target_id))?;
        if actor.facing_cell() != target.coordinate {
            return Err(DomainError::NotFacingTarget {
                actor: actor_id,
                target: target_id,
            });
        }
        Ok(actor)
    }

    fn harvestable_mut(
        &mut self,
        target_id: WorldObjectId,
    ) -> DomainResult<&mut crate::component::HarvestableComponent> {
        match &mut self.require_mut(target_id)?.component {
            ObjectComponent::Harvestable(node) => Ok(node),
            _ => Err(DomainError::NotHarvestable(target_id)),
        }
    }

    /// Begin harvesting the node the actor is facing. The actor stays busy until it completes.
    pub fn start_resource_harvest(
        &mut self,
        actor_id: WorldObjectId,
        target_id: WorldObjectId,
        now: WorldTick,
    ) -> DomainResult<Vec<WorldEvent>> {
        let actor = self.check_harvester(actor_id, target_id)?;
        if actor.is_busy(now) {
            return Err(DomainError::ActorBusy {
                object: actor_id,
                busy_until: actor.busy_until,
            });
        }
        let finishes_at = self
            .harvestable_mut(target_id)?
            .start(target_id, actor_id, now)?;
        self.set_busy_until(actor_id, finishes_at)?;
        Ok(vec![WorldEvent::HarvestStarted {
            spot_id: self.spot_id,
            actor_id,
            target_id,
            finishes_at,
        }])
    }

    /// Complete a harvest whose duration has elapsed.
    pub fn finish_resource_harvest(
        &mut self,
        actor_id: WorldObjectId,
        target_id: WorldObjectId,
        now: WorldTick,
    ) -> DomainResult<Vec<WorldEvent>> {
        self.check_harvester(actor_id, target_id)?;
        let node = self.harvestable_mut(target_id)?;
        let amount = node.finish(target_id, actor_id, now)?;
        let resource = node.resource.clone();
        Ok(vec![WorldEvent::HarvestCompleted {
            spot_id: self.spot_id,
            actor_id,
            target_id,
            resource,
            amount,
        }])
    }

    /// Abort a harvest and free the actor immediately.
    pub fn cancel_resource_harvest(
        &mut self,
        actor_id: WorldObjectId,
        target_id: WorldObjectId,
        now: WorldTick,
    ) -> DomainResult<Vec<WorldEvent>> {
        if self
            .object(actor_id)
            .ok_or(DomainError::ObjectNotFound(actor_id))?
            .component
            .as_actor()
            .is_none()
        {
            return Err(DomainError::NotAnActor(actor_id));
        }
        self.harvestable_mut(target_id)?
            .cancel(target_id, actor_id)?;
        self.set_busy_until(actor_id, now)?;
        Ok(vec![WorldEvent::HarvestCancelled {
            spot_id: self.spot_id,
            actor_id,
            target_id,
        }])
    }

    // -----------------------------------------------------------------------
    // Visibility
    // -----------------------------------------------------------------------

    /// Whether opaque terrain or a sight-blocking object lies strictly between two cells.
    /// Cells on different layers never see each other.
    pub fn is_sight_blocked(&self, from: Coordinate, to: Coordinate) -> bool {
        if from.z != to.z {
            return true;
        }
        line_between(from, to).into_iter().any(|cell| {
            match self.tiles.get(&cell) {
                None => true,
                Some(tile) if tile.terrain.blocks_sight() => true,
                Some(_) => self.objects_at(cell).any(|o| o.blocks_sight),
            }
        })
    }

    /// Vision distance after weather.
    pub fn max_vision_distance(&self, base_vision: u32) -> f64 {
        f64::from(base_vision) * self.weather.vision_multiplier()
    }

    /// Whether `to` is within weather-reduced range of `from` and not obstructed.
    pub fn is_visible(&self, from: Coordinate, to: Coordinate, base_vision: u32) -> bool {
        from.euclidean_distance(to) <= self.max_vision_distance(base_vision)
            && !self.is_sight_blocked(from, to)
    }
}

/// Planar Bresenham line, endpoints excluded.
fn line_between(from: Coordinate, to: Coordinate) -> Vec<Coordinate> {
    let dx = (to.x - from.x).abs();
    let dy = -(to.y - from.y).abs();
    let sx = if from.x < to.x { 1 } else { -1 };
    let sy = if from.y < to.y { 1 } else { -1 };
    let mut err = dx + dy;
    let (mut x, mut y) = (from.x, from.y);
    let mut cells = Vec::new();

    while (x, y) != (to.x, to.y) {
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
        if (x, y) != (to.x, to.y) {
            cells.push(Coordinate::new(x, y, from.z));
        }
    }
    cells
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::area::{Area, TriggerEffect};
    use crate::component::{ActorComponent, AutonomousBehaviorComponent, HarvestableComponent, InteractableComponent};
    use crate::ids::{AreaId, PlayerId};
    use crate::object::ObjectType;
    use crate::weather::WeatherType;

    fn grass_map() -> PhysicalMap {
        PhysicalMap::filled(SpotId::new(1), "Meadow", 5, 5, TerrainType::Grass)
    }

    fn player(id: u64, at: Coordinate) -> WorldObject {
        WorldObject::new(
            WorldObjectId::new(id),
            at,
            ObjectType::Player,
            ObjectComponent::Actor(ActorComponent::player(PlayerId::new(id))),
        )
    }

    fn monster(id: u64, at: Coordinate) -> WorldObject {
        WorldObject::new(
            WorldObjectId::new(id),
            at,
            ObjectType::Monster,
            ObjectComponent::AutonomousBehavior(AutonomousBehaviorComponent::default()),
        )
    }

    fn sign(id: u64, at: Coordinate) -> WorldObject {
        WorldObject::new(
            WorldObjectId::new(id),
            at,
            ObjectType::Sign,
            ObjectComponent::Interactable(InteractableComponent {
                kind: "sign".into(),
                payload: "Welcome".into(),
            }),
        )
    }

    #[test]
    fn add_rejects_duplicates_and_occupied_cells() {
        let mut map = grass_map();
        map.add_object(player(1, Coordinate::planar(1, 1))).unwrap();
        assert!(matches!(
            map.add_object(player(1, Coordinate::planar(2, 2))),
            Err(DomainError::DuplicateObject(_))
        ));
        assert!(matches!(
            map.add_object(monster(2, Coordinate::planar(1, 1))),
            Err(DomainError::InvalidPlacement { .. })
        ));
    }

    #[test]
    fn blocking_placement_fails_on_any_occupant() {
        let mut map = grass_map();
        map.add_object(sign(1, Coordinate::planar(1, 1))).unwrap();
        assert!(map.add_object(monster(2, Coordinate::planar(1, 1))).is_err());
    }

    #[test]
    fn non_blocking_placement_only_fails_on_blockers() {
        let mut map = grass_map();
        map.add_object(sign(1, Coordinate::planar(1, 1))).unwrap();
        map.add_object(sign(2, Coordinate::planar(1, 1))).unwrap();
        map.add_object(monster(3, Coordinate::planar(2, 2))).unwrap();
        assert!(map.add_object(sign(4, Coordinate::planar(2, 2))).is_err());
    }

    #[test]
    fn blocking_objects_maintain_tile_override() {
        let mut map = grass_map();
        let at = Coordinate::planar(1, 1);
        map.add_object(monster(1, at)).unwrap();
        assert_eq!(map.tile(at).unwrap().walkable_override(), Some(false));
        map.remove_object(WorldObjectId::new(1)).unwrap();
        assert_eq!(map.tile(at).unwrap().walkable_override(), None);
        assert_eq!(map.objects_at(at).count(), 0);
    }

    #[test]
    fn impassable_terrain_rejects_placement() {
        let mut map = grass_map();
        map.set_terrain(Coordinate::planar(0, 0), TerrainType::Wall).unwrap();
        assert!(map.add_object(player(1, Coordinate::planar(0, 0))).is_err());
        assert!(map.add_object(player(1, Coordinate::planar(9, 9))).is_err());
    }

    #[test]
    fn ghost_walk_bypasses_objects_not_terrain() {
        let mut map = grass_map();
        map.add_object(monster(1, Coordinate::planar(1, 1))).unwrap();
        map.set_terrain(Coordinate::planar(2, 2), TerrainType::Wall).unwrap();
        let ghost = Mover::new(MovementCapability::ghost(), false);
        assert!(map.is_passable(Coordinate::planar(1, 1), &ghost));
        assert!(!map.is_passable(
            Coordinate::planar(1, 1),
            &Mover::new(MovementCapability::walker(), false)
        ));
        assert!(!map.is_passable(Coordinate::planar(2, 2), &ghost));
    }

    #[test]
    fn blocking_ghost_needs_an_empty_cell() {
        let mut map = grass_map();
        map.add_object(monster(1, Coordinate::planar(1, 1))).unwrap();
        let ghost = Mover::new(MovementCapability::ghost(), true);
        assert!(!map.is_passable(Coordinate::planar(1, 1), &ghost));
        assert!(map.is_passable(Coordinate::planar(1, 2), &ghost));
        // passability and placement agree
        assert!(map
            .validate_placement(Coordinate::planar(1, 1), &ghost.capability, true, None)
            .is_err());
    }

    #[test]
    fn move_sets_busy_from_terrain_and_weather() {
        let mut map = grass_map();
        map.set_terrain(Coordinate::planar(1, 0), TerrainType::Swamp).unwrap();
        map.add_object(player(1, Coordinate::planar(0, 0))).unwrap();
        map.set_weather(WeatherState::new(WeatherType::Rain, 1.0));

        let events = map
            .move_object(
                WorldObjectId::new(1),
                Coordinate::planar(1, 0),
                &MovementCapability::walker(),
                WorldTick::new(10),
            )
            .unwrap();

        // swamp 2.0 * rain 1.2 = 2.4 -> 3 ticks
        let moved = map.object(WorldObjectId::new(1)).unwrap();
        assert_eq!(moved.busy_until, WorldTick::new(13));
        assert_eq!(moved.coordinate(), Coordinate::planar(1, 0));
        assert_eq!(moved.direction, Direction::East);
        assert!(matches!(events[0], WorldEvent::ObjectMoved { .. }));
        assert_eq!(map.objects_at(Coordinate::planar(0, 0)).count(), 0);
    }

    #[test]
    fn busy_objects_cannot_move() {
        let mut map = grass_map();
        map.add_object(player(1, Coordinate::planar(0, 0))).unwrap();
        map.set_busy_until(WorldObjectId::new(1), WorldTick::new(5)).unwrap();
        let result = map.move_object(
            WorldObjectId::new(1),
            Coordinate::planar(1, 0),
            &MovementCapability::walker(),
            WorldTick::new(4),
        );
        assert!(matches!(result, Err(DomainError::ActorBusy { .. })));
    }

    #[test]
    fn failed_move_is_a_movement_error() {
        let mut map = grass_map();
        map.add_object(player(1, Coordinate::planar(0, 0))).unwrap();
        map.add_object(monster(2, Coordinate::planar(1, 0))).unwrap();
        let result = map.move_object(
            WorldObjectId::new(1),
            Coordinate::planar(1, 0),
            &MovementCapability::walker(),
            WorldTick::ZERO,
        );
        assert!(matches!(result, Err(DomainError::InvalidMovement { .. })));
        assert_eq!(
            map.object(WorldObjectId::new(1)).unwrap().coordinate(),
            Coordinate::planar(0, 0)
        );
    }

    #[test]
    fn area_trigger_enters_refires_and_exits() {
        let mut map = grass_map();
        map.add_area_trigger(AreaTrigger {
            id: AreaId::new(1),
            name: "Thorns".into(),
            area: Area::rect(Coordinate::planar(1, 0), Coordinate::planar(2, 0)),
            effect: TriggerEffect::Damage { amount: 2 },
        });
        map.add_object(player(1, Coordinate::planar(0, 0))).unwrap();
        let walker = MovementCapability::walker();
        let id = WorldObjectId::new(1);

        let enter = map.move_object(id, Coordinate::planar(1, 0), &walker, WorldTick::new(1)).unwrap();
        assert!(enter.iter().any(|e| matches!(e, WorldEvent::AreaEntered { .. })));
        assert!(enter.iter().any(|e| matches!(e, WorldEvent::AreaTriggered { .. })));

        let stay = map.move_object(id, Coordinate::planar(2, 0), &walker, WorldTick::new(2)).unwrap();
        assert!(!stay.iter().any(|e| matches!(e, WorldEvent::AreaEntered { .. })));
        assert!(stay.iter().any(|e| matches!(e, WorldEvent::AreaTriggered { .. })));

        let leave = map.move_object(id, Coordinate::planar(3, 0), &walker, WorldTick::new(3)).unwrap();
        assert!(leave.iter().any(|e| matches!(e, WorldEvent::AreaExited { .. })));
        assert!(!leave.iter().any(|e| matches!(e, WorldEvent::AreaTriggered { .. })));
    }

    #[test]
    fn locations_and_gateways_fire_only_on_transition() {
        let mut map = grass_map();
        map.add_location_area(LocationArea {
            id: AreaId::new(1),
            name: "Village".into(),
            area: Area::rect(Coordinate::planar(1, 0), Coordinate::planar(2, 0)),
        });
        map.add_gateway(Gateway {
            id: AreaId::new(2),
            name: "Cave mouth".into(),
            area: Area::rect(Coordinate::planar(1, 0), Coordinate::planar(2, 0)),
            destination_spot: SpotId::new(2),
            landing: Coordinate::planar(0, 0),
        });
        map.add_object(player(1, Coordinate::planar(0, 0))).unwrap();
        let walker = MovementCapability::walker();
        let id = WorldObjectId::new(1);

        let enter = map.move_object(id, Coordinate::planar(1, 0), &walker, WorldTick::new(1)).unwrap();
        assert_eq!(enter.len(), 3);
        let stay = map.move_object(id, Coordinate::planar(2, 0), &walker, WorldTick::new(2)).unwrap();
        assert_eq!(stay.len(), 1);
    }

    #[test]
    fn continuous_triggers_skip_moved_objects() {
        let mut map = grass_map();
        map.add_area_trigger(AreaTrigger {
            id: AreaId::new(1),
            name: "Spring".into(),
            area: Area::cells([Coordinate::planar(0, 0), Coordinate::planar(1, 1)]),
            effect: TriggerEffect::Heal { amount: 1 },
        });
        map.add_object(player(1, Coordinate::planar(0, 0))).unwrap();
        map.add_object(player(2, Coordinate::planar(1, 1))).unwrap();

        let moved = HashSet::from([WorldObjectId::new(2)]);
        let events = map.continuous_trigger_events(&moved);
        assert_eq!(events.len(), 1);
        assert!(events[0].involves(WorldObjectId::new(1)));
    }

    #[test]
    fn harvest_requires_an_actor_facing_the_node() {
        let mut map = grass_map();
        map.add_object(player(1, Coordinate::planar(0, 0)).facing(Direction::East)).unwrap();
        map.add_object(
            WorldObject::new(
                WorldObjectId::new(2),
                Coordinate::planar(1, 0),
                ObjectType::Resource,
                ObjectComponent::Harvestable(HarvestableComponent::new("wood", 3, 4)),
            ),
        )
        .unwrap();
        map.add_object(monster(3, Coordinate::planar(2, 1))).unwrap();
        let (actor, node) = (WorldObjectId::new(1), WorldObjectId::new(2));

        assert!(matches!(
            map.start_resource_harvest(WorldObjectId::new(3), node, WorldTick::ZERO),
            Err(DomainError::NotAnActor(_))
        ));

        map.set_direction(actor, Direction::South).unwrap();
        assert!(matches!(
            map.start_resource_harvest(actor, node, WorldTick::ZERO),
            Err(DomainError::NotFacingTarget { .. })
        ));

        map.set_direction(actor, Direction::East).unwrap();
        map.start_resource_harvest(actor, node, WorldTick::new(10)).unwrap();
        assert_eq!(map.object(actor).unwrap().busy_until, WorldTick::new(14));

        let done = map.finish_resource_harvest(actor, node, WorldTick::new(14)).unwrap();
        assert!(matches!(
            &done[0],
            WorldEvent::HarvestCompleted { amount: 1, resource, .. } if resource == "wood"
        ));
    }

    #[test]
    fn facing_a_non_resource_is_not_harvestable() {
        let mut map = grass_map();
        map.add_object(player(1, Coordinate::planar(0, 0)).facing(Direction::East)).unwrap();
        map.add_object(sign(2, Coordinate::planar(1, 0))).unwrap();
        assert!(matches!(
            map.start_resource_harvest(WorldObjectId::new(1), WorldObjectId::new(2), WorldTick::ZERO),
            Err(DomainError::NotHarvestable(_))
        ));
    }

    #[test]
    fn cancel_frees_the_actor() {
        let mut map = grass_map();
        map.add_object(player(1, Coordinate::planar(0, 0)).facing(Direction::East)).unwrap();
        map.add_object(
            WorldObject::new(
                WorldObjectId::new(2),
                Coordinate::planar(1, 0),
                ObjectType::Resource,
                ObjectComponent::Harvestable(HarvestableComponent::new("wood", 3, 4)),
            ),
        )
        .unwrap();
        let (actor, node) = (WorldObjectId::new(1), WorldObjectId::new(2));
        map.start_resource_harvest(actor, node, WorldTick::new(1)).unwrap();
        map.cancel_resource_harvest(actor, node, WorldTick::new(2)).unwrap();
        assert!(!map.object(actor).unwrap().is_busy(WorldTick::new(2)));
    }

    #[test]
    fn sight_is_blocked_by_opaque_terrain_and_objects() {
        let mut map = grass_map();
        let from = Coordinate::planar(0, 2);
        let to = Coordinate::planar(4, 2);
        assert!(!map.is_sight_blocked(from, to));

        map.set_terrain(Coordinate::planar(2, 2), TerrainType::Forest).unwrap();
        assert!(map.is_sight_blocked(from, to));

        map.set_terrain(Coordinate::planar(2, 2), TerrainType::Grass).unwrap();
        map.add_object(monster(1, Coordinate::planar(3, 2)).with_sight_blocking(true))
            .unwrap();
        assert!(map.is_sight_blocked(from, to));
    }

    #[test]
    fn weather_shrinks_vision() {
        let mut map = grass_map();
        let from = Coordinate::planar(0, 0);
        let to = Coordinate::planar(4, 0);
        assert!(map.is_visible(from, to, 5));
        map.set_weather(WeatherState::new(WeatherType::Blizzard, 1.0));
        assert!(!map.is_visible(from, to, 5));
    }

    #[test]
    fn nearest_player_distance() {
        let mut map = grass_map();
        assert_eq!(map.distance_to_nearest_player(Coordinate::planar(0, 0)), None);
        map.add_object(player(1, Coordinate::planar(3, 4))).unwrap();
        map.add_object(player(2, Coordinate::planar(0, 1))).unwrap();
        let d = map.distance_to_nearest_player(Coordinate::planar(0, 0)).unwrap();
        assert!((d - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn line_between_excludes_endpoints() {
        let cells = line_between(Coordinate::planar(0, 0), Coordinate::planar(3, 0));
        assert_eq!(cells, vec![Coordinate::planar(1, 0), Coordinate::planar(2, 0)]);
        assert!(line_between(Coordinate::planar(0, 0), Coordinate::planar(1, 1)).len() <= 1);
    }
}
