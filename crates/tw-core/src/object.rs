use serde::{Deserialize, Serialize};

use crate::component::ObjectComponent;
use crate::coordinate::{Coordinate, Direction};
use crate::ids::{PlayerId, WorldObjectId};
use crate::terrain::MovementCapability;
use crate::tick::WorldTick;

/// What an object is, independent of how it behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectType {
    /// A player character.
    Player,
    /// A non-player character.
    Npc,
    /// A monster.
    Monster,
    /// A resource node.
    Resource,
    /// A chest.
    Chest,
    /// A door.
    Door,
    /// A sign.
    Sign,
    /// Scenery that blocks movement.
    Obstacle,
}

impl ObjectType {
    /// Whether objects of this type block their cell by default.
    pub const fn blocks_by_default(self) -> bool {
        !matches!(self, Self::Sign)
    }
}

/// How an object enters cells: its terrain capability and whether it claims
/// the cell exclusively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Mover {
    /// Terrain and ghost-walk capability.
    pub capability: MovementCapability,
    /// A blocking mover needs an empty cell, ghost walk or not.
    pub is_blocking: bool,
}

impl Mover {
    /// Bundle a capability with a blocking flag.
    pub const fn new(capability: MovementCapability, is_blocking: bool) -> Self {
        Self {
            capability,
            is_blocking,
        }
    }
}

/// Something placed on a physical map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldObject {
    /// Identifier, unique per map.
    pub id: WorldObjectId,
    /// Current cell. Only the map may change it.
    pub(crate) coordinate: Coordinate,
    /// Facing.
    pub direction: Direction,
    /// Kind of object.
    pub object_type: ObjectType,
    /// Whether the object occupies its cell exclusively.
    pub is_blocking: bool,
    /// Whether the object blocks line of sight.
    pub blocks_sight: bool,
    /// The object may not act again before this tick.
    pub busy_until: WorldTick,
    /// Behaviour attached to the object.
    pub component: ObjectComponent,
}

impl WorldObject {
    /// Create an object with type-default blocking and no sight blocking.
    pub fn new(
        id: WorldObjectId,
        coordinate: Coordinate,
        object_type: ObjectType,
        component: ObjectComponent,
    ) -> Self {
        Self {
            id,
            coordinate,
            direction: Direction::default(),
            object_type,
            is_blocking: object_type.blocks_by_default(),
            blocks_sight: false,
            busy_until: WorldTick::ZERO,
            component,
        }
    }

    /// Override blocking.
    pub fn with_blocking(mut self, is_blocking: bool) -> Self {
        self.is_blocking = is_blocking;
        self
    }

    /// Override sight blocking.
    pub fn with_sight_blocking(mut self, blocks_sight: bool) -> Self {
        self.blocks_sight = blocks_sight;
        self
    }

    /// Set the initial facing.
    pub fn facing(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Current cell.
    pub fn coordinate(&self) -> Coordinate {
        self.coordinate
    }

    /// Whether the object is still busy at `now`.
    pub fn is_busy(&self, now: WorldTick) -> bool {
        self.busy_until > now
    }

    /// Movement capability from the component.
    pub fn capability(&self) -> MovementCapability {
        self.component.capability()
    }

    /// Capability and blocking flag, as placement sees them.
    pub fn mover(&self) -> Mover {
        Mover::new(self.capability(), self.is_blocking)
    }

    /// Controlling player, if any.
    pub fn player_id(&self) -> Option<PlayerId> {
        self.component.player_id()
    }

    /// Whether a player controls this object.
    pub fn is_player(&self) -> bool {
        self.player_id().is_some()
    }

    /// The cell this object is facing.
    pub fn facing_cell(&self) -> Coordinate {
        self.coordinate.step(self.direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{ActorComponent, AutonomousBehaviorComponent};

    #[test]
    fn busy_window_is_exclusive_of_its_end() {
        let mut obj = WorldObject::new(
            WorldObjectId::new(1),
            Coordinate::planar(0, 0),
            ObjectType::Npc,
            ObjectComponent::AutonomousBehavior(AutonomousBehaviorComponent::default()),
        );
        obj.busy_until = WorldTick::new(5);
        assert!(obj.is_busy(WorldTick::new(4)));
        assert!(!obj.is_busy(WorldTick::new(5)));
    }

    #[test]
    fn player_objects_expose_their_player() {
        let obj = WorldObject::new(
            WorldObjectId::new(1),
            Coordinate::planar(0, 0),
            ObjectType::Player,
            ObjectComponent::Actor(ActorComponent::player(PlayerId::new(9))),
        );
        assert!(obj.is_player());
        assert_eq!(obj.player_id(), Some(PlayerId::new(9)));
        assert!(obj.is_blocking);
    }

    #[test]
    fn facing_cell_follows_direction() {
        let obj = WorldObject::new(
            WorldObjectId::new(1),
            Coordinate::planar(2, 2),
            ObjectType::Sign,
            ObjectComponent::Actor(ActorComponent::default()),
        )
        .facing(Direction::West);
        assert_eq!(obj.facing_cell(), Coordinate::planar(1, 2));
        assert!(!obj.is_blocking);
    }
}
