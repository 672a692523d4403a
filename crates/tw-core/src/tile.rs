use serde::{Deserialize, Serialize};

use crate::coordinate::Coordinate;
use crate::terrain::{MovementCapability, TerrainType};

/// A single cell of a physical map.
///
/// The walkability override mirrors blocking objects placed on the tile so
/// that terrain itself never has to change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    /// Where the tile sits.
    pub coordinate: Coordinate,
    /// Ground type.
    pub terrain: TerrainType,
    walkable_override: Option<bool>,
}

impl Tile {
    /// Create a tile with no override.
    pub fn new(coordinate: Coordinate, terrain: TerrainType) -> Self {
        Self {
            coordinate,
            terrain,
            walkable_override: None,
        }
    }

    /// Current override, `Some(false)` while a blocking object stands here.
    pub fn walkable_override(&self) -> Option<bool> {
        self.walkable_override
    }

    /// Mark the tile as blocked or clear the override.
    pub fn set_blocked_by_object(&mut self, blocked: bool) {
        self.walkable_override = if blocked { Some(false) } else { None };
    }

    /// Whether `capability` can enter this tile considering terrain and the override.
    pub fn is_walkable_for(&self, capability: &MovementCapability) -> bool {
        if !self.terrain.is_passable_for(capability) {
            return false;
        }
        capability.ghost_walk || self.walkable_override != Some(false)
    }
}
