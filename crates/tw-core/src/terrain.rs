use serde::{Deserialize, Serialize};

/// Ground type of a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerrainType {
    /// Open ground.
    Grass,
    /// Paved path.
    Road,
    /// Loose sand.
    Sand,
    /// Woodland; blocks line of sight.
    Forest,
    /// Boggy ground.
    Swamp,
    /// Snow cover.
    Snow,
    /// Wadeable water.
    ShallowWater,
    /// Swimmable water.
    DeepWater,
    /// Only fliers cross; blocks sight and projectiles.
    Mountain,
    /// Impassable for everyone.
    Wall,
    /// Only fliers cross.
    Lava,
}

impl TerrainType {
    /// Base movement cost in ticks before weather is applied.
    pub const fn base_cost(self) -> f64 {
        match self {
            Self::Grass | Self::Road | Self::Wall => 1.0,
            Self::Sand | Self::Forest | Self::Snow => 1.5,
            Self::Swamp | Self::ShallowWater | Self::Lava => 2.0,
            Self::DeepWater | Self::Mountain => 3.0,
        }
    }

    /// Whether an object with `capability` may stand on this terrain.
    pub const fn is_passable_for(self, capability: &MovementCapability) -> bool {
        match self {
            Self::Wall => false,
            Self::Mountain | Self::Lava => capability.fly,
            Self::DeepWater => capability.swim || capability.fly,
            Self::ShallowWater => capability.walk || capability.swim || capability.fly,
            Self::Grass | Self::Road | Self::Sand | Self::Forest | Self::Swamp | Self::Snow => {
                capability.walk || capability.fly
            }
        }
    }

    /// Whether this terrain blocks line of sight.
    pub const fn blocks_sight(self) -> bool {
        matches!(self, Self::Forest | Self::Mountain | Self::Wall)
    }

    /// Whether hitboxes treat this terrain as an obstacle.
    pub const fn is_hit_box_obstacle(self) -> bool {
        matches!(self, Self::Mountain | Self::Wall)
    }
}

/// How an object is able to move across terrain and objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MovementCapability {
    /// Can cross land.
    pub walk: bool,
    /// Can cross water.
    pub swim: bool,
    /// Can cross anything but walls.
    pub fly: bool,
    /// Ignores blocking objects. Terrain still applies.
    pub ghost_walk: bool,
}

impl MovementCapability {
    /// A land-bound walker.
    pub const fn walker() -> Self {
        Self {
            walk: true,
            swim: false,
            fly: false,
            ghost_walk: false,
        }
    }

    /// A walker that can also swim.
    pub const fn amphibious() -> Self {
        Self {
            swim: true,
            ..Self::walker()
        }
    }

    /// A flier.
    pub const fn flyer() -> Self {
        Self {
            fly: true,
            ..Self::walker()
        }
    }

    /// A walker that passes through blocking objects.
    pub const fn ghost() -> Self {
        Self {
            ghost_walk: true,
            ..Self::walker()
        }
    }
}

impl Default for MovementCapability {
    fn default() -> Self {
        Self::walker()
    }
}
