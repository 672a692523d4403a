use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::coordinate::Coordinate;
use crate::ids::{AreaId, SpotId};

/// A set of cells on a map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Area {
    /// Inclusive axis-aligned box.
    Rect {
        /// Lowest corner.
        min: Coordinate,
        /// Highest corner.
        max: Coordinate,
    },
    /// Explicit cell list.
    Cells(BTreeSet<Coordinate>),
}

impl Area {
    /// Build a box area from two corners in any order.
    pub fn rect(a: Coordinate, b: Coordinate) -> Self {
        Self::Rect {
            min: Coordinate::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: Coordinate::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    /// Build an area from individual cells.
    pub fn cells(cells: impl IntoIterator<Item = Coordinate>) -> Self {
        Self::Cells(cells.into_iter().collect())
    }

    /// Whether the coordinate lies inside.
    pub fn contains(&self, c: Coordinate) -> bool {
        match self {
            Self::Rect { min, max } => {
                (min.x..=max.x).contains(&c.x)
                    && (min.y..=max.y).contains(&c.y)
                    && (min.z..=max.z).contains(&c.z)
            }
            Self::Cells(cells) => cells.contains(&c),
        }
    }

    /// Whether an optional coordinate lies inside. `None` is never inside.
    pub fn contains_opt(&self, c: Option<Coordinate>) -> bool {
        c.is_some_and(|c| self.contains(c))
    }
}

/// What an area trigger does while something stands in it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerEffect {
    /// Deal damage each activation.
    Damage {
        /// HP removed per activation.
        amount: u32,
    },
    /// Restore HP each activation.
    Heal {
        /// HP restored per activation.
        amount: u32,
    },
    /// Show a message.
    Message(String),
}

/// A region whose effect re-fires every tick something stays inside.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaTrigger {
    /// Area identifier.
    pub id: AreaId,
    /// Display name.
    pub name: String,
    /// Covered cells.
    pub area: Area,
    /// Effect carried by every activation.
    pub effect: TriggerEffect,
}

/// A named place. Fires only on entering and leaving.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationArea {
    /// Area identifier.
    pub id: AreaId,
    /// Display name.
    pub name: String,
    /// Covered cells.
    pub area: Area,
}

/// A portal into another spot. Fires only on entering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gateway {
    /// Area identifier.
    pub id: AreaId,
    /// Display name.
    pub name: String,
    /// Covered cells.
    pub area: Area,
    /// Spot the gateway leads to.
    pub destination_spot: SpotId,
    /// Where travellers arrive in the destination spot.
    pub landing: Coordinate,
}
