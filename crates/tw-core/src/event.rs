use std::fmt;

use serde::{Deserialize, Serialize};

use crate::area::TriggerEffect;
use crate::coordinate::Coordinate;
use crate::ids::{AreaId, HitBoxId, MonsterId, PlayerId, SkillId, SpotId, WeatherZoneId, WorldObjectId};
use crate::tick::WorldTick;
use crate::weather::WeatherType;

/// Why a hitbox stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeactivationReason {
    /// Its duration ran out.
    Expired,
    /// It hit an obstacle under a deactivating policy.
    ObstacleCollision,
    /// It hit a target under a deactivating policy.
    TargetCollision,
    /// It outlived the global lifetime cap.
    MaxLifetime,
}

impl fmt::Display for DeactivationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Expired => write!(f, "expired"),
            Self::ObstacleCollision => write!(f, "obstacle_collision"),
            Self::TargetCollision => write!(f, "target_collision"),
            Self::MaxLifetime => write!(f, "max_lifetime"),
        }
    }
}

/// Something that happened to an aggregate.
///
/// Events are plain values so that identical events raised twice in one tick
/// compare equal and can be collapsed before publication.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorldEvent {
    // Map
    /// An object was placed on a map.
    ObjectAdded {
        /// Map.
        spot_id: SpotId,
        /// Placed object.
        object_id: WorldObjectId,
        /// Placement cell.
        at: Coordinate,
    },
    /// An object was taken off a map.
    ObjectRemoved {
        /// Map.
        spot_id: SpotId,
        /// Removed object.
        object_id: WorldObjectId,
        /// Last cell.
        at: Coordinate,
    },
    /// An object moved.
    ObjectMoved {
        /// Map.
        spot_id: SpotId,
        /// Moving object.
        object_id: WorldObjectId,
        /// Origin cell.
        from: Coordinate,
        /// Destination cell.
        to: Coordinate,
        /// Tick the object is free again.
        busy_until: WorldTick,
    },
    /// An object entered an area trigger.
    AreaEntered {
        /// Map.
        spot_id: SpotId,
        /// Trigger area.
        area_id: AreaId,
        /// Entering object.
        object_id: WorldObjectId,
    },
    /// An object left an area trigger.
    AreaExited {
        /// Map.
        spot_id: SpotId,
        /// Trigger area.
        area_id: AreaId,
        /// Leaving object.
        object_id: WorldObjectId,
    },
    /// An area trigger fired for an object inside it.
    AreaTriggered {
        /// Map.
        spot_id: SpotId,
        /// Trigger area.
        area_id: AreaId,
        /// Affected object.
        object_id: WorldObjectId,
        /// Effect applied.
        effect: TriggerEffect,
    },
    /// An object entered a named location.
    LocationEntered {
        /// Map.
        spot_id: SpotId,
        /// Location area.
        area_id: AreaId,
        /// Entering object.
        object_id: WorldObjectId,
    },
    /// An object left a named location.
    LocationExited {
        /// Map.
        spot_id: SpotId,
        /// Location area.
        area_id: AreaId,
        /// Leaving object.
        object_id: WorldObjectId,
    },
    /// An object stepped into a gateway.
    GatewayTriggered {
        /// Map.
        spot_id: SpotId,
        /// Gateway area.
        area_id: AreaId,
        /// Travelling object.
        object_id: WorldObjectId,
        /// Spot the gateway leads to.
        destination_spot: SpotId,
        /// Arrival cell in the destination spot.
        landing: Coordinate,
    },

    // Harvesting
    /// An actor began harvesting.
    HarvestStarted {
        /// Map.
        spot_id: SpotId,
        /// Harvesting actor.
        actor_id: WorldObjectId,
        /// Resource node.
        target_id: WorldObjectId,
        /// Tick the harvest completes.
        finishes_at: WorldTick,
    },
    /// A harvest finished.
    HarvestCompleted {
        /// Map.
        spot_id: SpotId,
        /// Harvesting actor.
        actor_id: WorldObjectId,
        /// Resource node.
        target_id: WorldObjectId,
        /// Item gathered.
        resource: String,
        /// Units gathered.
        amount: u32,
    },
    /// A harvest was cancelled.
    HarvestCancelled {
        /// Map.
        spot_id: SpotId,
        /// Harvesting actor.
        actor_id: WorldObjectId,
        /// Resource node.
        target_id: WorldObjectId,
    },

    // Combat
    /// An actor used a skill.
    SkillUsed {
        /// Map.
        spot_id: SpotId,
        /// Caster.
        actor_id: WorldObjectId,
        /// Skill used.
        skill_id: SkillId,
        /// Loadout slot.
        slot_index: usize,
    },
    /// A hitbox was created.
    HitBoxSpawned {
        /// Map.
        spot_id: SpotId,
        /// New hitbox.
        hit_box_id: HitBoxId,
        /// Owner.
        owner_id: WorldObjectId,
        /// Spawn cell.
        at: Coordinate,
    },
    /// A hitbox crossed into a new cell.
    HitBoxMoved {
        /// Hitbox.
        hit_box_id: HitBoxId,
        /// Previous cell.
        from: Coordinate,
        /// New cell.
        to: Coordinate,
    },
    /// A hitbox touched an obstacle cell.
    HitBoxObstacleCollided {
        /// Hitbox.
        hit_box_id: HitBoxId,
        /// Obstacle cell.
        at: Coordinate,
    },
    /// A hitbox hit a target.
    HitBoxTargetHit {
        /// Map.
        spot_id: SpotId,
        /// Hitbox.
        hit_box_id: HitBoxId,
        /// Owner.
        owner_id: WorldObjectId,
        /// Hit object.
        target_id: WorldObjectId,
        /// Damage carried.
        power: u32,
    },
    /// A hitbox stopped for good.
    HitBoxDeactivated {
        /// Hitbox.
        hit_box_id: HitBoxId,
        /// Why it stopped.
        reason: DeactivationReason,
    },

    // Environment
    /// A weather zone changed weather type.
    WeatherChanged {
        /// Zone.
        zone_id: WeatherZoneId,
        /// Previous type.
        from: WeatherType,
        /// New type.
        to: WeatherType,
    },
    /// Weather drained a player's stamina.
    StaminaDrained {
        /// Player.
        player_id: PlayerId,
        /// Stamina lost.
        amount: u32,
        /// Stamina left.
        remaining: u32,
    },

    // Life cycle
    /// A player took damage.
    PlayerDamaged {
        /// Player.
        player_id: PlayerId,
        /// HP lost.
        amount: u32,
        /// HP left.
        remaining_hp: u32,
    },
    /// A monster took damage.
    MonsterDamaged {
        /// Monster.
        monster_id: MonsterId,
        /// HP lost.
        amount: u32,
        /// HP left.
        remaining_hp: u32,
    },
    /// A monster died.
    MonsterDied {
        /// Monster.
        monster_id: MonsterId,
        /// Map it died on.
        spot_id: SpotId,
        /// Tick of death.
        at: WorldTick,
    },
    /// A monster came back to life.
    MonsterRespawned {
        /// Monster.
        monster_id: MonsterId,
        /// Map it respawned on.
        spot_id: SpotId,
        /// Spawn cell.
        at: Coordinate,
    },
}

impl WorldEvent {
    /// Check whether a given world object is involved in this event.
    pub fn involves(&self, id: WorldObjectId) -> bool {
        match self {
            Self::ObjectAdded { object_id, .. }
            | Self::ObjectRemoved { object_id, .. }
            | Self::ObjectMoved { object_id, .. }
            | Self::AreaEntered { object_id, .. }
            | Self::AreaExited { object_id, .. }
            | Self::AreaTriggered { object_id, .. }
            | Self::LocationEntered { object_id, .. }
            | Self::LocationExited { object_id, .. }
            | Self::GatewayTriggered { object_id, .. } => *object_id == id,
            Self::HarvestStarted {
                actor_id,
                target_id,
                ..
            }
            | Self::HarvestCompleted {
                actor_id,
                target_id,
                ..
            }
            | Self::HarvestCancelled {
                actor_id,
                target_id,
                ..
            } => *actor_id == id || *target_id == id,
            Self::SkillUsed { actor_id, .. } => *actor_id == id,
            Self::HitBoxSpawned { owner_id, .. } => *owner_id == id,
            Self::HitBoxTargetHit {
                owner_id,
                target_id,
                ..
            } => *owner_id == id || *target_id == id,
            Self::HitBoxMoved { .. }
            | Self::HitBoxObstacleCollided { .. }
            | Self::HitBoxDeactivated { .. }
            | Self::WeatherChanged { .. }
            | Self::StaminaDrained { .. }
            | Self::PlayerDamaged { .. }
            | Self::MonsterDamaged { .. }
            | Self::MonsterDied { .. }
            | Self::MonsterRespawned { .. } => false,
        }
    }
}
