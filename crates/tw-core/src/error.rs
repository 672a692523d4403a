use crate::coordinate::Coordinate;
use crate::ids::{HitBoxId, MonsterId, WorldObjectId};
use crate::tick::WorldTick;

/// Alias for `Result<T, DomainError>`.
pub type DomainResult<T> = Result<T, DomainError>;

/// Invariant violations raised by aggregates.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DomainError {
    /// An object with this id is already on the map.
    #[error("object already exists: {0}")]
    DuplicateObject(WorldObjectId),

    /// The object is not on the map.
    #[error("object not found: {0}")]
    ObjectNotFound(WorldObjectId),

    /// The map has no tile at this coordinate.
    #[error("no tile at {0}")]
    TileNotFound(Coordinate),

    /// The object cannot be placed here.
    #[error("invalid placement at {coordinate}: {reason}")]
    InvalidPlacement {
        /// Rejected cell.
        coordinate: Coordinate,
        /// Why the cell was rejected.
        reason: String,
    },

    /// The object cannot move to the destination.
    #[error("{object} cannot move to {to}: {reason}")]
    InvalidMovement {
        /// Moving object.
        object: WorldObjectId,
        /// Rejected destination.
        to: Coordinate,
        /// Why the move was rejected.
        reason: String,
    },

    /// The object has no actor component.
    #[error("{0} is not an actor")]
    NotAnActor(WorldObjectId),

    /// The actor is not facing the target.
    #[error("{actor} is not facing {target}")]
    NotFacingTarget {
        /// Acting object.
        actor: WorldObjectId,
        /// Object it should face.
        target: WorldObjectId,
    },

    /// The actor is still busy.
    #[error("{object} is busy until tick {busy_until}")]
    ActorBusy {
        /// Busy object.
        object: WorldObjectId,
        /// First tick the object is free again.
        busy_until: WorldTick,
    },

    /// The target has nothing to harvest.
    #[error("{0} is not harvestable")]
    NotHarvestable(WorldObjectId),

    /// The harvest state machine rejected the transition.
    #[error("harvest on {target} rejected: {reason}")]
    HarvestStateConflict {
        /// Resource node.
        target: WorldObjectId,
        /// Why the transition was rejected.
        reason: String,
    },

    /// The harvest is not finished yet.
    #[error("harvest on {target} not ready until tick {ready_at}")]
    HarvestNotReady {
        /// Resource node.
        target: WorldObjectId,
        /// Tick the harvest completes.
        ready_at: WorldTick,
    },

    /// Not enough MP for the action.
    #[error("insufficient mp: need {required}, have {available}")]
    InsufficientMp {
        /// MP required.
        required: u32,
        /// MP available.
        available: u32,
    },

    /// The loadout has no skill in this slot.
    #[error("{owner} has no skill in slot {slot}")]
    SkillSlotNotFound {
        /// Loadout owner.
        owner: WorldObjectId,
        /// Requested slot.
        slot: usize,
    },

    /// The skill is still cooling down.
    #[error("skill slot {slot} of {owner} ready at tick {ready_at}")]
    SkillOnCooldown {
        /// Loadout owner.
        owner: WorldObjectId,
        /// Requested slot.
        slot: usize,
        /// Tick the slot is ready again.
        ready_at: WorldTick,
    },

    /// The monster is dead.
    #[error("{0} is not alive")]
    MonsterNotAlive(MonsterId),

    /// The monster cannot respawn yet.
    #[error("{monster} cannot respawn before tick {ready_at}")]
    RespawnNotReady {
        /// Dead monster.
        monster: MonsterId,
        /// First tick a respawn is allowed.
        ready_at: WorldTick,
    },

    /// The hitbox is in an unusable state.
    #[error("invalid hitbox {id}: {reason}")]
    InvalidHitBox {
        /// Hitbox.
        id: HitBoxId,
        /// What is wrong.
        reason: String,
    },
}
