use serde::{Deserialize, Serialize};

use crate::coordinate::Coordinate;
use crate::error::{DomainError, DomainResult};
use crate::ids::{PlayerId, WorldObjectId};
use crate::terrain::MovementCapability;
use crate::tick::WorldTick;

/// The single component attached to every world object.
///
/// The variant decides what the object takes part in: actors and autonomous
/// objects are scheduled each tick, harvestables can be gathered and
/// interactables are passive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectComponent {
    /// Player- or script-controlled actor.
    Actor(ActorComponent),
    /// AI-driven actor.
    AutonomousBehavior(AutonomousBehaviorComponent),
    /// Passive object with an interaction.
    Interactable(InteractableComponent),
    /// Resource node that can be gathered.
    Harvestable(HarvestableComponent),
}

impl ObjectComponent {
    /// Movement capability of the owning object.
    pub fn capability(&self) -> MovementCapability {
        match self {
            Self::Actor(actor) => actor.capability,
            Self::AutonomousBehavior(ai) => ai.capability,
            Self::Interactable(_) | Self::Harvestable(_) => MovementCapability::walker(),
        }
    }

    /// Controlling player, if any.
    pub fn player_id(&self) -> Option<PlayerId> {
        match self {
            Self::Actor(actor) => actor.player_id,
            Self::AutonomousBehavior(_) | Self::Interactable(_) | Self::Harvestable(_) => None,
        }
    }

    /// Whether the owning object takes part in per-tick planning.
    pub fn is_schedulable(&self) -> bool {
        matches!(self, Self::Actor(_) | Self::AutonomousBehavior(_))
    }

    /// The autonomous behaviour component, if this is one.
    pub fn as_autonomous(&self) -> Option<&AutonomousBehaviorComponent> {
        match self {
            Self::AutonomousBehavior(ai) => Some(ai),
            _ => None,
        }
    }

    /// Mutable autonomous behaviour component, if this is one.
    pub fn as_autonomous_mut(&mut self) -> Option<&mut AutonomousBehaviorComponent> {
        match self {
            Self::AutonomousBehavior(ai) => Some(ai),
            _ => None,
        }
    }

    /// The actor component, if this is one.
    pub fn as_actor(&self) -> Option<&ActorComponent> {
        match self {
            Self::Actor(actor) => Some(actor),
            _ => None,
        }
    }

    /// Mutable actor component, if this is one.
    pub fn as_actor_mut(&mut self) -> Option<&mut ActorComponent> {
        match self {
            Self::Actor(actor) => Some(actor),
            _ => None,
        }
    }
}

/// An actor driven by a player (or by scripts when `player_id` is `None`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActorComponent {
    /// Controlling player.
    pub player_id: Option<PlayerId>,
    /// How the actor moves.
    pub capability: MovementCapability,
    /// Queued auto-move destination.
    pub destination: Option<Coordinate>,
}

impl ActorComponent {
    /// An actor controlled by `player`.
    pub fn player(player: PlayerId) -> Self {
        Self {
            player_id: Some(player),
            ..Self::default()
        }
    }
}

/// AI state machine states.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BehaviorState {
    /// Nothing to do.
    #[default]
    Idle,
    /// Walking a patrol route.
    Patrol,
    /// Pursuing a target.
    Chase,
    /// Running from a target.
    Flee,
    /// Using a skill on a target.
    Attack,
}

/// When an autonomous actor is awake.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActiveTime {
    /// Always active.
    #[default]
    Always,
    /// Active during the day.
    Diurnal,
    /// Active during the night.
    Nocturnal,
}

/// Whether an autonomous actor seeks out players on sight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// Only fights back against recorded threat.
    #[default]
    Passive,
    /// Targets the nearest visible player.
    Aggressive,
}

/// How long an actor remembers who attacked it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AggroMemoryPolicy {
    /// Entries unseen for longer than this are forgotten. `None` never forgets.
    pub forget_after_ticks: Option<u64>,
}

impl AggroMemoryPolicy {
    /// A policy forgetting after `ticks`.
    pub const fn forget_after(ticks: u64) -> Self {
        Self {
            forget_after_ticks: Some(ticks),
        }
    }

    /// Whether an entry last seen at `last_seen` is still remembered at `now`.
    pub fn remembers(&self, last_seen: WorldTick, now: WorldTick) -> bool {
        self.forget_after_ticks
            .is_none_or(|limit| now.since(last_seen) <= limit)
    }
}

/// AI-driven actor state and tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutonomousBehaviorComponent {
    /// Current state machine state.
    pub state: BehaviorState,
    /// Vision range in cells before weather.
    pub vision_range: u32,
    /// Patrol route, visited in order and looped.
    pub patrol_points: Vec<Coordinate>,
    /// Index of the next patrol point.
    pub patrol_index: usize,
    /// How the actor moves.
    pub capability: MovementCapability,
    /// When the actor is awake.
    pub active_time: ActiveTime,
    /// Whether the actor seeks players on sight.
    pub disposition: Disposition,
    /// Threat memory policy.
    pub aggro_policy: AggroMemoryPolicy,
    /// HP ratio at or below which the actor flees.
    pub flee_hp_ratio: f64,
    /// Current target.
    pub target: Option<WorldObjectId>,
}

impl Default for AutonomousBehaviorComponent {
    fn default() -> Self {
        Self {
            state: BehaviorState::Idle,
            vision_range: 5,
            patrol_points: Vec::new(),
            patrol_index: 0,
            capability: MovementCapability::walker(),
            active_time: ActiveTime::Always,
            disposition: Disposition::Passive,
            aggro_policy: AggroMemoryPolicy::default(),
            flee_hp_ratio: 0.0,
            target: None,
        }
    }
}

impl AutonomousBehaviorComponent {
    /// The current patrol goal, if a route exists.
    pub fn current_patrol_point(&self) -> Option<Coordinate> {
        if self.patrol_points.is_empty() {
            return None;
        }
        self.patrol_points
            .get(self.patrol_index % self.patrol_points.len())
            .copied()
    }

    /// Move on to the next patrol point.
    pub fn advance_patrol(&mut self) {
        if !self.patrol_points.is_empty() {
            self.patrol_index = (self.patrol_index + 1) % self.patrol_points.len();
        }
    }
}

/// A passive object players can interact with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractableComponent {
    /// Interaction kind, e.g. "door" or "sign".
    pub kind: String,
    /// Free-form payload shown or used on interaction.
    pub payload: String,
}

/// Harvest state machine: `Idle -> Harvesting -> {Completed, Cancelled}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HarvestState {
    /// Nobody is harvesting.
    #[default]
    Idle,
    /// An actor is harvesting.
    Harvesting {
        /// Who is harvesting.
        actor: WorldObjectId,
        /// When harvesting began.
        started_at: WorldTick,
        /// When the harvest can be finished.
        finishes_at: WorldTick,
    },
    /// The last harvest finished.
    Completed,
    /// The last harvest was cancelled.
    Cancelled,
}

/// A resource node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarvestableComponent {
    /// Item produced.
    pub resource: String,
    /// Units left to gather.
    pub remaining: u32,
    /// Units produced by one harvest.
    pub yield_per_harvest: u32,
    /// Ticks one harvest takes.
    pub harvest_duration_ticks: u64,
    state: HarvestState,
}

impl HarvestableComponent {
    /// Create an idle resource node.
    pub fn new(resource: impl Into<String>, remaining: u32, harvest_duration_ticks: u64) -> Self {
        Self {
            resource: resource.into(),
            remaining,
            yield_per_harvest: 1,
            harvest_duration_ticks,
            state: HarvestState::Idle,
        }
    }

    /// Current harvest state.
    pub fn state(&self) -> HarvestState {
        self.state
    }

    /// Begin harvesting. Completed and cancelled nodes may be harvested again while stock remains.
    pub fn start(
        &mut self,
        node: WorldObjectId,
        actor: WorldObjectId,
        now: WorldTick,
    ) -> DomainResult<WorldTick> {
        if matches!(self.state, HarvestState::Harvesting { .. }) {
            return Err(DomainError::HarvestStateConflict {
                target: node,
                reason: "already being harvested".into(),
            });
        }
        if self.remaining == 0 {
            return Err(DomainError::NotHarvestable(node));
        }
        let finishes_at = now.plus(self.harvest_duration_ticks);
        self.state = HarvestState::Harvesting {
            actor,
            started_at: now,
            finishes_at,
        };
        Ok(finishes_at)
    }

    /// Finish a harvest begun by `actor`. Returns the amount gathered.
    pub fn finish(
        &mut self,
        node: WorldObjectId,
        actor: WorldObjectId,
        now: WorldTick,
    ) -> DomainResult<u32> {
        let HarvestState::Harvesting {
            actor: harvester,
            finishes_at,
            ..
        } = self.state
        else {
            return Err(DomainError::HarvestStateConflict {
                target: node,
                reason: "no harvest in progress".into(),
            });
        };
        if harvester != actor {
            return Err(DomainError::HarvestStateConflict {
                target: node,
                reason: format!("harvest belongs to {harvester}"),
            });
        }
        if now < finishes_at {
            return Err(DomainError::HarvestNotReady {
                target: node,
                ready_at: finishes_at,
            });
        }
        let amount = self.yield_per_harvest.min(self.remaining);
        self.remaining -= amount;
        self.state = HarvestState::Completed;
        Ok(amount)
    }

    /// Cancel a harvest begun by `actor`.
    pub fn cancel(&mut self, node: WorldObjectId, actor: WorldObjectId) -> DomainResult<()> {
        match self.state {
            HarvestState::Harvesting {
                actor: harvester, ..
            } if harvester == actor => {
                self.state = HarvestState::Cancelled;
                Ok(())
            }
            _ => Err(DomainError::HarvestStateConflict {
                target: node,
                reason: "no harvest in progress for this actor".into(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node() -> WorldObjectId {
        WorldObjectId::new(10)
    }

    #[test]
    fn harvest_runs_through_its_states() {
        let actor = WorldObjectId::new(1);
        let mut ore = HarvestableComponent::new("iron_ore", 2, 3);
        let ready = ore.start(node(), actor, WorldTick::new(10)).unwrap();
        assert_eq!(ready, WorldTick::new(13));
        assert!(matches!(ore.finish(node(), actor, WorldTick::new(12)), Err(DomainError::HarvestNotReady { .. })));
        assert_eq!(ore.finish(node(), actor, WorldTick::new(13)).unwrap(), 1);
        assert_eq!(ore.state(), HarvestState::Completed);
        assert_eq!(ore.remaining, 1);
    }

    #[test]
    fn harvest_cannot_start_twice() {
        let mut ore = HarvestableComponent::new("iron_ore", 2, 3);
        ore.start(node(), WorldObjectId::new(1), WorldTick::ZERO).unwrap();
        assert!(ore.start(node(), WorldObjectId::new(2), WorldTick::ZERO).is_err());
    }

    #[test]
    fn only_the_harvester_may_cancel() {
        let mut ore = HarvestableComponent::new("herb", 1, 2);
        ore.start(node(), WorldObjectId::new(1), WorldTick::ZERO).unwrap();
        assert!(ore.cancel(node(), WorldObjectId::new(2)).is_err());
        ore.cancel(node(), WorldObjectId::new(1)).unwrap();
        assert_eq!(ore.state(), HarvestState::Cancelled);
    }

    #[test]
    fn depleted_node_is_not_harvestable() {
        let mut ore = HarvestableComponent::new("herb", 0, 2);
        assert!(matches!(
            ore.start(node(), WorldObjectId::new(1), WorldTick::ZERO),
            Err(DomainError::NotHarvestable(_))
        ));
    }

    #[test]
    fn aggro_policy_forgets_old_entries() {
        let policy = AggroMemoryPolicy::forget_after(10);
        assert!(policy.remembers(WorldTick::new(5), WorldTick::new(15)));
        assert!(!policy.remembers(WorldTick::new(5), WorldTick::new(16)));
        assert!(AggroMemoryPolicy::default().remembers(WorldTick::ZERO, WorldTick::new(1_000)));
    }

    #[test]
    fn patrol_wraps_around() {
        let mut ai = AutonomousBehaviorComponent {
            patrol_points: vec![Coordinate::planar(0, 0), Coordinate::planar(3, 0)],
            ..Default::default()
        };
        assert_eq!(ai.current_patrol_point(), Some(Coordinate::planar(0, 0)));
        ai.advance_patrol();
        ai.advance_patrol();
        assert_eq!(ai.current_patrol_point(), Some(Coordinate::planar(0, 0)));
    }
}
