use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::coordinate::Coordinate;
use crate::event::{DeactivationReason, WorldEvent};
use crate::ids::{HitBoxId, SpotId, WorldObjectId};
use crate::tick::WorldTick;

/// What a hitbox does when it collides with something.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionPolicy {
    /// Keep moving.
    PassThrough,
    /// Stop immediately.
    #[default]
    Deactivate,
}

/// Cells a hitbox covers around its current coordinate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HitBoxShape {
    /// The current cell only.
    #[default]
    Point,
    /// A filled square of the given radius.
    Square {
        /// Cells from the centre to each edge.
        radius: u32,
    },
    /// A plus sign of the given arm length.
    Cross {
        /// Arm length.
        radius: u32,
    },
}

impl HitBoxShape {
    /// Covered cells, centre first.
    pub fn cells(&self, center: Coordinate) -> Vec<Coordinate> {
        let mut cells = vec![center];
        match *self {
            Self::Point => {}
            Self::Square { radius } => {
                let r = i32::try_from(radius).unwrap_or(i32::MAX);
                for dy in -r..=r {
                    for dx in -r..=r {
                        if (dx, dy) != (0, 0) {
                            cells.push(center.offset(dx, dy, 0));
                        }
                    }
                }
            }
            Self::Cross { radius } => {
                let r = i32::try_from(radius).unwrap_or(i32::MAX);
                for d in 1..=r {
                    cells.push(center.offset(0, -d, 0));
                    cells.push(center.offset(d, 0, 0));
                    cells.push(center.offset(0, d, 0));
                    cells.push(center.offset(-d, 0, 0));
                }
            }
        }
        cells
    }
}

/// Fractional position of a hitbox.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PrecisePosition {
    /// Column.
    pub x: f64,
    /// Row.
    pub y: f64,
    /// Layer.
    pub z: f64,
}

impl PrecisePosition {
    /// Create a position.
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// The centre of a cell.
    pub fn centered_in(cell: Coordinate) -> Self {
        Self {
            x: f64::from(cell.x) + 0.5,
            y: f64::from(cell.y) + 0.5,
            z: f64::from(cell.z) + 0.5,
        }
    }

    /// The cell containing this position.
    pub fn floor(&self) -> Coordinate {
        Coordinate::from_floored(self.x, self.y, self.z)
    }
}

/// Cells per tick along each axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    /// Column speed.
    pub dx: f64,
    /// Row speed.
    pub dy: f64,
    /// Layer speed.
    pub dz: f64,
}

impl Velocity {
    /// Standing still.
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    /// Create a velocity.
    pub const fn new(dx: f64, dy: f64, dz: f64) -> Self {
        Self { dx, dy, dz }
    }

    /// This velocity multiplied by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        Self::new(self.dx * factor, self.dy * factor, self.dz * factor)
    }

    /// Largest absolute speed along any axis.
    pub fn max_axis_speed(&self) -> f64 {
        self.dx.abs().max(self.dy.abs()).max(self.dz.abs())
    }

    /// Whether the hitbox moves at all.
    pub fn is_zero(&self) -> bool {
        self.max_axis_speed() == 0.0
    }
}

/// Life-cycle state, derived from the tick and the active flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HitBoxStatus {
    /// Waiting for its activation tick.
    Pending,
    /// Moving and colliding.
    Active,
    /// Finished for good.
    Deactivated,
}

/// An independently moving collision volume such as a projectile or a swing.
///
/// `current_coordinate` always equals the floor of `precise_position`; only
/// [`HitBox::advance`] moves the hitbox and it updates both together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HitBox {
    /// Identifier.
    pub id: HitBoxId,
    /// Map the hitbox lives on.
    pub spot_id: SpotId,
    /// Object that created it. Never hit by its own hitbox.
    pub owner_id: WorldObjectId,
    /// Covered cells around the current coordinate.
    pub shape: HitBoxShape,
    current_coordinate: Coordinate,
    precise_position: PrecisePosition,
    /// Cells per tick.
    pub velocity: Velocity,
    /// Creation tick.
    pub start_tick: WorldTick,
    /// First tick the hitbox moves and collides.
    pub activation_tick: WorldTick,
    /// Ticks the hitbox stays active after activation.
    pub duration_ticks: u64,
    /// Damage applied to each target hit.
    pub power: u32,
    /// Reaction to obstacle cells.
    pub obstacle_policy: CollisionPolicy,
    /// Reaction to targets.
    pub target_policy: CollisionPolicy,
    /// Substeps per tick, overriding the configured default.
    pub substeps_override: Option<u32>,
    hit_targets: BTreeSet<WorldObjectId>,
    is_active: bool,
    activation_checked: bool,
    deactivation_reason: Option<DeactivationReason>,
}

impl HitBox {
    /// Create a hitbox centred in `origin`, active from `start_tick`.
    pub fn new(
        spot_id: SpotId,
        owner_id: WorldObjectId,
        origin: Coordinate,
        velocity: Velocity,
        start_tick: WorldTick,
        duration_ticks: u64,
    ) -> Self {
        Self {
            id: HitBoxId::generate(),
            spot_id,
            owner_id,
            shape: HitBoxShape::Point,
            current_coordinate: origin,
            precise_position: PrecisePosition::centered_in(origin),
            velocity,
            start_tick,
            activation_tick: start_tick,
            duration_ticks,
            power: 0,
            obstacle_policy: CollisionPolicy::Deactivate,
            target_policy: CollisionPolicy::Deactivate,
            substeps_override: None,
            hit_targets: BTreeSet::new(),
            is_active: true,
            activation_checked: false,
            deactivation_reason: None,
        }
    }

    /// Set the covered shape.
    pub fn with_shape(mut self, shape: HitBoxShape) -> Self {
        self.shape = shape;
        self
    }

    /// Set the damage carried.
    pub fn with_power(mut self, power: u32) -> Self {
        self.power = power;
        self
    }

    /// Delay activation by `ticks` after the start tick.
    pub fn with_activation_delay(mut self, ticks: u64) -> Self {
        self.activation_tick = self.start_tick.plus(ticks);
        self
    }

    /// Set both collision policies.
    pub fn with_policies(mut self, obstacle: CollisionPolicy, target: CollisionPolicy) -> Self {
        self.obstacle_policy = obstacle;
        self.target_policy = target;
        self
    }

    /// Override the substep count.
    pub fn with_substeps(mut self, substeps: u32) -> Self {
        self.substeps_override = Some(substeps);
        self
    }

    /// Current cell.
    pub fn current_coordinate(&self) -> Coordinate {
        self.current_coordinate
    }

    /// Fractional position.
    pub fn precise_position(&self) -> PrecisePosition {
        self.precise_position
    }

    /// Whether the hitbox has not been deactivated.
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// State at `now`.
    pub fn status(&self, now: WorldTick) -> HitBoxStatus {
        if !self.is_active {
            HitBoxStatus::Deactivated
        } else if now < self.activation_tick {
            HitBoxStatus::Pending
        } else {
            HitBoxStatus::Active
        }
    }

    /// Tick at which the duration runs out.
    pub fn expires_at(&self) -> WorldTick {
        self.activation_tick.plus(self.duration_ticks)
    }

    /// Whether the duration has run out at `now`.
    pub fn is_expired(&self, now: WorldTick) -> bool {
        now >= self.expires_at()
    }

    /// Whether the hitbox has lived longer than `max_lifetime_ticks`.
    pub fn exceeds_lifetime(&self, now: WorldTick, max_lifetime_ticks: u64) -> bool {
        now.since(self.start_tick) > max_lifetime_ticks
    }

    /// Whether `target` was already hit.
    pub fn has_hit(&self, target: WorldObjectId) -> bool {
        self.hit_targets.contains(&target)
    }

    /// Record a hit. Returns `false` if the target was hit before.
    pub fn record_hit(&mut self, target: WorldObjectId) -> bool {
        self.hit_targets.insert(target)
    }

    /// Targets hit so far.
    pub fn hit_targets(&self) -> impl Iterator<Item = WorldObjectId> + '_ {
        self.hit_targets.iter().copied()
    }

    /// Whether the cells under the hitbox were checked on activation.
    pub fn activation_checked(&self) -> bool {
        self.activation_checked
    }

    /// Mark the activation check as done.
    pub fn mark_activation_checked(&mut self) {
        self.activation_checked = true;
    }

    /// Move by `delta`. Returns `(from, to)` when the floored cell changed.
    pub fn advance(&mut self, delta: Velocity) -> Option<(Coordinate, Coordinate)> {
        self.precise_position.x += delta.dx;
        self.precise_position.y += delta.dy;
        self.precise_position.z += delta.dz;
        let next = self.precise_position.floor();
        if next == self.current_coordinate {
            return None;
        }
        let from = self.current_coordinate;
        self.current_coordinate = next;
        Some((from, next))
    }

    /// Cells covered at the current coordinate.
    pub fn covered_cells(&self) -> Vec<Coordinate> {
        self.shape.cells(self.current_coordinate)
    }

    /// Why the hitbox stopped, if it did.
    pub fn deactivation_reason(&self) -> Option<DeactivationReason> {
        self.deactivation_reason
    }

    /// Stop the hitbox. Only the first call has an effect and raises an event.
    pub fn deactivate(&mut self, reason: DeactivationReason) -> Option<WorldEvent> {
        if !self.is_active {
            return None;
        }
        self.is_active = false;
        self.deactivation_reason = Some(reason);
        Some(WorldEvent::HitBoxDeactivated {
            hit_box_id: self.id,
            reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn arrow(origin: Coordinate, velocity: Velocity) -> HitBox {
        HitBox::new(
            SpotId::new(1),
            WorldObjectId::new(1),
            origin,
            velocity,
            WorldTick::new(10),
            5,
        )
    }

    #[test]
    fn status_follows_activation_and_deactivation() {
        let mut hb = arrow(Coordinate::planar(0, 0), Velocity::ZERO).with_activation_delay(2);
        assert_eq!(hb.status(WorldTick::new(11)), HitBoxStatus::Pending);
        assert_eq!(hb.status(WorldTick::new(12)), HitBoxStatus::Active);
        assert!(hb.deactivate(DeactivationReason::Expired).is_some());
        assert!(hb.deactivate(DeactivationReason::Expired).is_none());
        assert_eq!(hb.status(WorldTick::new(12)), HitBoxStatus::Deactivated);
    }

    #[test]
    fn expiry_counts_from_activation() {
        let hb = arrow(Coordinate::planar(0, 0), Velocity::ZERO).with_activation_delay(2);
        assert!(!hb.is_expired(WorldTick::new(16)));
        assert!(hb.is_expired(WorldTick::new(17)));
    }

    #[test]
    fn advance_reports_cell_changes_only() {
        let mut hb = arrow(Coordinate::planar(0, 1), Velocity::new(1.0, 0.0, 0.0));
        assert_eq!(hb.advance(Velocity::new(0.25, 0.0, 0.0)), None);
        assert_eq!(
            hb.advance(Velocity::new(0.75, 0.0, 0.0)),
            Some((Coordinate::planar(0, 1), Coordinate::planar(1, 1)))
        );
        assert_eq!(hb.current_coordinate(), Coordinate::planar(1, 1));
    }

    #[test]
    fn targets_are_recorded_once() {
        let mut hb = arrow(Coordinate::planar(0, 0), Velocity::ZERO);
        assert!(hb.record_hit(WorldObjectId::new(7)));
        assert!(!hb.record_hit(WorldObjectId::new(7)));
        assert!(hb.has_hit(WorldObjectId::new(7)));
        assert_eq!(hb.hit_targets().count(), 1);
    }

    #[test]
    fn shapes_cover_expected_cells() {
        let c = Coordinate::planar(5, 5);
        assert_eq!(HitBoxShape::Point.cells(c), vec![c]);
        assert_eq!(HitBoxShape::Square { radius: 1 }.cells(c).len(), 9);
        assert_eq!(HitBoxShape::Cross { radius: 2 }.cells(c).len(), 9);
    }

    proptest! {
        #[test]
        fn coordinate_tracks_floor_of_position(
            x in -20i32..20,
            y in -20i32..20,
            dx in -3.0f64..3.0,
            dy in -3.0f64..3.0,
            substeps in 1u32..8,
            ticks in 1usize..10,
        ) {
            let mut hb = arrow(Coordinate::planar(x, y), Velocity::new(dx, dy, 0.0));
            let delta = hb.velocity.scaled(1.0 / f64::from(substeps));
            for _ in 0..ticks {
                for _ in 0..substeps {
                    hb.advance(delta);
                    prop_assert_eq!(hb.current_coordinate(), hb.precise_position().floor());
                }
            }
        }
    }
}
