//! Substep integration and collision handling for hitboxes.

use std::collections::HashSet;

use tracing::warn;

use tw_core::{
    CollisionPolicy, Coordinate, DeactivationReason, DomainError, DomainResult, HitBox,
    HitBoxId, HitBoxStatus, PhysicalMap, SpotId, WorldEvent, WorldObject, WorldObjectId,
    WorldTick,
};

use crate::config::HitBoxConfigService;
use crate::event::dedup_events;

/// Caps the number of cell collision tests across one tick.
///
/// Once the budget is spent every further check is skipped. The first skip
/// logs a warning; later ones are silent.
#[derive(Debug, Clone)]
pub struct CollisionGuard {
    max_checks: usize,
    used: usize,
    exhausted_logged: bool,
}

impl CollisionGuard {
    /// A fresh budget of `max_checks` tests.
    pub fn new(max_checks: usize) -> Self {
        Self {
            max_checks,
            used: 0,
            exhausted_logged: false,
        }
    }

    /// Consume one check. Returns `false` when the budget is spent.
    pub fn try_check(&mut self) -> bool {
        if self.used < self.max_checks {
            self.used += 1;
            return true;
        }
        if !self.exhausted_logged {
            self.exhausted_logged = true;
            warn!(
                max_checks = self.max_checks,
                "collision check budget exhausted, skipping remaining checks this tick"
            );
        }
        false
    }

    /// Checks consumed so far.
    pub fn used(&self) -> usize {
        self.used
    }

    /// Whether the next check would be skipped.
    pub fn is_exhausted(&self) -> bool {
        self.used >= self.max_checks
    }
}

/// A target newly hit during a step. Damage is applied by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetHit {
    /// The hitbox that connected.
    pub hit_box_id: HitBoxId,
    /// Spot the hit happened on.
    pub spot_id: SpotId,
    /// Who spawned the hitbox.
    pub owner_id: WorldObjectId,
    /// Who was hit.
    pub target_id: WorldObjectId,
    /// Damage to apply.
    pub power: u32,
}

/// Result of advancing one hitbox by one tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HitBoxStepOutcome {
    /// Deduplicated events in emission order.
    pub events: Vec<WorldEvent>,
    /// Targets hit for the first time, in hit order.
    pub hits: Vec<TargetHit>,
}

/// Per-step scratch state.
struct Step<'a> {
    map: &'a PhysicalMap,
    owner_is_player: Option<bool>,
    guard: &'a mut CollisionGuard,
    // Obstacle cells already reported this tick.
    obstacles_seen: HashSet<Coordinate>,
    outcome: HitBoxStepOutcome,
}

impl Step<'_> {
    fn is_target(&self, hit_box: &HitBox, object: &WorldObject) -> bool {
        object.id != hit_box.owner_id
            && object.component.is_schedulable()
            && self
                .owner_is_player
                .is_none_or(|owner_is_player| owner_is_player != object.is_player())
    }

    fn check_cells(&mut self, hit_box: &mut HitBox) {
        for cell in hit_box.covered_cells() {
            if !hit_box.is_active() {
                return;
            }
            self.check_cell(hit_box, cell);
        }
    }

    fn check_cell(&mut self, hit_box: &mut HitBox, cell: Coordinate) {
        if !self.guard.try_check() {
            return;
        }

        let is_obstacle = self
            .map
            .tile(cell)
            .is_none_or(|tile| tile.terrain.is_hit_box_obstacle());
        if is_obstacle {
            if self.obstacles_seen.insert(cell) {
                self.outcome.events.push(WorldEvent::HitBoxObstacleCollided {
                    hit_box_id: hit_box.id,
                    at: cell,
                });
            }
            if hit_box.obstacle_policy == CollisionPolicy::Deactivate {
                self.outcome
                    .events
                    .extend(hit_box.deactivate(DeactivationReason::ObstacleCollision));
            }
            return;
        }

        let mut targets: Vec<WorldObjectId> = self
            .map
            .objects_at(cell)
            .filter(|object| self.is_target(hit_box, object))
            .map(|object| object.id)
            .collect();
        targets.sort();

        for target_id in targets {
            if !hit_box.record_hit(target_id) {
                continue;
            }
            self.outcome.hits.push(TargetHit {
                hit_box_id: hit_box.id,
                spot_id: hit_box.spot_id,
                owner_id: hit_box.owner_id,
                target_id,
                power: hit_box.power,
            });
            self.outcome.events.push(WorldEvent::HitBoxTargetHit {
                spot_id: hit_box.spot_id,
                hit_box_id: hit_box.id,
                owner_id: hit_box.owner_id,
                target_id,
                power: hit_box.power,
            });
            if hit_box.target_policy == CollisionPolicy::Deactivate {
                self.outcome
                    .events
                    .extend(hit_box.deactivate(DeactivationReason::TargetCollision));
                return;
            }
        }
    }
}

/// Moves hitboxes through a map in substeps and resolves what they touch.
#[derive(Debug, Clone, Copy, Default)]
pub struct HitBoxCollisionEngine;

impl HitBoxCollisionEngine {
    /// A stateless engine.
    pub fn new() -> Self {
        Self
    }

    /// Advance `hit_box` by one tick on `map`.
    ///
    /// Pending and deactivated hitboxes are left alone. An active hitbox is
    /// first checked against its lifetime and duration, then the cells it
    /// covers are tested once on activation, then it moves `velocity / N`
    /// per substep and tests its cells whenever the floored coordinate changes.
    pub fn advance(
        &self,
        hit_box: &mut HitBox,
        map: &PhysicalMap,
        now: WorldTick,
        config: &dyn HitBoxConfigService,
        guard: &mut CollisionGuard,
    ) -> DomainResult<HitBoxStepOutcome> {
        if hit_box.spot_id != map.spot_id() {
            return Err(DomainError::InvalidHitBox {
                id: hit_box.id,
                reason: format!("lives on {} but was advanced on {}", hit_box.spot_id, map.spot_id()),
            });
        }
        if hit_box.status(now) != HitBoxStatus::Active {
            return Ok(HitBoxStepOutcome::default());
        }

        if hit_box.exceeds_lifetime(now, config.max_lifetime_ticks()) {
            let events = hit_box
                .deactivate(DeactivationReason::MaxLifetime)
                .into_iter()
                .collect();
            return Ok(HitBoxStepOutcome { events, hits: Vec::new() });
        }
        if hit_box.is_expired(now) {
            let events = hit_box
                .deactivate(DeactivationReason::Expired)
                .into_iter()
                .collect();
            return Ok(HitBoxStepOutcome { events, hits: Vec::new() });
        }

        let mut step = Step {
            map,
            owner_is_player: map.object(hit_box.owner_id).map(WorldObject::is_player),
            guard,
            obstacles_seen: HashSet::new(),
            outcome: HitBoxStepOutcome::default(),
        };

        if !hit_box.activation_checked() {
            hit_box.mark_activation_checked();
            step.check_cells(hit_box);
        }

        if !hit_box.velocity.is_zero() {
            let substeps = config.substeps_for_hit_box(hit_box).max(1);
            let delta = hit_box.velocity.scaled(1.0 / f64::from(substeps));
            for _ in 0..substeps {
                if !hit_box.is_active() {
                    break;
                }
                if let Some((from, to)) = hit_box.advance(delta) {
                    step.outcome.events.push(WorldEvent::HitBoxMoved {
                        hit_box_id: hit_box.id,
                        from,
                        to,
                    });
                    step.check_cells(hit_box);
                }
            }
        }

        let mut outcome = step.outcome;
        outcome.events = dedup_events(outcome.events);
        Ok(outcome)
    }
}
