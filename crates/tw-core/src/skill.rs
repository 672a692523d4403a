use serde::{Deserialize, Serialize};

use crate::coordinate::{Coordinate, Direction};
use crate::error::{DomainError, DomainResult};
use crate::hitbox::{CollisionPolicy, HitBox, HitBoxShape, Velocity};
use crate::ids::{SkillId, SpotId, WorldObjectId};
use crate::tick::WorldTick;

/// Shape and motion of the hitbox a skill creates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HitBoxTemplate {
    /// Covered cells.
    pub shape: HitBoxShape,
    /// Cells per tick along the caster's facing.
    pub speed: f64,
    /// Ticks the hitbox stays active.
    pub duration_ticks: u64,
    /// Ticks between the cast and activation.
    pub activation_delay_ticks: u64,
    /// Reaction to obstacles.
    pub obstacle_policy: CollisionPolicy,
    /// Reaction to targets.
    pub target_policy: CollisionPolicy,
    /// Substep override.
    pub substeps: Option<u32>,
}

impl Default for HitBoxTemplate {
    fn default() -> Self {
        Self::melee()
    }
}

impl HitBoxTemplate {
    /// A stationary one-tick swing in front of the caster.
    pub fn melee() -> Self {
        Self {
            shape: HitBoxShape::Point,
            speed: 0.0,
            duration_ticks: 1,
            activation_delay_ticks: 0,
            obstacle_policy: CollisionPolicy::Deactivate,
            target_policy: CollisionPolicy::Deactivate,
            substeps: None,
        }
    }

    /// A point projectile flying `speed` cells per tick for `duration_ticks`.
    pub fn projectile(speed: f64, duration_ticks: u64) -> Self {
        Self {
            speed,
            duration_ticks,
            ..Self::melee()
        }
    }
}

/// A skill an actor can put in a loadout slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillDefinition {
    /// Identifier.
    pub id: SkillId,
    /// Display name.
    pub name: String,
    /// MP spent per use.
    pub mp_cost: u32,
    /// Maximum manhattan distance to the target.
    pub range: u32,
    /// Ticks before the slot can be used again.
    pub cooldown_ticks: u64,
    /// Ticks the caster stays busy.
    pub cast_ticks: u64,
    /// Base damage.
    pub power: u32,
    /// Hitbox created on use.
    pub hit_box: HitBoxTemplate,
}

impl SkillDefinition {
    /// A free, instant melee skill with power 1.
    pub fn new(id: SkillId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            mp_cost: 0,
            range: 1,
            cooldown_ticks: 0,
            cast_ticks: 1,
            power: 1,
            hit_box: HitBoxTemplate::melee(),
        }
    }

    /// Set the MP cost.
    pub fn with_mp_cost(mut self, mp_cost: u32) -> Self {
        self.mp_cost = mp_cost;
        self
    }

    /// Set the range.
    pub fn with_range(mut self, range: u32) -> Self {
        self.range = range;
        self
    }

    /// Set the cooldown.
    pub fn with_cooldown(mut self, ticks: u64) -> Self {
        self.cooldown_ticks = ticks;
        self
    }

    /// Set the cast time.
    pub fn with_cast_ticks(mut self, ticks: u64) -> Self {
        self.cast_ticks = ticks;
        self
    }

    /// Set the base damage.
    pub fn with_power(mut self, power: u32) -> Self {
        self.power = power;
        self
    }

    /// Set the hitbox template.
    pub fn with_hit_box(mut self, template: HitBoxTemplate) -> Self {
        self.hit_box = template;
        self
    }

    /// Translate a cast into a hitbox in the cell the caster faces.
    ///
    /// The hitbox travels along `facing`; `power_multiplier` scales the base
    /// damage (growth stages use it).
    pub fn spawn_hit_box(
        &self,
        owner_id: WorldObjectId,
        spot_id: SpotId,
        origin: Coordinate,
        facing: Direction,
        now: WorldTick,
        power_multiplier: f64,
    ) -> HitBox {
        let (dx, dy) = facing.delta();
        let speed = self.hit_box.speed;
        let velocity = Velocity::new(f64::from(dx) * speed, f64::from(dy) * speed, 0.0);
        let power = (f64::from(self.power) * power_multiplier).round().max(0.0) as u32;

        let hit_box = HitBox::new(
            spot_id,
            owner_id,
            origin.step(facing),
            velocity,
            now,
            self.hit_box.duration_ticks,
        )
        .with_shape(self.hit_box.shape)
        .with_power(power)
        .with_activation_delay(self.hit_box.activation_delay_ticks)
        .with_policies(self.hit_box.obstacle_policy, self.hit_box.target_policy);

        match self.hit_box.substeps {
            Some(substeps) => hit_box.with_substeps(substeps),
            None => hit_box,
        }
    }
}

/// A loadout slot with its cooldown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillSlot {
    /// Position in the loadout.
    pub slot_index: usize,
    /// Skill in the slot.
    pub skill: SkillDefinition,
    /// First tick the slot can be used.
    pub ready_at: WorldTick,
}

/// Skills available to one actor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillLoadout {
    /// Actor owning the loadout.
    pub owner_id: WorldObjectId,
    slots: Vec<SkillSlot>,
}

impl SkillLoadout {
    /// Create a loadout, numbering slots in order.
    pub fn new(owner_id: WorldObjectId, skills: impl IntoIterator<Item = SkillDefinition>) -> Self {
        let slots = skills
            .into_iter()
            .enumerate()
            .map(|(slot_index, skill)| SkillSlot {
                slot_index,
                skill,
                ready_at: WorldTick::ZERO,
            })
            .collect();
        Self { owner_id, slots }
    }

    /// All slots.
    pub fn slots(&self) -> &[SkillSlot] {
        &self.slots
    }

    /// A slot by index.
    pub fn slot(&self, slot_index: usize) -> Option<&SkillSlot> {
        self.slots.get(slot_index)
    }

    /// The skill in a slot, if the slot exists and has cooled down.
    pub fn ready_skill(&self, slot_index: usize, now: WorldTick) -> DomainResult<&SkillDefinition> {
        let slot = self.slot(slot_index).ok_or(DomainError::SkillSlotNotFound {
            owner: self.owner_id,
            slot: slot_index,
        })?;
        if slot.ready_at > now {
            return Err(DomainError::SkillOnCooldown {
                owner: self.owner_id,
                slot: slot_index,
                ready_at: slot.ready_at,
            });
        }
        Ok(&slot.skill)
    }

    /// Start the cooldown of a slot.
    pub fn mark_used(&mut self, slot_index: usize, now: WorldTick) -> DomainResult<()> {
        let owner = self.owner_id;
        let slot = self
            .slots
            .get_mut(slot_index)
            .ok_or(DomainError::SkillSlotNotFound {
                owner,
                slot: slot_index,
            })?;
        slot.ready_at = now.plus(slot.skill.cooldown_ticks);
        Ok(())
    }

    /// Planner-facing summary of every slot.
    pub fn skill_infos(&self, now: WorldTick) -> Vec<MonsterSkillInfo> {
        self.slots
            .iter()
            .map(|slot| MonsterSkillInfo {
                slot_index: slot.slot_index,
                skill_id: slot.skill.id,
                range: slot.skill.range,
                mp_cost: slot.skill.mp_cost,
                power: slot.skill.power,
                cooldown_remaining: slot.ready_at.since(now),
            })
            .collect()
    }
}

/// What the planner needs to know about one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MonsterSkillInfo {
    /// Slot index.
    pub slot_index: usize,
    /// Skill in the slot.
    pub skill_id: SkillId,
    /// Maximum manhattan distance.
    pub range: u32,
    /// MP spent per use.
    pub mp_cost: u32,
    /// Base damage.
    pub power: u32,
    /// Ticks until the slot is ready.
    pub cooldown_remaining: u64,
}

impl MonsterSkillInfo {
    /// Whether the slot can be used with `current_mp` against a target `distance` cells away.
    pub fn is_usable(&self, current_mp: u32, distance: u32) -> bool {
        self.cooldown_remaining == 0 && self.mp_cost <= current_mp && distance <= self.range
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fireball() -> SkillDefinition {
        SkillDefinition::new(SkillId::new(2), "Fireball")
            .with_mp_cost(5)
            .with_range(4)
            .with_cooldown(3)
            .with_power(10)
            .with_hit_box(HitBoxTemplate::projectile(2.0, 3))
    }

    #[test]
    fn spawned_hitbox_starts_in_front_and_flies_along_facing() {
        let hb = fireball().spawn_hit_box(
            WorldObjectId::new(1),
            SpotId::new(1),
            Coordinate::planar(3, 3),
            Direction::West,
            WorldTick::new(7),
            1.5,
        );
        assert_eq!(hb.current_coordinate(), Coordinate::planar(2, 3));
        assert_eq!(hb.velocity, Velocity::new(-2.0, 0.0, 0.0));
        assert_eq!(hb.power, 15);
        assert_eq!(hb.start_tick, WorldTick::new(7));
        assert_eq!(hb.owner_id, WorldObjectId::new(1));
    }

    #[test]
    fn cooldown_blocks_reuse_until_elapsed() {
        let mut loadout = SkillLoadout::new(WorldObjectId::new(1), [fireball()]);
        loadout.mark_used(0, WorldTick::new(10)).unwrap();
        assert!(matches!(
            loadout.ready_skill(0, WorldTick::new(12)),
            Err(DomainError::SkillOnCooldown { .. })
        ));
        assert!(loadout.ready_skill(0, WorldTick::new(13)).is_ok());
        assert!(matches!(
            loadout.ready_skill(4, WorldTick::new(13)),
            Err(DomainError::SkillSlotNotFound { .. })
        ));
    }

    #[test]
    fn skill_infos_report_remaining_cooldown() {
        let mut loadout = SkillLoadout::new(
            WorldObjectId::new(1),
            [SkillDefinition::new(SkillId::new(1), "Bite"), fireball()],
        );
        loadout.mark_used(1, WorldTick::new(10)).unwrap();
        let infos = loadout.skill_infos(WorldTick::new(11));
        assert_eq!(infos[0].cooldown_remaining, 0);
        assert_eq!(infos[1].cooldown_remaining, 2);
    }

    #[test]
    fn usability_checks_range_mp_and_cooldown() {
        let info = MonsterSkillInfo {
            slot_index: 0,
            skill_id: SkillId::new(2),
            range: 4,
            mp_cost: 5,
            power: 10,
            cooldown_remaining: 0,
        };
        assert!(info.is_usable(5, 4));
        assert!(!info.is_usable(4, 4));
        assert!(!info.is_usable(5, 5));
        assert!(
            !MonsterSkillInfo {
                cooldown_remaining: 1,
                ..info
            }
            .is_usable(5, 1)
        );
    }
}
