use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::event::WorldEvent;
use crate::ids::PlayerId;

/// Vital statistics of a player, stored apart from the player's world object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStatus {
    /// Player.
    pub player_id: PlayerId,
    hp: u32,
    max_hp: u32,
    mp: u32,
    max_mp: u32,
    stamina: u32,
    max_stamina: u32,
}

impl PlayerStatus {
    /// A player at full HP, MP and stamina.
    pub fn new(player_id: PlayerId, max_hp: u32, max_mp: u32, max_stamina: u32) -> Self {
        Self {
            player_id,
            hp: max_hp,
            max_hp,
            mp: max_mp,
            max_mp,
            stamina: max_stamina,
            max_stamina,
        }
    }

    /// Set current stamina, clamped to the maximum.
    pub fn with_stamina(mut self, stamina: u32) -> Self {
        self.stamina = stamina.min(self.max_stamina);
        self
    }

    /// Set current HP, clamped to the maximum.
    pub fn with_hp(mut self, hp: u32) -> Self {
        self.hp = hp.min(self.max_hp);
        self
    }

    /// Current HP.
    pub fn hp(&self) -> u32 {
        self.hp
    }

    /// Maximum HP.
    pub fn max_hp(&self) -> u32 {
        self.max_hp
    }

    /// Current MP.
    pub fn mp(&self) -> u32 {
        self.mp
    }

    /// Maximum MP.
    pub fn max_mp(&self) -> u32 {
        self.max_mp
    }

    /// Current stamina.
    pub fn stamina(&self) -> u32 {
        self.stamina
    }

    /// Maximum stamina.
    pub fn max_stamina(&self) -> u32 {
        self.max_stamina
    }

    /// Whether the player is down.
    pub fn is_downed(&self) -> bool {
        self.hp == 0
    }

    /// Downed players cannot act.
    pub fn can_act(&self) -> bool {
        !self.is_downed()
    }

    /// Lose up to `amount` stamina, never below zero. Returns what was lost.
    pub fn drain_stamina(&mut self, amount: u32) -> u32 {
        let drained = amount.min(self.stamina);
        self.stamina -= drained;
        drained
    }

    /// Lose HP, never below zero.
    pub fn take_damage(&mut self, amount: u32) -> WorldEvent {
        let lost = amount.min(self.hp);
        self.hp -= lost;
        WorldEvent::PlayerDamaged {
            player_id: self.player_id,
            amount: lost,
            remaining_hp: self.hp,
        }
    }

    /// Regain HP up to the maximum.
    pub fn heal(&mut self, amount: u32) {
        self.hp = self.hp.saturating_add(amount).min(self.max_hp);
    }

    /// Spend MP.
    pub fn consume_mp(&mut self, amount: u32) -> DomainResult<()> {
        if amount > self.mp {
            return Err(DomainError::InsufficientMp {
                required: amount,
                available: self.mp,
            });
        }
        self.mp -= amount;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn blizzard_drain_from_full_and_from_one() {
        let mut full = PlayerStatus::new(PlayerId::new(1), 50, 10, 100);
        assert_eq!(full.drain_stamina(3), 3);
        assert_eq!(full.stamina(), 97);

        let mut tired = PlayerStatus::new(PlayerId::new(1), 50, 10, 100).with_stamina(1);
        assert_eq!(tired.drain_stamina(3), 1);
        assert_eq!(tired.stamina(), 0);
    }

    #[test]
    fn lethal_damage_downs_the_player() {
        let mut status = PlayerStatus::new(PlayerId::new(1), 10, 0, 10);
        let event = status.take_damage(25);
        assert_eq!(
            event,
            WorldEvent::PlayerDamaged {
                player_id: PlayerId::new(1),
                amount: 10,
                remaining_hp: 0,
            }
        );
        assert!(!status.can_act());
        status.heal(4);
        assert!(status.can_act());
    }

    #[test]
    fn mp_cannot_go_negative() {
        let mut status = PlayerStatus::new(PlayerId::new(1), 10, 3, 10);
        assert!(matches!(
            status.consume_mp(4),
            Err(DomainError::InsufficientMp { required: 4, available: 3 })
        ));
        status.consume_mp(3).unwrap();
        assert_eq!(status.mp(), 0);
    }

    proptest! {
        #[test]
        fn stamina_never_underflows(start in 0u32..200, drains in proptest::collection::vec(0u32..10, 0..50)) {
            let mut status = PlayerStatus::new(PlayerId::new(1), 10, 0, 200).with_stamina(start);
            let mut total = 0;
            for amount in drains {
                total += status.drain_stamina(amount);
            }
            prop_assert!(total <= start);
            prop_assert_eq!(status.stamina(), start - total);
        }
    }
}
