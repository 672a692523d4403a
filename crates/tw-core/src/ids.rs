use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Declares a `u64` identifier newtype for world-authored entities.
macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(pub u64);

        impl $name {
            /// Wrap a raw identifier value.
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            /// Return the raw identifier value.
            pub const fn value(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($label, "#{}"), self.0)
            }
        }
    };
}

numeric_id!(
    /// Identifier of an object placed on a physical map.
    WorldObjectId,
    "object"
);
numeric_id!(
    /// Identifier of a spot (one physical map).
    SpotId,
    "spot"
);
numeric_id!(
    /// Identifier of a player account controlling an actor.
    PlayerId,
    "player"
);
numeric_id!(
    /// Identifier of a monster aggregate.
    MonsterId,
    "monster"
);
numeric_id!(
    /// Identifier of a monster template.
    MonsterTemplateId,
    "template"
);
numeric_id!(
    /// Identifier of a weather zone.
    WeatherZoneId,
    "zone"
);
numeric_id!(
    /// Identifier shared by area triggers, location areas and gateways.
    AreaId,
    "area"
);
numeric_id!(
    /// Identifier of a skill definition.
    SkillId,
    "skill"
);

/// Identifier of a hitbox. Hitboxes are spawned at runtime, so the id is random.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HitBoxId(pub Uuid);

impl HitBoxId {
    /// Generate a new random hitbox id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for HitBoxId {
    fn default() -> Self {
        Self::generate()
    }
}

impl fmt::Display for HitBoxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hitbox#{}", &self.0.to_string()[..8])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_ids_display_with_label() {
        assert_eq!(WorldObjectId::new(7).to_string(), "object#7");
        assert_eq!(SpotId::new(3).to_string(), "spot#3");
    }

    #[test]
    fn numeric_ids_order_by_value() {
        assert!(WorldObjectId::new(1) < WorldObjectId::new(2));
    }

    #[test]
    fn hit_box_id_display_shows_short_form() {
        let id = HitBoxId(Uuid::parse_str("a3f2b1c8-1234-5678-9abc-def012345678").unwrap());
        assert_eq!(id.to_string(), "hitbox#a3f2b1c8");
    }
}
