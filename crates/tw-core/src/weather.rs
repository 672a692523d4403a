use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::event::WorldEvent;
use crate::ids::{SpotId, WeatherZoneId};
use crate::tick::WorldTick;

/// Kind of weather.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum WeatherType {
    /// No weather effects.
    #[default]
    Clear,
    /// Overcast.
    Cloudy,
    /// Light rain.
    Rain,
    /// Heavy rain.
    HeavyRain,
    /// Thunderstorm.
    Storm,
    /// Snowfall.
    Snow,
    /// Snowstorm.
    Blizzard,
    /// Dense fog.
    Fog,
}

impl WeatherType {
    /// Every weather type.
    pub const ALL: [WeatherType; 8] = [
        Self::Clear,
        Self::Cloudy,
        Self::Rain,
        Self::HeavyRain,
        Self::Storm,
        Self::Snow,
        Self::Blizzard,
        Self::Fog,
    ];

    /// Movement cost multiplier at full intensity.
    pub const fn movement_multiplier(self) -> f64 {
        match self {
            Self::Clear | Self::Cloudy => 1.0,
            Self::Rain => 1.2,
            Self::HeavyRain | Self::Snow => 1.5,
            Self::Storm => 1.8,
            Self::Blizzard => 2.0,
            Self::Fog => 1.1,
        }
    }

    /// Vision distance multiplier at full intensity.
    pub const fn vision_multiplier(self) -> f64 {
        match self {
            Self::Clear => 1.0,
            Self::Cloudy => 0.9,
            Self::Rain => 0.8,
            Self::HeavyRain => 0.6,
            Self::Storm => 0.5,
            Self::Snow => 0.7,
            Self::Blizzard => 0.3,
            Self::Fog => 0.4,
        }
    }

    /// Stamina a player loses per tick while exposed. Doubles as severity.
    pub const fn stamina_drain(self) -> u32 {
        match self {
            Self::Clear | Self::Cloudy | Self::Rain | Self::Fog => 0,
            Self::HeavyRain | Self::Snow => 1,
            Self::Storm => 2,
            Self::Blizzard => 3,
        }
    }
}

impl fmt::Display for WeatherType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Clear => write!(f, "clear"),
            Self::Cloudy => write!(f, "cloudy"),
            Self::Rain => write!(f, "rain"),
            Self::HeavyRain => write!(f, "heavy rain"),
            Self::Storm => write!(f, "storm"),
            Self::Snow => write!(f, "snow"),
            Self::Blizzard => write!(f, "blizzard"),
            Self::Fog => write!(f, "fog"),
        }
    }
}

/// Weather type plus intensity in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeatherState {
    /// Kind of weather.
    pub weather_type: WeatherType,
    /// Strength, clamped to `0.0..=1.0`.
    pub intensity: f64,
}

impl WeatherState {
    /// Create a state, clamping intensity.
    pub fn new(weather_type: WeatherType, intensity: f64) -> Self {
        let intensity = if intensity.is_nan() {
            0.0
        } else {
            intensity.clamp(0.0, 1.0)
        };
        Self {
            weather_type,
            intensity,
        }
    }

    /// Clear skies.
    pub fn clear() -> Self {
        Self::new(WeatherType::Clear, 0.0)
    }

    /// Movement multiplier blended by intensity.
    pub fn movement_multiplier(&self) -> f64 {
        1.0 + (self.weather_type.movement_multiplier() - 1.0) * self.intensity
    }

    /// Vision multiplier blended by intensity.
    pub fn vision_multiplier(&self) -> f64 {
        1.0 + (self.weather_type.vision_multiplier() - 1.0) * self.intensity
    }

    /// Stamina drained per tick from exposed players.
    pub fn stamina_drain(&self) -> u32 {
        self.weather_type.stamina_drain()
    }
}

impl Default for WeatherState {
    fn default() -> Self {
        Self::clear()
    }
}

/// A region of spots sharing one weather state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherZone {
    /// Zone identifier.
    pub id: WeatherZoneId,
    /// Display name.
    pub name: String,
    /// Spots covered by this zone.
    pub spots: BTreeSet<SpotId>,
    /// Weather types this zone may enter. Empty means unrestricted.
    pub allowed_weather: BTreeSet<WeatherType>,
    current: WeatherState,
    last_changed: WorldTick,
}

impl WeatherZone {
    /// Create a zone with clear weather.
    pub fn new(
        id: WeatherZoneId,
        name: impl Into<String>,
        spots: impl IntoIterator<Item = SpotId>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            spots: spots.into_iter().collect(),
            allowed_weather: BTreeSet::new(),
            current: WeatherState::clear(),
            last_changed: WorldTick::ZERO,
        }
    }

    /// Restrict the weather types this zone may enter.
    pub fn with_allowed_weather(mut self, allowed: impl IntoIterator<Item = WeatherType>) -> Self {
        self.allowed_weather = allowed.into_iter().collect();
        self
    }

    /// Start the zone in a given state.
    pub fn with_weather(mut self, state: WeatherState) -> Self {
        self.current = state;
        self
    }

    /// Current weather.
    pub fn current(&self) -> WeatherState {
        self.current
    }

    /// Tick of the last weather change.
    pub fn last_changed(&self) -> WorldTick {
        self.last_changed
    }

    /// Whether the zone covers a spot.
    pub fn covers(&self, spot: SpotId) -> bool {
        self.spots.contains(&spot)
    }

    /// Whether the zone may enter a weather type.
    pub fn allows(&self, weather_type: WeatherType) -> bool {
        self.allowed_weather.is_empty() || self.allowed_weather.contains(&weather_type)
    }

    /// Apply a new state. Returns a change event when the type changed.
    pub fn apply_weather(&mut self, state: WeatherState, now: WorldTick) -> Option<WorldEvent> {
        let previous = self.current.weather_type;
        self.current = state;
        if previous == state.weather_type {
            return None;
        }
        self.last_changed = now;
        Some(WorldEvent::WeatherChanged {
            zone_id: self.id,
            from: previous,
            to: state.weather_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intensity_is_clamped() {
        assert!((WeatherState::new(WeatherType::Rain, 3.0).intensity - 1.0).abs() < f64::EPSILON);
        assert!(WeatherState::new(WeatherType::Rain, -1.0).intensity.abs() < f64::EPSILON);
    }

    #[test]
    fn multipliers_blend_by_intensity() {
        let half = WeatherState::new(WeatherType::Blizzard, 0.5);
        assert!((half.movement_multiplier() - 1.5).abs() < 1e-9);
        assert!((half.vision_multiplier() - 0.65).abs() < 1e-9);
        assert_eq!(half.stamina_drain(), 3);
    }

    #[test]
    fn zone_reports_only_type_changes() {
        let mut zone = WeatherZone::new(WeatherZoneId::new(1), "Coast", [SpotId::new(1)]);
        assert!(
            zone.apply_weather(WeatherState::new(WeatherType::Clear, 0.3), WorldTick::new(5))
                .is_none()
        );
        let event = zone.apply_weather(WeatherState::new(WeatherType::Rain, 0.5), WorldTick::new(6));
        assert_eq!(
            event,
            Some(WorldEvent::WeatherChanged {
                zone_id: WeatherZoneId::new(1),
                from: WeatherType::Clear,
                to: WeatherType::Rain,
            })
        );
        assert_eq!(zone.last_changed(), WorldTick::new(6));
    }

    #[test]
    fn empty_allow_list_is_unrestricted() {
        let zone = WeatherZone::new(WeatherZoneId::new(1), "Any", []);
        assert!(zone.allows(WeatherType::Blizzard));
        let zone = zone.with_allowed_weather([WeatherType::Clear, WeatherType::Rain]);
        assert!(!zone.allows(WeatherType::Blizzard));
    }
}
