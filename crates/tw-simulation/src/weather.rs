use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use tw_core::{WeatherState, WeatherType, WeatherZone, WorldEvent, WorldTick};

use crate::config::WeatherConfigService;

/// Weighted successors of each weather type.
pub fn transitions(from: WeatherType) -> &'static [(WeatherType, u32)] {
    use WeatherType::*;
    match from {
        Clear => &[(Clear, 6), (Cloudy, 3), (Fog, 1)],
        Cloudy => &[(Clear, 3), (Cloudy, 4), (Rain, 2), (Snow, 1)],
        Rain => &[(Cloudy, 3), (Rain, 4), (HeavyRain, 2)],
        HeavyRain => &[(Rain, 4), (HeavyRain, 4), (Storm, 2)],
        Storm => &[(HeavyRain, 6), (Rain, 4)],
        Snow => &[(Cloudy, 3), (Snow, 4), (Blizzard, 2)],
        Blizzard => &[(Snow, 6), (Blizzard, 4)],
        Fog => &[(Clear, 5), (Fog, 5)],
    }
}

/// A zone's new weather after a scheduled update.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherUpdate {
    /// The zone's weather after the roll.
    pub state: WeatherState,
    /// Set when the weather type changed.
    pub event: Option<WorldEvent>,
}

/// Rolls weather transitions for zones.
#[derive(Debug)]
pub struct WeatherSimulationService {
    rng: StdRng,
}

impl WeatherSimulationService {
    /// A roller seeded for reproducible weather.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// The weather in effect for a spot: its zone's, or clear skies without a zone.
    pub fn resolve_for_spot(zone: Option<&WeatherZone>) -> WeatherState {
        zone.map_or_else(WeatherState::clear, WeatherZone::current)
    }

    /// Roll the next state for `zone` without applying it.
    ///
    /// Successors the zone does not allow are skipped. When nothing is left
    /// the zone keeps its current type.
    pub fn next_weather(&mut self, zone: &WeatherZone) -> WeatherState {
        let current = zone.current().weather_type;
        let candidates: Vec<(WeatherType, u32)> = transitions(current)
            .iter()
            .copied()
            .filter(|(weather, weight)| *weight > 0 && (*weather == current || zone.allows(*weather)))
            .collect();
        let total: u32 = candidates.iter().map(|(_, weight)| weight).sum();

        let next = if total == 0 {
            current
        } else {
            let mut roll = self.rng.random_range(0..total);
            candidates
                .iter()
                .find(|(_, weight)| {
                    if roll < *weight {
                        true
                    } else {
                        roll -= weight;
                        false
                    }
                })
                .map_or(current, |(weather, _)| *weather)
        };

        if next == WeatherType::Clear {
            WeatherState::clear()
        } else {
            WeatherState::new(next, self.rng.random_range(0.3..=1.0))
        }
    }

    /// Advance a zone if `now` falls on the update interval.
    pub fn update_zone(
        &mut self,
        zone: &mut WeatherZone,
        now: WorldTick,
        config: &dyn WeatherConfigService,
    ) -> Option<WeatherUpdate> {
        if !now.is_aligned_to(config.update_interval_ticks()) {
            return None;
        }
        let state = self.next_weather(zone);
        let event = zone.apply_weather(state, now);
        Some(WeatherUpdate { state, event })
    }
}
