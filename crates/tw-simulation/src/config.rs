use serde::{Deserialize, Serialize};
use tw_core::{AggroMemoryPolicy, HitBox};

/// How often weather zones may change.
pub trait WeatherConfigService {
    /// Ticks between weather updates. Zero disables updates.
    fn update_interval_ticks(&self) -> u64;
}

/// Hitbox integration limits.
pub trait HitBoxConfigService {
    /// Default substeps per tick.
    fn substeps_per_tick(&self) -> u32;

    /// Global budget of cell collision tests per tick.
    fn max_collision_checks_per_tick(&self) -> usize;

    /// Hard lifetime cap for any hitbox.
    fn max_lifetime_ticks(&self) -> u64;

    /// Substeps for one hitbox: its own override, otherwise enough steps that
    /// no substep moves more than one cell. Never below one.
    fn substeps_for_hit_box(&self, hit_box: &HitBox) -> u32 {
        let substeps = match hit_box.substeps_override {
            Some(substeps) => substeps,
            None => {
                let by_speed = hit_box.velocity.max_axis_speed().ceil().min(f64::from(u32::MAX));
                self.substeps_per_tick().max(by_speed as u32)
            }
        };
        substeps.max(1)
    }
}

/// Length of the day cycle.
pub trait WorldTimeConfigService {
    /// Ticks per in-world day.
    fn ticks_per_day(&self) -> u64;
}

/// Periodic threat cleanup.
pub trait AggroConfigService {
    /// Ticks between sweeps over every threat table. Zero disables sweeping.
    fn sweep_interval_ticks(&self) -> u64;

    /// Memory for defenders without a policy of their own, such as players.
    fn fallback_policy(&self) -> AggroMemoryPolicy;
}

/// Weather section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    /// Ticks between weather updates.
    pub update_interval_ticks: u64,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            update_interval_ticks: 10,
        }
    }
}

impl WeatherConfigService for WeatherConfig {
    fn update_interval_ticks(&self) -> u64 {
        self.update_interval_ticks
    }
}

/// Hitbox section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HitBoxConfig {
    /// Default substeps per tick.
    pub substeps_per_tick: u32,
    /// Collision test budget per tick.
    pub max_collision_checks_per_tick: usize,
    /// Lifetime cap in ticks.
    pub max_lifetime_ticks: u64,
}

impl Default for HitBoxConfig {
    fn default() -> Self {
        Self {
            substeps_per_tick: 1,
            max_collision_checks_per_tick: 10_000,
            max_lifetime_ticks: 600,
        }
    }
}

impl HitBoxConfigService for HitBoxConfig {
    fn substeps_per_tick(&self) -> u32 {
        self.substeps_per_tick.max(1)
    }

    fn max_collision_checks_per_tick(&self) -> usize {
        self.max_collision_checks_per_tick
    }

    fn max_lifetime_ticks(&self) -> u64 {
        self.max_lifetime_ticks
    }
}

/// Day cycle section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldTimeConfig {
    /// Ticks per in-world day.
    pub ticks_per_day: u64,
}

impl Default for WorldTimeConfig {
    fn default() -> Self {
        Self { ticks_per_day: 240 }
    }
}

impl WorldTimeConfigService for WorldTimeConfig {
    fn ticks_per_day(&self) -> u64 {
        self.ticks_per_day
    }
}

/// Threat memory section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggroConfig {
    /// Ticks between sweeps over every threat table.
    pub sweep_interval_ticks: u64,
    /// Unseen ticks after which a defender without its own policy forgets.
    pub forget_after_ticks: u64,
}

impl Default for AggroConfig {
    fn default() -> Self {
        Self {
            sweep_interval_ticks: 50,
            forget_after_ticks: 600,
        }
    }
}

impl AggroConfigService for AggroConfig {
    fn sweep_interval_ticks(&self) -> u64 {
        self.sweep_interval_ticks
    }

    fn fallback_policy(&self) -> AggroMemoryPolicy {
        AggroMemoryPolicy::forget_after(self.forget_after_ticks)
    }
}

/// AI planning section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Ticks a cached path stays valid. Zero disables caching.
    pub path_cache_ttl_ticks: u64,
    /// Node expansion limit for one path search.
    pub max_path_nodes: usize,
    /// Chance per tick that an idle actor wanders.
    pub wander_chance: f64,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            path_cache_ttl_ticks: 10,
            max_path_nodes: 4_096,
            wander_chance: 0.1,
        }
    }
}

/// Configuration for a simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// RNG seed for deterministic simulation.
    pub seed: u64,
    /// Maximum event history size (oldest events dropped when exceeded). 0 = unlimited.
    pub max_events: usize,
    /// Weather roll cadence.
    pub weather: WeatherConfig,
    /// Hitbox integration limits.
    pub hit_box: HitBoxConfig,
    /// Day cycle.
    pub world_time: WorldTimeConfig,
    /// Planner tuning.
    pub behavior: BehaviorConfig,
    /// Threat table cleanup.
    pub aggro: AggroConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            max_events: 0,
            weather: WeatherConfig::default(),
            hit_box: HitBoxConfig::default(),
            world_time: WorldTimeConfig::default(),
            behavior: BehaviorConfig::default(),
            aggro: AggroConfig::default(),
        }
    }
}

impl SimConfig {
    /// Parse a JSON document. Missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Set the RNG seed for deterministic simulation.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the maximum event history size (0 = unlimited).
    pub fn with_max_events(mut self, max: usize) -> Self {
        self.max_events = max;
        self
    }

    /// Set the weather update interval.
    pub fn with_weather_interval(mut self, ticks: u64) -> Self {
        self.weather.update_interval_ticks = ticks;
        self
    }

    /// Set the default hitbox substeps.
    pub fn with_substeps_per_tick(mut self, substeps: u32) -> Self {
        self.hit_box.substeps_per_tick = substeps;
        self
    }

    /// Set the per-tick collision test budget.
    pub fn with_max_collision_checks(mut self, checks: usize) -> Self {
        self.hit_box.max_collision_checks_per_tick = checks;
        self
    }

    /// Set the day length.
    pub fn with_ticks_per_day(mut self, ticks: u64) -> Self {
        self.world_time.ticks_per_day = ticks;
        self
    }

    /// Set the threat sweep cadence and the fallback memory length.
    pub fn with_aggro_sweep(mut self, interval_ticks: u64, forget_after_ticks: u64) -> Self {
        self.aggro.sweep_interval_ticks = interval_ticks;
        self.aggro.forget_after_ticks = forget_after_ticks;
        self
    }

    /// Set the idle wander chance.
    pub fn with_wander_chance(mut self, chance: f64) -> Self {
        self.behavior.wander_chance = chance;
        self
    }
}
