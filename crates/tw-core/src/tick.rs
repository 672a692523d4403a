use std::fmt;

use serde::{Deserialize, Serialize};

/// Monotonically increasing simulation step.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct WorldTick(pub u64);

impl WorldTick {
    /// Tick zero, before the first simulation step.
    pub const ZERO: Self = Self(0);

    /// Wrap a raw tick value.
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Return the raw tick value.
    pub const fn value(self) -> u64 {
        self.0
    }

    /// The tick immediately after this one.
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// This tick shifted `ticks` into the future.
    pub const fn plus(self, ticks: u64) -> Self {
        Self(self.0.saturating_add(ticks))
    }

    /// Ticks elapsed since `earlier`, zero if `earlier` lies in the future.
    pub const fn since(self, earlier: WorldTick) -> u64 {
        self.0.saturating_sub(earlier.0)
    }

    /// Whether this tick falls on an `interval` boundary. A zero interval never aligns.
    pub const fn is_aligned_to(self, interval: u64) -> bool {
        interval != 0 && self.0 % interval == 0
    }
}

impl fmt::Display for WorldTick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
