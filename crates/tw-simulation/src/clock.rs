use tw_core::{ActiveTime, WorldTick};

/// Source of the current world tick.
pub trait TimeProvider: std::fmt::Debug + Send {
    /// The current tick.
    fn current_tick(&self) -> WorldTick;

    /// Advance by `n` ticks. Returns the new tick.
    fn advance_tick(&mut self, n: u64) -> WorldTick;
}

/// Tracks simulation time as a monotonic tick counter.
#[derive(Debug, Clone, Default)]
pub struct SimClock {
    tick: WorldTick,
}

impl SimClock {
    /// Create a clock at tick 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a clock resuming at `tick`.
    pub fn starting_at(tick: WorldTick) -> Self {
        Self { tick }
    }

    /// Advance the clock by one tick. Returns the new tick.
    pub fn advance(&mut self) -> WorldTick {
        self.tick = self.tick.next();
        self.tick
    }

    /// Return the current tick.
    pub fn tick(&self) -> WorldTick {
        self.tick
    }
}

impl TimeProvider for SimClock {
    fn current_tick(&self) -> WorldTick {
        self.tick
    }

    fn advance_tick(&mut self, n: u64) -> WorldTick {
        self.tick = self.tick.plus(n);
        self.tick
    }
}

/// Half of the day cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeOfDay {
    /// First half of the cycle.
    Day,
    /// Second half of the cycle.
    Night,
}

impl TimeOfDay {
    /// Day during the first half of each `ticks_per_day` cycle. A zero-length day is always day.
    pub fn at(tick: WorldTick, ticks_per_day: u64) -> Self {
        if ticks_per_day == 0 {
            return Self::Day;
        }
        if tick.value() % ticks_per_day < ticks_per_day / 2 {
            Self::Day
        } else {
            Self::Night
        }
    }

    /// Whether an actor with `active_time` is awake now.
    pub fn allows(self, active_time: ActiveTime) -> bool {
        match active_time {
            ActiveTime::Always => true,
            ActiveTime::Diurnal => self == Self::Day,
            ActiveTime::Nocturnal => self == Self::Night,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_initial_state() {
        let clock = SimClock::new();
        assert_eq!(clock.tick(), WorldTick::ZERO);
    }

    #[test]
    fn clock_advance_increments() {
        let mut clock = SimClock::new();
        clock.advance();
        clock.advance();
        assert_eq!(clock.advance(), WorldTick::new(3));
        assert_eq!(clock.advance_tick(5), WorldTick::new(8));
        assert_eq!(clock.current_tick(), WorldTick::new(8));
    }

    #[test]
    fn day_is_the_first_half_of_the_cycle() {
        assert_eq!(TimeOfDay::at(WorldTick::new(0), 100), TimeOfDay::Day);
        assert_eq!(TimeOfDay::at(WorldTick::new(49), 100), TimeOfDay::Day);
        assert_eq!(TimeOfDay::at(WorldTick::new(50), 100), TimeOfDay::Night);
        assert_eq!(TimeOfDay::at(WorldTick::new(150), 100), TimeOfDay::Day);
        assert_eq!(TimeOfDay::at(WorldTick::new(77), 0), TimeOfDay::Day);
    }

    #[test]
    fn active_time_gating() {
        assert!(TimeOfDay::Night.allows(ActiveTime::Nocturnal));
        assert!(!TimeOfDay::Day.allows(ActiveTime::Nocturnal));
        assert!(!TimeOfDay::Night.allows(ActiveTime::Diurnal));
        assert!(TimeOfDay::Night.allows(ActiveTime::Always));
    }
}
