//! Wall-clock job schedules: every N days at `HH:MM`, or weekly on a weekday.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, FixedOffset, NaiveTime, Offset, TimeDelta, Utc, Weekday};

use candela_core::CandelaError;

/// How often a job repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cycle {
    /// Every `n` days (n >= 1).
    EveryDays(u32),
    /// Once a week on this day.
    Weekly(Weekday),
}

impl FromStr for Cycle {
    type Err = CandelaError;

    /// Weekday names (`monday`, `Mon`, ...) or a positive day count.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(n) = s.parse::<u32>() {
            return Self::every_days(n);
        }
        s.parse::<Weekday>()
            .map(Self::Weekly)
            .map_err(|_| CandelaError::InvalidArg(format!("unknown cycle {s:?}")))
    }
}

impl Cycle {
    /// Every `n` days.
    ///
    /// # Errors
    /// `InvalidArg` for `n == 0`.
    pub fn every_days(n: u32) -> Result<Self, CandelaError> {
        if n == 0 {
            return Err(CandelaError::InvalidArg("cycle of zero days".into()));
        }
        Ok(Self::EveryDays(n))
    }
}

/// A repeating wall-clock slot in a fixed UTC offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    cycle: Cycle,
    at: NaiveTime,
    offset: FixedOffset,
}

impl Schedule {
    /// Run on `cycle` at `at`, in UTC.
    #[must_use]
    pub fn new(cycle: Cycle, at: NaiveTime) -> Self {
        Self {
            cycle,
            at,
            offset: Utc.fix(),
        }
    }

    /// Parse `HH:MM` and build the schedule.
    ///
    /// # Errors
    /// `InvalidArg` when `at` is not `HH:MM`.
    pub fn parse(cycle: Cycle, at: &str) -> Result<Self, CandelaError> {
        let at = NaiveTime::parse_from_str(at.trim(), "%H:%M")
            .map_err(|e| CandelaError::InvalidArg(format!("time of day {at:?}: {e}")))?;
        Ok(Self::new(cycle, at))
    }

    /// Interpret the time of day in `offset` instead of UTC, e.g. KST.
    #[must_use]
    pub const fn in_offset(mut self, offset: FixedOffset) -> Self {
        self.offset = offset;
        self
    }

    /// Repetition.
    #[must_use]
    pub const fn cycle(&self) -> Cycle {
        self.cycle
    }

    /// Time of day.
    #[must_use]
    pub const fn at(&self) -> NaiveTime {
        self.at
    }

    /// First slot strictly after `now`.
    ///
    /// Day cycles start at the next `HH:MM`, today or tomorrow; weekly cycles
    /// at the next matching weekday.
    #[must_use]
    pub fn next_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let local = now.with_timezone(&self.offset);
        let mut day = local.date_naive();
        if let Cycle::Weekly(wd) = self.cycle {
            let ahead = (7 + wd.num_days_from_monday() - day.weekday().num_days_from_monday()) % 7;
            day += TimeDelta::days(i64::from(ahead));
        }
        let mut slot = self.slot_on(day);
        if slot <= now {
            let step = match self.cycle {
                Cycle::EveryDays(_) => 1,
                Cycle::Weekly(_) => 7,
            };
            day += TimeDelta::days(step);
            slot = self.slot_on(day);
        }
        slot
    }

    /// Slot one full cycle after `slot`.
    #[must_use]
    pub fn following(&self, slot: DateTime<Utc>) -> DateTime<Utc> {
        let days = match self.cycle {
            Cycle::EveryDays(n) => i64::from(n),
            Cycle::Weekly(_) => 7,
        };
        slot + TimeDelta::days(days)
    }

    fn slot_on(&self, day: chrono::NaiveDate) -> DateTime<Utc> {
        // A fixed offset maps every local time to exactly one instant
        let local = day.and_time(self.at);
        (local - TimeDelta::seconds(i64::from(self.offset.local_minus_utc()))).and_utc()
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cycle {
            Cycle::EveryDays(1) => write!(f, "daily at {}", self.at.format("%H:%M")),
            Cycle::EveryDays(n) => write!(f, "every {n} days at {}", self.at.format("%H:%M")),
            Cycle::Weekly(wd) => write!(f, "every {wd} at {}", self.at.format("%H:%M")),
        }?;
        if self.offset.local_minus_utc() != 0 {
            write!(f, " {}", self.offset)?;
        }
        Ok(())
    }
}
