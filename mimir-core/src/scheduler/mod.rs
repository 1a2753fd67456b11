use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{CoreError, Schedule};

pub mod interval;
pub mod mode;

pub use interval::{
    calculate_next_due_date, days_until_due, initialize_card, is_card_due, is_card_overdue,
    schedule_card, sort_by_due_date, start_of_day, DueDate,
};
pub use mode::{graduate_card, is_retain_due, new_learning_state, schedule_retain_card};

/// Which of the two scheduling algorithms a card follows. Chosen when the card
/// is created and never changed afterwards.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum SchedulingPolicy {
    #[default]
    Interval,
    Mode,
}

impl SchedulingPolicy {
    pub fn initial_schedule(&self, now: DateTime<Utc>) -> Schedule {
        match self {
            SchedulingPolicy::Interval => Schedule::Interval(initialize_card(now)),
            SchedulingPolicy::Mode => Schedule::Mode(new_learning_state(now)),
        }
    }

    pub fn of(schedule: &Schedule) -> Self {
        match schedule {
            Schedule::Interval(_) => SchedulingPolicy::Interval,
            Schedule::Mode(_) => SchedulingPolicy::Mode,
        }
    }
}

impl fmt::Display for SchedulingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulingPolicy::Interval => f.write_str("interval"),
            SchedulingPolicy::Mode => f.write_str("mode"),
        }
    }
}

impl FromStr for SchedulingPolicy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "interval" | "tag" => Ok(SchedulingPolicy::Interval),
            "mode" | "deck" => Ok(SchedulingPolicy::Mode),
            _ => Err(CoreError::Invalid("scheduling policy")),
        }
    }
}
