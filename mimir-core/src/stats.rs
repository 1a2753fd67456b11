use crate::{Card, CardMode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-scope counts shown next to each deck.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DueCounts {
    /// Cards still in learning mode.
    pub learning: u32,
    /// Cards due for a retention review right now.
    pub retaining: u32,
    pub total: u32,
}

pub fn due_counts(cards: &[Card], now: DateTime<Utc>) -> DueCounts {
    let mut counts = DueCounts::default();
    for c in cards {
        counts.total += 1;
        if c.mode() == Some(CardMode::Learning) {
            counts.learning += 1;
        } else if c.is_due(now) {
            counts.retaining += 1;
        }
    }
    counts
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReviewStats {
    pub total: u32,
    pub due: u32,
    pub overdue: u32,
    pub up_to_date: u32,
}

impl ReviewStats {
    pub fn record(&mut self, card: &Card, now: DateTime<Utc>) {
        self.total += 1;
        if card.is_due(now) {
            self.due += 1;
        } else {
            self.up_to_date += 1;
        }
        if card.is_overdue(now) {
            self.overdue += 1;
        }
    }
}

pub fn review_stats(cards: &[Card], now: DateTime<Utc>) -> ReviewStats {
    let mut stats = ReviewStats::default();
    for c in cards {
        stats.record(c, now);
    }
    stats
}
