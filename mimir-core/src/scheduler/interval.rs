//! Exponential interval-counter policy: a card answered correctly `n` times in
//! a row comes back `2^n` days later, a miss starts the ladder over.
//!
//! Every due date this policy produces is snapped to midnight UTC, and the due
//! predicates compare whole UTC days, so a client's local clock never shifts a
//! card across a day boundary.

use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};

use crate::IntervalState;

pub fn start_of_day(t: DateTime<Utc>) -> DateTime<Utc> {
    Utc.from_utc_datetime(&t.date_naive().and_time(NaiveTime::MIN))
}

/// `base + 2^exponent` days. Saturates at the last representable instant
/// once the span no longer fits.
pub(crate) fn add_pow2_days(base: DateTime<Utc>, exponent: u32) -> DateTime<Utc> {
    2i64.checked_pow(exponent)
        .and_then(Duration::try_days)
        .and_then(|span| base.checked_add_signed(span))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

pub(crate) fn add_span(base: DateTime<Utc>, span: Duration) -> DateTime<Utc> {
    base.checked_add_signed(span).unwrap_or(base)
}

/// Midnight UTC of `base + 2^interval` days.
pub fn calculate_next_due_date(interval: u32, base: DateTime<Utc>) -> DateTime<Utc> {
    start_of_day(add_pow2_days(base, interval))
}

/// Fresh state: interval 0, due tomorrow, never reviewed.
pub fn initialize_card(now: DateTime<Utc>) -> IntervalState {
    IntervalState {
        due_date: Some(calculate_next_due_date(0, now)),
        review_interval: 0,
        review_count: 0,
        last_reviewed: None,
    }
}

pub fn schedule_card(state: &IntervalState, success: bool, now: DateTime<Utc>) -> IntervalState {
    let review_interval = if success {
        state.review_interval.saturating_add(1)
    } else {
        0
    };
    IntervalState {
        due_date: Some(calculate_next_due_date(review_interval, now)),
        review_interval,
        review_count: state.review_count.saturating_add(1),
        last_reviewed: Some(now),
    }
}

/// Anything with an optional due date can be checked and ordered by it.
pub trait DueDate {
    fn due_date(&self) -> Option<DateTime<Utc>>;
}

impl DueDate for IntervalState {
    fn due_date(&self) -> Option<DateTime<Utc>> {
        self.due_date
    }
}

impl<T: DueDate> DueDate for &T {
    fn due_date(&self) -> Option<DateTime<Utc>> {
        (*self).due_date()
    }
}

/// A card without a due date is due.
pub fn is_card_due(due: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match due {
        None => true,
        Some(d) => start_of_day(d) <= start_of_day(now),
    }
}

/// A card without a due date is never overdue.
pub fn is_card_overdue(due: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match due {
        None => false,
        Some(d) => start_of_day(d) < start_of_day(now),
    }
}

/// Whole days from today until the due day; negative when overdue, 0 when
/// there is no due date.
pub fn days_until_due(due: Option<DateTime<Utc>>, now: DateTime<Utc>) -> i64 {
    match due {
        None => 0,
        Some(d) => (start_of_day(d) - start_of_day(now)).num_days(),
    }
}

/// Earliest first; undated items keep their relative order at the tail.
pub fn sort_by_due_date<T: DueDate>(items: &mut [T]) {
    items.sort_by(|a, b| match (a.due_date(), b.due_date()) {
        (None, None) => std::cmp::Ordering::Equal,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (Some(_), None) => std::cmp::Ordering::Less,
        (Some(x), Some(y)) => x.cmp(&y),
    });
}
