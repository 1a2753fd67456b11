//! Learning/retaining policy. A card is drilled in `learning` mode until the
//! session masters it, graduates once, and from then on is spaced by the total
//! number of correct retention answers it has ever had. A lapse makes the card
//! due again immediately but does not erase earlier successes.

use chrono::{DateTime, Duration, Utc};

use super::interval::{add_pow2_days, add_span};
use crate::{CardMode, ModeState, ReviewEntry};

pub fn new_learning_state(now: DateTime<Utc>) -> ModeState {
    ModeState {
        mode: CardMode::Learning,
        due_date: now,
        review_history: Vec::new(),
    }
}

/// Moves a card into retention, due one day out. Learning attempts never
/// enter the retention history.
pub fn graduate_card(state: &ModeState, now: DateTime<Utc>) -> ModeState {
    ModeState {
        mode: CardMode::Retaining,
        due_date: add_span(now, Duration::days(1)),
        review_history: state.review_history.clone(),
    }
}

pub fn correct_count(history: &[ReviewEntry]) -> u32 {
    history
        .iter()
        .filter(|e| e.correct)
        .count()
        .try_into()
        .unwrap_or(u32::MAX)
}

pub fn schedule_retain_card(state: &ModeState, success: bool, now: DateTime<Utc>) -> ModeState {
    let mut review_history = state.review_history.clone();
    review_history.push(ReviewEntry {
        timestamp: now,
        correct: success,
    });

    let due_date = if success {
        let n = correct_count(&review_history);
        add_pow2_days(now, n.saturating_sub(1))
    } else {
        now
    };

    ModeState {
        mode: CardMode::Retaining,
        due_date,
        review_history,
    }
}

/// Exact-timestamp check, so a card failed a moment ago is already due.
pub fn is_retain_due(state: &ModeState, now: DateTime<Utc>) -> bool {
    state.mode == CardMode::Retaining && state.due_date <= now
}
