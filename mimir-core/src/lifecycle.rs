//! Card lifecycle: creation, policy dispatch for scheduling transitions, and
//! migration of records written before scheduling state existed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::scheduler::{self, DueDate, SchedulingPolicy};
use crate::{
    Card, CardId, CardMode, CoreError, DeckId, IntervalState, ModeState, ReviewEntry, Schedule,
};

impl Card {
    /// Validated constructor used by the store-facing entry points.
    pub fn create(
        prompt: &str,
        response: &str,
        policy: SchedulingPolicy,
        now: DateTime<Utc>,
    ) -> Result<Card, CoreError> {
        let prompt = prompt.trim();
        let response = response.trim();
        if prompt.is_empty() {
            return Err(CoreError::Invalid("prompt must not be empty"));
        }
        if response.is_empty() {
            return Err(CoreError::Invalid("response must not be empty"));
        }
        let mut card = Card::new(prompt, response, policy.initial_schedule(now));
        card.created_at = now;
        card.updated_at = now;
        Ok(card)
    }

    pub fn policy(&self) -> SchedulingPolicy {
        SchedulingPolicy::of(&self.schedule)
    }

    pub fn mode(&self) -> Option<CardMode> {
        match &self.schedule {
            Schedule::Interval(_) => None,
            Schedule::Mode(m) => Some(m.mode),
        }
    }

    pub fn is_learning(&self) -> bool {
        self.mode() == Some(CardMode::Learning)
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match &self.schedule {
            Schedule::Interval(s) => scheduler::is_card_due(s.due_date, now),
            Schedule::Mode(m) => scheduler::is_retain_due(m, now),
        }
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        match &self.schedule {
            Schedule::Interval(s) => scheduler::is_card_overdue(s.due_date, now),
            Schedule::Mode(m) => {
                m.mode == CardMode::Retaining && scheduler::is_card_overdue(Some(m.due_date), now)
            }
        }
    }

    pub fn days_until_due(&self, now: DateTime<Utc>) -> i64 {
        scheduler::days_until_due(self.due_date(), now)
    }

    /// Applies one retention answer with whichever policy the card follows.
    pub fn apply_retention_answer(&mut self, success: bool, now: DateTime<Utc>) {
        self.schedule = match &self.schedule {
            Schedule::Interval(s) => Schedule::Interval(scheduler::schedule_card(s, success, now)),
            Schedule::Mode(m) => Schedule::Mode(scheduler::schedule_retain_card(m, success, now)),
        };
        self.updated_at = now;
    }

    /// Learning → retaining. Returns `false` when there is nothing to
    /// graduate: interval cards, or cards already retaining.
    pub fn graduate(&mut self, now: DateTime<Utc>) -> bool {
        let Schedule::Mode(m) = &self.schedule else {
            return false;
        };
        if m.mode != CardMode::Learning {
            return false;
        }
        self.schedule = Schedule::Mode(scheduler::graduate_card(m, now));
        self.updated_at = now;
        true
    }
}

impl DueDate for Card {
    fn due_date(&self) -> Option<DateTime<Utc>> {
        match &self.schedule {
            Schedule::Interval(s) => s.due_date,
            Schedule::Mode(m) => Some(m.due_date),
        }
    }
}

/// A card as written by older builds: content present, scheduling fields
/// possibly missing, and ids that may not be UUIDs.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
pub struct LegacyCard {
    #[serde(alias = "card_id")]
    pub id: Option<String>,
    pub deck_id: Option<DeckId>,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub response: String,
    pub tags: Option<Vec<String>>,
    pub due_date: Option<DateTime<Utc>>,
    pub review_interval: Option<u32>,
    pub review_count: Option<u32>,
    pub last_reviewed: Option<DateTime<Utc>>,
    pub mode: Option<CardMode>,
    pub review_history: Option<Vec<ReviewEntry>>,
    pub created_at: Option<DateTime<Utc>>,
}

impl DueDate for LegacyCard {
    fn due_date(&self) -> Option<DateTime<Utc>> {
        self.due_date
    }
}

/// What a store reads back before normalisation.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum CardRecord {
    Scheduled(Card),
    Legacy(LegacyCard),
}

impl From<Card> for CardRecord {
    fn from(card: Card) -> Self {
        CardRecord::Scheduled(card)
    }
}

#[derive(Clone, Debug)]
pub struct Normalized {
    pub card: Card,
    /// True when the record had to be rewritten and should be saved back.
    pub migrated: bool,
}

fn legacy_id(raw: Option<&str>) -> CardId {
    match raw {
        None => Uuid::new_v4(),
        Some(s) => Uuid::parse_str(s).unwrap_or_else(|_| Uuid::new_v5(&Uuid::NAMESPACE_OID, s.as_bytes())),
    }
}

fn legacy_schedule(legacy: &LegacyCard, now: DateTime<Utc>) -> Schedule {
    if legacy.mode.is_some() || legacy.review_history.is_some() {
        return Schedule::Mode(ModeState {
            mode: legacy.mode.unwrap_or(CardMode::Learning),
            due_date: legacy.due_date.unwrap_or(now),
            review_history: legacy.review_history.clone().unwrap_or_default(),
        });
    }
    match (legacy.due_date, legacy.review_interval) {
        (Some(due), Some(review_interval)) => Schedule::Interval(IntervalState {
            due_date: Some(due),
            review_interval,
            review_count: legacy.review_count.unwrap_or(0),
            last_reviewed: legacy.last_reviewed,
        }),
        _ => Schedule::Interval(scheduler::initialize_card(now)),
    }
}

/// Total migration to the current card shape. Never fails: whatever is
/// missing gets the policy's fresh-card defaults.
pub fn normalize(record: CardRecord, now: DateTime<Utc>) -> Normalized {
    match record {
        CardRecord::Scheduled(card) => Normalized {
            card,
            migrated: false,
        },
        CardRecord::Legacy(legacy) => {
            let schedule = legacy_schedule(&legacy, now);
            let card = Card {
                id: legacy_id(legacy.id.as_deref()),
                deck_id: legacy.deck_id,
                prompt: legacy.prompt,
                response: legacy.response,
                tags: legacy.tags.unwrap_or_default(),
                schedule,
                created_at: legacy.created_at.unwrap_or(now),
                updated_at: now,
            };
            Normalized {
                card,
                migrated: true,
            }
        }
    }
}

/// Normalises a batch, returning the cards and how many needed migration.
pub fn normalize_all(records: Vec<CardRecord>, now: DateTime<Utc>) -> (Vec<Card>, usize) {
    let mut migrated = 0usize;
    let cards = records
        .into_iter()
        .map(|r| {
            let n = normalize(r, now);
            if n.migrated {
                tracing::info!(card_id = %n.card.id, "migrated card to current scheduling fields");
                migrated += 1;
            }
            n.card
        })
        .collect();
    (cards, migrated)
}
