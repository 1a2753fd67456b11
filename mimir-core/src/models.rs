use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::CoreError;

pub type DeckId = Uuid;
pub type CardId = Uuid;

/// Name of the implicit deck holding cards without tags.
pub const UNTAGGED_DECK: &str = "None";

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CardMode {
    Learning,
    Retaining,
}

impl CardMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardMode::Learning => "learning",
            CardMode::Retaining => "retaining",
        }
    }
}

impl fmt::Display for CardMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a review session sequences its working set.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ReviewMode {
    /// Every card in scope, drilled until mastered. Nothing is persisted.
    Blitz,
    /// Unlearned cards, drilled until mastered, then graduated.
    Learning,
    /// Due cards only, one pass, each answer rescheduled and persisted.
    Retaining,
}

impl ReviewMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewMode::Blitz => "blitz",
            ReviewMode::Learning => "learning",
            ReviewMode::Retaining => "retaining",
        }
    }

    pub fn tracks_mastery(&self) -> bool {
        matches!(self, ReviewMode::Blitz | ReviewMode::Learning)
    }
}

impl fmt::Display for ReviewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReviewMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "blitz" => Ok(ReviewMode::Blitz),
            "learning" | "learn" => Ok(ReviewMode::Learning),
            "retaining" | "retain" | "review" => Ok(ReviewMode::Retaining),
            _ => Err(CoreError::Invalid("review mode")),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReviewEntry {
    pub timestamp: DateTime<Utc>,
    pub correct: bool,
}

/// Exponential interval-counter state.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct IntervalState {
    pub due_date: Option<DateTime<Utc>>,
    pub review_interval: u32,
    pub review_count: u32,
    pub last_reviewed: Option<DateTime<Utc>>,
}

/// Learning/retaining mode state with the full retention history.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModeState {
    pub mode: CardMode,
    pub due_date: DateTime<Utc>,
    #[serde(default)]
    pub review_history: Vec<ReviewEntry>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum Schedule {
    Interval(IntervalState),
    Mode(ModeState),
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Deck {
    pub id: DeckId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Deck {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            created_at: Utc::now(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Card {
    pub id: CardId,
    #[serde(default)]
    pub deck_id: Option<DeckId>,
    pub prompt: String,
    pub response: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub schedule: Schedule,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Card {
    pub fn new(prompt: impl Into<String>, response: impl Into<String>, schedule: Schedule) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            deck_id: None,
            prompt: prompt.into(),
            response: response.into(),
            tags: Vec::new(),
            schedule,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn in_deck(mut self, deck_id: DeckId) -> Self {
        self.deck_id = Some(deck_id);
        self
    }

    pub fn is_untagged(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        let q = tag.trim().to_lowercase();
        self.tags.iter().any(|t| t.to_lowercase() == q)
    }

    pub fn in_scope(&self, scope: &Scope) -> bool {
        match scope {
            Scope::All => true,
            Scope::Deck(id) => self.deck_id == Some(*id),
            Scope::Tag(tag) => self.has_tag(tag),
            Scope::Untagged => self.is_untagged(),
        }
    }
}

/// Selects the cards a session or query works over.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum Scope {
    #[default]
    All,
    Deck(DeckId),
    Tag(String),
    Untagged,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::All => f.write_str("all"),
            Scope::Deck(id) => write!(f, "deck:{id}"),
            Scope::Tag(tag) => write!(f, "tag:{tag}"),
            Scope::Untagged => f.write_str(UNTAGGED_DECK),
        }
    }
}

impl FromStr for Scope {
    type Err = CoreError;

    /// `None` selects untagged cards, `all` everything, a UUID an explicit
    /// deck, anything else a tag.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(CoreError::Invalid("empty scope"));
        }
        if s == UNTAGGED_DECK {
            return Ok(Scope::Untagged);
        }
        if s.eq_ignore_ascii_case("all") {
            return Ok(Scope::All);
        }
        if let Some(rest) = s.strip_prefix("tag:") {
            return Ok(Scope::Tag(rest.trim().to_lowercase()));
        }
        let id_part = s.strip_prefix("deck:").unwrap_or(s);
        match Uuid::parse_str(id_part) {
            Ok(id) => Ok(Scope::Deck(id)),
            Err(_) => Ok(Scope::Tag(s.to_lowercase())),
        }
    }
}

/// Splits a comma separated tag list, trimming and lowercasing each entry.
pub fn parse_tags(input: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for t in input.split(',').map(|t| t.trim().to_lowercase()) {
        if !t.is_empty() && !tags.contains(&t) {
            tags.push(t);
        }
    }
    tags
}
