use crate::{Card, CardId, CardMode, CoreError, Deck, DeckId, Scope};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub mod memory;

/// Field filters for `CardStore::get_all`. Empty query matches every card.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CardQuery {
    pub scope: Scope,
    /// Only cards on the mode policy in this mode.
    pub mode: Option<CardMode>,
    /// Only cards with a due date at or before this instant.
    pub due_before: Option<DateTime<Utc>>,
}

impl CardQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn scope(scope: Scope) -> Self {
        Self {
            scope,
            ..Self::default()
        }
    }

    pub fn with_mode(mut self, mode: CardMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn due_before(mut self, at: DateTime<Utc>) -> Self {
        self.due_before = Some(at);
        self
    }

    pub fn matches(&self, card: &Card) -> bool {
        use crate::scheduler::DueDate;

        if !card.in_scope(&self.scope) {
            return false;
        }
        if let Some(mode) = self.mode {
            if card.mode() != Some(mode) {
                return false;
            }
        }
        if let Some(limit) = self.due_before {
            match card.due_date() {
                Some(d) if d <= limit => {}
                _ => return false,
            }
        }
        true
    }
}

/// Trims the name and rejects blanks or case-insensitive duplicates.
pub fn validate_deck_name<'d>(
    name: &str,
    existing: impl IntoIterator<Item = &'d Deck>,
) -> Result<String, CoreError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CoreError::Invalid("deck name must not be empty"));
    }
    if existing.into_iter().any(|d| d.name.eq_ignore_ascii_case(name)) {
        return Err(CoreError::Conflict("deck name already exists"));
    }
    Ok(name.to_string())
}

#[async_trait]
pub trait CardStore: Send + Sync {
    // Cards
    async fn get(&self, id: CardId) -> Result<Option<Card>, CoreError>;
    async fn get_all(&self, query: &CardQuery) -> Result<Vec<Card>, CoreError>;
    /// Insert or replace, keyed by id.
    async fn put(&self, card: &Card) -> Result<(), CoreError>;
    async fn delete(&self, id: CardId) -> Result<(), CoreError>;

    // Decks
    async fn create_deck(&self, name: &str, description: Option<&str>) -> Result<Deck, CoreError>;
    async fn get_deck(&self, id: DeckId) -> Result<Deck, CoreError>;
    async fn list_decks(&self) -> Result<Vec<Deck>, CoreError>;
    /// Removes the deck and every card it owns.
    async fn delete_deck(&self, id: DeckId) -> Result<(), CoreError>;
}
