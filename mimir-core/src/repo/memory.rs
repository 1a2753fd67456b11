use crate::lifecycle::{normalize_all, CardRecord};
use crate::repo::{validate_deck_name, CardQuery, CardStore};
use crate::{Card, CardId, CoreError, Deck, DeckId};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Default)]
pub struct MemoryStore {
    decks: RwLock<HashMap<DeckId, Deck>>,
    cards: RwLock<HashMap<CardId, Card>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store from raw records, migrating legacy ones on the way in.
    /// Returns the store and how many records were migrated.
    pub fn from_records(records: Vec<CardRecord>) -> (Self, usize) {
        let (cards, migrated) = normalize_all(records, Utc::now());
        let store = Self::new();
        {
            let mut m = store.cards.write();
            for c in cards {
                m.insert(c.id, c);
            }
        }
        (store, migrated)
    }

    pub fn len(&self) -> usize {
        self.cards.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.read().is_empty()
    }
}

#[async_trait]
impl CardStore for MemoryStore {
    async fn get(&self, id: CardId) -> Result<Option<Card>, CoreError> {
        Ok(self.cards.read().get(&id).cloned())
    }

    async fn get_all(&self, query: &CardQuery) -> Result<Vec<Card>, CoreError> {
        let cards = self.cards.read();
        let mut v: Vec<Card> = cards.values().filter(|c| query.matches(c)).cloned().collect();
        v.sort_by_key(|c| (c.created_at, c.id));
        Ok(v)
    }

    async fn put(&self, card: &Card) -> Result<(), CoreError> {
        if let Some(deck_id) = card.deck_id {
            if !self.decks.read().contains_key(&deck_id) {
                return Err(CoreError::NotFound("deck"));
            }
        }
        self.cards.write().insert(card.id, card.clone());
        Ok(())
    }

    async fn delete(&self, id: CardId) -> Result<(), CoreError> {
        self.cards
            .write()
            .remove(&id)
            .ok_or(CoreError::NotFound("card"))?;
        Ok(())
    }

    async fn create_deck(&self, name: &str, description: Option<&str>) -> Result<Deck, CoreError> {
        let mut m = self.decks.write();
        let name = validate_deck_name(name, m.values())?;
        let mut deck = Deck::new(name);
        deck.description = description.map(|s| s.to_string());
        m.insert(deck.id, deck.clone());
        Ok(deck)
    }

    async fn get_deck(&self, id: DeckId) -> Result<Deck, CoreError> {
        self.decks
            .read()
            .get(&id)
            .cloned()
            .ok_or(CoreError::NotFound("deck"))
    }

    async fn list_decks(&self) -> Result<Vec<Deck>, CoreError> {
        let mut v: Vec<Deck> = self.decks.read().values().cloned().collect();
        v.sort_by_key(|d| d.created_at);
        Ok(v)
    }

    async fn delete_deck(&self, id: DeckId) -> Result<(), CoreError> {
        self.decks
            .write()
            .remove(&id)
            .ok_or(CoreError::NotFound("deck"))?;
        self.cards.write().retain(|_, c| c.deck_id != Some(id));
        Ok(())
    }
}
