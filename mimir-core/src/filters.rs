use crate::scheduler::sort_by_due_date;
use crate::{Card, Scope, UNTAGGED_DECK};
use chrono::{DateTime, Utc};

pub fn filter_by_text(cards: &[Card], query: &str) -> Vec<Card> {
    let q = query.trim().to_lowercase();
    if q.is_empty() {
        return cards.to_vec();
    }
    cards
        .iter()
        .filter(|c| {
            c.prompt.to_lowercase().contains(&q)
                || c.response.to_lowercase().contains(&q)
                || c.tags.iter().any(|t| t.to_lowercase().contains(&q))
        })
        .cloned()
        .collect()
}

pub fn filter_by_tag(cards: &[Card], tag: &str) -> Vec<Card> {
    cards.iter().filter(|c| c.has_tag(tag)).cloned().collect()
}

pub fn filter_by_scope(cards: &[Card], scope: &Scope) -> Vec<Card> {
    cards.iter().filter(|c| c.in_scope(scope)).cloned().collect()
}

/// Cards currently due, earliest first.
pub fn due_cards(cards: &[Card], now: DateTime<Utc>) -> Vec<Card> {
    let mut v: Vec<Card> = cards.iter().filter(|c| c.is_due(now)).cloned().collect();
    sort_by_due_date(&mut v);
    v
}

pub fn overdue_cards(cards: &[Card], now: DateTime<Utc>) -> Vec<Card> {
    cards.iter().filter(|c| c.is_overdue(now)).cloned().collect()
}

/// Unique tags in first-seen order.
pub fn all_tags(cards: &[Card]) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for t in cards.iter().flat_map(|c| c.tags.iter()) {
        if !tags.iter().any(|x| x == t) {
            tags.push(t.clone());
        }
    }
    tags
}

/// Tag decks, plus the `None` deck when any card is untagged.
pub fn implicit_decks(cards: &[Card]) -> Vec<String> {
    let mut decks = all_tags(cards);
    if cards.iter().any(Card::is_untagged) {
        decks.push(UNTAGGED_DECK.to_string());
    }
    decks
}
