use chrono::{Duration, TimeZone, Utc};
use mimir_core::memory::MemoryStore;
use mimir_core::{
    Card, CardMode, CardQuery, CardRecord, CardStore, CoreError, LegacyCard, SchedulingPolicy,
    Scope,
};
use uuid::Uuid;

#[tokio::test]
async fn put_get_delete() {
    let store = MemoryStore::new();
    let card = Card::create("q", "a", SchedulingPolicy::Interval, Utc::now()).unwrap();
    store.put(&card).await.unwrap();
    assert_eq!(store.get(card.id).await.unwrap(), Some(card.clone()));

    let mut edited = card.clone();
    edited.response = "b".into();
    store.put(&edited).await.unwrap();
    assert_eq!(store.len(), 1);
    assert_eq!(store.get(card.id).await.unwrap().unwrap().response, "b");

    store.delete(card.id).await.unwrap();
    assert_eq!(store.get(card.id).await.unwrap(), None);
    assert!(matches!(store.delete(card.id).await, Err(CoreError::NotFound(_))));
}

#[tokio::test]
async fn decks_are_unique_and_cascade() {
    let store = MemoryStore::new();
    let deck = store.create_deck("Spanish", Some("basics")).await.unwrap();
    assert_eq!(deck.description.as_deref(), Some("basics"));
    assert!(matches!(
        store.create_deck("spanish", None).await,
        Err(CoreError::Conflict(_))
    ));
    assert!(matches!(store.create_deck("  ", None).await, Err(CoreError::Invalid(_))));

    let owned = Card::create("q", "a", SchedulingPolicy::Mode, Utc::now())
        .unwrap()
        .in_deck(deck.id);
    let loose = Card::create("q2", "a2", SchedulingPolicy::Interval, Utc::now()).unwrap();
    store.put(&owned).await.unwrap();
    store.put(&loose).await.unwrap();

    store.delete_deck(deck.id).await.unwrap();
    assert!(store.get(owned.id).await.unwrap().is_none());
    assert!(store.get(loose.id).await.unwrap().is_some());
    assert!(store.list_decks().await.unwrap().is_empty());
}

#[tokio::test]
async fn put_rejects_unknown_deck() {
    let store = MemoryStore::new();
    let card = Card::create("q", "a", SchedulingPolicy::Mode, Utc::now())
        .unwrap()
        .in_deck(Uuid::new_v4());
    assert!(matches!(store.put(&card).await, Err(CoreError::NotFound("deck"))));
}

#[tokio::test]
async fn query_by_mode_and_due_range() {
    let now = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
    let store = MemoryStore::new();
    let learning = Card::create("l", "r", SchedulingPolicy::Mode, now).unwrap();
    let mut retaining = Card::create("r", "r", SchedulingPolicy::Mode, now).unwrap();
    retaining.graduate(now);
    let tagged = Card::create("t", "r", SchedulingPolicy::Interval, now)
        .unwrap()
        .with_tags(["verbs"]);
    for c in [&learning, &retaining, &tagged] {
        store.put(c).await.unwrap();
    }

    let q = CardQuery::all().with_mode(CardMode::Learning);
    let v = store.get_all(&q).await.unwrap();
    assert_eq!(v.len(), 1);
    assert_eq!(v[0].id, learning.id);

    let q = CardQuery::all().due_before(now + Duration::hours(1));
    let ids: Vec<_> = store.get_all(&q).await.unwrap().into_iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![learning.id]);

    let q = CardQuery::scope(Scope::Tag("verbs".into()));
    assert_eq!(store.get_all(&q).await.unwrap().len(), 1);
    let q = CardQuery::scope(Scope::Untagged);
    assert_eq!(store.get_all(&q).await.unwrap().len(), 2);
}

#[tokio::test]
async fn seeding_from_records_migrates_legacy_cards() {
    let legacy = LegacyCard {
        id: Some("old-1".into()),
        prompt: "p".into(),
        response: "r".into(),
        ..LegacyCard::default()
    };
    let current = Card::create("q", "a", SchedulingPolicy::Mode, Utc::now()).unwrap();
    let (store, migrated) =
        MemoryStore::from_records(vec![CardRecord::Legacy(legacy), CardRecord::from(current.clone())]);
    assert_eq!(migrated, 1);
    assert_eq!(store.len(), 2);
    assert_eq!(store.get(current.id).await.unwrap(), Some(current));
    assert_eq!(
        store.get_all(&CardQuery::all()).await.unwrap().iter().filter(|c| c.is_due(Utc::now())).count(),
        0
    );
}
