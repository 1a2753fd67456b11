use chrono::Utc;
use mimir_core::{Card, CardQuery, CardStore, CoreError, Schedule, SchedulingPolicy, Scope};
use mimir_json::JsonStore;
use std::fs;
use tempfile::tempdir;

#[tokio::test]
async fn creates_file_and_survives_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("mimir.json");
    let backups = dir.path().join("backups");

    let card_id = {
        let store = JsonStore::open_with(path.clone(), backups.clone(), 3).await.unwrap();
        assert!(path.exists());
        let deck = store.create_deck("French", None).await.unwrap();
        let card = Card::create("bonjour", "hello", SchedulingPolicy::Mode, Utc::now())
            .unwrap()
            .in_deck(deck.id);
        store.put(&card).await.unwrap();
        card.id
    };

    let store = JsonStore::open_with(path, backups, 3).await.unwrap();
    let card = store.get(card_id).await.unwrap().expect("card persisted");
    assert_eq!(card.prompt, "bonjour");
    assert!(card.is_learning());
    assert_eq!(store.list_decks().await.unwrap().len(), 1);
}

#[tokio::test]
async fn backups_are_rotated() {
    let dir = tempdir().unwrap();
    let backups = dir.path().join("backups");
    let store = JsonStore::open_with(dir.path().join("mimir.json"), backups.clone(), 2)
        .await
        .unwrap();
    for i in 0..5 {
        let card = Card::create(&format!("q{i}"), "a", SchedulingPolicy::Interval, Utc::now()).unwrap();
        store.put(&card).await.unwrap();
    }
    let n = fs::read_dir(&backups).unwrap().count();
    assert!(n <= 2, "kept {n} backups");
}

#[tokio::test]
async fn legacy_cards_are_migrated_and_written_back() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("mimir.json");
    fs::write(
        &path,
        r#"[
            {"card_id": "card_1", "prompt": "uno", "response": "one", "tags": ["Spanish"]},
            {"card_id": "card_2", "prompt": "dos", "response": "two", "mode": "retaining"}
        ]"#,
    )
    .unwrap();

    let store = JsonStore::open(path.clone()).await.unwrap();
    let cards = store.get_all(&CardQuery::all()).await.unwrap();
    assert_eq!(cards.len(), 2);
    let uno = cards.iter().find(|c| c.prompt == "uno").unwrap();
    assert!(matches!(uno.schedule, Schedule::Interval(_)));
    let dos = cards.iter().find(|c| c.prompt == "dos").unwrap();
    assert!(matches!(dos.schedule, Schedule::Mode(_)));

    let on_disk = fs::read_to_string(&path).unwrap();
    assert!(on_disk.contains("\"version\": 2"));
    assert!(on_disk.contains("\"policy\""));

    // a second open sees nothing left to migrate and keeps the same ids
    let again = JsonStore::open(path).await.unwrap();
    let ids: Vec<_> = again
        .get_all(&CardQuery::all())
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.id)
        .collect();
    assert!(ids.contains(&uno.id));
    assert!(ids.contains(&dos.id));
}

#[tokio::test]
async fn failed_save_rolls_back() {
    let dir = tempdir().unwrap();
    let backups = dir.path().join("backups");
    let store = JsonStore::open_with(dir.path().join("mimir.json"), backups.clone(), 3)
        .await
        .unwrap();

    // a plain file where the backups dir should be makes every save fail
    fs::remove_dir_all(&backups).unwrap();
    fs::write(&backups, b"not a dir").unwrap();

    let card = Card::create("q", "a", SchedulingPolicy::Interval, Utc::now()).unwrap();
    let err = store.put(&card).await.unwrap_err();
    assert!(matches!(err, CoreError::Storage(_)));
    assert!(err.is_retryable());
    assert!(store.get(card.id).await.unwrap().is_none());
    assert!(store.create_deck("Later", None).await.is_err());
    assert!(store.list_decks().await.unwrap().is_empty());
}

#[tokio::test]
async fn queries_filter_by_scope() {
    let dir = tempdir().unwrap();
    let store = JsonStore::open(dir.path().join("mimir.json")).await.unwrap();
    let tagged = Card::create("a", "b", SchedulingPolicy::Interval, Utc::now())
        .unwrap()
        .with_tags(["verbs"]);
    let loose = Card::create("c", "d", SchedulingPolicy::Interval, Utc::now()).unwrap();
    store.put(&tagged).await.unwrap();
    store.put(&loose).await.unwrap();

    let verbs = store
        .get_all(&CardQuery::scope(Scope::Tag("verbs".into())))
        .await
        .unwrap();
    assert_eq!(verbs.len(), 1);
    assert_eq!(verbs[0].id, tagged.id);

    let untagged = store.get_all(&CardQuery::scope(Scope::Untagged)).await.unwrap();
    assert_eq!(untagged.len(), 1);
    assert_eq!(untagged[0].id, loose.id);
}
