use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mimir_core::{
    normalize_all, validate_deck_name, Card, CardId, CardQuery, CardRecord, CardStore, CoreError,
    Deck, DeckId,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::task;
use tracing::{debug, info, warn};

pub mod paths;

const FILE_VERSION: u32 = 2;

#[derive(Clone, Serialize, Deserialize)]
struct FileImage {
    version: u32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(default)]
    decks: Vec<Deck>,
    cards: Vec<CardRecord>,
}

/// Accepts the current image or a bare array of cards as exported by older
/// builds.
#[derive(Deserialize)]
#[serde(untagged)]
enum OnDisk {
    Image(FileImage),
    Cards(Vec<CardRecord>),
}

#[derive(Default, Clone)]
struct State {
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    decks: HashMap<DeckId, Deck>,
    cards: HashMap<CardId, Card>,
}

impl State {
    fn new_empty() -> Self {
        let now = Utc::now();
        Self {
            created_at: now,
            updated_at: now,
            decks: HashMap::new(),
            cards: HashMap::new(),
        }
    }

    fn to_image(&self) -> FileImage {
        let mut decks: Vec<Deck> = self.decks.values().cloned().collect();
        decks.sort_by_key(|d| d.created_at);
        let mut cards: Vec<Card> = self.cards.values().cloned().collect();
        cards.sort_by_key(|c| (c.created_at, c.id));
        FileImage {
            version: FILE_VERSION,
            created_at: self.created_at,
            updated_at: self.updated_at,
            decks,
            cards: cards.into_iter().map(CardRecord::from).collect(),
        }
    }

    /// Returns the state and how many cards needed migrating.
    fn from_disk(disk: OnDisk) -> (Self, usize) {
        let now = Utc::now();
        let (created_at, decks, records) = match disk {
            OnDisk::Image(img) => (img.created_at, img.decks, img.cards),
            OnDisk::Cards(records) => (now, Vec::new(), records),
        };
        let (cards, migrated) = normalize_all(records, now);
        let state = Self {
            created_at,
            updated_at: now,
            decks: decks.into_iter().map(|d| (d.id, d)).collect(),
            cards: cards.into_iter().map(|c| (c.id, c)).collect(),
        };
        (state, migrated)
    }
}

pub struct JsonStore {
    path: PathBuf,
    backups_dir: PathBuf,
    max_backups: usize,
    state: RwLock<State>,
}

impl JsonStore {
    pub async fn open_default() -> Result<Self, CoreError> {
        let (file, backups) = paths::default_store_file();
        Self::open_with(file, backups, 10).await
    }

    /// Opens `path`, keeping backups in a `backups/` dir next to it.
    pub async fn open(path: PathBuf) -> Result<Self, CoreError> {
        let backups = path
            .parent()
            .map(|p| p.join("backups"))
            .unwrap_or_else(|| PathBuf::from("backups"));
        Self::open_with(path, backups, 10).await
    }

    pub async fn open_with(path: PathBuf, backups_dir: PathBuf, max_backups: usize) -> Result<Self, CoreError> {
        ensure_parent_dirs(&path)?;
        ensure_dir(&backups_dir)?;
        let (state, migrated) = load_or_init(&path, &backups_dir).await?;
        let store = Self {
            path,
            backups_dir,
            max_backups: max_backups.max(1),
            state: RwLock::new(state),
        };
        if migrated > 0 {
            info!(migrated, path = %store.path.display(), "writing back migrated cards");
            store.save().await?;
        }
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn save(&self) -> Result<(), CoreError> {
        let snapshot = {
            let mut s = self.state.write();
            s.updated_at = Utc::now();
            s.to_image()
        };
        let path = self.path.clone();
        let backups = self.backups_dir.clone();
        let keep = self.max_backups;

        task::spawn_blocking(move || write_with_backup(&path, &backups, keep, &snapshot))
            .await
            .map_err(CoreError::storage)?
            .map_err(|e| {
                warn!(error = %e, "failed to write card store");
                CoreError::storage(e)
            })?;
        debug!(path = %self.path.display(), "card store saved");
        Ok(())
    }
}

fn ensure_parent_dirs(path: &Path) -> Result<(), CoreError> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    Ok(())
}

fn ensure_dir(path: &Path) -> Result<(), CoreError> {
    fs::create_dir_all(path).map_err(CoreError::storage)
}

async fn load_or_init(path: &Path, backups_dir: &Path) -> Result<(State, usize), CoreError> {
    if path.exists() {
        let p = path.to_path_buf();
        let disk: OnDisk = task::spawn_blocking(move || {
            let buf = fs::read_to_string(&p)?;
            serde_json::from_str::<OnDisk>(&buf).map_err(io::Error::from)
        })
        .await
        .map_err(CoreError::storage)?
        .map_err(CoreError::storage)?;
        Ok(State::from_disk(disk))
    } else {
        let st = State::new_empty();
        let img = st.to_image();
        write_with_backup(path, backups_dir, 1, &img).map_err(CoreError::storage)?;
        Ok((st, 0))
    }
}

fn write_with_backup(path: &Path, backups_dir: &Path, max_backups: usize, img: &FileImage) -> Result<(), io::Error> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::create_dir_all(backups_dir)?;

    let json = serde_json::to_vec_pretty(img).map_err(io::Error::from)?;
    let mut tmp = NamedTempFile::new_in(path.parent().unwrap_or_else(|| Path::new(".")))?;
    tmp.write_all(&json)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;

    let ts = chrono::Local::now().format("%Y%m%d-%H%M%S%.3f");
    let backup_path = backups_dir.join(format!("mimir-{ts}.json"));
    let mut btmp = NamedTempFile::new_in(backups_dir)?;
    btmp.write_all(&json)?;
    btmp.flush()?;
    btmp.persist(&backup_path).map_err(|e| e.error)?;

    rotate_backups(backups_dir, max_backups)
}

fn rotate_backups(dir: &Path, keep: usize) -> Result<(), io::Error> {
    let mut entries: Vec<_> = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("json"))
        .collect();
    entries.sort_by_key(|e| e.file_name());
    if entries.len() > keep {
        for e in &entries[0..entries.len() - keep] {
            let _ = fs::remove_file(e.path());
        }
    }
    Ok(())
}

#[async_trait]
impl CardStore for JsonStore {
    async fn get(&self, id: CardId) -> Result<Option<Card>, CoreError> {
        Ok(self.state.read().cards.get(&id).cloned())
    }

    async fn get_all(&self, query: &CardQuery) -> Result<Vec<Card>, CoreError> {
        let s = self.state.read();
        let mut v: Vec<Card> = s.cards.values().filter(|c| query.matches(c)).cloned().collect();
        v.sort_by_key(|c| (c.created_at, c.id));
        Ok(v)
    }

    async fn put(&self, card: &Card) -> Result<(), CoreError> {
        let previous = {
            let mut s = self.state.write();
            if let Some(deck_id) = card.deck_id {
                if !s.decks.contains_key(&deck_id) {
                    return Err(CoreError::NotFound("deck"));
                }
            }
            s.cards.insert(card.id, card.clone())
        };
        if let Err(e) = self.save().await {
            let mut s = self.state.write();
            match previous {
                Some(old) => s.cards.insert(card.id, old),
                None => s.cards.remove(&card.id),
            };
            return Err(e);
        }
        Ok(())
    }

    async fn delete(&self, id: CardId) -> Result<(), CoreError> {
        let removed = self
            .state
            .write()
            .cards
            .remove(&id)
            .ok_or(CoreError::NotFound("card"))?;
        if let Err(e) = self.save().await {
            self.state.write().cards.insert(id, removed);
            return Err(e);
        }
        Ok(())
    }

    async fn create_deck(&self, name: &str, description: Option<&str>) -> Result<Deck, CoreError> {
        let deck = {
            let mut s = self.state.write();
            let name = validate_deck_name(name, s.decks.values())?;
            let mut deck = Deck::new(name);
            deck.description = description.map(|d| d.to_string());
            s.decks.insert(deck.id, deck.clone());
            deck
        };
        if let Err(e) = self.save().await {
            self.state.write().decks.remove(&deck.id);
            return Err(e);
        }
        Ok(deck)
    }

    async fn get_deck(&self, id: DeckId) -> Result<Deck, CoreError> {
        let s = self.state.read();
        s.decks.get(&id).cloned().ok_or(CoreError::NotFound("deck"))
    }

    async fn list_decks(&self) -> Result<Vec<Deck>, CoreError> {
        let mut v: Vec<Deck> = self.state.read().decks.values().cloned().collect();
        v.sort_by_key(|d| d.created_at);
        Ok(v)
    }

    async fn delete_deck(&self, id: DeckId) -> Result<(), CoreError> {
        let before = {
            let mut s = self.state.write();
            if !s.decks.contains_key(&id) {
                return Err(CoreError::NotFound("deck"));
            }
            let before = s.clone();
            s.decks.remove(&id);
            s.cards.retain(|_, c| c.deck_id != Some(id));
            before
        };
        if let Err(e) = self.save().await {
            *self.state.write() = before;
            return Err(e);
        }
        Ok(())
    }
}
