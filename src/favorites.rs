use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use async_channel::{Receiver, Sender, TryRecvError};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::movie::Movie;

struct Inner {
    movies: HashMap<u32, Movie>,
    data_file: PathBuf,
    subscribers: Vec<(u64, Sender<Vec<Movie>>)>,
    next_subscriber: u64,
}

impl Inner {
    fn snapshot(&self) -> Vec<Movie> {
        let mut movies: Vec<Movie> = self.movies.values().cloned().collect();
        movies.sort_by(|a, b| a.original_title.cmp(&b.original_title).then(a.id.cmp(&b.id)));
        movies
    }

    fn publish(&mut self) {
        let snapshot = self.snapshot();
        self.subscribers
            .retain(|(_, tx)| tx.try_send(snapshot.clone()).is_ok());
    }

    fn save_to_file(&self) -> Result<()> {
        if let Some(parent) = self.data_file.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = File::create(&self.data_file)?;
        for movie in self.snapshot() {
            writeln!(file, "{}", serde_json::to_string(&movie)?)?;
        }
        Ok(())
    }
}

/// Locally stored favorites, observable through [`Subscription`]s.
///
/// Only the id, title and poster path of a favorite are stored, so every
/// record handed out is partial.
#[derive(Clone)]
pub struct FavoritesStore {
    inner: Arc<Mutex<Inner>>,
}

impl FavoritesStore {
    pub fn open(data_file: &Path) -> Result<Self> {
        let mut movies = HashMap::new();
        if data_file.exists() {
            let reader = BufReader::new(File::open(data_file)?);
            for line in reader.lines() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<Movie>(&line) {
                    Ok(movie) => {
                        movies.insert(movie.id, movie.to_partial());
                    }
                    Err(err) => warn!("Skipping unreadable favorite in {}: {err}", data_file.display()),
                }
            }
        }
        info!("Loaded {} favorites from {}", movies.len(), data_file.display());

        Ok(FavoritesStore {
            inner: Arc::new(Mutex::new(Inner {
                movies,
                data_file: data_file.to_path_buf(),
                subscribers: Vec::new(),
                next_subscriber: 0,
            })),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores the partial form of `movie`. Returns false if it was already there.
    /// Nothing changes when the file can't be written.
    pub fn add(&self, movie: &Movie) -> Result<bool> {
        let mut inner = self.lock();
        if inner.movies.contains_key(&movie.id) {
            return Ok(false);
        }
        inner.movies.insert(movie.id, movie.to_partial());
        if let Err(err) = inner.save_to_file() {
            inner.movies.remove(&movie.id);
            return Err(err);
        }
        inner.publish();
        debug!("favorite added: {}", movie.id);
        Ok(true)
    }

    pub fn remove(&self, id: u32) -> Result<bool> {
        let mut inner = self.lock();
        let Some(removed) = inner.movies.remove(&id) else {
            return Ok(false);
        };
        if let Err(err) = inner.save_to_file() {
            inner.movies.insert(id, removed);
            return Err(err);
        }
        inner.publish();
        debug!("favorite removed: {id}");
        Ok(true)
    }

    pub fn contains(&self, id: u32) -> bool {
        self.lock().movies.contains_key(&id)
    }

    pub fn list(&self) -> Vec<Movie> {
        self.lock().snapshot()
    }

    /// Registers an observer. The current list is delivered right away,
    /// followed by a fresh snapshot after every change.
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = async_channel::unbounded();
        let mut inner = self.lock();
        let id = inner.next_subscriber;
        inner.next_subscriber += 1;
        let _ = tx.try_send(inner.snapshot());
        inner.subscribers.push((id, tx));

        Subscription {
            id,
            receiver: rx,
            store: Arc::downgrade(&self.inner),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }
}

/// Handle for one observer of the favorites list. Dropping it unregisters.
pub struct Subscription {
    id: u64,
    receiver: Receiver<Vec<Movie>>,
    store: Weak<Mutex<Inner>>,
}

impl Subscription {
    pub fn receiver(&self) -> Receiver<Vec<Movie>> {
        self.receiver.clone()
    }

    /// Returns the newest pending snapshot, skipping older ones.
    pub fn try_latest(&self) -> Option<Vec<Movie>> {
        let mut latest = None;
        loop {
            match self.receiver.try_recv() {
                Ok(snapshot) => latest = Some(snapshot),
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return latest,
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(store) = self.store.upgrade() {
            let mut inner = store.lock().unwrap_or_else(PoisonError::into_inner);
            inner.subscribers.retain(|(id, _)| *id != self.id);
        }
        self.receiver.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full(id: u32, title: &str) -> Movie {
        Movie {
            year: 1999,
            synopsis: "plot".to_string(),
            backdrop_path: Some("/b.jpg".to_string()),
            ..Movie::partial(id, title, "/p.jpg")
        }
    }

    #[test]
    fn test_add_stores_partial_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("favorites.db");

        let store = FavoritesStore::open(&path).unwrap();
        assert!(store.add(&full(603, "The Matrix")).unwrap());
        assert!(!store.add(&full(603, "The Matrix")).unwrap());
        assert!(store.contains(603));

        let reopened = FavoritesStore::open(&path).unwrap();
        let movies = reopened.list();
        assert_eq!(movies.len(), 1);
        assert!(movies[0].is_partial());
        assert_eq!(movies[0].original_title, "The Matrix");
    }

    #[test]
    fn test_subscription_gets_snapshot_then_updates() {
        let dir = tempfile::tempdir().unwrap();
        let store = FavoritesStore::open(&dir.path().join("favorites.db")).unwrap();
        store.add(&full(2, "Heat")).unwrap();

        let sub = store.subscribe();
        assert_eq!(sub.try_latest().map(|m| m.len()), Some(1));
        assert_eq!(sub.try_latest(), None);

        store.add(&full(1, "Alien")).unwrap();
        store.remove(2).unwrap();
        let latest = sub.try_latest().unwrap();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].id, 1);
    }

    #[test]
    fn test_dropping_subscription_unregisters() {
        let dir = tempfile::tempdir().unwrap();
        let store = FavoritesStore::open(&dir.path().join("favorites.db")).unwrap();
        let sub = store.subscribe();
        assert_eq!(store.subscriber_count(), 1);
        drop(sub);
        assert_eq!(store.subscriber_count(), 0);
        assert!(store.add(&full(7, "Se7en")).unwrap());
    }

    #[test]
    fn test_list_is_ordered_by_title() {
        let dir = tempfile::tempdir().unwrap();
        let store = FavoritesStore::open(&dir.path().join("favorites.db")).unwrap();
        store.add(&full(3, "Zodiac")).unwrap();
        store.add(&full(4, "Amélie")).unwrap();
        let titles: Vec<String> = store.list().into_iter().map(|m| m.original_title).collect();
        assert_eq!(titles, vec!["Amélie", "Zodiac"]);
    }

    #[test]
    fn test_failed_add_leaves_store_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, "").unwrap();
        let store = FavoritesStore::open(&blocker.join("favorites.db")).unwrap();
        let sub = store.subscribe();
        assert_eq!(sub.try_latest(), Some(Vec::new()));

        assert!(store.add(&full(11, "Brazil")).is_err());
        assert!(!store.contains(11));
        assert!(store.list().is_empty());
        assert_eq!(sub.try_latest(), None);
    }

    #[test]
    fn test_failed_remove_keeps_favorite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("favorites.db");
        let store = FavoritesStore::open(&path).unwrap();
        store.add(&full(12, "Ran")).unwrap();
        let sub = store.subscribe();
        sub.try_latest();

        // A directory in place of the data file makes the rewrite fail.
        fs::remove_file(&path).unwrap();
        fs::create_dir(&path).unwrap();

        assert!(store.remove(12).is_err());
        assert!(store.contains(12));
        assert_eq!(store.list().len(), 1);
        assert_eq!(sub.try_latest(), None);
    }
}
