//! Drives the main screen through the background runtime with a fake TMDB,
//! the way the GTK host does, and checks what ends up rendered and navigated.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use async_channel::Receiver;
use tempfile::TempDir;

use popular_movies::favorites::FavoritesStore;
use popular_movies::movie::{BundleValue, DetailsPayload, Movie, DETAILS_BACKDROP_PATH_KEY};
use popular_movies::runtime::TaskRunner;
use popular_movies::screen::{Effect, MainScreen, Navigation, ScreenEvent};
use popular_movies::settings::Settings;
use popular_movies::sort::SortMode;
use popular_movies::tmdb::MovieApi;
use popular_movies::Result;

#[derive(Default)]
struct FakeTmdb {
    list_calls: Mutex<Vec<SortMode>>,
    detail_calls: Mutex<Vec<u32>>,
    detail_delay: Duration,
}

fn full_movie(id: u32) -> Movie {
    Movie {
        id,
        original_title: format!("Movie {id}"),
        year: 2010,
        popularity: 100.0 - f64::from(id),
        vote_average: 7.5,
        synopsis: format!("Plot of {id}"),
        poster_path: format!("/poster{id}.jpg"),
        backdrop_path: Some(format!("/backdrop{id}.jpg")),
    }
}

impl MovieApi for FakeTmdb {
    fn fetch_movies(&self, mode: SortMode) -> Result<Vec<Movie>> {
        let mut calls = self.list_calls.lock().unwrap();
        calls.push(mode);
        let base = calls.len() as u32 * 10;
        Ok(vec![full_movie(base + 1), full_movie(base + 2)])
    }

    fn fetch_movie(&self, id: u32) -> Result<Movie> {
        self.detail_calls.lock().unwrap().push(id);
        thread::sleep(self.detail_delay);
        Ok(full_movie(id))
    }
}

struct Harness {
    screen: MainScreen,
    runner: TaskRunner,
    events: Receiver<ScreenEvent>,
    settings: Settings,
    favorites: FavoritesStore,
    api: Arc<FakeTmdb>,
    _dir: TempDir,
}

impl Harness {
    fn new(api: FakeTmdb, backfill_timeout: Duration) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let api = Arc::new(api);
        let (runner, events) = TaskRunner::new(api.clone(), backfill_timeout).unwrap();
        let settings = Settings::open(&dir.path().join("settings.json"));
        let favorites = FavoritesStore::open(&dir.path().join("favorites.db")).unwrap();

        let mut screen = MainScreen::new();
        screen.attach_favorites(favorites.subscribe());

        Harness {
            screen,
            runner,
            events,
            settings,
            favorites,
            api,
            _dir: dir,
        }
    }

    fn mode(&self) -> SortMode {
        self.settings.sort_mode()
    }

    /// Starts background effects and returns the ones the host would handle.
    fn apply(&mut self, effects: Vec<Effect>) -> Vec<Effect> {
        let cancel = self.screen.cancel_token();
        effects
            .into_iter()
            .filter(|effect| !self.runner.spawn(effect, &cancel))
            .collect()
    }

    fn activate(&mut self) -> Vec<Effect> {
        let effects = self.screen.on_activate(self.mode());
        self.apply(effects)
    }

    fn resume(&mut self) -> Vec<Effect> {
        let effects = self.screen.on_resume(self.mode());
        self.apply(effects)
    }

    fn select(&mut self, movie: &Movie) -> Vec<Effect> {
        let effects = self.screen.on_item_selected(movie);
        self.apply(effects)
    }

    /// Waits for the next background result and feeds it to the screen.
    fn pump(&mut self) -> Vec<Effect> {
        let event = self.events.recv_blocking().unwrap();
        let effects = self.screen.handle(event, self.mode());
        self.apply(effects)
    }

    /// Delivers the newest favorites snapshot, if any.
    fn pump_favorites(&mut self) -> Vec<Effect> {
        let Some(snapshot) = self
            .screen
            .favorites_subscription()
            .and_then(|sub| sub.try_latest())
        else {
            return Vec::new();
        };
        let effects = self.screen.handle(ScreenEvent::FavoritesChanged(snapshot), self.mode());
        self.apply(effects)
    }

    fn list_calls(&self) -> Vec<SortMode> {
        self.api.list_calls.lock().unwrap().clone()
    }

    fn detail_calls(&self) -> Vec<u32> {
        self.api.detail_calls.lock().unwrap().clone()
    }
}

fn rendered(effects: &[Effect]) -> Vec<u32> {
    match effects {
        [Effect::Render(movies)] => movies.iter().map(|m| m.id).collect(),
        other => panic!("expected a render, got {other:?}"),
    }
}

fn details(effects: &[Effect]) -> DetailsPayload {
    match effects {
        [Effect::Navigate(Navigation::Details(args))] => {
            assert_eq!(args.len(), 8);
            DetailsPayload::from_bundle(args).expect("complete payload")
        }
        other => panic!("expected details navigation, got {other:?}"),
    }
}

#[test]
fn popularity_resume_always_refetches() {
    let mut h = Harness::new(FakeTmdb::default(), Duration::from_secs(5));

    assert!(h.activate().is_empty());
    let first = rendered(&h.pump());
    assert_eq!(first, vec![11, 12]);

    assert!(h.resume().is_empty());
    let second = rendered(&h.pump());
    assert_eq!(second, vec![21, 22]);

    assert_eq!(h.list_calls(), vec![SortMode::Popularity, SortMode::Popularity]);
}

#[test]
fn favorites_then_rating_renders_network_list() {
    let mut h = Harness::new(FakeTmdb::default(), Duration::from_secs(5));
    h.settings.set_sort_mode(SortMode::Favorites).unwrap();
    h.favorites.add(&full_movie(1)).unwrap();
    h.favorites.add(&full_movie(2)).unwrap();

    assert!(h.activate().is_empty());
    assert_eq!(rendered(&h.pump_favorites()), vec![1, 2]);
    assert!(h.list_calls().is_empty());

    // Resume in favorites mode re-renders the snapshot without fetching.
    assert_eq!(rendered(&h.resume()), vec![1, 2]);
    assert!(h.list_calls().is_empty());

    h.settings.set_sort_mode(SortMode::Rating).unwrap();
    assert!(h.resume().is_empty());
    assert_eq!(rendered(&h.pump()), vec![11, 12]);
    assert_eq!(h.list_calls(), vec![SortMode::Rating]);
}

#[test]
fn favorites_push_in_network_mode_does_not_render() {
    let mut h = Harness::new(FakeTmdb::default(), Duration::from_secs(5));
    h.activate();
    rendered(&h.pump());

    h.favorites.add(&full_movie(5)).unwrap();
    assert!(h.pump_favorites().is_empty());
    assert_eq!(h.screen.cached_favorites().map(|f| f.len()), Some(1));
}

#[test]
fn complete_selection_skips_network() {
    let mut h = Harness::new(FakeTmdb::default(), Duration::from_secs(5));
    let movie = full_movie(3);
    let payload = details(&h.select(&movie));
    assert_eq!(payload, DetailsPayload::from_movie(&movie));
    assert!(h.detail_calls().is_empty());
}

#[test]
fn partial_selection_uses_fetched_record() {
    let mut h = Harness::new(FakeTmdb::default(), Duration::from_secs(5));
    h.favorites.add(&full_movie(4)).unwrap();
    let stub = h.favorites.list().remove(0);
    assert!(stub.is_partial());

    assert!(h.select(&stub).is_empty());
    let payload = details(&h.pump());
    assert_eq!(payload, DetailsPayload::from_movie(&full_movie(4)));
    assert_eq!(h.detail_calls(), vec![4]);
}

#[test]
fn slow_backfill_falls_back_to_stub() {
    let api = FakeTmdb {
        detail_delay: Duration::from_millis(500),
        ..FakeTmdb::default()
    };
    let mut h = Harness::new(api, Duration::from_millis(50));
    let stub = full_movie(6).to_partial();

    assert!(h.select(&stub).is_empty());
    match h.pump().as_slice() {
        [Effect::Navigate(Navigation::Details(args))] => {
            assert_eq!(args[DETAILS_BACKDROP_PATH_KEY], BundleValue::Null);
            assert_eq!(DetailsPayload::from_bundle(args).unwrap().synopsis, "");
        }
        other => panic!("expected details navigation, got {other:?}"),
    }
    assert_eq!(h.detail_calls(), vec![6]);
}

#[test]
fn destroyed_screen_gets_no_late_list() {
    let mut h = Harness::new(FakeTmdb::default(), Duration::from_secs(5));
    h.activate();
    h.screen.on_destroy();
    assert!(h.screen.favorites_subscription().is_none());
    assert_eq!(h.favorites.subscriber_count(), 0);

    thread::sleep(Duration::from_millis(200));
    while let Ok(event) = h.events.try_recv() {
        assert!(h.screen.handle(event, SortMode::Popularity).is_empty());
    }
}
