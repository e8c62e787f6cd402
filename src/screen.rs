//! The main grid screen as a plain state object.
//!
//! Every lifecycle hook and callback is a method that updates the state and
//! returns the [`Effect`]s the host has to carry out: start a fetch, swap the
//! grid contents, navigate. The host reads the sort mode from settings at the
//! moment of each event and passes it in, so the screen never caches it.

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::favorites::Subscription;
use crate::movie::{Bundle, DetailsPayload, Movie};
use crate::runtime::CancelToken;
use crate::sort::SortMode;

pub type RequestId = u64;

/// Which dataset the grid is currently bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderState {
    Favorites,
    NetworkList,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Navigation {
    /// Opens the details screen with the eight-field payload.
    Details(Bundle),
    Settings,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Fetch the ranked list for `mode` off the main thread and report back
    /// with [`ScreenEvent::MoviesFetched`].
    FetchList { mode: SortMode, request: RequestId },
    /// Replace the grid contents wholesale.
    Render(Vec<Movie>),
    /// Fetch the full record for a partial one and report back with
    /// [`ScreenEvent::BackfillFinished`]. Navigation waits for it.
    Backfill { id: u32, request: RequestId },
    Navigate(Navigation),
    ShowError { message: String, retry: bool },
}

#[derive(Debug)]
pub enum BackfillOutcome {
    Fetched(Movie),
    TimedOut,
    Cancelled,
    Failed(String),
}

/// Results delivered back to the main context.
#[derive(Debug)]
pub enum ScreenEvent {
    MoviesFetched {
        request: RequestId,
        result: Result<Vec<Movie>>,
    },
    BackfillFinished {
        request: RequestId,
        outcome: BackfillOutcome,
    },
    FavoritesChanged(Vec<Movie>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuItem<'a> {
    Settings,
    Other(&'a str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Created,
    Active,
    Destroyed,
}

struct PendingDetails {
    request: RequestId,
    movie: Movie,
}

pub struct MainScreen {
    lifecycle: Lifecycle,
    render_state: Option<RenderState>,
    favorites: Option<Vec<Movie>>,
    movies: Option<Vec<Movie>>,
    next_request: RequestId,
    list_request: Option<RequestId>,
    pending_details: Option<PendingDetails>,
    subscription: Option<Subscription>,
    cancel: CancelToken,
}

impl Default for MainScreen {
    fn default() -> Self {
        Self::new()
    }
}

impl MainScreen {
    pub fn new() -> Self {
        MainScreen {
            lifecycle: Lifecycle::Created,
            render_state: None,
            favorites: None,
            movies: None,
            next_request: 1,
            list_request: None,
            pending_details: None,
            subscription: None,
            cancel: CancelToken::new(),
        }
    }

    /// Hands the screen its favorites subscription. It is kept until
    /// [`MainScreen::on_destroy`].
    pub fn attach_favorites(&mut self, subscription: Subscription) {
        self.subscription = Some(subscription);
    }

    pub fn favorites_subscription(&self) -> Option<&Subscription> {
        self.subscription.as_ref()
    }

    /// Token cancelled when the screen is destroyed; background work for this
    /// screen should watch it.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn render_state(&self) -> Option<RenderState> {
        self.render_state
    }

    pub fn cached_favorites(&self) -> Option<&[Movie]> {
        self.favorites.as_deref()
    }

    pub fn cached_movies(&self) -> Option<&[Movie]> {
        self.movies.as_deref()
    }

    pub fn is_destroyed(&self) -> bool {
        self.lifecycle == Lifecycle::Destroyed
    }

    pub fn is_waiting_for_details(&self) -> bool {
        self.pending_details.is_some()
    }

    fn issue_request(&mut self) -> RequestId {
        let request = self.next_request;
        self.next_request += 1;
        request
    }

    fn show(&mut self, mode: SortMode) -> Vec<Effect> {
        if mode.is_favorites() {
            self.render_state = Some(RenderState::Favorites);
            // An in-flight list fetch must not paint over the favorites.
            self.list_request = None;
            match &self.favorites {
                Some(favorites) => vec![Effect::Render(favorites.clone())],
                None => Vec::new(),
            }
        } else {
            self.render_state = Some(RenderState::NetworkList);
            let request = self.issue_request();
            self.list_request = Some(request);
            debug!("list fetch #{request} ({mode})");
            vec![Effect::FetchList { mode, request }]
        }
    }

    pub fn on_activate(&mut self, mode: SortMode) -> Vec<Effect> {
        if self.is_destroyed() {
            return Vec::new();
        }
        self.lifecycle = Lifecycle::Active;
        info!("main screen activated ({mode})");
        self.show(mode)
    }

    /// Always refetches the network list, even when one is cached; favorites
    /// are re-rendered from the last snapshot.
    pub fn on_resume(&mut self, mode: SortMode) -> Vec<Effect> {
        if self.is_destroyed() {
            return Vec::new();
        }
        self.lifecycle = Lifecycle::Active;
        self.show(mode)
    }

    /// Retry affordance after a failed list fetch.
    pub fn on_retry(&mut self, mode: SortMode) -> Vec<Effect> {
        self.on_resume(mode)
    }

    /// New favorites snapshot. Cached always, rendered only while the
    /// current mode is favorites.
    pub fn on_favorites_changed(&mut self, favorites: Vec<Movie>, mode: SortMode) -> Vec<Effect> {
        if self.is_destroyed() {
            return Vec::new();
        }
        debug!("favorites snapshot: {} movies", favorites.len());
        self.favorites = Some(favorites);
        if !mode.is_favorites() {
            return Vec::new();
        }
        self.render_state = Some(RenderState::Favorites);
        self.list_request = None;
        match &self.favorites {
            Some(favorites) => vec![Effect::Render(favorites.clone())],
            None => Vec::new(),
        }
    }

    pub fn on_movies_fetched(&mut self, request: RequestId, result: Result<Vec<Movie>>) -> Vec<Effect> {
        if self.is_destroyed() {
            debug!("dropping list #{request}: screen destroyed");
            return Vec::new();
        }
        if self.list_request != Some(request) {
            debug!("dropping stale list #{request}");
            return Vec::new();
        }
        self.list_request = None;

        match result {
            Ok(movies) => {
                self.movies = Some(movies.clone());
                vec![Effect::Render(movies)]
            }
            Err(err) => {
                warn!("Failed to fetch movie list: {err}");
                vec![
                    Effect::Render(Vec::new()),
                    Effect::ShowError {
                        message: format!("Couldn't load movies: {err}"),
                        retry: true,
                    },
                ]
            }
        }
    }

    /// A complete record navigates straight away. A partial one first needs
    /// exactly one fetch by id; selections are ignored until it finishes.
    pub fn on_item_selected(&mut self, movie: &Movie) -> Vec<Effect> {
        if self.is_destroyed() {
            return Vec::new();
        }
        if let Some(pending) = &self.pending_details {
            debug!(
                "ignoring selection of {} while {} is loading",
                movie.id, pending.movie.id
            );
            return Vec::new();
        }
        if !movie.is_partial() {
            return vec![details(movie)];
        }

        let request = self.issue_request();
        self.pending_details = Some(PendingDetails {
            request,
            movie: movie.clone(),
        });
        debug!("backfill #{request} for movie {}", movie.id);
        vec![Effect::Backfill {
            id: movie.id,
            request,
        }]
    }

    pub fn on_backfill_finished(&mut self, request: RequestId, outcome: BackfillOutcome) -> Vec<Effect> {
        if self.is_destroyed() {
            return Vec::new();
        }
        let pending = match self.pending_details.take() {
            Some(pending) if pending.request == request => pending,
            other => {
                self.pending_details = other;
                debug!("dropping stale backfill #{request}");
                return Vec::new();
            }
        };

        let movie = match outcome {
            BackfillOutcome::Fetched(movie) => movie,
            BackfillOutcome::TimedOut => {
                warn!("Timed out fetching movie {}; using stored record", pending.movie.id);
                pending.movie
            }
            BackfillOutcome::Cancelled => {
                warn!("Fetch of movie {} was cancelled; using stored record", pending.movie.id);
                pending.movie
            }
            BackfillOutcome::Failed(err) => {
                warn!("Failed to fetch movie {} ({err}); using stored record", pending.movie.id);
                pending.movie
            }
        };
        vec![details(&movie)]
    }

    /// Returns `None` for items this screen doesn't handle.
    pub fn on_menu_item(&self, item: MenuItem<'_>) -> Option<Effect> {
        match item {
            MenuItem::Settings => Some(Effect::Navigate(Navigation::Settings)),
            MenuItem::Other(_) => None,
        }
    }

    /// Drops the favorites subscription and cancels outstanding work. Every
    /// later event is ignored.
    pub fn on_destroy(&mut self) {
        if self.is_destroyed() {
            return;
        }
        info!("main screen destroyed");
        self.lifecycle = Lifecycle::Destroyed;
        self.subscription = None;
        self.list_request = None;
        self.pending_details = None;
        self.cancel.cancel();
    }

    pub fn handle(&mut self, event: ScreenEvent, mode: SortMode) -> Vec<Effect> {
        match event {
            ScreenEvent::MoviesFetched { request, result } => self.on_movies_fetched(request, result),
            ScreenEvent::BackfillFinished { request, outcome } => {
                self.on_backfill_finished(request, outcome)
            }
            ScreenEvent::FavoritesChanged(favorites) => self.on_favorites_changed(favorites, mode),
        }
    }
}

fn details(movie: &Movie) -> Effect {
    Effect::Navigate(Navigation::Details(DetailsPayload::from_movie(movie).to_bundle()))
}
