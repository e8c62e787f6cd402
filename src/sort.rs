use std::cmp::Ordering;
use std::fmt;

use tracing::warn;

use crate::movie::Movie;

pub const SORT_ORDER_KEY: &str = "sort_order";

/// Which list the main grid shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortMode {
    #[default]
    Popularity,
    Rating,
    Favorites,
}

impl SortMode {
    pub const ALL: [SortMode; 3] = [SortMode::Popularity, SortMode::Rating, SortMode::Favorites];

    /// Value stored under `sort_order` in the settings file.
    pub fn as_key(self) -> &'static str {
        match self {
            SortMode::Popularity => "popularity",
            SortMode::Rating => "rating",
            SortMode::Favorites => "favorites",
        }
    }

    pub fn from_key(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "popularity" | "popular" | "most_popular" => Some(SortMode::Popularity),
            "rating" | "top_rated" | "highest_rated" => Some(SortMode::Rating),
            "favorites" | "favourites" => Some(SortMode::Favorites),
            _ => None,
        }
    }

    /// Lenient parse: anything unknown falls back to the default mode.
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            None => SortMode::default(),
            Some(v) => SortMode::from_key(v).unwrap_or_else(|| {
                warn!("Unknown sort order `{v}` in settings; falling back to popularity.");
                SortMode::default()
            }),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SortMode::Popularity => "Most popular",
            SortMode::Rating => "Highest rated",
            SortMode::Favorites => "Favorites",
        }
    }

    pub fn is_favorites(self) -> bool {
        self == SortMode::Favorites
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_key())
    }
}

/// Orders a list for the given mode, best first. Favorites keep their order.
pub fn sort_movies(mode: SortMode, movies: &mut [Movie]) {
    let desc = |a: f64, b: f64| b.partial_cmp(&a).unwrap_or(Ordering::Equal);
    match mode {
        SortMode::Popularity => movies.sort_by(|a, b| desc(a.popularity, b.popularity)),
        SortMode::Rating => movies.sort_by(|a, b| desc(a.vote_average, b.vote_average)),
        SortMode::Favorites => {}
    }
}
