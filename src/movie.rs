use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const DETAILS_ID_KEY: &str = "details_id";
pub const DETAILS_TITLE_KEY: &str = "details_title";
pub const DETAILS_YEAR_KEY: &str = "details_year";
pub const DETAILS_POPULARITY_KEY: &str = "details_popularity";
pub const DETAILS_RATING_KEY: &str = "details_rating";
pub const DETAILS_SYNOPSIS_KEY: &str = "details_synopsis";
pub const DETAILS_IMG_PATH_KEY: &str = "details_img_path";
pub const DETAILS_BACKDROP_PATH_KEY: &str = "details_backdrop_path";

/// A movie as shown in the grid.
///
/// Records read back from the favorites store only carry the id, title and
/// poster path; `backdrop_path` is `None` for those and the rest is zeroed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    pub id: u32,
    pub original_title: String,
    #[serde(default)]
    pub year: u16,
    #[serde(default)]
    pub popularity: f64,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default)]
    pub synopsis: String,
    #[serde(default)]
    pub poster_path: String,
    #[serde(default)]
    pub backdrop_path: Option<String>,
}

impl Movie {
    /// Builds the stub stored for a favorite.
    pub fn partial(id: u32, original_title: &str, poster_path: &str) -> Self {
        Movie {
            id,
            original_title: original_title.to_string(),
            year: 0,
            popularity: 0.0,
            vote_average: 0.0,
            synopsis: String::new(),
            poster_path: poster_path.to_string(),
            backdrop_path: None,
        }
    }

    /// A missing backdrop means the record came from local storage and has to
    /// be fetched again by id before the details screen can use it.
    pub fn is_partial(&self) -> bool {
        self.backdrop_path.is_none()
    }

    /// Strips the record down to what the favorites store keeps.
    pub fn to_partial(&self) -> Self {
        Movie::partial(self.id, &self.original_title, &self.poster_path)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BundleValue {
    Int(i64),
    Double(f64),
    Text(String),
    Null,
}

/// Flat keyed state handed to the details screen.
pub type Bundle = BTreeMap<&'static str, BundleValue>;

/// The eight fields the details screen renders.
#[derive(Debug, Clone, PartialEq)]
pub struct DetailsPayload {
    pub id: u32,
    pub title: String,
    pub year: u16,
    pub popularity: f64,
    pub rating: f64,
    pub synopsis: String,
    pub poster_path: String,
    pub backdrop_path: Option<String>,
}

impl DetailsPayload {
    pub fn from_movie(movie: &Movie) -> Self {
        DetailsPayload {
            id: movie.id,
            title: movie.original_title.clone(),
            year: movie.year,
            popularity: movie.popularity,
            rating: movie.vote_average,
            synopsis: movie.synopsis.clone(),
            poster_path: movie.poster_path.clone(),
            backdrop_path: movie.backdrop_path.clone(),
        }
    }

    /// Rebuilds the record the payload was taken from.
    pub fn to_movie(&self) -> Movie {
        Movie {
            id: self.id,
            original_title: self.title.clone(),
            year: self.year,
            popularity: self.popularity,
            vote_average: self.rating,
            synopsis: self.synopsis.clone(),
            poster_path: self.poster_path.clone(),
            backdrop_path: self.backdrop_path.clone(),
        }
    }

    pub fn to_bundle(&self) -> Bundle {
        let mut args = Bundle::new();
        args.insert(DETAILS_ID_KEY, BundleValue::Int(i64::from(self.id)));
        args.insert(DETAILS_TITLE_KEY, BundleValue::Text(self.title.clone()));
        args.insert(DETAILS_YEAR_KEY, BundleValue::Int(i64::from(self.year)));
        args.insert(DETAILS_POPULARITY_KEY, BundleValue::Double(self.popularity));
        args.insert(DETAILS_RATING_KEY, BundleValue::Double(self.rating));
        args.insert(DETAILS_SYNOPSIS_KEY, BundleValue::Text(self.synopsis.clone()));
        args.insert(DETAILS_IMG_PATH_KEY, BundleValue::Text(self.poster_path.clone()));
        args.insert(
            DETAILS_BACKDROP_PATH_KEY,
            match &self.backdrop_path {
                Some(path) => BundleValue::Text(path.clone()),
                None => BundleValue::Null,
            },
        );
        args
    }

    /// Reads the payload back on the details side. Returns `None` when a key
    /// is missing or holds the wrong kind of value.
    pub fn from_bundle(args: &Bundle) -> Option<Self> {
        let int = |key: &str| match args.get(key)? {
            BundleValue::Int(v) => Some(*v),
            _ => None,
        };
        let double = |key: &str| match args.get(key)? {
            BundleValue::Double(v) => Some(*v),
            _ => None,
        };
        let text = |key: &str| match args.get(key)? {
            BundleValue::Text(v) => Some(v.clone()),
            _ => None,
        };

        Some(DetailsPayload {
            id: u32::try_from(int(DETAILS_ID_KEY)?).ok()?,
            title: text(DETAILS_TITLE_KEY)?,
            year: u16::try_from(int(DETAILS_YEAR_KEY)?).ok()?,
            popularity: double(DETAILS_POPULARITY_KEY)?,
            rating: double(DETAILS_RATING_KEY)?,
            synopsis: text(DETAILS_SYNOPSIS_KEY)?,
            poster_path: text(DETAILS_IMG_PATH_KEY)?,
            backdrop_path: match args.get(DETAILS_BACKDROP_PATH_KEY)? {
                BundleValue::Text(v) => Some(v.clone()),
                BundleValue::Null => None,
                _ => return None,
            },
        })
    }
}
