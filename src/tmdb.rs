use std::time::Duration;

use chrono::{Datelike, NaiveDate};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::movie::Movie;
use crate::sort::{sort_movies, SortMode};

/// The network side of the main screen. Both calls block the calling thread.
pub trait MovieApi: Send + Sync {
    fn fetch_movies(&self, mode: SortMode) -> Result<Vec<Movie>>;
    fn fetch_movie(&self, id: u32) -> Result<Movie>;
}

#[derive(Debug, Deserialize)]
struct TMDBListResponse {
    #[serde(default)]
    results: Vec<TMDBMovie>,
}

#[derive(Debug, Deserialize)]
struct TMDBMovie {
    id: u32,
    #[serde(default)]
    original_title: String,
    #[serde(default)]
    release_date: Option<String>,
    #[serde(default)]
    popularity: f64,
    #[serde(default)]
    vote_average: f64,
    #[serde(default)]
    overview: Option<String>,
    #[serde(default)]
    poster_path: Option<String>,
    #[serde(default)]
    backdrop_path: Option<String>,
}

impl From<TMDBMovie> for Movie {
    fn from(m: TMDBMovie) -> Self {
        Movie {
            id: m.id,
            original_title: m.original_title,
            year: release_year(m.release_date.as_deref().unwrap_or_default()),
            popularity: m.popularity,
            vote_average: m.vote_average,
            synopsis: m.overview.unwrap_or_default(),
            poster_path: m.poster_path.unwrap_or_default(),
            // A network record is complete even when TMDB has no backdrop for it;
            // `None` is reserved for stubs read back from favorites.
            backdrop_path: Some(m.backdrop_path.unwrap_or_default()),
        }
    }
}

/// Year part of a TMDB `release_date` (`YYYY-MM-DD`), 0 when unknown.
pub fn release_year(date: &str) -> u16 {
    NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .ok()
        .and_then(|d| u16::try_from(d.year()).ok())
        .unwrap_or(0)
}

fn list_path(mode: SortMode) -> Option<&'static str> {
    match mode {
        SortMode::Popularity => Some("/movie/popular"),
        SortMode::Rating => Some("/movie/top_rated"),
        SortMode::Favorites => None,
    }
}

/// Blocking TMDB v3 client.
pub struct TmdbClient {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
    language: String,
}

impl TmdbClient {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let api_key = config.tmdb_api_key.clone().ok_or(Error::MissingApiKey)?;
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(TmdbClient {
            client,
            base_url: config.api_base_url.clone(),
            api_key,
            language: config.language.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}{}?api_key={}&language={}",
            self.base_url,
            path,
            urlencoding::encode(&self.api_key),
            urlencoding::encode(&self.language)
        )
    }

    fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        debug!("GET {path}");
        let response = self.client.get(self.url(path)).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
                path: path.to_string(),
            });
        }
        Ok(response.json::<T>()?)
    }

    /// Downloads raw image bytes (posters, backdrops).
    pub fn fetch_image(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.client.get(url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
                path: url.to_string(),
            });
        }
        Ok(response.bytes()?.to_vec())
    }
}

impl MovieApi for TmdbClient {
    fn fetch_movies(&self, mode: SortMode) -> Result<Vec<Movie>> {
        let Some(path) = list_path(mode) else {
            return Ok(Vec::new());
        };
        let response: TMDBListResponse = self.get(path)?;
        let mut movies: Vec<Movie> = response.results.into_iter().map(Movie::from).collect();
        sort_movies(mode, &mut movies);
        info!("Fetched {} movies ({mode})", movies.len());
        Ok(movies)
    }

    fn fetch_movie(&self, id: u32) -> Result<Movie> {
        match self.get::<TMDBMovie>(&format!("/movie/{id}")) {
            Err(Error::Status { status: 404, .. }) => Err(Error::NotFound(id)),
            other => other.map(Movie::from),
        }
    }
}
