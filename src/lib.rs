//! Movie grid backed by TMDB and a local favorites list.

pub mod config;
pub mod error;
pub mod favorites;
pub mod movie;
pub mod runtime;
pub mod screen;
pub mod services;
pub mod settings;
pub mod sort;
pub mod tmdb;

pub use error::{Error, Result};
