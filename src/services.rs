//! The stores and background machinery the main window is built on.

use std::path::Path;
use std::sync::Arc;

use async_channel::Receiver;
use tracing::info;

use crate::config::{AppConfig, FAVORITES_FILE, SETTINGS_FILE};
use crate::error::Result;
use crate::favorites::FavoritesStore;
use crate::runtime::TaskRunner;
use crate::screen::ScreenEvent;
use crate::settings::Settings;
use crate::tmdb::TmdbClient;

pub struct Services {
    pub settings: Settings,
    pub favorites: FavoritesStore,
    pub client: Arc<TmdbClient>,
    pub runner: TaskRunner,
    pub events: Receiver<ScreenEvent>,
}

impl Services {
    /// Opens the stores under `data_dir` and starts the TMDB runtime. Fails
    /// without a usable favorites file, API key or runtime; a bad settings
    /// file only falls back to defaults.
    pub fn open(config: &AppConfig, data_dir: &Path) -> Result<Self> {
        let settings = Settings::open(&data_dir.join(SETTINGS_FILE));
        let favorites = FavoritesStore::open(&data_dir.join(FAVORITES_FILE))?;
        let client = Arc::new(TmdbClient::new(config)?);
        let (runner, events) = TaskRunner::new(client.clone(), config.backfill_timeout)?;
        info!("services ready in {}", data_dir.display());
        Ok(Services {
            settings,
            favorites,
            client,
            runner,
            events,
        })
    }
}
