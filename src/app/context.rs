use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::app::Result;
use crate::config::Config;
use crate::fetcher::http_fetcher::HttpFetcher;
use crate::fetcher::Fetcher;
use crate::media::MediaExtractor;
use crate::poster::{MastodonPoster, Poster};
use crate::setup;

pub struct AppContext {
    pub config: Config,
    pub config_path: PathBuf,
    pub client: reqwest::Client,
    pub fetcher: Arc<dyn Fetcher + Send + Sync>,
    pub poster: Arc<dyn Poster>,
}

impl AppContext {
    /// Load the config (running the interactive setup when the file does
    /// not exist yet) and wire up the components around one shared HTTP
    /// client.
    pub async fn init(config_path: Option<PathBuf>) -> Result<Self> {
        let config_path = match config_path {
            Some(p) => p,
            None => Config::default_path()?,
        };
        let client = build_client();

        let config = if config_path.exists() {
            tracing::info!("using config file {}", config_path.display());
            Config::load(&config_path)?
        } else {
            setup::run(&client, &config_path).await?
        };

        let fetcher: Arc<dyn Fetcher + Send + Sync> = Arc::new(HttpFetcher::new(client.clone()));
        let poster: Arc<dyn Poster> = Arc::new(MastodonPoster::new(
            client.clone(),
            config.url.clone(),
            config.access_token.clone(),
        ));

        Ok(Self {
            config,
            config_path,
            client,
            fetcher,
            poster,
        })
    }

    pub fn media_extractor(&self) -> MediaExtractor {
        MediaExtractor::new(self.client.clone())
    }
}

/// The process-wide HTTP transport: TLS verification on (reqwest default),
/// compressed transfer and a per-request timeout.
pub fn build_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .gzip(true)
        .brotli(true)
        .user_agent(concat!("estuary/", env!("CARGO_PKG_VERSION")))
        .build()
        .expect("Failed to build HTTP client")
}
