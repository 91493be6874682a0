//! Background photo: a random Unsplash image for the search term, or a
//! locally chosen gradient when there is no usable key or the call fails.

use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error, info};
use url::Url;

use crate::config::BackgroundConfig;
use crate::defaults;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Background {
    Photo { url: String, search_term: String },
    Gradient(String),
}

impl Background {
    pub fn is_photo(&self) -> bool {
        matches!(self, Background::Photo { .. })
    }

    /// CSS `background-image` value
    pub fn css(&self) -> String {
        match self {
            Background::Photo { url, .. } => format!("url({})", url),
            Background::Gradient(gradient) => gradient.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct UnsplashPhoto {
    urls: UnsplashUrls,
}

#[derive(Debug, Deserialize)]
struct UnsplashUrls {
    full: String,
}

/// True once `max_age` has passed since `last_update_ms`
pub fn is_stale(last_update_ms: i64, now_ms: i64, max_age: Duration) -> bool {
    let max_age_ms = i64::try_from(max_age.as_millis()).unwrap_or(i64::MAX);
    now_ms.saturating_sub(last_update_ms) > max_age_ms
}

pub struct BackgroundSource {
    client: Client,
    config: BackgroundConfig,
}

impl BackgroundSource {
    pub fn new(config: BackgroundConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    pub fn max_age(&self) -> Duration {
        self.config.max_age
    }

    pub fn check_cron(&self) -> &str {
        &self.config.check_cron
    }

    /// Never fails: any problem degrades to a gradient
    pub async fn fetch(&self, search_term: &str) -> Background {
        let term = match search_term.trim() {
            "" => defaults::random_search_term(),
            term => term,
        };
        info!("🖼️  Loading background image for: {}", term);

        match self.config.usable_key() {
            Some(key) => match self.fetch_photo(key, term).await {
                Ok(url) => {
                    return Background::Photo {
                        url,
                        search_term: term.to_string(),
                    }
                }
                Err(e) => error!("❌ Error loading Unsplash image: {:#}", e),
            },
            None => debug!("No Unsplash access key configured"),
        }

        Background::Gradient(defaults::random_gradient().to_string())
    }

    fn request_url(&self, term: &str) -> anyhow::Result<Url> {
        let mut url = Url::parse(&self.config.unsplash_endpoint)?;
        url.query_pairs_mut()
            .append_pair("query", term)
            .append_pair("orientation", "landscape")
            .append_pair("w", "1920")
            .append_pair("h", "1080");
        Ok(url)
    }

    async fn fetch_photo(&self, key: &str, term: &str) -> anyhow::Result<String> {
        let response = self
            .client
            .get(self.request_url(term)?)
            .header("Authorization", format!("Client-ID {}", key))
            .send()
            .await?
            .error_for_status()?;
        let photo: UnsplashPhoto = response.json().await?;
        Ok(photo.urls.full)
    }
}
