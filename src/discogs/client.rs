use crate::config::Config;
use crate::discogs::models::{ReleaseDetails, SearchResponse, SearchResult};
use crate::discogs::Catalog;
use async_trait::async_trait;
use image::{DynamicImage, ImageFormat};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, Error as ReqwestError, StatusCode};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

const USER_AGENT: &str = concat!("discmatch/", env!("CARGO_PKG_VERSION"));

#[derive(Error, Debug)]
pub enum DiscogsError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] ReqwestError),
    #[error("API rate limit exceeded")]
    RateLimit,
    #[error("Invalid Discogs token")]
    InvalidToken,
    #[error("Release not found")]
    NotFound,
    #[error("Unexpected status {0}")]
    Status(StatusCode),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Invalid token header: {0}")]
    Header(#[from] reqwest::header::InvalidHeaderValue),
}

/// Strip brackets and separators from a folder name so it reads as a search phrase
pub fn normalize_query(query: &str) -> String {
    query
        .chars()
        .filter(|c| !matches!(c, '[' | ']' | '(' | ')'))
        .map(|c| if matches!(c, '.' | '_' | '-') { ' ' } else { c })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Map non-success statuses onto the error taxonomy
fn check_status(status: StatusCode) -> Result<(), DiscogsError> {
    if status.is_success() {
        Ok(())
    } else if status == StatusCode::TOO_MANY_REQUESTS {
        Err(DiscogsError::RateLimit)
    } else if status == StatusCode::UNAUTHORIZED {
        Err(DiscogsError::InvalidToken)
    } else if status == StatusCode::NOT_FOUND {
        Err(DiscogsError::NotFound)
    } else {
        Err(DiscogsError::Status(status))
    }
}

#[derive(Clone)]
pub struct DiscogsClient {
    client: Client,
    token: String,
    base_url: String,
}

impl DiscogsClient {
    pub fn new(token: &str, config: &Config) -> Result<Self, DiscogsError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Discogs token={}", token))?,
        );

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(config.http_timeout)
            .build()?;

        Ok(Self {
            client,
            token: token.to_string(),
            base_url: config.discogs_base_url.clone(),
        })
    }

    /// Search for releases by free text
    pub async fn try_search(&self, query: &str) -> Result<Vec<SearchResult>, DiscogsError> {
        let url = format!("{}/database/search", self.base_url);
        let cleaned = normalize_query(query);

        info!("📡 Discogs API: GET {} with q='{}', type=release", url, cleaned);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("q", cleaned.as_str()),
                ("type", "release"),
                ("token", self.token.as_str()),
            ])
            .send()
            .await?;

        check_status(response.status())?;

        let search_response: SearchResponse = response.json().await?;
        let releases: Vec<_> = search_response
            .results
            .into_iter()
            .filter(|r| r.result_type.as_deref().map_or(true, |t| t == "release"))
            .collect();

        info!("✓ Discogs search returned {} release(s)", releases.len());
        Ok(releases)
    }

    /// Get detailed information about a specific release
    pub async fn try_release(&self, id: u64) -> Result<ReleaseDetails, DiscogsError> {
        let url = format!("{}/releases/{}", self.base_url, id);

        debug!("Fetching release details from {}", url);

        let response = self
            .client
            .get(&url)
            .query(&[("token", self.token.as_str())])
            .send()
            .await?;

        check_status(response.status())?;

        Ok(response.json().await?)
    }

    /// Fetch an image and re-encode it to the format named by the destination's extension
    pub async fn try_download_image(&self, uri: &str, destination: &Path) -> Result<(), DiscogsError> {
        let response = self.client.get(uri).send().await?;
        check_status(response.status())?;

        let bytes = response.bytes().await?;
        let decoded = image::load_from_memory(&bytes)?;
        let format = ImageFormat::from_path(destination)?;

        // JPEG has no alpha channel; the other targets take RGBA
        let encodable = match format {
            ImageFormat::Jpeg => DynamicImage::ImageRgb8(decoded.to_rgb8()),
            _ => DynamicImage::ImageRgba8(decoded.to_rgba8()),
        };
        encodable.save_with_format(destination, format)?;

        info!(
            "Downloaded image ({} bytes) to {}",
            bytes.len(),
            destination.display()
        );
        Ok(())
    }

    /// Check a token with a one-result search: 401 means invalid
    pub async fn validate_token(&self) -> Result<bool, DiscogsError> {
        let url = format!("{}/database/search", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("q", "test"),
                ("type", "release"),
                ("per_page", "1"),
                ("token", self.token.as_str()),
            ])
            .send()
            .await?;

        match check_status(response.status()) {
            Ok(()) => Ok(true),
            Err(DiscogsError::InvalidToken) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl Catalog for DiscogsClient {
    async fn search(&self, query: &str) -> Vec<SearchResult> {
        match self.try_search(query).await {
            Ok(results) => results,
            Err(e) => {
                warn!("✗ Discogs search for '{}' failed: {}", query, e);
                Vec::new()
            }
        }
    }

    async fn release_details(&self, id: u64) -> Option<ReleaseDetails> {
        match self.try_release(id).await {
            Ok(details) => Some(details),
            Err(e) => {
                warn!("✗ Discogs release {} unavailable: {}", id, e);
                None
            }
        }
    }

    async fn download_image(&self, uri: &str, destination: &Path) -> bool {
        match self.try_download_image(uri, destination).await {
            Ok(()) => true,
            Err(e) => {
                warn!("✗ Image download from {} failed: {}", uri, e);
                false
            }
        }
    }
}
