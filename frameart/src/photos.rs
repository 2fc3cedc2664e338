//! Candidate photo sources
//!
//! A [`PhotoSource`] yields candidate photos that can be ingested into the
//! [`ImageCatalog`](crate::ImageCatalog). The only implementation proxies
//! Unsplash through the backend.

use crate::client::FrameArtClient;
use crate::error::{Error, Result};
use crate::models::Photo;
use bytes::Bytes;
use std::fmt::Debug;
use tracing::debug;

/// Provider of candidate photos
///
/// # Example
///
/// ```no_run
/// use frameart::{FrameArtClient, PhotoSource, UnsplashBridge};
///
/// # async fn demo() -> frameart::Result<()> {
/// let bridge = UnsplashBridge::new(FrameArtClient::new()?);
/// let photos = bridge.search("mountain lake").await?;
/// if let Some(photo) = photos.first() {
///     let bytes = bridge.download(photo).await?;
///     println!("{} ({} bytes)", photo.alt_text(), bytes.len());
/// }
/// # Ok(())
/// # }
/// ```
#[async_trait::async_trait]
pub trait PhotoSource: Debug + Send + Sync {
    /// Human readable source name
    fn name(&self) -> &str;

    /// Search photos by free text; a blank query is rejected locally
    async fn search(&self, query: &str) -> Result<Vec<Photo>>;

    /// Curated photos, no query needed
    async fn featured(&self) -> Result<Vec<Photo>>;

    /// Fetch the content of a photo at display size
    async fn download(&self, photo: &Photo) -> Result<Bytes>;
}

/// Unsplash photos proxied by the backend
#[derive(Debug, Clone)]
pub struct UnsplashBridge {
    client: FrameArtClient,
}

impl UnsplashBridge {
    pub fn new(client: FrameArtClient) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl PhotoSource for UnsplashBridge {
    fn name(&self) -> &str {
        "Unsplash"
    }

    async fn search(&self, query: &str) -> Result<Vec<Photo>> {
        let photos = self.client.search_unsplash(query).await?;
        debug!(query, count = photos.len(), "Unsplash search");
        Ok(photos)
    }

    async fn featured(&self) -> Result<Vec<Photo>> {
        self.client.unsplash_featured().await
    }

    /// Pings the provider's download tracker before fetching `urls.regular`
    async fn download(&self, photo: &Photo) -> Result<Bytes> {
        if photo.urls.regular.trim().is_empty() {
            return Err(Error::validation(format!(
                "Photo {} has no downloadable URL",
                photo.id
            )));
        }
        if let Some(location) = photo.download_location.as_deref() {
            self.client.track_download(location).await;
        }
        self.client.fetch_bytes(&photo.urls.regular).await
    }
}
