//! Local image catalog and the upload → send → apply pipeline
//!
//! Each pipeline step is a separate call so a failure is observable and can
//! be resumed from exactly that step. Nothing here retries or chains steps
//! on its own.

use crate::client::FrameArtClient;
use crate::error::{Error, Result};
use crate::models::{Image, Photo, StatusReply};
use crate::photos::PhotoSource;
use crate::session::RemoteArtSession;
use indexmap::IndexMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Outcome of [`ImageCatalog::list`]
///
/// On failure `images` holds the previous, possibly stale, content and
/// `error` says why it was not refreshed.
#[derive(Debug, Clone)]
pub struct Listing {
    pub images: Vec<Image>,
    pub error: Option<Error>,
}

impl Listing {
    pub fn is_stale(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, Default)]
struct CatalogState {
    images: IndexMap<String, Image>,
    last_error: Option<Error>,
    list_generation: u64,
}

impl CatalogState {
    fn snapshot(&self) -> Vec<Image> {
        self.images.values().cloned().collect()
    }
}

/// Locally known images and their association with TV content
///
/// Clones share the same state.
#[derive(Debug, Clone)]
pub struct ImageCatalog {
    client: FrameArtClient,
    state: Arc<RwLock<CatalogState>>,
    session: Option<RemoteArtSession>,
}

impl ImageCatalog {
    pub fn new(client: FrameArtClient) -> Self {
        Self {
            client,
            state: Arc::new(RwLock::new(CatalogState::default())),
            session: None,
        }
    }

    /// Invalidate `session` whenever an image is applied as current art
    ///
    /// The next [`RemoteArtSession::refresh`] then queries the TV again
    /// instead of joining a refresh started before the change.
    pub fn with_session(mut self, session: RemoteArtSession) -> Self {
        self.session = Some(session);
        self
    }

    pub fn client(&self) -> &FrameArtClient {
        &self.client
    }

    /// Current content, in insertion order
    pub async fn images(&self) -> Vec<Image> {
        self.state.read().await.snapshot()
    }

    pub async fn get(&self, id: &str) -> Option<Image> {
        self.state.read().await.images.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.images.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.images.is_empty()
    }

    /// Error of the last `list()` that failed, cleared by the next success
    pub async fn last_error(&self) -> Option<Error> {
        self.state.read().await.last_error.clone()
    }

    /// Reload the catalog from the backend
    ///
    /// Never fails: on error the previous content is kept and the error is
    /// reported in the returned [`Listing`]. When a newer `list()` was issued
    /// meanwhile, this result is dropped in its favor.
    pub async fn list(&self) -> Listing {
        let generation = {
            let mut state = self.state.write().await;
            state.list_generation += 1;
            state.list_generation
        };

        let result = self.client.list_images().await;

        let mut state = self.state.write().await;
        if state.list_generation != generation {
            match &result {
                Ok(images) => debug!(
                    generation,
                    count = images.len(),
                    "Discarding superseded image listing"
                ),
                Err(err) => debug!(
                    generation,
                    "Discarding superseded image listing error: {}", err
                ),
            }
            return Listing {
                images: state.snapshot(),
                error: None,
            };
        }

        match result {
            Ok(images) => {
                state.images = images
                    .into_iter()
                    .map(|image| (image.id.clone(), image))
                    .collect();
                state.last_error = None;
                info!(count = state.images.len(), "Image catalog refreshed");
                Listing {
                    images: state.snapshot(),
                    error: None,
                }
            }
            Err(err) => {
                warn!(
                    kept = state.images.len(),
                    "Failed to refresh image catalog: {}", err
                );
                state.last_error = Some(err.clone());
                Listing {
                    images: state.snapshot(),
                    error: Some(err),
                }
            }
        }
    }

    /// Upload bytes and register the image as local-only
    ///
    /// Re-uploading an existing id resets its device association.
    pub async fn upload(&self, bytes: impl Into<Vec<u8>>, filename: &str) -> Result<Image> {
        let uploaded = self.client.upload_image(bytes, filename).await?;
        let image = Image::new(uploaded.id);

        let mut state = self.state.write().await;
        state.images.insert(image.id.clone(), image.clone());
        info!(id = %image.id, "Image uploaded");
        Ok(image)
    }

    /// Push a local image to the TV and record its remote filename
    pub async fn send_to_device(&self, id: &str) -> Result<Image> {
        let sent = self.client.send_to_tv(id).await?;
        let remote_filename = sent
            .remote_filename
            .filter(|name| !name.is_empty())
            .ok_or_else(|| Error::Command(format!("TV assigned no remote filename to {id}")))?;

        // The backend may normalize the name; keep the key the caller used.
        let image = Image::on_device(id.trim(), remote_filename);

        let mut state = self.state.write().await;
        state.images.insert(image.id.clone(), image.clone());
        info!(
            id = %image.id,
            remote_filename = ?image.remote_filename,
            "Image sent to TV"
        );
        Ok(image)
    }

    /// Display already uploaded content on the TV
    ///
    /// `remote_filename` must belong to a known image; otherwise this fails
    /// with a validation error without contacting the backend. The art
    /// session attached with [`with_session`](Self::with_session) is
    /// invalidated on success, not refreshed.
    pub async fn apply_as_current(&self, remote_filename: &str) -> Result<StatusReply> {
        let known = {
            let state = self.state.read().await;
            state
                .images
                .values()
                .any(|image| image.remote_filename.as_deref() == Some(remote_filename))
        };
        if remote_filename.is_empty() || !known {
            return Err(Error::validation(format!(
                "No uploaded image has remote filename '{remote_filename}'"
            )));
        }

        let reply = self.client.set_image(remote_filename).await?;
        info!(remote_filename, "Image applied as current art");
        if let Some(session) = &self.session {
            session.invalidate();
        }
        Ok(reply)
    }

    /// Download a candidate photo and upload it under its suggested filename
    pub async fn ingest(&self, source: &dyn PhotoSource, photo: &Photo) -> Result<Image> {
        debug!(source = source.name(), photo = %photo.id, "Ingesting photo");
        let bytes = source.download(photo).await?;
        self.upload(bytes.to_vec(), &photo.suggested_filename())
            .await
    }
}
