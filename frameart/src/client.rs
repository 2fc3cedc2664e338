//! HTTP client for the Frame Art backend
//!
//! The backend is a thin proxy in front of a Samsung Frame TV. This module
//! wraps its REST surface with one typed method per endpoint and normalizes
//! every failure into [`Error`].
//!
//! # Example
//!
//! ```no_run
//! use frameart::FrameArtClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = FrameArtClient::builder()
//!         .base_url("http://localhost:8000")
//!         .build()?;
//!
//!     for image in client.list_images().await? {
//!         println!("{} -> {:?}", image.id, image.remote_filename);
//!     }
//!
//!     println!("{:?}", client.current_image().await?);
//!     Ok(())
//! }
//! ```

use crate::error::{Error, Result};
use crate::models::{ArtMode, CurrentArtStatus, Image, Photo, StatusReply};
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Default backend base URL
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Default User-Agent
pub const DEFAULT_USER_AGENT: &str = concat!("frameart/", env!("CARGO_PKG_VERSION"));

/// Frame Art backend HTTP client
///
/// The client is stateless: it does not cache responses and never retries.
/// Each failed call surfaces exactly one [`Error`]. Cloning is cheap and
/// shares the connection pool.
#[derive(Debug, Clone)]
pub struct FrameArtClient {
    pub(crate) client: Client,
    base_url: String,
}

impl FrameArtClient {
    /// Create a new client with default settings
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    /// Create a builder for configuring the client
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// Create a client with a custom reqwest::Client
    ///
    /// Useful for sharing HTTP connection pools or custom proxy settings
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: normalize_base_url(base_url.into()),
        }
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the internal HTTP client
    pub fn http_client(&self) -> &Client {
        &self.client
    }

    /// URL of the backend's static copy of a local image
    pub fn image_url(&self, id: &str) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)?;
        url.path_segments_mut()
            .map_err(|_| Error::Config(format!("Base URL cannot be a base: {}", self.base_url)))?
            .pop_if_empty()
            .push("images")
            .push(id);
        Ok(url)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // ========================================================================
    // Request helpers
    // ========================================================================

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send(self.client.get(self.endpoint(path)), "GET", path)
            .await
    }

    async fn get_with_query<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T> {
        self.send(self.client.get(self.endpoint(path)).query(params), "GET", path)
            .await
    }

    async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        self.send(self.client.post(self.endpoint(path)).json(body), "POST", path)
            .await
    }

    async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send(self.client.post(self.endpoint(path)), "POST", path)
            .await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        method: &str,
        path: &str,
    ) -> Result<T> {
        debug!(method, path, "Backend request");
        let response = request.send().await.map_err(|err| {
            warn!(method, path, "Backend unreachable: {}", err);
            Error::from(err)
        })?;
        Self::handle_response(response).await
    }

    /// Traite la réponse HTTP
    async fn handle_response<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = Error::from_response_body(status, &body);
            warn!(status = status.as_u16(), "Backend error: {}", err);
            return Err(err);
        }

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            warn!("Failed to parse backend response: {}", e);
            Error::from(e)
        })
    }

    /// The debug endpoints report device failures as `{"error": "..."}`
    /// with a success status.
    fn reject_device_error(value: Value) -> Result<Value> {
        if let Some(message) = value.get("error").and_then(Value::as_str) {
            warn!("Device command failed: {}", message);
            return Err(Error::Command(message.to_string()));
        }
        Ok(value)
    }

    async fn debug_get(&self, path: &str) -> Result<Value> {
        Self::reject_device_error(self.get(path).await?)
    }

    async fn debug_post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Value> {
        Self::reject_device_error(self.post_json(path, body).await?)
    }

    // ========================================================================
    // Images
    // ========================================================================

    /// List the local images with their TV identifiers
    pub async fn list_images(&self) -> Result<Vec<Image>> {
        self.get("/api/images").await
    }

    /// Upload image bytes to the backend's local store
    ///
    /// The image is not sent to the TV; see [`send_to_tv`](Self::send_to_tv).
    pub async fn upload_image(&self, bytes: impl Into<Vec<u8>>, filename: &str) -> Result<Image> {
        let filename = require("filename", filename)?;
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(Error::validation(format!("Refusing to upload empty file {filename}")));
        }

        let size = bytes.len();
        let part = Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str(mime_for(filename))?;
        let form = Form::new().part("file", part);

        debug!(filename, size, "Uploading image");
        self.send(
            self.client.post(self.endpoint("/api/upload")).multipart(form),
            "POST",
            "/api/upload",
        )
        .await
    }

    /// Push a local image onto the TV's content store
    ///
    /// Returns the image with its TV-assigned `remote_filename`.
    pub async fn send_to_tv(&self, filename: &str) -> Result<Image> {
        let filename = require("filename", filename)?;
        self.post_json("/api/send-to-tv", &json!({ "filename": filename }))
            .await
    }

    /// Display content already present on the TV
    pub async fn set_image(&self, remote_filename: &str) -> Result<StatusReply> {
        let remote_filename = require("remote filename", remote_filename)?;
        self.post_json(
            "/api/set-image",
            &json!({ "remote_filename": remote_filename }),
        )
        .await
    }

    /// What the TV is currently displaying
    pub async fn current_image(&self) -> Result<CurrentArtStatus> {
        let value: Value = self.get("/api/current-image").await?;
        CurrentArtStatus::from_response(value)
    }

    // ========================================================================
    // Photo provider proxy
    // ========================================================================

    /// Search candidate photos
    pub async fn search_unsplash(&self, query: &str) -> Result<Vec<Photo>> {
        let query = require("search query", query)?;
        self.get_with_query("/api/search-unsplash", &[("query", query)])
            .await
    }

    /// Featured candidate photos
    pub async fn unsplash_featured(&self) -> Result<Vec<Photo>> {
        self.get("/api/unsplash-featured").await
    }

    /// Download an absolute URL (candidate photo content)
    pub async fn fetch_bytes(&self, url: &str) -> Result<Bytes> {
        let url = Url::parse(url)?;
        debug!(%url, "Downloading");
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::from_response_body(status, &body));
        }
        Ok(response.bytes().await?)
    }

    /// Notify the photo provider that a photo is being used
    ///
    /// Failures are logged and ignored.
    pub async fn track_download(&self, download_location: &str) {
        match self.client.get(download_location).send().await {
            Ok(response) if !response.status().is_success() => {
                debug!(
                    status = response.status().as_u16(),
                    download_location, "Download tracking rejected"
                );
            }
            Ok(_) => {}
            Err(err) => debug!(download_location, "Download tracking failed: {}", err),
        }
    }

    // ========================================================================
    // Debug endpoints
    // ========================================================================

    /// API/protocol version reported by the TV
    pub async fn debug_api_version(&self) -> Result<Value> {
        self.debug_get("/api/debug/api-version").await
    }

    /// Full TV status (power, Art Mode support, current art, device info)
    pub async fn debug_tv_status(&self) -> Result<Value> {
        self.debug_get("/api/debug/tv-status").await
    }

    /// Switch Art Mode on or off
    pub async fn debug_set_artmode(&self, mode: ArtMode) -> Result<Value> {
        self.debug_post("/api/debug/set-artmode", &json!({ "mode": mode }))
            .await
    }

    /// Content stored on the TV
    pub async fn debug_available_art(&self) -> Result<Value> {
        self.debug_get("/api/debug/available-art").await
    }

    /// Art Mode settings (brightness, ...)
    pub async fn debug_artmode_settings(&self) -> Result<Value> {
        self.debug_get("/api/debug/artmode-settings").await
    }

    /// Upload a local file to the TV with verbose backend diagnostics
    pub async fn debug_test_upload(&self, filename: &str) -> Result<Value> {
        let filename = require("filename", filename)?;
        self.debug_post("/api/debug/test-upload", &json!({ "filename": filename }))
            .await
    }

    /// Slideshow status
    pub async fn debug_slideshow_status(&self) -> Result<Value> {
        self.debug_get("/api/debug/slideshow-status").await
    }

    /// Send the power key
    pub async fn debug_power_on(&self) -> Result<Value> {
        Self::reject_device_error(self.post_empty("/api/debug/power-on").await?)
    }

    /// Send a remote-control key code (`KEY_POWER`, `KEY_HOME`, ...)
    pub async fn debug_send_key(&self, key: &str) -> Result<Value> {
        let key = require("key", key)?;
        self.debug_post("/api/debug/send-key", &json!({ "key": key }))
            .await
    }

    /// Device information
    pub async fn debug_device_info(&self) -> Result<Value> {
        self.debug_get("/api/debug/device-info").await
    }

    /// Installed applications
    pub async fn debug_app_list(&self) -> Result<Value> {
        self.debug_get("/api/debug/app-list").await
    }

    /// Launch an application by id
    pub async fn debug_run_app(&self, app_id: &str) -> Result<Value> {
        let app_id = require("app id", app_id)?;
        self.debug_post("/api/debug/run-app", &json!({ "app_id": app_id }))
            .await
    }
}

/// Reject a blank argument before any network call
fn require<'a>(what: &str, value: &'a str) -> Result<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::validation(format!("Missing {what}")));
    }
    Ok(value)
}

/// MIME type announced for an uploaded file
fn mime_for(filename: &str) -> &'static str {
    let lower = filename.to_ascii_lowercase();
    if lower.ends_with(".jpg") || lower.ends_with(".jpeg") {
        "image/jpeg"
    } else if lower.ends_with(".png") {
        "image/png"
    } else {
        "application/octet-stream"
    }
}

fn normalize_base_url(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

/// Builder for configuring a FrameArtClient
#[derive(Debug)]
pub struct ClientBuilder {
    client: Option<Client>,
    base_url: String,
    timeout: Option<Duration>,
    user_agent: String,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            client: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ClientBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a custom HTTP client
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Bound every request; requests are unbounded by default
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set a custom User-Agent header
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Build the client
    pub fn build(self) -> Result<FrameArtClient> {
        // Valider l'URL avant de construire quoi que ce soit
        Url::parse(&self.base_url)?;

        let client = if let Some(client) = self.client {
            client
        } else {
            let mut builder = Client::builder().user_agent(&self.user_agent);
            if let Some(timeout) = self.timeout {
                builder = builder.timeout(timeout);
            }
            builder.build()?
        };

        Ok(FrameArtClient {
            client,
            base_url: normalize_base_url(self.base_url),
        })
    }
}
