//! Data models for Frame Art backend responses
//!
//! This module contains the structures exchanged with the backend, and the
//! single translation point from the loosely shaped `/api/current-image`
//! payload into [`CurrentArtStatus`].

use crate::error::{Error, Result};
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Local images
// ============================================================================

/// A locally known image and its device-side identifier, if any
///
/// `remote_filename` stays `None` until the image has been sent to the TV.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Image {
    /// Local filename, the key of the image in the catalog
    #[serde(rename = "file")]
    pub id: String,
    /// Content identifier assigned by the TV
    #[serde(default)]
    pub remote_filename: Option<String>,
}

impl Image {
    /// Create a local-only image
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            remote_filename: None,
        }
    }

    /// Create an image already present on the TV
    pub fn on_device(id: impl Into<String>, remote_filename: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            remote_filename: Some(remote_filename.into()),
        }
    }

    /// Check if the image has been sent to the TV
    pub fn is_on_device(&self) -> bool {
        self.remote_filename.is_some()
    }
}

// ============================================================================
// Generic replies
// ============================================================================

/// Status object returned by mutating endpoints (`/api/set-image`, ...)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StatusReply {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    /// Any other field sent by the backend
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StatusReply {
    /// Check if the backend reported success
    pub fn is_success(&self) -> bool {
        self.status.as_deref() == Some("success")
    }
}

/// Art Mode switch position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtMode {
    On,
    Off,
}

impl ArtMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtMode::On => "on",
            ArtMode::Off => "off",
        }
    }
}

impl fmt::Display for ArtMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArtMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "on" => Ok(ArtMode::On),
            "off" => Ok(ArtMode::Off),
            other => Err(Error::validation(format!(
                "Art mode must be \"on\" or \"off\", got \"{other}\""
            ))),
        }
    }
}

// ============================================================================
// Current art
// ============================================================================

/// Default message when the TV shows nothing
pub const NO_CURRENT_IMAGE_MESSAGE: &str = "No image is currently displayed on the TV";

/// Default message when Art Mode is off
pub const NO_ART_MODE_MESSAGE: &str = "The TV is not in Art Mode";

/// Thumbnail of the displayed content, base64 encoded
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Thumbnail {
    /// Base64 image data
    pub data: String,
    /// Image format ("jpeg", "png")
    pub format: String,
}

impl Thumbnail {
    /// MIME type of the thumbnail
    pub fn mime_type(&self) -> String {
        format!("image/{}", self.format)
    }

    /// Decode the base64 payload
    pub fn decode(&self) -> std::result::Result<Vec<u8>, base64::DecodeError> {
        base64::engine::general_purpose::STANDARD.decode(self.data.trim())
    }

    /// `data:` URI usable as an image source
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type(), self.data)
    }
}

/// What the TV reports it is currently displaying
///
/// Exactly one variant is active; `Loading` only exists while a refresh of
/// a [`RemoteArtSession`](crate::RemoteArtSession) is in flight.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CurrentArtStatus {
    #[default]
    Loading,
    NoCurrentImage {
        message: String,
    },
    NoArtMode {
        message: String,
    },
    Displaying {
        content_id: String,
        thumbnail: Option<Thumbnail>,
        title: Option<String>,
        artist: Option<String>,
    },
}

/// Raw shape of `/api/current-image`
#[derive(Debug, Default, Deserialize)]
struct CurrentArtPayload {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    mode: Option<Value>,
    #[serde(default)]
    content_id: Option<String>,
    #[serde(default)]
    thumbnail: Option<String>,
    #[serde(default)]
    thumbnail_format: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    artist: Option<String>,
}

impl CurrentArtStatus {
    /// Translate a `/api/current-image` payload
    ///
    /// The payload is either discriminated by a `status` field, or carries
    /// the content fields directly when something is displayed.
    pub fn from_response(value: Value) -> Result<Self> {
        let payload: CurrentArtPayload = serde_json::from_value(value)?;
        let message = payload.message.filter(|m| !m.trim().is_empty());

        match payload.status.as_deref() {
            Some("no_current_image") => {
                return Ok(Self::no_current_image(message));
            }
            Some("no_art_mode") => {
                return Ok(Self::NoArtMode {
                    message: message.unwrap_or_else(|| NO_ART_MODE_MESSAGE.to_string()),
                });
            }
            // Le canal SmartThings ne remonte que le mode d'image
            Some("smartthings_mode") => {
                let mode = match payload.mode {
                    Some(Value::String(s)) => s,
                    Some(other) => other.to_string(),
                    None => "unknown".to_string(),
                };
                return Ok(Self::NoCurrentImage {
                    message: format!(
                        "{} (picture mode: {mode})",
                        message.as_deref().unwrap_or(NO_CURRENT_IMAGE_MESSAGE)
                    ),
                });
            }
            _ => {}
        }

        match payload.content_id.filter(|id| !id.is_empty()) {
            Some(content_id) => Ok(Self::Displaying {
                content_id,
                thumbnail: payload
                    .thumbnail
                    .filter(|data| !data.is_empty())
                    .map(|data| Thumbnail {
                        data,
                        format: payload
                            .thumbnail_format
                            .unwrap_or_else(|| "jpeg".to_string()),
                    }),
                title: payload.title,
                artist: payload.artist,
            }),
            None => Ok(Self::no_current_image(message)),
        }
    }

    fn no_current_image(message: Option<String>) -> Self {
        Self::NoCurrentImage {
            message: message.unwrap_or_else(|| NO_CURRENT_IMAGE_MESSAGE.to_string()),
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// Content identifier of the displayed art, if any
    pub fn content_id(&self) -> Option<&str> {
        match self {
            Self::Displaying { content_id, .. } => Some(content_id),
            _ => None,
        }
    }

    /// Human readable message of the non-displaying states
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::NoCurrentImage { message } | Self::NoArtMode { message } => Some(message),
            _ => None,
        }
    }
}

// ============================================================================
// Candidate photos
// ============================================================================

/// Photo URLs at the sizes offered by the provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PhotoUrls {
    #[serde(default)]
    pub raw: Option<String>,
    #[serde(default)]
    pub full: Option<String>,
    pub regular: String,
    pub small: String,
    #[serde(default)]
    pub thumb: Option<String>,
}

/// Photographer credits
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PhotoAuthor {
    pub name: String,
    #[serde(default)]
    pub profile: Option<String>,
}

/// A candidate photo from a search or featured set
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Photo {
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
    pub urls: PhotoUrls,
    pub user: PhotoAuthor,
    /// Provider endpoint to ping when the photo is actually used
    #[serde(default)]
    pub download_location: Option<String>,
}

impl Photo {
    /// Local filename used when the photo is ingested into the catalog
    pub fn suggested_filename(&self) -> String {
        format!("unsplash-{}.jpg", self.id)
    }

    /// Description or a generic alt text
    pub fn alt_text(&self) -> &str {
        self.description.as_deref().unwrap_or("Unsplash photo")
    }
}
