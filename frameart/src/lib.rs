//! # frameart - Pilotage d'une Samsung Frame en Art Mode
//!
//! Cette crate fournit un client Rust pour le backend Frame Art (un proxy
//! HTTP devant la TV) et les modèles d'état construits par-dessus.
//!
//! ## Architecture
//!
//! - [`FrameArtClient`] : une méthode typée par endpoint du backend
//! - [`ImageCatalog`] : images locales et pipeline upload → envoi → affichage
//! - [`RemoteArtSession`] : machine à états de l'image affichée
//! - [`DebugCommandRegistry`] : table statique des commandes de diagnostic
//! - [`PhotoSource`] : sources de photos candidates ([`UnsplashBridge`])
//!
//! ```text
//! frameart/
//! ├── src/
//! │   ├── lib.rs         # Module principal (ce fichier)
//! │   ├── client.rs      # Client HTTP
//! │   ├── catalog.rs     # Catalogue d'images
//! │   ├── session.rs     # Image courante
//! │   ├── debug.rs       # Commandes de diagnostic
//! │   ├── photos.rs      # Sources de photos
//! │   ├── models.rs      # Structures de données
//! │   ├── config_ext.rs  # Intégration frameconfig
//! │   └── error.rs       # Gestion des erreurs
//! ```
//!
//! ## Utilisation
//!
//! ```rust,no_run
//! use frameart::{FrameArtClient, ImageCatalog, RemoteArtSession};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = FrameArtClient::new()?;
//!     let session = RemoteArtSession::new(client.clone());
//!     let catalog = ImageCatalog::new(client).with_session(session.clone());
//!
//!     let bytes = std::fs::read("sunset.jpg")?;
//!     let image = catalog.upload(bytes, "sunset.jpg").await?;
//!     let image = catalog.send_to_device(&image.id).await?;
//!     if let Some(remote) = image.remote_filename.as_deref() {
//!         catalog.apply_as_current(remote).await?;
//!     }
//!
//!     println!("{:?}", session.refresh().await);
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod client;
#[cfg(feature = "frameconfig")]
pub mod config_ext;
pub mod debug;
pub mod error;
pub mod models;
pub mod photos;
pub mod session;

pub use catalog::{ImageCatalog, Listing};
pub use client::{ClientBuilder, FrameArtClient};
#[cfg(feature = "frameconfig")]
pub use config_ext::FrameArtConfigExt;
pub use debug::{
    ArgSpec, CommandId, CommandSpec, CommandStatus, DebugCommandRegistry, DebugCommandResult,
    COMMANDS,
};
pub use error::{Error, Result};
pub use models::{
    ArtMode, CurrentArtStatus, Image, Photo, PhotoAuthor, PhotoUrls, StatusReply, Thumbnail,
};
pub use photos::{PhotoSource, UnsplashBridge};
pub use session::RemoteArtSession;
