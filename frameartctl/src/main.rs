use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use frameart::{
    ClientBuilder, CommandId, DebugCommandRegistry, FrameArtClient, ImageCatalog, Photo,
    PhotoSource, RemoteArtSession, UnsplashBridge, COMMANDS,
};
use frameconfig::Config;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "frameartctl",
    version,
    about = "Curate images and drive a Samsung Frame TV in Art Mode",
    long_about = None
)]
struct Cli {
    /// Configuration directory (default: $FRAMEART_CONFIG, ./.frameart, ~/.frameart)
    #[arg(long, global = true)]
    config_dir: Option<String>,

    /// Backend base URL, overrides backend.base_url
    #[arg(long, global = true, env = "FRAMEART_BASE_URL")]
    base_url: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List local images and their TV identifiers
    Images,
    /// Upload a local file to the backend
    Upload { path: PathBuf },
    /// Send an uploaded image to the TV
    Send { id: String },
    /// Display content already on the TV, then show the current art
    Apply { remote_filename: String },
    /// Upload, send and display a file in one go
    Publish { path: PathBuf },
    /// Show what the TV is currently displaying
    Current,
    /// Search Unsplash photos
    Search { query: String },
    /// Featured Unsplash photos
    Featured,
    /// Download an Unsplash photo and upload it
    Ingest {
        photo_id: String,
        /// Search query the photo was found with (featured photos otherwise)
        #[arg(short, long)]
        query: Option<String>,
    },
    /// Diagnostic commands
    #[command(subcommand)]
    Debug(DebugCommand),
}

#[derive(Subcommand)]
enum DebugCommand {
    /// List the available debug commands
    List,
    /// Run a debug command and show its recorded result
    Run {
        command: String,
        arg: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load_config(cli.config_dir.as_deref().unwrap_or(""))
        .context("Failed to load configuration")?;
    init_logging(&config, cli.verbose);

    let mut builder = ClientBuilder::from_config(&config)?;
    if let Some(url) = cli.base_url {
        builder = builder.base_url(url);
    }
    let client = builder.build()?;
    info!(base_url = client.base_url(), "Using Frame Art backend");

    run(cli.command, client).await
}

/// RUST_LOG wins, then --verbose, then logging.min_level
fn init_logging(config: &Config, verbose: bool) {
    if !config.get_log_enable_console().unwrap_or(true) {
        return;
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose {
            "debug".to_string()
        } else {
            config
                .get_log_min_level()
                .unwrap_or_else(|_| "info".to_string())
        };
        EnvFilter::new(level)
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(command: Command, client: FrameArtClient) -> Result<()> {
    let session = RemoteArtSession::new(client.clone());
    let catalog = ImageCatalog::new(client.clone()).with_session(session.clone());

    match command {
        Command::Images => {
            let listing = catalog.list().await;
            if let Some(err) = &listing.error {
                warn!("Showing cached images: {}", err);
            }
            print_json(&listing.images)
        }
        Command::Upload { path } => {
            let image = upload(&catalog, &path).await?;
            print_json(&image)
        }
        Command::Send { id } => print_json(&catalog.send_to_device(&id).await?),
        Command::Apply { remote_filename } => {
            let listing = catalog.list().await;
            if let Some(err) = listing.error {
                return Err(err).context("Cannot check the remote filename");
            }
            catalog.apply_as_current(&remote_filename).await?;
            print_json(&session.refresh().await)
        }
        Command::Publish { path } => {
            let image = upload(&catalog, &path).await?;
            let image = catalog.send_to_device(&image.id).await?;
            let remote = image
                .remote_filename
                .as_deref()
                .ok_or_else(|| anyhow!("{} has no remote filename", image.id))?;
            catalog.apply_as_current(remote).await?;
            print_json(&session.refresh().await)
        }
        Command::Current => {
            let status = session.refresh().await;
            if let Some(err) = session.last_error().await {
                warn!("{}", err);
            }
            print_json(&status)
        }
        Command::Search { query } => {
            let bridge = UnsplashBridge::new(client);
            print_json(&bridge.search(&query).await?)
        }
        Command::Featured => {
            let bridge = UnsplashBridge::new(client);
            print_json(&bridge.featured().await?)
        }
        Command::Ingest { photo_id, query } => {
            let bridge = UnsplashBridge::new(client);
            let photo = find_photo(&bridge, &photo_id, query.as_deref()).await?;
            print_json(&catalog.ingest(&bridge, &photo).await?)
        }
        Command::Debug(DebugCommand::List) => print_json(&COMMANDS),
        Command::Debug(DebugCommand::Run { command, arg }) => {
            let registry = DebugCommandRegistry::new(client);
            let id: CommandId = command.parse()?;
            let outcome = registry.dispatch(id, arg.as_deref()).await;
            if let Some(result) = registry.result(id).await {
                print_json(&result)?;
            }
            outcome.map(|_| ()).map_err(Into::into)
        }
    }
}

async fn upload(catalog: &ImageCatalog, path: &Path) -> Result<frameart::Image> {
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| anyhow!("Invalid file name: {}", path.display()))?;
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(catalog.upload(bytes, filename).await?)
}

async fn find_photo(source: &dyn PhotoSource, id: &str, query: Option<&str>) -> Result<Photo> {
    let photos = match query {
        Some(query) => source.search(query).await?,
        None => source.featured().await?,
    };
    photos
        .into_iter()
        .find(|photo| photo.id == id)
        .ok_or_else(|| anyhow!("Photo {} not found on {}", id, source.name()))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
