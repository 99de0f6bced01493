mod prompt;

use clap::Parser;
use humansize::{DECIMAL, format_size};
use std::path::PathBuf;
use std::process;
use thiserror::Error;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use trakt2kodi::{
    Config, ConfigError, HttpArtworkFetcher, MetadataProvider, MetadataRetrievalError,
    ProgressEvent, RequestThrottle, TVSHOW_NFO, TraktProvider, Trakt2KodiError, load_env_file,
    scrape_show,
};

/// Writes Kodi .nfo files and artwork for a TV show folder using Trakt metadata
#[derive(Parser)]
#[command(name = "trakt2kodi", version)]
struct Cli {
    /// Show folder containing "Season N" subfolders (asked for when omitted)
    folder: Option<PathBuf>,

    /// Load configuration from this .env file instead of ./.env
    #[arg(long)]
    env_file: Option<PathBuf>,
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Metadata(#[from] MetadataRetrievalError),

    #[error(transparent)]
    Scrape(#[from] Trakt2KodiError),

    #[error("Prompt failed: {0}")]
    Prompt(#[from] dialoguer::Error),

    #[error("Folder not found: {0}")]
    FolderNotFound(PathBuf),

    #[error("No TV show found matching \"{0}\"")]
    NoSearchResults(String),
}

/// Handles progress events and prints formatted output to stdout
fn handle_progress_event(event: ProgressEvent) {
    match event {
        ProgressEvent::Started {
            folder,
            title,
            slug,
        } => {
            println!(
                "\nScraping {} ({}) into {}",
                title,
                slug,
                folder.display()
            );
        }
        ProgressEvent::ShowImagesDisabled => {
            println!("Show image downloads are disabled (DOWNLOAD_SHOW_IMAGES).");
        }
        ProgressEvent::SeasonImagesDisabled => {
            println!("Season image downloads are disabled (DOWNLOAD_SEASON_IMAGES).");
        }
        ProgressEvent::SeasonTranslationsDisabled => {
            println!("Season translations are disabled (FETCH_SEASON_TRANSLATION).");
        }
        ProgressEvent::ArtworkSaved { label, path, bytes } => {
            println!(
                "  Saved {}: {} ({})",
                label,
                path.display(),
                format_size(bytes, DECIMAL)
            );
        }
        ProgressEvent::ArtworkFailed { label, path, error } => {
            eprintln!(
                "  Warning: could not save {} to {}: {}",
                label,
                path.display(),
                error
            );
        }
        ProgressEvent::ShowNfoWritten { path } => {
            println!("Created {}", path.display());
        }
        ProgressEvent::SkippingExistingNfo => {
            println!("Skipping episodes that already have an .nfo file.");
        }
        ProgressEvent::IgnoringSmallFiles { min_kib } => {
            println!("Ignoring files smaller than {} KB.", min_kib);
        }
        ProgressEvent::ScanningSeasons { folder } => {
            println!("\nScanning seasons in {}...", folder.display());
        }
        ProgressEvent::EpisodeFilesFound { count } => {
            println!("Found {} episode file(s)\n", count);
        }
        ProgressEvent::NoEpisodeFiles => {
            eprintln!("Warning: no episode files found to generate .nfo files for.");
        }
        ProgressEvent::EpisodeTranslationsDisabled => {
            println!("Episode translations are disabled (FETCH_EPISODES_TRANSLATION).");
        }
        ProgressEvent::EpisodeSkipped { path, reason } => {
            eprintln!("  Warning: skipping {}: {}", path.display(), reason);
        }
        ProgressEvent::EpisodeNfoWritten {
            path,
            season,
            episode,
            title,
        } => {
            println!(
                "[S{:02}E{:02}] {} -> {}",
                season,
                episode,
                title,
                path.display()
            );
        }
        ProgressEvent::Complete { summary } => {
            println!(
                "\nWrote {} episode file(s), skipped {}, {} image(s) failed.",
                summary.episodes_written, summary.episodes_skipped, summary.images_failed
            );
        }
    }
}

fn init_tracing() {
    // RUST_LOG controls log levels, warnings only by default
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run(cli: Cli) -> Result<(), CliError> {
    prompt::print_intro();

    if let Some(path) = load_env_file(cli.env_file.as_deref())? {
        println!("Loaded configuration from {}", path.display());
    }
    let config = Config::from_env()?;
    config.require_api_key()?;

    let folder = match cli.folder {
        Some(folder) => folder,
        None => prompt::ask_folder()?,
    };
    if !folder.is_dir() {
        return Err(CliError::FolderNotFound(folder));
    }

    let throttle = RequestThrottle::new(config.request_delay);
    let provider = TraktProvider::new(config.api_key.clone(), throttle);
    let artwork = HttpArtworkFetcher::new(throttle);

    let query = prompt::ask_show_query(&folder)?;
    let results = provider.search_shows(&query)?;
    if results.is_empty() {
        return Err(CliError::NoSearchResults(query));
    }

    let mut chosen = prompt::choose_show(results)?;
    if chosen.is_none() {
        if let Some(slug) = prompt::ask_manual_slug()? {
            chosen = provider.lookup_show(&slug)?;
            if chosen.is_none() {
                eprintln!("No show found with slug \"{}\".", slug);
            }
        }
    }

    let Some(show) = chosen else {
        eprintln!("No show selected. Exiting.");
        return Ok(());
    };

    println!("\nShow confirmed: {}", prompt::display_title(&show));
    println!("Slug: {}", show.ids.slug);

    let tvshow_path = folder.join(TVSHOW_NFO);
    if tvshow_path.exists() && !prompt::confirm_overwrite(&tvshow_path)? {
        println!("Keeping the existing {}.", TVSHOW_NFO);
        println!("\nDone!");
        return Ok(());
    }

    scrape_show(
        &folder,
        &show,
        &config,
        &provider,
        &artwork,
        handle_progress_event,
    )?;

    println!("\nDone! Enjoy your show!");
    Ok(())
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("\nError: {}", e);
        process::exit(1);
    }
}
