//! trakt2kodi - Kodi .nfo files and artwork for a local TV show folder
//!
//! This library looks a show up on Trakt, writes `tvshow.nfo` into the show
//! folder, matches the episode files found in its `Season N` subfolders
//! against the Trakt episode listing and writes one `.nfo` (plus screenshot)
//! next to every matched file.

mod artwork;
mod config;
mod episode_merge;
mod file_resolver;
mod metadata_retrieval;
mod nfo;
mod throttle;

use artwork::download_show_images;
use episode_merge::{EpisodeIndex, EpisodeMerger, MergeContext, MergeOutcome, TranslationTarget};
use file_resolver::{NFO_EXTENSION, scan_seasons};
use nfo::{
    SeasonBlocks, ShowNfoInput, build_episode, build_tvshow, local_thumbs, named_season,
    season_poster_filename, season_thumb, write_nfo,
};

// Re-export error types
pub use artwork::ArtworkError;
pub use config::ConfigError;
pub use file_resolver::FileResolverError;
pub use metadata_retrieval::MetadataRetrievalError;
pub use nfo::NfoError;

// Re-export the types a front end needs to drive a run
pub use artwork::{ArtworkFetcher, FetchOptions, HttpArtworkFetcher};
pub use config::{Config, load_env_file};
pub use episode_merge::SkipReason;
pub use metadata_retrieval::{MetadataProvider, Show, TraktProvider};
pub use nfo::TVSHOW_NFO;
pub use throttle::RequestThrottle;

use chrono::Utc;
use metadata_retrieval::Season;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Progress event emitted during a scrape
///
/// These events allow library users to track progress and surface every
/// soft failure to the operator.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Scrape started
    Started {
        folder: PathBuf,
        title: String,
        slug: String,
    },

    /// Show image downloads are turned off
    ShowImagesDisabled,

    /// Season poster downloads are turned off
    SeasonImagesDisabled,

    /// Season titles are not translated
    SeasonTranslationsDisabled,

    /// An image was saved
    ///
    /// `label` names the image, e.g. `fanart`, `season 1 poster` or
    /// `S01E02 screenshot`.
    ArtworkSaved {
        label: String,
        path: PathBuf,
        bytes: u64,
    },

    /// An image could not be downloaded
    ArtworkFailed {
        label: String,
        path: PathBuf,
        error: String,
    },

    /// `tvshow.nfo` was written
    ShowNfoWritten { path: PathBuf },

    /// Scanning the season folders for episode files
    ScanningSeasons { folder: PathBuf },

    /// Episode files that already have an .nfo are left alone
    SkippingExistingNfo,

    /// Episode files below this size are left alone
    IgnoringSmallFiles { min_kib: u64 },

    /// Episode files found
    EpisodeFilesFound { count: usize },

    /// No episode file qualified
    NoEpisodeFiles,

    /// Episode titles and plots are not translated
    EpisodeTranslationsDisabled,

    /// An episode file got no .nfo
    EpisodeSkipped { path: PathBuf, reason: SkipReason },

    /// An episode .nfo was written
    EpisodeNfoWritten {
        path: PathBuf,
        season: u32,
        episode: u32,
        title: String,
    },

    /// Scrape complete
    Complete { summary: ScrapeSummary },
}

/// Counts reported at the end of a scrape
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScrapeSummary {
    pub episodes_written: usize,
    pub episodes_skipped: usize,
    pub images_failed: usize,
}

/// Top-level error type for trakt2kodi operations
#[derive(Debug, Error)]
pub enum Trakt2KodiError {
    /// Error during metadata retrieval
    #[error("Metadata retrieval error: {0}")]
    MetadataRetrieval(#[from] MetadataRetrievalError),

    /// Error during file resolution
    #[error("File resolution error: {0}")]
    FileResolver(#[from] FileResolverError),

    /// Error while writing an .nfo file
    #[error("NFO error: {0}")]
    Nfo(#[from] NfoError),
}

/// Writes all .nfo files and artwork for one show folder
///
/// The show images are downloaded first (when enabled), then studios, the
/// show translation and the season listing are fetched and `tvshow.nfo` is
/// written. Afterwards the season folders are scanned and every matched
/// episode gets its own `.nfo` and screenshot.
///
/// Failing to fetch the season listing aborts the run, as does any write or
/// scan error. Missing episode detail and failed image downloads are reported
/// through the callback and skipped.
///
/// # Arguments
///
/// * `folder` - The show folder, containing `Season N` subfolders
/// * `show` - The show the operator confirmed
/// * `config` - Feature toggles and translation target
/// * `provider` - Remote metadata source
/// * `artwork` - Image downloader
/// * `progress_callback` - Closure called with progress events
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use trakt2kodi::{
///     Config, HttpArtworkFetcher, MetadataProvider, ProgressEvent, RequestThrottle,
///     TraktProvider, scrape_show,
/// };
///
/// let config = Config::from_env().unwrap();
/// let throttle = RequestThrottle::new(config.request_delay);
/// let provider = TraktProvider::new(config.api_key.clone(), throttle);
/// let artwork = HttpArtworkFetcher::new(throttle);
///
/// let show = provider.lookup_show("the-office").unwrap().unwrap();
/// let summary = scrape_show(
///     Path::new("/media/tv/The Office"),
///     &show,
///     &config,
///     &provider,
///     &artwork,
///     |event| {
///         if let ProgressEvent::EpisodeNfoWritten { path, .. } = event {
///             println!("Wrote {}", path.display());
///         }
///     },
/// )
/// .unwrap();
/// println!("{} episodes", summary.episodes_written);
/// ```
pub fn scrape_show<P, A, F>(
    folder: &Path,
    show: &Show,
    config: &Config,
    provider: &P,
    artwork: &A,
    mut progress_callback: F,
) -> Result<ScrapeSummary, Trakt2KodiError>
where
    P: MetadataProvider,
    A: ArtworkFetcher,
    F: FnMut(ProgressEvent),
{
    let slug = show.ids.slug.as_str();
    let started_at = Utc::now();
    let mut summary = ScrapeSummary::default();

    progress_callback(ProgressEvent::Started {
        folder: folder.to_path_buf(),
        title: show.title.clone(),
        slug: slug.to_string(),
    });

    if config.download_show_images {
        for download in download_show_images(&show.images, folder, artwork) {
            report_image(
                download.aspect.to_string(),
                download.path,
                download.result,
                &mut summary,
                &mut progress_callback,
            );
        }
    } else {
        progress_callback(ProgressEvent::ShowImagesDisabled);
    }

    let studios = provider.studios(slug);
    let translation = provider.show_translation(slug, &config.language, &config.country);
    let seasons = provider.seasons(slug)?;

    let season_blocks = build_season_blocks(
        &seasons,
        slug,
        folder,
        config,
        provider,
        artwork,
        &mut summary,
        &mut progress_callback,
    );

    let tvshow_path = folder.join(TVSHOW_NFO);
    let tvshow = build_tvshow(ShowNfoInput {
        show,
        translation: translation.as_ref(),
        studios: &studios,
        local_thumbs: local_thumbs(folder),
        seasons: season_blocks,
    });
    write_nfo(&tvshow_path, tvshow, started_at)?;
    progress_callback(ProgressEvent::ShowNfoWritten { path: tvshow_path });

    let scan_options = config.scan_options();
    if scan_options.skip_existing_nfo {
        progress_callback(ProgressEvent::SkippingExistingNfo);
    }
    if scan_options.min_file_size_kib > 0 {
        progress_callback(ProgressEvent::IgnoringSmallFiles {
            min_kib: scan_options.min_file_size_kib,
        });
    }
    progress_callback(ProgressEvent::ScanningSeasons {
        folder: folder.to_path_buf(),
    });
    let files = scan_seasons(folder, &scan_options)?;
    let file_count: usize = files.values().map(|episodes| episodes.len()).sum();

    if file_count == 0 {
        progress_callback(ProgressEvent::NoEpisodeFiles);
        progress_callback(ProgressEvent::Complete { summary });
        return Ok(summary);
    }
    progress_callback(ProgressEvent::EpisodeFilesFound { count: file_count });

    if !config.fetch_episode_translation {
        progress_callback(ProgressEvent::EpisodeTranslationsDisabled);
    }

    let index = EpisodeIndex::from_seasons(&seasons);
    let context = MergeContext {
        slug,
        genres: &show.genres,
        translation: config
            .fetch_episode_translation
            .then_some(TranslationTarget {
                language: &config.language,
                country: &config.country,
            }),
        date_added: started_at.date_naive(),
    };

    for outcome in EpisodeMerger::new(&files, &index, provider, context) {
        let episode = match outcome {
            MergeOutcome::Merged(episode) => episode,
            MergeOutcome::Skipped(skipped) => {
                summary.episodes_skipped += 1;
                progress_callback(ProgressEvent::EpisodeSkipped {
                    path: skipped.file.path(),
                    reason: skipped.reason,
                });
                continue;
            }
        };

        let nfo_path = episode.file.sibling_path(NFO_EXTENSION);
        write_nfo(&nfo_path, build_episode(&episode), Utc::now())?;
        summary.episodes_written += 1;
        progress_callback(ProgressEvent::EpisodeNfoWritten {
            path: nfo_path,
            season: episode.season,
            episode: episode.episode,
            title: episode.title.clone(),
        });

        if let (Some(url), Some(thumb)) = (&episode.screenshot_url, &episode.thumb) {
            let path = episode.file.directory.join(thumb);
            let result = artwork.fetch(url, &path, FetchOptions::default());
            let label = format!("S{:02}E{:02} screenshot", episode.season, episode.episode);
            report_image(label, path, result, &mut summary, &mut progress_callback);
        }
    }

    progress_callback(ProgressEvent::Complete { summary });

    Ok(summary)
}

/// Builds named-season and season-poster entries, downloading posters when enabled
///
/// Every season gets a `<namedseason>`, translated when enabled and available,
/// else `Season N`. Only seasons with a poster URL get a `<thumb>`. The thumb
/// is listed even when the download is disabled or fails.
#[allow(clippy::too_many_arguments)]
fn build_season_blocks<P, A, F>(
    seasons: &[Season],
    slug: &str,
    folder: &Path,
    config: &Config,
    provider: &P,
    artwork: &A,
    summary: &mut ScrapeSummary,
    progress_callback: &mut F,
) -> SeasonBlocks
where
    P: MetadataProvider,
    A: ArtworkFetcher,
    F: FnMut(ProgressEvent),
{
    if !config.download_season_images {
        progress_callback(ProgressEvent::SeasonImagesDisabled);
    }
    if !config.fetch_season_translation {
        progress_callback(ProgressEvent::SeasonTranslationsDisabled);
    }

    let mut blocks = SeasonBlocks::default();

    for season in seasons {
        let title = config
            .fetch_season_translation
            .then(|| {
                provider.season_translation(slug, season.number, &config.language, &config.country)
            })
            .flatten()
            .unwrap_or_else(|| format!("Season {}", season.number));
        blocks.named_seasons.push(named_season(season.number, &title));

        let Some(poster) = &season.poster else {
            continue;
        };
        let filename = season_poster_filename(season.number);

        if config.download_season_images {
            let path = folder.join(&filename);
            let result = artwork.fetch(poster, &path, FetchOptions::stripped());
            let label = format!("season {} poster", season.number);
            report_image(label, path, result, summary, progress_callback);
        }

        blocks.thumbs.push(season_thumb(season.number, &filename));
    }

    blocks
}

fn report_image<F>(
    label: String,
    path: PathBuf,
    result: Result<u64, ArtworkError>,
    summary: &mut ScrapeSummary,
    progress_callback: &mut F,
) where
    F: FnMut(ProgressEvent),
{
    match result {
        Ok(bytes) => progress_callback(ProgressEvent::ArtworkSaved { label, path, bytes }),
        Err(e) => {
            summary.images_failed += 1;
            progress_callback(ProgressEvent::ArtworkFailed {
                label,
                path,
                error: e.to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artwork::tests::FakeFetcher;
    use crate::episode_merge::tests::{FakeProvider, extended, listed};
    use crate::metadata_retrieval::{ImageSet, ShowIds, Translation};
    use std::fs;

    fn show() -> Show {
        Show {
            title: "My Show".to_string(),
            year: Some(2020),
            ids: ShowIds {
                trakt: 42,
                slug: "my-show".to_string(),
                ..Default::default()
            },
            genres: vec!["drama".to_string()],
            images: ImageSet {
                poster: Some("img/poster.jpg.webp".to_string()),
                fanart: Some("img/broken.jpg.webp".to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn provider() -> FakeProvider {
        let mut provider = FakeProvider::default();
        provider.seasons = vec![
            Season {
                number: 0,
                poster: None,
                episodes: vec![],
            },
            Season {
                number: 1,
                poster: Some("img/s1.jpg.webp".to_string()),
                episodes: vec![listed(1, 1, "Pilot"), listed(1, 2, "Second")],
            },
        ];
        provider.extended.insert((1, 1), extended(1, 1, "Pilot"));
        provider.missing.insert((1, 2));
        provider
    }

    fn show_folder() -> tempfile::TempDir {
        let root = tempfile::tempdir().unwrap();
        let season = root.path().join("Season 01");
        fs::create_dir(&season).unwrap();
        fs::write(season.join("MyShow.S01E01.mkv"), b"video").unwrap();
        fs::write(season.join("MyShow.S01E02.mkv"), b"video").unwrap();
        fs::write(season.join("MyShow.S01E03.mkv"), b"video").unwrap();
        root
    }

    fn run(
        folder: &Path,
        config: &Config,
        provider: &FakeProvider,
        fetcher: &FakeFetcher,
    ) -> (Result<ScrapeSummary, Trakt2KodiError>, Vec<ProgressEvent>) {
        let mut events = Vec::new();
        let result = scrape_show(folder, &show(), config, provider, fetcher, |event| {
            events.push(event)
        });
        (result, events)
    }

    #[test]
    fn test_scrape_writes_show_and_episode_files() {
        let folder = show_folder();
        let config = Config {
            download_show_images: true,
            download_season_images: true,
            ..Default::default()
        };
        let provider = provider();
        let fetcher = FakeFetcher::default();
        // Left over from an earlier run, the new fanart download fails
        fs::write(folder.path().join("fanart.jpg"), b"old fanart").unwrap();

        let (result, events) = run(folder.path(), &config, &provider, &fetcher);
        let summary = result.unwrap();

        assert_eq!(
            summary,
            ScrapeSummary {
                episodes_written: 1,
                episodes_skipped: 2,
                images_failed: 1,
            }
        );
        assert!(!folder.path().join("fanart.jpg").exists());

        let failed: Vec<&str> = events
            .iter()
            .filter_map(|event| match event {
                ProgressEvent::ArtworkFailed { label, .. } => Some(label.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(failed, vec!["fanart"]);
        let saved: Vec<&str> = events
            .iter()
            .filter_map(|event| match event {
                ProgressEvent::ArtworkSaved { label, .. } => Some(label.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(saved, vec!["poster", "season 1 poster", "S01E01 screenshot"]);

        let tvshow = fs::read_to_string(folder.path().join(TVSHOW_NFO)).unwrap();
        assert!(tvshow.contains("<namedseason number=\"0\">Season 0</namedseason>"));
        assert!(tvshow.contains("<namedseason number=\"1\">Season 1</namedseason>"));
        assert!(
            tvshow.contains(
                "<thumb aspect=\"poster\" season=\"1\" type=\"season\">season01-poster.jpg</thumb>"
            )
        );
        assert!(tvshow.contains("<thumb aspect=\"poster\" preview=\"poster.jpg\">poster.jpg</thumb>"));
        assert!(!tvshow.contains("preview=\"fanart.jpg\""));

        let season = folder.path().join("Season 01");
        let episode = fs::read_to_string(season.join("MyShow.S01E01.nfo")).unwrap();
        assert!(episode.contains("<title>Pilot</title>"));
        assert!(episode.contains("<showtitle>my show</showtitle>"));
        assert!(episode.contains("<thumb>MyShow.S01E01.jpg</thumb>"));
        assert!(season.join("MyShow.S01E01.jpg").exists());
        assert!(!season.join("MyShow.S01E02.nfo").exists());
        assert!(!season.join("MyShow.S01E03.nfo").exists());

        let requests = fetcher.requests.borrow();
        let screenshot = requests
            .iter()
            .find(|(_, path, _)| path.ends_with("MyShow.S01E01.jpg"))
            .unwrap();
        assert!(!screenshot.2.strip_unsupported_extension);
        assert!(
            requests
                .iter()
                .any(|(_, path, options)| path.ends_with("season01-poster.jpg")
                    && options.strip_unsupported_extension)
        );

        let skipped: Vec<SkipReason> = events
            .iter()
            .filter_map(|event| match event {
                ProgressEvent::EpisodeSkipped { reason, .. } => Some(*reason),
                _ => None,
            })
            .collect();
        assert_eq!(
            skipped,
            vec![SkipReason::MissingExtendedDetail, SkipReason::MissingListing]
        );
        assert!(matches!(events.last(), Some(ProgressEvent::Complete { .. })));
    }

    #[test]
    fn test_disabled_features_are_reported_and_skipped() {
        let folder = show_folder();
        let config = Config::default();
        let provider = provider();
        let fetcher = FakeFetcher::default();

        let (result, events) = run(folder.path(), &config, &provider, &fetcher);
        result.unwrap();

        for expected in [
            "ShowImagesDisabled",
            "SeasonImagesDisabled",
            "SeasonTranslationsDisabled",
            "EpisodeTranslationsDisabled",
        ] {
            assert!(
                events.iter().any(|e| format!("{e:?}") == expected),
                "missing {expected}"
            );
        }

        // Only the episode screenshot is downloaded
        let requests = fetcher.requests.borrow();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].1.ends_with("MyShow.S01E01.jpg"));

        // The season thumb is listed even without a download
        let tvshow = fs::read_to_string(folder.path().join(TVSHOW_NFO)).unwrap();
        assert!(tvshow.contains("season01-poster.jpg"));
    }

    #[test]
    fn test_translations_are_applied_when_enabled() {
        let folder = show_folder();
        let config = Config {
            language: "pt".to_string(),
            country: "br".to_string(),
            fetch_season_translation: true,
            fetch_episode_translation: true,
            ..Default::default()
        };
        let mut provider = provider();
        provider.season_titles.insert(1, "Temporada 1".to_string());
        provider.show_translation = Some(Translation {
            title: Some("Meu Programa".to_string()),
            language: "pt".to_string(),
            ..Default::default()
        });
        provider.translations.insert(
            (1, 1),
            Translation {
                title: Some("Piloto".to_string()),
                language: "pt".to_string(),
                ..Default::default()
            },
        );
        let fetcher = FakeFetcher::default();

        let (result, _) = run(folder.path(), &config, &provider, &fetcher);
        result.unwrap();

        let tvshow = fs::read_to_string(folder.path().join(TVSHOW_NFO)).unwrap();
        assert!(tvshow.contains("<title>Meu Programa</title>"));
        assert!(tvshow.contains("<namedseason number=\"1\">Temporada 1</namedseason>"));
        assert!(tvshow.contains("<namedseason number=\"0\">Season 0</namedseason>"));

        let episode =
            fs::read_to_string(folder.path().join("Season 01").join("MyShow.S01E01.nfo")).unwrap();
        assert!(episode.contains("<title>Piloto</title>"));
        assert!(
            provider
                .calls
                .borrow()
                .contains(&"translation S01E01 pt-br".to_string())
        );
    }

    #[test]
    fn test_season_listing_failure_aborts_before_writing() {
        let folder = show_folder();
        let mut provider = provider();
        provider.fail_seasons = true;
        let fetcher = FakeFetcher::default();

        let (result, _) = run(folder.path(), &Config::default(), &provider, &fetcher);

        assert!(matches!(result, Err(Trakt2KodiError::MetadataRetrieval(_))));
        assert!(!folder.path().join(TVSHOW_NFO).exists());
    }

    #[test]
    fn test_folder_without_episode_files() {
        let folder = tempfile::tempdir().unwrap();
        let provider = provider();
        let fetcher = FakeFetcher::default();

        let (result, events) = run(folder.path(), &Config::default(), &provider, &fetcher);

        assert_eq!(result.unwrap(), ScrapeSummary::default());
        assert!(folder.path().join(TVSHOW_NFO).exists());
        assert!(events.iter().any(|e| matches!(e, ProgressEvent::NoEpisodeFiles)));
        assert!(
            !provider
                .calls
                .borrow()
                .iter()
                .any(|call| call.starts_with("extended"))
        );
    }

    #[test]
    fn test_existing_episode_nfo_is_skipped_when_configured() {
        let folder = show_folder();
        let season = folder.path().join("Season 01");
        fs::write(season.join("MyShow.S01E01.nfo"), b"<episodedetails/>").unwrap();
        let config = Config {
            skip_episodes_with_nfo: true,
            ..Default::default()
        };
        let provider = provider();
        let fetcher = FakeFetcher::default();

        let (result, events) = run(folder.path(), &config, &provider, &fetcher);

        assert_eq!(result.unwrap().episodes_written, 0);
        assert!(events.iter().any(|e| matches!(e, ProgressEvent::SkippingExistingNfo)));
        assert_eq!(
            fs::read_to_string(season.join("MyShow.S01E01.nfo")).unwrap(),
            "<episodedetails/>"
        );
    }
}
