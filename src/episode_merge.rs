//! Episode metadata merge engine
//!
//! Combines the episode files found on disk with the remote season listing,
//! the extended per-episode detail and an optional translation into one
//! [`NormalizedEpisode`] per file.

use crate::file_resolver::{LocalEpisodeFile, SeasonMap, season_key};
use crate::metadata_retrieval::{
    EpisodeSummary, ExtendedEpisode, MetadataProvider, Season, Translation,
};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use std::collections::BTreeMap;
use std::fmt;

/// Extension of downloaded episode screenshots
pub const THUMB_EXTENSION: &str = "jpg";

/// Remote episode listing indexed by two-digit season key
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EpisodeIndex {
    seasons: BTreeMap<String, Vec<EpisodeSummary>>,
}

impl EpisodeIndex {
    /// Indexes the episode listings of the given seasons
    pub fn from_seasons(seasons: &[Season]) -> Self {
        let seasons = seasons
            .iter()
            .map(|season| (season_key(season.number), season.episodes.clone()))
            .collect();
        Self { seasons }
    }

    /// Finds the listed episode for a season key and episode number
    pub fn get(&self, season_key: &str, episode: u32) -> Option<&EpisodeSummary> {
        self.seasons
            .get(season_key)?
            .iter()
            .find(|listed| listed.number == episode)
    }
}

/// Language and country used for episode translations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranslationTarget<'a> {
    pub language: &'a str,
    pub country: &'a str,
}

/// Show-level inputs shared by every merged episode
#[derive(Debug, Clone, Copy)]
pub struct MergeContext<'a> {
    /// Trakt slug of the show
    pub slug: &'a str,
    /// Genres of the show, copied onto every episode
    pub genres: &'a [String],
    /// Fetch translations for this target, `None` disables them
    pub translation: Option<TranslationTarget<'a>>,
    /// The day this run executes
    pub date_added: NaiveDate,
}

/// One episode record ready to be rendered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedEpisode {
    /// The file this record describes
    pub file: LocalEpisodeFile,
    pub title: String,
    pub original_title: String,
    /// Slug with hyphens replaced by spaces
    pub show_title: String,
    /// Always the season of `file`
    pub season: u32,
    /// Always the episode number of `file`
    pub episode: u32,
    pub trakt_id: u64,
    pub plot: String,
    pub runtime: Option<u32>,
    /// Show genres joined with ` / `
    pub genre: String,
    pub first_aired: Option<DateTime<Utc>>,
    /// Local screenshot filename, set only when a screenshot URL exists
    pub thumb: Option<String>,
    /// Remote screenshot URL
    pub screenshot_url: Option<String>,
    pub date_added: NaiveDate,
}

impl NormalizedEpisode {
    /// Air date at day precision (UTC)
    pub fn aired(&self) -> Option<NaiveDate> {
        self.first_aired.map(|at| at.date_naive())
    }

    /// Calendar year of the air date (UTC)
    pub fn year(&self) -> Option<i32> {
        self.first_aired.map(|at| at.year())
    }
}

/// Why an episode file produced no record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The season listing has no such episode
    MissingListing,
    /// The extended episode detail could not be fetched
    MissingExtendedDetail,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingListing => write!(f, "episode metadata not found"),
            SkipReason::MissingExtendedDetail => write!(f, "extended episode data unavailable"),
        }
    }
}

/// An episode file that was left out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEpisode {
    pub file: LocalEpisodeFile,
    pub reason: SkipReason,
}

/// Result of merging one episode file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    Merged(Box<NormalizedEpisode>),
    Skipped(SkippedEpisode),
}

/// Lazily merges every scanned episode file, one remote round-trip at a time
///
/// Files are visited in season key order, then episode number order. Nothing
/// is fetched until the iterator is advanced.
pub struct EpisodeMerger<'a, P: MetadataProvider> {
    files: std::vec::IntoIter<&'a LocalEpisodeFile>,
    index: &'a EpisodeIndex,
    provider: &'a P,
    context: MergeContext<'a>,
}

impl<'a, P: MetadataProvider> EpisodeMerger<'a, P> {
    /// Creates a merger over the scanned files
    pub fn new(
        files: &'a SeasonMap,
        index: &'a EpisodeIndex,
        provider: &'a P,
        context: MergeContext<'a>,
    ) -> Self {
        let files: Vec<&LocalEpisodeFile> =
            files.values().flat_map(|episodes| episodes.values()).collect();
        Self {
            files: files.into_iter(),
            index,
            provider,
            context,
        }
    }

    fn merge(&self, file: &LocalEpisodeFile) -> MergeOutcome {
        let skip = |reason| {
            MergeOutcome::Skipped(SkippedEpisode {
                file: file.clone(),
                reason,
            })
        };

        let key = season_key(file.season_number);
        let Some(listing) = self.index.get(&key, file.episode_number) else {
            return skip(SkipReason::MissingListing);
        };

        let Some(extended) =
            self.provider
                .extended_episode(self.context.slug, file.season_number, file.episode_number)
        else {
            return skip(SkipReason::MissingExtendedDetail);
        };

        let translation = self.context.translation.and_then(|target| {
            self.provider.episode_translation(
                self.context.slug,
                file.season_number,
                file.episode_number,
                target.language,
                target.country,
            )
        });

        MergeOutcome::Merged(Box::new(resolve_episode(
            file,
            listing,
            &extended,
            translation.as_ref(),
            &self.context,
        )))
    }
}

impl<P: MetadataProvider> Iterator for EpisodeMerger<'_, P> {
    type Item = MergeOutcome;

    fn next(&mut self) -> Option<Self::Item> {
        let file = self.files.next()?;
        Some(self.merge(file))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.files.size_hint()
    }
}

/// Resolves one episode record from its sources
///
/// Text fields prefer the translation, then the extended detail, then the
/// listing. Numbers and dates prefer the extended detail over the listing.
/// Season and episode always come from the local file.
pub fn resolve_episode(
    file: &LocalEpisodeFile,
    listing: &EpisodeSummary,
    extended: &ExtendedEpisode,
    translation: Option<&Translation>,
    context: &MergeContext<'_>,
) -> NormalizedEpisode {
    let title = first_non_empty([
        translation.and_then(|t| t.title.as_deref()),
        extended.title.as_deref(),
        Some(listing.title.as_str()),
    ]);
    let plot = first_non_empty([
        translation.and_then(|t| t.overview.as_deref()),
        extended.overview.as_deref(),
    ]);
    let original_title = extended
        .original_title
        .as_deref()
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| title.clone());

    let trakt_id = match extended.ids.trakt {
        0 => listing.ids.trakt,
        id => id,
    };

    let screenshot_url = extended.screenshot.clone();
    let thumb = screenshot_url
        .as_ref()
        .map(|_| file.sibling_filename(THUMB_EXTENSION));

    NormalizedEpisode {
        file: file.clone(),
        title,
        original_title,
        show_title: context.slug.replace('-', " "),
        season: file.season_number,
        episode: file.episode_number,
        trakt_id,
        plot,
        runtime: extended.runtime.or(listing.runtime),
        genre: context.genres.join(" / "),
        first_aired: extended.first_aired.or(listing.first_aired),
        thumb,
        screenshot_url,
        date_added: context.date_added,
    }
}

fn first_non_empty<const N: usize>(candidates: [Option<&str>; N]) -> String {
    candidates
        .into_iter()
        .flatten()
        .find(|value| !value.is_empty())
        .unwrap_or_default()
        .to_string()
}
