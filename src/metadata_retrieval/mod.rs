/// Data structures and traits for TV show metadata retrieval.
///
/// This module provides the domain records for shows, seasons, episodes and
/// translations, and the [`MetadataProvider`] trait the rest of the crate
/// consumes. Wire formats and defaulting stay inside the provider.
mod trakt;
mod trakt_types;

pub use trakt::TraktProvider;

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur during metadata retrieval operations.
#[derive(Debug, Error)]
pub enum MetadataRetrievalError {
    /// No API key is configured
    #[error("Missing Trakt API key")]
    MissingCredential,

    /// Request to the metadata provider failed
    #[error("Request failed: {0}")]
    RequestError(String),

    /// The provider answered with a non-success status
    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    /// Failed to parse the provider's JSON response
    #[error("Failed to parse API response: {0}")]
    ParseError(String),
}

/// External ids of a show
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShowIds {
    pub trakt: u64,
    pub slug: String,
    pub imdb: Option<String>,
    pub tmdb: Option<u64>,
    pub tvdb: Option<u64>,
}

/// External ids of an episode
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EpisodeIds {
    pub trakt: u64,
    pub tvdb: Option<u64>,
    pub imdb: Option<String>,
    pub tmdb: Option<u64>,
}

/// Remote image URLs of a show, first entry of each kind is used
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageSet {
    pub poster: Option<String>,
    pub fanart: Option<String>,
    pub clearlogo: Option<String>,
    pub clearart: Option<String>,
    pub banner: Option<String>,
    pub thumb: Option<String>,
    pub landscape: Option<String>,
    pub keyart: Option<String>,
}

impl ImageSet {
    /// Looks up an image URL by its Kodi aspect name
    pub fn get(&self, aspect: &str) -> Option<&str> {
        let url = match aspect {
            "poster" => &self.poster,
            "fanart" => &self.fanart,
            "clearlogo" => &self.clearlogo,
            "clearart" => &self.clearart,
            "banner" => &self.banner,
            "thumb" => &self.thumb,
            "landscape" => &self.landscape,
            "keyart" => &self.keyart,
            _ => return None,
        };
        url.as_deref()
    }
}

/// A TV show as returned by search or lookup
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Show {
    pub title: String,
    pub year: Option<i32>,
    pub ids: ShowIds,
    pub overview: Option<String>,
    pub rating: Option<f64>,
    pub votes: Option<u64>,
    pub certification: Option<String>,
    pub genres: Vec<String>,
    pub first_aired: Option<DateTime<Utc>>,
    pub status: Option<String>,
    pub language: Option<String>,
    pub network: Option<String>,
    pub original_title: Option<String>,
    pub tagline: Option<String>,
    pub runtime: Option<u32>,
    pub trailer: Option<String>,
    pub aired_episodes: Option<u32>,
    pub country: Option<String>,
    pub images: ImageSet,
}

/// Summary of an episode as listed inside its season
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EpisodeSummary {
    pub season: u32,
    pub number: u32,
    pub title: String,
    pub ids: EpisodeIds,
    pub runtime: Option<u32>,
    pub first_aired: Option<DateTime<Utc>>,
}

/// A season with its episode listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Season {
    /// The season number (0 for specials)
    pub number: u32,
    /// First poster URL, if any
    pub poster: Option<String>,
    /// Episodes of this season
    pub episodes: Vec<EpisodeSummary>,
}

/// Full per-episode detail, fetched one episode at a time
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtendedEpisode {
    pub season: u32,
    pub number: u32,
    pub title: Option<String>,
    pub original_title: Option<String>,
    pub overview: Option<String>,
    pub runtime: Option<u32>,
    pub first_aired: Option<DateTime<Utc>>,
    pub ids: EpisodeIds,
    /// First screenshot URL, if any
    pub screenshot: Option<String>,
}

/// Translated text fields of a show, season or episode
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Translation {
    pub title: Option<String>,
    pub overview: Option<String>,
    pub tagline: Option<String>,
    pub language: String,
    pub country: Option<String>,
}

/// Picks the translation for a language and country
///
/// An exact language and country match wins, then an entry in the language
/// with no country, then any other entry in the language. Returns `None` when
/// nothing matches.
pub fn select_translation(
    translations: Vec<Translation>,
    language: &str,
    country: &str,
) -> Option<Translation> {
    let in_language = |t: &Translation| t.language.eq_ignore_ascii_case(language);
    let exact = translations.iter().position(|t| {
        in_language(t)
            && t.country
                .as_deref()
                .is_some_and(|c| c.eq_ignore_ascii_case(country))
    });
    let index = exact
        .or_else(|| {
            translations
                .iter()
                .position(|t| in_language(t) && t.country.as_deref().is_none_or(str::is_empty))
        })
        .or_else(|| translations.iter().position(in_language))?;
    translations.into_iter().nth(index)
}

/// Trait for metadata providers that can fetch TV show information.
///
/// Lookups feeding a single output field are soft: they return `None` or an
/// empty list on any failure and log why. Only the calls the run cannot do
/// without (search, lookup by slug, season listing) return errors.
pub trait MetadataProvider {
    /// Searches shows by free-text query
    fn search_shows(&self, query: &str) -> Result<Vec<Show>, MetadataRetrievalError>;

    /// Looks up a single show by its slug, `Ok(None)` when it does not exist
    fn lookup_show(&self, slug: &str) -> Result<Option<Show>, MetadataRetrievalError>;

    /// Fetches all seasons with their episode listings
    fn seasons(&self, slug: &str) -> Result<Vec<Season>, MetadataRetrievalError>;

    /// Fetches studio names, empty when unavailable
    fn studios(&self, slug: &str) -> Vec<String>;

    /// Fetches the show translation for a language and country
    fn show_translation(&self, slug: &str, language: &str, country: &str) -> Option<Translation>;

    /// Fetches the translated title of a season
    fn season_translation(
        &self,
        slug: &str,
        season: u32,
        language: &str,
        country: &str,
    ) -> Option<String>;

    /// Fetches the extended detail of one episode
    fn extended_episode(&self, slug: &str, season: u32, episode: u32) -> Option<ExtendedEpisode>;

    /// Fetches the translation of one episode
    fn episode_translation(
        &self,
        slug: &str,
        season: u32,
        episode: u32,
        language: &str,
        country: &str,
    ) -> Option<Translation>;
}
