/// Trakt API response types for deserialization.
///
/// These structures mirror the JSON returned by the Trakt v2 API. Almost every
/// field is optional; defaults are applied when converting into the domain
/// types of the parent module.
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// One hit of `/search/show`
#[derive(Debug, Deserialize)]
pub(super) struct TraktSearchResult {
    pub show: Option<TraktShow>,
}

/// Show ids
#[derive(Debug, Default, Deserialize)]
pub(super) struct TraktShowIds {
    pub trakt: Option<u64>,
    pub slug: Option<String>,
    pub imdb: Option<String>,
    pub tmdb: Option<u64>,
    pub tvdb: Option<u64>,
}

/// Episode ids
#[derive(Debug, Default, Deserialize)]
pub(super) struct TraktEpisodeIds {
    pub trakt: Option<u64>,
    pub tvdb: Option<u64>,
    pub imdb: Option<String>,
    pub tmdb: Option<u64>,
}

/// Image URLs keyed by kind, present with `extended=images`
///
/// URLs come without a scheme, e.g. `walter-r2.trakt.tv/images/...jpg.webp`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct TraktImages {
    pub poster: Vec<String>,
    pub fanart: Vec<String>,
    #[serde(alias = "logo")]
    pub clearlogo: Vec<String>,
    pub clearart: Vec<String>,
    pub banner: Vec<String>,
    pub thumb: Vec<String>,
    pub landscape: Vec<String>,
    pub keyart: Vec<String>,
    pub screenshot: Vec<String>,
}

/// A show with `extended=full,images`
#[derive(Debug, Deserialize)]
pub(super) struct TraktShow {
    pub title: Option<String>,
    pub year: Option<i32>,
    #[serde(default)]
    pub ids: TraktShowIds,
    pub overview: Option<String>,
    pub rating: Option<f64>,
    pub votes: Option<u64>,
    pub certification: Option<String>,
    pub genres: Option<Vec<String>>,
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
    pub images: Option<TraktImages>,
}

/// A season with `extended=episodes,images`
#[derive(Debug, Deserialize)]
pub(super) struct TraktSeason {
    pub number: u32,
    pub images: Option<TraktImages>,
    pub episodes: Option<Vec<TraktEpisode>>,
}

/// An episode, either the short listing form or `extended=full,images`
#[derive(Debug, Deserialize)]
pub(super) struct TraktEpisode {
    pub season: u32,
    pub number: u32,
    pub title: Option<String>,
    #[serde(default)]
    pub ids: TraktEpisodeIds,
    pub overview: Option<String>,
    pub original_title: Option<String>,
    pub runtime: Option<u32>,
    pub first_aired: Option<DateTime<Utc>>,
    pub images: Option<TraktImages>,
}

/// One entry of a `/translations/{language}` list
#[derive(Debug, Deserialize)]
pub(super) struct TraktTranslation {
    pub title: Option<String>,
    pub overview: Option<String>,
    pub tagline: Option<String>,
    pub language: Option<String>,
    pub country: Option<String>,
}

/// One entry of `/shows/{slug}/studios`
#[derive(Debug, Deserialize)]
pub(super) struct TraktStudio {
    pub name: Option<String>,
}
