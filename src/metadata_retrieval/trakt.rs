/// Trakt metadata provider implementation.
use super::trakt_types::{
    TraktEpisode, TraktImages, TraktSearchResult, TraktSeason, TraktShow, TraktStudio,
    TraktTranslation,
};
use super::{
    EpisodeIds, EpisodeSummary, ExtendedEpisode, ImageSet, MetadataProvider,
    MetadataRetrievalError, Season, Show, ShowIds, Translation, select_translation,
};
use crate::throttle::RequestThrottle;
use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use tracing::{debug, error, info, warn};

/// Metadata provider for the Trakt v2 API.
///
/// Every request waits on the throttle first and carries the API key in the
/// `trakt-api-key` header. Nothing is retried.
pub struct TraktProvider {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: Option<String>,
    throttle: RequestThrottle,
}

impl TraktProvider {
    /// Creates a new Trakt provider instance.
    pub fn new(api_key: Option<String>, throttle: RequestThrottle) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            base_url: "https://api.trakt.tv".to_string(),
            api_key,
            throttle,
        }
    }

    /// Performs a GET request and decodes the JSON body
    fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, MetadataRetrievalError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(MetadataRetrievalError::MissingCredential)?;

        self.throttle.wait();

        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "requesting");

        let response = self
            .client
            .get(&url)
            .query(query)
            .header(CONTENT_TYPE, "application/json")
            .header("trakt-api-version", "2")
            .header("trakt-api-key", api_key)
            .send()
            .map_err(|e| MetadataRetrievalError::RequestError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MetadataRetrievalError::HttpStatus {
                status: status.as_u16(),
                url,
            });
        }

        let body = response
            .text()
            .map_err(|e| MetadataRetrievalError::RequestError(e.to_string()))?;

        serde_json::from_str(&body).map_err(|e| MetadataRetrievalError::ParseError(e.to_string()))
    }

    /// Logs a soft lookup failure
    fn log_miss(what: &str, err: &MetadataRetrievalError) {
        match err {
            MetadataRetrievalError::MissingCredential => {
                error!("Missing TRAKT_API_KEY, cannot fetch {what}")
            }
            _ => warn!("Failed to fetch {what}: {err}"),
        }
    }

    fn convert_images(images: Option<TraktImages>) -> ImageSet {
        let images = images.unwrap_or_default();
        let first = |urls: Vec<String>| urls.into_iter().find(|u| !u.is_empty());
        ImageSet {
            poster: first(images.poster),
            fanart: first(images.fanart),
            clearlogo: first(images.clearlogo),
            clearart: first(images.clearart),
            banner: first(images.banner),
            thumb: first(images.thumb),
            landscape: first(images.landscape),
            keyart: first(images.keyart),
        }
    }

    /// Converts a Trakt show to our internal Show structure.
    fn convert_show(show: TraktShow) -> Show {
        Show {
            title: show.title.unwrap_or_default(),
            year: show.year,
            ids: ShowIds {
                trakt: show.ids.trakt.unwrap_or_default(),
                slug: show.ids.slug.unwrap_or_default(),
                imdb: show.ids.imdb.filter(|id| !id.is_empty()),
                tmdb: show.ids.tmdb,
                tvdb: show.ids.tvdb,
            },
            overview: show.overview,
            rating: show.rating,
            votes: show.votes,
            certification: show.certification,
            genres: show.genres.unwrap_or_default(),
            first_aired: show.first_aired,
            status: show.status,
            language: show.language,
            network: show.network,
            original_title: show.original_title,
            tagline: show.tagline,
            runtime: show.runtime,
            trailer: show.trailer,
            aired_episodes: show.aired_episodes,
            country: show.country,
            images: Self::convert_images(show.images),
        }
    }

    fn convert_episode_ids(episode: &mut TraktEpisode) -> EpisodeIds {
        let ids = std::mem::take(&mut episode.ids);
        EpisodeIds {
            trakt: ids.trakt.unwrap_or_default(),
            tvdb: ids.tvdb,
            imdb: ids.imdb.filter(|id| !id.is_empty()),
            tmdb: ids.tmdb,
        }
    }

    fn convert_episode_summary(mut episode: TraktEpisode) -> EpisodeSummary {
        EpisodeSummary {
            ids: Self::convert_episode_ids(&mut episode),
            season: episode.season,
            number: episode.number,
            title: episode.title.unwrap_or_default(),
            runtime: episode.runtime,
            first_aired: episode.first_aired,
        }
    }

    fn convert_extended_episode(mut episode: TraktEpisode) -> ExtendedEpisode {
        ExtendedEpisode {
            ids: Self::convert_episode_ids(&mut episode),
            season: episode.season,
            number: episode.number,
            title: episode.title,
            original_title: episode.original_title,
            overview: episode.overview,
            runtime: episode.runtime,
            first_aired: episode.first_aired,
            screenshot: episode
                .images
                .and_then(|images| images.screenshot.into_iter().find(|u| !u.is_empty())),
        }
    }

    fn convert_season(season: TraktSeason) -> Season {
        let mut episodes: Vec<EpisodeSummary> = season
            .episodes
            .unwrap_or_default()
            .into_iter()
            .map(Self::convert_episode_summary)
            .collect();
        episodes.sort_by_key(|e| e.number);

        Season {
            number: season.number,
            poster: season
                .images
                .and_then(|images| images.poster.into_iter().find(|u| !u.is_empty())),
            episodes,
        }
    }

    fn convert_translation(translation: TraktTranslation) -> Translation {
        Translation {
            title: translation.title.filter(|t| !t.is_empty()),
            overview: translation.overview.filter(|t| !t.is_empty()),
            tagline: translation.tagline.filter(|t| !t.is_empty()),
            language: translation.language.unwrap_or_default(),
            country: translation.country,
        }
    }

    /// Fetches a translation list and selects the best entry
    fn translation(&self, path: &str, what: &str, language: &str, country: &str) -> Option<Translation> {
        info!("Fetching translation for {what} ({language}-{country})");
        match self.get::<Vec<TraktTranslation>>(path, &[]) {
            Ok(list) => select_translation(
                list.into_iter().map(Self::convert_translation).collect(),
                language,
                country,
            ),
            Err(err) => {
                Self::log_miss(&format!("translation for {what}"), &err);
                None
            }
        }
    }
}

impl MetadataProvider for TraktProvider {
    fn search_shows(&self, query: &str) -> Result<Vec<Show>, MetadataRetrievalError> {
        let results: Vec<TraktSearchResult> = match self.get(
            "/search/show",
            &[("query", query), ("extended", "full,images")],
        ) {
            Ok(results) => results,
            Err(MetadataRetrievalError::MissingCredential) => {
                error!("TRAKT_API_KEY is not defined, cannot search for \"{query}\"");
                return Ok(Vec::new());
            }
            Err(err) => return Err(err),
        };

        Ok(results
            .into_iter()
            .filter_map(|result| result.show)
            .map(Self::convert_show)
            .filter(|show| !show.ids.slug.is_empty())
            .collect())
    }

    fn lookup_show(&self, slug: &str) -> Result<Option<Show>, MetadataRetrievalError> {
        match self.get::<TraktShow>(&format!("/shows/{slug}"), &[("extended", "full,images")]) {
            Ok(show) => Ok(Some(Self::convert_show(show))),
            Err(MetadataRetrievalError::MissingCredential) => {
                error!("TRAKT_API_KEY is not defined, cannot look up \"{slug}\"");
                Ok(None)
            }
            Err(MetadataRetrievalError::HttpStatus { status, .. })
                if status == StatusCode::NOT_FOUND.as_u16() =>
            {
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    fn seasons(&self, slug: &str) -> Result<Vec<Season>, MetadataRetrievalError> {
        info!("Downloading seasons and episodes for {slug}");
        let seasons: Vec<TraktSeason> = match self.get(
            &format!("/shows/{slug}/seasons"),
            &[("extended", "episodes,images")],
        ) {
            Ok(seasons) => seasons,
            Err(MetadataRetrievalError::MissingCredential) => {
                error!("TRAKT_API_KEY is not defined, cannot fetch seasons for \"{slug}\"");
                return Ok(Vec::new());
            }
            Err(err) => return Err(err),
        };

        Ok(seasons.into_iter().map(Self::convert_season).collect())
    }

    fn studios(&self, slug: &str) -> Vec<String> {
        match self.get::<Vec<TraktStudio>>(&format!("/shows/{slug}/studios"), &[]) {
            Ok(studios) => studios
                .into_iter()
                .filter_map(|studio| studio.name)
                .filter(|name| !name.is_empty())
                .collect(),
            Err(err) => {
                Self::log_miss(&format!("studios for \"{slug}\""), &err);
                Vec::new()
            }
        }
    }

    fn show_translation(&self, slug: &str, language: &str, country: &str) -> Option<Translation> {
        if language.is_empty() {
            info!("No LANGUAGE defined, using the original title");
            return None;
        }
        self.translation(
            &format!("/shows/{slug}/translations/{language}"),
            &format!("show \"{slug}\""),
            language,
            country,
        )
    }

    fn season_translation(
        &self,
        slug: &str,
        season: u32,
        language: &str,
        country: &str,
    ) -> Option<String> {
        self.translation(
            &format!("/shows/{slug}/seasons/{season}/translations/{language}"),
            &format!("Season {season}"),
            language,
            country,
        )
        .and_then(|translation| translation.title)
    }

    fn extended_episode(&self, slug: &str, season: u32, episode: u32) -> Option<ExtendedEpisode> {
        info!("Fetching extended metadata for S{season}E{episode}");
        match self.get::<TraktEpisode>(
            &format!("/shows/{slug}/seasons/{season}/episodes/{episode}"),
            &[("extended", "full,images")],
        ) {
            Ok(details) => Some(Self::convert_extended_episode(details)),
            Err(err) => {
                Self::log_miss(&format!("extended data for S{season}E{episode}"), &err);
                None
            }
        }
    }

    fn episode_translation(
        &self,
        slug: &str,
        season: u32,
        episode: u32,
        language: &str,
        country: &str,
    ) -> Option<Translation> {
        self.translation(
            &format!("/shows/{slug}/seasons/{season}/episodes/{episode}/translations/{language}"),
            &format!("episode S{season}E{episode}"),
            language,
            country,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone, Utc};

    const SEARCH_JSON: &str = r#"[
        {
            "type": "show",
            "score": 1000.0,
            "show": {
                "title": "Breaking Bad",
                "year": 2008,
                "ids": {"trakt": 1388, "slug": "breaking-bad", "tvdb": 81189, "imdb": "tt0903747", "tmdb": 1396},
                "overview": "A chemistry teacher...",
                "first_aired": "2008-01-21T02:00:00.000Z",
                "runtime": 45,
                "certification": "TV-MA",
                "network": "AMC",
                "country": "us",
                "trailer": null,
                "status": "ended",
                "rating": 9.26,
                "votes": 95000,
                "language": "en",
                "genres": ["drama", "crime"],
                "aired_episodes": 62,
                "images": {
                    "poster": ["walter-r2.trakt.tv/images/shows/000/001/388/posters/medium/a.jpg.webp"],
                    "logo": ["walter-r2.trakt.tv/images/shows/000/001/388/logos/medium/b.png.webp"],
                    "fanart": []
                }
            }
        },
        {"type": "show", "score": 10.0, "show": {"title": "No slug", "ids": {"trakt": 5}}}
    ]"#;

    #[test]
    fn test_convert_search_results() {
        let results: Vec<TraktSearchResult> = serde_json::from_str(SEARCH_JSON).unwrap();
        let shows: Vec<Show> = results
            .into_iter()
            .filter_map(|r| r.show)
            .map(TraktProvider::convert_show)
            .collect();

        let show = &shows[0];
        assert_eq!(show.title, "Breaking Bad");
        assert_eq!(show.ids.slug, "breaking-bad");
        assert_eq!(show.ids.trakt, 1388);
        assert_eq!(show.ids.imdb.as_deref(), Some("tt0903747"));
        assert_eq!(show.genres, vec!["drama", "crime"]);
        assert_eq!(show.first_aired.unwrap().year(), 2008);
        assert_eq!(show.trailer, None);
        assert_eq!(
            show.images.poster.as_deref(),
            Some("walter-r2.trakt.tv/images/shows/000/001/388/posters/medium/a.jpg.webp")
        );
        assert!(show.images.clearlogo.is_some());
        assert_eq!(show.images.fanart, None);

        assert_eq!(shows[1].ids.slug, "");
    }

    #[test]
    fn test_convert_seasons_sorts_episodes() {
        let json = r#"[
            {
                "number": 1,
                "ids": {"trakt": 3950},
                "images": {"poster": ["walter-r2.trakt.tv/season1.jpg.webp"]},
                "episodes": [
                    {"season": 1, "number": 2, "title": "Cat's in the Bag...", "ids": {"trakt": 74, "tvdb": 639}},
                    {"season": 1, "number": 1, "title": "Pilot", "ids": {"trakt": 73}}
                ]
            },
            {"number": 0, "ids": {"trakt": 3949}}
        ]"#;
        let seasons: Vec<TraktSeason> = serde_json::from_str(json).unwrap();
        let seasons: Vec<Season> = seasons.into_iter().map(TraktProvider::convert_season).collect();

        assert_eq!(seasons[0].number, 1);
        assert_eq!(
            seasons[0].poster.as_deref(),
            Some("walter-r2.trakt.tv/season1.jpg.webp")
        );
        assert_eq!(seasons[0].episodes[0].title, "Pilot");
        assert_eq!(seasons[0].episodes[1].ids.tvdb, Some(639));
        assert!(seasons[1].episodes.is_empty());
        assert_eq!(seasons[1].poster, None);
    }

    #[test]
    fn test_convert_extended_episode() {
        let json = r#"{
            "season": 1,
            "number": 1,
            "title": "Pilot",
            "ids": {"trakt": 73, "tvdb": 349232, "imdb": "", "tmdb": 62085},
            "overview": "Walter White...",
            "first_aired": "2008-01-21T02:00:00.000Z",
            "runtime": 58,
            "images": {"screenshot": ["walter-r2.trakt.tv/screens/pilot.jpg.webp"]}
        }"#;
        let episode: TraktEpisode = serde_json::from_str(json).unwrap();
        let episode = TraktProvider::convert_extended_episode(episode);

        assert_eq!(episode.ids.trakt, 73);
        assert_eq!(episode.ids.imdb, None);
        assert_eq!(episode.runtime, Some(58));
        assert_eq!(
            episode.first_aired,
            Some(Utc.with_ymd_and_hms(2008, 1, 21, 2, 0, 0).unwrap())
        );
        assert_eq!(
            episode.screenshot.as_deref(),
            Some("walter-r2.trakt.tv/screens/pilot.jpg.webp")
        );
    }

    #[test]
    fn test_convert_translations_drops_empty_text() {
        let json = r#"[
            {"title": "", "overview": "Sinopse", "tagline": null, "language": "pt", "country": "br"}
        ]"#;
        let list: Vec<TraktTranslation> = serde_json::from_str(json).unwrap();
        let translation = TraktProvider::convert_translation(list.into_iter().next().unwrap());
        assert_eq!(translation.title, None);
        assert_eq!(translation.overview.as_deref(), Some("Sinopse"));
        assert_eq!(translation.country.as_deref(), Some("br"));
    }

    #[test]
    fn test_missing_credential_yields_soft_results() {
        let provider = TraktProvider::new(None, RequestThrottle::disabled());

        assert!(provider.search_shows("breaking bad").unwrap().is_empty());
        assert_eq!(provider.lookup_show("breaking-bad").unwrap(), None);
        assert!(provider.seasons("breaking-bad").unwrap().is_empty());
        assert!(provider.studios("breaking-bad").is_empty());
        assert_eq!(provider.extended_episode("breaking-bad", 1, 1), None);
        assert_eq!(
            provider.episode_translation("breaking-bad", 1, 1, "pt", "br"),
            None
        );
        assert_eq!(provider.show_translation("breaking-bad", "pt", "br"), None);
        assert_eq!(
            provider.season_translation("breaking-bad", 1, "pt", "br"),
            None
        );
    }
}
