use super::{Element, SeasonBlocks};
use crate::artwork::SHOW_IMAGES;
use crate::metadata_retrieval::{Show, Translation};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

static SORT_ARTICLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(a|an|the) ").expect("valid article pattern"));

/// Everything that goes into `tvshow.nfo`
#[derive(Debug, Clone)]
pub struct ShowNfoInput<'a> {
    pub show: &'a Show,
    pub translation: Option<&'a Translation>,
    pub studios: &'a [String],
    /// `<thumb>` entries for show images present on disk
    pub local_thumbs: Vec<Element>,
    pub seasons: SeasonBlocks,
}

/// Title used for sorting, with a leading "A", "An" or "The" removed
pub fn sort_title(title: &str) -> String {
    SORT_ARTICLE.replace(title, "").into_owned()
}

/// `<thumb>` entries for every known show image that exists in `folder`
pub fn local_thumbs(folder: &Path) -> Vec<Element> {
    SHOW_IMAGES
        .iter()
        .filter(|(_, filename)| folder.join(filename).exists())
        .map(|(aspect, filename)| {
            Element::text("thumb", *filename)
                .with_attribute("aspect", *aspect)
                .with_attribute("preview", *filename)
        })
        .collect()
}

/// Builds the `<tvshow>` root element
///
/// Text fields prefer the translation over the show record. Studios fall back
/// to the network when Trakt lists none. Local thumbs, season thumbs and named
/// seasons are appended as the last children.
pub fn build_tvshow(input: ShowNfoInput<'_>) -> Element {
    let show = input.show;
    let translation = input.translation;

    let title = non_empty(translation.and_then(|t| t.title.as_ref()))
        .unwrap_or_else(|| show.title.clone());
    let plot = non_empty(translation.and_then(|t| t.overview.as_ref()))
        .or_else(|| show.overview.clone())
        .unwrap_or_default();
    let tagline = non_empty(translation.and_then(|t| t.tagline.as_ref()))
        .or_else(|| show.tagline.clone())
        .unwrap_or_default();
    let original_title = show
        .original_title
        .clone()
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| show.title.clone());
    let certification = show.certification.clone().unwrap_or_default();

    let mut root = Element::new("tvshow");
    root.push(Element::text("title", title.as_str()));
    root.push(Element::text("originaltitle", original_title));
    root.push(Element::text("showtitle", title.as_str()));
    root.push(Element::text("sorttitle", sort_title(&title)));
    root.push(Element::optional("year", show.year));
    root.push(Element::optional(
        "userrating",
        show.rating.map(|rating| format!("{rating:.1}")),
    ));
    root.push(Element::optional("votes", show.votes.filter(|v| *v > 0)));
    root.push(Element::text("plot", plot));
    root.push(Element::text("tagline", tagline));
    root.push(Element::optional("runtime", show.runtime.filter(|r| *r > 0)));
    root.push(Element::text("genre", show.genres.join(" / ")));
    root.push(Element::optional(
        "premiered",
        show.first_aired.map(|at| at.date_naive()),
    ));
    root.push(Element::optional("status", show.status.as_deref()));
    root.push(Element::text("mpaa", certification.as_str()));
    root.push(Element::text("certification", certification));
    root.push(Element::optional("trailer", show.trailer.as_deref()));
    root.push(Element::optional("country", show.country.as_deref()));
    root.push(Element::optional(
        "episode",
        show.aired_episodes.filter(|n| *n > 0),
    ));
    root.push(Element::optional("language", show.language.as_deref()));

    root.push(unique_id("trakt", show.ids.trakt.to_string(), true));
    if let Some(imdb) = &show.ids.imdb {
        root.push(unique_id("imdb", imdb.clone(), false));
    }
    if let Some(tmdb) = show.ids.tmdb {
        root.push(unique_id("tmdb", tmdb.to_string(), false));
    }
    if let Some(tvdb) = show.ids.tvdb {
        root.push(unique_id("tvdb", tvdb.to_string(), false));
    }

    if !input.studios.is_empty() {
        root.extend(input.studios.iter().map(|s| Element::text("studio", s.as_str())));
    } else if let Some(network) = show.network.as_deref().filter(|n| !n.is_empty()) {
        root.push(Element::text("studio", network));
    }

    root.extend(input.local_thumbs);
    root.extend(input.seasons.thumbs);
    root.extend(input.seasons.named_seasons);
    root
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value.filter(|v| !v.is_empty()).cloned()
}

fn unique_id(kind: &str, value: String, default: bool) -> Element {
    Element::text("uniqueid", value)
        .with_attribute("type", kind)
        .with_attribute("default", default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata_retrieval::ShowIds;
    use crate::nfo::{named_season, season_thumb};
    use chrono::{TimeZone, Utc};
    use std::fs;

    fn show() -> Show {
        Show {
            title: "The Office".to_string(),
            year: Some(2005),
            ids: ShowIds {
                trakt: 1391,
                slug: "the-office".to_string(),
                imdb: Some("tt0386676".to_string()),
                tmdb: None,
                tvdb: Some(73244),
            },
            overview: Some("A mockumentary".to_string()),
            rating: Some(8.64),
            votes: Some(1234),
            certification: Some("TV-14".to_string()),
            genres: vec!["comedy".to_string(), "sitcom".to_string()],
            first_aired: Some(Utc.with_ymd_and_hms(2005, 3, 24, 5, 0, 0).unwrap()),
            network: Some("NBC".to_string()),
            aired_episodes: Some(188),
            ..Default::default()
        }
    }

    fn texts<'a>(root: &'a Element, name: &str) -> Vec<&'a str> {
        root.children()
            .iter()
            .filter(|c| c.name() == name)
            .filter_map(Element::text_content)
            .collect()
    }

    #[test]
    fn test_sort_title() {
        assert_eq!(sort_title("The Office"), "Office");
        assert_eq!(sort_title("a Series of Unfortunate Events"), "Series of Unfortunate Events");
        assert_eq!(sort_title("An Idiot Abroad"), "Idiot Abroad");
        assert_eq!(sort_title("Theory"), "Theory");
    }

    #[test]
    fn test_build_tvshow_fields_and_order() {
        let show = show();
        let root = build_tvshow(ShowNfoInput {
            show: &show,
            translation: None,
            studios: &[],
            local_thumbs: Vec::new(),
            seasons: SeasonBlocks::default(),
        });

        let names: Vec<&str> = root.children().iter().map(Element::name).collect();
        assert_eq!(
            names,
            vec![
                "title", "originaltitle", "showtitle", "sorttitle", "year", "userrating", "votes",
                "plot", "tagline", "runtime", "genre", "premiered", "status", "mpaa",
                "certification", "trailer", "country", "episode", "language", "uniqueid",
                "uniqueid", "uniqueid", "studio",
            ]
        );
        assert_eq!(root.child_text("sorttitle"), Some("Office"));
        assert_eq!(root.child_text("userrating"), Some("8.6"));
        assert_eq!(root.child_text("genre"), Some("comedy / sitcom"));
        assert_eq!(root.child_text("premiered"), Some("2005-03-24"));
        assert_eq!(root.child_text("mpaa"), Some("TV-14"));
        assert_eq!(root.child_text("runtime"), Some(""));
        assert_eq!(texts(&root, "studio"), vec!["NBC"]);

        let ids: Vec<(&str, &str)> = root
            .children()
            .iter()
            .filter(|c| c.name() == "uniqueid")
            .map(|c| (c.attribute("type").unwrap(), c.attribute("default").unwrap()))
            .collect();
        assert_eq!(
            ids,
            vec![("trakt", "true"), ("imdb", "false"), ("tvdb", "false")]
        );
    }

    #[test]
    fn test_translation_overrides_text_fields() {
        let show = show();
        let translation = Translation {
            title: Some("O Escritório".to_string()),
            overview: Some("Um pseudodocumentário".to_string()),
            tagline: None,
            language: "pt".to_string(),
            country: Some("br".to_string()),
        };
        let studios = vec!["Deedle-Dee Productions".to_string(), "Reveille".to_string()];
        let root = build_tvshow(ShowNfoInput {
            show: &show,
            translation: Some(&translation),
            studios: &studios,
            local_thumbs: Vec::new(),
            seasons: SeasonBlocks::default(),
        });

        assert_eq!(root.child_text("title"), Some("O Escritório"));
        assert_eq!(root.child_text("showtitle"), Some("O Escritório"));
        assert_eq!(root.child_text("originaltitle"), Some("The Office"));
        assert_eq!(root.child_text("plot"), Some("Um pseudodocumentário"));
        assert_eq!(texts(&root, "studio"), vec!["Deedle-Dee Productions", "Reveille"]);
    }

    #[test]
    fn test_extra_blocks_are_children_after_studios() {
        let show = show();
        let root = build_tvshow(ShowNfoInput {
            show: &show,
            translation: None,
            studios: &[],
            local_thumbs: vec![Element::text("thumb", "poster.jpg").with_attribute("aspect", "poster")],
            seasons: SeasonBlocks {
                thumbs: vec![season_thumb(1, "season01-poster.jpg")],
                named_seasons: vec![named_season(1, "Season 1")],
            },
        });

        let tail: Vec<&str> = root.children().iter().rev().take(3).map(Element::name).collect();
        assert_eq!(tail, vec!["namedseason", "thumb", "thumb"]);
        assert_eq!(texts(&root, "thumb"), vec!["poster.jpg", "season01-poster.jpg"]);
    }

    #[test]
    fn test_local_thumbs_only_for_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("poster.jpg"), b"img").unwrap();
        fs::write(dir.path().join("clearlogo.png"), b"img").unwrap();

        let thumbs = local_thumbs(dir.path());
        let aspects: Vec<&str> = thumbs.iter().filter_map(|t| t.attribute("aspect")).collect();
        assert_eq!(aspects, vec!["poster", "clearlogo"]);
        assert_eq!(thumbs[1].attribute("preview"), Some("clearlogo.png"));
        assert_eq!(thumbs[1].text_content(), Some("clearlogo.png"));
    }
}
