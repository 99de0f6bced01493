use super::Element;
use crate::episode_merge::NormalizedEpisode;

/// Builds the `<episodedetails>` root element for one merged episode
pub fn build_episode(episode: &NormalizedEpisode) -> Element {
    let aired = episode.aired();

    let mut root = Element::new("episodedetails");
    root.push(Element::text("title", episode.title.as_str()));
    root.push(Element::text("originaltitle", episode.original_title.as_str()));
    root.push(Element::text("showtitle", episode.show_title.as_str()));
    root.push(Element::text("season", episode.season.to_string()));
    root.push(Element::text("episode", episode.episode.to_string()));
    root.push(
        Element::text("uniqueid", episode.trakt_id.to_string())
            .with_attribute("type", "trakt")
            .with_attribute("default", "true"),
    );
    root.push(Element::text("plot", episode.plot.as_str()));
    root.push(Element::optional("runtime", episode.runtime));
    root.push(Element::text("genre", episode.genre.as_str()));
    root.push(Element::optional("premiered", aired));
    root.push(Element::optional("year", episode.year()));
    root.push(Element::optional("aired", aired));
    root.push(Element::new("studio"));
    root.push(Element::optional("thumb", episode.thumb.as_deref()));
    root.push(Element::text(
        "dateadded",
        episode.date_added.format("%Y-%m-%d").to_string(),
    ));
    root
}
