use super::Element;

/// Season level children of the tvshow document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeasonBlocks {
    /// `<thumb aspect="poster" type="season">` entries
    pub thumbs: Vec<Element>,
    /// `<namedseason>` entries
    pub named_seasons: Vec<Element>,
}

/// Local filename of a season poster
pub fn season_poster_filename(season: u32) -> String {
    if season == 0 {
        "season-specials-poster.jpg".to_string()
    } else {
        format!("season{season:02}-poster.jpg")
    }
}

pub fn named_season(season: u32, title: &str) -> Element {
    Element::text("namedseason", title).with_attribute("number", season.to_string())
}

pub fn season_thumb(season: u32, filename: &str) -> Element {
    Element::text("thumb", filename)
        .with_attribute("aspect", "poster")
        .with_attribute("season", season.to_string())
        .with_attribute("type", "season")
}
