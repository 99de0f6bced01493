//! Interactive questions asked before a scrape

use dialoguer::{Confirm, Input};
use std::path::{Path, PathBuf};
use trakt2kodi::Show;

/// Longest overview shown while confirming a search result
const OVERVIEW_PREVIEW_CHARS: usize = 200;

pub fn print_intro() {
    println!(
        r#"
trakt2kodi - TV show metadata for Kodi

This tool will:
  - fetch metadata about a TV show from Trakt
  - write Kodi .nfo files (tvshow.nfo and one per episode)
  - download show, season and episode images (if enabled)
  - translate titles and plots (if configured)

Folder layout:
  - the folder name should match the show title
  - episode files live in "Season 01", "Season 02", ... ("Season 00" for specials)
  - every episode file name carries an SxxEyy marker

Configuration is read from the environment or a .env file (TRAKT_API_KEY,
LANGUAGE, COUNTRY, DOWNLOAD_SHOW_IMAGES, ...).

WARNING: existing .nfo files and images in the folder will be overwritten.
"#
    );
}

/// Asks for the show folder
pub fn ask_folder() -> dialoguer::Result<PathBuf> {
    let answer: String = Input::new()
        .with_prompt("Enter the full path to the show folder")
        .interact_text()?;
    Ok(PathBuf::from(answer.trim()))
}

/// Asks for the search query, defaulting to the folder name
pub fn ask_show_query(folder: &Path) -> dialoguer::Result<String> {
    let default = folder
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let answer: String = Input::new()
        .with_prompt("Enter the TV show name to search on Trakt")
        .default(default)
        .interact_text()?;
    Ok(answer.trim().to_string())
}

/// Presents the search results one by one until the operator accepts one
pub fn choose_show(results: Vec<Show>) -> dialoguer::Result<Option<Show>> {
    for show in results {
        println!("\nPotential match found:");
        println!("  Title:    {}", display_title(&show));
        println!("  Slug:     {}", show.ids.slug);
        println!("  Overview: {}", overview_preview(show.overview.as_deref()));

        let accepted = Confirm::new()
            .with_prompt("Is this the correct show?")
            .default(true)
            .interact()?;
        if accepted {
            return Ok(Some(show));
        }
    }

    Ok(None)
}

/// Asks for a Trakt slug, `None` when left blank
pub fn ask_manual_slug() -> dialoguer::Result<Option<String>> {
    let answer: String = Input::new()
        .with_prompt("Enter the Trakt slug of the show (leave blank to quit)")
        .allow_empty(true)
        .interact_text()?;
    let slug = answer.trim();
    Ok((!slug.is_empty()).then(|| slug.to_string()))
}

/// Asks whether an existing file may be overwritten
pub fn confirm_overwrite(path: &Path) -> dialoguer::Result<bool> {
    Confirm::new()
        .with_prompt(format!(
            "The file {} already exists. Overwrite it?",
            path.display()
        ))
        .default(true)
        .interact()
}

/// `Title (Year)`, or just the title when the year is unknown
pub fn display_title(show: &Show) -> String {
    match show.year {
        Some(year) => format!("{} ({})", show.title, year),
        None => show.title.clone(),
    }
}

fn overview_preview(overview: Option<&str>) -> String {
    match overview.filter(|text| !text.is_empty()) {
        Some(text) if text.chars().count() > OVERVIEW_PREVIEW_CHARS => {
            let cut: String = text.chars().take(OVERVIEW_PREVIEW_CHARS).collect();
            format!("{}...", cut.trim_end())
        }
        Some(text) => text.to_string(),
        None => "No description available.".to_string(),
    }
}
