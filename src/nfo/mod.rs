//! Kodi .nfo document builders
//!
//! Builders turn show and episode records into an [`Element`] tree; the tree
//! is serialized once, behind a fixed header, by [`NfoDocument::to_xml`].

mod document;
mod episode;
mod seasons;
mod tvshow;

pub use document::{Element, NfoDocument};
pub use episode::build_episode;
pub use seasons::{SeasonBlocks, named_season, season_poster_filename, season_thumb};
pub use tvshow::{ShowNfoInput, build_tvshow, local_thumbs};

use chrono::{DateTime, Utc};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name of the show level document
pub const TVSHOW_NFO: &str = "tvshow.nfo";

/// Errors that can occur while rendering or writing .nfo files
#[derive(Debug, Error)]
pub enum NfoError {
    /// The XML writer failed
    #[error("Failed to serialize XML: {0}")]
    Serialize(#[from] io::Error),

    /// The serialized document is not valid UTF-8
    #[error("Serialized XML is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),

    /// Writing the file failed
    #[error("Failed to write {path}: {source}")]
    WriteFailed { path: PathBuf, source: io::Error },
}

/// Renders a root element and writes it to `path`
pub fn write_nfo(path: &Path, root: Element, generated_at: DateTime<Utc>) -> Result<(), NfoError> {
    let xml = NfoDocument::new(root, generated_at).to_xml()?;
    fs::write(path, xml).map_err(|e| NfoError::WriteFailed {
        path: path.to_path_buf(),
        source: e,
    })
}
