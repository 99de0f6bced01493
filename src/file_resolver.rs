//! File resolver module for locating episode files
//!
//! This module scans a show folder for `Season NN` subdirectories and the
//! episode video files inside them, reading season and episode numbers from
//! `SxxEyy` markers in the filenames.

use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;

/// Extensions written by previous runs or belonging to artwork, never episodes
pub const IGNORED_EXTENSIONS: &[&str] = &["nfo", "jpg", "jpeg", "png", "gif", "bmp", "webp"];

/// Extension of the sidecar description file
pub const NFO_EXTENSION: &str = "nfo";

static SEASON_DIR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^season[\s._-]*(\d+)").expect("valid season pattern"));

static EPISODE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)s(\d{2})e(\d{2})").expect("valid episode pattern"));

/// Errors that can occur during file resolution
#[derive(Debug, Error)]
pub enum FileResolverError {
    /// Path is not a directory
    #[error("Path is not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Failed to read directory
    #[error("Failed to read directory {path}: {source}")]
    ReadDirectoryFailed { path: PathBuf, source: io::Error },

    /// Failed to read file metadata
    #[error("Failed to read metadata of {path}: {source}")]
    MetadataFailed { path: PathBuf, source: io::Error },
}

/// Skip rules applied while scanning
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanOptions {
    /// Files smaller than this many KiB are ignored, 0 disables the check
    pub min_file_size_kib: u64,
    /// Files that already have an `.nfo` next to them are ignored
    pub skip_existing_nfo: bool,
}

/// An episode video file found on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalEpisodeFile {
    /// Season number taken from the folder (0 for specials)
    pub season_number: u32,
    /// Episode number taken from the filename
    pub episode_number: u32,
    /// The season folder containing the file
    pub directory: PathBuf,
    /// The file name including its extension
    pub filename: String,
}

impl LocalEpisodeFile {
    /// Full path of the video file
    pub fn path(&self) -> PathBuf {
        self.directory.join(&self.filename)
    }

    /// The filename without its extension
    pub fn stem(&self) -> &str {
        Path::new(&self.filename)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&self.filename)
    }

    /// Filename of a sibling file sharing this file's stem
    pub fn sibling_filename(&self, extension: &str) -> String {
        format!("{}.{}", self.stem(), extension)
    }

    /// Path of a sibling file sharing this file's stem
    pub fn sibling_path(&self, extension: &str) -> PathBuf {
        self.directory.join(self.sibling_filename(extension))
    }
}

/// Matched episodes: two-digit season key -> episode number -> file
pub type SeasonMap = BTreeMap<String, BTreeMap<u32, LocalEpisodeFile>>;

/// Formats a season number as the two-digit key used throughout the crate
pub fn season_key(season: u32) -> String {
    format!("{season:02}")
}

/// Scans a show folder for episode files
///
/// Only immediate `Season N` subdirectories are considered, and only files
/// directly inside them. A file is kept when its extension is not ignored,
/// its name carries an `SxxEyy` marker whose season matches the folder, it is
/// at least `min_file_size_kib` large and, if requested, has no `.nfo` yet.
/// Seasons without any kept file are left out. When two files claim the same
/// episode, the one read last wins.
///
/// # Arguments
///
/// * `root` - The show folder
/// * `options` - Skip rules
///
/// # Returns
///
/// The matched files grouped by season key and episode number, or an error if
/// the folder is missing or cannot be read.
pub fn scan_seasons(root: &Path, options: &ScanOptions) -> Result<SeasonMap, FileResolverError> {
    if !root.is_dir() {
        return Err(FileResolverError::NotADirectory(root.to_path_buf()));
    }

    let mut seasons = SeasonMap::new();

    for (season_number, season_dir) in season_directories(root)? {
        let episodes = scan_season_directory(&season_dir, season_number, options)?;
        // "Season 1" and "Season 01" share a key
        if !episodes.is_empty() {
            seasons
                .entry(season_key(season_number))
                .or_default()
                .extend(episodes);
        }
    }

    Ok(seasons)
}

/// Lists the `Season N` subdirectories of the show folder
fn season_directories(root: &Path) -> Result<Vec<(u32, PathBuf)>, FileResolverError> {
    let mut dirs = Vec::new();

    for entry in read_dir(root)? {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }

        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };

        if let Some(season) = parse_season_dir(name) {
            dirs.push((season, path));
        }
    }

    dirs.sort();
    Ok(dirs)
}

/// Scans one season folder for matching episode files
fn scan_season_directory(
    dir: &Path,
    season_number: u32,
    options: &ScanOptions,
) -> Result<BTreeMap<u32, LocalEpisodeFile>, FileResolverError> {
    let mut episodes = BTreeMap::new();

    let mut files: Vec<PathBuf> = read_dir(dir)?
        .into_iter()
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    files.sort();

    for path in files {
        let Some(filename) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };

        if has_ignored_extension(&path) {
            continue;
        }

        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or(filename);
        let Some((file_season, episode_number)) = parse_episode_marker(stem) else {
            continue;
        };

        if file_season != season_number {
            continue;
        }

        if options.min_file_size_kib > 0 {
            let metadata = fs::metadata(&path).map_err(|e| FileResolverError::MetadataFailed {
                path: path.clone(),
                source: e,
            })?;
            if metadata.len() < options.min_file_size_kib.saturating_mul(1024) {
                continue;
            }
        }

        let file = LocalEpisodeFile {
            season_number,
            episode_number,
            directory: dir.to_path_buf(),
            filename: filename.to_string(),
        };

        if options.skip_existing_nfo && file.sibling_path(NFO_EXTENSION).exists() {
            continue;
        }

        episodes.insert(episode_number, file);
    }

    Ok(episodes)
}

fn read_dir(dir: &Path) -> Result<Vec<fs::DirEntry>, FileResolverError> {
    let read_failed = |e| FileResolverError::ReadDirectoryFailed {
        path: dir.to_path_buf(),
        source: e,
    };
    fs::read_dir(dir)
        .map_err(read_failed)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(read_failed)
}

fn has_ignored_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| IGNORED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

/// Extracts the season number from a folder name like `Season 01`
pub(crate) fn parse_season_dir(name: &str) -> Option<u32> {
    SEASON_DIR_PATTERN
        .captures(name)
        .and_then(|caps| caps[1].parse().ok())
}

/// Extracts `(season, episode)` from a filename stem containing `SxxEyy`
pub(crate) fn parse_episode_marker(stem: &str) -> Option<(u32, u32)> {
    let caps = EPISODE_PATTERN.captures(stem)?;
    let season = caps[1].parse().ok()?;
    let episode = caps[2].parse().ok()?;
    Some((season, episode))
}
