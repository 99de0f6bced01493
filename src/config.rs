//! Run configuration
//!
//! All tunables are read once at startup, from the process environment and an
//! optional `.env` file, into a [`Config`] that is handed to every component.

use crate::file_resolver::ScanOptions;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default delay awaited before every outbound request
pub const DEFAULT_REQUEST_DELAY: Duration = Duration::from_millis(1500);

/// Errors that can occur while loading the configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A numeric option could not be parsed
    #[error("Invalid value for {name}: '{value}' is not a non-negative integer")]
    InvalidNumber { name: &'static str, value: String },

    /// The `.env` file exists but could not be parsed
    #[error("Failed to load environment file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        source: dotenvy::Error,
    },

    /// No Trakt API key was configured
    #[error("TRAKT_API_KEY is not set. Add it to your environment or .env file")]
    MissingApiKey,
}

/// Explicit run configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Trakt API client id (`TRAKT_API_KEY`)
    pub api_key: Option<String>,
    /// Translation language, e.g. `pt` (`LANGUAGE`, default `en`)
    pub language: String,
    /// Translation country, e.g. `br` (`COUNTRY`, default `us`)
    pub country: String,
    /// Download poster, fanart, ... into the show folder (`DOWNLOAD_SHOW_IMAGES`)
    pub download_show_images: bool,
    /// Download season posters (`DOWNLOAD_SEASON_IMAGES`)
    pub download_season_images: bool,
    /// Use translated season titles for named seasons (`FETCH_SEASON_TRANSLATION`)
    pub fetch_season_translation: bool,
    /// Translate episode titles and plots (`FETCH_EPISODES_TRANSLATION`)
    pub fetch_episode_translation: bool,
    /// Delay before each request (`DELAY_BETWEEN_REQUESTS_MS`, default 1500)
    pub request_delay: Duration,
    /// Ignore episode files smaller than this many KiB, 0 disables (`IGNORE_FILES_SMALLER_THAN_KB`)
    pub min_file_size_kib: u64,
    /// Skip episodes that already have an .nfo file (`SKIP_EPISODES_WITH_NFO`)
    pub skip_episodes_with_nfo: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            language: "en".to_string(),
            country: "us".to_string(),
            download_show_images: false,
            download_season_images: false,
            fetch_season_translation: false,
            fetch_episode_translation: false,
            request_delay: DEFAULT_REQUEST_DELAY,
            min_file_size_kib: 0,
            skip_episodes_with_nfo: false,
        }
    }
}

impl Config {
    /// Builds the configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup
    ///
    /// Unset variables fall back to their defaults. Booleans are enabled by
    /// `true`, `1` or `yes` (case-insensitive); any other value disables them.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let flag = |name: &str| lookup(name).map(|v| parse_bool(&v)).unwrap_or(false);

        let request_delay = match parse_number(&lookup, "DELAY_BETWEEN_REQUESTS_MS")? {
            Some(ms) => Duration::from_millis(ms),
            None => defaults.request_delay,
        };

        Ok(Self {
            api_key: lookup("TRAKT_API_KEY")
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            language: lookup("LANGUAGE")
                .map(|v| v.trim().to_string())
                .unwrap_or(defaults.language),
            country: lookup("COUNTRY")
                .map(|v| v.trim().to_string())
                .unwrap_or(defaults.country),
            download_show_images: flag("DOWNLOAD_SHOW_IMAGES"),
            download_season_images: flag("DOWNLOAD_SEASON_IMAGES"),
            fetch_season_translation: flag("FETCH_SEASON_TRANSLATION"),
            fetch_episode_translation: flag("FETCH_EPISODES_TRANSLATION"),
            request_delay,
            min_file_size_kib: parse_number(&lookup, "IGNORE_FILES_SMALLER_THAN_KB")?
                .unwrap_or(0),
            skip_episodes_with_nfo: flag("SKIP_EPISODES_WITH_NFO"),
        })
    }

    /// Returns the API key or a configuration error when it is missing
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.api_key.as_deref().ok_or(ConfigError::MissingApiKey)
    }

    /// Scanner options derived from this configuration
    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            min_file_size_kib: self.min_file_size_kib,
            skip_existing_nfo: self.skip_episodes_with_nfo,
        }
    }
}

/// Loads a `.env` file into the process environment
///
/// With an explicit path, that file is used. Otherwise `./.env` is tried first,
/// then `.env` in the platform configuration directory. Variables already set
/// in the environment win over file values. Returns the file that was loaded.
pub fn load_env_file(explicit: Option<&Path>) -> Result<Option<PathBuf>, ConfigError> {
    let candidates: Vec<PathBuf> = match explicit {
        Some(path) => vec![path.to_path_buf()],
        None => {
            let mut candidates = vec![PathBuf::from(".env")];
            if let Some(dir) = config_dir() {
                candidates.push(dir.join(".env"));
            }
            candidates
        }
    };

    for path in candidates {
        match dotenvy::from_path(&path) {
            Ok(()) => return Ok(Some(path)),
            Err(dotenvy::Error::Io(_)) => continue,
            Err(source) => return Err(ConfigError::EnvFile { path, source }),
        }
    }

    Ok(None)
}

/// Platform configuration directory for trakt2kodi
///
/// - Linux: ~/.config/trakt2kodi/
/// - macOS: ~/Library/Application Support/trakt2kodi/
/// - Windows: %APPDATA%\trakt2kodi\config\
fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "trakt2kodi").map(|dirs| dirs.config_dir().to_path_buf())
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes"
    )
}

fn parse_number<F>(lookup: &F, name: &'static str) -> Result<Option<u64>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(None),
        Some(value) if value.trim().is_empty() => Ok(None),
        Some(value) => value
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidNumber { name, value }),
    }
}
