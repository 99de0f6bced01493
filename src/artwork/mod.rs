//! Show, season and episode artwork downloads
//!
//! Trakt hands out image URLs without a scheme, many of them ending in
//! `.webp`. Kodi does not read WebP, so show and season images are requested
//! without that suffix, which makes the image host serve the original JPEG or
//! PNG instead. Images are always overwritten.

mod partial_file;

use crate::metadata_retrieval::ImageSet;
use crate::throttle::RequestThrottle;
use partial_file::PartialFile;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Show image aspects and the local filename each one is saved as
pub const SHOW_IMAGES: &[(&str, &str)] = &[
    ("poster", "poster.jpg"),
    ("fanart", "fanart.jpg"),
    ("clearlogo", "clearlogo.png"),
    ("clearart", "clearart.png"),
    ("banner", "banner.jpg"),
    ("thumb", "thumb.jpg"),
    ("landscape", "landscape.jpg"),
    ("keyart", "keyart.jpg"),
];

/// Number of leading bytes inspected to recognize an image
const SNIFF_LEN: usize = 64;

/// Errors that can occur while downloading an image
#[derive(Debug, Error)]
pub enum ArtworkError {
    /// The request could not be sent
    #[error("Failed to download {url}: {source}")]
    Request { url: String, source: reqwest::Error },

    /// The image host answered with something other than 200
    #[error("HTTP {status} while downloading {url}")]
    Status { status: u16, url: String },

    /// Reading the start of the body failed
    #[error("Failed to read response from {url}: {source}")]
    ReadFailed { url: String, source: io::Error },

    /// The body does not start like any known image format
    #[error("Response from {url} is not an image")]
    NotAnImage { url: String },

    /// Writing the image to disk failed
    #[error("Failed to write image {path}: {source}")]
    WriteFailed { path: PathBuf, source: io::Error },
}

/// Per-download options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// Drop a trailing `.webp` from the URL before requesting it
    pub strip_unsupported_extension: bool,
}

impl FetchOptions {
    /// Options used for show and season images
    pub fn stripped() -> Self {
        Self {
            strip_unsupported_extension: true,
        }
    }
}

/// Something that can save a remote image to a local path
pub trait ArtworkFetcher {
    /// Downloads `url` to `destination`, returning the number of bytes written
    fn fetch(&self, url: &str, destination: &Path, options: FetchOptions)
    -> Result<u64, ArtworkError>;
}

/// Turns a Trakt image reference into the URL that is actually requested
pub fn normalize_url(url: &str, options: FetchOptions) -> String {
    let url = if options.strip_unsupported_extension {
        url.strip_suffix(".webp").unwrap_or(url)
    } else {
        url
    };

    if url.starts_with("https") {
        url.to_string()
    } else {
        format!("https://{url}")
    }
}

/// Downloads images over HTTPS
pub struct HttpArtworkFetcher {
    client: reqwest::blocking::Client,
    throttle: RequestThrottle,
}

impl HttpArtworkFetcher {
    pub fn new(throttle: RequestThrottle) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            throttle,
        }
    }
}

impl ArtworkFetcher for HttpArtworkFetcher {
    fn fetch(
        &self,
        url: &str,
        destination: &Path,
        options: FetchOptions,
    ) -> Result<u64, ArtworkError> {
        self.throttle.wait();

        let url = normalize_url(url, options);
        debug!(%url, destination = %destination.display(), "downloading image");

        let mut response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| ArtworkError::Request {
                url: url.clone(),
                source: e,
            })?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(ArtworkError::Status {
                status: status.as_u16(),
                url,
            });
        }

        let mut head = [0u8; SNIFF_LEN];
        let head_len = read_head(&mut response, &mut head).map_err(|e| ArtworkError::ReadFailed {
            url: url.clone(),
            source: e,
        })?;
        if !infer::is_image(&head[..head_len]) {
            return Err(ArtworkError::NotAnImage { url });
        }

        save_stream(&head[..head_len], &mut response, destination)
    }
}

/// Fills `buf` from `reader` until it is full or the stream ends
fn read_head(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Writes an already-read head followed by the rest of `body` to `destination`
fn save_stream(head: &[u8], body: &mut impl Read, destination: &Path) -> Result<u64, ArtworkError> {
    let write_failed = |e: io::Error| ArtworkError::WriteFailed {
        path: destination.to_path_buf(),
        source: e,
    };

    let mut file = PartialFile::create(destination).map_err(write_failed)?;
    file.write_all(head).map_err(write_failed)?;
    let copied = io::copy(body, &mut file).map_err(write_failed)?;
    file.commit().map_err(write_failed)?;

    Ok(head.len() as u64 + copied)
}

/// Outcome of one show image download
#[derive(Debug)]
pub struct ShowImageDownload {
    pub aspect: &'static str,
    pub path: PathBuf,
    pub result: Result<u64, ArtworkError>,
}

/// Downloads every show image that has a URL into `folder`
///
/// Aspects without a URL are skipped silently. The previous file is removed
/// before each download, so a failed download leaves no stale image behind.
/// A failed download does not stop the remaining ones.
pub fn download_show_images(
    images: &ImageSet,
    folder: &Path,
    fetcher: &impl ArtworkFetcher,
) -> Vec<ShowImageDownload> {
    SHOW_IMAGES
        .iter()
        .filter_map(|&(aspect, filename)| {
            let url = images.get(aspect)?;
            let path = folder.join(filename);
            let result = remove_stale(&path)
                .and_then(|()| fetcher.fetch(url, &path, FetchOptions::stripped()));
            Some(ShowImageDownload {
                aspect,
                path,
                result,
            })
        })
        .collect()
}

fn remove_stale(path: &Path) -> Result<(), ArtworkError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ArtworkError::WriteFailed {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Fetcher that writes a placeholder file, failing for URLs containing "broken"
    #[derive(Default)]
    pub(crate) struct FakeFetcher {
        pub requests: RefCell<Vec<(String, PathBuf, FetchOptions)>>,
    }

    impl ArtworkFetcher for FakeFetcher {
        fn fetch(
            &self,
            url: &str,
            destination: &Path,
            options: FetchOptions,
        ) -> Result<u64, ArtworkError> {
            self.requests
                .borrow_mut()
                .push((url.to_string(), destination.to_path_buf(), options));
            if url.contains("broken") {
                return Err(ArtworkError::Status {
                    status: 404,
                    url: normalize_url(url, options),
                });
            }
            fs::write(destination, b"image").map_err(|e| ArtworkError::WriteFailed {
                path: destination.to_path_buf(),
                source: e,
            })?;
            Ok(5)
        }
    }

    #[test]
    fn test_normalize_url() {
        assert_eq!(
            normalize_url("walter-r2.trakt.tv/images/poster.jpg.webp", FetchOptions::stripped()),
            "https://walter-r2.trakt.tv/images/poster.jpg"
        );
        assert_eq!(
            normalize_url("walter-r2.trakt.tv/screens/1.jpg.webp", FetchOptions::default()),
            "https://walter-r2.trakt.tv/screens/1.jpg.webp"
        );
        assert_eq!(
            normalize_url("https://example.com/a.png", FetchOptions::stripped()),
            "https://example.com/a.png"
        );
    }

    #[test]
    fn test_save_stream_writes_head_and_body() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("poster.jpg");

        let mut body: &[u8] = b" body";
        let written = save_stream(b"head", &mut body, &path).unwrap();

        assert_eq!(written, 9);
        assert_eq!(fs::read(&path).unwrap(), b"head body");
    }

    #[test]
    fn test_save_stream_removes_file_on_read_error() {
        struct FailingReader;
        impl Read for FailingReader {
            fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("poster.jpg");

        let result = save_stream(b"head", &mut FailingReader, &path);
        assert!(matches!(result, Err(ArtworkError::WriteFailed { .. })));
        assert!(!path.exists());
    }

    #[test]
    fn test_read_head_stops_at_end_of_stream() {
        let mut reader: &[u8] = &[0x89, b'P', b'N', b'G'];
        let mut head = [0u8; SNIFF_LEN];
        assert_eq!(read_head(&mut reader, &mut head).unwrap(), 4);
    }

    #[test]
    fn test_png_signature_sniffs_as_image() {
        let png = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];
        assert!(infer::is_image(&png));
        assert!(!infer::is_image(b"<html><body>Not found</body></html>"));
    }

    #[test]
    fn test_remove_stale_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fanart.jpg");
        assert!(remove_stale(&path).is_ok());

        fs::write(&path, b"old").unwrap();
        assert!(remove_stale(&path).is_ok());
        assert!(!path.exists());
    }

    #[test]
    fn test_download_show_images_uses_fixed_names() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("banner.jpg"), b"old banner").unwrap();
        let images = ImageSet {
            poster: Some("img/poster.jpg.webp".to_string()),
            clearlogo: Some("img/logo.png.webp".to_string()),
            banner: Some("img/broken.jpg.webp".to_string()),
            ..Default::default()
        };
        let fetcher = FakeFetcher::default();

        let downloads = download_show_images(&images, dir.path(), &fetcher);

        let aspects: Vec<&str> = downloads.iter().map(|d| d.aspect).collect();
        assert_eq!(aspects, vec!["poster", "clearlogo", "banner"]);
        assert!(downloads[0].result.is_ok());
        assert!(dir.path().join("poster.jpg").exists());
        assert!(dir.path().join("clearlogo.png").exists());
        assert!(matches!(
            downloads[2].result,
            Err(ArtworkError::Status { status: 404, .. })
        ));
        assert!(!dir.path().join("banner.jpg").exists());
        assert!(
            fetcher
                .requests
                .borrow()
                .iter()
                .all(|(_, _, options)| options.strip_unsupported_extension)
        );
    }
}
