//! Download target that removes itself unless committed

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// A file being written in place
///
/// Dropping the guard before [`PartialFile::commit`] deletes the file, so an
/// interrupted download never leaves a truncated image behind.
#[derive(Debug)]
pub(crate) struct PartialFile {
    path: PathBuf,
    file: File,
    committed: bool,
}

impl PartialFile {
    /// Creates (or truncates) the file at `path`
    pub(crate) fn create(path: &Path) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
            committed: false,
        })
    }

    /// Flushes the file and keeps it on disk
    pub(crate) fn commit(mut self) -> io::Result<()> {
        self.file.flush()?;
        self.file.sync_all()?;
        self.committed = true;
        Ok(())
    }
}

impl Write for PartialFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if !self.committed {
            // Silently ignore errors during cleanup
            let _ = fs::remove_file(&self.path);
        }
    }
}
