//! Secret-safe staging files for the gpg exchange.
//!
//! Payloads handed to gpg (plaintext, ciphertext, signatures) and the result
//! files gpg writes back are staged through the filesystem. Staged content
//! may be plaintext secrets or key material, so staging files are created
//! exclusively with owner-only permissions and are deleted when their owning
//! scope ends, success or failure.

use crate::errors::GpgResult;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// A payload staged for gpg to read.
///
/// The file is created with a unique name under the system temp directory,
/// opened for exclusive creation with owner read/write permission only
/// (tempfile's default on Unix), and filled with the payload before the
/// constructor returns. It is removed when the value is dropped; a creation
/// or write failure removes the partial file before the error surfaces.
///
/// # Examples
///
/// ```
/// use gpgbridge::tmpfile::StagedFile;
///
/// let staged = StagedFile::create("gpgbridge_doc_", "hello").unwrap();
/// assert!(staged.path().exists());
/// ```
pub struct StagedFile {
    inner: NamedTempFile,
}

impl StagedFile {
    /// Stages `content` in a freshly created owner-only file.
    ///
    /// # Errors
    ///
    /// Returns [`crate::errors::GpgError::Internal`] if the file cannot be
    /// created or written; the partial file does not outlive the error.
    pub fn create(prefix: &str, content: &str) -> GpgResult<Self> {
        let mut inner = tempfile::Builder::new().prefix(prefix).tempfile()?;
        inner.write_all(content.as_bytes())?;
        inner.flush()?;
        debug!("staged {} bytes at {}", content.len(), inner.path().display());
        Ok(StagedFile { inner })
    }

    /// The staged file's path, for handing to gpg as an argument.
    pub fn path(&self) -> &Path {
        self.inner.path()
    }

    /// The staged path with `suffix` appended, where gpg will write the
    /// operation's result file (e.g. `.asc` for armored output).
    pub fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self.inner.path().as_os_str().to_os_string();
        name.push(suffix);
        PathBuf::from(name)
    }
}

/// A path gpg itself will create, remembered for cleanup.
///
/// Tracking first deletes any file already at the path: gpg writes its
/// result there and must not collide with a stale file from an earlier run.
/// The path is deleted again when the value is dropped. Cleanup is
/// best-effort on both ends; failures are logged, never raised, so they
/// cannot mask the operation's own result.
pub struct TrackedPath {
    path: PathBuf,
}

impl TrackedPath {
    /// Removes any stale file at `path` and tracks it for cleanup, without
    /// creating the file itself.
    pub fn track(path: PathBuf) -> Self {
        remove_if_present(&path, "stale result file");
        TrackedPath { path }
    }

    /// The tracked path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the result file gpg wrote at the tracked path.
    pub fn read_to_string(&self) -> io::Result<String> {
        fs::read_to_string(&self.path)
    }
}

impl Drop for TrackedPath {
    fn drop(&mut self) {
        remove_if_present(&self.path, "tracked result file");
    }
}

fn remove_if_present(path: &Path, what: &str) {
    if let Err(err) = fs::remove_file(path) {
        if err.kind() != io::ErrorKind::NotFound {
            warn!("failed to remove {} {}: {}", what, path.display(), err);
        }
    }
}
