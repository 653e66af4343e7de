//! Per-request workspace directories.
//!
//! A [`Workspace`] is created under the configured temp root with a unique
//! `upload-<millis>-<random>` name and removed when it is closed or dropped,
//! whichever comes first. Files are materialized into it in request order.

use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

use data_encoding::{BASE64, DecodeError, Encoding, Specification};
use jiff::Timestamp;
use regex::Regex;
use tempfile::TempDir;
use tracing::{debug, info, warn};

use crate::error::{Result, ServerError};

static BASE64_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9+/]*={0,2}$").expect("base64 pattern is valid"));

// Standard alphabet that also reads the URL-safe `-_` and ignores
// non-zero trailing bits.
static BASE64_LENIENT: LazyLock<Encoding> = LazyLock::new(|| {
    let mut spec = Specification::new();
    spec.symbols
        .push_str("ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/");
    spec.padding = Some('=');
    spec.check_trailing_bits = false;
    spec.translate.from.push_str("-_");
    spec.translate.to.push_str("+/");
    spec.encoding().expect("base64 specification is valid")
});

/// A file waiting to be written, with its path already made relative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFile {
    pub path: PathBuf,
    pub content: String,
    pub is_text: bool,
}

/// Turn a client-supplied path into one that stays inside the workspace.
///
/// Root and `.` components are dropped; `..` is refused, and so is any
/// `.git` component, since git reads configuration from it.
pub fn relative_path(raw: &str) -> Result<PathBuf> {
    let mut out = PathBuf::new();
    for component in Path::new(raw).components() {
        match component {
            Component::Normal(part) if is_git_dir(part) => {
                return Err(ServerError::validation(format!(
                    "Invalid file path: {raw}"
                )));
            }
            Component::Normal(part) => out.push(part),
            Component::RootDir | Component::CurDir | Component::Prefix(_) => {}
            Component::ParentDir => {
                return Err(ServerError::validation(format!(
                    "Invalid file path: {raw}"
                )));
            }
        }
    }
    if out.as_os_str().is_empty() {
        return Err(ServerError::validation(format!("Invalid file path: {raw:?}")));
    }
    Ok(out)
}

// Case-insensitive, and blind to the trailing dots and spaces that some
// filesystems drop from names.
fn is_git_dir(part: &std::ffi::OsStr) -> bool {
    part.to_str().is_some_and(|name| {
        name.trim_end_matches(['.', ' '])
            .eq_ignore_ascii_case(".git")
    })
}

/// Whether `content` reads as a complete, padded base64 blob.
///
/// Text that happens to satisfy this (for example `abcd`) is decoded even
/// when flagged as text.
pub fn looks_like_base64(content: &str) -> bool {
    content.len() % 4 == 0
        && BASE64_SHAPE.is_match(content)
        && BASE64.decode(content.as_bytes()).is_ok()
}

/// The bytes written for one file.
pub fn decode_contents(content: &str, is_text: bool) -> std::result::Result<Vec<u8>, DecodeError> {
    if is_text && !looks_like_base64(content) {
        return Ok(content.as_bytes().to_vec());
    }
    decode_base64_lenient(content)
}

/// Base64 decoding that ignores whitespace, tolerates missing padding and
/// accepts the URL-safe alphabet.
fn decode_base64_lenient(content: &str) -> std::result::Result<Vec<u8>, DecodeError> {
    let mut compact: String = content
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    if compact.len() % 4 != 0 && !compact.ends_with('=') {
        while compact.len() % 4 != 0 {
            compact.push('=');
        }
    }
    BASE64_LENIENT.decode(compact.as_bytes())
}

/// An exclusively owned, self-deleting upload directory.
pub struct Workspace {
    dir: Option<TempDir>,
    path: PathBuf,
}

impl Workspace {
    /// Create a fresh, uniquely named directory under `root`.
    pub fn create(root: &Path) -> io::Result<Self> {
        let prefix = format!("upload-{}-", Timestamp::now().as_millisecond());
        let dir = tempfile::Builder::new()
            .prefix(&prefix)
            .rand_bytes(9)
            .tempdir_in(root)?;
        let path = dir.path().to_path_buf();
        info!(path = %path.display(), "Created workspace");
        Ok(Self {
            dir: Some(dir),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write one file, creating parent directories as needed.
    pub async fn write_file(&self, file: &PendingFile) -> Result<PathBuf> {
        let target = self.path.join(&file.path);

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ServerError::file_write(&file.path, e))?;
        }

        let bytes = decode_contents(&file.content, file.is_text)
            .map_err(|e| ServerError::file_write(&file.path, format!("invalid base64: {e}")))?;

        tokio::fs::write(&target, &bytes)
            .await
            .map_err(|e| ServerError::file_write(&file.path, e))?;

        debug!(path = %file.path.display(), bytes = bytes.len(), "Written");
        Ok(target)
    }

    /// Remove the directory now, off the async worker. Failure is
    /// reported, not retried.
    pub async fn close(mut self) -> Result<()> {
        let Some(dir) = self.dir.take() else {
            return Ok(());
        };
        let path = dir.keep();
        tokio::fs::remove_dir_all(&path)
            .await
            .map_err(|e| ServerError::cleanup(format!("{}: {e}", path.display())))?;
        info!(path = %path.display(), "Cleaned up workspace");
        Ok(())
    }
}

// Only reached when `close` was never awaited, e.g. a cancelled request.
impl Drop for Workspace {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            let path = dir.path().to_path_buf();
            match dir.close() {
                Ok(()) => info!(path = %path.display(), "Cleaned up workspace"),
                Err(err) => warn!(
                    error = %ServerError::cleanup(format!("{}: {err}", path.display())),
                    "Workspace cleanup failed"
                ),
            }
        }
    }
}
