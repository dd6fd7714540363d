//! Uploaded files
//!
//! An [`UploadedFile`] describes a file received with a request. It can be
//! read as a stream or moved to its final location once; both operations go
//! through an [`UploadMover`], which decides what counts as a genuine upload
//! and performs the move.

use super::{Body, Error, HandleStream, Result};
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::fmt;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Upload completed without error
pub const UPLOAD_ERR_OK: i64 = 0;

/// Platform capability for validating and moving uploaded files
pub trait UploadMover: Send + Sync + fmt::Debug {
    /// Whether `path` is a file received as an upload
    fn is_uploaded_file(&self, path: &Path) -> bool;

    /// Move an uploaded file to `target`
    fn move_uploaded_file(&self, path: &Path, target: &Path) -> io::Result<()>;
}

/// Filesystem-backed [`UploadMover`]
///
/// Accepts regular files under a root directory, the system temporary
/// directory unless configured with [`FsMover::within`].
#[derive(Debug, Clone)]
pub struct FsMover {
    root: Option<PathBuf>,
}

impl FsMover {
    /// Only accept uploads stored under the system temporary directory
    pub fn new() -> Self {
        FsMover::within(std::env::temp_dir())
    }

    /// Accept any regular file
    pub fn unrestricted() -> Self {
        FsMover { root: None }
    }

    /// Only accept uploads stored under `root`
    pub fn within(root: impl Into<PathBuf>) -> Self {
        FsMover {
            root: Some(root.into()),
        }
    }
}

impl Default for FsMover {
    fn default() -> Self {
        FsMover::new()
    }
}

impl UploadMover for FsMover {
    fn is_uploaded_file(&self, path: &Path) -> bool {
        if !path.is_file() {
            return false;
        }

        match &self.root {
            None => true,
            Some(root) => match (path.canonicalize(), root.canonicalize()) {
                (Ok(path), Ok(root)) => path.starts_with(root),
                _ => false,
            },
        }
    }

    fn move_uploaded_file(&self, path: &Path, target: &Path) -> io::Result<()> {
        if fs::rename(path, target).is_ok() {
            return Ok(());
        }

        // Rename fails across filesystems
        fs::copy(path, target)?;
        fs::remove_file(path)
    }
}

/// A file uploaded with a request
///
/// Clones share the moved flag and the opened stream, so a file moved
/// through one clone is moved for all of them.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    file: PathBuf,
    client_filename: Option<String>,
    client_media_type: Option<String>,
    size: Option<u64>,
    error: i64,
    moved: Arc<AtomicBool>,
    stream: Arc<Mutex<Option<Body>>>,
    mover: Arc<dyn UploadMover>,
}

impl UploadedFile {
    /// Describe an uploaded file stored at `file`, moved with [`FsMover`]
    pub fn new(
        file: impl Into<PathBuf>,
        client_filename: Option<String>,
        client_media_type: Option<String>,
        size: Option<u64>,
        error: i64,
    ) -> Self {
        UploadedFile {
            file: file.into(),
            client_filename,
            client_media_type,
            size,
            error,
            moved: Arc::new(AtomicBool::new(false)),
            stream: Arc::new(Mutex::new(None)),
            mover: Arc::new(FsMover::new()),
        }
    }

    /// Use a different mover
    pub fn with_mover(mut self, mover: Arc<dyn UploadMover>) -> Self {
        self.mover = mover;
        self
    }

    /// Path of the stored upload
    pub fn file(&self) -> &Path {
        &self.file
    }

    pub fn client_filename(&self) -> Option<&str> {
        self.client_filename.as_deref()
    }

    pub fn client_media_type(&self) -> Option<&str> {
        self.client_media_type.as_deref()
    }

    pub fn size(&self) -> Option<u64> {
        self.size
    }

    /// Upload error code, [`UPLOAD_ERR_OK`] on success
    pub fn error(&self) -> i64 {
        self.error
    }

    pub fn is_moved(&self) -> bool {
        self.moved.load(Ordering::SeqCst)
    }

    fn display_name(&self) -> String {
        match &self.client_filename {
            Some(name) => name.clone(),
            None => self.file.display().to_string(),
        }
    }

    /// Open the upload as a read-only stream
    ///
    /// The stream is opened on first call and shared afterwards.
    pub fn get_stream(&self) -> Result<Body> {
        if self.is_moved() {
            return Err(Error::AlreadyMoved(self.display_name()));
        }

        let mut stream = self.stream.lock();
        if let Some(body) = stream.as_ref() {
            return Ok(body.clone());
        }

        let body = Body::from_stream(HandleStream::<File>::open(&self.file)?);
        *stream = Some(body.clone());
        Ok(body)
    }

    /// Move the upload to `target`
    ///
    /// Succeeds at most once. The target's directory must be writable and
    /// the source must be accepted by the mover.
    pub fn move_to(&self, target: impl AsRef<Path>) -> Result<()> {
        let target = target.as_ref();

        if self.is_moved() {
            return Err(Error::AlreadyMoved(self.display_name()));
        }

        if !is_writable_dir(target.parent()) {
            return Err(Error::InvalidUploadTarget(target.to_path_buf()));
        }

        if !self.mover.is_uploaded_file(&self.file) {
            return Err(Error::NotUploaded(self.file.clone()));
        }

        // Claim the move so concurrent callers cannot both succeed
        if self.moved.swap(true, Ordering::SeqCst) {
            return Err(Error::AlreadyMoved(self.display_name()));
        }

        if let Err(e) = self.mover.move_uploaded_file(&self.file, target) {
            self.moved.store(false, Ordering::SeqCst);
            warn!(
                from = %self.file.display(),
                to = %target.display(),
                error = %e,
                "Failed to move uploaded file"
            );
            return Err(Error::MoveFailed {
                from: self.file.clone(),
                to: target.to_path_buf(),
            });
        }

        debug!(from = %self.file.display(), to = %target.display(), "Moved uploaded file");
        Ok(())
    }
}

fn is_writable_dir(dir: Option<&Path>) -> bool {
    let dir = match dir {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };

    fs::metadata(dir)
        .map(|meta| meta.is_dir() && !meta.permissions().readonly())
        .unwrap_or(false)
}

/// Tree of uploaded files as submitted by a form
///
/// Field names map to a single file, a list of files, or a nested map for
/// bracketed names such as `docs[cv]`.
#[derive(Debug, Clone)]
pub enum FileTree {
    File(UploadedFile),
    List(Vec<FileTree>),
    Map(IndexMap<String, FileTree>),
}

impl FileTree {
    pub fn as_file(&self) -> Option<&UploadedFile> {
        match self {
            FileTree::File(file) => Some(file),
            _ => None,
        }
    }

    /// All files in the tree, depth first
    pub fn files(&self) -> Vec<&UploadedFile> {
        match self {
            FileTree::File(file) => vec![file],
            FileTree::List(items) => items.iter().flat_map(FileTree::files).collect(),
            FileTree::Map(items) => items.values().flat_map(FileTree::files).collect(),
        }
    }
}

impl From<UploadedFile> for FileTree {
    fn from(file: UploadedFile) -> Self {
        FileTree::File(file)
    }
}
