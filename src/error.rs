//! Structured errors returned by the VFS Skeleton, Interner, and Block Cache Adapter.

use std::fmt;
use std::sync::Arc;

/// Category of failure, shared across every operation in the crate.
///
/// Mirrors the flat, one-doc-comment-per-variant shape of the teacher's NFSv3 status enum,
/// cut down to the handful of kinds this read-only skeleton can actually produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The path failed the "valid slash-path" gate (leading slash, empty component, `.`/`..`,
    /// embedded NUL, or exceeds length limits).
    Invalid,
    /// No entry exists at the given path and none ever will (containing directory is sealed,
    /// or the whole VFS is sealed).
    NotExist,
    /// An entry of a different kind already exists at the given path.
    Exist,
    /// Creation was attempted under a sealed ancestor.
    Permission,
    /// A CRC32 mismatch was detected by the checksum wrapper.
    Checksum,
    /// The underlying byte source returned an I/O error.
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Invalid => "invalid path",
            ErrorKind::NotExist => "no such file or directory",
            ErrorKind::Exist => "file exists",
            ErrorKind::Permission => "permission denied",
            ErrorKind::Checksum => "checksum mismatch",
            ErrorKind::Io => "I/O error",
        };
        f.write_str(s)
    }
}

/// Every failure returned to a consumer carries the operation and path it happened on, per §7.
#[derive(Debug, Clone)]
pub struct VfsError {
    pub operation: &'static str,
    pub path: String,
    pub kind: ErrorKind,
    /// The underlying I/O error, when `kind` is [`ErrorKind::Io`]. Kept behind an `Arc` so the
    /// error can be cheaply cloned and replayed by the Block Cache Adapter's sticky-error path.
    source: Option<Arc<std::io::Error>>,
}

impl VfsError {
    pub fn new(operation: &'static str, path: impl Into<String>, kind: ErrorKind) -> Self {
        Self { operation, path: path.into(), kind, source: None }
    }

    pub fn io(operation: &'static str, path: impl Into<String>, source: std::io::Error) -> Self {
        Self { operation, path: path.into(), kind: ErrorKind::Io, source: Some(Arc::new(source)) }
    }

    pub fn from_io_arc(
        operation: &'static str,
        path: impl Into<String>,
        source: Arc<std::io::Error>,
    ) -> Self {
        Self { operation, path: path.into(), kind: ErrorKind::Io, source: Some(source) }
    }
}

impl fmt::Display for VfsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.operation, self.path, self.kind)?;
        if let Some(source) = &self.source {
            write!(f, ": {source}")?;
        }
        Ok(())
    }
}

impl std::error::Error for VfsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

pub type VfsResult<T> = std::result::Result<T, VfsError>;
