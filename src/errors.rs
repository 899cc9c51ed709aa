//! Crate-specific error types for mmap-view.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::call::CallSite;

/// Result alias for mmap-view operations.
pub type Result<T> = std::result::Result<T, ViewError>;

/// Coarse classification of a [`ViewError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A precondition was violated before any platform call was attempted.
    Precondition,
    /// The operating system rejected a platform call.
    Platform,
    /// The mapped memory could not be safely accessed.
    Fault,
    /// A resource could not be released cleanly.
    Release,
}

/// Error type covering preconditions, platform calls, bounds, and mapping validity.
#[derive(Debug, Error)]
pub enum ViewError {
    /// Wrapper for `std::io::Error` raised outside a tracked platform call.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Error returned when attempting an operation in an incompatible access mode.
    #[error("invalid access mode: {0}")]
    InvalidMode(&'static str),

    /// The open mode is not allowed for this factory.
    #[error("invalid open mode: {0}")]
    InvalidOpenMode(&'static str),

    /// The file exists although the operation requires it not to.
    #[error("file unexpectedly exists: {}", .0.display())]
    FileExists(PathBuf),

    /// The file does not exist although the operation requires it to.
    #[error("file does not exist: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Error when a requested offset/length pair is out of bounds.
    #[error("range out of bounds: offset={offset}, len={len}, total={total}")]
    OutOfBounds {
        /// Requested offset.
        offset: u64,
        /// Requested length.
        len: u64,
        /// Size of the region the request was checked against.
        total: u64,
    },

    /// A platform call failed.
    #[error("[{site}] platform call failed ({}): {source}", os_code_label(.code))]
    Platform {
        /// Where the call was issued from.
        site: CallSite,
        /// Raw OS error code, when the platform reported one.
        code: Option<i32>,
        /// Underlying error.
        source: io::Error,
    },

    /// A size that must be positive was zero.
    #[error("size must be greater than zero")]
    ZeroSize,

    /// The view has no valid mapping, usually after a failed remap.
    #[error("mapping is not valid")]
    MappingInvalid,

    /// Growing or re-establishing a mapping is not possible.
    #[error("resize failed: {0}")]
    ResizeFailed(String),

    /// The view offset does not respect the allocation granularity.
    #[error("offset {offset} is not a multiple of the allocation granularity {granularity}")]
    Misaligned {
        /// Requested offset.
        offset: u64,
        /// Platform allocation granularity.
        granularity: u64,
    },

    /// The file on disk is shorter than the mapped range about to be accessed.
    #[error("mapped range {start}..{end} is no longer backed by the file (on-disk length {disk_len})")]
    RegionUnbacked {
        /// First byte of the access, relative to the file start.
        start: u64,
        /// One past the last byte of the access.
        end: u64,
        /// Length of the file observed on disk.
        disk_len: u64,
    },

    /// Error when a flush operation fails.
    #[error("flush failed: {0}")]
    FlushFailed(String),

    /// A resource could not be released.
    #[error("release of {resource} failed: {source}")]
    ReleaseFailed {
        /// Which resource failed to release.
        resource: &'static str,
        /// Underlying error.
        source: io::Error,
    },
}

fn os_code_label(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("os error {c}"),
        None => "no os error".to_string(),
    }
}

impl ViewError {
    /// Classify this error according to where it originated.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_) | Self::Platform { .. } | Self::FlushFailed(_) | Self::ResizeFailed(_) => {
                ErrorKind::Platform
            }
            Self::MappingInvalid | Self::RegionUnbacked { .. } => ErrorKind::Fault,
            Self::ReleaseFailed { .. } => ErrorKind::Release,
            Self::InvalidMode(_)
            | Self::InvalidOpenMode(_)
            | Self::FileExists(_)
            | Self::FileNotFound(_)
            | Self::OutOfBounds { .. }
            | Self::ZeroSize
            | Self::Misaligned { .. } => ErrorKind::Precondition,
        }
    }

    /// Raw OS error code, if this error carries one.
    #[must_use]
    pub fn os_code(&self) -> Option<i32> {
        match self {
            Self::Platform { code, .. } => *code,
            Self::Io(e) | Self::ReleaseFailed { source: e, .. } => e.raw_os_error(),
            _ => None,
        }
    }
}

impl From<ViewError> for io::Error {
    fn from(err: ViewError) -> Self {
        let kind = match &err {
            ViewError::Io(e) | ViewError::Platform { source: e, .. } => e.kind(),
            ViewError::FileNotFound(_) => io::ErrorKind::NotFound,
            ViewError::FileExists(_) => io::ErrorKind::AlreadyExists,
            ViewError::InvalidMode(_) => io::ErrorKind::PermissionDenied,
            ViewError::OutOfBounds { .. }
            | ViewError::InvalidOpenMode(_)
            | ViewError::ZeroSize
            | ViewError::Misaligned { .. } => io::ErrorKind::InvalidInput,
            ViewError::RegionUnbacked { .. } => io::ErrorKind::UnexpectedEof,
            _ => io::ErrorKind::Other,
        };
        io::Error::new(kind, err)
    }
}
