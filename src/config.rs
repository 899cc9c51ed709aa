//! Construction options and the builder API.

use std::path::{Path, PathBuf};

use crate::errors::Result;
use crate::flush::FlushPolicy;
use crate::platform::{AccessMode, OpenMode};
use crate::view::MappedFileView;

/// What a view does when an operation fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Return every failure to the caller as `Err`.
    #[default]
    Return,
    /// Log the failure and hand back the operation's negative value instead
    /// (`false` for seek/write, an empty buffer for read). Construction still
    /// returns `Err`, since there is no view to continue with.
    LogAndContinue,
}

/// Options shared by both view factories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewOptions {
    /// Access mode; ignored when creating a new file, which is always read-write.
    pub access: AccessMode,
    /// Open mode; must be `OpenExisting` or `TruncateExisting` for existing files.
    pub open_mode: OpenMode,
    /// Size of the mapped window in bytes; `0` maps the whole file.
    pub mapping_size: u64,
    /// File offset of the view; must be a multiple of the allocation granularity.
    pub offset: u64,
    /// Failure handling.
    pub error_policy: ErrorPolicy,
    /// Implicit flushing after writes.
    pub flush_policy: FlushPolicy,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            access: AccessMode::ReadWrite,
            open_mode: OpenMode::OpenExisting,
            mapping_size: 0,
            offset: 0,
            error_policy: ErrorPolicy::Return,
            flush_policy: FlushPolicy::Never,
        }
    }
}

/// Builder for [`MappedFileView`].
///
/// # Examples
///
/// ```no_run
/// use mmap_view::{AccessMode, ErrorPolicy, MappedFileView};
///
/// let mut view = MappedFileView::builder("data.bin")
///     .access(AccessMode::ReadOnly)
///     .mapping_size(4096)
///     .error_policy(ErrorPolicy::LogAndContinue)
///     .open()?;
/// let head = view.read(16, true)?;
/// # Ok::<(), mmap_view::ViewError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ViewBuilder {
    path: PathBuf,
    options: ViewOptions,
}

impl ViewBuilder {
    /// Start building a view over `path`.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            options: ViewOptions::default(),
        }
    }

    /// Set the access mode.
    #[must_use]
    pub fn access(mut self, access: AccessMode) -> Self {
        self.options.access = access;
        self
    }

    /// Set the open mode.
    #[must_use]
    pub fn open_mode(mut self, open_mode: OpenMode) -> Self {
        self.options.open_mode = open_mode;
        self
    }

    /// Bound the mapped window to `size` bytes (`0` maps the whole file).
    #[must_use]
    pub fn mapping_size(mut self, size: u64) -> Self {
        self.options.mapping_size = size;
        self
    }

    /// Map the view starting at file offset `offset`.
    #[must_use]
    pub fn offset(mut self, offset: u64) -> Self {
        self.options.offset = offset;
        self
    }

    /// Set the error policy.
    #[must_use]
    pub fn error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.options.error_policy = policy;
        self
    }

    /// Set the flush policy.
    #[must_use]
    pub fn flush_policy(mut self, policy: FlushPolicy) -> Self {
        self.options.flush_policy = policy;
        self
    }

    /// Options collected so far.
    #[must_use]
    pub fn options(&self) -> &ViewOptions {
        &self.options
    }

    /// Open a view over an existing file.
    ///
    /// # Errors
    ///
    /// Returns errors from [`MappedFileView::from_existing_file_with`].
    pub fn open(self) -> Result<MappedFileView> {
        MappedFileView::from_existing_file_with(&self.path, self.options)
    }

    /// Create a new file of `expected_size` bytes and map it.
    ///
    /// # Errors
    ///
    /// Returns errors from [`MappedFileView::for_new_file_with`].
    pub fn create(self, expected_size: u64) -> Result<MappedFileView> {
        MappedFileView::for_new_file_with(&self.path, expected_size, self.options)
    }
}
