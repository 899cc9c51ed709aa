//! High-level API for one-shot file access through a view.
//!
//! Provides convenience functions that wrap [`MappedFileView`] construction.

use std::fs;
use std::path::Path;

use crate::errors::Result;
use crate::platform::{AccessMode, OpenMode};
use crate::view::MappedFileView;

/// Create a new file of `size` bytes and return a read-write view over it.
/// Fails if the file already exists.
///
/// # Errors
///
/// Returns errors from `MappedFileView::for_new_file`.
pub fn create_view<P: AsRef<Path>>(path: P, size: u64) -> Result<MappedFileView> {
    MappedFileView::for_new_file(path, size)
}

/// Open an existing file in the requested access mode, mapping all of it.
///
/// # Errors
///
/// Returns errors from `MappedFileView::from_existing_file`.
pub fn open_view<P: AsRef<Path>>(path: P, access: AccessMode) -> Result<MappedFileView> {
    MappedFileView::from_existing_file(path, access, OpenMode::OpenExisting, 0, 0)
}

/// Read the whole file through a read-only view.
///
/// # Errors
///
/// Returns errors from opening the view or reading from it.
#[allow(clippy::cast_possible_truncation)]
pub fn read_file<P: AsRef<Path>>(path: P) -> Result<Vec<u8>> {
    let mut view = open_view(path, AccessMode::ReadOnly)?;
    let len = view.len() as usize;
    view.read(len, true)
}

/// Write bytes at an offset into an existing file, growing it if needed, and
/// flush them to disk.
///
/// # Errors
///
/// Returns errors from opening the view, writing, or flushing.
pub fn write_file_at<P: AsRef<Path>>(path: P, offset: u64, data: &[u8]) -> Result<()> {
    let mut view = open_view(path, AccessMode::ReadWrite)?;
    view.write(data, offset, true, true)?;
    view.flush()
}

/// Delete the file backing a view. Views over it should be dropped first.
///
/// # Errors
///
/// Returns `ViewError::Io` if the delete operation fails.
pub fn delete_file<P: AsRef<Path>>(path: P) -> Result<()> {
    fs::remove_file(path)?;
    Ok(())
}
