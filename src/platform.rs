//! Platform layer: files, mappings, and mapped views.
//!
//! A *mapping* reserves a file-backed extent (growing a read-write file when
//! the requested extent is larger than the file, the way a Windows section
//! object does). A *view* is the address range actually mapped into the
//! process over part of that extent. Both sit behind [`Handle`](crate::handle::Handle)s owned by the
//! view layer; this module only creates them.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

use log::debug;
use memmap2::{Mmap, MmapMut, MmapOptions};

use crate::call::platform_call;
use crate::errors::{Result, ViewError};
use crate::handle::Release;
use crate::utils::{file_exists, slice_range};

/// Access mode for a view and its backing file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessMode {
    /// Read-only access.
    ReadOnly,
    /// Read-write access.
    #[default]
    ReadWrite,
}

/// How the backing file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpenMode {
    /// Create a file; fail if it already exists.
    CreateNew,
    /// Create a file, truncating any existing one.
    CreateAlways,
    /// Open a file; fail if it does not exist.
    #[default]
    OpenExisting,
    /// Open a file, creating it if missing.
    OpenAlways,
    /// Open a file and truncate it to zero; fail if it does not exist.
    TruncateExisting,
}

impl OpenMode {
    /// Whether this mode may create a file.
    #[must_use]
    pub fn creates(self) -> bool {
        matches!(self, Self::CreateNew | Self::CreateAlways | Self::OpenAlways)
    }
}

/// Open `path` with the given access and open mode.
///
/// Existence and access-mode requirements of `open_mode` are checked before
/// the file is touched.
///
/// # Errors
///
/// Returns `ViewError::FileExists` / `ViewError::FileNotFound` on an existence
/// mismatch, `ViewError::InvalidMode` if the open mode needs write access, and
/// `ViewError::Platform` if the open itself fails.
pub fn open_file(path: &Path, access: AccessMode, open_mode: OpenMode) -> Result<File> {
    let exists = file_exists(path);
    let writable = access == AccessMode::ReadWrite;

    let mut opts = OpenOptions::new();
    opts.read(true).write(writable);
    match open_mode {
        OpenMode::CreateNew => {
            if exists {
                return Err(ViewError::FileExists(path.to_path_buf()));
            }
            if !writable {
                return Err(ViewError::InvalidMode("CreateNew requires ReadWrite access"));
            }
            opts.create_new(true);
        }
        OpenMode::CreateAlways => {
            if !writable {
                return Err(ViewError::InvalidMode("CreateAlways requires ReadWrite access"));
            }
            opts.create(true).truncate(true);
        }
        OpenMode::OpenExisting => {
            if !exists {
                return Err(ViewError::FileNotFound(path.to_path_buf()));
            }
        }
        OpenMode::OpenAlways => {
            if !writable {
                return Err(ViewError::InvalidMode("OpenAlways requires ReadWrite access"));
            }
            opts.create(true);
        }
        OpenMode::TruncateExisting => {
            if !exists {
                return Err(ViewError::FileNotFound(path.to_path_buf()));
            }
            if !writable {
                return Err(ViewError::InvalidMode("TruncateExisting requires ReadWrite access"));
            }
            opts.truncate(true);
        }
    }

    let file = platform_call(|| opts.open(path))?;
    debug!("opened {} ({access:?}, {open_mode:?})", path.display());
    Ok(file)
}

/// Current on-disk size of `file`.
///
/// # Errors
///
/// Returns `ViewError::Platform` if the metadata query fails.
pub fn file_size(file: &File) -> Result<u64> {
    Ok(platform_call(|| file.metadata())?.len())
}

/// A file-backed extent that views are mapped from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mapping {
    access: AccessMode,
    len: u64,
}

impl Mapping {
    /// Extent of the mapping in bytes, measured from the start of the file.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Whether the mapping covers no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Access mode the mapping was created with.
    #[must_use]
    pub fn access(&self) -> AccessMode {
        self.access
    }
}

/// Create a mapping of `size` bytes over `file` (`0` = the whole file).
///
/// A read-write mapping larger than the file extends the file to `size`.
///
/// # Errors
///
/// Returns `ViewError::ResizeFailed` if a read-only mapping would extend past
/// the end of the file, and `ViewError::Platform` if querying or extending the
/// file fails.
pub fn create_mapping(file: &File, access: AccessMode, size: u64) -> Result<Mapping> {
    let current = file_size(file)?;
    if size == 0 {
        return Ok(Mapping { access, len: current });
    }
    if size > current {
        if access == AccessMode::ReadOnly {
            return Err(ViewError::ResizeFailed(format!(
                "read-only mapping of {size} bytes exceeds file size {current}"
            )));
        }
        platform_call(|| file.set_len(size))?;
        debug!("extended file from {current} to {size} bytes for mapping");
    }
    Ok(Mapping { access, len: size })
}

/// Address range mapped into the process.
#[derive(Debug)]
pub enum View {
    /// Nothing to map (the extent is empty).
    Empty,
    /// Read-only mapping.
    Ro(Mmap),
    /// Read-write mapping.
    Rw(MmapMut),
}

impl View {
    /// Length of the mapped range.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Empty => 0,
            Self::Ro(m) => m.len(),
            Self::Rw(m) => m.len(),
        }
    }

    /// Whether the mapped range is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Mapped bytes.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        match self {
            Self::Empty => &[],
            Self::Ro(m) => &m[..],
            Self::Rw(m) => &m[..],
        }
    }

    /// Mapped bytes, writable.
    ///
    /// # Errors
    ///
    /// Returns `ViewError::InvalidMode` for read-only views.
    pub fn as_mut_slice(&mut self) -> Result<&mut [u8]> {
        match self {
            Self::Rw(m) => Ok(&mut m[..]),
            Self::Empty => Ok(Default::default()),
            Self::Ro(_) => Err(ViewError::InvalidMode("mutable access on read-only view")),
        }
    }

    /// Flush `len` bytes starting at `offset` to disk. No-op for read-only views.
    ///
    /// # Errors
    ///
    /// Returns `ViewError::OutOfBounds` if the range exceeds the view and
    /// `ViewError::FlushFailed` if the platform flush fails.
    pub fn flush_range(&self, offset: u64, len: u64) -> Result<()> {
        let (start, end) = slice_range(offset, len, self.len() as u64)?;
        match self {
            Self::Rw(m) if end > start => m
                .flush_range(start, end - start)
                .map_err(|e| ViewError::FlushFailed(e.to_string())),
            _ => Ok(()),
        }
    }

    /// Flush the whole view to disk. No-op for read-only views.
    ///
    /// # Errors
    ///
    /// Returns `ViewError::FlushFailed` if the platform flush fails.
    pub fn flush(&self) -> Result<()> {
        match self {
            Self::Rw(m) => m.flush().map_err(|e| ViewError::FlushFailed(e.to_string())),
            _ => Ok(()),
        }
    }
}

/// Map `len` bytes of `mapping` starting at file offset `offset`
/// (`len == 0` maps the rest of the mapping).
///
/// # Errors
///
/// Returns `ViewError::OutOfBounds` if the range lies outside the mapping and
/// `ViewError::Platform` if the platform refuses the mapping.
#[allow(clippy::cast_possible_truncation)]
pub fn map_view(file: &File, mapping: &Mapping, len: u64, offset: u64) -> Result<View> {
    let extent = mapping.len();
    if offset > extent {
        return Err(ViewError::OutOfBounds {
            offset,
            len,
            total: extent,
        });
    }
    let len = if len == 0 { extent - offset } else { len };
    crate::utils::ensure_in_bounds(offset, len, extent)?;
    if mapping.is_empty() || len == 0 {
        return Ok(View::Empty);
    }
    let len = usize::try_from(len).map_err(|_| {
        ViewError::ResizeFailed(format!("view of {len} bytes does not fit the address space"))
    })?;

    let mut opts = MmapOptions::new();
    opts.offset(offset).len(len);
    // SAFETY: the range lies within the mapping, which never exceeds the file
    // length, and the file is held open by the owner of the returned view.
    let view = match mapping.access() {
        AccessMode::ReadOnly => View::Ro(platform_call(|| unsafe { opts.map(file) })?),
        AccessMode::ReadWrite => View::Rw(platform_call(|| unsafe { opts.map_mut(file) })?),
    };
    debug!("mapped view of {len} bytes at offset {offset}");
    Ok(view)
}

/// Release strategy for files that surfaces close errors where the platform reports them.
#[derive(Debug, Default, Clone, Copy)]
pub struct CloseFile;

impl Release<File> for CloseFile {
    fn release(&mut self, file: File) -> io::Result<()> {
        close_file(file)
    }
}

#[cfg(unix)]
fn close_file(file: File) -> io::Result<()> {
    use std::os::unix::io::IntoRawFd;
    let fd = file.into_raw_fd();
    // SAFETY: fd was just detached from `file`, so it is owned here and closed once.
    if unsafe { libc::close(fd) } == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn close_file(file: File) -> io::Result<()> {
    drop(file);
    Ok(())
}

/// Release strategy for views; unmapping happens when the mapping is dropped.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unmap;

impl Release<View> for Unmap {
    fn release(&mut self, view: View) -> io::Result<()> {
        drop(view);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_modes_check_existence_first() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("missing.bin");
        let present = dir.path().join("present.bin");
        std::fs::write(&present, b"abc").expect("write");

        assert!(matches!(
            open_file(&missing, AccessMode::ReadOnly, OpenMode::OpenExisting),
            Err(ViewError::FileNotFound(_))
        ));
        assert!(matches!(
            open_file(&present, AccessMode::ReadWrite, OpenMode::CreateNew),
            Err(ViewError::FileExists(_))
        ));
        assert!(matches!(
            open_file(&missing, AccessMode::ReadOnly, OpenMode::CreateNew),
            Err(ViewError::InvalidMode(_))
        ));
        assert!(!missing.exists());
    }

    #[test]
    fn truncate_existing_empties_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("t.bin");
        std::fs::write(&path, b"abcdef").expect("write");
        let file = open_file(&path, AccessMode::ReadWrite, OpenMode::TruncateExisting).expect("open");
        assert_eq!(file_size(&file).expect("size"), 0);
    }

    #[test]
    fn rw_mapping_extends_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("grow.bin");
        let file = open_file(&path, AccessMode::ReadWrite, OpenMode::CreateNew).expect("create");
        let mapping = create_mapping(&file, AccessMode::ReadWrite, 64).expect("mapping");
        assert_eq!(mapping.len(), 64);
        assert_eq!(file_size(&file).expect("size"), 64);

        let mut view = map_view(&file, &mapping, 0, 0).expect("view");
        assert_eq!(view.len(), 64);
        view.as_mut_slice().expect("rw")[..3].copy_from_slice(b"xyz");
        view.flush().expect("flush");
        drop(view);
        assert_eq!(&std::fs::read(&path).expect("read")[..3], b"xyz");
    }

    #[test]
    fn ro_mapping_cannot_extend_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("ro.bin");
        std::fs::write(&path, b"0123456789").expect("write");
        let file = open_file(&path, AccessMode::ReadOnly, OpenMode::OpenExisting).expect("open");
        assert!(matches!(
            create_mapping(&file, AccessMode::ReadOnly, 11),
            Err(ViewError::ResizeFailed(_))
        ));
        let mapping = create_mapping(&file, AccessMode::ReadOnly, 4).expect("mapping");
        let mut view = map_view(&file, &mapping, 0, 0).expect("view");
        assert_eq!(view.as_slice(), b"0123");
        assert!(view.as_mut_slice().is_err());
    }

    #[test]
    fn empty_file_maps_to_empty_view() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("empty.bin");
        std::fs::write(&path, b"").expect("write");
        let file = open_file(&path, AccessMode::ReadOnly, OpenMode::OpenExisting).expect("open");
        let mapping = create_mapping(&file, AccessMode::ReadOnly, 0).expect("mapping");
        let view = map_view(&file, &mapping, 0, 0).expect("view");
        assert!(matches!(view, View::Empty));
        assert!(view.as_slice().is_empty());
    }
}
