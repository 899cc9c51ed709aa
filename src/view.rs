//! Growable, cursor-based view over a memory-mapped file.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, error, warn};

use crate::config::{ErrorPolicy, ViewBuilder, ViewOptions};
use crate::errors::{Result, ViewError};
use crate::flush::{FlushPolicy, FlushTracker};
use crate::handle::{DropRelease, Handle};
use crate::platform::{
    self, AccessMode, CloseFile, Mapping, OpenMode, Unmap, View,
};
use crate::utils::{ensure_aligned, file_exists, slice_range};

/// Offset-addressable view over a file, backed by a memory mapping that grows
/// on demand.
///
/// The view owns three resources: the open file, the mapping that reserves a
/// file-backed extent, and the mapped address range. They are released in the
/// order view, mapping, file, both on drop and before a remap.
///
/// `read` consumes bytes from an internal cursor; `write` targets an explicit
/// offset and grows the file and/or the mapping as needed.
///
/// # Examples
///
/// ```no_run
/// use mmap_view::{AccessMode, MappedFileView, OpenMode};
///
/// let mut view = MappedFileView::for_new_file("data.bin", 12)?;
/// view.write(b"Hello World!", 0, true, true)?;
/// view.write(b"More Data!", 12, true, true)?;
/// drop(view);
///
/// let mut view = MappedFileView::from_existing_file(
///     "data.bin", AccessMode::ReadOnly, OpenMode::OpenExisting, 5, 0)?;
/// assert_eq!(view.read(5, false)?, b"Hello");
/// # Ok::<(), mmap_view::ViewError>(())
/// ```
pub struct MappedFileView {
    path: PathBuf,
    access: AccessMode,
    // On-disk size as last observed or grown by this view.
    file_size: u64,
    // Window length from `base`; 0 tracks the whole file.
    mapping_size: u64,
    base: u64,
    cursor: u64,
    error_policy: ErrorPolicy,
    flush: FlushTracker,
    view: Handle<View, Unmap>,
    mapping: Handle<Mapping>,
    file: Handle<File, CloseFile>,
}

impl std::fmt::Debug for MappedFileView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MappedFileView")
            .field("path", &self.path)
            .field("access", &self.access)
            .field("file_size", &self.file_size)
            .field("mapping_size", &self.mapping_size)
            .field("offset", &self.base)
            .field("position", &self.cursor)
            .field("mapped", &self.is_mapped())
            .finish()
    }
}

impl MappedFileView {
    /// Start a [`ViewBuilder`] for `path`.
    pub fn builder<P: AsRef<Path>>(path: P) -> ViewBuilder {
        ViewBuilder::new(path)
    }

    /// Open a view over an existing file.
    ///
    /// `mapping_size` bounds the mapped window (`0` maps the whole file) and
    /// `offset` must be a multiple of
    /// [`allocation_granularity`](crate::utils::allocation_granularity).
    ///
    /// # Errors
    ///
    /// See [`MappedFileView::from_existing_file_with`].
    pub fn from_existing_file<P: AsRef<Path>>(
        path: P,
        access: AccessMode,
        open_mode: OpenMode,
        mapping_size: u64,
        offset: u64,
    ) -> Result<Self> {
        let options = ViewOptions {
            access,
            open_mode,
            mapping_size,
            offset,
            ..ViewOptions::default()
        };
        Self::from_existing_file_with(path, options)
    }

    /// Open a view over an existing file with full options.
    ///
    /// # Errors
    ///
    /// Returns `ViewError::InvalidOpenMode` for any open mode other than
    /// `OpenExisting`/`TruncateExisting`, `ViewError::FileNotFound` if the
    /// file is missing, `ViewError::Misaligned` for a bad offset, and
    /// platform errors from opening, sizing, or mapping the file.
    pub fn from_existing_file_with<P: AsRef<Path>>(path: P, options: ViewOptions) -> Result<Self> {
        let path = path.as_ref();
        Self::report_construction(path, options.error_policy, Self::open_existing(path, options))
    }

    /// Create a new file of `expected_size` bytes and map all of it read-write.
    ///
    /// # Errors
    ///
    /// See [`MappedFileView::for_new_file_with`].
    pub fn for_new_file<P: AsRef<Path>>(path: P, expected_size: u64) -> Result<Self> {
        Self::for_new_file_with(path, expected_size, ViewOptions::default())
    }

    /// Create a new file with full options. `access`, `open_mode`,
    /// `mapping_size` and `offset` are ignored: new files are always created
    /// exclusively, read-write, and mapped whole.
    ///
    /// # Errors
    ///
    /// Returns `ViewError::ZeroSize` if `expected_size` is zero,
    /// `ViewError::FileExists` if the file is already there, and platform
    /// errors from creating, extending, or mapping the file.
    pub fn for_new_file_with<P: AsRef<Path>>(
        path: P,
        expected_size: u64,
        options: ViewOptions,
    ) -> Result<Self> {
        let path = path.as_ref();
        Self::report_construction(
            path,
            options.error_policy,
            Self::create_new(path, expected_size, options),
        )
    }

    fn open_existing(path: &Path, options: ViewOptions) -> Result<Self> {
        if options.open_mode.creates() {
            return Err(ViewError::InvalidOpenMode(
                "an existing file must be opened with OpenExisting or TruncateExisting",
            ));
        }
        if !file_exists(path) {
            return Err(ViewError::FileNotFound(path.to_path_buf()));
        }
        ensure_aligned(options.offset)?;

        let file = platform::open_file(path, options.access, options.open_mode)?;
        let mut view = Self::unmapped(path, options, file);
        view.file_size = platform::file_size(view.file.get()?)?;
        if options.offset > view.file_size {
            return Err(ViewError::OutOfBounds {
                offset: options.offset,
                len: 0,
                total: view.file_size,
            });
        }
        view.map(options.mapping_size)?;
        view.mapping_size = options.mapping_size;
        debug!(
            "opened view over {} ({} bytes, window {})",
            path.display(),
            view.file_size,
            view.mapping_size
        );
        Ok(view)
    }

    fn create_new(path: &Path, expected_size: u64, options: ViewOptions) -> Result<Self> {
        if expected_size == 0 {
            return Err(ViewError::ZeroSize);
        }
        if file_exists(path) {
            return Err(ViewError::FileExists(path.to_path_buf()));
        }
        let options = ViewOptions {
            access: AccessMode::ReadWrite,
            open_mode: OpenMode::CreateNew,
            mapping_size: expected_size,
            offset: 0,
            ..options
        };

        let file = platform::open_file(path, options.access, options.open_mode)?;
        let mut view = Self::unmapped(path, options, file);
        view.map(expected_size)?;
        view.mapping_size = expected_size;
        debug!("created {} with {expected_size} bytes", path.display());
        Ok(view)
    }

    fn unmapped(path: &Path, options: ViewOptions, file: File) -> Self {
        Self {
            path: path.to_path_buf(),
            access: options.access,
            file_size: 0,
            mapping_size: 0,
            base: options.offset,
            cursor: 0,
            error_policy: options.error_policy,
            flush: FlushTracker::new(options.flush_policy),
            view: Handle::empty("view", Unmap),
            mapping: Handle::empty("mapping", DropRelease),
            file: Handle::with_release("file", file, CloseFile),
        }
    }

    fn report_construction(path: &Path, policy: ErrorPolicy, res: Result<Self>) -> Result<Self> {
        if let (Err(e), ErrorPolicy::LogAndContinue) = (&res, policy) {
            error!("cannot create view over {}: {e}", path.display());
        }
        res
    }

    /// Create a mapping over `window` bytes from the base offset (`0` = whole
    /// file) and map a view of it. Assumes no view or mapping is held.
    fn map(&mut self, window: u64) -> Result<()> {
        let extent = if window == 0 { 0 } else { self.base.saturating_add(window) };
        let file = self.file.get()?;
        let mapping = platform::create_mapping(file, self.access, extent)?;
        let view = platform::map_view(file, &mapping, 0, self.base)?;
        self.file_size = self.file_size.max(mapping.len());
        self.mapping.replace(mapping)?;
        self.view.replace(view)?;
        Ok(())
    }

    /// Release view then mapping, logging failures; both end up empty.
    fn unmap(&mut self) {
        if let Err(e) = self.view.release() {
            warn!("{e}");
        }
        if let Err(e) = self.mapping.release() {
            warn!("{e}");
        }
    }

    fn settle<T>(&self, op: &str, res: Result<T>, fallback: T) -> Result<T> {
        match res {
            Err(e) if self.error_policy == ErrorPolicy::LogAndContinue => {
                error!("{op} on {} failed: {e}", self.path.display());
                Ok(fallback)
            }
            res => res,
        }
    }
}

impl MappedFileView {
    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Access mode of the view.
    #[must_use]
    pub fn access_mode(&self) -> AccessMode {
        self.access
    }

    /// Size of the backing file in bytes, as last observed or grown by this view.
    #[must_use]
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Size of the mapped window; `0` means the whole file is mapped.
    #[must_use]
    pub fn mapping_size(&self) -> u64 {
        self.mapping_size
    }

    /// File offset the view starts at.
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.base
    }

    /// Current cursor position, relative to [`offset`](Self::offset).
    #[must_use]
    pub fn position(&self) -> u64 {
        self.cursor
    }

    /// Number of bytes addressable through this view.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.file_size.saturating_sub(self.base)
    }

    /// Whether the view addresses no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the view currently holds a valid mapping.
    #[must_use]
    pub fn is_mapped(&self) -> bool {
        self.file.is_valid() && self.mapping.is_valid() && self.view.is_valid()
    }

    /// Error policy the view was built with.
    #[must_use]
    pub fn error_policy(&self) -> ErrorPolicy {
        self.error_policy
    }

    /// Flush policy the view was built with.
    #[must_use]
    pub fn flush_policy(&self) -> FlushPolicy {
        self.flush.policy()
    }

    fn window(&self) -> u64 {
        if self.mapping_size == 0 {
            self.len()
        } else {
            self.mapping_size
        }
    }
}

impl MappedFileView {
    /// Move the cursor to `position`.
    ///
    /// Seeking to or past the end of the file, or past a bounded mapping
    /// window, is rejected and leaves the cursor untouched.
    ///
    /// # Errors
    ///
    /// Returns `ViewError::OutOfBounds` under [`ErrorPolicy::Return`]; under
    /// [`ErrorPolicy::LogAndContinue`] the failure is logged and `Ok(false)`
    /// is returned.
    pub fn seek(&mut self, position: u64) -> Result<bool> {
        let res = self.try_seek(position).map(|()| true);
        self.settle("seek", res, false)
    }

    fn try_seek(&mut self, position: u64) -> Result<()> {
        let len = self.len();
        if position >= len {
            return Err(ViewError::OutOfBounds {
                offset: position,
                len: 0,
                total: len,
            });
        }
        if self.mapping_size > 0 && position >= self.mapping_size {
            return Err(ViewError::OutOfBounds {
                offset: position,
                len: 0,
                total: self.mapping_size,
            });
        }
        self.cursor = position;
        Ok(())
    }

    /// Read up to `bytes_to_read` bytes at the cursor and advance it.
    ///
    /// Reads are clamped at the end of the file; at EOF the result is empty.
    /// When a bounded window is too small and `auto_grow_mapping` is set, the
    /// window is remapped to twice the end of the read, capped at the file
    /// size.
    ///
    /// # Errors
    ///
    /// Returns `ViewError::OutOfBounds` if the read needs a larger window and
    /// growing is disabled, `ViewError::MappingInvalid` after a failed remap,
    /// and `ViewError::RegionUnbacked` if the file shrank underneath the view.
    /// Under [`ErrorPolicy::LogAndContinue`] these yield an empty buffer.
    ///
    /// Every non-empty read queries the on-disk file length first, so the copy
    /// never touches pages past a truncated end. That costs one metadata call
    /// per read.
    pub fn read(&mut self, bytes_to_read: usize, auto_grow_mapping: bool) -> Result<Vec<u8>> {
        let res = self.try_read(bytes_to_read as u64, auto_grow_mapping);
        self.settle("read", res, Vec::new())
    }

    /// Read into `buf` at the cursor, returning the number of bytes copied.
    ///
    /// # Errors
    ///
    /// Same as [`read`](Self::read); under
    /// [`ErrorPolicy::LogAndContinue`] failures yield `Ok(0)`.
    pub fn read_into(&mut self, buf: &mut [u8], auto_grow_mapping: bool) -> Result<usize> {
        let res = self
            .prepare_read(buf.len() as u64, auto_grow_mapping)
            .and_then(|range| {
                let Some((start, end)) = range else {
                    return Ok(0);
                };
                let n = end - start;
                buf[..n].copy_from_slice(&self.view.get()?.as_slice()[start..end]);
                self.cursor += n as u64;
                Ok(n)
            });
        self.settle("read", res, 0)
    }

    fn try_read(&mut self, bytes: u64, auto_grow_mapping: bool) -> Result<Vec<u8>> {
        let Some((start, end)) = self.prepare_read(bytes, auto_grow_mapping)? else {
            return Ok(Vec::new());
        };
        let data = self.view.get()?.as_slice()[start..end].to_vec();
        self.cursor += data.len() as u64;
        Ok(data)
    }

    /// Clamp, grow and guard a read at the cursor; `None` means nothing to read.
    fn prepare_read(&mut self, bytes: u64, auto_grow_mapping: bool) -> Result<Option<(usize, usize)>> {
        let len = self.len();
        if bytes == 0 || self.cursor >= len {
            return Ok(None);
        }
        let bytes = bytes.min(len - self.cursor);
        let end = self.cursor + bytes;

        if self.mapping_size > 0 && end > self.mapping_size {
            if !auto_grow_mapping {
                return Err(ViewError::OutOfBounds {
                    offset: self.cursor,
                    len: bytes,
                    total: self.mapping_size,
                });
            }
            let new_size = end.saturating_mul(2).min(len);
            debug!("read of {bytes} bytes at {} grows window to {new_size}", self.cursor);
            self.reallocate_file_mapping(new_size)?;
        }

        self.ensure_backed(self.cursor, bytes)?;
        let view_len = self.view.get()?.len() as u64;
        slice_range(self.cursor, bytes, view_len).map(Some)
    }

    /// Copy `data` into the file at `offset` (relative to the view offset),
    /// overwriting what is there. The cursor is not moved.
    ///
    /// If the write ends past the end of the file, the file is grown to fit
    /// exactly when `auto_grow_file` is set. If it ends past the mapped
    /// window, the window is grown to fit when `auto_grow_mapping` is set.
    ///
    /// # Errors
    ///
    /// Returns `ViewError::InvalidMode` on read-only views,
    /// `ViewError::OutOfBounds` when the needed growth is disabled, and
    /// mapping or platform errors from growing. Under
    /// [`ErrorPolicy::LogAndContinue`] failures yield `Ok(false)`.
    ///
    /// Like [`read`](Self::read), a non-empty write checks the on-disk file
    /// length with one metadata call before copying.
    pub fn write(
        &mut self,
        data: &[u8],
        offset: u64,
        auto_grow_file: bool,
        auto_grow_mapping: bool,
    ) -> Result<bool> {
        let res = self
            .try_write(data, offset, auto_grow_file, auto_grow_mapping)
            .map(|()| true);
        self.settle("write", res, false)
    }

    fn try_write(
        &mut self,
        data: &[u8],
        offset: u64,
        auto_grow_file: bool,
        auto_grow_mapping: bool,
    ) -> Result<()> {
        if self.access == AccessMode::ReadOnly {
            return Err(ViewError::InvalidMode("cannot write to a read-only view"));
        }
        if data.is_empty() {
            return Ok(());
        }
        let len = data.len() as u64;
        let required = offset.checked_add(len).ok_or(ViewError::OutOfBounds {
            offset,
            len,
            total: u64::MAX,
        })?;

        let file_len = self.len();
        let window = self.window();
        let file_too_small = self.file_size > 0 && required > file_len;
        let mapping_too_small = required > window;

        if file_too_small && !auto_grow_file {
            return Err(ViewError::OutOfBounds {
                offset,
                len,
                total: file_len,
            });
        }
        if mapping_too_small && !auto_grow_mapping {
            return Err(ViewError::OutOfBounds {
                offset,
                len,
                total: window,
            });
        }

        if file_too_small {
            debug!("write of {len} bytes at {offset} grows file to {required}");
            self.reallocate_file_mapping(required)?;
        } else if mapping_too_small {
            if required > file_len && !auto_grow_file {
                return Err(ViewError::OutOfBounds {
                    offset,
                    len,
                    total: file_len,
                });
            }
            debug!("write of {len} bytes at {offset} grows window to {required}");
            self.reallocate_file_mapping(required)?;
        }

        self.ensure_backed(offset, len)?;
        let dst = self.view.get_mut()?.as_mut_slice()?;
        let (start, end) = slice_range(offset, len, dst.len() as u64)?;
        dst[start..end].copy_from_slice(data);

        if self.flush.record_write(data.len()) {
            // Earlier writes below the threshold are still pending.
            self.view.get()?.flush()?;
        }
        Ok(())
    }

    /// Flush all written bytes to disk. No-op for read-only views.
    ///
    /// # Errors
    ///
    /// Returns `ViewError::FlushFailed` if the platform flush fails and
    /// `ViewError::MappingInvalid` if the view has no mapping.
    pub fn flush(&mut self) -> Result<()> {
        self.view.get()?.flush()?;
        self.flush.reset();
        Ok(())
    }

    /// Flush `len` bytes starting at `offset` (relative to the view offset).
    ///
    /// # Errors
    ///
    /// Returns `ViewError::OutOfBounds` if the range is not mapped, and the
    /// errors of [`flush`](Self::flush).
    pub fn flush_range(&mut self, offset: u64, len: u64) -> Result<()> {
        if len == 0 {
            return Ok(());
        }
        self.view.get()?.flush_range(offset, len)
    }

    /// Re-create the mapping and view so the window covers `new_size` bytes
    /// from the view offset. A read-write view extends the file when the new
    /// window reaches past its end.
    ///
    /// If re-creating the mapping or view fails, the view is left unmapped and
    /// later reads and writes fail with `ViewError::MappingInvalid`.
    ///
    /// # Errors
    ///
    /// Returns `ViewError::FileNotFound` if the file has been removed and
    /// `ViewError::ResizeFailed` if a read-only view asks for more than the
    /// file holds; in both cases the current mapping is kept. Otherwise
    /// returns mapping errors from re-creating the mapping or view.
    pub fn grow_mapping(&mut self, new_size: u64) -> Result<()> {
        self.reallocate_file_mapping(new_size)
    }

    /// Re-establish only the mapped range so it covers `new_size` bytes from
    /// the view offset, reusing the current mapping.
    ///
    /// `new_size == 0` maps the whole file and is only accepted when the
    /// current mapping reaches the end of the file.
    ///
    /// # Errors
    ///
    /// Returns `ViewError::ResizeFailed` if `new_size` exceeds the file size or
    /// the current mapping, and mapping errors from re-creating the view.
    pub fn remap_view(&mut self, new_size: u64) -> Result<()> {
        self.reallocate_mapped_view(new_size)
    }

    fn reallocate_file_mapping(&mut self, new_size: u64) -> Result<()> {
        if !file_exists(&self.path) {
            return Err(ViewError::FileNotFound(self.path.clone()));
        }
        if self.access == AccessMode::ReadOnly && new_size > self.len() {
            return Err(ViewError::ResizeFailed(format!(
                "read-only view cannot grow to {new_size} bytes past a {} byte file",
                self.len()
            )));
        }
        let tracks_file = self.mapping_size == 0;
        self.unmap();
        if let Err(e) = self.map(new_size) {
            self.unmap();
            return Err(e);
        }
        self.mapping_size = if tracks_file && new_size >= self.len() {
            0
        } else {
            new_size
        };
        debug!(
            "remapped {}: window {}, file {} bytes",
            self.path.display(),
            self.mapping_size,
            self.file_size
        );
        Ok(())
    }

    fn reallocate_mapped_view(&mut self, new_size: u64) -> Result<()> {
        if new_size > self.len() {
            return Err(ViewError::ResizeFailed(format!(
                "cannot map {new_size} bytes of a {} byte file",
                self.len()
            )));
        }
        let mapping = *self.mapping.get()?;
        let available = mapping.len().saturating_sub(self.base);
        if new_size > available {
            return Err(ViewError::ResizeFailed(format!(
                "mapping only covers {available} bytes, {new_size} requested"
            )));
        }
        // A whole-file view needs a mapping that reaches the end of the file.
        if new_size == 0 && available < self.len() {
            return Err(ViewError::ResizeFailed(format!(
                "mapping covers {available} of {} bytes, cannot map the whole file",
                self.len()
            )));
        }
        if let Err(e) = self.view.release() {
            warn!("{e}");
        }
        let view = platform::map_view(self.file.get()?, &mapping, new_size, self.base)?;
        self.view.replace(view)?;
        self.mapping_size = new_size;
        Ok(())
    }

    /// Check that `[offset, offset + len)` of the view is still inside the file
    /// on disk; touching mapped pages past a truncated end faults.
    fn ensure_backed(&self, offset: u64, len: u64) -> Result<()> {
        let file = self.file.get()?;
        let start = self.base.saturating_add(offset);
        let end = start.saturating_add(len);
        let disk_len = platform::file_size(file)?;
        if end > disk_len {
            return Err(ViewError::RegionUnbacked {
                start,
                end,
                disk_len,
            });
        }
        Ok(())
    }
}

impl Drop for MappedFileView {
    fn drop(&mut self) {
        self.unmap();
        if let Err(e) = self.file.release() {
            warn!("{e}");
        }
        debug!("closed view over {}", self.path.display());
    }
}

impl io::Read for MappedFileView {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read_into(buf, true).map_err(io::Error::from)
    }
}

impl io::Seek for MappedFileView {
    /// Seeks follow the same bounds as [`MappedFileView::seek`]; seeking to the
    /// current position always succeeds.
    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
        let target = match pos {
            io::SeekFrom::Start(n) => Some(n),
            io::SeekFrom::End(d) => self.len().checked_add_signed(d),
            io::SeekFrom::Current(d) => self.cursor.checked_add_signed(d),
        };
        let target = target.ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "seek to a negative or overflowing position")
        })?;
        if target == self.cursor {
            return Ok(target);
        }
        self.try_seek(target).map_err(io::Error::from)?;
        Ok(target)
    }
}
