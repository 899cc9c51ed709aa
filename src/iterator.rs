//! Iterator-based sequential access over a [`MappedFileView`].

use crate::errors::Result;
use crate::utils::page_size;
use crate::view::MappedFileView;

/// Iterator over fixed-size chunks read from the view's cursor onwards.
///
/// Each item is the result of one [`MappedFileView::read`] call with mapping
/// growth enabled; iteration stops at end of file or after the first error.
///
/// # Examples
///
/// ```no_run
/// use mmap_view::{AccessMode, MappedFileView, OpenMode};
///
/// let mut view = MappedFileView::from_existing_file(
///     "data.bin", AccessMode::ReadOnly, OpenMode::OpenExisting, 1 << 20, 0)?;
///
/// for (i, chunk) in view.chunks(4096).enumerate() {
///     let chunk = chunk?;
///     println!("chunk {i}: {} bytes", chunk.len());
/// }
/// # Ok::<(), mmap_view::ViewError>(())
/// ```
pub struct Chunks<'a> {
    view: &'a mut MappedFileView,
    chunk_size: usize,
    failed: bool,
}

impl<'a> Chunks<'a> {
    pub(crate) fn new(view: &'a mut MappedFileView, chunk_size: usize) -> Self {
        Self {
            view,
            chunk_size: chunk_size.max(1),
            failed: false,
        }
    }

    fn remaining(&self) -> u64 {
        self.view.len().saturating_sub(self.view.position())
    }
}

impl Iterator for Chunks<'_> {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.remaining() == 0 {
            return None;
        }
        match self.view.read(self.chunk_size, true) {
            Ok(chunk) if chunk.is_empty() => None,
            Ok(chunk) => Some(Ok(chunk)),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.failed {
            return (0, Some(0));
        }
        let chunks = self.remaining().div_ceil(self.chunk_size as u64) as usize;
        // A logged failure ends iteration early.
        (0, Some(chunks))
    }
}

impl MappedFileView {
    /// Iterate over `chunk_size`-byte chunks from the cursor to end of file.
    pub fn chunks(&mut self, chunk_size: usize) -> Chunks<'_> {
        Chunks::new(self, chunk_size)
    }

    /// Iterate over page-sized chunks from the cursor to end of file.
    pub fn pages(&mut self) -> Chunks<'_> {
        Chunks::new(self, page_size())
    }
}
