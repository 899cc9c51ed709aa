//! # mmap-view: growable memory-mapped file views for Rust
//!
//! This crate exposes a file as an offset-addressable view backed by a memory
//! mapping. Reads advance a cursor, writes target explicit offsets, and the
//! mapping (and, for writes, the file itself) is re-established transparently
//! whenever an access would fall outside the current bounds.
//!
//! ## Features
//!
//! - **Cursor reads**: `seek`/`read` with EOF clamping and doubling window growth
//! - **Offset writes**: exact-fit file growth, bounded-window growth on demand
//! - **Owned resources**: file, mapping and view are released once, in order
//! - **Runtime error policy**: return failures, or log them and continue
//! - **Cross-platform**: Works on Windows, Linux, macOS via memmap2
//!
//! ## Quick Start
//!
//! ```no_run
//! use mmap_view::{create_view, open_view, AccessMode};
//!
//! let mut view = create_view("data.bin", 1024)?;
//! view.write(b"Hello, mmap!", 100, true, true)?;
//! view.flush()?;
//! drop(view);
//!
//! let mut ro = open_view("data.bin", AccessMode::ReadOnly)?;
//! ro.seek(100)?;
//! assert_eq!(ro.read(12, true)?, b"Hello, mmap!");
//! # Ok::<(), mmap_view::ViewError>(())
//! ```
//!
//! ## Modules
//!
//! - [`errors`]: Error types for all view operations
//! - [`call`]: Tracked platform calls
//! - [`handle`]: Owning resource wrapper
//! - [`utils`]: Alignment, granularity and path helpers
//! - [`platform`]: File, mapping and view primitives
//! - [`view`]: Core `MappedFileView` implementation
//! - [`config`]: Options and builder
//! - [`flush`]: Flush policies for read-write views
//! - [`manager`]: High-level convenience functions
//! - `iterator`: Chunk iterators (feature `iterator`)
//!
//! ## Concurrency
//!
//! A view is single-threaded: it provides no locking, and two views over the
//! same file go stale if one of them grows it.

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![deny(missing_docs)]
#![doc(html_root_url = "https://docs.rs/mmap-view")]

pub mod call;
pub mod config;
pub mod errors;
pub mod flush;
pub mod handle;
pub mod manager;
pub mod platform;
pub mod utils;
pub mod view;

#[cfg(feature = "iterator")]
pub mod iterator;

pub use config::{ErrorPolicy, ViewBuilder, ViewOptions};
pub use errors::{ErrorKind, ViewError};
pub use flush::FlushPolicy;
pub use manager::{create_view, delete_file, open_view, read_file, write_file_at};
pub use platform::{AccessMode, OpenMode};
pub use view::MappedFileView;
