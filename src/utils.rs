//! Utility helpers for alignment, allocation granularity, path checks, and range math.

use std::io;
use std::path::Path;

use crate::call::platform_call_expecting;
use crate::errors::{Result, ViewError};

/// Get the system page size in bytes.
#[must_use]
pub fn page_size() -> usize {
    cfg_if::cfg_if! {
        if #[cfg(target_os = "windows")] {
            windows_system_info().0
        } else {
            unix_page_size()
        }
    }
}

/// Alignment that view offsets must respect.
///
/// On Windows this is the allocation granularity (usually 64 KiB); elsewhere
/// it is the page size.
#[must_use]
pub fn allocation_granularity() -> usize {
    cfg_if::cfg_if! {
        if #[cfg(target_os = "windows")] {
            windows_system_info().1
        } else {
            unix_page_size()
        }
    }
}

#[cfg(target_os = "windows")]
fn windows_system_info() -> (usize, usize) {
    use std::mem::MaybeUninit;
    #[allow(non_snake_case)]
    #[repr(C)]
    struct SYSTEM_INFO {
        wProcessorArchitecture: u16,
        wReserved: u16,
        dwPageSize: u32,
        lpMinimumApplicationAddress: *mut core::ffi::c_void,
        lpMaximumApplicationAddress: *mut core::ffi::c_void,
        dwActiveProcessorMask: usize,
        dwNumberOfProcessors: u32,
        dwProcessorType: u32,
        dwAllocationGranularity: u32,
        wProcessorLevel: u16,
        wProcessorRevision: u16,
    }
    extern "system" {
        fn GetSystemInfo(lpSystemInfo: *mut SYSTEM_INFO);
    }
    let mut sysinfo = MaybeUninit::<SYSTEM_INFO>::uninit();
    // SAFETY: GetSystemInfo fully initializes the struct and cannot fail.
    unsafe {
        GetSystemInfo(sysinfo.as_mut_ptr());
        let s = sysinfo.assume_init();
        (s.dwPageSize as usize, s.dwAllocationGranularity as usize)
    }
}

#[cfg(not(target_os = "windows"))]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn unix_page_size() -> usize {
    // SAFETY: sysconf with _SC_PAGESIZE is safe to call.
    unsafe {
        let page_size = libc::sysconf(libc::_SC_PAGESIZE);
        page_size.max(0) as usize
    }
}

/// Whether `path` names an existing regular file.
///
/// A missing path is an expected answer, not a failure; any other error while
/// querying metadata (for instance a permission problem) is treated as "does
/// not exist" and logged.
#[must_use]
pub fn file_exists(path: &Path) -> bool {
    match platform_call_expecting(|| std::fs::metadata(path), io::ErrorKind::NotFound) {
        Ok(Some(meta)) => meta.is_file(),
        Ok(None) => false,
        Err(e) => {
            log::debug!("existence check for {} failed: {e}", path.display());
            false
        }
    }
}

/// Ensure `offset` is a multiple of [`allocation_granularity`].
///
/// # Errors
///
/// Returns `ViewError::Misaligned` otherwise.
pub fn ensure_aligned(offset: u64) -> Result<()> {
    let granularity = allocation_granularity() as u64;
    if granularity != 0 && offset % granularity != 0 {
        return Err(ViewError::Misaligned {
            offset,
            granularity,
        });
    }
    Ok(())
}

/// Ensure the requested [offset, offset+len) range is within [0, total).
///
/// # Errors
///
/// Returns `ViewError::OutOfBounds` if the range exceeds bounds.
pub fn ensure_in_bounds(offset: u64, len: u64, total: u64) -> Result<()> {
    match offset.checked_add(len) {
        Some(end) if offset <= total && end <= total => Ok(()),
        _ => Err(ViewError::OutOfBounds { offset, len, total }),
    }
}

/// Compute a safe byte slice range for a given total length, returning start..end as usize tuple.
///
/// # Errors
///
/// Returns `ViewError::OutOfBounds` if the requested range exceeds the total length.
#[allow(clippy::cast_possible_truncation)]
pub fn slice_range(offset: u64, len: u64, total: u64) -> Result<(usize, usize)> {
    ensure_in_bounds(offset, len, total)?;
    // total is the length of a live mapping, so it fits in usize
    let start = offset as usize;
    let end = (offset + len) as usize;
    Ok((start, end))
}
