//! Tracked platform calls.
//!
//! Every call into the operating system goes through [`platform_call`] or
//! [`platform_call_expecting`]. A failure is turned into
//! [`ViewError::Platform`] carrying the caller's source location and the raw
//! OS error code, so diagnostics point at the call that failed rather than at
//! this module.

use std::fmt;
use std::io;
use std::panic::Location;

use log::trace;

use crate::errors::{Result, ViewError};

/// Source location a platform call was issued from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallSite {
    file: &'static str,
    line: u32,
}

impl CallSite {
    /// Capture the location of the caller.
    #[track_caller]
    #[must_use]
    pub fn caller() -> Self {
        let loc = Location::caller();
        Self {
            file: loc.file(),
            line: loc.line(),
        }
    }

    /// Source file of the call.
    #[must_use]
    pub fn file(&self) -> &'static str {
        self.file
    }

    /// Source line of the call.
    #[must_use]
    pub fn line(&self) -> u32 {
        self.line
    }
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// Run a platform call, converting any failure into a [`ViewError::Platform`].
///
/// # Errors
///
/// Returns `ViewError::Platform` if `f` fails.
#[track_caller]
pub fn platform_call<T>(f: impl FnOnce() -> io::Result<T>) -> Result<T> {
    let site = CallSite::caller();
    f().map_err(|source| failure(site, source))
}

/// Run a platform call for which one failure kind is an expected outcome.
///
/// Returns `Ok(None)` when the call fails with `expected`, `Ok(Some(value))`
/// on success, and `Err` for every other failure.
///
/// # Errors
///
/// Returns `ViewError::Platform` if `f` fails with a kind other than `expected`.
#[track_caller]
pub fn platform_call_expecting<T>(
    f: impl FnOnce() -> io::Result<T>,
    expected: io::ErrorKind,
) -> Result<Option<T>> {
    let site = CallSite::caller();
    match f() {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.kind() == expected => {
            trace!("[{site}] ignoring expected error {expected:?}");
            Ok(None)
        }
        Err(source) => Err(failure(site, source)),
    }
}

fn failure(site: CallSite, source: io::Error) -> ViewError {
    ViewError::Platform {
        site,
        code: source.raw_os_error(),
        source,
    }
}
