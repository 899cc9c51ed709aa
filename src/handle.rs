//! Owning wrapper for platform resources.
//!
//! A [`Handle`] owns at most one resource and releases it exactly once, either
//! through [`Handle::release`] or on drop. Release failures are logged on drop
//! and never propagate out of a destructor.

use std::fmt;
use std::io;

use log::{debug, warn};

use crate::errors::{Result, ViewError};

/// Strategy used to give a resource back to the platform.
pub trait Release<T> {
    /// Release `resource`. Called at most once per resource.
    ///
    /// # Errors
    ///
    /// Returns the platform error if the release did not succeed.
    fn release(&mut self, resource: T) -> io::Result<()>;
}

/// Release by dropping the value and letting its own destructor run.
#[derive(Debug, Default, Clone, Copy)]
pub struct DropRelease;

impl<T> Release<T> for DropRelease {
    fn release(&mut self, resource: T) -> io::Result<()> {
        drop(resource);
        Ok(())
    }
}

/// Release through a caller-supplied routine.
pub struct FnRelease<F>(
    /// Routine called with the resource.
    pub F,
);

impl<T, F> Release<T> for FnRelease<F>
where
    F: FnMut(T) -> io::Result<()>,
{
    fn release(&mut self, resource: T) -> io::Result<()> {
        (self.0)(resource)
    }
}

impl<F> fmt::Debug for FnRelease<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnRelease(..)")
    }
}

/// Move-only owner of a single platform resource.
pub struct Handle<T, R: Release<T> = DropRelease> {
    resource: Option<T>,
    releaser: R,
    label: &'static str,
}

impl<T, R: Release<T>> Handle<T, R> {
    /// Wrap `resource` with a custom release strategy.
    pub fn with_release(label: &'static str, resource: T, releaser: R) -> Self {
        Self {
            resource: Some(resource),
            releaser,
            label,
        }
    }

    /// A handle that owns nothing.
    pub fn empty(label: &'static str, releaser: R) -> Self {
        Self {
            resource: None,
            releaser,
            label,
        }
    }

    /// Whether a resource is currently owned.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.resource.is_some()
    }

    /// Borrow the resource.
    ///
    /// # Errors
    ///
    /// Returns `ViewError::MappingInvalid` if the handle is empty.
    pub fn get(&self) -> Result<&T> {
        self.resource.as_ref().ok_or(ViewError::MappingInvalid)
    }

    /// Mutably borrow the resource.
    ///
    /// # Errors
    ///
    /// Returns `ViewError::MappingInvalid` if the handle is empty.
    pub fn get_mut(&mut self) -> Result<&mut T> {
        self.resource.as_mut().ok_or(ViewError::MappingInvalid)
    }

    /// Release the current resource (if any) and take ownership of `resource`.
    ///
    /// # Errors
    ///
    /// Returns `ViewError::ReleaseFailed` if releasing the previous resource
    /// failed. The new resource is stored regardless.
    pub fn replace(&mut self, resource: T) -> Result<()> {
        let released = self.release();
        self.resource = Some(resource);
        released
    }

    /// Release the owned resource now. Releasing an empty handle is a no-op.
    ///
    /// The handle is empty afterwards even when the platform reports a
    /// failure, since the resource cannot be handed back a second time.
    ///
    /// # Errors
    ///
    /// Returns `ViewError::ReleaseFailed` if the release strategy fails.
    pub fn release(&mut self) -> Result<()> {
        let Some(resource) = self.resource.take() else {
            return Ok(());
        };
        debug!("releasing {}", self.label);
        self.releaser
            .release(resource)
            .map_err(|source| ViewError::ReleaseFailed {
                resource: self.label,
                source,
            })
    }
}

impl<T, R: Release<T>> Drop for Handle<T, R> {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!("{e}");
        }
    }
}

impl<T, R: Release<T>> fmt::Debug for Handle<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("label", &self.label)
            .field("valid", &self.is_valid())
            .finish()
    }
}
