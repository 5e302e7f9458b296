/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;

/// Lifecycle violations detected by a handle guard
///
/// Returned as plain values so callers can compare against them directly.
#[derive(Error, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Diagnostic)]
#[serde(tag = "error_type", rename_all = "snake_case")]
pub enum LifecycleError {
    #[error("use of uninitialized handle")]
    #[diagnostic(
        code(handle::uninitialized),
        help("Call HandleGuard::init before using or releasing the handle.")
    )]
    Uninitialized,

    #[error("use of closed handle")]
    #[diagnostic(
        code(handle::closed),
        help("The handle was already released. A released guard cannot be used or re-initialized.")
    )]
    Closed,

    #[error("multiple calls to HandleGuard::init")]
    #[diagnostic(
        code(handle::double_init),
        help("Each guard wraps exactly one handle. Create a new guard for another handle.")
    )]
    DoubleInit,
}

/// Default error type for handle guards and syscall adapters
#[derive(Error, Debug, Diagnostic)]
pub enum HandleError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error("{operation}: {source}")]
    #[diagnostic(
        code(handle::syscall_failed),
        help("The underlying system call failed. The handle is no longer usable.")
    )]
    Syscall {
        operation: String,
        #[source]
        source: Box<HandleError>,
    },

    #[error(transparent)]
    #[diagnostic(code(handle::io))]
    Io(#[from] io::Error),
}

impl HandleError {
    /// The lifecycle violation behind this error, if any
    pub fn lifecycle(&self) -> Option<LifecycleError> {
        match self {
            HandleError::Lifecycle(e) => Some(*e),
            _ => None,
        }
    }

    /// Attach an operation name to the error for diagnostics
    ///
    /// `Uninitialized` and `Closed` pass through unwrapped so callers can
    /// still match on them. Every other error gains the operation context.
    pub fn wrap(self, operation: impl Into<String>) -> Self {
        match self {
            HandleError::Lifecycle(LifecycleError::Uninitialized | LifecycleError::Closed) => self,
            other => HandleError::Syscall {
                operation: operation.into(),
                source: Box::new(other),
            },
        }
    }

    /// OS error code, looking through operation context
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            HandleError::Io(e) => e.raw_os_error(),
            HandleError::Syscall { source, .. } => source.raw_os_error(),
            HandleError::Lifecycle(_) => None,
        }
    }
}

#[cfg(unix)]
impl From<nix::errno::Errno> for HandleError {
    fn from(errno: nix::errno::Errno) -> Self {
        HandleError::Io(io::Error::from(errno))
    }
}
