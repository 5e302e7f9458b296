/*!
 * Core Types
 * Common types shared by guards and the lifetime registry
 */

use serde::{Deserialize, Serialize};
use std::fmt;

/// Raw handle value
///
/// Wide enough for a Unix file descriptor and a Windows `HANDLE` alike.
pub type RawHandle = i64;

/// Result type for lifecycle-only operations
pub type LifecycleResult<T> = Result<T, super::errors::LifecycleError>;

/// Result type for guards using the default error type
pub type HandleResult<T> = Result<T, super::errors::HandleError>;

/// Lifecycle state of a handle guard
///
/// Transitions are monotonic: `Uninitialized -> Initialized -> Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandleState {
    #[default]
    Uninitialized,
    Initialized,
    Closed,
}

impl HandleState {
    /// Whether the handle may currently be used
    #[inline]
    pub fn is_active(self) -> bool {
        matches!(self, HandleState::Initialized)
    }

    /// Whether the state is terminal
    #[inline]
    pub fn is_closed(self) -> bool {
        matches!(self, HandleState::Closed)
    }
}

impl fmt::Display for HandleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HandleState::Uninitialized => "uninitialized",
            HandleState::Initialized => "initialized",
            HandleState::Closed => "closed",
        };
        f.write_str(name)
    }
}
