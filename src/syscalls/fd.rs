/*!
 * File Descriptor Syscalls
 * Release operations and constructors for Unix file descriptors
 */

use super::wrap_failure;
use crate::core::errors::HandleError;
use crate::core::guard::HandleGuard;
use crate::core::types::{LifecycleResult, RawHandle};
use crate::monitoring::LifetimeRegistry;
use nix::errno::Errno;
use std::os::fd::{IntoRawFd, OwnedFd, RawFd};
use std::sync::Arc;

/// Release operation for a Unix file descriptor
///
/// Handles outside the `RawFd` range fail with `EBADF` without calling
/// close(2).
pub fn close_fd(handle: RawHandle) -> Result<(), HandleError> {
    let result = RawFd::try_from(handle)
        .map_err(|_| HandleError::from(Errno::EBADF))
        .and_then(|fd| nix::unistd::close(fd).map_err(HandleError::from));
    wrap_failure("close", result)
}

/// Move an owned descriptor into a new guard that closes it with [`close_fd`]
#[track_caller]
pub fn guard_owned_fd(
    fd: OwnedFd,
    registry: Option<Arc<LifetimeRegistry>>,
) -> LifecycleResult<HandleGuard> {
    let guard = HandleGuard::new();
    guard.attach_registry(registry);
    guard.init(RawHandle::from(fd.into_raw_fd()), close_fd)?;
    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::os::fd::AsRawFd;

    #[test]
    fn test_close_fd_out_of_range() {
        let err = close_fd(RawHandle::from(i32::MAX) + 1).unwrap_err();
        assert_eq!(err.raw_os_error(), Some(Errno::EBADF as i32));
        assert!(err.to_string().starts_with("close: "));
    }

    #[test]
    fn test_guard_owned_fd() {
        let file: File = tempfile::tempfile().unwrap();
        let expected = RawHandle::from(file.as_raw_fd());

        let guard = guard_owned_fd(OwnedFd::from(file), None).unwrap();
        let seen = guard.with_handle(|fd| Ok::<_, HandleError>(fd)).unwrap();
        assert_eq!(seen, expected);
        guard.release().unwrap();
    }
}
