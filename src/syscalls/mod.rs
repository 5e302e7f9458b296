/*!
 * Syscalls Module
 * Boundary adapters between raw OS handles and handle guards
 */

#[cfg(unix)]
mod fd;

#[cfg(unix)]
pub use fd::{close_fd, guard_owned_fd};

use crate::core::errors::HandleError;

/// Attach `operation` to a failed syscall result
///
/// `Ok` passes through unchanged, as do the `Uninitialized` and `Closed`
/// lifecycle errors, so callers can keep matching on them. Any other error
/// is wrapped with the operation name.
#[inline]
pub fn wrap_failure<T>(operation: &str, result: Result<T, HandleError>) -> Result<T, HandleError> {
    result.map_err(|e| e.wrap(operation))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::LifecycleError;

    #[test]
    fn test_wrap_failure_ok_passthrough() {
        assert_eq!(wrap_failure("read", Ok(5)).unwrap(), 5);
    }

    #[test]
    fn test_wrap_failure_sentinels() {
        let err = wrap_failure::<()>("read", Err(LifecycleError::Closed.into())).unwrap_err();
        assert_eq!(err.lifecycle(), Some(LifecycleError::Closed));
    }

    #[test]
    fn test_wrap_failure_io() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        let err = wrap_failure::<()>("write", Err(io.into())).unwrap_err();
        assert_eq!(err.to_string(), "write: boom");
    }
}
