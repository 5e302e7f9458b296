/*!
 * RAII Handle Guards
 *
 * Reference-counted, observable guards for OS handles with automatic cleanup.
 *
 * ## Design Principles
 *
 * 1. **Lock as Reference Count**: Every guarded access holds the lock in
 *    shared mode; release takes it exclusively, so it waits for all users
 * 2. **One-Shot Lifecycle**: `Uninitialized -> Initialized -> Closed`, never back
 * 3. **Observable**: Lifecycle events are traced and fed to an optional
 *    lifetime registry
 * 4. **Backstop**: A guard dropped while initialized releases its handle
 *
 * ## Guard Types
 *
 * - **HandleGuard**: Shared lifecycle guard for one raw handle
 * - **HandleRef**: Scoped shared access to an initialized guard
 *
 * ## Example
 *
 * ```rust
 * use rc_handle::{HandleError, HandleGuard};
 *
 * let guard: HandleGuard = HandleGuard::new();
 * guard.init(42, |_fd| Ok::<(), HandleError>(()))?;
 *
 * let fd = guard.with_handle(|fd| Ok::<_, HandleError>(fd))?;
 * assert_eq!(fd, 42);
 *
 * guard.release()?; // Or released on drop
 * # Ok::<(), HandleError>(())
 * ```
 */

mod handle;
mod traits;

pub use handle::{HandleGuard, HandleRef};
pub use traits::{Guard, GuardDrop, Observable};

/// Guard metadata for observability
#[derive(Debug, Clone)]
pub struct GuardMetadata {
    pub resource_type: &'static str,
    pub creation_time: std::time::Instant,
}

impl GuardMetadata {
    #[inline]
    pub fn new(resource_type: &'static str) -> Self {
        Self {
            resource_type,
            creation_time: std::time::Instant::now(),
        }
    }

    #[inline]
    pub fn lifetime_micros(&self) -> u64 {
        self.creation_time.elapsed().as_micros() as u64
    }
}
