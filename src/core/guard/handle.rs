/*!
 * Handle Guards
 *
 * Reference-counted OS handle with one-shot release and a drop backstop
 */

use super::traits::{Guard, GuardDrop, Observable};
use super::GuardMetadata;
use crate::core::errors::{HandleError, LifecycleError};
use crate::core::types::{HandleState, LifecycleResult, RawHandle};
use crate::monitoring::{LifetimeRecorder, LifetimeRegistry};
use parking_lot::{Mutex, RwLock, RwLockReadGuard};
use std::fmt;
use std::panic::{self, AssertUnwindSafe, Location};
use std::sync::Arc;
use std::thread;
use tracing::{debug, error, warn};

type ReleaseFn<E> = Box<dyn FnOnce(RawHandle) -> Result<(), E> + Send>;

struct Slot<E> {
    state: HandleState,
    handle: RawHandle,
    // Only taken through `&mut Slot`; the mutex keeps `Slot: Sync` for a
    // `Send`-only operation.
    release: Mutex<Option<ReleaseFn<E>>>,
    registry: Option<Arc<LifetimeRegistry>>,
}

impl<E> Slot<E> {
    /// Move to `Closed`, handing back what the release needs
    ///
    /// Must only be called while `Initialized`.
    fn close(&mut self) -> (RawHandle, Option<ReleaseFn<E>>, Option<Arc<LifetimeRegistry>>) {
        self.state = HandleState::Closed;
        (self.handle, self.release.get_mut().take(), self.registry.clone())
    }
}

/// Run a release operation, catching a panic so the close can still be recorded
fn run_release<E>(
    handle: RawHandle,
    release: Option<ReleaseFn<E>>,
) -> thread::Result<Result<(), E>> {
    panic::catch_unwind(AssertUnwindSafe(|| release.map_or(Ok(()), |op| op(handle))))
}

/// Reference-counted handle guard
///
/// Wraps one raw handle shared between threads. Any number of threads may
/// use the handle at once through [`with_handle`](Self::with_handle);
/// [`release`](Self::release) waits for all of them to finish, runs the
/// release operation exactly once, and rejects every later use.
///
/// # Concurrency
///
/// The guard's `RwLock` is the reference count: each guarded access holds
/// it shared, release holds it exclusively. `parking_lot`'s lock is
/// task-fair, so a pending release is not starved by a stream of new
/// readers; new accesses queue behind it instead.
///
/// Guarded access must not block for long, since release cannot proceed
/// until it returns. Calling `release` (or nesting `with_handle`) on the
/// same guard from inside a `with_handle` callback deadlocks.
///
/// # Backstop
///
/// A guard dropped while still initialized releases its handle and logs a
/// warning. Release failures on that path are logged, not raised.
///
/// # Example
///
/// ```
/// use rc_handle::{HandleGuard, LifecycleError};
///
/// #[derive(Debug, PartialEq)]
/// enum MyError {
///     Lifecycle(LifecycleError),
///     Busy,
/// }
///
/// impl From<LifecycleError> for MyError {
///     fn from(e: LifecycleError) -> Self {
///         MyError::Lifecycle(e)
///     }
/// }
///
/// impl std::fmt::Display for MyError {
///     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
///         write!(f, "{:?}", self)
///     }
/// }
///
/// let guard: HandleGuard<MyError> = HandleGuard::new();
/// guard.init(7, |_| Ok(())).unwrap();
///
/// assert_eq!(guard.with_handle(|_| Err::<(), _>(MyError::Busy)), Err(MyError::Busy));
/// assert_eq!(guard.release(), Ok(()));
/// assert_eq!(guard.release(), Err(MyError::Lifecycle(LifecycleError::Closed)));
/// ```
pub struct HandleGuard<E = HandleError>
where
    E: From<LifecycleError> + fmt::Display + 'static,
{
    slot: RwLock<Slot<E>>,
    metadata: GuardMetadata,
}

impl<E> HandleGuard<E>
where
    E: From<LifecycleError> + fmt::Display + 'static,
{
    /// Create an uninitialized guard
    pub fn new() -> Self {
        Self {
            slot: RwLock::new(Slot {
                state: HandleState::Uninitialized,
                handle: 0,
                release: Mutex::new(None),
                registry: None,
            }),
            metadata: GuardMetadata::new("handle"),
        }
    }

    /// Create an uninitialized guard reporting to `registry`
    pub fn with_registry(registry: Arc<LifetimeRegistry>) -> Self {
        let guard = Self::new();
        guard.attach_registry(Some(registry));
        guard
    }

    /// Attach (or detach, with `None`) a lifetime registry
    ///
    /// Attach before [`init`](Self::init): a registry attached afterwards
    /// sees the release but not the initialization.
    pub fn attach_registry(&self, registry: Option<Arc<LifetimeRegistry>>) {
        self.slot.write().registry = registry;
    }

    /// Currently attached registry
    pub fn registry(&self) -> Option<Arc<LifetimeRegistry>> {
        self.slot.read_recursive().registry.clone()
    }

    /// Initialize the guard with `handle` and the operation that releases it
    ///
    /// `release` runs exactly once: on [`release`](Self::release), or on drop
    /// if the guard is never released explicitly. It only needs to be `Send`;
    /// it runs on whichever thread releases the guard.
    ///
    /// # Errors
    ///
    /// - [`LifecycleError::DoubleInit`] if already initialized
    /// - [`LifecycleError::Closed`] if already released
    #[track_caller]
    pub fn init<F>(&self, handle: RawHandle, release: F) -> LifecycleResult<()>
    where
        F: FnOnce(RawHandle) -> Result<(), E> + Send + 'static,
    {
        let location = Location::caller();
        let mut slot = self.slot.write();

        match slot.state {
            HandleState::Initialized => return Err(LifecycleError::DoubleInit),
            HandleState::Closed => return Err(LifecycleError::Closed),
            HandleState::Uninitialized => {}
        }

        slot.handle = handle;
        *slot.release.get_mut() = Some(Box::new(release));
        slot.state = HandleState::Initialized;

        // Recorded under the guard lock so a racing release cannot be
        // recorded first.
        slot.registry.record_init(handle, location);
        drop(slot);

        self.emit_initialized(handle);
        Ok(())
    }

    /// Shared access to the handle for the lifetime of the returned reference
    ///
    /// The handle stays valid, and release stays blocked, until the
    /// [`HandleRef`] is dropped.
    ///
    /// # Errors
    ///
    /// - [`LifecycleError::Uninitialized`] if never initialized
    /// - [`LifecycleError::Closed`] if already released
    pub fn acquire(&self) -> LifecycleResult<HandleRef<'_, E>> {
        let slot = self.slot.read();
        match slot.state {
            HandleState::Uninitialized => Err(LifecycleError::Uninitialized),
            HandleState::Closed => Err(LifecycleError::Closed),
            HandleState::Initialized => Ok(HandleRef { slot }),
        }
    }

    /// Run `f` with the handle while holding shared access
    ///
    /// Errors from `f` are returned unchanged. Lifecycle violations are
    /// converted into the caller's error type.
    #[inline]
    pub fn with_handle<R, E2, F>(&self, f: F) -> Result<R, E2>
    where
        F: FnOnce(RawHandle) -> Result<R, E2>,
        E2: From<LifecycleError>,
    {
        let handle = self.acquire()?;
        f(handle.raw())
    }

    /// Wait for all users to finish, then release the handle
    ///
    /// The guard is `Closed` afterwards even if the release operation fails;
    /// a failed release is not retried.
    ///
    /// # Panics
    ///
    /// A panic in the release operation is counted as a failed close, then
    /// resumed.
    ///
    /// # Errors
    ///
    /// - [`LifecycleError::Uninitialized`] if never initialized
    /// - [`LifecycleError::Closed`] if already released
    /// - the release operation's own error, unchanged
    pub fn release(&self) -> Result<(), E> {
        let (handle, release, registry) = {
            let mut slot = self.slot.write();
            let state = slot.state;
            match state {
                HandleState::Uninitialized => return Err(LifecycleError::Uninitialized.into()),
                HandleState::Closed => return Err(LifecycleError::Closed.into()),
                HandleState::Initialized => slot.close(),
            }
        };

        let result = match run_release(handle, release) {
            Ok(result) => result,
            Err(payload) => {
                registry.record_close(handle, true);
                error!(handle, "Release operation panicked");
                panic::resume_unwind(payload)
            }
        };
        registry.record_close(handle, result.is_err());

        match result {
            Ok(()) => self.emit_released(handle),
            Err(ref e) => self.emit_error(handle, e),
        }
        result
    }

    /// Current lifecycle state
    #[inline]
    pub fn state(&self) -> HandleState {
        self.slot.read_recursive().state
    }
}

impl<E> Default for HandleGuard<E>
where
    E: From<LifecycleError> + fmt::Display + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Guard for HandleGuard<E>
where
    E: From<LifecycleError> + fmt::Display + 'static,
{
    type Error = E;

    fn resource_type(&self) -> &'static str {
        self.metadata.resource_type
    }

    fn metadata(&self) -> &GuardMetadata {
        &self.metadata
    }

    fn is_active(&self) -> bool {
        self.state().is_active()
    }

    fn release(&self) -> Result<(), E> {
        HandleGuard::release(self)
    }
}

impl<E> GuardDrop for HandleGuard<E>
where
    E: From<LifecycleError> + fmt::Display + 'static,
{
    fn on_drop(&mut self) {
        let slot = self.slot.get_mut();
        if !slot.state.is_active() {
            return;
        }

        let (handle, release, registry) = slot.close();
        warn!(
            handle,
            resource_type = self.metadata.resource_type,
            "Handle dropped without release, releasing from backstop"
        );

        let result = match run_release(handle, release) {
            Ok(result) => result,
            Err(_) => {
                registry.record_close(handle, true);
                error!(handle, "Backstop release panicked");
                return;
            }
        };
        registry.record_close(handle, result.is_err());

        if let Err(ref e) = result {
            error!(handle, error = %e, "Backstop release failed");
            self.emit_error(handle, e);
        } else {
            self.emit_released(handle);
        }
    }
}

impl<E> Observable for HandleGuard<E>
where
    E: From<LifecycleError> + fmt::Display + 'static,
{
    fn emit_initialized(&self, handle: RawHandle) {
        debug!(
            handle,
            resource_type = self.metadata.resource_type,
            "Handle initialized"
        );
    }

    fn emit_released(&self, handle: RawHandle) {
        debug!(
            handle,
            resource_type = self.metadata.resource_type,
            lifetime_micros = self.metadata.lifetime_micros(),
            "Handle released"
        );
    }

    fn emit_error(&self, handle: RawHandle, error: &dyn fmt::Display) {
        debug!(
            handle,
            resource_type = self.metadata.resource_type,
            lifetime_micros = self.metadata.lifetime_micros(),
            error = %error,
            "Handle release failed"
        );
    }
}

impl<E> Drop for HandleGuard<E>
where
    E: From<LifecycleError> + fmt::Display + 'static,
{
    fn drop(&mut self) {
        self.on_drop();
    }
}

impl<E> fmt::Debug for HandleGuard<E>
where
    E: From<LifecycleError> + fmt::Display + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("HandleGuard");
        match self.slot.try_read_recursive() {
            Some(slot) => {
                s.field("state", &slot.state);
                if slot.state.is_active() {
                    s.field("handle", &slot.handle);
                }
                s.field("tracked", &slot.registry.is_some());
            }
            None => {
                s.field("state", &"<releasing>");
            }
        }
        s.finish()
    }
}

/// Shared access to an initialized handle
///
/// Obtained from [`HandleGuard::acquire`]. Holding it keeps the handle
/// valid; dropping it lets a pending release proceed.
pub struct HandleRef<'a, E> {
    slot: RwLockReadGuard<'a, Slot<E>>,
}

impl<E> HandleRef<'_, E> {
    /// The raw handle value
    #[inline]
    pub fn raw(&self) -> RawHandle {
        self.slot.handle
    }
}

impl<E> fmt::Debug for HandleRef<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("HandleRef").field(&self.slot.handle).finish()
    }
}
